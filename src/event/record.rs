//! Trace event records
//!
//! The emitted record is a tagged union over four kinds:
//! - `function_call`: a wrapped callable was invoked (payload: args)
//! - `function_return`: it settled (payload: returnValue or error,
//!   plus wall-clock durationMs)
//! - `class_init`: a traced type was constructed (payload: ctor args)
//! - `class_destroy`: a traced instance was dropped
//!
//! Every record carries the source location resolved once at installation
//! time (`file`), stable for the lifetime of the wrapping. Payloads are
//! already JSON-safe here: cycle handling happens when the live values are
//! encoded, before a record is constructed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structural capture of a raised error: what the event carries in place of
/// the live error value (which is re-raised to the caller unmodified).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// One emitted trace record.
///
/// Serializes with an `"event"` tag and snake_case kind names, one JSON
/// object per emission:
///
/// ```json
/// {"event":"function_call","file":"src/calc.rs","class":"Calc","function":"add","args":[2,3]}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    FunctionCall {
        file: Arc<str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        class: Option<Arc<str>>,
        function: Arc<str>,
        args: Vec<Value>,
    },
    FunctionReturn {
        file: Arc<str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        class: Option<Arc<str>>,
        function: Arc<str>,
        #[serde(rename = "returnValue", skip_serializing_if = "Option::is_none")]
        return_value: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<ErrorDescriptor>,
        #[serde(rename = "durationMs", skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
    },
    ClassInit {
        file: Arc<str>,
        class: Arc<str>,
        args: Vec<Value>,
    },
    ClassDestroy {
        file: Arc<str>,
        class: Arc<str>,
    },
}

impl TraceEvent {
    /// The wire name of this record's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FunctionCall { .. } => "function_call",
            Self::FunctionReturn { .. } => "function_return",
            Self::ClassInit { .. } => "class_init",
            Self::ClassDestroy { .. } => "class_destroy",
        }
    }

    /// Source location of the wrapping that produced this record.
    pub fn file(&self) -> &str {
        match self {
            Self::FunctionCall { file, .. }
            | Self::FunctionReturn { file, .. }
            | Self::ClassInit { file, .. }
            | Self::ClassDestroy { file, .. } => file,
        }
    }

    /// Method name, for call/return records.
    pub fn function(&self) -> Option<&str> {
        match self {
            Self::FunctionCall { function, .. } | Self::FunctionReturn { function, .. } => {
                Some(function)
            }
            _ => None,
        }
    }

    /// Declaring type name, when the wrapping belongs to one.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Self::FunctionCall { class, .. } | Self::FunctionReturn { class, .. } => {
                class.as_deref()
            }
            Self::ClassInit { class, .. } | Self::ClassDestroy { class, .. } => Some(class),
        }
    }

    /// True for construction/destruction records.
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::ClassInit { .. } | Self::ClassDestroy { .. })
    }

    /// The error payload of a failed return, if any.
    pub fn error(&self) -> Option<&ErrorDescriptor> {
        match self {
            Self::FunctionReturn { error, .. } => error.as_ref(),
            _ => None,
        }
    }
}
