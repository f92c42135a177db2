//! Callscope Error Types with Error Codes
//!
//! Two families that never mix:
//! - [`TraceError`]: failures of the tracing layer itself (registration,
//!   dispatch, trace-file plumbing). Coded `SCOPE-001..006`.
//! - [`CallError`]: the failure of a traced callable. The wrapper captures a
//!   structural [`ErrorDescriptor`] for the emitted event and hands the
//!   *same* `CallError` value back to the caller, so call-site error handling
//!   is unaffected by tracing.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;

use crate::event::ErrorDescriptor;

pub type Result<T> = std::result::Result<T, TraceError>;

/// Failures raised by the tracing layer, never by traced callables.
///
/// Implements both `thiserror::Error` for std error compatibility
/// and `miette::Diagnostic` for fancy terminal error display.
#[derive(Error, Debug, Diagnostic)]
#[diagnostic(url(docsrs))]
pub enum TraceError {
    // ═══════════════════════════════════════════
    // DISPATCH ERRORS (001-002)
    // ═══════════════════════════════════════════
    #[error("[SCOPE-001] No method '{method}' registered on '{class}'")]
    #[diagnostic(
        code(callscope::unknown_method),
        help("Register the method on the TracedClassBuilder before building")
    )]
    UnknownMethod { class: String, method: String },

    #[error("[SCOPE-002] '{class}' was built without a constructor delegate")]
    #[diagnostic(
        code(callscope::missing_constructor),
        help("Call .constructor(..) on the builder before .build()")
    )]
    MissingConstructor { class: String },

    // ═══════════════════════════════════════════
    // REGISTRATION ERRORS (003-004)
    // ═══════════════════════════════════════════
    #[error("[SCOPE-003] Method '{method}' registered twice on '{class}'")]
    #[diagnostic(
        code(callscope::duplicate_method),
        help("Each method name may be registered once per type")
    )]
    DuplicateMethod { class: String, method: String },

    #[error("[SCOPE-004] '{method}' is a reserved name and cannot be registered")]
    #[diagnostic(
        code(callscope::reserved_method_name),
        help("Construction is traced through .constructor(..), not as a method")
    )]
    ReservedMethodName { method: String },

    // ═══════════════════════════════════════════
    // TRACE FILE ERRORS (005-006)
    // ═══════════════════════════════════════════
    #[error("[SCOPE-005] Invalid trace label: must be alphanumeric with hyphens/underscores only, got: {label}")]
    #[diagnostic(
        code(callscope::invalid_trace_label),
        help("Use generate_trace_id() or a label without path separators")
    )]
    InvalidTraceLabel { label: String },

    #[error("[SCOPE-006] Failed to create trace file: {source}")]
    #[diagnostic(
        code(callscope::trace_io),
        help("Check that the trace directory is writable")
    )]
    TraceIo {
        #[from]
        source: std::io::Error,
    },
}

impl TraceError {
    /// Stable error code for programmatic matching.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownMethod { .. } => "SCOPE-001",
            Self::MissingConstructor { .. } => "SCOPE-002",
            Self::DuplicateMethod { .. } => "SCOPE-003",
            Self::ReservedMethodName { .. } => "SCOPE-004",
            Self::InvalidTraceLabel { .. } => "SCOPE-005",
            Self::TraceIo { .. } => "SCOPE-006",
        }
    }

    /// Whether retrying the operation could succeed without code changes.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::TraceIo { .. })
    }
}

/// The failure value a traced callable produces.
///
/// Carries a short classification (`name`), a human message, an optional
/// rendered cause chain (`stack`), and optionally the live source error.
/// Cloning is cheap (the source is `Arc`-shared), which lets the wrapper log
/// a descriptor while returning this exact value to the caller.
#[derive(Clone)]
pub struct CallError {
    name: Arc<str>,
    message: Arc<str>,
    stack: Option<Arc<str>>,
    source: Option<Arc<dyn StdError + Send + Sync + 'static>>,
}

impl CallError {
    /// Build from a classification and message, no underlying source.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            message: Arc::from(message.into()),
            stack: None,
            source: None,
        }
    }

    /// Capture a concrete error: the classification is the error's short type
    /// name, the stack is its rendered cause chain, and the live value is
    /// kept so callers can still reach it through [`CallError::source_arc`].
    pub fn from_error<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let name = short_type_name(std::any::type_name::<E>());
        let message = err.to_string();
        let stack = render_chain(&err);
        Self {
            name: Arc::from(name),
            message: Arc::from(message),
            stack: stack.map(Arc::from),
            source: Some(Arc::new(err)),
        }
    }

    /// Attach rendered stack/chain text.
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(Arc::from(stack.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    /// The live source error, if this value was captured from one.
    pub fn source_arc(&self) -> Option<&Arc<dyn StdError + Send + Sync + 'static>> {
        self.source.as_ref()
    }

    /// The structural form carried by emitted events.
    pub fn descriptor(&self) -> ErrorDescriptor {
        ErrorDescriptor {
            name: self.name.to_string(),
            message: self.message.to_string(),
            stack: self.stack.as_ref().map(|s| s.to_string()),
        }
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl fmt::Debug for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallError")
            .field("name", &self.name)
            .field("message", &self.message)
            .field("stack", &self.stack)
            .finish()
    }
}

impl StdError for CallError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn StdError + 'static))
    }
}

/// Last path segment of a type name, generics stripped: "ParseIntError"
/// from "core::num::ParseIntError".
fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Render an error's cause chain, one frame per line.
fn render_chain(err: &(dyn StdError + 'static)) -> Option<String> {
    let mut cause = err.source()?;
    let mut out = format!("caused by: {cause}");
    while let Some(next) = cause.source() {
        out.push_str(&format!("\ncaused by: {next}"));
        cause = next;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        let cases: Vec<(TraceError, &str)> = vec![
            (
                TraceError::UnknownMethod {
                    class: "Calc".into(),
                    method: "sub".into(),
                },
                "SCOPE-001",
            ),
            (
                TraceError::MissingConstructor {
                    class: "Calc".into(),
                },
                "SCOPE-002",
            ),
            (
                TraceError::DuplicateMethod {
                    class: "Calc".into(),
                    method: "add".into(),
                },
                "SCOPE-003",
            ),
            (
                TraceError::ReservedMethodName {
                    method: "constructor".into(),
                },
                "SCOPE-004",
            ),
            (
                TraceError::InvalidTraceLabel {
                    label: "../evil".into(),
                },
                "SCOPE-005",
            ),
        ];

        for (err, code) in cases {
            assert_eq!(err.code(), code);
            assert!(
                err.to_string().starts_with(&format!("[{code}]")),
                "display of {code} must start with its bracketed code: {err}"
            );
        }
    }

    #[test]
    fn test_trace_io_is_recoverable() {
        let err = TraceError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(err.code(), "SCOPE-006");
        assert!(err.is_recoverable());

        let err = TraceError::UnknownMethod {
            class: "Calc".into(),
            method: "sub".into(),
        };
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_call_error_new() {
        let err = CallError::new("ValidationError", "value out of range");
        assert_eq!(err.name(), "ValidationError");
        assert_eq!(err.message(), "value out of range");
        assert!(err.stack().is_none());
        assert!(err.source_arc().is_none());
        assert_eq!(err.to_string(), "ValidationError: value out of range");
    }

    #[test]
    fn test_call_error_from_error_captures_type_name() {
        let parse_err = "abc".parse::<i64>().unwrap_err();
        let err = CallError::from_error(parse_err);
        assert_eq!(err.name(), "ParseIntError");
        assert!(err.message().contains("invalid digit"));
        assert!(err.source_arc().is_some());
    }

    #[test]
    fn test_call_error_clone_shares_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = CallError::from_error(io);
        let cloned = err.clone();

        let a = err.source_arc().unwrap();
        let b = cloned.source_arc().unwrap();
        assert!(Arc::ptr_eq(a, b), "clone must share the live source");
    }

    #[test]
    fn test_call_error_descriptor() {
        let err = CallError::new("Error", "boom").with_stack("caused by: io");
        let desc = err.descriptor();
        assert_eq!(desc.name, "Error");
        assert_eq!(desc.message, "boom");
        assert_eq!(desc.stack.as_deref(), Some("caused by: io"));
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("core::num::ParseIntError"), "ParseIntError");
        assert_eq!(short_type_name("MyError"), "MyError");
        assert_eq!(
            short_type_name("alloc::boxed::Box<dyn std::error::Error>"),
            "Box"
        );
    }

    #[test]
    fn test_render_chain_walks_sources() {
        #[derive(Debug)]
        struct Outer(std::io::Error);
        impl fmt::Display for Outer {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "outer failed")
            }
        }
        impl StdError for Outer {
            fn source(&self) -> Option<&(dyn StdError + 'static)> {
                Some(&self.0)
            }
        }

        let err = Outer(std::io::Error::new(std::io::ErrorKind::Other, "inner"));
        let chain = render_chain(&err).unwrap();
        assert_eq!(chain, "caused by: inner");

        let leaf = std::io::Error::new(std::io::ErrorKind::Other, "leaf");
        assert!(render_chain(&leaf).is_none());
    }
}
