//! Callscope - runtime method interception with structured trace events
//!
//! Wraps selected callables and types so every invocation, settlement, and
//! construction is emitted as a structured record, without touching the
//! caller's code path: same arguments, same return value or error (the same
//! value, not a copy), same sync-vs-async shape. Built for developer-tooling
//! pipelines that feed execution traces to downstream analysis.
//!
//! ## Module Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     INTERCEPTION LAYER                       │
//! │  wrap.rs    Method Wrapper Factory (TracedMethod,            │
//! │             TracedFunction, CallOutcome, TraceOptions)       │
//! │  class.rs   Type-wide interception (TracedClass,             │
//! │             TracedInstance, decorated construction)          │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      CAPTURE LAYER                           │
//! │  value.rs     Cycle-safe value serialization (TraceValue)    │
//! │  location.rs  Installation-site resolution (SourceLocation)  │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      EMISSION LAYER                          │
//! │  event/     Records and sinks (TraceEvent, EventSink,        │
//! │             ConsoleSink, MemorySink, NdjsonSink)             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`wrap`] | Wrapping one callable: call/return records around the original |
//! | [`class`] | Wrapping a whole type: method table, exclusions, lifecycle |
//! | [`value`] | Structural capture of args/returns, `"[Circular]"` cycle marker |
//! | [`location`] | Best-effort "where was this installed" with `unknown` fallback |
//! | [`event`] | Record shapes and the injectable sink seam |
//! | [`error`] | Error types with stable `SCOPE-0XX` codes |
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use callscope::{MemorySink, TraceValue, TracedClass};
//!
//! let sink = MemorySink::new();
//! let calc = TracedClass::<()>::builder("Calc", Arc::new(sink.clone()))
//!     .constructor(|_args| ())
//!     .method("add", |_recv, args| {
//!         let a = args[0].to_json().as_i64().unwrap_or(0);
//!         let b = args[1].to_json().as_i64().unwrap_or(0);
//!         Ok(TraceValue::from(a + b))
//!     })
//!     .build()?;
//!
//! let instance = calc.construct(vec![])?;
//! instance.invoke("add", vec![2i64.into(), 3i64.into()])?;
//! assert_eq!(sink.len(), 3); // class_init, function_call, function_return
//! # Ok::<(), callscope::TraceError>(())
//! ```

// ═══════════════════════════════════════════════════════════════
// INTERCEPTION LAYER - Wrapper factory and type-wide installers
// ═══════════════════════════════════════════════════════════════
pub mod class;
pub mod wrap;

// ═══════════════════════════════════════════════════════════════
// CAPTURE LAYER - Value serialization and source locations
// ═══════════════════════════════════════════════════════════════
pub mod location;
pub mod value;

// ═══════════════════════════════════════════════════════════════
// EMISSION LAYER - Records and sinks
// ═══════════════════════════════════════════════════════════════
pub mod event;

// ═══════════════════════════════════════════════════════════════
// CROSS-CUTTING - Error handling
// ═══════════════════════════════════════════════════════════════
pub mod error;

// ═══════════════════════════════════════════════════════════════
// PUBLIC API RE-EXPORTS
// ═══════════════════════════════════════════════════════════════

// Error types
pub use error::{CallError, Result, TraceError};

// Interception types
pub use class::{TracedClass, TracedClassBuilder, TracedInstance};
pub use wrap::{CallOutcome, CallResult, TraceOptions, TracedFunction, TracedMethod, WrapContext};

// Capture types
pub use location::SourceLocation;
pub use value::{TraceValue, CYCLE_MARKER};

// Event types
pub use event::{
    generate_trace_id, list_traces, ConsoleSink, ErrorDescriptor, EventSink, MemorySink,
    NdjsonSink, NoopSink, TraceEvent, TraceInfo, DEFAULT_TRACE_DIR,
};
