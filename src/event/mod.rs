//! Event Module - trace records and sinks
//!
//! Key types:
//! - `TraceEvent`: tagged record (function_call / function_return /
//!   class_init / class_destroy)
//! - `ErrorDescriptor`: structural error capture carried by failed returns
//! - `EventSink`: trait for dependency injection
//! - `ConsoleSink` / `MemorySink` / `NoopSink`: NDJSON writer, in-process
//!   buffer for tests, discard
//! - `NdjsonSink`: trace-file writer with generated, validated labels

mod record;
mod sink;
mod trace_file;

// Re-export all public types
pub use record::{ErrorDescriptor, TraceEvent};
pub use sink::{ConsoleSink, EventSink, MemorySink, NoopSink};
pub use trace_file::{generate_trace_id, list_traces, NdjsonSink, TraceInfo, DEFAULT_TRACE_DIR};
