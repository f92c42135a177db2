//! Event sinks - where trace records go
//!
//! [`EventSink`] is the injection seam: interception installers take an
//! `Arc<dyn EventSink>`, so one process can run any number of independent
//! sinks (per-test isolation, split destinations). `emit` is infallible by
//! signature; the provided sinks absorb their own I/O failures and report
//! them through `tracing::warn!`. A sink that panics would still unwind
//! through the traced call path - keep implementations total.

use std::io::Write;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::event::TraceEvent;

/// Accepts one structured record at a time. Implementations must be
/// thread-safe; each call is a discrete, self-contained emission.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: TraceEvent);
}

/// NDJSON to a writer (stdout by default): one JSON object per line,
/// flushed per emission so records survive crashes mid-run.
pub struct ConsoleSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    /// Emit into an arbitrary writer (a file, a pipe, a test buffer).
    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::stdout()
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, event: TraceEvent) {
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "trace record serialization failed");
                return;
            }
        };
        let mut writer = self.writer.lock();
        if let Err(e) = writeln!(writer, "{line}").and_then(|_| writer.flush()) {
            tracing::warn!(error = %e, "trace sink write failed");
        }
    }
}

/// Append-only in-process buffer with query helpers. The unit-test sink:
/// every test constructs its own, so assertions never see another test's
/// records. Cloning shares the buffer.
#[derive(Clone, Default)]
pub struct MemorySink {
    events: Arc<RwLock<Vec<TraceEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records, in emission order.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.read().clone()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Records whose `function` matches `name`.
    pub fn of_function(&self, name: &str) -> Vec<TraceEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.function() == Some(name))
            .cloned()
            .collect()
    }

    /// Records whose declaring type matches `name` (lifecycle included).
    pub fn of_class(&self, name: &str) -> Vec<TraceEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.class_name() == Some(name))
            .cloned()
            .collect()
    }

    /// Construction/destruction records only.
    pub fn lifecycle(&self) -> Vec<TraceEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.is_lifecycle())
            .cloned()
            .collect()
    }

    /// All records as a JSON array value.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.events()).unwrap_or(Value::Null)
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: TraceEvent) {
        self.events.write().push(event);
    }
}

/// Discards every record. For wiring where tracing output is unwanted but
/// the interception structure should stay in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: TraceEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(function: &str) -> TraceEvent {
        TraceEvent::FunctionCall {
            file: "test.rs".into(),
            class: None,
            function: function.into(),
            args: vec![json!(1)],
        }
    }

    fn init(class: &str) -> TraceEvent {
        TraceEvent::ClassInit {
            file: "test.rs".into(),
            class: class.into(),
            args: vec![],
        }
    }

    #[test]
    fn test_sink_is_object_safe() {
        let boxed: Box<dyn EventSink> = Box::new(NoopSink);
        boxed.emit(call("a"));

        let arc: Arc<dyn EventSink> = Arc::new(MemorySink::new());
        arc.emit(call("b"));
    }

    #[test]
    fn test_sink_works_generically() {
        fn emit_one<S: EventSink>(sink: &S) {
            sink.emit(call("generic"));
        }
        let sink = MemorySink::new();
        emit_one(&sink);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_memory_sink_preserves_order() {
        let sink = MemorySink::new();
        sink.emit(call("first"));
        sink.emit(call("second"));
        sink.emit(call("third"));

        let names: Vec<_> = sink
            .events()
            .iter()
            .map(|e| e.function().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_memory_sink_clone_shares_buffer() {
        let sink = MemorySink::new();
        let alias = sink.clone();
        alias.emit(call("shared"));

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.events()[0].function(), Some("shared"));
    }

    #[test]
    fn test_memory_sink_concurrent_emission() {
        let sink = MemorySink::new();
        let mut handles = Vec::new();
        for t in 0..10 {
            let sink = sink.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    sink.emit(call(&format!("worker_{t}")));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(sink.len(), 1000);
    }

    #[test]
    fn test_memory_sink_filters() {
        let sink = MemorySink::new();
        sink.emit(call("add"));
        sink.emit(call("sub"));
        sink.emit(init("Calc"));

        assert_eq!(sink.of_function("add").len(), 1);
        assert_eq!(sink.of_function("missing").len(), 0);
        assert_eq!(sink.of_class("Calc").len(), 1);
        assert_eq!(sink.lifecycle().len(), 1);

        let json = sink.to_json();
        assert_eq!(json.as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn test_console_sink_writes_ndjson() {
        #[derive(Clone, Default)]
        struct SharedBuf(Arc<Mutex<Vec<u8>>>);
        impl Write for SharedBuf {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let buf = SharedBuf::default();
        let sink = ConsoleSink::with_writer(Box::new(buf.clone()));
        sink.emit(call("add"));
        sink.emit(init("Calc"));

        let text = String::from_utf8(buf.0.lock().clone()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], json!("function_call"));
        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["event"], json!("class_init"));
    }

    #[test]
    fn test_console_sink_absorbs_write_failures() {
        struct BrokenWriter;
        impl Write for BrokenWriter {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "broken"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "broken"))
            }
        }

        let sink = ConsoleSink::with_writer(Box::new(BrokenWriter));
        // Must not panic; the failure is absorbed and logged.
        sink.emit(call("doomed"));
    }

    #[test]
    fn test_noop_sink_discards() {
        let sink = NoopSink;
        sink.emit(call("ignored"));
        // Nothing to observe: the type exists to satisfy the seam.
    }
}
