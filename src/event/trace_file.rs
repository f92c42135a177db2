//! NDJSON trace files
//!
//! File-backed sink for handing traces to downstream tooling: one JSON
//! object per line, flushed per emission. Files are named by a label that is
//! validated against path traversal; [`generate_trace_id`] produces unique
//! timestamped labels.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Result, TraceError};
use crate::event::{EventSink, TraceEvent};

/// Conventional trace directory for tools that do not pick their own.
pub const DEFAULT_TRACE_DIR: &str = ".callscope/traces";

/// Append-to-file NDJSON sink.
pub struct NdjsonSink {
    writer: Arc<Mutex<BufWriter<File>>>,
    path: PathBuf,
}

impl NdjsonSink {
    /// Create `<dir>/<generated-id>.ndjson`.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_label(dir, &generate_trace_id())
    }

    /// Create `<dir>/<label>.ndjson`.
    ///
    /// The label is validated to prevent path traversal: only ASCII
    /// alphanumerics, hyphens, and underscores are accepted (plus the `T`
    /// already present in generated IDs).
    pub fn with_label(dir: impl AsRef<Path>, label: &str) -> Result<Self> {
        if !valid_label(label) {
            return Err(TraceError::InvalidTraceLabel {
                label: label.to_string(),
            });
        }

        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let path = dir.join(format!("{label}.ndjson"));
        let file = File::create(&path)?;

        tracing::info!(path = %path.display(), "created trace file");

        Ok(Self {
            writer: Arc::new(Mutex::new(BufWriter::new(file))),
            path,
        })
    }

    /// Where this sink writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a batch of already-collected records (e.g. a MemorySink
    /// snapshot) in order.
    pub fn write_all(&self, events: &[TraceEvent]) -> Result<()> {
        for event in events {
            self.write_line(event)?;
        }
        Ok(())
    }

    /// Flush buffered output. Emission already flushes per record; this is
    /// for deliberate teardown.
    pub fn flush(&self) -> Result<()> {
        self.writer.lock().flush()?;
        Ok(())
    }

    fn write_line(&self, event: &TraceEvent) -> Result<()> {
        let json = serde_json::to_string(event).map_err(|e| {
            TraceError::TraceIo {
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            }
        })?;

        let mut writer = self.writer.lock();
        writeln!(writer, "{json}")?;
        writer.flush()?;
        Ok(())
    }
}

impl EventSink for NdjsonSink {
    fn emit(&self, event: TraceEvent) {
        if let Err(e) = self.write_line(&event) {
            tracing::warn!(error = %e, path = %self.path.display(), "trace file write failed");
        }
    }
}

/// Unique trace label: `YYYY-MM-DDTHH-MM-SS-XXXX` where XXXX is random hex.
pub fn generate_trace_id() -> String {
    use chrono::Utc;

    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S");
    let random: u32 = rand::random::<u32>() % 0x10000; // 4 hex digits
    format!("{timestamp}-{random:04x}")
}

fn valid_label(label: &str) -> bool {
    !label.is_empty()
        && !label.contains("..")
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == 'T')
}

/// A trace file found by [`list_traces`].
#[derive(Debug)]
pub struct TraceInfo {
    pub label: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub created: Option<std::time::SystemTime>,
}

/// List `.ndjson` trace files under `dir`, newest first.
pub fn list_traces(dir: impl AsRef<Path>) -> Result<Vec<TraceInfo>> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut traces = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().map(|e| e == "ndjson").unwrap_or(false) {
            let metadata = entry.metadata()?;
            let label = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("unknown")
                .to_string();
            traces.push(TraceInfo {
                label,
                path,
                size_bytes: metadata.len(),
                created: metadata.created().ok(),
            });
        }
    }

    traces.sort_by(|a, b| b.created.cmp(&a.created));
    Ok(traces)
}
