//! Best-effort audit trail of served predictions.
//!
//! Every successful prediction is handed to an [`AuditSink`]. The CSV sink
//! queues records for a single writer thread so rows from concurrent
//! requests never interleave, and enqueueing never blocks. Write failures
//! stay inside the sink; they are logged and dropped.

use crate::error::AuditError;
use crate::models::{Label, PredictionResult};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

/// Header row written once when the log file is created
pub const CSV_HEADER: &str = "timestamp,prob,label,threshold";

/// One persisted prediction
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub probability: f64,
    pub label: Label,
    pub threshold: f64,
}

impl AuditRecord {
    pub fn from_result(result: &PredictionResult) -> Self {
        Self {
            timestamp: Utc::now(),
            probability: result.probability,
            label: result.label,
            threshold: result.threshold,
        }
    }

    /// CSV row without trailing newline
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{:.6},{},{:?}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            self.probability,
            self.label,
            self.threshold
        )
    }
}

/// Destination for audit records.
///
/// The returned error exists so sinks can report what happened; the
/// prediction path looks at it only for metrics and never fails a request
/// because of it.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord) -> Result<(), AuditError>;
}

/// Sink used when auditing is disabled
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _record: AuditRecord) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Append one record, creating parent directories and the header as needed.
pub fn append_record(path: &Path, record: &AuditRecord) -> Result<(), AuditError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    let mut buf = String::with_capacity(96);
    if file.metadata()?.len() == 0 {
        buf.push_str(CSV_HEADER);
        buf.push('\n');
    }
    buf.push_str(&record.to_csv_row());
    buf.push('\n');

    // single write per record keeps rows whole
    file.write_all(buf.as_bytes())?;
    Ok(())
}

/// Queue-backed CSV audit log
#[derive(Clone)]
pub struct CsvAuditLog {
    tx: mpsc::Sender<AuditRecord>,
}

/// Handle on the writer thread. It exits once every [`CsvAuditLog`] clone
/// is dropped and the queue is drained.
pub struct AuditWorker {
    handle: JoinHandle<()>,
}

impl AuditWorker {
    /// Wait for queued records to be written
    pub fn join(self) {
        if self.handle.join().is_err() {
            warn!("Audit writer thread panicked");
        }
    }
}

impl CsvAuditLog {
    /// Start the writer thread for `path`
    pub fn spawn(path: impl Into<PathBuf>, capacity: usize) -> Result<(Self, AuditWorker), AuditError> {
        let path = path.into();
        let (tx, mut rx) = mpsc::channel::<AuditRecord>(capacity.max(1));

        info!(path = %path.display(), capacity, "Starting audit writer");

        let handle = std::thread::Builder::new()
            .name("audit-writer".to_string())
            .spawn(move || {
                let mut written: u64 = 0;
                while let Some(record) = rx.blocking_recv() {
                    match append_record(&path, &record) {
                        Ok(()) => written += 1,
                        Err(e) => warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to append audit record"
                        ),
                    }
                }
                debug!(written, "Audit writer stopped");
            })?;

        Ok((Self { tx }, AuditWorker { handle }))
    }
}

impl AuditSink for CsvAuditLog {
    fn record(&self, record: AuditRecord) -> Result<(), AuditError> {
        self.tx.try_send(record).map_err(|e| match e {
            TrySendError::Full(_) => AuditError::QueueFull,
            TrySendError::Closed(_) => AuditError::Closed,
        })
    }
}
