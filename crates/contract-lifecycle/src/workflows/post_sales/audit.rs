//! Business-facing audit trail for rule runs.
//!
//! Each run gets a handle; every decision is appended as a line and the run closes
//! with a summary block. Audit writes never fail a run: sinks swallow their own
//! I/O errors and report them through `tracing`.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write as _};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::Local;
use tracing::{debug, info, warn};

use super::domain::ContractKey;

/// Identifies one run's log within a sink.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AuditHandle {
    pub run_id: String,
    pub rule: String,
    /// Per-sink start order, counting from 1.
    pub sequence: u64,
}

/// Aggregate counts written at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditSummary {
    pub total: usize,
    pub matched: usize,
    pub updated: usize,
    pub elapsed: Duration,
}

impl AuditSummary {
    fn lines(&self) -> Vec<String> {
        vec![
            "========================================".to_string(),
            "SUMMARY".to_string(),
            format!("Matched: {} contracts", self.matched),
            format!("Updated: {} contracts", self.updated),
            format!("Total Found: {} contracts", self.total),
            format!("Execution Time: {:.2}s", self.elapsed.as_secs_f64()),
            "========================================".to_string(),
            "=== PROCESS END ===".to_string(),
        ]
    }
}

/// A single status change as recorded in the trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractChange<'a> {
    pub key: &'a ContractKey,
    pub previous: &'a str,
    pub new: &'a str,
    pub reason: &'a str,
}

impl ContractChange<'_> {
    pub fn line(&self) -> String {
        let mut line = format!(
            "EId: {} | Type: {} | Previous: {} | New: {}",
            self.key.contract_id, self.key.contract_type, self.previous, self.new
        );
        if !self.reason.is_empty() {
            line.push_str(" | Reason: ");
            line.push_str(self.reason);
        }
        line
    }
}

pub trait AuditLog: Send + Sync + 'static {
    fn start_run(&self, rule_name: &str) -> AuditHandle;

    fn append(&self, handle: &AuditHandle, line: &str);

    fn append_summary(&self, handle: &AuditHandle, summary: &AuditSummary) {
        for line in summary.lines() {
            self.append(handle, &line);
        }
    }

    fn append_change(&self, handle: &AuditHandle, change: &ContractChange<'_>) {
        self.append(handle, &change.line());
    }

    fn append_error(&self, handle: &AuditHandle, message: &str, error: &dyn std::error::Error) {
        self.append(handle, &format!("ERROR: {message}"));
        self.append(handle, &format!("   Error: {error}"));
        let mut source = error.source();
        while let Some(inner) = source {
            self.append(handle, &format!("   Caused by: {inner}"));
            source = inner.source();
        }
    }
}

fn next_handle(sequence: &AtomicU64, rule_name: &str) -> AuditHandle {
    let seq = sequence.fetch_add(1, Ordering::Relaxed) + 1;
    let rule = if rule_name.trim().is_empty() {
        "Unknown"
    } else {
        rule_name
    };
    AuditHandle {
        run_id: format!(
            "{rule}_{}_{seq:03}",
            Local::now().format("%Y-%m-%d_%H%M%S%3f")
        ),
        rule: rule_name.to_string(),
        sequence: seq,
    }
}

// Attempts at finding an unused file name before falling back to appending.
const FILE_CLAIM_ATTEMPTS: usize = 8;

/// Forwards audit lines to the tracing subscriber.
#[derive(Debug, Default)]
pub struct TracingAuditLog {
    sequence: AtomicU64,
}

impl AuditLog for TracingAuditLog {
    fn start_run(&self, rule_name: &str) -> AuditHandle {
        let handle = next_handle(&self.sequence, rule_name);
        info!(rule = %handle.rule, run = %handle.run_id, "=== PROCESS START ===");
        handle
    }

    fn append(&self, handle: &AuditHandle, line: &str) {
        info!(rule = %handle.rule, run = %handle.run_id, "{line}");
    }
}

/// Writes one text file per run: `<rule>_<yyyy-MM-dd_HHmmssfff>_<seq>.txt`.
///
/// Run files are created exclusively, so sinks in separate processes sharing a
/// directory never interleave into the same file.
#[derive(Debug)]
pub struct FileAuditLog {
    directory: PathBuf,
    sequence: AtomicU64,
}

impl FileAuditLog {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn path_for(&self, handle: &AuditHandle) -> PathBuf {
        self.directory.join(format!("{}.txt", handle.run_id))
    }

    fn create_run_file(&self, handle: &AuditHandle, header: &str) -> io::Result<()> {
        fs::create_dir_all(&self.directory)?;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path_for(handle))?;
        writeln!(file, "{header}")
    }

    fn write_line(&self, handle: &AuditHandle, line: &str) {
        let path = self.path_for(handle);
        let result = fs::create_dir_all(&self.directory).and_then(|_| {
            let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
            writeln!(file, "{line}")
        });

        if let Err(err) = result {
            warn!(path = %path.display(), error = %err, "audit log write failed");
        }
    }
}

impl AuditLog for FileAuditLog {
    fn start_run(&self, rule_name: &str) -> AuditHandle {
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let header = format!("[{stamp}] === PROCESS START ===");

        let mut handle = next_handle(&self.sequence, rule_name);
        for _ in 0..FILE_CLAIM_ATTEMPTS {
            match self.create_run_file(&handle, &header) {
                Ok(()) => {
                    debug!(path = %self.path_for(&handle).display(), "audit log opened");
                    return handle;
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    handle = next_handle(&self.sequence, rule_name);
                }
                Err(err) => {
                    warn!(path = %self.path_for(&handle).display(), error = %err, "audit log create failed");
                    return handle;
                }
            }
        }

        warn!(path = %self.path_for(&handle).display(), "no unused audit file name, appending");
        self.write_line(&handle, &header);
        handle
    }

    fn append(&self, handle: &AuditHandle, line: &str) {
        let stamp = Local::now().format("%H:%M:%S%.3f");
        self.write_line(handle, &format!("[{stamp}] {line}"));
    }
}

/// Keeps every run's lines in memory; used by the CLI replay and tests.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    sequence: AtomicU64,
    runs: Mutex<BTreeMap<AuditHandle, Vec<String>>>,
}

impl InMemoryAuditLog {
    pub fn lines(&self, handle: &AuditHandle) -> Vec<String> {
        self.runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(handle)
            .cloned()
            .unwrap_or_default()
    }

    pub fn handles(&self) -> Vec<AuditHandle> {
        self.runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Lines of the most recently started run for `rule_name`.
    pub fn last_run(&self, rule_name: &str) -> Vec<String> {
        let runs = self.runs.lock().unwrap_or_else(PoisonError::into_inner);
        runs.iter()
            .filter(|(handle, _)| handle.rule == rule_name)
            .max_by_key(|(handle, _)| handle.sequence)
            .map(|(_, lines)| lines.clone())
            .unwrap_or_default()
    }
}

impl AuditLog for InMemoryAuditLog {
    fn start_run(&self, rule_name: &str) -> AuditHandle {
        let handle = next_handle(&self.sequence, rule_name);
        self.runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle.clone(), vec!["=== PROCESS START ===".to_string()]);
        handle
    }

    fn append(&self, handle: &AuditHandle, line: &str) {
        self.runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(handle.clone())
            .or_default()
            .push(line.to_string());
    }
}
