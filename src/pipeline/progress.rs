//! Line-oriented progress output.

use std::{
    io::{self, Write},
    sync::Mutex,
};
use tracing::debug;

/// Receives per-blob progress from the migration.
pub trait ProgressObserver: Send + Sync {
    /// A poll found the copy still pending. `total_bytes` is 0 when unknown.
    fn copy_progress(&self, name: &str, bytes_copied: u64, total_bytes: u64);

    fn copy_completed(&self, name: &str);

    fn copy_failed(&self, name: &str, reason: &str);

    fn reclaim_failed(&self, name: &str, reason: &str);
}

/// Writes one human-readable line per event.
///
/// ```text
/// Blob: 2023/06/b.bin, Copied: 1048576 of 4194304
/// Blob: 2023/06/b.bin Complete
/// ```
pub struct LineProgress<W: Write + Send> {
    out: Mutex<W>,
}

impl LineProgress<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> LineProgress<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn line(&self, args: std::fmt::Arguments<'_>) {
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(err) = writeln!(out, "{args}").and_then(|_| out.flush()) {
            debug!("failed to write progress line: {}", err);
        }
    }
}

impl<W: Write + Send> ProgressObserver for LineProgress<W> {
    fn copy_progress(&self, name: &str, bytes_copied: u64, total_bytes: u64) {
        self.line(format_args!(
            "Blob: {name}, Copied: {bytes_copied} of {total_bytes}"
        ));
    }

    fn copy_completed(&self, name: &str) {
        self.line(format_args!("Blob: {name} Complete"));
    }

    fn copy_failed(&self, name: &str, reason: &str) {
        self.line(format_args!("Blob: {name} Failed: {reason}"));
    }

    fn reclaim_failed(&self, name: &str, reason: &str) {
        self.line(format_args!("Blob: {name} Source delete failed: {reason}"));
    }
}
