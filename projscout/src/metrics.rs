use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Counters collected while a session walks and scans.
///
/// Cloning shares the counters; the walker, the scanner and the session all
/// hold a handle to the same set.
#[derive(Debug, Clone, Default)]
pub struct SearchMetrics {
    dirs_visited: Arc<AtomicU64>,
    dirs_excluded: Arc<AtomicU64>,
    files_excluded: Arc<AtomicU64>,
    files_scanned: Arc<AtomicU64>,
    files_unreadable: Arc<AtomicU64>,
    files_matched: Arc<AtomicU64>,
    lines_matched: Arc<AtomicU64>,
    roots_unreadable: Arc<AtomicU64>,
}

impl SearchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_dir_visited(&self) {
        self.dirs_visited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dir_excluded(&self) {
        self.dirs_excluded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file_excluded(&self) {
        self.files_excluded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file_scanned(&self) {
        self.files_scanned.fetch_add(1, Ordering::Relaxed);
    }

    /// Soft per-file failure: permission, I/O or decoding
    pub fn record_file_unreadable(&self) {
        self.files_unreadable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file_matched(&self, lines: usize) {
        self.files_matched.fetch_add(1, Ordering::Relaxed);
        self.lines_matched
            .fetch_add(lines as u64, Ordering::Relaxed);
    }

    /// Soft per-root failure: the root is missing or cannot be listed
    pub fn record_root_unreadable(&self) {
        self.roots_unreadable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> SessionStats {
        SessionStats {
            dirs_visited: self.dirs_visited.load(Ordering::Relaxed),
            dirs_excluded: self.dirs_excluded.load(Ordering::Relaxed),
            files_excluded: self.files_excluded.load(Ordering::Relaxed),
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            files_unreadable: self.files_unreadable.load(Ordering::Relaxed),
            files_matched: self.files_matched.load(Ordering::Relaxed),
            lines_matched: self.lines_matched.load(Ordering::Relaxed),
            roots_unreadable: self.roots_unreadable.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Search stats:\n\
             Directories visited/excluded: {}/{}\n\
             Files scanned/excluded/unreadable: {}/{}/{}\n\
             Files matched: {}, lines matched: {}\n\
             Unreadable roots: {}",
            stats.dirs_visited,
            stats.dirs_excluded,
            stats.files_scanned,
            stats.files_excluded,
            stats.files_unreadable,
            stats.files_matched,
            stats.lines_matched,
            stats.roots_unreadable
        );
    }
}

/// Snapshot of [`SearchMetrics`] delivered when a session finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub dirs_visited: u64,
    pub dirs_excluded: u64,
    pub files_excluded: u64,
    pub files_scanned: u64,
    pub files_unreadable: u64,
    pub files_matched: u64,
    pub lines_matched: u64,
    pub roots_unreadable: u64,
}
