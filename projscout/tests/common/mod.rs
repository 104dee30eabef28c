#![allow(dead_code)]

use anyhow::Result;
use projscout::publish::{EventReceiver, SearchEvent};
use projscout::{ProjectBatch, SessionOutcome, SessionStats};
use std::fs;
use std::path::Path;
use std::sync::Once;
use std::time::Duration;

static LOGGING_INIT: Once = Once::new();

/// Installs a test-writer subscriber once per test binary; `RUST_LOG` picks the level.
pub fn setup_test_logging() {
    LOGGING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Writes `(relative path, content)` pairs under `root`, creating parent directories.
pub fn create_test_files(root: impl AsRef<Path>, files: &[(&str, &str)]) -> Result<()> {
    for (relative, content) in files {
        let path = root.as_ref().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
    }
    Ok(())
}

/// Everything one session sent, in arrival order
#[derive(Debug)]
pub struct Collected {
    pub batches: Vec<ProjectBatch>,
    pub outcome: SessionOutcome,
    pub stats: SessionStats,
}

/// Reads events until `Finished`, panicking if it takes longer than a few seconds.
pub fn collect_session(receiver: &EventReceiver) -> Collected {
    let mut batches = Vec::new();
    loop {
        match receiver.recv_timeout(Duration::from_secs(10)) {
            Some(SearchEvent::Started { .. }) => {}
            Some(SearchEvent::Batch { batch, .. }) => batches.push(batch),
            Some(SearchEvent::Finished { outcome, stats, .. }) => {
                return Collected {
                    batches,
                    outcome,
                    stats,
                }
            }
            None => panic!("session did not finish in time"),
        }
    }
}

/// Sorted basenames across all batches
pub fn file_names(batches: &[ProjectBatch]) -> Vec<String> {
    let mut names: Vec<String> = batches
        .iter()
        .flat_map(|b| b.files.iter().map(|f| f.file_name.clone()))
        .collect();
    names.sort();
    names
}
