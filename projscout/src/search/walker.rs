use ignore::WalkBuilder;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

use super::processor::FileProcessor;
use crate::errors::{SearchError, SearchResult};
use crate::filters::ExclusionRules;
use crate::results::SearchFile;

/// Walks `root` depth-first and hands every eligible file to the processor.
///
/// Excluded directories are pruned before they are entered and symlinks are
/// never followed. Entries inside a directory are visited in file-name order.
/// A root that is missing or cannot be listed produces an empty list; the
/// only error is [`SearchError::Cancelled`].
pub fn walk(
    root: &Path,
    processor: &FileProcessor,
    rules: &Arc<ExclusionRules>,
    cancel: &AtomicBool,
) -> SearchResult<Vec<SearchFile>> {
    let metrics = processor.metrics().clone();

    if !root_is_readable(root) {
        debug!("Root is missing or unreadable: {}", root.display());
        metrics.record_root_unreadable();
        return Ok(Vec::new());
    }

    let filter_rules = Arc::clone(rules);
    let filter_metrics = metrics.clone();
    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            // The root itself is never pruned, even if its name is excluded.
            if entry.depth() == 0 || !entry.file_type().is_some_and(|ft| ft.is_dir()) {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            if filter_rules.should_skip_dir(&name) {
                trace!("Pruning excluded directory: {}", entry.path().display());
                filter_metrics.record_dir_excluded();
                return false;
            }
            true
        });

    let mut files = Vec::new();
    for entry in builder.build() {
        if cancel.load(Ordering::Relaxed) {
            debug!("Walk of {} cancelled", root.display());
            return Err(SearchError::Cancelled);
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };

        let Some(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            metrics.record_dir_visited();
            continue;
        }
        if !file_type.is_file() {
            trace!("Skipping non-regular entry: {}", entry.path().display());
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if rules.should_skip_file(&name) {
            trace!("Skipping excluded file: {}", entry.path().display());
            metrics.record_file_excluded();
            continue;
        }

        trace!("Processing file: {}", entry.path().display());
        if let Some(hit) = processor.process_file(entry.path(), cancel)? {
            files.push(hit);
        }
    }

    debug!("Walk of {} produced {} files", root.display(), files.len());
    Ok(files)
}

fn root_is_readable(root: &Path) -> bool {
    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => fs::read_dir(root).is_ok(),
        Ok(meta) => meta.is_file(),
        Err(_) => false,
    }
}
