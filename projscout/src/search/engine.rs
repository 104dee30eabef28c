use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use super::matcher::{compile, WrapStyle};
use super::processor::FileProcessor;
use super::walker::walk;
use crate::config::ConfigProvider;
use crate::errors::{SearchError, SearchResult};
use crate::filters::ExclusionRules;
use crate::metrics::SearchMetrics;
use crate::project::{Project, ProjectRegistry};
use crate::query::{SearchQuery, SearchScope};
use crate::results::ProjectBatch;

/// Picks the projects a session walks, in registry order.
///
/// `ExplicitPaths` keeps every project whose root is a prefix of at least one
/// selected path; each kept project is still walked from its root. Paths
/// outside every project select nothing.
pub fn resolve_scope(scope: &SearchScope, registry: &dyn ProjectRegistry) -> Vec<Project> {
    let projects = registry.projects();
    let selection = match scope {
        SearchScope::AllProjects => return projects,
        SearchScope::ExplicitPaths(paths) => paths,
    };

    for path in selection {
        if !projects.iter().any(|project| path.starts_with(&project.root)) {
            debug!("Selected path is outside every project: {}", path.display());
        }
    }

    projects
        .into_iter()
        .filter(|project| selection.iter().any(|path| path.starts_with(&project.root)))
        .collect()
}

/// Runs one search on the calling thread, handing each non-empty project
/// batch to `on_batch` as soon as that project is done.
///
/// Returns `Err(SearchError::Cancelled)` once `cancel` is observed; the batch
/// being built at that moment is dropped.
pub fn run<F>(
    query: &SearchQuery,
    registry: &dyn ProjectRegistry,
    config: &dyn ConfigProvider,
    cancel: &AtomicBool,
    metrics: &SearchMetrics,
    mut on_batch: F,
) -> SearchResult<()>
where
    F: FnMut(ProjectBatch),
{
    if query.is_empty() {
        debug!("No search patterns provided, nothing to do");
        return Ok(());
    }

    let settings = config.snapshot();
    let rules = Arc::new(ExclusionRules::from_lists(&settings.exclusion_lists()));
    let name_wrap = if query.exact_name {
        WrapStyle::Exact
    } else {
        WrapStyle::Contains
    };
    let processor = FileProcessor::new(
        query
            .content_text
            .as_deref()
            .and_then(|text| compile(text, query.match_case, WrapStyle::Contains)),
        query
            .file_name_text
            .as_deref()
            .and_then(|text| compile(text, query.match_case, name_wrap)),
        settings.encoding_mode,
        metrics.clone(),
    );

    let roots = resolve_scope(&query.scope, registry);
    info!(
        "Starting search over {} projects (content: {:?}, name: {:?}, match case: {})",
        roots.len(),
        query.content_text,
        query.file_name_text,
        query.match_case
    );

    for project in roots {
        if cancel.load(Ordering::Relaxed) {
            return Err(SearchError::Cancelled);
        }

        debug!("Searching project {} at {}", project.id, project.root.display());
        let files = walk(&project.root, &processor, &rules, cancel)?;
        if files.is_empty() {
            debug!("No hits in project {}", project.id);
            continue;
        }
        debug!("Publishing {} files for project {}", files.len(), project.id);
        on_batch(ProjectBatch::new(project.id, files));
    }

    Ok(())
}

/// Blocking search that collects every batch.
pub fn search(
    query: &SearchQuery,
    registry: &dyn ProjectRegistry,
    config: &dyn ConfigProvider,
) -> SearchResult<Vec<ProjectBatch>> {
    let metrics = SearchMetrics::new();
    let mut batches = Vec::new();
    run(
        query,
        registry,
        config,
        &AtomicBool::new(false),
        &metrics,
        |batch| batches.push(batch),
    )?;
    metrics.log_stats();
    Ok(batches)
}
