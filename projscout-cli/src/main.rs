use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use projscout::{
    config::ConfigOverrides,
    publish::{channel, EventReceiver, NodeKind, ResultTree, SearchEvent},
    ConfigProvider, EncodingMode, FileConfigProvider, Project, ProjectList, SearchQuery,
    SearchScope, SearchSession, SessionOutcome, SessionStats,
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
struct CliSearchConfig {
    /// Text to look for inside files (`*` and `?` are wildcards)
    #[arg(short = 'c', long = "content")]
    content: Option<String>,

    /// Text to look for in file names (`*` and `?` are wildcards)
    #[arg(short = 'n', long = "name")]
    name: Option<String>,

    /// Match case exactly instead of ignoring it
    #[arg(long)]
    match_case: bool,

    /// The name pattern must match the whole file name
    #[arg(long)]
    exact_name: bool,

    /// Project to search, as ID=PATH (can be specified multiple times)
    #[arg(short = 'p', long = "project")]
    projects: Vec<String>,

    /// Only search these paths, separated by ';'
    #[arg(long)]
    selection: Option<String>,

    /// Configuration file to load on top of the default locations
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory names to skip, separated by ',' (overrides the config file)
    #[arg(long)]
    exclude_dirs: Option<String>,

    /// File suffixes to skip, separated by ',' (overrides the config file)
    #[arg(long)]
    exclude_types: Option<String>,

    /// How to handle invalid UTF-8 sequences (failfast|lossy)
    #[arg(long)]
    encoding: Option<String>,

    /// Print one JSON object per project batch
    #[arg(long)]
    json: bool,

    /// Print traversal statistics when the search ends
    #[arg(short, long)]
    stats: bool,

    /// Log level (trace|debug|info|warn|error); RUST_LOG takes precedence
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search file names and contents across one or more projects
    Search(Box<CliSearchConfig>),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Search(config) => run_search(*config),
    }
}

fn run_search(config: CliSearchConfig) -> Result<()> {
    let overrides = ConfigOverrides {
        excluded_dirs: config.exclude_dirs.clone(),
        excluded_file_types: config.exclude_types.clone(),
        encoding_mode: config.encoding.as_deref().map(EncodingMode::parse_lenient),
        log_level: config.log_level.clone(),
    };
    let provider = FileConfigProvider::new(config.config.clone()).with_overrides(overrides);
    init_logging(&provider.snapshot().log_level);

    let cwd = std::env::current_dir().context("Cannot determine the current directory")?;
    let registry = build_registry(&config.projects, &cwd)?;

    let scope = match config.selection.as_deref().map(SearchScope::from_selection) {
        Some(SearchScope::ExplicitPaths(paths)) => SearchScope::ExplicitPaths(
            paths.into_iter().map(|p| absolutize(&p, &cwd)).collect(),
        ),
        _ => SearchScope::AllProjects,
    };
    let query = SearchQuery::new(config.content, config.name, config.match_case, scope)
        .with_exact_name(config.exact_name);

    let (publisher, receiver) = channel();
    let session = SearchSession::new(Arc::new(registry), Arc::new(provider), publisher);

    let started = Instant::now();
    session.start(query)?;
    let (tree, outcome, stats) = drain_session(&receiver, config.json)?;
    session.wait();
    let elapsed = started.elapsed();

    if !config.json {
        print_tree(&tree);
    }
    if config.stats {
        print_stats(&stats, elapsed, config.json)?;
    }
    if outcome == SessionOutcome::Cancelled {
        eprintln!("{}", "Search cancelled".yellow());
    }
    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_registry(specs: &[String], cwd: &Path) -> Result<ProjectList> {
    if specs.is_empty() {
        let id = cwd
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| cwd.display().to_string());
        return Ok(ProjectList::new(vec![Project::new(id, cwd)]));
    }

    let mut registry = ProjectList::default();
    for spec in specs {
        let Some((id, path)) = spec.split_once('=') else {
            bail!("Invalid project '{}': expected ID=PATH", spec);
        };
        if id.trim().is_empty() || path.trim().is_empty() {
            bail!("Invalid project '{}': expected ID=PATH", spec);
        }
        let root = absolutize(Path::new(path.trim()), cwd);
        debug!("Registered project {} at {}", id.trim(), root.display());
        registry.add(Project::new(id.trim(), root));
    }
    Ok(registry)
}

fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };
    // Drops `.` components so `-p main=.` prefixes selections cleanly.
    joined.components().collect()
}

/// Pumps events into a tree until the session reports it has finished.
fn drain_session(
    receiver: &EventReceiver,
    json: bool,
) -> Result<(ResultTree, SessionOutcome, SessionStats)> {
    let mut tree = ResultTree::new();
    loop {
        let Some(event) = receiver.recv_timeout(POLL_INTERVAL) else {
            continue;
        };
        if json {
            if let SearchEvent::Batch { batch, .. } = &event {
                println!("{}", serde_json::to_string(batch)?);
            }
        }
        let finished = match &event {
            SearchEvent::Finished { outcome, stats, .. } => Some((*outcome, *stats)),
            _ => None,
        };
        tree.apply(event);
        if let Some((outcome, stats)) = finished {
            return Ok((tree, outcome, stats));
        }
    }
}

fn print_tree(tree: &ResultTree) {
    for &project in tree.roots() {
        let Some(node) = tree.node(project) else {
            continue;
        };
        println!("{}", node.label.bold());
        for &file in tree.children(project) {
            let Some(NodeKind::File { file_path, .. }) = tree.node(file).map(|n| &n.kind) else {
                continue;
            };
            println!("\n{}", file_path.display().to_string().blue());
            for &leaf in tree.children(file) {
                if let Some(NodeKind::Match {
                    line_number, text, ..
                }) = tree.node(leaf).map(|n| &n.kind)
                {
                    println!("{}: {}", line_number.to_string().green(), text);
                }
            }
        }
        println!();
    }

    println!(
        "Found {} matches in {} files",
        tree.match_count(),
        tree.file_count()
    );
}

fn print_stats(stats: &SessionStats, elapsed: Duration, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(stats)?);
        return Ok(());
    }
    // Millisecond precision is enough for a summary line.
    let elapsed = Duration::from_millis(elapsed.as_millis() as u64);
    println!(
        "Scanned {} files in {} directories ({} dirs and {} files excluded, {} unreadable) in {}",
        stats.files_scanned,
        stats.dirs_visited,
        stats.dirs_excluded,
        stats.files_excluded,
        stats.files_unreadable,
        humantime::format_duration(elapsed)
    );
    Ok(())
}
