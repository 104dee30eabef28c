/// Result values produced by the worker thread.
///
/// Everything here is plain owned data. A finished [`ProjectBatch`] is moved
/// through the publish channel to the presentation thread, and the worker
/// keeps no reference to it afterwards.
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One matching line in a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineMatch {
    pub file_path: PathBuf,
    /// 1-based, in the order lines were read
    pub line_number: usize,
    /// The line with surrounding whitespace removed
    pub text: String,
}

/// A file that satisfied the query.
///
/// `results` is empty for a name-only hit (no content pattern was given).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchFile {
    pub file_name: String,
    pub file_path: PathBuf,
    pub results: Vec<LineMatch>,
}

impl SearchFile {
    pub fn name_only(path: &Path) -> Self {
        Self {
            file_name: file_name_of(path),
            file_path: path.to_path_buf(),
            results: Vec::new(),
        }
    }

    pub fn with_results(path: &Path, results: Vec<LineMatch>) -> Self {
        Self {
            file_name: file_name_of(path),
            file_path: path.to_path_buf(),
            results,
        }
    }

    pub fn is_name_only(&self) -> bool {
        self.results.is_empty()
    }
}

/// Everything found under one project, published as a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectBatch {
    pub project_id: String,
    pub files: Vec<SearchFile>,
}

impl ProjectBatch {
    pub fn new(project_id: impl Into<String>, files: Vec<SearchFile>) -> Self {
        Self {
            project_id: project_id.into(),
            files,
        }
    }

    pub fn total_matches(&self) -> usize {
        self.files.iter().map(|f| f.results.len()).sum()
    }
}

/// Lossy basename of `path`, or the whole path when it has none
pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(path: &str, n: usize, text: &str) -> LineMatch {
        LineMatch {
            file_path: PathBuf::from(path),
            line_number: n,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_search_file_constructors() {
        let hit = SearchFile::name_only(Path::new("src/A.java"));
        assert_eq!(hit.file_name, "A.java");
        assert_eq!(hit.file_path, PathBuf::from("src/A.java"));
        assert!(hit.is_name_only());

        let hit = SearchFile::with_results(
            Path::new("src/foo.txt"),
            vec![line("src/foo.txt", 3, "Hello World")],
        );
        assert_eq!(hit.file_name, "foo.txt");
        assert!(!hit.is_name_only());
    }

    #[test]
    fn test_batch_total_matches() {
        let batch = ProjectBatch::new(
            "core",
            vec![
                SearchFile::with_results(
                    Path::new("a.rs"),
                    vec![line("a.rs", 1, "x"), line("a.rs", 4, "y")],
                ),
                SearchFile::name_only(Path::new("b.rs")),
            ],
        );
        assert_eq!(batch.project_id, "core");
        assert_eq!(batch.total_matches(), 2);
    }

    #[test]
    fn test_batch_serializes() {
        let batch = ProjectBatch::new("p", vec![SearchFile::name_only(Path::new("x.txt"))]);
        let json = serde_json::to_string(&batch).unwrap();
        assert!(json.contains("\"project_id\":\"p\""));
        assert!(json.contains("\"file_name\":\"x.txt\""));
    }
}
