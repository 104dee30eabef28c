use std::collections::BTreeSet;
use std::path::PathBuf;

/// Separator between paths in an explicit selection string
pub const SELECTION_SEPARATOR: char = ';';

/// Which project roots a search covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchScope {
    AllProjects,
    /// Only the selected paths, each grouped under the project that owns it
    ExplicitPaths(BTreeSet<PathBuf>),
}

impl SearchScope {
    /// Parses a semicolon-joined selection. An empty selection means every project.
    pub fn from_selection(raw: &str) -> Self {
        let paths: BTreeSet<PathBuf> = raw
            .split(SELECTION_SEPARATOR)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .collect();

        if paths.is_empty() {
            SearchScope::AllProjects
        } else {
            SearchScope::ExplicitPaths(paths)
        }
    }
}

/// A single search request, built from the dialog fields at "Find" time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub content_text: Option<String>,
    pub file_name_text: Option<String>,
    pub match_case: bool,
    /// Match the whole file name instead of any part of it
    pub exact_name: bool,
    pub scope: SearchScope,
}

impl SearchQuery {
    /// Blank text fields are normalised to `None`.
    pub fn new(
        content_text: Option<String>,
        file_name_text: Option<String>,
        match_case: bool,
        scope: SearchScope,
    ) -> Self {
        Self {
            content_text: content_text.filter(|t| !t.trim().is_empty()),
            file_name_text: file_name_text.filter(|t| !t.trim().is_empty()),
            match_case,
            exact_name: false,
            scope,
        }
    }

    pub fn with_exact_name(mut self, exact_name: bool) -> Self {
        self.exact_name = exact_name;
        self
    }

    /// Builds a query from raw UI field values.
    pub fn from_fields(
        content_text: &str,
        file_name_text: &str,
        match_case: bool,
        selection: Option<&str>,
    ) -> Self {
        let scope = selection
            .map(SearchScope::from_selection)
            .unwrap_or(SearchScope::AllProjects);
        Self::new(
            Some(content_text.to_string()),
            Some(file_name_text.to_string()),
            match_case,
            scope,
        )
    }

    /// True when neither axis constrains anything
    pub fn is_empty(&self) -> bool {
        self.content_text.is_none() && self.file_name_text.is_none()
    }
}
