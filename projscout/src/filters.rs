/// Exclusion rules consulted by the directory walker.
///
/// Both rule sets come from plain delimiter-separated strings. Directory
/// exclusion is an exact match on the bare directory name, so `target`
/// excludes `a/target` and `b/c/target` but never `targets` or a file named
/// `target`. File exclusion is a suffix test on the file name, so `.o`
/// excludes `main.o` and `.class` excludes `Foo.class`. Neither check uses
/// wildcards.
use std::collections::HashSet;
use tracing::debug;

use crate::config::ExclusionLists;

/// Separators accepted between entries of an exclusion list
const DELIMITERS: &[char] = &[',', ';'];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionRules {
    excluded_dir_names: HashSet<String>,
    excluded_file_suffixes: Vec<String>,
}

impl ExclusionRules {
    /// Builds rules from the two raw configuration strings.
    ///
    /// Blank entries are dropped, so an empty or malformed list simply
    /// excludes nothing.
    pub fn parse(excluded_dirs: &str, excluded_file_types: &str) -> Self {
        let excluded_dir_names: HashSet<String> = split_list(excluded_dirs).collect();

        let mut excluded_file_suffixes: Vec<String> = Vec::new();
        for suffix in split_list(excluded_file_types) {
            if !excluded_file_suffixes.contains(&suffix) {
                excluded_file_suffixes.push(suffix);
            }
        }

        debug!(
            "Exclusion rules: {} directory names, {} file suffixes",
            excluded_dir_names.len(),
            excluded_file_suffixes.len()
        );

        Self {
            excluded_dir_names,
            excluded_file_suffixes,
        }
    }

    pub fn from_lists(lists: &ExclusionLists) -> Self {
        Self::parse(&lists.excluded_dirs, &lists.excluded_file_types)
    }

    /// Rules that exclude nothing
    pub fn none() -> Self {
        Self::default()
    }

    /// Checks a bare directory name (not a path) against the excluded names
    pub fn should_skip_dir(&self, name: &str) -> bool {
        self.excluded_dir_names.contains(name)
    }

    /// Checks a file name against the excluded suffixes
    pub fn should_skip_file(&self, name: &str) -> bool {
        self.excluded_file_suffixes
            .iter()
            .any(|suffix| name.ends_with(suffix.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.excluded_dir_names.is_empty() && self.excluded_file_suffixes.is_empty()
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(DELIMITERS)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
}
