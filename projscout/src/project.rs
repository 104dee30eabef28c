use serde::Serialize;
use std::path::{Path, PathBuf};

/// A top-level source folder registered with the editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub id: String,
    pub root: PathBuf,
}

impl Project {
    pub fn new(id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            root: root.into(),
        }
    }
}

/// The set of open projects, as seen by a search session.
pub trait ProjectRegistry: Send + Sync {
    /// Open projects in display order
    fn projects(&self) -> Vec<Project>;

    /// The project whose root is the longest component-wise prefix of `path`
    fn project_for_path(&self, path: &Path) -> Option<Project> {
        self.projects()
            .into_iter()
            .filter(|project| path.starts_with(&project.root))
            .max_by_key(|project| project.root.components().count())
    }
}

/// In-memory registry
#[derive(Debug, Clone, Default)]
pub struct ProjectList {
    projects: Vec<Project>,
}

impl ProjectList {
    pub fn new(projects: Vec<Project>) -> Self {
        Self { projects }
    }

    pub fn add(&mut self, project: Project) {
        self.projects.push(project);
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

impl ProjectRegistry for ProjectList {
    fn projects(&self) -> Vec<Project> {
        self.projects.clone()
    }
}
