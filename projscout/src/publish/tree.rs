use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, trace};

use super::SearchEvent;
use crate::metrics::SessionStats;
use crate::results::ProjectBatch;
use crate::search::session::{SessionId, SessionOutcome};

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Project {
        project_id: String,
    },
    File {
        file_name: String,
        file_path: PathBuf,
    },
    Match {
        file_path: PathBuf,
        line_number: usize,
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub label: String,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Where the editor should jump when a node is activated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigateTo {
    pub file_path: PathBuf,
    /// `None` opens the file without moving to a line
    pub line_number: Option<usize>,
}

/// Project → File → Match hierarchy shown in the results view.
///
/// Built only on the presentation thread, from the events of the most
/// recent session. Events tagged with an older session id are ignored.
#[derive(Debug, Clone, Default)]
pub struct ResultTree {
    nodes: Vec<TreeNode>,
    roots: Vec<NodeId>,
    projects: HashMap<String, NodeId>,
    session: Option<SessionId>,
    outcome: Option<SessionOutcome>,
    stats: Option<SessionStats>,
}

impl ResultTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.roots.clear();
        self.projects.clear();
        self.outcome = None;
        self.stats = None;
    }

    pub fn apply(&mut self, event: SearchEvent) {
        match event {
            SearchEvent::Started { session } => {
                debug!("Session {} started, clearing results", session);
                self.clear();
                self.session = Some(session);
            }
            SearchEvent::Batch { session, batch } => {
                if self.session == Some(session) {
                    self.add_batch(batch);
                } else {
                    trace!("Ignoring batch from stale session {}", session);
                }
            }
            SearchEvent::Finished {
                session,
                outcome,
                stats,
            } => {
                if self.session == Some(session) {
                    self.outcome = Some(outcome);
                    self.stats = Some(stats);
                }
            }
        }
    }

    /// Appends a batch, reusing the project node when one already exists.
    pub fn add_batch(&mut self, batch: ProjectBatch) {
        let project_node = match self.projects.get(&batch.project_id) {
            Some(&id) => id,
            None => {
                let id = self.push(
                    None,
                    batch.project_id.clone(),
                    NodeKind::Project {
                        project_id: batch.project_id.clone(),
                    },
                );
                self.roots.push(id);
                self.projects.insert(batch.project_id.clone(), id);
                id
            }
        };

        for file in batch.files {
            let file_node = self.push(
                Some(project_node),
                file.file_name.clone(),
                NodeKind::File {
                    file_name: file.file_name,
                    file_path: file.file_path,
                },
            );
            for result in file.results {
                self.push(
                    Some(file_node),
                    format!("{}: {}", result.line_number, result.text),
                    NodeKind::Match {
                        file_path: result.file_path,
                        line_number: result.line_number,
                        text: result.text,
                    },
                );
            }
        }
    }

    fn push(&mut self, parent: Option<NodeId>, label: String, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(TreeNode {
            label,
            kind,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent].children.push(id);
        }
        id
    }

    /// Navigation target for a node; project nodes and files with children
    /// are containers only.
    pub fn activate(&self, node: NodeId) -> Option<NavigateTo> {
        let node = self.nodes.get(node)?;
        match &node.kind {
            NodeKind::Project { .. } => None,
            NodeKind::File { file_path, .. } if node.children.is_empty() => Some(NavigateTo {
                file_path: file_path.clone(),
                line_number: None,
            }),
            NodeKind::File { .. } => None,
            NodeKind::Match {
                file_path,
                line_number,
                ..
            } => Some(NavigateTo {
                file_path: file_path.clone(),
                line_number: Some(*line_number),
            }),
        }
    }

    /// Orders every file's match leaves by line number
    pub fn sort_matches_by_line(&mut self) {
        for index in 0..self.nodes.len() {
            if !matches!(self.nodes[index].kind, NodeKind::File { .. }) {
                continue;
            }
            let mut children = std::mem::take(&mut self.nodes[index].children);
            children.sort_by_key(|&child| match self.nodes[child].kind {
                NodeKind::Match { line_number, .. } => line_number,
                _ => usize::MAX,
            });
            self.nodes[index].children = children;
        }
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn project_node(&self, project_id: &str) -> Option<NodeId> {
        self.projects.get(project_id).copied()
    }

    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn outcome(&self) -> Option<SessionOutcome> {
        self.outcome
    }

    pub fn stats(&self) -> Option<SessionStats> {
        self.stats
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn project_count(&self) -> usize {
        self.roots.len()
    }

    pub fn file_count(&self) -> usize {
        self.count(|kind| matches!(kind, NodeKind::File { .. }))
    }

    pub fn match_count(&self) -> usize {
        self.count(|kind| matches!(kind, NodeKind::Match { .. }))
    }

    fn count(&self, pred: impl Fn(&NodeKind) -> bool) -> usize {
        self.nodes.iter().filter(|node| pred(&node.kind)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{LineMatch, SearchFile};
    use std::path::Path;

    fn hit(path: &str, lines: &[(usize, &str)]) -> SearchFile {
        SearchFile::with_results(
            Path::new(path),
            lines
                .iter()
                .map(|(n, text)| LineMatch {
                    file_path: PathBuf::from(path),
                    line_number: *n,
                    text: text.to_string(),
                })
                .collect(),
        )
    }

    #[test]
    fn test_tree_shape_and_labels() {
        let mut tree = ResultTree::new();
        tree.add_batch(ProjectBatch::new(
            "core",
            vec![
                hit("/p/foo.txt", &[(3, "Hello World")]),
                SearchFile::name_only(Path::new("/p/A.java")),
            ],
        ));

        assert_eq!(tree.project_count(), 1);
        let project = tree.roots()[0];
        assert_eq!(tree.node(project).unwrap().label, "core");

        let files = tree.children(project);
        assert_eq!(files.len(), 2);
        assert_eq!(tree.node(files[0]).unwrap().label, "foo.txt");
        let leaf = tree.children(files[0])[0];
        assert_eq!(tree.node(leaf).unwrap().label, "3: Hello World");
        assert!(tree.children(files[1]).is_empty());
    }

    #[test]
    fn test_activate_targets() {
        let mut tree = ResultTree::new();
        tree.add_batch(ProjectBatch::new(
            "core",
            vec![
                hit("/p/foo.txt", &[(3, "Hello World")]),
                SearchFile::name_only(Path::new("/p/A.java")),
            ],
        ));
        let project = tree.roots()[0];
        let files = tree.children(project).to_vec();
        let leaf = tree.children(files[0])[0];

        assert_eq!(tree.activate(project), None);
        assert_eq!(tree.activate(files[0]), None);
        assert_eq!(
            tree.activate(leaf),
            Some(NavigateTo {
                file_path: PathBuf::from("/p/foo.txt"),
                line_number: Some(3),
            })
        );
        assert_eq!(
            tree.activate(files[1]),
            Some(NavigateTo {
                file_path: PathBuf::from("/p/A.java"),
                line_number: None,
            })
        );
        assert_eq!(tree.activate(999), None);
    }

    #[test]
    fn test_project_node_is_reused() {
        let mut tree = ResultTree::new();
        tree.add_batch(ProjectBatch::new("core", vec![hit("/p/a.txt", &[(1, "x")])]));
        tree.add_batch(ProjectBatch::new("core", vec![hit("/p/b.txt", &[(2, "y")])]));
        assert_eq!(tree.project_count(), 1);
        assert_eq!(tree.children(tree.roots()[0]).len(), 2);
        assert_eq!(tree.match_count(), 2);
    }

    #[test]
    fn test_started_clears_and_stale_events_are_ignored() {
        let mut tree = ResultTree::new();
        tree.apply(SearchEvent::Started { session: 1 });
        tree.apply(SearchEvent::Batch {
            session: 1,
            batch: ProjectBatch::new("old", vec![hit("/p/a.txt", &[(1, "x")])]),
        });
        assert_eq!(tree.file_count(), 1);

        tree.apply(SearchEvent::Started { session: 2 });
        assert!(tree.is_empty());
        tree.apply(SearchEvent::Batch {
            session: 1,
            batch: ProjectBatch::new("old", vec![hit("/p/b.txt", &[(1, "x")])]),
        });
        assert!(tree.is_empty());

        tree.apply(SearchEvent::Finished {
            session: 2,
            outcome: SessionOutcome::Cancelled,
            stats: SessionStats::default(),
        });
        assert!(tree.is_finished());
        assert_eq!(tree.outcome(), Some(SessionOutcome::Cancelled));
    }

    #[test]
    fn test_sort_matches_by_line() {
        let mut tree = ResultTree::new();
        tree.add_batch(ProjectBatch::new(
            "core",
            vec![hit("/p/a.txt", &[(9, "c"), (2, "a"), (5, "b")])],
        ));
        tree.sort_matches_by_line();
        let file = tree.children(tree.roots()[0])[0];
        let labels: Vec<_> = tree
            .children(file)
            .iter()
            .map(|&id| tree.node(id).unwrap().label.clone())
            .collect();
        assert_eq!(labels, vec!["2: a", "5: b", "9: c"]);
    }
}
