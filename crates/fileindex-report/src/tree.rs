//! Directory tree derived from report paths.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::is_separator;

use itertools::{Itertools, Position};
use serde::{Deserialize, Serialize};

use fileindex_core::IndexReport;

/// Text rendered for a report without files.
pub const EMPTY_TREE: &str = "(empty)";

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// Nested mapping from path segment to subtree.
///
/// Leaves (no children) are files; nodes with children are directories.
/// Serializes as a plain JSON object, files as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DirectoryTree {
    children: BTreeMap<String, DirectoryTree>,
}

impl DirectoryTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from every file path of a report.
    pub fn from_report(report: &IndexReport) -> Self {
        Self::from_paths(report.files.iter().map(|f| f.path.as_str()))
    }

    /// Build a tree from raw path strings.
    ///
    /// Paths are split on the platform separators; empty segments (leading
    /// separator, doubled separators) are dropped.
    pub fn from_paths<'a, I>(paths: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut tree = Self::new();
        for path in paths {
            tree.insert(path);
        }
        tree
    }

    /// Insert one path, creating intermediate nodes.
    pub fn insert(&mut self, path: &str) {
        let mut node = self;
        for segment in path.split(is_separator).filter(|s| !s.is_empty()) {
            node = node.children.entry(segment.to_string()).or_default();
        }
    }

    /// Check if this node has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Check if this node is a directory, i.e. it has children.
    pub fn is_dir(&self) -> bool {
        !self.children.is_empty()
    }

    /// Get a child subtree by segment name.
    pub fn get(&self, name: &str) -> Option<&DirectoryTree> {
        self.children.get(name)
    }

    /// Iterate over the direct children in key order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &DirectoryTree)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Count leaf entries (files) in this subtree.
    pub fn file_count(&self) -> usize {
        self.children
            .values()
            .map(|child| if child.is_dir() { child.file_count() } else { 1 })
            .sum()
    }

    /// Render the box-drawing text form.
    ///
    /// Top-level segments are listed in byte order, each as a root line.
    /// Below them every level lists directories before files, each group
    /// ordered case-insensitively. Directory lines carry a leading `/`.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();

        for (position, (root, subtree)) in self.children.iter().with_position() {
            let last = is_last(position);
            lines.push(format!("{}{root}", connector(last)));
            if subtree.is_dir() {
                let prefix = if last { SPACE } else { PIPE };
                subtree.render_level(prefix, &mut lines);
            }
        }

        if lines.is_empty() {
            return EMPTY_TREE.to_string();
        }
        lines.join("\n")
    }

    fn render_level(&self, prefix: &str, lines: &mut Vec<String>) {
        let entries = self.children.iter().sorted_by(|a, b| listing_order(a, b));

        for (position, (name, child)) in entries.with_position() {
            let last = is_last(position);
            if child.is_dir() {
                lines.push(format!("{prefix}{}/{name}", connector(last)));
                let child_prefix = format!("{prefix}{}", if last { SPACE } else { PIPE });
                child.render_level(&child_prefix, lines);
            } else {
                lines.push(format!("{prefix}{}{name}", connector(last)));
            }
        }
    }
}

/// Render the structure text for a report.
pub fn render_tree_text(report: &IndexReport) -> String {
    DirectoryTree::from_report(report).render()
}

fn is_last(position: Position) -> bool {
    matches!(position, Position::Last | Position::Only)
}

fn connector(last: bool) -> &'static str {
    if last { LAST_BRANCH } else { BRANCH }
}

/// Directories first, then case-insensitive name, then exact name.
fn listing_order(a: &(&String, &DirectoryTree), b: &(&String, &DirectoryTree)) -> Ordering {
    let (a_name, a_tree) = a;
    let (b_name, b_tree) = b;
    b_tree
        .is_dir()
        .cmp(&a_tree.is_dir())
        .then_with(|| a_name.to_lowercase().cmp(&b_name.to_lowercase()))
        .then_with(|| a_name.cmp(b_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sep(path: &str) -> String {
        path.replace('/', std::path::MAIN_SEPARATOR_STR)
    }

    fn tree(paths: &[&str]) -> DirectoryTree {
        let paths: Vec<String> = paths.iter().map(|p| sep(p)).collect();
        DirectoryTree::from_paths(paths.iter().map(String::as_str))
    }

    #[test]
    fn test_build_groups_segments() {
        let tree = tree(&["a/x.txt", "a/y.txt", "b/z.txt"]);
        let a = tree.get("a").unwrap();
        assert!(a.is_dir());
        assert!(a.get("x.txt").is_some_and(|n| !n.is_dir()));
        assert!(a.get("y.txt").is_some());
        assert!(tree.get("b").unwrap().get("z.txt").is_some());
        assert_eq!(tree.file_count(), 3);
    }

    #[test]
    fn test_leading_separator_is_dropped() {
        let tree = tree(&["/home/u/f.txt"]);
        assert!(tree.get("").is_none());
        assert!(tree.get("home").is_some());
    }

    #[test]
    fn test_render_round_trip() {
        let text = tree(&["a/x.txt", "a/y.txt", "b/z.txt"]).render();
        let expected = "\
├── a
│   ├── x.txt
│   └── y.txt
└── b
    └── z.txt";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_directories_before_files_case_insensitive() {
        let text = tree(&[
            "root/zeta.txt",
            "root/Alpha.txt",
            "root/beta/inner.txt",
            "root/Gamma/deep/leaf.txt",
        ])
        .render();
        let expected = "\
└── root
    ├── /beta
    │   └── inner.txt
    ├── /Gamma
    │   └── /deep
    │       └── leaf.txt
    ├── Alpha.txt
    └── zeta.txt";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_empty_render() {
        assert_eq!(DirectoryTree::new().render(), EMPTY_TREE);
    }

    #[test]
    fn test_json_projection() {
        let tree = tree(&["a/x.txt", "b/z.txt"]);
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json, serde_json::json!({"a": {"x.txt": {}}, "b": {"z.txt": {}}}));
    }
}
