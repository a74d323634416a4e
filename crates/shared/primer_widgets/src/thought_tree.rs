//! Tree-of-thoughts explorer.
//!
//! The authored tree is an immutable arena (id → node, children as id lists).
//! Which nodes are open is view state and lives in a separate
//! [`ExpansionState`], so collapsing a branch never touches the flags of the
//! nodes it hides.

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Active,
    Promising,
    Pruned,
    Solved,
}

impl NodeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeStatus::Active => "active",
            NodeStatus::Promising => "promising",
            NodeStatus::Pruned => "pruned",
            NodeStatus::Solved => "solved",
        }
    }

    pub fn marker(self) -> char {
        match self {
            NodeStatus::Active => '*',
            NodeStatus::Promising => '+',
            NodeStatus::Pruned => 'x',
            NodeStatus::Solved => '!',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThoughtNode {
    pub id: String,
    pub label: String,
    pub status: NodeStatus,
    #[serde(default)]
    pub children: Vec<String>,
}

impl ThoughtNode {
    pub fn new(id: &str, label: &str, status: NodeStatus, children: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            status,
            children: children.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("root node `{0}` is not defined")]
    MissingRoot(String),
    #[error("node id `{0}` is defined more than once")]
    DuplicateNode(String),
    #[error("node `{parent}` lists unknown child `{child}`")]
    DanglingChild { parent: String, child: String },
    #[error("node `{0}` has more than one parent")]
    SharedChild(String),
    #[error("node `{0}` is its own ancestor")]
    Cycle(String),
    #[error("node `{0}` is not reachable from the root")]
    Unreachable(String),
}

/// Validated, immutable thought tree.
#[derive(Debug, Clone)]
pub struct ThoughtTree {
    root: String,
    nodes: HashMap<String, ThoughtNode>,
}

impl ThoughtTree {
    /// Build the arena, rejecting anything that is not a single rooted tree.
    pub fn new(root: &str, nodes: Vec<ThoughtNode>) -> Result<Self, TreeError> {
        let mut table: HashMap<String, ThoughtNode> = HashMap::with_capacity(nodes.len());
        for node in nodes {
            if table.contains_key(&node.id) {
                return Err(TreeError::DuplicateNode(node.id));
            }
            table.insert(node.id.clone(), node);
        }

        if !table.contains_key(root) {
            return Err(TreeError::MissingRoot(root.to_string()));
        }

        validate(&table, root)?;

        Ok(Self {
            root: root.to_string(),
            nodes: table,
        })
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn get(&self, id: &str) -> Option<&ThoughtNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ThoughtNode> {
        self.nodes.values()
    }

    /// Root-to-node ids for the first solved node in depth-first order.
    pub fn solution_path(&self) -> Option<Vec<String>> {
        let mut path = Vec::new();
        if self.find_solved(&self.root, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    fn find_solved(&self, id: &str, path: &mut Vec<String>) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        path.push(node.id.clone());
        if node.status == NodeStatus::Solved {
            return true;
        }
        for child in &node.children {
            if self.find_solved(child, path) {
                return true;
            }
        }
        path.pop();
        false
    }
}

/// Checks that `table` is a single tree hanging off `root`: every child
/// exists, has exactly one parent and is reachable, and nothing loops.
fn validate(table: &HashMap<String, ThoughtNode>, root: &str) -> Result<(), TreeError> {
    let mut parent_of: HashMap<&str, &str> = HashMap::new();
    for node in table.values() {
        for child in &node.children {
            if !table.contains_key(child) {
                return Err(TreeError::DanglingChild {
                    parent: node.id.clone(),
                    child: child.clone(),
                });
            }
            if child == root {
                return Err(TreeError::Cycle(child.clone()));
            }
            if parent_of.insert(child.as_str(), node.id.as_str()).is_some() {
                return Err(TreeError::SharedChild(child.clone()));
            }
        }
    }

    // Every non-root node has exactly one parent now, so anything the walk
    // from the root misses sits on a detached cycle.
    let mut seen: HashSet<&str> = HashSet::with_capacity(table.len());
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            return Err(TreeError::Cycle(id.to_string()));
        }
        if let Some(node) = table.get(id) {
            stack.extend(node.children.iter().map(String::as_str));
        }
    }
    if let Some(orphan) = table.keys().find(|id| !seen.contains(id.as_str())) {
        return Err(if parent_of.contains_key(orphan.as_str()) {
            TreeError::Cycle(orphan.clone())
        } else {
            TreeError::Unreachable(orphan.clone())
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub active: u32,
    pub promising: u32,
    pub pruned: u32,
    pub solved: u32,
}

/// Per-node expanded flags. Missing entries read as collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionState {
    flags: HashMap<String, bool>,
}

impl ExpansionState {
    pub fn root_only(root: &str) -> Self {
        let mut flags = HashMap::new();
        flags.insert(root.to_string(), true);
        Self { flags }
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.flags.get(id).copied().unwrap_or(false)
    }

    fn flip(&mut self, id: &str) -> bool {
        let flag = self.flags.entry(id.to_string()).or_insert(false);
        *flag = !*flag;
        *flag
    }
}

/// A row of the rendered tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleRow {
    pub id: String,
    pub label: String,
    pub status: NodeStatus,
    pub depth: u32,
    pub has_children: bool,
    pub expanded: bool,
}

#[derive(Debug, Clone)]
pub struct TreeView {
    tree: ThoughtTree,
    expansion: ExpansionState,
}

impl TreeView {
    pub fn new(tree: ThoughtTree) -> Self {
        let expansion = ExpansionState::root_only(tree.root());
        Self { tree, expansion }
    }

    pub fn tree(&self) -> &ThoughtTree {
        &self.tree
    }

    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expansion.is_expanded(id)
    }

    /// Flip `id` open/closed. Leaves and unknown ids are left alone; returns
    /// whether anything changed.
    pub fn toggle(&mut self, id: &str) -> bool {
        match self.tree.get(id) {
            Some(node) if node.has_children() => {
                self.expansion.flip(id);
                true
            }
            _ => false,
        }
    }

    pub fn collapse_all(&mut self) {
        self.expansion = ExpansionState::root_only(self.tree.root());
    }

    pub fn visible_rows(&self) -> Vec<VisibleRow> {
        let mut rows = Vec::new();
        // Children are pushed in reverse so they pop in authored order.
        let mut stack: Vec<(&str, u32)> = vec![(self.tree.root(), 0)];
        while let Some((id, depth)) = stack.pop() {
            let Some(node) = self.tree.get(id) else {
                continue;
            };
            let expanded = self.expansion.is_expanded(id);
            rows.push(VisibleRow {
                id: node.id.clone(),
                label: node.label.clone(),
                status: node.status,
                depth,
                has_children: node.has_children(),
                expanded,
            });
            if expanded {
                for child in node.children.iter().rev() {
                    stack.push((child.as_str(), depth + 1));
                }
            }
        }
        rows
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for node in self.tree.nodes() {
            match node.status {
                NodeStatus::Active => counts.active += 1,
                NodeStatus::Promising => counts.promising += 1,
                NodeStatus::Pruned => counts.pruned += 1,
                NodeStatus::Solved => counts.solved += 1,
            }
        }
        counts
    }

    /// Indented text rendering, one line per visible row.
    pub fn render_lines(&self) -> Vec<String> {
        render_rows(&self.visible_rows())
    }
}

/// Text rendering of already-computed rows (e.g. rows received over the wire).
pub fn render_rows(rows: &[VisibleRow]) -> Vec<String> {
    rows.iter()
        .map(|row| {
            let fold = match (row.has_children, row.expanded) {
                (false, _) => ' ',
                (true, true) => 'v',
                (true, false) => '>',
            };
            format!(
                "{}{} [{}] {}",
                "  ".repeat(row.depth as usize),
                fold,
                row.status.marker(),
                row.label
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use NodeStatus::*;

    fn small_tree() -> ThoughtTree {
        ThoughtTree::new(
            "root",
            vec![
                ThoughtNode::new("root", "start", Active, &["a", "b"]),
                ThoughtNode::new("a", "a", Promising, &["a1"]),
                ThoughtNode::new("a1", "a1", Solved, &[]),
                ThoughtNode::new("b", "b", Pruned, &[]),
            ],
        )
        .unwrap()
    }

    fn ids(view: &TreeView) -> Vec<String> {
        view.visible_rows().into_iter().map(|r| r.id).collect()
    }

    #[test]
    fn validated_tree_keeps_every_node() {
        let tree = small_tree();
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.root(), "root");
        assert_eq!(tree.get("a").unwrap().children, ["a1"]);
        assert!(tree.get("ghost").is_none());

        let detached_loop = ThoughtTree::new(
            "root",
            vec![
                ThoughtNode::new("root", "r", Active, &[]),
                ThoughtNode::new("x", "x", Active, &["y"]),
                ThoughtNode::new("y", "y", Active, &["x"]),
            ],
        );
        assert!(matches!(detached_loop.unwrap_err(), TreeError::Cycle(_)));
    }

    #[test]
    fn only_root_starts_expanded() {
        let view = TreeView::new(small_tree());
        assert_eq!(ids(&view), ["root", "a", "b"]);
        assert!(view.is_expanded("root"));
        assert!(!view.is_expanded("a"));
    }

    #[test]
    fn toggling_a_leaf_twice_changes_nothing() {
        let mut view = TreeView::new(small_tree());
        let before = view.expansion().clone();
        assert!(!view.toggle("b"));
        assert!(!view.toggle("b"));
        assert_eq!(view.expansion(), &before);
    }

    #[test]
    fn unknown_id_is_a_noop() {
        let mut view = TreeView::new(small_tree());
        let before = view.expansion().clone();
        assert!(!view.toggle("nope"));
        assert_eq!(view.expansion(), &before);
    }

    #[test]
    fn collapse_hides_subtree_and_keeps_child_flags() {
        let mut view = TreeView::new(small_tree());
        assert!(view.toggle("a"));
        assert_eq!(ids(&view), ["root", "a", "a1", "b"]);

        view.toggle("root");
        assert_eq!(ids(&view), ["root"]);
        assert!(view.is_expanded("a"));

        view.toggle("root");
        assert_eq!(ids(&view), ["root", "a", "a1", "b"]);
    }

    #[test]
    fn collapse_all_returns_to_root_only_view() {
        let mut view = TreeView::new(small_tree());
        view.toggle("a");
        assert_eq!(ids(&view), ["root", "a", "a1", "b"]);

        view.collapse_all();
        assert_eq!(ids(&view), ["root", "a", "b"]);
        assert!(!view.is_expanded("a"));
        assert!(view.is_expanded("root"));
    }

    #[test]
    fn rows_carry_depth_and_render_indented() {
        let mut view = TreeView::new(small_tree());
        view.toggle("a");
        let rows = view.visible_rows();
        assert_eq!(rows[2].depth, 2);
        assert_eq!(view.render_lines()[2], "      [!] a1");
        assert_eq!(view.render_lines()[1], "  v [+] a");
    }

    #[test]
    fn finds_solution_path_and_counts_statuses() {
        let view = TreeView::new(small_tree());
        assert_eq!(
            view.tree().solution_path().unwrap(),
            ["root".to_string(), "a".to_string(), "a1".to_string()]
        );
        let c = view.status_counts();
        assert_eq!((c.active, c.promising, c.pruned, c.solved), (1, 1, 1, 1));
    }

    #[test]
    fn rejects_malformed_trees() {
        let dangling = ThoughtTree::new(
            "root",
            vec![ThoughtNode::new("root", "r", Active, &["ghost"])],
        );
        assert_eq!(
            dangling.unwrap_err(),
            TreeError::DanglingChild {
                parent: "root".to_string(),
                child: "ghost".to_string()
            }
        );

        let missing = ThoughtTree::new("root", vec![ThoughtNode::new("x", "x", Active, &[])]);
        assert_eq!(missing.unwrap_err(), TreeError::MissingRoot("root".to_string()));

        let shared = ThoughtTree::new(
            "root",
            vec![
                ThoughtNode::new("root", "r", Active, &["a", "b"]),
                ThoughtNode::new("a", "a", Active, &["c"]),
                ThoughtNode::new("b", "b", Active, &["c"]),
                ThoughtNode::new("c", "c", Active, &[]),
            ],
        );
        assert_eq!(shared.unwrap_err(), TreeError::SharedChild("c".to_string()));

        let orphan = ThoughtTree::new(
            "root",
            vec![
                ThoughtNode::new("root", "r", Active, &[]),
                ThoughtNode::new("lost", "l", Active, &[]),
            ],
        );
        assert_eq!(orphan.unwrap_err(), TreeError::Unreachable("lost".to_string()));

        let back_edge = ThoughtTree::new(
            "root",
            vec![
                ThoughtNode::new("root", "r", Active, &["a"]),
                ThoughtNode::new("a", "a", Active, &["root"]),
            ],
        );
        assert_eq!(back_edge.unwrap_err(), TreeError::Cycle("root".to_string()));
    }
}
