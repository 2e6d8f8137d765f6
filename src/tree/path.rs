//! Structural paths, path-ids and pre-order traversal.

use super::{LayoutTree, NodeId, NodeKind};

impl LayoutTree {
    /// Child indices from the root to `id`.
    pub fn structural_path(&self, id: NodeId) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut cur = id;
        while cur != self.root() {
            let parent = self.node(cur)?.parent()?;
            let index = self.children(parent).iter().position(|c| *c == cur)?;
            path.push(index);
            cur = parent;
        }
        path.reverse();
        Some(path)
    }

    /// Dot-joined identifiers from below the root down to `id`. The root
    /// itself has the empty path-id.
    pub fn path_id(&self, id: NodeId) -> Option<String> {
        let mut segments = Vec::new();
        let mut cur = id;
        while cur != self.root() {
            let node = self.node(cur)?;
            segments.push(node.ident.as_str());
            cur = node.parent()?;
        }
        segments.reverse();
        Some(segments.join("."))
    }

    /// First node whose identifier chain matches `path_id`.
    pub fn resolve_path_id(&self, path_id: &str) -> Option<NodeId> {
        let mut cur = self.root();
        if path_id.is_empty() {
            return Some(cur);
        }
        for segment in path_id.split('.') {
            cur = *self
                .children(cur)
                .iter()
                .find(|c| self.node(**c).is_some_and(|n| n.ident == segment))?;
        }
        Some(cur)
    }

    /// Every structural path in pre-order, root (`[]`) first.
    pub fn list_depth_first(&self) -> Vec<Vec<usize>> {
        let mut out = Vec::new();
        self.collect_paths(self.root(), &mut Vec::new(), &mut out);
        out
    }

    fn collect_paths(&self, id: NodeId, path: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        out.push(path.clone());
        for (i, child) in self.children(id).iter().enumerate() {
            path.push(i);
            self.collect_paths(*child, path, out);
            path.pop();
        }
    }

    pub fn next_path(&self, path: &[usize]) -> Option<Vec<usize>> {
        let all = self.list_depth_first();
        let pos = all.iter().position(|p| p == path)?;
        all.get(pos + 1).cloned()
    }

    pub fn previous_path(&self, path: &[usize]) -> Option<Vec<usize>> {
        let all = self.list_depth_first();
        let pos = all.iter().position(|p| p == path)?;
        pos.checked_sub(1).and_then(|p| all.get(p).cloned())
    }

    /// Pre-order walk below the root, yielding each node with its path-id.
    pub fn walk(&self) -> Vec<(NodeId, String)> {
        let mut out = Vec::new();
        self.walk_from(self.root(), "", &mut out);
        out
    }

    fn walk_from(&self, id: NodeId, prefix: &str, out: &mut Vec<(NodeId, String)>) {
        for child in self.children(id) {
            let Some(node) = self.node(*child) else {
                continue;
            };
            let pid = if prefix.is_empty() {
                node.ident.clone()
            } else {
                format!("{prefix}.{}", node.ident)
            };
            out.push((*child, pid.clone()));
            self.walk_from(*child, &pid, out);
        }
    }

    /// Path-ids of every widget, in pre-order.
    pub fn widget_path_ids(&self) -> Vec<String> {
        self.walk()
            .into_iter()
            .filter(|(id, _)| {
                self.node(*id)
                    .is_some_and(|n| matches!(n.kind, NodeKind::Widget { .. }))
            })
            .map(|(_, pid)| pid)
            .collect()
    }

    /// Widget at `path_id`; `None` if it does not resolve or is not a widget.
    pub fn widget_by_path_id(&self, path_id: &str) -> Option<NodeId> {
        let id = self.resolve_path_id(path_id)?;
        self.node(id)?.widget_type().map(|_| id)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        project::LayoutType,
        tree::{InsertKind, LayoutTree},
        widget::WidgetType,
    };

    fn nested() -> LayoutTree {
        let mut tree = LayoutTree::default();
        tree.add_child(&[], &InsertKind::Container(LayoutType::Tabs));
        tree.add_child(&[0], &InsertKind::Tab);
        tree.add_child(&[0, 0], &InsertKind::Widget(WidgetType::Button));
        tree.add_child(&[], &InsertKind::Widget(WidgetType::Label));
        tree
    }

    #[test]
    fn test_list_depth_first() {
        let tree = nested();
        assert_eq!(
            tree.list_depth_first(),
            vec![vec![], vec![0], vec![0, 0], vec![0, 0, 0], vec![1]]
        );
        assert_eq!(tree.next_path(&[0, 0, 0]), Some(vec![1]));
        assert_eq!(tree.next_path(&[1]), None);
        assert_eq!(tree.previous_path(&[0]), Some(vec![]));
        assert_eq!(tree.previous_path(&[]), None);
    }

    #[test]
    fn test_path_ids_include_tabs() {
        let tree = nested();
        let button = tree.get_node(&[0, 0, 0]).unwrap();
        assert_eq!(
            tree.path_id(button).as_deref(),
            Some("container_1.tab_1.widget_1")
        );
        assert_eq!(tree.path_id(tree.root()).as_deref(), Some(""));
        assert_eq!(tree.resolve_path_id("container_1.tab_1.widget_1"), Some(button));
        assert_eq!(tree.structural_path(button), Some(vec![0, 0, 0]));
        assert_eq!(tree.resolve_path_id("container_1.nope"), None);
    }

    #[test]
    fn test_widget_lookup() {
        let tree = nested();
        assert_eq!(
            tree.widget_path_ids(),
            vec!["container_1.tab_1.widget_1".to_owned(), "widget_2".to_owned()]
        );
        assert!(tree.widget_by_path_id("widget_2").is_some());
        assert!(tree.widget_by_path_id("container_1").is_none());
    }
}
