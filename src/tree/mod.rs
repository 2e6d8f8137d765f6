//! Canonical in-memory layout tree.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. Editors
//! address nodes by structural path or path-id, but both are resolved to a
//! `NodeId` before anything is mutated.

mod kind;
mod minter;
pub mod path;

pub use kind::InsertKind;
pub use minter::IdentifierMinter;

use crate::{
    project::{
        Appearance, ContainerSpec, GroupSpec, LayoutDocument, LayoutType, NodeSpec,
        PlaceholderSpec, WidgetSpec,
    },
    widget::{PropMap, WidgetType, prop_str, value_to_f64, value_to_string},
};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Widget {
        widget_type: WidgetType,
        props: PropMap,
    },
    Container {
        layout_type: LayoutType,
    },
    Group,
    Tab,
    Placeholder,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub ident: String,
    pub kind: NodeKind,
    pub col_span: Option<i64>,
    pub row_span: Option<i64>,
    /// Every other top-level field (`label`, `columns`, `style`, `x`, ...).
    pub fields: PropMap,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(ident: String, kind: NodeKind, mut fields: PropMap) -> Self {
        let col_span = take_span(&mut fields, "col_span");
        let row_span = take_span(&mut fields, "row_span");
        Self {
            ident,
            kind,
            col_span,
            row_span,
            fields,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn widget_type(&self) -> Option<&WidgetType> {
        match &self.kind {
            NodeKind::Widget { widget_type, .. } => Some(widget_type),
            _ => None,
        }
    }

    pub fn props(&self) -> Option<&PropMap> {
        match &self.kind {
            NodeKind::Widget { props, .. } => Some(props),
            _ => None,
        }
    }

    pub fn layout_type(&self) -> Option<&LayoutType> {
        match &self.kind {
            NodeKind::Container { layout_type } => Some(layout_type),
            _ => None,
        }
    }

    pub fn is_tab_set(&self) -> bool {
        self.layout_type() == Some(&LayoutType::Tabs)
    }

    /// Containers, groups and tabs own children.
    pub fn is_branch(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Container { .. } | NodeKind::Group | NodeKind::Tab
        )
    }

    pub fn label(&self) -> Option<String> {
        prop_str(&self.fields, "label")
    }

    /// Positive integer field such as `columns` or `rows`.
    pub fn count_field(&self, key: &str) -> Option<usize> {
        count_value(self.fields.get(key)?)
    }
}

pub(crate) fn count_value(v: &Value) -> Option<usize> {
    let f = value_to_f64(v)?;
    (f >= 1.0).then_some(f as usize)
}

fn take_span(fields: &mut PropMap, key: &str) -> Option<i64> {
    let span = fields.get(key).and_then(Value::as_i64)?;
    fields.remove(key);
    Some(span)
}

/// Arena-backed layout tree with one root container.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutTree {
    nodes: Vec<Option<Node>>,
    /// Emptied slots, reused by the next allocation.
    free: Vec<NodeId>,
    root: NodeId,
    pub version: u32,
    pub appearance: Appearance,
    /// Unknown document-level fields, kept for saving.
    pub extra: PropMap,
}

impl Default for LayoutTree {
    fn default() -> Self {
        Self::from_document(&LayoutDocument::default())
    }
}

impl LayoutTree {
    pub fn from_document(doc: &LayoutDocument) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: NodeId(0),
            version: doc.version,
            appearance: doc.appearance.clone(),
            extra: doc.extra.clone(),
        };
        tree.root = tree.alloc_spec(NodeSpec::Container(doc.dashboard.clone()), None);
        tree
    }

    pub fn to_document(&self) -> LayoutDocument {
        let dashboard = match self.to_spec(self.root) {
            Some(NodeSpec::Container(c)) => c,
            _ => ContainerSpec::new("dashboard", LayoutType::Column),
        };
        LayoutDocument {
            version: self.version,
            appearance: self.appearance.clone(),
            dashboard,
            extra: self.extra.clone(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(Node::children).unwrap_or(&[])
    }

    /// Identifiers of every live node, root included.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().flatten().map(|n| n.ident.as_str())
    }

    pub fn minter(&self) -> IdentifierMinter {
        IdentifierMinter::new(self.identifiers())
    }

    /// Allocates `spec` and its subtree; the new node is not linked into
    /// `parent`'s child list.
    pub fn alloc_spec(&mut self, spec: NodeSpec, parent: Option<NodeId>) -> NodeId {
        let (ident, kind, fields, children) = match spec {
            NodeSpec::Widget(WidgetSpec {
                id,
                widget_type,
                props,
                fields,
            }) => (id, NodeKind::Widget { widget_type, props }, fields, Vec::new()),
            NodeSpec::Container(ContainerSpec {
                id,
                layout_type,
                children,
                fields,
            }) => (id, NodeKind::Container { layout_type }, fields, children),
            NodeSpec::Group(GroupSpec {
                id,
                children,
                fields,
            }) => (id, NodeKind::Group, fields, children),
            NodeSpec::Tab(GroupSpec {
                id,
                children,
                fields,
            }) => (id, NodeKind::Tab, fields, children),
            NodeSpec::Placeholder(PlaceholderSpec { id, fields }) => {
                (id, NodeKind::Placeholder, fields, Vec::new())
            }
        };
        let mut node = Node::new(ident, kind, fields);
        node.parent = parent;
        let id = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot.0] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        };
        let child_ids: Vec<NodeId> = children
            .into_iter()
            .map(|c| self.alloc_spec(c, Some(id)))
            .collect();
        if let Some(n) = self.node_mut(id) {
            n.children = child_ids;
        }
        id
    }

    /// Exports the subtree at `id` in document form.
    pub fn to_spec(&self, id: NodeId) -> Option<NodeSpec> {
        let node = self.node(id)?;
        let mut fields = node.fields.clone();
        if let Some(span) = node.col_span {
            fields.insert("col_span".into(), span.into());
        }
        if let Some(span) = node.row_span {
            fields.insert("row_span".into(), span.into());
        }
        let children = || -> Vec<NodeSpec> {
            node.children
                .iter()
                .filter_map(|c| self.to_spec(*c))
                .collect()
        };
        let id_str = node.ident.clone();
        Some(match &node.kind {
            NodeKind::Widget { widget_type, props } => NodeSpec::Widget(WidgetSpec {
                id: id_str,
                widget_type: widget_type.clone(),
                props: props.clone(),
                fields,
            }),
            NodeKind::Container { layout_type } => NodeSpec::Container(ContainerSpec {
                id: id_str,
                layout_type: layout_type.clone(),
                children: children(),
                fields,
            }),
            NodeKind::Group => NodeSpec::Group(GroupSpec {
                id: id_str,
                children: children(),
                fields,
            }),
            NodeKind::Tab => NodeSpec::Tab(GroupSpec {
                id: id_str,
                children: children(),
                fields,
            }),
            NodeKind::Placeholder => NodeSpec::Placeholder(PlaceholderSpec { id: id_str, fields }),
        })
    }

    /// Drops the subtree at `id` from the arena. Does not touch the parent's
    /// child list.
    fn free_subtree(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        self.free.push(id);
        for child in node.children {
            self.free_subtree(child);
        }
    }

    /// Replaces the child list of `parent`, relinking new children and
    /// freeing the ones no longer referenced.
    pub(crate) fn set_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        let old = match self.node_mut(parent) {
            Some(n) => std::mem::replace(&mut n.children, children.clone()),
            None => return,
        };
        for c in &children {
            if let Some(n) = self.node_mut(*c) {
                n.parent = Some(parent);
            }
        }
        for c in old {
            if !children.contains(&c) {
                self.free_subtree(c);
            }
        }
    }

    /// Node at a structural path; `[]` is the root.
    pub fn get_node(&self, path: &[usize]) -> Option<NodeId> {
        let mut cur = self.root;
        for &i in path {
            cur = *self.children(cur).get(i)?;
        }
        Some(cur)
    }

    /// `(parent, index)` of the node at `path`. `None` for the root and for
    /// paths that do not resolve.
    pub fn get_parent_and_index(&self, path: &[usize]) -> Option<(NodeId, usize)> {
        let (&index, parent_path) = path.split_last()?;
        let parent = self.get_node(parent_path)?;
        (index < self.children(parent).len()).then_some((parent, index))
    }

    /// Inserts a default instance of `kind` as the last child of the node at
    /// `parent_path` and returns its id.
    pub fn add_child(&mut self, parent_path: &[usize], kind: &InsertKind) -> Option<NodeId> {
        let parent = self.get_node(parent_path)?;
        self.add_child_to(parent, kind)
    }

    pub fn add_child_to(&mut self, parent: NodeId, kind: &InsertKind) -> Option<NodeId> {
        let parent_node = self.node(parent)?;
        if !parent_node.is_branch() || !kind.is_known() {
            return None;
        }
        if parent_node.is_tab_set() != (*kind == InsertKind::Tab) {
            log::debug!(
                "Rejected {} below {}: tabs and tab sets only nest in each other",
                kind.name(),
                parent_node.ident
            );
            return None;
        }
        let ident = self.minter().mint(kind.prefix());
        let id = self.alloc_spec(kind.template(), Some(parent));
        if let Some(node) = self.node_mut(id) {
            if node.kind == NodeKind::Tab {
                node.fields.insert("label".into(), Value::String(ident.clone()));
            }
            node.ident = ident;
        }
        if let Some(p) = self.node_mut(parent) {
            p.children.push(id);
        }
        Some(id)
    }

    /// Removes the node at `path` with its subtree. The root cannot be deleted.
    pub fn delete(&mut self, path: &[usize]) -> bool {
        let Some((parent, index)) = self.get_parent_and_index(path) else {
            return false;
        };
        let removed = match self.node_mut(parent) {
            Some(p) => p.children.remove(index),
            None => return false,
        };
        self.free_subtree(removed);
        true
    }

    /// Swaps the node at `path` with the sibling `direction` places away.
    pub fn move_node(&mut self, path: &[usize], direction: isize) -> bool {
        if direction == 0 {
            return false;
        }
        let Some((parent, index)) = self.get_parent_and_index(path) else {
            return false;
        };
        let Some(p) = self.node_mut(parent) else {
            return false;
        };
        match index.checked_add_signed(direction) {
            Some(target) if target < p.children.len() => {
                p.children.swap(index, target);
                true
            }
            _ => false,
        }
    }

    /// Sets one field of the node at `path`.
    ///
    /// `props` replaces the whole property map, `props.<name>` writes one
    /// property; anything else is a top-level field. `Null` removes an open
    /// field.
    pub fn set_property(&mut self, path: &[usize], key: &str, value: Value) -> bool {
        match self.get_node(path) {
            Some(id) => self.set_node_property(id, key, value),
            None => false,
        }
    }

    pub fn set_node_property(&mut self, id: NodeId, key: &str, value: Value) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        if key == "props" {
            return match (&mut node.kind, value) {
                (NodeKind::Widget { props, .. }, Value::Object(map)) => {
                    *props = map;
                    true
                }
                _ => false,
            };
        }
        if let Some(prop) = key.strip_prefix("props.") {
            return match &mut node.kind {
                NodeKind::Widget { props, .. } => {
                    props.insert(prop.to_owned(), value);
                    true
                }
                _ => false,
            };
        }
        match key {
            "type" | "children" => false,
            "id" => match value_to_string(&value) {
                Some(ident) => {
                    node.ident = ident;
                    true
                }
                None => false,
            },
            "widget_type" => match (&mut node.kind, value) {
                (NodeKind::Widget { widget_type, .. }, Value::String(s)) => {
                    *widget_type = WidgetType::from(s);
                    true
                }
                _ => false,
            },
            "layout_type" => match (&mut node.kind, value) {
                (NodeKind::Container { layout_type }, Value::String(s)) => {
                    *layout_type = LayoutType::from(s);
                    true
                }
                _ => false,
            },
            "col_span" | "row_span" => {
                let span = match &value {
                    Value::Null => None,
                    v => match value_to_f64(v) {
                        Some(f) => Some(f.round() as i64),
                        None => return false,
                    },
                };
                if key == "col_span" {
                    node.col_span = span;
                } else {
                    node.row_span = span;
                }
                true
            }
            _ => {
                if value.is_null() {
                    node.fields.remove(key);
                } else {
                    node.fields.insert(key.to_owned(), value);
                }
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree_from(value: Value) -> LayoutTree {
        let doc: LayoutDocument = serde_json::from_value(value).unwrap();
        LayoutTree::from_document(&doc)
    }

    fn sample() -> LayoutTree {
        tree_from(json!({
            "version": 1,
            "dashboard": {
                "id": "dashboard",
                "layout_type": "column",
                "children": [
                    { "type": "container", "id": "row_0", "layout_type": "rows_columns", "children": [
                        { "type": "widget", "id": "power", "widget_type": "checkbox", "props": {"user_id": "power"} },
                        { "type": "widget", "id": "go", "widget_type": "button", "col_span": 3 }
                    ]},
                    { "type": "group", "id": "extras", "label": "Extras", "children": [] }
                ]
            }
        }))
    }

    fn ident(tree: &LayoutTree, path: &[usize]) -> String {
        let id = tree.get_node(path).unwrap();
        tree.node(id).unwrap().ident.clone()
    }

    #[test]
    fn test_get_node_and_parent() {
        let tree = sample();
        assert_eq!(ident(&tree, &[]), "dashboard");
        assert_eq!(ident(&tree, &[0, 1]), "go");
        assert!(tree.get_node(&[0, 5]).is_none());
        let (parent, index) = tree.get_parent_and_index(&[0, 1]).unwrap();
        assert_eq!(tree.node(parent).unwrap().ident, "row_0");
        assert_eq!(index, 1);
        assert!(tree.get_parent_and_index(&[]).is_none());
        assert!(tree.get_parent_and_index(&[0, 9]).is_none());
    }

    #[test]
    fn test_spans_extracted_and_restored() {
        let tree = sample();
        let go = tree.get_node(&[0, 1]).unwrap();
        assert_eq!(tree.node(go).unwrap().col_span, Some(3));
        let doc = tree.to_document();
        let v = serde_json::to_value(&doc).unwrap();
        assert_eq!(v["dashboard"]["children"][0]["children"][1]["col_span"], json!(3));
    }

    #[test]
    fn test_add_child_mints_tree_wide() {
        let mut tree = sample();
        let a = tree
            .add_child(&[0], &InsertKind::Widget(WidgetType::Slider))
            .unwrap();
        let b = tree
            .add_child(&[1], &InsertKind::Widget(WidgetType::Button))
            .unwrap();
        assert_eq!(tree.node(a).unwrap().ident, "widget_1");
        assert_eq!(tree.node(b).unwrap().ident, "widget_2");
        let props = tree.node(a).unwrap().props().unwrap();
        assert_eq!(props.get("max"), Some(&json!(10)));
    }

    #[test]
    fn test_add_child_rejections() {
        let mut tree = sample();
        // widgets have no children
        assert!(tree.add_child(&[0, 0], &InsertKind::Group).is_none());
        assert!(tree.add_child(&[7], &InsertKind::Group).is_none());
        assert!(
            tree.add_child(&[], &InsertKind::Widget(WidgetType::Unknown("x".into())))
                .is_none()
        );
        // tab outside a tab set
        assert!(tree.add_child(&[], &InsertKind::Tab).is_none());
    }

    #[test]
    fn test_tab_sets_only_hold_tabs() {
        let mut tree = sample();
        let tabs = tree
            .add_child(&[], &InsertKind::Container(LayoutType::Tabs))
            .unwrap();
        assert_eq!(tree.node(tabs).unwrap().ident, "container_1");
        let tabs_path = [2];
        assert!(
            tree.add_child(&tabs_path, &InsertKind::Widget(WidgetType::Button))
                .is_none()
        );
        let tab = tree.add_child(&tabs_path, &InsertKind::Tab).unwrap();
        let node = tree.node(tab).unwrap();
        assert_eq!(node.ident, "tab_1");
        assert_eq!(node.label().as_deref(), Some("tab_1"));
        assert!(
            tree.add_child(&[2, 0], &InsertKind::Widget(WidgetType::Led))
                .is_some()
        );
    }

    #[test]
    fn test_delete() {
        let mut tree = sample();
        assert!(!tree.delete(&[]));
        assert!(tree.delete(&[0]));
        assert_eq!(ident(&tree, &[0]), "extras");
        assert!(!tree.identifiers().any(|i| i == "power"));
        assert!(!tree.delete(&[4]));
    }

    #[test]
    fn test_deleted_slots_are_reused() {
        let mut tree = sample();
        let slots = tree.nodes.len();
        for _ in 0..20 {
            let id = tree
                .add_child(&[1], &InsertKind::Widget(WidgetType::Button))
                .unwrap();
            assert!(tree.node(id).is_some());
            assert!(tree.delete(&[1, 0]));
        }
        assert_eq!(tree.nodes.len(), slots + 1);
        assert_eq!(tree.children(tree.root()).len(), 2);
        assert_eq!(tree.to_document(), sample().to_document());
    }

    #[test]
    fn test_move_node() {
        let mut tree = sample();
        assert!(!tree.move_node(&[0, 0], -1));
        assert!(!tree.move_node(&[0, 1], 1));
        assert!(!tree.move_node(&[0, 0], 0));
        assert!(!tree.move_node(&[], 1));
        assert!(tree.move_node(&[0, 0], 1));
        assert_eq!(ident(&tree, &[0, 0]), "go");
        assert_eq!(ident(&tree, &[0, 1]), "power");
    }

    #[test]
    fn test_set_property() {
        let mut tree = sample();
        assert!(tree.set_property(&[0, 0], "props.label", json!("Power")));
        assert!(tree.set_property(&[0, 0], "id", json!("main_power")));
        assert!(tree.set_property(&[1], "label", json!("More")));
        assert!(tree.set_property(&[0], "layout_type", json!("grid")));
        assert!(tree.set_property(&[0, 1], "col_span", json!("2")));
        assert!(!tree.set_property(&[0], "props", json!({"a": 1})));
        assert!(!tree.set_property(&[0, 0], "props", json!([1])));
        assert!(!tree.set_property(&[9], "label", json!("x")));

        let power = tree.node(tree.get_node(&[0, 0]).unwrap()).unwrap();
        assert_eq!(power.ident, "main_power");
        assert_eq!(power.props().unwrap().get("label"), Some(&json!("Power")));
        let row = tree.node(tree.get_node(&[0]).unwrap()).unwrap();
        assert_eq!(row.layout_type(), Some(&LayoutType::Grid));
        let go = tree.node(tree.get_node(&[0, 1]).unwrap()).unwrap();
        assert_eq!(go.col_span, Some(2));

        assert!(tree.set_property(&[0, 0], "props", json!({"value": true})));
        let power = tree.node(tree.get_node(&[0, 0]).unwrap()).unwrap();
        assert_eq!(power.props().unwrap().len(), 1);
    }

    #[test]
    fn test_document_roundtrip() {
        let tree = sample();
        let again = LayoutTree::from_document(&tree.to_document());
        assert_eq!(again.to_document(), tree.to_document());
    }
}
