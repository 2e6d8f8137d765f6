//! Persisted layout document: the serde form of a layout tree.

use crate::{
    error::{Error, Result},
    widget::{PropMap, WidgetType, css_value},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, path::Path};

pub const DOCUMENT_VERSION: u32 = 1;

/// Container layout types.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LayoutType {
    /// Flow-row; the shape every grid row takes.
    #[default]
    RowsColumns,
    Column,
    Grid,
    Expansion,
    Scroll,
    Card,
    Splitter,
    Tabs,
    /// Free-position overlay.
    Xy,
    Unknown(String),
}

impl LayoutType {
    pub const ALL: [LayoutType; 9] = [
        LayoutType::RowsColumns,
        LayoutType::Column,
        LayoutType::Grid,
        LayoutType::Expansion,
        LayoutType::Scroll,
        LayoutType::Card,
        LayoutType::Splitter,
        LayoutType::Tabs,
        LayoutType::Xy,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            LayoutType::RowsColumns => "rows_columns",
            LayoutType::Column => "column",
            LayoutType::Grid => "grid",
            LayoutType::Expansion => "expansion",
            LayoutType::Scroll => "scroll",
            LayoutType::Card => "card",
            LayoutType::Splitter => "splitter",
            LayoutType::Tabs => "tabs",
            LayoutType::Xy => "xy",
            LayoutType::Unknown(s) => s,
        }
    }

    pub const fn display_name(&self) -> &'static str {
        match self {
            LayoutType::RowsColumns => "Row",
            LayoutType::Column => "Column",
            LayoutType::Grid => "Grid",
            LayoutType::Expansion => "Expansion",
            LayoutType::Scroll => "Scroll Area",
            LayoutType::Card => "Card",
            LayoutType::Splitter => "Splitter",
            LayoutType::Tabs => "Tabs",
            LayoutType::Xy => "Free Position",
            LayoutType::Unknown(_) => "Unknown",
        }
    }
}

impl From<String> for LayoutType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "rows_columns" | "row" => LayoutType::RowsColumns,
            "column" => LayoutType::Column,
            "grid" => LayoutType::Grid,
            "expansion" => LayoutType::Expansion,
            "scroll" => LayoutType::Scroll,
            "card" => LayoutType::Card,
            "splitter" => LayoutType::Splitter,
            "tabs" => LayoutType::Tabs,
            "xy" => LayoutType::Xy,
            _ => LayoutType::Unknown(s),
        }
    }
}

impl From<LayoutType> for String {
    fn from(t: LayoutType) -> Self {
        match t {
            LayoutType::Unknown(s) => s,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for LayoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node as it appears in the document, tagged by `"type"`.
///
/// Loading is lenient: a node without `"type"` is read as a widget, and a
/// node that still does not fit its type becomes a placeholder that keeps its
/// id and remaining fields.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeSpec {
    Widget(WidgetSpec),
    Container(ContainerSpec),
    Group(GroupSpec),
    Tab(GroupSpec),
    Placeholder(PlaceholderSpec),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StrictNode {
    Widget(WidgetSpec),
    Container(ContainerSpec),
    Group(GroupSpec),
    Tab(GroupSpec),
    Placeholder(PlaceholderSpec),
}

impl From<StrictNode> for NodeSpec {
    fn from(node: StrictNode) -> Self {
        match node {
            StrictNode::Widget(w) => NodeSpec::Widget(w),
            StrictNode::Container(c) => NodeSpec::Container(c),
            StrictNode::Group(g) => NodeSpec::Group(g),
            StrictNode::Tab(g) => NodeSpec::Tab(g),
            StrictNode::Placeholder(p) => NodeSpec::Placeholder(p),
        }
    }
}

impl<'de> Deserialize<'de> for NodeSpec {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let Value::Object(mut map) = Value::deserialize(deserializer)? else {
            log::warn!("Layout node is not an object; loading it as an empty slot");
            return Ok(NodeSpec::placeholder());
        };
        if !map.contains_key("type") {
            map.insert("type".into(), Value::from("widget"));
        }
        match serde_json::from_value::<StrictNode>(Value::Object(map.clone())) {
            Ok(node) => Ok(node.into()),
            Err(e) => {
                let id = map
                    .remove("id")
                    .and_then(|v| v.as_str().map(str::to_owned))
                    .unwrap_or_default();
                let kind = map.remove("type").unwrap_or(Value::Null);
                log::warn!("Layout node {id:?} of type {kind} not loaded ({e}); keeping an empty slot");
                Ok(NodeSpec::Placeholder(PlaceholderSpec { id, fields: map }))
            }
        }
    }
}

impl NodeSpec {
    pub fn placeholder() -> Self {
        NodeSpec::Placeholder(PlaceholderSpec::default())
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, NodeSpec::Placeholder(_))
    }

    pub fn id(&self) -> &str {
        match self {
            NodeSpec::Widget(w) => &w.id,
            NodeSpec::Container(c) => &c.id,
            NodeSpec::Group(g) | NodeSpec::Tab(g) => &g.id,
            NodeSpec::Placeholder(p) => &p.id,
        }
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        match self {
            NodeSpec::Widget(w) => w.id = id,
            NodeSpec::Container(c) => c.id = id,
            NodeSpec::Group(g) | NodeSpec::Tab(g) => g.id = id,
            NodeSpec::Placeholder(p) => p.id = id,
        }
    }

    pub fn children(&self) -> &[NodeSpec] {
        match self {
            NodeSpec::Container(c) => &c.children,
            NodeSpec::Group(g) | NodeSpec::Tab(g) => &g.children,
            NodeSpec::Widget(_) | NodeSpec::Placeholder(_) => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<NodeSpec>> {
        match self {
            NodeSpec::Container(c) => Some(&mut c.children),
            NodeSpec::Group(g) | NodeSpec::Tab(g) => Some(&mut g.children),
            NodeSpec::Widget(_) | NodeSpec::Placeholder(_) => None,
        }
    }

    pub fn fields(&self) -> &PropMap {
        match self {
            NodeSpec::Widget(w) => &w.fields,
            NodeSpec::Container(c) => &c.fields,
            NodeSpec::Group(g) | NodeSpec::Tab(g) => &g.fields,
            NodeSpec::Placeholder(p) => &p.fields,
        }
    }

    pub fn fields_mut(&mut self) -> &mut PropMap {
        match self {
            NodeSpec::Widget(w) => &mut w.fields,
            NodeSpec::Container(c) => &mut c.fields,
            NodeSpec::Group(g) | NodeSpec::Tab(g) => &mut g.fields,
            NodeSpec::Placeholder(p) => &mut p.fields,
        }
    }

    /// Short label for editor cells and outlines.
    pub fn summary(&self) -> String {
        match self {
            NodeSpec::Widget(w) => format!("{} ({})", w.id, w.widget_type),
            NodeSpec::Container(c) => format!("{} [{}]", c.id, c.layout_type),
            NodeSpec::Group(g) => format!("{} [group]", g.id),
            NodeSpec::Tab(g) => format!("{} [tab]", g.id),
            NodeSpec::Placeholder(_) => "(empty)".to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WidgetSpec {
    #[serde(default)]
    pub id: String,
    pub widget_type: WidgetType,
    #[serde(default, skip_serializing_if = "PropMap::is_empty")]
    pub props: PropMap,
    #[serde(flatten)]
    pub fields: PropMap,
}

impl WidgetSpec {
    pub fn new(id: impl Into<String>, widget_type: WidgetType) -> Self {
        Self {
            id: id.into(),
            props: widget_type.default_props(),
            widget_type,
            fields: PropMap::new(),
        }
    }
}

/// Container node. Layout-specific fields (`columns`, `rows`, `value`,
/// `orientation`, `align_items`, `label`, `style`, ...) live in `fields`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub layout_type: LayoutType,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
    #[serde(flatten)]
    pub fields: PropMap,
}

impl ContainerSpec {
    pub fn new(id: impl Into<String>, layout_type: LayoutType) -> Self {
        Self {
            id: id.into(),
            layout_type,
            children: Vec::new(),
            fields: PropMap::new(),
        }
    }
}

/// Group and Tab nodes share this shape.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupSpec {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
    #[serde(flatten)]
    pub fields: PropMap,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceholderSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(flatten)]
    pub fields: PropMap,
}

/// Presentation defaults shared by the whole document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Appearance(pub PropMap);

impl Appearance {
    fn css(&self, key: &str) -> Option<String> {
        self.0.get(key).and_then(css_value)
    }

    pub fn page_padding(&self) -> Option<String> {
        self.css("page_padding")
    }

    pub fn page_background(&self) -> Option<String> {
        self.css("page_background")
    }

    /// Style defaults applied to every container, keyed by style property.
    pub fn container_defaults(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        for (key, style_key) in [
            ("container_background", "background-color"),
            ("container_padding", "padding"),
            ("container_border_radius", "border-radius"),
            ("container_gap", "gap"),
        ] {
            if let Some(v) = self.css(key) {
                out.push((style_key, v));
            }
        }
        out
    }

    /// `true` when scroll content should grow with the window instead of
    /// using a fixed maximum height.
    pub fn scroll_flex(&self) -> bool {
        self.css("scroll_content_mode")
            .is_some_and(|m| m.eq_ignore_ascii_case("flex"))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The persisted document: version tag, appearance map and dashboard root.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Appearance::is_empty")]
    pub appearance: Appearance,
    pub dashboard: ContainerSpec,
    #[serde(flatten)]
    pub extra: PropMap,
}

fn default_version() -> u32 {
    DOCUMENT_VERSION
}

impl Default for LayoutDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            appearance: Appearance::default(),
            dashboard: ContainerSpec::new("dashboard", LayoutType::RowsColumns),
            extra: PropMap::new(),
        }
    }
}

impl LayoutDocument {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(s)?;
        if value.get("dashboard").is_none_or(Value::is_null) {
            return Err(Error::MissingRoot);
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let doc = Self::from_json_str(&text)?;
        log::info!("Loaded layout document {}", path.display());
        Ok(doc)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json_pretty()?)?;
        log::info!("Saved layout document {}", path.display());
        Ok(())
    }
}
