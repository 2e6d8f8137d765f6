use crate::{
    project::{ContainerSpec, GroupSpec, LayoutType, NodeSpec, WidgetSpec},
    widget::{PropMap, WidgetType},
};
use serde_json::json;
use std::fmt;

/// What an editor can insert below a container, group or tab.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum InsertKind {
    Container(LayoutType),
    Group,
    Tab,
    Widget(WidgetType),
}

impl InsertKind {
    /// Every insertable kind in palette order.
    pub fn all() -> Vec<InsertKind> {
        let mut out: Vec<InsertKind> = LayoutType::ALL
            .iter()
            .cloned()
            .map(InsertKind::Container)
            .collect();
        out.push(InsertKind::Group);
        out.push(InsertKind::Tab);
        out.extend(WidgetType::ALL.iter().cloned().map(InsertKind::Widget));
        out
    }

    /// Parses a kind name: a layout type, `group`, `tab` or a widget type.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "group" => return Some(InsertKind::Group),
            "tab" => return Some(InsertKind::Tab),
            _ => {}
        }
        match LayoutType::from(name.to_owned()) {
            LayoutType::Unknown(_) => WidgetType::parse_known(name).map(InsertKind::Widget),
            layout => Some(InsertKind::Container(layout)),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            InsertKind::Container(l) => l.as_str(),
            InsertKind::Group => "group",
            InsertKind::Tab => "tab",
            InsertKind::Widget(w) => w.as_str(),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(
            self,
            InsertKind::Container(LayoutType::Unknown(_)) | InsertKind::Widget(WidgetType::Unknown(_))
        )
    }

    /// Identifier prefix used when minting.
    pub const fn prefix(&self) -> &'static str {
        match self {
            InsertKind::Container(_) => "container",
            InsertKind::Group => "group",
            InsertKind::Tab => "tab",
            InsertKind::Widget(_) => "widget",
        }
    }

    /// Canonical default instance, with an empty identifier.
    pub fn template(&self) -> NodeSpec {
        match self {
            InsertKind::Container(layout) => {
                let mut spec = ContainerSpec::new("", layout.clone());
                spec.fields = container_defaults(layout);
                NodeSpec::Container(spec)
            }
            InsertKind::Group => NodeSpec::Group(labelled()),
            InsertKind::Tab => NodeSpec::Tab(labelled()),
            InsertKind::Widget(w) => NodeSpec::Widget(WidgetSpec::new("", w.clone())),
        }
    }
}

impl fmt::Display for InsertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertKind::Container(l) => write!(f, "{} container", l.display_name()),
            InsertKind::Group => f.write_str("Group"),
            InsertKind::Tab => f.write_str("Tab"),
            InsertKind::Widget(w) => f.write_str(w.display_name()),
        }
    }
}

fn labelled() -> GroupSpec {
    let mut g = GroupSpec::default();
    g.fields.insert("label".into(), json!(""));
    g
}

fn container_defaults(layout: &LayoutType) -> PropMap {
    let v = match layout {
        LayoutType::RowsColumns => json!({ "columns": 4, "align_items": "center" }),
        LayoutType::Grid => json!({ "columns": 2 }),
        LayoutType::Expansion => json!({ "label": "" }),
        LayoutType::Splitter => json!({ "orientation": "horizontal", "value": 30 }),
        _ => json!({}),
    };
    v.as_object().cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind_names() {
        assert_eq!(
            InsertKind::parse("splitter"),
            Some(InsertKind::Container(LayoutType::Splitter))
        );
        assert_eq!(InsertKind::parse("tab"), Some(InsertKind::Tab));
        assert_eq!(
            InsertKind::parse("button"),
            Some(InsertKind::Widget(WidgetType::Button))
        );
        assert_eq!(InsertKind::parse("sparkline"), None);
    }

    #[test]
    fn test_templates() {
        match InsertKind::Container(LayoutType::Splitter).template() {
            NodeSpec::Container(c) => {
                assert_eq!(c.fields.get("value"), Some(&json!(30)));
                assert!(c.children.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(InsertKind::Tab.template(), NodeSpec::Tab(_)));
        assert_eq!(InsertKind::all().len(), 9 + 2 + 22);
    }
}
