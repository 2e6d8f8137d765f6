//! Path identifiers, persisted defaults, semantic bindings and callback
//! descriptors derived from a layout tree.

use crate::{
    tree::LayoutTree,
    widget::{Interaction, PropMap, StateClass, WidgetType, prop_bool, prop_str, value_to_f64, value_to_string},
};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};

/// One widget as seen by the resolver.
#[derive(Clone, Debug, PartialEq)]
pub struct WidgetRef<'a> {
    pub path_id: String,
    pub widget_type: &'a WidgetType,
    pub props: &'a PropMap,
}

/// Every widget below the root in pre-order.
pub fn widgets(tree: &LayoutTree) -> Vec<WidgetRef<'_>> {
    tree.walk()
        .into_iter()
        .filter_map(|(id, path_id)| {
            let node = tree.node(id)?;
            Some(WidgetRef {
                path_id,
                widget_type: node.widget_type()?,
                props: node.props()?,
            })
        })
        .collect()
}

/// `path_id` sanitized into an identifier fragment; `.` becomes `_`.
pub fn path_slug(path_id: &str) -> String {
    let slug = sanitize_user_id(path_id);
    if slug.is_empty() { "widget".to_owned() } else { slug }
}

/// Lower-cased slug keeping ASCII alphanumerics and `_`; other runs
/// collapse into one `_`. May be empty.
pub fn sanitize_user_id(user_id: &str) -> String {
    let mut out = String::with_capacity(user_id.len());
    let mut in_run = false;
    for c in user_id.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c.to_ascii_lowercase());
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out.trim_matches('_').to_owned()
}

/// Trimmed `props.user_id`, empty when absent.
pub fn user_id(props: &PropMap) -> String {
    props
        .get("user_id")
        .and_then(value_to_string)
        .map(|s| s.trim().to_owned())
        .unwrap_or_default()
}

/// Default persisted value of one widget.
#[derive(Clone, Debug, PartialEq)]
pub struct StateEntry {
    pub path_id: String,
    pub widget_type: WidgetType,
    pub default: Value,
}

impl StateEntry {
    /// Coerces a loaded value the way this entry's widget type stores it.
    /// Numeric entries that fail to parse fall back to the default.
    pub fn coerce(&self, loaded: &Value) -> Value {
        match self.widget_type.state_class() {
            Some(StateClass::Numeric(_)) => match value_to_f64(loaded) {
                Some(f) => float(f),
                None => self.default.clone(),
            },
            _ => loaded.clone(),
        }
    }
}

fn float(f: f64) -> Value {
    serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number)
}

fn state_default(widget_type: &WidgetType, props: &PropMap) -> Option<Value> {
    let authored = props.get("value").or_else(|| props.get("state"));
    Some(match widget_type.state_class()? {
        StateClass::Toggle => {
            let on = ["value", "state"]
                .into_iter()
                .find_map(|k| prop_bool(props, k))
                .unwrap_or(false);
            Value::Bool(on)
        }
        StateClass::Numeric(fallback) => float(authored.and_then(value_to_f64).unwrap_or(fallback)),
        StateClass::Text => Value::String(authored.and_then(value_to_string).unwrap_or_default()),
        StateClass::Selection => authored.cloned().unwrap_or(Value::Null),
        StateClass::Tabular => match authored {
            Some(v @ Value::Array(_)) => v.clone(),
            _ => Value::Array(Vec::new()),
        },
    })
}

/// `path_id → default` for every stateful widget, in pre-order.
pub fn state_entries(tree: &LayoutTree) -> Vec<StateEntry> {
    widgets(tree)
        .into_iter()
        .filter_map(|w| {
            let default = state_default(w.widget_type, w.props)?;
            Some(StateEntry {
                path_id: w.path_id,
                widget_type: w.widget_type.clone(),
                default,
            })
        })
        .collect()
}

/// Default table with load/snapshot against a persisted key-value map.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateTable {
    entries: Vec<StateEntry>,
}

impl StateTable {
    pub fn from_tree(tree: &LayoutTree) -> Self {
        Self {
            entries: state_entries(tree),
        }
    }

    pub fn entries(&self) -> &[StateEntry] {
        &self.entries
    }

    pub fn defaults(&self) -> BTreeMap<String, Value> {
        self.entries
            .iter()
            .map(|e| (e.path_id.clone(), e.default.clone()))
            .collect()
    }

    /// Defaults overlaid with the snapshot's known keys, coerced per entry.
    pub fn load(&self, snapshot: &Map<String, Value>) -> BTreeMap<String, Value> {
        self.entries
            .iter()
            .map(|e| {
                let v = snapshot
                    .get(&e.path_id)
                    .map_or_else(|| e.default.clone(), |v| e.coerce(v));
                (e.path_id.clone(), v)
            })
            .collect()
    }

    /// Persistable snapshot holding only the table's keys.
    pub fn snapshot(&self, state: &BTreeMap<String, Value>) -> Map<String, Value> {
        self.entries
            .iter()
            .filter_map(|e| Some((e.path_id.clone(), state.get(&e.path_id)?.clone())))
            .collect()
    }
}

/// `user_id → path_id`; on duplicates the last widget in pre-order wins.
pub fn semantic_binding(tree: &LayoutTree) -> BTreeMap<String, String> {
    let mut binding = BTreeMap::new();
    for w in widgets(tree) {
        let uid = user_id(w.props);
        if !uid.is_empty() {
            binding.insert(uid, w.path_id);
        }
    }
    binding
}

/// A generated callback and the key that ties it to a hand-written body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallbackDescriptor {
    pub path_id: String,
    pub kind: Interaction,
    pub name: String,
    pub widget_type: WidgetType,
    pub merge_key: String,
    pub label: Option<String>,
}

fn interaction(widget_type: &WidgetType, props: &PropMap) -> Option<Interaction> {
    match widget_type {
        WidgetType::Markdown if prop_bool(props, "editable").unwrap_or(false) => {
            Some(Interaction::Change)
        }
        other => other.interaction(),
    }
}

/// Callback descriptors for every interactive widget, in pre-order.
///
/// A `user_id` names the callback only when exactly one interactive widget
/// carries it; otherwise the path-id is used for both name and merge key.
pub fn callbacks(tree: &LayoutTree) -> Vec<CallbackDescriptor> {
    let interactive: Vec<(WidgetRef<'_>, Interaction)> = widgets(tree)
        .into_iter()
        .filter_map(|w| {
            let kind = interaction(w.widget_type, w.props)?;
            Some((w, kind))
        })
        .collect();

    let mut counts: HashMap<String, usize> = HashMap::new();
    for (w, _) in &interactive {
        let uid = user_id(w.props);
        if !uid.is_empty() {
            *counts.entry(uid).or_default() += 1;
        }
    }

    let mut taken: HashSet<String> = HashSet::new();
    interactive
        .into_iter()
        .map(|(w, kind)| {
            let uid = user_id(w.props);
            let unique = !uid.is_empty() && counts.get(&uid) == Some(&1);
            let (slug, merge_key) = if unique {
                let slug = Some(sanitize_user_id(&uid))
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| path_slug(&w.path_id));
                (slug, format!("user_id={uid}"))
            } else {
                (path_slug(&w.path_id), format!("path_id:{}", w.path_id))
            };
            let name = unique_name(&mut taken, &slug, &path_slug(&w.path_id), kind);
            log::debug!("Callback {name} for {} keyed {merge_key}", w.path_id);
            CallbackDescriptor {
                name,
                label: prop_str(w.props, "label").filter(|l| !l.trim().is_empty()),
                path_id: w.path_id,
                kind,
                widget_type: w.widget_type.clone(),
                merge_key,
            }
        })
        .collect()
}

/// First free name among `on_<slug>`, `on_<path slug>` and numbered
/// variants of the latter. Claims the result in `taken`.
fn unique_name(taken: &mut HashSet<String>, slug: &str, fallback: &str, kind: Interaction) -> String {
    let suffix = kind.suffix();
    let preferred = format!("on_{slug}_{suffix}");
    let mut name = preferred.clone();
    if taken.contains(&name) {
        name = format!("on_{fallback}_{suffix}");
    }
    let mut n = 2;
    while taken.contains(&name) {
        name = format!("on_{fallback}_{suffix}_{n}");
        n += 1;
    }
    if name != preferred {
        log::warn!("Callback name {preferred} is taken; using {name}");
    }
    taken.insert(name.clone());
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::LayoutDocument;
    use serde_json::json;

    fn tree(children: Value) -> LayoutTree {
        let doc: LayoutDocument = serde_json::from_value(json!({
            "dashboard": { "id": "dashboard", "layout_type": "column", "children": children }
        }))
        .unwrap();
        LayoutTree::from_document(&doc)
    }

    fn row(id: &str, children: Value) -> Value {
        json!({ "type": "container", "id": id, "layout_type": "rows_columns", "children": children })
    }

    #[test]
    fn test_sanitize_user_id() {
        assert_eq!(sanitize_user_id("Power"), "power");
        assert_eq!(sanitize_user_id("  Dampf-Druck  Vorgabe "), "dampf_druck_vorgabe");
        assert_eq!(sanitize_user_id("a__b"), "a__b");
        assert_eq!(sanitize_user_id("--"), "");
        assert_eq!(sanitize_user_id("Ölstand"), "lstand");
    }

    #[test]
    fn test_state_entries_coerce_numbers() {
        let t = tree(json!([row("row_0", json!([
            { "type": "widget", "id": "s", "widget_type": "slider", "props": { "value": "2.5" } },
            { "type": "widget", "id": "n", "widget_type": "number_input", "props": { "value": "abc" } },
            { "type": "widget", "id": "g", "widget_type": "gain_control_vue" },
            { "type": "widget", "id": "v", "widget_type": "vu_meter", "props": { "value": true } },
            { "type": "widget", "id": "b", "widget_type": "button" },
            { "type": "widget", "id": "t", "widget_type": "table" },
            { "type": "widget", "id": "l", "widget_type": "led", "props": { "state": "on" } },
            { "type": "widget", "id": "sel", "widget_type": "select", "props": { "value": "a" } }
        ]))]));
        let table = StateTable::from_tree(&t).defaults();
        assert_eq!(table["row_0.s"], json!(2.5));
        assert_eq!(table["row_0.n"], json!(0.0));
        assert_eq!(table["row_0.g"], json!(1.0));
        assert_eq!(table["row_0.v"], json!(1.0));
        assert_eq!(table["row_0.t"], json!([]));
        assert_eq!(table["row_0.l"], json!(true));
        assert_eq!(table["row_0.sel"], json!("a"));
        assert!(!table.contains_key("row_0.b"));
    }

    #[test]
    fn test_state_load_and_snapshot() {
        let t = tree(json!([row("row_0", json!([
            { "type": "widget", "id": "s", "widget_type": "slider", "props": { "value": 3 } },
            { "type": "widget", "id": "i", "widget_type": "input" }
        ]))]));
        let table = StateTable::from_tree(&t);
        let snapshot = json!({ "row_0.s": "oops", "row_0.i": "hello", "stale": 1 });
        let loaded = table.load(snapshot.as_object().unwrap());
        assert_eq!(loaded["row_0.s"], json!(3.0));
        assert_eq!(loaded["row_0.i"], json!("hello"));
        assert!(!loaded.contains_key("stale"));

        let snap = table.snapshot(&loaded);
        assert_eq!(snap.len(), 2);
        let reloaded = table.load(&snap);
        assert_eq!(reloaded, loaded);
    }

    #[test]
    fn test_semantic_binding_last_wins() {
        let t = tree(json!([row("row_0", json!([
            { "type": "widget", "id": "a", "widget_type": "checkbox", "props": { "user_id": "power" } },
            { "type": "widget", "id": "b", "widget_type": "label", "props": { "user_id": " power " } },
            { "type": "widget", "id": "c", "widget_type": "label", "props": { "user_id": "" } }
        ]))]));
        let binding = semantic_binding(&t);
        assert_eq!(binding.len(), 1);
        assert_eq!(binding["power"], "row_0.b");
    }

    #[test]
    fn test_callbacks_unique_user_id() {
        let t = tree(json!([row("row_0", json!([
            { "type": "widget", "id": "power", "widget_type": "checkbox", "props": { "user_id": "Power Main" } },
            { "type": "widget", "id": "lbl", "widget_type": "label", "props": { "user_id": "Power Main" } },
            { "type": "widget", "id": "plot", "widget_type": "plotly_graph" },
            { "type": "widget", "id": "md", "widget_type": "markdown", "props": { "editable": true } },
            { "type": "widget", "id": "md2", "widget_type": "markdown" }
        ]))]));
        let cbs = callbacks(&t);
        assert_eq!(cbs.len(), 3);
        // only interactive widgets count towards uniqueness
        assert_eq!(cbs[0].name, "on_power_main_change");
        assert_eq!(cbs[0].merge_key, "user_id=Power Main");
        assert_eq!(cbs[1].name, "on_row_0_plot_relayout");
        assert_eq!(cbs[1].merge_key, "path_id:row_0.plot");
        assert_eq!(cbs[2].kind, Interaction::Change);
        assert_eq!(cbs[2].widget_type, WidgetType::Markdown);
    }

    #[test]
    fn test_callbacks_duplicate_user_id_falls_back() {
        let t = tree(json!([row("row_0", json!([
            { "type": "widget", "id": "a", "widget_type": "slider", "props": { "user_id": "power" } },
            { "type": "widget", "id": "b", "widget_type": "button", "props": { "user_id": "power", "label": "Go" } }
        ]))]));
        let cbs = callbacks(&t);
        assert_eq!(cbs[0].merge_key, "path_id:row_0.a");
        assert_eq!(cbs[0].name, "on_row_0_a_change");
        assert_eq!(cbs[1].merge_key, "path_id:row_0.b");
        assert_eq!(cbs[1].name, "on_row_0_b_click");
        assert_eq!(cbs[1].label.as_deref(), Some("Go"));
    }

    fn is_ident(s: &str) -> bool {
        let mut chars = s.chars();
        chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    #[test]
    fn test_callback_names_are_identifiers() {
        let t = tree(json!([row("Row-0", json!([
            { "type": "widget", "id": "my-btn", "widget_type": "button" },
            { "type": "widget", "id": "Ä ö", "widget_type": "checkbox" },
            { "type": "widget", "id": "9 lives", "widget_type": "slider" }
        ]))]));
        let names: Vec<String> = callbacks(&t).into_iter().map(|d| d.name).collect();
        assert_eq!(names, ["on_row_0_my_btn_click", "on_row_0_change", "on_row_0_9_lives_change"]);
        assert!(names.iter().all(|n| is_ident(n)), "{names:?}");
    }

    #[test]
    fn test_callback_names_are_unique() {
        let t = tree(json!([
            { "type": "widget", "id": "my-btn", "widget_type": "button" },
            { "type": "widget", "id": "a", "widget_type": "button", "props": { "user_id": "Power" } },
            { "type": "widget", "id": "b", "widget_type": "button", "props": { "user_id": "power" } },
            { "type": "widget", "id": "my_btn", "widget_type": "button" },
            { "type": "widget", "id": "c", "widget_type": "button", "props": { "user_id": "my_btn" } }
        ]));
        let cbs = callbacks(&t);
        let names: Vec<&str> = cbs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            ["on_my_btn_click", "on_power_click", "on_b_click", "on_my_btn_click_2", "on_c_click"]
        );
        let distinct: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(distinct.len(), names.len());
        // merge keys keep the raw user ids
        assert_eq!(cbs[1].merge_key, "user_id=Power");
        assert_eq!(cbs[2].merge_key, "user_id=power");
    }

    #[test]
    fn test_unsanitizable_user_id_keeps_user_key() {
        let t = tree(json!([row("row_0", json!([
            { "type": "widget", "id": "a", "widget_type": "button", "props": { "user_id": "##" } }
        ]))]));
        let cbs = callbacks(&t);
        assert_eq!(cbs[0].name, "on_row_0_a_click");
        assert_eq!(cbs[0].merge_key, "user_id=##");
    }
}
