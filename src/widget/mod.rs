use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;

/// Open property map as stored in the document.
pub type PropMap = Map<String, Value>;

/// Closed set of widget types the builder knows how to place, resolve and
/// emit. Anything else loaded from a document is kept as `Unknown` so the
/// document round-trips and emission can fall back to a placeholder.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WidgetType {
    Checkbox,
    Slider,
    Button,
    ToggleButton,
    NumberInput,
    Input,
    Select,
    Label,
    Link,
    Image,
    Table,
    Markdown,
    Plot(PlotKind),
    Banner,
    GainControl,
    VuMeter,
    Led,
    ImageIcon,
    Unknown(String),
}

/// Plotly-backed chart flavours. They share one renderer and all report
/// relayout events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlotKind {
    Graph,
    Spectrum,
    Scatter,
    Histogram,
    Surface3d,
}

impl PlotKind {
    pub const ALL: [PlotKind; 5] = [
        PlotKind::Graph,
        PlotKind::Spectrum,
        PlotKind::Scatter,
        PlotKind::Histogram,
        PlotKind::Surface3d,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            PlotKind::Graph => "plotly_graph",
            PlotKind::Spectrum => "plotly_spectrum",
            PlotKind::Scatter => "plotly_scatter",
            PlotKind::Histogram => "plotly_histogram",
            PlotKind::Surface3d => "plotly_3d",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            PlotKind::Graph => "Graph",
            PlotKind::Spectrum => "Spectrum",
            PlotKind::Scatter => "Scatter Plot",
            PlotKind::Histogram => "Histogram",
            PlotKind::Surface3d => "3D Plot",
        }
    }
}

/// How a widget talks back to application code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Interaction {
    Click,
    Change,
    Relayout,
}

impl Interaction {
    pub const fn suffix(self) -> &'static str {
        match self {
            Interaction::Click => "click",
            Interaction::Change => "change",
            Interaction::Relayout => "relayout",
        }
    }
}

/// Persisted-state class of a widget type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StateClass {
    Toggle,
    /// Always stored as a float; the payload is the fallback default.
    Numeric(f64),
    Text,
    Selection,
    Tabular,
}

impl WidgetType {
    /// Every known type, in palette order.
    pub const ALL: [WidgetType; 22] = [
        WidgetType::Markdown,
        WidgetType::Checkbox,
        WidgetType::Slider,
        WidgetType::Button,
        WidgetType::ToggleButton,
        WidgetType::Input,
        WidgetType::NumberInput,
        WidgetType::Select,
        WidgetType::Label,
        WidgetType::Link,
        WidgetType::Image,
        WidgetType::Table,
        WidgetType::Plot(PlotKind::Graph),
        WidgetType::Plot(PlotKind::Spectrum),
        WidgetType::Plot(PlotKind::Scatter),
        WidgetType::Plot(PlotKind::Histogram),
        WidgetType::Plot(PlotKind::Surface3d),
        WidgetType::Banner,
        WidgetType::GainControl,
        WidgetType::VuMeter,
        WidgetType::Led,
        WidgetType::ImageIcon,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            WidgetType::Checkbox => "checkbox",
            WidgetType::Slider => "slider",
            WidgetType::Button => "button",
            WidgetType::ToggleButton => "toggle_button",
            WidgetType::NumberInput => "number_input",
            WidgetType::Input => "input",
            WidgetType::Select => "select",
            WidgetType::Label => "label",
            WidgetType::Link => "link",
            WidgetType::Image => "image",
            WidgetType::Table => "table",
            WidgetType::Markdown => "markdown",
            WidgetType::Plot(k) => k.as_str(),
            WidgetType::Banner => "banner_vue",
            WidgetType::GainControl => "gain_control_vue",
            WidgetType::VuMeter => "vu_meter",
            WidgetType::Led => "led",
            WidgetType::ImageIcon => "image_icon_demo",
            WidgetType::Unknown(s) => s,
        }
    }

    /// Parses a known type name; unknown names yield `None`.
    pub fn parse_known(s: &str) -> Option<Self> {
        match WidgetType::from(s.to_owned()) {
            WidgetType::Unknown(_) => None,
            t => Some(t),
        }
    }

    pub const fn display_name(&self) -> &'static str {
        match self {
            WidgetType::Checkbox => "Checkbox",
            WidgetType::Slider => "Slider",
            WidgetType::Button => "Button",
            WidgetType::ToggleButton => "Toggle Button",
            WidgetType::NumberInput => "Number Input",
            WidgetType::Input => "Text Input",
            WidgetType::Select => "Select",
            WidgetType::Label => "Label",
            WidgetType::Link => "Link",
            WidgetType::Image => "Image",
            WidgetType::Table => "Table",
            WidgetType::Markdown => "Markdown",
            WidgetType::Plot(k) => k.display_name(),
            WidgetType::Banner => "Banner",
            WidgetType::GainControl => "Gain Control",
            WidgetType::VuMeter => "VU Meter",
            WidgetType::Led => "LED",
            WidgetType::ImageIcon => "Image + Icon",
            WidgetType::Unknown(_) => "Unknown",
        }
    }

    /// Fixed widget-type to interaction table. Editable markdown is decided
    /// per node by the resolver.
    pub const fn interaction(&self) -> Option<Interaction> {
        match self {
            WidgetType::Button => Some(Interaction::Click),
            WidgetType::Checkbox
            | WidgetType::ToggleButton
            | WidgetType::Slider
            | WidgetType::NumberInput
            | WidgetType::Input
            | WidgetType::Select
            | WidgetType::GainControl => Some(Interaction::Change),
            WidgetType::Plot(_) => Some(Interaction::Relayout),
            _ => None,
        }
    }

    pub const fn state_class(&self) -> Option<StateClass> {
        match self {
            WidgetType::Checkbox | WidgetType::ToggleButton | WidgetType::Led => {
                Some(StateClass::Toggle)
            }
            WidgetType::NumberInput | WidgetType::VuMeter => Some(StateClass::Numeric(0.0)),
            WidgetType::Slider | WidgetType::GainControl => Some(StateClass::Numeric(1.0)),
            WidgetType::Input | WidgetType::Markdown => Some(StateClass::Text),
            WidgetType::Select => Some(StateClass::Selection),
            WidgetType::Table => Some(StateClass::Tabular),
            _ => None,
        }
    }

    /// Default property map for a freshly inserted widget of this type.
    pub fn default_props(&self) -> PropMap {
        let v = match self {
            WidgetType::Markdown => json!({
                "content": "",
                "editable": false,
                "placeholder": "Your answer or note …",
                "height": "300px",
                "height_mode": "fixed",
                "render_markdown": true,
                "font": "default",
                "framed": false,
            }),
            WidgetType::Checkbox => json!({ "label": "", "value": false }),
            WidgetType::Slider => json!({
                "label": "",
                "min": 0,
                "max": 10,
                "value": 1,
                "step": 0.01,
                "label_position": "below",
            }),
            WidgetType::Button => json!({ "label": "" }),
            WidgetType::ToggleButton => json!({
                "icon": "toggle_on",
                "label": "",
                "label_inactive": "",
                "value": false,
            }),
            WidgetType::Input => json!({ "label": "", "value": "" }),
            WidgetType::NumberInput => json!({ "label": "", "value": 0 }),
            WidgetType::Select => json!({ "label": "", "options": [], "value": null }),
            WidgetType::Label => json!({ "text": "", "heading": "", "font": "" }),
            WidgetType::Link => json!({ "url": "", "text": "", "target": "_blank" }),
            WidgetType::Image => json!({ "src": "", "alt": "" }),
            WidgetType::Table => json!({
                "columns": [{ "name": "Name", "field": "name" }],
            }),
            WidgetType::Plot(_) => json!({
                "height": "400px",
                "title": "",
                "xaxis_title": "",
                "yaxis_title": "",
                "trace_count": 1,
                "mode": "lines",
            }),
            WidgetType::Banner => json!({
                "text1": "Lab",
                "text2": "Exercise",
                "text3": "1",
                "height": "80px",
                "gradient_start": "#0d47a1",
                "gradient_end": "#1565c0",
            }),
            WidgetType::GainControl => json!({ "label": "Gain", "min": 0, "max": 10, "value": 1.0 }),
            WidgetType::VuMeter => json!({ "min": 0, "max": 1.0, "show_value": true }),
            WidgetType::Led => json!({ "label": "", "size": 16 }),
            WidgetType::ImageIcon => json!({
                "image_src": "",
                "image_alt": "Image",
                "show_icon": true,
                "label": "",
            }),
            WidgetType::Unknown(_) => json!({}),
        };
        match v {
            Value::Object(map) => map,
            _ => PropMap::new(),
        }
    }
}

impl From<String> for WidgetType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "checkbox" => WidgetType::Checkbox,
            "slider" => WidgetType::Slider,
            "button" => WidgetType::Button,
            "toggle_button" => WidgetType::ToggleButton,
            "number_input" => WidgetType::NumberInput,
            "input" => WidgetType::Input,
            "select" => WidgetType::Select,
            "label" => WidgetType::Label,
            "link" => WidgetType::Link,
            "image" => WidgetType::Image,
            "table" => WidgetType::Table,
            "markdown" => WidgetType::Markdown,
            "plotly_graph" => WidgetType::Plot(PlotKind::Graph),
            "plotly_spectrum" => WidgetType::Plot(PlotKind::Spectrum),
            "plotly_scatter" => WidgetType::Plot(PlotKind::Scatter),
            "plotly_histogram" => WidgetType::Plot(PlotKind::Histogram),
            "plotly_3d" => WidgetType::Plot(PlotKind::Surface3d),
            "banner_vue" => WidgetType::Banner,
            "gain_control_vue" => WidgetType::GainControl,
            "vu_meter" => WidgetType::VuMeter,
            "led" => WidgetType::Led,
            "image_icon_demo" => WidgetType::ImageIcon,
            _ => WidgetType::Unknown(s),
        }
    }
}

impl From<WidgetType> for String {
    fn from(t: WidgetType) -> Self {
        match t {
            WidgetType::Unknown(s) => s,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for WidgetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column definition of a table widget.
#[derive(Clone, Debug, PartialEq)]
pub struct TableColumn {
    pub name: String,
    pub field: String,
}

/// Typed view over a widget's open property map.
#[derive(Clone, Debug, PartialEq)]
pub enum WidgetProps {
    Checkbox { label: String, value: bool },
    Slider { label: String, min: f64, max: f64, value: f64, step: f64 },
    Button { label: String },
    ToggleButton { label: String, label_inactive: String, value: bool },
    NumberInput { label: String, value: f64 },
    Input { label: String, value: String },
    Select { label: String, options: Vec<String>, value: Option<String> },
    Label { text: String, heading: Option<u8> },
    Link { text: String, url: String },
    Image { src: String, alt: String },
    Table { columns: Vec<TableColumn> },
    Markdown { content: String, editable: bool, placeholder: String },
    Graph { title: String, height: String },
    Banner { texts: [String; 3], gradient_start: String, gradient_end: String },
    GainControl { label: String, min: f64, max: f64, value: f64 },
    VuMeter { min: f64, max: f64, show_value: bool },
    Led { label: String, size: f64 },
    ImageIcon { src: String, alt: String, label: String, show_icon: bool },
    Unknown,
}

impl WidgetProps {
    /// Builds the typed view. `ident` is the node identifier, used where a
    /// label is missing.
    pub fn from_map(widget_type: &WidgetType, props: &PropMap, ident: &str) -> Self {
        let label = || {
            prop_str(props, "label")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| ident.to_owned())
        };
        let s = |key: &str| prop_str(props, key).unwrap_or_default();
        let f = |key: &str, default: f64| prop_f64(props, key).unwrap_or(default);
        let b = |key: &str, default: bool| prop_bool(props, key).unwrap_or(default);
        match widget_type {
            WidgetType::Checkbox => WidgetProps::Checkbox {
                label: label(),
                value: b("value", false),
            },
            WidgetType::Slider => WidgetProps::Slider {
                label: label(),
                min: f("min", 0.0),
                max: f("max", 10.0),
                value: f("value", 1.0),
                step: f("step", 0.01),
            },
            WidgetType::Button => WidgetProps::Button { label: label() },
            WidgetType::ToggleButton => WidgetProps::ToggleButton {
                label: label(),
                label_inactive: s("label_inactive"),
                value: b("value", false),
            },
            WidgetType::NumberInput => WidgetProps::NumberInput {
                label: label(),
                value: f("value", 0.0),
            },
            WidgetType::Input => WidgetProps::Input {
                label: label(),
                value: s("value"),
            },
            WidgetType::Select => WidgetProps::Select {
                label: label(),
                options: prop_str_list(props, "options"),
                value: prop_str(props, "value"),
            },
            WidgetType::Label => WidgetProps::Label {
                text: prop_str(props, "text")
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| ident.to_owned()),
                heading: props.get("heading").and_then(heading_level),
            },
            WidgetType::Link => {
                let url = normalize_url(&s("url"));
                let text = prop_str(props, "text")
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| url.clone());
                WidgetProps::Link { text, url }
            }
            WidgetType::Image => WidgetProps::Image {
                src: s("src"),
                alt: s("alt"),
            },
            WidgetType::Table => WidgetProps::Table {
                columns: table_columns(props),
            },
            WidgetType::Markdown => WidgetProps::Markdown {
                content: s("content"),
                editable: b("editable", false),
                placeholder: s("placeholder"),
            },
            WidgetType::Plot(_) => WidgetProps::Graph {
                title: s("title"),
                height: prop_str(props, "height").unwrap_or_else(|| "400px".into()),
            },
            WidgetType::Banner => WidgetProps::Banner {
                texts: [s("text1"), s("text2"), s("text3")],
                gradient_start: s("gradient_start"),
                gradient_end: s("gradient_end"),
            },
            WidgetType::GainControl => WidgetProps::GainControl {
                label: label(),
                min: f("min", 0.0),
                max: f("max", 10.0),
                value: f("value", 1.0),
            },
            WidgetType::VuMeter => WidgetProps::VuMeter {
                min: f("min", 0.0),
                max: f("max", 1.0),
                show_value: b("show_value", true),
            },
            WidgetType::Led => WidgetProps::Led {
                label: s("label"),
                size: f("size", 16.0),
            },
            WidgetType::ImageIcon => WidgetProps::ImageIcon {
                src: s("image_src"),
                alt: s("image_alt"),
                label: s("label"),
                show_icon: b("show_icon", true),
            },
            WidgetType::Unknown(_) => WidgetProps::Unknown,
        }
    }
}

/// Presentation attributes shared by every widget type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Presentation {
    pub text_color: Option<String>,
    pub bg_color: Option<String>,
    pub width: Option<String>,
    pub min_width: Option<String>,
    pub max_width: Option<String>,
    pub flex: bool,
}

impl Presentation {
    pub fn from_map(props: &PropMap) -> Self {
        let css = |key: &str| props.get(key).and_then(css_value);
        Self {
            text_color: css("text_color"),
            bg_color: css("bg_color"),
            width: css("width"),
            min_width: css("min_width"),
            max_width: css("max_width"),
            flex: prop_bool(props, "flex").unwrap_or(false),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Editor hint for one property.
#[derive(Clone, Debug, PartialEq)]
pub struct PropSpec {
    pub key: String,
    pub default: Value,
    pub kind: PropKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropKind {
    Boolean,
    Integer,
    Number,
    String,
    Color,
    List,
    Json,
}

const COMMON_PROPS: [(&str, PropKind); 7] = [
    ("user_id", PropKind::String),
    ("text_color", PropKind::Color),
    ("bg_color", PropKind::Color),
    ("width", PropKind::String),
    ("min_width", PropKind::String),
    ("max_width", PropKind::String),
    ("flex", PropKind::Boolean),
];

/// Property specs for the inspector: the type's defaults followed by the
/// common presentation props.
pub fn prop_specs(widget_type: &WidgetType) -> Vec<PropSpec> {
    if matches!(widget_type, WidgetType::Unknown(_)) {
        return Vec::new();
    }
    let mut out: Vec<PropSpec> = widget_type
        .default_props()
        .into_iter()
        .map(|(key, default)| {
            let kind = infer_prop_kind(&default);
            PropSpec { key, default, kind }
        })
        .collect();
    for (key, kind) in COMMON_PROPS {
        let default = if kind == PropKind::Boolean {
            Value::Bool(false)
        } else {
            Value::String(String::new())
        };
        out.push(PropSpec {
            key: key.to_owned(),
            default,
            kind,
        });
    }
    out
}

fn infer_prop_kind(v: &Value) -> PropKind {
    match v {
        Value::Bool(_) => PropKind::Boolean,
        Value::Number(n) if n.is_i64() || n.is_u64() => PropKind::Integer,
        Value::Number(_) => PropKind::Number,
        Value::Array(_) => PropKind::List,
        Value::Object(_) => PropKind::Json,
        _ => PropKind::String,
    }
}

/// Strings as-is, numbers/bools formatted, `{value|label}` maps unwrapped.
pub fn prop_str(props: &PropMap, key: &str) -> Option<String> {
    props.get(key).and_then(value_to_string)
}

pub fn value_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(m) => m
            .get("value")
            .or_else(|| m.get("label"))
            .and_then(value_to_string),
        _ => None,
    }
}

pub fn prop_f64(props: &PropMap, key: &str) -> Option<f64> {
    props.get(key).and_then(value_to_f64)
}

/// Numbers, booleans and numeric strings; everything else is `None`.
pub fn value_to_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

pub fn prop_bool(props: &PropMap, key: &str) -> Option<bool> {
    match props.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn prop_str_list(props: &PropMap, key: &str) -> Vec<String> {
    match props.get(key) {
        Some(Value::Array(items)) => items.iter().filter_map(value_to_string).collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

fn table_columns(props: &PropMap) -> Vec<TableColumn> {
    let Some(Value::Array(cols)) = props.get("columns") else {
        return Vec::new();
    };
    cols.iter()
        .filter_map(|c| match c {
            Value::Object(m) => {
                let name = prop_str(m, "name");
                let field = prop_str(m, "field");
                let name = name.clone().or_else(|| field.clone())?;
                let field = field.unwrap_or_else(|| name.clone());
                Some(TableColumn { name, field })
            }
            Value::String(s) => Some(TableColumn {
                name: s.clone(),
                field: s.clone(),
            }),
            _ => None,
        })
        .collect()
}

fn heading_level(v: &Value) -> Option<u8> {
    match v {
        Value::Number(n) => n.as_u64().filter(|h| (1..=6).contains(h)).map(|h| h as u8),
        Value::String(s) => {
            let s = s.trim().to_ascii_lowercase();
            let digit = s.strip_prefix('h')?;
            digit.parse::<u8>().ok().filter(|h| (1..=6).contains(h))
        }
        _ => None,
    }
}

/// Empty becomes `#`; bare hosts get an `https://` scheme.
pub fn normalize_url(raw: &str) -> String {
    let url = raw.trim();
    if url.is_empty() || url == "#" {
        return "#".to_owned();
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_owned()
    } else {
        format!("https://{url}")
    }
}

/// CSS-ready string from an appearance/style value; empty results are `None`.
pub fn css_value(v: &Value) -> Option<String> {
    let s = match v {
        Value::Null => return None,
        Value::Object(m) => m
            .get("value")
            .or_else(|| m.get("label"))
            .or_else(|| m.get("content"))
            .and_then(value_to_string)?,
        other => value_to_string(other)?,
    };
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_owned())
}

pub(crate) fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

/// Quoted Rust string literal.
pub(crate) fn lit(s: &str) -> String {
    format!("\"{}\"", escape(s))
}
