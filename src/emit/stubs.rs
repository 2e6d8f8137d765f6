//! Callback stub text for the user module.
//!
//! Each callback is one block:
//!
//! ```text
//! // widget: path_id:row_0.go
//! /// Path-ID: row_0.go. Widget: "button", label: "Go". Takes no arguments.
//! pub fn on_row_0_go_click() {
//!     // begin user code
//!     // no arguments
//!     // end user code
//! }
//! ```
//!
//! Only the lines between the two user-code markers survive regeneration;
//! see [`crate::merge`].

use crate::{
    resolve::CallbackDescriptor,
    widget::{Interaction, WidgetType},
};

pub const MARKER: &str = "// widget:";
pub const BEGIN_USER: &str = "// begin user code";
pub const END_USER: &str = "// end user code";

pub const DEFAULT_HEADER: &str = "\
//! User callbacks for the generated UI.
//!
//! Edit only the lines between `// begin user code` and `// end user code`
//! inside each function; they are kept when the layout is regenerated.

#![allow(unused_variables)]

use serde_json::Value;";

fn argument_doc(kind: Interaction, widget_type: &WidgetType) -> &'static str {
    match (kind, widget_type) {
        (Interaction::Click, _) => "Takes no arguments.",
        (Interaction::Relayout, _) => "`relayout_data` carries the zoom/pan event.",
        (Interaction::Change, WidgetType::Checkbox | WidgetType::ToggleButton) => "`value` is a bool.",
        (
            Interaction::Change,
            WidgetType::Slider | WidgetType::NumberInput | WidgetType::GainControl,
        ) => "`value` is a number.",
        (Interaction::Change, WidgetType::Input | WidgetType::Select | WidgetType::Markdown) => {
            "`value` is a string."
        }
        (Interaction::Change, _) => "`value` is the new widget value.",
    }
}

pub fn signature(desc: &CallbackDescriptor) -> String {
    match desc.kind {
        Interaction::Click => format!("pub fn {}() {{", desc.name),
        Interaction::Change => format!("pub fn {}(value: &Value) {{", desc.name),
        Interaction::Relayout => format!("pub fn {}(relayout_data: &Value) {{", desc.name),
    }
}

pub fn doc_line(desc: &CallbackDescriptor) -> String {
    let mut doc = format!("/// Path-ID: {}. Widget: {:?}", desc.path_id, desc.widget_type.as_str());
    if let Some(label) = &desc.label {
        doc.push_str(&format!(", label: {label:?}"));
    }
    doc.push_str(". ");
    doc.push_str(argument_doc(desc.kind, &desc.widget_type));
    doc
}

/// Body written into a fresh stub.
pub fn placeholder_body(kind: Interaction) -> Vec<String> {
    let line = match kind {
        Interaction::Click => "    // no arguments",
        Interaction::Change => "    let _ = value;",
        Interaction::Relayout => "    let _ = relayout_data;",
    };
    vec![line.to_owned()]
}

/// Lines of one block ending in a blank separator. An empty `body` gets the
/// placeholder.
pub fn block(desc: &CallbackDescriptor, body: &[String]) -> Vec<String> {
    let mut lines = vec![
        format!("{MARKER} {}", desc.merge_key),
        doc_line(desc),
        signature(desc),
        format!("    {BEGIN_USER}"),
    ];
    if body.iter().all(|l| l.trim().is_empty()) {
        lines.extend(placeholder_body(desc.kind));
    } else {
        lines.extend(body.iter().cloned());
    }
    lines.push(format!("    {END_USER}"));
    lines.push("}".to_owned());
    lines.push(String::new());
    lines
}

/// Fresh stub text, identical to merging into an empty file.
pub fn render(descriptors: &[CallbackDescriptor]) -> String {
    crate::merge::merge(descriptors, "").text
}
