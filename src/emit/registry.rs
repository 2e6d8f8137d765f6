//! `callback_registry.rs`: wires each path-id to its user-module stub.

use super::CodeWriter;
use crate::{resolve::CallbackDescriptor, widget::{Interaction, lit}};

pub fn render(descriptors: &[CallbackDescriptor], user_module: &str) -> String {
    let mut w = CodeWriter::new();
    w.line("//! Generated by layout-builder. Maps path-ids to the user callbacks.");
    w.blank();
    w.line("use serde_json::Value;");
    w.line("use std::collections::HashMap;");
    w.blank();
    w.line("pub type Callbacks = HashMap<String, Box<dyn FnMut(&Value)>>;");
    w.blank();
    w.open("pub fn callback_registry() -> Callbacks {");
    w.line("let mut callbacks: Callbacks = HashMap::new();");
    for d in descriptors {
        let call = match d.kind {
            Interaction::Click => format!("|_: &Value| crate::{user_module}::{}()", d.name),
            Interaction::Change => format!("|value: &Value| crate::{user_module}::{}(value)", d.name),
            Interaction::Relayout => format!("|data: &Value| crate::{user_module}::{}(data)", d.name),
        };
        w.line(format!(
            "callbacks.insert({}.to_owned(), Box::new({call}));",
            lit(&d.path_id)
        ));
    }
    w.line("callbacks");
    w.close("}");
    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::WidgetType;

    #[test]
    fn test_registry_calls_user_module() {
        let d = CallbackDescriptor {
            path_id: "row_0.s".into(),
            kind: Interaction::Change,
            name: "on_row_0_s_change".into(),
            widget_type: WidgetType::Slider,
            merge_key: "path_id:row_0.s".into(),
            label: None,
        };
        let out = render(&[d], "user_callbacks");
        assert!(out.contains(
            "callbacks.insert(\"row_0.s\".to_owned(), Box::new(|value: &Value| crate::user_callbacks::on_row_0_s_change(value)));"
        ));
        assert!(out.ends_with("    callbacks\n}\n"));
    }
}
