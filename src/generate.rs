//! One-shot generation: document in, artifacts out.

use crate::{
    config::{DEFAULT_USER_MODULE, Settings},
    emit::{self, RendererRegistry},
    error::Result,
    merge::{self, MergeOutcome},
    project::LayoutDocument,
    resolve::{self, sanitize_user_id},
    tree::LayoutTree,
};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

/// Where generated files go. Paths are relative and `/`-separated.
pub trait OutputTarget {
    /// Current content of `rel`, if any.
    fn read(&self, rel: &str) -> Option<String>;
    fn write(&mut self, rel: &str, text: &str) -> Result<()>;
}

/// Writes below a directory on disk.
#[derive(Clone, Debug)]
pub struct DirTarget {
    root: PathBuf,
}

impl DirTarget {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, rel: &str) -> PathBuf {
        rel.split('/').fold(self.root.clone(), |p, part| p.join(part))
    }
}

impl OutputTarget for DirTarget {
    fn read(&self, rel: &str) -> Option<String> {
        fs::read_to_string(self.path(rel)).ok()
    }

    fn write(&mut self, rel: &str, text: &str) -> Result<()> {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, text)?;
        log::info!("Wrote {}", path.display());
        Ok(())
    }
}

/// Keeps files in memory.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryTarget {
    pub files: BTreeMap<String, String>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, rel: &str, text: &str) -> Self {
        self.files.insert(rel.to_owned(), text.to_owned());
        self
    }

    pub fn get(&self, rel: &str) -> Option<&str> {
        self.files.get(rel).map(String::as_str)
    }
}

impl OutputTarget for MemoryTarget {
    fn read(&self, rel: &str) -> Option<String> {
        self.files.get(rel).cloned()
    }

    fn write(&mut self, rel: &str, text: &str) -> Result<()> {
        self.files.insert(rel.to_owned(), text.to_owned());
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GenerateOptions {
    /// Merge into the existing user module instead of overwriting it.
    pub merge_stubs: bool,
    /// Also write `state_defaults.rs`.
    pub state_defaults: bool,
    /// Subdirectory for the regenerated artifacts.
    pub internal_dir: Option<String>,
    pub user_module: String,
    pub title: Option<String>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            merge_stubs: true,
            state_defaults: true,
            internal_dir: None,
            user_module: DEFAULT_USER_MODULE.to_owned(),
            title: None,
        }
    }
}

impl GenerateOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            merge_stubs: settings.merge_stubs,
            state_defaults: settings.state_defaults,
            internal_dir: settings.internal_dir.clone(),
            user_module: settings.user_module.clone(),
            title: None,
        }
    }

    /// The user module name as a Rust identifier.
    pub fn module_name(&self) -> String {
        Some(sanitize_user_id(&self.user_module))
            .filter(|m| !m.is_empty() && !m.starts_with(|c: char| c.is_ascii_digit()))
            .unwrap_or_else(|| DEFAULT_USER_MODULE.to_owned())
    }

    fn internal_dir(&self) -> Option<&str> {
        self.internal_dir
            .as_deref()
            .map(|d| d.trim_matches('/'))
            .filter(|d| !d.is_empty())
    }

    fn internal(&self, file: &str) -> String {
        match self.internal_dir() {
            Some(dir) => format!("{dir}/{file}"),
            None => file.to_owned(),
        }
    }
}

/// Everything one generation run produced, before it is written anywhere.
#[derive(Clone, Debug, PartialEq)]
pub struct Artifacts {
    /// `(relative path, content)` in write order.
    pub files: Vec<(String, String)>,
    pub merge: MergeOutcome,
    /// Path-ids rendered as placeholders.
    pub degraded: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GenerateReport {
    pub written: Vec<String>,
    pub merge: MergeOutcome,
    pub degraded: Vec<String>,
}

/// Renders all artifacts for `tree`. `previous_stubs` is the current user
/// module text, merged into when stub merging is on.
pub fn render_artifacts(
    tree: &LayoutTree,
    previous_stubs: Option<&str>,
    opts: &GenerateOptions,
    registry: &RendererRegistry,
) -> Artifacts {
    let module = opts.module_name();
    let descriptors = resolve::callbacks(tree);
    let previous = if opts.merge_stubs {
        previous_stubs.unwrap_or_default()
    } else {
        ""
    };
    let merged = merge::merge(&descriptors, previous);
    let ui = emit::ui::render_titled(tree, registry, opts.title.as_deref());

    let mut files = vec![
        (opts.internal("ui.rs"), ui.source),
        (
            opts.internal("callback_registry.rs"),
            emit::registry::render(&descriptors, &module),
        ),
    ];
    if opts.state_defaults {
        files.push((
            opts.internal("state_defaults.rs"),
            emit::state::render(&resolve::state_entries(tree)),
        ));
    }
    if let Some(dir) = opts.internal_dir() {
        let mut modules = vec!["callback_registry"];
        if opts.state_defaults {
            modules.push("state_defaults");
        }
        modules.push("ui");
        let mut text = String::from("//! Generated by layout-builder.\n\n");
        for m in modules {
            text.push_str(&format!("pub mod {m};\n"));
        }
        files.push((format!("{dir}/mod.rs"), text));
    }
    files.push((format!("{module}.rs"), merged.text.clone()));

    Artifacts {
        files,
        merge: merged,
        degraded: ui.degraded,
    }
}

/// Renders `doc` and writes every artifact to `target`.
pub fn generate(
    doc: &LayoutDocument,
    target: &mut dyn OutputTarget,
    opts: &GenerateOptions,
) -> Result<GenerateReport> {
    let tree = LayoutTree::from_document(doc);
    let stub_file = format!("{}.rs", opts.module_name());
    let previous = target.read(&stub_file);
    let artifacts = render_artifacts(&tree, previous.as_deref(), opts, &RendererRegistry::builtin());

    let mut written = Vec::with_capacity(artifacts.files.len());
    for (rel, text) in &artifacts.files {
        target.write(rel, text)?;
        written.push(rel.clone());
    }
    let m = &artifacts.merge;
    log::info!(
        "Generated {} files: {} callbacks preserved, {} legacy, {} fresh, {} dropped",
        written.len(),
        m.preserved.len(),
        m.legacy.len(),
        m.fresh.len(),
        m.dropped.len()
    );
    if !artifacts.degraded.is_empty() {
        log::warn!("{} widgets rendered as placeholders", artifacts.degraded.len());
    }
    Ok(GenerateReport {
        written,
        merge: artifacts.merge,
        degraded: artifacts.degraded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> LayoutDocument {
        serde_json::from_value(json!({ "dashboard": {
            "id": "dashboard", "layout_type": "column", "children": [
                { "type": "container", "id": "row_0", "layout_type": "rows_columns", "children": [
                    { "type": "widget", "id": "go", "widget_type": "button", "props": { "label": "Go" } },
                    { "type": "widget", "id": "s", "widget_type": "slider" }
                ]}
            ]
        }}))
        .unwrap()
    }

    #[test]
    fn test_generate_writes_all_artifacts() {
        let mut target = MemoryTarget::new();
        let report = generate(&doc(), &mut target, &GenerateOptions::default()).unwrap();
        assert_eq!(
            report.written,
            vec!["ui.rs", "callback_registry.rs", "state_defaults.rs", "user_callbacks.rs"]
        );
        assert!(target.get("user_callbacks.rs").unwrap().contains("pub fn on_row_0_go_click() {"));
        assert!(target.get("state_defaults.rs").unwrap().contains("\"row_0.s\""));
        assert_eq!(report.merge.fresh.len(), 2);
    }

    #[test]
    fn test_internal_dir_and_module_name() {
        let opts = GenerateOptions {
            internal_dir: Some("/generated/".into()),
            user_module: "My Callbacks".into(),
            state_defaults: false,
            ..GenerateOptions::default()
        };
        let mut target = MemoryTarget::new();
        let report = generate(&doc(), &mut target, &opts).unwrap();
        assert_eq!(
            report.written,
            vec![
                "generated/ui.rs",
                "generated/callback_registry.rs",
                "generated/mod.rs",
                "my_callbacks.rs"
            ]
        );
        assert_eq!(
            target.get("generated/mod.rs"),
            Some("//! Generated by layout-builder.\n\npub mod callback_registry;\npub mod ui;\n")
        );
        assert!(target
            .get("generated/callback_registry.rs")
            .unwrap()
            .contains("crate::my_callbacks::on_row_0_go_click()"));
    }

    #[test]
    fn test_regenerate_merges_or_overwrites() {
        let mut target = MemoryTarget::new();
        generate(&doc(), &mut target, &GenerateOptions::default()).unwrap();
        let edited = target
            .get("user_callbacks.rs")
            .unwrap()
            .replace("    // no arguments", "    launch();");
        target.write("user_callbacks.rs", &edited).unwrap();

        let report = generate(&doc(), &mut target, &GenerateOptions::default()).unwrap();
        assert_eq!(report.merge.preserved.len(), 2);
        assert!(target.get("user_callbacks.rs").unwrap().contains("    launch();"));

        let fresh = GenerateOptions {
            merge_stubs: false,
            ..GenerateOptions::default()
        };
        generate(&doc(), &mut target, &fresh).unwrap();
        assert!(!target.get("user_callbacks.rs").unwrap().contains("launch"));
    }

    #[test]
    fn test_dir_target_round_trip() {
        let root = std::env::temp_dir().join(format!("layout-builder-gen-{}", std::process::id()));
        let mut target = DirTarget::new(&root);
        target.write("nested/a.rs", "// a\n").unwrap();
        assert_eq!(target.read("nested/a.rs").as_deref(), Some("// a\n"));
        assert_eq!(target.read("missing.rs"), None);
        let _ = fs::remove_dir_all(root);
    }
}
