use crate::highlight::{CodeLanguage, Highlighter, code_viewer};
use egui::{Color32, RichText};
use egui_extras::{Column, TableBuilder};
use layout_builder::{
    config::Settings,
    emit::RendererRegistry,
    error::{Direction, EditError},
    generate::{self, DirTarget, GenerateOptions, OutputTarget},
    grid::{FlatOp, FlatShape, GridState, RowAlign},
    project::{LayoutDocument, LayoutType, NodeSpec},
    resolve::{self, CallbackDescriptor},
    tree::{InsertKind, LayoutTree, Node, NodeId, NodeKind},
    widget::{PropKind, WidgetType, prop_bool, prop_specs},
};
use serde_json::Value;
use std::{collections::BTreeMap, path::PathBuf, time::Instant};

/// Tabs of the central area.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum CentralTab {
    #[default]
    Grid,
    Code,
    Bindings,
    Document,
}

impl CentralTab {
    const ALL: [CentralTab; 4] = [
        CentralTab::Grid,
        CentralTab::Code,
        CentralTab::Bindings,
        CentralTab::Document,
    ];

    const fn display_name(self) -> &'static str {
        match self {
            CentralTab::Grid => "Grid",
            CentralTab::Code => "Generated Code",
            CentralTab::Bindings => "Callbacks & State",
            CentralTab::Document => "Document JSON",
        }
    }
}

/// One grid editor action, collected while drawing and applied afterwards.
#[derive(Clone, Debug, PartialEq)]
enum GridAction {
    Op(FlatOp),
    Swap(Direction),
    Place,
    Clear,
    Resize(usize, usize),
    Align(usize, RowAlign),
    Nested(FlatOp),
    NestedSwap(Direction),
    NestedPlace,
}

pub(crate) struct LayoutBuilderApp {
    settings: Settings,
    tree: LayoutTree,
    /// Node selected in the outline
    selected: Option<NodeId>,
    /// Kind added by "Add child" in the outline
    insert_kind: InsertKind,
    central_tab: CentralTab,
    /// Grid projection of the tree, derived lazily when the grid tab opens
    grid: Option<GridState>,
    grid_error: Option<String>,
    grid_cell: (usize, usize),
    /// Pending size in the grid resize controls
    grid_size: (usize, usize),
    /// Flat index selected inside a nested container cell
    nested_sel: usize,
    /// Kind placed into grid cells
    place_kind: InsertKind,
    current_file: Option<PathBuf>,
    /// Folder of the last generation run; its user module feeds the preview merge
    output_dir: Option<PathBuf>,
    status_message: Option<(String, Instant)>,
    highlighter: Highlighter,
    syntax_highlighting: bool,
    /// `(relative path, content)` of the previewed artifacts
    artifacts: Vec<(String, String)>,
    artifact_tab: usize,
    degraded: Vec<String>,
    descriptors: Vec<CallbackDescriptor>,
    /// `(path-id, default as JSON)`
    state_rows: Vec<(String, String)>,
    json_buffer: String,
    /// Node whose fields are loaded in `field_buffers`
    inspector_for: Option<NodeId>,
    field_buffers: BTreeMap<String, String>,
    new_field: (String, String),
}

impl LayoutBuilderApp {
    pub(crate) fn new(settings: Settings) -> Self {
        let grid_size = (settings.grid_rows, settings.grid_cols);
        let mut app = Self {
            syntax_highlighting: settings.syntax_highlighting,
            settings,
            tree: LayoutTree::default(),
            selected: None,
            insert_kind: InsertKind::Widget(WidgetType::Button),
            central_tab: CentralTab::default(),
            grid: None,
            grid_error: None,
            grid_cell: (0, 0),
            grid_size,
            nested_sel: 0,
            place_kind: InsertKind::Widget(WidgetType::Button),
            current_file: None,
            output_dir: None,
            status_message: None,
            highlighter: Highlighter::new(),
            artifacts: Vec::new(),
            artifact_tab: 0,
            degraded: Vec::new(),
            descriptors: Vec::new(),
            state_rows: Vec::new(),
            json_buffer: String::new(),
            inspector_for: None,
            field_buffers: BTreeMap::new(),
            new_field: (String::new(), String::new()),
        };
        app.refresh_preview();
        app
    }

    /// Set a status message that will auto-clear after a few seconds
    fn set_status(&mut self, msg: String) {
        log::info!("{msg}");
        let stamped = format!("[{}] {msg}", chrono::Local::now().format("%H:%M:%S"));
        self.status_message = Some((stamped, Instant::now()));
    }

    fn options(&self) -> GenerateOptions {
        GenerateOptions::from_settings(&self.settings)
    }

    /// Re-renders the artifact preview and the binding tables.
    fn refresh_preview(&mut self) {
        let opts = self.options();
        let previous = self.output_dir.as_ref().and_then(|dir| {
            DirTarget::new(dir.clone()).read(&format!("{}.rs", opts.module_name()))
        });
        let artifacts = generate::render_artifacts(
            &self.tree,
            previous.as_deref(),
            &opts,
            &RendererRegistry::builtin(),
        );
        self.artifacts = artifacts.files;
        self.degraded = artifacts.degraded;
        self.artifact_tab = self.artifact_tab.min(self.artifacts.len().saturating_sub(1));
        self.descriptors = resolve::callbacks(&self.tree);
        self.state_rows = resolve::state_entries(&self.tree)
            .into_iter()
            .map(|e| (e.path_id, e.default.to_string()))
            .collect();
    }

    /// The tree changed outside the grid editor.
    fn tree_changed(&mut self) {
        self.grid = None;
        self.grid_error = None;
        self.refresh_preview();
    }

    fn replace_tree(&mut self, tree: LayoutTree) {
        self.tree = tree;
        self.selected = None;
        self.inspector_for = None;
        self.field_buffers.clear();
        self.tree_changed();
    }

    fn load_document(&mut self, path: PathBuf) {
        match LayoutDocument::load(&path) {
            Ok(doc) => {
                self.replace_tree(LayoutTree::from_document(&doc));
                self.set_status(format!("Loaded {}", path.display()));
                self.current_file = Some(path);
            }
            Err(e) => self.set_status(format!("Load failed: {e}")),
        }
    }

    fn save_document(&mut self, path: PathBuf) {
        match self.tree.to_document().save(&path) {
            Ok(()) => {
                self.set_status(format!("Saved {}", path.display()));
                self.current_file = Some(path);
            }
            Err(e) => self.set_status(format!("Save failed: {e}")),
        }
    }

    fn save_or_prompt(&mut self) {
        let path = self.current_file.clone().or_else(|| {
            rfd::FileDialog::new()
                .add_filter("Layout Document", &["json"])
                .set_file_name("layout.json")
                .save_file()
        });
        if let Some(path) = path {
            self.save_document(path);
        }
    }

    fn generate_to(&mut self, dir: PathBuf) {
        let mut target = DirTarget::new(dir.clone());
        match generate::generate(&self.tree.to_document(), &mut target, &self.options()) {
            Ok(report) => {
                let m = &report.merge;
                let mut msg = format!(
                    "Generated {} files in {} ({} kept, {} new, {} dropped)",
                    report.written.len(),
                    dir.display(),
                    m.preserved.len() + m.legacy.len(),
                    m.fresh.len(),
                    m.dropped.len()
                );
                if !report.degraded.is_empty() {
                    msg.push_str(&format!(", {} placeholder widgets", report.degraded.len()));
                }
                self.output_dir = Some(dir);
                self.refresh_preview();
                self.set_status(msg);
            }
            Err(e) => self.set_status(format!("Generation failed: {e}")),
        }
    }

    fn export_json(&mut self) {
        match self.tree.to_document().to_json_pretty() {
            Ok(text) => {
                self.json_buffer = text;
                self.central_tab = CentralTab::Document;
            }
            Err(e) => self.set_status(format!("Export failed: {e}")),
        }
    }

    fn import_json(&mut self) {
        match LayoutDocument::from_json_str(&self.json_buffer) {
            Ok(doc) => {
                self.replace_tree(LayoutTree::from_document(&doc));
                self.set_status("Imported document from JSON".into());
            }
            Err(e) => self.set_status(format!("Import failed: {e}")),
        }
    }

    fn selected_path(&self) -> Vec<usize> {
        self.selected
            .and_then(|id| self.tree.structural_path(id))
            .unwrap_or_default()
    }

    fn delete_selected(&mut self) {
        let path = self.selected_path();
        if path.is_empty() {
            self.set_status("The root cannot be deleted".into());
            return;
        }
        if self.tree.delete(&path) {
            self.selected = None;
            self.inspector_for = None;
            self.tree_changed();
        }
    }

    fn move_selected(&mut self, direction: isize) {
        let path = self.selected_path();
        if self.tree.move_node(&path, direction) {
            self.tree_changed();
        }
    }

    fn top_bar(&mut self, ui: &mut egui::Ui) {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed().as_secs() < 4 {
                ui.horizontal(|ui| {
                    ui.label(msg);
                });
            } else {
                self.status_message = None;
            }
        }

        egui::MenuBar::new().ui(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui
                    .button("New Layout")
                    .on_hover_text("Start an empty layout")
                    .clicked()
                {
                    self.replace_tree(LayoutTree::default());
                    self.current_file = None;
                    self.set_status("New layout created".into());
                    ui.close_kind(egui::UiKind::Menu);
                }
                ui.separator();
                if ui
                    .button("Open...")
                    .on_hover_text("Open a layout document")
                    .clicked()
                {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Layout Document", &["json"])
                        .pick_file()
                    {
                        self.load_document(path);
                    }
                    ui.close_kind(egui::UiKind::Menu);
                }
                if ui
                    .button("Save")
                    .on_hover_text("Save the layout (Ctrl+S)")
                    .clicked()
                {
                    self.save_or_prompt();
                    ui.close_kind(egui::UiKind::Menu);
                }
                if ui
                    .button("Save As...")
                    .on_hover_text("Save the layout to a new file")
                    .clicked()
                {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Layout Document", &["json"])
                        .set_file_name("layout.json")
                        .save_file()
                    {
                        self.save_document(path);
                    }
                    ui.close_kind(egui::UiKind::Menu);
                }
                ui.separator();
                if ui
                    .button("Generate Into Folder...")
                    .on_hover_text("Write the egui artifacts and merge the callback stubs")
                    .clicked()
                {
                    if let Some(dir) = rfd::FileDialog::new().pick_folder() {
                        self.generate_to(dir);
                    }
                    ui.close_kind(egui::UiKind::Menu);
                }
                let regenerate = ui
                    .add_enabled(self.output_dir.is_some(), egui::Button::new("Regenerate"))
                    .on_hover_text("Generate into the last folder again (Ctrl+G)");
                if regenerate.clicked() {
                    if let Some(dir) = self.output_dir.clone() {
                        self.generate_to(dir);
                    }
                    ui.close_kind(egui::UiKind::Menu);
                }
                ui.separator();
                if ui
                    .button("Export JSON")
                    .on_hover_text("Show the document as JSON")
                    .clicked()
                {
                    self.export_json();
                    ui.close_kind(egui::UiKind::Menu);
                }
                if ui
                    .button("Import JSON")
                    .on_hover_text("Replace the layout with the JSON in the document tab")
                    .clicked()
                {
                    self.import_json();
                    ui.close_kind(egui::UiKind::Menu);
                }
            });

            ui.menu_button("Settings", |ui| {
                let mut changed = false;
                changed |= ui
                    .checkbox(&mut self.settings.merge_stubs, "Merge callback stubs")
                    .on_hover_text("Keep hand-written callback bodies when regenerating")
                    .changed();
                changed |= ui
                    .checkbox(&mut self.settings.state_defaults, "Write state defaults")
                    .changed();
                ui.horizontal(|ui| {
                    ui.label("User module:");
                    changed |= ui
                        .text_edit_singleline(&mut self.settings.user_module)
                        .lost_focus();
                });
                ui.horizontal(|ui| {
                    ui.label("Generated dir:");
                    let mut dir = self.settings.internal_dir.clone().unwrap_or_default();
                    if ui.text_edit_singleline(&mut dir).lost_focus() {
                        let dir = dir.trim().to_owned();
                        self.settings.internal_dir = (!dir.is_empty()).then_some(dir);
                        changed = true;
                    }
                });
                ui.separator();
                ui.horizontal(|ui| {
                    ui.label("New grid:");
                    ui.add(egui::DragValue::new(&mut self.settings.grid_rows).range(1..=64));
                    ui.label("×");
                    ui.add(egui::DragValue::new(&mut self.settings.grid_cols).range(1..=64));
                });
                ui.separator();
                if ui.button("Save Settings").clicked() {
                    self.settings.syntax_highlighting = self.syntax_highlighting;
                    match self.settings.save() {
                        Ok(()) => self.set_status("Settings saved".into()),
                        Err(e) => self.set_status(format!("Saving settings failed: {e}")),
                    }
                    ui.close_kind(egui::UiKind::Menu);
                }
                if changed {
                    self.refresh_preview();
                }
            });

            if let Some(path) = &self.current_file {
                ui.separator();
                ui.weak(path.display().to_string());
            }
        });
    }

    fn outline_ui(&mut self, ui: &mut egui::Ui) {
        ui.heading("Outline");
        ui.horizontal(|ui| {
            let path = self.selected_path();
            if ui.button("◀").on_hover_text("Previous node").clicked()
                && let Some(prev) = self.tree.previous_path(&path)
            {
                self.selected = self.tree.get_node(&prev);
            }
            if ui.button("▶").on_hover_text("Next node").clicked()
                && let Some(next) = self.tree.next_path(&path)
            {
                self.selected = self.tree.get_node(&next);
            }
            if ui.button("⬆").on_hover_text("Move up among siblings").clicked() {
                self.move_selected(-1);
            }
            if ui.button("⬇").on_hover_text("Move down among siblings").clicked() {
                self.move_selected(1);
            }
            if ui.button("🗑").on_hover_text("Delete (Del)").clicked() {
                self.delete_selected();
            }
        });
        ui.horizontal(|ui| {
            kind_combo(ui, "outline_insert_kind", &mut self.insert_kind);
            if ui.button("Add child").clicked() {
                let parent = self.selected.unwrap_or(self.tree.root());
                match self.tree.add_child_to(parent, &self.insert_kind) {
                    Some(id) => {
                        self.selected = Some(id);
                        self.tree_changed();
                    }
                    None => self.set_status(format!(
                        "Cannot add {} below the selected node",
                        self.insert_kind
                    )),
                }
            }
        });
        ui.separator();

        let mut clicked = None;
        egui::ScrollArea::vertical()
            .id_salt("outline_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for path in self.tree.list_depth_first() {
                    let Some(id) = self.tree.get_node(&path) else {
                        continue;
                    };
                    let Some(node) = self.tree.node(id) else {
                        continue;
                    };
                    ui.horizontal(|ui| {
                        ui.add_space(path.len() as f32 * 14.0);
                        let text = outline_text(node);
                        let text = if self.degraded_node(id) {
                            text.color(Color32::from_rgb(230, 160, 60))
                        } else {
                            text
                        };
                        if ui
                            .selectable_label(self.selected == Some(id), text)
                            .clicked()
                        {
                            clicked = Some(id);
                        }
                    });
                }
            });
        if let Some(id) = clicked {
            self.selected = Some(id);
        }
    }

    fn degraded_node(&self, id: NodeId) -> bool {
        !self.degraded.is_empty()
            && self
                .tree
                .path_id(id)
                .is_some_and(|pid| self.degraded.contains(&pid))
    }

    fn inspector_ui(&mut self, ui: &mut egui::Ui) {
        ui.heading("Inspector");
        ui.separator();
        let Some(id) = self.selected else {
            ui.label("Select a node in the outline.");
            return;
        };
        let Some(node) = self.tree.node(id).cloned() else {
            self.selected = None;
            return;
        };
        if self.inspector_for != Some(id) {
            self.field_buffers.clear();
            self.inspector_for = Some(id);
        }
        let path_id = self.tree.path_id(id).unwrap_or_default();
        ui.horizontal(|ui| {
            ui.label("Path-ID:");
            if path_id.is_empty() {
                ui.weak("(root)");
            } else {
                ui.monospace(&path_id);
            }
        });
        if let Some(d) = self.descriptors.iter().find(|d| d.path_id == path_id) {
            ui.horizontal(|ui| {
                ui.label("Callback:");
                ui.monospace(&d.name);
            });
        }

        let mut edits: Vec<(String, Value)> = Vec::new();
        egui::Grid::new("inspector_fields")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui| {
                ui.label("id");
                let ident = Value::String(node.ident.clone());
                if let Some(v) = value_field(ui, &mut self.field_buffers, "id", &ident) {
                    edits.push(("id".into(), v));
                }
                ui.end_row();

                match &node.kind {
                    NodeKind::Widget { widget_type, .. } => {
                        ui.label("widget_type");
                        let mut chosen = widget_type.clone();
                        egui::ComboBox::from_id_salt("inspector_widget_type")
                            .selected_text(chosen.display_name())
                            .show_ui(ui, |ui| {
                                for t in &WidgetType::ALL {
                                    ui.selectable_value(&mut chosen, t.clone(), t.display_name());
                                }
                            });
                        if &chosen != widget_type {
                            edits.push(("widget_type".into(), Value::String(chosen.as_str().into())));
                        }
                        ui.end_row();
                    }
                    NodeKind::Container { layout_type } => {
                        ui.label("layout_type");
                        let mut chosen = layout_type.clone();
                        egui::ComboBox::from_id_salt("inspector_layout_type")
                            .selected_text(chosen.display_name())
                            .show_ui(ui, |ui| {
                                for t in &LayoutType::ALL {
                                    ui.selectable_value(&mut chosen, t.clone(), t.display_name());
                                }
                            });
                        if &chosen != layout_type {
                            edits.push(("layout_type".into(), Value::String(chosen.as_str().into())));
                        }
                        ui.end_row();
                    }
                    _ => {}
                }

                for (key, span) in [("col_span", node.col_span), ("row_span", node.row_span)] {
                    ui.label(key);
                    let current = span.map_or(Value::Null, Value::from);
                    if let Some(v) = value_field(ui, &mut self.field_buffers, key, &current) {
                        edits.push((key.into(), v));
                    }
                    ui.end_row();
                }
                for (key, value) in &node.fields {
                    ui.label(key);
                    if let Some(v) = value_field(ui, &mut self.field_buffers, key, value) {
                        edits.push((key.clone(), v));
                    }
                    ui.end_row();
                }
            });

        if let NodeKind::Widget { widget_type, props } = &node.kind {
            ui.separator();
            ui.strong("Properties");
            let specs = prop_specs(widget_type);
            egui::Grid::new("inspector_props")
                .num_columns(2)
                .striped(true)
                .show(ui, |ui| {
                    for spec in &specs {
                        ui.label(&spec.key);
                        let key = format!("props.{}", spec.key);
                        if spec.kind == PropKind::Boolean {
                            let mut on = prop_bool(props, &spec.key)
                                .unwrap_or_else(|| spec.default.as_bool().unwrap_or(false));
                            if ui.checkbox(&mut on, "").changed() {
                                edits.push((key, Value::Bool(on)));
                            }
                        } else {
                            let current = props.get(&spec.key).unwrap_or(&spec.default);
                            if let Some(v) = value_field(ui, &mut self.field_buffers, &key, current) {
                                edits.push((key, v));
                            }
                        }
                        ui.end_row();
                    }
                    for (name, value) in props {
                        if specs.iter().any(|s| &s.key == name) {
                            continue;
                        }
                        ui.label(name);
                        let key = format!("props.{name}");
                        if let Some(v) = value_field(ui, &mut self.field_buffers, &key, value) {
                            edits.push((key, v));
                        }
                        ui.end_row();
                    }
                });
        }

        ui.separator();
        ui.label("Add field (use props.<name> for widget properties)");
        ui.horizontal(|ui| {
            ui.add(egui::TextEdit::singleline(&mut self.new_field.0).desired_width(90.0).hint_text("key"));
            ui.add(egui::TextEdit::singleline(&mut self.new_field.1).desired_width(90.0).hint_text("value"));
            if ui.button("Set").clicked() && !self.new_field.0.trim().is_empty() {
                let (key, text) = std::mem::take(&mut self.new_field);
                edits.push((key.trim().to_owned(), parse_value_text(&text)));
            }
        });

        if edits.is_empty() {
            return;
        }
        let mut rejected = Vec::new();
        for (key, value) in edits {
            if !self.tree.set_node_property(id, &key, value) {
                rejected.push(key);
            }
        }
        if !rejected.is_empty() {
            self.set_status(format!("Cannot set {} on this node", rejected.join(", ")));
        }
        self.tree_changed();
    }

    /// Derives the grid projection the first time the grid tab is shown.
    fn ensure_grid(&mut self) {
        if self.grid.is_some() || self.grid_error.is_some() {
            return;
        }
        let root = self.tree.root();
        if self.tree.children(root).is_empty() {
            self.grid = Some(GridState::new(self.settings.grid_rows, self.settings.grid_cols));
        } else {
            match GridState::from_tree(&self.tree) {
                Ok(grid) => self.grid = Some(grid),
                Err(e) => {
                    log::warn!("{e}");
                    self.grid_error = Some(e.to_string());
                }
            }
        }
        if let Some(grid) = &self.grid {
            self.grid_size = (grid.rows(), grid.cols());
            self.grid_cell = grid.clamp(self.grid_cell);
        }
    }

    fn grid_ui(&mut self, ui: &mut egui::Ui) {
        self.ensure_grid();
        if let Some(err) = self.grid_error.clone() {
            ui.colored_label(Color32::from_rgb(230, 110, 90), err);
            ui.label("Edit this layout in the outline, or replace it with an empty grid.");
            if ui.button("Start Empty Grid").clicked() {
                let grid = GridState::new(self.settings.grid_rows, self.settings.grid_cols);
                self.replace_tree(grid.to_tree());
            }
            return;
        }
        let Some(grid) = &self.grid else {
            return;
        };

        let mut action = None;
        let (sel_row, sel_col) = self.grid_cell;

        ui.horizontal(|ui| {
            ui.label("Size:");
            ui.add(egui::DragValue::new(&mut self.grid_size.0).range(1..=64));
            ui.label("×");
            ui.add(egui::DragValue::new(&mut self.grid_size.1).range(1..=64));
            if ui.button("Resize").clicked() {
                action = Some(GridAction::Resize(self.grid_size.0, self.grid_size.1));
            }
            ui.separator();
            for op in FlatOp::ALL {
                if ui.button(op.label()).clicked() {
                    action = Some(GridAction::Op(op));
                }
            }
        });
        ui.horizontal(|ui| {
            kind_combo(ui, "grid_place_kind", &mut self.place_kind);
            if ui.button("Place").on_hover_text("Put a new node into the selected cell").clicked() {
                action = Some(GridAction::Place);
            }
            if ui.button("Clear").clicked() {
                action = Some(GridAction::Clear);
            }
            ui.separator();
            ui.label("Swap:");
            for dir in Direction::ALL {
                if ui.button(direction_arrow(dir)).clicked() {
                    action = Some(GridAction::Swap(dir));
                }
            }
        });
        ui.separator();

        egui::ScrollArea::both()
            .id_salt("grid_scroll")
            .max_height(ui.available_height() * 0.55)
            .show(ui, |ui| {
                egui::Grid::new("grid_cells")
                    .num_columns(grid.cols() + 1)
                    .spacing([6.0, 6.0])
                    .show(ui, |ui| {
                        for r in 0..grid.rows() {
                            let mut align = grid.row_align(r);
                            egui::ComboBox::from_id_salt(("row_align", r))
                                .width(70.0)
                                .selected_text(align.as_str())
                                .show_ui(ui, |ui| {
                                    for a in RowAlign::ALL {
                                        ui.selectable_value(&mut align, a, a.as_str());
                                    }
                                });
                            if align != grid.row_align(r) {
                                action = Some(GridAction::Align(r, align));
                            }
                            for c in 0..grid.cols() {
                                let text = grid.cell(r, c).map_or_else(|| "·".to_owned(), NodeSpec::summary);
                                let label = egui::Button::selectable(
                                    (r, c) == (sel_row, sel_col),
                                    RichText::new(text).monospace(),
                                )
                                .min_size(egui::vec2(110.0, 28.0));
                                if ui.add(label).clicked() {
                                    self.grid_cell = (r, c);
                                    self.nested_sel = 0;
                                }
                            }
                            ui.end_row();
                        }
                    });
            });

        if let Some(spec) = grid.cell(sel_row, sel_col) {
            ui.separator();
            nested_ui(ui, spec, &mut self.nested_sel, &mut action);
        }

        if let Some(action) = action {
            self.apply_grid_action(action);
        }
    }

    fn apply_grid_action(&mut self, action: GridAction) {
        let Some(grid) = self.grid.as_mut() else {
            return;
        };
        let (r, c) = self.grid_cell;
        let mut cell = (r, c);
        let mut nested = self.nested_sel;
        let result: Result<String, EditError> = match action {
            GridAction::Op(FlatOp::InsertCell) => grid.insert_cell(r, c).map(|()| "Inserted cell".into()),
            GridAction::Op(FlatOp::InsertRow) => {
                grid.insert_row(r);
                Ok(format!("Inserted row {r}"))
            }
            GridAction::Op(FlatOp::InsertColumn) => {
                grid.insert_column(c);
                Ok(format!("Inserted column {c}"))
            }
            GridAction::Op(FlatOp::DeleteCell) => grid.delete_cell(r, c).map(|_| "Deleted cell".into()),
            GridAction::Op(FlatOp::DeleteRow) => grid.delete_row(r).map(|_| format!("Deleted row {r}")),
            GridAction::Op(FlatOp::DeleteColumn) => {
                grid.delete_column(c).map(|_| format!("Deleted column {c}"))
            }
            GridAction::Swap(dir) => grid.swap(r, c, dir).map(|pos| {
                cell = pos;
                "Swapped cells".into()
            }),
            GridAction::Place => grid.place(r, c, &self.place_kind).map(|id| format!("Placed {id}")),
            GridAction::Clear => grid.set_cell(r, c, None).map(|_| "Cleared cell".into()),
            GridAction::Resize(rows, cols) => {
                grid.resize(rows, cols);
                Ok(format!("Resized grid to {rows}×{cols}"))
            }
            GridAction::Align(row, align) => {
                grid.set_row_align(row, align);
                Ok(format!("Row {row} aligned {align}"))
            }
            GridAction::Nested(op) => grid.edit_nested(r, c, nested, op).map(|edit| {
                nested = edit.selection;
                op.label().to_owned()
            }),
            GridAction::NestedSwap(dir) => grid.swap_nested(r, c, nested, dir).map(|sel| {
                nested = sel;
                "Swapped nested children".into()
            }),
            GridAction::NestedPlace => grid
                .place_nested(r, c, nested, &self.place_kind)
                .map(|id| format!("Placed {id}")),
        };
        self.grid_cell = grid.clamp(cell);
        self.grid_size = (grid.rows(), grid.cols());
        self.nested_sel = nested;
        match result {
            Ok(msg) => {
                if let Some(grid) = &self.grid {
                    grid.apply_to(&mut self.tree);
                }
                self.selected = None;
                self.inspector_for = None;
                self.refresh_preview();
                log::debug!("{msg}");
            }
            Err(e) => self.set_status(format!("Edit rejected: {e}")),
        }
    }

    fn code_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Generated Output");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.checkbox(&mut self.syntax_highlighting, "Syntax Highlighting")
                    .on_hover_text("Toggle syntax highlighting (may affect performance with large code)");
            });
        });
        if !self.degraded.is_empty() {
            ui.colored_label(
                Color32::from_rgb(230, 160, 60),
                format!("Rendered as placeholders: {}", self.degraded.join(", ")),
            );
        }
        ui.horizontal_wrapped(|ui| {
            for (i, (name, _)) in self.artifacts.iter().enumerate() {
                if ui.selectable_label(self.artifact_tab == i, name.as_str()).clicked() {
                    self.artifact_tab = i;
                }
            }
        });
        ui.separator();
        if let Some((name, text)) = self.artifacts.get(self.artifact_tab) {
            let highlighter = self.syntax_highlighting.then_some(&self.highlighter);
            if ui.button("Copy").clicked() {
                ui.ctx().copy_text(text.clone());
            }
            code_viewer(ui, highlighter, text, CodeLanguage::for_file(name), "artifact_view");
        }
    }

    fn bindings_ui(&mut self, ui: &mut egui::Ui) {
        ui.heading("Callbacks");
        TableBuilder::new(ui)
            .id_salt("callback_table")
            .striped(true)
            .resizable(true)
            .column(Column::auto())
            .column(Column::auto())
            .column(Column::auto())
            .column(Column::remainder())
            .max_scroll_height(260.0)
            .header(20.0, |mut header| {
                for title in ["Callback", "Kind", "Path-ID", "Merge key"] {
                    header.col(|ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|mut body| {
                for d in &self.descriptors {
                    body.row(18.0, |mut row| {
                        row.col(|ui| {
                            ui.monospace(&d.name);
                        });
                        row.col(|ui| {
                            ui.label(d.kind.suffix());
                        });
                        row.col(|ui| {
                            ui.monospace(&d.path_id);
                        });
                        row.col(|ui| {
                            ui.monospace(&d.merge_key);
                        });
                    });
                }
            });

        ui.add_space(12.0);
        ui.heading("State Defaults");
        TableBuilder::new(ui)
            .id_salt("state_table")
            .striped(true)
            .column(Column::auto())
            .column(Column::remainder())
            .header(20.0, |mut header| {
                header.col(|ui| {
                    ui.strong("Path-ID");
                });
                header.col(|ui| {
                    ui.strong("Default");
                });
            })
            .body(|mut body| {
                for (path_id, default) in &self.state_rows {
                    body.row(18.0, |mut row| {
                        row.col(|ui| {
                            ui.monospace(path_id);
                        });
                        row.col(|ui| {
                            ui.monospace(default);
                        });
                    });
                }
            });
    }

    fn document_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Export").on_hover_text("Show the current layout").clicked() {
                self.export_json();
            }
            if ui.button("Import").on_hover_text("Replace the layout with this JSON").clicked() {
                self.import_json();
            }
        });
        egui::ScrollArea::vertical()
            .id_salt("document_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.add(
                    egui::TextEdit::multiline(&mut self.json_buffer)
                        .code_editor()
                        .desired_rows(24)
                        .desired_width(f32::INFINITY),
                );
            });
    }
}

impl eframe::App for LayoutBuilderApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let typing = ctx.wants_keyboard_input();
        let (save_pressed, generate_pressed, delete_pressed, prev_pressed, next_pressed) =
            ctx.input(|i| {
                let save = i.modifiers.command && i.key_pressed(egui::Key::S);
                let gen_code = i.modifiers.command && i.key_pressed(egui::Key::G);
                let del = !typing && i.key_pressed(egui::Key::Delete);
                // Alt+arrows walk the outline in pre-order
                let prev = i.modifiers.alt && i.key_pressed(egui::Key::ArrowUp);
                let next = i.modifiers.alt && i.key_pressed(egui::Key::ArrowDown);
                (save, gen_code, del, prev, next)
            });

        if save_pressed {
            self.save_or_prompt();
        }
        if generate_pressed {
            match self.output_dir.clone() {
                Some(dir) => self.generate_to(dir),
                None => self.set_status("Pick a folder with File > Generate Into Folder first".into()),
            }
        }
        if delete_pressed && self.selected.is_some() {
            self.delete_selected();
        }
        if prev_pressed || next_pressed {
            let path = self.selected_path();
            let moved = if prev_pressed {
                self.tree.previous_path(&path)
            } else {
                self.tree.next_path(&path)
            };
            if let Some(p) = moved {
                self.selected = self.tree.get_node(&p);
            }
        }

        egui::TopBottomPanel::top("menubar").show(ctx, |ui| self.top_bar(ui));
        egui::SidePanel::left("outline")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| self.outline_ui(ui));
        egui::SidePanel::right("inspector")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt("inspector_scroll")
                    .show(ui, |ui| self.inspector_ui(ui));
            });
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                for tab in CentralTab::ALL {
                    if ui
                        .selectable_label(self.central_tab == tab, tab.display_name())
                        .clicked()
                    {
                        self.central_tab = tab;
                    }
                }
            });
            ui.separator();
            match self.central_tab {
                CentralTab::Grid => self.grid_ui(ui),
                CentralTab::Code => self.code_ui(ui),
                CentralTab::Bindings => self.bindings_ui(ui),
                CentralTab::Document => self.document_ui(ui),
            }
        });
    }
}

/// Editor for the flat child list of a container cell.
fn nested_ui(
    ui: &mut egui::Ui,
    spec: &NodeSpec,
    selected: &mut usize,
    action: &mut Option<GridAction>,
) {
    let layout = match spec {
        NodeSpec::Container(c) => Some(&c.layout_type),
        NodeSpec::Group(_) | NodeSpec::Tab(_) => None,
        NodeSpec::Widget(_) | NodeSpec::Placeholder(_) => return,
    };
    let Some(shape) = FlatShape::for_container(layout, spec.fields()) else {
        ui.weak("Tab sets are edited in the outline.");
        return;
    };
    ui.strong(format!("Inside {}", spec.summary()));
    ui.horizontal_wrapped(|ui| {
        for op in FlatOp::ALL {
            if ui.small_button(op.label()).clicked() {
                *action = Some(GridAction::Nested(op));
            }
        }
        ui.separator();
        for dir in Direction::ALL {
            if ui.small_button(direction_arrow(dir)).clicked() {
                *action = Some(GridAction::NestedSwap(dir));
            }
        }
        if ui.small_button("Place here").clicked() {
            *action = Some(GridAction::NestedPlace);
        }
    });
    let children = spec.children();
    if children.is_empty() {
        ui.weak("No children yet; insert a cell to start.");
        return;
    }
    egui::Grid::new("nested_cells")
        .num_columns(shape.cols)
        .spacing([4.0, 4.0])
        .show(ui, |ui| {
            for (i, child) in children.iter().enumerate() {
                if ui
                    .selectable_label(*selected == i, RichText::new(child.summary()).monospace())
                    .clicked()
                {
                    *selected = i;
                }
                if (i + 1) % shape.cols.max(1) == 0 {
                    ui.end_row();
                }
            }
        });
}

fn kind_combo(ui: &mut egui::Ui, id_salt: &str, kind: &mut InsertKind) {
    egui::ComboBox::from_id_salt(id_salt)
        .selected_text(kind.name().to_owned())
        .show_ui(ui, |ui| {
            for k in InsertKind::all() {
                let name = k.name().to_owned();
                ui.selectable_value(kind, k, name);
            }
        });
}

const fn direction_arrow(dir: Direction) -> &'static str {
    match dir {
        Direction::Up => "⬆",
        Direction::Down => "⬇",
        Direction::Left => "⬅",
        Direction::Right => "➡",
    }
}

fn outline_text(node: &Node) -> RichText {
    match &node.kind {
        NodeKind::Widget { widget_type, .. } => {
            RichText::new(format!("{} ({})", node.ident, widget_type.display_name()))
        }
        NodeKind::Container { layout_type } => {
            RichText::new(format!("{} [{}]", node.ident, layout_type.display_name())).strong()
        }
        NodeKind::Group => RichText::new(format!("{} [group]", node.ident)).strong(),
        NodeKind::Tab => RichText::new(format!("{} [tab]", node.ident)).italics(),
        NodeKind::Placeholder => RichText::new("(empty slot)").weak(),
    }
}

/// Text form of a field value: strings raw, everything else as JSON.
fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Parses inspector text: JSON when it parses, a plain string otherwise.
/// Blank text clears the field.
fn parse_value_text(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(text.to_owned()))
}

/// Single-line editor bound to a text buffer. Returns the parsed value
/// when editing finishes with a change.
fn value_field(
    ui: &mut egui::Ui,
    buffers: &mut BTreeMap<String, String>,
    key: &str,
    current: &Value,
) -> Option<Value> {
    let buffer = buffers
        .entry(key.to_owned())
        .or_insert_with(|| value_text(current));
    let response = ui.add(egui::TextEdit::singleline(buffer).desired_width(160.0));
    if !response.lost_focus() {
        return None;
    }
    let value = parse_value_text(buffer);
    (value != *current).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_text_round_trip() {
        assert_eq!(parse_value_text(&value_text(&json!("Power"))), json!("Power"));
        assert_eq!(parse_value_text(&value_text(&json!(3))), json!(3));
        assert_eq!(parse_value_text(&value_text(&json!([1, 2]))), json!([1, 2]));
        assert_eq!(parse_value_text("  "), Value::Null);
        assert_eq!(parse_value_text("not json"), json!("not json"));
    }

    #[test]
    fn test_grid_action_commits_to_tree() {
        let mut app = LayoutBuilderApp::new(Settings::default());
        app.ensure_grid();
        app.place_kind = InsertKind::Widget(WidgetType::Checkbox);
        app.apply_grid_action(GridAction::Place);
        assert_eq!(app.tree.widget_path_ids(), vec!["row_0.widget_1"]);
        assert_eq!(app.descriptors.len(), 1);
        assert_eq!(app.state_rows, vec![("row_0.widget_1".to_owned(), "false".to_owned())]);

        app.apply_grid_action(GridAction::Op(FlatOp::DeleteRow));
        assert!(app.tree.widget_path_ids().is_empty());
    }

    #[test]
    fn test_rejected_edit_keeps_tree() {
        let mut app = LayoutBuilderApp::new(Settings {
            grid_rows: 1,
            grid_cols: 1,
            ..Settings::default()
        });
        app.ensure_grid();
        let before = app.tree.to_document();
        app.apply_grid_action(GridAction::Op(FlatOp::DeleteRow));
        assert_eq!(app.tree.to_document(), before);
        assert!(app.status_message.is_some());
    }
}
