//! UI construction code: turns a layout tree into an egui `build_ui`
//! function with no runtime dependency on the document.

use super::{CodeWriter, css_px, float_lit};
use crate::{
    project::{Appearance, LayoutType},
    tree::{LayoutTree, Node, NodeId, NodeKind},
    widget::{PlotKind, Presentation, PropMap, TableColumn, WidgetProps, WidgetType, css_value, lit, value_to_f64},
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Everything a widget renderer may look at.
#[derive(Clone, Debug)]
pub struct WidgetContext<'a> {
    pub path_id: &'a str,
    pub ident: &'a str,
    pub widget_type: &'a WidgetType,
    pub props: &'a PropMap,
}

impl WidgetContext<'_> {
    pub fn view(&self) -> WidgetProps {
        WidgetProps::from_map(self.widget_type, self.props, self.ident)
    }

    /// Quoted state/callback key.
    pub fn key(&self) -> String {
        lit(self.path_id)
    }
}

pub type Renderer = fn(&mut CodeWriter, &WidgetContext<'_>);

/// Widget type to renderer lookup with a placeholder fallback.
#[derive(Clone)]
pub struct RendererRegistry {
    renderers: HashMap<WidgetType, Renderer>,
    fallback: Renderer,
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RendererRegistry {
    /// No renderers; every widget degrades to the placeholder.
    pub fn empty() -> Self {
        Self {
            renderers: HashMap::new(),
            fallback: render_placeholder,
        }
    }

    pub fn builtin() -> Self {
        let mut r = Self::empty();
        r.register(WidgetType::Checkbox, render_checkbox);
        r.register(WidgetType::ToggleButton, render_toggle);
        r.register(WidgetType::Slider, render_slider);
        r.register(WidgetType::GainControl, render_slider);
        r.register(WidgetType::Button, render_button);
        r.register(WidgetType::NumberInput, render_number_input);
        r.register(WidgetType::Input, render_input);
        r.register(WidgetType::Select, render_select);
        r.register(WidgetType::Label, render_label);
        r.register(WidgetType::Link, render_link);
        r.register(WidgetType::Image, render_image);
        r.register(WidgetType::Table, render_table);
        r.register(WidgetType::Markdown, render_markdown);
        for kind in PlotKind::ALL {
            r.register(WidgetType::Plot(kind), render_graph);
        }
        r.register(WidgetType::Banner, render_banner);
        r.register(WidgetType::VuMeter, render_vu_meter);
        r.register(WidgetType::Led, render_led);
        r.register(WidgetType::ImageIcon, render_image_icon);
        r
    }

    pub fn register(&mut self, widget_type: WidgetType, renderer: Renderer) -> Option<Renderer> {
        self.renderers.insert(widget_type, renderer)
    }

    pub fn supports(&self, widget_type: &WidgetType) -> bool {
        self.renderers.contains_key(widget_type)
    }

    pub fn renderer(&self, widget_type: &WidgetType) -> Renderer {
        self.renderers
            .get(widget_type)
            .copied()
            .unwrap_or(self.fallback)
    }
}

/// Generated `ui.rs` plus the path-ids that fell back to a placeholder.
#[derive(Clone, Debug, PartialEq)]
pub struct UiArtifact {
    pub source: String,
    pub degraded: Vec<String>,
}

const PRELUDE: &str = r##"#![allow(dead_code, unused_mut, unused_variables)]

use eframe::egui;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

pub type State = BTreeMap<String, Value>;
pub type Callbacks = HashMap<String, Box<dyn FnMut(&Value)>>;

fn gen_invoke(callbacks: &mut Callbacks, key: &str, value: &Value) {
    if let Some(cb) = callbacks.get_mut(key) {
        cb(value);
    }
}

fn gen_value_changed(state: &mut State, callbacks: &mut Callbacks, key: &str, value: Value) {
    state.insert(key.to_owned(), value.clone());
    gen_invoke(callbacks, key, &value);
}

fn gen_clicked(callbacks: &mut Callbacks, key: &str) {
    gen_invoke(callbacks, key, &Value::Null);
}

fn gen_bool(state: &State, key: &str, default: bool) -> bool {
    state.get(key).and_then(Value::as_bool).unwrap_or(default)
}

fn gen_f64(state: &State, key: &str, default: f64) -> f64 {
    match state.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(default),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
        _ => default,
    }
}

fn gen_string(state: &State, key: &str) -> String {
    match state.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn gen_field(row: &Value, field: &str) -> String {
    match row.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn gen_color(hex: &str) -> Option<egui::Color32> {
    egui::Color32::from_hex(hex).ok()
}

struct GenFrame {
    fill: Option<&'static str>,
    padding: f32,
    radius: f32,
    gap: Option<f32>,
    full_width: bool,
}

fn gen_framed(ui: &mut egui::Ui, frame: GenFrame, add: impl FnOnce(&mut egui::Ui)) {
    let mut f = egui::Frame::NONE
        .inner_margin(frame.padding)
        .corner_radius(frame.radius);
    if let Some(c) = frame.fill.and_then(gen_color) {
        f = f.fill(c);
    }
    f.show(ui, |ui| {
        if frame.full_width {
            ui.set_min_width(ui.available_width());
        }
        if let Some(gap) = frame.gap {
            ui.spacing_mut().item_spacing = egui::vec2(gap, gap);
        }
        add(ui);
    });
}

struct GenStyle {
    text: Option<&'static str>,
    fill: Option<&'static str>,
    width: Option<f32>,
    min_width: Option<f32>,
    max_width: Option<f32>,
    grow: bool,
}

fn gen_styled(ui: &mut egui::Ui, style: GenStyle, add: impl FnOnce(&mut egui::Ui)) {
    let mut frame = egui::Frame::NONE;
    if let Some(c) = style.fill.and_then(gen_color) {
        frame = frame.fill(c).inner_margin(4.0);
    }
    frame.show(ui, |ui| {
        if let Some(c) = style.text.and_then(gen_color) {
            ui.visuals_mut().override_text_color = Some(c);
        }
        if let Some(w) = style.width {
            ui.set_width(w);
        }
        if let Some(w) = style.min_width {
            ui.set_min_width(w);
        }
        if let Some(w) = style.max_width {
            ui.set_max_width(w);
        }
        if style.grow {
            ui.set_min_width(ui.available_width());
        }
        add(ui);
    });
}

fn gen_cell(ui: &mut egui::Ui, col_span: u8, row_span: u8, add: impl FnOnce(&mut egui::Ui)) {
    ui.vertical(|ui| {
        if col_span > 1 {
            ui.set_min_width(f32::from(col_span) * 80.0);
        }
        if row_span > 1 {
            ui.set_min_height(f32::from(row_span) * 24.0);
        }
        add(ui);
    });
}

fn gen_plot_area(ui: &mut egui::Ui, title: &str, height: f32) -> egui::Response {
    egui::Frame::group(ui.style())
        .show(ui, |ui| {
            if !title.is_empty() {
                ui.strong(title);
            }
            let width = ui.available_width();
            let (rect, response) = ui.allocate_exact_size(egui::vec2(width, height), egui::Sense::click());
            let stroke = ui.visuals().widgets.noninteractive.bg_stroke;
            ui.painter().rect_stroke(rect, 2.0, stroke, egui::StrokeKind::Inside);
            response
        })
        .inner
}
"##;

/// Renders the `ui.rs` artifact for `tree`.
pub fn render(tree: &LayoutTree, registry: &RendererRegistry) -> UiArtifact {
    render_titled(tree, registry, None)
}

/// Like [`render`], also recording a window title as `TITLE`.
pub fn render_titled(tree: &LayoutTree, registry: &RendererRegistry, title: Option<&str>) -> UiArtifact {
    let mut e = UiEmitter {
        tree,
        registry,
        w: CodeWriter::new(),
        degraded: Vec::new(),
    };
    e.w.line("//! Generated by layout-builder. Regenerate instead of editing.");
    e.w.blank();
    e.w.block(PRELUDE);
    e.w.blank();
    e.w.line(format!(
        "pub const TITLE: Option<&str> = {};",
        opt_str(title)
    ));
    e.w.blank();
    e.w.open(
        "pub fn build_ui(ui: &mut egui::Ui, state: &mut State, callbacks: &mut Callbacks, title: Option<&str>) {",
    );
    e.w.open("if let Some(title) = title {");
    e.w.line("ui.heading(title);");
    e.w.line("ui.separator();");
    e.w.close("}");
    e.emit_page(tree.root());
    e.w.close("}");
    UiArtifact {
        source: e.w.finish(),
        degraded: e.degraded,
    }
}

/// Appearance defaults overlaid by the node's own `style`. Node values win;
/// empty values are dropped.
pub fn merge_container_style(node_style: Option<&Value>, appearance: &Appearance) -> BTreeMap<String, String> {
    let mut merged = BTreeMap::new();
    let defaults = appearance.container_defaults();
    if !defaults.is_empty() {
        for (k, v) in defaults {
            merged.insert(k.to_owned(), v);
        }
        merged.insert("width".to_owned(), "100%".to_owned());
        merged.insert("box-sizing".to_owned(), "border-box".to_owned());
    }
    if let Some(Value::Object(style)) = node_style {
        for (k, v) in style {
            if let Some(css) = css_value(v) {
                merged.insert(k.clone(), css);
            }
        }
    }
    merged
}

/// The part of a merged container style that maps onto an egui frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameStyle {
    pub fill: Option<String>,
    pub padding: Option<f64>,
    pub radius: Option<f64>,
    pub gap: Option<f64>,
    pub full_width: bool,
}

impl FrameStyle {
    pub fn from_css(css: &BTreeMap<String, String>) -> Self {
        let px = |k: &str| css.get(k).and_then(|v| css_px(v));
        Self {
            fill: css
                .get("background-color")
                .or_else(|| css.get("background"))
                .cloned(),
            padding: px("padding"),
            radius: px("border-radius"),
            gap: px("gap"),
            full_width: css.get("width").is_some_and(|w| w == "100%"),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn literal(&self) -> String {
        format!(
            "GenFrame {{ fill: {}, padding: {}, radius: {}, gap: {}, full_width: {} }}",
            opt_str(self.fill.as_deref()),
            float_lit(self.padding.unwrap_or(0.0)),
            float_lit(self.radius.unwrap_or(0.0)),
            opt_f32(self.gap),
            self.full_width
        )
    }
}

fn opt_str(v: Option<&str>) -> String {
    v.map_or_else(|| "None".to_owned(), |s| format!("Some({})", lit(s)))
}

fn opt_f32(v: Option<f64>) -> String {
    v.map_or_else(|| "None".to_owned(), |f| format!("Some({})", float_lit(f)))
}

fn style_literal(p: &Presentation) -> String {
    let px = |v: &Option<String>| opt_f32(v.as_deref().and_then(css_px));
    format!(
        "GenStyle {{ text: {}, fill: {}, width: {}, min_width: {}, max_width: {}, grow: {} }}",
        opt_str(p.text_color.as_deref()),
        opt_str(p.bg_color.as_deref()),
        px(&p.width),
        px(&p.min_width),
        px(&p.max_width),
        p.flex
    )
}

fn field_f64(node: &Node, key: &str, default: f64) -> f64 {
    node.fields.get(key).and_then(value_to_f64).unwrap_or(default)
}

fn clamp_span(span: Option<i64>) -> i64 {
    span.unwrap_or(1).clamp(1, 12)
}

fn join(prefix: &str, ident: &str) -> String {
    if prefix.is_empty() {
        ident.to_owned()
    } else {
        format!("{prefix}.{ident}")
    }
}

struct UiEmitter<'a> {
    tree: &'a LayoutTree,
    registry: &'a RendererRegistry,
    w: CodeWriter,
    degraded: Vec<String>,
}

impl UiEmitter<'_> {
    fn emit_page(&mut self, root: NodeId) {
        let appearance = &self.tree.appearance;
        let page = FrameStyle {
            fill: appearance.page_background(),
            padding: appearance.page_padding().as_deref().and_then(css_px),
            ..FrameStyle::default()
        };
        if page.is_empty() {
            self.emit_node(root, "", false);
        } else {
            self.w.open(format!("gen_framed(ui, {}, |ui| {{", page.literal()));
            self.emit_node(root, "", false);
            self.w.close("});");
        }
    }

    fn emit_node(&mut self, id: NodeId, path_id: &str, in_grid: bool) {
        let Some(node) = self.tree.node(id) else {
            return;
        };
        let spanned = in_grid && (clamp_span(node.col_span) > 1 || clamp_span(node.row_span) > 1);
        if spanned {
            self.w.open(format!(
                "gen_cell(ui, {}, {}, |ui| {{",
                clamp_span(node.col_span),
                clamp_span(node.row_span)
            ));
        }
        match &node.kind {
            NodeKind::Placeholder => {
                if in_grid {
                    self.w.line("ui.label(\"\");");
                }
            }
            NodeKind::Widget { widget_type, props } => {
                self.emit_widget(node, path_id, widget_type, props);
            }
            NodeKind::Container { layout_type } => {
                self.emit_container(id, node, path_id, layout_type);
            }
            NodeKind::Group | NodeKind::Tab => self.emit_group(id, node, path_id),
        }
        if spanned {
            self.w.close("});");
        }
    }

    fn emit_children(&mut self, id: NodeId, path_id: &str) {
        for &child in self.tree.children(id) {
            let pid = self.child_path(child, path_id);
            self.emit_node(child, &pid, false);
        }
    }

    fn child_path(&self, child: NodeId, path_id: &str) -> String {
        let ident = self.tree.node(child).map_or("", |n| n.ident.as_str());
        join(path_id, ident)
    }

    fn salt(node: &Node, path_id: &str) -> String {
        lit(if path_id.is_empty() { &node.ident } else { path_id })
    }

    fn emit_widget(&mut self, node: &Node, path_id: &str, widget_type: &WidgetType, props: &PropMap) {
        let ctx = WidgetContext {
            path_id,
            ident: &node.ident,
            widget_type,
            props,
        };
        if !self.registry.supports(widget_type) {
            log::warn!("No renderer for {widget_type} at {path_id}; emitting a placeholder");
            self.degraded.push(path_id.to_owned());
        }
        let presentation = Presentation::from_map(props);
        let styled = !presentation.is_empty();
        if styled {
            self.w
                .open(format!("gen_styled(ui, {}, |ui| {{", style_literal(&presentation)));
        }
        (self.registry.renderer(widget_type))(&mut self.w, &ctx);
        if styled {
            self.w.close("});");
        }
    }

    fn emit_group(&mut self, id: NodeId, node: &Node, path_id: &str) {
        self.w.open("ui.vertical(|ui| {");
        if let Some(label) = node.label().filter(|l| !l.is_empty()) {
            self.w.line(format!("ui.strong({});", lit(&label)));
            self.w.line("ui.separator();");
        }
        self.emit_children(id, path_id);
        self.w.close("});");
    }

    fn emit_container(&mut self, id: NodeId, node: &Node, path_id: &str, layout: &LayoutType) {
        let is_root = id == self.tree.root();
        let frame = if is_root {
            FrameStyle::default()
        } else {
            FrameStyle::from_css(&merge_container_style(node.fields.get("style"), &self.tree.appearance))
        };
        if !frame.is_empty() {
            self.w.open(format!("gen_framed(ui, {}, |ui| {{", frame.literal()));
        }
        let salt = Self::salt(node, path_id);
        match layout {
            LayoutType::Column => {
                self.w.open("ui.vertical(|ui| {");
                self.emit_children(id, path_id);
                self.w.close("});");
            }
            LayoutType::Grid => self.emit_grid(id, node, path_id, &salt),
            LayoutType::Expansion => {
                let label = node
                    .label()
                    .filter(|l| !l.is_empty())
                    .unwrap_or_else(|| node.ident.clone());
                self.w.open(format!(
                    "egui::CollapsingHeader::new({}).id_salt({salt}).default_open(true).show(ui, |ui| {{",
                    lit(&label)
                ));
                self.emit_children(id, path_id);
                self.w.close("});");
            }
            LayoutType::Scroll => {
                let max_height = if self.tree.appearance.scroll_flex() {
                    String::new()
                } else {
                    let h = node
                        .fields
                        .get("max_height")
                        .and_then(css_value)
                        .and_then(|v| css_px(&v))
                        .unwrap_or(300.0);
                    format!(".max_height({})", float_lit(h))
                };
                self.w.open(format!(
                    "egui::ScrollArea::vertical().id_salt({salt}).auto_shrink([false, true]){max_height}.show(ui, |ui| {{"
                ));
                self.emit_children(id, path_id);
                self.w.close("});");
            }
            LayoutType::Card => {
                self.w.open("egui::Frame::group(ui.style()).show(ui, |ui| {");
                self.emit_children(id, path_id);
                self.w.close("});");
            }
            LayoutType::Splitter => self.emit_splitter(id, node, path_id),
            LayoutType::Tabs => self.emit_tabs(id, path_id, &salt),
            LayoutType::Xy => self.emit_free(id, path_id),
            LayoutType::RowsColumns | LayoutType::Unknown(_) => {
                if let LayoutType::Unknown(name) = layout {
                    log::warn!("Unknown layout type {name} at {path_id}; rendering as a row");
                }
                let (align, justify) = match crate::grid::RowAlign::coerce(node.fields.get("align_items")) {
                    crate::grid::RowAlign::Start => ("Min", ""),
                    crate::grid::RowAlign::Center => ("Center", ""),
                    crate::grid::RowAlign::End => ("Max", ""),
                    crate::grid::RowAlign::Stretch => ("Center", ".with_cross_justify(true)"),
                };
                self.w.open(format!(
                    "ui.with_layout(egui::Layout::left_to_right(egui::Align::{align}).with_main_wrap(true){justify}, |ui| {{"
                ));
                self.emit_children(id, path_id);
                self.w.close("});");
            }
        }
        if !frame.is_empty() {
            self.w.close("});");
        }
    }

    fn emit_grid(&mut self, id: NodeId, node: &Node, path_id: &str, salt: &str) {
        let cols = node
            .count_field("columns")
            .unwrap_or(crate::grid::flat::DEFAULT_GRID_COLUMNS);
        self.w.open(format!(
            "egui::Grid::new({salt}).num_columns({cols}).show(ui, |ui| {{"
        ));
        let children = self.tree.children(id).to_vec();
        for (i, child) in children.iter().enumerate() {
            let pid = self.child_path(*child, path_id);
            self.emit_node(*child, &pid, true);
            if (i + 1) % cols == 0 {
                self.w.line("ui.end_row();");
            }
        }
        if children.len() % cols != 0 {
            self.w.line("ui.end_row();");
        }
        self.w.close("});");
    }

    fn emit_splitter(&mut self, id: NodeId, node: &Node, path_id: &str) {
        let children = self.tree.children(id).to_vec();
        if children.len() > 2 {
            log::debug!("Splitter {path_id} uses only its first two children");
        }
        let first = children.first().copied();
        let second = children.get(1).copied();
        let vertical = node
            .fields
            .get("orientation")
            .and_then(css_value)
            .is_some_and(|o| o.eq_ignore_ascii_case("vertical"));
        if vertical {
            self.w.open("ui.vertical(|ui| {");
            self.emit_pane(first, path_id);
            self.w.line("ui.separator();");
            self.emit_pane(second, path_id);
            self.w.close("});");
            return;
        }
        let ratio = field_f64(node, "value", 30.0).clamp(5.0, 95.0) / 100.0;
        self.w.open("ui.horizontal_top(|ui| {");
        self.w.line("let total = ui.available_width();");
        self.w.line("let height = ui.available_height();");
        self.w.open(format!(
            "ui.allocate_ui(egui::vec2(total * {}, height), |ui| {{",
            float_lit(ratio)
        ));
        self.emit_pane(first, path_id);
        self.w.close("});");
        self.w.line("ui.separator();");
        self.emit_pane(second, path_id);
        self.w.close("});");
    }

    fn emit_pane(&mut self, pane: Option<NodeId>, path_id: &str) {
        self.w.open("ui.vertical(|ui| {");
        if let Some(child) = pane {
            let pid = self.child_path(child, path_id);
            self.emit_node(child, &pid, false);
        }
        self.w.close("});");
    }

    fn emit_tabs(&mut self, id: NodeId, path_id: &str, salt: &str) {
        let tabs: Vec<NodeId> = self
            .tree
            .children(id)
            .iter()
            .copied()
            .filter(|c| {
                let is_tab = self.tree.node(*c).is_some_and(|n| n.kind == NodeKind::Tab);
                if !is_tab {
                    log::warn!("Skipping non-tab child of tab set {path_id}");
                }
                is_tab
            })
            .collect();
        if tabs.is_empty() {
            self.w.line("ui.weak(\"(no tabs)\");");
            return;
        }
        self.w.open("{");
        self.w.line(format!("let tabs_id = ui.id().with({salt});"));
        self.w
            .line("let mut current: usize = ui.data(|d| d.get_temp::<usize>(tabs_id)).unwrap_or(0);");
        self.w.open("ui.horizontal(|ui| {");
        for (i, tab) in tabs.iter().enumerate() {
            let Some(node) = self.tree.node(*tab) else {
                continue;
            };
            let label = node
                .label()
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| node.ident.clone());
            self.w
                .line(format!("ui.selectable_value(&mut current, {i}, {});", lit(&label)));
        }
        self.w.close("});");
        self.w.line("ui.data_mut(|d| d.insert_temp(tabs_id, current));");
        self.w.line("ui.separator();");
        self.w.open("match current {");
        for (i, tab) in tabs.iter().enumerate() {
            let pid = self.child_path(*tab, path_id);
            self.w.open(format!("{i} => {{"));
            self.emit_children(*tab, &pid);
            self.w.close("}");
        }
        self.w.line("_ => {}");
        self.w.close("}");
        self.w.close("}");
    }

    fn emit_free(&mut self, id: NodeId, path_id: &str) {
        let children = self.tree.children(id).to_vec();
        self.w.open("{");
        self.w.line("let origin = ui.cursor().min;");
        let (mut extent_w, mut extent_h) = (0.0_f64, 0.0_f64);
        for child in children {
            let Some(node) = self.tree.node(child) else {
                continue;
            };
            let x = field_f64(node, "x", 0.0);
            let y = field_f64(node, "y", 0.0);
            let w = field_f64(node, "w", 160.0);
            let h = field_f64(node, "h", 32.0);
            extent_w = extent_w.max(x + w);
            extent_h = extent_h.max(y + h);
            self.w.open(format!(
                "ui.scope_builder(egui::UiBuilder::new().max_rect(egui::Rect::from_min_size(origin + egui::vec2({}, {}), egui::vec2({}, {}))), |ui| {{",
                float_lit(x),
                float_lit(y),
                float_lit(w),
                float_lit(h)
            ));
            let pid = self.child_path(child, path_id);
            self.emit_node(child, &pid, false);
            self.w.close("});");
        }
        self.w.line(format!(
            "ui.allocate_space(egui::vec2({}, {}));",
            float_lit(extent_w),
            float_lit(extent_h)
        ));
        self.w.close("}");
    }
}

fn render_placeholder(w: &mut CodeWriter, ctx: &WidgetContext<'_>) {
    w.line(format!(
        "// unsupported widget type {} ({})",
        lit(ctx.widget_type.as_str()),
        ctx.path_id
    ));
    w.line(format!("ui.weak({});", lit(&format!("[{}]", ctx.widget_type))));
}

fn render_checkbox(w: &mut CodeWriter, ctx: &WidgetContext<'_>) {
    let WidgetProps::Checkbox { label, value } = ctx.view() else {
        return render_placeholder(w, ctx);
    };
    let key = ctx.key();
    w.open("{");
    w.line(format!("let mut value = gen_bool(state, {key}, {value});"));
    w.open(format!("if ui.checkbox(&mut value, {}).changed() {{", lit(&label)));
    w.line(format!("gen_value_changed(state, callbacks, {key}, Value::Bool(value));"));
    w.close("}");
    w.close("}");
}

fn render_toggle(w: &mut CodeWriter, ctx: &WidgetContext<'_>) {
    let WidgetProps::ToggleButton {
        label,
        label_inactive,
        value,
    } = ctx.view()
    else {
        return render_placeholder(w, ctx);
    };
    let inactive = if label_inactive.is_empty() {
        label.clone()
    } else {
        label_inactive
    };
    let key = ctx.key();
    w.open("{");
    w.line(format!("let mut value = gen_bool(state, {key}, {value});"));
    w.line(format!(
        "let text = if value {{ {} }} else {{ {} }};",
        lit(&label),
        lit(&inactive)
    ));
    w.open("if ui.toggle_value(&mut value, text).changed() {");
    w.line(format!("gen_value_changed(state, callbacks, {key}, Value::Bool(value));"));
    w.close("}");
    w.close("}");
}

fn render_slider(w: &mut CodeWriter, ctx: &WidgetContext<'_>) {
    let (label, min, max, value, step) = match ctx.view() {
        WidgetProps::Slider {
            label,
            min,
            max,
            value,
            step,
        } => (label, min, max, value, step),
        WidgetProps::GainControl {
            label,
            min,
            max,
            value,
        } => (label, min, max, value, 0.0),
        _ => return render_placeholder(w, ctx),
    };
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    let step = if step > 0.0 {
        format!(".step_by({})", float_lit(step))
    } else {
        String::new()
    };
    let key = ctx.key();
    w.open("{");
    w.line(format!("let mut value = gen_f64(state, {key}, {});", float_lit(value)));
    w.open(format!(
        "if ui.add(egui::Slider::new(&mut value, {}..={}){step}.text({})).changed() {{",
        float_lit(lo),
        float_lit(hi),
        lit(&label)
    ));
    w.line(format!("gen_value_changed(state, callbacks, {key}, Value::from(value));"));
    w.close("}");
    w.close("}");
}

fn render_button(w: &mut CodeWriter, ctx: &WidgetContext<'_>) {
    let WidgetProps::Button { label } = ctx.view() else {
        return render_placeholder(w, ctx);
    };
    w.open(format!("if ui.button({}).clicked() {{", lit(&label)));
    w.line(format!("gen_clicked(callbacks, {});", ctx.key()));
    w.close("}");
}

fn render_number_input(w: &mut CodeWriter, ctx: &WidgetContext<'_>) {
    let WidgetProps::NumberInput { label, value } = ctx.view() else {
        return render_placeholder(w, ctx);
    };
    let key = ctx.key();
    w.open("ui.horizontal(|ui| {");
    w.line(format!("ui.label({});", lit(&label)));
    w.line(format!("let mut value = gen_f64(state, {key}, {});", float_lit(value)));
    w.open("if ui.add(egui::DragValue::new(&mut value)).changed() {");
    w.line(format!("gen_value_changed(state, callbacks, {key}, Value::from(value));"));
    w.close("}");
    w.close("});");
}

fn render_input(w: &mut CodeWriter, ctx: &WidgetContext<'_>) {
    let WidgetProps::Input { label, .. } = ctx.view() else {
        return render_placeholder(w, ctx);
    };
    let key = ctx.key();
    w.open("ui.horizontal(|ui| {");
    w.line(format!("ui.label({});", lit(&label)));
    w.line(format!("let mut value = gen_string(state, {key});"));
    w.open("if ui.text_edit_singleline(&mut value).changed() {");
    w.line(format!(
        "gen_value_changed(state, callbacks, {key}, Value::String(value.clone()));"
    ));
    w.close("}");
    w.close("});");
}

fn render_select(w: &mut CodeWriter, ctx: &WidgetContext<'_>) {
    let WidgetProps::Select { label, options, .. } = ctx.view() else {
        return render_placeholder(w, ctx);
    };
    let key = ctx.key();
    w.open("{");
    w.line(format!("let mut value = gen_string(state, {key});"));
    w.line("let before = value.clone();");
    w.open(format!(
        "egui::ComboBox::new({key}, {}).selected_text(value.clone()).show_ui(ui, |ui| {{",
        lit(&label)
    ));
    for option in &options {
        let o = lit(option);
        w.line(format!("ui.selectable_value(&mut value, {o}.to_owned(), {o});"));
    }
    w.close("});");
    w.open("if value != before {");
    w.line(format!("gen_value_changed(state, callbacks, {key}, Value::String(value));"));
    w.close("}");
    w.close("}");
}

fn render_label(w: &mut CodeWriter, ctx: &WidgetContext<'_>) {
    let WidgetProps::Label { text, heading } = ctx.view() else {
        return render_placeholder(w, ctx);
    };
    let call = match heading {
        Some(1 | 2) => "heading",
        Some(3 | 4) => "strong",
        _ => "label",
    };
    w.line(format!("ui.{call}({});", lit(&text)));
}

fn render_link(w: &mut CodeWriter, ctx: &WidgetContext<'_>) {
    let WidgetProps::Link { text, url } = ctx.view() else {
        return render_placeholder(w, ctx);
    };
    w.line(format!("ui.hyperlink_to({}, {});", lit(&text), lit(&url)));
}

fn image_line(src: &str, alt: &str) -> String {
    if src.is_empty() {
        return "ui.weak(\"[image]\");".to_owned();
    }
    let hover = if alt.is_empty() {
        String::new()
    } else {
        format!(".on_hover_text({})", lit(alt))
    };
    format!("ui.add(egui::Image::new({}).max_width(240.0)){hover};", lit(src))
}

fn render_image(w: &mut CodeWriter, ctx: &WidgetContext<'_>) {
    let WidgetProps::Image { src, alt } = ctx.view() else {
        return render_placeholder(w, ctx);
    };
    w.line(image_line(&src, &alt));
}

fn render_image_icon(w: &mut CodeWriter, ctx: &WidgetContext<'_>) {
    let WidgetProps::ImageIcon {
        src,
        alt,
        label,
        show_icon,
    } = ctx.view()
    else {
        return render_placeholder(w, ctx);
    };
    w.open("ui.horizontal(|ui| {");
    w.line(image_line(&src, &alt));
    if show_icon {
        w.line("ui.weak(\"[icon]\");");
    }
    if !label.is_empty() {
        w.line(format!("ui.label({});", lit(&label)));
    }
    w.close("});");
}

fn render_table(w: &mut CodeWriter, ctx: &WidgetContext<'_>) {
    let WidgetProps::Table { columns } = ctx.view() else {
        return render_placeholder(w, ctx);
    };
    if columns.is_empty() {
        w.line("ui.weak(\"(table without columns)\");");
        return;
    }
    let key = ctx.key();
    w.open(format!("egui::Grid::new({key}).striped(true).show(ui, |ui| {{"));
    for TableColumn { name, .. } in &columns {
        w.line(format!("ui.strong({});", lit(name)));
    }
    w.line("ui.end_row();");
    w.open(format!("if let Some(Value::Array(rows)) = state.get({key}) {{"));
    w.open("for row in rows {");
    for TableColumn { field, .. } in &columns {
        w.line(format!("ui.label(gen_field(row, {}));", lit(field)));
    }
    w.line("ui.end_row();");
    w.close("}");
    w.close("}");
    w.close("});");
}

fn render_markdown(w: &mut CodeWriter, ctx: &WidgetContext<'_>) {
    let WidgetProps::Markdown {
        content,
        editable,
        placeholder,
    } = ctx.view()
    else {
        return render_placeholder(w, ctx);
    };
    let key = ctx.key();
    w.open("{");
    if editable {
        w.line(format!("let mut value = gen_string(state, {key});"));
        w.open(format!(
            "if ui.add(egui::TextEdit::multiline(&mut value).hint_text({}).desired_width(f32::INFINITY)).changed() {{",
            lit(&placeholder)
        ));
        w.line(format!(
            "gen_value_changed(state, callbacks, {key}, Value::String(value.clone()));"
        ));
        w.close("}");
    } else {
        w.line(format!("let text = gen_string(state, {key});"));
        w.line(format!(
            "ui.label(if text.is_empty() {{ {} }} else {{ text.as_str() }});",
            lit(&content)
        ));
    }
    w.close("}");
}

fn render_graph(w: &mut CodeWriter, ctx: &WidgetContext<'_>) {
    let WidgetProps::Graph { title, height } = ctx.view() else {
        return render_placeholder(w, ctx);
    };
    let height = css_px(&height).unwrap_or(400.0);
    w.open("{");
    w.line(format!(
        "let response = gen_plot_area(ui, {}, {});",
        lit(&title),
        float_lit(height)
    ));
    w.open("if response.double_clicked() {");
    w.line(format!(
        "gen_invoke(callbacks, {}, &serde_json::json!({{ \"autorange\": true }}));",
        ctx.key()
    ));
    w.close("}");
    w.close("}");
}

fn render_banner(w: &mut CodeWriter, ctx: &WidgetContext<'_>) {
    let WidgetProps::Banner {
        texts,
        gradient_start,
        ..
    } = ctx.view()
    else {
        return render_placeholder(w, ctx);
    };
    w.open("{");
    w.line(format!(
        "let fill = gen_color({}).unwrap_or(egui::Color32::from_rgb(13, 71, 161));",
        lit(&gradient_start)
    ));
    w.open("egui::Frame::NONE.fill(fill).inner_margin(12.0).show(ui, |ui| {");
    w.line("ui.set_min_width(ui.available_width());");
    w.open("ui.horizontal(|ui| {");
    let [t1, t2, t3] = &texts;
    w.line(format!(
        "ui.heading(egui::RichText::new({}).color(egui::Color32::WHITE));",
        lit(t1)
    ));
    w.line(format!(
        "ui.label(egui::RichText::new({}).color(egui::Color32::WHITE));",
        lit(t2)
    ));
    w.line(format!(
        "ui.label(egui::RichText::new({}).color(egui::Color32::WHITE).strong());",
        lit(t3)
    ));
    w.close("});");
    w.close("});");
    w.close("}");
}

fn render_vu_meter(w: &mut CodeWriter, ctx: &WidgetContext<'_>) {
    let WidgetProps::VuMeter { min, max, show_value } = ctx.view() else {
        return render_placeholder(w, ctx);
    };
    let span = if (max - min).abs() > f64::EPSILON {
        max - min
    } else {
        1.0
    };
    let text = if show_value {
        ".text(format!(\"{value:.2}\"))"
    } else {
        ""
    };
    w.open("{");
    w.line(format!("let value = gen_f64(state, {}, {});", ctx.key(), float_lit(min)));
    w.line(format!(
        "let fraction = ((value - {}) / {}).clamp(0.0, 1.0) as f32;",
        float_lit(min),
        float_lit(span)
    ));
    w.line(format!(
        "ui.add(egui::ProgressBar::new(fraction).desired_width(120.0){text});"
    ));
    w.close("}");
}

fn render_led(w: &mut CodeWriter, ctx: &WidgetContext<'_>) {
    let WidgetProps::Led { label, size } = ctx.view() else {
        return render_placeholder(w, ctx);
    };
    let size = if size > 0.0 { size } else { 16.0 };
    w.open("{");
    w.line(format!("let on = gen_bool(state, {}, false);", ctx.key()));
    w.open("ui.horizontal(|ui| {");
    w.line(format!(
        "let (rect, _) = ui.allocate_exact_size(egui::vec2({s}, {s}), egui::Sense::hover());",
        s = float_lit(size)
    ));
    w.line("let color = if on { egui::Color32::from_rgb(46, 204, 64) } else { egui::Color32::DARK_GRAY };");
    w.line(format!(
        "ui.painter().circle_filled(rect.center(), {}, color);",
        float_lit(size / 2.0)
    ));
    if !label.is_empty() {
        w.line(format!("ui.label({});", lit(&label)));
    }
    w.close("});");
    w.close("}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::LayoutDocument;
    use serde_json::json;

    fn tree(dashboard: Value) -> LayoutTree {
        let doc: LayoutDocument = serde_json::from_value(json!({ "dashboard": dashboard })).unwrap();
        LayoutTree::from_document(&doc)
    }

    fn render_default(t: &LayoutTree) -> UiArtifact {
        render(t, &RendererRegistry::builtin())
    }

    #[test]
    fn test_build_ui_entry_point() {
        let out = render_default(&LayoutTree::default()).source;
        assert!(out.contains(
            "pub fn build_ui(ui: &mut egui::Ui, state: &mut State, callbacks: &mut Callbacks, title: Option<&str>) {"
        ));
        assert!(out.contains("pub type Callbacks = HashMap<String, Box<dyn FnMut(&Value)>>;"));
        assert!(out.ends_with("}\n"));
        assert!(out.contains("pub const TITLE: Option<&str> = None;"));
        let titled = render_titled(&LayoutTree::default(), &RendererRegistry::builtin(), Some("Lab"));
        assert!(titled.source.contains("pub const TITLE: Option<&str> = Some(\"Lab\");"));
    }

    #[test]
    fn test_interactive_widgets_wire_state_and_callbacks() {
        let t = tree(json!({ "id": "dashboard", "layout_type": "column", "children": [
            { "type": "container", "id": "row_0", "layout_type": "rows_columns", "align_items": "end", "children": [
                { "type": "widget", "id": "power", "widget_type": "checkbox", "props": { "label": "Power" } },
                { "type": "widget", "id": "go", "widget_type": "button", "props": { "label": "Go" } }
            ]}
        ]}));
        let out = render_default(&t).source;
        assert!(out.contains("ui.vertical(|ui| {"));
        assert!(out.contains("egui::Layout::left_to_right(egui::Align::Max).with_main_wrap(true)"));
        assert!(out.contains("let mut value = gen_bool(state, \"row_0.power\", false);"));
        assert!(out.contains("if ui.checkbox(&mut value, \"Power\").changed() {"));
        assert!(out.contains("gen_value_changed(state, callbacks, \"row_0.power\", Value::Bool(value));"));
        assert!(out.contains("gen_clicked(callbacks, \"row_0.go\");"));
    }

    #[test]
    fn test_unknown_widget_degrades() {
        let t = tree(json!({ "id": "dashboard", "children": [
            { "type": "widget", "id": "spark", "widget_type": "sparkline" },
            { "type": "widget", "id": "l", "widget_type": "label", "props": { "text": "ok", "heading": "h1" } }
        ]}));
        let art = render_default(&t);
        assert_eq!(art.degraded, vec!["spark".to_owned()]);
        assert!(art.source.contains("ui.weak(\"[sparkline]\");"));
        assert!(art.source.contains("ui.heading(\"ok\");"));

        let bare = render(&t, &RendererRegistry::empty());
        assert_eq!(bare.degraded.len(), 2);
    }

    #[test]
    fn test_grid_spans_are_clamped() {
        let t = tree(json!({ "id": "dashboard", "children": [
            { "type": "container", "id": "g", "layout_type": "grid", "columns": 2, "children": [
                { "type": "widget", "id": "a", "widget_type": "label", "col_span": 40 },
                { "type": "placeholder" },
                { "type": "widget", "id": "b", "widget_type": "label", "row_span": 0 }
            ]}
        ]}));
        let out = render_default(&t).source;
        assert!(out.contains("egui::Grid::new(\"g\").num_columns(2)"));
        assert!(out.contains("gen_cell(ui, 12, 1, |ui| {"));
        assert!(!out.contains("gen_cell(ui, 1, 0"));
        assert_eq!(out.matches("ui.end_row();").count(), 2);
    }

    #[test]
    fn test_splitter_uses_two_children() {
        let t = tree(json!({ "id": "dashboard", "children": [
            { "type": "container", "id": "s", "layout_type": "splitter", "value": 40, "children": [
                { "type": "widget", "id": "a", "widget_type": "label", "props": { "text": "A" } },
                { "type": "widget", "id": "b", "widget_type": "label", "props": { "text": "B" } },
                { "type": "widget", "id": "c", "widget_type": "label", "props": { "text": "C" } }
            ]}
        ]}));
        let out = render_default(&t).source;
        assert!(out.contains("ui.allocate_ui(egui::vec2(total * 0.4, height), |ui| {"));
        assert!(out.contains("ui.label(\"B\");"));
        assert!(!out.contains("ui.label(\"C\");"));
    }

    #[test]
    fn test_tabs_emit_one_panel_per_tab() {
        let t = tree(json!({ "id": "dashboard", "children": [
            { "type": "container", "id": "t", "layout_type": "tabs", "children": [
                { "type": "tab", "id": "one", "label": "One", "children": [
                    { "type": "widget", "id": "go", "widget_type": "button" }
                ]},
                { "type": "tab", "id": "two", "label": "Two", "children": [] }
            ]}
        ]}));
        let out = render_default(&t).source;
        assert!(out.contains("ui.selectable_value(&mut current, 0, \"One\");"));
        assert!(out.contains("ui.selectable_value(&mut current, 1, \"Two\");"));
        assert!(out.contains("gen_clicked(callbacks, \"t.one.go\");"));
        assert!(out.contains("1 => {"));
    }

    #[test]
    fn test_container_style_merge() {
        let appearance = Appearance(
            json!({ "container_background": "#eeeeee", "container_padding": "8px" })
                .as_object()
                .cloned()
                .unwrap(),
        );
        let merged = merge_container_style(Some(&json!({ "padding": "2px", "gap": "" })), &appearance);
        assert_eq!(merged["background-color"], "#eeeeee");
        assert_eq!(merged["padding"], "2px");
        assert_eq!(merged["width"], "100%");
        assert!(!merged.contains_key("gap"));

        let frame = FrameStyle::from_css(&merged);
        assert_eq!(frame.padding, Some(2.0));
        assert!(frame.full_width);

        assert!(merge_container_style(None, &Appearance::default()).is_empty());
    }

    #[test]
    fn test_presentation_wraps_widget() {
        let t = tree(json!({ "id": "dashboard", "children": [
            { "type": "widget", "id": "l", "widget_type": "label", "props": { "text": "x", "text_color": "#ff0000", "width": "120px" } }
        ]}));
        let out = render_default(&t).source;
        assert!(out.contains(
            "gen_styled(ui, GenStyle { text: Some(\"#ff0000\"), fill: None, width: Some(120.0), min_width: None, max_width: None, grow: false }, |ui| {"
        ));
    }

    #[test]
    fn test_free_position_container() {
        let t = tree(json!({ "id": "dashboard", "children": [
            { "type": "container", "id": "free", "layout_type": "xy", "children": [
                { "type": "widget", "id": "a", "widget_type": "label", "x": 10, "y": 20, "w": 100, "h": 30 }
            ]}
        ]}));
        let out = render_default(&t).source;
        assert!(out.contains("origin + egui::vec2(10.0, 20.0), egui::vec2(100.0, 30.0)"));
        assert!(out.contains("ui.allocate_space(egui::vec2(110.0, 50.0));"));
    }
}
