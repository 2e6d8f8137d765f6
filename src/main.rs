//! Layout builder: edit a dashboard layout as a tree or a grid and generate
//! the egui code for it.

mod app;
mod highlight;

use crate::app::LayoutBuilderApp;

use eframe::egui;
use layout_builder::config::Settings;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let settings = Settings::load();
    log::info!("Settings from {}", Settings::default_path().display());

    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = egui::ViewportBuilder::default()
        .with_inner_size(egui::vec2(1280.0, 820.0))
        .with_min_inner_size(egui::vec2(900.0, 600.0))
        .with_resizable(true);

    eframe::run_native(
        "Layout Builder",
        native_options,
        Box::new(|_cc| Ok(Box::new(LayoutBuilderApp::new(settings)))),
    )
}
