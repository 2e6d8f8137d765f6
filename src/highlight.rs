//! Syntax highlighting for the generated artifacts and the document JSON.

use egui::Color32;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Style, Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeLanguage {
    Rust,
    Json,
}

impl CodeLanguage {
    /// Guess from a file name; anything that is not `.json` is Rust.
    pub fn for_file(name: &str) -> Self {
        if name.ends_with(".json") {
            CodeLanguage::Json
        } else {
            CodeLanguage::Rust
        }
    }

    const fn extension(self) -> &'static str {
        match self {
            CodeLanguage::Rust => "rs",
            CodeLanguage::Json => "json",
        }
    }
}

/// Cached syntax highlighting resources.
pub struct Highlighter {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter {
    pub fn new() -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: "base16-ocean.dark".to_string(),
        }
    }

    fn theme(&self) -> Option<&Theme> {
        self.theme_set
            .themes
            .get(&self.theme_name)
            .or_else(|| self.theme_set.themes.values().next())
    }

    /// Highlight `code` and return a list of (text, color) spans.
    pub fn highlight(&self, code: &str, language: CodeLanguage) -> Vec<(String, Color32)> {
        let Some(theme) = self.theme() else {
            return vec![(code.to_string(), Color32::LIGHT_GRAY)];
        };
        // JSON ships with the default syntaxes; JavaScript is close enough if it does not
        let syntax = self
            .syntax_set
            .find_syntax_by_extension(language.extension())
            .or_else(|| self.syntax_set.find_syntax_by_extension("js"))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let mut highlighter = HighlightLines::new(syntax, theme);
        let mut result = Vec::new();

        for line in LinesWithEndings::from(code) {
            match highlighter.highlight_line(line, &self.syntax_set) {
                Ok(ranges) => {
                    for (style, text) in ranges {
                        result.push((text.to_string(), style_to_color32(style)));
                    }
                }
                Err(e) => {
                    log::debug!("Highlighting failed, showing plain text: {e}");
                    result.push((line.to_string(), Color32::LIGHT_GRAY));
                }
            }
        }

        result
    }

    /// Render highlighted code as a LayoutJob for egui.
    pub fn layout_job(&self, code: &str, language: CodeLanguage) -> egui::text::LayoutJob {
        let mut job = egui::text::LayoutJob::default();

        for (text, color) in self.highlight(code, language) {
            job.append(
                &text,
                0.0,
                egui::TextFormat {
                    font_id: egui::FontId::monospace(12.0),
                    color,
                    ..Default::default()
                },
            );
        }

        job
    }
}

fn style_to_color32(style: Style) -> Color32 {
    Color32::from_rgb(style.foreground.r, style.foreground.g, style.foreground.b)
}

/// Read-only code view. Falls back to a plain monospace editor when
/// highlighting is off.
pub fn code_viewer(
    ui: &mut egui::Ui,
    highlighter: Option<&Highlighter>,
    code: &str,
    language: CodeLanguage,
    id_salt: &str,
) {
    egui::ScrollArea::both()
        .id_salt(id_salt)
        .auto_shrink([false, false])
        .show(ui, |ui| match highlighter {
            Some(h) => {
                ui.add(egui::Label::new(h.layout_job(code, language)).selectable(true));
            }
            None => {
                let mut text = code;
                ui.add(
                    egui::TextEdit::multiline(&mut text)
                        .code_editor()
                        .desired_width(f32::INFINITY),
                );
            }
        });
}
