//! Source emitters for the generated artifacts.

pub mod registry;
pub mod state;
pub mod stubs;
pub mod ui;

pub use ui::{RendererRegistry, WidgetContext};

const INDENT: &str = "    ";

/// Line writer that tracks the nesting level.
///
/// Every `open` must be paired with a `close`; `close` never takes the
/// level below zero.
#[derive(Clone, Debug, Default)]
pub struct CodeWriter {
    lines: Vec<String>,
    level: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// Writes one line at the current level. Empty input gives a bare blank
    /// line.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if text.is_empty() {
            self.lines.push(String::new());
        } else {
            self.lines.push(format!("{}{text}", INDENT.repeat(self.level)));
        }
    }

    pub fn blank(&mut self) {
        self.lines.push(String::new());
    }

    /// Writes `text` (usually ending in `{`) and indents what follows.
    pub fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.level += 1;
    }

    /// Dedents and writes `text` (usually `}` or `});`).
    pub fn close(&mut self, text: impl AsRef<str>) {
        self.level = self.level.saturating_sub(1);
        self.line(text);
    }

    /// Writes a multi-line snippet, re-indenting each line.
    pub fn block(&mut self, snippet: &str) {
        for l in snippet.lines() {
            self.line(l);
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Joined output with a single trailing newline.
    pub fn finish(self) -> String {
        let mut out = self.lines.join("\n");
        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
        out.push('\n');
        out
    }
}

/// Float literal that always carries a decimal point.
pub(crate) fn float_lit(v: f64) -> String {
    if v.is_finite() {
        format!("{v:?}")
    } else {
        "0.0".to_owned()
    }
}

/// Parses `12`, `12px` or `12.5 px`; other units are not understood.
pub(crate) fn css_px(raw: &str) -> Option<f64> {
    let s = raw.trim();
    let s = s.strip_suffix("px").unwrap_or(s).trim();
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_writer_nesting() {
        let mut w = CodeWriter::new();
        w.open("fn main() {");
        w.open("if x {");
        w.line("y();");
        w.close("}");
        w.line("");
        w.close("}");
        w.close("}");
        assert_eq!(w.level(), 0);
        assert_eq!(
            w.finish(),
            "fn main() {\n    if x {\n        y();\n    }\n\n}\n}\n"
        );
    }

    #[test]
    fn test_block_reindents() {
        let mut w = CodeWriter::new();
        w.open("{");
        w.block("a();\nb();");
        w.close("}");
        assert_eq!(w.lines()[2], "    b();");
    }

    #[test]
    fn test_float_lit() {
        assert_eq!(float_lit(30.0), "30.0");
        assert_eq!(float_lit(0.01), "0.01");
        assert_eq!(float_lit(f64::NAN), "0.0");
    }

    #[test]
    fn test_css_px() {
        assert_eq!(css_px("8px"), Some(8.0));
        assert_eq!(css_px(" 12.5 px"), Some(12.5));
        assert_eq!(css_px("50%"), None);
    }
}
