//! Merges regenerated callback stubs into an existing user module.
//!
//! The previous text is cut into a header and keyed blocks, each block is
//! classified, and the new descriptor list is reconciled against them by
//! merge key. Bodies between the user-code markers are carried over line for
//! line; everything else in a block is regenerated.

use crate::{
    emit::stubs::{self, BEGIN_USER, END_USER, MARKER},
    resolve::CallbackDescriptor,
};
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockKind {
    /// Balanced markers; holds the interior lines.
    User(Vec<String>),
    /// A whole function pasted between the markers; holds the block verbatim.
    Legacy(Vec<String>),
    /// Anything else. Regenerated.
    Stub,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub key: String,
    pub kind: BlockKind,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedStubs {
    /// Lines before the first block, trailing blanks removed.
    pub header: Vec<String>,
    pub blocks: Vec<Block>,
}

/// Result of a merge.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub text: String,
    /// Merge keys whose user body was carried over.
    pub preserved: Vec<String>,
    /// Merge keys kept verbatim in the legacy form.
    pub legacy: Vec<String>,
    /// Merge keys that got a fresh stub.
    pub fresh: Vec<String>,
    /// Keys in the previous text with no matching descriptor.
    pub dropped: Vec<String>,
}

/// Canonical merge key: `user_id=…` as is, `path_id: x` and a bare `x`
/// become `path_id:x`.
pub fn normalize_key(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("user_id=") {
        return raw.to_owned();
    }
    let path_id = raw.strip_prefix("path_id:").unwrap_or(raw).trim();
    format!("path_id:{path_id}")
}

fn is_marker(line: &str) -> bool {
    line.trim_start().starts_with(MARKER)
}

/// First line of the unmarked format: a top-level `fn on_…(`.
fn is_bare_callback(line: &str) -> bool {
    let t = line.trim();
    (t.starts_with("fn on_") || t.starts_with("pub fn on_")) && t.contains('(')
}

fn trim_trailing_blank(lines: &mut Vec<String>) {
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
}

fn classify(block: &[&str]) -> BlockKind {
    let Some(begin) = block.iter().position(|l| l.contains(BEGIN_USER)) else {
        return BlockKind::Stub;
    };
    let Some(end) = block[begin + 1..]
        .iter()
        .position(|l| l.contains(END_USER))
        .map(|i| i + begin + 1)
    else {
        return BlockKind::Stub;
    };
    let mut body: Vec<String> = block[begin + 1..end].iter().map(|l| (*l).to_owned()).collect();
    trim_trailing_blank(&mut body);
    let first = body.iter().map(|l| l.trim()).find(|l| !l.is_empty());
    if first.is_some_and(|l| l.starts_with("fn ") || l.starts_with("pub fn ")) {
        let mut verbatim: Vec<String> = block.iter().map(|l| (*l).to_owned()).collect();
        trim_trailing_blank(&mut verbatim);
        BlockKind::Legacy(verbatim)
    } else {
        BlockKind::User(body)
    }
}

/// Splits `text` into header and blocks. Keys that occur more than once are
/// ambiguous and every block carrying them is downgraded to `Stub`.
pub fn parse(text: &str) -> ParsedStubs {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines
        .iter()
        .position(|l| is_marker(l) || is_bare_callback(l))
        .unwrap_or(lines.len());
    let mut header: Vec<String> = lines[..start].iter().map(|l| (*l).to_owned()).collect();
    trim_trailing_blank(&mut header);

    let mut blocks = Vec::new();
    let mut i = start;
    while i < lines.len() {
        if !is_marker(lines[i]) {
            i += 1;
            continue;
        }
        let raw = lines[i]
            .trim_start()
            .strip_prefix(MARKER)
            .unwrap_or_default();
        let key = normalize_key(raw);
        let from = i;
        i += 1;
        while i < lines.len() && !is_marker(lines[i]) {
            i += 1;
        }
        let kind = classify(&lines[from..i]);
        log::debug!("Parsed block {key} as {kind:?}");
        blocks.push(Block { key, kind });
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for b in &blocks {
        *counts.entry(b.key.as_str()).or_default() += 1;
    }
    let ambiguous: Vec<String> = counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(k, _)| k.to_owned())
        .collect();
    for b in &mut blocks {
        if ambiguous.contains(&b.key) {
            log::warn!("Merge key {} occurs more than once; regenerating it", b.key);
            b.kind = BlockKind::Stub;
        }
    }

    ParsedStubs { header, blocks }
}

/// Reconciles `descriptors` with the previously written text.
pub fn merge(descriptors: &[CallbackDescriptor], previous: &str) -> MergeOutcome {
    let parsed = parse(previous);
    let mut outcome = MergeOutcome::default();

    let mut out: Vec<String> = if parsed.header.iter().all(|l| l.trim().is_empty()) {
        stubs::DEFAULT_HEADER.lines().map(str::to_owned).collect()
    } else {
        parsed.header.clone()
    };
    out.push(String::new());

    let by_key: HashMap<&str, &BlockKind> = parsed
        .blocks
        .iter()
        .map(|b| (b.key.as_str(), &b.kind))
        .collect();

    for desc in descriptors {
        match by_key.get(desc.merge_key.as_str()) {
            Some(BlockKind::User(body)) => {
                out.extend(stubs::block(desc, body));
                outcome.preserved.push(desc.merge_key.clone());
            }
            Some(BlockKind::Legacy(verbatim)) => {
                out.extend(verbatim.iter().cloned());
                out.push(String::new());
                outcome.legacy.push(desc.merge_key.clone());
            }
            Some(BlockKind::Stub) | None => {
                out.extend(stubs::block(desc, &[]));
                outcome.fresh.push(desc.merge_key.clone());
            }
        }
    }

    for b in &parsed.blocks {
        if descriptors.iter().any(|d| d.merge_key == b.key) || outcome.dropped.contains(&b.key) {
            continue;
        }
        if matches!(b.kind, BlockKind::Stub) {
            log::debug!("Dropping stub block {}", b.key);
        } else {
            log::warn!("Dropping user code for {}; no widget uses this key any more", b.key);
        }
        outcome.dropped.push(b.key.clone());
    }

    let mut text = out.join("\n");
    let trimmed = text.trim_end().len();
    text.truncate(trimmed);
    text.push('\n');
    outcome.text = text;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::{Interaction, WidgetType};

    fn button(path_id: &str) -> CallbackDescriptor {
        CallbackDescriptor {
            path_id: path_id.into(),
            kind: Interaction::Click,
            name: format!("on_{}_click", path_id.replace('.', "_")),
            widget_type: WidgetType::Button,
            merge_key: format!("path_id:{path_id}"),
            label: None,
        }
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("user_id=power"), "user_id=power");
        assert_eq!(normalize_key(" path_id: row_0.go "), "path_id:row_0.go");
        assert_eq!(normalize_key("path_id:row_0.go"), "path_id:row_0.go");
        assert_eq!(normalize_key("row_0.go"), "path_id:row_0.go");
    }

    #[test]
    fn test_fresh_render_is_idempotent() {
        let d = vec![button("go"), button("row_0.stop")];
        let first = merge(&d, "");
        assert_eq!(first.fresh.len(), 2);
        let second = merge(&d, &first.text);
        assert_eq!(second.text, first.text);
        assert_eq!(second.preserved.len(), 2);
    }

    #[test]
    fn test_user_body_preserved() {
        let d = vec![button("go")];
        let edited = merge(&d, "")
            .text
            .replace("    // no arguments", "    do_stuff();\n\n      // odd\n");
        let out = merge(&[button("go"), button("stop")], &edited);
        assert!(out.text.contains("    do_stuff();\n\n      // odd\n    // end user code"));
        assert_eq!(out.preserved, vec!["path_id:go".to_owned()]);
        assert_eq!(out.fresh, vec!["path_id:stop".to_owned()]);
    }

    #[test]
    fn test_legacy_block_kept_verbatim() {
        let prev = "// custom header\n\n\
// widget: go\n\
// begin user code\n\
fn on_go_click() {\n    old();\n}\n\
// end user code\n";
        let parsed = parse(prev);
        assert_eq!(parsed.header, vec!["// custom header".to_owned()]);
        assert!(matches!(parsed.blocks[0].kind, BlockKind::Legacy(_)));
        let out = merge(&[button("go")], prev);
        assert!(out.text.starts_with("// custom header\n\n// widget: go\n"));
        assert!(out.text.contains("fn on_go_click() {\n    old();\n}"));
        assert_eq!(out.legacy, vec!["path_id:go".to_owned()]);
    }

    #[test]
    fn test_unbalanced_and_duplicate_blocks_regenerate() {
        let prev = "\
// widget: path_id:go
pub fn on_go_click() {
    // begin user code
    keep_me();
}
// widget: path_id:stop
    // begin user code
    a();
    // end user code
// widget: path_id: stop
    // begin user code
    b();
    // end user code
";
        let parsed = parse(prev);
        assert!(parsed.blocks.iter().all(|b| b.kind == BlockKind::Stub));
        let out = merge(&[button("go"), button("stop")], prev);
        assert!(!out.text.contains("keep_me"));
        assert!(!out.text.contains("a();"));
        assert_eq!(out.fresh.len(), 2);
    }

    #[test]
    fn test_unmatched_blocks_are_reported() {
        let prev = merge(&[button("gone"), button("go")], "").text;
        let out = merge(&[button("go")], &prev);
        assert_eq!(out.dropped, vec!["path_id:gone".to_owned()]);
        assert!(!out.text.contains("on_gone_click"));
    }

    #[test]
    fn test_unmarked_functions_end_the_header() {
        let prev = "use serde_json::Value;\n\npub fn on_go_click() {\n    old();\n}\n";
        let parsed = parse(prev);
        assert_eq!(parsed.header, vec!["use serde_json::Value;".to_owned()]);
        assert!(parsed.blocks.is_empty());
        let out = merge(&[button("go")], prev);
        assert!(out.text.starts_with("use serde_json::Value;\n\n// widget: path_id:go"));
    }
}
