// src/tasks/sprite.rs

//! Icon sprite assembly.
//!
//! Every `<icons>/*.svg` becomes a `<symbol id="<stem>">` inside one hidden
//! `<svg>` document. Only the root element is rewritten; the icon body is
//! copied as-is.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{anyhow, Context, Result};
use regex::Regex;

static PROLOG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<\?xml.*?\?>|<!DOCTYPE[^>]*>|<!--.*?-->").expect("valid prolog regex")
});

static ROOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<svg\b([^>]*)>(.*)</svg\s*>").expect("valid root regex")
});

static VIEW_BOX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bviewBox\s*=\s*["']([^"']*)["']"#).expect("valid viewBox regex")
});

/// Turn one SVG document into a `<symbol>` element.
pub fn symbol_from_svg(id: &str, source: &str) -> Result<String> {
    let cleaned = PROLOG.replace_all(source, "");
    let caps = ROOT
        .captures(&cleaned)
        .ok_or_else(|| anyhow!("icon '{id}' has no <svg> root element"))?;

    let attrs = caps.get(1).map_or("", |m| m.as_str());
    let body = caps.get(2).map_or("", |m| m.as_str()).trim();

    let view_box = VIEW_BOX
        .captures(attrs)
        .and_then(|c| c.get(1))
        .map(|m| format!(" viewBox=\"{}\"", m.as_str()))
        .unwrap_or_default();

    Ok(format!("<symbol id=\"{id}\"{view_box}>{body}</symbol>"))
}

/// Wrap symbols into the sprite document.
pub fn render_sprite(symbols: &[String]) -> String {
    let mut out = String::from(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" style=\"display: none;\">\n",
    );
    for symbol in symbols {
        out.push_str("  ");
        out.push_str(symbol);
        out.push('\n');
    }
    out.push_str("</svg>\n");
    out
}

/// Build the sprite from `icon_dir` into `output`.
///
/// Returns `None` when the icon directory does not exist (nothing written),
/// otherwise the number of symbols. Icons are ordered by file name.
pub fn generate_sprite(icon_dir: &Path, output: &Path) -> Result<Option<usize>> {
    if !icon_dir.is_dir() {
        return Ok(None);
    }

    let mut icons: Vec<_> = fs::read_dir(icon_dir)
        .with_context(|| format!("reading icon dir {:?}", icon_dir))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("svg"))
        .collect();
    icons.sort();

    let mut symbols = Vec::with_capacity(icons.len());
    for path in &icons {
        let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let source =
            fs::read_to_string(path).with_context(|| format!("reading icon {:?}", path))?;
        symbols.push(symbol_from_svg(id, &source)?);
    }

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
    }
    fs::write(output, render_sprite(&symbols))
        .with_context(|| format!("writing sprite {:?}", output))?;

    Ok(Some(symbols.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn symbol_keeps_view_box_and_body() {
        let svg = r#"<?xml version="1.0"?>
<!-- exported -->
<svg xmlns="http://www.w3.org/2000/svg" width="24" viewBox="0 0 24 24"><path d="M0 0h24"/></svg>"#;
        assert_eq!(
            symbol_from_svg("arrow", svg).unwrap(),
            r#"<symbol id="arrow" viewBox="0 0 24 24"><path d="M0 0h24"/></symbol>"#
        );
    }

    #[test]
    fn non_svg_input_is_an_error() {
        assert!(symbol_from_svg("broken", "<png/>").is_err());
    }

    #[test]
    fn absent_icon_dir_writes_nothing() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("build/img/sprite.svg");
        assert_eq!(generate_sprite(&dir.path().join("icons"), &out).unwrap(), None);
        assert!(!out.exists());
    }

    #[test]
    fn sprite_lists_icons_by_name() {
        let dir = tempdir().unwrap();
        let icons = dir.path().join("icons");
        fs::create_dir_all(&icons).unwrap();
        fs::write(icons.join("b.svg"), "<svg><g/></svg>").unwrap();
        fs::write(icons.join("a.svg"), "<svg viewBox='0 0 1 1'><g/></svg>").unwrap();
        fs::write(icons.join("notes.txt"), "ignored").unwrap();

        let out = dir.path().join("build/img/sprite.svg");
        assert_eq!(generate_sprite(&icons, &out).unwrap(), Some(2));

        let text = fs::read_to_string(&out).unwrap();
        let a = text.find("id=\"a\" viewBox=\"0 0 1 1\"").unwrap();
        let b = text.find("id=\"b\"").unwrap();
        assert!(a < b);
    }
}
