//! Markdown to plaintext extraction.
//!
//! Turns raw note markdown into the plain text the feature engine and the
//! semantic index consume: frontmatter and fenced code are dropped, wikilink
//! and markdown markup are reduced to their display text.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_WIKILINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!?\[\[([^\[\]]+)\]\]").expect("wikilink regex"));

static RE_MD_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!?\[([^\]]*)\]\([^)]*\)").expect("markdown link regex"));

static RE_INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]*)`").expect("code regex"));

static RE_EMPHASIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[*_]{1,3}([^*_]+)[*_]{1,3}").expect("emphasis regex"));

static RE_HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("html tag regex"));

/// Extract plain text from raw note markdown.
pub fn extract_plain_text(raw: &str) -> String {
    let body = strip_frontmatter(raw);

    let mut out = String::with_capacity(body.len());
    let mut in_fence = false;

    for line in body.lines() {
        let trimmed = line.trim_start();

        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        let line = strip_line_prefix(trimmed);
        let line = RE_WIKILINK.replace_all(line, |caps: &regex::Captures| {
            wikilink_display_text(&caps[1]).to_string()
        });
        let line = RE_MD_LINK.replace_all(&line, "$1");
        let line = RE_INLINE_CODE.replace_all(&line, "$1");
        let line = RE_EMPHASIS.replace_all(&line, "$1");
        let line = RE_HTML_TAG.replace_all(&line, "");

        out.push_str(line.trim());
        out.push('\n');
    }

    out.trim().to_string()
}

/// Display text of a wikilink body: the alias if present, else the target
/// without a heading suffix.
pub fn wikilink_display_text(body: &str) -> &str {
    match body.split_once('|') {
        Some((_, alias)) => alias.trim(),
        None => body.split('#').next().unwrap_or(body).trim(),
    }
}

/// Strip a leading `---` YAML frontmatter block.
fn strip_frontmatter(raw: &str) -> &str {
    let rest = match raw.strip_prefix("---") {
        Some(rest) => rest,
        None => return raw,
    };

    match rest.find("\n---") {
        Some(end) => {
            let after = &rest[end + 4..];
            after.strip_prefix('\n').unwrap_or(after)
        }
        None => raw,
    }
}

/// Drop heading markers, blockquotes and list bullets from a line.
fn strip_line_prefix(line: &str) -> &str {
    let mut line = line;
    while let Some(rest) = line.strip_prefix('>') {
        line = rest.trim_start();
    }
    if let Some(rest) = line.strip_prefix('#') {
        let rest = rest.trim_start_matches('#');
        if let Some(rest) = rest.strip_prefix(' ') {
            return rest;
        }
        // not a heading (e.g. a tag like #topic), keep as-is
        let _ = rest;
    }
    for bullet in ["- [ ] ", "- [x] ", "- ", "* ", "+ "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return rest;
        }
    }
    line
}
