//! Document assembly: section content → one well-formed listing page.
//!
//! Pure and deterministic: the same `SectionContent` always yields the same
//! bytes. Length limits are enforced here, not trusted to the writers.

use std::sync::OnceLock;

use regex::Regex;

use crate::listing::options::Language;
use crate::listing::sections::{SectionContent, SectionKind};

pub const ELLIPSIS: &str = "...";
pub const NO_FEATURES_PLACEHOLDER: &str = "No features listed";

/// Builds the full HTML page from the current section content.
/// Missing sections use their defaults; text is HTML-escaped after truncation.
pub fn assemble(content: &SectionContent, language: Language) -> String {
    let section = |kind: SectionKind| escape_html(&enforce_limit(kind, content.text_or_default(kind)));

    let li_items: String = feature_items(content.text_or_default(SectionKind::KeyFeatures))
        .iter()
        .map(|item| format!("<li>{}</li>", escape_html(item)))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="{lang}">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title}</title>
  <meta name="description" content="{meta}">
</head>
<body>
  <h1>{h1}</h1>
  <section id="description"><p>{description}</p></section>
  <ul id="key-features">{li_items}</ul>
  <section id="neighborhood"><p>{neighborhood}</p></section>
  <p class="call-to-action">{cta}</p>
</body>
</html>
"#,
        lang = language.code(),
        title = section(SectionKind::Title),
        meta = section(SectionKind::MetaDescription),
        h1 = section(SectionKind::H1),
        description = section(SectionKind::Description),
        neighborhood = section(SectionKind::Neighborhood),
        cta = section(SectionKind::CallToAction),
    )
}

/// Applies the kind's hard character limit, if any.
pub fn enforce_limit(kind: SectionKind, text: &str) -> String {
    match kind.max_chars() {
        Some(limit) => truncate_chars(text, limit),
        None => text.to_string(),
    }
}

/// Cuts `text` to at most `limit` characters. A cut text keeps
/// `limit - 3` characters and ends with `...`.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let keep = limit.saturating_sub(ELLIPSIS.len());
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str(ELLIPSIS);
    cut
}

/// Splits a newline-delimited feature list, stripping bullet markers and
/// dropping empty lines. Never returns an empty list.
pub fn feature_items(text: &str) -> Vec<String> {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    let marker = MARKER.get_or_init(|| {
        Regex::new(r"^\s*(?:[-*•–—+·]\s*|\d{1,2}[.)](?:\s+|$))").expect("valid marker regex")
    });

    let items: Vec<String> = text
        .lines()
        .map(|line| marker.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();

    if items.is_empty() {
        vec![NO_FEATURES_PLACEHOLDER.to_string()]
    } else {
        items
    }
}

/// Plain-text view of a page: tags removed, entities decoded, whitespace
/// collapsed to single spaces.
pub fn flatten_text(html: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));

    let stripped = tag.replace_all(html, " ");
    let decoded = unescape_html(&stripped);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
