//! Plain-text extraction and normalization for scraped pages.
//!
//! Pure functions shared by the fetch pipeline: strip markup, decode the
//! common entities, drop control characters and emoji, collapse
//! whitespace, and truncate to a word limit.

use std::sync::OnceLock;

use regex::Regex;

fn script_style_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<(script|style|noscript)\b[^>]*>.*?</(script|style|noscript)>")
            .unwrap()
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").unwrap())
}

// Navigation chrome, copyright footers, and PDF object noise that survive
// tag stripping.
fn boilerplate_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(Skip to main content|Home|Contact|Login|Sign up|Footer|©.*?$|\b\d{4}\b.*rights reserved|%PDF-\d+\.\d+|obj\s*<<|>>|endobj)",
        )
        .unwrap()
    })
}

/// Strip markup from an HTML document, leaving its visible text.
pub fn extract_text(html: &str) -> String {
    let without_blocks = script_style_re().replace_all(html, " ");
    let without_tags = tag_re().replace_all(&without_blocks, " ");
    decode_entities(&without_tags)
}

/// Normalize extracted text: drop control characters and emoji, strip
/// boilerplate phrases, collapse whitespace runs, and truncate to
/// `word_limit` words.
pub fn format_text(text: &str, word_limit: usize) -> String {
    let cleaned = strip_emojis(text);
    let cleaned = boilerplate_re().replace_all(&cleaned, " ");
    cleaned
        .split_whitespace()
        .take(word_limit)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drop emoji and control characters, keeping everything else intact.
pub fn strip_emojis(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() && !is_emoji(*c))
        .collect()
}

/// A short excerpt for citation display.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{truncated}...")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

// Covers the emoji planes that show up in scraped pages; not exhaustive,
// but the output only feeds a text-model context.
fn is_emoji(c: char) -> bool {
    matches!(u32::from(c),
        0x1F300..=0x1FAFF
        | 0x2600..=0x27BF
        | 0x1F1E6..=0x1F1FF
        | 0xFE00..=0xFE0F
        | 0x200D)
}
