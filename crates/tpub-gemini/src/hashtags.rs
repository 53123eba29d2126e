//! Hashtag section generation for a draft

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tokio::fs;
use tracing::{info, instrument};

use crate::client::{Generator, HASHTAG_CONTEXT_CHARS};
use tpub_core::draft::strip_tags;
use tpub_core::{Result, TpubError};

const SECTION_STYLE: &str = "margin-top: 30px; font-size: 0.9em; color: #718096; text-align: center;";

fn div_with_class_regex(class: &str) -> Regex {
    Regex::new(&format!(
        r#"(?i)<div\b[^>]*\bclass\s*=\s*["'](?:[^"']*\s)?{}(?:\s[^"']*)?["'][^>]*>"#,
        regex::escape(class)
    ))
    .expect("valid class regex")
}

fn footer_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| div_with_class_regex("footer"))
}

fn container_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| div_with_class_regex("container"))
}

fn div_boundary_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<div\b|</div\s*>").expect("valid div regex"))
}

fn body_close_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</body\s*>").expect("valid body regex"))
}

fn non_text_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<(script|style|head)\b.*?</(script|style|head)\s*>")
            .expect("valid non-text regex")
    })
}

/// Visible text of the page, whitespace collapsed
pub fn page_text(html: &str) -> String {
    let without_code = non_text_regex().replace_all(html, " ");
    let spaced = without_code.replace('<', " <");
    strip_tags(&spaced)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Markup for the hashtag section
pub fn hashtag_section(hashtags: &str) -> String {
    format!(
        r#"<div class="hashtag-section" style="{}">{}</div>"#,
        SECTION_STYLE,
        escape_text(hashtags.trim())
    )
}

/// Byte offset of the `</div>` closing the div opened at `open_end`
fn matching_close(html: &str, open_end: usize) -> Option<usize> {
    let mut depth = 1usize;
    for m in div_boundary_regex().find_iter(&html[open_end..]) {
        if m.as_str().starts_with("</") {
            depth -= 1;
            if depth == 0 {
                return Some(open_end + m.start());
            }
        } else {
            depth += 1;
        }
    }
    None
}

/// Insert the hashtag section into `html`
///
/// Placement: before the footer div, else at the end of the container div,
/// else before `</body>`, else at the very end.
pub fn insert_hashtag_section(html: &str, hashtags: &str) -> String {
    let section = hashtag_section(hashtags);

    let at = footer_regex()
        .find(html)
        .map(|m| m.start())
        .or_else(|| {
            container_regex()
                .find(html)
                .and_then(|m| matching_close(html, m.end()))
        })
        .or_else(|| body_close_regex().find(html).map(|m| m.start()));

    match at {
        Some(at) => format!("{}{}{}", &html[..at], section, &html[at..]),
        None => format!("{}{}", html, section),
    }
}

/// Generate hashtags for the draft at `html_path` and write them into it
///
/// Returns the generated hashtag line.
#[instrument(skip(generator))]
pub async fn add_hashtags<G: Generator + ?Sized>(html_path: &Path, generator: &G) -> Result<String> {
    if !html_path.is_file() {
        return Err(TpubError::MissingInput(html_path.to_path_buf()));
    }
    let html = fs::read_to_string(html_path).await?;

    let text: String = page_text(&html).chars().take(HASHTAG_CONTEXT_CHARS).collect();
    let hashtags = generator.generate_hashtags(&text).await?;

    fs::write(html_path, insert_hashtag_section(&html, &hashtags)).await?;
    info!("Hashtags appended to: {}", html_path.display());
    Ok(hashtags)
}
