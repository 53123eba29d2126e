//! Draft loading and markup analysis
//!
//! A result folder produced by the upstream pipeline looks like:
//!
//! ```text
//! result/2025-01-31/
//!   blog_post.html   required
//!   hashtags.txt     optional, space separated `#tag` words
//!   category.txt     optional, one category name
//!   image_1.png      images referenced by relative `src`
//! ```
//!
//! Everything here is pure string processing; the draft is read completely
//! before any browser work starts.

use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

use crate::{ImageRef, Result, TpubError};

pub const HTML_FILE: &str = "blog_post.html";
pub const HASHTAG_FILE: &str = "hashtags.txt";
pub const CATEGORY_FILE: &str = "category.txt";

/// Title used when the draft has no usable `<h1>`
pub const DEFAULT_TITLE: &str = "AI Generated Blog Post";

/// Text typed into an input when there is nothing else to type
pub const EMPTY_INPUT_TEXT: &str = "untitle";

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// The post to publish, fully loaded into memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    /// Absolute result folder the draft was loaded from
    pub folder: PathBuf,
    /// Raw HTML markup
    pub html: String,
    /// Title derived from the first `<h1>`, safe to type
    pub title: String,
    /// De-duplicated tags, `#` stripped, first-seen order
    pub tags: Vec<String>,
    pub category: Option<String>,
}

impl Draft {
    /// Load a draft from a result folder
    pub fn load(folder: &Path) -> Result<Self> {
        let html_path = folder.join(HTML_FILE);
        if !html_path.is_file() {
            return Err(TpubError::MissingInput(html_path));
        }

        info!("Reading content from {}", html_path.display());
        let html = std::fs::read_to_string(&html_path)?;
        let folder = std::fs::canonicalize(folder)?;

        let hashtag_path = folder.join(HASHTAG_FILE);
        let tags = if hashtag_path.is_file() {
            parse_tag_text(&std::fs::read_to_string(&hashtag_path)?)
        } else {
            info!("{} not found, extracting tags from HTML", HASHTAG_FILE);
            extract_hashtags_from_html(&html)
        };

        let category_path = folder.join(CATEGORY_FILE);
        let category = if category_path.is_file() {
            let value = std::fs::read_to_string(&category_path)?.trim().to_string();
            Some(value).filter(|v| !v.is_empty())
        } else {
            None
        };

        let draft = Self::from_parts(folder, html, tags, category);
        info!(
            "Loaded draft '{}' ({} chars, {} tags, category: {:?})",
            draft.title,
            draft.html.len(),
            draft.tags.len(),
            draft.category
        );
        Ok(draft)
    }

    /// Assemble a draft from already-read parts
    pub fn from_parts(
        folder: PathBuf,
        html: String,
        tags: Vec<String>,
        category: Option<String>,
    ) -> Self {
        let title = extract_title(&html);
        Self {
            folder,
            html,
            title,
            tags: dedupe_tags(tags),
            category,
        }
    }

    /// Tags as submitted to the tag field: `a, b, c`
    pub fn tag_string(&self) -> String {
        self.tags.join(", ")
    }

    /// Local images referenced by the draft, resolved against the folder
    pub fn local_images(&self) -> Vec<ImageRef> {
        local_image_sources(&self.html)
            .into_iter()
            .map(|src| {
                let filename = file_name_of(&src).to_string();
                let path = if Path::new(&src).is_absolute() {
                    PathBuf::from(&src)
                } else {
                    self.folder.join(&src)
                };
                ImageRef {
                    src,
                    filename,
                    path,
                }
            })
            .collect()
    }
}

fn title_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").expect("valid title regex"))
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid tag regex"))
}

fn hashtag_section_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)<div class="hashtag-section"[^>]*>(.*?)</div>"#)
            .expect("valid hashtag regex")
    })
}

fn image_src_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)src=["']([^"']+\.(?:png|jpg|jpeg|gif))["']"#).expect("valid src regex")
    })
}

/// Remove markup tags from a fragment
pub fn strip_tags(fragment: &str) -> String {
    tag_regex().replace_all(fragment, "").into_owned()
}

/// Drop characters outside the basic multilingual plane (emoji and friends)
///
/// Some input paths cannot type them, so titles never contain them.
pub fn strip_non_bmp(text: &str) -> String {
    text.chars().filter(|c| (*c as u32) <= 0xFFFF).collect()
}

/// Title from the first `<h1>`, or [`DEFAULT_TITLE`]
pub fn extract_title(html: &str) -> String {
    let title = title_regex()
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| strip_tags(m.as_str()))
        .map(|t| strip_non_bmp(&t).trim().to_string())
        .filter(|t| !t.is_empty());

    match title {
        Some(title) => title,
        None => {
            debug!("No <h1> title in draft, using default");
            DEFAULT_TITLE.to_string()
        }
    }
}

/// Text to type into an input; never empty
pub fn input_text(text: &str) -> &str {
    if text.trim().is_empty() {
        EMPTY_INPUT_TEXT
    } else {
        text
    }
}

/// De-duplicate tags preserving first-seen order
///
/// Strips every `#` and surrounding whitespace; empty tags are dropped.
pub fn dedupe_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|t| t.as_ref().replace('#', "").trim().to_string())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Parse free-form tag text (`#a #b, c`) into de-duplicated tags
pub fn parse_tag_text(text: &str) -> Vec<String> {
    dedupe_tags(text.split(|c: char| c.is_whitespace() || c == ','))
}

/// Tags from every `hashtag-section` div of the draft
///
/// There may be an empty placeholder section before the filled one, so all
/// sections are scanned.
pub fn extract_hashtags_from_html(html: &str) -> Vec<String> {
    let words: Vec<String> = hashtag_section_regex()
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| strip_tags(m.as_str()))
        .flat_map(|text| {
            text.split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect();

    let tags = dedupe_tags(words);
    if tags.is_empty() {
        info!("No tags found in HTML");
    } else {
        info!("Extracted tags: {}", tags.join(", "));
    }
    tags
}

/// Final path component, accepting both separators
pub fn file_name_of(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

pub fn is_network_source(src: &str) -> bool {
    let lower = src.to_ascii_lowercase();
    lower.starts_with("http") || lower.starts_with("//") || lower.starts_with("data:")
}

fn has_image_extension(src: &str) -> bool {
    src.rsplit_once('.')
        .map(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Local image `src` values, de-duplicated by filename in first-seen order
pub fn local_image_sources(html: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for caps in image_src_regex().captures_iter(html) {
        let src = &caps[1];
        if is_network_source(src) || !has_image_extension(src) {
            continue;
        }
        if seen.insert(file_name_of(src).to_string()) {
            sources.push(src.to_string());
        }
    }

    debug!("Local images in draft: {:?}", sources);
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_extract_title() {
        assert_eq!(extract_title("<h1>Market Notes</h1><p>x</p>"), "Market Notes");
        assert_eq!(
            extract_title("<h1 class=\"t\">  <b>Rates</b> rise </h1>"),
            "Rates rise"
        );
    }

    #[test]
    fn test_missing_title_falls_back_to_default() {
        assert_eq!(extract_title("<h2>Only a subtitle</h2>"), DEFAULT_TITLE);
        assert_eq!(extract_title("<h1>   </h1>"), DEFAULT_TITLE);
    }

    #[test]
    fn test_title_strips_non_bmp() {
        assert_eq!(extract_title("<h1>금리 인상 📈 정리</h1>"), "금리 인상  정리");
        assert_eq!(extract_title("<h1>🚀</h1>"), DEFAULT_TITLE);
    }

    #[test]
    fn test_input_text_never_empty() {
        assert_eq!(input_text(""), EMPTY_INPUT_TEXT);
        assert_eq!(input_text("  "), EMPTY_INPUT_TEXT);
        assert_eq!(input_text("tags"), "tags");
    }

    #[test]
    fn test_dedupe_tags_preserves_first_seen_order() {
        let tags = dedupe_tags(["#경제", " 부동산 ", "#경제", "##", "금리#"]);
        assert_eq!(tags, vec!["경제", "부동산", "금리"]);
    }

    #[test]
    fn test_parse_tag_text() {
        assert_eq!(
            parse_tag_text("#AI #반도체\n#AI, 투자"),
            vec!["AI", "반도체", "투자"]
        );
    }

    #[test]
    fn test_hashtags_from_html_sections() {
        let html = r#"
            <div class="hashtag-section"></div>
            <p>body</p>
            <div class="hashtag-section" style="color: #718096">#경제 #부동산 #경제</div>
        "#;
        assert_eq!(extract_hashtags_from_html(html), vec!["경제", "부동산"]);
    }

    #[test]
    fn test_local_image_sources_filters_and_dedupes() {
        let html = r#"
            <img src="image_1.png">
            <img src="https://cdn.example.com/a.png">
            <img src='//cdn.example.com/b.jpg'>
            <img src="images/image_1.png">
            <img src="chart.JPEG">
            <img src="doc.pdf">
            <img src="image_2.gif">
        "#;
        assert_eq!(
            local_image_sources(html),
            vec!["image_1.png", "chart.JPEG", "image_2.gif"]
        );
    }

    #[test]
    fn test_file_name_of_both_separators() {
        assert_eq!(file_name_of("a/b/c.png"), "c.png");
        assert_eq!(file_name_of(r"C:\tmp\c.png"), "c.png");
        assert_eq!(file_name_of("c.png"), "c.png");
    }

    #[test]
    fn test_load_missing_html_is_missing_input() {
        let dir = TempDir::new().unwrap();
        let err = Draft::load(dir.path()).unwrap_err();
        assert!(matches!(err, TpubError::MissingInput(_)));
    }

    #[test]
    fn test_load_prefers_hashtag_file_and_reads_category() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(HTML_FILE),
            r#"<h1>Title</h1><div class="hashtag-section">#html</div><img src="image_1.png">"#,
        )
        .unwrap();
        std::fs::write(dir.path().join(HASHTAG_FILE), "#file #tags #file\n").unwrap();
        std::fs::write(dir.path().join(CATEGORY_FILE), "  경제  \n").unwrap();

        let draft = Draft::load(dir.path()).unwrap();
        assert_eq!(draft.title, "Title");
        assert_eq!(draft.tag_string(), "file, tags");
        assert_eq!(draft.category.as_deref(), Some("경제"));

        let images = draft.local_images();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].filename, "image_1.png");
        assert!(images[0].path.is_absolute());
        assert!(!images[0].exists());
    }

    #[test]
    fn test_load_falls_back_to_html_hashtags() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(HTML_FILE),
            r#"<div class="hashtag-section">#경제 #부동산 #경제</div>"#,
        )
        .unwrap();
        std::fs::write(dir.path().join(CATEGORY_FILE), "\n").unwrap();

        let draft = Draft::load(dir.path()).unwrap();
        assert_eq!(draft.tag_string(), "경제, 부동산");
        assert_eq!(draft.title, DEFAULT_TITLE);
        assert!(draft.category.is_none());
    }

    #[test]
    fn test_empty_hashtag_file_still_wins_over_html() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(HTML_FILE),
            r#"<div class="hashtag-section">#경제</div>"#,
        )
        .unwrap();
        std::fs::write(dir.path().join(HASHTAG_FILE), "  \n").unwrap();

        let draft = Draft::load(dir.path()).unwrap();
        assert!(draft.tags.is_empty());
    }
}
