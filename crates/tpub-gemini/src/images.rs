//! Missing-image repair for a draft
//!
//! Drafts store images next to the HTML file. Older drafts referenced an
//! `images/` subfolder; those references are flattened and the files moved
//! up. Whatever is still missing is regenerated from the tag's `data-prompt`
//! (or its `alt` text).

use regex::{Captures, Regex};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::fs;
use tracing::{info, instrument, warn};

use crate::client::Generator;
use tpub_core::draft::{file_name_of, is_network_source};
use tpub_core::{Result, TpubError};

/// Legacy subfolder images used to live in
pub const LEGACY_IMAGE_DIR: &str = "images";

fn img_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<img\b[^>]*>").expect("valid img regex"))
}

fn attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)([a-z_:][-a-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
            .expect("valid attribute regex")
    })
}

/// Value of attribute `name` in one tag
fn attr<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    attr_regex()
        .captures_iter(tag)
        .find(|caps| caps[1].eq_ignore_ascii_case(name))
        .and_then(|caps| caps.get(2).or_else(|| caps.get(3)))
        .map(|m| m.as_str())
}

fn in_legacy_dir(src: &str) -> bool {
    src.contains("images/") || src.contains("images\\")
}

/// An image the draft expects next to its HTML
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageJob {
    pub filename: String,
    /// Generation prompt; empty when the tag has neither `data-prompt` nor `alt`
    pub prompt: String,
}

/// Rewrite `images/...` sources to bare filenames
///
/// Returns the new HTML and whether anything changed.
pub fn flatten_image_paths(html: &str) -> (String, bool) {
    let mut changed = false;
    let rewritten = img_tag_regex().replace_all(html, |tag: &Captures| {
        let tag = &tag[0];
        let src = match attr(tag, "src") {
            Some(src) if in_legacy_dir(src) && !is_network_source(src) => src,
            _ => return tag.to_string(),
        };
        changed = true;
        let flat = file_name_of(src);
        attr_regex()
            .replace_all(tag, |a: &Captures| {
                if a[1].eq_ignore_ascii_case("src") {
                    format!("{}=\"{}\"", &a[1], flat)
                } else {
                    a[0].to_string()
                }
            })
            .into_owned()
    });
    (rewritten.into_owned(), changed)
}

/// Local images referenced by `html`, in document order, one per filename
pub fn image_jobs(html: &str) -> Vec<ImageJob> {
    let mut jobs: Vec<ImageJob> = Vec::new();
    for tag in img_tag_regex().find_iter(html) {
        let tag = tag.as_str();
        let Some(src) = attr(tag, "src").filter(|s| !s.trim().is_empty()) else {
            continue;
        };
        if is_network_source(src) {
            continue;
        }
        let filename = file_name_of(src).to_string();
        if jobs.iter().any(|j| j.filename == filename) {
            continue;
        }
        let prompt = attr(tag, "data-prompt")
            .or_else(|| attr(tag, "alt"))
            .unwrap_or_default()
            .trim()
            .to_string();
        jobs.push(ImageJob { filename, prompt });
    }
    jobs
}

/// What happened to one image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RepairStatus {
    AlreadyPresent,
    /// Moved up from the legacy subfolder
    Moved,
    Generated,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRepair {
    pub filename: String,
    #[serde(flatten)]
    pub status: RepairStatus,
}

/// Result of repairing one draft
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepairReport {
    pub html_rewritten: bool,
    pub images: Vec<ImageRepair>,
}

impl RepairReport {
    pub fn failed(&self) -> Vec<&str> {
        self.images
            .iter()
            .filter(|i| matches!(i.status, RepairStatus::Failed { .. }))
            .map(|i| i.filename.as_str())
            .collect()
    }
}

/// Flatten image paths in the draft at `html_path` and fill in missing images
///
/// A failed image does not stop the others.
#[instrument(skip(generator))]
pub async fn repair_images<G: Generator + ?Sized>(
    html_path: &Path,
    generator: &G,
) -> Result<RepairReport> {
    if !html_path.is_file() {
        return Err(TpubError::MissingInput(html_path.to_path_buf()));
    }
    let base_dir = html_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let original = fs::read_to_string(html_path).await?;
    let (html, html_rewritten) = flatten_image_paths(&original);

    let mut report = RepairReport {
        html_rewritten,
        images: Vec::new(),
    };
    for job in image_jobs(&html) {
        let status = match repair_one(&base_dir, &job, generator).await {
            Ok(status) => status,
            Err(e) => {
                warn!("Image {} not repaired: {}", job.filename, e);
                RepairStatus::Failed {
                    reason: e.to_string(),
                }
            }
        };
        report.images.push(ImageRepair {
            filename: job.filename,
            status,
        });
    }

    if html_rewritten {
        fs::write(html_path, html).await?;
        info!("Updated HTML with flat image paths: {}", html_path.display());
    }
    Ok(report)
}

async fn repair_one<G: Generator + ?Sized>(
    base_dir: &Path,
    job: &ImageJob,
    generator: &G,
) -> Result<RepairStatus> {
    let target = base_dir.join(&job.filename);
    if target.is_file() {
        info!("Image already exists: {}", target.display());
        return Ok(RepairStatus::AlreadyPresent);
    }

    let legacy_dir = base_dir.join(LEGACY_IMAGE_DIR);
    let legacy = legacy_dir.join(&job.filename);
    if legacy.is_file() {
        info!("Moving {} to {}", legacy.display(), target.display());
        fs::rename(&legacy, &target).await?;
        // Only succeeds once the folder is empty.
        let _ = fs::remove_dir(&legacy_dir).await;
        return Ok(RepairStatus::Moved);
    }

    if job.prompt.is_empty() {
        return Err(TpubError::Other(format!(
            "{} is missing and has no prompt",
            job.filename
        )));
    }

    info!("Missing image {}, prompt: {}", target.display(), job.prompt);
    let bytes = generator.generate_image(&job.prompt).await?;
    fs::write(&target, bytes).await?;
    info!("Saved generated image to {}", target.display());
    Ok(RepairStatus::Generated)
}
