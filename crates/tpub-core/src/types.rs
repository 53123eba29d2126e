//! Core type definitions for a publishing run

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Editing surface currently shown by the remote editor.
///
/// The editor owns this state; callers only ever hold a *believed* value that
/// has to be reconciled by observing the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorMode {
    /// Literal markup surface (CodeMirror)
    Raw,
    /// What-you-see-is-what-you-get surface ("basic" mode)
    Rendered,
    #[default]
    Unknown,
}

impl std::fmt::Display for EditorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raw => write!(f, "raw"),
            Self::Rendered => write!(f, "rendered"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Authentication progress of a browser session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
}

impl std::fmt::Display for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "unauthenticated"),
            Self::Authenticating => write!(f, "authenticating"),
            Self::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// Post visibility selected in the publish layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Private => write!(f, "private"),
            Self::Public => write!(f, "public"),
        }
    }
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "private" => Ok(Self::Private),
            "public" => Ok(Self::Public),
            _ => Err(format!("Invalid visibility: {}", s)),
        }
    }
}

/// A locally-referenced image found in the draft markup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// `src` attribute value as written in the draft
    pub src: String,
    /// Bare filename, used to match the placeholder in the editor
    pub filename: String,
    /// Absolute path on the local filesystem
    pub path: PathBuf,
}

impl ImageRef {
    /// Whether the image file is present on disk right now
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// What happened to one image during replacement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageOutcome {
    pub filename: String,
    pub placeholder_found: bool,
    pub uploaded: bool,
    pub placeholder_removed: bool,
    /// Reason the image was skipped or failed, if any
    pub error: Option<String>,
}

impl ImageOutcome {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Default::default()
        }
    }

    /// Uploaded and no stale placeholder left behind
    pub fn resolved(&self) -> bool {
        self.uploaded && (!self.placeholder_found || self.placeholder_removed)
    }
}

/// Terminal request submitted through the publish layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub title: String,
    /// Comma-joined, de-duplicated tag string
    pub tags: String,
    pub category: Option<String>,
    pub visibility: Visibility,
}

/// Outcome of one workflow stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome {
    Completed,
    Skipped { reason: String },
    Degraded { reason: String },
    Failed { reason: String },
}

impl StageOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}
