//! Editor driver abstraction
//!
//! Every browser interaction of the publishing workflow goes through
//! [`EditorDriver`]. [`crate::BrowserSession`] implements it over the Chrome
//! DevTools Protocol; [`crate::mock::MockEditor`] implements it over a
//! scripted fake page for tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::locator::Locator;

/// Document a DOM primitive runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frame {
    /// The top-level editor page
    Main,
    /// The n-th `iframe` of the top-level page
    Child(usize),
}

impl Frame {
    /// Index used by the injected scripts, -1 for the main document
    pub fn script_index(self) -> i64 {
        match self {
            Frame::Main => -1,
            Frame::Child(index) => index as i64,
        }
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frame::Main => write!(f, "main"),
            Frame::Child(index) => write!(f, "frame[{}]", index),
        }
    }
}

/// Observed state of an element at query time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementState {
    /// Rendered with a non-empty box and not `visibility: hidden`
    pub visible: bool,
    /// `value` of form controls, `None` for everything else
    pub value: Option<String>,
    /// Trimmed text content
    #[serde(default)]
    pub text: String,
}

impl ElementState {
    /// Whether a form control holds a non-blank value
    pub fn has_value(&self) -> bool {
        self.value
            .as_deref()
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false)
    }
}

/// What to do with `confirm()`/`alert()` dialogs raised by the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogPolicy {
    Accept,
    Dismiss,
}

/// Browser operations needed by the publishing workflow (allows mocking in tests)
///
/// Element primitives take the [`Frame`] to run in and a single [`Locator`];
/// callers that need fallbacks go through [`crate::locator::resolve`] first.
#[async_trait]
pub trait EditorDriver: Send + Sync {
    /// Navigate and wait for the navigation to finish
    async fn navigate(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// Observe an element; `Ok(None)` when it is not in the document
    async fn query(&self, frame: Frame, locator: &Locator) -> Result<Option<ElementState>>;

    /// Number of elements matching the locator
    async fn count(&self, frame: Frame, locator: &Locator) -> Result<usize>;

    /// Number of child frames of the main document
    async fn frame_count(&self) -> Result<usize>;

    /// Click with real input events
    async fn click(&self, frame: Frame, locator: &Locator) -> Result<()>;

    /// Click by dispatching `element.click()` from script, bypassing overlays
    async fn script_click(&self, frame: Frame, locator: &Locator) -> Result<()>;

    async fn scroll_into_view(&self, frame: Frame, locator: &Locator) -> Result<()>;

    /// Focus an element and type text with key events
    async fn type_text(&self, frame: Frame, locator: &Locator, text: &str) -> Result<()>;

    /// Press Enter on whatever holds focus
    async fn press_enter(&self) -> Result<()>;

    /// Select the element's whole content and delete it
    async fn clear(&self, frame: Frame, locator: &Locator) -> Result<()>;

    /// Focus, assign `value` and fire `input`, `change` and `blur`
    async fn set_value(&self, frame: Frame, locator: &Locator, value: &str) -> Result<()>;

    /// Insert text into the focused element as a single paste-like user input
    async fn paste(&self, text: &str) -> Result<()>;

    /// Override `display`/`visibility` so hidden controls can receive input
    async fn force_visible(&self, frame: Frame, locator: &Locator) -> Result<()>;

    /// Make the element the document's current selection range
    async fn select_node(&self, frame: Frame, locator: &Locator) -> Result<()>;

    /// Remove the first matching element; `Ok(false)` when nothing matched
    async fn remove(&self, frame: Frame, locator: &Locator) -> Result<bool>;

    /// Attach a local file to a file input
    async fn set_file_input(&self, frame: Frame, locator: &Locator, path: &Path) -> Result<()>;

    /// Evaluate a script in the main document
    async fn run_script(&self, script: &str) -> Result<serde_json::Value>;

    /// Decide how page-raised `confirm()`/`alert()` calls are answered from now on
    async fn set_dialog_policy(&self, policy: DialogPolicy) -> Result<()>;

    /// Answer a native dialog that is already open; `Ok(false)` when none is
    async fn handle_dialog(&self, accept: bool) -> Result<bool>;

    async fn page_source(&self) -> Result<String>;

    /// PNG screenshot of the viewport
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Release the browser
    async fn close(&self) -> Result<()>;
}

/// Poll [`EditorDriver::handle_dialog`] until a dialog shows up or the wait ends
pub async fn answer_dialog<D: EditorDriver + ?Sized>(
    driver: &D,
    accept: bool,
    wait: crate::locator::Wait,
) -> bool {
    let started = std::time::Instant::now();
    loop {
        match driver.handle_dialog(accept).await {
            Ok(true) => {
                tracing::info!("Dialog {}", if accept { "accepted" } else { "dismissed" });
                return true;
            }
            Ok(false) => {}
            Err(e) => tracing::debug!("Dialog handling failed: {}", e),
        }
        if started.elapsed() >= wait.timeout {
            return false;
        }
        let poll = if wait.poll.is_zero() {
            std::time::Duration::from_millis(50)
        } else {
            wait.poll
        };
        tpub_core::settle(poll).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_script_index() {
        assert_eq!(Frame::Main.script_index(), -1);
        assert_eq!(Frame::Child(2).script_index(), 2);
        assert_eq!(Frame::Child(0).to_string(), "frame[0]");
    }

    #[test]
    fn test_has_value() {
        let mut state = ElementState::default();
        assert!(!state.has_value());
        state.value = Some("   ".into());
        assert!(!state.has_value());
        state.value = Some("제목".into());
        assert!(state.has_value());
    }
}
