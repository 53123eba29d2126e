//! Failure diagnostics
//!
//! When a run stops on a fatal stage, the page as the browser last saw it is
//! written next to the draft so the failure can be inspected after the
//! browser is gone.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::driver::EditorDriver;

pub const PAGE_SOURCE_FILE: &str = "debug_page_source.html";

/// Files written for one failure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub page_source: Option<PathBuf>,
    pub screenshot: Option<PathBuf>,
}

/// Screenshot file name for a failed stage
pub fn screenshot_name(stage: &str, at: chrono::DateTime<chrono::Local>) -> String {
    let stage: String = stage
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("debug_{}_{}.png", stage, at.format("%Y%m%d_%H%M%S"))
}

/// Dump page source and a screenshot into `folder`
///
/// Best effort: a capture that fails is logged and left out.
pub async fn capture_failure<D: EditorDriver + ?Sized>(
    driver: &D,
    folder: &Path,
    stage: &str,
) -> Diagnostics {
    let mut diagnostics = Diagnostics::default();

    match driver.page_source().await {
        Ok(source) => {
            let path = folder.join(PAGE_SOURCE_FILE);
            match tokio::fs::write(&path, source).await {
                Ok(()) => diagnostics.page_source = Some(path),
                Err(e) => warn!("Could not write page source: {}", e),
            }
        }
        Err(e) => warn!("Could not read page source: {}", e),
    }

    match driver.screenshot().await {
        Ok(png) => {
            let path = folder.join(screenshot_name(stage, chrono::Local::now()));
            match tokio::fs::write(&path, png).await {
                Ok(()) => diagnostics.screenshot = Some(path),
                Err(e) => warn!("Could not write screenshot: {}", e),
            }
        }
        Err(e) => warn!("Could not capture screenshot: {}", e),
    }

    if let Some(path) = &diagnostics.page_source {
        info!("Page source saved to {}", path.display());
    }
    if let Some(path) = &diagnostics.screenshot {
        info!("Screenshot saved to {}", path.display());
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockEditor;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_screenshot_name() {
        let at = chrono::Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            screenshot_name("mode switch", at),
            "debug_mode_switch_20240309_140507.png"
        );
    }

    #[tokio::test]
    async fn test_capture_writes_both_files() {
        let dir = TempDir::new().unwrap();
        let mock = MockEditor::new().with_page_source("<html>editor</html>");

        let diagnostics = capture_failure(&mock, dir.path(), "publish").await;

        let source = diagnostics.page_source.unwrap();
        assert_eq!(std::fs::read_to_string(source).unwrap(), "<html>editor</html>");
        let shot = diagnostics.screenshot.unwrap();
        assert!(std::fs::read(shot).unwrap().starts_with(b"\x89PNG"));
    }

    #[tokio::test]
    async fn test_capture_survives_unwritable_folder() {
        let dir = TempDir::new().unwrap();
        let mock = MockEditor::new().fail_on("screenshot");

        let diagnostics = capture_failure(&mock, &dir.path().join("missing"), "login").await;
        assert_eq!(diagnostics, Diagnostics::default());
    }
}
