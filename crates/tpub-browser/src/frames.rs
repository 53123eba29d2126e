//! Cross-frame element search

use tracing::debug;

use crate::driver::{EditorDriver, ElementState, Frame};
use crate::error::Result;
use crate::locator::Locator;

/// Where an element was found
#[derive(Debug, Clone, PartialEq)]
pub struct FrameMatch {
    pub frame: Frame,
    pub state: ElementState,
}

/// Search the main document, then each child frame in order
///
/// The first match wins. Nothing is clicked, focused or switched; callers
/// act on the returned [`Frame`] explicitly.
pub async fn find_in_any_frame<D: EditorDriver + ?Sized>(
    driver: &D,
    locator: &Locator,
) -> Result<Option<FrameMatch>> {
    if let Some(state) = driver.query(Frame::Main, locator).await? {
        return Ok(Some(FrameMatch {
            frame: Frame::Main,
            state,
        }));
    }

    let frames = driver.frame_count().await?;
    for index in 0..frames {
        let frame = Frame::Child(index);
        match driver.query(frame, locator).await {
            Ok(Some(state)) => {
                debug!("Found {} in {}", locator, frame);
                return Ok(Some(FrameMatch { frame, state }));
            }
            Ok(None) => {}
            // A cross-origin frame cannot be inspected; keep looking.
            Err(e) => debug!("Skipping {}: {}", frame, e),
        }
    }

    Ok(None)
}

/// Total matches across the main document and every child frame
pub async fn count_in_all_frames<D: EditorDriver + ?Sized>(
    driver: &D,
    locator: &Locator,
) -> Result<usize> {
    let mut total = driver.count(Frame::Main, locator).await?;
    for index in 0..driver.frame_count().await? {
        total += driver.count(Frame::Child(index), locator).await.unwrap_or(0);
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockEditor, MockElement};

    #[tokio::test]
    async fn test_main_document_wins() {
        let img = Locator::css("img");
        let mock = MockEditor::new()
            .with_element(Frame::Main, img.clone(), MockElement::visible())
            .with_element(Frame::Child(0), img.clone(), MockElement::visible());

        let found = find_in_any_frame(&mock, &img).await.unwrap().unwrap();
        assert_eq!(found.frame, Frame::Main);
    }

    #[tokio::test]
    async fn test_first_child_frame_in_order() {
        let img = Locator::css("img[src*=\"a.png\"]");
        let mock = MockEditor::new()
            .with_element(Frame::Child(1), img.clone(), MockElement::visible())
            .with_element(Frame::Child(2), img.clone(), MockElement::visible());

        let found = find_in_any_frame(&mock, &img).await.unwrap().unwrap();
        assert_eq!(found.frame, Frame::Child(1));
    }

    #[tokio::test]
    async fn test_search_has_no_side_effects() {
        let img = Locator::css("img");
        let mock = MockEditor::new().with_frames(3);

        assert!(find_in_any_frame(&mock, &img).await.unwrap().is_none());
        assert!(mock.actions().is_empty());
    }

    #[tokio::test]
    async fn test_count_in_all_frames() {
        let img = Locator::css("img");
        let mock = MockEditor::new()
            .with_element(Frame::Main, img.clone(), MockElement::visible().with_count(2))
            .with_element(Frame::Child(0), img.clone(), MockElement::visible().with_count(3));

        assert_eq!(count_in_all_frames(&mock, &img).await.unwrap(), 5);
    }
}
