//! Publish layer and final submission
//!
//! The submit click is attempted exactly once. If it cannot be confirmed the
//! run fails rather than risk a second, duplicate post.

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::driver::{EditorDriver, Frame};
use crate::error::{Result, TpubError};
use crate::injector::title_value;
use crate::locator::{resolve, wait_for, Locator, Presence, Wait};
use crate::selectors;
use tpub_core::draft::input_text;
use tpub_core::fail_open::fail_open;
use tpub_core::{settle, PublishRequest, Timings, Visibility};

/// What the publish step did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReceipt {
    pub visibility: Visibility,
    /// Whether the visibility option was actually clicked
    pub visibility_selected: bool,
    /// Whether the title had to be re-entered before submitting
    pub title_repaired: bool,
}

#[instrument(skip_all, fields(visibility = %request.visibility))]
pub async fn publish<D: EditorDriver + ?Sized>(
    driver: &D,
    request: &PublishRequest,
    timings: &Timings,
) -> Result<PublishReceipt> {
    let button_wait = Wait::new(timings.publish_button_timeout(), timings.poll_interval());

    let layer = selectors::publish_layer_button();
    script_click_when_present(driver, &layer, button_wait)
        .await
        .map_err(|e| TpubError::Publish(format!("could not open publish layer: {}", e)))?;
    settle(timings.publish_layer_delay()).await;

    let visibility_selected = select_visibility(driver, request.visibility, timings).await;
    settle(timings.short_settle()).await;

    let title_repaired = ensure_title(driver, &request.title, timings).await;

    info!("Clicking final submit ({} save)", request.visibility);
    let submit = selectors::publish_button();
    script_click_when_present(driver, &submit, button_wait)
        .await
        .map_err(|e| TpubError::Publish(format!("final submit failed: {}", e)))?;

    info!("Post published ({})", request.visibility);
    Ok(PublishReceipt {
        visibility: request.visibility,
        visibility_selected,
        title_repaired,
    })
}

async fn script_click_when_present<D: EditorDriver + ?Sized>(
    driver: &D,
    locator: &Locator,
    wait: Wait,
) -> Result<()> {
    wait_for(driver, Frame::Main, locator, Presence::Present, wait).await?;
    driver.script_click(Frame::Main, locator).await
}

async fn select_visibility<D: EditorDriver + ?Sized>(
    driver: &D,
    visibility: Visibility,
    timings: &Timings,
) -> bool {
    info!("Selecting '{}' visibility", visibility);
    let options = match visibility {
        Visibility::Private => selectors::private_option(),
        Visibility::Public => selectors::public_option(),
    };

    let selected = fail_open(&format!("{} selection", visibility), async {
        let chosen = resolve(
            driver,
            Frame::Main,
            &options,
            Presence::Visible,
            Wait::new(timings.ui_fallback_timeout(), timings.poll_interval()),
        )
        .await?;
        driver.click(Frame::Main, &chosen.locator).await
    })
    .await;
    selected.is_some()
}

/// Re-enter the title if the field lost it; returns whether it had to
async fn ensure_title<D: EditorDriver + ?Sized>(
    driver: &D,
    title: &str,
    timings: &Timings,
) -> bool {
    let current = title_value(driver).await;
    if !current.trim().is_empty() {
        info!(
            "Title verified: {}",
            current.chars().take(20).collect::<String>()
        );
        return false;
    }

    warn!("Title is missing, entering it again");
    let field = selectors::title_field();
    fail_open("title repair", async {
        driver.scroll_into_view(Frame::Main, &field).await?;
        driver.click(Frame::Main, &field).await?;
        settle(timings.short_settle()).await;
        driver.paste(input_text(title)).await
    })
    .await;
    settle(timings.short_settle()).await;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockEditor, MockElement};

    fn request(visibility: Visibility) -> PublishRequest {
        PublishRequest {
            title: "제목".into(),
            tags: String::new(),
            category: None,
            visibility,
        }
    }

    fn publish_page(title: &str) -> MockEditor {
        MockEditor::new()
            .with_element(Frame::Main, selectors::publish_layer_button(), MockElement::visible())
            .with_element(Frame::Main, selectors::publish_button(), MockElement::visible())
            .with_element(
                Frame::Main,
                selectors::title_field(),
                MockElement::visible().with_value(title),
            )
    }

    #[tokio::test]
    async fn test_private_publish() {
        let mock = publish_page("제목").with_element(
            Frame::Main,
            Locator::id("public-visibility-private"),
            MockElement::visible(),
        );

        let receipt = publish(&mock, &request(Visibility::Private), &Timings::immediate())
            .await
            .unwrap();
        assert!(receipt.visibility_selected);
        assert!(!receipt.title_repaired);

        let actions = mock.actions();
        assert_eq!(actions.first().map(String::as_str), Some("script_click #publish-layer-btn"));
        assert_eq!(actions.last().map(String::as_str), Some("script_click #publish-btn"));
        assert!(actions.contains(&"click #public-visibility-private".to_string()));
    }

    #[tokio::test]
    async fn test_public_label_fallback() {
        let label = Locator::xpath("//label[normalize-space(.)='공개']");
        let mock = publish_page("제목").with_element(Frame::Main, label.clone(), MockElement::visible());

        let receipt = publish(&mock, &request(Visibility::Public), &Timings::immediate())
            .await
            .unwrap();
        assert!(receipt.visibility_selected);
        assert!(mock.did(&format!("click {}", label)));
    }

    #[tokio::test]
    async fn test_visibility_failure_still_submits() {
        let mock = publish_page("제목");
        let receipt = publish(&mock, &request(Visibility::Private), &Timings::immediate())
            .await
            .unwrap();
        assert!(!receipt.visibility_selected);
        assert!(mock.did("script_click #publish-btn"));
    }

    #[tokio::test]
    async fn test_empty_title_is_repaired_before_submit() {
        let mock = publish_page("");
        let receipt = publish(&mock, &request(Visibility::Private), &Timings::immediate())
            .await
            .unwrap();
        assert!(receipt.title_repaired);
        assert_eq!(
            mock.value_of(Frame::Main, &selectors::title_field()).as_deref(),
            Some("제목")
        );
    }

    #[tokio::test]
    async fn test_failed_title_repair_still_submits() {
        let mock = publish_page("").fail_on("paste");
        let receipt = publish(&mock, &request(Visibility::Private), &Timings::immediate())
            .await
            .unwrap();
        assert!(receipt.title_repaired);
        assert!(mock.did("script_click #publish-btn"));
    }

    #[tokio::test]
    async fn test_missing_submit_button_fails_once() {
        let mock = MockEditor::new()
            .with_element(Frame::Main, selectors::publish_layer_button(), MockElement::visible())
            .with_element(
                Frame::Main,
                selectors::title_field(),
                MockElement::visible().with_value("제목"),
            );

        let err = publish(&mock, &request(Visibility::Private), &Timings::immediate())
            .await
            .unwrap_err();
        assert!(matches!(err, TpubError::Publish(_)));
        assert!(err.is_fatal());
        assert!(!mock.did("script_click #publish-btn"));
    }

    #[tokio::test]
    async fn test_missing_layer_button_is_publish_error() {
        let mock = MockEditor::new();
        let err = publish(&mock, &request(Visibility::Private), &Timings::immediate())
            .await
            .unwrap_err();
        assert!(matches!(err, TpubError::Publish(_)));
    }
}
