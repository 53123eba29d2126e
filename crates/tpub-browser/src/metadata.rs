//! Tags and category

use tracing::{info, instrument, warn};

use crate::driver::{EditorDriver, Frame};
use crate::error::Result;
use crate::locator::{wait_for, Presence, Wait};
use crate::selectors;
use tpub_core::{settle, StageOutcome, Timings};

/// Enter the comma-joined tag string into the tag field
#[instrument(skip_all)]
pub async fn apply_tags<D: EditorDriver + ?Sized>(
    driver: &D,
    tags: &str,
    timings: &Timings,
) -> Result<StageOutcome> {
    if tags.trim().is_empty() {
        return Ok(StageOutcome::Skipped {
            reason: "no tags".to_string(),
        });
    }
    info!("Adding tags: {}", tags);

    let field = selectors::tag_field();
    wait_for(
        driver,
        Frame::Main,
        &field,
        Presence::Present,
        Wait::new(timings.ui_timeout(), timings.poll_interval()),
    )
    .await?;

    driver.scroll_into_view(Frame::Main, &field).await?;
    settle(timings.short_settle()).await;
    driver.clear(Frame::Main, &field).await?;
    driver.set_value(Frame::Main, &field, tags).await?;
    driver.press_enter().await?;

    info!("Tags added");
    Ok(StageOutcome::Completed)
}

/// Pick `category` from the category dropdown
///
/// A category that does not exist on the blog leaves the post uncategorized.
#[instrument(skip(driver, timings))]
pub async fn select_category<D: EditorDriver + ?Sized>(
    driver: &D,
    category: Option<&str>,
    timings: &Timings,
) -> Result<StageOutcome> {
    let Some(category) = category else {
        return Ok(StageOutcome::Skipped {
            reason: "no category".to_string(),
        });
    };
    info!("Setting category to: {}", category);

    let button = selectors::category_button();
    let ui_wait = Wait::new(timings.ui_timeout(), timings.poll_interval());
    wait_for(driver, Frame::Main, &button, Presence::Visible, ui_wait).await?;
    driver.scroll_into_view(Frame::Main, &button).await?;
    settle(timings.short_settle()).await;
    if let Err(e) = driver.click(Frame::Main, &button).await {
        warn!("Category button click intercepted ({}), clicking from script", e);
        driver.script_click(Frame::Main, &button).await?;
    }
    settle(timings.short_settle()).await;

    let item = selectors::category_item(category);
    if wait_for(driver, Frame::Main, &item, Presence::Present, ui_wait)
        .await
        .is_err()
    {
        warn!(
            "Could not select category '{}'. Is it created on the blog?",
            category
        );
        return Ok(StageOutcome::Degraded {
            reason: format!("category '{}' not found", category),
        });
    }

    driver.script_click(Frame::Main, &item).await?;
    settle(timings.short_settle()).await;
    info!("Category '{}' selected", category);
    Ok(StageOutcome::Completed)
}
