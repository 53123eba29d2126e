//! Title entry and raw HTML injection

use tracing::{info, instrument, warn};

use crate::driver::{EditorDriver, Frame};
use crate::error::{Result, TpubError};
use crate::locator::Locator;
use crate::selectors;
use tpub_core::draft::input_text;
use tpub_core::{settle, EditorMode, Timings};

/// Current value of the title field, empty when unreadable
pub async fn title_value<D: EditorDriver + ?Sized>(driver: &D) -> String {
    driver
        .query(Frame::Main, &selectors::title_field())
        .await
        .ok()
        .flatten()
        .and_then(|state| state.value)
        .unwrap_or_default()
}

/// Put `title` into the title field
///
/// Pastes first, then falls back to assigning the value with events and
/// finally to typing. Returns the value the field ends up with.
#[instrument(skip_all)]
pub async fn set_title<D: EditorDriver + ?Sized>(
    driver: &D,
    title: &str,
    timings: &Timings,
) -> Result<String> {
    let field = selectors::title_field();
    let text = input_text(title);
    info!("Setting title: {}", text);

    driver.scroll_into_view(Frame::Main, &field).await?;
    settle(timings.short_settle()).await;
    driver.click(Frame::Main, &field).await?;
    driver.clear(Frame::Main, &field).await?;
    settle(timings.short_settle()).await;
    driver.paste(text).await?;

    if !has_text(driver, &field).await {
        warn!("Pasted title did not register, assigning the value directly");
        driver.set_value(Frame::Main, &field, text).await?;
    }
    if !has_text(driver, &field).await {
        warn!("Title still empty, typing it");
        driver.type_text(Frame::Main, &field, text).await?;
    }

    let value = title_value(driver).await;
    info!("Title set to: {}", value.chars().take(20).collect::<String>());
    settle(timings.title_settle()).await;
    Ok(value)
}

async fn has_text<D: EditorDriver + ?Sized>(driver: &D, field: &Locator) -> bool {
    matches!(
        driver.query(Frame::Main, field).await,
        Ok(Some(state)) if state.has_value()
    )
}

/// Paste the whole draft into the raw HTML surface
///
/// The editor must already be confirmed in raw mode; pasting HTML into the
/// rendered surface would publish the markup as text.
#[instrument(skip_all, fields(bytes = html.len()))]
pub async fn inject_draft<D: EditorDriver + ?Sized>(
    driver: &D,
    mode: EditorMode,
    html: &str,
    timings: &Timings,
) -> Result<()> {
    if mode != EditorMode::Raw {
        return Err(TpubError::ModeSwitch(format!(
            "draft injection needs raw mode, editor is in {} mode",
            mode
        )));
    }

    let surface = selectors::raw_surface();
    if let Err(e) = driver.click(Frame::Main, &surface).await {
        warn!("Focus warning: {}", e);
    }
    settle(timings.short_settle()).await;

    info!("Injecting draft HTML");
    driver.paste(html).await?;
    settle(timings.paste_settle()).await;
    Ok(())
}
