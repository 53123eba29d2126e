//! Image replacement
//!
//! The pasted draft references local image files that the editor cannot load.
//! Each one is uploaded through the editor's attach menu at the position of its
//! placeholder `<img>`, and the placeholder is removed afterwards.

use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::driver::{EditorDriver, Frame};
use crate::error::{Result, TpubError};
use crate::frames::{count_in_all_frames, find_in_any_frame};
use crate::locator::{wait_for, Locator, Presence, Wait};
use crate::selectors;
use tpub_core::{settle, ImageOutcome, ImageRef, Timings};

/// Per-image outcomes of one replacement pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImageReport {
    pub outcomes: Vec<ImageOutcome>,
}

impl ImageReport {
    pub fn uploaded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.uploaded).count()
    }

    /// Images that were not uploaded, for whatever reason
    pub fn unresolved(&self) -> Vec<&ImageOutcome> {
        self.outcomes.iter().filter(|o| !o.uploaded).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(ImageOutcome::resolved)
    }
}

/// Upload every local image, one failure boundary per image
#[instrument(skip_all, fields(images = images.len()))]
pub async fn replace_images<D: EditorDriver + ?Sized>(
    driver: &D,
    images: &[ImageRef],
    timings: &Timings,
) -> ImageReport {
    let mut report = ImageReport::default();
    info!("Replacing {} local images", images.len());

    for image in images {
        let mut outcome = ImageOutcome::new(&image.filename);
        info!("Processing: {}", image.filename);

        if !image.exists() {
            warn!("Image file not found: {}", image.path.display());
            outcome.error = Some(format!("file not found: {}", image.path.display()));
            report.outcomes.push(outcome);
            continue;
        }

        if let Err(e) = replace_one(driver, image, timings, &mut outcome).await {
            warn!("Image {} failed (continuing): {}", image.filename, e);
            outcome.error = Some(e.to_string());
        }
        report.outcomes.push(outcome);
    }

    info!(
        "Image replacement done: {}/{} uploaded",
        report.uploaded(),
        report.outcomes.len()
    );
    report
}

async fn replace_one<D: EditorDriver + ?Sized>(
    driver: &D,
    image: &ImageRef,
    timings: &Timings,
    outcome: &mut ImageOutcome,
) -> Result<()> {
    let placeholder = selectors::image_placeholder(&image.filename);

    match find_in_any_frame(driver, &placeholder).await? {
        Some(found) => {
            info!("Placeholder found in {}", found.frame);
            outcome.placeholder_found = true;
            if let Frame::Child(_) = found.frame {
                // Selecting the node makes the upload land in its place.
                driver.scroll_into_view(found.frame, &placeholder).await?;
                settle(timings.short_settle()).await;
                driver.select_node(found.frame, &placeholder).await?;
                settle(timings.short_settle()).await;
            }
        }
        None => warn!("Placeholder not found, uploading at the cursor position"),
    }

    open_photo_dialog(driver, timings).await;

    let images_before = count_in_all_frames(driver, &selectors::any_image())
        .await
        .unwrap_or(0);

    let input = file_input(driver, timings).await?;
    driver
        .set_file_input(Frame::Main, &input, &image.path)
        .await
        .map_err(|e| TpubError::ImageUpload(format!("{}: {}", image.filename, e)))?;
    outcome.uploaded = true;

    wait_for_upload(driver, images_before, timings).await;

    if outcome.placeholder_found {
        outcome.placeholder_removed = remove_placeholder(driver, &placeholder).await;
    }
    Ok(())
}

/// The input to send the file to
///
/// The editor's own input is forced visible. A generic file input is only
/// accepted when it is already visible; a hidden one may belong to anything.
async fn file_input<D: EditorDriver + ?Sized>(driver: &D, timings: &Timings) -> Result<Locator> {
    let attach = selectors::attach_file_input();
    let ui_wait = Wait::new(timings.ui_timeout(), timings.poll_interval());
    if wait_for(driver, Frame::Main, &attach, Presence::Present, ui_wait)
        .await
        .is_ok()
    {
        driver.force_visible(Frame::Main, &attach).await?;
        return Ok(attach);
    }

    let generic = selectors::generic_file_input();
    let fallback_wait = Wait::new(timings.ui_fallback_timeout(), timings.poll_interval());
    match wait_for(driver, Frame::Main, &generic, Presence::Visible, fallback_wait).await {
        Ok(_) => {
            debug!("Using generic file input");
            Ok(generic)
        }
        Err(_) => Err(TpubError::ImageUpload(
            "no editor file input and no visible file input".to_string(),
        )),
    }
}

/// Attach menu, then its photo entry; either may already be open
async fn open_photo_dialog<D: EditorDriver + ?Sized>(driver: &D, timings: &Timings) {
    let ui_wait = Wait::new(timings.ui_timeout(), timings.poll_interval());

    let attach = selectors::attach_menu();
    match wait_for(driver, Frame::Main, &attach, Presence::Visible, ui_wait).await {
        Ok(_) => {
            if let Err(e) = driver.click(Frame::Main, &attach).await {
                warn!("Attach button click failed: {}", e);
            }
            settle(timings.attach_menu_delay()).await;
        }
        Err(e) => warn!("Attach button click failed: {}", e),
    }

    let photo = selectors::attach_photo_item();
    let photo_wait = Wait::new(timings.ui_fallback_timeout(), timings.poll_interval());
    match wait_for(driver, Frame::Main, &photo, Presence::Visible, photo_wait).await {
        Ok(_) => {
            if let Err(e) = driver.click(Frame::Main, &photo).await {
                warn!("Photo button click failed: {}", e);
            }
        }
        Err(e) => warn!("Photo button click failed: {}", e),
    }
    settle(timings.attach_menu_delay()).await;
}

/// Wait until a new image shows up in the editor or the settle time runs out
///
/// The editor gives no completion signal, so a missing new image is logged
/// and the run moves on.
async fn wait_for_upload<D: EditorDriver + ?Sized>(
    driver: &D,
    images_before: usize,
    timings: &Timings,
) -> bool {
    let started = Instant::now();
    loop {
        let images_now = count_in_all_frames(driver, &selectors::any_image())
            .await
            .unwrap_or(images_before);
        if images_now > images_before {
            debug!("Upload visible ({} -> {} images)", images_before, images_now);
            return true;
        }
        if started.elapsed() >= timings.upload_settle() {
            warn!(
                "No new image after {:?}, assuming the upload is still in flight",
                timings.upload_settle()
            );
            return false;
        }
        settle(timings.poll_interval().max(std::time::Duration::from_millis(1))).await;
    }
}

async fn remove_placeholder<D: EditorDriver + ?Sized>(
    driver: &D,
    placeholder: &Locator,
) -> bool {
    let found = match find_in_any_frame(driver, placeholder).await {
        Ok(Some(found)) => found,
        Ok(None) => {
            info!("Placeholder already gone");
            return false;
        }
        Err(e) => {
            warn!("Placeholder lookup failed: {}", e);
            return false;
        }
    };

    match driver.remove(found.frame, placeholder).await {
        Ok(removed) => {
            if removed {
                info!("Removed placeholder in {}", found.frame);
            }
            removed
        }
        Err(e) => {
            warn!("Placeholder removal failed: {}", e);
            false
        }
    }
}
