//! Fail-open boundaries for recoverable publishing steps
//!
//! A post with a missing tag or one image short is better than no post, so
//! steps that are not essential to producing a publishable post run inside
//! one of these boundaries.
//!
//! DO NOT use fail-open for:
//! - Login (nothing after it can work)
//! - Editor mode switches (later stages depend on the mode)
//! - The final publish submission (resubmitting risks duplicate posts)

use std::future::Future;
use tracing::warn;

use crate::{Result, StageOutcome};

/// Run a recoverable step, logging and discarding its error
///
/// # Usage
///
/// ```no_run
/// use tpub_core::fail_open::fail_open;
/// use tpub_core::Result;
///
/// async fn add_tags() -> Result<()> {
///     Ok(())
/// }
///
/// async fn example() {
///     let result = fail_open("tags", add_tags()).await;
///     // None if add_tags() failed
/// }
/// ```
pub async fn fail_open<Fut, T>(operation_name: &str, fut: Fut) -> Option<T>
where
    Fut: Future<Output = Result<T>>,
{
    match fut.await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (continuing): {}", operation_name, e);
            None
        }
    }
}

/// Like [`fail_open`] but reports a [`StageOutcome`] for the run report
pub async fn fail_open_stage<Fut>(operation_name: &str, fut: Fut) -> StageOutcome
where
    Fut: Future<Output = Result<StageOutcome>>,
{
    match fut.await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("{} failed (continuing): {}", operation_name, e);
            StageOutcome::Degraded {
                reason: e.to_string(),
            }
        }
    }
}
