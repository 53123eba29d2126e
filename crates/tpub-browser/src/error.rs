//! Browser automation error types - re-exports the unified TpubError from tpub-core
//!
//! Driver failures map onto these variants:
//! - Browser(String) - CDP, launch, navigation and script failures
//! - ElementNotFound { locator } - every strategy of a lookup came up empty
//! - ModeSwitch / Publish - fatal workflow stages
//!
//! Error messages should say which element or stage was involved.

pub use tpub_core::{Result, TpubError};

pub type BrowserError = TpubError;
