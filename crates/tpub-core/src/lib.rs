//! # tpub-core
//!
//! Core types for the tpub blog publishing pipeline.
//!
//! tpub takes a result folder produced by the content pipeline (an HTML post,
//! generated images, hashtags and a category) and publishes it to a Tistory
//! blog by driving the platform's web editor.
//!
//! ## Core Paradigm
//!
//! - The draft is read fully into memory before any browser work starts
//! - Credentials are resolved once, up front, into an explicit registry
//! - Only login, mode switching and the final submit may abort a run;
//!   everything else fails open
//! - Every delay is configuration, never a literal in the workflow

pub mod config;
pub mod credentials;
pub mod draft;
mod error;
pub mod fail_open;
pub mod retry;
mod types;

pub use config::{settle, BrowserOptions, PublishDefaults, PublisherConfig, Timings};
pub use credentials::{Credential, CredentialRegistry};
pub use draft::Draft;
pub use error::{Result, TpubError};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use types::*;
