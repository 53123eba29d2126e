//! Browser-driven publishing for the Tistory web editor
//!
//! This crate drives the editor through the Chrome DevTools Protocol to turn a
//! loaded [`tpub_core::Draft`] into a published post.
//!
//! # Features
//!
//! - **Driver seam**: every DOM primitive goes through [`EditorDriver`], with a
//!   CDP implementation ([`BrowserSession`]) and a scripted one for tests
//!   ([`mock::MockEditor`])
//! - **Locator chains**: lookups try ordered strategies and report which one
//!   matched, so selector drift shows up in the logs
//! - **Mode switching**: raw HTML and rendered modes are entered through
//!   escalating strategies and always verified on the page
//! - **Image replacement**: local images are uploaded in place of their
//!   placeholders, across iframes
//!
//! # Example
//!
//! ```no_run
//! use tpub_browser::{BrowserSession, Publisher};
//! use tpub_core::{CredentialRegistry, Draft, PublisherConfig};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PublisherConfig::default();
//!     let registry = CredentialRegistry::from_env();
//!     let credential = registry.get("main")?.clone();
//!     let draft = Draft::load(Path::new("results/2024-03-09"))?;
//!
//!     let session = BrowserSession::open(&config.browser).await?;
//!     let report = Publisher::new(session, credential, &config).run(&draft).await;
//!
//!     println!("published: {}", report.published());
//!     Ok(())
//! }
//! ```
//!
//! # Requirements
//!
//! - Chrome or Chromium browser installed
//! - For connecting to existing browser: `chrome --remote-debugging-port=9222`

pub mod auth;
pub mod browser;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod frames;
pub mod images;
pub mod injector;
mod js;
pub mod locator;
pub mod metadata;
pub mod mock;
pub mod mode;
pub mod publish;
pub mod selectors;
pub mod session;
pub mod workflow;

// Re-export commonly used types
pub use browser::{BrowserConfig, BrowserSession};
pub use driver::{DialogPolicy, EditorDriver, ElementState, Frame};
pub use error::{BrowserError, Result};
pub use images::ImageReport;
pub use locator::{Locator, Presence, Resolved, Wait};
pub use mode::{ModeSwitchReport, ModeSwitcher, SwitchStrategy};
pub use publish::PublishReceipt;
pub use session::PublishSession;
pub use workflow::{Publisher, RunReport, StageRecord};
