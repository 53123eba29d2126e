//! # tpub-gemini
//!
//! Gemini-backed repair of result folders before they are published.
//!
//! - [`repair_images`] flattens legacy `images/` references and regenerates
//!   missing images from their prompts
//! - [`add_hashtags`] asks for hashtags and writes the `hashtag-section` div
//!   the publisher later reads tags from
//!
//! Both take any [`Generator`]; [`GeminiClient`] is the real one.

pub mod auth;
mod circuit_breaker;
mod client;
pub mod hashtags;
pub mod images;
pub mod types;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use client::{decode_image, hashtag_prompt, GeminiClient, Generator, HASHTAG_CONTEXT_CHARS};
pub use hashtags::{add_hashtags, insert_hashtag_section};
pub use images::{repair_images, ImageRepair, RepairReport, RepairStatus};
pub use types::Model;
