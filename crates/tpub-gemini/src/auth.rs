//! API key lookup for the Gemini API

use std::env;
use tpub_core::{Result, TpubError};

pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";

/// Read the Gemini API key from the environment
///
/// `.env` is loaded by the binary before this is called.
pub fn get_api_key() -> Result<String> {
    match env::var(API_KEY_VAR) {
        Ok(key) if !key.trim().is_empty() => {
            tracing::debug!("Using {}", API_KEY_VAR);
            Ok(key.trim().to_string())
        }
        _ => Err(TpubError::Configuration(format!(
            "{} not found. Add it to .env or the environment.",
            API_KEY_VAR
        ))),
    }
}
