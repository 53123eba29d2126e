//! Configuration management for tpub
//!
//! Loaded from `.tpub/config.toml` in the working directory. Every field has a
//! default, so a missing file or a partial file are both valid. Credentials are
//! never stored here; see [`crate::credentials`].

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{Result, TpubError, Visibility};

/// Top-level publisher configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Browser launch options
    #[serde(default)]
    pub browser: BrowserOptions,

    /// Settle delays and wait timeouts
    #[serde(default)]
    pub timings: Timings,

    /// Publishing defaults
    #[serde(default)]
    pub publish: PublishDefaults,
}

/// Browser launch options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    /// Run without a visible window. Off by default so 2FA/captcha can be
    /// handled by hand.
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub user_agent: Option<String>,
    /// Attach to an already running Chrome on this debugging port instead of
    /// launching one
    pub debug_port: Option<u16>,
}

/// Publishing defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishDefaults {
    pub visibility: Visibility,
}

/// Every fixed delay and bounded wait used by the workflow, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Polling interval for bounded waits
    pub poll_interval_ms: u64,
    /// Short pause after scrolling/clicking
    pub short_settle_ms: u64,
    /// Wait for a clickable UI control
    pub ui_timeout_ms: u64,
    /// Wait for a secondary/fallback control
    pub ui_fallback_timeout_ms: u64,
    pub login_button_timeout_ms: u64,
    pub login_form_timeout_ms: u64,
    /// Pause between submitting the id and the password
    pub login_step_delay_ms: u64,
    /// Window for completing login, including manual 2FA/captcha
    pub login_timeout_ms: u64,
    /// Settle after login to absorb redirect chains
    pub login_settle_ms: u64,
    pub restore_dialog_timeout_ms: u64,
    pub editor_timeout_ms: u64,
    pub title_settle_ms: u64,
    /// Settle after pasting the draft into the raw surface
    pub paste_settle_ms: u64,
    /// Settle after a mode-switch attempt before verifying
    pub mode_verify_delay_ms: u64,
    pub attach_menu_delay_ms: u64,
    /// Upper bound on waiting for an image upload to land
    pub upload_settle_ms: u64,
    pub publish_button_timeout_ms: u64,
    pub publish_layer_delay_ms: u64,
    /// Pause after final submit and before teardown
    pub teardown_delay_ms: u64,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: false,
            window_width: 1920,
            window_height: 1080,
            user_agent: Some(default_user_agent()),
            debug_port: None,
        }
    }
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36"
        .to_string()
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
            short_settle_ms: 500,
            ui_timeout_ms: 5_000,
            ui_fallback_timeout_ms: 3_000,
            login_button_timeout_ms: 5_000,
            login_form_timeout_ms: 10_000,
            login_step_delay_ms: 1_000,
            login_timeout_ms: 120_000,
            login_settle_ms: 30_000,
            restore_dialog_timeout_ms: 6_000,
            editor_timeout_ms: 30_000,
            title_settle_ms: 2_000,
            paste_settle_ms: 3_000,
            mode_verify_delay_ms: 2_000,
            attach_menu_delay_ms: 1_000,
            upload_settle_ms: 6_000,
            publish_button_timeout_ms: 10_000,
            publish_layer_delay_ms: 1_500,
            teardown_delay_ms: 5_000,
        }
    }
}

impl Timings {
    /// No delays at all; bounded waits check exactly once
    pub fn immediate() -> Self {
        Self {
            poll_interval_ms: 0,
            short_settle_ms: 0,
            ui_timeout_ms: 0,
            ui_fallback_timeout_ms: 0,
            login_button_timeout_ms: 0,
            login_form_timeout_ms: 0,
            login_step_delay_ms: 0,
            login_timeout_ms: 0,
            login_settle_ms: 0,
            restore_dialog_timeout_ms: 0,
            editor_timeout_ms: 0,
            title_settle_ms: 0,
            paste_settle_ms: 0,
            mode_verify_delay_ms: 0,
            attach_menu_delay_ms: 0,
            upload_settle_ms: 0,
            publish_button_timeout_ms: 0,
            publish_layer_delay_ms: 0,
            teardown_delay_ms: 0,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn short_settle(&self) -> Duration {
        Duration::from_millis(self.short_settle_ms)
    }

    pub fn ui_timeout(&self) -> Duration {
        Duration::from_millis(self.ui_timeout_ms)
    }

    pub fn ui_fallback_timeout(&self) -> Duration {
        Duration::from_millis(self.ui_fallback_timeout_ms)
    }

    pub fn login_button_timeout(&self) -> Duration {
        Duration::from_millis(self.login_button_timeout_ms)
    }

    pub fn login_form_timeout(&self) -> Duration {
        Duration::from_millis(self.login_form_timeout_ms)
    }

    pub fn login_step_delay(&self) -> Duration {
        Duration::from_millis(self.login_step_delay_ms)
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_millis(self.login_timeout_ms)
    }

    pub fn login_settle(&self) -> Duration {
        Duration::from_millis(self.login_settle_ms)
    }

    pub fn restore_dialog_timeout(&self) -> Duration {
        Duration::from_millis(self.restore_dialog_timeout_ms)
    }

    pub fn editor_timeout(&self) -> Duration {
        Duration::from_millis(self.editor_timeout_ms)
    }

    pub fn title_settle(&self) -> Duration {
        Duration::from_millis(self.title_settle_ms)
    }

    pub fn paste_settle(&self) -> Duration {
        Duration::from_millis(self.paste_settle_ms)
    }

    pub fn mode_verify_delay(&self) -> Duration {
        Duration::from_millis(self.mode_verify_delay_ms)
    }

    pub fn attach_menu_delay(&self) -> Duration {
        Duration::from_millis(self.attach_menu_delay_ms)
    }

    pub fn upload_settle(&self) -> Duration {
        Duration::from_millis(self.upload_settle_ms)
    }

    pub fn publish_button_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_button_timeout_ms)
    }

    pub fn publish_layer_delay(&self) -> Duration {
        Duration::from_millis(self.publish_layer_delay_ms)
    }

    pub fn teardown_delay(&self) -> Duration {
        Duration::from_millis(self.teardown_delay_ms)
    }
}

/// Sleep for a settle delay; zero durations return without yielding to the timer
pub async fn settle(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

impl PublisherConfig {
    /// Load configuration from `.tpub/config.toml` or use defaults
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = root.join(".tpub/config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| TpubError::Configuration(format!("Failed to parse config file: {}", e)))
    }

    /// Write default configuration to `.tpub/config.toml`
    pub fn write_default(root: &Path) -> Result<std::path::PathBuf> {
        let config_dir = root.join(".tpub");
        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(&Self::default()).map_err(|e| {
            TpubError::Configuration(format!("Failed to serialize config: {}", e))
        })?;
        std::fs::write(&config_path, content)?;
        Ok(config_path)
    }
}
