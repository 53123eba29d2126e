//! Browser lifecycle management using Chrome DevTools Protocol

use async_trait::async_trait;
use headless_chrome::protocol::cdp::{Input, Page, DOM};
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::driver::{DialogPolicy, EditorDriver, ElementState, Frame};
use crate::error::{Result, TpubError};
use crate::js;
use crate::locator::Locator;
use tpub_core::BrowserOptions;

/// Configuration for browser launch
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode (default: false, the editor is watched while it runs)
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// User agent string
    pub user_agent: Option<String>,
    /// How long an idle browser is kept before the connection drops
    pub idle_timeout_seconds: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self::from(&BrowserOptions::default())
    }
}

impl From<&BrowserOptions> for BrowserConfig {
    fn from(options: &BrowserOptions) -> Self {
        Self {
            headless: options.headless,
            window_width: options.window_width,
            window_height: options.window_height,
            user_agent: options.user_agent.clone(),
            idle_timeout_seconds: 600,
        }
    }
}

fn cdp_error(context: &str, e: impl std::fmt::Display) -> TpubError {
    TpubError::Browser(format!("{}: {}", context, e))
}

/// Active browser session with Chrome DevTools Protocol
pub struct BrowserSession {
    /// Dropping the browser closes the DevTools connection the tab talks through
    _browser: Browser,
    /// Current active tab
    tab: Arc<Tab>,
}

impl BrowserSession {
    /// Launch or attach according to the configured options
    pub async fn open(options: &BrowserOptions) -> Result<Self> {
        match options.debug_port {
            Some(port) => Self::connect(port).await,
            None => Self::launch_with_config(BrowserConfig::from(options)).await,
        }
    }

    /// Launch browser with custom configuration
    pub async fn launch_with_config(config: BrowserConfig) -> Result<Self> {
        info!(
            "Launching browser (headless: {}, size: {}x{})",
            config.headless, config.window_width, config.window_height
        );

        let mut launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false)
            .window_size(Some((config.window_width, config.window_height)))
            .idle_browser_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .build()
            .map_err(|e| cdp_error("Failed to launch browser", e))?;

        // Add user agent if specified
        let user_agent_arg: Option<String> = config
            .user_agent
            .as_ref()
            .map(|ua| format!("--user-agent={}", ua));
        if let Some(ref ua_arg) = user_agent_arg {
            launch_options.args.push(OsStr::new(ua_arg));
        }
        launch_options
            .args
            .push(OsStr::new("--disable-blink-features=AutomationControlled"));

        let browser =
            Browser::new(launch_options).map_err(|e| cdp_error("Failed to launch browser", e))?;

        let tab = browser
            .new_tab()
            .map_err(|e| cdp_error("Failed to create tab", e))?;

        info!("Browser launched successfully");

        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    /// Connect to an existing browser instance
    ///
    /// The browser must have been started with `--remote-debugging-port`.
    pub async fn connect(port: u16) -> Result<Self> {
        info!("Connecting to existing browser on port {}", port);

        let version: serde_json::Value =
            reqwest::get(format!("http://127.0.0.1:{}/json/version", port))
                .await
                .map_err(|e| cdp_error("DevTools endpoint unreachable", e))?
                .json()
                .await
                .map_err(|e| cdp_error("Invalid DevTools version response", e))?;
        let ws_url = version
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| TpubError::Browser("No webSocketDebuggerUrl advertised".to_string()))?
            .to_string();

        let browser =
            Browser::connect(ws_url).map_err(|e| cdp_error("Failed to connect to browser", e))?;

        let tab = browser
            .new_tab()
            .map_err(|e| cdp_error("Failed to create tab", e))?;

        info!("Connected to browser successfully");

        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    /// Execute JavaScript in the page context
    fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| cdp_error("JavaScript evaluation failed", e))?;

        Ok(result.value.unwrap_or(serde_json::Value::Null))
    }

    /// Run an element script whose body returns `true` and whose miss returns `false`
    fn element_script(&self, script: String, locator: &Locator) -> Result<()> {
        match self.evaluate(&script)? {
            serde_json::Value::Bool(true) => Ok(()),
            _ => Err(TpubError::ElementNotFound {
                locator: locator.to_string(),
            }),
        }
    }

    /// Native element handle, only available for the main document
    fn find(&self, locator: &Locator) -> Result<Element<'_>> {
        let found = match locator.to_css() {
            Some(css) => self.tab.find_element(&css),
            None => self
                .tab
                .find_element_by_xpath(&locator.to_xpath().unwrap_or_default()),
        };
        found.map_err(|_| TpubError::ElementNotFound {
            locator: locator.to_string(),
        })
    }
}

#[async_trait]
impl EditorDriver for BrowserSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);

        self.tab
            .navigate_to(url)
            .map_err(|e| cdp_error(&format!("Failed to navigate to {}", url), e))?;

        // Wait for navigation to complete
        self.tab
            .wait_until_navigated()
            .map_err(|e| cdp_error(&format!("Navigation timeout for {}", url), e))?;

        info!("Successfully navigated to {}", url);
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.tab.get_url())
    }

    async fn query(&self, frame: Frame, locator: &Locator) -> Result<Option<ElementState>> {
        match self.evaluate(&js::query(frame, locator))? {
            serde_json::Value::String(json) => Ok(Some(serde_json::from_str(&json)?)),
            _ => Ok(None),
        }
    }

    async fn count(&self, frame: Frame, locator: &Locator) -> Result<usize> {
        Ok(self
            .evaluate(&js::count(frame, locator))?
            .as_u64()
            .unwrap_or(0) as usize)
    }

    async fn frame_count(&self) -> Result<usize> {
        Ok(self.evaluate(js::frame_count())?.as_u64().unwrap_or(0) as usize)
    }

    async fn click(&self, frame: Frame, locator: &Locator) -> Result<()> {
        match frame {
            Frame::Main => {
                self.find(locator)?
                    .click()
                    .map_err(|e| cdp_error(&format!("Click on {} failed", locator), e))?;
                Ok(())
            }
            // Input events cannot be routed into a child document by handle.
            Frame::Child(_) => self.element_script(js::click(frame, locator), locator),
        }
    }

    async fn script_click(&self, frame: Frame, locator: &Locator) -> Result<()> {
        self.element_script(js::click(frame, locator), locator)
    }

    async fn scroll_into_view(&self, frame: Frame, locator: &Locator) -> Result<()> {
        self.element_script(js::scroll_into_view(frame, locator), locator)
    }

    async fn type_text(&self, frame: Frame, locator: &Locator, text: &str) -> Result<()> {
        match frame {
            Frame::Main => {
                self.find(locator)?
                    .type_into(text)
                    .map_err(|e| cdp_error(&format!("Typing into {} failed", locator), e))?;
            }
            Frame::Child(_) => {
                self.element_script(js::focus(frame, locator), locator)?;
                self.tab
                    .type_str(text)
                    .map_err(|e| cdp_error("Typing failed", e))?;
            }
        }
        Ok(())
    }

    async fn press_enter(&self) -> Result<()> {
        self.tab
            .press_key("Enter")
            .map_err(|e| cdp_error("Enter key failed", e))?;
        Ok(())
    }

    async fn clear(&self, frame: Frame, locator: &Locator) -> Result<()> {
        self.element_script(js::clear(frame, locator), locator)
    }

    async fn set_value(&self, frame: Frame, locator: &Locator, value: &str) -> Result<()> {
        self.element_script(js::set_value(frame, locator, value), locator)
    }

    async fn paste(&self, text: &str) -> Result<()> {
        // Keep a copy on the clipboard so the text can be pasted by hand
        // if the editor swallows the insert.
        match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text)) {
            Ok(()) => debug!("Copied {} chars to clipboard", text.chars().count()),
            Err(e) => debug!("Clipboard unavailable: {}", e),
        }

        self.tab
            .call_method(Input::InsertText {
                text: text.to_string(),
            })
            .map_err(|e| cdp_error("Text insert failed", e))?;
        Ok(())
    }

    async fn force_visible(&self, frame: Frame, locator: &Locator) -> Result<()> {
        self.element_script(js::force_visible(frame, locator), locator)
    }

    async fn select_node(&self, frame: Frame, locator: &Locator) -> Result<()> {
        self.element_script(js::select_node(frame, locator), locator)
    }

    async fn remove(&self, frame: Frame, locator: &Locator) -> Result<bool> {
        Ok(self.evaluate(&js::remove(frame, locator))? == serde_json::Value::Bool(true))
    }

    async fn set_file_input(&self, frame: Frame, locator: &Locator, path: &Path) -> Result<()> {
        let handle = self
            .tab
            .evaluate(&js::element(frame, locator), false)
            .map_err(|e| cdp_error("File input lookup failed", e))?;
        let object_id = handle.object_id.ok_or_else(|| TpubError::ElementNotFound {
            locator: locator.to_string(),
        })?;

        self.tab
            .call_method(DOM::SetFileInputFiles {
                files: vec![path.to_string_lossy().into_owned()],
                node_id: None,
                backend_node_id: None,
                object_id: Some(object_id),
            })
            .map_err(|e| cdp_error(&format!("Attaching {} failed", path.display()), e))?;

        info!("Attached {} to {}", path.display(), locator);
        Ok(())
    }

    async fn run_script(&self, script: &str) -> Result<serde_json::Value> {
        debug!("Evaluating JavaScript: {}", script);
        self.evaluate(script)
    }

    async fn set_dialog_policy(&self, policy: DialogPolicy) -> Result<()> {
        self.evaluate(&js::dialog_shim(policy))?;
        Ok(())
    }

    async fn handle_dialog(&self, accept: bool) -> Result<bool> {
        // CDP rejects the call when no dialog is open.
        Ok(self
            .tab
            .call_method(Page::HandleJavaScriptDialog {
                accept,
                prompt_text: None,
            })
            .is_ok())
    }

    async fn page_source(&self) -> Result<String> {
        self.tab
            .get_content()
            .map_err(|e| cdp_error("Reading page source failed", e))
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| cdp_error("Screenshot failed", e))
    }

    /// Close the active tab; the browser process ends when the session drops
    async fn close(&self) -> Result<()> {
        info!("Closing browser session");
        self.tab
            .close(true)
            .map_err(|e| cdp_error("Closing tab failed", e))?;
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        debug!("BrowserSession dropped, browser will be cleaned up");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BrowserConfig::default();
        assert!(!config.headless);
        assert_eq!(config.window_width, 1920);
        assert_eq!(config.window_height, 1080);
        assert!(config.user_agent.is_some());
    }

    #[test]
    fn test_config_from_options() {
        let options = BrowserOptions {
            headless: true,
            window_width: 1024,
            window_height: 768,
            user_agent: None,
            debug_port: None,
        };
        let config = BrowserConfig::from(&options);

        assert!(config.headless);
        assert_eq!(config.window_width, 1024);
        assert!(config.user_agent.is_none());
        assert_eq!(config.idle_timeout_seconds, 600);
    }
}
