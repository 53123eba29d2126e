//! Element locator strategies
//!
//! The editor is a third-party UI that changes without notice, so most lookups
//! carry an ordered list of strategies. [`resolve`] walks that list and reports
//! which one matched, which makes selector drift visible in the logs.

use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::driver::{EditorDriver, ElementState, Frame};
use crate::error::{Result, TpubError};

/// One way of finding an element
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// Element id, without the `#`
    Id(String),
    Css(String),
    XPath(String),
    /// First `tag` element whose text content contains `text`
    Text { tag: String, text: String },
}

impl Locator {
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    pub fn text(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Text {
            tag: tag.into(),
            text: text.into(),
        }
    }

    /// Short name of the strategy kind, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Id(_) => "id",
            Self::Css(_) => "css",
            Self::XPath(_) => "xpath",
            Self::Text { .. } => "text",
        }
    }

    /// XPath equivalent for strategies that need one
    pub fn to_xpath(&self) -> Option<String> {
        match self {
            Self::XPath(expr) => Some(expr.clone()),
            Self::Text { tag, text } => {
                Some(format!("//{}[contains(., {})]", tag, xpath_literal(text)))
            }
            _ => None,
        }
    }

    /// CSS equivalent for strategies that have one
    pub fn to_css(&self) -> Option<String> {
        match self {
            Self::Id(id) => Some(format!("[id={}]", css_string(id))),
            Self::Css(selector) => Some(selector.clone()),
            _ => None,
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{}", id),
            Self::Css(selector) => write!(f, "{}", selector),
            Self::XPath(expr) => write!(f, "xpath:{}", expr),
            Self::Text { tag, text } => write!(f, "text:{}~{:?}", tag, text),
        }
    }
}

/// Quote a string for use inside an XPath expression
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        format!("'{}'", text)
    } else if !text.contains('"') {
        format!("\"{}\"", text)
    } else {
        let parts: Vec<String> = text.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// Quote a string as a CSS attribute value
pub fn css_string(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

/// How much of an element has to be there before a lookup counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// In the DOM
    Present,
    /// In the DOM and rendered
    Visible,
}

impl Presence {
    fn satisfied_by(self, state: &ElementState) -> bool {
        match self {
            Presence::Present => true,
            Presence::Visible => state.visible,
        }
    }
}

/// A successful lookup
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub locator: Locator,
    /// Index of the matching strategy in the list that was tried
    pub strategy: usize,
    pub state: ElementState,
}

/// Bounded wait settings for a lookup
#[derive(Debug, Clone, Copy)]
pub struct Wait {
    pub timeout: Duration,
    pub poll: Duration,
}

impl Wait {
    pub fn new(timeout: Duration, poll: Duration) -> Self {
        Self { timeout, poll }
    }

    /// Check exactly once
    pub fn once() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }
}

/// Try each strategy in order until one matches or the wait runs out
///
/// Every strategy is checked at least once, even with a zero timeout.
pub async fn resolve<D: EditorDriver + ?Sized>(
    driver: &D,
    frame: Frame,
    strategies: &[Locator],
    presence: Presence,
    wait: Wait,
) -> Result<Resolved> {
    let started = Instant::now();
    // A zero poll with a real timeout would spin.
    let poll = if wait.poll.is_zero() && !wait.timeout.is_zero() {
        Duration::from_millis(50)
    } else {
        wait.poll
    };

    loop {
        for (index, locator) in strategies.iter().enumerate() {
            match driver.query(frame, locator).await {
                Ok(Some(state)) if presence.satisfied_by(&state) => {
                    if index > 0 {
                        info!(
                            "Resolved {} via fallback strategy #{} ({})",
                            locator,
                            index,
                            locator.kind()
                        );
                    } else {
                        debug!("Resolved {} via primary strategy", locator);
                    }
                    return Ok(Resolved {
                        locator: locator.clone(),
                        strategy: index,
                        state,
                    });
                }
                Ok(_) => {}
                Err(e) => debug!("Lookup {} failed: {}", locator, e),
            }
        }

        if started.elapsed() >= wait.timeout {
            break;
        }
        tpub_core::settle(poll).await;
    }

    Err(TpubError::ElementNotFound {
        locator: strategies
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join(" | "),
    })
}

/// Single-strategy form of [`resolve`]
pub async fn wait_for<D: EditorDriver + ?Sized>(
    driver: &D,
    frame: Frame,
    locator: &Locator,
    presence: Presence,
    wait: Wait,
) -> Result<ElementState> {
    resolve(driver, frame, std::slice::from_ref(locator), presence, wait)
        .await
        .map(|resolved| resolved.state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockEditor, MockElement};

    #[test]
    fn test_display_forms() {
        assert_eq!(Locator::id("tagText").to_string(), "#tagText");
        assert_eq!(Locator::css("div#attach-image").to_string(), "div#attach-image");
        assert_eq!(
            Locator::text("button", "HTML").to_string(),
            "text:button~\"HTML\""
        );
    }

    #[test]
    fn test_text_locator_to_xpath() {
        assert_eq!(
            Locator::text("label", "비공개").to_xpath().unwrap(),
            "//label[contains(., '비공개')]"
        );
        assert!(Locator::id("x").to_xpath().is_none());
    }

    #[test]
    fn test_xpath_literal_quoting() {
        assert_eq!(xpath_literal("plain"), "'plain'");
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(
            xpath_literal(r#"a'b"c"#),
            r#"concat('a', "'", 'b"c')"#
        );
    }

    #[test]
    fn test_id_to_css_is_attribute_selector() {
        assert_eq!(
            Locator::id("attach-image").to_css().unwrap(),
            "[id=\"attach-image\"]"
        );
    }

    #[tokio::test]
    async fn test_resolve_reports_fallback_strategy() {
        let mock = MockEditor::new().with_element(
            Frame::Main,
            Locator::id("editor-mode-html"),
            MockElement::visible(),
        );
        let strategies = [
            Locator::text("button", "HTML"),
            Locator::id("editor-mode-html"),
        ];

        let resolved = resolve(&mock, Frame::Main, &strategies, Presence::Visible, Wait::once())
            .await
            .unwrap();
        assert_eq!(resolved.strategy, 1);
        assert_eq!(resolved.locator, Locator::id("editor-mode-html"));
    }

    #[tokio::test]
    async fn test_resolve_respects_visibility() {
        let mock = MockEditor::new().with_element(
            Frame::Main,
            Locator::css(".CodeMirror"),
            MockElement::hidden(),
        );
        let strategies = [Locator::css(".CodeMirror")];

        assert!(
            resolve(&mock, Frame::Main, &strategies, Presence::Present, Wait::once())
                .await
                .is_ok()
        );
        let err = resolve(&mock, Frame::Main, &strategies, Presence::Visible, Wait::once())
            .await
            .unwrap_err();
        assert!(matches!(err, TpubError::ElementNotFound { .. }));
    }

    #[tokio::test]
    async fn test_resolve_error_names_every_strategy() {
        let mock = MockEditor::new();
        let strategies = [Locator::id("a"), Locator::css(".b")];
        let err = resolve(&mock, Frame::Main, &strategies, Presence::Present, Wait::once())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Element not found: #a | .b");
    }
}
