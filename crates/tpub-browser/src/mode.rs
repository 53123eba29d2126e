//! Editor mode switching
//!
//! The editor has a rendered mode and a raw HTML mode. Switching is requested
//! through escalating strategies and every attempt is checked against what the
//! page actually shows; the switcher never assumes a click worked.

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::driver::{answer_dialog, DialogPolicy, EditorDriver, Frame};
use crate::error::{Result, TpubError};
use crate::locator::{resolve, Presence, Wait};
use crate::selectors;
use tpub_core::{settle, EditorMode, Timings};

/// How a switch was achieved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchStrategy {
    /// The editor was already in the requested mode
    AlreadyThere,
    /// Mode menu and the target's primary selector
    MenuClicks,
    /// A fallback selector of the menu or the target
    TextLookup,
    /// The editor's own mode-change API
    Script,
    /// The mode-change API, retried after every other route failed
    ForcedScript,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModeSwitchReport {
    pub from: EditorMode,
    pub to: EditorMode,
    pub strategy: SwitchStrategy,
}

/// Observe the current mode from the page
pub async fn detect<D: EditorDriver + ?Sized>(driver: &D) -> EditorMode {
    match driver.query(Frame::Main, &selectors::raw_surface()).await {
        Ok(Some(state)) if state.visible => return EditorMode::Raw,
        Ok(_) => {}
        Err(e) => debug!("Raw surface check failed: {}", e),
    }
    match driver.query(Frame::Main, &selectors::title_field()).await {
        Ok(Some(_)) => EditorMode::Rendered,
        _ => EditorMode::Unknown,
    }
}

/// Tracks the mode the workflow believes the editor is in
#[derive(Debug, Default)]
pub struct ModeSwitcher {
    believed: EditorMode,
}

impl ModeSwitcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last mode confirmed by observation
    pub fn believed(&self) -> EditorMode {
        self.believed
    }

    /// Re-read the mode from the page
    pub async fn observe<D: EditorDriver + ?Sized>(&mut self, driver: &D) -> EditorMode {
        self.believed = detect(driver).await;
        self.believed
    }

    /// Bring the editor into `target`
    ///
    /// Page dialogs are accepted for the rest of the session, since leaving
    /// raw mode asks to confirm that markup may change.
    #[instrument(skip(self, driver, timings))]
    pub async fn switch_to<D: EditorDriver + ?Sized>(
        &mut self,
        driver: &D,
        target: EditorMode,
        timings: &Timings,
    ) -> Result<ModeSwitchReport> {
        let from = self.observe(driver).await;
        if from == target {
            debug!("Editor already in {} mode", target);
            return Ok(self.report(from, target, SwitchStrategy::AlreadyThere));
        }
        info!("Switching editor from {} to {} mode", from, target);

        if let Err(e) = driver.set_dialog_policy(DialogPolicy::Accept).await {
            warn!("Could not install dialog handler: {}", e);
        }

        match self.click_through(driver, target, timings).await {
            Ok(strategy) => {
                if self.verify(driver, target, timings).await {
                    return Ok(self.report(from, target, strategy));
                }
                warn!("Mode menu clicked but editor is not in {} mode", target);
            }
            Err(e) => warn!("Mode menu unavailable: {}", e),
        }

        let call = Self::script_for(target)?;
        match driver.run_script(call).await {
            Ok(_) => {
                if self.verify(driver, target, timings).await {
                    return Ok(self.report(from, target, SwitchStrategy::Script));
                }
            }
            Err(e) => warn!("Mode script failed: {}", e),
        }

        warn!("Forcing {} mode through the editor API", target);
        if let Err(e) = driver.run_script(&selectors::forced_script(call)).await {
            debug!("Forced mode script failed: {}", e);
        }
        if self.verify(driver, target, timings).await {
            return Ok(self.report(from, target, SwitchStrategy::ForcedScript));
        }

        Err(TpubError::ModeSwitch(format!(
            "editor stayed in {} mode after every strategy (wanted {})",
            self.believed, target
        )))
    }

    /// Open the mode menu and pick the target entry
    async fn click_through<D: EditorDriver + ?Sized>(
        &self,
        driver: &D,
        target: EditorMode,
        timings: &Timings,
    ) -> Result<SwitchStrategy> {
        let items = match target {
            EditorMode::Raw => selectors::html_mode_item(),
            EditorMode::Rendered => selectors::rendered_mode_item(),
            EditorMode::Unknown => {
                return Err(TpubError::ModeSwitch("no target mode".to_string()))
            }
        };

        let menu = resolve(
            driver,
            Frame::Main,
            &selectors::mode_menu(),
            Presence::Visible,
            Wait::new(timings.ui_timeout(), timings.poll_interval()),
        )
        .await?;
        driver.click(Frame::Main, &menu.locator).await?;
        settle(timings.short_settle()).await;

        let item = resolve(
            driver,
            Frame::Main,
            &items,
            Presence::Visible,
            Wait::new(timings.ui_fallback_timeout(), timings.poll_interval()),
        )
        .await?;
        driver.click(Frame::Main, &item.locator).await?;

        answer_dialog(
            driver,
            true,
            Wait::new(timings.short_settle(), timings.poll_interval()),
        )
        .await;

        Ok(if menu.strategy == 0 && item.strategy == 0 {
            SwitchStrategy::MenuClicks
        } else {
            SwitchStrategy::TextLookup
        })
    }

    /// Wait, then check whether the page shows `target`
    async fn verify<D: EditorDriver + ?Sized>(
        &mut self,
        driver: &D,
        target: EditorMode,
        timings: &Timings,
    ) -> bool {
        settle(timings.mode_verify_delay()).await;
        answer_dialog(driver, true, Wait::once()).await;
        self.observe(driver).await == target
    }

    fn script_for(target: EditorMode) -> Result<&'static str> {
        match target {
            EditorMode::Raw => Ok(selectors::TO_HTML_SCRIPT),
            EditorMode::Rendered => Ok(selectors::TO_RENDERED_SCRIPT),
            EditorMode::Unknown => Err(TpubError::ModeSwitch("no target mode".to_string())),
        }
    }

    fn report(&self, from: EditorMode, to: EditorMode, strategy: SwitchStrategy) -> ModeSwitchReport {
        info!("Editor in {} mode ({:?})", to, strategy);
        ModeSwitchReport { from, to, strategy }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::Locator;
    use crate::mock::{Effect, MockEditor, MockElement};

    fn rendered_editor() -> MockEditor {
        MockEditor::new()
            .with_element(Frame::Main, selectors::title_field(), MockElement::visible())
            .with_element(Frame::Main, selectors::raw_surface(), MockElement::hidden())
    }

    #[tokio::test]
    async fn test_detect() {
        assert_eq!(detect(&MockEditor::new()).await, EditorMode::Unknown);
        assert_eq!(detect(&rendered_editor()).await, EditorMode::Rendered);

        let raw = rendered_editor().with_element(
            Frame::Main,
            selectors::raw_surface(),
            MockElement::visible(),
        );
        assert_eq!(detect(&raw).await, EditorMode::Raw);
    }

    #[tokio::test]
    async fn test_already_in_target_mode() {
        let mock = rendered_editor();
        let mut switcher = ModeSwitcher::new();
        let report = switcher
            .switch_to(&mock, EditorMode::Rendered, &Timings::immediate())
            .await
            .unwrap();
        assert_eq!(report.strategy, SwitchStrategy::AlreadyThere);
        assert!(mock.actions().is_empty());
    }

    #[tokio::test]
    async fn test_switch_through_menu() {
        let mock = rendered_editor()
            .with_element(
                Frame::Main,
                Locator::id("editor-mode-layer-btn-open"),
                MockElement::visible(),
            )
            .with_element(Frame::Main, Locator::id("editor-mode-html"), MockElement::hidden())
            .on(
                "click #editor-mode-layer-btn-open",
                Effect::Show(Frame::Main, Locator::id("editor-mode-html")),
            )
            .on(
                "click #editor-mode-html",
                Effect::Show(Frame::Main, selectors::raw_surface()),
            )
            .on("click #editor-mode-html", Effect::OpenDialog);

        let mut switcher = ModeSwitcher::new();
        let report = switcher
            .switch_to(&mock, EditorMode::Raw, &Timings::immediate())
            .await
            .unwrap();

        assert_eq!(report.from, EditorMode::Rendered);
        assert_eq!(report.strategy, SwitchStrategy::MenuClicks);
        assert_eq!(switcher.believed(), EditorMode::Raw);
        assert_eq!(mock.dialog_policy(), Some(DialogPolicy::Accept));
    }

    #[tokio::test]
    async fn test_text_fallback_is_reported() {
        let html_button = Locator::text("button", "HTML");
        let mock = rendered_editor()
            .with_element(
                Frame::Main,
                Locator::id("editor-mode-layer-btn-open"),
                MockElement::visible(),
            )
            .with_element(Frame::Main, html_button.clone(), MockElement::visible())
            .on(
                format!("click {}", html_button),
                Effect::Show(Frame::Main, selectors::raw_surface()),
            );

        let report = ModeSwitcher::new()
            .switch_to(&mock, EditorMode::Raw, &Timings::immediate())
            .await
            .unwrap();
        assert_eq!(report.strategy, SwitchStrategy::TextLookup);
    }

    #[tokio::test]
    async fn test_script_fallback_when_menu_missing() {
        let mock = rendered_editor().on(
            format!("script {}", selectors::TO_HTML_SCRIPT),
            Effect::Show(Frame::Main, selectors::raw_surface()),
        );

        let report = ModeSwitcher::new()
            .switch_to(&mock, EditorMode::Raw, &Timings::immediate())
            .await
            .unwrap();
        assert_eq!(report.strategy, SwitchStrategy::Script);
    }

    #[tokio::test]
    async fn test_clicks_that_do_not_switch_are_not_trusted() {
        // Menu clicks succeed but the raw surface never shows.
        let mock = rendered_editor()
            .with_element(
                Frame::Main,
                Locator::id("editor-mode-layer-btn-open"),
                MockElement::visible(),
            )
            .with_element(Frame::Main, Locator::id("editor-mode-html"), MockElement::visible());

        let mut switcher = ModeSwitcher::new();
        let err = switcher
            .switch_to(&mock, EditorMode::Raw, &Timings::immediate())
            .await
            .unwrap_err();

        assert!(matches!(err, TpubError::ModeSwitch(_)));
        assert_eq!(switcher.believed(), EditorMode::Rendered);
        // Both the plain and the forced script were tried.
        let scripts = mock
            .actions()
            .into_iter()
            .filter(|a| a.contains(selectors::TO_HTML_SCRIPT))
            .count();
        assert_eq!(scripts, 2);
    }

    #[tokio::test]
    async fn test_back_to_rendered_mode() {
        let mock = rendered_editor()
            .with_element(Frame::Main, selectors::raw_surface(), MockElement::visible())
            .on(
                format!("script {}", selectors::TO_RENDERED_SCRIPT),
                Effect::Hide(Frame::Main, selectors::raw_surface()),
            );

        let mut switcher = ModeSwitcher::new();
        let report = switcher
            .switch_to(&mock, EditorMode::Rendered, &Timings::immediate())
            .await
            .unwrap();
        assert_eq!(report.from, EditorMode::Raw);
        assert_eq!(switcher.believed(), EditorMode::Rendered);
    }

    #[tokio::test]
    async fn test_back_to_rendered_mode_through_text_item() {
        // Only the label-based menu button and the "기본모드" entry exist.
        let menu = selectors::mode_menu()[1].clone();
        let basic_mode = Locator::text("button", "기본모드");
        let mock = rendered_editor()
            .with_element(Frame::Main, selectors::raw_surface(), MockElement::visible())
            .with_element(Frame::Main, menu.clone(), MockElement::visible())
            .with_element(Frame::Main, basic_mode.clone(), MockElement::hidden())
            .on(
                format!("click {}", menu),
                Effect::Show(Frame::Main, basic_mode.clone()),
            )
            .on(
                format!("click {}", basic_mode),
                Effect::Hide(Frame::Main, selectors::raw_surface()),
            )
            .on(format!("click {}", basic_mode), Effect::OpenDialog);

        let mut switcher = ModeSwitcher::new();
        let report = switcher
            .switch_to(&mock, EditorMode::Rendered, &Timings::immediate())
            .await
            .unwrap();

        assert_eq!(report.from, EditorMode::Raw);
        assert_eq!(report.strategy, SwitchStrategy::TextLookup);
        assert_eq!(switcher.believed(), EditorMode::Rendered);
        assert_eq!(mock.dialog_policy(), Some(DialogPolicy::Accept));
        assert!(mock.did(&format!("click {}", basic_mode)));
        assert!(!mock.did("script"));
    }
}
