//! Scripted in-memory editor for tests
//!
//! [`MockEditor`] keeps a table of elements per frame, keyed by the locator's
//! display form, and records every primitive it receives. Reactions attached
//! with [`MockEditor::on`] let a test model how the page responds to an action
//! (a menu opening after a click, the URL changing after login, ...).

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::driver::{DialogPolicy, EditorDriver, ElementState, Frame};
use crate::error::{Result, TpubError};
use crate::locator::Locator;

/// A fake element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockElement {
    pub visible: bool,
    pub value: Option<String>,
    pub text: String,
    /// How many elements the locator matches
    pub count: usize,
}

impl MockElement {
    pub fn visible() -> Self {
        Self {
            visible: true,
            value: None,
            text: String::new(),
            count: 1,
        }
    }

    pub fn hidden() -> Self {
        Self {
            visible: false,
            ..Self::visible()
        }
    }

    /// A form control holding `value`
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    fn state(&self) -> ElementState {
        ElementState {
            visible: self.visible,
            value: self.value.clone(),
            text: self.text.clone(),
        }
    }
}

/// A change to the fake page, applied when a reaction fires
#[derive(Debug, Clone)]
pub enum Effect {
    Show(Frame, Locator),
    Hide(Frame, Locator),
    Insert(Frame, Locator, MockElement),
    Remove(Frame, Locator),
    SetUrl(String),
    SetValue(Frame, Locator, String),
    SetCount(Frame, Locator, usize),
    /// Drop keyboard focus, so the next paste lands nowhere
    Blur,
    /// Raise a `confirm()` dialog
    OpenDialog,
}

#[derive(Debug, Default)]
struct MockState {
    url: String,
    elements: HashMap<(Frame, String), MockElement>,
    frames: usize,
    focused: Option<(Frame, String)>,
    actions: Vec<String>,
    reactions: HashMap<String, Vec<Effect>>,
    script_results: Vec<(String, serde_json::Value)>,
    failures: HashSet<String>,
    dialog_policy: Option<DialogPolicy>,
    pending_dialog: bool,
    uploads: Vec<PathBuf>,
    page_source: String,
    closed: bool,
}

/// Format an element target the way action keys spell it
pub fn target(frame: Frame, locator: &Locator) -> String {
    match frame {
        Frame::Main => locator.to_string(),
        Frame::Child(index) => format!("frame[{}] {}", index, locator),
    }
}

/// In-memory [`EditorDriver`]
///
/// Clones share one page, so a test can hand a clone to the workflow and
/// inspect the original afterwards.
#[derive(Debug, Clone, Default)]
pub struct MockEditor {
    state: Arc<Mutex<MockState>>,
}

impl MockEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(self, url: impl Into<String>) -> Self {
        self.lock().url = url.into();
        self
    }

    pub fn with_element(self, frame: Frame, locator: Locator, element: MockElement) -> Self {
        self.lock()
            .elements
            .insert((frame, locator.to_string()), element);
        self
    }

    /// Declare child frames that hold no scripted elements
    pub fn with_frames(self, frames: usize) -> Self {
        self.lock().frames = frames;
        self
    }

    pub fn with_page_source(self, source: impl Into<String>) -> Self {
        self.lock().page_source = source.into();
        self
    }

    /// Apply `effect` every time the action `key` succeeds
    ///
    /// Keys are `"<verb> <target>"`, e.g. `"click #publish-btn"` or
    /// `"press_enter"`. See [`target`] for child-frame targets.
    pub fn on(self, key: impl Into<String>, effect: Effect) -> Self {
        self.lock()
            .reactions
            .entry(key.into())
            .or_default()
            .push(effect);
        self
    }

    /// Return `result` from scripts containing `needle`
    pub fn script_result(self, needle: impl Into<String>, result: serde_json::Value) -> Self {
        self.lock().script_results.push((needle.into(), result));
        self
    }

    /// Make the action `key` fail with a browser error
    ///
    /// Script keys match by substring: `"script toHtml"` fails any script
    /// containing `toHtml`.
    pub fn fail_on(self, key: impl Into<String>) -> Self {
        self.lock().failures.insert(key.into());
        self
    }

    /// Everything the driver was asked to do, in order
    pub fn actions(&self) -> Vec<String> {
        self.lock().actions.clone()
    }

    /// Whether any recorded action starts with `prefix`
    pub fn did(&self, prefix: &str) -> bool {
        self.lock().actions.iter().any(|a| a.starts_with(prefix))
    }

    pub fn element(&self, frame: Frame, locator: &Locator) -> Option<MockElement> {
        self.lock()
            .elements
            .get(&(frame, locator.to_string()))
            .cloned()
    }

    pub fn value_of(&self, frame: Frame, locator: &Locator) -> Option<String> {
        self.element(frame, locator).and_then(|e| e.value)
    }

    pub fn url(&self) -> String {
        self.lock().url.clone()
    }

    pub fn uploads(&self) -> Vec<PathBuf> {
        self.lock().uploads.clone()
    }

    pub fn dialog_policy(&self) -> Option<DialogPolicy> {
        self.lock().dialog_policy
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record an action, fail it if scripted to, then fire its reactions
    fn act(&self, key: String) -> Result<()> {
        let mut state = self.lock();
        state.actions.push(key.clone());
        if state.failures.contains(&key) {
            return Err(TpubError::Browser(format!("mock failure: {}", key)));
        }
        let effects = state.reactions.get(&key).cloned().unwrap_or_default();
        for effect in effects {
            state.apply(effect);
        }
        Ok(())
    }

    /// Like [`Self::act`] but for primitives that need the element to exist
    fn act_on(&self, verb: &str, frame: Frame, locator: &Locator) -> Result<()> {
        if !self.lock().contains(frame, locator) {
            self.lock()
                .actions
                .push(format!("{} {} (missing)", verb, target(frame, locator)));
            return Err(TpubError::ElementNotFound {
                locator: target(frame, locator),
            });
        }
        self.act(format!("{} {}", verb, target(frame, locator)))
    }

    fn edit<F>(&self, frame: Frame, locator: &Locator, f: F)
    where
        F: FnOnce(&mut MockElement),
    {
        if let Some(element) = self.lock().elements.get_mut(&(frame, locator.to_string())) {
            f(element);
        }
    }

    fn focus(&self, frame: Frame, locator: &Locator) {
        self.lock().focused = Some((frame, locator.to_string()));
    }
}

impl MockState {
    fn contains(&self, frame: Frame, locator: &Locator) -> bool {
        self.elements
            .get(&(frame, locator.to_string()))
            .map(|e| e.count > 0)
            .unwrap_or(false)
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Show(frame, locator) => {
                if let Some(e) = self.elements.get_mut(&(frame, locator.to_string())) {
                    e.visible = true;
                }
            }
            Effect::Hide(frame, locator) => {
                if let Some(e) = self.elements.get_mut(&(frame, locator.to_string())) {
                    e.visible = false;
                }
            }
            Effect::Insert(frame, locator, element) => {
                self.elements.insert((frame, locator.to_string()), element);
            }
            Effect::Remove(frame, locator) => {
                self.elements.remove(&(frame, locator.to_string()));
            }
            Effect::SetUrl(url) => self.url = url,
            Effect::SetValue(frame, locator, value) => {
                if let Some(e) = self.elements.get_mut(&(frame, locator.to_string())) {
                    e.value = Some(value);
                }
            }
            Effect::SetCount(frame, locator, count) => {
                self.elements
                    .entry((frame, locator.to_string()))
                    .or_insert_with(MockElement::visible)
                    .count = count;
            }
            Effect::Blur => self.focused = None,
            Effect::OpenDialog => {
                // An installed shim answers page dialogs before they show.
                if self.dialog_policy.is_none() {
                    self.pending_dialog = true;
                }
            }
        }
    }
}

#[async_trait]
impl EditorDriver for MockEditor {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.lock().url = url.to_string();
        self.act(format!("navigate {}", url))
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.url())
    }

    async fn query(&self, frame: Frame, locator: &Locator) -> Result<Option<ElementState>> {
        Ok(self
            .lock()
            .elements
            .get(&(frame, locator.to_string()))
            .filter(|e| e.count > 0)
            .map(MockElement::state))
    }

    async fn count(&self, frame: Frame, locator: &Locator) -> Result<usize> {
        Ok(self
            .lock()
            .elements
            .get(&(frame, locator.to_string()))
            .map(|e| e.count)
            .unwrap_or(0))
    }

    async fn frame_count(&self) -> Result<usize> {
        let state = self.lock();
        let scripted = state
            .elements
            .keys()
            .filter_map(|(frame, _)| match frame {
                Frame::Child(index) => Some(index + 1),
                Frame::Main => None,
            })
            .max()
            .unwrap_or(0);
        Ok(scripted.max(state.frames))
    }

    async fn click(&self, frame: Frame, locator: &Locator) -> Result<()> {
        self.act_on("click", frame, locator)?;
        self.focus(frame, locator);
        Ok(())
    }

    async fn script_click(&self, frame: Frame, locator: &Locator) -> Result<()> {
        self.act_on("script_click", frame, locator)
    }

    async fn scroll_into_view(&self, frame: Frame, locator: &Locator) -> Result<()> {
        self.act_on("scroll", frame, locator)
    }

    async fn type_text(&self, frame: Frame, locator: &Locator, text: &str) -> Result<()> {
        self.act_on("type", frame, locator)?;
        self.focus(frame, locator);
        self.edit(frame, locator, |e| {
            e.value.get_or_insert_with(String::new).push_str(text);
        });
        Ok(())
    }

    async fn press_enter(&self) -> Result<()> {
        self.act("press_enter".to_string())
    }

    async fn clear(&self, frame: Frame, locator: &Locator) -> Result<()> {
        self.act_on("clear", frame, locator)?;
        self.focus(frame, locator);
        self.edit(frame, locator, |e| {
            if e.value.is_some() {
                e.value = Some(String::new());
            } else {
                e.text.clear();
            }
        });
        Ok(())
    }

    async fn set_value(&self, frame: Frame, locator: &Locator, value: &str) -> Result<()> {
        self.act_on("set_value", frame, locator)?;
        self.focus(frame, locator);
        self.edit(frame, locator, |e| e.value = Some(value.to_string()));
        Ok(())
    }

    async fn paste(&self, text: &str) -> Result<()> {
        self.act("paste".to_string())?;
        let mut state = self.lock();
        if let Some(key) = state.focused.clone() {
            if let Some(e) = state.elements.get_mut(&key) {
                e.value.get_or_insert_with(String::new).push_str(text);
            }
        }
        Ok(())
    }

    async fn force_visible(&self, frame: Frame, locator: &Locator) -> Result<()> {
        self.act_on("force_visible", frame, locator)?;
        self.edit(frame, locator, |e| e.visible = true);
        Ok(())
    }

    async fn select_node(&self, frame: Frame, locator: &Locator) -> Result<()> {
        self.act_on("select", frame, locator)
    }

    async fn remove(&self, frame: Frame, locator: &Locator) -> Result<bool> {
        if !self.lock().contains(frame, locator) {
            return Ok(false);
        }
        self.act(format!("remove {}", target(frame, locator)))?;
        self.lock().elements.remove(&(frame, locator.to_string()));
        Ok(true)
    }

    async fn set_file_input(&self, frame: Frame, locator: &Locator, path: &Path) -> Result<()> {
        self.act_on("upload", frame, locator)?;
        self.lock().uploads.push(path.to_path_buf());
        Ok(())
    }

    async fn run_script(&self, script: &str) -> Result<serde_json::Value> {
        let mut state = self.lock();
        state.actions.push(format!("script {}", script));
        let failed = state.failures.iter().any(|f| {
            f.strip_prefix("script ")
                .map(|needle| script.contains(needle))
                .unwrap_or(false)
        });
        if failed {
            return Err(TpubError::Browser("mock script failure".to_string()));
        }

        let effects: Vec<Effect> = state
            .reactions
            .iter()
            .filter_map(|(key, effects)| {
                key.strip_prefix("script ")
                    .filter(|needle| script.contains(needle))
                    .map(|_| effects.clone())
            })
            .flatten()
            .collect();
        for effect in effects {
            state.apply(effect);
        }

        Ok(state
            .script_results
            .iter()
            .find(|(needle, _)| script.contains(needle.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or(serde_json::Value::Null))
    }

    async fn set_dialog_policy(&self, policy: DialogPolicy) -> Result<()> {
        let name = match policy {
            DialogPolicy::Accept => "accept",
            DialogPolicy::Dismiss => "dismiss",
        };
        self.act(format!("dialog_policy {}", name))?;
        self.lock().dialog_policy = Some(policy);
        Ok(())
    }

    async fn handle_dialog(&self, accept: bool) -> Result<bool> {
        let mut state = self.lock();
        if !state.pending_dialog {
            return Ok(false);
        }
        state.pending_dialog = false;
        state
            .actions
            .push(format!("dialog {}", if accept { "accept" } else { "dismiss" }));
        Ok(true)
    }

    async fn page_source(&self) -> Result<String> {
        Ok(self.lock().page_source.clone())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.act("screenshot".to_string())?;
        Ok(b"\x89PNG\r\n\x1a\n".to_vec())
    }

    async fn close(&self) -> Result<()> {
        self.act("close".to_string())?;
        self.lock().closed = true;
        Ok(())
    }
}
