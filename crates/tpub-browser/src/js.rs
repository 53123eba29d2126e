//! Script builders for DOM primitives
//!
//! Each script resolves the target document (the page or one of its iframes),
//! looks the element up with the locator's strategy and runs a short body
//! against it. String arguments are embedded as JSON literals.

use crate::driver::{DialogPolicy, Frame};
use crate::locator::Locator;

/// XPathResult.FIRST_ORDERED_NODE_TYPE; the constant is not reachable from
/// an iframe document's scope.
const FIRST_ORDERED_NODE: u8 = 9;
const ORDERED_SNAPSHOT: u8 = 7;

fn literal(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

fn select_document(frame: Frame, missing: &str) -> String {
    match frame {
        Frame::Main => "var doc = document;".to_string(),
        Frame::Child(index) => format!(
            "var frames = document.querySelectorAll('iframe'); \
             if (!frames[{index}]) return {missing}; \
             var doc; \
             try {{ doc = frames[{index}].contentDocument; }} catch (e) {{ return {missing}; }} \
             if (!doc) return {missing};",
        ),
    }
}

fn lookup(locator: &Locator) -> String {
    match locator {
        Locator::Id(id) => format!("doc.getElementById({})", literal(id)),
        Locator::Css(selector) => format!("doc.querySelector({})", literal(selector)),
        Locator::XPath(_) | Locator::Text { .. } => format!(
            "doc.evaluate({}, doc, null, {}, null).singleNodeValue",
            literal(&locator.to_xpath().unwrap_or_default()),
            FIRST_ORDERED_NODE
        ),
    }
}

/// Wrap `body` so it runs with `el` bound to the element, or returns `missing`
pub fn on_element(frame: Frame, locator: &Locator, body: &str, missing: &str) -> String {
    format!(
        "(function() {{ {} var el = {}; if (!el) return {}; {} }})()",
        select_document(frame, missing),
        lookup(locator),
        missing,
        body
    )
}

/// Expression evaluating to the element itself (or null)
pub fn element(frame: Frame, locator: &Locator) -> String {
    on_element(frame, locator, "return el;", "null")
}

/// JSON-encoded [`crate::driver::ElementState`], or null when absent
pub fn query(frame: Frame, locator: &Locator) -> String {
    on_element(
        frame,
        locator,
        "var rect = el.getBoundingClientRect(); \
         var style = (doc.defaultView || window).getComputedStyle(el); \
         var visible = el.getClientRects().length > 0 && rect.width > 0 && rect.height > 0 \
             && style.visibility !== 'hidden' && style.display !== 'none'; \
         var value = (typeof el.value === 'string') ? el.value : null; \
         return JSON.stringify({ visible: visible, value: value, \
             text: (el.textContent || '').trim().slice(0, 2000) });",
        "null",
    )
}

pub fn count(frame: Frame, locator: &Locator) -> String {
    let counter = match locator {
        Locator::XPath(_) | Locator::Text { .. } => format!(
            "return doc.evaluate({}, doc, null, {}, null).snapshotLength;",
            literal(&locator.to_xpath().unwrap_or_default()),
            ORDERED_SNAPSHOT
        ),
        _ => format!(
            "return doc.querySelectorAll({}).length;",
            literal(&locator.to_css().unwrap_or_default())
        ),
    };
    format!(
        "(function() {{ {} {} }})()",
        select_document(frame, "0"),
        counter
    )
}

pub fn frame_count() -> &'static str {
    "document.querySelectorAll('iframe').length"
}

pub fn click(frame: Frame, locator: &Locator) -> String {
    on_element(frame, locator, "el.click(); return true;", "false")
}

pub fn scroll_into_view(frame: Frame, locator: &Locator) -> String {
    on_element(
        frame,
        locator,
        "el.scrollIntoView({ block: 'center' }); return true;",
        "false",
    )
}

pub fn focus(frame: Frame, locator: &Locator) -> String {
    on_element(frame, locator, "el.focus(); return true;", "false")
}

pub fn clear(frame: Frame, locator: &Locator) -> String {
    on_element(
        frame,
        locator,
        "el.focus(); \
         if (typeof el.value === 'string') { \
             el.value = ''; \
             el.dispatchEvent(new Event('input', { bubbles: true })); \
         } else { el.textContent = ''; } \
         return true;",
        "false",
    )
}

pub fn set_value(frame: Frame, locator: &Locator, value: &str) -> String {
    on_element(
        frame,
        locator,
        &format!(
            "el.focus(); el.value = {}; \
             ['input', 'change', 'blur'].forEach(function(type) {{ \
                 el.dispatchEvent(new Event(type, {{ bubbles: true }})); \
             }}); \
             el.focus(); return true;",
            literal(value)
        ),
        "false",
    )
}

pub fn force_visible(frame: Frame, locator: &Locator) -> String {
    on_element(
        frame,
        locator,
        "el.style.display = 'block'; el.style.visibility = 'visible'; \
         el.style.opacity = '1'; return true;",
        "false",
    )
}

pub fn select_node(frame: Frame, locator: &Locator) -> String {
    on_element(
        frame,
        locator,
        "var range = doc.createRange(); range.selectNode(el); \
         var selection = (doc.defaultView || window).getSelection(); \
         selection.removeAllRanges(); selection.addRange(range); return true;",
        "false",
    )
}

pub fn remove(frame: Frame, locator: &Locator) -> String {
    on_element(
        frame,
        locator,
        "el.parentNode.removeChild(el); return true;",
        "false",
    )
}

/// Replace `confirm`/`alert` in the page and its reachable frames
pub fn dialog_shim(policy: DialogPolicy) -> String {
    let answer = match policy {
        DialogPolicy::Accept => "true",
        DialogPolicy::Dismiss => "false",
    };
    format!(
        "(function() {{ \
             var install = function(w) {{ \
                 w.confirm = function() {{ return {answer}; }}; \
                 w.alert = function() {{}}; \
             }}; \
             install(window); \
             Array.prototype.forEach.call(document.querySelectorAll('iframe'), function(f) {{ \
                 try {{ install(f.contentWindow); }} catch (e) {{}} \
             }}); \
             return true; \
         }})()"
    )
}
