//! Tistory editor page map
//!
//! Every selector the workflow uses lives here. Lookups with more than one
//! entry are strategy chains for [`crate::locator::resolve`], primary first.

use crate::locator::{css_string, xpath_literal, Locator};

pub const LOGIN_URL: &str = "https://www.tistory.com/auth/login";

/// Whether the browser has come back from the login flow to the blog platform
///
/// The host must be `tistory.com` or one of its subdomains, and the path
/// must be outside the `/auth` login pages.
pub fn is_logged_in_url(url: &str) -> bool {
    let Ok(parsed) = reqwest::Url::parse(url) else {
        return false;
    };
    let on_tistory = parsed
        .host_str()
        .is_some_and(|host| host == "tistory.com" || host.ends_with(".tistory.com"));
    on_tistory && !parsed.path().starts_with("/auth")
}

// Login

pub fn kakao_login_button() -> Locator {
    Locator::css(".btn_login.link_kakao_id")
}

pub fn login_id_field() -> Locator {
    Locator::css("[name='loginId']")
}

pub fn password_field() -> Locator {
    Locator::css("[name='password']")
}

// Editor

pub fn title_field() -> Locator {
    Locator::id("post-title-inp")
}

/// Raw HTML surface; only rendered while the editor is in HTML mode
pub fn raw_surface() -> Locator {
    Locator::css(".CodeMirror")
}

/// Buttons that open the mode menu
pub fn mode_menu() -> Vec<Locator> {
    vec![
        Locator::id("editor-mode-layer-btn-open"),
        Locator::xpath("//button[.//i[contains(@class, 'mce-txt') and text()='HTML']]"),
    ]
}

/// Menu entries that select raw HTML mode
pub fn html_mode_item() -> Vec<Locator> {
    vec![
        Locator::id("editor-mode-html"),
        Locator::text("button", "HTML"),
    ]
}

/// Menu entries that select the rendered (basic) mode
pub fn rendered_mode_item() -> Vec<Locator> {
    vec![
        Locator::id("editor-mode-kakao-tistory"),
        Locator::text("button", "기본모드"),
    ]
}

pub const TO_HTML_SCRIPT: &str = "tistory.editor.ChangeMode.toHtml()";
pub const TO_RENDERED_SCRIPT: &str = "tistory.editor.ChangeMode.toWysiwyg()";

/// Same call, swallowing a missing editor API
pub fn forced_script(call: &str) -> String {
    format!(
        "(function() {{ try {{ {}; return true; }} catch (e) {{ return false; }} }})()",
        call
    )
}

// Image upload

pub fn attach_menu() -> Locator {
    Locator::id("mceu_0-open")
}

/// Photo entry of the attach menu; shares its id with the file input
pub fn attach_photo_item() -> Locator {
    Locator::css("div#attach-image")
}

/// The editor's own file input; hidden until forced visible
pub fn attach_file_input() -> Locator {
    Locator::css("input#attach-image")
}

/// Fallback when the editor's input is gone; only ever used while visible
pub fn generic_file_input() -> Locator {
    Locator::css("input[type='file']")
}

/// Placeholder `<img>` the draft carries for a local image
pub fn image_placeholder(filename: &str) -> Locator {
    Locator::css(format!("img[src*={}]", css_string(filename)))
}

pub fn any_image() -> Locator {
    Locator::css("img")
}

// Metadata

pub fn tag_field() -> Locator {
    Locator::id("tagText")
}

pub fn category_button() -> Locator {
    Locator::id("category-btn")
}

pub fn category_item(category: &str) -> Locator {
    Locator::xpath(format!(
        "//div[@id='category-list']//div[contains(@class, 'mce-menu-item') and contains(., {})]",
        xpath_literal(category)
    ))
}

// Publish

pub fn publish_layer_button() -> Locator {
    Locator::id("publish-layer-btn")
}

pub fn private_option() -> Vec<Locator> {
    vec![
        Locator::id("public-visibility-private"),
        Locator::text("label", "비공개"),
    ]
}

pub fn public_option() -> Vec<Locator> {
    vec![
        Locator::id("open20"),
        Locator::xpath("//label[normalize-space(.)='공개']"),
    ]
}

pub fn publish_button() -> Locator {
    Locator::id("publish-btn")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logged_in_url() {
        assert!(is_logged_in_url("https://www.tistory.com/"));
        assert!(is_logged_in_url("https://myblog.tistory.com/manage"));
        assert!(!is_logged_in_url("https://www.tistory.com/auth/login"));
        assert!(!is_logged_in_url(
            "https://accounts.kakao.com/login?continue=https%3A%2F%2Fwww.tistory.com"
        ));
        assert!(!is_logged_in_url("about:blank"));
    }

    #[test]
    fn test_tistory_in_query_or_lookalike_host_is_not_logged_in() {
        assert!(!is_logged_in_url(
            "https://logins.kakao.com/x?continue=https://www.tistory.com/"
        ));
        assert!(!is_logged_in_url("https://evil.com/?u=tistory.com"));
        assert!(!is_logged_in_url("https://tistory.com.evil.com/manage"));
        assert!(!is_logged_in_url("https://nottistory.com/"));
        assert!(is_logged_in_url("https://tistory.com/"));
    }

    #[test]
    fn test_placeholder_selector() {
        assert_eq!(
            image_placeholder("chart.png").to_string(),
            "img[src*=\"chart.png\"]"
        );
    }

    #[test]
    fn test_category_item_quotes_name() {
        let locator = category_item("Tom's notes");
        assert_eq!(
            locator.to_xpath().unwrap(),
            "//div[@id='category-list']//div[contains(@class, 'mce-menu-item') and contains(., \"Tom's notes\")]"
        );
    }

    #[test]
    fn test_file_input_never_targets_the_menu_div() {
        assert!(!attach_file_input().to_string().starts_with("div"));
        assert!(!generic_file_input().to_string().starts_with("div"));
    }
}
