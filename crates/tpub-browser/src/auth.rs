//! Login and editor bootstrap
//!
//! The login flow goes through Kakao and may stop for a second factor or a
//! captcha, so after the form is submitted the URL is polled for the return to
//! the blog platform for as long as `login_timeout` allows. An operator can
//! finish the flow by hand in that window.

use std::time::Instant;
use tracing::{info, instrument, warn};

use crate::driver::{answer_dialog, EditorDriver, Frame};
use crate::error::{Result, TpubError};
use crate::locator::{wait_for, Presence, Wait};
use crate::selectors;
use tpub_core::{settle, Credential, Timings};

/// Sign in with the given account
///
/// Missing login controls are not errors: a remembered session skips straight
/// to the blog. Only the final URL check decides the outcome.
#[instrument(skip_all, fields(alias = %credential.alias))]
pub async fn login<D: EditorDriver + ?Sized>(
    driver: &D,
    credential: &Credential,
    timings: &Timings,
) -> Result<()> {
    info!("Opening login page");
    driver.navigate(selectors::LOGIN_URL).await?;

    let kakao = selectors::kakao_login_button();
    let button_wait = Wait::new(timings.login_button_timeout(), timings.poll_interval());
    match wait_for(driver, Frame::Main, &kakao, Presence::Visible, button_wait).await {
        Ok(_) => {
            driver.click(Frame::Main, &kakao).await?;
            info!("Kakao login selected");
        }
        Err(_) => info!("Kakao login button not shown, assuming the step is already past"),
    }

    if let Err(e) = submit_login_form(driver, credential, timings).await {
        warn!("Login form not completed ({}), waiting for a manual login", e);
    }

    info!(
        "Waiting up to {:?} for the login to finish (complete any second factor in the browser)",
        timings.login_timeout()
    );
    let started = Instant::now();
    loop {
        let url = driver.current_url().await.unwrap_or_default();
        if selectors::is_logged_in_url(&url) {
            info!("Login confirmed at {}", url);
            break;
        }
        if started.elapsed() >= timings.login_timeout() {
            return Err(TpubError::Auth(format!(
                "login did not complete within {:?} (last URL: {})",
                timings.login_timeout(),
                url
            )));
        }
        settle(timings.poll_interval().max(std::time::Duration::from_millis(1))).await;
    }

    settle(timings.login_settle()).await;
    Ok(())
}

async fn submit_login_form<D: EditorDriver + ?Sized>(
    driver: &D,
    credential: &Credential,
    timings: &Timings,
) -> Result<()> {
    let id_field = selectors::login_id_field();
    let form_wait = Wait::new(timings.login_form_timeout(), timings.poll_interval());
    wait_for(driver, Frame::Main, &id_field, Presence::Visible, form_wait).await?;

    driver
        .type_text(Frame::Main, &id_field, &credential.login_id)
        .await?;
    driver.press_enter().await?;
    settle(timings.login_step_delay()).await;

    let password_field = selectors::password_field();
    wait_for(driver, Frame::Main, &password_field, Presence::Visible, form_wait).await?;
    driver
        .type_text(Frame::Main, &password_field, &credential.password)
        .await?;
    driver.press_enter().await?;
    info!("Login form submitted");
    Ok(())
}

/// Open the post editor of the credential's blog
///
/// A "restore the previous draft?" dialog is dismissed so every run starts
/// from an empty editor. The title field not appearing is fatal.
#[instrument(skip_all, fields(blog = %credential.blog_name))]
pub async fn open_editor<D: EditorDriver + ?Sized>(
    driver: &D,
    credential: &Credential,
    timings: &Timings,
) -> Result<()> {
    let url = credential.write_url();
    info!("Opening editor at {}", url);
    driver.navigate(&url).await?;

    let dialog_wait = Wait::new(timings.restore_dialog_timeout(), timings.poll_interval());
    if answer_dialog(driver, false, dialog_wait).await {
        info!("Declined to restore a saved draft");
    }

    let editor_wait = Wait::new(timings.editor_timeout(), timings.poll_interval());
    wait_for(
        driver,
        Frame::Main,
        &selectors::title_field(),
        Presence::Present,
        editor_wait,
    )
    .await
    .map_err(|_| {
        TpubError::Browser(format!(
            "editor did not load at {}: title field missing",
            url
        ))
    })?;

    info!("Editor ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::Locator;
    use crate::mock::{Effect, MockEditor, MockElement};

    fn credential() -> Credential {
        Credential {
            alias: "main".into(),
            login_id: "user@example.com".into(),
            password: "secret".into(),
            blog_name: "myblog".into(),
        }
    }

    #[tokio::test]
    async fn test_login_fills_form_and_waits_for_redirect() {
        let mock = MockEditor::new()
            .with_element(Frame::Main, selectors::kakao_login_button(), MockElement::visible())
            .with_element(Frame::Main, selectors::login_id_field(), MockElement::visible())
            .with_element(Frame::Main, selectors::password_field(), MockElement::visible())
            .on(
                "type [name='password']",
                Effect::SetUrl("https://www.tistory.com/".into()),
            );

        login(&mock, &credential(), &Timings::immediate()).await.unwrap();

        let actions = mock.actions();
        assert_eq!(actions[0], format!("navigate {}", selectors::LOGIN_URL));
        assert!(actions.contains(&"click .btn_login.link_kakao_id".to_string()));
        assert_eq!(
            mock.value_of(Frame::Main, &selectors::password_field()).as_deref(),
            Some("secret")
        );
    }

    #[tokio::test]
    async fn test_login_without_button_or_form_still_succeeds() {
        let mock = MockEditor::new().on(
            format!("navigate {}", selectors::LOGIN_URL),
            Effect::SetUrl("https://www.tistory.com/".into()),
        );

        login(&mock, &credential(), &Timings::immediate()).await.unwrap();
        assert!(!mock.did("click"));
    }

    #[tokio::test]
    async fn test_login_timeout_is_auth_error() {
        let mock = MockEditor::new();
        let err = login(&mock, &credential(), &Timings::immediate())
            .await
            .unwrap_err();
        assert!(matches!(err, TpubError::Auth(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_open_editor_dismisses_restore_dialog() {
        let url = credential().write_url();
        let mock = MockEditor::new()
            .on(format!("navigate {}", url), Effect::OpenDialog)
            .on(
                format!("navigate {}", url),
                Effect::Insert(Frame::Main, selectors::title_field(), MockElement::visible()),
            );

        open_editor(&mock, &credential(), &Timings::immediate())
            .await
            .unwrap();
        assert!(mock.actions().contains(&"dialog dismiss".to_string()));
    }

    #[tokio::test]
    async fn test_open_editor_without_title_field_fails() {
        let mock = MockEditor::new()
            .with_element(Frame::Main, Locator::id("other"), MockElement::visible());
        assert!(open_editor(&mock, &credential(), &Timings::immediate())
            .await
            .is_err());
    }
}
