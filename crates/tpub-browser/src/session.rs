//! One authenticated editor session

use tracing::{info, warn};

use crate::auth;
use crate::driver::EditorDriver;
use crate::error::{Result, TpubError};
use crate::mode::{ModeSwitchReport, ModeSwitcher};
use tpub_core::{settle, AuthState, Credential, EditorMode, Timings};

/// Browser driver plus the state the workflow tracks about it
///
/// Holds at most one browser; [`PublishSession::close`] releases it.
pub struct PublishSession<D: EditorDriver> {
    driver: D,
    credential: Credential,
    timings: Timings,
    auth: AuthState,
    modes: ModeSwitcher,
}

impl<D: EditorDriver> PublishSession<D> {
    pub fn new(driver: D, credential: Credential, timings: Timings) -> Self {
        Self {
            driver,
            credential,
            timings,
            auth: AuthState::Unauthenticated,
            modes: ModeSwitcher::new(),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    pub fn auth_state(&self) -> AuthState {
        self.auth
    }

    /// Mode last confirmed on the page
    pub fn mode(&self) -> EditorMode {
        self.modes.believed()
    }

    pub async fn authenticate(&mut self) -> Result<()> {
        self.auth = AuthState::Authenticating;
        match auth::login(&self.driver, &self.credential, &self.timings).await {
            Ok(()) => {
                self.auth = AuthState::Authenticated;
                Ok(())
            }
            Err(e) => {
                self.auth = AuthState::Unauthenticated;
                Err(e)
            }
        }
    }

    pub async fn open_editor(&mut self) -> Result<()> {
        if self.auth != AuthState::Authenticated {
            return Err(TpubError::Auth(format!(
                "editor requested while {}",
                self.auth
            )));
        }
        auth::open_editor(&self.driver, &self.credential, &self.timings).await?;
        self.modes.observe(&self.driver).await;
        Ok(())
    }

    pub async fn ensure_mode(&mut self, target: EditorMode) -> Result<ModeSwitchReport> {
        self.modes
            .switch_to(&self.driver, target, &self.timings)
            .await
    }

    /// Wait out the teardown delay and close the browser
    pub async fn close(self) {
        info!(
            "Closing browser in {:?}",
            self.timings.teardown_delay()
        );
        settle(self.timings.teardown_delay()).await;
        if let Err(e) = self.driver.close().await {
            warn!("Browser close failed: {}", e);
        }
    }
}
