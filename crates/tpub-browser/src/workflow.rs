//! End-to-end publishing workflow
//!
//! Stages run in a fixed order:
//!
//! 1. login
//! 2. open the editor
//! 3. title
//! 4. raw HTML mode, paste the draft, back to rendered mode
//! 5. image replacement
//! 6. tags, category
//! 7. publish
//!
//! Login, editor, mode switches, injection and publish end the run on
//! failure. Title, images, tags and category degrade instead. The browser is
//! closed on every path.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::diagnostics::{capture_failure, Diagnostics};
use crate::driver::{answer_dialog, EditorDriver};
use crate::error::TpubError;
use crate::images::{replace_images, ImageReport};
use crate::injector::{inject_draft, set_title};
use crate::locator::Wait;
use crate::metadata::{apply_tags, select_category};
use crate::publish::{publish, PublishReceipt};
use crate::session::PublishSession;
use tpub_core::fail_open::fail_open_stage;
use tpub_core::{
    settle, AuthState, Credential, Draft, EditorMode, PublishRequest, PublisherConfig,
    StageOutcome, Visibility,
};

/// One stage and how it ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    pub stage: String,
    #[serde(flatten)]
    pub outcome: StageOutcome,
}

/// Everything a run did
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub alias: String,
    pub auth: AuthState,
    /// Editor mode last confirmed on the page
    pub mode: EditorMode,
    pub stages: Vec<StageRecord>,
    pub images: ImageReport,
    pub publish: Option<PublishReceipt>,
    /// Error that stopped the run
    pub fatal: Option<String>,
    pub diagnostics: Option<Diagnostics>,
}

impl RunReport {
    fn new(alias: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            alias: alias.to_string(),
            auth: AuthState::Unauthenticated,
            mode: EditorMode::Unknown,
            stages: Vec::new(),
            images: ImageReport::default(),
            publish: None,
            fatal: None,
            diagnostics: None,
        }
    }

    pub fn published(&self) -> bool {
        self.publish.is_some()
    }

    pub fn outcome(&self, stage: &str) -> Option<&StageOutcome> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.outcome)
    }

    fn record(&mut self, stage: &str, outcome: StageOutcome) {
        info!("Stage {}: {:?}", stage, outcome);
        self.stages.push(StageRecord {
            stage: stage.to_string(),
            outcome,
        });
    }
}

/// A fatal stage failure
struct Abort {
    stage: &'static str,
    error: TpubError,
}

fn abort(stage: &'static str) -> impl FnOnce(TpubError) -> Abort {
    move |error| Abort { stage, error }
}

/// Publishes one draft through one browser session
pub struct Publisher<D: EditorDriver> {
    session: PublishSession<D>,
    visibility: Visibility,
}

impl<D: EditorDriver> Publisher<D> {
    pub fn new(driver: D, credential: Credential, config: &PublisherConfig) -> Self {
        Self {
            session: PublishSession::new(driver, credential, config.timings.clone()),
            visibility: config.publish.visibility,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Run every stage and close the browser
    pub async fn run(mut self, draft: &Draft) -> RunReport {
        let mut report = RunReport::new(&self.session.credential().alias);
        info!(
            "Run {} publishing '{}' from {}",
            report.run_id,
            draft.title,
            draft.folder.display()
        );

        if let Err(Abort { stage, error }) = self.execute(draft, &mut report).await {
            error!("Stage {} failed: {}", stage, error);
            report.record(
                stage,
                StageOutcome::Failed {
                    reason: error.to_string(),
                },
            );
            report.fatal = Some(format!("{}: {}", stage, error));
            report.diagnostics =
                Some(capture_failure(self.session.driver(), &draft.folder, stage).await);
        }

        report.auth = self.session.auth_state();
        report.mode = self.session.mode();
        self.session.close().await;

        if report.published() {
            info!("Run {} finished: post published", report.run_id);
        } else {
            error!("Run {} finished without publishing", report.run_id);
        }
        report
    }

    async fn execute(&mut self, draft: &Draft, report: &mut RunReport) -> Result<(), Abort> {
        self.session.authenticate().await.map_err(abort("login"))?;
        report.record("login", StageOutcome::Completed);

        self.session.open_editor().await.map_err(abort("editor"))?;
        report.record("editor", StageOutcome::Completed);

        let timings = self.session.timings().clone();
        let driver = self.session.driver();

        let title = fail_open_stage("title", async {
            set_title(driver, &draft.title, &timings).await?;
            Ok::<_, TpubError>(StageOutcome::Completed)
        })
        .await;
        report.record("title", title);

        self.session
            .ensure_mode(EditorMode::Raw)
            .await
            .map_err(abort("raw_mode"))?;
        report.record("raw_mode", StageOutcome::Completed);

        inject_draft(
            self.session.driver(),
            self.session.mode(),
            &draft.html,
            &timings,
        )
        .await
        .map_err(abort("inject"))?;
        report.record("inject", StageOutcome::Completed);

        self.session
            .ensure_mode(EditorMode::Rendered)
            .await
            .map_err(abort("rendered_mode"))?;
        report.record("rendered_mode", StageOutcome::Completed);

        let driver = self.session.driver();
        let images = draft.local_images();
        report.images = replace_images(driver, &images, &timings).await;
        report.record("images", image_outcome(&report.images));

        settle(timings.title_settle()).await;
        answer_dialog(driver, true, Wait::once()).await;

        let tags = draft.tag_string();
        let tag_outcome = fail_open_stage("tags", apply_tags(driver, &tags, &timings)).await;
        report.record("tags", tag_outcome);

        let category = fail_open_stage(
            "category",
            select_category(driver, draft.category.as_deref(), &timings),
        )
        .await;
        report.record("category", category);

        let request = PublishRequest {
            title: draft.title.clone(),
            tags,
            category: draft.category.clone(),
            visibility: self.visibility,
        };
        let receipt = publish(driver, &request, &timings)
            .await
            .map_err(abort("publish"))?;
        report.publish = Some(receipt);
        report.record("publish", StageOutcome::Completed);
        Ok(())
    }
}

fn image_outcome(images: &ImageReport) -> StageOutcome {
    if images.outcomes.is_empty() {
        return StageOutcome::Skipped {
            reason: "no local images".to_string(),
        };
    }
    if images.is_complete() {
        return StageOutcome::Completed;
    }
    let unresolved: Vec<&str> = images
        .outcomes
        .iter()
        .filter(|o| !o.resolved())
        .map(|o| o.filename.as_str())
        .collect();
    StageOutcome::Degraded {
        reason: format!("unresolved images: {}", unresolved.join(", ")),
    }
}
