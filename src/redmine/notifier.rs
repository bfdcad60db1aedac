use std::fmt;
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::build::{BuildContext, BuildStatus};
use crate::config::Config;
use crate::error::Result;

use super::client::RedmineClient;
use super::notes::compose_notes;
use super::settings::NotifierSettings;
use super::types::IssuePatch;

/// Destination for the failure message produced when an update fails.
///
/// CI hosts usually surface these in the build log; the default writes
/// through the `log` facade.
pub trait FailureLog: Send + Sync {
    fn log_failure(&self, message: &str);
}

/// [`FailureLog`] backed by `log::error!`.
pub struct LogFailure;

impl FailureLog for LogFailure {
    fn log_failure(&self, message: &str) {
        error!("{message}");
    }
}

/// What a successful [`IssueNotifier::run`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// The plugin is switched off.
    Disabled,
    /// The commit message does not reference an issue.
    NoIssueReference,
    /// The issue was updated; `transitioned` tells whether its status changed.
    Updated { issue_id: String, transitioned: bool },
}

impl fmt::Display for NotifyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("Notifications disabled, nothing sent"),
            Self::NoIssueReference => f.write_str("No issue referenced in commit message"),
            Self::Updated {
                issue_id,
                transitioned: true,
            } => write!(f, "Updated issue #{issue_id} (status updated)"),
            Self::Updated { issue_id, .. } => write!(f, "Updated issue #{issue_id}"),
        }
    }
}

/// Validated settings plus the client built from them. Absent when the
/// plugin is disabled.
struct Tracker {
    settings: NotifierSettings,
    client: RedmineClient,
}

/// Posts build results to the Redmine issue referenced by a commit.
pub struct IssueNotifier {
    tracker: Option<Tracker>,
    failures: Arc<dyn FailureLog>,
}

impl IssueNotifier {
    /// Creates a notifier from configuration.
    ///
    /// A disabled plugin is never validated: it only ever reports
    /// [`NotifyOutcome::Disabled`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration of an enabled plugin does not
    /// validate or the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        let tracker = if config.plugin.enabled {
            let settings = NotifierSettings::from_config(config)?;
            let client = RedmineClient::new(&settings.server, settings.api_key.clone())?;
            Some(Tracker { settings, client })
        } else {
            debug!("Redmine notifications disabled, skipping configuration checks");
            None
        };

        Ok(Self {
            tracker,
            failures: Arc::new(LogFailure),
        })
    }

    /// Replaces the default failure log.
    pub fn with_failure_log(mut self, failures: Arc<dyn FailureLog>) -> Self {
        self.failures = failures;
        self
    }

    /// Issue id captured by group 1 of the configured pattern.
    pub fn extract_issue_id(&self, commit_message: &str) -> Option<String> {
        self.tracker
            .as_ref()?
            .settings
            .issue_pattern
            .captures(commit_message)?
            .get(1)
            .map(|id| id.as_str().to_string())
    }

    /// Updates the referenced issue for a finished build.
    ///
    /// Returns `true` on success and on intentional no-ops (plugin disabled,
    /// no issue reference). Returns `false` after logging a failure when the
    /// update did not go through.
    pub async fn notify(&self, build: &BuildContext) -> bool {
        match self.run(build).await {
            Ok(outcome) => {
                info!("{outcome}");
                true
            }
            Err(e) => {
                self.failures.log_failure(&e.to_string());
                false
            }
        }
    }

    /// Same as [`notify`](Self::notify) but reports what happened.
    ///
    /// # Errors
    ///
    /// Returns an error when the issue update fails. A failed status read
    /// is not an error: it only cancels the status transition.
    pub async fn run(&self, build: &BuildContext) -> Result<NotifyOutcome> {
        let Some(tracker) = &self.tracker else {
            debug!("Redmine notifications disabled");
            return Ok(NotifyOutcome::Disabled);
        };

        let Some(issue_id) = self.extract_issue_id(&build.commit_message) else {
            debug!("No issue reference in commit message, nothing to update");
            return Ok(NotifyOutcome::NoIssueReference);
        };

        let notes = compose_notes(
            build,
            &tracker.settings.ci_url,
            tracker.settings.url_build.as_deref(),
            &tracker.settings.messages,
        );
        let mut patch = IssuePatch::new(notes);

        let mut transitioned = false;
        if build.status == BuildStatus::Passed {
            if let Some(status_id) = tracker.settings.status {
                if tracker.transition_allowed(&issue_id).await {
                    patch.transition(status_id, tracker.settings.percent);
                    transitioned = true;
                }
            }
        }

        info!(
            "Updating Redmine issue #{issue_id} for build {} ({})",
            build.build_id, build.status
        );
        tracker.client.update_issue(&issue_id, &patch).await?;

        Ok(NotifyOutcome::Updated {
            issue_id,
            transitioned,
        })
    }
}

impl Tracker {
    /// Guard check: without `prev_status` every transition is allowed,
    /// otherwise the issue must currently have that status. Any failure to
    /// read the status counts as "not allowed".
    async fn transition_allowed(&self, issue_id: &str) -> bool {
        let Some(expected) = self.settings.prev_status else {
            return true;
        };

        match self.client.fetch_issue_status(issue_id).await {
            Ok(Some(current)) if current == expected => true,
            Ok(Some(current)) => {
                info!(
                    "Issue #{issue_id} has status {current}, expected {expected}; status left unchanged"
                );
                false
            }
            Ok(None) => {
                warn!("Issue #{issue_id} reply has no status; status left unchanged");
                false
            }
            Err(e) => {
                warn!("Could not read status of issue #{issue_id}: {e}; status left unchanged");
                false
            }
        }
    }
}
