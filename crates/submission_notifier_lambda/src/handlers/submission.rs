use chrono::Utc;
use lambda_runtime::tracing;
use serde::Serialize;
use submission_notifier_core::contract::{StatusRecord, SubmissionStatus};
use submission_notifier_core::message::{SubmissionMessage, SUBMISSION_URL_KEY};
use submission_notifier_core::notification::{
    build_failure_email, build_success_email, EmailTemplate,
};
use submission_notifier_core::storage_keys::submission_object_key;

use crate::adapters::artifact_fetch::{Artifact, ArtifactFetcher, FetchError};
use crate::adapters::email::Notifier;
use crate::adapters::object_store::ArtifactStore;
use crate::adapters::status_table::StatusRecorder;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum StepOutcome {
    Completed,
    Skipped,
    Failed(String),
}

impl StepOutcome {
    fn from_result<T>(result: Result<T, String>) -> Self {
        match result {
            Ok(_) => Self::Completed,
            Err(error) => Self::Failed(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageReport {
    pub submission_id: String,
    pub status: SubmissionStatus,
    pub template: EmailTemplate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_error: Option<String>,
    pub upload: StepOutcome,
    pub record: StepOutcome,
    pub notify: StepOutcome,
    pub processed_at: String,
}

impl MessageReport {
    pub fn has_failures(&self) -> bool {
        self.upload.is_failed() || self.record.is_failed() || self.notify.is_failed()
    }

    /// The artifact is stored but no status row says so. Nothing reconciles this.
    pub fn is_inconsistent(&self) -> bool {
        self.upload == StepOutcome::Completed && self.record.is_failed()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "disposition", rename_all = "snake_case")]
pub enum MessageDisposition {
    Processed(MessageReport),
    Rejected { reason: String },
}

impl MessageDisposition {
    pub fn report(&self) -> Option<&MessageReport> {
        match self {
            Self::Processed(report) => Some(report),
            Self::Rejected { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvocationReport {
    pub messages: Vec<MessageDisposition>,
}

impl InvocationReport {
    pub fn processed(&self) -> usize {
        self.messages
            .iter()
            .filter(|message| message.report().is_some())
            .count()
    }

    pub fn rejected(&self) -> usize {
        self.messages.len() - self.processed()
    }
}

/// The per-message workflow over its four external services.
pub struct SubmissionPipeline<'a> {
    pub sender_email: &'a str,
    pub fetcher: &'a dyn ArtifactFetcher,
    pub store: &'a dyn ArtifactStore,
    pub recorder: &'a dyn StatusRecorder,
    pub notifier: &'a dyn Notifier,
}

impl SubmissionPipeline<'_> {
    pub async fn handle_raw_message(&self, raw: &str) -> MessageDisposition {
        tracing::info!(payload = raw, "received submission notification");

        match SubmissionMessage::parse(raw) {
            Ok(message) => MessageDisposition::Processed(self.process(&message).await),
            Err(error) => {
                tracing::error!(error = %error, "rejected submission notification");
                MessageDisposition::Rejected {
                    reason: error.to_string(),
                }
            }
        }
    }

    /// Never fails: every downstream error is captured in the returned report.
    pub async fn process(&self, message: &SubmissionMessage) -> MessageReport {
        let object_key = submission_object_key(message);

        let (status, upload, fetch_error) = match self.download(message).await {
            Ok(artifact) => {
                tracing::info!(
                    submission_id = %message.submission_id,
                    url = %artifact.url,
                    content_length = ?artifact.content_length,
                    "artifact downloaded"
                );
                let upload = self.store.put_artifact(&object_key, artifact).await;
                match &upload {
                    Ok(receipt) => tracing::info!(
                        object_key = %receipt.key,
                        bytes_written = receipt.bytes_written,
                        parts = receipt.parts,
                        "artifact stored"
                    ),
                    Err(error) => tracing::error!(
                        object_key = %object_key,
                        error = %error,
                        "artifact upload failed"
                    ),
                }
                (
                    SubmissionStatus::Successful,
                    StepOutcome::from_result(upload),
                    None,
                )
            }
            Err(error) => {
                tracing::warn!(
                    submission_id = %message.submission_id,
                    url = %message.submission_url,
                    error = %error,
                    "artifact download failed"
                );
                (
                    SubmissionStatus::NotSuccessful,
                    StepOutcome::Skipped,
                    Some(error.to_string()),
                )
            }
        };

        let record = StatusRecord::for_submission(message, status);
        let recorded = self.recorder.put_status(&record).await;
        match &recorded {
            Ok(()) => tracing::info!(
                submission_id = %record.id,
                status = %record.email_status,
                "status record written"
            ),
            Err(error) => tracing::error!(
                submission_id = %record.id,
                error = %error,
                "status record write failed"
            ),
        }

        let (template, rendered) = match status {
            SubmissionStatus::Successful => (
                EmailTemplate::Success,
                build_success_email(message, &object_key),
            ),
            SubmissionStatus::NotSuccessful => {
                (EmailTemplate::Failure, build_failure_email(message))
            }
        };
        let sent = match rendered {
            Ok(email) => {
                self.notifier
                    .send(self.sender_email, &message.username, &email)
                    .await
            }
            Err(error) => Err(format!("failed to render email: {error}")),
        };
        match &sent {
            Ok(()) => tracing::info!(recipient = %message.username, "email sent"),
            Err(error) => tracing::error!(
                recipient = %message.username,
                error = %error,
                "email was not sent"
            ),
        }

        let report = MessageReport {
            submission_id: message.submission_id.clone(),
            status,
            template,
            object_key: (status == SubmissionStatus::Successful).then_some(object_key),
            fetch_error,
            upload,
            record: StepOutcome::from_result(recorded),
            notify: StepOutcome::from_result(sent),
            processed_at: Utc::now().to_rfc3339(),
        };

        if report.is_inconsistent() {
            tracing::warn!(
                submission_id = %report.submission_id,
                object_key = ?report.object_key,
                "artifact stored without a status record"
            );
        }
        report
    }

    async fn download(&self, message: &SubmissionMessage) -> Result<Artifact, FetchError> {
        match message.download_url() {
            Some(url) => self.fetcher.fetch(url).await,
            None => Err(FetchError::Transport(format!(
                "{SUBMISSION_URL_KEY} is missing"
            ))),
        }
    }
}
