use serde::{Deserialize, Serialize};

use crate::message::SubmissionMessage;

pub const DEFAULT_STATUS_TABLE: &str = "assignment-email-table";
pub const DEFAULT_ARTIFACT_BUCKET: &str = "csye6225-demo2";
pub const DEFAULT_SENDER_EMAIL: &str = "demo6225@demo.csye6225hemangi.com";

/// Returned to the invoking platform for every invocation so it never redelivers.
pub const INVOCATION_RESPONSE: &str = "Hello, World!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    #[serde(rename = "SUCCESSFUL")]
    Successful,
    #[serde(rename = "NOT SUCCESSFUL")]
    NotSuccessful,
}

impl SubmissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Successful => "SUCCESSFUL",
            Self::NotSuccessful => "NOT SUCCESSFUL",
        }
    }

    pub fn from_download(downloaded: bool) -> Self {
        if downloaded {
            Self::Successful
        } else {
            Self::NotSuccessful
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row written to the status table, keyed by the submission id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusRecord {
    pub id: String,
    pub username: String,
    #[serde(rename = "assignmentName")]
    pub assignment_name: String,
    #[serde(rename = "emailStatus")]
    pub email_status: SubmissionStatus,
}

impl StatusRecord {
    pub fn for_submission(message: &SubmissionMessage, status: SubmissionStatus) -> Self {
        Self {
            id: message.submission_id.clone(),
            username: message.username.clone(),
            assignment_name: message.assignment_name.clone(),
            email_status: status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(format!("{field} is required"))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}
