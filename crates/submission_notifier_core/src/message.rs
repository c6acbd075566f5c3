//! Submission notification payloads.
//!
//! Two encodings are accepted. The legacy one is a flat `key=value` list
//! separated by `;` with no escaping, so a value containing `;` is cut short
//! at that character. The structured one is a JSON object with the same
//! camelCase keys and does not have that limitation.

use serde::Deserialize;
use serde_json::Value;

use crate::contract::ValidationError;

pub const SEGMENT_DELIMITER: char = ';';
pub const KEY_VALUE_SEPARATOR: char = '=';

pub const USERNAME_KEY: &str = "username";
pub const ASSIGNMENT_ID_KEY: &str = "assignmentId";
pub const ASSIGNMENT_NAME_KEY: &str = "assignmentName";
pub const SUBMISSION_ID_KEY: &str = "submissionId";
pub const SUBMISSION_URL_KEY: &str = "submissionUrl";
pub const SUBMISSION_NUMBER_KEY: &str = "submissionNo";

/// Returns the value of the first `key=value` segment whose key matches.
pub fn extract_field<'a>(message: &'a str, key: &str) -> Option<&'a str> {
    message.split(SEGMENT_DELIMITER).find_map(|segment| {
        segment
            .strip_prefix(key)
            .and_then(|rest| rest.strip_prefix(KEY_VALUE_SEPARATOR))
    })
}

/// A parsed notification. Only `username` and `submission_id` are guaranteed
/// to be non-blank; the other text fields are empty when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionMessage {
    pub username: String,
    pub assignment_id: Option<String>,
    pub assignment_name: String,
    pub submission_id: String,
    pub submission_url: String,
    pub submission_number: String,
}

impl SubmissionMessage {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if raw.trim_start().starts_with('{') {
            Self::parse_json(raw)
        } else {
            Self::parse_delimited(raw)
        }
    }

    pub fn parse_delimited(raw: &str) -> Result<Self, ValidationError> {
        let field = |key: &str| extract_field(raw, key).map(str::to_string);
        Self::from_fields(RawFields {
            username: field(USERNAME_KEY),
            assignment_id: field(ASSIGNMENT_ID_KEY),
            assignment_name: field(ASSIGNMENT_NAME_KEY),
            submission_id: field(SUBMISSION_ID_KEY),
            submission_url: field(SUBMISSION_URL_KEY),
            submission_number: field(SUBMISSION_NUMBER_KEY),
        })
    }

    pub fn parse_json(raw: &str) -> Result<Self, ValidationError> {
        let payload: JsonPayload = serde_json::from_str(raw)
            .map_err(|error| ValidationError::new(format!("Malformed JSON message: {error}")))?;

        Self::from_fields(RawFields {
            username: payload.username,
            assignment_id: payload.assignment_id.map(scalar_to_string).transpose()?,
            assignment_name: payload.assignment_name,
            submission_id: payload.submission_id.map(scalar_to_string).transpose()?,
            submission_url: payload.submission_url,
            submission_number: payload.submission_no.map(scalar_to_string).transpose()?,
        })
    }

    /// The URL to download, or `None` when it is missing or blank.
    pub fn download_url(&self) -> Option<&str> {
        Some(self.submission_url.trim()).filter(|url| !url.is_empty())
    }

    fn from_fields(fields: RawFields) -> Result<Self, ValidationError> {
        Ok(Self {
            username: required(fields.username, USERNAME_KEY)?,
            assignment_id: fields.assignment_id.filter(|value| !value.trim().is_empty()),
            assignment_name: fields.assignment_name.unwrap_or_default(),
            submission_id: required(fields.submission_id, SUBMISSION_ID_KEY)?,
            submission_url: fields.submission_url.unwrap_or_default(),
            submission_number: fields.submission_number.unwrap_or_default(),
        })
    }
}

struct RawFields {
    username: Option<String>,
    assignment_id: Option<String>,
    assignment_name: Option<String>,
    submission_id: Option<String>,
    submission_url: Option<String>,
    submission_number: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonPayload {
    username: Option<String>,
    assignment_id: Option<Value>,
    assignment_name: Option<String>,
    submission_id: Option<Value>,
    submission_url: Option<String>,
    submission_no: Option<Value>,
}

fn required(value: Option<String>, field: &str) -> Result<String, ValidationError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ValidationError::missing_field(field)),
    }
}

fn scalar_to_string(value: Value) -> Result<String, ValidationError> {
    match value {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(ValidationError::new(format!(
            "expected a string or number, got {other}"
        ))),
    }
}
