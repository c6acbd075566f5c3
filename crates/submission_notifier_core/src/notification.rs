//! Result emails sent to the submitter.
//!
//! Both templates share a subject and signature; only the success template
//! carries the stored object key.

use askama::Template;
use serde::Serialize;

use crate::message::SubmissionMessage;

pub const SUBJECT_PREFIX: &str = "Assignment Submission Status - ";
const SIGNATURE_TEXT: &str = "Best regards,\nThe Assignment Team";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailTemplate {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub template: EmailTemplate,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

// HTML bodies are rendered by askama, which escapes every interpolated value.
#[derive(Template)]
#[template(path = "email/success.html")]
struct SuccessHtml<'a> {
    username: &'a str,
    assignment: &'a str,
    attempt: &'a str,
    submission_url: &'a str,
    object_key: &'a str,
}

#[derive(Template)]
#[template(path = "email/failure.html")]
struct FailureHtml<'a> {
    username: &'a str,
    assignment: &'a str,
    attempt: &'a str,
    submission_url: &'a str,
}

pub fn subject_for(assignment_name: &str) -> String {
    format!("{SUBJECT_PREFIX}{assignment_name}")
}

/// Form-encodes the submission URL the way it is shown in both templates.
pub fn encode_submission_url(url: &str) -> String {
    form_urlencoded::byte_serialize(url.as_bytes()).collect()
}

pub fn build_success_email(
    message: &SubmissionMessage,
    object_key: &str,
) -> Result<EmailMessage, askama::Error> {
    let encoded_url = encode_submission_url(&message.submission_url);

    let text_body = format!(
        "Dear {username},\n\n\
         Your assignment {assignment} with attempt number {attempt} has been successfully submitted.\n\n\
         Submission URL: {encoded_url}\n\
         File Path: {object_key}\n\n\
         Thank you for your submission!\n\n\
         {SIGNATURE_TEXT}",
        username = message.username,
        assignment = message.assignment_name,
        attempt = message.submission_number,
    );

    let html_body = SuccessHtml {
        username: &message.username,
        assignment: &message.assignment_name,
        attempt: &message.submission_number,
        submission_url: &encoded_url,
        object_key,
    }
    .render()?;

    Ok(EmailMessage {
        template: EmailTemplate::Success,
        subject: subject_for(&message.assignment_name),
        text_body,
        html_body,
    })
}

pub fn build_failure_email(message: &SubmissionMessage) -> Result<EmailMessage, askama::Error> {
    let encoded_url = encode_submission_url(&message.submission_url);

    let text_body = format!(
        "Dear {username},\n\n\
         Unfortunately, your assignment {assignment} with attempt number {attempt} has not been submitted successfully.\n\n\
         Please check the submission and try again.\n\n\
         Submission URL: {encoded_url}\n\
         If you continue to experience issues, please contact our support team.\n\n\
         {SIGNATURE_TEXT}",
        username = message.username,
        assignment = message.assignment_name,
        attempt = message.submission_number,
    );

    let html_body = FailureHtml {
        username: &message.username,
        assignment: &message.assignment_name,
        attempt: &message.submission_number,
        submission_url: &encoded_url,
    }
    .render()?;

    Ok(EmailMessage {
        template: EmailTemplate::Failure,
        subject: subject_for(&message.assignment_name),
        text_body,
        html_body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message() -> SubmissionMessage {
        SubmissionMessage {
            username: "alice@example.com".to_string(),
            assignment_id: Some("1".to_string()),
            assignment_name: "hw1".to_string(),
            submission_id: "s123".to_string(),
            submission_url: "https://good.example/file.zip".to_string(),
            submission_number: "1".to_string(),
        }
    }

    #[test]
    fn encodes_submission_url_as_form_value() {
        assert_eq!(
            encode_submission_url("https://good.example/file.zip?a=b c"),
            "https%3A%2F%2Fgood.example%2Ffile.zip%3Fa%3Db+c"
        );
    }

    #[test]
    fn success_email_includes_object_key() {
        let email = build_success_email(&sample_message(), "alice@example.com/hw1/1/s123.zip")
            .expect("success email should render");

        assert_eq!(email.template, EmailTemplate::Success);
        assert_eq!(email.subject, "Assignment Submission Status - hw1");
        assert!(email.text_body.starts_with("Dear alice@example.com,\n\n"));
        assert!(email
            .text_body
            .contains("Your assignment hw1 with attempt number 1 has been successfully submitted."));
        assert!(email
            .text_body
            .contains("File Path: alice@example.com/hw1/1/s123.zip\n"));
        assert!(email
            .text_body
            .contains("Submission URL: https%3A%2F%2Fgood.example%2Ffile.zip\n"));
        assert!(email.text_body.ends_with("Best regards,\nThe Assignment Team"));
        assert!(email
            .html_body
            .contains("<p>File Path: alice@example.com/hw1/1/s123.zip</p>"));
    }

    #[test]
    fn failure_email_suggests_retry_without_object_key() {
        let email = build_failure_email(&sample_message()).expect("failure email should render");

        assert_eq!(email.template, EmailTemplate::Failure);
        assert_eq!(email.subject, "Assignment Submission Status - hw1");
        assert!(email.text_body.contains("has not been submitted successfully."));
        assert!(email
            .text_body
            .contains("Please check the submission and try again."));
        assert!(!email.text_body.contains("File Path"));
        assert!(!email.html_body.contains("File Path"));
        assert!(email.html_body.contains(
            "<a href='https%3A%2F%2Fgood.example%2Ffile.zip'>https%3A%2F%2Fgood.example%2Ffile.zip</a>"
        ));
    }

    #[test]
    fn html_body_escapes_submitted_values() {
        let mut message = sample_message();
        message.assignment_name = "<b>hw1</b>".to_string();

        let email = build_failure_email(&message).expect("failure email should render");
        assert!(email.html_body.contains("&lt;b&gt;hw1&lt;/b&gt;"));
        assert!(!email.html_body.contains("<b>hw1</b>"));
        assert!(email.text_body.contains("<b>hw1</b>"));
    }

    #[test]
    fn html_body_escapes_ampersands_and_keeps_markup() {
        let mut message = sample_message();
        message.username = "Tom & Jerry".to_string();

        let email = build_success_email(&message, "k.zip").expect("success email should render");
        assert!(email.html_body.starts_with("<h2>Dear Tom &amp; Jerry,</h2>"));
        assert!(email
            .html_body
            .ends_with("<p>Best regards,<br/>The Assignment Team</p>"));
    }
}
