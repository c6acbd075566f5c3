use crate::message::SubmissionMessage;

pub const ARTIFACT_EXTENSION: &str = "zip";

pub fn artifact_object_key(
    username: &str,
    assignment_name: &str,
    submission_number: &str,
    submission_id: &str,
) -> String {
    format!("{username}/{assignment_name}/{submission_number}/{submission_id}.{ARTIFACT_EXTENSION}")
}

pub fn submission_object_key(message: &SubmissionMessage) -> String {
    artifact_object_key(
        &message.username,
        &message.assignment_name,
        &message.submission_number,
        &message.submission_id,
    )
}
