use lambda_runtime::tracing;
use serde_json::Value;
use submission_notifier_core::contract::INVOCATION_RESPONSE;

use crate::handlers::submission::{InvocationReport, MessageDisposition, SubmissionPipeline};

/// Reads `Records[].Sns.Message`. Records without a string message are skipped.
pub fn decode_sns_messages(event: &Value) -> Vec<String> {
    let Some(records) = event.get("Records").and_then(Value::as_array) else {
        tracing::warn!("SNS event must include Records array");
        return Vec::new();
    };

    let mut messages = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        match record
            .get("Sns")
            .and_then(|sns| sns.get("Message"))
            .and_then(Value::as_str)
        {
            Some(message) => messages.push(message.to_string()),
            None => tracing::warn!(record_index = index, "SNS record message must be a string"),
        }
    }

    messages
}

/// Processes every message of the event in arrival order.
pub async fn handle_sns_event(event: &Value, pipeline: &SubmissionPipeline<'_>) -> InvocationReport {
    let mut report = InvocationReport::default();

    for message in decode_sns_messages(event) {
        let disposition = pipeline.handle_raw_message(&message).await;
        log_disposition(&disposition);
        report.messages.push(disposition);
    }

    tracing::info!(
        processed = report.processed(),
        rejected = report.rejected(),
        "submission notifications handled"
    );
    report
}

/// Body of one Lambda invocation. The answer never depends on how the
/// messages fared; outcomes only reach the logs.
pub async fn handle_invocation(event: &Value, pipeline: &SubmissionPipeline<'_>) -> String {
    handle_sns_event(event, pipeline).await;
    INVOCATION_RESPONSE.to_string()
}

fn log_disposition(disposition: &MessageDisposition) {
    let summary = serde_json::to_string(disposition).unwrap_or_default();
    match disposition.report() {
        Some(report) if report.has_failures() => {
            tracing::warn!(summary = %summary, "submission processed with failures")
        }
        Some(_) => tracing::info!(summary = %summary, "submission processed"),
        None => tracing::warn!(summary = %summary, "submission rejected"),
    }
}
