use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use submission_notifier_core::contract::StatusRecord;

#[async_trait]
pub trait StatusRecorder: Send + Sync {
    async fn put_status(&self, record: &StatusRecord) -> Result<(), String>;
}

#[derive(Debug, Clone)]
pub struct DynamoStatusTable {
    table: String,
    client: aws_sdk_dynamodb::Client,
}

impl DynamoStatusTable {
    pub fn new(client: aws_sdk_dynamodb::Client, table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            client,
        }
    }
}

#[async_trait]
impl StatusRecorder for DynamoStatusTable {
    async fn put_status(&self, record: &StatusRecord) -> Result<(), String> {
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(status_item(record)))
            .send()
            .await
            .map(|_| ())
            .map_err(|error| format!("failed to put status record: {error}"))
    }
}

/// Unconditional put: a redelivered message overwrites its own earlier row.
pub fn status_item(record: &StatusRecord) -> HashMap<String, AttributeValue> {
    HashMap::from([
        ("id".to_string(), AttributeValue::S(record.id.clone())),
        (
            "username".to_string(),
            AttributeValue::S(record.username.clone()),
        ),
        (
            "assignmentName".to_string(),
            AttributeValue::S(record.assignment_name.clone()),
        ),
        (
            "emailStatus".to_string(),
            AttributeValue::S(record.email_status.as_str().to_string()),
        ),
    ])
}
