use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::TryStreamExt;
use submission_notifier_lambda::adapters::artifact_fetch::{Artifact, ArtifactFetcher, FetchError};
use submission_notifier_lambda::adapters::email::Notifier;
use submission_notifier_lambda::adapters::object_store::{ArtifactStore, UploadReceipt};
use submission_notifier_lambda::adapters::status_table::StatusRecorder;
use submission_notifier_lambda::handlers::submission::SubmissionPipeline;
use submission_notifier_lambda::runtime::contract::StatusRecord;
use submission_notifier_lambda::runtime::notification::EmailMessage;

pub const SENDER: &str = "demo6225@demo.csye6225hemangi.com";

/// Serves canned bodies per URL; unknown URLs answer 404.
#[derive(Default)]
pub struct UrlFetcher {
    bodies: HashMap<String, Vec<u8>>,
    pub requests: Mutex<Vec<String>>,
}

impl UrlFetcher {
    pub fn with_body(mut self, url: &str, body: &[u8]) -> Self {
        self.bodies.insert(url.to_string(), body.to_vec());
        self
    }
}

#[async_trait]
impl ArtifactFetcher for UrlFetcher {
    async fn fetch(&self, url: &str) -> Result<Artifact, FetchError> {
        self.requests
            .lock()
            .expect("poisoned mutex")
            .push(url.to_string());
        match self.bodies.get(url) {
            Some(body) => Ok(Artifact::from_chunks(
                url,
                body.chunks(3).map(Bytes::copy_from_slice).collect(),
            )),
            None => Err(FetchError::Status(404)),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn put_artifact(&self, key: &str, artifact: Artifact) -> Result<UploadReceipt, String> {
        let chunks: Vec<Bytes> = artifact.body.try_collect().await?;
        let body = chunks.concat();
        let bytes_written = body.len() as u64;
        self.objects
            .lock()
            .expect("poisoned mutex")
            .insert(key.to_string(), body);
        Ok(UploadReceipt {
            key: key.to_string(),
            bytes_written,
            parts: chunks.len(),
        })
    }
}

/// Keeps the latest row per id, like an unconditional put.
#[derive(Default)]
pub struct MemoryTable {
    pub rows: Mutex<HashMap<String, StatusRecord>>,
    pub writes: Mutex<usize>,
}

#[async_trait]
impl StatusRecorder for MemoryTable {
    async fn put_status(&self, record: &StatusRecord) -> Result<(), String> {
        *self.writes.lock().expect("poisoned mutex") += 1;
        self.rows
            .lock()
            .expect("poisoned mutex")
            .insert(record.id.clone(), record.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct Outbox {
    pub sent: Mutex<Vec<(String, String, EmailMessage)>>,
}

#[async_trait]
impl Notifier for Outbox {
    async fn send(&self, sender: &str, recipient: &str, email: &EmailMessage) -> Result<(), String> {
        self.sent.lock().expect("poisoned mutex").push((
            sender.to_string(),
            recipient.to_string(),
            email.clone(),
        ));
        Ok(())
    }
}

pub struct Services {
    pub fetcher: UrlFetcher,
    pub store: MemoryStore,
    pub table: MemoryTable,
    pub outbox: Outbox,
}

impl Services {
    pub fn new(fetcher: UrlFetcher) -> Self {
        Self {
            fetcher,
            store: MemoryStore::default(),
            table: MemoryTable::default(),
            outbox: Outbox::default(),
        }
    }

    pub fn pipeline(&self) -> SubmissionPipeline<'_> {
        SubmissionPipeline {
            sender_email: SENDER,
            fetcher: &self.fetcher,
            store: &self.store,
            recorder: &self.table,
            notifier: &self.outbox,
        }
    }
}
