use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use lambda_runtime::tracing;

use crate::adapters::artifact_fetch::{Artifact, ArtifactStream};
use crate::config::{StoreCredentials, STORE_CREDENTIALS_ENV};

/// Smallest part size the multipart API accepts for all but the last part.
pub const UPLOAD_CHUNK_SIZE: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub key: String,
    pub bytes_written: u64,
    pub parts: usize,
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Streams the artifact to `key`. The artifact is dropped when this returns.
    async fn put_artifact(&self, key: &str, artifact: Artifact) -> Result<UploadReceipt, String>;
}

/// Regroups an arbitrary byte stream into fixed-size chunks.
#[derive(Debug)]
pub struct ChunkBuffer {
    chunk_size: usize,
    pending: BytesMut,
}

impl ChunkBuffer {
    pub fn new(chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            pending: BytesMut::with_capacity(chunk_size),
        }
    }

    /// Buffers `bytes` and returns every chunk that is now full.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Bytes> {
        self.pending.extend_from_slice(bytes);
        let mut ready = Vec::new();
        while self.pending.len() >= self.chunk_size {
            ready.push(self.pending.split_to(self.chunk_size).freeze());
        }
        ready
    }

    /// Returns the trailing partial chunk, if any.
    pub fn finish(self) -> Option<Bytes> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending.freeze())
        }
    }
}

/// Object store reached through the S3 API with key material from the environment.
///
/// The default endpoint is the S3-interoperable Cloud Storage API, so the
/// credentials are HMAC keys rather than ambient platform identity.
pub struct S3ArtifactStore {
    bucket: String,
    chunk_size: usize,
    client: Result<aws_sdk_s3::Client, String>,
}

impl S3ArtifactStore {
    /// Builds the store. Missing or malformed credentials are kept as an error
    /// and reported by every upload instead of failing the cold start.
    pub fn new(bucket: impl Into<String>, raw_credentials: Option<&str>) -> Self {
        let client = match raw_credentials {
            Some(raw) => StoreCredentials::from_json(raw)
                .map(|credentials| build_client(&credentials))
                .map_err(|error| error.to_string()),
            None => Err(format!("{STORE_CREDENTIALS_ENV} is not configured")),
        };

        Self {
            bucket: bucket.into(),
            chunk_size: UPLOAD_CHUNK_SIZE,
            client,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    async fn stream_chunks(
        &self,
        client: &aws_sdk_s3::Client,
        key: &str,
        mut body: ArtifactStream,
        session: &mut MultipartSession,
    ) -> Result<UploadReceipt, String> {
        let mut buffer = ChunkBuffer::new(self.chunk_size);
        let mut bytes_written = 0u64;

        while let Some(next) = body.next().await {
            let bytes = next?;
            for chunk in buffer.push(&bytes) {
                bytes_written += chunk.len() as u64;
                session.upload_part(client, &self.bucket, key, chunk).await?;
            }
        }

        let trailing = buffer.finish();
        if let Some(chunk) = trailing.as_ref() {
            bytes_written += chunk.len() as u64;
        }

        if session.upload_id.is_none() {
            client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(ByteStream::from(trailing.unwrap_or_default()))
                .send()
                .await
                .map_err(|error| format!("failed to write object to store: {error}"))?;
            return Ok(UploadReceipt {
                key: key.to_string(),
                bytes_written,
                parts: 1,
            });
        }

        if let Some(chunk) = trailing {
            session.upload_part(client, &self.bucket, key, chunk).await?;
        }
        let parts = session.complete(client, &self.bucket, key).await?;

        Ok(UploadReceipt {
            key: key.to_string(),
            bytes_written,
            parts,
        })
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn put_artifact(&self, key: &str, artifact: Artifact) -> Result<UploadReceipt, String> {
        let client = self.client.as_ref().map_err(|error| error.clone())?;
        let mut session = MultipartSession::default();

        let result = self
            .stream_chunks(client, key, artifact.body, &mut session)
            .await;

        if result.is_err() {
            if let Some(upload_id) = session.upload_id.as_deref() {
                if let Err(error) = client
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(upload_id)
                    .send()
                    .await
                {
                    tracing::warn!(object_key = key, error = %error, "failed to abort multipart upload");
                }
            }
        }

        result
    }
}

#[derive(Debug, Default)]
struct MultipartSession {
    upload_id: Option<String>,
    parts: Vec<CompletedPart>,
}

impl MultipartSession {
    async fn upload_part(
        &mut self,
        client: &aws_sdk_s3::Client,
        bucket: &str,
        key: &str,
        chunk: Bytes,
    ) -> Result<(), String> {
        let upload_id = match self.upload_id.as_ref() {
            Some(upload_id) => upload_id.clone(),
            None => {
                let created = client
                    .create_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .send()
                    .await
                    .map_err(|error| format!("failed to start multipart upload: {error}"))?;
                let upload_id = created
                    .upload_id()
                    .ok_or_else(|| "multipart upload returned no upload id".to_string())?
                    .to_string();
                self.upload_id = Some(upload_id.clone());
                upload_id
            }
        };

        let part_number = i32::try_from(self.parts.len() + 1)
            .map_err(|_| "multipart upload exceeded part limit".to_string())?;
        let uploaded = client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(chunk))
            .send()
            .await
            .map_err(|error| format!("failed to upload part {part_number}: {error}"))?;

        self.parts.push(
            CompletedPart::builder()
                .part_number(part_number)
                .set_e_tag(uploaded.e_tag().map(str::to_string))
                .build(),
        );
        Ok(())
    }

    async fn complete(
        &mut self,
        client: &aws_sdk_s3::Client,
        bucket: &str,
        key: &str,
    ) -> Result<usize, String> {
        let upload_id = self
            .upload_id
            .clone()
            .ok_or_else(|| "no multipart upload in progress".to_string())?;
        let parts = std::mem::take(&mut self.parts);
        let part_count = parts.len();

        client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|error| format!("failed to complete multipart upload: {error}"))?;

        Ok(part_count)
    }
}

fn build_client(credentials: &StoreCredentials) -> aws_sdk_s3::Client {
    let config = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .credentials_provider(Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            credentials.session_token.clone(),
            None,
            "artifact-store-secret",
        ))
        .region(Region::new(credentials.region().to_string()))
        .endpoint_url(credentials.endpoint_url())
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_buffer_emits_fixed_size_chunks_and_short_tail() {
        let mut buffer = ChunkBuffer::new(4);

        assert!(buffer.push(b"ab").is_empty());
        let ready = buffer.push(b"cdefghij");
        assert_eq!(
            ready,
            vec![Bytes::from_static(b"abcd"), Bytes::from_static(b"efgh")]
        );
        assert_eq!(buffer.finish(), Some(Bytes::from_static(b"ij")));
    }

    #[test]
    fn chunk_buffer_has_no_tail_on_exact_multiple() {
        let mut buffer = ChunkBuffer::new(3);
        assert_eq!(buffer.push(b"abcdef").len(), 2);
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn zero_chunk_size_is_clamped() {
        let mut buffer = ChunkBuffer::new(0);
        assert_eq!(buffer.push(b"xy").len(), 2);
    }

    #[tokio::test]
    async fn upload_without_credentials_fails_without_network() {
        let store = S3ArtifactStore::new("csye6225-demo2", None);
        let artifact = Artifact::from_chunks("https://good.example/file.zip", vec![]);

        let error = store
            .put_artifact("alice@example.com/hw1/1/s123.zip", artifact)
            .await
            .expect_err("missing credentials should fail");
        assert_eq!(error, "ARTIFACT_STORE_CREDENTIALS is not configured");
    }

    #[tokio::test]
    async fn upload_with_malformed_credentials_reports_reason() {
        let store = S3ArtifactStore::new("csye6225-demo2", Some("not json"));
        let artifact = Artifact::from_chunks("https://good.example/file.zip", vec![]);

        let error = store
            .put_artifact("key.zip", artifact)
            .await
            .expect_err("malformed credentials should fail");
        assert!(error.starts_with("Invalid object store credentials"));
    }
}
