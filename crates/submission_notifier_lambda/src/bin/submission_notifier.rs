use lambda_runtime::{service_fn, tracing, Error, LambdaEvent};
use serde_json::Value;
use submission_notifier_lambda::adapters::artifact_fetch::HttpArtifactFetcher;
use submission_notifier_lambda::adapters::email::SesNotifier;
use submission_notifier_lambda::adapters::object_store::S3ArtifactStore;
use submission_notifier_lambda::adapters::status_table::DynamoStatusTable;
use submission_notifier_lambda::config::HandlerConfig;
use submission_notifier_lambda::handlers::sns::handle_invocation;
use submission_notifier_lambda::handlers::submission::SubmissionPipeline;

struct RuntimeDependencies {
    config: HandlerConfig,
    fetcher: HttpArtifactFetcher,
    store: S3ArtifactStore,
    status_table: DynamoStatusTable,
    notifier: SesNotifier,
}

impl RuntimeDependencies {
    async fn load() -> Result<Self, Error> {
        let config = HandlerConfig::from_env();
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

        Ok(Self {
            fetcher: HttpArtifactFetcher::new(config.fetch_timeout).map_err(Error::from)?,
            store: S3ArtifactStore::new(config.bucket.clone(), config.store_credentials.as_deref()),
            status_table: DynamoStatusTable::new(
                aws_sdk_dynamodb::Client::new(&aws_config),
                config.status_table.clone(),
            ),
            notifier: SesNotifier::new(aws_sdk_sesv2::Client::new(&aws_config)),
            config,
        })
    }

    fn pipeline(&self) -> SubmissionPipeline<'_> {
        SubmissionPipeline {
            sender_email: &self.config.sender_email,
            fetcher: &self.fetcher,
            store: &self.store,
            recorder: &self.status_table,
            notifier: &self.notifier,
        }
    }
}

async fn handle_request(
    event: LambdaEvent<Value>,
    deps: &RuntimeDependencies,
) -> Result<String, Error> {
    let response = handle_invocation(&event.payload, &deps.pipeline()).await;
    tracing::info!(request_id = %event.context.request_id, "invocation finished");
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    let deps = RuntimeDependencies::load().await?;
    lambda_runtime::run(service_fn(|event| handle_request(event, &deps))).await
}
