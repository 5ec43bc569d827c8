pub mod kv;

use std::env;

use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_s3::Client as S3Client;
use tokio::sync::broadcast;

/// Shared clients and runtime configuration for the remote deployment
/// shape. Built once at startup and handed to every handler.
pub struct AppState {
    pub dynamo_client: DynamoClient,
    pub s3_client: S3Client,
    pub table_name: String,
    pub bucket_name: String,
    pub changes: ChangeSignal,
}

impl AppState {
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let table_name = env::var("TABLE_NAME").unwrap_or_else(|_| "taskboard".to_string());
        let bucket_name =
            env::var("S3_BUCKET_NAME").unwrap_or_else(|_| "taskboard-app".to_string());
        Self {
            dynamo_client: DynamoClient::new(&config),
            s3_client: S3Client::new(&config),
            table_name,
            bucket_name,
            changes: ChangeSignal::new(),
        }
    }
}

/// Fan-out published after every successful mutation. Watchers reload their
/// full snapshot on each tick, so a dropped signal costs at most one poll
/// interval of staleness.
#[derive(Clone)]
pub struct ChangeSignal {
    tx: broadcast::Sender<()>,
}

impl ChangeSignal {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn publish(&self) {
        // send only errs when nobody is subscribed
        let _ = self.tx.send(());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }
}

impl Default for ChangeSignal {
    fn default() -> Self {
        Self::new()
    }
}
