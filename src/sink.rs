use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One member's completed WORK phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyLog {
    pub room_id: String,
    pub username: String,
    pub duration_seconds: u32,
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("request to study log store failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("study log store answered {status}: {body}")]
    Status { status: u16, body: String },
}

/// Destination for completed study sessions. Batches are never empty.
#[async_trait]
pub trait StudyLogSink: Send + Sync {
    async fn record(&self, batch: &[StudyLog]) -> Result<(), SinkError>;
}

/// Used when no store is configured.
pub struct DiscardSink;

#[async_trait]
impl StudyLogSink for DiscardSink {
    async fn record(&self, batch: &[StudyLog]) -> Result<(), SinkError> {
        info!("No study log store configured, dropping {} record(s)", batch.len());
        Ok(())
    }
}

/// Inserts batches into a PostgREST table (the Supabase REST API).
pub struct RestSink {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl RestSink {
    pub fn new(base_url: &str, table: &str, api_key: String) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(RestSink {
            client,
            endpoint: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl StudyLogSink for RestSink {
    async fn record(&self, batch: &[StudyLog]) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=minimal")
            .json(batch)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Status {
                status: status.as_u16(),
                body,
            });
        }
        debug!("Stored {} study log record(s)", batch.len());
        Ok(())
    }
}

/// Spawns the task that feeds batches to `sink` one at a time.
///
/// Sending on the returned queue never waits on the store, so the tick loop is
/// never held up by a slow or failing sink.
pub fn spawn_writer(sink: Arc<dyn StudyLogSink>) -> mpsc::UnboundedSender<Vec<StudyLog>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<StudyLog>>();
    tokio::spawn(async move {
        while let Some(batch) = rx.recv().await {
            if batch.is_empty() {
                continue;
            }
            if let Err(e) = sink.record(&batch).await {
                error!("Failed to store {} study log record(s): {}", batch.len(), e);
            }
        }
    });
    tx
}
