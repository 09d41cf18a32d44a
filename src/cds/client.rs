//! Client for the Climate Data Store retrieval API.
//!
//! A request is posted to `resources/<dataset>`, then the returned task is
//! polled until the archive has produced the file, which is downloaded.

use std::{path::Path, time::Duration};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use super::Credentials;
use crate::{cli::create_spinner, download::download_with_progress, job::FieldSpec, retrieve::Retrieve};

const INITIAL_POLL_INTERVAL: Duration = Duration::from_secs(1);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TaskState {
    Queued,
    Running,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct TaskReply {
    state: TaskState,
    request_id: Option<String>,
    location: Option<String>,
    content_length: Option<u64>,
    error: Option<TaskError>,
}

#[derive(Debug, Default, Deserialize)]
struct TaskError {
    message: Option<String>,
    reason: Option<String>,
}

impl TaskError {
    fn describe(&self) -> String {
        format!(
            "{}. {}.",
            self.message.as_deref().unwrap_or("Request failed"),
            self.reason.as_deref().unwrap_or("No reason given")
        )
    }
}

pub struct CdsClient {
    http: Client,
    credentials: Credentials,
    base_url: Url,
}

impl CdsClient {
    pub fn new(credentials: Credentials) -> Result<Self> {
        credentials.basic_auth()?;
        let base_url = base_url(&credentials.url)?;

        Ok(CdsClient {
            http: Client::new(),
            credentials,
            base_url,
        })
    }

    async fn submit(&self, target: &str, parameters: &FieldSpec) -> Result<TaskReply> {
        let url = self.base_url.join(&format!("resources/{}", target))?;
        let (uid, secret) = self.credentials.basic_auth()?;

        let response = self
            .http
            .post(url)
            .basic_auth(uid, Some(secret))
            .json(parameters)
            .send()
            .await?;

        read_reply(response).await
    }

    async fn poll(&self, request_id: &str) -> Result<TaskReply> {
        let url = self.base_url.join(&format!("tasks/{}", request_id))?;
        let (uid, secret) = self.credentials.basic_auth()?;

        let response = self
            .http
            .get(url)
            .basic_auth(uid, Some(secret))
            .send()
            .await?;

        read_reply(response).await
    }

    async fn delete(&self, request_id: &str) {
        let Ok(url) = self.base_url.join(&format!("tasks/{}", request_id)) else {
            return;
        };
        let Ok((uid, secret)) = self.credentials.basic_auth() else {
            return;
        };

        if let Err(e) = self
            .http
            .delete(url)
            .basic_auth(uid, Some(secret))
            .send()
            .await
        {
            warn!("Failed to clean up request {}: {}", request_id, e);
        }
    }

    /// Polls until the task leaves the queue.
    async fn wait(&self, mut reply: TaskReply, target: &str) -> Result<TaskReply> {
        let spinner = create_spinner(format!("Request for {} queued...", target));
        let mut interval = INITIAL_POLL_INTERVAL;

        while matches!(reply.state, TaskState::Queued | TaskState::Running) {
            let request_id = reply
                .request_id
                .clone()
                .ok_or_else(|| anyhow!("Archive reply has no request id"))?;
            spinner.set_message(format!("Request {} is {:?}", request_id, reply.state));

            tokio::time::sleep(interval).await;
            interval = next_poll_interval(interval);

            reply = self.poll(&request_id).await?;
            debug!("Request {} state: {:?}", request_id, reply.state);
        }

        spinner.finish_and_clear();
        Ok(reply)
    }
}

#[async_trait]
impl Retrieve for CdsClient {
    async fn retrieve(
        &self,
        target: &str,
        parameters: &FieldSpec,
        output_path: &Path,
    ) -> Result<()> {
        let reply = self.submit(target, parameters).await?;
        let reply = self.wait(reply, target).await?;

        match reply.state {
            TaskState::Completed => {
                let location = reply
                    .location
                    .as_deref()
                    .ok_or_else(|| anyhow!("Completed request has no download location"))?;
                let url = self.base_url.join(location)?;

                download_with_progress(&self.http, url.as_str(), output_path, reply.content_length)
                    .await
                    .with_context(|| format!("Downloading {}", url))?;

                if let Some(request_id) = &reply.request_id {
                    self.delete(request_id).await;
                }
                Ok(())
            }
            TaskState::Failed => Err(anyhow!(reply.error.unwrap_or_default().describe())),
            state => Err(anyhow!("Unexpected request state {:?}", state)),
        }
    }
}

async fn read_reply(response: reqwest::Response) -> Result<TaskReply> {
    let status = response.status();
    let body = response.text().await?;

    let reply = serde_json::from_str::<TaskReply>(&body);
    if status.is_success() {
        return reply.map_err(|e| anyhow!("Unreadable archive reply ({}): {}", e, body));
    }

    match reply {
        Ok(TaskReply {
            error: Some(error), ..
        }) => Err(anyhow!("Archive returned {}: {}", status, error.describe())),
        _ => Err(anyhow!("Archive returned {}: {}", status, body)),
    }
}

/// The API root with a trailing slash, so relative joins stay under it.
fn base_url(url: &str) -> Result<Url> {
    let url = if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    };
    Url::parse(&url).with_context(|| format!("Invalid API url `{}`", url))
}

fn next_poll_interval(current: Duration) -> Duration {
    current.mul_f64(1.5).min(MAX_POLL_INTERVAL)
}

// -- Tests -------------------------------------------------------------------
