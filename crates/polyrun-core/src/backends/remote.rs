//! Stateless HTTP fallback for languages neither in-browser engine
//! supports.
//!
//! One request per job; no engine state, no streaming. The full output
//! comes back in the response body and is forwarded to the sink as a
//! single chunk.

use super::{elapsed_ms, error_result, ExecutionBackend};
use crate::config::ExecConfig;
use crate::core_types::{ExecutionResult, Job, SourceFile};
use crate::errors::ExecError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Serialize)]
struct RunRequest<'a> {
    lang: &'a str,
    files: &'a [SourceFile],
    #[serde(rename = "activeFileId")]
    active_file_id: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct RunResponse {
    output: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

pub struct RemoteBackend {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl RemoteBackend {
    pub fn new(config: &ExecConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.remote_endpoint.clone(),
            timeout: config.remote_timeout(),
        }
    }

    async fn try_run(&self, job: &Job) -> Result<String, ExecError> {
        let payload = RunRequest {
            lang: &job.language,
            files: &job.files,
            active_file_id: &job.entry_file_id,
            input: &job.stdin,
        };
        log::debug!("posting {} job to {}", job.language, self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| format!("Server error {}", status.as_u16()));
            return Err(ExecError::Transport(message));
        }

        let body: RunResponse = response.json().await.map_err(|e| {
            ExecError::Transport(format!("malformed response from execution service: {}", e))
        })?;
        Ok(body.output)
    }
}

#[async_trait]
impl ExecutionBackend for RemoteBackend {
    async fn run(&self, job: &Job) -> ExecutionResult {
        let started = Instant::now();
        match self.try_run(job).await {
            Ok(output) => {
                job.emit(&format!("{}\n", output));
                ExecutionResult {
                    output,
                    elapsed_ms: elapsed_ms(started),
                }
            }
            Err(err) => error_result(&err, started, &job.sink),
        }
    }
}
