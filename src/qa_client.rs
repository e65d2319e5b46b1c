use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QaError {
    #[error("qa request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("qa service returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("failed to decode qa response: {0}")]
    Decode(String),
}

impl QaError {
    /// True when the service could not be reached at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, QaError::Transport(_))
    }
}

/// Extractive question answering over a context passage.
#[async_trait]
pub trait QuestionAnswerer: Send + Sync {
    async fn answer(&self, question: &str, context: &str) -> Result<String, QaError>;
}

#[derive(Clone)]
pub struct HuggingFaceClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HuggingFaceClient {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build qa http client")?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl QuestionAnswerer for HuggingFaceClient {
    async fn answer(&self, question: &str, context: &str) -> Result<String, QaError> {
        #[derive(Serialize)]
        struct QaInputs<'a> {
            question: &'a str,
            context: &'a str,
        }

        #[derive(Serialize)]
        struct QaReq<'a> {
            inputs: QaInputs<'a>,
        }

        #[derive(Deserialize)]
        struct QaResp {
            #[serde(default)]
            answer: String,
        }

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&QaReq {
                inputs: QaInputs { question, context },
            })
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(QaError::Status {
                status,
                body: normalize_err_body(&body),
            });
        }

        let body = response.text().await?;
        let parsed: QaResp =
            serde_json::from_str(&body).map_err(|err| QaError::Decode(err.to_string()))?;

        Ok(parsed.answer.trim().to_string())
    }
}

fn normalize_err_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(err) = json.get("error").and_then(|v| v.as_str()) {
            return err.to_string();
        }
    }

    trimmed.to_string()
}
