//! Transcript summarization
//!
//! When an external LLM endpoint is configured the transcript is condensed
//! through an OpenAI-compatible chat completion; otherwise a deterministic
//! local fallback derives a short summary from the transcript itself. Either
//! way the caller always gets a summary string back.

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::SummarizerConfig;

const REMOTE_TIMEOUT: Duration = Duration::from_secs(45);
const SYSTEM_PROMPT: &str =
    "You summarize spoken transcripts into concise meeting/document notes.";

struct RemoteLlm {
    api_url: String,
    api_key: String,
    model: String,
}

pub struct Summarizer {
    http: reqwest::Client,
    remote: Option<RemoteLlm>,
}

impl Summarizer {
    pub fn new(config: &SummarizerConfig) -> Result<Self> {
        let remote = match (&config.api_url, &config.api_key) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => Some(RemoteLlm {
                api_url: url.clone(),
                api_key: key.clone(),
                model: config.model.clone(),
            }),
            _ => None,
        };

        if remote.is_some() {
            info!("Summarization backend configured: {}", config.model);
        } else {
            info!("No summarization backend configured; using local fallback");
        }

        Ok(Self {
            http: reqwest::Client::builder().timeout(REMOTE_TIMEOUT).build()?,
            remote,
        })
    }

    /// Whether the external summarization backend is configured.
    pub fn is_configured(&self) -> bool {
        self.remote.is_some()
    }

    /// Summarize a transcript. Never fails: remote errors degrade to an
    /// explanatory string, and without a remote the local fallback applies.
    pub async fn summarize(&self, transcript: &str) -> String {
        if transcript.trim().is_empty() {
            return "No transcript available to summarize.".to_string();
        }

        let Some(remote) = &self.remote else {
            return naive_summary(transcript);
        };

        match self.request_remote(remote, transcript).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Remote summarization failed: {}", e);
                format!("Summary unavailable from external LLM API: {}", e)
            }
        }
    }

    async fn request_remote(&self, remote: &RemoteLlm, transcript: &str) -> Result<String> {
        let payload = json!({
            "model": remote.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {
                    "role": "user",
                    "content": format!("Summarize this transcript in bullet points:\n\n{}", transcript),
                },
            ],
            "temperature": 0.2,
        });

        let response = self
            .http
            .post(&remote.api_url)
            .bearer_auth(&remote.api_key)
            .json(&payload)
            .send()
            .await
            .context("request failed")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "{}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }

        let body: Value = response.json().await.context("invalid json")?;
        let content = body
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("missing choices[0].message.content"))?;

        Ok(content.trim().to_string())
    }
}

/// Deterministic local fallback: the first three sentences, else a 500-char
/// head of the transcript.
fn naive_summary(transcript: &str) -> String {
    let head: Vec<&str> = transcript.trim().split('.').take(3).collect();
    let joined = head.join(" ").trim().to_string();

    if !joined.is_empty() {
        joined
    } else {
        transcript.chars().take(500).collect()
    }
}
