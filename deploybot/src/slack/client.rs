//! Minimal Slack Web API client: token check and posting messages.

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

/// Identity returned by `auth.test`.
#[derive(Debug, Clone)]
pub struct BotIdentity {
    pub user_id: String,
}

#[derive(Clone)]
pub struct SlackClient {
    token: String,
    api_url: String,
    http: reqwest::Client,
}

impl SlackClient {
    pub fn new(token: String, api_url: &str) -> Self {
        Self {
            token,
            api_url: api_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Validate the token and learn the bot's own user id.
    pub async fn auth_test(&self) -> Result<BotIdentity> {
        let resp = self.call("auth.test", &serde_json::json!({})).await?;
        let user_id = resp.user_id.context("auth.test returned no user_id")?;
        Ok(BotIdentity { user_id })
    }

    /// Post `text` to `channel`, threaded under `thread_ts` when given.
    pub async fn post_message(&self, channel: &str, text: &str, thread_ts: Option<&str>) -> Result<()> {
        let mut body = serde_json::json!({
            "channel": channel,
            "text": text,
        });
        if let Some(ts) = thread_ts {
            body["thread_ts"] = serde_json::Value::String(ts.to_string());
        }
        self.call("chat.postMessage", &body).await?;
        Ok(())
    }

    async fn call(&self, method: &str, body: &serde_json::Value) -> Result<ApiResponse> {
        let resp = self
            .http
            .post(format!("{}/{method}", self.api_url))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to call Slack {method}"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Slack {method} error {status}: {body}");
        }

        let parsed: ApiResponse = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse Slack {method} response"))?;
        if !parsed.ok {
            anyhow::bail!(
                "Slack {method} failed: {}",
                parsed.error.as_deref().unwrap_or("unknown error")
            );
        }
        Ok(parsed)
    }
}
