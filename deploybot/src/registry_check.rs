//! Image tag existence check against Docker Hub.

use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use futures::FutureExt;

pub const DEFAULT_REGISTRY_URL: &str = "https://index.docker.io";
pub const DEFAULT_REGISTRY_TIMEOUT: Duration = Duration::from_secs(2);

/// Answers whether `repo:tag` exists in an image registry.
///
/// Any failure to get a definite yes is reported as `false`.
pub trait ImageRegistry: Send + Sync {
    fn tag_exists<'a>(&'a self, repo: &'a str, tag: &'a str) -> BoxFuture<'a, bool>;
}

/// Docker Hub v1 tag lookup.
pub struct DockerHub {
    base_url: String,
    http: reqwest::Client,
}

impl DockerHub {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build registry HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn tag_url(&self, repo: &str, tag: &str) -> String {
        format!("{}/v1/repositories/{repo}/tags/{tag}", self.base_url)
    }
}

impl ImageRegistry for DockerHub {
    fn tag_exists<'a>(&'a self, repo: &'a str, tag: &'a str) -> BoxFuture<'a, bool> {
        async move {
            let url = self.tag_url(repo, tag);
            match self.http.get(&url).send().await {
                Ok(resp) if resp.status() == reqwest::StatusCode::OK => true,
                Ok(resp) => {
                    tracing::info!(%repo, %tag, status = %resp.status(), "Image tag lookup failed");
                    false
                }
                Err(e) => {
                    tracing::warn!(%repo, %tag, error = %e, "Image registry unreachable");
                    false
                }
            }
        }
        .boxed()
    }
}
