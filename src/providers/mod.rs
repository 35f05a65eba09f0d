pub mod github;
pub mod shortcut;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{DoraError, Result};
use crate::models::{ChangeRequest, Story};
use crate::window::TimeWindow;

const USER_AGENT: &str = concat!("doralens/", env!("CARGO_PKG_VERSION"));

/// Source of merged change requests for one project.
#[async_trait]
pub trait ChangeRequestSource: Send + Sync {
    async fn list_merged(&self, project: &str, window: &TimeWindow) -> Result<Vec<ChangeRequest>>;
}

/// Source of completed stories, optionally restricted to one story type.
#[async_trait]
pub trait StorySource: Send + Sync {
    async fn search(&self, window: &TimeWindow, story_type: Option<&str>) -> Result<Vec<Story>>;
}

/// Settings shared by every upstream client.
#[derive(Debug, Clone, Copy)]
pub struct HttpOptions {
    pub timeout: Duration,
    pub max_pages: u32,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_pages: 100,
        }
    }
}

pub(crate) fn build_http_client(options: &HttpOptions) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(options.timeout)
        .build()
        .map_err(|e| DoraError::Config(format!("Failed to create HTTP client: {e}")))
}

/// Parse a base URL so that relative joins append to its path instead of
/// replacing the last segment.
pub(crate) fn parse_base_url(base_url: &str) -> Result<Url> {
    let mut normalized = base_url.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Url::parse(&normalized).map_err(|e| DoraError::Config(format!("Invalid base URL: {e}")))
}

/// Fail on non-success status with the raw body, otherwise decode the body.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(DoraError::Upstream { status, body });
    }

    Ok(serde_json::from_str(&body)?)
}
