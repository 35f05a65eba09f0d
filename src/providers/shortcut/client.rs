use chrono::{DateTime, Utc};
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::auth::Token;
use crate::error::{DoraError, Result};
use crate::models::Story;
use crate::providers::{build_http_client, parse_base_url, read_json, HttpOptions};

pub struct ShortcutClient {
    client: Client,
    api_url: Url,
    token: Token,
    pub(super) max_pages: u32,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponseDto {
    /// Relative URL of the next page, absent or empty on the last one.
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub data: Vec<StoryDto>,
    #[serde(default)]
    pub total: usize,
}

impl SearchResponseDto {
    pub fn next_cursor(&self) -> Option<&str> {
        self.next.as_deref().filter(|next| !next.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct StoryDto {
    pub name: String,
    pub app_url: String,
    pub story_type: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub cycle_time: Option<u64>,
}

impl From<StoryDto> for Story {
    fn from(dto: StoryDto) -> Self {
        Self {
            name: dto.name,
            link: dto.app_url,
            story_type: dto.story_type,
            completed_at: dto.completed_at,
            cycle_time: dto.cycle_time.unwrap_or(0),
        }
    }
}

impl ShortcutClient {
    pub fn new(base_url: &str, token: Token, options: &HttpOptions) -> Result<Self> {
        Ok(Self {
            client: build_http_client(options)?,
            api_url: parse_base_url(base_url)?,
            token,
            max_pages: options.max_pages,
        })
    }

    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("Shortcut-Token", self.token.as_str())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
    }

    fn search_url(&self) -> Result<Url> {
        self.api_url
            .join("api/v3/search/stories")
            .map_err(|e| DoraError::Config(format!("Invalid Shortcut search URL: {e}")))
    }

    /// The cursor already carries the whole query, so it only needs the host.
    /// Cursors pointing at another origin are refused so the token stays with
    /// the configured API.
    fn cursor_url(&self, next: &str) -> Result<Url> {
        let url = self
            .api_url
            .join(next)
            .map_err(|e| DoraError::InvalidCursor {
                cursor: next.to_string(),
                reason: e.to_string(),
            })?;

        if url.origin() != self.api_url.origin() {
            return Err(DoraError::InvalidCursor {
                cursor: next.to_string(),
                reason: format!("origin differs from {}", self.api_url.origin().ascii_serialization()),
            });
        }
        Ok(url)
    }

    pub async fn fetch_first_page(&self, query: &str) -> Result<SearchResponseDto> {
        let url = self.search_url()?;
        debug!("GET {url} query={query}");

        let request = self
            .client
            .get(url)
            .query(&[("query", query), ("detail", "slim")]);
        let response = self.auth_request(request).send().await?;

        read_json(response).await
    }

    pub async fn fetch_next_page(&self, next: &str) -> Result<SearchResponseDto> {
        let url = self.cursor_url(next)?;
        debug!("GET {url}");

        let response = self.auth_request(self.client.get(url)).send().await?;

        read_json(response).await
    }
}
