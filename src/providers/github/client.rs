use log::debug;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::auth::Token;
use crate::error::{DoraError, Result};
use crate::providers::{build_http_client, parse_base_url, read_json, HttpOptions};

pub struct GitHubClient {
    client: Client,
    api_url: Url,
    org: String,
    base_branch: String,
    token: Token,
    pub(super) max_pages: u32,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestDto {
    pub html_url: String,
    pub title: String,
    pub merged_at: Option<chrono::DateTime<chrono::Utc>>,
    pub head: HeadRefDto,
    pub base: BaseRefDto,
}

#[derive(Debug, Deserialize)]
pub struct HeadRefDto {
    #[serde(rename = "ref")]
    pub ref_: String,
    /// Null when the fork the branch came from was deleted.
    pub repo: Option<RepoDto>,
}

#[derive(Debug, Deserialize)]
pub struct BaseRefDto {
    #[serde(rename = "ref")]
    pub ref_: String,
}

#[derive(Debug, Deserialize)]
pub struct RepoDto {
    pub full_name: String,
}

impl GitHubClient {
    pub fn new(
        base_url: &str,
        org: &str,
        base_branch: &str,
        token: Token,
        options: &HttpOptions,
    ) -> Result<Self> {
        if org.trim().is_empty() {
            return Err(DoraError::Config("GitHub organization must not be empty".to_string()));
        }

        Ok(Self {
            client: build_http_client(options)?,
            api_url: parse_base_url(base_url)?,
            org: org.trim().to_string(),
            base_branch: base_branch.to_string(),
            token,
            max_pages: options.max_pages,
        })
    }

    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .bearer_auth(self.token.as_str())
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    fn pulls_url(&self, project: &str) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| DoraError::Config(format!("Invalid GitHub API URL: {}", self.api_url)))?
            .pop_if_empty()
            .extend(["repos", self.org.as_str(), project, "pulls"]);
        Ok(url)
    }

    /// Fetch one page of closed pull requests into the base branch, most
    /// recently updated first.
    pub async fn fetch_pull_request_page(
        &self,
        project: &str,
        page: u32,
    ) -> Result<Vec<PullRequestDto>> {
        let url = self.pulls_url(project)?;
        debug!("GET {url} page={page}");

        let request = self
            .client
            .get(url)
            .query(&[
                ("state", "closed"),
                ("base", self.base_branch.as_str()),
                ("sort", "updated"),
                ("direction", "desc"),
            ])
            .query(&[("page", page)]);
        let response = self.auth_request(request).send().await?;

        read_json(response).await
    }
}
