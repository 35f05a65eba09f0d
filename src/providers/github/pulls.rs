use async_trait::async_trait;
use log::{info, warn};

use super::client::{GitHubClient, PullRequestDto};
use crate::error::{DoraError, Result};
use crate::models::ChangeRequest;
use crate::providers::ChangeRequestSource;
use crate::window::TimeWindow;

/// What one page told us about the rest of the listing.
#[derive(Debug, PartialEq, Eq)]
enum PageOutcome {
    Continue,
    /// A merge older than the window was seen. Pages are ordered newest
    /// first, so nothing further can fall inside the window.
    PastWindow,
}

fn collect_page(
    page: Vec<PullRequestDto>,
    window: &TimeWindow,
    merged: &mut Vec<ChangeRequest>,
) -> PageOutcome {
    for pr in page {
        let Some(merged_at) = pr.merged_at else {
            continue;
        };

        if merged_at < window.start() {
            return PageOutcome::PastWindow;
        }

        if window.contains(merged_at) {
            merged.push(ChangeRequest {
                title: pr.title,
                repo_name: pr.head.repo.map(|r| r.full_name).unwrap_or_default(),
                branch: pr.head.ref_,
                base_branch: pr.base.ref_,
                url: pr.html_url,
                merged_at,
            });
        }
    }

    PageOutcome::Continue
}

impl GitHubClient {
    pub async fn list_merged_pull_requests(
        &self,
        project: &str,
        window: &TimeWindow,
    ) -> Result<Vec<ChangeRequest>> {
        let mut merged = Vec::new();

        for page in 1..=self.max_pages {
            let pull_requests = self.fetch_pull_request_page(project, page).await?;

            if pull_requests.is_empty() {
                info!("{project}: no more pull requests after page {}", page - 1);
                return Ok(merged);
            }

            let outcome = collect_page(pull_requests, window, &mut merged);
            info!(
                "{project}: page {page} scanned (merged in window so far: {})",
                merged.len()
            );

            if outcome == PageOutcome::PastWindow {
                return Ok(merged);
            }
        }

        warn!("{project}: still inside window after {} pages", self.max_pages);
        Err(DoraError::PageLimitExceeded {
            source_name: format!("GitHub pulls for {project}"),
            pages: self.max_pages,
        })
    }
}

#[async_trait]
impl ChangeRequestSource for GitHubClient {
    async fn list_merged(&self, project: &str, window: &TimeWindow) -> Result<Vec<ChangeRequest>> {
        self.list_merged_pull_requests(project, window).await
    }
}
