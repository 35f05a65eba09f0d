use chrono::{DateTime, Utc};
use serde::Serialize;

/// A pull request merged into the tracked base branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRequest {
    pub title: String,
    pub repo_name: String,
    pub branch: String,
    pub base_branch: String,
    pub url: String,
    pub merged_at: DateTime<Utc>,
}

/// A completed work item from the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Story {
    pub name: String,
    pub link: String,
    pub story_type: String,
    pub completed_at: Option<DateTime<Utc>>,
    /// Seconds from start to completion, zero when the tracker has none.
    pub cycle_time: u64,
}
