use chrono::Utc;
use futures::{stream, StreamExt, TryStreamExt};
use log::{info, warn};
use serde::Serialize;
use std::fmt;

use crate::error::{DoraError, Result};
use crate::models::{ChangeRequest, Story};
use crate::providers::{ChangeRequestSource, StorySource};
use crate::report::MetricsReport;
use crate::window::TimeWindow;

const FAILURE_STORY_TYPE: &str = "bug";
const SECONDS_PER_DAY: u64 = 86_400;
const SECONDS_PER_HOUR: u64 = 3_600;

/// Mean of a set of durations, truncated to whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AverageDuration {
    pub seconds: u64,
}

impl AverageDuration {
    pub fn days(&self) -> u64 {
        self.seconds / SECONDS_PER_DAY
    }

    pub fn hours(&self) -> u64 {
        (self.seconds % SECONDS_PER_DAY) / SECONDS_PER_HOUR
    }
}

impl fmt::Display for AverageDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Dias e {}h", self.days(), self.hours())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "percentage")]
pub enum ChangeFailureRate {
    Percentage(f64),
    /// No deployments in the period, so there is nothing to divide by.
    Undefined,
}

impl ChangeFailureRate {
    pub fn from_counts(failures: usize, deployments: usize) -> Self {
        if deployments == 0 {
            return Self::Undefined;
        }

        #[allow(clippy::cast_precision_loss)]
        let rate = (failures as f64 / deployments as f64) * 100.0;
        Self::Percentage(rate)
    }
}

impl fmt::Display for ChangeFailureRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percentage(rate) => write!(f, "{rate:.2}%"),
            Self::Undefined => write!(f, "undefined (no deployments)"),
        }
    }
}

fn average_cycle_time(stories: &[Story], metric: &'static str) -> Result<AverageDuration> {
    if stories.is_empty() {
        return Err(DoraError::NoDataInWindow { metric });
    }

    let total: u64 = stories.iter().map(|s| s.cycle_time).sum();
    Ok(AverageDuration {
        seconds: total / stories.len() as u64,
    })
}

/// Computes the four delivery metrics from a change-request source and a
/// story source.
pub struct MetricsAggregator<C, S> {
    change_requests: C,
    stories: S,
    projects: Vec<String>,
    concurrency: usize,
}

impl<C, S> MetricsAggregator<C, S>
where
    C: ChangeRequestSource,
    S: StorySource,
{
    pub fn new(change_requests: C, stories: S, projects: Vec<String>, concurrency: usize) -> Self {
        Self {
            change_requests,
            stories,
            projects,
            concurrency: concurrency.max(1),
        }
    }

    /// Every change request merged in `window` across all projects.
    ///
    /// Projects are fetched concurrently, each into its own result. Results are
    /// taken in completion order so the first failure to arrive is returned and
    /// the fetches still in flight are dropped. The merged list follows the
    /// configured project order.
    pub async fn deployment_frequency(&self, window: &TimeWindow) -> Result<Vec<ChangeRequest>> {
        info!(
            "Fetching merged pull requests for {} projects...",
            self.projects.len()
        );

        let mut per_project: Vec<(usize, Vec<ChangeRequest>)> =
            stream::iter(self.projects.iter().enumerate())
                .map(|(index, project)| async move {
                    let merged = self.change_requests.list_merged(project, window).await?;
                    info!("{project}: {} merged pull requests in window", merged.len());
                    Ok::<_, DoraError>((index, merged))
                })
                .buffer_unordered(self.concurrency)
                .try_collect()
                .await?;
        per_project.sort_by_key(|(index, _)| *index);

        let deployments: Vec<_> = per_project
            .into_iter()
            .flat_map(|(_, merged)| merged)
            .collect();
        info!("Total deployments: {}", deployments.len());
        Ok(deployments)
    }

    /// Failure stories completed in `window`.
    pub async fn change_failures(&self, window: &TimeWindow) -> Result<Vec<Story>> {
        let failures = self
            .stories
            .search(window, Some(FAILURE_STORY_TYPE))
            .await?;

        if failures.is_empty() {
            warn!("No {FAILURE_STORY_TYPE} stories completed in {window}");
        }

        Ok(failures)
    }

    pub async fn cycle_time(&self, window: &TimeWindow) -> Result<AverageDuration> {
        let stories = self.stories.search(window, None).await?;
        average_cycle_time(&stories, "cycle time")
    }

    pub async fn mttr(&self, window: &TimeWindow) -> Result<AverageDuration> {
        let stories = self
            .stories
            .search(window, Some(FAILURE_STORY_TYPE))
            .await?;
        average_cycle_time(&stories, "MTTR")
    }

    /// Deployments and failures over `period`, cycle time and MTTR over the
    /// longer `cycle_period`.
    pub async fn collect_report(
        &self,
        period: &TimeWindow,
        cycle_period: &TimeWindow,
    ) -> Result<MetricsReport> {
        let deployments = self.deployment_frequency(period).await?;
        let failures = self.change_failures(period).await?;
        let cycle_time = self.cycle_time(cycle_period).await?;
        let mttr = self.mttr(cycle_period).await?;

        let change_failure_rate = ChangeFailureRate::from_counts(failures.len(), deployments.len());

        Ok(MetricsReport {
            period: *period,
            cycle_period: *cycle_period,
            collected_at: Utc::now(),
            deployment_count: deployments.len(),
            failure_count: failures.len(),
            change_failure_rate,
            cycle_time,
            mttr,
            deployments,
            failures,
        })
    }
}
