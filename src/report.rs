use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::metrics::{AverageDuration, ChangeFailureRate};
use crate::models::{ChangeRequest, Story};
use crate::window::TimeWindow;

#[derive(Debug, Serialize)]
pub struct MetricsReport {
    pub period: TimeWindow,
    pub cycle_period: TimeWindow,
    pub collected_at: DateTime<Utc>,
    pub deployment_count: usize,
    pub failure_count: usize,
    pub change_failure_rate: ChangeFailureRate,
    pub cycle_time: AverageDuration,
    pub mttr: AverageDuration,
    pub deployments: Vec<ChangeRequest>,
    pub failures: Vec<Story>,
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Period: {}", self.period)?;
        writeln!(f, "CyclePeriod: {}", self.cycle_period)?;
        writeln!(f)?;

        writeln!(f, "PRs")?;
        for pr in &self.deployments {
            writeln!(f, "{} - {}", pr.title, pr.url)?;
        }
        writeln!(f)?;

        writeln!(f, "Stories")?;
        for story in &self.failures {
            writeln!(f, "{} - {}", story.name, story.link)?;
        }
        writeln!(f)?;

        writeln!(f, "Cycle Time: {}", self.cycle_time)?;
        writeln!(f, "MTTR: {}", self.mttr)?;
        writeln!(f, "Total PRs: {}", self.deployment_count)?;
        write!(f, "CFR: {}", self.change_failure_rate)
    }
}
