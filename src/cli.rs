use anyhow::{bail, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::auth::Token;
use crate::error::DoraError;
use crate::metrics::MetricsAggregator;
use crate::providers::github::GitHubClient;
use crate::providers::shortcut::ShortcutClient;
use crate::providers::HttpOptions;
use crate::window::TimeWindow;

/// Upper bound for the day offsets, about ten years.
const MAX_DAYS: i64 = 3650;

#[derive(Parser, Debug)]
#[command(name = "doralens")]
#[command(author, version, about = "DORA metrics from GitHub and Shortcut", long_about = None)]
pub struct Cli {
    /// GitHub API token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, value_parser = Token::from_str)]
    github_token: Token,

    /// Shortcut API token
    #[arg(long, env = "SHORTCUT_TOKEN", hide_env_values = true, value_parser = Token::from_str)]
    shortcut_token: Token,

    /// GitHub organization owning the tracked repositories
    #[arg(long, env = "DORA_GITHUB_ORG")]
    org: String,

    /// Repositories counted as deployments (comma-separated)
    #[arg(long, env = "DORA_PROJECTS", value_delimiter = ',', required = true)]
    projects: Vec<String>,

    /// Branch whose merges count as deployments
    #[arg(long, env = "DORA_BASE_BRANCH", default_value = "main")]
    base_branch: String,

    /// GitHub API URL
    #[arg(long, env = "DORA_GITHUB_URL", default_value = "https://api.github.com")]
    github_url: String,

    /// Shortcut API URL
    #[arg(long, env = "DORA_SHORTCUT_URL", default_value = "https://api.app.shortcut.com")]
    shortcut_url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: u64,

    /// Maximum pages followed per listing
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..))]
    max_pages: u32,

    /// Repositories fetched at the same time
    #[arg(long, default_value_t = 10)]
    concurrency: usize,

    /// Days subtracted from today before picking the reporting week
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(i64).range(0..=MAX_DAYS))]
    lookback_days: i64,

    /// Extra days before the reporting week used for cycle time and MTTR
    #[arg(long, default_value_t = 23, value_parser = clap::value_parser!(i64).range(0..=MAX_DAYS))]
    cycle_extension_days: i64,

    /// First day of an explicit reporting period (YYYY-MM-DD)
    #[arg(long, requires = "until")]
    since: Option<NaiveDate>,

    /// Last day of an explicit reporting period, inclusive (YYYY-MM-DD)
    #[arg(long, requires = "since")]
    until: Option<NaiveDate>,

    /// Emit the report as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Pretty print JSON output
    #[arg(short, long, default_value_t = false)]
    pretty: bool,

    /// Output file path (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Cli {
    fn project_list(&self) -> Result<Vec<String>> {
        let projects: Vec<String> = self
            .projects
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();

        if projects.is_empty() {
            bail!(DoraError::Config("no projects configured".to_string()));
        }
        Ok(projects)
    }

    fn reporting_windows(&self) -> Result<(TimeWindow, TimeWindow)> {
        let period = match (self.since, self.until) {
            (Some(since), Some(until)) => TimeWindow::from_dates(since, until)?,
            _ => TimeWindow::reporting_week(Utc::now(), self.lookback_days)?,
        };
        let cycle_period = period.extended_back(self.cycle_extension_days)?;
        Ok((period, cycle_period))
    }

    fn http_options(&self) -> HttpOptions {
        HttpOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            max_pages: self.max_pages,
        }
    }

    pub async fn execute(&self) -> Result<()> {
        let projects = self.project_list()?;
        let (period, cycle_period) = self.reporting_windows()?;
        info!("Reporting period: {period}");
        info!("Cycle period: {cycle_period}");

        let options = self.http_options();
        let github = GitHubClient::new(
            &self.github_url,
            &self.org,
            &self.base_branch,
            self.github_token.clone(),
            &options,
        )?;
        let shortcut = ShortcutClient::new(&self.shortcut_url, self.shortcut_token.clone(), &options)?;

        let aggregator = MetricsAggregator::new(github, shortcut, projects, self.concurrency);
        let report = aggregator.collect_report(&period, &cycle_period).await?;

        let output = if !self.json {
            report.to_string()
        } else if self.pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, output)?;
            info!("Report written to: {}", output_path.display());
        } else {
            println!("{output}");
        }

        Ok(())
    }
}
