//! Orchestrates a full search run: groups, projects, per-project search.

use crate::client::{ClientError, GitLabApi, GitLabClient};
use crate::report::{self, MAX_DISPLAY_RESULTS};
use std::time::Duration;
use tracing::{debug, info};

/// Pause between per-project searches. A fixed-rate throttle against the
/// GitLab instance, not an adaptive backoff.
const PROJECT_DELAY: Duration = Duration::from_secs(1);

/// Configuration for one search run.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// GitLab server URL, e.g. "https://gitlab.example.com".
    server_url: String,
    /// Personal access token used for every API call.
    token: String,
    /// Keyword to search for.
    keyword: String,
}

impl RunnerConfig {
    /// Creates a new configuration for a run.
    pub fn new(server_url: String, token: String, keyword: String) -> Self {
        Self {
            server_url,
            token,
            keyword,
        }
    }

    /// Returns the GitLab server URL.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Returns the configured access token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the search keyword.
    pub fn keyword(&self) -> &str {
        &self.keyword
    }
}

/// Errors that can occur while running a search.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// GitLab adapter errors, including client construction.
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Counts from a completed run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Number of groups enumerated.
    pub groups: usize,
    /// Number of projects searched across all groups.
    pub projects: usize,
    /// Number of search calls issued (one per project).
    pub searches: usize,
    /// Number of projects with at least one hit.
    pub projects_with_hits: usize,
}

/// Drives the adapter through groups, projects, and per-project searches,
/// handing each project's results to the reporter.
pub struct Runner<C> {
    config: RunnerConfig,
    client: C,
}

impl Runner<GitLabClient> {
    /// Builds a runner backed by a real GitLab client.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Client`] if the client cannot be constructed
    /// (e.g. unparsable server URL). No API call is attempted here.
    pub fn new(config: RunnerConfig) -> Result<Self, RunnerError> {
        let client = GitLabClient::new(config.server_url(), config.token())?;
        Ok(Self { config, client })
    }
}

impl<C: GitLabApi> Runner<C> {
    /// Builds a runner over an injected adapter, for tests.
    pub fn with_client(config: RunnerConfig, client: C) -> Self {
        Self { config, client }
    }

    /// Executes the full run: enumerate groups, collect every group's
    /// projects into one sequence, then search each project in order with a
    /// fixed pause between projects.
    ///
    /// # Errors
    ///
    /// Halts on the first group-list, project-list, or search error.
    pub async fn run(&self) -> Result<RunSummary, RunnerError> {
        let mut summary = RunSummary::default();

        let group_ids = self.client.list_groups().await?;
        summary.groups = group_ids.len();
        println!("There are [{}] groups", group_ids.len());

        let mut projects = Vec::new();
        for group_id in &group_ids {
            projects.extend(self.client.list_projects(*group_id).await?);
        }
        summary.projects = projects.len();
        println!("There are [{}] projects", projects.len());

        for (index, project) in projects.iter().enumerate() {
            debug!(project_id = project.id, name = %project.name, "searching project");
            // One extra hit past the display cap so the reporter can tell
            // "exactly 5" from "more than 5".
            let (blobs, elapsed) = self
                .client
                .search(project.id, self.config.keyword(), MAX_DISPLAY_RESULTS + 1)
                .await?;
            summary.searches += 1;
            if !blobs.is_empty() {
                summary.projects_with_hits += 1;
            }
            report::print_project(&project.name, &blobs, elapsed);
            if index + 1 < projects.len() {
                tokio::time::sleep(PROJECT_DELAY).await;
            }
        }

        info!(
            groups = summary.groups,
            projects = summary.projects,
            with_hits = summary.projects_with_hits,
            "search complete"
        );
        Ok(summary)
    }
}
