#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

pub mod client;
pub mod report;
pub mod runner;

pub use client::{
    ApiError, Blob, ClientError, GitLabApi, GitLabClient, Project, PROJECTS_PER_PAGE, SEARCH_REFS,
};
pub use report::{print_project, render_project, MAX_DISPLAY_RESULTS};
pub use runner::{RunSummary, Runner, RunnerConfig, RunnerError};
