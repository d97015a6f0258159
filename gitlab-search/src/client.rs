//! GitLab REST API adapter.
//!
//! This module wraps the GitLab v4 REST API behind the narrow [`GitLabApi`]
//! capability trait: list group IDs, list a group's projects, and search a
//! project's blobs across a fixed set of reference names. It owns the mapping
//! from GitLab response shapes to the tool's own plain records.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

/// Projects requested per group. A single page only; groups with more
/// projects than this are truncated.
pub const PROJECTS_PER_PAGE: u32 = 150;

/// Reference names searched per project, in search order.
pub const SEARCH_REFS: [&str; 3] = ["staging", "demo", "master"];

/// Errors surfaced by the GitLab adapter.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The configured server URL could not be parsed. Fatal before any API call.
    #[error("invalid GitLab server URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Init(#[source] reqwest::Error),

    /// Listing groups failed.
    #[error("failed to list groups: {0}")]
    GroupList(#[source] ApiError),

    /// Listing a group's projects failed.
    #[error("failed to list projects for group {group_id}: {source}")]
    ProjectList {
        group_id: u64,
        #[source]
        source: ApiError,
    },

    /// Searching a project's blobs failed.
    #[error("search failed for project {project_id}: {source}")]
    Search {
        project_id: u64,
        #[source]
        source: ApiError,
    },
}

/// A single failed GitLab API request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connection, TLS, body decoding).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("GitLab returned {status} for {endpoint}")]
    Status {
        status: reqwest::StatusCode,
        endpoint: String,
    },
}

/// A project found while listing a group.
#[derive(Debug, Clone)]
pub struct Project {
    /// GitLab-assigned project ID.
    pub id: u64,
    /// Namespaced display name, e.g. "my-group / my-service".
    pub name: String,
    /// Whether the project is archived.
    pub archived: bool,
}

/// A single blob search hit.
#[derive(Debug, Clone)]
pub struct Blob {
    /// Reference (branch/tag) the hit was found on.
    pub reference: String,
    /// Path of the matched file within the repository.
    pub path: String,
    /// Matched snippet text.
    pub data: String,
    /// Line number where the snippet starts.
    pub line: u64,
}

/// The three operations the rest of the tool needs from GitLab.
///
/// Kept narrow so the orchestrator can be driven by a test double.
#[async_trait]
pub trait GitLabApi {
    /// Lists the IDs of all groups visible to the token.
    async fn list_groups(&self) -> Result<Vec<u64>, ClientError>;

    /// Lists the projects of one group, first page only
    /// ([`PROJECTS_PER_PAGE`] entries at most).
    async fn list_projects(&self, group_id: u64) -> Result<Vec<Project>, ClientError>;

    /// Searches one project's blobs for `keyword` across [`SEARCH_REFS`],
    /// requesting up to `per_page` hits per reference.
    ///
    /// Returns the accumulated hits in discovery order (reference order,
    /// then GitLab's return order within a reference) together with the
    /// wall-clock time spent on the whole loop. A reference whose search
    /// call fails is skipped, not fatal.
    async fn search(
        &self,
        project_id: u64,
        keyword: &str,
        per_page: usize,
    ) -> Result<(Vec<Blob>, Duration), ClientError>;
}

/// Production [`GitLabApi`] implementation over the GitLab v4 REST API.
pub struct GitLabClient {
    http: reqwest::Client,
    /// Normalized API base, e.g. "https://gitlab.example.com/api/v4".
    api_base: String,
    token: String,
}

impl GitLabClient {
    /// Builds a client for `server_url`, authenticating with `token`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if the URL does not parse and
    /// [`ClientError::Init`] if the HTTP client cannot be constructed.
    /// No API call is attempted during construction.
    pub fn new(server_url: &str, token: &str) -> Result<Self, ClientError> {
        let parsed = Url::parse(server_url).map_err(|source| ClientError::InvalidUrl {
            url: server_url.to_string(),
            source,
        })?;
        let http = reqwest::Client::builder().build().map_err(ClientError::Init)?;
        Ok(Self {
            http,
            api_base: api_base(&parsed),
            token: token.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}/{}", self.api_base, endpoint);
        debug!(%url, "GET");
        let response = self
            .http
            .get(&url)
            .header("PRIVATE-TOKEN", &self.token)
            .query(query)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ApiError::Status {
                status: response.status(),
                endpoint: endpoint.to_string(),
            });
        }
        Ok(response.json().await?)
    }

    async fn search_reference(
        &self,
        project_id: u64,
        keyword: &str,
        reference: &str,
        per_page: usize,
    ) -> Result<Vec<Blob>, ApiError> {
        let blobs: Vec<BlobResponse> = self
            .get_json(
                &format!("projects/{project_id}/search"),
                &[
                    ("scope", "blobs".to_string()),
                    ("search", keyword.to_string()),
                    ("ref", reference.to_string()),
                    ("per_page", per_page.to_string()),
                ],
            )
            .await?;
        Ok(blobs.into_iter().map(Blob::from).collect())
    }
}

#[async_trait]
impl GitLabApi for GitLabClient {
    async fn list_groups(&self) -> Result<Vec<u64>, ClientError> {
        let groups: Vec<GroupResponse> = self
            .get_json("groups", &[])
            .await
            .map_err(ClientError::GroupList)?;
        Ok(groups.into_iter().map(|g| g.id).collect())
    }

    async fn list_projects(&self, group_id: u64) -> Result<Vec<Project>, ClientError> {
        let projects: Vec<ProjectResponse> = self
            .get_json(
                &format!("groups/{group_id}/projects"),
                &[("per_page", PROJECTS_PER_PAGE.to_string())],
            )
            .await
            .map_err(|source| ClientError::ProjectList { group_id, source })?;
        Ok(projects.into_iter().map(Project::from).collect())
    }

    async fn search(
        &self,
        project_id: u64,
        keyword: &str,
        per_page: usize,
    ) -> Result<(Vec<Blob>, Duration), ClientError> {
        Ok(collect_reference_hits(project_id, |reference| {
            self.search_reference(project_id, keyword, reference, per_page)
        })
        .await)
    }
}

/// Runs the fixed reference loop for one project: fetch hits per reference
/// in [`SEARCH_REFS`] order, accumulate them, and time the whole loop.
async fn collect_reference_hits<F, Fut>(project_id: u64, fetch: F) -> (Vec<Blob>, Duration)
where
    F: Fn(&'static str) -> Fut,
    Fut: Future<Output = Result<Vec<Blob>, ApiError>>,
{
    let start = Instant::now();
    let mut hits = Vec::new();
    for reference in SEARCH_REFS {
        match fetch(reference).await {
            Ok(blobs) => hits.extend(blobs),
            // A missing branch or a flaky call on one reference must not
            // sink the whole project; skip it and keep going.
            Err(error) => {
                warn!(project_id, reference, %error, "reference search failed, skipping");
            }
        }
    }
    (hits, start.elapsed())
}

/// Normalizes a server URL into the v4 API base: trailing slashes trimmed,
/// `/api/v4` appended unless already present.
fn api_base(server_url: &Url) -> String {
    let trimmed = server_url.as_str().trim_end_matches('/');
    if trimmed.ends_with("/api/v4") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/api/v4")
    }
}

#[derive(Debug, Deserialize)]
struct GroupResponse {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct ProjectResponse {
    id: u64,
    name_with_namespace: String,
    #[serde(default)]
    archived: bool,
}

/// One hit from the blob search endpoint. GitLab puts the repository-relative
/// path of the matched file into `filename`.
#[derive(Debug, Deserialize)]
struct BlobResponse {
    #[serde(rename = "ref", default)]
    reference: String,
    filename: String,
    data: String,
    startline: u64,
}

impl From<ProjectResponse> for Project {
    fn from(raw: ProjectResponse) -> Self {
        Self {
            id: raw.id,
            name: raw.name_with_namespace,
            archived: raw.archived,
        }
    }
}

impl From<BlobResponse> for Blob {
    fn from(raw: BlobResponse) -> Self {
        Self {
            reference: raw.reference,
            path: raw.filename,
            data: raw.data,
            line: raw.startline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base_appends_suffix() {
        let url = Url::parse("https://gitlab.example.com").unwrap();
        assert_eq!(api_base(&url), "https://gitlab.example.com/api/v4");
    }

    #[test]
    fn test_api_base_trims_trailing_slash() {
        let url = Url::parse("https://gitlab.example.com/").unwrap();
        assert_eq!(api_base(&url), "https://gitlab.example.com/api/v4");
    }

    #[test]
    fn test_api_base_keeps_existing_suffix() {
        let url = Url::parse("https://gitlab.example.com/api/v4/").unwrap();
        assert_eq!(api_base(&url), "https://gitlab.example.com/api/v4");
    }

    #[test]
    fn test_new_rejects_unparsable_url() {
        let result = GitLabClient::new("not a url", "token");
        assert!(matches!(result, Err(ClientError::InvalidUrl { .. })));
    }

    #[test]
    fn test_search_refs_order() {
        assert_eq!(SEARCH_REFS, ["staging", "demo", "master"]);
    }

    #[test]
    fn test_project_response_mapping() {
        let raw: ProjectResponse = serde_json::from_str(
            r#"{
                "id": 42,
                "name": "service",
                "name_with_namespace": "my-group / service",
                "archived": true,
                "web_url": "https://gitlab.example.com/my-group/service"
            }"#,
        )
        .unwrap();
        let project = Project::from(raw);
        assert_eq!(project.id, 42);
        assert_eq!(project.name, "my-group / service");
        assert!(project.archived);
    }

    #[test]
    fn test_project_response_archived_defaults_to_false() {
        let raw: ProjectResponse =
            serde_json::from_str(r#"{"id": 1, "name_with_namespace": "g / p"}"#).unwrap();
        assert!(!Project::from(raw).archived);
    }

    #[test]
    fn test_blob_response_mapping() {
        let raw: BlobResponse = serde_json::from_str(
            r#"{
                "basename": "main",
                "data": "fn main() {}\n",
                "path": "src/main.rs",
                "filename": "src/main.rs",
                "id": null,
                "ref": "master",
                "startline": 7,
                "project_id": 42
            }"#,
        )
        .unwrap();
        let blob = Blob::from(raw);
        assert_eq!(blob.reference, "master");
        assert_eq!(blob.path, "src/main.rs");
        assert_eq!(blob.data, "fn main() {}\n");
        assert_eq!(blob.line, 7);
    }

    fn hit(reference: &str, line: u64) -> Blob {
        Blob {
            reference: reference.to_string(),
            path: format!("src/file{line}.rs"),
            data: "hit".to_string(),
            line,
        }
    }

    fn status_error(reference: &str) -> ApiError {
        ApiError::Status {
            status: reqwest::StatusCode::NOT_FOUND,
            endpoint: format!("projects/1/search?ref={reference}"),
        }
    }

    #[tokio::test]
    async fn test_collect_reference_hits_preserves_reference_order() {
        let (hits, _elapsed) =
            collect_reference_hits(1, |reference| async move { Ok(vec![hit(reference, 1)]) })
                .await;

        let refs: Vec<&str> = hits.iter().map(|b| b.reference.as_str()).collect();
        assert_eq!(refs, ["staging", "demo", "master"]);
    }

    #[tokio::test]
    async fn test_collect_reference_hits_skips_failing_reference() {
        let (hits, _elapsed) = collect_reference_hits(1, |reference| async move {
            if reference == "demo" {
                return Err(status_error(reference));
            }
            Ok(vec![hit(reference, 1), hit(reference, 2)])
        })
        .await;

        let refs: Vec<&str> = hits.iter().map(|b| b.reference.as_str()).collect();
        assert_eq!(refs, ["staging", "staging", "master", "master"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_reference_hits_times_loop_even_when_all_fail() {
        let (hits, elapsed) = collect_reference_hits(1, |reference| async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err(status_error(reference))
        })
        .await;

        assert!(hits.is_empty());
        // One 50ms call per reference, timed across the whole loop.
        assert_eq!(elapsed, Duration::from_millis(150));
    }
}
