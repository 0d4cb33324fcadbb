//! Publishing rewritten lists to a GitHub repository.
//!
//! Uses the git data API so several files land in a single commit:
//! read the branch ref, read its commit's tree, create one blob per file,
//! create a tree on top of the base tree, create the commit, move the ref.

use std::path::PathBuf;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::{DEFAULT_USER_AGENT, GITHUB_API_URL, GITHUB_REQUEST_TIMEOUT};
use crate::error_handling::PublishError;

/// A local file and where it goes in the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishFile {
    pub local_path: PathBuf,
    pub remote_path: String,
}

impl PublishFile {
    pub fn new(local_path: impl Into<PathBuf>, remote_path: impl Into<String>) -> Self {
        Self {
            local_path: local_path.into(),
            remote_path: remote_path.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct TreeItem<'a> {
    path: &'a str,
    mode: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    sha: String,
}

/// Commits files to one branch of one repository.
#[derive(Debug, Clone)]
pub struct GitHubPublisher {
    client: reqwest::Client,
    api_base: String,
    owner: String,
    repo: String,
    branch: String,
}

impl GitHubPublisher {
    /// Creates a publisher authenticated with `token`.
    ///
    /// # Errors
    ///
    /// `PublishError::MissingToken` for an empty or absent token, or an HTTP
    /// error if the client cannot be built.
    pub fn new(
        owner: &str,
        repo: &str,
        branch: &str,
        token: Option<&str>,
    ) -> Result<Self, PublishError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(PublishError::MissingToken)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(DEFAULT_USER_AGENT),
        );
        let mut auth = HeaderValue::from_str(&format!("token {}", token))
            .map_err(|_| PublishError::MissingToken)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .timeout(GITHUB_REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_base: GITHUB_API_URL.to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: branch.to_string(),
        })
    }

    /// Points the publisher at another API root (GitHub Enterprise).
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/git/{}",
            self.api_base, self.owner, self.repo, path
        )
    }

    async fn call(
        &self,
        step: &'static str,
        method: Method,
        url: String,
        body: Option<Value>,
        expected: StatusCode,
    ) -> Result<Value, PublishError> {
        log::debug!("GitHub {} {} ({})", method, url, step);
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status();
        if status != expected {
            return Err(PublishError::UnexpectedStatus {
                step,
                status: status.as_u16(),
            });
        }
        Ok(response.json::<Value>().await?)
    }

    /// Commits `files` to the branch with `message`.
    ///
    /// # Returns
    ///
    /// The new commit's SHA.
    ///
    /// # Errors
    ///
    /// Returns a `PublishError` naming the API step that failed, or the file
    /// that could not be read. Nothing is committed on error; blobs or trees
    /// created before the failure are left unreferenced.
    pub async fn publish(
        &self,
        files: &[PublishFile],
        message: &str,
    ) -> Result<String, PublishError> {
        let ref_url = self.repo_url(&format!("refs/heads/{}", self.branch));

        let head = self
            .call("read ref", Method::GET, ref_url.clone(), None, StatusCode::OK)
            .await?;
        let parent_sha = sha_at(&head, &["object", "sha"], "read ref", "object.sha")?;

        let commit = self
            .call(
                "read commit",
                Method::GET,
                self.repo_url(&format!("commits/{}", parent_sha)),
                None,
                StatusCode::OK,
            )
            .await?;
        let base_tree = sha_at(&commit, &["tree", "sha"], "read commit", "tree.sha")?;

        let mut tree = Vec::with_capacity(files.len());
        for file in files {
            let content = std::fs::read_to_string(&file.local_path).map_err(|source| {
                PublishError::ReadFile {
                    path: file.local_path.display().to_string(),
                    source,
                }
            })?;
            let blob = self
                .call(
                    "create blob",
                    Method::POST,
                    self.repo_url("blobs"),
                    Some(json!({ "content": content, "encoding": "utf-8" })),
                    StatusCode::CREATED,
                )
                .await?;
            log::info!(
                "Uploaded {} -> {}",
                file.local_path.display(),
                file.remote_path
            );
            tree.push(TreeItem {
                path: &file.remote_path,
                mode: "100644",
                kind: "blob",
                sha: sha_at(&blob, &["sha"], "create blob", "sha")?,
            });
        }

        let new_tree = self
            .call(
                "create tree",
                Method::POST,
                self.repo_url("trees"),
                Some(json!({ "base_tree": base_tree, "tree": tree })),
                StatusCode::CREATED,
            )
            .await?;
        let tree_sha = sha_at(&new_tree, &["sha"], "create tree", "sha")?;

        let new_commit = self
            .call(
                "create commit",
                Method::POST,
                self.repo_url("commits"),
                Some(json!({ "message": message, "tree": tree_sha, "parents": [parent_sha] })),
                StatusCode::CREATED,
            )
            .await?;
        let commit_sha = sha_at(&new_commit, &["sha"], "create commit", "sha")?;

        self.call(
            "update ref",
            Method::PATCH,
            ref_url,
            Some(json!({ "sha": commit_sha })),
            StatusCode::OK,
        )
        .await?;

        log::info!(
            "Published {} file(s) to {}/{}@{} as {}",
            files.len(),
            self.owner,
            self.repo,
            self.branch,
            short_sha(&commit_sha)
        );
        Ok(commit_sha)
    }
}

fn sha_at(
    value: &Value,
    path: &[&str],
    step: &'static str,
    field: &'static str,
) -> Result<String, PublishError> {
    path.iter()
        .try_fold(value, |v, key| v.get(key))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(PublishError::MissingField { step, field })
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

/// Commit message for a refresh that rewrote `updated` lines.
pub fn commit_message(updated: usize, source_url: &str) -> String {
    format!(
        "Update DNSCrypt server lists\n\n- Updated entries: {}\n- Refreshed at: {}\n- Source: {}",
        updated,
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        source_url
    )
}
