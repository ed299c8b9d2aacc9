//! Asana REST client with transparent rate-limit handling and pagination.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::error::{parse_retry_after, AsanaError, DEFAULT_RETRY_AFTER};
use super::types::{DataEnvelope, Page, Project, Subtask, Tag, Task};
use crate::config::{Config, DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE};

/// Fields requested for every subtask.
const SUBTASK_FIELDS: &str = "name,completed,due_on,due_at";

/// How the client reacts to 429 responses.
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    /// Wait used when `Retry-After` is missing or unparsable.
    pub default_wait: Duration,
    /// Give up after this many consecutive 429s for one request. `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            default_wait: DEFAULT_RETRY_AFTER,
            max_retries: None,
        }
    }
}

/// Asana API client.
///
/// Requests are issued one at a time by the caller; the client keeps no state besides
/// the credential and a counter of rate-limit sleeps.
pub struct AsanaClient {
    client: Client,
    base_url: String,
    auth_header: String,
    page_size: u32,
    rate_limit: RateLimitPolicy,
    rate_limit_waits: AtomicU64,
}

impl AsanaClient {
    /// Create a client against the public Asana API.
    pub fn new(access_token: &str) -> Self {
        Self::with_base_url(access_token, DEFAULT_BASE_URL)
    }

    /// Create a client against an arbitrary API root (mock servers, proxies).
    pub fn with_base_url(access_token: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header: format!("Bearer {}", access_token),
            page_size: DEFAULT_PAGE_SIZE,
            rate_limit: RateLimitPolicy::default(),
            rate_limit_waits: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_base_url(&config.access_token, &config.base_url)
            .with_page_size(config.page_size)
            .with_rate_limit_policy(RateLimitPolicy {
                max_retries: config.max_rate_limit_retries,
                ..RateLimitPolicy::default()
            })
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, 100);
        self
    }

    pub fn with_rate_limit_policy(mut self, policy: RateLimitPolicy) -> Self {
        self.rate_limit = policy;
        self
    }

    /// Number of times the client slept because of a 429 since it was created.
    pub fn rate_limit_waits(&self) -> u64 {
        self.rate_limit_waits.load(Ordering::Relaxed)
    }

    /// Absolute URLs (next-page pointers) are used as-is; paths are joined to the base URL.
    fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }

    // ==================== Access layer ====================

    /// Issue a request and return the parsed JSON body.
    ///
    /// A 429 sleeps for `Retry-After` seconds (default 5) and replays the identical
    /// request. With no retry cap configured this loops for as long as the server keeps
    /// answering 429. Any other non-2xx status is returned as `AsanaError::Api`.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, AsanaError> {
        let url = self.resolve_url(url);
        let mut attempts: u32 = 0;

        loop {
            let mut builder = self
                .client
                .request(method.clone(), &url)
                .header(AUTHORIZATION, &self.auth_header)
                .header(ACCEPT, "application/json");
            if !params.is_empty() {
                builder = builder.query(params);
            }
            if let Some(body) = body {
                builder = builder.json(body);
            }

            let response = builder.send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                attempts += 1;
                if let Some(max) = self.rate_limit.max_retries {
                    if attempts > max {
                        tracing::error!(
                            "{} {} still rate limited after {} attempts",
                            method,
                            url,
                            attempts
                        );
                        return Err(AsanaError::RateLimitExhausted { attempts });
                    }
                }

                let wait =
                    parse_retry_after(response.headers()).unwrap_or(self.rate_limit.default_wait);
                tracing::warn!(
                    "Rate limited on {} {} (attempt {}), retrying in {:?}",
                    method,
                    url,
                    attempts,
                    wait
                );
                self.rate_limit_waits.fetch_add(1, Ordering::Relaxed);
                tokio::time::sleep(wait).await;
                continue;
            }

            let text = response.text().await?;

            if !status.is_success() {
                let err = AsanaError::from_response(status.as_u16(), &text);
                tracing::error!("{} {} failed: {}", method, url, err);
                return Err(err);
            }

            if attempts > 0 {
                tracing::debug!(
                    "{} {} succeeded after {} rate-limit retries",
                    method,
                    url,
                    attempts
                );
            }

            if text.trim().is_empty() {
                return Ok(Value::Null);
            }

            return serde_json::from_str(&text).map_err(|e| AsanaError::Decode {
                url: url.clone(),
                message: e.to_string(),
            });
        }
    }

    async fn request_typed<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<T, AsanaError> {
        let value = self.request(method, url, params, body).await?;
        serde_json::from_value(value).map_err(|e| AsanaError::Decode {
            url: self.resolve_url(url),
            message: e.to_string(),
        })
    }

    // ==================== Pagination ====================

    /// Fetch a single page of a listing.
    pub async fn fetch_page<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<Page<T>, AsanaError> {
        self.request_typed(Method::GET, url, params, None).await
    }

    /// Walk a paged listing to the end and return every record in response order.
    ///
    /// `params` go with the first request only; next-page URIs already carry them.
    pub async fn list_all<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, AsanaError> {
        let mut records = Vec::new();
        let mut pages = 1;
        let mut page: Page<T> = self.fetch_page(url, params).await?;

        loop {
            let Page { data, next_page } = page;
            records.extend(data);

            match next_page {
                Some(next) => {
                    page = self.fetch_page(&next.uri, &[]).await?;
                    pages += 1;
                }
                None => break,
            }
        }

        tracing::debug!("Fetched {} records in {} page(s) from {}", records.len(), pages, url);
        Ok(records)
    }

    /// Query parameters for the first page of a listing.
    pub fn listing_params(&self, opt_fields: &str) -> Vec<(&'static str, String)> {
        vec![
            ("limit", self.page_size.to_string()),
            ("opt_fields", opt_fields.to_string()),
        ]
    }

    // ==================== Projects & workspaces ====================

    /// Resolve the workspace a project belongs to.
    pub async fn project_workspace(&self, project_gid: &str) -> Result<String, AsanaError> {
        let project: DataEnvelope<Project> = self
            .request_typed(
                Method::GET,
                &format!("projects/{}", project_gid),
                &[("opt_fields", "workspace,workspace.name".to_string())],
                None,
            )
            .await?;
        Ok(project.data.workspace.gid)
    }

    // ==================== Tags ====================

    pub async fn list_workspace_tags(&self, workspace_gid: &str) -> Result<Vec<Tag>, AsanaError> {
        self.list_all(
            &format!("workspaces/{}/tags", workspace_gid),
            &self.listing_params("name"),
        )
        .await
    }

    pub async fn create_tag(&self, workspace_gid: &str, name: &str) -> Result<Tag, AsanaError> {
        let body = json!({
            "data": {
                "name": name,
                "workspace": workspace_gid
            }
        });
        let tag: DataEnvelope<Tag> = self
            .request_typed(Method::POST, "tags", &[], Some(&body))
            .await?;
        Ok(tag.data)
    }

    // ==================== Tasks ====================

    /// List the tasks of a project with the given `opt_fields`.
    ///
    /// With `include_completed = false` only incomplete tasks are returned.
    pub async fn list_project_tasks(
        &self,
        project_gid: &str,
        opt_fields: &str,
        include_completed: bool,
    ) -> Result<Vec<Task>, AsanaError> {
        let mut params = self.listing_params(opt_fields);
        if !include_completed {
            params.push(("completed_since", "now".to_string()));
        }
        self.list_all(&format!("projects/{}/tasks", project_gid), &params)
            .await
    }

    /// First page of a task's subtasks. Follow `next_page` with [`Self::fetch_page`].
    pub async fn first_subtask_page(&self, task_gid: &str) -> Result<Page<Subtask>, AsanaError> {
        self.fetch_page(
            &format!("tasks/{}/subtasks", task_gid),
            &self.listing_params(SUBTASK_FIELDS),
        )
        .await
    }

    pub async fn add_tag(&self, task_gid: &str, tag_gid: &str) -> Result<(), AsanaError> {
        let body = json!({ "data": { "tag": tag_gid } });
        self.request(Method::POST, &format!("tasks/{}/addTag", task_gid), &[], Some(&body))
            .await?;
        Ok(())
    }

    pub async fn remove_tag(&self, task_gid: &str, tag_gid: &str) -> Result<(), AsanaError> {
        let body = json!({ "data": { "tag": tag_gid } });
        self.request(Method::POST, &format!("tasks/{}/removeTag", task_gid), &[], Some(&body))
            .await?;
        Ok(())
    }

    /// `PUT /tasks/{gid}` with `fields` as the `data` object.
    pub async fn update_task(&self, task_gid: &str, fields: Value) -> Result<(), AsanaError> {
        let body = json!({ "data": fields });
        self.request(Method::PUT, &format!("tasks/{}", task_gid), &[], Some(&body))
            .await?;
        Ok(())
    }

    /// Post a comment (story) on a task.
    pub async fn add_comment(&self, task_gid: &str, text: &str) -> Result<(), AsanaError> {
        let body = json!({ "data": { "text": text } });
        self.request(Method::POST, &format!("tasks/{}/stories", task_gid), &[], Some(&body))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let client = AsanaClient::with_base_url("t", "http://localhost:1234/api/1.0/");
        assert_eq!(client.resolve_url("tasks/1"), "http://localhost:1234/api/1.0/tasks/1");
        assert_eq!(client.resolve_url("/tasks/1"), "http://localhost:1234/api/1.0/tasks/1");
        assert_eq!(
            client.resolve_url("https://app.asana.com/api/1.0/tasks?offset=x"),
            "https://app.asana.com/api/1.0/tasks?offset=x"
        );
    }

    #[test]
    fn test_listing_params_use_page_size() {
        let client = AsanaClient::new("t").with_page_size(500);
        let params = client.listing_params("name");
        assert_eq!(params[0], ("limit", "100".to_string()));
        assert_eq!(params[1], ("opt_fields", "name".to_string()));
    }
}
