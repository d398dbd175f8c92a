use crate::error::{BridgeError, BridgeResult};
use crate::jenkins::params::{self, ParameterDefinition};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info};

const QUEUE_POLL_INTERVAL: Duration = Duration::from_secs(1);
const QUEUE_POLL_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct JenkinsClient {
    http_client: Client,
    base_url: String,
    user: String,
    secret: String,
    queue_poll_interval: Duration,
    queue_poll_deadline: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerResult {
    pub build_number: u32,
    pub queue_id: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub status: String,
    pub duration: i64,
    pub timestamp: i64,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub buildable: Option<bool>,
}

impl JobSummary {
    pub fn is_disabled(&self) -> bool {
        self.color.as_deref() == Some("disabled")
    }
}

#[derive(Debug, Deserialize)]
struct QueueItem {
    #[serde(default)]
    executable: Option<QueueExecutable>,
    #[serde(default)]
    cancelled: bool,
}

#[derive(Debug, Deserialize)]
struct QueueExecutable {
    number: u32,
}

#[derive(Debug, Deserialize)]
struct BuildJson {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    building: bool,
    #[serde(default)]
    duration: i64,
    #[serde(default)]
    timestamp: i64,
    #[serde(default)]
    url: String,
}

#[derive(Debug, Deserialize)]
struct JobListing {
    #[serde(default)]
    jobs: Vec<JobSummary>,
}

#[derive(Debug, Deserialize)]
struct Crumb {
    crumb: String,
    #[serde(rename = "crumbRequestField")]
    crumb_request_field: String,
}

impl JenkinsClient {
    pub fn new(base_url: String, user: String, secret: String) -> Self {
        // Bounded timeout so a stalled Jenkins cannot hang requests.
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user,
            secret,
            queue_poll_interval: QUEUE_POLL_INTERVAL,
            queue_poll_deadline: QUEUE_POLL_DEADLINE,
        }
    }

    pub fn with_queue_timing(mut self, interval: Duration, deadline: Duration) -> Self {
        self.queue_poll_interval = interval;
        self.queue_poll_deadline = deadline;
        self
    }

    /// Triggers a build and waits for Jenkins to assign a build number.
    ///
    /// The build endpoint only returns a transient queue id; the build
    /// number appears on the queue item once a worker picks the request
    /// up, so the queue item is polled until `executable` shows up. On
    /// deadline the error still carries the queue id - the build may have
    /// started anyway.
    pub async fn trigger_job(
        &self,
        job_name: &str,
        parameters: &HashMap<String, String>,
    ) -> BridgeResult<TriggerResult> {
        let action = if parameters.is_empty() {
            "build"
        } else {
            "buildWithParameters"
        };
        let url = format!("{}/{}/{}", self.base_url, job_path(job_name), action);

        debug!("Triggering Jenkins job: {}", url);

        let mut request = self
            .http_client
            .post(&url)
            .basic_auth(&self.user, Some(&self.secret));
        if !parameters.is_empty() {
            request = request.query(parameters);
        }
        if let Some(crumb) = self.fetch_crumb().await {
            request = request.header(crumb.crumb_request_field, crumb.crumb);
        }

        let response = request.send().await.map_err(transport_error)?;
        let response = ensure_success(response).await?;

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let queue_id = parse_queue_id(location).ok_or_else(|| BridgeError::JenkinsApi {
            status: None,
            message: format!("Build queued but Location header has no queue id: {:?}", location),
        })?;

        let build_number = self.wait_for_build_number(queue_id).await?;

        info!(
            "Triggered {} #{} (queue item {})",
            job_name, build_number, queue_id
        );
        Ok(TriggerResult {
            build_number,
            queue_id,
        })
    }

    async fn wait_for_build_number(&self, queue_id: u64) -> BridgeResult<u32> {
        let deadline = tokio::time::Instant::now() + self.queue_poll_deadline;

        loop {
            let url = format!("{}/queue/item/{}/api/json", self.base_url, queue_id);
            let response = self
                .http_client
                .get(&url)
                .basic_auth(&self.user, Some(&self.secret))
                .send()
                .await
                .map_err(transport_error)?;
            let response = ensure_success(response).await?;
            let item: QueueItem = response.json().await.map_err(transport_error)?;

            if item.cancelled {
                return Err(BridgeError::JenkinsApi {
                    status: None,
                    message: format!("Queue item {} was cancelled", queue_id),
                });
            }
            if let Some(executable) = item.executable {
                return Ok(executable.number);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BridgeError::QueueTimeout { queue_id });
            }

            tokio::time::sleep(self.queue_poll_interval).await;
        }
    }

    pub async fn get_build_status(
        &self,
        job_name: &str,
        build_number: u32,
    ) -> BridgeResult<BuildInfo> {
        let url = format!(
            "{}/{}/{}/api/json",
            self.base_url,
            job_path(job_name),
            build_number
        );

        let response = self
            .http_client
            .get(&url)
            .basic_auth(&self.user, Some(&self.secret))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(BridgeError::NotFound(format!(
                "{} #{}",
                job_name, build_number
            )));
        }

        let response = ensure_success(response).await?;
        let build: BuildJson = response.json().await.map_err(transport_error)?;

        Ok(BuildInfo {
            status: derive_status(build.result.as_deref(), build.building),
            duration: build.duration,
            timestamp: build.timestamp,
            url: build.url,
        })
    }

    pub async fn list_jobs(
        &self,
        filter: Option<&str>,
        include_disabled: bool,
    ) -> BridgeResult<Vec<JobSummary>> {
        let url = format!(
            "{}/api/json?tree=jobs[name,url,buildable,color]",
            self.base_url
        );

        let response = self
            .http_client
            .get(&url)
            .basic_auth(&self.user, Some(&self.secret))
            .send()
            .await
            .map_err(transport_error)?;
        let response = ensure_success(response).await?;
        let listing: JobListing = response.json().await.map_err(transport_error)?;

        Ok(filter_jobs(listing.jobs, filter, include_disabled))
    }

    pub async fn get_job_parameters(
        &self,
        job_name: &str,
    ) -> BridgeResult<Vec<ParameterDefinition>> {
        let url = format!("{}/{}/config.xml", self.base_url, job_path(job_name));

        let response = self
            .http_client
            .get(&url)
            .basic_auth(&self.user, Some(&self.secret))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(BridgeError::NotFound(job_name.to_string()));
        }

        let response = ensure_success(response).await?;
        let config_xml = response.text().await.map_err(transport_error)?;

        Ok(params::extract_parameters(&config_xml))
    }

    /// CSRF crumb for POST requests. Any failure degrades to no crumb:
    /// instances with CSRF disabled return 404 here, and API-token auth
    /// does not need one.
    async fn fetch_crumb(&self) -> Option<Crumb> {
        let url = format!("{}/crumbIssuer/api/json", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .basic_auth(&self.user, Some(&self.secret))
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            debug!("No CSRF crumb available ({})", response.status());
            return None;
        }

        response.json().await.ok()
    }
}

/// Maps a job name to its URL path; `/` in the name denotes folder nesting,
/// so `a/b` becomes `job/a/job/b`.
fn job_path(job_name: &str) -> String {
    let segments: Vec<&str> = job_name.split('/').filter(|s| !s.is_empty()).collect();
    format!("job/{}", segments.join("/job/"))
}

fn parse_queue_id(location: &str) -> Option<u64> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()?
        .parse()
        .ok()
}

fn derive_status(result: Option<&str>, building: bool) -> String {
    match result {
        Some(result) if !result.is_empty() => result.to_string(),
        _ if building => "RUNNING".to_string(),
        _ => "PENDING".to_string(),
    }
}

fn filter_jobs(
    jobs: Vec<JobSummary>,
    filter: Option<&str>,
    include_disabled: bool,
) -> Vec<JobSummary> {
    let needle = filter.map(str::to_lowercase);
    jobs.into_iter()
        .filter(|job| include_disabled || !job.is_disabled())
        .filter(|job| match &needle {
            Some(needle) => job.name.to_lowercase().contains(needle),
            None => true,
        })
        .collect()
}

fn transport_error(e: reqwest::Error) -> BridgeError {
    BridgeError::JenkinsApi {
        status: None,
        message: e.to_string(),
    }
}

async fn ensure_success(response: reqwest::Response) -> BridgeResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    error!("Jenkins API error ({}): {}", status, body);
    Err(BridgeError::JenkinsApi {
        status: Some(status.as_u16()),
        message: format!("HTTP {}: {}", status, body),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(name: &str, color: &str) -> JobSummary {
        JobSummary {
            name: name.to_string(),
            url: format!("https://jenkins.example.com/job/{}/", name),
            color: Some(color.to_string()),
            buildable: Some(color != "disabled"),
        }
    }

    #[test]
    fn test_job_path_simple_and_nested() {
        assert_eq!(job_path("deploy"), "job/deploy");
        assert_eq!(job_path("folder/deploy"), "job/folder/job/deploy");
        assert_eq!(job_path("a/b/c"), "job/a/job/b/job/c");
    }

    #[test]
    fn test_parse_queue_id_from_location() {
        assert_eq!(
            parse_queue_id("https://jenkins.example.com/queue/item/123/"),
            Some(123)
        );
        assert_eq!(
            parse_queue_id("https://jenkins.example.com/queue/item/7"),
            Some(7)
        );
        assert_eq!(parse_queue_id(""), None);
        assert_eq!(parse_queue_id("https://jenkins.example.com/queue/"), None);
    }

    #[test]
    fn test_derive_status_prefers_terminal_result() {
        assert_eq!(derive_status(Some("SUCCESS"), false), "SUCCESS");
        assert_eq!(derive_status(Some("FAILURE"), true), "FAILURE");
        assert_eq!(derive_status(Some("UNSTABLE"), false), "UNSTABLE");
    }

    #[test]
    fn test_derive_status_running_and_pending() {
        assert_eq!(derive_status(None, true), "RUNNING");
        assert_eq!(derive_status(Some(""), true), "RUNNING");
        assert_eq!(derive_status(None, false), "PENDING");
    }

    #[test]
    fn test_filter_jobs_excludes_disabled_by_default() {
        let jobs = vec![job("api-deploy", "blue"), job("legacy", "disabled")];
        let filtered = filter_jobs(jobs, None, false);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "api-deploy");
    }

    #[test]
    fn test_filter_jobs_can_include_disabled() {
        let jobs = vec![job("api-deploy", "blue"), job("legacy", "disabled")];
        let filtered = filter_jobs(jobs, None, true);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_filter_jobs_substring_is_case_insensitive() {
        let jobs = vec![
            job("API-deploy", "blue"),
            job("web-frontend", "red"),
            job("internal-api", "blue"),
        ];
        let filtered = filter_jobs(jobs, Some("api"), false);
        let names: Vec<&str> = filtered.iter().map(|j| j.name.as_str()).collect();
        assert_eq!(names, vec!["API-deploy", "internal-api"]);
    }

    #[test]
    fn test_filter_applies_after_disabled_filter() {
        let jobs = vec![job("api-deploy", "disabled"), job("api-test", "blue")];
        let filtered = filter_jobs(jobs, Some("api"), false);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "api-test");
    }
}
