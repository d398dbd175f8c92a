use crate::error::BridgeResult;
use crate::jenkins::client::{BuildInfo, JenkinsClient, JobSummary, TriggerResult};
use crate::jenkins::params::ParameterDefinition;
use crate::store::correlation::CorrelationStore;
use crate::store::models::{CallbackInfo, TrackedJob};
use std::collections::HashMap;
use tracing::{debug, info};

/// The four tool operations exposed to the automation agent.
#[derive(Clone)]
pub struct JobService {
    jenkins: JenkinsClient,
    store: CorrelationStore,
}

impl JobService {
    pub fn new(jenkins: JenkinsClient, store: CorrelationStore) -> Self {
        Self { jenkins, store }
    }

    /// Triggers a build and, when callback info is supplied, records the
    /// pending build for later webhook correlation. The entry is keyed by
    /// the assigned build number, so it can only be written after the
    /// queue poll resolves. Without callback info nothing is tracked and
    /// the eventual completion webhook is acknowledged but ignored.
    pub async fn trigger_job(
        &self,
        job_name: &str,
        parameters: HashMap<String, String>,
        callback_info: Option<CallbackInfo>,
    ) -> BridgeResult<TriggerResult> {
        let result = self.jenkins.trigger_job(job_name, &parameters).await?;

        match callback_info {
            Some(callback_info) => {
                let job = TrackedJob::new(
                    job_name.to_string(),
                    result.build_number,
                    Some(callback_info),
                );
                self.store.put(&job).await?;
                info!(
                    "Tracking {} #{} for completion notification",
                    job_name, result.build_number
                );
            }
            None => {
                debug!(
                    "No callback info for {} #{}; completion will not be tracked",
                    job_name, result.build_number
                );
            }
        }

        Ok(result)
    }

    pub async fn get_build_status(
        &self,
        job_name: &str,
        build_number: u32,
    ) -> BridgeResult<BuildInfo> {
        self.jenkins.get_build_status(job_name, build_number).await
    }

    pub async fn list_jobs(
        &self,
        filter: Option<&str>,
        include_disabled: bool,
    ) -> BridgeResult<Vec<JobSummary>> {
        self.jenkins.list_jobs(filter, include_disabled).await
    }

    pub async fn get_job_parameters(
        &self,
        job_name: &str,
    ) -> BridgeResult<Vec<ParameterDefinition>> {
        self.jenkins.get_job_parameters(job_name).await
    }
}
