use crate::app_state::AppState;
use crate::store::models::CallbackInfo;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerJobRequest {
    pub job_name: String,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
    #[serde(default)]
    pub callback_info: Option<CallbackInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStatusRequest {
    pub job_name: String,
    pub build_number: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListJobsRequest {
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub include_disabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobParametersRequest {
    pub job_name: String,
}

pub async fn trigger_job(
    State(state): State<AppState>,
    Json(request): Json<TriggerJobRequest>,
) -> Response {
    debug!("Tool call: trigger_job {}", request.job_name);
    match state
        .jobs
        .trigger_job(&request.job_name, request.parameters, request.callback_info)
        .await
    {
        Ok(result) => Json(json!({
            "buildNumber": result.build_number,
            "queueId": result.queue_id,
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_build_status(
    State(state): State<AppState>,
    Json(request): Json<BuildStatusRequest>,
) -> Response {
    debug!(
        "Tool call: get_build_status {} #{}",
        request.job_name, request.build_number
    );
    match state
        .jobs
        .get_build_status(&request.job_name, request.build_number)
        .await
    {
        Ok(info) => Json(info).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Json(request): Json<ListJobsRequest>,
) -> Response {
    debug!("Tool call: list_jobs");
    match state
        .jobs
        .list_jobs(request.filter.as_deref(), request.include_disabled)
        .await
    {
        Ok(jobs) => Json(json!({ "jobs": jobs })).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_job_parameters(
    State(state): State<AppState>,
    Json(request): Json<JobParametersRequest>,
) -> Response {
    debug!("Tool call: get_job_parameters {}", request.job_name);
    match state.jobs.get_job_parameters(&request.job_name).await {
        Ok(parameters) => Json(json!({ "parameters": parameters })).into_response(),
        Err(e) => e.into_response(),
    }
}
