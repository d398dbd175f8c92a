use crate::app_state::AppState;
use crate::error::{BridgeError, BridgeResult};
use crate::store::models::{BuildPhase, BuildStatus};
use crate::webhook::verification::{verify_webhook_signature, webhook_auth_bypass};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info};

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    pub build: BuildPayload,
}

#[derive(Debug, Deserialize)]
pub struct BuildPayload {
    pub number: i64,
    pub phase: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub full_url: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub duration: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub success: bool,
    pub message: String,
    pub job_name: String,
    pub build_number: u32,
    pub phase: String,
}

#[derive(Debug)]
struct ValidatedWebhook {
    job_name: String,
    build_number: u32,
    phase: BuildPhase,
    status: Option<BuildStatus>,
}

pub async fn handle_jenkins_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    // Verification runs over the raw body exactly as received; parsing
    // happens only after the signature checks out.
    let signature = headers
        .get("X-Hub-Signature-256")
        .or_else(|| headers.get("X-Hub-Signature"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let bypass = state.config.webhook_auth_bypass && webhook_auth_bypass(&state.config.environment);
    if !bypass {
        let secret = state.config.jenkins_webhook_secret.as_deref().unwrap_or("");
        if !verify_webhook_signature(secret, &body, signature) {
            error!("Webhook signature verification failed");
            return BridgeError::InvalidSignature.into_response();
        }
    }

    match process_webhook(&state, &body).await {
        Ok(ack) => (StatusCode::OK, Json(ack)).into_response(),
        Err(e) => {
            error!("Webhook processing failed: {}", e);
            e.into_response()
        }
    }
}

async fn process_webhook(state: &AppState, body: &str) -> BridgeResult<WebhookAck> {
    let payload: WebhookPayload = serde_json::from_str(body).map_err(|e| {
        BridgeError::Validation {
            field: "body".to_string(),
            reason: e.to_string(),
        }
    })?;
    let validated = validate_payload(&payload)?;

    let ack = |message: &str| WebhookAck {
        success: true,
        message: message.to_string(),
        job_name: validated.job_name.clone(),
        build_number: validated.build_number,
        phase: validated.phase.as_str().to_string(),
    };

    // Only terminal outcomes are acted on; STARTED/FINALIZED phases are
    // acknowledged and dropped so a build produces exactly one notification.
    let status = match (validated.phase, validated.status) {
        (BuildPhase::Completed, Some(status)) => status,
        _ => {
            debug!(
                "Ignoring webhook for {} #{} in phase {}",
                validated.job_name,
                validated.build_number,
                validated.phase.as_str()
            );
            return Ok(ack("Phase ignored"));
        }
    };

    let Some(tracked) = state
        .store
        .get(&validated.job_name, validated.build_number)
        .await
    else {
        // Expected when the trigger carried no callback info.
        info!(
            "No tracked job for {} #{}; acknowledging without notification",
            validated.job_name, validated.build_number
        );
        return Ok(ack("Build not tracked"));
    };

    let Some(callback_info) = tracked.callback_info else {
        debug!(
            "Tracked job {} #{} has no callback info; skipping notification",
            validated.job_name, validated.build_number
        );
        return Ok(ack("No callback configured"));
    };

    let build_url = payload
        .build
        .full_url
        .as_deref()
        .or(payload.build.url.as_deref());

    // A delivery failure fails the whole request and leaves the store
    // untouched, so a redelivered webhook can retry the notification.
    state
        .notifier
        .notify_build_outcome(
            &validated.job_name,
            validated.build_number,
            status,
            build_url,
            &callback_info,
        )
        .await?;

    let details = json!({
        "duration": payload.build.duration,
        "timestamp": payload.build.timestamp,
    });
    state
        .store
        .update_status(
            &validated.job_name,
            validated.build_number,
            status,
            Some(details),
        )
        .await?;

    if status.retires_entry() {
        state
            .store
            .remove(&validated.job_name, validated.build_number)
            .await?;
    }

    Ok(ack("Build outcome processed"))
}

fn validate_payload(payload: &WebhookPayload) -> BridgeResult<ValidatedWebhook> {
    if payload.name.is_empty() {
        return Err(BridgeError::Validation {
            field: "name".to_string(),
            reason: "job name must not be empty".to_string(),
        });
    }

    if payload.build.number < 1 || payload.build.number > u32::MAX as i64 {
        return Err(BridgeError::Validation {
            field: "build.number".to_string(),
            reason: format!("invalid build number: {}", payload.build.number),
        });
    }
    let build_number = payload.build.number as u32;

    let phase: BuildPhase =
        payload
            .build
            .phase
            .parse()
            .map_err(|reason| BridgeError::Validation {
                field: "build.phase".to_string(),
                reason,
            })?;

    let status = match payload.build.status.as_deref() {
        None => None,
        Some(raw) => {
            let status: BuildStatus = raw.parse().map_err(|reason| BridgeError::Validation {
                field: "build.status".to_string(),
                reason,
            })?;
            if !status.is_terminal() {
                return Err(BridgeError::Validation {
                    field: "build.status".to_string(),
                    reason: format!("expected a terminal status, got {}", status),
                });
            }
            Some(status)
        }
    };

    Ok(ValidatedWebhook {
        job_name: payload.name.clone(),
        build_number,
        phase,
        status,
    })
}
