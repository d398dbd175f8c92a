use crate::error::{BridgeError, BridgeResult};
use crate::store::models::{BuildStatus, CallbackInfo};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info};

/// Delivers build-outcome notifications to the downstream chat webhook.
///
/// One POST per outcome, no retries: a failed delivery is surfaced to the
/// caller rather than swallowed, so a broken notification path shows up as
/// a webhook pipeline error instead of silence.
#[derive(Clone)]
pub struct NotificationService {
    http_client: Client,
    webhook_url: String,
}

impl NotificationService {
    pub fn new(webhook_url: String) -> Self {
        // 10-second timeout bounds how long one delivery can stall.
        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http_client,
            webhook_url,
        }
    }

    pub async fn notify_build_outcome(
        &self,
        job_name: &str,
        build_number: u32,
        status: BuildStatus,
        build_url: Option<&str>,
        callback_info: &CallbackInfo,
    ) -> BridgeResult<()> {
        let payload = json!({
            "jobName": job_name,
            "buildNumber": build_number,
            "status": status,
            "buildUrl": build_url,
            "callbackInfo": callback_info,
        });

        debug!(
            "Delivering notification for {} #{} to channel {}",
            job_name, build_number, callback_info.channel
        );

        let response = self
            .http_client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!("Notification delivery failed (network): {}", e);
                BridgeError::NotificationFailed {
                    status: None,
                    message: e.to_string(),
                }
            })?;

        if !response.status().is_success() {
            let status_code = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                "Notification delivery failed (HTTP {}): {}",
                status_code, body
            );
            return Err(BridgeError::NotificationFailed {
                status: Some(status_code.as_u16()),
                message: body,
            });
        }

        info!(
            "Notification delivered for {} #{} ({})",
            job_name, build_number, status
        );
        Ok(())
    }
}
