use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Build status ──
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BuildStatus {
    Pending,
    Success,
    Failure,
    Unstable,
    Aborted,
}

impl BuildStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BuildStatus::Pending)
    }

    /// Whether this outcome retires the tracked entry from the store.
    /// UNSTABLE builds stay tracked; only the TTL reclaims them.
    pub fn retires_entry(&self) -> bool {
        matches!(
            self,
            BuildStatus::Success | BuildStatus::Failure | BuildStatus::Aborted
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Pending => "PENDING",
            BuildStatus::Success => "SUCCESS",
            BuildStatus::Failure => "FAILURE",
            BuildStatus::Unstable => "UNSTABLE",
            BuildStatus::Aborted => "ABORTED",
        }
    }
}

impl std::str::FromStr for BuildStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(BuildStatus::Pending),
            "SUCCESS" => Ok(BuildStatus::Success),
            "FAILURE" => Ok(BuildStatus::Failure),
            "UNSTABLE" => Ok(BuildStatus::Unstable),
            "ABORTED" => Ok(BuildStatus::Aborted),
            _ => Err(format!("Invalid build status: {}", s)),
        }
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Build phase (webhook lifecycle) ──
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BuildPhase {
    Started,
    Completed,
    Finalized,
}

impl BuildPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildPhase::Started => "STARTED",
            BuildPhase::Completed => "COMPLETED",
            BuildPhase::Finalized => "FINALIZED",
        }
    }
}

impl std::str::FromStr for BuildPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "STARTED" => Ok(BuildPhase::Started),
            "COMPLETED" => Ok(BuildPhase::Completed),
            "FINALIZED" => Ok(BuildPhase::Finalized),
            _ => Err(format!("Invalid build phase: {}", s)),
        }
    }
}

// ── Callback destination ──
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackInfo {
    pub channel: String,
    pub thread_id: String,
    pub user_id: String,
}

// ── Tracked job (store record) ──
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedJob {
    pub job_name: String,
    pub build_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_info: Option<CallbackInfo>,
    pub status: BuildStatus,
    /// Last-modified time, epoch milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl TrackedJob {
    pub fn new(job_name: String, build_number: u32, callback_info: Option<CallbackInfo>) -> Self {
        Self {
            job_name,
            build_number,
            callback_info,
            status: BuildStatus::Pending,
            timestamp: Utc::now().timestamp_millis(),
            details: None,
        }
    }

    /// Applies a status update. Returns false without touching the record
    /// when the current status is already terminal.
    pub fn apply_update(&mut self, status: BuildStatus, details: Option<Value>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        if details.is_some() {
            self.details = details;
        }
        self.timestamp = Utc::now().timestamp_millis();
        true
    }
}
