use crate::error::{BridgeError, BridgeResult};
use crate::store::models::{BuildStatus, TrackedJob};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;
use tracing::{debug, warn};

/// Tracked entries live for an hour unless a webhook retires them first.
/// Every write refreshes the TTL.
pub const TRACKED_JOB_TTL_SECS: u64 = 3600;

#[derive(Clone)]
pub struct CorrelationStore {
    conn: ConnectionManager,
}

impl CorrelationStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub fn key(job_name: &str, build_number: u32) -> String {
        format!("job:{}:{}", job_name, build_number)
    }

    pub async fn put(&self, job: &TrackedJob) -> BridgeResult<()> {
        let key = Self::key(&job.job_name, job.build_number);
        let payload = serde_json::to_string(job)
            .map_err(|e| BridgeError::Internal(format!("Failed to serialize tracked job: {}", e)))?;

        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(&key, payload, TRACKED_JOB_TTL_SECS)
            .await
            .map_err(|e| BridgeError::StoreUnavailable(e.to_string()))?;

        debug!("Stored tracked job {}", key);
        Ok(())
    }

    /// Read failures degrade to "not found": a missing correlation is
    /// steady-state on the webhook path, not a fault.
    pub async fn get(&self, job_name: &str, build_number: u32) -> Option<TrackedJob> {
        let key = Self::key(job_name, build_number);
        let mut conn = self.conn.clone();

        let result: redis::RedisResult<Option<String>> = conn.get(&key).await;
        let raw = match result {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read tracked job {}: {}", key, e);
                return None;
            }
        };

        raw.and_then(|payload| match serde_json::from_str(&payload) {
            Ok(job) => Some(job),
            Err(e) => {
                warn!("Discarding corrupt tracked job entry {}: {}", key, e);
                None
            }
        })
    }

    /// Merges a status update into an existing entry. An absent entry is a
    /// no-op (the webhook arrived for an untracked build); an entry already
    /// in a terminal state is returned unchanged.
    pub async fn update_status(
        &self,
        job_name: &str,
        build_number: u32,
        status: BuildStatus,
        details: Option<Value>,
    ) -> BridgeResult<Option<TrackedJob>> {
        let Some(mut job) = self.get(job_name, build_number).await else {
            warn!(
                "Status update for untracked build {}",
                Self::key(job_name, build_number)
            );
            return Ok(None);
        };

        if !job.apply_update(status, details) {
            debug!(
                "Ignoring status update for {} already in terminal state {}",
                Self::key(job_name, build_number),
                job.status
            );
            return Ok(Some(job));
        }

        self.put(&job).await?;
        Ok(Some(job))
    }

    pub async fn remove(&self, job_name: &str, build_number: u32) -> BridgeResult<()> {
        let key = Self::key(job_name, build_number);
        let mut conn = self.conn.clone();
        // DEL of a missing key is a no-op, not an error.
        let _: () = conn
            .del(&key)
            .await
            .map_err(|e| BridgeError::StoreUnavailable(e.to_string()))?;

        debug!("Removed tracked job {}", key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        assert_eq!(CorrelationStore::key("deploy", 42), "job:deploy:42");
        assert_eq!(
            CorrelationStore::key("folder/deploy", 7),
            "job:folder/deploy:7"
        );
    }
}
