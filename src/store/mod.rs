pub mod correlation;
pub mod models;

use crate::error::{BridgeError, BridgeResult};
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use std::time::Duration;
use tracing::info;

/// Connects to the correlation store with automatic reconnection.
/// Reconnect attempts back off exponentially, capped at 30 seconds, and
/// give up after 6 tries; commands issued while disconnected fail instead
/// of hanging.
pub async fn connect(redis_url: &str) -> BridgeResult<ConnectionManager> {
    let client = redis::Client::open(redis_url)
        .map_err(|e| BridgeError::Config(format!("Invalid Redis URL: {}", e)))?;

    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(6)
        .set_exponent_base(2)
        .set_factor(500)
        .set_max_delay(30_000)
        .set_connection_timeout(Duration::from_secs(5))
        .set_response_timeout(Duration::from_secs(5));

    let conn = client
        .get_connection_manager_with_config(config)
        .await
        .map_err(|e| BridgeError::StoreUnavailable(e.to_string()))?;

    info!("Correlation store connected");
    Ok(conn)
}

pub async fn health_check(conn: &ConnectionManager) -> bool {
    let mut conn = conn.clone();
    let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
    pong.is_ok()
}
