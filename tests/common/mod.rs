use axum::extract::{Json, Path};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use hmac::{Hmac, Mac};
use jenkins_bridge::jenkins::client::JenkinsClient;
use jenkins_bridge::{router, AppConfig, AppState};
use serde_json::{json, Value};
use sha2::Sha256;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const WEBHOOK_SECRET: &str = "it-webhook-secret";
pub const QUEUE_ID: u64 = 55;

pub struct TestContext {
    pub base_url: String,
    pub state: AppState,
    pub client: reqwest::Client,
    pub notifications: Arc<Mutex<Vec<Value>>>,
}

impl TestContext {
    /// `assign_build`: build number the mock queue item resolves to, or
    /// None for a queue item that never starts. `fail_notifications`: the
    /// downstream webhook answers 502 instead of 200.
    pub async fn new(assign_build: Option<u32>, fail_notifications: bool) -> Self {
        let jenkins_url = spawn_mock_jenkins(assign_build).await;
        let (notification_url, notifications) =
            spawn_notification_sink(fail_notifications).await;

        let config = AppConfig {
            jenkins_url: jenkins_url.clone(),
            jenkins_user: "automation".to_string(),
            notification_webhook_url: notification_url,
            jenkins_api_token: Some("it-token".to_string()),
            jenkins_password: None,
            jenkins_webhook_secret: Some(WEBHOOK_SECRET.to_string()),
            webhook_auth_bypass: false,
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
        };

        let conn = jenkins_bridge::store::connect(&config.redis_url)
            .await
            .expect("Failed to connect to test Redis");

        // Tight queue-poll timing so the deadline path is testable.
        let jenkins_client = JenkinsClient::new(
            config.jenkins_url.clone(),
            config.jenkins_user.clone(),
            "it-token".to_string(),
        )
        .with_queue_timing(Duration::from_millis(20), Duration::from_millis(300));

        let state = AppState::with_jenkins_client(conn, config, jenkins_client);

        let app = router::build(state.clone());
        let base_url = serve(app).await;

        Self {
            base_url,
            state,
            client: reqwest::Client::new(),
            notifications,
        }
    }

    pub fn sign(&self, body: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes())
            .expect("Failed to create HMAC");
        mac.update(body.as_bytes());
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    pub async fn post_webhook(&self, body: &str, signature: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/webhook/jenkins", self.base_url))
            .header("X-Hub-Signature-256", signature)
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .expect("Failed to post webhook")
    }

    pub async fn call_tool(&self, tool: &str, args: Value) -> reqwest::Response {
        self.client
            .post(format!("{}/tools/{}", self.base_url, tool))
            .json(&args)
            .send()
            .await
            .expect("Failed to call tool")
    }

    pub async fn cleanup(&self, job_name: &str, build_number: u32) {
        self.state.store.remove(job_name, build_number).await.ok();
    }
}

pub fn completed_webhook(job_name: &str, build_number: u32, status: &str) -> String {
    json!({
        "name": job_name,
        "url": format!("job/{}/", job_name),
        "build": {
            "number": build_number,
            "phase": "COMPLETED",
            "status": status,
            "url": format!("job/{}/{}/", job_name, build_number),
            "full_url": format!("http://jenkins.test/job/{}/{}/", job_name, build_number),
            "timestamp": 1712345678000i64,
            "duration": 60000,
        },
    })
    .to_string()
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr: SocketAddr = listener.local_addr().expect("No local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server died");
    });
    format!("http://{}", addr)
}

async fn spawn_mock_jenkins(assign_build: Option<u32>) -> String {
    const CONFIG_XML: &str = r#"<?xml version='1.1' encoding='UTF-8'?>
<project>
  <properties>
    <hudson.model.ParametersDefinitionProperty>
      <parameterDefinitions>
        <hudson.model.StringParameterDefinition>
          <name>TARGET_ENV</name>
          <description>Deployment target</description>
          <defaultValue>staging</defaultValue>
        </hudson.model.StringParameterDefinition>
        <hudson.model.BooleanParameterDefinition>
          <name>DRY_RUN</name>
          <defaultValue>true</defaultValue>
        </hudson.model.BooleanParameterDefinition>
      </parameterDefinitions>
    </hudson.model.ParametersDefinitionProperty>
  </properties>
</project>"#;

    async fn queued() -> impl IntoResponse {
        (
            StatusCode::CREATED,
            [(header::LOCATION, format!("/queue/item/{}/", QUEUE_ID))],
        )
    }

    let app = Router::new()
        .route(
            "/crumbIssuer/api/json",
            get(|| async { StatusCode::NOT_FOUND }),
        )
        .route("/job/{job}/build", post(queued))
        .route("/job/{job}/buildWithParameters", post(queued))
        .route(
            "/queue/item/{id}/api/json",
            get(move |Path(_id): Path<u64>| async move {
                match assign_build {
                    Some(number) => Json(json!({ "executable": { "number": number } })),
                    None => Json(json!({ "why": "Waiting for next available executor" })),
                }
            }),
        )
        .route(
            "/job/{job}/{number}/api/json",
            get(|Path((job, number)): Path<(String, u32)>| async move {
                Json(json!({
                    "result": "SUCCESS",
                    "building": false,
                    "duration": 60000,
                    "timestamp": 1712345678000i64,
                    "url": format!("http://jenkins.test/job/{}/{}/", job, number),
                }))
            }),
        )
        .route(
            "/api/json",
            get(|| async {
                Json(json!({
                    "jobs": [
                        {"name": "api-deploy", "url": "http://jenkins.test/job/api-deploy/", "color": "blue", "buildable": true},
                        {"name": "legacy-cleanup", "url": "http://jenkins.test/job/legacy-cleanup/", "color": "disabled", "buildable": false},
                        {"name": "web-frontend", "url": "http://jenkins.test/job/web-frontend/", "color": "red", "buildable": true},
                    ]
                }))
            }),
        )
        .route("/job/{job}/config.xml", get(|| async { CONFIG_XML }));

    serve(app).await
}

async fn spawn_notification_sink(fail: bool) -> (String, Arc<Mutex<Vec<Value>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let recorder = received.clone();

    let app = Router::new().route(
        "/notify",
        post(move |Json(body): Json<Value>| {
            let recorder = recorder.clone();
            async move {
                recorder.lock().await.push(body);
                if fail {
                    StatusCode::BAD_GATEWAY
                } else {
                    StatusCode::OK
                }
            }
        }),
    );

    let base_url = serve(app).await;
    (format!("{}/notify", base_url), received)
}
