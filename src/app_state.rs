use crate::config::AppConfig;
use crate::jenkins::client::JenkinsClient;
use crate::services::jobs::JobService;
use crate::services::notification::NotificationService;
use crate::store::correlation::CorrelationStore;
use redis::aio::ConnectionManager;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub conn: ConnectionManager,
    pub store: CorrelationStore,
    pub config: Arc<AppConfig>,
    pub notifier: NotificationService,
    pub jobs: JobService,
}

impl AppState {
    pub fn new(conn: ConnectionManager, config: AppConfig) -> Self {
        let jenkins = JenkinsClient::new(
            config.jenkins_url.clone(),
            config.jenkins_user.clone(),
            config.jenkins_secret().unwrap_or_default().to_string(),
        );
        Self::with_jenkins_client(conn, config, jenkins)
    }

    pub fn with_jenkins_client(
        conn: ConnectionManager,
        config: AppConfig,
        jenkins: JenkinsClient,
    ) -> Self {
        let store = CorrelationStore::new(conn.clone());
        let notifier = NotificationService::new(config.notification_webhook_url.clone());
        let jobs = JobService::new(jenkins, store.clone());
        Self {
            conn,
            store,
            config: Arc::new(config),
            notifier,
            jobs,
        }
    }
}
