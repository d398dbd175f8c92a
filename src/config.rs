use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    // Required
    pub jenkins_url: String,
    pub jenkins_user: String,
    pub notification_webhook_url: String,

    // Jenkins auth: API token preferred over password
    #[serde(default)]
    pub jenkins_api_token: Option<String>,
    #[serde(default)]
    pub jenkins_password: Option<String>,

    // Webhook signature verification
    #[serde(default)]
    pub jenkins_webhook_secret: Option<String>,
    #[serde(default)]
    pub webhook_auth_bypass: bool,

    // Correlation store
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    // Server
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_environment() -> String {
    "development".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let builder = config::Config::builder().add_source(
            config::Environment::default()
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// The credential sent alongside the username on every Jenkins call.
    pub fn jenkins_secret(&self) -> Option<&str> {
        self.jenkins_api_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| self.jenkins_password.as_deref().filter(|p| !p.is_empty()))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.jenkins_url.is_empty() {
            return Err("JENKINS_URL is required".to_string());
        }
        if self.jenkins_user.is_empty() {
            return Err("JENKINS_USER is required".to_string());
        }
        if self.jenkins_secret().is_none() {
            return Err("JENKINS_API_TOKEN or JENKINS_PASSWORD is required".to_string());
        }
        if self.notification_webhook_url.is_empty() {
            return Err("NOTIFICATION_WEBHOOK_URL is required".to_string());
        }
        if self.webhook_auth_bypass && self.is_production() {
            return Err("WEBHOOK_AUTH_BYPASS cannot be enabled in production".to_string());
        }

        // Without a secret every webhook is rejected (verification fails closed).
        if self
            .jenkins_webhook_secret
            .as_deref()
            .is_none_or(|s| s.is_empty())
        {
            tracing::warn!(
                "JENKINS_WEBHOOK_SECRET is not set - inbound webhooks will be rejected"
            );
        }

        Ok(())
    }
}
