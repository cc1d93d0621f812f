use clap::Parser;

pub const DEFAULT_OWNER_LABEL_KEY: &str = "owner";
pub const DEFAULT_OWNER_LABEL_VALUE: &str = "edc-my-credentials";
pub const DEFAULT_ENV_ANNOTATION_PREFIX: &str = "eoxhub-env-";

#[derive(Debug, Parser, Clone)]
pub struct SentryConfig {
    #[arg(long, env = "SENTRY_DSN", default_value = "")]
    pub dsn: String,

    #[arg(long, env = "SENTRY_SAMPLE_RATE", default_value = "0.0")]
    pub sample_rate: f32,
}

#[derive(Debug, Parser, Clone, PartialEq, Eq)]
pub struct CredentialsConfig {
    /// Namespace to manage. Defaults to the service account's namespace.
    #[arg(long, env = "MY_CREDENTIALS_NAMESPACE")]
    pub namespace: Option<String>,

    #[arg(long, env = "MY_CREDENTIALS_OWNER_LABEL_KEY", default_value = DEFAULT_OWNER_LABEL_KEY)]
    pub owner_label_key: String,

    #[arg(long, env = "MY_CREDENTIALS_OWNER_LABEL_VALUE", default_value = DEFAULT_OWNER_LABEL_VALUE)]
    pub owner_label_value: String,

    #[arg(long, env = "MY_CREDENTIALS_ENV_ANNOTATION_PREFIX", default_value = DEFAULT_ENV_ANNOTATION_PREFIX)]
    pub env_annotation_prefix: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            owner_label_key: DEFAULT_OWNER_LABEL_KEY.to_string(),
            owner_label_value: DEFAULT_OWNER_LABEL_VALUE.to_string(),
            env_annotation_prefix: DEFAULT_ENV_ANNOTATION_PREFIX.to_string(),
        }
    }
}

impl CredentialsConfig {
    pub fn label_selector(&self) -> String {
        format!("{}={}", self.owner_label_key, self.owner_label_value)
    }

    pub fn env_annotation(&self, app: &str) -> String {
        format!("{}{app}", self.env_annotation_prefix)
    }
}
