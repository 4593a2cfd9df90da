//! Client configuration: endpoint, credentials, templates, and the poll and
//! cache policies.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::request::{Credentials, RequestTemplates};
use crate::types::{ReportError, ReportResult};

/// Status value that marks a run as finished.
pub const DEFAULT_COMPLETION_MARKER: &str = "complete";

const DEFAULT_MAX_TRIES: u32 = 10;
const DEFAULT_SLEEP_MS: u64 = 1000;
const DEFAULT_RETENTION_SECS: u64 = 3600;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

const ENV_USER: &str = "ADVOCATE_API_USER";
const ENV_PASSWORD: &str = "ADVOCATE_API_PASSWORD";
const ENV_AUTHORIZATION: &str = "ADVOCATE_AUTHORIZATION";

/// How long to wait for a run to complete.
///
/// One retrieval makes at most `max_tries` status checks and sleeps
/// `sleep_between_tries` before every check except the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_tries: u32,
    pub sleep_between_tries: Duration,
}

impl PollPolicy {
    pub fn new(max_tries: u32, sleep_between_tries: Duration) -> ReportResult<Self> {
        if max_tries == 0 {
            return Err(ReportError::Config(
                "max_tries must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            max_tries,
            sleep_between_tries,
        })
    }

    /// Upper bound on time spent sleeping in one retrieval.
    pub fn max_wait(&self) -> Duration {
        self.sleep_between_tries
            .saturating_mul(self.max_tries.saturating_sub(1))
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_tries: DEFAULT_MAX_TRIES,
            sleep_between_tries: Duration::from_millis(DEFAULT_SLEEP_MS),
        }
    }
}

/// Serializable client configuration, typically loaded from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Report API endpoint; requests are POSTed here.
    pub api_url: Url,

    /// Missing credentials may be supplied through the environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,

    /// Run template, containing `{ReportID}`. A value starting with `@` is
    /// read from that path.
    pub run_template: String,
    /// Status template, containing `{RunID}`.
    pub status_template: String,
    /// Data template, containing `{RunID}`.
    pub data_template: String,

    #[serde(default = "default_max_tries")]
    pub max_tries: u32,
    #[serde(default = "default_sleep_ms")]
    pub sleep_between_tries_ms: u64,
    #[serde(default = "default_retention_secs")]
    pub cache_retention_secs: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub bypass_cache: bool,
    #[serde(default = "default_completion_marker")]
    pub completion_marker: String,
}

fn default_max_tries() -> u32 {
    DEFAULT_MAX_TRIES
}

fn default_sleep_ms() -> u64 {
    DEFAULT_SLEEP_MS
}

fn default_retention_secs() -> u64 {
    DEFAULT_RETENTION_SECS
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_completion_marker() -> String {
    DEFAULT_COMPLETION_MARKER.to_string()
}

impl ClientConfig {
    /// Load a JSON config file and apply environment overrides.
    ///
    /// Relative `@path` templates resolve against the config file's directory.
    pub fn load(path: &Path) -> ReportResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut config: ClientConfig = serde_json::from_str(&text)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.run_template = resolve_template(&config.run_template, base)?;
        config.status_template = resolve_template(&config.status_template, base)?;
        config.data_template = resolve_template(&config.data_template, base)?;
        config.apply_env();
        Ok(config)
    }

    /// Fill or override credentials from `ADVOCATE_*` environment variables.
    ///
    /// A precomputed authorization wins over user and password.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(authorization) = lookup(ENV_AUTHORIZATION) {
            self.credentials = Some(Credentials::Precomputed { authorization });
            return;
        }

        let user = lookup(ENV_USER);
        let password = lookup(ENV_PASSWORD);
        if user.is_none() && password.is_none() {
            return;
        }

        let (current_user, current_password) = match &self.credentials {
            Some(Credentials::UserPassword { user, password }) => {
                (Some(user.clone()), Some(password.clone()))
            }
            _ => (None, None),
        };
        self.credentials = Some(Credentials::UserPassword {
            user: user.or(current_user).unwrap_or_default(),
            password: password.or(current_password).unwrap_or_default(),
        });
    }

    pub fn templates(&self) -> ReportResult<RequestTemplates> {
        RequestTemplates::new(
            self.run_template.as_str(),
            self.status_template.as_str(),
            self.data_template.as_str(),
        )
    }

    pub fn poll_policy(&self) -> ReportResult<PollPolicy> {
        PollPolicy::new(
            self.max_tries,
            Duration::from_millis(self.sleep_between_tries_ms),
        )
    }

    pub fn cache_retention(&self) -> Duration {
        Duration::from_secs(self.cache_retention_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Value of the `Host` header: the endpoint host, plus `:port` when the
    /// URL names a non-default port.
    pub fn host(&self) -> ReportResult<String> {
        let host = self
            .api_url
            .host_str()
            .ok_or_else(|| ReportError::Config(format!("api_url has no host: {}", self.api_url)))?;
        Ok(match self.api_url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }

    pub fn require_credentials(&self) -> ReportResult<&Credentials> {
        self.credentials.as_ref().ok_or_else(|| {
            ReportError::Config(format!(
                "no credentials configured; set them in the config file or {ENV_USER}/{ENV_PASSWORD}"
            ))
        })
    }

    /// Check everything the engine needs without touching the network.
    pub fn validate(&self) -> ReportResult<()> {
        self.templates()?;
        self.poll_policy()?;
        self.host()?;
        self.require_credentials()?;
        Ok(())
    }
}

fn resolve_template(value: &str, base: &Path) -> ReportResult<String> {
    match value.strip_prefix('@') {
        Some(path) => Ok(std::fs::read_to_string(base.join(path))?),
        None => Ok(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "api_url": "https://reports.example.com/api/reports",
        "credentials": { "user": "api", "password": "secret" },
        "run_template": "<Run>{ReportID}</Run>",
        "status_template": "<Status>{RunID}</Status>",
        "data_template": "<Data>{RunID}</Data>"
    }"#;

    #[test]
    fn test_defaults() {
        let config: ClientConfig = serde_json::from_str(MINIMAL).unwrap();
        assert_eq!(config.max_tries, 10);
        assert_eq!(config.sleep_between_tries_ms, 1000);
        assert_eq!(config.cache_retention(), Duration::from_secs(3600));
        assert_eq!(config.completion_marker, "complete");
        assert!(!config.bypass_cache);
        assert_eq!(config.host().unwrap(), "reports.example.com");
        config.validate().unwrap();
    }

    #[test]
    fn test_precomputed_credentials_deserialize() {
        let json = MINIMAL.replace(
            r#"{ "user": "api", "password": "secret" }"#,
            r#"{ "authorization": "YXBpOnNlY3JldA==" }"#,
        );
        let config: ClientConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(
            config.credentials,
            Some(Credentials::Precomputed {
                authorization: "YXBpOnNlY3JldA==".to_string()
            })
        );
    }

    #[test]
    fn test_zero_tries_rejected() {
        assert!(matches!(
            PollPolicy::new(0, Duration::from_secs(1)),
            Err(ReportError::Config(_))
        ));
    }

    #[test]
    fn test_max_wait() {
        let policy = PollPolicy::new(4, Duration::from_millis(250)).unwrap();
        assert_eq!(policy.max_wait(), Duration::from_millis(750));
    }

    #[test]
    fn test_bad_template_fails_validation() {
        let json = MINIMAL.replace("<Data>{RunID}</Data>", "<Data/>");
        let config: ClientConfig = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ReportError::InvalidTemplate { .. })
        ));
    }

    #[test]
    fn test_missing_credentials_fails_validation() {
        let mut config: ClientConfig = serde_json::from_str(MINIMAL).unwrap();
        config.credentials = None;
        assert!(matches!(config.validate(), Err(ReportError::Config(_))));
    }

    #[test]
    fn test_load_resolves_file_templates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("run.xml"), "<Run>{ReportID}</Run>").unwrap();
        let json = MINIMAL.replace("<Run>{ReportID}</Run>", "@run.xml");
        let path = dir.path().join("report.json");
        std::fs::write(&path, json).unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.run_template, "<Run>{ReportID}</Run>");
    }

    fn overrides<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn test_authorization_override_wins() {
        let mut config: ClientConfig = serde_json::from_str(MINIMAL).unwrap();
        config.apply_overrides(overrides(&[
            (ENV_AUTHORIZATION, "cHJlOmNvbXB1dGVk"),
            (ENV_USER, "ignored"),
            (ENV_PASSWORD, "ignored"),
        ]));
        assert_eq!(
            config.credentials,
            Some(Credentials::Precomputed {
                authorization: "cHJlOmNvbXB1dGVk".to_string()
            })
        );
    }

    #[test]
    fn test_user_override_keeps_file_password() {
        let mut config: ClientConfig = serde_json::from_str(MINIMAL).unwrap();
        config.apply_overrides(overrides(&[(ENV_USER, "ops")]));
        assert_eq!(
            config.credentials,
            Some(Credentials::UserPassword {
                user: "ops".to_string(),
                password: "secret".to_string()
            })
        );
    }

    #[test]
    fn test_env_supplies_missing_credentials() {
        let mut config: ClientConfig = serde_json::from_str(MINIMAL).unwrap();
        config.credentials = None;
        config.apply_overrides(overrides(&[(ENV_USER, "api"), (ENV_PASSWORD, "pw")]));
        assert_eq!(
            config.credentials,
            Some(Credentials::UserPassword {
                user: "api".to_string(),
                password: "pw".to_string()
            })
        );

        let mut untouched: ClientConfig = serde_json::from_str(MINIMAL).unwrap();
        untouched.apply_overrides(overrides(&[]));
        assert_eq!(
            untouched.credentials,
            Some(Credentials::UserPassword {
                user: "api".to_string(),
                password: "secret".to_string()
            })
        );
    }

    #[test]
    fn test_apply_env_reads_process_environment() {
        // Only test in this crate that mutates the environment.
        std::env::set_var(ENV_AUTHORIZATION, "ZW52OmF1dGg=");
        let mut config: ClientConfig = serde_json::from_str(MINIMAL).unwrap();
        config.apply_env();
        std::env::remove_var(ENV_AUTHORIZATION);
        assert_eq!(
            config.credentials,
            Some(Credentials::Precomputed {
                authorization: "ZW52OmF1dGg=".to_string()
            })
        );
    }

    #[test]
    fn test_host_includes_explicit_port() {
        let json = MINIMAL.replace("reports.example.com", "reports.example.com:8443");
        let config: ClientConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.host().unwrap(), "reports.example.com:8443");

        let default_port = MINIMAL.replace("reports.example.com", "reports.example.com:443");
        let config: ClientConfig = serde_json::from_str(&default_port).unwrap();
        assert_eq!(config.host().unwrap(), "reports.example.com");
    }
}
