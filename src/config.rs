use std::env;
use std::time::Duration;

use crate::waiter::WaitPolicy;

/// Runtime configuration for the WAF client and the change-token waiter.
/// Values are sourced from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub region: String,
    pub endpoint: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub wait_interval_secs: u64,
    pub wait_max_interval_secs: u64,
    pub wait_max_retries: u32,
}

impl Config {
    /// Load configuration from environment.
    ///
    /// Env vars:
    /// - AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY [required]
    /// - AWS_SESSION_TOKEN (optional, set for temporary credentials)
    /// - AWS_REGION (default: us-east-1, the signing region of global WAF)
    /// - WAF_ENDPOINT (default: https://waf.amazonaws.com)
    /// - WAF_HTTP_TIMEOUT_SECS (default: 30)
    /// - WAF_USER_AGENT (default: waf-rate-rule-provider/<version>)
    /// - WAF_WAIT_INTERVAL_SECS (default: 30)
    /// - WAF_WAIT_MAX_INTERVAL_SECS (default: 30)
    /// - WAF_WAIT_MAX_RETRIES (default: 15)
    pub fn from_env() -> Result<Self, String> {
        let access_key_id =
            env::var("AWS_ACCESS_KEY_ID").map_err(|_| "Missing AWS_ACCESS_KEY_ID".to_string())?;
        let secret_access_key = env::var("AWS_SECRET_ACCESS_KEY")
            .map_err(|_| "Missing AWS_SECRET_ACCESS_KEY".to_string())?;
        let session_token = env::var("AWS_SESSION_TOKEN")
            .ok()
            .filter(|s| !s.is_empty());

        let region = env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let endpoint = env::var("WAF_ENDPOINT")
            .unwrap_or_else(|_| "https://waf.amazonaws.com".to_string())
            .trim_end_matches('/')
            .to_string();
        let timeout_secs = parse_env("WAF_HTTP_TIMEOUT_SECS").unwrap_or(30);
        let default_ua = format!("waf-rate-rule-provider/{}", env!("CARGO_PKG_VERSION"));
        let user_agent = env::var("WAF_USER_AGENT").unwrap_or(default_ua);

        let wait_interval_secs = parse_env("WAF_WAIT_INTERVAL_SECS").unwrap_or(30);
        let wait_max_interval_secs = parse_env("WAF_WAIT_MAX_INTERVAL_SECS").unwrap_or(30);
        let wait_max_retries = parse_env("WAF_WAIT_MAX_RETRIES").unwrap_or(15);

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token,
            region,
            endpoint,
            user_agent,
            timeout_secs,
            wait_interval_secs,
            wait_max_interval_secs,
            wait_max_retries,
        })
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            initial_interval: Duration::from_secs(self.wait_interval_secs),
            max_interval: Duration::from_secs(self.wait_max_interval_secs),
            max_retries: self.wait_max_retries,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}
