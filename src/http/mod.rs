pub mod sigv4;

use crate::config::Config;
use crate::types::{
    ChangeTokenOutput, ChangeTokenStatus, ChangeTokenStatusOutput, CreateRateBasedRuleInput,
    CreateRateBasedRuleOutput, DeleteRateBasedRuleInput, UpdateRateBasedRuleInput,
};
use crate::waf::{WafApi, WafError};
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const TARGET_PREFIX: &str = "AWSWAF_20150824";
pub const SIGNING_SERVICE: &str = "waf";

pub fn build_client(cfg: &Config) -> Result<Client, WafError> {
    let mut default_headers = HeaderMap::new();
    let ua = HeaderValue::from_str(&cfg.user_agent)
        .map_err(|e| WafError::Transport(format!("invalid user agent: {}", e)))?;
    default_headers.insert(USER_AGENT, ua);
    // Authorization is computed per request; SigV4 binds it to the body and time.
    Client::builder()
        .default_headers(default_headers)
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .use_rustls_tls()
        .build()
        .map_err(|e| WafError::Transport(e.to_string()))
}

/// Error document of the AWS JSON protocol.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type", default)]
    kind: Option<String>,
    #[serde(alias = "Message", default)]
    message: Option<String>,
}

/// Map a non-success response to a service error.
/// `__type` may carry a namespace prefix (`com.amazonaws.waf#...`), which is dropped.
pub fn map_status_to_error(status: u16, body: &str) -> WafError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            kind: Some(kind),
            message,
        }) => {
            let code = kind.rsplit('#').next().unwrap_or(&kind).to_string();
            WafError::service(code, message.unwrap_or_default(), status)
        }
        _ => {
            let code = if status >= 500 {
                "ServiceUnavailable"
            } else {
                "UnknownError"
            };
            WafError::service(code, body.trim(), status)
        }
    }
}

/// WAF client speaking AWS JSON 1.1 over HTTPS.
#[derive(Debug, Clone)]
pub struct WafClient {
    http: Client,
    cfg: Config,
    url: Url,
    host: String,
}

impl WafClient {
    pub fn new(cfg: Config) -> Result<Self, WafError> {
        let http = build_client(&cfg)?;
        Self::with_client(http, cfg)
    }

    pub fn with_client(http: Client, cfg: Config) -> Result<Self, WafError> {
        let url = Url::parse(&cfg.endpoint)
            .map_err(|e| WafError::Transport(format!("invalid endpoint {}: {}", cfg.endpoint, e)))?;
        let host = host_header(&url)
            .ok_or_else(|| WafError::Transport(format!("endpoint has no host: {}", cfg.endpoint)))?;
        Ok(Self {
            http,
            cfg,
            url,
            host,
        })
    }

    async fn call<I: Serialize, O: DeserializeOwned>(
        &self,
        operation: &str,
        input: &I,
    ) -> Result<O, WafError> {
        let target = format!("{}.{}", TARGET_PREFIX, operation);
        let body = serde_json::to_vec(input).map_err(|e| WafError::Decode(e.to_string()))?;
        let creds = sigv4::Credentials {
            access_key_id: &self.cfg.access_key_id,
            secret_access_key: &self.cfg.secret_access_key,
            session_token: self.cfg.session_token.as_deref(),
        };
        let signature = sigv4::sign_json_post(
            &creds,
            &self.cfg.region,
            SIGNING_SERVICE,
            &self.host,
            &target,
            &body,
            chrono::Utc::now(),
        );

        let mut req = self
            .http
            .post(self.url.clone())
            .header(CONTENT_TYPE, sigv4::JSON_CONTENT_TYPE)
            .header("X-Amz-Date", &signature.amz_date)
            .header("X-Amz-Target", &target)
            .header("Authorization", &signature.authorization);
        if let Some(token) = &self.cfg.session_token {
            req = req.header("X-Amz-Security-Token", token);
        }

        debug!("WAF {} request: {}", operation, String::from_utf8_lossy(&body));
        let res = req.body(body).send().await.map_err(|e| {
            warn!("WAF {} error sending request: {}", operation, e);
            WafError::Transport(e.to_string())
        })?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| WafError::Transport(e.to_string()))?;
        if !status.is_success() {
            let err = map_status_to_error(status.as_u16(), &text);
            warn!("WAF {} failed: {}", operation, err);
            return Err(err);
        }
        debug!("WAF {} response: {}", operation, text);
        serde_json::from_str(&text).map_err(|e| WafError::Decode(format!("{}: {}", operation, e)))
    }
}

fn host_header(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ChangeTokenInput<'a> {
    change_token: &'a str,
}

impl WafApi for WafClient {
    async fn get_change_token(&self) -> Result<String, WafError> {
        let out: ChangeTokenOutput = self.call("GetChangeToken", &serde_json::json!({})).await?;
        Ok(out.change_token)
    }

    async fn get_change_token_status(
        &self,
        change_token: &str,
    ) -> Result<ChangeTokenStatus, WafError> {
        let out: ChangeTokenStatusOutput = self
            .call("GetChangeTokenStatus", &ChangeTokenInput { change_token })
            .await?;
        Ok(out.change_token_status)
    }

    async fn create_rate_based_rule(
        &self,
        input: &CreateRateBasedRuleInput,
    ) -> Result<CreateRateBasedRuleOutput, WafError> {
        self.call("CreateRateBasedRule", input).await
    }

    async fn update_rate_based_rule(
        &self,
        input: &UpdateRateBasedRuleInput,
    ) -> Result<String, WafError> {
        let out: ChangeTokenOutput = self.call("UpdateRateBasedRule", input).await?;
        Ok(out.change_token)
    }

    async fn delete_rate_based_rule(
        &self,
        input: &DeleteRateBasedRuleInput,
    ) -> Result<String, WafError> {
        let out: ChangeTokenOutput = self.call("DeleteRateBasedRule", input).await?;
        Ok(out.change_token)
    }
}

/// PUT a response document to a presigned URL.
/// Presigned S3 URLs are signed without a content type, so none is sent.
pub async fn put_presigned_json(client: &Client, url: &str, body: &str) -> Result<(), WafError> {
    let res = client
        .put(url)
        .header(CONTENT_TYPE, "")
        .body(body.to_string())
        .send()
        .await
        .map_err(|e| WafError::Transport(e.to_string()))?;
    let status = res.status();
    if status.is_success() {
        return Ok(());
    }
    let text = res.text().await.unwrap_or_default();
    Err(WafError::service("ResponseRejected", text, status.as_u16()))
}
