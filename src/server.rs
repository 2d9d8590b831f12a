use crate::config::Config;
use crate::http::{self, WafClient};
use crate::properties::RuleProperties;
use crate::provider::{ProviderError, RateBasedRuleProvider, FAILED_TO_CREATE};
use crate::waf::WafApi;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::{self, Read, Write};
use std::time::Duration;

/// The fields of a custom resource request this provider reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Request {
    pub request_type: String,
    #[serde(rename = "ResponseURL", default, skip_serializing_if = "Option::is_none")]
    pub response_url: Option<String>,
    #[serde(default)]
    pub stack_id: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub logical_resource_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    #[serde(default)]
    pub resource_properties: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_resource_properties: Option<Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Response {
    pub status: Status,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
}

impl Response {
    fn for_request(req: &Request, status: Status, reason: String, physical_id: Option<String>) -> Self {
        let physical_resource_id = physical_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| FAILED_TO_CREATE.to_string());
        let mut data = Map::new();
        if status == Status::Success && physical_resource_id != FAILED_TO_CREATE {
            data.insert("RuleId".into(), Value::String(physical_resource_id.clone()));
        }
        Self {
            status,
            reason,
            physical_resource_id,
            stack_id: req.stack_id.clone(),
            request_id: req.request_id.clone(),
            logical_resource_id: req.logical_resource_id.clone(),
            data,
        }
    }

    pub fn failed(req: &Request, reason: impl Into<String>) -> Self {
        Self::for_request(req, Status::Failed, reason.into(), req.physical_resource_id.clone())
    }
}

/// Run one lifecycle request against the provider.
pub async fn handle_request<W: WafApi>(provider: &RateBasedRuleProvider<W>, req: &Request) -> Response {
    info!(
        "{} {} ({})",
        req.request_type,
        req.logical_resource_id,
        req.physical_resource_id.as_deref().unwrap_or("-")
    );
    let mut physical_id = req.physical_resource_id.clone();
    let outcome = match req.request_type.as_str() {
        "Create" => match RuleProperties::from_value(&req.resource_properties) {
            Ok(props) => provider.create(&props, &mut physical_id).await,
            Err(e) => {
                physical_id = Some(FAILED_TO_CREATE.to_string());
                Err(e.into())
            }
        },
        "Update" => match RuleProperties::from_value(&req.resource_properties) {
            Ok(props) => {
                let old = req.old_resource_properties.as_ref().and_then(|v| {
                    RuleProperties::from_value(v)
                        .map_err(|e| warn!("Ignoring unreadable OldResourceProperties: {}", e))
                        .ok()
                });
                provider.update(&props, old.as_ref(), &mut physical_id).await
            }
            Err(e) => Err(e.into()),
        },
        "Delete" => {
            // Deletes must go through even when the properties never validated
            let props = RuleProperties::from_value(&req.resource_properties)
                .map_err(|e| warn!("Deleting without readable ResourceProperties: {}", e))
                .ok();
            provider.delete(props.as_ref(), &mut physical_id).await
        }
        other => Err(ProviderError::UnsupportedRequestType(other.to_string())),
    };

    match outcome {
        Ok(message) => {
            info!("{}", message);
            Response::for_request(req, Status::Success, message.to_string(), physical_id)
        }
        Err(e) => {
            error!("{} failed: {}", req.request_type, e);
            Response::for_request(req, Status::Failed, e.to_string(), physical_id)
        }
    }
}

/// Read one request, handle it, write the response to stdout and deliver it
/// to the request's ResponseURL.
pub async fn run(request_path: Option<&str>) -> anyhow::Result<()> {
    let input = match request_path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    if input.trim().is_empty() {
        return Ok(());
    }
    let req: Request = serde_json::from_str(&input)?;
    debug!("Received RequestType={}", req.request_type);

    let (response, timeout_secs) = match Config::from_env() {
        Ok(cfg) => {
            let timeout_secs = cfg.timeout_secs;
            let policy = cfg.wait_policy();
            let response = match WafClient::new(cfg) {
                Ok(waf) => {
                    let provider = RateBasedRuleProvider::new(waf, policy);
                    handle_request(&provider, &req).await
                }
                Err(e) => Response::failed(&req, e.to_string()),
            };
            (response, timeout_secs)
        }
        Err(e) => (Response::failed(&req, e), 30),
    };

    let payload = serde_json::to_string(&response)?;
    let mut out = io::stdout();
    writeln!(out, "{}", payload)?;
    out.flush()?;

    if let Some(url) = &req.response_url {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .use_rustls_tls()
            .build()?;
        http::put_presigned_json(&client, url, &payload).await?;
        info!("Response delivered");
    }
    Ok(())
}
