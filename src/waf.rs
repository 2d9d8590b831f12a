//! The WAF operations the provider depends on.
//!
//! [`WafApi`] is the seam between the lifecycle handlers and the service. The
//! HTTP implementation lives in [`crate::http::WafClient`]; tests substitute an
//! in-memory fake.

use thiserror::Error;

use crate::types::{
    ChangeTokenStatus, CreateRateBasedRuleInput, CreateRateBasedRuleOutput,
    DeleteRateBasedRuleInput, UpdateRateBasedRuleInput,
};

pub const NONEXISTENT_ITEM: &str = "WAFNonexistentItemException";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WafError {
    /// The service answered with an error document.
    #[error("{code} ({status}): {message}")]
    Service {
        code: String,
        message: String,
        status: u16,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode WAF response: {0}")]
    Decode(String),
}

impl WafError {
    pub fn service(code: impl Into<String>, message: impl Into<String>, status: u16) -> Self {
        WafError::Service {
            code: code.into(),
            message: message.into(),
            status,
        }
    }

    /// Whether the service reported the target item as absent.
    pub fn is_nonexistent_item(&self) -> bool {
        match self {
            WafError::Service { code, message, .. } => {
                code.contains(NONEXISTENT_ITEM) || message.contains(NONEXISTENT_ITEM)
            }
            _ => false,
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait WafApi {
    async fn get_change_token(&self) -> Result<String, WafError>;

    async fn get_change_token_status(
        &self,
        change_token: &str,
    ) -> Result<ChangeTokenStatus, WafError>;

    async fn create_rate_based_rule(
        &self,
        input: &CreateRateBasedRuleInput,
    ) -> Result<CreateRateBasedRuleOutput, WafError>;

    /// Returns the change token of the submitted update.
    async fn update_rate_based_rule(
        &self,
        input: &UpdateRateBasedRuleInput,
    ) -> Result<String, WafError>;

    /// Returns the change token of the submitted delete.
    async fn delete_rate_based_rule(
        &self,
        input: &DeleteRateBasedRuleInput,
    ) -> Result<String, WafError>;
}

/// In-memory WAF used by unit tests.
#[cfg(test)]
pub(crate) mod fake {
    use super::{WafApi, WafError};
    use crate::types::{
        ChangeTokenStatus, CreateRateBasedRuleInput, CreateRateBasedRuleOutput,
        DeleteRateBasedRuleInput, RateBasedRule, UpdateRateBasedRuleInput,
    };
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        GetChangeToken,
        GetChangeTokenStatus(String),
        Create(CreateRateBasedRuleInput),
        Update(UpdateRateBasedRuleInput),
        Delete(DeleteRateBasedRuleInput),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Op {
        GetChangeToken,
        Create,
        Update,
        Delete,
    }

    /// Statuses replay in order and the last one repeats; INSYNC when empty.
    #[derive(Default)]
    pub struct FakeWaf {
        statuses: Mutex<Vec<Result<ChangeTokenStatus, WafError>>>,
        failures: Mutex<HashMap<Op, WafError>>,
        calls: Mutex<Vec<Call>>,
        status_checks: Mutex<usize>,
    }

    impl FakeWaf {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_statuses(statuses: Vec<Result<ChangeTokenStatus, WafError>>) -> Self {
            let waf = Self::default();
            *waf.statuses.lock().unwrap() = statuses;
            waf
        }

        pub fn fail(self, op: Op, err: WafError) -> Self {
            self.failures.lock().unwrap().insert(op, err);
            self
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn status_checks(&self) -> usize {
            *self.status_checks.lock().unwrap()
        }

        pub fn updates(&self) -> Vec<UpdateRateBasedRuleInput> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::Update(u) => Some(u),
                    _ => None,
                })
                .collect()
        }

        fn record(&self, call: Call) -> usize {
            let mut calls = self.calls.lock().unwrap();
            calls.push(call);
            calls.len()
        }

        fn failure(&self, op: Op) -> Result<(), WafError> {
            match self.failures.lock().unwrap().get(&op) {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }
    }

    impl WafApi for FakeWaf {
        async fn get_change_token(&self) -> Result<String, WafError> {
            let n = self.record(Call::GetChangeToken);
            self.failure(Op::GetChangeToken)?;
            Ok(format!("token-{}", n))
        }

        async fn get_change_token_status(
            &self,
            change_token: &str,
        ) -> Result<ChangeTokenStatus, WafError> {
            self.record(Call::GetChangeTokenStatus(change_token.to_string()));
            let statuses = self.statuses.lock().unwrap();
            let mut checks = self.status_checks.lock().unwrap();
            *checks += 1;
            if statuses.is_empty() {
                return Ok(ChangeTokenStatus::Insync);
            }
            statuses[(*checks - 1).min(statuses.len() - 1)].clone()
        }

        async fn create_rate_based_rule(
            &self,
            input: &CreateRateBasedRuleInput,
        ) -> Result<CreateRateBasedRuleOutput, WafError> {
            let n = self.record(Call::Create(input.clone()));
            self.failure(Op::Create)?;
            Ok(CreateRateBasedRuleOutput {
                rule: RateBasedRule {
                    rule_id: "rule-1".into(),
                    name: Some(input.name.clone()),
                    metric_name: Some(input.metric_name.clone()),
                },
                change_token: format!("create-{}", n),
            })
        }

        async fn update_rate_based_rule(
            &self,
            input: &UpdateRateBasedRuleInput,
        ) -> Result<String, WafError> {
            let n = self.record(Call::Update(input.clone()));
            self.failure(Op::Update)?;
            Ok(format!("update-{}", n))
        }

        async fn delete_rate_based_rule(
            &self,
            input: &DeleteRateBasedRuleInput,
        ) -> Result<String, WafError> {
            let n = self.record(Call::Delete(input.clone()));
            self.failure(Op::Delete)?;
            Ok(format!("delete-{}", n))
        }
    }
}
