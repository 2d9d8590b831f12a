//! Create/update/delete handlers for a WAF rate-based rule.

use log::{debug, info, warn};
use thiserror::Error;

use crate::properties::{PropertyError, RuleProperties};
use crate::reconcile::{reconcile, ChangeSet, ValidationError};
use crate::types::{
    CreateRateBasedRuleInput, DeleteRateBasedRuleInput, Predicate, UpdateRateBasedRuleInput,
};
use crate::waf::{WafApi, WafError};
use crate::waiter::{wait_for_sync, WaitError, WaitPolicy};

/// Physical id reported for a rule that never came into existence.
pub const FAILED_TO_CREATE: &str = "failed-to-create";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Properties(#[from] PropertyError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Service(#[from] WafError),

    /// Querying the change-token status failed.
    #[error("{0}")]
    StatusQuery(WafError),

    #[error(transparent)]
    Convergence(WaitError),

    #[error("no physical resource id for {0}")]
    MissingPhysicalId(&'static str),

    #[error("unsupported request type: {0}")]
    UnsupportedRequestType(String),
}

impl From<WaitError> for ProviderError {
    fn from(e: WaitError) -> Self {
        match e {
            WaitError::Status(err) => ProviderError::StatusQuery(err),
            timeout => ProviderError::Convergence(timeout),
        }
    }
}

pub struct RateBasedRuleProvider<W> {
    waf: W,
    policy: WaitPolicy,
}

impl<W: WafApi> RateBasedRuleProvider<W> {
    pub fn new(waf: W, policy: WaitPolicy) -> Self {
        Self { waf, policy }
    }

    pub fn waf(&self) -> &W {
        &self.waf
    }

    /// Create the rule and attach any requested predicates.
    ///
    /// On failure before the rule exists, or when a status query fails,
    /// `physical_id` becomes [`FAILED_TO_CREATE`].
    pub async fn create(
        &self,
        props: &RuleProperties,
        physical_id: &mut Option<String>,
    ) -> Result<&'static str, ProviderError> {
        let result = self.try_create(props, physical_id).await;
        if let Err(e) = &result {
            if physical_id.is_none() || matches!(e, ProviderError::StatusQuery(_)) {
                *physical_id = Some(FAILED_TO_CREATE.to_string());
            }
        }
        result
    }

    async fn try_create(
        &self,
        props: &RuleProperties,
        physical_id: &mut Option<String>,
    ) -> Result<&'static str, ProviderError> {
        // Reject bad predicates before anything is created
        let changes = if props.has_predicates() {
            Some(reconcile(&[], props.predicates(), false)?)
        } else {
            None
        };

        let change_token = self.waf.get_change_token().await?;
        let input = CreateRateBasedRuleInput {
            name: props.name.clone(),
            metric_name: props.metric_name.clone(),
            rate_key: props.rate_key.clone(),
            rate_limit: props.rate_limit,
            change_token,
            tags: props.tags.clone(),
        };
        let out = self.waf.create_rate_based_rule(&input).await?;
        let rule_id = out.rule.rule_id;
        info!("Created rate-based rule {} ({})", props.name, rule_id);
        *physical_id = Some(rule_id.clone());

        self.wait(&out.change_token).await?;

        match changes {
            Some(changes) if !changes.is_empty() => {
                info!("Predicate(s) detected in create request. Also updating the rule.");
                self.submit(&rule_id, changes, props.rate_limit).await?;
                Ok("Create and update are done.")
            }
            _ => Ok("Create is done."),
        }
    }

    /// Move the rule from the old predicate set to the requested one.
    pub async fn update(
        &self,
        props: &RuleProperties,
        old: Option<&RuleProperties>,
        physical_id: &mut Option<String>,
    ) -> Result<&'static str, ProviderError> {
        let result = self.try_update(props, old, physical_id.as_deref()).await;
        mark_on_status_failure(&result, physical_id);
        result
    }

    async fn try_update(
        &self,
        props: &RuleProperties,
        old: Option<&RuleProperties>,
        physical_id: Option<&str>,
    ) -> Result<&'static str, ProviderError> {
        let rule_id = physical_id.ok_or(ProviderError::MissingPhysicalId("Update"))?;
        if let Some(old) = old {
            if old.name != props.name
                || old.metric_name != props.metric_name
                || old.rate_key != props.rate_key
            {
                warn!(
                    "Name, MetricName and RateKey of rule {} cannot change in place; only RateLimit and predicates are updated",
                    rule_id
                );
            }
        }

        let previous = old.map(stored_predicates).unwrap_or_default();
        let changes = reconcile(&previous, props.predicates(), false)?;
        self.submit(rule_id, changes, props.rate_limit).await?;
        Ok("Update is done.")
    }

    /// Detach every predicate, then delete the rule. An already absent rule
    /// counts as deleted.
    pub async fn delete(
        &self,
        props: Option<&RuleProperties>,
        physical_id: &mut Option<String>,
    ) -> Result<&'static str, ProviderError> {
        let result = self.try_delete(props, physical_id.as_deref()).await;
        mark_on_status_failure(&result, physical_id);
        result
    }

    async fn try_delete(
        &self,
        props: Option<&RuleProperties>,
        physical_id: Option<&str>,
    ) -> Result<&'static str, ProviderError> {
        let rule_id = match physical_id {
            None | Some(FAILED_TO_CREATE) => {
                info!("Rule was never created; nothing to delete.");
                return Ok("Delete is done.");
            }
            Some(id) => id,
        };

        if let Some(props) = props {
            let changes = reconcile(&stored_predicates(props), &[], true)?;
            if !changes.is_empty() {
                match self.submit(rule_id, changes, props.rate_limit).await {
                    Err(ProviderError::Service(e)) if e.is_nonexistent_item() => {
                        info!("Rule {} no longer exists.", rule_id);
                        return Ok("Delete is done.");
                    }
                    other => other?,
                }
            }
        }

        let change_token = self.waf.get_change_token().await?;
        let input = DeleteRateBasedRuleInput {
            rule_id: rule_id.to_string(),
            change_token,
        };
        let token = match self.waf.delete_rate_based_rule(&input).await {
            Ok(token) => token,
            Err(e) if e.is_nonexistent_item() => {
                info!("Rule {} no longer exists.", rule_id);
                return Ok("Delete is done.");
            }
            Err(e) => return Err(e.into()),
        };
        self.wait(&token).await?;
        Ok("Delete is done.")
    }

    async fn submit(
        &self,
        rule_id: &str,
        changes: ChangeSet,
        rate_limit: i64,
    ) -> Result<(), ProviderError> {
        let change_token = self.waf.get_change_token().await?;
        let input = UpdateRateBasedRuleInput {
            rule_id: rule_id.to_string(),
            change_token,
            updates: changes.into_updates(),
            rate_limit,
        };
        debug!(
            "Updating rule {} with {} change(s), rate limit {}",
            rule_id,
            input.updates.len(),
            rate_limit
        );
        let token = self.waf.update_rate_based_rule(&input).await?;
        self.wait(&token).await
    }

    async fn wait(&self, change_token: &str) -> Result<(), ProviderError> {
        let checks = wait_for_sync(&self.waf, change_token, &self.policy).await?;
        debug!("Change token {} in sync after {} check(s)", change_token, checks);
        Ok(())
    }
}

/// A failed status query leaves the change in an unknown state, so the
/// physical id becomes `failed-to-create` in every handler. On Update and
/// Delete that replaces a real RuleId, which CloudFormation may read as a
/// resource replacement and follow with a Delete of the old id.
fn mark_on_status_failure<T>(result: &Result<T, ProviderError>, physical_id: &mut Option<String>) {
    if let Err(ProviderError::StatusQuery(_)) = result {
        *physical_id = Some(FAILED_TO_CREATE.to_string());
    }
}

/// Predicates recorded in earlier properties. Incomplete entries were never
/// attached, so they are skipped.
fn stored_predicates(props: &RuleProperties) -> Vec<Predicate> {
    props
        .predicates()
        .iter()
        .filter_map(|spec| {
            let p = spec.to_predicate();
            if p.is_none() {
                warn!("Ignoring incomplete stored predicate {}", spec);
            }
            p
        })
        .collect()
}
