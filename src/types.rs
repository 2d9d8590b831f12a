use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of match condition a predicate references.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PredicateType {
    IPMatch,
    ByteMatch,
    SqlInjectionMatch,
    GeoMatch,
    SizeConstraint,
    XssMatch,
    RegexMatch,
}

impl PredicateType {
    pub const ALL: [PredicateType; 7] = [
        PredicateType::IPMatch,
        PredicateType::ByteMatch,
        PredicateType::SqlInjectionMatch,
        PredicateType::GeoMatch,
        PredicateType::SizeConstraint,
        PredicateType::XssMatch,
        PredicateType::RegexMatch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PredicateType::IPMatch => "IPMatch",
            PredicateType::ByteMatch => "ByteMatch",
            PredicateType::SqlInjectionMatch => "SqlInjectionMatch",
            PredicateType::GeoMatch => "GeoMatch",
            PredicateType::SizeConstraint => "SizeConstraint",
            PredicateType::XssMatch => "XssMatch",
            PredicateType::RegexMatch => "RegexMatch",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// A match condition attached to a rate-based rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Predicate {
    pub negated: bool,
    #[serde(rename = "Type")]
    pub kind: PredicateType,
    pub data_id: String,
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{Negated: {}, Type: {}, DataId: {}}}",
            self.negated,
            self.kind.as_str(),
            self.data_id
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    Insert,
    Delete,
}

/// One entry of the `Updates` array of `UpdateRateBasedRule`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct RuleUpdate {
    pub action: ChangeAction,
    pub predicate: Predicate,
}

impl RuleUpdate {
    pub fn insert(predicate: Predicate) -> Self {
        Self {
            action: ChangeAction::Insert,
            predicate,
        }
    }

    pub fn delete(predicate: Predicate) -> Self {
        Self {
            action: ChangeAction::Delete,
            predicate,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeTokenStatus {
    Provisioned,
    Pending,
    Insync,
}

impl ChangeTokenStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChangeTokenStatus::Insync)
    }
}

impl fmt::Display for ChangeTokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeTokenStatus::Provisioned => "PROVISIONED",
            ChangeTokenStatus::Pending => "PENDING",
            ChangeTokenStatus::Insync => "INSYNC",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

// Request/response shapes of the WAF JSON API

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct CreateRateBasedRuleInput {
    pub name: String,
    pub metric_name: String,
    pub rate_key: String,
    pub rate_limit: i64,
    pub change_token: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateRateBasedRuleInput {
    pub rule_id: String,
    pub change_token: String,
    pub updates: Vec<RuleUpdate>,
    pub rate_limit: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteRateBasedRuleInput {
    pub rule_id: String,
    pub change_token: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct RateBasedRule {
    pub rule_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub metric_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct CreateRateBasedRuleOutput {
    pub rule: RateBasedRule,
    pub change_token: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeTokenOutput {
    pub change_token: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeTokenStatusOutput {
    pub change_token_status: ChangeTokenStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicate_wire_shape() {
        let p = Predicate {
            negated: false,
            kind: PredicateType::IPMatch,
            data_id: "ipset-1".into(),
        };
        let v = serde_json::to_value(RuleUpdate::insert(p)).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "Action": "INSERT",
                "Predicate": {"Negated": false, "Type": "IPMatch", "DataId": "ipset-1"}
            })
        );
    }

    #[test]
    fn predicate_type_names() {
        for t in PredicateType::ALL {
            assert_eq!(PredicateType::parse(t.as_str()), Some(t));
        }
        assert_eq!(PredicateType::parse("ipmatch"), None);
    }

    #[test]
    fn status_terminal_only_when_insync() {
        let s: ChangeTokenStatusOutput =
            serde_json::from_str(r#"{"ChangeTokenStatus":"PENDING"}"#).unwrap();
        assert!(!s.change_token_status.is_terminal());
        let s: ChangeTokenStatusOutput =
            serde_json::from_str(r#"{"ChangeTokenStatus":"INSYNC"}"#).unwrap();
        assert!(s.change_token_status.is_terminal());
    }

    #[test]
    fn create_input_omits_empty_tags() {
        let input = CreateRateBasedRuleInput {
            name: "R1".into(),
            metric_name: "M1".into(),
            rate_key: "IP".into(),
            rate_limit: 2000,
            change_token: "tok".into(),
            tags: vec![],
        };
        let v = serde_json::to_value(&input).unwrap();
        assert!(v.get("Tags").is_none());
        assert_eq!(v["RateLimit"], 2000);
    }
}
