//! Typed view of the resource properties.
//!
//! CloudFormation delivers every scalar as a string (`"2000"`, `"true"`), so
//! values are coerced here once, before any handler logic runs. Control
//! fields such as `ServiceToken` are simply not carried over.

use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use crate::types::{Predicate, PredicateType, Tag};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PropertyError {
    #[error("ResourceProperties must be an object")]
    NotAnObject,

    #[error("missing required property: {0}")]
    Missing(String),

    #[error("property {name} must be {expected}, got {value}")]
    Invalid {
        name: String,
        expected: &'static str,
        value: String,
    },
}

/// A predicate as requested; any field may be absent until validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredicateSpec {
    pub negated: Option<bool>,
    pub kind: Option<PredicateType>,
    pub data_id: Option<String>,
}

impl PredicateSpec {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.negated.is_none() {
            missing.push("Negated");
        }
        if self.kind.is_none() {
            missing.push("Type");
        }
        if self.data_id.is_none() {
            missing.push("DataId");
        }
        missing
    }

    pub fn to_predicate(&self) -> Option<Predicate> {
        Some(Predicate {
            negated: self.negated?,
            kind: self.kind?,
            data_id: self.data_id.clone()?,
        })
    }
}

impl From<Predicate> for PredicateSpec {
    fn from(p: Predicate) -> Self {
        Self {
            negated: Some(p.negated),
            kind: Some(p.kind),
            data_id: Some(p.data_id),
        }
    }
}

impl fmt::Display for PredicateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(n) = self.negated {
            parts.push(format!("Negated: {}", n));
        }
        if let Some(t) = self.kind {
            parts.push(format!("Type: {}", t.as_str()));
        }
        if let Some(d) = &self.data_id {
            parts.push(format!("DataId: {}", d));
        }
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Strongly typed `ResourceProperties` of a rate-based rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleProperties {
    pub name: String,
    pub metric_name: String,
    pub rate_key: String,
    pub rate_limit: i64,
    pub match_predicates: Option<Vec<PredicateSpec>>,
    pub tags: Vec<Tag>,
}

impl RuleProperties {
    pub fn from_value(value: &Value) -> Result<Self, PropertyError> {
        let obj = value.as_object().ok_or(PropertyError::NotAnObject)?;

        let match_predicates = match field(obj, "MatchPredicates") {
            None => None,
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| predicate_spec(i, item))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Some(other) => return Err(invalid("MatchPredicates", "a list", other)),
        };

        let tags = match field(obj, "Tags") {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| tag(i, item))
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => return Err(invalid("Tags", "a list", other)),
        };

        Ok(Self {
            name: required_string(obj, "Name")?,
            metric_name: required_string(obj, "MetricName")?,
            rate_key: required_string(obj, "RateKey")?,
            rate_limit: required_integer(obj, "RateLimit")?,
            match_predicates,
            tags,
        })
    }

    pub fn has_predicates(&self) -> bool {
        self.match_predicates.is_some()
    }

    pub fn predicates(&self) -> &[PredicateSpec] {
        self.match_predicates.as_deref().unwrap_or(&[])
    }
}

/// Null counts as absent.
fn field<'a>(obj: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    obj.get(name).filter(|v| !v.is_null())
}

fn invalid(name: &str, expected: &'static str, value: &Value) -> PropertyError {
    PropertyError::Invalid {
        name: name.to_string(),
        expected,
        value: value.to_string(),
    }
}

fn coerce_string(name: &str, value: &Value) -> Result<String, PropertyError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(invalid(name, "a string", other)),
    }
}

fn coerce_integer(name: &str, value: &Value) -> Result<i64, PropertyError> {
    match value {
        Value::Number(n) => n.as_i64().ok_or_else(|| invalid(name, "an integer", value)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(name, "an integer", value)),
        other => Err(invalid(name, "an integer", other)),
    }
}

fn coerce_bool(name: &str, value: &Value) -> Result<bool, PropertyError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(invalid(name, "a boolean", other)),
    }
}

fn required_string(obj: &Map<String, Value>, name: &str) -> Result<String, PropertyError> {
    let v = field(obj, name).ok_or_else(|| PropertyError::Missing(name.to_string()))?;
    coerce_string(name, v)
}

fn required_integer(obj: &Map<String, Value>, name: &str) -> Result<i64, PropertyError> {
    let v = field(obj, name).ok_or_else(|| PropertyError::Missing(name.to_string()))?;
    coerce_integer(name, v)
}

fn predicate_spec(index: usize, item: &Value) -> Result<PredicateSpec, PropertyError> {
    let label = format!("MatchPredicates[{}]", index);
    let obj = item
        .as_object()
        .ok_or_else(|| invalid(&label, "an object", item))?;

    let negated = field(obj, "Negated")
        .map(|v| coerce_bool(&format!("{}.Negated", label), v))
        .transpose()?;
    let kind = field(obj, "Type")
        .map(|v| {
            let name = format!("{}.Type", label);
            let s = coerce_string(&name, v)?;
            PredicateType::parse(&s).ok_or_else(|| invalid(&name, "a predicate type", v))
        })
        .transpose()?;
    let data_id = field(obj, "DataId")
        .map(|v| coerce_string(&format!("{}.DataId", label), v))
        .transpose()?;

    Ok(PredicateSpec {
        negated,
        kind,
        data_id,
    })
}

fn tag(index: usize, item: &Value) -> Result<Tag, PropertyError> {
    let label = format!("Tags[{}]", index);
    let obj = item
        .as_object()
        .ok_or_else(|| invalid(&label, "an object", item))?;
    let key_name = format!("{}.Key", label);
    let value_name = format!("{}.Value", label);
    let key = field(obj, "Key").ok_or_else(|| PropertyError::Missing(key_name.clone()))?;
    let value = field(obj, "Value").ok_or_else(|| PropertyError::Missing(value_name.clone()))?;
    Ok(Tag {
        key: coerce_string(&key_name, key)?,
        value: coerce_string(&value_name, value)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_stringly_typed_values() {
        let props = RuleProperties::from_value(&json!({
            "ServiceToken": "arn:aws:lambda:eu-west-1:123456789012:function:provider",
            "Name": "R1",
            "MetricName": "M1",
            "RateKey": "IP",
            "RateLimit": "2000",
            "MatchPredicates": [
                {"Negated": "false", "Type": "IPMatch", "DataId": "ipset-1"},
                {"Negated": true, "Type": "GeoMatch", "DataId": "geo-1"}
            ]
        }))
        .unwrap();
        assert_eq!(props.rate_limit, 2000);
        assert_eq!(props.name, "R1");
        let preds = props.predicates();
        assert_eq!(preds.len(), 2);
        assert_eq!(preds[0].negated, Some(false));
        assert_eq!(preds[1].kind, Some(PredicateType::GeoMatch));
        assert!(props.tags.is_empty());
    }

    #[test]
    fn missing_required_property() {
        let err = RuleProperties::from_value(&json!({
            "Name": "R1", "MetricName": "M1", "RateLimit": 2000
        }))
        .unwrap_err();
        assert_eq!(err, PropertyError::Missing("RateKey".into()));
    }

    #[test]
    fn rejects_non_integer_rate_limit() {
        let err = RuleProperties::from_value(&json!({
            "Name": "R1", "MetricName": "M1", "RateKey": "IP", "RateLimit": "lots"
        }))
        .unwrap_err();
        assert!(matches!(err, PropertyError::Invalid { ref name, .. } if name == "RateLimit"));
    }

    #[test]
    fn incomplete_predicate_is_kept_for_validation() {
        let props = RuleProperties::from_value(&json!({
            "Name": "R1", "MetricName": "M1", "RateKey": "IP", "RateLimit": 2000,
            "MatchPredicates": [{"Negated": false, "DataId": "ipset-1"}]
        }))
        .unwrap();
        let spec = &props.predicates()[0];
        assert_eq!(spec.missing_fields(), vec!["Type"]);
        assert_eq!(spec.to_predicate(), None);
        assert_eq!(spec.to_string(), "{Negated: false, DataId: ipset-1}");
    }

    #[test]
    fn unknown_predicate_type_is_invalid() {
        let err = RuleProperties::from_value(&json!({
            "Name": "R1", "MetricName": "M1", "RateKey": "IP", "RateLimit": 2000,
            "MatchPredicates": [{"Negated": false, "Type": "Nope", "DataId": "x"}]
        }))
        .unwrap_err();
        assert!(
            matches!(err, PropertyError::Invalid { ref name, .. } if name == "MatchPredicates[0].Type")
        );
    }

    #[test]
    fn tags_are_typed() {
        let props = RuleProperties::from_value(&json!({
            "Name": "R1", "MetricName": "M1", "RateKey": "IP", "RateLimit": 2000,
            "Tags": [{"Key": "team", "Value": "edge"}]
        }))
        .unwrap();
        assert_eq!(
            props.tags,
            vec![Tag {
                key: "team".into(),
                value: "edge".into()
            }]
        );
        assert!(!props.has_predicates());
    }
}
