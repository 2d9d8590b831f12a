//! Predicate reconciliation: the delete/insert operations that move a rule's
//! predicate set from what was stored to what is requested.
//!
//! Predicates occupy a slot keyed by `DataId`. The whole previous set is
//! scanned for the slot of each requested predicate.

use log::debug;
use thiserror::Error;

use crate::properties::PredicateSpec;
use crate::types::{Predicate, RuleUpdate};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Predicate {predicate} is missing required fields: {}", .missing.join(", "))]
    MissingFields {
        predicate: String,
        missing: Vec<&'static str>,
    },

    #[error("Predicate DataId {data_id} is listed more than once")]
    DuplicateDataId { data_id: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub deletes: Vec<RuleUpdate>,
    pub inserts: Vec<RuleUpdate>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.inserts.is_empty()
    }

    /// Deletes first, then inserts, as one `Updates` array.
    pub fn into_updates(self) -> Vec<RuleUpdate> {
        let mut updates = self.deletes;
        updates.extend(self.inserts);
        updates
    }
}

pub fn reconcile(
    previous: &[Predicate],
    requested: &[PredicateSpec],
    remove_all: bool,
) -> Result<ChangeSet, ValidationError> {
    let mut remaining: Vec<Predicate> = previous.to_vec();
    let mut changes = ChangeSet::default();

    if !remove_all {
        let wanted = validate(requested)?;
        for new in wanted {
            match remaining.iter().position(|old| old.data_id == new.data_id) {
                None => changes.inserts.push(RuleUpdate::insert(new)),
                Some(idx) => {
                    let old = remaining.remove(idx);
                    if old != new {
                        changes.deletes.push(RuleUpdate::delete(old));
                        changes.inserts.push(RuleUpdate::insert(new));
                    }
                }
            }
        }
    }

    // Anything not claimed by the request is detached
    changes
        .deletes
        .extend(remaining.into_iter().map(RuleUpdate::delete));

    debug!(
        "reconciled predicates: {} delete(s), {} insert(s)",
        changes.deletes.len(),
        changes.inserts.len()
    );
    Ok(changes)
}

/// All-or-nothing: the first incomplete predicate, or a `DataId` requested
/// twice, rejects the whole request.
fn validate(requested: &[PredicateSpec]) -> Result<Vec<Predicate>, ValidationError> {
    let mut wanted: Vec<Predicate> = Vec::with_capacity(requested.len());
    for spec in requested {
        let p = spec
            .to_predicate()
            .ok_or_else(|| ValidationError::MissingFields {
                predicate: spec.to_string(),
                missing: spec.missing_fields(),
            })?;
        if wanted.iter().any(|w| w.data_id == p.data_id) {
            return Err(ValidationError::DuplicateDataId { data_id: p.data_id });
        }
        wanted.push(p);
    }
    Ok(wanted)
}
