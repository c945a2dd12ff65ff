//! Field-level change sets.

use serde::Serialize;
use serde_json::Value;

use crate::snapshot::Snapshot;

/// A single changed field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    /// Field name
    pub field: String,
    /// Value before the mutation (`null` on insert)
    pub old_value: Value,
    /// Value after the mutation
    pub new_value: Value,
}

/// Ordered set of changed fields derived from two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChangeSet {
    changes: Vec<FieldChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, field: &str, old_value: Value, new_value: Value) {
        self.changes.push(FieldChange {
            field: field.to_string(),
            old_value,
            new_value,
        });
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldChange> {
        self.changes.iter()
    }

    /// Looks up the change for `field`.
    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.changes.iter().find(|c| c.field == field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(|c| c.field.as_str())
    }

    /// Old values keyed by field, the shape a save event reports as
    /// "changed attributes".
    pub fn old_values(&self) -> Snapshot {
        self.changes
            .iter()
            .map(|c| (c.field.clone(), c.old_value.clone()))
            .collect()
    }

    /// New values keyed by field.
    pub fn new_values(&self) -> Snapshot {
        self.changes
            .iter()
            .map(|c| (c.field.clone(), c.new_value.clone()))
            .collect()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a FieldChange;
    type IntoIter = std::slice::Iter<'a, FieldChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

impl IntoIterator for ChangeSet {
    type Item = FieldChange;
    type IntoIter = std::vec::IntoIter<FieldChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}
