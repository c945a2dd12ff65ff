//! Host record that drives the dispatcher at its save lifecycle points.

use serde_json::Value;

use crate::change::ChangeSet;
use crate::config::NumericEquality;
use crate::dispatcher::{ChangeDispatcher, DispatchResult};
use crate::error::DispatchError;
use crate::phase::Phase;
use crate::snapshot::{values_equal, Snapshot};

/// Result of [`TrackedRecord::save`].
#[derive(Debug)]
pub struct SaveOutcome {
    /// True when the save inserted a new record
    pub insert: bool,
    /// Fields written by the save, with their pre-save values
    pub changes: ChangeSet,
    /// `BeforeUpdate` pass, absent on insert
    pub before: Option<DispatchResult>,
    /// `AfterUpdate` or `AfterInsert` pass
    pub after: DispatchResult,
}

/// A record holding its persisted values and pending, uncommitted ones.
///
/// The record does not inherit any behavior: callers hand it a dispatcher
/// on `save`, and it invokes the before/after entry points explicitly.
#[derive(Debug, Clone, Default)]
pub struct TrackedRecord {
    persisted: Option<Snapshot>,
    attributes: Snapshot,
}

impl TrackedRecord {
    /// Creates a new, never saved record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps values loaded from the backing store.
    pub fn from_persisted(snapshot: Snapshot) -> Self {
        Self {
            attributes: snapshot.clone(),
            persisted: Some(snapshot),
        }
    }

    pub fn is_new(&self) -> bool {
        self.persisted.is_none()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.attributes.get(field)
    }

    /// Sets a pending value. Nothing is dispatched until `save`.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(field.into(), value.into());
    }

    /// Current in-memory values, pending changes included.
    pub fn attributes(&self) -> &Snapshot {
        &self.attributes
    }

    /// Last persisted values, `None` for a new record.
    pub fn persisted(&self) -> Option<&Snapshot> {
        self.persisted.as_ref()
    }

    /// Pending values that differ from the persisted ones.
    ///
    /// Compares strictly, as the backing store would, and ignores `null`
    /// values for fields that were never persisted. The change set a save
    /// dispatches on follows the dispatcher's configuration instead; see
    /// [`pending_changes`](Self::pending_changes).
    pub fn dirty_attributes(&self) -> Snapshot {
        let empty = Snapshot::new();
        let persisted = self.persisted.as_ref().unwrap_or(&empty);
        self.attributes
            .iter()
            .filter(|(field, value)| match persisted.get(field) {
                Some(old) => !values_equal(old, value, NumericEquality::Strict),
                None => !value.is_null(),
            })
            .map(|(field, value)| (field, value.clone()))
            .collect()
    }

    /// Changes the next `save` would dispatch on with `dispatcher`:
    /// the `AfterInsert` diff for a new record, the `BeforeUpdate` diff otherwise.
    pub fn pending_changes<E>(&self, dispatcher: &ChangeDispatcher<TrackedRecord, E>) -> ChangeSet {
        match self.persisted.as_ref() {
            Some(persisted) => {
                dispatcher.changes_for(Phase::BeforeUpdate, persisted, &self.attributes)
            }
            None => dispatcher.changes_for(Phase::AfterInsert, &Snapshot::new(), &self.attributes),
        }
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty_attributes().is_empty()
    }

    /// Saves the record, dispatching handlers around the commit.
    ///
    /// For a stored record: `BeforeUpdate` runs on the pending diff, and any
    /// handler failure aborts the save with the record left dirty. After the
    /// commit, `AfterUpdate` runs on the fields the save wrote. For a new
    /// record the commit happens first, then `AfterInsert`.
    ///
    /// After-phase failures do not undo the commit; they are reported in
    /// [`SaveOutcome::after`].
    pub fn save<E>(
        &mut self,
        dispatcher: &ChangeDispatcher<TrackedRecord, E>,
        event: &E,
    ) -> Result<SaveOutcome, DispatchError> {
        let Some(persisted) = self.persisted.as_ref() else {
            self.persisted = Some(self.attributes.clone());
            let after = dispatcher.after_insert(event, self, &self.attributes);
            return Ok(SaveOutcome {
                insert: true,
                changes: after.changes.clone(),
                before: None,
                after,
            });
        };

        let before = dispatcher
            .before_update(event, self, persisted, &self.attributes)
            .into_result()?;
        let changes = before.changes.clone();

        self.persisted = Some(self.attributes.clone());
        tracing::debug!("Committed {} changed field(s)", changes.len());

        let after = dispatcher.after_update(event, self, &changes.old_values(), &self.attributes);
        Ok(SaveOutcome {
            insert: false,
            changes,
            before: Some(before),
            after,
        })
    }
}
