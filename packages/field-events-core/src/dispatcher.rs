//! Change detection and handler dispatch.

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde_json::Value;

use crate::change::ChangeSet;
use crate::config::DispatchConfig;
use crate::error::{DispatchError, HandlerError, HandlerFailure};
use crate::handler::{HandlerCall, HandlerFn};
use crate::phase::Phase;
use crate::registry::HandlerRegistry;
use crate::snapshot::{values_equal, Snapshot};

static NULL: Value = Value::Null;

/// Outcome of one dispatch pass.
#[derive(Debug)]
pub struct DispatchResult {
    pub phase: Phase,
    /// Changes the pass walked over
    pub changes: ChangeSet,
    /// Number of handlers invoked, failed ones included
    pub invoked: usize,
    /// Number of changed fields with no registered handler
    pub skipped: usize,
    /// Failures collected after the full pass
    pub failures: Vec<HandlerFailure>,
}

impl DispatchResult {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Turns a pass with failures into `DispatchError::HandlersFailed`.
    pub fn into_result(self) -> Result<DispatchResult, DispatchError> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(DispatchError::HandlersFailed {
                phase: self.phase,
                failures: self.failures,
            })
        }
    }
}

/// Computes field-level diffs and invokes the handlers registered for them.
///
/// The host record type `R` owns (or borrows) a dispatcher and calls the
/// lifecycle entry points itself: [`before_update`](Self::before_update),
/// [`after_update`](Self::after_update) and [`after_insert`](Self::after_insert).
#[derive(Debug)]
pub struct ChangeDispatcher<R, E = ()> {
    registry: HandlerRegistry<R, E>,
    config: DispatchConfig,
}

impl<R, E> ChangeDispatcher<R, E> {
    /// Creates a dispatcher with an empty registry and default configuration.
    pub fn new() -> Self {
        Self::with_registry(HandlerRegistry::new(), DispatchConfig::default())
    }

    pub fn with_registry(registry: HandlerRegistry<R, E>, config: DispatchConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &HandlerRegistry<R, E> {
        &self.registry
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Registers a handler, replacing any existing one for the same key.
    pub fn register_handler<F>(&self, phase: Phase, field: &str, handler: F) -> bool
    where
        F: Fn(&HandlerCall<'_, R, E>) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.registry.register(phase, field, handler)
    }

    /// Computes the fields of `new` whose value differs from `old`.
    ///
    /// A field missing from `old` is compared against `null`. Fields only
    /// present in `old` are not reported.
    ///
    /// # Returns
    /// `Err(DispatchError::InvalidSnapshot)` if either snapshot is absent.
    pub fn compute_changes(
        &self,
        old: Option<&Snapshot>,
        new: Option<&Snapshot>,
    ) -> Result<ChangeSet, DispatchError> {
        let old = old.ok_or_else(|| DispatchError::missing_snapshot("old"))?;
        let new = new.ok_or_else(|| DispatchError::missing_snapshot("new"))?;
        Ok(self.diff(old, new, false))
    }

    fn diff(&self, old: &Snapshot, new: &Snapshot, report_new_nulls: bool) -> ChangeSet {
        let mut changes = ChangeSet::new();
        for (field, new_value) in new.iter() {
            let changed = match old.get(field) {
                Some(old_value) => {
                    !values_equal(old_value, new_value, self.config.numeric_equality)
                }
                None => report_new_nulls || !new_value.is_null(),
            };
            if changed {
                let old_value = old.get(field).cloned().unwrap_or(Value::Null);
                changes.push(field, old_value, new_value.clone());
            }
        }
        changes
    }

    /// Computes the change set a lifecycle phase dispatches on.
    ///
    /// * `BeforeUpdate` - fields of `new` (pending) that differ from `old`
    ///   (persisted).
    /// * `AfterUpdate` - fields of `old` (captured by the save event) whose
    ///   pre-save value differs from the value in `new`; a captured field
    ///   missing from `new` compares against `null`.
    /// * `AfterInsert` - fields of `new` compared against `null`; `old` is
    ///   ignored. Explicit nulls are reported unless `insert_skips_null`.
    pub fn changes_for(&self, phase: Phase, old: &Snapshot, new: &Snapshot) -> ChangeSet {
        match phase {
            Phase::BeforeUpdate => self.diff(old, new, false),
            Phase::AfterUpdate => {
                let mut changes = ChangeSet::new();
                for (field, old_value) in old.iter() {
                    let new_value = new.get(field).unwrap_or(&NULL);
                    if !values_equal(old_value, new_value, self.config.numeric_equality) {
                        changes.push(field, old_value.clone(), new_value.clone());
                    }
                }
                changes
            }
            Phase::AfterInsert => {
                self.diff(&Snapshot::new(), new, !self.config.insert_skips_null)
            }
        }
    }

    /// Diffs pending in-memory values against the persisted ones and
    /// dispatches `BeforeUpdate` handlers.
    pub fn before_update(
        &self,
        event: &E,
        record: &R,
        persisted: &Snapshot,
        pending: &Snapshot,
    ) -> DispatchResult {
        let changes = self.changes_for(Phase::BeforeUpdate, persisted, pending);
        self.dispatch(Phase::BeforeUpdate, changes, event, record)
    }

    /// Dispatches `AfterUpdate` handlers for the fields a save event captured.
    ///
    /// # Arguments
    /// * `captured_old` - Pre-save values of the fields the save touched
    /// * `current` - Values after the save
    pub fn after_update(
        &self,
        event: &E,
        record: &R,
        captured_old: &Snapshot,
        current: &Snapshot,
    ) -> DispatchResult {
        let changes = self.changes_for(Phase::AfterUpdate, captured_old, current);
        self.dispatch(Phase::AfterUpdate, changes, event, record)
    }

    /// Dispatches `AfterInsert` handlers; every field is compared against `null`.
    pub fn after_insert(&self, event: &E, record: &R, current: &Snapshot) -> DispatchResult {
        let changes = self.changes_for(Phase::AfterInsert, &Snapshot::new(), current);
        self.dispatch(Phase::AfterInsert, changes, event, record)
    }

    /// Invokes the handler registered for each change in `phase`.
    ///
    /// Fields without a handler are skipped. Handler errors (and panics, when
    /// `catch_panics` is set) are collected and every applicable handler runs.
    pub fn dispatch(
        &self,
        phase: Phase,
        changes: ChangeSet,
        event: &E,
        record: &R,
    ) -> DispatchResult {
        let view = self.registry.view();
        let mut invoked = 0;
        let mut skipped = 0;
        let mut failures = Vec::new();

        for change in &changes {
            let Some(handler) = view.get(phase, &change.field) else {
                skipped += 1;
                continue;
            };

            let call = HandlerCall {
                phase,
                event,
                insert: phase.is_insert(),
                record,
                field: &change.field,
                value: &change.new_value,
                old_value: &change.old_value,
                changes: &changes,
            };
            invoked += 1;

            if let Err(error) = self.invoke(handler, &call) {
                let failure = HandlerFailure {
                    field: change.field.clone(),
                    handler: phase.handler_name(&change.field),
                    error,
                };
                tracing::warn!("Handler failed: {}", failure);
                failures.push(failure);
            }
        }

        tracing::debug!(
            "Dispatched {}: {} changed, {} invoked, {} skipped, {} failed",
            phase,
            changes.len(),
            invoked,
            skipped,
            failures.len()
        );

        DispatchResult {
            phase,
            changes,
            invoked,
            skipped,
            failures,
        }
    }

    fn invoke(
        &self,
        handler: &HandlerFn<R, E>,
        call: &HandlerCall<'_, R, E>,
    ) -> Result<(), HandlerError> {
        if !self.config.catch_panics {
            return handler(call);
        }

        match catch_unwind(AssertUnwindSafe(|| handler(call))) {
            Ok(result) => result,
            Err(panic) => {
                let panic_msg = if let Some(msg) = panic.downcast_ref::<&str>() {
                    msg.to_string()
                } else if let Some(msg) = panic.downcast_ref::<String>() {
                    msg.clone()
                } else {
                    "unknown panic".to_string()
                };
                tracing::error!("Handler for {} panicked: {}", call.field, panic_msg);
                Err(HandlerError::Panicked(panic_msg))
            }
        }
    }
}

impl<R, E> Default for ChangeDispatcher<R, E> {
    fn default() -> Self {
        Self::new()
    }
}
