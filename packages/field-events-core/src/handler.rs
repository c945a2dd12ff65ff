//! Handler signature and call arguments.

use std::sync::Arc;

use serde_json::Value;

use crate::change::ChangeSet;
use crate::error::HandlerError;
use crate::phase::Phase;

/// Arguments passed to a handler for one changed field.
///
/// `R` is the host record type and `E` the triggering event.
#[derive(Debug)]
pub struct HandlerCall<'a, R, E> {
    pub phase: Phase,
    /// Event that triggered the dispatch pass
    pub event: &'a E,
    /// True when the record was just inserted
    pub insert: bool,
    /// The record being saved
    pub record: &'a R,
    /// Name of the changed field
    pub field: &'a str,
    /// New value of the field
    pub value: &'a Value,
    /// Previous value of the field (`null` on insert)
    pub old_value: &'a Value,
    /// Every change of this pass, including this one
    pub changes: &'a ChangeSet,
}

/// Handler function signature.
///
/// Handlers are closures registered per `(phase, field)`. They receive the
/// call arguments and return `Ok(())` or a [`HandlerError`], which the
/// dispatcher collects without stopping the pass.
pub type HandlerFn<R, E> =
    Arc<dyn Fn(&HandlerCall<'_, R, E>) -> Result<(), HandlerError> + Send + Sync>;
