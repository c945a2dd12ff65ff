//! Field-level change detection and handler dispatch.
//!
//! Diffs record snapshots around a save and invokes handlers registered per
//! lifecycle phase and field, following the naming convention
//! `<prefix><FieldNameWithFirstLetterCapitalized>` (`onBeforeChange`,
//! `onChange`, `onInsert`).

pub mod change;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod phase;
pub mod record;
pub mod registry;
pub mod snapshot;

pub use change::{ChangeSet, FieldChange};
pub use config::{DispatchConfig, NumericEquality};
pub use dispatcher::{ChangeDispatcher, DispatchResult};
pub use error::{DispatchError, HandlerError, HandlerFailure};
pub use handler::{HandlerCall, HandlerFn};
pub use phase::Phase;
pub use record::{SaveOutcome, TrackedRecord};
pub use registry::{HandlerRegistry, HandlerRegistryBuilder};
pub use snapshot::Snapshot;
