//! Registry of change handlers keyed by phase and field.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::error::{DispatchError, HandlerError};
use crate::handler::{HandlerCall, HandlerFn};
use crate::phase::{capitalize, Phase};

/// Registry key. The field is stored capitalized, matching the handler
/// naming convention, so `status` and `Status` share one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct HandlerKey {
    phase: Phase,
    field: String,
}

impl HandlerKey {
    fn new(phase: Phase, field: &str) -> Self {
        Self {
            phase,
            field: capitalize(field),
        }
    }

    fn handler_name(&self) -> String {
        format!("{}{}", self.phase.prefix(), self.field)
    }
}

type HandlerTable<R, E> = HashMap<HandlerKey, HandlerFn<R, E>>;

/// Registry of available handlers.
///
/// The table is published through `ArcSwap`: dispatch passes read a
/// lock-free snapshot, and registration copies the table and swaps it in.
/// A pass that already loaded the table keeps seeing the old one.
pub struct HandlerRegistry<R, E = ()> {
    handlers: ArcSwap<HandlerTable<R, E>>,
}

impl<R, E> HandlerRegistry<R, E> {
    /// Creates a new empty handler registry.
    pub fn new() -> Self {
        Self {
            handlers: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Starts a builder for startup registration.
    pub fn builder() -> HandlerRegistryBuilder<R, E> {
        HandlerRegistryBuilder {
            handlers: HashMap::new(),
        }
    }

    /// Registers a handler for `field` in `phase`, replacing any existing one.
    ///
    /// # Arguments
    /// * `phase` - Lifecycle phase
    /// * `field` - Field name, as it appears in snapshots
    /// * `handler` - Handler closure
    ///
    /// # Returns
    /// `true` if an existing handler was replaced.
    pub fn register<F>(&self, phase: Phase, field: &str, handler: F) -> bool
    where
        F: Fn(&HandlerCall<'_, R, E>) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.insert(HandlerKey::new(phase, field), Arc::new(handler))
    }

    /// Registers a handler by its convention name, e.g. `onChangeStatus`.
    ///
    /// # Returns
    /// `Ok(true)` if an existing handler was replaced, or
    /// `Err(DispatchError)` if the name has no known phase prefix or no field.
    pub fn register_named<F>(&self, name: &str, handler: F) -> Result<bool, DispatchError>
    where
        F: Fn(&HandlerCall<'_, R, E>) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let (phase, field) = Phase::parse_handler_name(name)?;
        Ok(self.insert(HandlerKey::new(phase, field), Arc::new(handler)))
    }

    fn insert(&self, key: HandlerKey, handler: HandlerFn<R, E>) -> bool {
        tracing::debug!("Registering handler {}", key.handler_name());
        let previous = self.handlers.rcu(|current| {
            let mut next: HandlerTable<R, E> = (**current).clone();
            next.insert(key.clone(), handler.clone());
            next
        });
        previous.contains_key(&key)
    }

    /// Removes the handler for `field` in `phase`.
    ///
    /// # Returns
    /// `true` if a handler was removed, `false` if none was registered.
    pub fn remove(&self, phase: Phase, field: &str) -> bool {
        let key = HandlerKey::new(phase, field);
        let previous = self.handlers.rcu(|current| {
            let mut next: HandlerTable<R, E> = (**current).clone();
            next.remove(&key);
            next
        });
        previous.contains_key(&key)
    }

    /// Gets the handler for `field` in `phase`.
    pub fn get(&self, phase: Phase, field: &str) -> Option<HandlerFn<R, E>> {
        self.handlers
            .load()
            .get(&HandlerKey::new(phase, field))
            .cloned()
    }

    pub fn contains(&self, phase: Phase, field: &str) -> bool {
        self.handlers
            .load()
            .contains_key(&HandlerKey::new(phase, field))
    }

    pub fn len(&self) -> usize {
        self.handlers.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.load().is_empty()
    }

    /// Returns the convention names of all registered handlers, sorted.
    pub fn handler_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .load()
            .keys()
            .map(HandlerKey::handler_name)
            .collect();
        names.sort();
        names
    }

    /// Takes a consistent view of the table for one dispatch pass.
    pub(crate) fn view(&self) -> RegistryView<R, E> {
        RegistryView {
            table: self.handlers.load_full(),
        }
    }
}

impl<R, E> Default for HandlerRegistry<R, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, E> fmt::Debug for HandlerRegistry<R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.handler_names())
            .finish()
    }
}

/// Immutable table snapshot held for the duration of a dispatch pass.
pub(crate) struct RegistryView<R, E> {
    table: Arc<HandlerTable<R, E>>,
}

impl<R, E> RegistryView<R, E> {
    pub(crate) fn get(&self, phase: Phase, field: &str) -> Option<&HandlerFn<R, E>> {
        self.table.get(&HandlerKey::new(phase, field))
    }
}

/// Fluent builder for a [`HandlerRegistry`].
pub struct HandlerRegistryBuilder<R, E = ()> {
    handlers: HandlerTable<R, E>,
}

impl<R, E> HandlerRegistryBuilder<R, E> {
    /// Adds a handler for `field` in `phase`.
    pub fn on<F>(mut self, phase: Phase, field: &str, handler: F) -> Self
    where
        F: Fn(&HandlerCall<'_, R, E>) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.handlers
            .insert(HandlerKey::new(phase, field), Arc::new(handler));
        self
    }

    /// Adds a handler by its convention name.
    pub fn named<F>(mut self, name: &str, handler: F) -> Result<Self, DispatchError>
    where
        F: Fn(&HandlerCall<'_, R, E>) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let (phase, field) = Phase::parse_handler_name(name)?;
        self.handlers
            .insert(HandlerKey::new(phase, field), Arc::new(handler));
        Ok(self)
    }

    pub fn build(self) -> HandlerRegistry<R, E> {
        HandlerRegistry {
            handlers: ArcSwap::from_pointee(self.handlers),
        }
    }
}
