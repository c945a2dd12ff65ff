//! Lifecycle phases and the handler naming convention.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Point in a record's lifecycle at which dispatch happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// Before an update commits; diffs pending values against persisted ones.
    BeforeUpdate,
    /// After an update commits; diffs values captured by the save event.
    AfterUpdate,
    /// After an insert commits; old values are `null`.
    AfterInsert,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::BeforeUpdate, Phase::AfterUpdate, Phase::AfterInsert];

    /// Handler name prefix for this phase.
    pub fn prefix(self) -> &'static str {
        match self {
            Phase::BeforeUpdate => "onBeforeChange",
            Phase::AfterUpdate => "onChange",
            Phase::AfterInsert => "onInsert",
        }
    }

    pub fn is_insert(self) -> bool {
        matches!(self, Phase::AfterInsert)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::BeforeUpdate => "before-update",
            Phase::AfterUpdate => "after-update",
            Phase::AfterInsert => "after-insert",
        }
    }

    /// Builds the convention handler name for `field`, e.g. `onChangeStatus_id`.
    pub fn handler_name(self, field: &str) -> String {
        format!("{}{}", self.prefix(), capitalize(field))
    }

    /// Splits a convention handler name into its phase and field part.
    ///
    /// The field part is returned as written (first letter capitalized), which
    /// is also the form the registry keys on.
    pub fn parse_handler_name(name: &str) -> Result<(Phase, &str), DispatchError> {
        let (phase, rest) = Phase::ALL
            .iter()
            .find_map(|p| name.strip_prefix(p.prefix()).map(|rest| (*p, rest)))
            .ok_or_else(|| DispatchError::InvalidPhase(name.to_string()))?;

        match rest.chars().next() {
            Some(c) if !c.is_lowercase() => Ok((phase, rest)),
            _ => Err(DispatchError::InvalidHandlerName(name.to_string())),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before-update" => Ok(Phase::BeforeUpdate),
            "after-update" => Ok(Phase::AfterUpdate),
            "after-insert" => Ok(Phase::AfterInsert),
            other => Err(DispatchError::InvalidPhase(other.to_string())),
        }
    }
}

/// Upper-cases the first character of `field`, leaving the rest untouched.
pub fn capitalize(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
