//! Lifecycle hook vocabulary: which entities have hooks, and at which points.

use std::any::Any;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of entity types that expose lifecycle hooks.
///
/// Each variant is bound to exactly one Rust payload type through [`HookEntity`], so
/// registering a handler is checked by the compiler rather than by string matching.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    JournalEntry,
    ChartOfAccount,
    DayBook,
    ShareAccount,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::JournalEntry => "journal_entry",
            EntityType::ChartOfAccount => "chart_of_account",
            EntityType::DayBook => "day_book",
            EntityType::ShareAccount => "share_account",
        }
    }
}

impl core::fmt::Display for EntityType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named moment in an entity's lifecycle at which handlers may attach.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPoint {
    OnValidate,
    BeforeCreate,
    AfterCreate,
    BeforeUpdate,
    AfterUpdate,
    BeforeDelete,
    AfterDelete,
    OnSubmit,
    OnCancel,
}

impl HookPoint {
    pub const ALL: [HookPoint; 9] = [
        HookPoint::OnValidate,
        HookPoint::BeforeCreate,
        HookPoint::AfterCreate,
        HookPoint::BeforeUpdate,
        HookPoint::AfterUpdate,
        HookPoint::BeforeDelete,
        HookPoint::AfterDelete,
        HookPoint::OnSubmit,
        HookPoint::OnCancel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookPoint::OnValidate => "on_validate",
            HookPoint::BeforeCreate => "before_create",
            HookPoint::AfterCreate => "after_create",
            HookPoint::BeforeUpdate => "before_update",
            HookPoint::AfterUpdate => "after_update",
            HookPoint::BeforeDelete => "before_delete",
            HookPoint::AfterDelete => "after_delete",
            HookPoint::OnSubmit => "on_submit",
            HookPoint::OnCancel => "on_cancel",
        }
    }
}

impl core::fmt::Display for HookPoint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payload type that lifecycle hooks can be attached to.
///
/// Implemented by the domain crates for their records; the associated constant ties the
/// Rust type to its [`EntityType`] tag.
pub trait HookEntity: Any {
    const ENTITY_TYPE: EntityType;

    /// Stable key identifying the record in diagnostics and audit trails.
    fn entity_key(&self) -> String;
}

/// Registry misuse detected while registering or dispatching hooks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HookError {
    /// Two different Rust types claimed the same entity type.
    #[error("entity type {entity_type} is bound to {registered}, not {attempted}")]
    PayloadTypeConflict {
        entity_type: EntityType,
        registered: &'static str,
        attempted: &'static str,
    },
}
