//! Per-item outcomes collected by batch operations.
//!
//! A batch never aborts because one item failed. Every item gets an entry,
//! and callers re-enumerate the store to observe the real post-state.

use serde::Serialize;

/// What happened to one item of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ItemOutcome {
    Completed,
    /// Nothing to do for this item (e.g. no document to trim).
    Skipped(String),
    Failed(String),
}

impl ItemOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Outcome for one named item (a record base name or an object name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    pub name: String,
    pub outcome: ItemOutcome,
}

impl ItemReport {
    pub fn completed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: ItemOutcome::Completed,
        }
    }

    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: ItemOutcome::Skipped(reason.into()),
        }
    }

    pub fn failed(name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self {
            name: name.into(),
            outcome: ItemOutcome::Failed(reason.to_string()),
        }
    }
}

/// Report of one batch invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub operation: &'static str,
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    pub fn new(operation: &'static str, items: Vec<ItemReport>) -> Self {
        Self { operation, items }
    }

    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Completed))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(ItemOutcome::is_failure)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemReport> {
        self.items.iter().filter(|i| i.outcome.is_failure())
    }

    /// Outcome for a named item, if it was part of the batch.
    pub fn outcome_of(&self, name: &str) -> Option<&ItemOutcome> {
        self.items
            .iter()
            .find(|i| i.name == name)
            .map(|i| &i.outcome)
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|i| pred(&i.outcome)).count()
    }
}
