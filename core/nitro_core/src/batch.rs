//! Tallies for actions that fan out to several backend calls.
//!
//! One rejection never fails the whole batch; every item is reported.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Succeeded,
    /// The server already holds an equivalent pending request.
    AlreadyPending,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport<K> {
    verb: &'static str,
    pub succeeded: Vec<K>,
    pub already_pending: Vec<K>,
    pub failed: Vec<(K, String)>,
}

impl<K> BatchReport<K> {
    /// `verb` names the success column, e.g. "submitted" or "marked paid".
    pub fn new(verb: &'static str) -> Self {
        Self {
            verb,
            succeeded: Vec::new(),
            already_pending: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn record(&mut self, key: K, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Succeeded => self.succeeded.push(key),
            ItemOutcome::AlreadyPending => self.already_pending.push(key),
            ItemOutcome::Failed(reason) => self.failed.push((key, reason)),
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.already_pending.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl<K> fmt::Display for BatchReport<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.succeeded.len(), self.verb)?;
        if !self.already_pending.is_empty() {
            write!(f, ", {} already pending", self.already_pending.len())?;
        }
        if !self.failed.is_empty() {
            write!(f, ", {} failed", self.failed.len())?;
        }
        Ok(())
    }
}
