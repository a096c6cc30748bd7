//! Pre-write guards and post-write observers.
//!
//! Guards run after validation and before the value is stored; they may let
//! the value through, replace it, or veto the write. Observers run after the
//! value is stored and cannot change the outcome.
//!
//! Hooks only ever see a shared borrow of the dictionary, so they cannot
//! mutate the instance that is calling them.

use crate::checked::CheckedDict;
use crate::value::Value;

/// Outcome of a [`MutationGuard`].
#[derive(Debug, Clone, PartialEq)]
pub enum GuardDecision {
    /// Store the value as given.
    Accept,
    /// Store this value instead.
    Replace(Value),
    /// Abort the write; the mapping is left unchanged.
    Veto(String),
}

/// Intercepts a write before it is stored.
pub trait MutationGuard: Send + Sync {
    fn before_set(
        &self,
        dict: &CheckedDict,
        key: &str,
        old: Option<&Value>,
        new: &Value,
    ) -> GuardDecision;
}

impl<F> MutationGuard for F
where
    F: Fn(&CheckedDict, &str, Option<&Value>, &Value) -> GuardDecision + Send + Sync,
{
    fn before_set(
        &self,
        dict: &CheckedDict,
        key: &str,
        old: Option<&Value>,
        new: &Value,
    ) -> GuardDecision {
        self(dict, key, old, new)
    }
}

/// Notified after a write has been stored.
pub trait MutationObserver: Send + Sync {
    fn after_set(&self, key: &str, value: &Value);
}

impl<F> MutationObserver for F
where
    F: Fn(&str, &Value) + Send + Sync,
{
    fn after_set(&self, key: &str, value: &Value) {
        self(key, value)
    }
}
