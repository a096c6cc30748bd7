//! The schema-validated mapping.
//!
//! A [`CheckedDict`] only holds keys present in its defaults. Every write is
//! checked against the declared type, range, choices and validate function
//! for that key before it is stored.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::trace;

use crate::error::{Error, Result};
use crate::hooks::{GuardDecision, MutationGuard, MutationObserver};
use crate::schema::{format_choices, KeySpec, Rule, TypeSpec, Validator};
use crate::value::{Value, ValueType};

/// A dictionary restricted to the keys of a default mapping, validating
/// every value written to it.
#[derive(Clone)]
pub struct CheckedDict {
    defaults: BTreeMap<String, Value>,
    validator: Validator,
    docs: BTreeMap<String, String>,
    values: BTreeMap<String, Value>,
    guards: Vec<Arc<dyn MutationGuard>>,
    observers: Vec<Arc<dyn MutationObserver>>,
}

impl std::fmt::Debug for CheckedDict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckedDict")
            .field("values", &self.values)
            .field("validator", &self.validator)
            .field("guards", &self.guards.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl CheckedDict {
    /// Create a dictionary from defaults, validator rules and key docs.
    ///
    /// Fails with [`Error::Schema`] if the validator refers to a key that
    /// is not in `defaults`. Values start out equal to the defaults.
    pub fn new(
        defaults: BTreeMap<String, Value>,
        validator: Validator,
        docs: BTreeMap<String, String>,
    ) -> Result<Self> {
        validator.check_against(&defaults)?;
        Ok(Self {
            values: defaults.clone(),
            defaults,
            validator,
            docs,
            guards: Vec::new(),
            observers: Vec::new(),
        })
    }

    /// A dictionary with defaults only and no extra rules.
    pub fn from_defaults(defaults: BTreeMap<String, Value>) -> Self {
        Self {
            values: defaults.clone(),
            defaults,
            validator: Validator::new(),
            docs: BTreeMap::new(),
            guards: Vec::new(),
            observers: Vec::new(),
        }
    }

    pub fn with_guard(mut self, guard: impl MutationGuard + 'static) -> Self {
        self.add_guard(guard);
        self
    }

    pub fn with_observer(mut self, observer: impl MutationObserver + 'static) -> Self {
        self.add_observer(observer);
        self
    }

    /// Append a guard; guards run in the order they were added.
    pub fn add_guard(&mut self, guard: impl MutationGuard + 'static) {
        self.guards.push(Arc::new(guard));
    }

    /// Append an already shared guard.
    pub fn add_shared_guard(&mut self, guard: Arc<dyn MutationGuard>) {
        self.guards.push(guard);
    }

    /// Append an observer; observers run in the order they were added.
    pub fn add_observer(&mut self, observer: impl MutationObserver + 'static) {
        self.observers.push(Arc::new(observer));
    }

    /// Add a key to the defaults, together with its rules and doc.
    ///
    /// Meant for building a schema step by step before the first load. A
    /// new key starts out with `value`; an existing key keeps its current
    /// value.
    pub fn add_key(&mut self, key: &str, value: impl Into<Value>, spec: KeySpec) -> Result<()> {
        if key.is_empty() || key.contains(crate::schema::RULE_SEPARATOR) {
            return Err(Error::Schema(format!("invalid key name {key:?}")));
        }
        if let Some((lo, hi)) = spec.range {
            if lo.is_nan() || hi.is_nan() || lo > hi {
                return Err(Error::Schema(format!(
                    "invalid range for {key}: ({lo}, {hi})"
                )));
            }
        }
        let value = value.into();
        self.defaults.insert(key.to_string(), value.clone());
        self.values.entry(key.to_string()).or_insert(value);
        if let Some(ty) = spec.ty {
            self.validator.set_rule(key, Rule::Type(ty));
        }
        if let Some(choices) = spec.choices {
            self.validator.set_rule(key, Rule::Choices(choices));
        }
        if let Some((lo, hi)) = spec.range {
            self.validator.set_rule(key, Rule::Range(lo, hi));
        }
        if let Some(f) = spec.validate {
            self.validator.set_rule(key, Rule::Validate(f.0));
        }
        if let Some(doc) = spec.doc {
            self.docs.insert(key.to_string(), doc);
        }
        Ok(())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.defaults.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Current contents, sorted by key.
    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    pub fn defaults(&self) -> &BTreeMap<String, Value> {
        &self.defaults
    }

    pub fn docs(&self) -> &BTreeMap<String, String> {
        &self.docs
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn get_doc(&self, key: &str) -> Option<&str> {
        self.docs.get(key).map(String::as_str)
    }

    /// Write `value` under `key`.
    ///
    /// Returns `Ok(false)` when the value equals the stored one (nothing is
    /// validated and no hook runs), `Ok(true)` once the value is stored.
    /// Numbers compare by value, so `100.0` over a stored `100` is unchanged.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<bool> {
        let mut value = value.into();
        if !self.contains_key(key) {
            return Err(Error::UnknownKey {
                key: key.to_string(),
            });
        }
        let old = self.values.get(key);
        if old.is_some_and(|old| old.same_as(&value)) {
            return Ok(false);
        }
        if let Some(msg) = self.check_value(key, &value) {
            return Err(Error::Validation(msg));
        }
        for guard in &self.guards {
            match guard.before_set(self, key, old, &value) {
                GuardDecision::Accept => {}
                GuardDecision::Replace(replacement) => value = replacement,
                GuardDecision::Veto(reason) => {
                    return Err(Error::Rejected {
                        key: key.to_string(),
                        reason,
                    })
                }
            }
        }
        trace!(key, value = %value, "storing value");
        self.values.insert(key.to_string(), value);
        if let Some(stored) = self.values.get(key) {
            for observer in &self.observers {
                observer.after_set(key, stored);
            }
        }
        Ok(true)
    }

    /// Check whether `value` is valid for `key`.
    ///
    /// Returns an error message, or `None` if the value passes every rule.
    pub fn check_value(&self, key: &str, value: &Value) -> Option<String> {
        if !self.contains_key(key) {
            return Some(format!("Unknown key: {key}"));
        }
        if !value.is_finite() {
            return Some(format!("Expected finite float for key {key}, got {value}"));
        }
        if let Some(choices) = self.validator.choices_of(key) {
            let choices = choices.resolve();
            if !choices.contains(value) {
                return Some(format!(
                    "key {key} should be one of {}, got {value}",
                    format_choices(&choices)
                ));
            }
        }
        if let Some(func) = self.validator.validate_fn_of(key) {
            if !func(self, value) {
                return Some(format!("{value} is not valid for key {key}"));
            }
        }
        let expected = self.expected_type(key)?;
        let actual = value.value_type();
        if expected.is_float_like() {
            if !actual.is_numeric() {
                return Some(format!(
                    "Expected floatlike for key {key}, got {actual}"
                ));
            }
        } else if expected.is_string() {
            if actual != ValueType::Str {
                return Some(format!("Expected str for key {key}, got {actual}"));
            }
        } else if !expected.accepts(value) {
            return Some(format!("Expected {expected} for key {key}, got {actual}"));
        }
        if let Some((lo, hi)) = self.validator.range_of(key) {
            let in_range = match value {
                Value::Int(i) => int_in_range(*i, lo, hi),
                _ => value.as_f64().is_some_and(|x| lo <= x && x <= hi),
            };
            if !in_range {
                return Some(format!(
                    "Value for key {key} should be within range ({lo}, {hi}), got {value}"
                ));
            }
        }
        None
    }

    /// The type expected for `key`.
    ///
    /// An explicit `::type` rule wins. Otherwise the type is inferred from
    /// the choices (any numeric choice makes it float-like), and finally from
    /// the default value, with every number reduced to float-like.
    pub fn get_type(&self, key: &str) -> Result<TypeSpec> {
        self.expected_type(key).ok_or_else(|| Error::UnknownKey {
            key: key.to_string(),
        })
    }

    pub(crate) fn expected_type(&self, key: &str) -> Option<TypeSpec> {
        if let Some(spec) = self.validator.type_of(key) {
            return Some(spec.clone());
        }
        if let Some(choices) = self.validator.choices_of(key) {
            let choices = choices.resolve();
            if !choices.is_empty() {
                let types: Vec<ValueType> = choices.iter().map(Value::value_type).collect();
                if types.iter().any(|t| t.is_numeric()) {
                    return Some(TypeSpec::float());
                }
                return Some(TypeSpec::any_of(types));
            }
        }
        let default = self.defaults.get(key)?;
        let t = default.value_type();
        if t.is_numeric() {
            Some(TypeSpec::float())
        } else {
            Some(TypeSpec::one(t))
        }
    }

    /// [`get_type`](Self::get_type) rendered as a string, e.g. `float` or `(int, str)`.
    pub fn get_typestr(&self, key: &str) -> Result<String> {
        Ok(self.get_type(key)?.to_string())
    }

    /// Possible values for `key`, or `None` if no choices are declared.
    ///
    /// Choices given as a provider are recomputed on every call.
    pub fn get_choices(&self, key: &str) -> Result<Option<Vec<Value>>> {
        self.ensure_known(key)?;
        Ok(self.validator.choices_of(key).map(|c| c.resolve()))
    }

    /// The declared `(min, max)` range for `key`, if any.
    pub fn get_range(&self, key: &str) -> Result<Option<(f64, f64)>> {
        self.ensure_known(key)?;
        Ok(self.validator.range_of(key))
    }

    fn ensure_known(&self, key: &str) -> Result<()> {
        if self.contains_key(key) {
            Ok(())
        } else {
            Err(Error::UnknownKey {
                key: key.to_string(),
            })
        }
    }

    /// Keys whose current value differs from the default, with that value.
    pub fn diff(&self) -> BTreeMap<String, Value> {
        self.values
            .iter()
            .filter(|(key, value)| {
                !self
                    .defaults
                    .get(*key)
                    .is_some_and(|default| default.same_as(value))
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Check whether `candidate` could be used to update this dictionary.
    ///
    /// Returns a message naming unknown keys or the first invalid value.
    pub fn check_dict(&self, candidate: &BTreeMap<String, Value>) -> Option<String> {
        let invalid: Vec<&str> = candidate
            .keys()
            .filter(|key| !self.contains_key(key))
            .map(String::as_str)
            .collect();
        if !invalid.is_empty() {
            return Some(format!("Some keys are not valid: [{}]", invalid.join(", ")));
        }
        candidate
            .iter()
            .find_map(|(key, value)| self.check_value(key, value))
    }

    /// Apply every value in `candidate`, or none of them.
    ///
    /// Guards and observers are not run; this is the bulk/hydration path.
    pub fn update(&mut self, candidate: &BTreeMap<String, Value>) -> Result<()> {
        if let Some(msg) = self.check_dict(candidate) {
            return Err(Error::Validation(format!("dict is invalid: {msg}")));
        }
        for (key, value) in candidate {
            self.values.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    /// Restore every key to its default.
    pub fn reset(&mut self) {
        self.values = self.defaults.clone();
    }
}

/// Exact range check for integers. Casting to `f64` would round values
/// beyond 2^53 onto the bounds.
fn int_in_range(value: i64, lo: f64, hi: f64) -> bool {
    // Float-to-int casts saturate, so infinite bounds stay unbounded.
    let lo = lo.ceil() as i128;
    let hi = hi.floor() as i128;
    lo <= i128::from(value) && i128::from(value) <= hi
}
