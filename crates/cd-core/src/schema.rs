//! Schema rules: declared types, ranges, choices and validate functions.
//!
//! Rules are keyed with a suffix convention on the default key `K`:
//! `K::type`, `K::range`, `K::choices`, or the bare `K` for a validate
//! function.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::checked::CheckedDict;
use crate::error::{Error, Result};
use crate::value::{Value, ValueType};

/// Separator between a default key and its rule suffix.
pub const RULE_SEPARATOR: &str = "::";

/// Custom validation: `(dict, candidate) -> is_valid`.
pub type ValidateFn = Arc<dyn Fn(&CheckedDict, &Value) -> bool + Send + Sync>;

/// Produces the current set of choices on demand.
pub type ChoiceProvider = Arc<dyn Fn() -> Vec<Value> + Send + Sync>;

/// The set of value types accepted for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec(Vec<ValueType>);

impl TypeSpec {
    pub fn one(t: ValueType) -> Self {
        TypeSpec(vec![t])
    }

    /// Accept any of the given types. An empty input yields `null` only.
    pub fn any_of(types: impl IntoIterator<Item = ValueType>) -> Self {
        let mut types: Vec<ValueType> = types.into_iter().collect();
        types.sort();
        types.dedup();
        if types.is_empty() {
            types.push(ValueType::Null);
        }
        TypeSpec(types)
    }

    pub fn float() -> Self {
        Self::one(ValueType::Float)
    }

    pub fn string() -> Self {
        Self::one(ValueType::Str)
    }

    pub fn types(&self) -> &[ValueType] {
        &self.0
    }

    pub fn contains(&self, t: ValueType) -> bool {
        self.0.contains(&t)
    }

    /// Exactly `float`: any number is accepted.
    pub fn is_float_like(&self) -> bool {
        self.0 == [ValueType::Float]
    }

    pub fn is_string(&self) -> bool {
        self.0 == [ValueType::Str]
    }

    /// Whether `value` is an instance of this spec. Floats accept ints.
    pub fn accepts(&self, value: &Value) -> bool {
        let actual = value.value_type();
        self.contains(actual) || (actual == ValueType::Int && self.contains(ValueType::Float))
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [single] = self.0.as_slice() {
            return f.write_str(single.name());
        }
        let names: Vec<&str> = self.0.iter().map(|t| t.name()).collect();
        write!(f, "({})", names.join(", "))
    }
}

/// Allowed values for a key: a fixed set or a provider evaluated lazily.
#[derive(Clone)]
pub enum Choices {
    Fixed(Vec<Value>),
    Provider(ChoiceProvider),
}

impl Choices {
    /// Fixed choices. Duplicates are dropped, first occurrence wins.
    pub fn fixed<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Choices::Fixed(dedup(items.into_iter().map(Into::into)))
    }

    pub fn provider<F>(f: F) -> Self
    where
        F: Fn() -> Vec<Value> + Send + Sync + 'static,
    {
        Choices::Provider(Arc::new(f))
    }

    /// Current choices. Providers are invoked on every call.
    pub fn resolve(&self) -> Vec<Value> {
        match self {
            Choices::Fixed(items) => items.clone(),
            Choices::Provider(provider) => dedup(provider()),
        }
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, Choices::Provider(_))
    }
}

impl fmt::Debug for Choices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choices::Fixed(items) => f.debug_tuple("Fixed").field(items).finish(),
            Choices::Provider(_) => f.write_str("Provider(..)"),
        }
    }
}

fn dedup(items: impl IntoIterator<Item = Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// Format choices as `{a, b, c}` for messages.
pub fn format_choices(choices: &[Value]) -> String {
    let parts: Vec<String> = choices.iter().map(|c| c.to_string()).collect();
    format!("{{{}}}", parts.join(", "))
}

/// A single validator entry.
#[derive(Clone)]
pub enum Rule {
    Type(TypeSpec),
    /// Inclusive `(min, max)`. Ints are compared exactly against the
    /// integral part of the bounds, floats as `f64`.
    Range(f64, f64),
    Choices(Choices),
    Validate(ValidateFn),
}

impl Rule {
    /// The key suffix this rule is stored under (`None` for validate functions).
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            Rule::Type(_) => Some("type"),
            Rule::Range(..) => Some("range"),
            Rule::Choices(_) => Some("choices"),
            Rule::Validate(_) => None,
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Type(t) => write!(f, "Type({t})"),
            Rule::Range(lo, hi) => write!(f, "Range({lo}, {hi})"),
            Rule::Choices(c) => write!(f, "Choices({c:?})"),
            Rule::Validate(_) => f.write_str("Validate(..)"),
        }
    }
}

/// Split a validator key into the default key and its suffix.
pub fn split_rule_key(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once(RULE_SEPARATOR) {
        Some((key, suffix)) => (key, Some(suffix)),
        None => (raw, None),
    }
}

fn rule_key(key: &str, rule: &Rule) -> String {
    match rule.suffix() {
        Some(suffix) => format!("{key}{RULE_SEPARATOR}{suffix}"),
        None => key.to_string(),
    }
}

/// Validator rules, keyed `"key::type"`, `"key::range"`, `"key::choices"`
/// or `"key"`.
#[derive(Clone, Default, Debug)]
pub struct Validator {
    rules: BTreeMap<String, Rule>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a rule under its raw validator key.
    ///
    /// Fails if the key suffix does not name the kind of rule given.
    pub fn insert(&mut self, raw_key: &str, rule: Rule) -> Result<()> {
        let (key, suffix) = split_rule_key(raw_key);
        if key.is_empty() {
            return Err(Error::Schema(format!(
                "validator key {raw_key:?} has no default key"
            )));
        }
        if suffix != rule.suffix() {
            return Err(Error::Schema(format!(
                "validator key {raw_key:?} does not match rule {rule:?}"
            )));
        }
        self.rules.insert(raw_key.to_string(), rule);
        Ok(())
    }

    /// Set a rule for `key`, deriving the validator key from the rule kind.
    pub fn set_rule(&mut self, key: &str, rule: Rule) {
        self.rules.insert(rule_key(key, &rule), rule);
    }

    pub fn with_type(mut self, key: &str, spec: TypeSpec) -> Self {
        self.set_rule(key, Rule::Type(spec));
        self
    }

    pub fn with_range(mut self, key: &str, min: f64, max: f64) -> Self {
        self.set_rule(key, Rule::Range(min, max));
        self
    }

    pub fn with_choices(mut self, key: &str, choices: Choices) -> Self {
        self.set_rule(key, Rule::Choices(choices));
        self
    }

    pub fn with_validate<F>(mut self, key: &str, f: F) -> Self
    where
        F: Fn(&CheckedDict, &Value) -> bool + Send + Sync + 'static,
    {
        self.set_rule(key, Rule::Validate(Arc::new(f)));
        self
    }

    pub fn get(&self, raw_key: &str) -> Option<&Rule> {
        self.rules.get(raw_key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.rules.iter().map(|(k, r)| (k.as_str(), r))
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn type_of(&self, key: &str) -> Option<&TypeSpec> {
        match self.rules.get(&format!("{key}::type")) {
            Some(Rule::Type(spec)) => Some(spec),
            _ => None,
        }
    }

    pub fn range_of(&self, key: &str) -> Option<(f64, f64)> {
        match self.rules.get(&format!("{key}::range")) {
            Some(Rule::Range(lo, hi)) => Some((*lo, *hi)),
            _ => None,
        }
    }

    pub fn choices_of(&self, key: &str) -> Option<&Choices> {
        match self.rules.get(&format!("{key}::choices")) {
            Some(Rule::Choices(choices)) => Some(choices),
            _ => None,
        }
    }

    pub fn validate_fn_of(&self, key: &str) -> Option<&ValidateFn> {
        match self.rules.get(key) {
            Some(Rule::Validate(f)) => Some(f),
            _ => None,
        }
    }

    /// Check that every rule refers to a default key and is well formed.
    pub fn check_against(&self, defaults: &BTreeMap<String, Value>) -> Result<()> {
        let mut missing: Vec<&str> = self
            .rules
            .keys()
            .map(|raw| split_rule_key(raw).0)
            .filter(|key| !defaults.contains_key(*key))
            .collect();
        missing.dedup();
        if !missing.is_empty() {
            return Err(Error::Schema(format!(
                "the validator has keys not present in the defaults ({})",
                missing.join(", ")
            )));
        }
        for (raw, rule) in &self.rules {
            if split_rule_key(raw).1 != rule.suffix() {
                return Err(Error::Schema(format!(
                    "validator key {raw:?} does not match rule {rule:?}"
                )));
            }
            if let Rule::Range(lo, hi) = rule {
                if lo.is_nan() || hi.is_nan() || lo > hi {
                    return Err(Error::Schema(format!(
                        "invalid range for {raw}: ({lo}, {hi})"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Schema for one key added incrementally with [`CheckedDict::add_key`].
#[derive(Clone, Default, Debug)]
pub struct KeySpec {
    pub ty: Option<TypeSpec>,
    pub choices: Option<Choices>,
    pub range: Option<(f64, f64)>,
    pub validate: Option<ValidateFnHolder>,
    pub doc: Option<String>,
}

/// Debuggable wrapper for a validate function inside [`KeySpec`].
#[derive(Clone)]
pub struct ValidateFnHolder(pub ValidateFn);

impl fmt::Debug for ValidateFnHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValidateFn(..)")
    }
}

impl KeySpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ty(mut self, spec: TypeSpec) -> Self {
        self.ty = Some(spec);
        self
    }

    pub fn choices(mut self, choices: Choices) -> Self {
        self.choices = Some(choices);
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }

    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&CheckedDict, &Value) -> bool + Send + Sync + 'static,
    {
        self.validate = Some(ValidateFnHolder(Arc::new(f)));
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}
