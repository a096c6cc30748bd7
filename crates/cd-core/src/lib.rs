//! configdict core: the schema-validated mapping.
//!
//! This crate provides:
//! - The closed [`Value`] model stored in configurations
//! - Validator rules (types, ranges, fixed or lazy choices, validate functions)
//! - [`CheckedDict`], a mapping that enforces those rules on every write
//! - Guard/observer hooks around writes
//! - YAML, reStructuredText and table renderings
//! - The shared [`Error`] type

pub mod checked;
pub mod error;
pub mod hooks;
pub mod render;
pub mod schema;
pub mod value;

pub use checked::CheckedDict;
pub use error::{Error, ErrorCategory, Result};
pub use hooks::{GuardDecision, MutationGuard, MutationObserver};
pub use schema::{Choices, KeySpec, Rule, TypeSpec, Validator};
pub use value::{Value, ValueType};
