// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy rules.
//!
//! A rule is either a literal boolean or a named predicate over a
//! [`RequestContext`]. Predicates are plain Rust closures, so what gets
//! persisted is a [`RuleDocument`] carrying the predicate's name; the closure
//! itself lives in a [`PredicateRegistry`] owned by the process evaluating it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::RequestContext;
use crate::error::{PredicateRegistryError, RuleDocumentError};

type PredicateFn = dyn Fn(&RequestContext) -> bool + Send + Sync;

/// A named boolean function of the request context.
#[derive(Clone)]
pub struct Predicate {
	name: String,
	check: Arc<PredicateFn>,
}

impl Predicate {
	pub fn new<F>(name: impl Into<String>, check: F) -> Self
	where
		F: Fn(&RequestContext) -> bool + Send + Sync + 'static,
	{
		Self {
			name: name.into(),
			check: Arc::new(check),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn evaluate(&self, ctx: &RequestContext) -> bool {
		(self.check)(ctx)
	}

	/// True when both handles point at the same function.
	pub fn same_function(&self, other: &Predicate) -> bool {
		Arc::ptr_eq(&self.check, &other.check)
	}
}

impl fmt::Debug for Predicate {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Predicate")
			.field("name", &self.name)
			.finish_non_exhaustive()
	}
}

/// Decision logic attached to an action.
#[derive(Debug, Clone)]
pub enum Rule {
	Literal(bool),
	Predicate(Predicate),
}

impl Rule {
	pub fn predicate<F>(name: impl Into<String>, check: F) -> Self
	where
		F: Fn(&RequestContext) -> bool + Send + Sync + 'static,
	{
		Rule::Predicate(Predicate::new(name, check))
	}

	pub fn evaluate(&self, ctx: &RequestContext) -> bool {
		match self {
			Rule::Literal(value) => *value,
			Rule::Predicate(predicate) => predicate.evaluate(ctx),
		}
	}

	/// The persisted form of this rule.
	pub fn to_document(&self) -> RuleDocument {
		match self {
			Rule::Literal(value) => RuleDocument::Literal(*value),
			Rule::Predicate(predicate) => RuleDocument::Predicate(predicate.name.clone()),
		}
	}
}

impl From<bool> for Rule {
	fn from(value: bool) -> Self {
		Rule::Literal(value)
	}
}

impl From<Predicate> for Rule {
	fn from(predicate: Predicate) -> Self {
		Rule::Predicate(predicate)
	}
}

/// Stored representation of a [`Rule`].
///
/// Serializes as `{"literal": true}` or `{"predicate": "owner_is_user"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleDocument {
	Literal(bool),
	Predicate(String),
}

impl RuleDocument {
	/// Parses a stored rule value.
	///
	/// A bare JSON boolean is accepted as a literal, since other producers
	/// write rules that way.
	pub fn from_value(value: &Value) -> Result<Self, RuleDocumentError> {
		if let Value::Bool(b) = value {
			return Ok(RuleDocument::Literal(*b));
		}
		serde_json::from_value(value.clone()).map_err(|_| RuleDocumentError::Malformed(value.to_string()))
	}

	pub fn to_value(&self) -> Value {
		match self {
			RuleDocument::Literal(b) => serde_json::json!({ "literal": b }),
			RuleDocument::Predicate(name) => serde_json::json!({ "predicate": name }),
		}
	}
}

/// Process-local lookup table from predicate name to function.
#[derive(Default)]
pub struct PredicateRegistry {
	predicates: RwLock<HashMap<String, Predicate>>,
}

impl PredicateRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a predicate, returning the one it replaced if any.
	pub fn register(&self, predicate: Predicate) -> Option<Predicate> {
		let previous = self
			.predicates
			.write()
			.insert(predicate.name.clone(), predicate);
		if let Some(ref p) = previous {
			tracing::debug!(predicate = %p.name, "replaced registered predicate");
		}
		previous
	}

	/// Fails if `predicate`'s name is already bound to a different function.
	pub fn ensure_compatible(&self, predicate: &Predicate) -> Result<(), PredicateRegistryError> {
		match self.predicates.read().get(&predicate.name) {
			Some(existing) if !existing.same_function(predicate) => {
				Err(PredicateRegistryError::Conflict(predicate.name.clone()))
			}
			_ => Ok(()),
		}
	}

	/// Registers a predicate unless its name is bound to a different function.
	///
	/// Registering the same function again is a no-op.
	pub fn try_register(&self, predicate: Predicate) -> Result<(), PredicateRegistryError> {
		let mut predicates = self.predicates.write();
		match predicates.get(&predicate.name) {
			Some(existing) if existing.same_function(&predicate) => Ok(()),
			Some(_) => Err(PredicateRegistryError::Conflict(predicate.name)),
			None => {
				predicates.insert(predicate.name.clone(), predicate);
				Ok(())
			}
		}
	}

	pub fn get(&self, name: &str) -> Option<Predicate> {
		self.predicates.read().get(name).cloned()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.predicates.read().contains_key(name)
	}

	pub fn len(&self) -> usize {
		self.predicates.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.predicates.read().is_empty()
	}

	/// Turns a stored document into an evaluable rule.
	pub fn resolve(&self, document: &RuleDocument) -> Result<Rule, RuleDocumentError> {
		match document {
			RuleDocument::Literal(value) => Ok(Rule::Literal(*value)),
			RuleDocument::Predicate(name) => self
				.get(name)
				.map(Rule::Predicate)
				.ok_or_else(|| RuleDocumentError::UnknownPredicate(name.clone())),
		}
	}

	/// Parses and resolves a raw stored rule value in one step.
	pub fn resolve_value(&self, value: &Value) -> Result<Rule, RuleDocumentError> {
		let document = RuleDocument::from_value(value)?;
		self.resolve(&document)
	}
}

impl fmt::Debug for PredicateRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let predicates = self.predicates.read();
		let mut names: Vec<&String> = predicates.keys().collect();
		names.sort();
		f.debug_struct("PredicateRegistry")
			.field("predicates", &names)
			.finish()
	}
}
