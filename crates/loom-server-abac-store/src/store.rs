// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy store backed by a [`PolicyCollection`].
//!
//! Every call goes to storage; nothing about individual policies is cached
//! in process. The only in-process state is the [`PredicateRegistry`] that
//! maps stored predicate names back to functions.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::SqlitePool;
use tracing::{debug, instrument, warn};

use loom_abac_core::{
	Decision, Denial, DenyReason, Permissions, PolicyBackend, Predicate, PredicateRegistry,
	RequestContext, Rule, RuleDocumentError,
};

use crate::collection::{PolicyCollection, PolicyGroup, SqlitePolicyCollection};
use crate::config::{PolicyStoreConfig, DEFAULT_COLLECTION};
use crate::error::{PolicyStoreError, Result};
use crate::pool::create_pool;

pub struct PolicyStore<C = SqlitePolicyCollection> {
	collection: C,
	predicates: Arc<PredicateRegistry>,
}

impl<C: PolicyCollection> PolicyStore<C> {
	pub fn new(collection: C) -> Self {
		Self::with_registry(collection, Arc::new(PredicateRegistry::new()))
	}

	/// Builds a store sharing an existing predicate registry.
	pub fn with_registry(collection: C, predicates: Arc<PredicateRegistry>) -> Self {
		Self {
			collection,
			predicates,
		}
	}

	pub fn collection(&self) -> &C {
		&self.collection
	}

	pub fn predicates(&self) -> &Arc<PredicateRegistry> {
		&self.predicates
	}

	/// Makes a predicate available for evaluation without writing a policy.
	///
	/// Needed when the policy referencing it was stored by another process.
	/// Fails if the name is already bound to a different function.
	pub fn register_predicate(&self, predicate: Predicate) -> Result<()> {
		self.predicates.try_register(predicate)?;
		Ok(())
	}

	fn resolve(&self, value: &Value) -> std::result::Result<Rule, RuleDocumentError> {
		self.predicates.resolve_value(value)
	}

	/// Reduces one group to a single boolean. The last stored value wins;
	/// malformed rules count as false.
	fn reduce_group(&self, request: &RequestContext, group: &PolicyGroup) -> bool {
		let mut allowed = false;
		for value in &group.rules {
			allowed = match self.resolve(value) {
				Ok(rule) => rule.evaluate(request),
				Err(err) => {
					warn!(action = %group.action, error = %err, "malformed rule serialized as denied");
					false
				}
			};
		}
		allowed
	}
}

impl PolicyStore<SqlitePolicyCollection> {
	/// Opens a store on an existing pool. `collection` defaults to `policies`.
	pub async fn open(pool: SqlitePool, collection: Option<&str>) -> Result<Self> {
		let name = collection.unwrap_or(DEFAULT_COLLECTION);
		let collection = SqlitePolicyCollection::open(pool, name).await?;
		Ok(Self::new(collection))
	}

	/// Connects to the configured database and opens the configured collection.
	#[instrument(skip(config), fields(collection = %config.collection))]
	pub async fn connect(config: &PolicyStoreConfig) -> Result<Self> {
		let pool = create_pool(&config.database_url).await?;
		Self::open(pool, Some(&config.collection)).await
	}
}

#[async_trait]
impl<C: PolicyCollection> PolicyBackend for PolicyStore<C> {
	type Error = PolicyStoreError;

	fn name(&self) -> &str {
		self.collection.backend_name()
	}

	#[instrument(skip(self, rule))]
	async fn set_policy(&self, action: &str, rule: Rule) -> Result<()> {
		// A predicate name stays bound to one function for the registry's life.
		if let Rule::Predicate(ref predicate) = rule {
			self.predicates.ensure_compatible(predicate)?;
		}

		let document = rule.to_document().to_value();
		self.collection.upsert(action, &document).await?;

		if let Rule::Predicate(predicate) = rule {
			self.predicates.try_register(predicate)?;
		}

		debug!(rule = %document, "policy set");
		Ok(())
	}

	#[instrument(skip(self))]
	async fn unset_policy(&self, action: &str) -> Result<()> {
		let removed = self.collection.delete(action).await?;
		debug!(removed, "policy unset");
		Ok(())
	}

	#[instrument(skip(self, request))]
	async fn can(&self, request: &RequestContext, action: &str) -> Decision {
		let document = match self.collection.find_one(action).await {
			Ok(Some(document)) => document,
			Ok(None) => {
				debug!("denied: action not defined");
				return Decision::deny(DenyReason::NotDefined, action);
			}
			Err(err) => {
				warn!(error = %err, "denied: policy lookup failed");
				return Decision::Denied(Denial::new(DenyReason::LookupError, action).with_cause(err));
			}
		};

		match self.resolve(&document.rule) {
			Ok(rule) if rule.evaluate(request) => {
				debug!("allowed");
				Decision::Allowed
			}
			Ok(_) => {
				debug!("denied: rule evaluated to false");
				Decision::deny(DenyReason::RuleFailed, action)
			}
			Err(err) => {
				warn!(error = %err, "denied: malformed rule");
				Decision::Denied(Denial::new(DenyReason::MalformedRule, action).with_cause(err))
			}
		}
	}

	#[instrument(skip(self, request))]
	async fn serialize(&self, request: &RequestContext) -> Result<Permissions> {
		let groups = self.collection.group_by_action().await?;

		let mut permissions = Permissions::with_capacity(groups.len());
		for group in &groups {
			permissions.insert(group.action.clone(), self.reduce_group(request, group));
		}

		debug!(count = permissions.len(), "serialized policies");
		Ok(permissions)
	}
}
