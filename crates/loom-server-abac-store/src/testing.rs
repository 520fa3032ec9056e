// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use loom_abac_core::{Predicate, PredicateRegistry};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::collection::SqlitePolicyCollection;
use crate::store::PolicyStore;

/// In-memory pool pinned to a single connection, so every query sees the
/// same database.
pub async fn create_test_pool() -> SqlitePool {
	SqlitePoolOptions::new()
		.max_connections(1)
		.idle_timeout(None)
		.max_lifetime(None)
		.connect("sqlite::memory:")
		.await
		.unwrap()
}

pub async fn create_test_store() -> PolicyStore {
	let collection = SqlitePolicyCollection::open_default(create_test_pool().await)
		.await
		.unwrap();
	PolicyStore::new(collection)
}

/// Store whose registry already knows the common test predicates.
pub async fn create_test_store_with_predicates() -> PolicyStore {
	let registry = Arc::new(PredicateRegistry::new());
	registry.register(owner_is_user());
	let collection = SqlitePolicyCollection::open_default(create_test_pool().await)
		.await
		.unwrap();
	PolicyStore::with_registry(collection, registry)
}

/// `owner` and `user` attributes are present and equal.
pub fn owner_is_user() -> Predicate {
	Predicate::new("owner_is_user", |ctx| ctx.attributes_match("owner", "user"))
}
