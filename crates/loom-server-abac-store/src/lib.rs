// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite-backed ABAC policy store for Loom.
//!
//! Persists `(action, rule)` pairs in a keyed collection and answers
//! authorization checks against them through the
//! [`loom_abac_core::PolicyBackend`] trait.
//!
//! # Architecture
//!
//! - `collection` - Keyed document collection (upsert/delete/find/group)
//! - `store` - [`PolicyStore`], the backend the host framework talks to
//! - `config` - Layered configuration (defaults, TOML, `LOOM_ABAC_*` env)
//! - `pool` - SQLite pool bootstrap
//!
//! # Example
//!
//! ```ignore
//! use loom_server_abac_store::{load_config, PolicyStore, PolicyBackend, RequestContext, Rule};
//!
//! let store = PolicyStore::connect(&load_config()?).await?;
//! store.set_policy("publish article", Rule::Literal(true)).await?;
//!
//! let decision = store.can(&RequestContext::new().with_user_id("alice"), "publish article").await;
//! assert!(decision.is_allowed());
//! ```

pub mod collection;
pub mod config;
pub mod error;
pub mod pool;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use collection::{PolicyCollection, PolicyDocument, PolicyGroup, SqlitePolicyCollection};
pub use config::{
	load_config, load_config_from_env, load_config_with_file, ConfigError, PolicyStoreConfig,
	PolicyStoreConfigLayer, DEFAULT_COLLECTION,
};
pub use error::{PolicyStoreError, Result};
pub use pool::create_pool;
pub use store::PolicyStore;

// Re-export core types for convenience
pub use loom_abac_core::*;
