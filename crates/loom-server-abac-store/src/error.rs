// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use loom_abac_core::PredicateRegistryError;

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum PolicyStoreError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Configuration error: {0}")]
	Config(String),

	#[error("Write for action \"{0}\" was not acknowledged")]
	Unacknowledged(String),

	#[error(transparent)]
	PredicateConflict(#[from] PredicateRegistryError),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("Internal: {0}")]
	Internal(String),
}

impl From<ConfigError> for PolicyStoreError {
	fn from(err: ConfigError) -> Self {
		PolicyStoreError::Config(err.to_string())
	}
}

pub type Result<T> = std::result::Result<T, PolicyStoreError>;
