// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteSynchronous};
use std::str::FromStr;

use crate::error::PolicyStoreError;

/// Create the SqlitePool backing a policy collection.
///
/// # Arguments
/// * `database_url` - SQLite connection string (e.g., "sqlite:./loom.db")
///
/// # Errors
/// Returns `PolicyStoreError::Config` if the URL is invalid, and
/// `PolicyStoreError::Sqlx` if the connection cannot be established.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, PolicyStoreError> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| PolicyStoreError::Config(format!("Invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.create_if_missing(true);

	let pool = SqlitePool::connect_with(options).await?;

	tracing::debug!("policy database pool created");
	Ok(pool)
}
