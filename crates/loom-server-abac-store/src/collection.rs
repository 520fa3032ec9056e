// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Keyed policy collection.
//!
//! [`PolicyCollection`] is the storage contract the policy store needs:
//! upsert, delete and find by action, plus a grouping pass over the whole
//! collection. [`SqlitePolicyCollection`] implements it as a table of JSON
//! documents keyed by action.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sqlx::{sqlite::SqlitePool, FromRow};
use tracing::instrument;

use crate::config::{validate_collection_name, DEFAULT_COLLECTION};
use crate::error::{PolicyStoreError, Result};

/// A stored policy as read back from the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyDocument {
	pub action: String,
	pub rule: Value,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// All rule values stored under one action, as produced by a grouping pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyGroup {
	pub action: String,
	pub rules: Vec<Value>,
}

#[async_trait]
pub trait PolicyCollection: Send + Sync {
	/// Identifier of the storage engine, reported as the backend name.
	fn backend_name(&self) -> &'static str;

	fn collection_name(&self) -> &str;

	/// Insert or replace the document for `action`. Returns only once the
	/// write has been acknowledged.
	async fn upsert(&self, action: &str, rule: &Value) -> Result<()>;

	/// Delete the document for `action`, returning the number removed.
	async fn delete(&self, action: &str) -> Result<u64>;

	async fn find_one(&self, action: &str) -> Result<Option<PolicyDocument>>;

	/// Group every document in the collection by action.
	async fn group_by_action(&self) -> Result<Vec<PolicyGroup>>;
}

#[derive(Debug, FromRow)]
struct PolicyRow {
	action: String,
	rule: String,
	created_at: String,
	updated_at: String,
}

impl TryFrom<PolicyRow> for PolicyDocument {
	type Error = PolicyStoreError;

	fn try_from(row: PolicyRow) -> Result<Self> {
		Ok(PolicyDocument {
			rule: parse_rule_text(&row.rule),
			created_at: parse_timestamp(&row.action, &row.created_at, "created_at")?,
			updated_at: parse_timestamp(&row.action, &row.updated_at, "updated_at")?,
			action: row.action,
		})
	}
}

#[derive(Debug, FromRow)]
struct GroupRow {
	action: String,
	rules: String,
}

impl TryFrom<GroupRow> for PolicyGroup {
	type Error = PolicyStoreError;

	fn try_from(row: GroupRow) -> Result<Self> {
		let raw: Vec<String> = serde_json::from_str(&row.rules)?;
		Ok(PolicyGroup {
			action: row.action,
			rules: raw.iter().map(|text| parse_rule_text(text)).collect(),
		})
	}
}

/// Stored rule text that is not valid JSON is kept as a JSON string so the
/// reader classifies it as a malformed rule instead of failing the lookup.
fn parse_rule_text(text: &str) -> Value {
	serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn parse_timestamp(action: &str, value: &str, field: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| {
			PolicyStoreError::Internal(format!(
				"Invalid {field} {value:?} for action \"{action}\": {e}"
			))
		})
}

/// Policy collection stored as a SQLite table.
#[derive(Clone, Debug)]
pub struct SqlitePolicyCollection {
	pool: SqlitePool,
	name: String,
}

impl SqlitePolicyCollection {
	pub const BACKEND_NAME: &'static str = "sqlite";

	/// Opens the named collection, creating its table if needed.
	///
	/// # Errors
	/// Returns `PolicyStoreError::Config` if `name` is not a valid collection
	/// name or the table cannot be created.
	#[instrument(skip(pool, name))]
	pub async fn open(pool: SqlitePool, name: impl Into<String>) -> Result<Self> {
		let name = name.into();
		validate_collection_name(&name)?;

		let collection = Self { pool, name };
		collection.ensure_table().await.map_err(|e| {
			PolicyStoreError::Config(format!(
				"cannot create collection '{}': {e}",
				collection.name
			))
		})?;

		tracing::debug!(collection = %collection.name, "policy collection ready");
		Ok(collection)
	}

	/// Opens the default `policies` collection.
	pub async fn open_default(pool: SqlitePool) -> Result<Self> {
		Self::open(pool, DEFAULT_COLLECTION).await
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	async fn ensure_table(&self) -> Result<()> {
		sqlx::query(&format!(
			r#"
			CREATE TABLE IF NOT EXISTS "{}" (
				action TEXT PRIMARY KEY NOT NULL,
				rule TEXT NOT NULL,
				created_at TEXT NOT NULL,
				updated_at TEXT NOT NULL
			)
			"#,
			self.name
		))
		.execute(&self.pool)
		.await?;
		Ok(())
	}
}

#[async_trait]
impl PolicyCollection for SqlitePolicyCollection {
	fn backend_name(&self) -> &'static str {
		Self::BACKEND_NAME
	}

	fn collection_name(&self) -> &str {
		&self.name
	}

	#[instrument(skip(self, rule), fields(collection = %self.name))]
	async fn upsert(&self, action: &str, rule: &Value) -> Result<()> {
		let now = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);
		let rule_json = serde_json::to_string(rule)?;

		let result = sqlx::query(&format!(
			r#"
			INSERT INTO "{}" (action, rule, created_at, updated_at)
			VALUES (?, ?, ?, ?)
			ON CONFLICT(action) DO UPDATE SET
				rule = excluded.rule,
				updated_at = excluded.updated_at
			"#,
			self.name
		))
		.bind(action)
		.bind(&rule_json)
		.bind(&now)
		.bind(&now)
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(PolicyStoreError::Unacknowledged(action.to_string()));
		}

		Ok(())
	}

	#[instrument(skip(self), fields(collection = %self.name))]
	async fn delete(&self, action: &str) -> Result<u64> {
		let result = sqlx::query(&format!(r#"DELETE FROM "{}" WHERE action = ?"#, self.name))
			.bind(action)
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected())
	}

	#[instrument(skip(self), fields(collection = %self.name))]
	async fn find_one(&self, action: &str) -> Result<Option<PolicyDocument>> {
		let row = sqlx::query_as::<_, PolicyRow>(&format!(
			r#"
			SELECT action, rule, created_at, updated_at
			FROM "{}"
			WHERE action = ?
			"#,
			self.name
		))
		.bind(action)
		.fetch_optional(&self.pool)
		.await?;

		row.map(TryInto::try_into).transpose()
	}

	#[instrument(skip(self), fields(collection = %self.name))]
	async fn group_by_action(&self) -> Result<Vec<PolicyGroup>> {
		let rows = sqlx::query_as::<_, GroupRow>(&format!(
			r#"
			SELECT action, json_group_array(rule) AS rules
			FROM "{}"
			GROUP BY action
			"#,
			self.name
		))
		.fetch_all(&self.pool)
		.await?;

		tracing::debug!(count = rows.len(), "grouped policies by action");
		rows.into_iter().map(TryInto::try_into).collect()
	}
}
