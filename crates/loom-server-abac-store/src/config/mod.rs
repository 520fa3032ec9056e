// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the ABAC policy store.
//!
//! Layered the same way as the server configuration:
//! built-in defaults, then a TOML file, then `LOOM_ABAC_*` environment
//! variables.
//!
//! ```toml
//! database_url = "sqlite:/var/lib/loom/abac.db"
//! collection = "policies"
//! ```

pub mod sources;

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, info};

pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

pub const DEFAULT_DATABASE_URL: &str = "sqlite:./loom.db";
pub const DEFAULT_COLLECTION: &str = "policies";

const MAX_COLLECTION_NAME_LEN: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("failed to read config file {path}: {source}")]
	FileRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse config file {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("invalid value for {key}: {message}")]
	InvalidValue { key: String, message: String },
}

/// Policy store configuration (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyStoreConfig {
	pub database_url: String,
	pub collection: String,
}

impl Default for PolicyStoreConfig {
	fn default() -> Self {
		Self {
			database_url: DEFAULT_DATABASE_URL.to_string(),
			collection: DEFAULT_COLLECTION.to_string(),
		}
	}
}

/// Policy store configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyStoreConfigLayer {
	#[serde(default)]
	pub database_url: Option<String>,
	#[serde(default)]
	pub collection: Option<String>,
}

impl PolicyStoreConfigLayer {
	pub fn merge(&mut self, other: PolicyStoreConfigLayer) {
		if other.database_url.is_some() {
			self.database_url = other.database_url;
		}
		if other.collection.is_some() {
			self.collection = other.collection;
		}
	}

	pub fn finalize(self) -> Result<PolicyStoreConfig, ConfigError> {
		let config = PolicyStoreConfig {
			database_url: self
				.database_url
				.unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
			collection: self
				.collection
				.unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
		};
		validate_collection_name(&config.collection)?;
		Ok(config)
	}
}

/// Collection names become SQLite table names, so only plain identifiers
/// are accepted.
pub fn validate_collection_name(name: &str) -> Result<(), ConfigError> {
	let mut chars = name.chars();
	let valid_start = chars
		.next()
		.map(|c| c.is_ascii_alphabetic() || c == '_')
		.unwrap_or(false);
	let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

	if !valid_start || !valid_rest || name.len() > MAX_COLLECTION_NAME_LEN {
		return Err(ConfigError::InvalidValue {
			key: "collection".to_string(),
			message: format!(
				"'{name}' must be 1-{MAX_COLLECTION_NAME_LEN} characters of [A-Za-z0-9_] and not start with a digit"
			),
		});
	}

	if name.to_ascii_lowercase().starts_with("sqlite_") {
		return Err(ConfigError::InvalidValue {
			key: "collection".to_string(),
			message: format!("'{name}' uses the reserved sqlite_ prefix"),
		});
	}

	Ok(())
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`LOOM_ABAC_*`)
/// 2. Config file (`/etc/loom/abac.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<PolicyStoreConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only.
pub fn load_config_from_env() -> Result<PolicyStoreConfig, ConfigError> {
	load_from_sources(vec![Box::new(DefaultsSource), Box::new(EnvSource)])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<PathBuf>,
) -> Result<PolicyStoreConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<PolicyStoreConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = PolicyStoreConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	let config = merged.finalize()?;
	info!(
		database = %config.database_url,
		collection = %config.collection,
		"Policy store configuration loaded"
	);
	Ok(config)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = PolicyStoreConfigLayer::default().finalize().unwrap();
		assert_eq!(config, PolicyStoreConfig::default());
		assert_eq!(config.collection, "policies");
		assert_eq!(config.database_url, "sqlite:./loom.db");
	}

	#[test]
	fn test_merge_overrides_only_set_fields() {
		let mut base = PolicyStoreConfigLayer {
			database_url: Some("sqlite:/var/lib/loom/abac.db".to_string()),
			collection: Some("acl".to_string()),
		};
		base.merge(PolicyStoreConfigLayer {
			database_url: None,
			collection: Some("policies_v2".to_string()),
		});

		let config = base.finalize().unwrap();
		assert_eq!(config.database_url, "sqlite:/var/lib/loom/abac.db");
		assert_eq!(config.collection, "policies_v2");
	}

	#[test]
	fn test_collection_name_validation() {
		for ok in ["policies", "_p", "acl_2", "A"] {
			assert!(validate_collection_name(ok).is_ok(), "{ok}");
		}
		for bad in ["", "2fa", "drop table", "policies;--", "naïve", "sqlite_master"] {
			assert!(validate_collection_name(bad).is_err(), "{bad}");
		}
		assert!(validate_collection_name(&"a".repeat(65)).is_err());
	}

	#[test]
	fn test_finalize_rejects_bad_collection() {
		let layer = PolicyStoreConfigLayer {
			database_url: None,
			collection: Some("bad name".to_string()),
		};
		let err = layer.finalize().unwrap_err();
		assert!(err.to_string().contains("collection"));
	}

	#[test]
	fn test_load_with_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("abac.toml");
		std::fs::write(
			&path,
			"database_url = \"sqlite:/tmp/abac-test.db\"\ncollection = \"acl\"\n",
		)
		.unwrap();

		let layer = TomlSource::new(&path).load().unwrap();
		assert_eq!(layer.collection.as_deref(), Some("acl"));

		let mut merged = PolicyStoreConfigLayer::default();
		merged.merge(layer);
		let config = merged.finalize().unwrap();
		assert_eq!(config.database_url, "sqlite:/tmp/abac-test.db");
		assert_eq!(config.collection, "acl");
	}
}
