// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request context handed to predicate rules.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const USER_ID_KEY: &str = "user_id";

/// Caller-supplied attributes describing the request being authorized.
///
/// The host framework decides what goes in here (current user, session,
/// resource owner, ...). The policy store only passes it through to
/// predicate rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
	#[serde(default)]
	pub attributes: Map<String, Value>,
}

impl RequestContext {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the `user_id` attribute.
	pub fn with_user_id(self, user_id: impl Into<String>) -> Self {
		self.with_attribute(USER_ID_KEY, Value::String(user_id.into()))
	}

	/// Sets an arbitrary attribute, replacing any previous value.
	pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.attributes.insert(key.into(), value.into());
		self
	}

	pub fn user_id(&self) -> Option<&str> {
		self.attribute_str(USER_ID_KEY)
	}

	pub fn attribute(&self, key: &str) -> Option<&Value> {
		self.attributes.get(key)
	}

	/// Returns the attribute as a string slice if it is a JSON string.
	pub fn attribute_str(&self, key: &str) -> Option<&str> {
		self.attributes.get(key).and_then(Value::as_str)
	}

	/// True when both attributes are present and equal.
	pub fn attributes_match(&self, left: &str, right: &str) -> bool {
		match (self.attribute(left), self.attribute(right)) {
			(Some(l), Some(r)) => l == r,
			_ => false,
		}
	}
}
