// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashMap;

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::decision::{Decision, DecisionHooks};
use crate::rule::Rule;

/// Flat action → allowed mapping produced by [`PolicyBackend::serialize`].
pub type Permissions = HashMap<String, bool>;

/// Contract a host authorization framework uses to store and check policies.
#[async_trait]
pub trait PolicyBackend: Send + Sync {
	type Error: std::error::Error + Send + Sync + 'static;

	/// Short identifier of the storage backend.
	fn name(&self) -> &str;

	/// Inserts or replaces the policy for `action`.
	async fn set_policy(&self, action: &str, rule: Rule) -> Result<(), Self::Error>;

	/// Removes the policy for `action`. Removing an absent policy is not an error.
	async fn unset_policy(&self, action: &str) -> Result<(), Self::Error>;

	/// Decides whether `action` may be performed for `request`.
	///
	/// Never fails: storage problems surface as [`crate::DenyReason::LookupError`].
	async fn can(&self, request: &RequestContext, action: &str) -> Decision;

	/// Resolves every stored policy against `request`.
	async fn serialize(&self, request: &RequestContext) -> Result<Permissions, Self::Error>;

	/// Runs [`PolicyBackend::can`] and reports the outcome through `hooks`.
	async fn check<H>(&self, request: &RequestContext, action: &str, hooks: &H)
	where
		H: DecisionHooks + Sync + ?Sized,
	{
		self.can(request, action).await.report(hooks);
	}
}
