// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for Loom's pluggable ABAC policy backends.
//!
//! A policy maps an action name to a [`Rule`]: either a literal boolean or a
//! named [`Predicate`] evaluated against the caller's [`RequestContext`].
//! Storage backends implement [`PolicyBackend`]; the server-side SQLite
//! implementation lives in `loom-server-abac-store`.
//!
//! # Example
//!
//! ```
//! use loom_abac_core::{Decision, DenyReason, Predicate, RequestContext, Rule};
//!
//! let rule = Rule::from(Predicate::new("owner_is_user", |ctx| {
//!     ctx.attributes_match("owner", "user")
//! }));
//!
//! let ctx = RequestContext::new()
//!     .with_attribute("owner", "alice")
//!     .with_attribute("user", "alice");
//! assert!(rule.evaluate(&ctx));
//!
//! let denied = Decision::deny(DenyReason::NotDefined, "edit article");
//! assert_eq!(denied.deny_reason(), Some(DenyReason::NotDefined));
//! ```

pub mod backend;
pub mod context;
pub mod decision;
pub mod error;
pub mod rule;

pub use backend::{Permissions, PolicyBackend};
pub use context::RequestContext;
pub use decision::{Decision, DecisionHooks, Denial, DenyReason};
pub use error::{BoxError, PredicateRegistryError, RuleDocumentError};
pub use rule::{Predicate, PredicateRegistry, Rule, RuleDocument};
