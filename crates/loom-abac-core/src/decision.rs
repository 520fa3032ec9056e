// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization outcomes.
//!
//! [`Decision`] is what a backend returns from `can`. Hosts that expect the
//! classic `yes()` / `no(err, message)` callbacks implement [`DecisionHooks`]
//! and call [`Decision::report`].

use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BoxError;

/// Why an action was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
	/// No policy exists for the action.
	NotDefined,
	/// The rule evaluated to false.
	RuleFailed,
	/// The stored rule is neither a literal nor a known predicate.
	MalformedRule,
	/// The storage lookup itself failed.
	LookupError,
}

impl DenyReason {
	pub fn as_str(&self) -> &'static str {
		match self {
			DenyReason::NotDefined => "not_defined",
			DenyReason::RuleFailed => "rule_failed",
			DenyReason::MalformedRule => "malformed_rule",
			DenyReason::LookupError => "lookup_error",
		}
	}

	/// Human-readable message for a denial of `action`.
	pub fn message(&self, action: &str) -> String {
		match self {
			DenyReason::NotDefined => {
				format!("\"{action}\" cannot be performed because it is not defined.")
			}
			DenyReason::RuleFailed => format!("\"{action}\" cannot be performed."),
			DenyReason::MalformedRule => format!(
				"\"{action}\" cannot be performed because the rules are not in the correct format."
			),
			DenyReason::LookupError => {
				format!("\"{action}\" cannot be performed because an error has occurred.")
			}
		}
	}
}

impl fmt::Display for DenyReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A denied authorization check.
#[derive(Debug)]
pub struct Denial {
	pub reason: DenyReason,
	pub message: String,
	pub cause: Option<BoxError>,
}

impl Denial {
	pub fn new(reason: DenyReason, action: &str) -> Self {
		Self {
			reason,
			message: reason.message(action),
			cause: None,
		}
	}

	pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
		self.cause = Some(cause.into());
		self
	}
}

impl fmt::Display for Denial {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.message)
	}
}

/// Outcome of `can`.
#[derive(Debug)]
pub enum Decision {
	Allowed,
	Denied(Denial),
}

impl Decision {
	pub fn deny(reason: DenyReason, action: &str) -> Self {
		Decision::Denied(Denial::new(reason, action))
	}

	pub fn is_allowed(&self) -> bool {
		matches!(self, Decision::Allowed)
	}

	pub fn deny_reason(&self) -> Option<DenyReason> {
		match self {
			Decision::Allowed => None,
			Decision::Denied(denial) => Some(denial.reason),
		}
	}

	pub fn denial(&self) -> Option<&Denial> {
		match self {
			Decision::Allowed => None,
			Decision::Denied(denial) => Some(denial),
		}
	}

	/// Forwards the decision to the host's callbacks.
	pub fn report<H: DecisionHooks + ?Sized>(self, hooks: &H) {
		match self {
			Decision::Allowed => hooks.yes(),
			Decision::Denied(denial) => {
				let cause = denial
					.cause
					.as_deref()
					.map(|e| e as &(dyn StdError + 'static));
				hooks.no(cause, &denial.message);
			}
		}
	}
}

/// Callbacks a host framework supplies to receive decisions.
pub trait DecisionHooks {
	fn yes(&self);
	fn no(&self, error: Option<&(dyn StdError + 'static)>, message: &str);
}
