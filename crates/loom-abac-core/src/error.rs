// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

/// Errors raised while turning a stored rule back into something evaluable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleDocumentError {
	#[error("rule is not in a recognized format: {0}")]
	Malformed(String),

	#[error("predicate '{0}' is not registered")]
	UnknownPredicate(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PredicateRegistryError {
	#[error("predicate '{0}' is already registered to a different function")]
	Conflict(String),
}

/// Boxed error carried as the cause of a denial.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
