// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end tests for the policy store through the `PolicyBackend` trait,
//! the way a host authorization framework uses it.

use std::error::Error as StdError;
use std::sync::{Arc, Mutex};

use loom_server_abac_store::testing::{create_test_pool, create_test_store, owner_is_user};
use loom_server_abac_store::{
	DecisionHooks, DenyReason, Permissions, PolicyBackend, PolicyCollection, PolicyStore, PolicyStoreConfig,
	PredicateRegistry, RequestContext, Rule,
};

fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

#[derive(Default)]
struct HostHooks {
	yes: Mutex<u32>,
	no: Mutex<Vec<(bool, String)>>,
}

impl DecisionHooks for HostHooks {
	fn yes(&self) {
		*self.yes.lock().unwrap() += 1;
	}

	fn no(&self, error: Option<&(dyn StdError + 'static)>, message: &str) {
		self.no
			.lock()
			.unwrap()
			.push((error.is_some(), message.to_string()));
	}
}

fn article_request(owner: &str, user: &str) -> RequestContext {
	RequestContext::new()
		.with_user_id(user)
		.with_attribute("owner", owner)
		.with_attribute("user", user)
}

/// Hosts depend on the trait, not the concrete store.
#[tokio::test]
async fn test_host_depends_on_backend_trait() {
	async fn allowed<B: PolicyBackend>(backend: &B, action: &str) -> bool {
		backend.can(&RequestContext::new(), action).await.is_allowed()
	}

	let store = create_test_store().await;
	store.set_policy("ping", true.into()).await.unwrap();
	assert!(allowed(&store, "ping").await);
	assert_eq!(store.name(), "sqlite");
}

#[tokio::test]
async fn test_article_policies_scenario() {
	init_tracing();
	let store = create_test_store().await;
	let req = article_request("alice", "alice");

	store.set_policy("publish article", Rule::Literal(true)).await.unwrap();
	store.set_policy("delete article", Rule::Literal(false)).await.unwrap();

	let permissions = store.serialize(&req).await.unwrap();
	assert_eq!(
		permissions,
		Permissions::from([
			("publish article".to_string(), true),
			("delete article".to_string(), false),
		])
	);

	store.unset_policy("publish article").await.unwrap();
	let decision = store.can(&req, "publish article").await;
	assert_eq!(decision.deny_reason(), Some(DenyReason::NotDefined));
	assert_eq!(
		decision.denial().unwrap().message,
		"\"publish article\" cannot be performed because it is not defined."
	);

	let permissions = store.serialize(&req).await.unwrap();
	assert_eq!(
		permissions,
		Permissions::from([("delete article".to_string(), false)])
	);
}

#[tokio::test]
async fn test_edit_article_owner_predicate() {
	init_tracing();
	let store = create_test_store().await;
	store
		.set_policy(
			"edit article",
			Rule::predicate("owner_is_user", |ctx| ctx.attributes_match("owner", "user")),
		)
		.await
		.unwrap();

	assert!(store
		.can(&article_request("alice", "alice"), "edit article")
		.await
		.is_allowed());

	let decision = store
		.can(&article_request("alice", "mallory"), "edit article")
		.await;
	assert_eq!(decision.deny_reason(), Some(DenyReason::RuleFailed));
}

#[tokio::test]
async fn test_check_reports_through_host_hooks() {
	let store = create_test_store().await;
	store.set_policy("do an action", true.into()).await.unwrap();
	store.set_policy("forbidden", false.into()).await.unwrap();

	let hooks = HostHooks::default();
	let req = RequestContext::new();
	store.check(&req, "do an action", &hooks).await;
	store.check(&req, "forbidden", &hooks).await;
	store.check(&req, "undefined", &hooks).await;

	assert_eq!(*hooks.yes.lock().unwrap(), 1);
	let no = hooks.no.lock().unwrap();
	assert_eq!(no.len(), 2);
	assert_eq!(no[0], (false, "\"forbidden\" cannot be performed.".to_string()));
	assert!(no[1].1.contains("not defined"));
}

#[tokio::test]
async fn test_connectivity_error_is_distinguishable() {
	init_tracing();
	let store = create_test_store().await;
	store.set_policy("do an action", true.into()).await.unwrap();
	store.collection().pool().close().await;

	let hooks = HostHooks::default();
	store.check(&RequestContext::new(), "do an action", &hooks).await;

	assert_eq!(*hooks.yes.lock().unwrap(), 0);
	let no = hooks.no.lock().unwrap();
	assert_eq!(no.len(), 1);
	let (has_cause, message) = &no[0];
	assert!(has_cause);
	assert!(message.contains("an error has occurred"));
	assert!(!message.contains("not defined"));
}

#[tokio::test]
async fn test_policies_survive_reopen_and_predicates_are_shared() {
	init_tracing();
	let dir = tempfile::tempdir().unwrap();
	let config = PolicyStoreConfig {
		database_url: format!("sqlite:{}", dir.path().join("abac.db").display()),
		collection: "acl".to_string(),
	};

	{
		let writer = PolicyStore::connect(&config).await.unwrap();
		writer.set_policy("publish article", true.into()).await.unwrap();
		writer
			.set_policy("edit article", owner_is_user().into())
			.await
			.unwrap();
		writer.collection().pool().close().await;
	}

	let reader = PolicyStore::connect(&config).await.unwrap();
	assert_eq!(reader.collection().collection_name(), "acl");
	assert!(reader
		.can(&RequestContext::new(), "publish article")
		.await
		.is_allowed());

	let owner = article_request("alice", "alice");
	assert_eq!(
		reader.can(&owner, "edit article").await.deny_reason(),
		Some(DenyReason::MalformedRule)
	);

	reader.register_predicate(owner_is_user()).unwrap();
	assert!(reader.can(&owner, "edit article").await.is_allowed());
}

#[tokio::test]
async fn test_stores_can_share_a_registry() {
	let registry = Arc::new(PredicateRegistry::new());
	registry.register(owner_is_user());

	let pool = create_test_pool().await;
	let first = PolicyStore::open(pool.clone(), Some("policies")).await.unwrap();
	first
		.set_policy("edit article", owner_is_user().into())
		.await
		.unwrap();

	let collection = loom_server_abac_store::SqlitePolicyCollection::open_default(pool)
		.await
		.unwrap();
	let second = PolicyStore::with_registry(collection, registry);
	assert!(second
		.can(&article_request("bob", "bob"), "edit article")
		.await
		.is_allowed());
}

#[tokio::test]
async fn test_concurrent_checks_for_different_actions() {
	let store = Arc::new(create_test_store().await);
	for i in 0..20 {
		store
			.set_policy(&format!("action {i}"), Rule::Literal(i % 2 == 0))
			.await
			.unwrap();
	}

	let checks = (0..20).map(|i| {
		let store = Arc::clone(&store);
		async move {
			let decision = store.can(&RequestContext::new(), &format!("action {i}")).await;
			(i, decision.is_allowed())
		}
	});

	for (i, allowed) in futures::future::join_all(checks).await {
		assert_eq!(allowed, i % 2 == 0, "action {i}");
	}
}

#[tokio::test]
async fn test_concurrent_writes_to_same_key_leave_one_record() {
	let store = Arc::new(create_test_store().await);

	let writes = (0..10).map(|i| {
		let store = Arc::clone(&store);
		async move { store.set_policy("contested", Rule::Literal(i % 2 == 0)).await }
	});
	for result in futures::future::join_all(writes).await {
		result.unwrap();
	}

	let permissions = store.serialize(&RequestContext::new()).await.unwrap();
	assert_eq!(permissions.len(), 1);
	assert!(permissions.contains_key("contested"));
}
