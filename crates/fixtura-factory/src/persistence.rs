//! Persistence collaborator.
//!
//! The engine never talks to a database directly. It hands finished
//! attribute sets to a [`Persistence`] implementation, asks it to wire child
//! records back to their owner, and asks it for existing records when a
//! relation picks from what is already stored.

use std::collections::HashSet;

use async_trait::async_trait;
use fixtura_schema::Multiplicity;
use indexmap::IndexMap;
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use serde_json::Value;

use crate::error::{FactoryError, FactoryResult};
use crate::instance::{Identity, Instance};

/// Storage behind `create`.
///
/// Implementations must be shareable across tasks; the engine awaits each
/// call before issuing the next one for the same record graph.
#[async_trait]
pub trait Persistence: Send + Sync {
	/// Stores a record and returns its identity.
	///
	/// # Arguments
	///
	/// * `model` - Model kind of the record
	/// * `attributes` - Column values, foreign keys of parents included
	async fn persist(&self, model: &str, attributes: &IndexMap<String, Value>) -> FactoryResult<Identity>;

	/// Records that `children` point back at `owner` through `inverse_field`.
	///
	/// Called once per child relation of a created owner, with every child
	/// of that relation.
	async fn set_inverse_relation(
		&self,
		owner: &Identity,
		children: &[Instance],
		inverse_field: &str,
		multiplicity: Multiplicity,
	) -> FactoryResult<()>;

	/// Returns existing records of `model` whose attributes equal `filters`.
	///
	/// The default implementation knows no records.
	async fn sample(
		&self,
		model: &str,
		filters: &IndexMap<String, Value>,
		limit: Option<usize>,
	) -> FactoryResult<Vec<Instance>> {
		let _ = (model, filters, limit);
		Ok(Vec::new())
	}
}

/// Record kept by [`InMemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
	/// Identity assigned on insert.
	pub identity: Identity,
	/// Column values as persisted.
	pub attributes: IndexMap<String, Value>,
}

/// One `set_inverse_relation` call observed by [`InMemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct InverseLink {
	/// Identity of the owner.
	pub owner: Identity,
	/// Identities of the wired children.
	pub children: Vec<Identity>,
	/// Inverse field on the children.
	pub inverse_field: String,
	/// Multiplicity of the inverse field.
	pub multiplicity: Multiplicity,
}

#[derive(Debug, Default)]
struct StoreState {
	records: IndexMap<String, Vec<StoredRecord>>,
	links: Vec<InverseLink>,
	failing: HashSet<String>,
}

/// In-memory [`Persistence`] assigning sequential integer identities per
/// model kind.
///
/// Useful for tests and dry runs; it also records every inverse wiring call
/// so that callers can inspect how a graph was assembled.
///
/// # Example
///
/// ```
/// use fixtura_factory::{InMemoryStore, Persistence};
/// use indexmap::IndexMap;
/// use serde_json::json;
///
/// futures::executor::block_on(async {
///     let store = InMemoryStore::new();
///     let mut attributes = IndexMap::new();
///     attributes.insert("name".to_string(), json!("Ada"));
///
///     let id = store.persist("User", &attributes).await.unwrap();
///     assert_eq!(id, json!(1));
///     assert_eq!(store.count("User"), 1);
/// });
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
	state: RwLock<StoreState>,
}

impl InMemoryStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Makes every later `persist` of `model` fail.
	pub fn fail_on(&self, model: &str) {
		self.state.write().failing.insert(model.to_string());
	}

	/// Returns the stored records of a model kind, in insertion order.
	pub fn records(&self, model: &str) -> Vec<StoredRecord> {
		self.state
			.read()
			.records
			.get(model)
			.cloned()
			.unwrap_or_default()
	}

	/// Looks up a stored record by identity.
	pub fn find(&self, model: &str, identity: &Identity) -> Option<StoredRecord> {
		self.state
			.read()
			.records
			.get(model)
			.and_then(|records| records.iter().find(|record| &record.identity == identity))
			.cloned()
	}

	/// Returns the number of stored records of a model kind.
	pub fn count(&self, model: &str) -> usize {
		self.state.read().records.get(model).map_or(0, Vec::len)
	}

	/// Returns the number of stored records across all kinds.
	pub fn total(&self) -> usize {
		self.state.read().records.values().map(Vec::len).sum()
	}

	/// Returns every inverse wiring call, in call order.
	pub fn inverse_links(&self) -> Vec<InverseLink> {
		self.state.read().links.clone()
	}

	/// Drops all records and wiring calls.
	pub fn clear(&self) {
		let mut state = self.state.write();
		state.records.clear();
		state.links.clear();
	}
}

#[async_trait]
impl Persistence for InMemoryStore {
	async fn persist(&self, model: &str, attributes: &IndexMap<String, Value>) -> FactoryResult<Identity> {
		let mut state = self.state.write();
		if state.failing.contains(model) {
			return Err(FactoryError::persistence(
				model,
				format!("refusing to store `{model}`"),
			));
		}
		let records = state.records.entry(model.to_string()).or_default();
		let identity = Value::from(records.len() as u64 + 1);
		records.push(StoredRecord {
			identity: identity.clone(),
			attributes: attributes.clone(),
		});
		Ok(identity)
	}

	async fn set_inverse_relation(
		&self,
		owner: &Identity,
		children: &[Instance],
		inverse_field: &str,
		multiplicity: Multiplicity,
	) -> FactoryResult<()> {
		let link = InverseLink {
			owner: owner.clone(),
			children: children
				.iter()
				.filter_map(|child| child.identity().cloned())
				.collect(),
			inverse_field: inverse_field.to_string(),
			multiplicity,
		};
		self.state.write().links.push(link);
		Ok(())
	}

	async fn sample(
		&self,
		model: &str,
		filters: &IndexMap<String, Value>,
		limit: Option<usize>,
	) -> FactoryResult<Vec<Instance>> {
		let mut matching: Vec<Instance> = self
			.records(model)
			.into_iter()
			.filter(|record| {
				filters
					.iter()
					.all(|(field, expected)| record.attributes.get(field) == Some(expected))
			})
			.map(|record| Instance::persisted(model, record.attributes, record.identity))
			.collect();
		matching.shuffle(&mut rand::thread_rng());
		if let Some(limit) = limit {
			matching.truncate(limit);
		}
		Ok(matching)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	fn attributes(value: Value) -> IndexMap<String, Value> {
		match value {
			Value::Object(object) => object.into_iter().collect(),
			_ => IndexMap::new(),
		}
	}

	#[rstest]
	#[tokio::test]
	async fn test_sequential_identities_per_model() {
		let store = InMemoryStore::new();
		let first = store.persist("User", &attributes(json!({"name": "a"}))).await.unwrap();
		let second = store.persist("User", &attributes(json!({"name": "b"}))).await.unwrap();
		let post = store.persist("Post", &attributes(json!({}))).await.unwrap();

		assert_eq!(first, json!(1));
		assert_eq!(second, json!(2));
		assert_eq!(post, json!(1));
		assert_eq!(store.total(), 3);
		assert_eq!(
			store.find("User", &json!(2)).unwrap().attributes.get("name"),
			Some(&json!("b"))
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_fail_on() {
		let store = InMemoryStore::new();
		store.fail_on("User");
		let result = store.persist("User", &IndexMap::new()).await;
		assert!(matches!(result, Err(FactoryError::PersistenceFailure { ref model, .. }) if model == "User"));
		assert_eq!(store.count("User"), 0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_sample_filters_and_limits() {
		let store = InMemoryStore::new();
		for role in ["admin", "member", "admin", "admin"] {
			store.persist("User", &attributes(json!({"role": role}))).await.unwrap();
		}
		let mut filters = IndexMap::new();
		filters.insert("role".to_string(), json!("admin"));

		let all = store.sample("User", &filters, None).await.unwrap();
		assert_eq!(all.len(), 3);
		assert!(all.iter().all(|user| user.get("role") == Some(&json!("admin"))));
		assert!(all.iter().all(Instance::is_persisted));

		let limited = store.sample("User", &filters, Some(2)).await.unwrap();
		assert_eq!(limited.len(), 2);
	}

	#[rstest]
	#[tokio::test]
	async fn test_inverse_links_are_recorded() {
		let store = InMemoryStore::new();
		let children = vec![
			Instance::persisted("Comment", IndexMap::new(), json!(1)),
			Instance::persisted("Comment", IndexMap::new(), json!(2)),
		];
		store
			.set_inverse_relation(&json!(7), &children, "post", Multiplicity::One)
			.await
			.unwrap();

		let links = store.inverse_links();
		assert_eq!(links.len(), 1);
		assert_eq!(links[0].owner, json!(7));
		assert_eq!(links[0].children, vec![json!(1), json!(2)]);
		assert_eq!(links[0].inverse_field, "post");
	}
}
