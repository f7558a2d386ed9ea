//! Builder facade.
//!
//! A [`FactoryBuilder`] is the value a caller configures and finally turns
//! into attribute maps (`raw`), in-memory records (`make`) or persisted
//! records (`create`). Every configuration method returns a new builder and
//! leaves the receiver untouched, so a partially configured builder can be
//! kept as a template and reused.

use std::fmt;
use std::sync::Arc;

use fixtura_schema::Schema;
use futures::future::{BoxFuture, FutureExt};

use crate::attribute::{Attribute, AttributeMap};
use crate::error::{FactoryResult, RelationPath};
use crate::factory::Factory;
use crate::instance::Instance;
use crate::materializer::{Mode, RelationMaterializer};
use crate::registry::StatePatch;
use crate::relationship::resolve_relationship;
use crate::resolver::{AttributeResolver, ResolveRequest};

/// Result of a terminal operation.
///
/// `One` when the builder has no count, `Many` (possibly empty) when
/// [`FactoryBuilder::count`] was called.
#[derive(Debug, Clone, PartialEq)]
pub enum Generated<T> {
	/// Single item.
	One(T),
	/// Counted items.
	Many(Vec<T>),
}

impl<T> Generated<T> {
	/// Returns the items as a list.
	pub fn into_vec(self) -> Vec<T> {
		match self {
			Self::One(item) => vec![item],
			Self::Many(items) => items,
		}
	}

	/// Returns the item of a `One` result.
	pub fn into_single(self) -> Option<T> {
		match self {
			Self::One(item) => Some(item),
			Self::Many(_) => None,
		}
	}

	/// Iterates over the items.
	pub fn iter(&self) -> std::slice::Iter<'_, T> {
		match self {
			Self::One(item) => std::slice::from_ref(item).iter(),
			Self::Many(items) => items.iter(),
		}
	}

	/// Returns the number of items.
	pub fn len(&self) -> usize {
		match self {
			Self::One(_) => 1,
			Self::Many(items) => items.len(),
		}
	}

	/// Returns true for an empty `Many` result.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Returns true for a counted result.
	pub fn is_many(&self) -> bool {
		matches!(self, Self::Many(_))
	}
}

/// A state requested on a builder.
#[derive(Debug, Clone)]
pub enum StateRequest {
	/// Registered state or relation name, optionally with `:<amount>`.
	Named(String),
	/// Anonymous patch applied in request order.
	Inline(StatePatch),
}

impl StateRequest {
	/// Returns the requested name without any `:<amount>` suffix.
	pub fn name(&self) -> Option<&str> {
		match self {
			Self::Named(raw) => Some(raw.split_once(':').map_or(raw.as_str(), |(name, _)| name)),
			Self::Inline(_) => None,
		}
	}
}

#[derive(Debug, Clone)]
struct RelationRequest {
	path: RelationPath,
	related: Attribute,
	relationship: Option<String>,
}

/// Fluent, copy-on-write builder for one model kind.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use fixtura_factory::{AttributeMap, Factory, InMemoryStore};
/// use fixtura_schema::{Field, Schema, SchemaRegistry};
///
/// let schemas = SchemaRegistry::new();
/// schemas.register(
///     Schema::new("User", vec![
///         Field::new("name").generator("name"),
///         Field::new("email").generator("safeEmail").unique(),
///     ])
///     .unwrap(),
/// );
/// let factory = Factory::new(Arc::new(schemas), Arc::new(InMemoryStore::new()));
///
/// let template = factory.of("User").set("name", "Ada");
/// let users = template.count(3).raw(AttributeMap::new()).unwrap();
///
/// assert_eq!(users.len(), 3);
/// assert!(users.iter().all(|user| user.value("name") == Some(&"Ada".into())));
/// ```
#[derive(Clone)]
pub struct FactoryBuilder {
	factory: Factory,
	model: String,
	definition: Option<String>,
	count: Option<usize>,
	states: Vec<StateRequest>,
	attributes: AttributeMap,
	relations: Vec<RelationRequest>,
	only: Option<Vec<String>>,
	except: Vec<String>,
}

impl fmt::Debug for FactoryBuilder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FactoryBuilder")
			.field("model", &self.model)
			.field("definition", &self.definition)
			.field("count", &self.count)
			.field("states", &self.states)
			.field("attributes", &self.attributes)
			.field("relations", &self.relations)
			.field("only", &self.only)
			.field("except", &self.except)
			.finish()
	}
}

impl FactoryBuilder {
	pub(crate) fn new(factory: Factory, model: &str) -> Self {
		Self {
			factory,
			model: model.to_string(),
			definition: None,
			count: None,
			states: Vec::new(),
			attributes: AttributeMap::new(),
			relations: Vec::new(),
			only: None,
			except: Vec::new(),
		}
	}

	/// Returns the model kind this builder produces.
	pub fn model(&self) -> &str {
		&self.model
	}

	/// Returns the requested count, if any.
	pub fn requested_count(&self) -> Option<usize> {
		self.count
	}

	/// Returns the requested states in order.
	pub fn requested_states(&self) -> &[StateRequest] {
		&self.states
	}

	/// Uses a named base definition instead of the default one.
	pub fn definition(&self, name: &str) -> Self {
		let mut next = self.clone();
		next.definition = Some(name.to_string());
		next
	}

	/// Requests a state by name.
	///
	/// A name without a registered patch is treated as a relation field; a
	/// `:<amount>` suffix fixes the number of children of a many relation.
	pub fn state(&self, name: impl Into<String>) -> Self {
		let mut next = self.clone();
		next.states.push(StateRequest::Named(name.into()));
		next
	}

	/// Requests several states in order.
	pub fn states<I, S>(&self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut next = self.clone();
		next.states
			.extend(names.into_iter().map(|name| StateRequest::Named(name.into())));
		next
	}

	/// Applies an anonymous patch or callback at this point of the state order.
	pub fn state_patch(&self, patch: impl Into<StatePatch>) -> Self {
		let mut next = self.clone();
		next.states.push(StateRequest::Inline(patch.into()));
		next
	}

	/// Produces `count` records instead of one.
	pub fn count(&self, count: usize) -> Self {
		let mut next = self.clone();
		next.count = Some(count);
		next
	}

	/// Fixes an attribute. Fixed attributes win over definitions and states.
	pub fn set(&self, key: impl Into<String>, value: impl Into<Attribute>) -> Self {
		let mut next = self.clone();
		next.attributes.set(key, value);
		next
	}

	/// Attaches a parent, inferring the relation from its model kind.
	pub fn for_parent(&self, related: impl Into<Attribute>) -> Self {
		self.relate(RelationPath::Parent, related.into(), None)
	}

	/// Attaches a parent through a named relation.
	pub fn for_relation(&self, related: impl Into<Attribute>, relationship: &str) -> Self {
		self.relate(RelationPath::Parent, related.into(), Some(relationship))
	}

	/// Attaches children, inferring the relation from their model kind.
	pub fn has(&self, related: impl Into<Attribute>) -> Self {
		self.relate(RelationPath::Child, related.into(), None)
	}

	/// Attaches children through a named relation.
	pub fn has_relation(&self, related: impl Into<Attribute>, relationship: &str) -> Self {
		self.relate(RelationPath::Child, related.into(), Some(relationship))
	}

	/// Only generates the listed fields; other missing fields stay absent.
	pub fn with<I, S>(&self, fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut next = self.clone();
		next.only
			.get_or_insert_with(Vec::new)
			.extend(fields.into_iter().map(Into::into));
		next
	}

	/// Never generates the listed fields.
	pub fn without<I, S>(&self, fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut next = self.clone();
		next.except.extend(fields.into_iter().map(Into::into));
		next
	}

	/// Produces attribute maps only; nothing is materialized or persisted.
	///
	/// Nested builders and picks stay in the map as placeholders.
	///
	/// # Arguments
	///
	/// * `overrides` - Attributes that win over fixed attributes, definitions
	///   and states
	///
	/// # Returns
	///
	/// Returns one map, or one map per requested count.
	pub fn raw(&self, overrides: AttributeMap) -> FactoryResult<Generated<AttributeMap>> {
		self.factory.lock();
		let (schema, effective) = self.prepare(&overrides)?;
		match self.count {
			None => Ok(Generated::One(self.resolve(&schema, &effective)?)),
			Some(count) => (0..count)
				.map(|_| self.resolve(&schema, &effective))
				.collect::<FactoryResult<Vec<_>>>()
				.map(Generated::Many),
		}
	}

	/// Produces in-memory records. Parents are realized according to the
	/// configured parent policy; children are never materialized.
	///
	/// # Arguments
	///
	/// * `overrides` - Attributes that win over fixed attributes, definitions
	///   and states
	///
	/// # Returns
	///
	/// Returns unpersisted records, one or one per requested count.
	pub async fn make(&self, overrides: AttributeMap) -> FactoryResult<Generated<Instance>> {
		self.produce(&overrides, Mode::Make).await
	}

	/// Produces persisted records and wires their child relations.
	///
	/// # Arguments
	///
	/// * `overrides` - Attributes that win over fixed attributes, definitions
	///   and states
	///
	/// # Returns
	///
	/// Returns persisted records, one or one per requested count. Each child
	/// relation has been wired through the persistence collaborator exactly
	/// once.
	pub async fn create(&self, overrides: AttributeMap) -> FactoryResult<Generated<Instance>> {
		self.produce(&overrides, Mode::Create).await
	}

	/// Makes exactly one record, ignoring any count.
	pub async fn make_one(&self, overrides: AttributeMap) -> FactoryResult<Instance> {
		self.build(&overrides, Mode::Make).await
	}

	/// Creates exactly one record, ignoring any count.
	pub async fn create_one(&self, overrides: AttributeMap) -> FactoryResult<Instance> {
		self.build(&overrides, Mode::Create).await
	}

	pub(crate) fn single(&self) -> Self {
		let mut next = self.clone();
		next.count = None;
		next
	}

	pub(crate) async fn produce(
		&self,
		overrides: &AttributeMap,
		mode: Mode,
	) -> FactoryResult<Generated<Instance>> {
		match self.count {
			None => Ok(Generated::One(self.build(overrides, mode).await?)),
			Some(count) => {
				let mut instances = Vec::with_capacity(count);
				for _ in 0..count {
					instances.push(self.build(overrides, mode).await?);
				}
				Ok(Generated::Many(instances))
			}
		}
	}

	/// Resolves and materializes one record. Boxed because relations recurse
	/// into nested builders.
	pub(crate) fn build<'a>(
		&'a self,
		overrides: &'a AttributeMap,
		mode: Mode,
	) -> BoxFuture<'a, FactoryResult<Instance>> {
		async move {
			self.factory.lock();
			let (schema, effective) = self.prepare(overrides)?;
			let resolved = self.resolve(&schema, &effective)?;
			let states: Vec<&str> = self.states.iter().filter_map(StateRequest::name).collect();
			RelationMaterializer::new(&self.factory, &schema)
				.materialize(resolved, mode, &states)
				.await
		}
		.boxed()
	}

	/// Looks up the schema and folds fixed attributes, terminal overrides
	/// and `for`/`has` requests into one override map.
	fn prepare(&self, overrides: &AttributeMap) -> FactoryResult<(Arc<Schema>, AttributeMap)> {
		let schema = self.factory.schema(&self.model)?;
		let mut effective = self.attributes.merged(overrides);
		for request in &self.relations {
			let field = resolve_relationship(
				&schema,
				request.related.related_model(),
				request.relationship.as_deref(),
				request.path,
			)?;
			effective.set(field.name(), request.related.clone());
		}
		Ok((schema, effective))
	}

	fn resolve(&self, schema: &Arc<Schema>, overrides: &AttributeMap) -> FactoryResult<AttributeMap> {
		let definition = self
			.definition
			.as_deref()
			.unwrap_or(self.factory.config().default_definition.as_str());
		let request = ResolveRequest {
			definition,
			overrides,
			states: &self.states,
			only: self.only.as_deref(),
			except: &self.except,
		};
		AttributeResolver::new(&self.factory, Arc::clone(schema)).resolve(&request)
	}

	fn relate(&self, path: RelationPath, related: Attribute, relationship: Option<&str>) -> Self {
		let mut next = self.clone();
		next.relations.push(RelationRequest {
			path,
			related,
			relationship: relationship.map(str::to_string),
		});
		next
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::persistence::InMemoryStore;
	use fixtura_schema::{Field, SchemaRegistry};
	use rstest::rstest;
	use serde_json::json;

	fn factory() -> Factory {
		let schemas = SchemaRegistry::with_schemas([Schema::new(
			"User",
			vec![
				Field::new("name").generator("name"),
				Field::new("bio").generator("sentence"),
			],
		)
		.unwrap()]);
		Factory::new(Arc::new(schemas), Arc::new(InMemoryStore::new()))
	}

	#[rstest]
	fn test_configuration_is_copy_on_write() {
		let factory = factory();
		let template = factory.of("User").set("name", "Ada");
		let admin = template.state("admin").count(2);

		assert!(template.requested_states().is_empty());
		assert_eq!(template.requested_count(), None);
		assert_eq!(admin.requested_states().len(), 1);
		assert_eq!(admin.requested_count(), Some(2));
	}

	#[rstest]
	fn test_state_request_name_strips_amount() {
		assert_eq!(StateRequest::Named("comments:3".to_string()).name(), Some("comments"));
		assert_eq!(StateRequest::Named("admin".to_string()).name(), Some("admin"));
		assert_eq!(StateRequest::Inline(AttributeMap::new().into()).name(), None);
	}

	#[rstest]
	fn test_raw_without_count_is_single() {
		let generated = factory().of("User").raw(AttributeMap::new()).unwrap();
		assert!(!generated.is_many());
		assert_eq!(generated.len(), 1);
	}

	#[rstest]
	fn test_raw_with_zero_count_is_empty() {
		let generated = factory().of("User").count(0).raw(AttributeMap::new()).unwrap();
		assert!(generated.is_many());
		assert!(generated.is_empty());
	}

	#[rstest]
	fn test_with_and_without_filters() {
		let factory = factory();
		let only_name = factory
			.of("User")
			.with(["name"])
			.raw(AttributeMap::new())
			.unwrap()
			.into_single()
			.unwrap();
		assert!(only_name.has("name"));
		assert!(!only_name.has("bio"));

		let no_bio = factory
			.of("User")
			.without(["bio"])
			.raw(AttributeMap::new())
			.unwrap()
			.into_single()
			.unwrap();
		assert!(no_bio.has("name"));
		assert!(!no_bio.has("bio"));
	}

	#[rstest]
	fn test_terminal_overrides_beat_fixed_attributes() {
		let attributes = factory()
			.of("User")
			.set("name", "Ada")
			.raw(AttributeMap::from_json(json!({"name": "Grace"})))
			.unwrap()
			.into_single()
			.unwrap();
		assert_eq!(attributes.value("name"), Some(&json!("Grace")));
	}
}
