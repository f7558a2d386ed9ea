//! Attribute values and attribute maps.
//!
//! While a record is being resolved its attributes can hold more than plain
//! values: deferred computations, nested builders waiting to be
//! materialized, records that already exist, or a pick of existing records.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::builder::FactoryBuilder;
use crate::context::ResolutionContext;
use crate::error::FactoryResult;
use crate::instance::{Instance, Related};

type DeferredFn = dyn Fn(&ResolutionContext<'_>) -> FactoryResult<Attribute> + Send + Sync;

/// Zero-argument computation evaluated once the rest of the attribute set is
/// known.
///
/// The computation receives the in-progress attribute set. Attributes are
/// expanded in insertion order, so a computation may observe later
/// attributes that are still deferred or missing.
#[derive(Clone)]
pub struct Deferred(Arc<DeferredFn>);

impl Deferred {
	/// Wraps a fallible computation.
	pub fn new<F>(compute: F) -> Self
	where
		F: Fn(&ResolutionContext<'_>) -> FactoryResult<Attribute> + Send + Sync + 'static,
	{
		Self(Arc::new(compute))
	}

	pub(crate) fn call(&self, context: &ResolutionContext<'_>) -> FactoryResult<Attribute> {
		(self.0)(context)
	}
}

impl fmt::Debug for Deferred {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Deferred(..)")
	}
}

/// Selection of existing records of a model kind, resolved at
/// materialization time through the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RelationPick {
	/// Model kind to pick from.
	pub model: String,
	/// Attribute equality filters.
	pub filters: IndexMap<String, Value>,
	/// Maximum number of records, `None` for the collaborator's default.
	pub limit: Option<usize>,
}

impl RelationPick {
	/// Picks from every record of a model kind.
	pub fn new(model: impl Into<String>) -> Self {
		Self {
			model: model.into(),
			..Self::default()
		}
	}

	/// Adds an equality filter.
	pub fn filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
		self.filters.insert(field.into(), value.into());
		self
	}

	/// Limits the number of picked records.
	pub fn limit(mut self, limit: usize) -> Self {
		self.limit = Some(limit);
		self
	}
}

/// Value of one attribute during resolution.
#[derive(Debug, Clone)]
pub enum Attribute {
	/// Concrete value.
	Value(Value),
	/// Computation evaluated during expansion.
	Deferred(Deferred),
	/// Nested builder realized by the relation materializer.
	Builder(Box<FactoryBuilder>),
	/// Record(s) that already exist.
	Related(Related),
	/// Existing records picked from persistence.
	Pick(RelationPick),
}

impl Attribute {
	/// Wraps anything convertible into a JSON value.
	pub fn value(value: impl Into<Value>) -> Self {
		Self::Value(value.into())
	}

	/// Wraps a fallible deferred computation.
	pub fn deferred<F>(compute: F) -> Self
	where
		F: Fn(&ResolutionContext<'_>) -> FactoryResult<Attribute> + Send + Sync + 'static,
	{
		Self::Deferred(Deferred::new(compute))
	}

	/// Wraps an infallible computation producing a plain value.
	///
	/// # Example
	///
	/// ```
	/// use fixtura_factory::Attribute;
	///
	/// let slug = Attribute::computed(|ctx| {
	///     let title = ctx.value("title").and_then(|v| v.as_str()).unwrap_or_default();
	///     title.to_lowercase().replace(' ', "-").into()
	/// });
	/// assert!(slug.is_deferred());
	/// ```
	pub fn computed<F>(compute: F) -> Self
	where
		F: Fn(&ResolutionContext<'_>) -> Value + Send + Sync + 'static,
	{
		Self::deferred(move |context| Ok(Self::Value(compute(context))))
	}

	/// Returns the concrete value, if this is one.
	pub fn as_value(&self) -> Option<&Value> {
		match self {
			Self::Value(value) => Some(value),
			_ => None,
		}
	}

	/// Returns the nested builder, if this is one.
	pub fn as_builder(&self) -> Option<&FactoryBuilder> {
		match self {
			Self::Builder(builder) => Some(builder),
			_ => None,
		}
	}

	/// Returns true for deferred computations.
	pub fn is_deferred(&self) -> bool {
		matches!(self, Self::Deferred(_))
	}

	/// Returns true for values the materializer still has to realize.
	pub fn is_placeholder(&self) -> bool {
		matches!(self, Self::Builder(_) | Self::Pick(_))
	}

	/// Returns the model kind this attribute relates to, if any.
	pub fn related_model(&self) -> Option<&str> {
		match self {
			Self::Builder(builder) => Some(builder.model()),
			Self::Related(related) => related.first().map(Instance::model),
			Self::Pick(pick) => Some(&pick.model),
			Self::Value(_) | Self::Deferred(_) => None,
		}
	}

	/// Renders the attribute as JSON; placeholders are described, not realized.
	pub fn to_json(&self) -> Value {
		match self {
			Self::Value(value) => value.clone(),
			Self::Deferred(_) => Value::String("<deferred>".to_string()),
			Self::Builder(builder) => Value::String(format!("<builder {}>", builder.model())),
			Self::Related(related) => related.to_json(),
			Self::Pick(pick) => Value::String(format!("<pick {}>", pick.model)),
		}
	}
}

impl From<Value> for Attribute {
	fn from(value: Value) -> Self {
		Self::Value(value)
	}
}

impl From<&str> for Attribute {
	fn from(value: &str) -> Self {
		Self::Value(Value::from(value))
	}
}

impl From<String> for Attribute {
	fn from(value: String) -> Self {
		Self::Value(Value::from(value))
	}
}

macro_rules! impl_from_scalar {
	($($ty:ty),*) => {
		$(
			impl From<$ty> for Attribute {
				fn from(value: $ty) -> Self {
					Self::Value(Value::from(value))
				}
			}
		)*
	};
}

impl_from_scalar!(i32, i64, u32, u64, usize, f64, bool);

impl From<FactoryBuilder> for Attribute {
	fn from(builder: FactoryBuilder) -> Self {
		Self::Builder(Box::new(builder))
	}
}

impl From<Related> for Attribute {
	fn from(related: Related) -> Self {
		Self::Related(related)
	}
}

impl From<Instance> for Attribute {
	fn from(instance: Instance) -> Self {
		Self::Related(Related::One(Box::new(instance)))
	}
}

impl From<Vec<Instance>> for Attribute {
	fn from(instances: Vec<Instance>) -> Self {
		Self::Related(Related::Many(instances))
	}
}

impl From<Deferred> for Attribute {
	fn from(deferred: Deferred) -> Self {
		Self::Deferred(deferred)
	}
}

impl From<RelationPick> for Attribute {
	fn from(pick: RelationPick) -> Self {
		Self::Pick(pick)
	}
}

/// Ordered attribute store with explicit `get`/`set`/`has` access.
///
/// # Example
///
/// ```
/// use fixtura_factory::AttributeMap;
/// use serde_json::json;
///
/// let mut attributes = AttributeMap::from_json(json!({ "name": "Ada" }));
/// attributes.set("age", 36);
///
/// assert!(attributes.has("name"));
/// assert_eq!(attributes.value("age"), Some(&json!(36)));
/// assert_eq!(attributes.to_json(), json!({ "name": "Ada", "age": 36 }));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AttributeMap {
	entries: IndexMap<String, Attribute>,
}

impl AttributeMap {
	/// Creates an empty map.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a map from the entries of a JSON object.
	///
	/// Anything other than an object yields an empty map.
	pub fn from_json(value: Value) -> Self {
		match value {
			Value::Object(object) => object
				.into_iter()
				.map(|(key, value)| (key, Attribute::Value(value)))
				.collect(),
			_ => Self::new(),
		}
	}

	/// Returns the attribute stored under `key`.
	pub fn get(&self, key: &str) -> Option<&Attribute> {
		self.entries.get(key)
	}

	/// Returns the concrete value stored under `key`.
	pub fn value(&self, key: &str) -> Option<&Value> {
		self.get(key).and_then(Attribute::as_value)
	}

	/// Returns true if `key` holds an attribute.
	pub fn has(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	/// Stores an attribute, returning the previous one.
	pub fn set(&mut self, key: impl Into<String>, value: impl Into<Attribute>) -> Option<Attribute> {
		self.entries.insert(key.into(), value.into())
	}

	/// Removes an attribute, keeping the order of the others.
	pub fn remove(&mut self, key: &str) -> Option<Attribute> {
		self.entries.shift_remove(key)
	}

	/// Copies every entry of `other` over this map; `other` wins.
	pub fn merge(&mut self, other: &AttributeMap) {
		for (key, value) in other.iter() {
			self.entries.insert(key.clone(), value.clone());
		}
	}

	/// Returns a copy of this map with `other` merged on top.
	pub fn merged(&self, other: &AttributeMap) -> Self {
		let mut merged = self.clone();
		merged.merge(other);
		merged
	}

	/// Iterates over the entries in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&String, &Attribute)> {
		self.entries.iter()
	}

	/// Returns the keys in insertion order.
	pub fn keys(&self) -> impl Iterator<Item = &String> {
		self.entries.keys()
	}

	/// Returns the number of attributes.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns true if the map is empty.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Returns only the concrete values, in insertion order.
	pub fn values(&self) -> IndexMap<String, Value> {
		self.entries
			.iter()
			.filter_map(|(key, attribute)| attribute.as_value().map(|value| (key.clone(), value.clone())))
			.collect()
	}

	/// Renders the map as a JSON object.
	pub fn to_json(&self) -> Value {
		Value::Object(
			self.entries
				.iter()
				.map(|(key, attribute)| (key.clone(), attribute.to_json()))
				.collect(),
		)
	}
}

impl<K: Into<String>, A: Into<Attribute>> FromIterator<(K, A)> for AttributeMap {
	fn from_iter<I: IntoIterator<Item = (K, A)>>(iter: I) -> Self {
		Self {
			entries: iter
				.into_iter()
				.map(|(key, value)| (key.into(), value.into()))
				.collect(),
		}
	}
}

impl IntoIterator for AttributeMap {
	type Item = (String, Attribute);
	type IntoIter = indexmap::map::IntoIter<String, Attribute>;

	fn into_iter(self) -> Self::IntoIter {
		self.entries.into_iter()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_set_get_has() {
		let mut attributes = AttributeMap::new();
		assert!(!attributes.has("name"));

		let previous = attributes.set("name", "Ada");
		assert!(previous.is_none());
		assert_eq!(attributes.value("name"), Some(&json!("Ada")));

		let previous = attributes.set("name", "Grace");
		assert!(previous.is_some());
		assert_eq!(attributes.len(), 1);
	}

	#[rstest]
	fn test_merge_other_wins() {
		let mut base = AttributeMap::from_json(json!({ "a": 1, "b": 2 }));
		let overrides = AttributeMap::from_json(json!({ "b": 3, "c": 4 }));
		base.merge(&overrides);
		assert_eq!(base.to_json(), json!({ "a": 1, "b": 3, "c": 4 }));
	}

	#[rstest]
	fn test_remove_keeps_order() {
		let mut attributes = AttributeMap::from_json(json!({ "a": 1, "b": 2, "c": 3 }));
		attributes.remove("b");
		let keys: Vec<_> = attributes.keys().cloned().collect();
		assert_eq!(keys, vec!["a", "c"]);
	}

	#[rstest]
	fn test_values_skip_placeholders() {
		let mut attributes = AttributeMap::from_json(json!({ "a": 1 }));
		attributes.set("later", Attribute::computed(|_| json!(2)));
		attributes.set("pick", RelationPick::new("Tag").limit(2));

		assert_eq!(attributes.values().len(), 1);
		assert!(attributes.get("later").unwrap().is_deferred());
		assert!(attributes.get("pick").unwrap().is_placeholder());
		assert_eq!(attributes.get("pick").unwrap().related_model(), Some("Tag"));
	}

	#[rstest]
	fn test_from_json_non_object() {
		assert!(AttributeMap::from_json(json!([1, 2])).is_empty());
	}
}
