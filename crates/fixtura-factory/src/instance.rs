//! Built records.

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Identity assigned to a record by the persistence collaborator.
pub type Identity = Value;

/// Related record(s) cached on an owner.
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
	/// Single related record.
	One(Box<Instance>),
	/// Collection of related records.
	Many(Vec<Instance>),
}

impl Related {
	/// Returns the related records as a slice-like list.
	pub fn instances(&self) -> Vec<&Instance> {
		match self {
			Self::One(instance) => vec![instance.as_ref()],
			Self::Many(instances) => instances.iter().collect(),
		}
	}

	/// Returns the first related record.
	pub fn first(&self) -> Option<&Instance> {
		match self {
			Self::One(instance) => Some(instance),
			Self::Many(instances) => instances.first(),
		}
	}

	/// Returns the number of related records.
	pub fn len(&self) -> usize {
		match self {
			Self::One(_) => 1,
			Self::Many(instances) => instances.len(),
		}
	}

	/// Returns true for an empty collection.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Consumes the relation into a list of records.
	pub fn into_vec(self) -> Vec<Instance> {
		match self {
			Self::One(instance) => vec![*instance],
			Self::Many(instances) => instances,
		}
	}

	/// Renders the related record(s) as JSON.
	pub fn to_json(&self) -> Value {
		match self {
			Self::One(instance) => instance.to_json(),
			Self::Many(instances) => Value::Array(instances.iter().map(Instance::to_json).collect()),
		}
	}
}

/// A record produced by `make` or `create`.
///
/// Attributes hold the concrete column values (including foreign keys of
/// parent relations); relations hold the materialized related records.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
	model: String,
	attributes: IndexMap<String, Value>,
	relations: IndexMap<String, Related>,
	identity: Option<Identity>,
}

impl Instance {
	/// Creates an unpersisted record.
	pub fn new(model: impl Into<String>, attributes: IndexMap<String, Value>) -> Self {
		Self {
			model: model.into(),
			attributes,
			relations: IndexMap::new(),
			identity: None,
		}
	}

	/// Creates a record that already has an identity, e.g. one loaded back
	/// from storage by a persistence collaborator.
	pub fn persisted(
		model: impl Into<String>,
		attributes: IndexMap<String, Value>,
		identity: Identity,
	) -> Self {
		let mut instance = Self::new(model, attributes);
		instance.identity = Some(identity);
		instance
	}

	/// Returns the model kind.
	pub fn model(&self) -> &str {
		&self.model
	}

	/// Returns the column values.
	pub fn attributes(&self) -> &IndexMap<String, Value> {
		&self.attributes
	}

	/// Returns a column value.
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.attributes.get(name)
	}

	/// Returns the persisted identity, if any.
	pub fn identity(&self) -> Option<&Identity> {
		self.identity.as_ref()
	}

	/// Returns true once the record has been persisted.
	pub fn is_persisted(&self) -> bool {
		self.identity.is_some()
	}

	/// Returns the related record(s) cached under a relation name.
	pub fn relation(&self, name: &str) -> Option<&Related> {
		self.relations.get(name)
	}

	/// Returns every cached relation.
	pub fn relations(&self) -> &IndexMap<String, Related> {
		&self.relations
	}

	pub(crate) fn set_attribute(&mut self, name: impl Into<String>, value: Value) {
		self.attributes.insert(name.into(), value);
	}

	pub(crate) fn set_identity(&mut self, identity: Identity) {
		self.identity = Some(identity);
	}

	pub(crate) fn set_relation(&mut self, name: impl Into<String>, related: Related) {
		self.relations.insert(name.into(), related);
	}

	/// Returns a copy without cached relations.
	///
	/// Used as the inverse value handed to children so that the owner is not
	/// cloned together with its whole graph.
	pub fn detached(&self) -> Self {
		Self {
			model: self.model.clone(),
			attributes: self.attributes.clone(),
			relations: IndexMap::new(),
			identity: self.identity.clone(),
		}
	}

	/// Renders the record, its identity and its relations as JSON.
	pub fn to_json(&self) -> Value {
		let mut object: Map<String, Value> = self
			.attributes
			.iter()
			.map(|(key, value)| (key.clone(), value.clone()))
			.collect();
		if let Some(identity) = &self.identity {
			object.insert("@identity".to_string(), identity.clone());
		}
		for (name, related) in &self.relations {
			object.insert(name.clone(), related.to_json());
		}
		Value::Object(object)
	}
}
