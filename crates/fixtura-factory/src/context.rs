//! Resolution contexts handed to definitions, states and deferred values.

use serde_json::Value;

use crate::attribute::{Attribute, AttributeMap};
use crate::builder::FactoryBuilder;
use crate::error::FactoryResult;
use crate::factory::Factory;
use crate::generator::ValueGenerator;

/// Read-only view passed to deferred computations.
pub struct ResolutionContext<'a> {
	model: &'a str,
	attributes: &'a AttributeMap,
	generator: &'a dyn ValueGenerator,
	factory: &'a Factory,
}

impl<'a> ResolutionContext<'a> {
	pub(crate) fn new(
		model: &'a str,
		attributes: &'a AttributeMap,
		generator: &'a dyn ValueGenerator,
		factory: &'a Factory,
	) -> Self {
		Self {
			model,
			attributes,
			generator,
			factory,
		}
	}

	/// Returns the model kind being resolved.
	pub fn model(&self) -> &str {
		self.model
	}

	/// Returns the in-progress attribute set.
	pub fn attributes(&self) -> &AttributeMap {
		self.attributes
	}

	/// Returns an attribute of the in-progress set.
	pub fn get(&self, key: &str) -> Option<&Attribute> {
		self.attributes.get(key)
	}

	/// Returns a concrete value of the in-progress set.
	pub fn value(&self, key: &str) -> Option<&Value> {
		self.attributes.value(key)
	}

	/// Returns the value generator.
	pub fn generator(&self) -> &dyn ValueGenerator {
		self.generator
	}

	/// Starts a nested builder, e.g. for a deferred parent.
	pub fn builder(&self, model: &str) -> FactoryBuilder {
		self.factory.of(model)
	}
}

/// Mutable view passed to definitions and state callbacks.
pub struct StateContext<'a> {
	model: &'a str,
	attributes: &'a mut AttributeMap,
	generator: &'a dyn ValueGenerator,
	factory: &'a Factory,
}

impl<'a> StateContext<'a> {
	pub(crate) fn new(
		model: &'a str,
		attributes: &'a mut AttributeMap,
		generator: &'a dyn ValueGenerator,
		factory: &'a Factory,
	) -> Self {
		Self {
			model,
			attributes,
			generator,
			factory,
		}
	}

	/// Returns the model kind being resolved.
	pub fn model(&self) -> &str {
		self.model
	}

	/// Returns the in-progress attribute set.
	pub fn attributes(&self) -> &AttributeMap {
		self.attributes
	}

	/// Returns an attribute of the in-progress set.
	pub fn get(&self, key: &str) -> Option<&Attribute> {
		self.attributes.get(key)
	}

	/// Returns a concrete value of the in-progress set.
	pub fn value(&self, key: &str) -> Option<&Value> {
		self.attributes.value(key)
	}

	/// Returns true if the attribute is already set.
	pub fn has(&self, key: &str) -> bool {
		self.attributes.has(key)
	}

	/// Sets an attribute.
	pub fn set(&mut self, key: impl Into<String>, value: impl Into<Attribute>) -> &mut Self {
		self.attributes.set(key, value);
		self
	}

	/// Removes an attribute.
	pub fn remove(&mut self, key: &str) -> Option<Attribute> {
		self.attributes.remove(key)
	}

	/// Returns the value generator.
	pub fn generator(&self) -> &dyn ValueGenerator {
		self.generator
	}

	/// Generates a value with the given generator kind.
	pub fn fake(&self, kind: &str, params: &[Value]) -> FactoryResult<Value> {
		self.generator.generate(kind, params)
	}

	/// Starts a nested builder for another model kind.
	pub fn builder(&self, model: &str) -> FactoryBuilder {
		self.factory.of(model)
	}

	/// Returns the owning factory.
	pub fn factory(&self) -> &Factory {
		self.factory
	}
}
