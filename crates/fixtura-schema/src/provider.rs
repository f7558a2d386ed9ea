//! Schema lookup.
//!
//! The fixture engine asks a [`SchemaProvider`] for a model kind's schema
//! every time it resolves or materializes a record, so providers must be
//! cheap and stable for the duration of a run.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{SchemaError, SchemaResult};
use crate::schema::Schema;

/// Source of resolved model schemas.
pub trait SchemaProvider: Send + Sync {
	/// Returns the schema for a model kind.
	///
	/// # Errors
	///
	/// Returns [`SchemaError::ModelNotFound`] if the kind is unknown.
	fn schema(&self, model: &str) -> SchemaResult<Arc<Schema>>;
}

/// In-process schema registry keyed by model kind.
///
/// # Example
///
/// ```
/// use fixtura_schema::{Field, Schema, SchemaProvider, SchemaRegistry};
///
/// let registry = SchemaRegistry::new();
/// registry.register(Schema::new("User", vec![Field::new("name")]).unwrap());
///
/// assert!(registry.has("User"));
/// assert_eq!(registry.schema("User").unwrap().model(), "User");
/// assert!(registry.schema("Post").is_err());
/// ```
#[derive(Debug, Default)]
pub struct SchemaRegistry {
	schemas: RwLock<HashMap<String, Arc<Schema>>>,
}

impl SchemaRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a registry pre-populated with schemas.
	pub fn with_schemas(schemas: impl IntoIterator<Item = Schema>) -> Self {
		let registry = Self::new();
		for schema in schemas {
			registry.register(schema);
		}
		registry
	}

	/// Registers a schema, replacing any previous schema of the same kind.
	pub fn register(&self, schema: Schema) {
		self.schemas
			.write()
			.insert(schema.model().to_string(), Arc::new(schema));
	}

	/// Checks if a schema is registered for the model kind.
	pub fn has(&self, model: &str) -> bool {
		self.schemas.read().contains_key(model)
	}

	/// Returns all registered model kinds.
	pub fn model_ids(&self) -> Vec<String> {
		self.schemas.read().keys().cloned().collect()
	}

	/// Returns the number of registered schemas.
	pub fn len(&self) -> usize {
		self.schemas.read().len()
	}

	/// Returns true if no schemas are registered.
	pub fn is_empty(&self) -> bool {
		self.schemas.read().is_empty()
	}
}

impl SchemaProvider for SchemaRegistry {
	fn schema(&self, model: &str) -> SchemaResult<Arc<Schema>> {
		self.schemas
			.read()
			.get(model)
			.cloned()
			.ok_or_else(|| SchemaError::ModelNotFound(model.to_string()))
	}
}
