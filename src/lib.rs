//! # Fixtura
//!
//! Schema-driven fixture generation for automated tests.
//!
//! Given a declarative schema per model kind (named fields, typed relations
//! and default-value generators), Fixtura produces fully populated,
//! internally consistent object graphs without hand-writing every attribute
//! of every related record.
//!
//! ## Feature Flags
//!
//! - `minimal` - Schema descriptors only
//! - `factory` - Attribute resolution, relation materialization and builders
//! - `full` (default) - All features enabled
//!
//! ## Crates
//!
//! - [`schema`]: fields, relation kinds, schemas and type defaults
//! - [`factory`]: states, builders, the `raw`/`make`/`create` terminals and
//!   the persistence collaborator
//!
//! ## Quick Example
//!
//! ```
//! # #[cfg(feature = "factory")]
//! # {
//! use std::sync::Arc;
//!
//! use fixtura::prelude::*;
//!
//! let schemas = SchemaRegistry::new();
//! schemas.register(Schema::new("User", vec![
//!     Field::new("name").generator("name"),
//!     Field::new("email").generator("safeEmail").unique(),
//! ]).unwrap());
//!
//! let factory = Factory::new(Arc::new(schemas), Arc::new(InMemoryStore::new()));
//! let users = factory.of("User").count(2).raw(AttributeMap::new()).unwrap();
//! assert_eq!(users.len(), 2);
//! # }
//! ```

pub use fixtura_schema as schema;

#[cfg(feature = "factory")]
pub use fixtura_factory as factory;

pub use fixtura_schema::{
	Field, FieldTypeDefaults, GeneratorSpec, Multiplicity, RelationKind, Schema, SchemaError,
	SchemaProvider, SchemaRegistry, SchemaResult,
};

#[cfg(feature = "factory")]
pub use fixtura_factory::{
	Attribute, AttributeMap, Factory, FactoryBuilder, FactoryConfig, FactoryError, FactoryResult,
	Generated, InMemoryStore, Instance, ParentPolicy, Persistence, Related, StatePatch,
};

/// Convenience re-exports for common usage.
pub mod prelude {
	// Schema types - always available
	pub use crate::{Field, GeneratorSpec, Multiplicity, RelationKind, Schema, SchemaRegistry};

	// External
	pub use async_trait::async_trait;
	pub use serde::{Deserialize, Serialize};

	// Factory feature
	#[cfg(feature = "factory")]
	pub use fixtura_factory::prelude::*;
}
