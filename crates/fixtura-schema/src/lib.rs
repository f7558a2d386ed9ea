//! Schema descriptors for the fixtura fixture engine.
//!
//! A [`Schema`] is the read-only view of one model kind: an ordered list of
//! [`Field`]s, each tagged with a [`GeneratorSpec`], nullability, an optional
//! default value and a [`RelationKind`]. Schemas are handed to the engine
//! through a [`SchemaProvider`]; [`SchemaRegistry`] is the in-process one.
//!
//! ```
//! use fixtura_schema::{Field, Schema, SchemaRegistry};
//!
//! let registry = SchemaRegistry::with_schemas([
//!     Schema::new("User", vec![
//!         Field::new("name").generator("name"),
//!         Field::has_many("posts", "Post"),
//!     ])
//!     .unwrap(),
//!     Schema::new("Post", vec![
//!         Field::new("title").generator("sentence"),
//!         Field::parent("author", "User").required(),
//!     ])
//!     .unwrap(),
//! ]);
//!
//! assert_eq!(registry.len(), 2);
//! ```

#![warn(missing_docs)]

pub mod defaults;
pub mod error;
pub mod field;
pub mod provider;
pub mod schema;

pub use defaults::FieldTypeDefaults;
pub use error::{SchemaError, SchemaResult};
pub use field::{Field, GeneratorSpec, Multiplicity, RelationKind};
pub use provider::{SchemaProvider, SchemaRegistry};
pub use schema::Schema;
