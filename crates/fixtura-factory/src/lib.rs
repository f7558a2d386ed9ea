//! Attribute resolution and relation materialization for schema-driven
//! fixtures.
//!
//! Given a [`Schema`](fixtura_schema::Schema) per model kind, this crate
//! produces fully populated records and the records they relate to:
//!
//! - **Attribute resolution**: base definitions, caller overrides, named
//!   states and schema generators are combined in a fixed order, then
//!   deferred values are expanded
//! - **Relation materialization**: parents are realized before the record
//!   and their identities written into foreign keys; children are created
//!   afterwards with their inverse field pointing back at the record
//! - **Builder facade**: copy-on-write configuration plus the `raw`, `make`
//!   and `create` terminals
//!
//! Persistence is delegated to a [`Persistence`] implementation;
//! [`InMemoryStore`] is provided for tests and dry runs.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use fixtura_factory::prelude::*;
//! use fixtura_schema::{Field, Schema, SchemaRegistry};
//!
//! let schemas = SchemaRegistry::new();
//! schemas.register(Schema::new("User", vec![
//!     Field::new("name").generator("name"),
//!     Field::has_many("posts", "Post"),
//! ]).unwrap());
//! schemas.register(Schema::new("Post", vec![
//!     Field::new("title").generator("sentence"),
//!     Field::parent("author", "User").required(),
//! ]).unwrap());
//!
//! let store = Arc::new(InMemoryStore::new());
//! let factory = Factory::new(Arc::new(schemas), store.clone());
//! factory.state("User", "admin", AttributeMap::from_json(serde_json::json!({ "role": "admin" }))).unwrap();
//!
//! futures::executor::block_on(async {
//!     let user = factory
//!         .of("User")
//!         .state("admin")
//!         .state("posts:3")
//!         .create_one(AttributeMap::new())
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(user.relation("posts").map(Related::len), Some(3));
//!     assert_eq!(store.count("Post"), 3);
//! });
//! ```
//!
//! # Logging
//!
//! The engine emits `tracing` events at `debug` and `trace` level and never
//! logs errors; failures are returned as [`FactoryError`] values.

#![warn(missing_docs)]

pub mod attribute;
pub mod builder;
pub mod config;
pub mod context;
pub mod error;
pub mod factory;
pub mod generator;
pub mod instance;
pub mod materializer;
pub mod persistence;
pub mod prelude;
pub mod registry;
pub mod relationship;
pub mod resolver;

pub use attribute::{Attribute, AttributeMap, Deferred, RelationPick};
pub use builder::{FactoryBuilder, Generated, StateRequest};
pub use config::{FactoryConfig, ParentPolicy};
pub use context::{ResolutionContext, StateContext};
pub use error::{FactoryError, FactoryResult, RelationPath};
pub use factory::Factory;
pub use generator::{FakeGenerator, FakerType, ValueGenerator};
pub use instance::{Identity, Instance, Related};
pub use materializer::{Mode, RelationMaterializer};
pub use persistence::{InMemoryStore, InverseLink, Persistence, StoredRecord};
pub use registry::{AfterCallback, DEFAULT_STATE, StateCallback, StatePatch, StateRegistry};
pub use resolver::{AttributeResolver, ResolveRequest};
