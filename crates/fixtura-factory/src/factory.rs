//! Factory entry point.
//!
//! A [`Factory`] ties the schema provider, the value generator, the
//! persistence collaborator and the state registry together and hands out
//! [`FactoryBuilder`]s. It is cheap to clone; clones share everything.

use std::fmt;
use std::sync::Arc;

use fixtura_schema::{Schema, SchemaProvider};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;

use crate::attribute::{AttributeMap, RelationPick};
use crate::builder::FactoryBuilder;
use crate::config::FactoryConfig;
use crate::context::StateContext;
use crate::error::FactoryResult;
use crate::generator::{FakeGenerator, ValueGenerator};
use crate::instance::Instance;
use crate::persistence::Persistence;
use crate::registry::{StatePatch, StateRegistry};

struct FactoryInner {
	schemas: Arc<dyn SchemaProvider>,
	persistence: Arc<dyn Persistence>,
	generator: Arc<dyn ValueGenerator>,
	registry: RwLock<StateRegistry>,
	config: FactoryConfig,
}

/// Shared handle to the fixture engine.
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
///     Schema::new("User", vec![Field::new("name").generator("name")]).unwrap(),
/// );
///
/// let factory = Factory::new(Arc::new(schemas), Arc::new(InMemoryStore::new()));
/// let attributes = factory.of("User").raw(AttributeMap::new()).unwrap().into_single().unwrap();
/// assert!(attributes.value("name").is_some());
/// ```
#[derive(Clone)]
pub struct Factory {
	inner: Arc<FactoryInner>,
}

impl fmt::Debug for Factory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Factory")
			.field("registry", &*self.inner.registry.read())
			.field("config", &self.inner.config)
			.finish()
	}
}

impl Factory {
	/// Creates a factory with the default generator and configuration.
	pub fn new(schemas: Arc<dyn SchemaProvider>, persistence: Arc<dyn Persistence>) -> Self {
		Self::with_config(schemas, persistence, FactoryConfig::default())
	}

	/// Creates a factory with the default generator and the given configuration.
	pub fn with_config(
		schemas: Arc<dyn SchemaProvider>,
		persistence: Arc<dyn Persistence>,
		config: FactoryConfig,
	) -> Self {
		let generator = Arc::new(FakeGenerator::from_config(&config));
		Self::with_options(schemas, persistence, generator, config)
	}

	/// Creates a factory from all of its collaborators.
	pub fn with_options(
		schemas: Arc<dyn SchemaProvider>,
		persistence: Arc<dyn Persistence>,
		generator: Arc<dyn ValueGenerator>,
		config: FactoryConfig,
	) -> Self {
		Self {
			inner: Arc::new(FactoryInner {
				schemas,
				persistence,
				generator,
				registry: RwLock::new(StateRegistry::new()),
				config,
			}),
		}
	}

	/// Starts a builder for a model kind using the default definition.
	///
	/// # Arguments
	///
	/// * `model` - Model kind registered with the schema provider
	///
	/// # Returns
	///
	/// Returns an unconfigured builder. The schema is looked up when a
	/// terminal operation runs, so an unknown kind fails there.
	pub fn of(&self, model: &str) -> FactoryBuilder {
		FactoryBuilder::new(self.clone(), model)
	}

	/// Starts a builder for a model kind using a named definition.
	pub fn of_named(&self, model: &str, definition: &str) -> FactoryBuilder {
		self.of(model).definition(definition)
	}

	/// Builder meant to be stored as a relation attribute; same as [`Factory::of`].
	pub fn relation_of(&self, model: &str) -> FactoryBuilder {
		self.of(model)
	}

	/// Picks existing records of a model kind matching `filters`.
	pub fn random_relation_of(&self, model: &str, filters: IndexMap<String, Value>) -> RelationPick {
		RelationPick {
			model: model.to_string(),
			filters,
			limit: None,
		}
	}

	/// Makes a single record.
	pub async fn make(&self, model: &str, overrides: AttributeMap) -> FactoryResult<Instance> {
		self.of(model).make_one(overrides).await
	}

	/// Creates a single record.
	///
	/// # Arguments
	///
	/// * `model` - Model kind to create
	/// * `overrides` - Attributes that win over definitions and states
	///
	/// # Returns
	///
	/// Returns the persisted record with its parents and children attached.
	pub async fn create(&self, model: &str, overrides: AttributeMap) -> FactoryResult<Instance> {
		self.of(model).create_one(overrides).await
	}

	/// Registers a base definition for a model kind.
	pub fn define<F>(&self, model: &str, name: &str, definition: F) -> FactoryResult<()>
	where
		F: Fn(&mut StateContext<'_>) -> FactoryResult<()> + Send + Sync + 'static,
	{
		self.inner
			.registry
			.write()
			.register_definition(model, name, Arc::new(definition))
	}

	/// Registers a named state: a static patch or a callback.
	pub fn state(&self, model: &str, name: &str, patch: impl Into<StatePatch>) -> FactoryResult<()> {
		self.inner.registry.write().register(model, name, patch.into())
	}

	/// Registers a callback state.
	pub fn state_with<F>(&self, model: &str, name: &str, callback: F) -> FactoryResult<()>
	where
		F: Fn(&mut StateContext<'_>) -> FactoryResult<()> + Send + Sync + 'static,
	{
		self.state(model, name, StatePatch::callback(callback))
	}

	/// Registers a callback run after a record is made.
	///
	/// Callbacks under [`DEFAULT_STATE`](crate::registry::DEFAULT_STATE) run
	/// for every record of the kind; others only when the state is requested.
	pub fn after_making<F>(&self, model: &str, state: &str, callback: F) -> FactoryResult<()>
	where
		F: Fn(&Instance) -> FactoryResult<()> + Send + Sync + 'static,
	{
		self.inner
			.registry
			.write()
			.register_after_making(model, state, Arc::new(callback))
	}

	/// Registers a callback run after a record is created.
	pub fn after_creating<F>(&self, model: &str, state: &str, callback: F) -> FactoryResult<()>
	where
		F: Fn(&Instance) -> FactoryResult<()> + Send + Sync + 'static,
	{
		self.inner
			.registry
			.write()
			.register_after_creating(model, state, Arc::new(callback))
	}

	/// Loads static state patches from a TOML document.
	pub fn load_states(&self, content: &str) -> FactoryResult<usize> {
		let loaded = self.inner.registry.write().load_toml(content)?;
		tracing::debug!(loaded, "loaded states from TOML");
		Ok(loaded)
	}

	/// Locks the registry; later registrations fail.
	///
	/// The first `raw`/`make`/`create` call locks it implicitly.
	pub fn lock(&self) {
		let registry = self.inner.registry.read();
		if !registry.is_locked() {
			tracing::debug!(states = registry.state_count(), "locking state registry");
			registry.lock();
		}
	}

	/// Returns true once the registry is locked.
	pub fn is_locked(&self) -> bool {
		self.inner.registry.read().is_locked()
	}

	/// Looks up a schema.
	pub fn schema(&self, model: &str) -> FactoryResult<Arc<Schema>> {
		Ok(self.inner.schemas.schema(model)?)
	}

	/// Returns the value generator.
	pub fn generator(&self) -> &dyn ValueGenerator {
		self.inner.generator.as_ref()
	}

	/// Returns the persistence collaborator.
	pub fn persistence(&self) -> &dyn Persistence {
		self.inner.persistence.as_ref()
	}

	/// Returns the configuration.
	pub fn config(&self) -> &FactoryConfig {
		&self.inner.config
	}

	/// Runs `read` against the registry without holding the lock afterwards.
	pub(crate) fn with_registry<T>(&self, read: impl FnOnce(&StateRegistry) -> T) -> T {
		read(&self.inner.registry.read())
	}
}
