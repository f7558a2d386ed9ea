//! State and definition registry.
//!
//! Holds, per model kind, the named base definitions that seed an attribute
//! set, the named states that patch it, and the callbacks run after a record
//! is made or created. The registry is filled before any resolution and then
//! locked; registration after locking fails with
//! [`FactoryError::RegistryLocked`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use indexmap::IndexMap;
use serde_json::Value;

use crate::attribute::AttributeMap;
use crate::context::StateContext;
use crate::error::{FactoryError, FactoryResult};
use crate::instance::Instance;

/// Callback seeding or patching an attribute set.
pub type StateCallback = Arc<dyn Fn(&mut StateContext<'_>) -> FactoryResult<()> + Send + Sync>;

/// Callback run on a record after `make` or `create`.
pub type AfterCallback = Arc<dyn Fn(&Instance) -> FactoryResult<()> + Send + Sync>;

/// Name under which unconditional after-callbacks are registered.
pub const DEFAULT_STATE: &str = "default";

/// A named state: a static attribute patch or a callback.
#[derive(Clone)]
pub enum StatePatch {
	/// Merged over the attribute set; later values win.
	Attributes(AttributeMap),
	/// Invoked with the in-progress attribute set.
	Callback(StateCallback),
}

impl StatePatch {
	/// Wraps a callback.
	pub fn callback<F>(callback: F) -> Self
	where
		F: Fn(&mut StateContext<'_>) -> FactoryResult<()> + Send + Sync + 'static,
	{
		Self::Callback(Arc::new(callback))
	}
}

impl fmt::Debug for StatePatch {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Attributes(attributes) => f.debug_tuple("Attributes").field(attributes).finish(),
			Self::Callback(_) => f.write_str("Callback(..)"),
		}
	}
}

impl From<AttributeMap> for StatePatch {
	fn from(attributes: AttributeMap) -> Self {
		Self::Attributes(attributes)
	}
}

type Key = (String, String);

fn key(model: &str, name: &str) -> Key {
	(model.to_string(), name.to_string())
}

/// Registry of definitions, states and after-callbacks per model kind.
#[derive(Default)]
pub struct StateRegistry {
	definitions: HashMap<Key, StateCallback>,
	states: HashMap<Key, StatePatch>,
	after_making: HashMap<Key, Vec<AfterCallback>>,
	after_creating: HashMap<Key, Vec<AfterCallback>>,
	locked: AtomicBool,
}

impl fmt::Debug for StateRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("StateRegistry")
			.field("definitions", &self.definitions.len())
			.field("states", &self.states.len())
			.field("locked", &self.is_locked())
			.finish()
	}
}

impl StateRegistry {
	/// Creates an empty, unlocked registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a base definition.
	pub fn register_definition(
		&mut self,
		model: &str,
		name: &str,
		callback: StateCallback,
	) -> FactoryResult<()> {
		self.ensure_unlocked(model, name)?;
		self.definitions.insert(key(model, name), callback);
		Ok(())
	}

	/// Registers a state.
	pub fn register(&mut self, model: &str, name: &str, patch: StatePatch) -> FactoryResult<()> {
		self.ensure_unlocked(model, name)?;
		self.states.insert(key(model, name), patch);
		Ok(())
	}

	/// Registers a callback run after a record is made.
	pub fn register_after_making(
		&mut self,
		model: &str,
		state: &str,
		callback: AfterCallback,
	) -> FactoryResult<()> {
		self.ensure_unlocked(model, state)?;
		self.after_making
			.entry(key(model, state))
			.or_default()
			.push(callback);
		Ok(())
	}

	/// Registers a callback run after a record is created.
	pub fn register_after_creating(
		&mut self,
		model: &str,
		state: &str,
		callback: AfterCallback,
	) -> FactoryResult<()> {
		self.ensure_unlocked(model, state)?;
		self.after_creating
			.entry(key(model, state))
			.or_default()
			.push(callback);
		Ok(())
	}

	/// Bulk-loads static state patches from TOML.
	///
	/// Tables are keyed by model kind, then by state name:
	///
	/// ```toml
	/// [User.admin]
	/// is_admin = true
	///
	/// [User.banned]
	/// banned = true
	/// reason = "spam"
	/// ```
	///
	/// Returns the number of loaded states.
	pub fn load_toml(&mut self, content: &str) -> FactoryResult<usize> {
		let document: IndexMap<String, IndexMap<String, IndexMap<String, Value>>> =
			toml::from_str(content)?;
		let mut loaded = 0;
		for (model, states) in document {
			for (name, attributes) in states {
				let patch: AttributeMap = attributes.into_iter().collect();
				self.register(&model, &name, StatePatch::Attributes(patch))?;
				loaded += 1;
			}
		}
		Ok(loaded)
	}

	/// Locks the registry against further registration.
	pub fn lock(&self) {
		self.locked.store(true, Ordering::Release);
	}

	/// Returns true once the registry is locked.
	pub fn is_locked(&self) -> bool {
		self.locked.load(Ordering::Acquire)
	}

	/// Returns a base definition.
	pub fn definition(&self, model: &str, name: &str) -> Option<StateCallback> {
		self.definitions.get(&key(model, name)).cloned()
	}

	/// Returns a state patch.
	pub fn state(&self, model: &str, name: &str) -> Option<StatePatch> {
		self.states.get(&key(model, name)).cloned()
	}

	/// Returns true if a state is registered.
	pub fn has_state(&self, model: &str, name: &str) -> bool {
		self.states.contains_key(&key(model, name))
	}

	/// Returns true if after-callbacks exist for the state.
	pub fn has_after_callback(&self, model: &str, state: &str) -> bool {
		let key = key(model, state);
		self.after_making.contains_key(&key) || self.after_creating.contains_key(&key)
	}

	/// Returns the after-making callbacks for the default and given states.
	pub fn after_making(&self, model: &str, states: &[&str]) -> Vec<AfterCallback> {
		collect_after(&self.after_making, model, states)
	}

	/// Returns the after-creating callbacks for the default and given states.
	pub fn after_creating(&self, model: &str, states: &[&str]) -> Vec<AfterCallback> {
		collect_after(&self.after_creating, model, states)
	}

	/// Returns the number of registered states.
	pub fn state_count(&self) -> usize {
		self.states.len()
	}

	fn ensure_unlocked(&self, model: &str, name: &str) -> FactoryResult<()> {
		if self.is_locked() {
			return Err(FactoryError::RegistryLocked {
				model: model.to_string(),
				name: name.to_string(),
			});
		}
		Ok(())
	}
}

fn collect_after(
	callbacks: &HashMap<Key, Vec<AfterCallback>>,
	model: &str,
	states: &[&str],
) -> Vec<AfterCallback> {
	std::iter::once(DEFAULT_STATE)
		.chain(states.iter().copied().filter(|state| *state != DEFAULT_STATE))
		.filter_map(|state| callbacks.get(&key(model, state)))
		.flat_map(|list| list.iter().cloned())
		.collect()
}
