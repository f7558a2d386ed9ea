//! Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FactoryError, FactoryResult};

/// What happens to parent relations during `make`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentPolicy {
	/// Parents are always persisted, even when the owner is only made.
	#[default]
	AlwaysPersist,
	/// Parents follow the owner: made during `make`, created during `create`.
	FollowMode,
}

/// Tunables of the factory engine.
///
/// # Example
///
/// ```
/// use fixtura_factory::config::{FactoryConfig, ParentPolicy};
///
/// let config = FactoryConfig::from_toml_str(r#"
/// parent_policy = "follow_mode"
/// max_state_amount = 3
/// "#).unwrap();
///
/// assert_eq!(config.parent_policy, ParentPolicy::FollowMode);
/// assert_eq!(config.max_state_amount, 3);
/// assert_eq!(config.unique_attempts, 10_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
	/// Parent materialization policy for `make`.
	pub parent_policy: ParentPolicy,

	/// Upper bound of the random count for `state("relation")` on a many relation.
	pub max_state_amount: usize,

	/// Attempts of the unique generator before giving up.
	pub unique_attempts: usize,

	/// Value produced by the `password` generator.
	pub password: String,

	/// Definition used when a builder does not name one.
	pub default_definition: String,
}

impl Default for FactoryConfig {
	fn default() -> Self {
		Self {
			parent_policy: ParentPolicy::AlwaysPersist,
			max_state_amount: 5,
			unique_attempts: 10_000,
			password: "password".to_string(),
			default_definition: "default".to_string(),
		}
	}
}

impl FactoryConfig {
	/// Creates the default configuration.
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses a TOML document. Missing keys keep their defaults.
	pub fn from_toml_str(content: &str) -> FactoryResult<Self> {
		let config: Self = toml::from_str(content)?;
		config.validate()?;
		Ok(config)
	}

	/// Reads and parses a TOML file.
	pub fn from_path(path: &Path) -> FactoryResult<Self> {
		let content = std::fs::read_to_string(path)?;
		Self::from_toml_str(&content)
	}

	/// Sets the parent policy.
	pub fn with_parent_policy(mut self, policy: ParentPolicy) -> Self {
		self.parent_policy = policy;
		self
	}

	/// Sets the maximum random relation count.
	pub fn with_max_state_amount(mut self, amount: usize) -> Self {
		self.max_state_amount = amount;
		self
	}

	/// Sets the unique generator attempt budget.
	pub fn with_unique_attempts(mut self, attempts: usize) -> Self {
		self.unique_attempts = attempts;
		self
	}

	fn validate(&self) -> FactoryResult<()> {
		if self.unique_attempts == 0 {
			return Err(FactoryError::Config(
				"unique_attempts must be at least 1".to_string(),
			));
		}
		if self.default_definition.is_empty() {
			return Err(FactoryError::Config(
				"default_definition must not be empty".to_string(),
			));
		}
		Ok(())
	}
}
