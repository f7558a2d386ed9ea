//! Error types for the factory engine.
//!
//! Every error is fatal for the `raw`/`make`/`create` call that raised it.
//! Variants carry the model kind, state, field or generator involved so the
//! caller can report the failure without any logging from the engine.

use std::fmt;

use fixtura_schema::SchemaError;
use thiserror::Error;

/// Path through which a relation was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationPath {
	/// Parent path (`for`): materialized before the owner.
	Parent,
	/// Child path (`has`): materialized after the owner.
	Child,
}

impl fmt::Display for RelationPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Parent => f.write_str("for"),
			Self::Child => f.write_str("has"),
		}
	}
}

/// Errors that can occur while resolving or materializing fixtures.
#[derive(Debug, Error)]
pub enum FactoryError {
	/// A non-default definition name has no registered callback.
	#[error("Unable to locate definition `{definition}` for `{model}`")]
	UnknownDefinition {
		/// Model kind.
		model: String,
		/// Requested definition name.
		definition: String,
	},

	/// A state name matches neither a registered patch nor a relation field.
	#[error("Unable to locate state `{state}` for `{model}`")]
	UnknownState {
		/// Model kind.
		model: String,
		/// Requested state name, including any `:<amount>` suffix.
		state: String,
	},

	/// A relation was requested through the wrong path for its multiplicity.
	#[error("Relation `{relationship}` of `{model}` cannot be requested with `{path}`")]
	RelationshipMultiplicityMismatch {
		/// Model kind owning the relation.
		model: String,
		/// Relation field name.
		relationship: String,
		/// Path that was used.
		path: RelationPath,
	},

	/// Relationship inference matched several fields.
	#[error("Ambiguous relationship from `{model}` to `{target}`: {candidates:?}")]
	AmbiguousRelationship {
		/// Model kind owning the relation.
		model: String,
		/// Related model kind.
		target: String,
		/// Matching field names.
		candidates: Vec<String>,
	},

	/// A relationship name does not denote a relation on the schema.
	#[error("Unknown relationship `{relationship}` on `{model}`")]
	UnknownRelationship {
		/// Model kind.
		model: String,
		/// Requested relationship, or the related model kind when inferred.
		relationship: String,
	},

	/// No inverse field for a child relation was found on the target schema.
	#[error("No inverse field for `{model}.{relationship}` on `{target}`")]
	MissingInverse {
		/// Owner model kind.
		model: String,
		/// Child relation field.
		relationship: String,
		/// Child model kind.
		target: String,
	},

	/// A plain value was supplied for a child relation.
	#[error("Child relation `{model}.{field}` needs a builder or related records")]
	InvalidRelationValue {
		/// Model kind.
		model: String,
		/// Relation field.
		field: String,
	},

	/// The unique generator ran out of fresh values.
	#[error("Unique generator `{kind}` exhausted after {attempts} attempts")]
	ExhaustedUniqueSpace {
		/// Generator kind.
		kind: String,
		/// Attempts made before giving up.
		attempts: usize,
	},

	/// The generator kind is not supported.
	#[error("Unknown generator: {0}")]
	UnknownGenerator(String),

	/// Generator parameters could not be interpreted.
	#[error("Invalid parameters for generator `{kind}`: {message}")]
	InvalidGeneratorParams {
		/// Generator kind.
		kind: String,
		/// Description of the problem.
		message: String,
	},

	/// A registration was attempted after the registry was locked.
	#[error("Registry is locked; cannot register `{name}` for `{model}`")]
	RegistryLocked {
		/// Model kind.
		model: String,
		/// State or definition name.
		name: String,
	},

	/// The persistence collaborator failed.
	#[error("Persistence failure for `{model}`: {source}")]
	PersistenceFailure {
		/// Model kind being persisted.
		model: String,
		/// Underlying error.
		#[source]
		source: Box<dyn std::error::Error + Send + Sync>,
	},

	/// Schema lookup failed.
	#[error(transparent)]
	Schema(#[from] SchemaError),

	/// Configuration could not be interpreted.
	#[error("Configuration error: {0}")]
	Config(String),

	/// TOML deserialization error.
	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	/// I/O operation failed.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

impl FactoryError {
	/// Wraps an error raised by a persistence collaborator.
	pub fn persistence(
		model: impl Into<String>,
		source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
	) -> Self {
		Self::PersistenceFailure {
			model: model.into(),
			source: source.into(),
		}
	}
}

/// Result type alias for factory operations.
pub type FactoryResult<T> = Result<T, FactoryError>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_unknown_state_message() {
		let error = FactoryError::UnknownState {
			model: "User".to_string(),
			state: "ghost".to_string(),
		};
		assert_eq!(error.to_string(), "Unable to locate state `ghost` for `User`");
	}

	#[rstest]
	fn test_mismatch_message_names_path() {
		let error = FactoryError::RelationshipMultiplicityMismatch {
			model: "Post".to_string(),
			relationship: "author".to_string(),
			path: RelationPath::Child,
		};
		assert_eq!(
			error.to_string(),
			"Relation `author` of `Post` cannot be requested with `has`"
		);
	}

	#[rstest]
	fn test_persistence_wraps_source() {
		let error = FactoryError::persistence("User", "disk full");
		assert!(matches!(error, FactoryError::PersistenceFailure { ref model, .. } if model == "User"));
		assert!(error.to_string().contains("disk full"));
	}

	#[rstest]
	fn test_schema_error_from() {
		let error: FactoryError = SchemaError::ModelNotFound("Ghost".to_string()).into();
		assert!(matches!(error, FactoryError::Schema(_)));
		assert_eq!(error.to_string(), "Model not found: Ghost");
	}
}
