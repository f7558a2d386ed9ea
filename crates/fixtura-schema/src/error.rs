//! Error types for schema descriptors.

use thiserror::Error;

/// Errors raised while building or looking up schemas.
#[derive(Debug, Error)]
pub enum SchemaError {
	/// Two fields of the same schema share a name.
	#[error("Duplicate field `{field}` in schema `{model}`")]
	DuplicateField {
		/// Model kind owning the schema.
		model: String,
		/// Offending field name.
		field: String,
	},

	/// No schema is registered for the model kind.
	#[error("Model not found: {0}")]
	ModelNotFound(String),

	/// A relation field was declared without a target model.
	#[error("Relation `{field}` of `{model}` has no target model")]
	MissingTarget {
		/// Model kind owning the field.
		model: String,
		/// Relation field name.
		field: String,
	},

	/// Field type defaults could not be interpreted.
	#[error("Invalid field type defaults: {0}")]
	InvalidDefaults(String),

	/// TOML deserialization error.
	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),
}

/// Result type alias for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_duplicate_field_message() {
		let error = SchemaError::DuplicateField {
			model: "User".to_string(),
			field: "email".to_string(),
		};
		assert_eq!(error.to_string(), "Duplicate field `email` in schema `User`");
	}

	#[rstest]
	fn test_model_not_found_message() {
		let error = SchemaError::ModelNotFound("Post".to_string());
		assert_eq!(error.to_string(), "Model not found: Post");
	}
}
