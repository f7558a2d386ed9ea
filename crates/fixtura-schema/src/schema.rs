//! Model schemas.

use std::collections::HashSet;

use crate::error::{SchemaError, SchemaResult};
use crate::field::Field;

/// Ordered, immutable field list of one model kind.
///
/// Field names (including the decomposed columns of composite fields) are
/// unique within a schema.
///
/// # Example
///
/// ```
/// use fixtura_schema::{Field, Schema};
///
/// let schema = Schema::new("Post", vec![
///     Field::new("title").generator("sentence"),
///     Field::parent("author", "User"),
/// ])
/// .unwrap();
///
/// assert_eq!(schema.model(), "Post");
/// assert!(schema.has_field("title"));
/// assert!(schema.relation("author").is_some());
/// assert!(schema.relation("title").is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
	model: String,
	fields: Vec<Field>,
}

impl Schema {
	/// Creates a schema, rejecting duplicate field names.
	///
	/// # Errors
	///
	/// Returns [`SchemaError::DuplicateField`] when two fields share a name
	/// and [`SchemaError::MissingTarget`] for a relation without a target.
	pub fn new(model: impl Into<String>, fields: Vec<Field>) -> SchemaResult<Self> {
		let model = model.into();
		let mut seen = HashSet::new();

		for field in &fields {
			let names = std::iter::once(field.name())
				.chain(field.components().iter().map(Field::name));
			for name in names {
				if !seen.insert(name.to_string()) {
					return Err(SchemaError::DuplicateField {
						model,
						field: name.to_string(),
					});
				}
			}

			if field.is_relation() && field.target().is_none() && field.morph_targets().is_empty() {
				return Err(SchemaError::MissingTarget {
					model,
					field: field.name().to_string(),
				});
			}
		}

		Ok(Self { model, fields })
	}

	/// Returns the model kind.
	pub fn model(&self) -> &str {
		&self.model
	}

	/// Returns the fields in declaration order.
	pub fn fields(&self) -> &[Field] {
		&self.fields
	}

	/// Looks up a top-level field by name.
	pub fn field(&self, name: &str) -> Option<&Field> {
		self.fields.iter().find(|field| field.name() == name)
	}

	/// Returns true if a top-level field with that name exists.
	pub fn has_field(&self, name: &str) -> bool {
		self.field(name).is_some()
	}

	/// Looks up a relation field by name.
	pub fn relation(&self, name: &str) -> Option<&Field> {
		self.field(name).filter(|field| field.is_relation())
	}

	/// Returns every relation field that may point at `model`.
	pub fn relations_targeting(&self, model: &str) -> Vec<&Field> {
		self.fields
			.iter()
			.filter(|field| field.is_relation() && field.targets(model))
			.collect()
	}

	/// Returns the relation fields in declaration order.
	pub fn relations(&self) -> impl Iterator<Item = &Field> {
		self.fields.iter().filter(|field| field.is_relation())
	}
}
