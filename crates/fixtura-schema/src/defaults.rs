//! Default generators per field type.
//!
//! Schema loaders tag each field with a type name (`email`, `integer`,
//! `many_to_one`, ...). This table maps those names to the generator a field
//! of that type receives when its declaration does not name one.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{SchemaError, SchemaResult};
use crate::field::{Field, GeneratorSpec};

/// Field type name to default generator mapping.
///
/// A `None` entry means the type is known but never generated (primary keys,
/// raw JSON columns).
///
/// # Example
///
/// ```
/// use fixtura_schema::{Field, FieldTypeDefaults};
///
/// let defaults = FieldTypeDefaults::builtin();
/// assert_eq!(defaults.spec_for("email").unwrap().kind, "safeEmail");
/// assert!(defaults.spec_for("primary_id").is_none());
///
/// let field = defaults.apply(Field::new("contact"), "email");
/// assert_eq!(field.generator_spec().unwrap().kind, "safeEmail");
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldTypeDefaults {
	types: IndexMap<String, Option<GeneratorSpec>>,
}

#[derive(Debug, Deserialize)]
struct DefaultsFile {
	#[serde(default)]
	types: IndexMap<String, DefaultEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DefaultEntry {
	Toggle(bool),
	Kind(String),
	Spec(GeneratorSpec),
}

impl FieldTypeDefaults {
	/// Creates an empty table.
	pub fn empty() -> Self {
		Self::default()
	}

	/// Returns the table shipped with the engine.
	pub fn builtin() -> Self {
		let mut defaults = Self::empty();
		let simple = [
			("binary", "randomNumber"),
			("boolean", "boolean"),
			("char", "word"),
			("date_time", "dateTime"),
			("decimal", "randomFloat"),
			("email", "safeEmail"),
			("enum", "randomElement"),
			("hashed", "text"),
			("increment", "randomNumber"),
			("json_list", "words"),
			("json_object", "wordsObject"),
			("many_to_one", "relation"),
			("one_to_one", "relation"),
			("has_one", "relation"),
			("password", "password"),
			("text", "text"),
			("uri", "url"),
		];
		for (name, kind) in simple {
			defaults.set(name, Some(GeneratorSpec::new(kind)));
		}

		for prefix in ["", "big_", "small_"] {
			for signed in ["", "unsigned_"] {
				defaults.set(
					format!("{prefix}{signed}integer"),
					Some(GeneratorSpec::new("randomNumber")),
				);
				defaults.set(
					format!("{prefix}{signed}decimal"),
					Some(GeneratorSpec::new("randomFloat")),
				);
			}
		}

		defaults.set(
			"many_to_many",
			Some(GeneratorSpec::new("randomRelation").with_params(vec![json!({ "limit": 2 })])),
		);
		for name in ["has_many", "belongs_to_many"] {
			defaults.set(
				name,
				Some(GeneratorSpec::new("relation").with_params(vec![json!({ "count": 5 })])),
			);
		}
		for name in ["primary_id", "unique_id", "json", "timestamp"] {
			defaults.set(name, None);
		}

		defaults
	}

	/// Parses a TOML table and overlays it on the builtin table.
	///
	/// ```toml
	/// [types]
	/// email = "freeEmail"
	/// decimal = { kind = "randomFloat", params = [2, 0, 100] }
	/// primary_id = false
	/// ```
	pub fn from_toml_str(content: &str) -> SchemaResult<Self> {
		let mut defaults = Self::builtin();
		defaults.overlay_toml(content)?;
		Ok(defaults)
	}

	/// Overlays a TOML table on this table.
	///
	/// # Errors
	///
	/// Returns [`SchemaError::Toml`] for malformed TOML and
	/// [`SchemaError::InvalidDefaults`] for a `true` entry.
	pub fn overlay_toml(&mut self, content: &str) -> SchemaResult<()> {
		let file: DefaultsFile = toml::from_str(content)?;
		for (name, entry) in file.types {
			let spec = match entry {
				DefaultEntry::Toggle(false) => None,
				DefaultEntry::Toggle(true) => {
					return Err(SchemaError::InvalidDefaults(format!(
						"type `{name}` must name a generator instead of `true`"
					)));
				}
				DefaultEntry::Kind(kind) => Some(GeneratorSpec::new(kind)),
				DefaultEntry::Spec(spec) => Some(spec),
			};
			self.set(name, spec);
		}
		Ok(())
	}

	/// Sets the default generator of a type.
	pub fn set(&mut self, type_name: impl Into<String>, spec: Option<GeneratorSpec>) {
		self.types.insert(type_name.into(), spec);
	}

	/// Returns true if the type is listed, with or without a generator.
	pub fn contains(&self, type_name: &str) -> bool {
		self.types.contains_key(type_name)
	}

	/// Returns the default generator of a type.
	pub fn spec_for(&self, type_name: &str) -> Option<&GeneratorSpec> {
		self.types.get(type_name).and_then(Option::as_ref)
	}

	/// Gives `field` the type's default generator unless it already has one.
	pub fn apply(&self, field: Field, type_name: &str) -> Field {
		if field.generator_spec().is_some() {
			return field;
		}
		match self.spec_for(type_name) {
			Some(spec) => field.generator_spec_with(spec.clone()),
			None => field,
		}
	}

	/// Returns the parameter list of a type's generator, empty if none.
	pub fn params_for(&self, type_name: &str) -> &[Value] {
		self.spec_for(type_name)
			.map(|spec| spec.params.as_slice())
			.unwrap_or(&[])
	}
}
