//! Field descriptors.
//!
//! A [`Field`] is the static description of one attribute of a model kind:
//! how a value is synthesized for it, whether it may be absent, and whether it
//! points at another model kind.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Generator selection for a field: a generator kind plus ordered parameters.
///
/// # Example
///
/// ```
/// use fixtura_schema::GeneratorSpec;
/// use serde_json::json;
///
/// let spec = GeneratorSpec::new("numberBetween").with_params(vec![json!(1), json!(10)]);
/// assert_eq!(spec.kind, "numberBetween");
/// assert_eq!(spec.params.len(), 2);
/// assert!(!spec.unique);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorSpec {
	/// Generator kind (e.g. "safeEmail", "relation").
	pub kind: String,

	/// Ordered generator parameters.
	#[serde(default)]
	pub params: Vec<Value>,

	/// Never repeat a value for this kind within a run.
	#[serde(default)]
	pub unique: bool,
}

impl GeneratorSpec {
	/// Creates a spec without parameters.
	pub fn new(kind: impl Into<String>) -> Self {
		Self {
			kind: kind.into(),
			params: Vec::new(),
			unique: false,
		}
	}

	/// Sets the ordered parameters.
	pub fn with_params(mut self, params: Vec<Value>) -> Self {
		self.params = params;
		self
	}

	/// Marks the spec as unique.
	pub fn unique(mut self) -> Self {
		self.unique = true;
		self
	}
}

/// How many related records a relation holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiplicity {
	/// Exactly one related record.
	One,
	/// Any number of related records.
	Many,
}

/// Relation kind of a field.
///
/// Parent relations must exist before the owning record is persisted and
/// store a foreign key on the owner. Child relations are built after the
/// owner and point back at it through an inverse field on their own schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
	/// Plain attribute.
	#[default]
	None,
	/// Belongs-to relation, single valued.
	Parent,
	/// Has-one or has-many relation.
	Child(Multiplicity),
	/// Belongs-to relation whose target kind is chosen per record.
	Polymorphic,
}

impl RelationKind {
	/// Returns true for every kind except [`RelationKind::None`].
	pub fn is_relation(&self) -> bool {
		!matches!(self, Self::None)
	}

	/// Returns true when the relation is materialized before its owner.
	pub fn uses_parent_path(&self) -> bool {
		matches!(self, Self::Parent | Self::Polymorphic)
	}

	/// Returns true when the relation is materialized after its owner.
	pub fn uses_child_path(&self) -> bool {
		matches!(self, Self::Child(_))
	}

	/// Returns the multiplicity, or `None` for plain attributes.
	pub fn multiplicity(&self) -> Option<Multiplicity> {
		match self {
			Self::None => None,
			Self::Parent | Self::Polymorphic => Some(Multiplicity::One),
			Self::Child(multiplicity) => Some(*multiplicity),
		}
	}
}

/// One named attribute of a model schema.
///
/// # Example
///
/// ```
/// use fixtura_schema::{Field, Multiplicity, RelationKind};
///
/// let email = Field::new("email").generator("safeEmail");
/// assert!(email.generator_spec().is_some());
///
/// let posts = Field::has_many("posts", "Post");
/// assert_eq!(posts.relation(), RelationKind::Child(Multiplicity::Many));
/// assert!(posts.is_optional_relation());
///
/// let author = Field::parent("author", "User");
/// assert_eq!(author.foreign_key_column(), "author_id");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
	name: String,
	generator: Option<GeneratorSpec>,
	unique: bool,
	nullable: bool,
	required: bool,
	default: Option<Value>,
	relation: RelationKind,
	target: Option<String>,
	morph_targets: Vec<String>,
	foreign_key: Option<String>,
	inverse: Option<String>,
	components: Vec<Field>,
}

impl Field {
	/// Creates a plain, non-nullable attribute without a generator.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			generator: None,
			unique: false,
			nullable: false,
			required: false,
			default: None,
			relation: RelationKind::None,
			target: None,
			morph_targets: Vec::new(),
			foreign_key: None,
			inverse: None,
			components: Vec::new(),
		}
	}

	/// Creates a belongs-to relation. Nullable unless marked required.
	pub fn parent(name: impl Into<String>, target: impl Into<String>) -> Self {
		Self::relation_field(name, RelationKind::Parent, target)
	}

	/// Creates a has-one relation.
	pub fn has_one(name: impl Into<String>, target: impl Into<String>) -> Self {
		Self::relation_field(name, RelationKind::Child(Multiplicity::One), target)
	}

	/// Creates a has-many relation.
	pub fn has_many(name: impl Into<String>, target: impl Into<String>) -> Self {
		Self::relation_field(name, RelationKind::Child(Multiplicity::Many), target)
	}

	/// Creates a polymorphic belongs-to relation over several target kinds.
	pub fn morph_to<I, S>(name: impl Into<String>, targets: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut field = Self::new(name);
		field.relation = RelationKind::Polymorphic;
		field.nullable = true;
		field.morph_targets = targets.into_iter().map(Into::into).collect();
		field
	}

	/// Creates a composite field decomposed into several underlying columns.
	pub fn composite(name: impl Into<String>, components: Vec<Field>) -> Self {
		let mut field = Self::new(name);
		field.components = components;
		field
	}

	fn relation_field(
		name: impl Into<String>,
		relation: RelationKind,
		target: impl Into<String>,
	) -> Self {
		let mut field = Self::new(name);
		field.relation = relation;
		field.target = Some(target.into());
		field.nullable = true;
		field
	}

	/// Sets the generator kind without parameters.
	pub fn generator(self, kind: impl Into<String>) -> Self {
		self.generator_spec_with(GeneratorSpec::new(kind))
	}

	/// Sets the generator kind with ordered parameters.
	pub fn generator_with(self, kind: impl Into<String>, params: Vec<Value>) -> Self {
		self.generator_spec_with(GeneratorSpec::new(kind).with_params(params))
	}

	/// Sets a full generator spec.
	///
	/// A field already marked [`unique`](Field::unique) keeps the flag.
	pub fn generator_spec_with(mut self, mut spec: GeneratorSpec) -> Self {
		spec.unique |= self.unique;
		self.generator = Some(spec);
		self
	}

	/// Marks the generator as unique, whether it is set before or after.
	pub fn unique(mut self) -> Self {
		self.unique = true;
		if let Some(spec) = self.generator.as_mut() {
			spec.unique = true;
		}
		self
	}

	/// Marks the field as nullable.
	pub fn nullable(mut self) -> Self {
		self.nullable = true;
		self
	}

	/// Marks the field as required.
	///
	/// Required relations are materialized even without an explicit request.
	pub fn required(mut self) -> Self {
		self.required = true;
		self.nullable = false;
		self
	}

	/// Declares a default value used when no generator is available.
	pub fn default_value(mut self, value: impl Into<Value>) -> Self {
		self.default = Some(value.into());
		self
	}

	/// Overrides the foreign key column of a parent relation.
	pub fn foreign_key(mut self, column: impl Into<String>) -> Self {
		self.foreign_key = Some(column.into());
		self
	}

	/// Names the inverse field on the target schema of a child relation.
	pub fn inverse(mut self, field: impl Into<String>) -> Self {
		self.inverse = Some(field.into());
		self
	}

	/// Returns the field name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Returns the generator spec, if any.
	pub fn generator_spec(&self) -> Option<&GeneratorSpec> {
		self.generator.as_ref()
	}

	/// Returns true if the field may be absent.
	pub fn is_nullable(&self) -> bool {
		self.nullable
	}

	/// Returns true if the field was explicitly marked required.
	pub fn is_required(&self) -> bool {
		self.required
	}

	/// Returns true if a default value is declared.
	pub fn has_default(&self) -> bool {
		self.default.is_some()
	}

	/// Returns the declared default value.
	pub fn declared_default(&self) -> Option<&Value> {
		self.default.as_ref()
	}

	/// Returns the relation kind.
	pub fn relation(&self) -> RelationKind {
		self.relation
	}

	/// Returns true for relation fields.
	pub fn is_relation(&self) -> bool {
		self.relation.is_relation()
	}

	/// Returns true for relations that are never generated implicitly.
	pub fn is_optional_relation(&self) -> bool {
		self.is_relation() && self.nullable && !self.required
	}

	/// Returns the declared target model kind.
	pub fn target(&self) -> Option<&str> {
		self.target.as_deref()
	}

	/// Returns the candidate target kinds of a polymorphic relation.
	pub fn morph_targets(&self) -> &[String] {
		&self.morph_targets
	}

	/// Returns true if the relation may point at `model`.
	pub fn targets(&self, model: &str) -> bool {
		self.target.as_deref() == Some(model) || self.morph_targets.iter().any(|t| t == model)
	}

	/// Returns the explicitly declared inverse field name.
	pub fn inverse_name(&self) -> Option<&str> {
		self.inverse.as_deref()
	}

	/// Returns the column holding the foreign key of a parent relation.
	pub fn foreign_key_column(&self) -> String {
		self.foreign_key
			.clone()
			.unwrap_or_else(|| format!("{}_id", self.name))
	}

	/// Returns the column holding the target kind of a polymorphic relation.
	pub fn morph_type_column(&self) -> String {
		format!("{}_type", self.name)
	}

	/// Returns true if the field decomposes into several columns.
	pub fn is_composite(&self) -> bool {
		!self.components.is_empty()
	}

	/// Returns the decomposed columns of a composite field.
	pub fn components(&self) -> &[Field] {
		&self.components
	}
}
