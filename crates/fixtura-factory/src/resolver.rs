//! Attribute resolution.
//!
//! Resolution produces the attribute set of one record in a fixed order:
//!
//! 1. the named base definition seeds the set
//! 2. overrides are merged on top
//! 3. requested states are applied in order, overrides re-applied after each
//! 4. missing schema fields are generated
//! 5. deferred values are expanded in insertion order
//!
//! Nested builders and picks are left in place for the relation
//! materializer; resolution itself never persists anything.

use std::collections::VecDeque;
use std::sync::Arc;

use fixtura_schema::{Field, Multiplicity, RelationKind, Schema, SchemaError};
use heck::ToLowerCamelCase;
use serde_json::{Map, Value};

use crate::attribute::{Attribute, AttributeMap, RelationPick};
use crate::builder::{FactoryBuilder, StateRequest};
use crate::context::{ResolutionContext, StateContext};
use crate::error::{FactoryError, FactoryResult};
use crate::factory::Factory;
use crate::registry::StatePatch;

const RELATION_GENERATOR: &str = "relation";
const RANDOM_RELATION_GENERATOR: &str = "randomRelation";

/// Deferred values returning deferred values are followed this deep.
const MAX_DEFERRED_DEPTH: usize = 16;

/// Inputs of one resolution.
#[derive(Debug, Clone, Copy)]
pub struct ResolveRequest<'r> {
	/// Base definition name.
	pub definition: &'r str,
	/// Caller-supplied attributes; they win over definitions and states.
	pub overrides: &'r AttributeMap,
	/// States in request order.
	pub states: &'r [StateRequest],
	/// When set, only these fields are generated.
	pub only: Option<&'r [String]>,
	/// Fields that are never generated.
	pub except: &'r [String],
}

impl ResolveRequest<'_> {
	fn allows(&self, field: &str) -> bool {
		self.only
			.is_none_or(|only| only.iter().any(|name| name == field))
			&& !self.except.iter().any(|name| name == field)
	}
}

/// Resolves the attribute set of one record of a model kind.
pub struct AttributeResolver<'a> {
	factory: &'a Factory,
	schema: Arc<Schema>,
}

impl<'a> AttributeResolver<'a> {
	/// Creates a resolver for `schema`.
	pub fn new(factory: &'a Factory, schema: Arc<Schema>) -> Self {
		Self { factory, schema }
	}

	/// Runs the five resolution steps.
	///
	/// # Errors
	///
	/// Fails on an unknown definition or state, a generator failure, or a
	/// deferred computation error. Nothing is persisted either way.
	pub fn resolve(&self, request: &ResolveRequest<'_>) -> FactoryResult<AttributeMap> {
		let model = self.schema.model();
		tracing::debug!(
			model,
			definition = request.definition,
			states = request.states.len(),
			"resolving attributes"
		);

		let mut attributes = AttributeMap::new();
		self.apply_definition(request.definition, &mut attributes)?;
		attributes.merge(request.overrides);

		for state in request.states {
			match state {
				StateRequest::Named(raw) => self.apply_named_state(raw, &mut attributes)?,
				StateRequest::Inline(patch) => self.apply_patch(patch, &mut attributes)?,
			}
			attributes.merge(request.overrides);
		}

		self.generate_missing(request, &mut attributes)?;
		self.expand(&mut attributes)?;

		tracing::trace!(model, attributes = attributes.len(), "attributes resolved");
		Ok(attributes)
	}

	fn apply_definition(&self, name: &str, attributes: &mut AttributeMap) -> FactoryResult<()> {
		let model = self.schema.model();
		let definition = self
			.factory
			.with_registry(|registry| registry.definition(model, name));
		match definition {
			Some(definition) => {
				let mut context =
					StateContext::new(model, attributes, self.factory.generator(), self.factory);
				definition(&mut context)
			}
			None if name == self.factory.config().default_definition => Ok(()),
			None => Err(FactoryError::UnknownDefinition {
				model: model.to_string(),
				definition: name.to_string(),
			}),
		}
	}

	fn apply_patch(&self, patch: &StatePatch, attributes: &mut AttributeMap) -> FactoryResult<()> {
		match patch {
			StatePatch::Attributes(values) => {
				attributes.merge(values);
				Ok(())
			}
			StatePatch::Callback(callback) => {
				let mut context = StateContext::new(
					self.schema.model(),
					attributes,
					self.factory.generator(),
					self.factory,
				);
				callback(&mut context)
			}
		}
	}

	/// Applies a registered state, or falls back to a relation field of the
	/// same name.
	fn apply_named_state(&self, raw: &str, attributes: &mut AttributeMap) -> FactoryResult<()> {
		let model = self.schema.model();
		let unknown = || FactoryError::UnknownState {
			model: model.to_string(),
			state: raw.to_string(),
		};

		let (name, amount) = match raw.split_once(':') {
			Some((name, amount)) => (name, Some(amount.parse::<usize>().map_err(|_| unknown())?)),
			None => (raw, None),
		};

		let (patch, has_callbacks) = self.factory.with_registry(|registry| {
			(registry.state(model, name), registry.has_after_callback(model, name))
		});
		if let Some(patch) = patch {
			tracing::trace!(model, state = name, "applying state");
			return self.apply_patch(&patch, attributes);
		}
		if has_callbacks {
			return Ok(());
		}

		let field = self.schema.relation(name).ok_or_else(unknown)?;
		tracing::debug!(model, relation = name, ?amount, "state resolved to relation");
		let builder = self.relation_builder(field, amount)?;
		attributes.set(field.name(), builder);
		Ok(())
	}

	fn generate_missing(
		&self,
		request: &ResolveRequest<'_>,
		attributes: &mut AttributeMap,
	) -> FactoryResult<()> {
		let mut queue: VecDeque<&Field> = self.schema.fields().iter().collect();
		while let Some(field) = queue.pop_front() {
			let name = field.name();
			if attributes.has(name) || !request.allows(name) {
				continue;
			}

			if field.is_composite() {
				// A partially supplied composite is completed component by component.
				if field.components().iter().any(|component| attributes.has(component.name())) {
					for component in field.components().iter().rev() {
						queue.push_front(component);
					}
				} else if let Some(value) = self.generate_composite(field)? {
					attributes.set(name, value);
				}
				continue;
			}

			if field.is_relation() {
				if field.is_optional_relation() {
					continue;
				}
				if field.relation().uses_parent_path()
					&& attributes.has(&field.foreign_key_column())
				{
					continue;
				}
				let relation = self.generate_relation(field)?;
				attributes.set(name, relation);
				continue;
			}

			if let Some(value) = self.generate_value(field)? {
				attributes.set(name, value);
			}
		}
		Ok(())
	}

	fn generate_value(&self, field: &Field) -> FactoryResult<Option<Value>> {
		let Some(spec) = field.generator_spec() else {
			return Ok(field.declared_default().cloned());
		};
		let generator = self.factory.generator();
		let value = if spec.unique {
			generator.generate_unique(&spec.kind, &spec.params)?
		} else {
			generator.generate(&spec.kind, &spec.params)?
		};
		Ok(Some(value))
	}

	fn generate_composite(&self, field: &Field) -> FactoryResult<Option<Value>> {
		if field.generator_spec().is_some() {
			return self.generate_value(field);
		}
		let mut object = Map::new();
		for component in field.components() {
			if let Some(value) = self.generate_value(component)? {
				object.insert(component.name().to_string(), value);
			}
		}
		Ok((!object.is_empty()).then_some(Value::Object(object)))
	}

	/// Placeholder for a required relation: a pick of existing records for
	/// `randomRelation`, otherwise a nested builder.
	fn generate_relation(&self, field: &Field) -> FactoryResult<Attribute> {
		let spec = field.generator_spec();
		let kind = spec.map(|spec| spec.kind.to_lower_camel_case());
		let options = spec
			.and_then(|spec| spec.params.first())
			.cloned()
			.unwrap_or(Value::Null);

		if kind.as_deref() == Some(RANDOM_RELATION_GENERATOR) {
			return Ok(Attribute::Pick(self.relation_pick(field, &options)?));
		}
		if kind.as_deref().is_some_and(|kind| kind != RELATION_GENERATOR) {
			tracing::trace!(
				model = self.schema.model(),
				field = field.name(),
				"ignoring non-relation generator on relation field"
			);
		}

		let (count, states) = match &options {
			Value::Number(count) => (count.as_u64().map(|count| count as usize), Vec::new()),
			Value::Object(object) => (
				object
					.get("count")
					.and_then(Value::as_u64)
					.map(|count| count as usize),
				string_list(object.get("state").or_else(|| object.get("states"))),
			),
			_ => (None, Vec::new()),
		};
		Ok(Attribute::from(self.relation_builder(field, count)?.states(states)))
	}

	fn relation_pick(&self, field: &Field, options: &Value) -> FactoryResult<RelationPick> {
		let mut pick = RelationPick::new(self.relation_target(field)?);
		if let Value::Object(object) = options {
			for (key, value) in object {
				match key.as_str() {
					"limit" => pick.limit = value.as_u64().map(|limit| limit as usize),
					_ => {
						pick.filters.insert(key.clone(), value.clone());
					}
				}
			}
		}
		if field.relation().multiplicity() == Some(Multiplicity::One) && pick.limit.is_none() {
			pick.limit = Some(1);
		}
		Ok(pick)
	}

	/// Nested builder for a relation field. Many relations get `amount`
	/// children, or a random count up to the configured maximum.
	fn relation_builder(&self, field: &Field, amount: Option<usize>) -> FactoryResult<FactoryBuilder> {
		let builder = self.factory.of(&self.relation_target(field)?);
		match field.relation() {
			RelationKind::Child(Multiplicity::Many) => {
				let count = match amount {
					Some(amount) => amount,
					None => {
						let max = self.factory.config().max_state_amount as i64;
						self.factory.generator().number_between(0, max).max(0) as usize
					}
				};
				Ok(builder.count(count))
			}
			_ => Ok(builder),
		}
	}

	fn relation_target(&self, field: &Field) -> FactoryResult<String> {
		let missing = || {
			FactoryError::Schema(SchemaError::MissingTarget {
				model: self.schema.model().to_string(),
				field: field.name().to_string(),
			})
		};
		match field.relation() {
			RelationKind::Polymorphic => {
				let targets = field.morph_targets();
				if targets.is_empty() {
					return Err(missing());
				}
				let last = targets.len() as i64 - 1;
				let index = self.factory.generator().number_between(0, last).clamp(0, last) as usize;
				targets.get(index).cloned().ok_or_else(missing)
			}
			_ => field.target().map(str::to_string).ok_or_else(missing),
		}
	}

	/// Expands deferred values in insertion order against the in-progress set.
	fn expand(&self, attributes: &mut AttributeMap) -> FactoryResult<()> {
		let model = self.schema.model();
		let keys: Vec<String> = attributes.keys().cloned().collect();
		for key in keys {
			let mut depth = 0;
			while let Some(Attribute::Deferred(deferred)) = attributes.get(&key) {
				if depth == MAX_DEFERRED_DEPTH {
					return Err(FactoryError::Config(format!(
						"deferred attribute `{model}.{key}` did not settle"
					)));
				}
				let deferred = deferred.clone();
				let value = {
					let context = ResolutionContext::new(
						model,
						attributes,
						self.factory.generator(),
						self.factory,
					);
					deferred.call(&context)?
				};
				attributes.set(key.clone(), value);
				depth += 1;
			}
		}
		Ok(())
	}
}

fn string_list(value: Option<&Value>) -> Vec<String> {
	match value {
		Some(Value::String(name)) => vec![name.clone()],
		Some(Value::Array(names)) => names
			.iter()
			.filter_map(Value::as_str)
			.map(str::to_string)
			.collect(),
		_ => Vec::new(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::persistence::InMemoryStore;
	use fixtura_schema::{GeneratorSpec, SchemaRegistry};
	use rstest::rstest;
	use serde_json::json;

	fn factory() -> Factory {
		let schemas = SchemaRegistry::with_schemas([
			Schema::new(
				"User",
				vec![
					Field::new("name").generator("name"),
					Field::new("role").default_value("member"),
					Field::new("nickname"),
					Field::composite(
						"address",
						vec![
							Field::new("street").generator("word"),
							Field::new("city").generator("word"),
						],
					),
					Field::has_many("posts", "Post"),
				],
			)
			.unwrap(),
			Schema::new(
				"Post",
				vec![
					Field::new("title").generator("sentence"),
					Field::parent("author", "User").required(),
					Field::parent("editor", "User"),
					Field::has_many("tags", "Tag")
						.generator_spec_with(
							GeneratorSpec::new("randomRelation")
								.with_params(vec![json!({"limit": 2, "kind": "topic"})]),
						)
						.required(),
				],
			)
			.unwrap(),
			Schema::new("Tag", vec![Field::new("kind")]).unwrap(),
		]);
		Factory::new(Arc::new(schemas), Arc::new(InMemoryStore::new()))
	}

	fn resolve(factory: &Factory, model: &str, states: &[StateRequest]) -> FactoryResult<AttributeMap> {
		let overrides = AttributeMap::new();
		let request = ResolveRequest {
			definition: "default",
			overrides: &overrides,
			states,
			only: None,
			except: &[],
		};
		AttributeResolver::new(factory, factory.schema(model)?).resolve(&request)
	}

	#[rstest]
	fn test_generates_missing_fields() {
		let factory = factory();
		let attributes = resolve(&factory, "User", &[]).unwrap();

		assert!(attributes.value("name").is_some_and(Value::is_string));
		assert_eq!(attributes.value("role"), Some(&json!("member")));
		assert!(!attributes.has("nickname"));
		assert!(!attributes.has("posts"));
		let address = attributes.value("address").unwrap();
		assert!(address.get("street").is_some());
		assert!(address.get("city").is_some());
	}

	#[rstest]
	fn test_required_parent_becomes_builder() {
		let factory = factory();
		let attributes = resolve(&factory, "Post", &[]).unwrap();

		let author = attributes.get("author").and_then(Attribute::as_builder);
		assert_eq!(author.map(FactoryBuilder::model), Some("User"));
		assert!(!attributes.has("editor"));
	}

	#[rstest]
	fn test_random_relation_becomes_pick() {
		let factory = factory();
		let attributes = resolve(&factory, "Post", &[]).unwrap();

		match attributes.get("tags") {
			Some(Attribute::Pick(pick)) => {
				assert_eq!(pick.model, "Tag");
				assert_eq!(pick.limit, Some(2));
				assert_eq!(pick.filters.get("kind"), Some(&json!("topic")));
			}
			other => panic!("expected a pick, got {other:?}"),
		}
	}

	#[rstest]
	fn test_foreign_key_suppresses_parent_builder() {
		let factory = factory();
		let overrides = AttributeMap::from_json(json!({"author_id": 9}));
		let request = ResolveRequest {
			definition: "default",
			overrides: &overrides,
			states: &[],
			only: None,
			except: &[],
		};
		let attributes = AttributeResolver::new(&factory, factory.schema("Post").unwrap())
			.resolve(&request)
			.unwrap();
		assert!(!attributes.has("author"));
		assert_eq!(attributes.value("author_id"), Some(&json!(9)));
	}

	#[rstest]
	#[case("posts:3", Some(3))]
	#[case("posts:0", Some(0))]
	fn test_state_falls_back_to_relation(#[case] state: &str, #[case] count: Option<usize>) {
		let factory = factory();
		let attributes = resolve(&factory, "User", &[StateRequest::Named(state.to_string())]).unwrap();
		let builder = attributes.get("posts").and_then(Attribute::as_builder).unwrap();
		assert_eq!(builder.model(), "Post");
		assert_eq!(builder.requested_count(), count);
	}

	#[rstest]
	fn test_state_relation_random_count_is_bounded() {
		let factory = factory();
		for _ in 0..20 {
			let attributes = resolve(&factory, "User", &[StateRequest::Named("posts".to_string())]).unwrap();
			let count = attributes
				.get("posts")
				.and_then(Attribute::as_builder)
				.and_then(FactoryBuilder::requested_count)
				.unwrap();
			assert!(count <= 5);
		}
	}

	#[rstest]
	#[case("missing")]
	#[case("posts:many")]
	fn test_unknown_state(#[case] state: &str) {
		let factory = factory();
		let result = resolve(&factory, "User", &[StateRequest::Named(state.to_string())]);
		assert!(matches!(result, Err(FactoryError::UnknownState { state: ref s, .. }) if s == state));
	}

	#[rstest]
	fn test_unknown_definition() {
		let factory = factory();
		let overrides = AttributeMap::new();
		let request = ResolveRequest {
			definition: "premium",
			overrides: &overrides,
			states: &[],
			only: None,
			except: &[],
		};
		let result = AttributeResolver::new(&factory, factory.schema("User").unwrap()).resolve(&request);
		assert!(matches!(result, Err(FactoryError::UnknownDefinition { .. })));
	}

	#[rstest]
	fn test_partial_composite_is_completed() {
		let factory = factory();
		let overrides = AttributeMap::from_json(json!({"city": "Oslo"}));
		let request = ResolveRequest {
			definition: "default",
			overrides: &overrides,
			states: &[],
			only: None,
			except: &[],
		};
		let attributes = AttributeResolver::new(&factory, factory.schema("User").unwrap())
			.resolve(&request)
			.unwrap();
		assert!(!attributes.has("address"));
		assert_eq!(attributes.value("city"), Some(&json!("Oslo")));
		assert!(attributes.value("street").is_some());
	}

	#[rstest]
	fn test_deferred_sees_earlier_attributes() {
		let factory = factory();
		factory
			.define("User", "default", |ctx| {
				ctx.set("name", "Ada Lovelace");
				ctx.set(
					"nickname",
					Attribute::computed(|ctx| {
						let name = ctx.value("name").and_then(Value::as_str).unwrap_or_default();
						json!(name.split(' ').next().unwrap_or_default().to_lowercase())
					}),
				);
				Ok(())
			})
			.unwrap();
		let attributes = resolve(&factory, "User", &[]).unwrap();
		assert_eq!(attributes.value("nickname"), Some(&json!("ada")));
	}

	#[rstest]
	fn test_unsettled_deferred_fails() {
		fn forever() -> Attribute {
			Attribute::deferred(|_| Ok(forever()))
		}
		let factory = factory();
		let overrides: AttributeMap = [("nickname", forever())].into_iter().collect();
		let request = ResolveRequest {
			definition: "default",
			overrides: &overrides,
			states: &[],
			only: None,
			except: &[],
		};
		let result = AttributeResolver::new(&factory, factory.schema("User").unwrap()).resolve(&request);
		assert!(matches!(result, Err(FactoryError::Config(_))));
	}
}
