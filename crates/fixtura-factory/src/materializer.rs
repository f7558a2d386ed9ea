//! Relation materialization.
//!
//! Turns a resolved attribute set into a record. Parent placeholders are
//! realized first and their identities written into foreign-key columns;
//! the record is then constructed and, in [`Mode::Create`], persisted;
//! finally child placeholders are created with their inverse field pointing
//! at the new record and wired through the persistence collaborator, once
//! per child relation.

use fixtura_schema::{Field, Multiplicity, RelationKind, Schema};
use indexmap::IndexMap;
use serde_json::Value;

use crate::attribute::{Attribute, AttributeMap};
use crate::config::ParentPolicy;
use crate::error::{FactoryError, FactoryResult};
use crate::factory::Factory;
use crate::instance::{Instance, Related};
use crate::registry::{AfterCallback, StateRegistry};
use crate::relationship::find_inverse;

/// Terminal mode of a materialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
	/// Construct in memory only.
	Make,
	/// Construct, persist and wire children.
	Create,
}

#[derive(Default)]
struct Partition {
	values: IndexMap<String, Value>,
	parents: Vec<(String, Attribute)>,
	children: Vec<(String, Attribute)>,
}

/// Materializes the relations of one record.
pub struct RelationMaterializer<'a> {
	factory: &'a Factory,
	schema: &'a Schema,
}

impl<'a> RelationMaterializer<'a> {
	/// Creates a materializer for records of `schema`.
	pub fn new(factory: &'a Factory, schema: &'a Schema) -> Self {
		Self { factory, schema }
	}

	/// Builds the record described by `resolved`.
	///
	/// `states` names the requested states, used to select after-callbacks.
	pub async fn materialize(
		&self,
		resolved: AttributeMap,
		mode: Mode,
		states: &[&str],
	) -> FactoryResult<Instance> {
		let model = self.schema.model();
		let Partition {
			values,
			parents,
			children,
		} = self.partition(resolved)?;

		let mut instance = Instance::new(model, values);
		for (name, attribute) in parents {
			self.materialize_parent(&mut instance, &name, attribute, mode)
				.await?;
		}
		self.run_after(&instance, |registry| registry.after_making(model, states))?;

		if mode == Mode::Make {
			for (name, _) in &children {
				tracing::debug!(model, relation = name.as_str(), "make skips child relation");
			}
			return Ok(instance);
		}

		let identity = self
			.factory
			.persistence()
			.persist(model, instance.attributes())
			.await?;
		tracing::debug!(model, identity = %identity, "persisted record");
		instance.set_identity(identity);

		for (name, attribute) in children {
			self.materialize_children(&mut instance, &name, attribute)
				.await?;
		}
		self.run_after(&instance, |registry| registry.after_creating(model, states))?;
		Ok(instance)
	}

	/// Splits a resolved set into plain values, parent-path placeholders and
	/// child-path placeholders.
	fn partition(&self, resolved: AttributeMap) -> FactoryResult<Partition> {
		let mut partition = Partition::default();
		for (name, attribute) in resolved {
			let kind = self
				.schema
				.field(&name)
				.map_or(RelationKind::None, Field::relation);
			match (kind, attribute) {
				(_, Attribute::Deferred(_)) => {
					return Err(FactoryError::Config(format!(
						"attribute `{}.{name}` was not expanded",
						self.schema.model()
					)));
				}
				(RelationKind::Child(_), Attribute::Value(Value::Null)) => {}
				(RelationKind::Child(_), Attribute::Value(_)) => {
					return Err(FactoryError::InvalidRelationValue {
						model: self.schema.model().to_string(),
						field: name,
					});
				}
				(RelationKind::Child(_), attribute) => partition.children.push((name, attribute)),
				(RelationKind::None, Attribute::Value(value)) => {
					partition.values.insert(name, value);
				}
				(_, attribute) => partition.parents.push((name, attribute)),
			}
		}
		Ok(partition)
	}

	async fn materialize_parent(
		&self,
		instance: &mut Instance,
		name: &str,
		attribute: Attribute,
		mode: Mode,
	) -> FactoryResult<()> {
		let field = self.schema.field(name).filter(|field| field.is_relation());
		let column = field.map_or_else(|| name.to_string(), Field::foreign_key_column);

		let parent = match attribute {
			Attribute::Value(value) => {
				instance.set_attribute(column, value);
				return Ok(());
			}
			Attribute::Builder(builder) => {
				let parent_mode = match (mode, self.factory.config().parent_policy) {
					(Mode::Make, ParentPolicy::FollowMode) => Mode::Make,
					_ => Mode::Create,
				};
				tracing::debug!(
					model = self.schema.model(),
					relation = name,
					parent = builder.model(),
					?parent_mode,
					"materializing parent"
				);
				let builder = builder.single();
				let overrides = AttributeMap::new();
				Some(builder.build(&overrides, parent_mode).await?)
			}
			Attribute::Related(related) => related.into_vec().into_iter().next(),
			Attribute::Pick(pick) => self
				.factory
				.persistence()
				.sample(&pick.model, &pick.filters, Some(1))
				.await?
				.into_iter()
				.next(),
			Attribute::Deferred(_) => None,
		};

		let Some(parent) = parent else {
			instance.set_attribute(column, Value::Null);
			return Ok(());
		};
		instance.set_attribute(column, parent.identity().cloned().unwrap_or(Value::Null));
		if let Some(field) = field
			&& field.relation() == RelationKind::Polymorphic
		{
			instance.set_attribute(field.morph_type_column(), Value::from(parent.model()));
		}
		instance.set_relation(name, Related::One(Box::new(parent)));
		Ok(())
	}

	async fn materialize_children(
		&self,
		owner: &mut Instance,
		name: &str,
		attribute: Attribute,
	) -> FactoryResult<()> {
		let model = self.schema.model();
		let Some(field) = self.schema.relation(name) else {
			return Ok(());
		};
		let multiplicity = field.relation().multiplicity().unwrap_or(Multiplicity::Many);
		let target_model = attribute
			.related_model()
			.or_else(|| field.target())
			.map(str::to_string)
			.unwrap_or_default();
		let target = self.factory.schema(&target_model)?;
		let inverse = find_inverse(self.schema, field, &target)?;
		let inverse_multiplicity = inverse.relation().multiplicity().unwrap_or(Multiplicity::One);
		// A parent-path inverse is written by each child's own parent pass. A
		// child-path inverse (many-to-many) is only wired below, once.
		let inverse_is_parent = inverse.relation().uses_parent_path();

		let mut children = match attribute {
			Attribute::Builder(builder) => {
				let mut builder = match multiplicity {
					Multiplicity::One => builder.single(),
					Multiplicity::Many => *builder,
				};
				if inverse_is_parent {
					let patch: AttributeMap =
						[(inverse.name(), Related::One(Box::new(owner.detached())))]
							.into_iter()
							.collect();
					builder = builder.state_patch(patch);
				}
				tracing::debug!(
					model,
					relation = name,
					child = builder.model(),
					count = builder.requested_count(),
					"materializing children"
				);
				let overrides = AttributeMap::new();
				builder.produce(&overrides, Mode::Create).await?.into_vec()
			}
			Attribute::Related(related) => related.into_vec(),
			Attribute::Pick(pick) => {
				self.factory
					.persistence()
					.sample(&pick.model, &pick.filters, pick.limit)
					.await?
			}
			Attribute::Value(_) | Attribute::Deferred(_) => return Ok(()),
		};

		if let Some(identity) = owner.identity().cloned() {
			self.factory
				.persistence()
				.set_inverse_relation(&identity, &children, inverse.name(), inverse_multiplicity)
				.await?;
		}
		if !inverse_is_parent {
			for child in &mut children {
				child.set_relation(inverse.name(), Related::Many(vec![owner.detached()]));
			}
		}

		let related = match multiplicity {
			Multiplicity::One => children.into_iter().next().map(|child| Related::One(Box::new(child))),
			Multiplicity::Many => Some(Related::Many(children)),
		};
		if let Some(related) = related {
			owner.set_relation(name, related);
		}
		Ok(())
	}

	fn run_after(
		&self,
		instance: &Instance,
		select: impl FnOnce(&StateRegistry) -> Vec<AfterCallback>,
	) -> FactoryResult<()> {
		for callback in self.factory.with_registry(select) {
			callback(instance)?;
		}
		Ok(())
	}
}
