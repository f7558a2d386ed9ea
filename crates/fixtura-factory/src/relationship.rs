//! Relationship lookup on schemas.
//!
//! Resolves which relation field a `for`/`has` request targets, validates
//! that the request uses the path matching the field's multiplicity, and
//! finds the inverse field a child record uses to point back at its owner.

use fixtura_schema::{Field, Multiplicity, RelationKind, Schema};
use heck::ToSnakeCase;

use crate::error::{FactoryError, FactoryResult, RelationPath};

/// Finds the relation field for a `for`/`has` request and checks its path.
///
/// With an explicit `relationship` name the field must exist and be a
/// relation. Without one, the relation fields of `schema` pointing at
/// `related_model` are considered; fields compatible with `path` are
/// preferred, then a field named after the related model (singular for the
/// parent path, plural or singular for the child path).
///
/// # Arguments
///
/// * `schema` - Schema of the record the request is made on
/// * `related_model` - Model kind of the related builder or records, if known
/// * `relationship` - Explicit relation field name
/// * `path` - Whether the request came through `for` or `has`
///
/// # Returns
///
/// Returns the relation field of `schema` the request targets.
///
/// # Errors
///
/// - [`FactoryError::UnknownRelationship`] when nothing matches
/// - [`FactoryError::AmbiguousRelationship`] when several fields match
/// - [`FactoryError::RelationshipMultiplicityMismatch`] when the field does
///   not accept `path`
pub fn resolve_relationship<'s>(
	schema: &'s Schema,
	related_model: Option<&str>,
	relationship: Option<&str>,
	path: RelationPath,
) -> FactoryResult<&'s Field> {
	let field = match relationship {
		Some(name) => schema
			.relation(name)
			.ok_or_else(|| unknown(schema, name))?,
		None => {
			let target = related_model.ok_or_else(|| unknown(schema, "<unnamed>"))?;
			infer(schema, target, path)?
		}
	};

	if !accepts(field.relation(), path) {
		return Err(FactoryError::RelationshipMultiplicityMismatch {
			model: schema.model().to_string(),
			relationship: field.name().to_string(),
			path,
		});
	}
	Ok(field)
}

/// Finds the field on `target` that points back at the owner of `field`.
///
/// An explicitly declared inverse wins. Otherwise parent-path relations of
/// the target aimed at the owner kind are preferred over many-to-many
/// style child relations.
pub fn find_inverse<'s>(
	owner: &Schema,
	field: &Field,
	target: &'s Schema,
) -> FactoryResult<&'s Field> {
	let missing = || FactoryError::MissingInverse {
		model: owner.model().to_string(),
		relationship: field.name().to_string(),
		target: target.model().to_string(),
	};

	if let Some(name) = field.inverse_name() {
		return target.relation(name).ok_or_else(missing);
	}

	let candidates = target.relations_targeting(owner.model());
	let parents: Vec<&Field> = candidates
		.iter()
		.copied()
		.filter(|candidate| candidate.relation().uses_parent_path())
		.collect();
	let pool = if parents.is_empty() {
		candidates
			.into_iter()
			.filter(|candidate| candidate.relation() == RelationKind::Child(Multiplicity::Many))
			.collect()
	} else {
		parents
	};

	let preferred = [owner.model().to_snake_case(), pluralize(&owner.model().to_snake_case())];
	pick(target, owner.model(), pool, &preferred)?.ok_or_else(missing)
}

/// Returns true if a relation of `kind` may be requested through `path`.
pub fn accepts(kind: RelationKind, path: RelationPath) -> bool {
	match path {
		RelationPath::Parent => kind.uses_parent_path(),
		RelationPath::Child => kind.uses_child_path(),
	}
}

fn infer<'s>(schema: &'s Schema, target: &str, path: RelationPath) -> FactoryResult<&'s Field> {
	let candidates = schema.relations_targeting(target);
	let compatible: Vec<&Field> = candidates
		.iter()
		.copied()
		.filter(|candidate| accepts(candidate.relation(), path))
		.collect();
	let pool = if compatible.is_empty() { candidates } else { compatible };

	let singular = target.to_snake_case();
	let preferred = match path {
		RelationPath::Parent => vec![singular],
		RelationPath::Child => vec![pluralize(&singular), singular],
	};

	pick(schema, target, pool, &preferred)?.ok_or_else(|| unknown(schema, target))
}

fn pick<'s>(
	schema: &Schema,
	target: &str,
	pool: Vec<&'s Field>,
	preferred: &[String],
) -> FactoryResult<Option<&'s Field>> {
	match pool.len() {
		0 => Ok(None),
		1 => Ok(pool.first().copied()),
		_ => {
			let named: Vec<&Field> = pool
				.iter()
				.copied()
				.filter(|candidate| preferred.iter().any(|name| name == candidate.name()))
				.collect();
			if named.len() == 1 {
				return Ok(named.first().copied());
			}
			Err(FactoryError::AmbiguousRelationship {
				model: schema.model().to_string(),
				target: target.to_string(),
				candidates: pool.iter().map(|field| field.name().to_string()).collect(),
			})
		}
	}
}

fn unknown(schema: &Schema, relationship: &str) -> FactoryError {
	FactoryError::UnknownRelationship {
		model: schema.model().to_string(),
		relationship: relationship.to_string(),
	}
}

/// English plural of a snake_case word, good enough for relation names.
pub(crate) fn pluralize(word: &str) -> String {
	if let Some(stem) = word.strip_suffix('y')
		&& !stem.ends_with(['a', 'e', 'i', 'o', 'u'])
	{
		return format!("{stem}ies");
	}
	if word.ends_with(['s', 'x', 'z']) || word.ends_with("ch") || word.ends_with("sh") {
		return format!("{word}es");
	}
	format!("{word}s")
}
