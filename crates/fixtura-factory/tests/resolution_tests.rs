//! Integration tests for attribute resolution
//!
//! Covers the order in which definitions, overrides and states combine, the
//! generation of missing fields, and `raw` output for counted builders.

mod helpers;

use std::collections::HashSet;
use std::sync::Arc;

use fixtura_factory::prelude::*;
use fixtura_schema::{Field, Schema, SchemaRegistry};
use helpers::{Blog, blog};
use proptest::prelude::*;
use rstest::*;
use serde_json::{Value, json};

fn single(builder: &FactoryBuilder) -> AttributeMap {
	builder
		.raw(AttributeMap::new())
		.unwrap()
		.into_single()
		.unwrap()
}

// ============================================================================
// Missing field generation
// ============================================================================

#[rstest]
fn test_raw_fills_required_fields_and_skips_optional_relations(blog: Blog) {
	let user = single(&blog.factory.of("User"));

	assert!(user.value("name").is_some_and(Value::is_string));
	assert!(user.value("email").is_some_and(Value::is_string));
	assert_eq!(user.value("role"), Some(&json!("member")));
	assert!(!user.has("nickname"));
	assert!(!user.has("posts"));
	assert!(!user.has("profile"));
}

#[rstest]
fn test_raw_leaves_required_parent_as_builder(blog: Blog) {
	let post = single(&blog.factory.of("Post"));

	let author = post.get("author").and_then(Attribute::as_builder).unwrap();
	assert_eq!(author.model(), "User");
	assert!(!post.has("editor"));
	assert!(!post.has("comments"));
	assert_eq!(blog.store.total(), 0);
}

#[rstest]
fn test_composite_generated_as_object(blog: Blog) {
	let profile = single(&blog.factory.of("Profile"));

	let address = profile.value("address").unwrap();
	assert!(address.get("street").is_some_and(Value::is_string));
	assert!(address.get("city").is_some_and(Value::is_string));
}

#[rstest]
fn test_partial_composite_completes_components(blog: Blog) {
	let profile = single(&blog.factory.of("Profile").set("city", "Kyoto"));

	assert!(!profile.has("address"));
	assert_eq!(profile.value("city"), Some(&json!("Kyoto")));
	assert!(profile.value("street").is_some());
}

#[rstest]
fn test_polymorphic_parent_targets_declared_kind(blog: Blog) {
	for _ in 0..10 {
		let image = single(&blog.factory.of("Image"));
		let model = image.get("imageable").and_then(Attribute::related_model).unwrap();
		assert!(model == "User" || model == "Post");
	}
}

// ============================================================================
// Precedence
// ============================================================================

#[rstest]
fn test_override_beats_state_and_definition(blog: Blog) {
	blog.factory
		.define("User", "default", |ctx| {
			ctx.set("role", "guest");
			Ok(())
		})
		.unwrap();
	blog.factory
		.state("User", "admin", AttributeMap::from_json(json!({"role": "admin", "is_admin": true})))
		.unwrap();

	let from_definition = single(&blog.factory.of("User"));
	assert_eq!(from_definition.value("role"), Some(&json!("guest")));

	let from_state = single(&blog.factory.of("User").state("admin"));
	assert_eq!(from_state.value("role"), Some(&json!("admin")));

	let overridden = blog
		.factory
		.of("User")
		.state("admin")
		.raw(AttributeMap::from_json(json!({"role": "owner"})))
		.unwrap()
		.into_single()
		.unwrap();
	assert_eq!(overridden.value("role"), Some(&json!("owner")));
	assert_eq!(overridden.value("is_admin"), Some(&json!(true)));
}

#[rstest]
fn test_callback_state_cannot_clobber_override(blog: Blog) {
	blog.factory
		.state_with("User", "renamed", |ctx| {
			ctx.set("name", "From State");
			Ok(())
		})
		.unwrap();

	let user = single(&blog.factory.of("User").set("name", "Fixed").state("renamed"));
	assert_eq!(user.value("name"), Some(&json!("Fixed")));
}

#[rstest]
fn test_later_state_wins(blog: Blog) {
	blog.factory
		.state("User", "admin", AttributeMap::from_json(json!({"role": "admin"})))
		.unwrap();
	blog.factory
		.state("User", "editor", AttributeMap::from_json(json!({"role": "editor"})))
		.unwrap();

	let user = single(&blog.factory.of("User").states(["admin", "editor"]));
	assert_eq!(user.value("role"), Some(&json!("editor")));
}

#[rstest]
fn test_state_callback_sees_previous_attributes(blog: Blog) {
	blog.factory
		.state_with("User", "shout", |ctx| {
			let name = ctx.value("name").and_then(Value::as_str).unwrap_or_default().to_uppercase();
			ctx.set("nickname", name);
			Ok(())
		})
		.unwrap();

	let user = single(&blog.factory.of("User").set("name", "ada").state("shout"));
	assert_eq!(user.value("nickname"), Some(&json!("ADA")));
}

#[rstest]
fn test_inline_state_patch(blog: Blog) {
	let user = single(
		&blog
			.factory
			.of("User")
			.state_patch(AttributeMap::from_json(json!({"role": "inline"}))),
	);
	assert_eq!(user.value("role"), Some(&json!("inline")));
}

#[rstest]
fn test_named_definition(blog: Blog) {
	blog.factory
		.define("User", "robot", |ctx| {
			let serial = ctx.fake("numberBetween", &[json!(100), json!(999)])?;
			ctx.set("name", format!("robot-{serial}"));
			Ok(())
		})
		.unwrap();

	let user = single(&blog.factory.of_named("User", "robot"));
	let name = user.value("name").and_then(Value::as_str).unwrap();
	assert!(name.starts_with("robot-"));
}

#[rstest]
fn test_deferred_value_sees_sibling_attributes(blog: Blog) {
	let slug = Attribute::computed(|ctx| {
		let title = ctx.value("title").and_then(Value::as_str).unwrap_or_default();
		json!(title.to_lowercase().replace(' ', "-"))
	});
	let post = single(&blog.factory.of("Post").set("title", "Hello World").set("slug", slug));

	assert_eq!(post.value("slug"), Some(&json!("hello-world")));
}

#[rstest]
fn test_deferred_value_may_return_builder(blog: Blog) {
	let editor = Attribute::deferred(|ctx| Ok(ctx.builder("User").set("role", "editor").into()));
	let post = single(&blog.factory.of("Post").set("editor", editor));

	let builder = post.get("editor").and_then(Attribute::as_builder).unwrap();
	assert_eq!(builder.model(), "User");
}

// ============================================================================
// Failures
// ============================================================================

#[rstest]
fn test_unknown_state_is_not_ignored(blog: Blog) {
	let result = blog.factory.of("User").state("ghost").raw(AttributeMap::new());
	assert!(matches!(
		result,
		Err(FactoryError::UnknownState { ref model, ref state }) if model == "User" && state == "ghost"
	));
}

#[rstest]
fn test_unknown_definition(blog: Blog) {
	let result = blog.factory.of_named("User", "premium").raw(AttributeMap::new());
	assert!(matches!(result, Err(FactoryError::UnknownDefinition { ref definition, .. }) if definition == "premium"));
}

#[rstest]
fn test_state_with_only_after_callbacks_is_valid(blog: Blog) {
	blog.factory
		.after_creating("User", "notified", |_| Ok(()))
		.unwrap();

	let user = single(&blog.factory.of("User").state("notified"));
	assert!(user.has("name"));
}

#[rstest]
fn test_generator_failure_aborts_raw() {
	let schemas = SchemaRegistry::with_schemas([Schema::new(
		"Widget",
		vec![Field::new("code").generator("hologram")],
	)
	.unwrap()]);
	let factory = Factory::new(Arc::new(schemas), Arc::new(InMemoryStore::new()));

	let result = factory.of("Widget").raw(AttributeMap::new());
	assert!(matches!(result, Err(FactoryError::UnknownGenerator(ref kind)) if kind == "hologram"));
}

// ============================================================================
// Counts and uniqueness
// ============================================================================

#[rstest]
fn test_count_returns_independent_maps(blog: Blog) {
	let users = blog.factory.of("User").count(5).raw(AttributeMap::new()).unwrap();
	assert_eq!(users.len(), 5);

	let names: HashSet<_> = users
		.iter()
		.filter_map(|user| user.value("email").cloned())
		.map(|email| email.to_string())
		.collect();
	assert_eq!(names.len(), 5);
}

#[rstest]
fn test_builder_template_reuse(blog: Blog) {
	let template = blog.factory.of("User").set("role", "template");
	let admin = template.set("role", "admin");

	assert_eq!(single(&template).value("role"), Some(&json!("template")));
	assert_eq!(single(&admin).value("role"), Some(&json!("admin")));
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(16))]

	/// Unique fields never repeat within one counted call.
	#[test]
	fn prop_unique_values_distinct(count in 1usize..40) {
		let blog = helpers::blog_with(FactoryConfig::default());
		let users = blog.factory.of("User").count(count).raw(AttributeMap::new()).unwrap();

		let emails: HashSet<String> = users
			.iter()
			.filter_map(|user| user.value("email").and_then(Value::as_str).map(str::to_string))
			.collect();
		prop_assert_eq!(users.len(), count);
		prop_assert_eq!(emails.len(), count);
	}

	/// Every required, generator-backed plain field is present; optional
	/// relations never are.
	#[test]
	fn prop_raw_covers_required_fields(
		plain in prop::collection::vec(any::<bool>(), 1..8),
		optional_relations in 0usize..4,
	) {
		let mut fields: Vec<Field> = plain
			.iter()
			.enumerate()
			.map(|(index, has_generator)| {
				let field = Field::new(format!("field_{index}"));
				if *has_generator { field.generator("word") } else { field }
			})
			.collect();
		fields.extend((0..optional_relations).map(|index| Field::parent(format!("parent_{index}"), "Other")));
		let schemas = SchemaRegistry::with_schemas([
			Schema::new("Thing", fields).unwrap(),
			Schema::new("Other", vec![Field::new("label").generator("word")]).unwrap(),
		]);
		let factory = Factory::new(Arc::new(schemas), Arc::new(InMemoryStore::new()));

		let attributes = factory.of("Thing").raw(AttributeMap::new()).unwrap().into_single().unwrap();
		for (index, has_generator) in plain.iter().enumerate() {
			prop_assert_eq!(attributes.has(&format!("field_{index}")), *has_generator);
		}
		for index in 0..optional_relations {
			let name = format!("parent_{index}");
			prop_assert!(!attributes.has(&name));
		}
	}
}
