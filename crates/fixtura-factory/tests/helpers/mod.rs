//! Shared fixtures for the integration tests: a small blog schema backed by
//! an in-memory store.

#![allow(dead_code)]

use std::sync::Arc;

use fixtura_factory::{Factory, FactoryConfig, InMemoryStore};
use fixtura_schema::{Field, GeneratorSpec, Schema, SchemaRegistry};
use rstest::fixture;
use serde_json::json;

/// Factory and the store behind it.
pub struct Blog {
	pub factory: Factory,
	pub store: Arc<InMemoryStore>,
}

/// User, Profile, Post, Comment, Image, Tag and Pin.
pub fn blog_schemas() -> SchemaRegistry {
	SchemaRegistry::with_schemas([
		Schema::new(
			"User",
			vec![
				Field::new("name").generator("name"),
				Field::new("email").generator("safeEmail").unique(),
				Field::new("role").default_value("member"),
				Field::new("nickname").nullable(),
				Field::has_many("posts", "Post").inverse("author"),
				Field::has_one("profile", "Profile"),
			],
		)
		.unwrap(),
		Schema::new(
			"Profile",
			vec![
				Field::new("bio").generator("sentence"),
				Field::composite(
					"address",
					vec![
						Field::new("street").generator("word"),
						Field::new("city").generator("word"),
					],
				),
				Field::parent("user", "User").required(),
			],
		)
		.unwrap(),
		Schema::new(
			"Post",
			vec![
				Field::new("title").generator("sentence"),
				Field::new("body").generator("paragraph"),
				Field::new("views").generator_with("numberBetween", vec![json!(0), json!(1000)]),
				Field::parent("author", "User").required(),
				Field::parent("editor", "User"),
				Field::has_many("comments", "Comment"),
				Field::has_many("tags", "Tag"),
			],
		)
		.unwrap(),
		Schema::new(
			"Comment",
			vec![
				Field::new("body").generator("sentence"),
				Field::parent("post", "Post").required(),
			],
		)
		.unwrap(),
		Schema::new(
			"Image",
			vec![
				Field::new("url").generator("url"),
				Field::morph_to("imageable", ["User", "Post"]).required(),
			],
		)
		.unwrap(),
		Schema::new(
			"Tag",
			vec![
				Field::new("label").generator("word"),
				Field::has_many("posts", "Post"),
			],
		)
		.unwrap(),
		Schema::new(
			"Pin",
			vec![
				Field::new("note").generator("word"),
				Field::parent("post", "Post")
					.required()
					.generator_spec_with(GeneratorSpec::new("randomRelation")),
			],
		)
		.unwrap(),
	])
}

/// Builds the blog with the given configuration.
pub fn blog_with(config: FactoryConfig) -> Blog {
	let store = Arc::new(InMemoryStore::new());
	let factory = Factory::with_config(Arc::new(blog_schemas()), store.clone(), config);
	Blog { factory, store }
}

#[fixture]
pub fn blog() -> Blog {
	blog_with(FactoryConfig::default())
}
