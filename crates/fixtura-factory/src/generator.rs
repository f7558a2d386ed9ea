//! Value generation.
//!
//! [`ValueGenerator`] is the capability the resolver uses to synthesize
//! attribute values. [`FakeGenerator`] implements it on top of the `fake`
//! crate, using Faker-style formatter names (`safeEmail`, `randomNumber`,
//! `sentence`, ...).

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use fake::Fake;
use fake::faker::boolean::en::Boolean;
use fake::faker::internet::en::{DomainSuffix, FreeEmail, SafeEmail, Username};
use fake::faker::lorem::en::{Paragraph, Sentence, Word, Words};
use fake::faker::name::en::{FirstName, LastName, Name};
use heck::ToLowerCamelCase;
use parking_lot::Mutex;
use rand::Rng;
use serde_json::{Map, Value, json};

use crate::config::FactoryConfig;
use crate::error::{FactoryError, FactoryResult};

/// Capability used by the resolver to synthesize attribute values.
pub trait ValueGenerator: Send + Sync {
	/// Generates a value of the given kind.
	fn generate(&self, kind: &str, params: &[Value]) -> FactoryResult<Value>;

	/// Generates a value never returned before for this kind.
	///
	/// Spellings of the same kind (`safeEmail`, `safe_email`) share one
	/// history.
	///
	/// # Errors
	///
	/// Returns [`FactoryError::ExhaustedUniqueSpace`] when no fresh value can
	/// be found.
	fn generate_unique(&self, kind: &str, params: &[Value]) -> FactoryResult<Value>;

	/// Returns an integer in `[low, high]`.
	fn number_between(&self, low: i64, high: i64) -> i64;
}

/// Supported generator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakerType {
	/// Integer, optionally bounded by a digit count.
	RandomNumber,
	/// Integer in `[low, high]`.
	NumberBetween,
	/// Float with `[decimals, min, max]`.
	RandomFloat,
	/// Boolean with `[chance_of_true]` percent.
	Boolean,
	/// Single lorem word.
	Word,
	/// List of `[count]` words.
	Words,
	/// Object mapping `[count]` words to words.
	WordsObject,
	/// Sentence of `[word_count]` words.
	Sentence,
	/// Text of at most `[max_chars]` characters.
	Text,
	/// Paragraph of `[sentence_count]` sentences.
	Paragraph,
	/// Full name.
	Name,
	/// First name.
	FirstName,
	/// Last name.
	LastName,
	/// Username.
	UserName,
	/// Free email address.
	Email,
	/// Email address on a reserved domain.
	SafeEmail,
	/// HTTPS URL.
	Url,
	/// UUID v4 string.
	Uuid,
	/// RFC 3339 timestamp.
	DateTime,
	/// Unix timestamp.
	UnixTime,
	/// Element of the `[list]` parameter.
	RandomElement,
	/// Configured password.
	Password,
	/// Counter rendered through a `[format]` containing `{n}`.
	Sequence,
}

impl FakerType {
	/// Parses a formatter name, accepting camelCase and snake_case.
	///
	/// # Example
	///
	/// ```
	/// use fixtura_factory::generator::FakerType;
	///
	/// assert_eq!(FakerType::from_name("safeEmail"), Some(FakerType::SafeEmail));
	/// assert_eq!(FakerType::from_name("safe_email"), Some(FakerType::SafeEmail));
	/// assert_eq!(FakerType::from_name("words_object"), Some(FakerType::WordsObject));
	/// assert_eq!(FakerType::from_name("teleport"), None);
	/// ```
	pub fn from_name(name: &str) -> Option<Self> {
		let kind = match name.to_lower_camel_case().as_str() {
			"randomNumber" => Self::RandomNumber,
			"numberBetween" => Self::NumberBetween,
			"randomFloat" => Self::RandomFloat,
			"boolean" => Self::Boolean,
			"word" => Self::Word,
			"words" => Self::Words,
			"wordsObject" => Self::WordsObject,
			"sentence" => Self::Sentence,
			"text" => Self::Text,
			"paragraph" => Self::Paragraph,
			"name" => Self::Name,
			"firstName" => Self::FirstName,
			"lastName" => Self::LastName,
			"userName" | "username" => Self::UserName,
			"email" | "freeEmail" => Self::Email,
			"safeEmail" => Self::SafeEmail,
			"url" => Self::Url,
			"uuid" => Self::Uuid,
			"dateTime" => Self::DateTime,
			"unixTime" => Self::UnixTime,
			"randomElement" => Self::RandomElement,
			"password" => Self::Password,
			"sequence" => Self::Sequence,
			_ => return None,
		};
		Some(kind)
	}
}

/// [`ValueGenerator`] backed by the `fake` crate.
///
/// The unique set and sequence counters are guarded by mutexes, so one
/// generator can be shared by concurrent builders without emitting a unique
/// value twice.
///
/// # Example
///
/// ```
/// use fixtura_factory::generator::{FakeGenerator, ValueGenerator};
/// use serde_json::json;
///
/// let generator = FakeGenerator::new();
/// let email = generator.generate("safeEmail", &[]).unwrap();
/// assert!(email.as_str().unwrap().contains('@'));
///
/// let n = generator.generate("numberBetween", &[json!(1), json!(3)]).unwrap();
/// assert!((1..=3).contains(&n.as_i64().unwrap()));
/// ```
#[derive(Debug)]
pub struct FakeGenerator {
	password: String,
	unique_attempts: usize,
	seen: Mutex<HashMap<FakerType, HashSet<String>>>,
	sequences: Mutex<HashMap<String, u64>>,
}

impl Default for FakeGenerator {
	fn default() -> Self {
		Self::from_config(&FactoryConfig::default())
	}
}

impl FakeGenerator {
	/// Creates a generator with the default configuration.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a generator using the configured password and attempt budget.
	pub fn from_config(config: &FactoryConfig) -> Self {
		Self {
			password: config.password.clone(),
			unique_attempts: config.unique_attempts.max(1),
			seen: Mutex::new(HashMap::new()),
			sequences: Mutex::new(HashMap::new()),
		}
	}

	/// Forgets every unique value handed out so far.
	pub fn reset_unique(&self) {
		self.seen.lock().clear();
	}

	fn next_sequence(&self, format: &str) -> u64 {
		let mut sequences = self.sequences.lock();
		let counter = sequences.entry(format.to_string()).or_insert(0);
		*counter += 1;
		*counter
	}

	fn generate_kind(&self, name: &str, kind: FakerType, params: &[Value]) -> FactoryResult<Value> {
		let mut rng = rand::thread_rng();
		let value = match kind {
			FakerType::RandomNumber => {
				let upper = match usize_param(name, params, 0)? {
					Some(digits) if (1..=18).contains(&digits) => 10_i64.pow(digits as u32) - 1,
					Some(digits) => {
						return Err(invalid(name, format!("digit count {digits} out of range")));
					}
					None => i64::from(i32::MAX),
				};
				json!(rng.gen_range(0..=upper))
			}
			FakerType::NumberBetween => {
				let low = i64_param(name, params, 0)?.unwrap_or(0);
				let high = i64_param(name, params, 1)?.unwrap_or(i64::from(i32::MAX));
				if low > high {
					return Err(invalid(name, format!("{low} is greater than {high}")));
				}
				json!(rng.gen_range(low..=high))
			}
			FakerType::RandomFloat => {
				let decimals = usize_param(name, params, 0)?.unwrap_or(2).min(10);
				let min = f64_param(name, params, 1)?.unwrap_or(0.0);
				let max = f64_param(name, params, 2)?.unwrap_or(min + 1_000.0);
				if min > max {
					return Err(invalid(name, format!("{min} is greater than {max}")));
				}
				let factor = 10_f64.powi(decimals as i32);
				let raw = if min == max { min } else { rng.gen_range(min..=max) };
				json!((raw * factor).round() / factor)
			}
			FakerType::Boolean => {
				let chance = usize_param(name, params, 0)?.unwrap_or(50).min(100);
				json!(Boolean(chance as u8).fake::<bool>())
			}
			FakerType::Word => json!(Word().fake::<String>()),
			FakerType::Words => {
				let count = usize_param(name, params, 0)?.unwrap_or(3);
				json!(Words(count..count + 1).fake::<Vec<String>>())
			}
			FakerType::WordsObject => {
				let count = usize_param(name, params, 0)?.unwrap_or(3);
				let object: Map<String, Value> = (0..count)
					.map(|_| (Word().fake::<String>(), json!(Word().fake::<String>())))
					.collect();
				Value::Object(object)
			}
			FakerType::Sentence => {
				let words = usize_param(name, params, 0)?.unwrap_or(6).max(1);
				json!(Sentence(words..words + 1).fake::<String>())
			}
			FakerType::Text => {
				let max_chars = usize_param(name, params, 0)?.unwrap_or(200).max(5);
				let text: String = Paragraph(1..4).fake();
				json!(text.chars().take(max_chars).collect::<String>())
			}
			FakerType::Paragraph => {
				let sentences = usize_param(name, params, 0)?.unwrap_or(3).max(1);
				json!(Paragraph(sentences..sentences + 1).fake::<String>())
			}
			FakerType::Name => json!(Name().fake::<String>()),
			FakerType::FirstName => json!(FirstName().fake::<String>()),
			FakerType::LastName => json!(LastName().fake::<String>()),
			FakerType::UserName => json!(Username().fake::<String>()),
			FakerType::Email => json!(FreeEmail().fake::<String>()),
			FakerType::SafeEmail => json!(SafeEmail().fake::<String>()),
			FakerType::Url => {
				let host: String = Word().fake();
				let suffix: String = DomainSuffix().fake();
				json!(format!("https://{}.{}/", host.to_lowercase(), suffix))
			}
			FakerType::Uuid => json!(uuid::Uuid::new_v4().to_string()),
			FakerType::DateTime => {
				let seconds = rng.gen_range(0..=Utc::now().timestamp());
				let timestamp = DateTime::<Utc>::from_timestamp(seconds, 0)
					.ok_or_else(|| invalid(name, format!("timestamp {seconds} out of range")))?;
				json!(timestamp.to_rfc3339())
			}
			FakerType::UnixTime => json!(rng.gen_range(0..=Utc::now().timestamp())),
			FakerType::RandomElement => {
				let choices = match params.first() {
					Some(Value::Array(choices)) if !choices.is_empty() => choices,
					_ => return Err(invalid(name, "expects a non-empty list".to_string())),
				};
				choices[rng.gen_range(0..choices.len())].clone()
			}
			FakerType::Password => match params.first() {
				Some(Value::String(password)) => json!(password),
				_ => json!(self.password),
			},
			FakerType::Sequence => {
				let format = match params.first() {
					Some(Value::String(format)) => format.as_str(),
					Some(_) => return Err(invalid(name, "format must be a string".to_string())),
					None => "{n}",
				};
				let n = self.next_sequence(format);
				if format == "{n}" {
					json!(n)
				} else {
					json!(format.replace("{n}", &n.to_string()))
				}
			}
		};
		Ok(value)
	}
}

impl ValueGenerator for FakeGenerator {
	fn generate(&self, kind: &str, params: &[Value]) -> FactoryResult<Value> {
		let faker = FakerType::from_name(kind)
			.ok_or_else(|| FactoryError::UnknownGenerator(kind.to_string()))?;
		self.generate_kind(kind, faker, params)
	}

	fn generate_unique(&self, kind: &str, params: &[Value]) -> FactoryResult<Value> {
		let faker = FakerType::from_name(kind)
			.ok_or_else(|| FactoryError::UnknownGenerator(kind.to_string()))?;

		for _ in 0..self.unique_attempts {
			let value = self.generate_kind(kind, faker, params)?;
			let key = value.to_string();
			if self
				.seen
				.lock()
				.entry(faker)
				.or_default()
				.insert(key)
			{
				return Ok(value);
			}
		}

		Err(FactoryError::ExhaustedUniqueSpace {
			kind: kind.to_string(),
			attempts: self.unique_attempts,
		})
	}

	fn number_between(&self, low: i64, high: i64) -> i64 {
		if low >= high {
			return low;
		}
		rand::thread_rng().gen_range(low..=high)
	}
}

fn invalid(kind: &str, message: String) -> FactoryError {
	FactoryError::InvalidGeneratorParams {
		kind: kind.to_string(),
		message,
	}
}

fn i64_param(kind: &str, params: &[Value], index: usize) -> FactoryResult<Option<i64>> {
	match params.get(index) {
		None | Some(Value::Null) => Ok(None),
		Some(value) => value
			.as_i64()
			.map(Some)
			.ok_or_else(|| invalid(kind, format!("parameter {index} must be an integer"))),
	}
}

fn usize_param(kind: &str, params: &[Value], index: usize) -> FactoryResult<Option<usize>> {
	match params.get(index) {
		None | Some(Value::Null) => Ok(None),
		Some(value) => value
			.as_u64()
			.map(|n| Some(n as usize))
			.ok_or_else(|| invalid(kind, format!("parameter {index} must be a positive integer"))),
	}
}

fn f64_param(kind: &str, params: &[Value], index: usize) -> FactoryResult<Option<f64>> {
	match params.get(index) {
		None | Some(Value::Null) => Ok(None),
		Some(value) => value
			.as_f64()
			.map(Some)
			.ok_or_else(|| invalid(kind, format!("parameter {index} must be a number"))),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("randomNumber")]
	#[case("random_number")]
	#[case("boolean")]
	#[case("word")]
	#[case("sentence")]
	#[case("text")]
	#[case("name")]
	#[case("userName")]
	#[case("email")]
	#[case("safeEmail")]
	#[case("url")]
	#[case("uuid")]
	#[case("dateTime")]
	#[case("unixTime")]
	fn test_generates_every_kind(#[case] kind: &str) {
		let generator = FakeGenerator::new();
		let value = generator.generate(kind, &[]).unwrap();
		assert!(!value.is_null());
	}

	#[rstest]
	fn test_unknown_kind() {
		let generator = FakeGenerator::new();
		let result = generator.generate("teleport", &[]);
		assert!(matches!(result, Err(FactoryError::UnknownGenerator(ref k)) if k == "teleport"));
	}

	#[rstest]
	fn test_random_number_digits() {
		let generator = FakeGenerator::new();
		for _ in 0..50 {
			let value = generator.generate("randomNumber", &[json!(2)]).unwrap();
			assert!((0..=99).contains(&value.as_i64().unwrap()));
		}
	}

	#[rstest]
	fn test_number_between_rejects_inverted_bounds() {
		let generator = FakeGenerator::new();
		let result = generator.generate("numberBetween", &[json!(5), json!(1)]);
		assert!(matches!(result, Err(FactoryError::InvalidGeneratorParams { .. })));
	}

	#[rstest]
	fn test_random_float_bounds() {
		let generator = FakeGenerator::new();
		let value = generator
			.generate("randomFloat", &[json!(1), json!(2.0), json!(3.0)])
			.unwrap()
			.as_f64()
			.unwrap();
		assert!((2.0..=3.0).contains(&value));
	}

	#[rstest]
	fn test_words_count() {
		let generator = FakeGenerator::new();
		let words = generator.generate("words", &[json!(4)]).unwrap();
		assert_eq!(words.as_array().unwrap().len(), 4);
	}

	#[rstest]
	fn test_text_respects_max_chars() {
		let generator = FakeGenerator::new();
		let text = generator.generate("text", &[json!(20)]).unwrap();
		assert!(text.as_str().unwrap().chars().count() <= 20);
	}

	#[rstest]
	fn test_random_element_requires_list() {
		let generator = FakeGenerator::new();
		assert!(generator.generate("randomElement", &[]).is_err());

		let value = generator
			.generate("randomElement", &[json!(["a", "b"])])
			.unwrap();
		assert!(value == json!("a") || value == json!("b"));
	}

	#[rstest]
	fn test_password_uses_config() {
		let config = FactoryConfig {
			password: "hunter2".to_string(),
			..FactoryConfig::default()
		};
		let generator = FakeGenerator::from_config(&config);
		assert_eq!(generator.generate("password", &[]).unwrap(), json!("hunter2"));
	}

	#[rstest]
	fn test_sequence_counts_per_format() {
		let generator = FakeGenerator::new();
		assert_eq!(generator.generate("sequence", &[json!("user_{n}")]).unwrap(), json!("user_1"));
		assert_eq!(generator.generate("sequence", &[json!("user_{n}")]).unwrap(), json!("user_2"));
		assert_eq!(generator.generate("sequence", &[]).unwrap(), json!(1));
	}

	#[rstest]
	fn test_unique_exhaustion() {
		let generator = FakeGenerator::from_config(&FactoryConfig::default().with_unique_attempts(64));
		let params = [json!(["a", "b"])];

		let first = generator.generate_unique("randomElement", &params).unwrap();
		let second = generator.generate_unique("randomElement", &params).unwrap();
		assert_ne!(first, second);

		let third = generator.generate_unique("randomElement", &params);
		assert!(matches!(
			third,
			Err(FactoryError::ExhaustedUniqueSpace { ref kind, attempts: 64 }) if kind == "randomElement"
		));

		generator.reset_unique();
		assert!(generator.generate_unique("randomElement", &params).is_ok());
	}

	#[rstest]
	#[case("randomElement", "random_element")]
	#[case("random_element", "RandomElement")]
	fn test_unique_history_shared_across_spellings(#[case] first: &str, #[case] second: &str) {
		let generator = FakeGenerator::from_config(&FactoryConfig::default().with_unique_attempts(50));
		let params = [json!(["a"])];

		assert_eq!(generator.generate_unique(first, &params).unwrap(), json!("a"));
		let repeated = generator.generate_unique(second, &params);
		assert!(matches!(
			repeated,
			Err(FactoryError::ExhaustedUniqueSpace { ref kind, attempts: 50 }) if kind == second
		));
	}

	#[rstest]
	fn test_number_between_degenerate_range() {
		let generator = FakeGenerator::new();
		assert_eq!(generator.number_between(3, 3), 3);
		assert_eq!(generator.number_between(5, 1), 5);
	}
}
