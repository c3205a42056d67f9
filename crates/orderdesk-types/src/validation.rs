//! Configuration validation for implementation blocks.
//!
//! Each storage implementation receives its own raw TOML table from the
//! configuration file. The types here let an implementation describe which
//! keys it expects so that mistakes are reported at startup with the field name.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	/// Error that occurs when a required field is missing.
	#[error("Missing required field: {0}")]
	MissingField(String),
	/// Error that occurs when a field has an invalid value.
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	/// Error that occurs when field type is incorrect.
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

/// The type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
	/// An integer with optional inclusive bounds.
	Integer { min: Option<i64>, max: Option<i64> },
	Boolean,
}

/// Custom check run after the type check. Returns an error message on failure.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A named, typed field in a [`Schema`].
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Attaches a custom validator to this field.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		let mismatch = |expected: &str| ValidationError::TypeMismatch {
			field: self.name.clone(),
			expected: expected.to_string(),
			actual: value.type_str().to_string(),
		};

		match &self.field_type {
			FieldType::String => {
				value.as_str().ok_or_else(|| mismatch("string"))?;
			},
			FieldType::Boolean => {
				value.as_bool().ok_or_else(|| mismatch("boolean"))?;
			},
			FieldType::Integer { min, max } => {
				let int_val = value.as_integer().ok_or_else(|| mismatch("integer"))?;
				if let Some(min_val) = min.filter(|min_val| int_val < *min_val) {
					return Err(self.invalid(format!(
						"Value {} is less than minimum {}",
						int_val, min_val
					)));
				}
				if let Some(max_val) = max.filter(|max_val| int_val > *max_val) {
					return Err(self.invalid(format!(
						"Value {} is greater than maximum {}",
						int_val, max_val
					)));
				}
			},
		}

		match &self.validator {
			Some(validator) => validator(value).map_err(|message| self.invalid(message)),
			None => Ok(()),
		}
	}

	fn invalid(&self, message: String) -> ValidationError {
		ValidationError::InvalidValue {
			field: self.name.clone(),
			message,
		}
	}
}

/// Required and optional fields of a TOML table.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML value against this schema.
	///
	/// The value must be a table. Required fields must be present; every
	/// present field is type-checked and passed through its custom validator.
	/// Unknown keys are ignored.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			field.check(value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}

		Ok(())
	}
}

/// A configuration schema that can validate TOML values.
#[async_trait]
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn schema() -> Schema {
		Schema::new(
			vec![Field::new("url", FieldType::String).with_validator(|v| {
				match v.as_str() {
					Some(url) if url.starts_with("http") => Ok(()),
					_ => Err("must be an http(s) URL".to_string()),
				}
			})],
			vec![Field::new(
				"timeout_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(300),
				},
			)],
		)
	}

	#[test]
	fn test_valid_table_passes() {
		let config: toml::Value = toml::from_str(
			r#"
url = "http://127.0.0.1:3000/api/orders"
timeout_seconds = 10
"#,
		)
		.unwrap();
		assert!(schema().validate(&config).is_ok());
	}

	#[test]
	fn test_missing_required_field() {
		let config: toml::Value = toml::from_str("timeout_seconds = 10").unwrap();
		let err = schema().validate(&config).unwrap_err();
		assert!(matches!(err, ValidationError::MissingField(field) if field == "url"));
	}

	#[test]
	fn test_bounds_and_types_are_checked() {
		let config: toml::Value = toml::from_str(
			r#"
url = "http://localhost"
timeout_seconds = 0
"#,
		)
		.unwrap();
		let err = schema().validate(&config).unwrap_err();
		assert!(err.to_string().contains("less than minimum 1"));

		let config: toml::Value = toml::from_str(r#"url = 5"#).unwrap();
		let err = schema().validate(&config).unwrap_err();
		assert!(matches!(err, ValidationError::TypeMismatch { .. }));
	}

	#[test]
	fn test_custom_validator_runs() {
		let config: toml::Value = toml::from_str(r#"url = "ftp://example""#).unwrap();
		let err = schema().validate(&config).unwrap_err();
		assert_eq!(
			err.to_string(),
			"Invalid value for field 'url': must be an http(s) URL"
		);
	}
}
