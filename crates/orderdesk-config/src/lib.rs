//! Configuration for the orderdesk system.
//!
//! Configuration is read from TOML. String values may reference environment
//! variables as `${NAME}` or `${NAME:-fallback}`; these are substituted before
//! parsing. A file may pull in other files with `include = ["a.toml", ...]`,
//! paths being relative to the including file. Every top-level section must
//! come from exactly one file.

mod loader;

pub use loader::ConfigLoader;

use orderdesk_types::{
	utils::constants::{
		DEFAULT_CONFIRM_DELAY_MS, DEFAULT_CREATE_DELAY_MS, DEFAULT_DISPLAY_UTC_OFFSET_MINUTES,
	},
	SecretString,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// The full error embeds the whole input; the message alone is enough.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Operator console settings.
	pub console: ConsoleConfig,
	/// Where orders are kept.
	pub storage: StorageConfig,
	/// HTTP endpoint served by `orderdesk serve`.
	pub api: Option<ApiConfig>,
}

/// Operator console settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConsoleConfig {
	/// Shared password that unlocks the console.
	pub password: SecretString,
	/// Pause before a new order is persisted, in milliseconds.
	#[serde(default = "default_create_delay_ms")]
	pub create_delay_ms: u64,
	/// How long the "Order created" confirmation stays up, in milliseconds.
	#[serde(default = "default_confirm_delay_ms")]
	pub confirm_delay_ms: u64,
	/// Reject status changes that the workflow does not allow.
	///
	/// Off by default: any status may be written over any other.
	#[serde(default)]
	pub enforce_transitions: bool,
	/// Offset from UTC used when showing timestamps.
	#[serde(default = "default_display_utc_offset_minutes")]
	pub display_utc_offset_minutes: i32,
}

impl ConsoleConfig {
	/// Console settings with the given password and default everything else.
	pub fn with_password(password: impl Into<SecretString>) -> Self {
		Self {
			password: password.into(),
			create_delay_ms: DEFAULT_CREATE_DELAY_MS,
			confirm_delay_ms: DEFAULT_CONFIRM_DELAY_MS,
			enforce_transitions: false,
			display_utc_offset_minutes: DEFAULT_DISPLAY_UTC_OFFSET_MINUTES,
		}
	}

	pub fn create_delay(&self) -> Duration {
		Duration::from_millis(self.create_delay_ms)
	}

	pub fn confirm_delay(&self) -> Duration {
		Duration::from_millis(self.confirm_delay_ms)
	}
}

fn default_create_delay_ms() -> u64 {
	DEFAULT_CREATE_DELAY_MS
}

fn default_confirm_delay_ms() -> u64 {
	DEFAULT_CONFIRM_DELAY_MS
}

fn default_display_utc_offset_minutes() -> i32 {
	DEFAULT_DISPLAY_UTC_OFFSET_MINUTES
}

/// Configuration for the order storage.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the HTTP endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether `serve` may start the endpoint.
	#[serde(default = "default_api_enabled")]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			enabled: default_api_enabled(),
			host: default_api_host(),
			port: default_api_port(),
			timeout_seconds: default_api_timeout(),
		}
	}
}

fn default_api_enabled() -> bool {
	true
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

fn default_api_timeout() -> u64 {
	30
}

/// Substitutes `${NAME}` and `${NAME:-fallback}` references with values from
/// the process environment.
///
/// A reference without a fallback to an unset variable is an error. Input is
/// capped at 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut resolved = String::with_capacity(input.len());
	let mut copied_up_to = 0;

	for cap in re.captures_iter(input) {
		let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};

		let value = match (std::env::var(name.as_str()), cap.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(fallback)) => fallback.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					name.as_str()
				)));
			},
		};

		resolved.push_str(&input[copied_up_to..whole.start()]);
		resolved.push_str(&value);
		copied_up_to = whole.end();
	}
	resolved.push_str(&input[copied_up_to..]);

	Ok(resolved)
}

impl Config {
	/// Loads configuration from a file, following its includes.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;

		ConfigLoader::new(base_dir).load_config(file_name).await
	}

	/// Builds a configuration from an already merged TOML table.
	pub(crate) fn from_table(table: toml::Table) -> Result<Self, ConfigError> {
		let config: Config = toml::Value::Table(table).try_into()?;
		config.validate()?;
		Ok(config)
	}

	/// Checks cross-field rules that serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.console.password.is_empty() {
			return Err(ConfigError::Validation(
				"Console password cannot be empty".into(),
			));
		}

		if self.console.display_utc_offset_minutes.unsigned_abs() >= 24 * 60 {
			return Err(ConfigError::Validation(format!(
				"display_utc_offset_minutes must be within a day, got {}",
				self.console.display_utc_offset_minutes
			)));
		}

		if self.storage.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Storage primary implementation cannot be empty".into(),
			));
		}

		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' has no entry in [storage.implementations]",
				self.storage.primary
			)));
		}

		if let Some(api) = &self.api {
			if api.enabled && api.timeout_seconds == 0 {
				return Err(ConfigError::Validation(
					"api.timeout_seconds must be greater than zero".into(),
				));
			}
		}

		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
