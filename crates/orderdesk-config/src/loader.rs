//! Loading of configuration split over several files.
//!
//! The root file and each file it includes may list further includes. Files
//! are read breadth first and their top-level sections merged into one table.
//! A section defined twice is an error, as is a file that includes one of its
//! own ancestors or a file included from two places.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

/// Reads a configuration file together with everything it includes.
pub struct ConfigLoader {
	/// Directory the root path is resolved against.
	base_path: PathBuf,
	/// Canonical paths of the files read so far.
	visited: HashSet<PathBuf>,
	/// File each top-level section came from.
	section_sources: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	pub fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
			visited: HashSet::new(),
			section_sources: HashMap::new(),
		}
	}

	/// Loads `config_path` and its includes, then parses and validates the result.
	pub async fn load_config(
		&mut self,
		config_path: impl AsRef<Path>,
	) -> Result<Config, ConfigError> {
		let root = resolve_path(&self.base_path, config_path.as_ref())?;
		// Each pending file carries the canonical paths of the files that led to it.
		let mut pending = VecDeque::from([(root, Vec::new())]);
		let mut merged = toml::Table::new();

		while let Some((path, ancestors)) = pending.pop_front() {
			let (canonical, mut table) = self.read_table(&path, &ancestors).await?;

			let include_dir = path.parent().unwrap_or(&self.base_path).to_path_buf();
			let mut chain = ancestors;
			chain.push(canonical);
			for include in take_includes(&mut table)? {
				pending.push_back((resolve_path(&include_dir, &include)?, chain.clone()));
			}

			for (section, value) in table {
				if let Some(first_source) = self.section_sources.get(&section) {
					return Err(ConfigError::Validation(format!(
						"Duplicate section '{}' found in {} and {}. \
						Each top-level section must be unique across all configuration files.",
						section,
						first_source.display(),
						path.display()
					)));
				}
				self.section_sources.insert(section.clone(), path.clone());
				merged.insert(section, value);
			}
		}

		Config::from_table(merged)
	}

	/// Reads one file, substituting environment variables, and parses it as a table.
	async fn read_table(
		&mut self,
		path: &Path,
		ancestors: &[PathBuf],
	) -> Result<(PathBuf, toml::Table), ConfigError> {
		let canonical = tokio::fs::canonicalize(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Cannot resolve path {}: {}", path.display(), e),
			))
		})?;

		if ancestors.contains(&canonical) {
			return Err(ConfigError::Validation(format!(
				"Circular include detected: {} includes itself",
				canonical.display()
			)));
		}
		if !self.visited.insert(canonical.clone()) {
			return Err(ConfigError::Validation(format!(
				"{} is included more than once",
				canonical.display()
			)));
		}

		let content = tokio::fs::read_to_string(&canonical).await?;
		let resolved = resolve_env_vars(&content)?;
		Ok((canonical, toml::from_str(&resolved)?))
	}
}

/// Removes the `include` key from a table and returns the paths it named.
fn take_includes(table: &mut toml::Table) -> Result<Vec<PathBuf>, ConfigError> {
	match table.remove("include") {
		None => Ok(Vec::new()),
		Some(toml::Value::String(path)) => Ok(vec![PathBuf::from(path)]),
		Some(toml::Value::Array(items)) => items
			.into_iter()
			.map(|item| match item {
				toml::Value::String(path) => Ok(PathBuf::from(path)),
				_ => Err(ConfigError::Validation(
					"Include array must contain only strings".into(),
				)),
			})
			.collect(),
		Some(_) => Err(ConfigError::Validation(
			"Include must be a string or array of strings".into(),
		)),
	}
}

fn resolve_path(base: &Path, path: &Path) -> Result<PathBuf, ConfigError> {
	let resolved = if path.is_absolute() {
		path.to_path_buf()
	} else {
		base.join(path)
	};

	if !resolved.exists() {
		return Err(ConfigError::Io(std::io::Error::new(
			std::io::ErrorKind::NotFound,
			format!("Configuration file not found: {}", resolved.display()),
		)));
	}

	Ok(resolved)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	const CONSOLE: &str = r#"
[console]
password = "eashop25"
create_delay_ms = 0
"#;

	const STORAGE: &str = r#"
[storage]
primary = "local"
[storage.implementations.local]
medium = "file"
storage_path = "./data"
"#;

	#[tokio::test]
	async fn test_single_file_config() {
		let temp_dir = TempDir::new().unwrap();
		let config_path = temp_dir.path().join("config.toml");
		fs::write(&config_path, format!("{}{}", CONSOLE, STORAGE)).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let config = loader.load_config(&config_path).await.unwrap();

		assert_eq!(config.console.create_delay_ms, 0);
		assert_eq!(config.storage.primary, "local");
	}

	#[tokio::test]
	async fn test_config_with_includes() {
		let temp_dir = TempDir::new().unwrap();
		fs::create_dir(temp_dir.path().join("conf.d")).unwrap();

		fs::write(
			temp_dir.path().join("main.toml"),
			format!("include = [\"conf.d/storage.toml\"]\n{}", CONSOLE),
		)
		.unwrap();
		// Nested include, resolved next to the including file.
		fs::write(
			temp_dir.path().join("conf.d/storage.toml"),
			format!("include = \"api.toml\"\n{}", STORAGE),
		)
		.unwrap();
		fs::write(temp_dir.path().join("conf.d/api.toml"), "[api]\nport = 8081\n").unwrap();

		let config = Config::from_file(temp_dir.path().join("main.toml").to_str().unwrap())
			.await
			.unwrap();

		assert_eq!(config.storage.primary, "local");
		assert_eq!(config.api.unwrap().port, 8081);
	}

	#[tokio::test]
	async fn test_duplicate_section_error() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			format!("include = [\"more.toml\"]\n{}{}", CONSOLE, STORAGE),
		)
		.unwrap();
		fs::write(temp_dir.path().join("more.toml"), CONSOLE).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let error_msg = loader
			.load_config("main.toml")
			.await
			.unwrap_err()
			.to_string();

		assert!(error_msg.contains("Duplicate section 'console'"));
	}

	#[tokio::test]
	async fn test_circular_include_detection() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("a.toml"),
			format!("include = [\"b.toml\"]\n{}", CONSOLE),
		)
		.unwrap();
		fs::write(
			temp_dir.path().join("b.toml"),
			format!("include = [\"a.toml\"]\n{}", STORAGE),
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let error_msg = loader.load_config("a.toml").await.unwrap_err().to_string();

		assert!(error_msg.contains("Circular include detected"));
	}

	#[tokio::test]
	async fn test_shared_include_is_not_circular() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			"include = [\"left.toml\", \"right.toml\"]\n",
		)
		.unwrap();
		fs::write(
			temp_dir.path().join("left.toml"),
			format!("include = [\"shared.toml\"]\n{}", CONSOLE),
		)
		.unwrap();
		fs::write(
			temp_dir.path().join("right.toml"),
			format!("include = [\"shared.toml\"]\n{}", STORAGE),
		)
		.unwrap();
		fs::write(temp_dir.path().join("shared.toml"), "[api]\nport = 8080\n").unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let error_msg = loader.load_config("main.toml").await.unwrap_err().to_string();

		assert!(error_msg.contains("included more than once"));
		assert!(!error_msg.contains("Circular"));
	}

	#[tokio::test]
	async fn test_missing_include_reported() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			format!("include = \"absent.toml\"\n{}", CONSOLE),
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let error = loader.load_config("main.toml").await.unwrap_err();

		assert!(matches!(error, ConfigError::Io(_)));
		assert!(error.to_string().contains("absent.toml"));
	}

	#[tokio::test]
	async fn test_non_string_include_rejected() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			format!("include = [1]\n{}", CONSOLE),
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let error = loader.load_config("main.toml").await.unwrap_err();

		assert!(error.to_string().contains("only strings"));
	}
}
