//! File-backed key-value medium.
//!
//! Each key is one JSON file in a directory. Writes go to a temporary file
//! first and are renamed into place, so a reader never sees a half-written
//! order list.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use orderdesk_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use std::path::PathBuf;
use tokio::fs;

const DEFAULT_STORAGE_PATH: &str = "./data/orderdesk";

/// Directory of JSON files, one per key.
pub struct FileStorage {
	base_path: PathBuf,
}

impl FileStorage {
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	/// Maps a key to a file name inside the base directory.
	///
	/// Path separators and other characters that are awkward in file names
	/// are replaced, so a key can never point outside the directory.
	fn get_file_path(&self, key: &str) -> PathBuf {
		let safe_key: String = key
			.chars()
			.map(|c| match c {
				'/' | '\\' | ':' | '.' => '_',
				c => c,
			})
			.collect();
		self.base_path.join(format!("{}.json", safe_key))
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.get_file_path(key);

		match fs::read(&path).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.get_file_path(key);

		fs::create_dir_all(&self.base_path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		let temp_path = path.with_extension("json.tmp");
		fs::write(&temp_path, value)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		tracing::trace!(path = %path.display(), "Wrote storage file");
		Ok(())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![Field::new("storage_path", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(path) if path.trim().is_empty() => {
						Err("storage_path cannot be empty".to_string())
					},
					_ => Ok(()),
				}
			})],
		);
		schema.validate(config)
	}
}

/// Factory function to create a file medium from configuration.
///
/// Configuration parameters:
/// - `storage_path`: directory holding the files (default: "./data/orderdesk")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_STORAGE_PATH);

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}

/// Registry for the file medium.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	fn storage_in(dir: &TempDir) -> FileStorage {
		FileStorage::new(dir.path().to_path_buf())
	}

	#[tokio::test]
	async fn test_basic_operations() {
		let temp_dir = TempDir::new().unwrap();
		let storage = storage_in(&temp_dir);

		assert!(matches!(
			storage.get_bytes("orders").await,
			Err(StorageError::NotFound)
		));

		storage.set_bytes("orders", b"[]".to_vec()).await.unwrap();
		assert_eq!(storage.get_bytes("orders").await.unwrap(), b"[]");
		assert!(temp_dir.path().join("orders.json").exists());
	}

	#[tokio::test]
	async fn test_overwrite_leaves_no_temp_file() {
		let temp_dir = TempDir::new().unwrap();
		let storage = storage_in(&temp_dir);

		storage.set_bytes("orders", b"[1]".to_vec()).await.unwrap();
		storage.set_bytes("orders", b"[2]".to_vec()).await.unwrap();

		assert_eq!(storage.get_bytes("orders").await.unwrap(), b"[2]");
		let names: Vec<_> = std::fs::read_dir(temp_dir.path())
			.unwrap()
			.map(|entry| entry.unwrap().file_name())
			.collect();
		assert_eq!(names, vec![std::ffi::OsString::from("orders.json")]);
	}

	#[tokio::test]
	async fn test_keys_stay_inside_base_directory() {
		let temp_dir = TempDir::new().unwrap();
		let storage = storage_in(&temp_dir);

		storage.set_bytes("../escape", b"x".to_vec()).await.unwrap();
		assert!(temp_dir.path().join("___escape.json").exists());
	}

	#[tokio::test]
	async fn test_creates_missing_directory() {
		let temp_dir = TempDir::new().unwrap();
		let config: toml::Value = toml::from_str(&format!(
			"storage_path = {:?}",
			temp_dir.path().join("nested/dir").display().to_string()
		))
		.unwrap();

		let storage = create_storage(&config).unwrap();
		storage.set_bytes("orders", b"[]".to_vec()).await.unwrap();
		assert!(temp_dir.path().join("nested/dir/orders.json").exists());
	}

	#[test]
	fn test_schema_rejects_empty_path() {
		let config: toml::Value = toml::from_str(r#"storage_path = "  ""#).unwrap();
		assert!(FileStorageSchema.validate(&config).is_err());

		let config: toml::Value = toml::from_str(r#"storage_path = 42"#).unwrap();
		assert!(create_storage(&config).is_err());
	}
}
