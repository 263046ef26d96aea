//! YAML persistence of source and user data

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

use crate::error::InventoryError;
use crate::kind::Kind;
use crate::merge::{DataSet, KindData};
use crate::model::Record;

/// File holding the provider data
pub const SOURCE_FILE: &str = "source_data.yaml";

/// File holding the user annotations
pub const USER_FILE: &str = "user_data.yaml";

/// On-disk shape; empty kinds and ids are written as `null` by hand
type RawDataSet = BTreeMap<Kind, Option<BTreeMap<String, Option<Record>>>>;

/// Data directory holding both data files
#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    /// Create a store rooted at a data directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn source_path(&self) -> PathBuf {
        self.dir.join(SOURCE_FILE)
    }

    #[must_use]
    pub fn user_path(&self) -> PathBuf {
        self.dir.join(USER_FILE)
    }

    /// Load provider data
    ///
    /// # Errors
    /// Returns `Storage` if the file exists but can't be read or parsed.
    pub fn load_source(&self) -> Result<DataSet, InventoryError> {
        load_file(&self.source_path())
    }

    /// Load user annotations
    ///
    /// # Errors
    /// Returns `Storage` if the file exists but can't be read or parsed.
    pub fn load_user(&self) -> Result<DataSet, InventoryError> {
        load_file(&self.user_path())
    }

    /// Rewrite both data files
    ///
    /// Each file is written to a temporary file in the data directory and
    /// renamed over the previous version.
    ///
    /// # Errors
    /// Returns `Storage` if the directory can't be created or a file can't be
    /// written.
    #[instrument(skip(self, source, user), fields(dir = %self.dir.display()))]
    pub fn save(&self, source: &DataSet, user: &DataSet) -> Result<(), InventoryError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            InventoryError::Storage(format!("failed to create {}: {e}", self.dir.display()))
        })?;
        write_atomic(&self.dir, &self.source_path(), source)?;
        write_atomic(&self.dir, &self.user_path(), user)?;
        info!("data files saved");
        Ok(())
    }
}

fn load_file(path: &Path) -> Result<DataSet, InventoryError> {
    if !path.exists() {
        warn!(path = %path.display(), "data file not found, starting empty");
        return Ok(DataSet::new());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        InventoryError::Storage(format!("failed to read {}: {e}", path.display()))
    })?;
    if content.trim().is_empty() {
        return Ok(DataSet::new());
    }

    let raw: Option<RawDataSet> = serde_yaml::from_str(&content).map_err(|e| {
        InventoryError::Storage(format!("failed to parse {}: {e}", path.display()))
    })?;

    let data: DataSet = raw
        .unwrap_or_default()
        .into_iter()
        .map(|(kind, records)| {
            let records: KindData = records
                .unwrap_or_default()
                .into_iter()
                .map(|(id, record)| (id, record.unwrap_or_default()))
                .collect();
            (kind, records)
        })
        .collect();

    debug!(path = %path.display(), kinds = data.len(), "data file loaded");
    Ok(data)
}

fn write_error(path: &Path, e: impl std::fmt::Display) -> InventoryError {
    InventoryError::Storage(format!("failed to write {}: {e}", path.display()))
}

fn write_atomic(dir: &Path, path: &Path, data: &DataSet) -> Result<(), InventoryError> {
    let yaml = serde_yaml::to_string(data).map_err(|e| write_error(path, e))?;
    let mut file = NamedTempFile::new_in(dir).map_err(|e| write_error(path, e))?;
    file.write_all(yaml.as_bytes())
        .map_err(|e| write_error(path, e))?;
    file.as_file().sync_all().map_err(|e| write_error(path, e))?;
    file.persist(path).map_err(|e| write_error(path, e.error))?;

    debug!(path = %path.display(), "data file written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_missing_files_are_empty() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path());
        assert!(store.load_source().unwrap().is_empty());
        assert!(store.load_user().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join("nested"));

        let mut record = Record::new();
        record.insert("name".to_string(), json!("web"));
        record.insert("private_ips".to_string(), json!(["10.0.0.1"]));
        let mut source = DataSet::new();
        source
            .entry(Kind::Ec2)
            .or_default()
            .insert("i-0001".to_string(), record);

        store.save(&source, &DataSet::new()).unwrap();

        assert_eq!(store.load_source().unwrap(), source);
        assert!(store.load_user().unwrap().is_empty());
    }

    #[test]
    fn test_hand_written_nulls() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(USER_FILE),
            "projects:\n  pro-01:\n    name: Clinv\nservices:\nec2:\n  i-0001:\n",
        )
        .unwrap();

        let data = Store::new(dir.path()).load_user().unwrap();

        assert_eq!(data[&Kind::Projects]["pro-01"]["name"], json!("Clinv"));
        assert!(data[&Kind::Services].is_empty());
        assert!(data[&Kind::Ec2]["i-0001"].is_empty());
    }

    #[test]
    fn test_unknown_kind_is_a_storage_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(SOURCE_FILE), "lambda:\n  fn-01: {}\n").unwrap();

        let err = Store::new(dir.path()).load_source().unwrap_err();
        assert!(matches!(err, InventoryError::Storage(_)));
    }
}
