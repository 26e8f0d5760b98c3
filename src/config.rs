use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::errors::DbError;

pub const DEFAULT_FIELD_SEPARATOR: &str = "&##&\t";
pub const DEFAULT_ROW_SEPARATOR: &str = "$##$\n";

/// Delimiters shared by the flat-file writer and the bulk import/export statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlatFileFormat {
    pub field_separator: String,
    pub row_separator: String,
    /// Enclose character fields in double quotes.
    pub quoted: bool,
}

impl Default for FlatFileFormat {
    fn default() -> Self {
        Self {
            field_separator: DEFAULT_FIELD_SEPARATOR.to_string(),
            row_separator: DEFAULT_ROW_SEPARATOR.to_string(),
            quoted: false,
        }
    }
}

/// What to do with driver warnings raised by a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningAction {
    /// Fail the statement.
    Error,
    /// Do not read warnings back.
    Ignore,
    /// Log them and carry on.
    #[default]
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub work_path: PathBuf,
    pub clean_up: bool,
    pub warning_action: WarningAction,
    pub file_delete_chunk_size: usize,
    pub insert_delete_chunk_size: usize,
    pub flat_file: FlatFileFormat,
    pub local_infile: bool,
    /// Suffix of the flat files `load` writes; distinct per worker sharing a work path.
    pub part_name: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            work_path: PathBuf::from("."),
            clean_up: false,
            warning_action: WarningAction::Default,
            file_delete_chunk_size: 50,
            insert_delete_chunk_size: 10,
            flat_file: FlatFileFormat::default(),
            local_infile: false,
            part_name: "load".to_string(),
        }
    }
}

impl LoaderConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| DbError::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        let config: LoaderConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), DbError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), DbError> {
        if self.file_delete_chunk_size == 0 || self.insert_delete_chunk_size == 0 {
            return Err(DbError::Config("delete chunk sizes must be positive".to_string()));
        }
        if self.part_name.is_empty() || self.part_name.contains(['/', '\\']) {
            return Err(DbError::Config(format!("invalid part name {:?}", self.part_name)));
        }
        if self.flat_file.field_separator.is_empty() || self.flat_file.row_separator.is_empty() {
            return Err(DbError::Config("flat file separators must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn with_work_path<P: Into<PathBuf>>(mut self, work_path: P) -> Self {
        self.work_path = work_path.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::default();
        assert_eq!(config.flat_file.field_separator, "&##&\t");
        assert_eq!(config.flat_file.row_separator, "$##$\n");
        assert_eq!(config.file_delete_chunk_size, 50);
        assert_eq!(config.insert_delete_chunk_size, 10);
        assert_eq!(config.warning_action, WarningAction::Default);
        assert_eq!(config.part_name, "load");
    }

    #[test]
    fn test_part_name_must_be_a_file_name_suffix() {
        let mut config = LoaderConfig::default();
        config.part_name = "w/1".to_string();
        assert!(matches!(config.validate(), Err(DbError::Config(_))));
        config.part_name = "w1".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_round_trip_file() {
        let file = NamedTempFile::new().unwrap();
        let mut config = LoaderConfig::default().with_work_path("/tmp/work");
        config.clean_up = true;
        config.warning_action = WarningAction::Error;
        config.to_file(file.path()).unwrap();

        let loaded = LoaderConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), r#"{"warning_action": "ignore", "flat_file": {"quoted": true}}"#).unwrap();

        let loaded = LoaderConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded.warning_action, WarningAction::Ignore);
        assert!(loaded.flat_file.quoted);
        assert_eq!(loaded.flat_file.row_separator, DEFAULT_ROW_SEPARATOR);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), r#"{"file_delete_chunk_size": 0}"#).unwrap();
        assert!(matches!(
            LoaderConfig::from_file(file.path()),
            Err(DbError::Config(_))
        ));
    }
}
