use std::{collections::HashMap, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::errors::DbError;

/// A named tabular section of a container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataCategory {
    pub name: String,
    pub attributes: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

impl DataCategory {
    pub fn new(name: &str, attributes: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn with_row(mut self, row: &[&str]) -> Self {
        self.rows.push(row.iter().map(|v| v.to_string()).collect());
        self
    }

    /// Source attribute name to column index.
    pub fn attribute_index_map(&self) -> HashMap<&str, usize> {
        self.attributes
            .iter()
            .enumerate()
            .map(|(i, a)| (a.as_str(), i))
            .collect()
    }
}

/// One self-contained unit of source data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataContainer {
    pub name: String,
    #[serde(default)]
    pub categories: Vec<DataCategory>,
}

impl DataContainer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            categories: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: DataCategory) -> Self {
        self.categories.push(category);
        self
    }

    pub fn category(&self, name: &str) -> Option<&DataCategory> {
        self.categories.iter().find(|c| c.name == name)
    }
}

/// Produces containers from a source file.
pub trait ContainerReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<Vec<DataContainer>, DbError>;
}

/// Reads a JSON array of containers.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonContainerReader;

impl ContainerReader for JsonContainerReader {
    fn read(&self, path: &Path) -> Result<Vec<DataContainer>, DbError> {
        let text = fs::read_to_string(path)
            .map_err(|e| DbError::Import(format!("{}: {}", path.display(), e)))?;
        let containers: Vec<DataContainer> = serde_json::from_str(&text)?;
        Ok(containers)
    }
}
