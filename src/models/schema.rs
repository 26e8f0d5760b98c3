use std::{collections::HashSet, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::errors::DbError;

/// Out-of-band marker the bulk loader reads as SQL NULL.
pub const NULL_SENTINEL: &str = "\\N";

/// Source values that mean "no value supplied".
pub const MISSING_VALUE_SENTINELS: [&str; 2] = ["?", "."];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableType {
    #[default]
    Transactional,
    NonTransactional,
}

impl TableType {
    pub fn engine(&self) -> &'static str {
        match self {
            TableType::Transactional => "InnoDB",
            TableType::NonTransactional => "MyISAM",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    Unique,
    Search,
    Fulltext,
}

/// Coarse SQL type classification used for quoting and null placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    String,
    Float,
    Integer,
    Date,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub attribute_id: String,
    pub attribute_name: String,
    pub sql_type: String,
    #[serde(default)]
    pub width: usize,
    #[serde(default)]
    pub precision: usize,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    pub order: u32,
}

fn default_nullable() -> bool {
    true
}

impl AttributeDefinition {
    /// Upper-cased leading type keyword, e.g. `INT` for `int unsigned auto_increment`.
    pub fn base_type(&self) -> String {
        let upper = self.sql_type.trim().to_uppercase();
        if upper.starts_with("DOUBLE PRECISION") {
            return "DOUBLE PRECISION".to_string();
        }
        upper
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .unwrap_or_default()
            .to_string()
    }

    pub fn type_family(&self) -> TypeFamily {
        let base = self.base_type();
        match base.as_str() {
            "VARCHAR" | "CHAR" | "TEXT" | "MEDIUMTEXT" | "LONGTEXT" => TypeFamily::String,
            "DATE" | "DATETIME" => TypeFamily::Date,
            "FLOAT" | "DECIMAL" | "DOUBLE PRECISION" | "NUMERIC" => TypeFamily::Float,
            "INTEGER" | "BIGINT" | "SMALLINT" => TypeFamily::Integer,
            b if b.starts_with("INT") => TypeFamily::Integer,
            _ => TypeFamily::Other,
        }
    }

    pub fn is_string_type(&self) -> bool {
        self.type_family() == TypeFamily::String
    }

    pub fn is_date_type(&self) -> bool {
        self.type_family() == TypeFamily::Date
    }

    pub fn is_float_type(&self) -> bool {
        self.type_family() == TypeFamily::Float
    }

    pub fn is_integer_type(&self) -> bool {
        self.type_family() == TypeFamily::Integer
    }

    pub fn is_auto_increment(&self) -> bool {
        self.sql_type
            .split_whitespace()
            .any(|t| t.eq_ignore_ascii_case("AUTO_INCREMENT"))
    }

    /// Character and date values are single-quoted when rendered as literals.
    pub fn is_quoted_type(&self) -> bool {
        matches!(self.type_family(), TypeFamily::String | TypeFamily::Date)
    }

    pub fn null_placeholder(&self) -> &'static str {
        if self.is_string_type() {
            ""
        } else {
            NULL_SENTINEL
        }
    }

    /// Declared width for string types, 0 for everything else.
    pub fn string_width(&self) -> usize {
        if self.is_string_type() {
            self.width
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub index_type: IndexType,
    pub attributes: Vec<String>,
}

/// Value derived from the enclosing container rather than copied from a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapFunction {
    #[serde(rename = "datablockid()")]
    DataBlockId,
}

impl MapFunction {
    pub fn evaluate(&self, container_name: &str, _args: &[String]) -> String {
        match self {
            MapFunction::DataBlockId => container_name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeMapping {
    pub attribute_id: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default)]
    pub function: Option<MapFunction>,
    #[serde(default)]
    pub function_args: Vec<String>,
}

/// Source attribute names whose values identify one target row across categories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeIndex {
    pub category: String,
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDefinition {
    pub table_id: String,
    pub table_name: String,
    #[serde(default)]
    pub table_type: TableType,
    pub attributes: Vec<AttributeDefinition>,
    #[serde(default)]
    pub indices: Vec<IndexDefinition>,
    #[serde(default)]
    pub attribute_map: Vec<AttributeMapping>,
    #[serde(default)]
    pub merge_indices: Vec<MergeIndex>,
    #[serde(default)]
    pub delete_attribute: Option<String>,
}

impl TableDefinition {
    pub fn attribute(&self, attribute_id: &str) -> Result<&AttributeDefinition, DbError> {
        self.attributes
            .iter()
            .find(|a| a.attribute_id == attribute_id)
            .ok_or_else(|| DbError::unknown_attribute(&self.table_id, attribute_id))
    }

    pub fn ordered_attributes(&self) -> Vec<&AttributeDefinition> {
        let mut attrs: Vec<&AttributeDefinition> = self.attributes.iter().collect();
        attrs.sort_by_key(|a| a.order);
        attrs
    }

    pub fn attribute_ids(&self) -> Vec<&str> {
        self.ordered_attributes()
            .into_iter()
            .map(|a| a.attribute_id.as_str())
            .collect()
    }

    pub fn attribute_names(&self) -> Vec<&str> {
        self.ordered_attributes()
            .into_iter()
            .map(|a| a.attribute_name.as_str())
            .collect()
    }

    pub fn attribute_name(&self, attribute_id: &str) -> Result<&str, DbError> {
        Ok(self.attribute(attribute_id)?.attribute_name.as_str())
    }

    pub fn primary_key_ids(&self) -> Vec<&str> {
        self.ordered_attributes()
            .into_iter()
            .filter(|a| a.primary_key)
            .map(|a| a.attribute_id.as_str())
            .collect()
    }

    pub fn null_placeholder(&self, attribute_id: &str) -> Result<&'static str, DbError> {
        Ok(self.attribute(attribute_id)?.null_placeholder())
    }

    pub fn string_width(&self, attribute_id: &str) -> Result<usize, DbError> {
        Ok(self.attribute(attribute_id)?.string_width())
    }

    pub fn is_mapped(&self) -> bool {
        !self.attribute_map.is_empty()
    }

    /// Source categories feeding this table, in order of first appearance.
    pub fn map_categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.attribute_map
            .iter()
            .filter_map(|m| m.category.as_deref())
            .filter(|c| seen.insert(*c))
            .collect()
    }

    /// `(attribute_id, source attribute)` pairs mapped from `category`.
    pub fn category_attributes(&self, category: &str) -> Vec<(&str, &str)> {
        self.attribute_map
            .iter()
            .filter(|m| m.category.as_deref() == Some(category))
            .filter_map(|m| {
                m.attribute
                    .as_deref()
                    .map(|src| (m.attribute_id.as_str(), src))
            })
            .collect()
    }

    /// Attributes computed by a function instead of copied from a category.
    pub fn function_mappings(&self) -> Vec<&AttributeMapping> {
        self.attribute_map
            .iter()
            .filter(|m| m.category.is_none() && m.function.is_some())
            .collect()
    }

    pub fn merge_index(&self, category: &str) -> Option<&[String]> {
        self.merge_indices
            .iter()
            .find(|m| m.category == category)
            .map(|m| m.attributes.as_slice())
    }

    pub fn delete_attribute_name(&self) -> Result<&str, DbError> {
        let attribute_id = self.delete_attribute.as_deref().ok_or_else(|| {
            DbError::schema(format!("table {} has no delete attribute", self.table_id))
        })?;
        self.attribute_name(attribute_id)
    }

    /// Attribute id to camelCase parameter name, skipping auto-increment columns.
    pub fn default_attribute_parameter_map(&self) -> Vec<(&str, String)> {
        self.ordered_attributes()
            .into_iter()
            .filter(|a| !a.is_auto_increment())
            .map(|a| (a.attribute_id.as_str(), camel_case(&a.attribute_id)))
            .collect()
    }

    fn validate(&self) -> Result<(), DbError> {
        let mut ids = HashSet::new();
        for attr in &self.attributes {
            if !ids.insert(attr.attribute_id.as_str()) {
                return Err(DbError::schema(format!(
                    "duplicate attribute id {} in table {}",
                    attr.attribute_id, self.table_id
                )));
            }
        }
        for index in &self.indices {
            for attribute_id in &index.attributes {
                self.attribute(attribute_id)?;
            }
        }
        for mapping in &self.attribute_map {
            self.attribute(&mapping.attribute_id)?;
            let direct = mapping.category.is_some() && mapping.attribute.is_some();
            if !direct && mapping.function.is_none() {
                return Err(DbError::schema(format!(
                    "mapping for {}.{} names neither a source attribute nor a function",
                    self.table_id, mapping.attribute_id
                )));
            }
        }
        let categories = self.map_categories();
        if categories.len() > 1 {
            if let Some(category) = categories.iter().find(|c| self.merge_index(c).is_none()) {
                return Err(DbError::schema(format!(
                    "table {} merges several categories but has no merge index for {}",
                    self.table_id, category
                )));
            }
        }
        for merge in &self.merge_indices {
            if !categories.contains(&merge.category.as_str()) {
                return Err(DbError::schema(format!(
                    "merge index for unmapped category {} in table {}",
                    merge.category, self.table_id
                )));
            }
        }
        if let Some(attribute_id) = &self.delete_attribute {
            self.attribute(attribute_id)?;
        }
        Ok(())
    }
}

fn camel_case(attribute_id: &str) -> String {
    let mut out = String::new();
    for (i, part) in attribute_id
        .to_lowercase()
        .split('_')
        .filter(|p| !p.is_empty())
        .enumerate()
    {
        if i == 0 {
            out.push_str(part);
            continue;
        }
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// One database's tables. Built once, then shared read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub database_name: String,
    pub tables: Vec<TableDefinition>,
}

impl SchemaDefinition {
    pub fn new(database_name: &str, tables: Vec<TableDefinition>) -> Result<Self, DbError> {
        let schema = SchemaDefinition {
            database_name: database_name.to_string(),
            tables,
        };
        schema.validate()?;
        Ok(schema)
    }

    pub fn from_json_str(json: &str) -> Result<Self, DbError> {
        let schema: SchemaDefinition = serde_json::from_str(json)?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), DbError> {
        if self.database_name.trim().is_empty() {
            return Err(DbError::schema("database name is empty"));
        }
        let mut ids = HashSet::new();
        for table in &self.tables {
            if !ids.insert(table.table_id.as_str()) {
                return Err(DbError::schema(format!(
                    "duplicate table id {}",
                    table.table_id
                )));
            }
            table.validate()?;
        }
        Ok(())
    }

    pub fn table(&self, table_id: &str) -> Result<&TableDefinition, DbError> {
        self.tables
            .iter()
            .find(|t| t.table_id == table_id)
            .ok_or_else(|| DbError::unknown_table(table_id))
    }

    pub fn table_ids(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.table_id.as_str()).collect()
    }

    pub fn attribute(
        &self,
        table_id: &str,
        attribute_id: &str,
    ) -> Result<&AttributeDefinition, DbError> {
        self.table(table_id)?.attribute(attribute_id)
    }

    /// `table_name.attribute_name`, as used in multi-table selects.
    pub fn qualified_attribute_name(
        &self,
        table_id: &str,
        attribute_id: &str,
    ) -> Result<String, DbError> {
        let table = self.table(table_id)?;
        Ok(format!(
            "{}.{}",
            table.table_name,
            table.attribute_name(attribute_id)?
        ))
    }
}
