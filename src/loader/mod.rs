use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use log::{error, info, warn};

use crate::{
    config::LoaderConfig,
    db::{executor::SqlExecutor, DbClient},
    errors::DbError,
    models::{
        container::{ContainerReader, DataContainer, JsonContainerReader},
        schema::SchemaDefinition,
    },
    sql::dml::{DmlGenerator, SqlTemplate},
};

pub mod flatfile;
pub mod mapper;
pub mod report;

use mapper::{MappedData, Mapper, RowRecord};
use report::LoadReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadType {
    /// Flat file per table, then a bulk import.
    BatchFile,
    /// Same as `BatchFile`, appending to existing load files.
    BatchFileAppend,
    /// Parameterized inserts in one transaction per table.
    BatchInsert,
}

impl FromStr for LoadType {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "batch-file" => Ok(LoadType::BatchFile),
            "batch-file-append" => Ok(LoadType::BatchFileAppend),
            "batch-insert" => Ok(LoadType::BatchInsert),
            other => Err(DbError::Config(format!("unknown load type {}", other))),
        }
    }
}

/// Pre-load deletion policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOption {
    None,
    /// Delete rows whose delete attribute names a container in the batch.
    Selected,
    /// Truncate the table. Refused unless `confirmed`.
    All { confirmed: bool },
}

impl DeleteOption {
    pub fn truncate_confirmed() -> Self {
        DeleteOption::All { confirmed: true }
    }

    fn check_confirmed(&self) -> Result<(), DbError> {
        match self {
            DeleteOption::All { confirmed: false } => Err(DbError::Unconfirmed(
                "table truncate requested without confirmation".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

impl FromStr for DeleteOption {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(DeleteOption::None),
            "selected" => Ok(DeleteOption::Selected),
            "all" | "truncate" => Ok(DeleteOption::All { confirmed: false }),
            other => Err(DbError::Config(format!("unknown delete option {}", other))),
        }
    }
}

pub enum LoadInput<'c> {
    Paths(&'c [PathBuf]),
    Containers(&'c [DataContainer]),
}

/// `(table_id, flat file)` pairs ready for import.
pub type LoadList = Vec<(String, PathBuf)>;

/// Maps containers onto schema tables and persists the rows.
pub struct SchemaLoader<'a> {
    schema: &'a SchemaDefinition,
    config: LoaderConfig,
    reader: Box<dyn ContainerReader>,
}

impl<'a> SchemaLoader<'a> {
    pub fn new(schema: &'a SchemaDefinition, config: LoaderConfig) -> Self {
        Self {
            schema,
            config,
            reader: Box::new(JsonContainerReader),
        }
    }

    pub fn with_reader(mut self, reader: Box<dyn ContainerReader>) -> Self {
        self.reader = reader;
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Reads and maps the containers in `paths`. Unreadable paths are logged and skipped.
    pub fn fetch(&self, paths: &[PathBuf]) -> MappedData {
        let mut containers = Vec::new();
        let mut failed = Vec::new();
        for path in paths {
            match self.reader.read(path) {
                Ok(c) => containers.extend(c),
                Err(e) => {
                    error!("Reading {} failed: {}", path.display(), e);
                    failed.push(path.clone());
                }
            }
        }
        let mut data = self.process(&containers);
        data.failed_sources = failed;
        data
    }

    pub fn process(&self, containers: &[DataContainer]) -> MappedData {
        Mapper::new(self.schema).process(containers)
    }

    pub fn load_file_path(&self, table_id: &str, part_name: &str) -> PathBuf {
        self.config
            .work_path
            .join(format!("{}-loadable-{}.tdd", table_id, part_name))
    }

    /// Writes one flat file per table with rows.
    pub fn export(&self, data: &MappedData, append: bool, part_name: &str) -> Result<LoadList, DbError> {
        let mut load_list = Vec::new();
        for table in &self.schema.tables {
            let rows = data.rows(&table.table_id);
            if rows.is_empty() {
                continue;
            }
            let path = self.load_file_path(&table.table_id, part_name);
            flatfile::write_table_file(&path, table, rows, &self.config.flat_file, append)?;
            load_list.push((table.table_id.clone(), path));
        }
        Ok(load_list)
    }

    /// Container names read and the load files written for them.
    pub fn make_load_files(
        &self,
        paths: &[PathBuf],
        append: bool,
        part_name: &str,
    ) -> Result<(Vec<String>, LoadList), DbError> {
        let data = self.fetch(paths);
        data.overflow.log_summary();
        let load_list = self.export(&data, append, part_name)?;
        Ok((data.container_names, load_list))
    }

    pub fn delete_statements(
        &self,
        table_id: &str,
        container_names: &[String],
        delete_opt: DeleteOption,
        chunk_size: usize,
    ) -> Result<Vec<SqlTemplate>, DbError> {
        delete_opt.check_confirmed()?;
        let dml = DmlGenerator::new(self.schema);
        match delete_opt {
            DeleteOption::None => Ok(Vec::new()),
            DeleteOption::Selected => {
                let table = self.schema.table(table_id)?;
                let attribute_id = table.delete_attribute.as_deref().ok_or_else(|| {
                    DbError::schema(format!("table {} has no delete attribute", table_id))
                })?;
                dml.delete_from_list(table_id, attribute_id, container_names, chunk_size)
            }
            DeleteOption::All { .. } => Ok(vec![SqlTemplate::raw(dml.truncate_table_sql(table_id)?)]),
        }
    }

    pub async fn delete(
        &self,
        client: &dyn DbClient,
        table_id: &str,
        container_names: &[String],
        delete_opt: DeleteOption,
    ) -> Result<bool, DbError> {
        let statements = self.delete_statements(
            table_id,
            container_names,
            delete_opt,
            self.config.insert_delete_chunk_size,
        )?;
        Ok(self.executor(client).sql_command(&statements).await)
    }

    fn executor<'c>(&self, client: &'c dyn DbClient) -> SqlExecutor<'c> {
        SqlExecutor::new(client, self.config.warning_action)
    }

    /// Delete pass plus bulk import of one table, in one session.
    async fn import_table(
        &self,
        client: &dyn DbClient,
        table_id: &str,
        path: Option<&Path>,
        container_names: &[String],
        delete_opt: DeleteOption,
    ) -> Result<bool, DbError> {
        let mut statements = self.delete_statements(
            table_id,
            container_names,
            delete_opt,
            self.config.file_delete_chunk_size,
        )?;
        if let Some(path) = path {
            let import = DmlGenerator::new(self.schema).import_table_sql(
                table_id,
                path,
                false,
                &self.config.flat_file,
                self.config.local_infile,
            )?;
            statements.extend(import.into_iter().map(SqlTemplate::raw));
        }
        let ok = self.executor(client).sql_command(&statements).await;
        if ok && self.config.clean_up {
            if let Some(path) = path {
                if let Err(e) = fs::remove_file(path) {
                    warn!("Removing {} failed: {}", path.display(), e);
                }
            }
        }
        Ok(ok)
    }

    /// Imports every file in `load_list`; a failed table does not stop the others.
    pub async fn load_batch_files(
        &self,
        client: &dyn DbClient,
        load_list: &[(String, PathBuf)],
        container_names: &[String],
        delete_opt: DeleteOption,
    ) -> Result<bool, DbError> {
        delete_opt.check_confirmed()?;
        let mut all_ok = true;
        for (table_id, path) in load_list {
            let ok = match self
                .import_table(client, table_id, Some(path), container_names, delete_opt)
                .await
            {
                Ok(ok) => ok,
                Err(e) => {
                    error!("Loading {} from {} failed: {}", table_id, path.display(), e);
                    false
                }
            };
            info!("Loaded {} from {}: {}", table_id, path.display(), ok);
            all_ok &= ok;
        }
        Ok(all_ok)
    }

    /// Inserts `rows` in one transaction, after the delete pass. Null placeholders are not bound.
    pub async fn load_batch_data(
        &self,
        client: &dyn DbClient,
        table_id: &str,
        rows: &[RowRecord],
        container_names: &[String],
        delete_opt: DeleteOption,
    ) -> Result<bool, DbError> {
        let table = self.schema.table(table_id)?;
        let dml = DmlGenerator::new(self.schema);
        let attributes = table.ordered_attributes();

        let mut inserts = Vec::with_capacity(rows.len());
        for row in rows {
            let values: Vec<(&str, String)> = attributes
                .iter()
                .filter_map(|attr| {
                    row.get(&attr.attribute_id)
                        .filter(|v| v.as_str() != attr.null_placeholder())
                        .map(|v| (attr.attribute_id.as_str(), v.clone()))
                })
                .collect();
            if !values.is_empty() {
                inserts.push(dml.insert(table_id, &values)?);
            }
        }

        let deletes = self.delete_statements(
            table_id,
            container_names,
            delete_opt,
            self.config.insert_delete_chunk_size,
        )?;
        Ok(self
            .executor(client)
            .sql_batch_template_command(&inserts, &deletes)
            .await)
    }

    /// Maps `input` and persists every mapped table.
    pub async fn load(
        &self,
        client: &dyn DbClient,
        input: LoadInput<'_>,
        load_type: LoadType,
        delete_opt: DeleteOption,
    ) -> Result<LoadReport, DbError> {
        delete_opt.check_confirmed()?;

        let data = match input {
            LoadInput::Paths(paths) => self.fetch(paths),
            LoadInput::Containers(containers) => self.process(containers),
        };
        let mut report = LoadReport {
            container_names: data.container_names.clone(),
            overflow: data.overflow.clone(),
            failed_sources: data.failed_sources.clone(),
            ..LoadReport::default()
        };
        report.overflow.log_summary();

        let part_name = self.config.part_name.as_str();
        let append = load_type == LoadType::BatchFileAppend;

        for table in self.schema.tables.iter().filter(|t| t.is_mapped()) {
            let table_id = table.table_id.as_str();
            let rows = data.rows(table_id);

            let result = match load_type {
                LoadType::BatchInsert => {
                    self.load_batch_data(client, table_id, rows, &data.container_names, delete_opt)
                        .await
                }
                LoadType::BatchFile | LoadType::BatchFileAppend => {
                    self.load_table_file(client, table_id, rows, &data.container_names, delete_opt, append, part_name)
                        .await
                }
            };
            let ok = match result {
                Ok(ok) => ok && !data.is_failed(table_id),
                Err(e) => {
                    error!("Loading {} failed: {}", table_id, e);
                    false
                }
            };
            info!("Loaded {} rows into {}: {}", rows.len(), table_id, ok);
            report.record(table_id, rows.len(), ok);
        }
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    async fn load_table_file(
        &self,
        client: &dyn DbClient,
        table_id: &str,
        rows: &[RowRecord],
        container_names: &[String],
        delete_opt: DeleteOption,
        append: bool,
        part_name: &str,
    ) -> Result<bool, DbError> {
        let path = if rows.is_empty() {
            None
        } else {
            let table = self.schema.table(table_id)?;
            let path = self.load_file_path(table_id, part_name);
            flatfile::write_table_file(&path, table, rows, &self.config.flat_file, append)?;
            Some(path)
        };
        self.import_table(client, table_id, path.as_deref(), container_names, delete_opt)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::WarningAction,
        db::mocks::{entries, journal, journaling_client, MockDbClientMock},
        models::{
            container::DataCategory,
            schema::fixtures::{attr, direct, simple_schema},
            schema::TableDefinition,
        },
    };
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn containers() -> Vec<DataContainer> {
        vec![
            DataContainer::new("D001")
                .with_category(DataCategory::new("C1", &["x", "y"]).with_row(&["D001", "hello-world"])),
            DataContainer::new("D002")
                .with_category(DataCategory::new("C1", &["x", "y"]).with_row(&["D002", "?"])),
        ]
    }

    fn config(dir: &Path) -> LoaderConfig {
        let mut config = LoaderConfig::default().with_work_path(dir);
        config.warning_action = WarningAction::Ignore;
        config
    }

    #[test]
    fn test_option_parsing() {
        assert_eq!("batch-insert".parse::<LoadType>().unwrap(), LoadType::BatchInsert);
        assert_eq!(
            "truncate".parse::<DeleteOption>().unwrap(),
            DeleteOption::All { confirmed: false }
        );
        assert!("bogus".parse::<DeleteOption>().is_err());
    }

    #[tokio::test]
    async fn test_batch_insert_with_selected_delete() {
        let dir = tempdir().unwrap();
        let schema = simple_schema();
        let loader = SchemaLoader::new(&schema, config(dir.path()));
        let log = journal();
        let client = journaling_client(log.clone(), None);

        let report = loader
            .load(&client, LoadInput::Containers(&containers()), LoadType::BatchInsert, DeleteOption::Selected)
            .await
            .unwrap();

        assert!(report.success());
        assert_eq!(report.overflow.get("T", "B"), Some(11));
        assert_eq!(
            entries(&log),
            vec![
                "DELETE FROM db.t WHERE a IN (?,?) -- [\"D001\", \"D002\"]",
                "INSERT INTO db.t (a,b) VALUES (?,?) -- [\"D001\", \"hello-worl\"]",
                "INSERT INTO db.t (a) VALUES (?) -- [\"D002\"]",
                "COMMIT",
            ]
        );
    }

    #[tokio::test]
    async fn test_batch_file_load() {
        let dir = tempdir().unwrap();
        let schema = simple_schema();
        let loader = SchemaLoader::new(&schema, config(dir.path()));
        let log = journal();
        let client = journaling_client(log.clone(), None);

        let report = loader
            .load(
                &client,
                LoadInput::Containers(&containers()),
                LoadType::BatchFile,
                DeleteOption::truncate_confirmed(),
            )
            .await
            .unwrap();
        assert!(report.success());

        let path = dir.path().join("T-loadable-load.tdd");
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "D001&##&\thello-worl$##$\nD002&##&\t$##$\n");

        let log = entries(&log);
        assert_eq!(log[0], "TRUNCATE TABLE db.t");
        assert!(log[1].starts_with(&format!("LOAD DATA INFILE '{}' INTO TABLE db.t", path.display())));
        assert_eq!(log[2], "COMMIT");
    }

    #[tokio::test]
    async fn test_batch_file_uses_configured_part_name() {
        let dir = tempdir().unwrap();
        let schema = simple_schema();
        let mut cfg = config(dir.path());
        cfg.part_name = "w2".to_string();
        let loader = SchemaLoader::new(&schema, cfg);
        let log = journal();
        let client = journaling_client(log.clone(), None);

        loader
            .load(&client, LoadInput::Containers(&containers()), LoadType::BatchFile, DeleteOption::None)
            .await
            .unwrap();
        let path = dir.path().join("T-loadable-w2.tdd");
        assert!(path.exists());
        assert!(!dir.path().join("T-loadable-load.tdd").exists());
        assert!(entries(&log)[0].contains(&path.display().to_string()));
    }

    #[tokio::test]
    async fn test_batch_insert_keeps_null_marker_text_for_strings() {
        let dir = tempdir().unwrap();
        let schema = simple_schema();
        let loader = SchemaLoader::new(&schema, config(dir.path()));
        let log = journal();
        let client = journaling_client(log.clone(), None);
        let containers = vec![DataContainer::new("D003")
            .with_category(DataCategory::new("C1", &["x", "y"]).with_row(&["D003", "\\N"]))];

        loader
            .load(&client, LoadInput::Containers(&containers), LoadType::BatchInsert, DeleteOption::None)
            .await
            .unwrap();
        assert_eq!(
            entries(&log)[0],
            "INSERT INTO db.t (a,b) VALUES (?,?) -- [\"D003\", \"\\\\N\"]"
        );
    }

    #[tokio::test]
    async fn test_unconfirmed_truncate_is_refused() {
        let dir = tempdir().unwrap();
        let schema = simple_schema();
        let loader = SchemaLoader::new(&schema, config(dir.path()));
        let client = MockDbClientMock::new();

        let result = loader
            .load(
                &client,
                LoadInput::Containers(&containers()),
                LoadType::BatchInsert,
                DeleteOption::All { confirmed: false },
            )
            .await;
        assert!(matches!(result, Err(DbError::Unconfirmed(_))));

        let result = loader
            .delete(&client, "T", &[], DeleteOption::All { confirmed: false })
            .await;
        assert!(matches!(result, Err(DbError::Unconfirmed(_))));
    }

    #[tokio::test]
    async fn test_failed_table_does_not_stop_others() {
        let dir = tempdir().unwrap();
        let mut schema = simple_schema();
        let mut second = TableDefinition {
            table_id: "U".to_string(),
            table_name: "u".to_string(),
            attributes: vec![attr("A", "CHAR", 4, true, 1)],
            attribute_map: vec![direct("A", "C1", "x")],
            delete_attribute: None,
            ..schema.tables[0].clone()
        };
        second.indices.clear();
        schema.tables.push(second);

        let loader = SchemaLoader::new(&schema, config(dir.path()));
        let log = journal();
        let client = journaling_client(log.clone(), Some("db.t "));

        let report = loader
            .load(&client, LoadInput::Containers(&containers()), LoadType::BatchInsert, DeleteOption::None)
            .await
            .unwrap();
        assert!(!report.success());
        assert_eq!(report.failed_tables(), vec!["T"]);
        assert!(report.table("U").unwrap().success);
        assert_eq!(report.table("U").unwrap().rows, 2);
    }

    #[tokio::test]
    async fn test_selected_delete_needs_delete_attribute() {
        let dir = tempdir().unwrap();
        let mut schema = simple_schema();
        schema.tables[0].delete_attribute = None;
        let loader = SchemaLoader::new(&schema, config(dir.path()));
        let client = MockDbClientMock::new();

        let result = loader
            .delete(&client, "T", &["D001".to_string()], DeleteOption::Selected)
            .await;
        assert!(matches!(result, Err(DbError::Schema(_))));
    }

    #[test]
    fn test_delete_statement_chunking() {
        let dir = tempdir().unwrap();
        let schema = simple_schema();
        let loader = SchemaLoader::new(&schema, config(dir.path()));
        let names: Vec<String> = (0..120).map(|i| format!("D{:03}", i)).collect();

        let statements = loader
            .delete_statements("T", &names, DeleteOption::Selected, 50)
            .unwrap();
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[2].params.len(), 20);
        assert!(loader
            .delete_statements("T", &names, DeleteOption::None, 50)
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_make_load_files_and_load_batch_files() {
        let dir = tempdir().unwrap();
        let schema = simple_schema();
        let mut cfg = config(dir.path());
        cfg.clean_up = true;
        let loader = SchemaLoader::new(&schema, cfg);

        let mut source = NamedTempFile::new().unwrap();
        write!(
            source,
            r#"[{{"name": "D100", "categories": [{{"name": "C1", "attributes": ["x", "y"], "rows": [["D100", "v"]]}}]}}]"#
        )
        .unwrap();
        let missing = dir.path().join("missing.json");
        let paths = vec![source.path().to_path_buf(), missing];

        let (names, load_list) = loader.make_load_files(&paths, false, "p1").unwrap();
        assert_eq!(names, vec!["D100"]);
        assert_eq!(load_list.len(), 1);
        assert_eq!(load_list[0].1, dir.path().join("T-loadable-p1.tdd"));
        assert!(load_list[0].1.exists());

        let log = journal();
        let client = journaling_client(log.clone(), None);
        assert!(loader
            .load_batch_files(&client, &load_list, &names, DeleteOption::Selected)
            .await
            .unwrap());
        let log = entries(&log);
        assert_eq!(log[0], "DELETE FROM db.t WHERE a IN (?) -- [\"D100\"]");
        assert!(log[1].starts_with("LOAD DATA INFILE"));
        assert!(!load_list[0].1.exists());
    }

    #[tokio::test]
    async fn test_load_from_paths_reports_unreadable_sources() {
        let dir = tempdir().unwrap();
        let schema = simple_schema();
        let loader = SchemaLoader::new(&schema, config(dir.path()));
        let log = journal();
        let client = journaling_client(log.clone(), None);
        let paths = vec![dir.path().join("absent.json")];

        let report = loader
            .load(&client, LoadInput::Paths(&paths), LoadType::BatchInsert, DeleteOption::None)
            .await
            .unwrap();
        assert_eq!(report.failed_sources, paths);
        assert!(!report.success());
        assert!(entries(&log).is_empty());
    }
}
