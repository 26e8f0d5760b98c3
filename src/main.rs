use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dbload::{
    db::adapter::DbAdapter,
    models::connections::ConnectionConfig,
    sql::ddl::DdlGenerator,
    DbClient, DbError, DeleteOption, LoadInput, LoadType, LoaderConfig, MySqlClient,
    SchemaDefinition, SchemaLoader,
};
use log::info;

#[derive(Parser)]
#[command(name = "dbload")]
#[command(about = "Schema-driven DDL generation and batch loading for MySQL")]
#[command(version)]
struct Cli {
    /// Schema definition (JSON)
    #[arg(short, long, global = true, default_value = "schema.json")]
    schema: PathBuf,
    /// Loader configuration (JSON); defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the DDL that recreates the schema
    Ddl,
    /// Drop and recreate the database with every table and index
    Create {
        /// Required: the database is dropped first
        #[arg(long)]
        confirm: bool,
    },
    /// Map container files into per-table flat files under the work path
    MakeLoadFiles {
        /// Suffix of the generated file names; overrides the configured one
        #[arg(long)]
        part: Option<String>,
        /// Append to existing load files
        #[arg(long)]
        append: bool,
        files: Vec<PathBuf>,
    },
    /// Map container files and load them
    Load {
        /// batch-file, batch-file-append or batch-insert
        #[arg(long, default_value = "batch-file")]
        mode: String,
        /// none, selected or all
        #[arg(long, default_value = "none")]
        delete: String,
        /// Confirms `--delete all`
        #[arg(long)]
        confirm: bool,
        /// Write truncated-value lengths as CSV
        #[arg(long)]
        overflow_report: Option<PathBuf>,
        /// Suffix of the generated load files; overrides the configured one
        #[arg(long)]
        part: Option<String>,
        files: Vec<PathBuf>,
    },
    /// List the tables of the connected database
    Tables,
}

async fn connect() -> Result<MySqlClient, DbError> {
    let config = ConnectionConfig::from_env()?;
    MySqlClient::connect_with(&config).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let schema = SchemaDefinition::from_file(&cli.schema)?;
    let config = match &cli.config {
        Some(path) => LoaderConfig::from_file(path)?,
        None => LoaderConfig::default(),
    };

    match cli.command {
        Commands::Ddl => {
            for statement in DdlGenerator::new(&schema).create_schema_sql()? {
                println!("{};", statement);
            }
        }
        Commands::Create { confirm } => {
            let client = connect().await?;
            let adapter = DbAdapter::new(&schema, &client, config.warning_action);
            if !adapter.create_schema(confirm).await? {
                return Err(DbError::General(format!("creating {} failed", schema.database_name)).into());
            }
            info!("Created database {}", schema.database_name);
        }
        Commands::MakeLoadFiles {
            part,
            append,
            files,
        } => {
            let part = part.unwrap_or_else(|| config.part_name.clone());
            let loader = SchemaLoader::new(&schema, config);
            let (names, load_list) = loader.make_load_files(&files, append, &part)?;
            info!("Read {} containers", names.len());
            for (table_id, path) in load_list {
                println!("{}\t{}", table_id, path.display());
            }
        }
        Commands::Load {
            mode,
            delete,
            confirm,
            overflow_report,
            part,
            files,
        } => {
            let load_type: LoadType = mode.parse()?;
            let delete_opt = match delete.parse::<DeleteOption>()? {
                DeleteOption::All { .. } => DeleteOption::All { confirmed: confirm },
                other => other,
            };
            let mut config = config;
            if let Some(part) = part {
                config.part_name = part;
                config.validate()?;
            }
            let client = connect().await?;
            let loader = SchemaLoader::new(&schema, config);
            let report = loader
                .load(&client, LoadInput::Paths(&files), load_type, delete_opt)
                .await?;

            for status in &report.tables {
                println!(
                    "{}\t{}\t{}",
                    status.table_id,
                    status.rows,
                    if status.success { "ok" } else { "failed" }
                );
            }
            if let Some(path) = overflow_report {
                report.overflow.write_csv(&path)?;
            }
            if !report.success() {
                return Err(DbError::General(format!(
                    "load failed for tables {:?} and sources {:?}",
                    report.failed_tables(),
                    report.failed_sources
                ))
                .into());
            }
        }
        Commands::Tables => {
            let client = connect().await?;
            for table in client.list_tables().await? {
                println!("{}", table);
            }
        }
    }

    Ok(())
}
