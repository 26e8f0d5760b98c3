pub mod config;
pub mod db;
pub mod errors;
pub mod loader;
pub mod models;
pub mod sql;

pub use config::{LoaderConfig, WarningAction};
pub use db::{mysql::MySqlClient, DbClient};
pub use errors::DbError;
pub use loader::{DeleteOption, LoadInput, LoadType, SchemaLoader};
pub use models::schema::SchemaDefinition;
