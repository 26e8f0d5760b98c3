pub mod condition;
pub mod ddl;
pub mod dml;
pub mod query;
