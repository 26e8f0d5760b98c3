pub mod connections;
pub mod container;
pub mod schema;
