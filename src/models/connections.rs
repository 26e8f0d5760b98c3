use std::env;

use serde::{Deserialize, Serialize};

use crate::errors::DbError;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ConnectionConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl ConnectionConfig {
    /// `DATABASE_URL` wins; otherwise the URL is assembled from the `MYSQL_DB_*` variables.
    pub fn from_env() -> Result<Self, DbError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, DbError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_connections = match lookup("MYSQL_MAX_CONNECTIONS") {
            Some(v) => v
                .parse::<u32>()
                .map_err(|e| DbError::Config(format!("MYSQL_MAX_CONNECTIONS: {}", e)))?,
            None => 5,
        };

        if let Some(url) = lookup("DATABASE_URL").filter(|u| !u.is_empty()) {
            return Ok(Self {
                database_url: url,
                max_connections,
            });
        }

        let host = lookup("MYSQL_DB_HOST").unwrap_or_else(|| "localhost".to_string());
        let port = match lookup("MYSQL_DB_PORT") {
            Some(p) => p
                .parse::<u16>()
                .map_err(|e| DbError::Config(format!("MYSQL_DB_PORT: {}", e)))?,
            None => 3306,
        };
        let user = lookup("MYSQL_DB_USER").unwrap_or_else(|| "root".to_string());
        let password = lookup("MYSQL_DB_PW").unwrap_or_default();
        let database = lookup("MYSQL_DB_NAME").unwrap_or_else(|| "mysql".to_string());

        let credentials = if password.is_empty() {
            urlencoding::encode(&user).into_owned()
        } else {
            format!("{}:{}", urlencoding::encode(&user), urlencoding::encode(&password))
        };
        let mut database_url = format!("mysql://{}@{}:{}/{}", credentials, host, port, database);
        if let Some(socket) = lookup("MYSQL_DB_SOCKET").filter(|s| !s.is_empty()) {
            database_url.push_str(&format!("?socket={}", socket));
        }

        Ok(Self {
            database_url,
            max_connections,
        })
    }
}
