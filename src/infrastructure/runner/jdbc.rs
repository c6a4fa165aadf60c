//! JDBC descriptor runners for relational data sources

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;
use serde_json::Value;

use crate::domain::query::QueryError;
use crate::domain::runner::{QueryRunner, RunOptions};
use crate::domain::DomainError;

/// Relational source types the embedded engine can reach over JDBC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JdbcKind {
    Postgres,
    MySql,
    ClickHouse,
    Hive,
}

impl JdbcKind {
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "pg" | "postgres" | "postgresql" => Some(Self::Postgres),
            "mysql" => Some(Self::MySql),
            "clickhouse" => Some(Self::ClickHouse),
            "hive" => Some(Self::Hive),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Postgres => "pg",
            Self::MySql => "mysql",
            Self::ClickHouse => "clickhouse",
            Self::Hive => "hive",
        }
    }

    pub fn driver(&self) -> &'static str {
        match self {
            Self::Postgres => "org.postgresql.Driver",
            Self::MySql => "com.mysql.cj.jdbc.Driver",
            Self::ClickHouse => "com.clickhouse.jdbc.ClickHouseDriver",
            Self::Hive => "org.apache.hive.jdbc.HiveDriver",
        }
    }

    fn scheme(&self) -> &'static str {
        match self {
            Self::Postgres => "postgresql",
            Self::MySql => "mysql",
            Self::ClickHouse => "clickhouse",
            Self::Hive => "hive2",
        }
    }

    fn default_port(&self) -> u16 {
        match self {
            Self::Postgres => 5432,
            Self::MySql => 3306,
            Self::ClickHouse => 8123,
            Self::Hive => 10000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JdbcOptions {
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default, alias = "username")]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Describes how the embedded engine connects to a relational source.
///
/// Statements are executed by the engine, never in-process.
#[derive(Debug)]
pub struct JdbcDescriptorRunner {
    kind: JdbcKind,
    options: JdbcOptions,
}

impl JdbcDescriptorRunner {
    pub fn new(kind: JdbcKind, options: &Value) -> Result<Self, DomainError> {
        let options: JdbcOptions = serde_json::from_value(options.clone()).map_err(|e| {
            DomainError::validation(format!("Invalid {} options: {}", kind.type_name(), e))
        })?;
        Ok(Self { kind, options })
    }
}

#[async_trait]
impl QueryRunner for JdbcDescriptorRunner {
    fn type_name(&self) -> &str {
        self.kind.type_name()
    }

    async fn run_query(&self, _body: &str, _options: &RunOptions) -> Result<String, QueryError> {
        Err(QueryError::execution(format!(
            "Data source type '{}' does not execute statements in-process",
            self.kind.type_name()
        )))
    }

    async fn teardown(&self) -> Result<(), DomainError> {
        Ok(())
    }

    fn jdbc_driver(&self) -> Option<&str> {
        Some(self.kind.driver())
    }

    fn jdbc_url(&self, catalog: Option<&str>) -> Option<String> {
        let port = self.options.port.unwrap_or(self.kind.default_port());
        let database = catalog
            .or(self.options.database.as_deref())
            .unwrap_or_default();

        let mut url = format!(
            "jdbc:{}://{}:{}/{}",
            self.kind.scheme(),
            self.options.host,
            port,
            database
        );

        let mut params = Vec::new();
        if let Some(user) = &self.options.user {
            params.push(format!("user={}", utf8_percent_encode(user, NON_ALPHANUMERIC)));
        }
        if let Some(password) = &self.options.password {
            params.push(format!(
                "password={}",
                utf8_percent_encode(password, NON_ALPHANUMERIC)
            ));
        }
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }

        Some(url)
    }
}
