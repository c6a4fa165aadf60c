//! CLI module for the OLAP query gateway
//!
//! Provides subcommands:
//! - `serve`: operational endpoints, connection pool sweeper and execution queue
//! - `publish`: publish the catalogs of a semantic model document

pub mod publish;
pub mod serve;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// OLAP Query Gateway - routes, caches and audits semantic model queries
#[derive(Parser)]
#[command(name = "olap-query-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the gateway
    Serve,

    /// Publish the catalogs of a semantic model JSON document
    Publish(publish::PublishArgs),
}

/// Loads `.env`, the layered configuration and the log subscriber
pub(crate) fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_publish() {
        let cli = Cli::try_parse_from(["olap-query-gateway", "publish", "--model", "sales.json"])
            .unwrap();

        match cli.command {
            Command::Publish(args) => assert_eq!(args.model.to_str(), Some("sales.json")),
            Command::Serve => panic!("expected publish"),
        }
    }

    #[test]
    fn test_publish_requires_model() {
        assert!(Cli::try_parse_from(["olap-query-gateway", "publish"]).is_err());
    }
}
