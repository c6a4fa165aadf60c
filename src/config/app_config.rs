use std::time::Duration;

use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub olap: OlapConfig,
    pub pool: PoolConfig,
    pub cache: CacheConfig,
    pub catalog: CatalogConfig,
    pub queue: QueueConfig,
    pub metrics: MetricsConfig,
    pub models: ModelsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Embedded OLAP engine endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OlapConfig {
    pub host: String,
    pub port: u16,
    pub timeout_secs: u64,
}

/// Connection pool lifetimes
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub idle_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    #[serde(alias = "in_memory", alias = "inmemory")]
    Memory,
    Redis,
}

/// Hot-tier result cache
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: StoreBackend,
    pub redis_url: Option<String>,
    pub hot_ttl_secs: u64,
    pub max_capacity: u64,
}

/// Shared catalog registry
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub backend: StoreBackend,
    pub redis_url: Option<String>,
    pub set_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Concurrency of the `main` lane
    pub main_concurrency: usize,
    /// Queued runs allowed before submissions are rejected
    pub max_pending: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub path: String,
}

/// Semantic model documents loaded at startup
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Directory of `*.json` model documents
    pub directory: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8090,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for OlapConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            timeout_secs: 30,
        }
    }
}

impl OlapConfig {
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn xmla_url(&self) -> String {
        format!("http://{}/xmla", self.endpoint())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: 600,
            sweep_interval_secs: 600,
        }
    }
}

impl PoolConfig {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            redis_url: None,
            hot_ttl_secs: 600,
            max_capacity: 10_000,
        }
    }
}

impl CacheConfig {
    pub fn hot_ttl(&self) -> Duration {
        Duration::from_secs(self.hot_ttl_secs)
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            redis_url: None,
            set_name: "XmlaConnection".to_string(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            main_concurrency: 20,
            max_pending: 10_000,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut app: Self = config.try_deserialize()?;
        app.apply_olap_overrides(
            std::env::var("OLAP_HOST").ok(),
            std::env::var("OLAP_PORT").ok(),
        )?;
        Ok(app)
    }

    /// `OLAP_HOST` / `OLAP_PORT` take precedence over layered sources
    fn apply_olap_overrides(
        &mut self,
        host: Option<String>,
        port: Option<String>,
    ) -> Result<(), config::ConfigError> {
        if let Some(host) = host.filter(|h| !h.is_empty()) {
            self.olap.host = host;
        }
        if let Some(port) = port.filter(|p| !p.is_empty()) {
            self.olap.port = port.parse().map_err(|_| {
                config::ConfigError::Message(format!("Invalid OLAP_PORT '{}'", port))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.olap.xmla_url(), "http://localhost:8080/xmla");
        assert_eq!(config.olap.timeout(), Duration::from_secs(30));
        assert_eq!(config.pool.idle_ttl(), Duration::from_secs(600));
        assert_eq!(config.cache.hot_ttl(), Duration::from_secs(600));
        assert_eq!(config.catalog.set_name, "XmlaConnection");
        assert_eq!(config.queue.main_concurrency, 20);
        assert_eq!(config.server.port, 8090);
    }

    #[test]
    fn test_olap_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_olap_overrides(Some("olap.internal".to_string()), Some("9090".to_string()))
            .unwrap();

        assert_eq!(config.olap.endpoint(), "olap.internal:9090");
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = AppConfig::default();
        let result = config.apply_olap_overrides(None, Some("not-a-port".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_partial_sections_deserialize() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "cache": {"backend": "redis", "redis_url": "redis://cache:6379"},
            "queue": {"main_concurrency": 4}
        }))
        .unwrap();

        assert_eq!(config.cache.backend, StoreBackend::Redis);
        assert_eq!(config.cache.hot_ttl_secs, 600);
        assert_eq!(config.queue.main_concurrency, 4);
        assert_eq!(config.queue.max_pending, 10_000);
    }
}
