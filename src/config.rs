//! Layered configuration: `config.toml` < `config.local.toml` < `AIQ_*`
//! environment variables (double underscore nests, matching figment's `Env`
//! provider), mirroring the teacher's `Config::load()`.

use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_resources_root")]
    pub resources_root: String,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
}

fn default_resources_root() -> String {
    "resources".to_string()
}

fn default_cache_ttl() -> u64 {
    5
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            resources_root: default_resources_root(),
            cache_ttl_seconds: default_cache_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_ttl")]
    pub ttl_seconds: u64,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
    #[serde(default)]
    pub redis_url: Option<String>,
}

fn default_session_ttl() -> u64 {
    3600
}

fn default_cleanup_interval() -> u64 {
    60
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            ttl_seconds: default_session_ttl(),
            cleanup_interval_seconds: default_cleanup_interval(),
            redis_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_log_max_bytes")]
    pub max_bytes: u64,
    #[serde(default = "default_log_backup_count")]
    pub backup_count: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_max_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_log_backup_count() -> u32 {
    5
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            file: None,
            max_bytes: default_log_max_bytes(),
            backup_count: default_log_backup_count(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Merge defaults, `config.toml`, `config.local.toml`, then
    /// `AIQ_`-prefixed env vars (highest precedence), plus the legacy
    /// bare env vars the reference service reads directly
    /// (`ENGINE_CACHE_TTL_SECONDS`, `SESSION_TTL_SECONDS`,
    /// `SESSION_CLEANUP_INTERVAL`, `REDIS_URL`/`SESSION_REDIS_URL`,
    /// `LOG_LEVEL`, `LOG_FILE`, `LOG_MAX_BYTES`, `LOG_BACKUP_COUNT`).
    pub fn load() -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config.toml"))
            .merge(Toml::file("config.local.toml"))
            .merge(Env::prefixed("AIQ_").split("__"));

        figment = Self::merge_legacy_env(figment);
        figment.extract()
    }

    fn merge_legacy_env(figment: Figment) -> Figment {
        let mut figment = figment;
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            figment = figment.merge(("logging.level", v));
        }
        if let Ok(v) = std::env::var("LOG_FILE") {
            figment = figment.merge(("logging.file", v));
        }
        if let Ok(v) = std::env::var("LOG_MAX_BYTES") {
            figment = figment.merge(("logging.max_bytes", v));
        }
        if let Ok(v) = std::env::var("LOG_BACKUP_COUNT") {
            figment = figment.merge(("logging.backup_count", v));
        }
        if let Ok(v) = std::env::var("ENGINE_CACHE_TTL_SECONDS") {
            figment = figment.merge(("engine.cache_ttl_seconds", v));
        }
        if let Ok(v) = std::env::var("SESSION_TTL_SECONDS") {
            figment = figment.merge(("session.ttl_seconds", v));
        }
        if let Ok(v) = std::env::var("SESSION_CLEANUP_INTERVAL") {
            figment = figment.merge(("session.cleanup_interval_seconds", v));
        }
        let redis_url = std::env::var("SESSION_REDIS_URL")
            .or_else(|_| std::env::var("REDIS_URL"))
            .ok();
        if let Some(v) = redis_url {
            figment = figment.merge(("session.redis_url", v));
        }
        figment
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.engine.cache_ttl_seconds)
    }

    pub fn session_ttl(&self) -> Option<Duration> {
        if self.session.ttl_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.session.ttl_seconds))
        }
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.session.cleanup_interval_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.engine.resources_root, "resources");
        assert_eq!(config.session.ttl_seconds, 3600);
    }

    #[test]
    fn zero_session_ttl_disables_expiry() {
        let mut config = Config::default();
        config.session.ttl_seconds = 0;
        assert!(config.session_ttl().is_none());
    }
}
