// common/src/config.rs
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use config::{Config as ConfigFile, File, Environment};

/// Central configuration for the identity core and the web server
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub web_server_addr: String,
    pub log_level: String,

    pub storage: StorageConfig,
    pub security: SecurityConfig,
    pub session: SessionConfig,
    pub wallet: WalletConfig,
    pub rate_limit: RateLimitConfig,
    pub static_files: StaticFilesConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// JSON file used by the file backend
    pub path: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub min_password_len: usize,
    pub kdf: KdfConfig,
    pub jwt_secret: String,
}

/// Argon2id cost parameters for wallet key encryption
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfConfig {
    /// Memory cost in KiB
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Idle lifetime of a client context in seconds
    pub ttl_seconds: i64,
    pub cleanup_interval_seconds: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Network label written into new wallet metadata
    pub default_network: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_seconds: u64,
    pub paths: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    pub path: String,
    pub index: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web_server_addr: "127.0.0.1:8081".to_string(),
            log_level: "info".to_string(),
            storage: StorageConfig::default(),
            security: SecurityConfig::default(),
            session: SessionConfig::default(),
            wallet: WalletConfig::default(),
            rate_limit: RateLimitConfig::default(),
            static_files: StaticFilesConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            path: "./data/vanguard-store.json".to_string(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            min_password_len: 8,
            kdf: KdfConfig::default(),
            jwt_secret: "dev_jwt_secret".to_string(),
        }
    }
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            m_cost: 19_456, // 19 MiB
            t_cost: 2,
            p_cost: 1,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "vanguard_client".to_string(),
            ttl_seconds: 86400,
            cleanup_interval_seconds: 3600,
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            default_network: "chainvanguard-mainnet".to_string(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window_seconds: 60,
            paths: vec![
                "/api/auth/login".to_string(),
                "/api/register/complete".to_string(),
                "/api/wallets/recover".to_string(),
            ],
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            path: "./static".to_string(),
            index: "index.html".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        let config = ConfigFile::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // APP__SECURITY__JWT_SECRET=... style overrides
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load from files, falling back to plain environment variables
    pub fn from_env() -> Self {
        match Self::load() {
            Ok(config) => {
                tracing::info!("Configuration loaded from files and environment");
                config
            },
            Err(e) => {
                tracing::warn!("Failed to load configuration from files: {}", e);
                tracing::info!("Falling back to environment variables only");

                let defaults = Self::default();

                let web_server_addr = env::var("WEB_SERVER_ADDR")
                    .unwrap_or(defaults.web_server_addr);

                let log_level = env::var("LOG_LEVEL")
                    .unwrap_or(defaults.log_level);

                let backend = match env::var("STORAGE_BACKEND").map(|v| v.to_lowercase()) {
                    Ok(v) if v == "memory" => StorageBackend::Memory,
                    Ok(v) if v == "file" => StorageBackend::File,
                    _ => defaults.storage.backend,
                };

                let storage_path = env::var("STORAGE_PATH")
                    .unwrap_or(defaults.storage.path);

                let jwt_secret = env::var("JWT_SECRET")
                    .unwrap_or_else(|_| defaults.security.jwt_secret.clone());

                let min_password_len = env::var("MIN_PASSWORD_LEN")
                    .ok()
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(defaults.security.min_password_len);

                let ttl_seconds = env::var("SESSION_TTL")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok())
                    .unwrap_or(defaults.session.ttl_seconds);

                let static_files_path = env::var("STATIC_FILES_PATH")
                    .unwrap_or_else(|_| defaults.static_files.path.clone());

                Self {
                    web_server_addr,
                    log_level,
                    storage: StorageConfig {
                        backend,
                        path: storage_path,
                    },
                    security: SecurityConfig {
                        min_password_len,
                        jwt_secret,
                        ..defaults.security
                    },
                    session: SessionConfig {
                        ttl_seconds,
                        ..defaults.session
                    },
                    static_files: StaticFilesConfig {
                        path: static_files_path,
                        ..defaults.static_files
                    },
                    ..Self::default()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_usable() {
        let config = Config::default();
        assert_eq!(config.security.min_password_len, 8);
        assert_eq!(config.session.cookie_name, "vanguard_client");
        assert!(config.rate_limit.paths.iter().any(|p| p == "/api/auth/login"));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config = serde_json::from_str(
            r#"{ "storage": { "backend": "memory" }, "security": { "min_password_len": 12 } }"#,
        )
        .unwrap();

        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.path, StorageConfig::default().path);
        assert_eq!(config.security.min_password_len, 12);
        assert_eq!(config.security.kdf.t_cost, KdfConfig::default().t_cost);
    }
}
