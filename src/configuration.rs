use std::fmt;
use std::time::Duration;

use config::ConfigError;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::auth::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};

const MIN_SECRET_LENGTH: usize = 32;
const MAX_LEEWAY: Duration = Duration::from_secs(5 * 60);
// ten years
const MAX_TOKEN_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    #[serde(default)]
    pub require_ssl: bool,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

impl DatabaseSettings {
    pub fn with_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };
        PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(&self.password)
            .port(self.port)
            .database(&self.database_name)
            .ssl_mode(ssl_mode)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("username", &self.username)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_name", &self.database_name)
            .field("require_ssl", &self.require_ssl)
            .finish_non_exhaustive()
    }
}

/// Token and hashing settings as read from configuration sources
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    pub secret: String,
    #[serde(default = "default_access_token_ttl_secs")]
    pub access_token_ttl_secs: u64, // 2 minutes
    #[serde(default = "default_refresh_token_ttl_secs")]
    pub refresh_token_ttl_secs: u64, // 10 days
    #[serde(default)]
    pub leeway_secs: u64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("refresh_token_ttl_secs", &self.refresh_token_ttl_secs)
            .field("leeway_secs", &self.leeway_secs)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("store_timeout_ms", &self.store_timeout_ms)
            .finish_non_exhaustive()
    }
}

impl AuthSettings {
    pub fn auth_config(&self) -> Result<AuthConfig, ConfigError> {
        let config = AuthConfig {
            secret: self.secret.as_bytes().to_vec(),
            access_token_ttl: Duration::from_secs(self.access_token_ttl_secs),
            refresh_token_ttl: Duration::from_secs(self.refresh_token_ttl_secs),
            leeway: Duration::from_secs(self.leeway_secs),
            store_timeout: Duration::from_millis(self.store_timeout_ms),
            bcrypt_cost: self.bcrypt_cost,
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct LogSettings {
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Immutable configuration handed to the core at construction
#[derive(Clone)]
pub struct AuthConfig {
    pub secret: Vec<u8>,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    /// Clock skew tolerated past an access token's expiry
    pub leeway: Duration,
    /// Bound on every user-store and token-store call
    pub store_timeout: Duration,
    pub bcrypt_cost: u32,
}

impl AuthConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::Message(format!(
                "auth.secret must be at least {} bytes",
                MIN_SECRET_LENGTH
            )));
        }

        if self.access_token_ttl.is_zero() || self.refresh_token_ttl.is_zero() {
            return Err(ConfigError::Message(
                "token ttls must be positive".to_string(),
            ));
        }

        if self.access_token_ttl > MAX_TOKEN_TTL || self.refresh_token_ttl > MAX_TOKEN_TTL {
            return Err(ConfigError::Message(format!(
                "token ttls must not exceed {} seconds",
                MAX_TOKEN_TTL.as_secs()
            )));
        }

        if self.leeway > MAX_LEEWAY || self.leeway >= self.access_token_ttl {
            return Err(ConfigError::Message(format!(
                "auth.leeway_secs must be below auth.access_token_ttl_secs and at most {}",
                MAX_LEEWAY.as_secs()
            )));
        }

        if self.refresh_token_ttl <= self.access_token_ttl {
            return Err(ConfigError::Message(
                "auth.refresh_token_ttl_secs must be greater than auth.access_token_ttl_secs"
                    .to_string(),
            ));
        }

        if self.store_timeout.is_zero() {
            return Err(ConfigError::Message(
                "auth.store_timeout_ms must be positive".to_string(),
            ));
        }

        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            return Err(ConfigError::Message(format!(
                "auth.bcrypt_cost must be within {}..={}",
                MIN_BCRYPT_COST, MAX_BCRYPT_COST
            )));
        }

        Ok(())
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("leeway", &self.leeway)
            .field("store_timeout", &self.store_timeout)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_acquire_timeout_secs() -> u64 {
    3
}

fn default_access_token_ttl_secs() -> u64 {
    2 * 60
}

fn default_refresh_token_ttl_secs() -> u64 {
    14_400 * 60
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_store_timeout_ms() -> u64 {
    3_000
}

/// Load settings from `configuration.yaml` (optional) and `APP_*` environment
/// variables, e.g. `APP_AUTH__SECRET`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_config() -> AuthConfig {
        AuthConfig {
            secret: vec![b'a'; 32],
            access_token_ttl: Duration::from_secs(120),
            refresh_token_ttl: Duration::from_secs(864_000),
            leeway: Duration::ZERO,
            store_timeout: Duration::from_secs(3),
            bcrypt_cost: 4,
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(auth_config().validate().is_ok());
    }

    #[test]
    fn test_short_secret_rejected() {
        let config = AuthConfig {
            secret: b"short".to_vec(),
            ..auth_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_refresh_ttl_must_exceed_access_ttl() {
        let config = AuthConfig {
            refresh_token_ttl: Duration::from_secs(120),
            ..auth_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_leeway_bounds() {
        let huge = AuthConfig {
            leeway: Duration::from_secs(10_000_000_000),
            ..auth_config()
        };
        assert!(huge.validate().is_err());

        let as_long_as_access = AuthConfig {
            leeway: Duration::from_secs(120),
            ..auth_config()
        };
        assert!(as_long_as_access.validate().is_err());

        let modest = AuthConfig {
            leeway: Duration::from_secs(30),
            ..auth_config()
        };
        assert!(modest.validate().is_ok());
    }

    #[test]
    fn test_token_ttl_upper_bound() {
        let refresh = AuthConfig {
            refresh_token_ttl: Duration::from_secs(10_000_000_000_000),
            ..auth_config()
        };
        assert!(refresh.validate().is_err());

        let access = AuthConfig {
            access_token_ttl: MAX_TOKEN_TTL + Duration::from_secs(1),
            refresh_token_ttl: MAX_TOKEN_TTL + Duration::from_secs(2),
            ..auth_config()
        };
        assert!(access.validate().is_err());

        let at_limit = AuthConfig {
            refresh_token_ttl: MAX_TOKEN_TTL,
            ..auth_config()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn test_bcrypt_cost_bounds() {
        let config = AuthConfig {
            bcrypt_cost: 3,
            ..auth_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_store_timeout_rejected() {
        let config = AuthConfig {
            store_timeout: Duration::ZERO,
            ..auth_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", auth_config());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("aaaaaaaa"));
    }

    #[test]
    fn test_settings_defaults() {
        let settings: AuthSettings = serde_json::from_value(serde_json::json!({
            "secret": "s".repeat(40)
        }))
        .unwrap();
        let config = settings.auth_config().unwrap();

        assert_eq!(config.access_token_ttl, Duration::from_secs(120));
        assert_eq!(config.refresh_token_ttl, Duration::from_secs(864_000));
        assert_eq!(config.store_timeout, Duration::from_secs(3));
        assert_eq!(config.leeway, Duration::ZERO);
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
    }
}
