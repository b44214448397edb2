use portal_core::config as core_config;
use portal_core::error::AppError;
use secrecy::{Secret, SecretString};
use std::env;
use std::time::Duration;

use crate::services::UnclassifiedRoutePolicy;

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub identity: IdentityConfig,
    pub access: AccessConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: SecretString,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub api_url: String,
    pub secret_key: SecretString,
    /// Deadline for every provider call, including session lookups in the
    /// access middleware.
    pub timeout_ms: u64,
}

impl IdentityConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone)]
pub struct AccessConfig {
    pub unclassified_routes: UnclassifiedRoutePolicy,
    pub session_cookie: String,
    pub sign_up_cookie: String,
    pub secure_cookies: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            unclassified_routes: UnclassifiedRoutePolicy::Allow,
            session_cookie: "__session".to_string(),
            sign_up_cookie: "__sign_up".to_string(),
            secure_cookies: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

impl PortalConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = PortalConfig {
            common: common_config,
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("portal-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                url: Secret::new(get_env("DATABASE_URL", None, is_prod)?),
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", "10", is_prod)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", "1", is_prod)?,
            },
            identity: IdentityConfig {
                api_url: get_env("IDENTITY_API_URL", None, is_prod)?,
                secret_key: Secret::new(get_env("IDENTITY_SECRET_KEY", None, is_prod)?),
                timeout_ms: parse_env("IDENTITY_TIMEOUT_MS", "5000", is_prod)?,
            },
            access: AccessConfig {
                unclassified_routes: get_env("UNCLASSIFIED_ROUTES", Some("allow"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
                session_cookie: get_env("SESSION_COOKIE", Some("__session"), is_prod)?,
                sign_up_cookie: get_env("SIGN_UP_COOKIE", Some("__sign_up"), is_prod)?,
                secure_cookies: parse_env("SECURE_COOKIES", "false", is_prod)?,
            },
            security: SecurityConfig {
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("http://localhost:3000"), is_prod)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.identity.timeout_ms == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "IDENTITY_TIMEOUT_MS must be positive"
            )));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DATABASE_MIN_CONNECTIONS cannot exceed DATABASE_MAX_CONNECTIONS"
            )));
        }

        if self.environment == Environment::Prod {
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if !self.access.secure_cookies {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "SECURE_COOKIES must be enabled in production"
                )));
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: &str, is_prod: bool) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(default), is_prod)?
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("{}: {}", key, e)))
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
