//! Environment-driven configuration.
//!
//! Dev gets permissive defaults; prod requires every secret to be set
//! explicitly and fails fast at startup otherwise.

use std::env;

use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub port: u16,
    /// Externally visible origin used to build absolute redirect targets.
    pub base_url: String,
    pub database: DatabaseConfig,
    pub token: TokenConfig,
    pub otp: OtpConfig,
    pub smtp: SmtpConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    /// Symmetric signing secret for capability tokens.
    pub secret: String,
    pub session_ttl_minutes: i64,
    pub long_session_ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtpConfig {
    pub code_ttl_minutes: i64,
    pub link_ttl_minutes: i64,
    pub max_attempts: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = AppConfig {
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("edit-auth-service"), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            port: parse_env("PORT", Some("8080"), is_prod)?,
            base_url: get_env("BASE_URL", Some("http://localhost:3000"), is_prod)?
                .trim_end_matches('/')
                .to_string(),
            database: DatabaseConfig {
                url: get_env(
                    "DATABASE_URL",
                    Some("postgres://localhost/edit_auth"),
                    is_prod,
                )?,
            },
            token: TokenConfig {
                secret: get_env("TOKEN_SECRET", Some("dev-secret"), is_prod)?,
                session_ttl_minutes: parse_env("SESSION_TTL_MINUTES", Some("60"), is_prod)?,
                long_session_ttl_days: parse_env("LONG_SESSION_TTL_DAYS", Some("7"), is_prod)?,
            },
            otp: OtpConfig {
                code_ttl_minutes: parse_env("OTP_TTL_MINUTES", Some("10"), is_prod)?,
                link_ttl_minutes: parse_env("LINK_TTL_MINUTES", Some("30"), is_prod)?,
                max_attempts: parse_env("OTP_MAX_ATTEMPTS", Some("5"), is_prod)?,
            },
            smtp: SmtpConfig {
                host: get_env("SMTP_HOST", Some("localhost"), is_prod)?,
                port: parse_env("SMTP_PORT", Some("587"), is_prod)?,
                user: get_env("SMTP_USER", Some(""), is_prod)?,
                password: get_env("SMTP_PASSWORD", Some(""), is_prod)?,
                from: get_env("EMAIL_FROM", Some("noreply@localhost"), is_prod)?,
            },
            security: SecurityConfig {
                allowed_origins: get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:3000"),
                    is_prod,
                )?
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.token.session_ttl_minutes <= 0 || self.token.long_session_ttl_days <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "token TTLs must be positive"
            )));
        }

        if self.otp.code_ttl_minutes <= 0
            || self.otp.link_ttl_minutes <= 0
            || self.otp.max_attempts <= 0
        {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "OTP policy values must be positive"
            )));
        }

        if self.environment == Environment::Prod {
            if self.token.secret == "dev-secret" || self.token.secret.len() < 32 {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "TOKEN_SECRET must be set to a strong value in production"
                )));
            }

            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
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

fn parse_env<T>(key: &str, default: Option<&str>, is_prod: bool) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, default, is_prod)?.parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("{} is invalid: {}", key, e))
    })
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
