use crate::error::{Error, Result};
use crate::services::workflow_service::TransitionPolicy;
use chrono::{FixedOffset, Offset, Utc};
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub jwt_secret: String,
    /// Absent means candidates are kept in memory for the lifetime of the process.
    pub database_url: Option<String>,
    pub transition_policy: TransitionPolicy,
    pub utc_offset_hours: i32,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let utc_offset_hours = get_env_or("PIPELINE_UTC_OFFSET_HOURS", 7)?;
        if !(-12..=14).contains(&utc_offset_hours) {
            return Err(Error::Config(format!(
                "PIPELINE_UTC_OFFSET_HOURS out of range: {}",
                utc_offset_hours
            )));
        }

        let log_format = match env::var("LOG_FORMAT").ok().as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(Error::Config(format!("Invalid value for LOG_FORMAT: {}", other)))
            }
        };

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            jwt_secret: get_env("JWT_SECRET")?,
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()),
            transition_policy: get_env_or("TRANSITION_POLICY", TransitionPolicy::Permissive)?,
            utc_offset_hours,
            log_format,
        })
    }

    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .unwrap_or_else(|| Utc.fix())
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}
