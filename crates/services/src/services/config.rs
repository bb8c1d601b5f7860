use std::{env, fmt, io, path::PathBuf};

use thiserror::Error;

use super::events::DEFAULT_OBSERVER_BUFFER;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const ANY_ORIGIN: &str = "*";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("MC_AUTH_TOKEN must be set to a non-empty bearer token")]
    MissingAuthToken,
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Process configuration, resolved once at startup.
#[derive(Clone)]
pub struct Config {
    pub auth_token: String,
    pub db_path: PathBuf,
    pub allowed_origin: String,
    pub host: String,
    pub port: u16,
    pub event_buffer: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Resolve every setting through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let auth_token = get("MC_AUTH_TOKEN").ok_or(ConfigError::MissingAuthToken)?;

        let db_path = match get("MC_DB_PATH") {
            Some(raw) => PathBuf::from(raw.strip_prefix("sqlite://").unwrap_or(&raw)),
            None => utils::assets::default_db_path()?,
        };

        let port = match get("PORT").or_else(|| get("BACKEND_PORT")) {
            Some(raw) => parse_port(raw)?,
            None => DEFAULT_PORT,
        };

        let event_buffer = match get("MC_EVENT_BUFFER") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(size) if size > 0 => size,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "MC_EVENT_BUFFER",
                        value: raw,
                    });
                }
            },
            None => DEFAULT_OBSERVER_BUFFER,
        };

        Ok(Self {
            auth_token,
            db_path,
            allowed_origin: get("MC_ALLOWED_ORIGIN").unwrap_or_else(|| ANY_ORIGIN.to_string()),
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            event_buffer,
        })
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origin == ANY_ORIGIN
    }
}

/// Launchers sometimes hand over a colourised port; drop ANSI codes first.
fn parse_port(raw: String) -> Result<u16, ConfigError> {
    let cleaned = String::from_utf8(strip_ansi_escapes::strip(raw.as_bytes())).unwrap_or_default();
    cleaned
        .trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::Invalid { name: "PORT", value: raw })
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("auth_token", &"<redacted>")
            .field("db_path", &self.db_path)
            .field("allowed_origin", &self.allowed_origin)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("event_buffer", &self.event_buffer)
            .finish()
    }
}
