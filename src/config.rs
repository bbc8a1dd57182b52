use anyhow::{Context, Result};
use std::{env, str::FromStr};

/// Process configuration, read once at startup.
///
/// | Env var                    | Default   |
/// |----------------------------|-----------|
/// | `DATABASE_URL`             | required  |
/// | `HOST`                     | `0.0.0.0` |
/// | `PORT`                     | `3000`    |
/// | `DATABASE_MAX_CONNECTIONS` | `5`       |
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL not set")?;
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = parse_or("PORT", env::var("PORT").ok().as_deref(), 3000)?;
        let max_connections = parse_or(
            "DATABASE_MAX_CONNECTIONS",
            env::var("DATABASE_MAX_CONNECTIONS").ok().as_deref(),
            5,
        )?;

        Ok(Self {
            database_url,
            host,
            port,
            max_connections,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(name: &str, raw: Option<&str>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value
            .parse()
            .with_context(|| format!("{name} has an invalid value {value:?}")),
    }
}
