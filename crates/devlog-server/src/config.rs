use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Placeholder session secret that should never reach production.
pub const PLACEHOLDER_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub public_dir: PathBuf,
    pub public_url: String,
    pub session_secret: String,
    pub admin_username: String,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset and empty values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let port = match get("DEVLOG_PORT") {
            Some(port) => port
                .parse::<u16>()
                .with_context(|| format!("DEVLOG_PORT is not a port number: {}", port))?,
            None => 3000,
        };

        Ok(Self {
            host: get("DEVLOG_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: get("DEVLOG_DB_PATH").unwrap_or_else(|| "devlog.db".into()).into(),
            public_dir: get("DEVLOG_PUBLIC_DIR").unwrap_or_else(|| "public".into()).into(),
            public_url: get("DEVLOG_PUBLIC_URL").unwrap_or_default(),
            session_secret: get("DEVLOG_SESSION_SECRET").unwrap_or_else(|| PLACEHOLDER_SECRET.into()),
            admin_username: get("DEVLOG_ADMIN_USERNAME").unwrap_or_else(|| "admin".into()),
            admin_password: get("DEVLOG_ADMIN_PASSWORD"),
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.public_dir.join("uploads")
    }
}
