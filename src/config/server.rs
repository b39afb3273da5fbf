use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Session token lifetime in seconds. None = tokens never expire.
    pub session_ttl_seconds: Option<i64>,
}

/// Optional `coterie.toml`; every field falls back to the default, and CLI
/// flags override the file.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
    session_ttl_seconds: Option<i64>,
}

impl ServerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(&path)?;
        let file: FileConfig = toml::from_str(&raw).map_err(|e| {
            Error::Config(format!(
                "failed to parse {}: {e}",
                path.as_ref().display()
            ))
        })?;

        let defaults = Self::default();
        Ok(Self {
            host: file.host.unwrap_or(defaults.host),
            port: file.port.unwrap_or(defaults.port),
            data_dir: file.data_dir.unwrap_or(defaults.data_dir),
            session_ttl_seconds: file.session_ttl_seconds.or(defaults.session_ttl_seconds),
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("invalid listen address: {e}")))
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("coterie.db")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            session_ttl_seconds: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_merges_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coterie.toml");
        std::fs::write(&path, "port = 9000\nsession_ttl_seconds = 3600\n").unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.session_ttl_seconds, Some(3600));
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coterie.toml");
        std::fs::write(&path, "port = \"not a number\"").unwrap();

        assert!(ServerConfig::load(&path).is_err());
    }
}
