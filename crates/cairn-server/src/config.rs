use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use tracing::warn;

/// Placeholder signing key used when `CAIRN_JWT_SECRET` is unset.
pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
}

impl ServerConfig {
    /// Read the `CAIRN_*` variables from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = lookup("CAIRN_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match lookup("CAIRN_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("CAIRN_PORT is not a port number: {raw:?}"))?,
            None => 3000,
        };
        let db_path = lookup("CAIRN_DB_PATH").unwrap_or_else(|| "cairn.db".into()).into();
        let jwt_secret = lookup("CAIRN_JWT_SECRET").unwrap_or_else(|| {
            warn!("CAIRN_JWT_SECRET is not set, using the development placeholder");
            DEV_JWT_SECRET.into()
        });

        Ok(Self {
            host,
            port,
            db_path,
            jwt_secret,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.db_path, PathBuf::from("cairn.db"));
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(config.addr().unwrap().port(), 3000);
    }

    #[test]
    fn values_are_read_from_the_environment() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("CAIRN_HOST", "127.0.0.1"),
            ("CAIRN_PORT", "8080"),
            ("CAIRN_DB_PATH", "/tmp/chat.db"),
            ("CAIRN_JWT_SECRET", "hunter2"),
        ]))
        .unwrap();
        assert_eq!(config.addr().unwrap().to_string(), "127.0.0.1:8080");
        assert_eq!(config.db_path, PathBuf::from("/tmp/chat.db"));
        assert_eq!(config.jwt_secret, "hunter2");
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(ServerConfig::from_lookup(lookup(&[("CAIRN_PORT", "http")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("CAIRN_PORT", "70000")])).is_err());
    }
}
