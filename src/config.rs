use crate::error::{Result, TelemetryError};
use crate::types::Meta;
use std::path::PathBuf;

pub const DEFAULT_MAX_COUNT: usize = 50_000;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest `count` a single request may ask for
    pub max_count: usize,
    /// Balance-patch JSON replacing the built-in tables
    pub meta_path: Option<PathBuf>,
    /// Credential for the real-data pipeline; unused by the generator
    pub api_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_count: DEFAULT_MAX_COUNT,
            meta_path: None,
            api_token: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            host: get("TELEMETRY_HOST").unwrap_or(defaults.host),
            port: parse_or(get("TELEMETRY_PORT"), "TELEMETRY_PORT", defaults.port)?,
            max_count: parse_or(get("TELEMETRY_MAX_COUNT"), "TELEMETRY_MAX_COUNT", defaults.max_count)?,
            meta_path: get("TELEMETRY_META").map(PathBuf::from),
            api_token: get("PUBG_API_TOKEN"),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reference tables from `meta_path`, or the built-in Erangel tables
    pub fn load_meta(&self) -> Result<Meta> {
        load_meta(self.meta_path.as_deref())
    }

    pub fn log_token_status(&self) {
        if self.api_token.is_some() {
            tracing::info!("PUBG_API_TOKEN found (reserved for real data integration)");
        } else {
            tracing::warn!("PUBG_API_TOKEN not set; expected when serving generated data");
        }
    }
}

pub fn load_meta(path: Option<&std::path::Path>) -> Result<Meta> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path).map_err(|e| TelemetryError::io(path, e))?;
            let meta = Meta::from_json(&json)?;
            tracing::info!(path = %path.display(), "Loaded balance tables");
            Ok(meta)
        }
        None => Ok(Meta::default()),
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| TelemetryError::Config(format!("{key} must be a number, got '{v}'"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_reads_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("TELEMETRY_HOST", "127.0.0.1"),
            ("TELEMETRY_PORT", "8080"),
            ("TELEMETRY_MAX_COUNT", "1000"),
            ("TELEMETRY_META", "balance/patch-12.json"),
            ("PUBG_API_TOKEN", "token"),
        ]))
        .unwrap();

        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(config.max_count, 1000);
        assert_eq!(config.meta_path, Some(PathBuf::from("balance/patch-12.json")));
        assert_eq!(config.api_token.as_deref(), Some("token"));
    }

    #[test]
    fn test_blank_token_is_unset() {
        let config = ServerConfig::from_lookup(lookup(&[("PUBG_API_TOKEN", "  ")])).unwrap();
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_bad_port_is_config_error() {
        let err = ServerConfig::from_lookup(lookup(&[("TELEMETRY_PORT", "http")])).unwrap_err();
        assert!(matches!(err, TelemetryError::Config(_)));
    }

    #[test]
    fn test_load_meta_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patch.json");

        let mut meta = Meta::default();
        meta.weapons[6].weight = 1.0;
        std::fs::write(&path, serde_json::to_string(&meta).unwrap()).unwrap();

        assert_eq!(load_meta(Some(&path)).unwrap(), meta);
        assert_eq!(load_meta(None).unwrap(), Meta::default());
        assert!(load_meta(Some(&dir.path().join("missing.json"))).is_err());
    }
}
