use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DashError, Result};

/// Application configuration
///
/// Every field has a default; `from_env` and `from_file` override only what
/// they find.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    /// Title of the browser page
    pub title: String,

    /// Interface the server binds to
    pub host: String,

    pub port: u16,

    /// Path prefix every route is served under, e.g. `/` or `/dash/`
    pub url_base: String,

    /// Directory served under `{url_base}assets`
    pub assets_dir: PathBuf,

    /// Directory of the flat-file cache
    pub cache_dir: PathBuf,

    /// Cache entries older than this are treated as absent
    pub cache_max_age_secs: Option<u64>,

    /// Allow cross-origin requests
    pub cors: bool,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            title: "Dash".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8050,
            url_base: "/".to_string(),
            assets_dir: PathBuf::from("assets"),
            cache_dir: PathBuf::from(".dashkit-cache"),
            cache_max_age_secs: None,
            cors: false,
        }
    }
}

impl DashConfig {
    /// Defaults overridden by `DASHKIT_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::default().merge_env(|key| env::var(key).ok())
    }

    /// Reads a JSON configuration file; missing fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let config: DashConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    fn merge_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(title) = lookup("DASHKIT_TITLE") {
            self.title = title;
        }
        if let Some(host) = lookup("DASHKIT_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("DASHKIT_PORT") {
            self.port = port
                .parse()
                .map_err(|_| DashError::Config(format!("invalid DASHKIT_PORT '{}'", port)))?;
        }
        if let Some(base) = lookup("DASHKIT_URL_BASE") {
            self.url_base = base;
        }
        if let Some(dir) = lookup("DASHKIT_ASSETS_DIR") {
            self.assets_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("DASHKIT_CACHE_DIR") {
            self.cache_dir = PathBuf::from(dir);
        }
        if let Some(age) = lookup("DASHKIT_CACHE_MAX_AGE") {
            self.cache_max_age_secs = Some(age.parse().map_err(|_| {
                DashError::Config(format!("invalid DASHKIT_CACHE_MAX_AGE '{}'", age))
            })?);
        }
        if let Some(cors) = lookup("DASHKIT_CORS") {
            self.cors = matches!(cors.as_str(), "1" | "true" | "yes");
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.url_base.starts_with('/') || !self.url_base.ends_with('/') {
            return Err(DashError::Config(format!(
                "url_base '{}' must start and end with '/'",
                self.url_base
            )));
        }
        if self.port == 0 {
            return Err(DashError::Config("port must be non-zero".to_string()));
        }
        Ok(())
    }

    /// `host:port` as passed to the listener
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Joins `path` onto the url base
    pub fn route(&self, path: &str) -> String {
        format!("{}{}", self.url_base, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_defaults() {
        let config = DashConfig::default()
            .merge_env(lookup_from(&[
                ("DASHKIT_PORT", "9000"),
                ("DASHKIT_URL_BASE", "/dash/"),
                ("DASHKIT_CORS", "true"),
            ]))
            .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.route("_dash-layout"), "/dash/_dash-layout");
        assert!(config.cors);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(
            DashConfig::default()
                .merge_env(lookup_from(&[("DASHKIT_PORT", "http")]))
                .is_err()
        );
        assert!(
            DashConfig::default()
                .merge_env(lookup_from(&[("DASHKIT_URL_BASE", "dash")]))
                .is_err()
        );
    }

    #[test]
    fn file_keeps_unset_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dash.json");
        fs::write(&path, r#"{"title": "Sales", "port": 8080}"#).unwrap();
        let config = DashConfig::from_file(&path).unwrap();
        assert_eq!(config.title, "Sales");
        assert_eq!(config.port, 8080);
        assert_eq!(config.url_base, "/");
        assert_eq!(config.address(), "127.0.0.1:8080");
    }
}
