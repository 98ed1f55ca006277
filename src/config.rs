use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::paths;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:12315/api";
pub const DEFAULT_PAGE: &str = "agenda";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logseq: LogseqConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// `local` or `logseq`. Checked when the backend is created.
    pub mode: Option<String>,
    pub db: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogseqConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    pub token: Option<String>,
    /// Page that receives new tasks when no page is open.
    #[serde(default = "default_page")]
    pub page: String,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_page() -> String {
    DEFAULT_PAGE.to_string()
}

impl Default for LogseqConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token: None,
            page: default_page(),
        }
    }
}

impl Config {
    /// Load config from `~/.agenda/config.toml` (or `AGENDA_CONFIG`).
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(&paths::config_path()))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config: Config = match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
        };
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let endpoint = &self.logseq.endpoint;
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            bail!(
                "failed to parse {}: logseq.endpoint must be an http(s) URL, got '{endpoint}'",
                path.display()
            );
        }
        if self.logseq.page.trim().is_empty() {
            bail!("failed to parse {}: logseq.page must not be empty", path.display());
        }
        Ok(())
    }

    /// Storage mode name, `local` unless configured.
    pub fn mode(&self) -> &str {
        self.storage.mode.as_deref().unwrap_or("local")
    }

    pub fn db_path(&self) -> String {
        self.storage.db.clone().unwrap_or_else(paths::db_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_returns_default() {
        let config = Config::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.mode(), "local");
        assert_eq!(config.logseq.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.logseq.page, DEFAULT_PAGE);
        assert!(config.logseq.token.is_none());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[storage]
mode = "logseq"
db = "/tmp/agenda-test.db"

[logseq]
endpoint = "http://localhost:9999/api"
token = "secret"
page = "inbox"
"#;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(toml.as_bytes()).unwrap();

        let config = Config::load_from(f.path()).unwrap();
        assert_eq!(config.mode(), "logseq");
        assert_eq!(config.db_path(), "/tmp/agenda-test.db");
        assert_eq!(config.logseq.endpoint, "http://localhost:9999/api");
        assert_eq!(config.logseq.token.as_deref(), Some("secret"));
        assert_eq!(config.logseq.page, "inbox");
    }

    #[test]
    fn partial_logseq_section_keeps_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"[logseq]\ntoken = \"t\"\n").unwrap();

        let config = Config::load_from(f.path()).unwrap();
        assert_eq!(config.logseq.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.logseq.page, DEFAULT_PAGE);
    }

    #[test]
    fn invalid_toml_returns_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"not valid toml [[[").unwrap();
        assert!(Config::load_from(f.path()).is_err());
    }

    #[test]
    fn misspelled_field_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"[storage]\nmdoe = \"local\"\n").unwrap();
        let err = Config::load_from(f.path()).unwrap_err();
        assert!(format!("{err:#}").contains("mdoe"));
    }

    #[test]
    fn bad_endpoint_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"[logseq]\nendpoint = \"localhost:12315\"\n").unwrap();
        assert!(Config::load_from(f.path()).is_err());
    }
}
