//! Configuration loader and validator for the campaign console binaries.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::api::Role;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
    #[error("API key for the {role} role is missing: set the {var} environment variable")]
    MissingKey { role: Role, var: String },
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub api: Api,
    pub roles: Roles,
    pub app: App,
}

/// Remote campaign API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Api {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Where each role finds its key. Keys are never stored in the file itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Roles {
    pub content: RoleKey,
    pub manager: RoleKey,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleKey {
    pub key_env: String,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub poll_interval_ms: u64,
    pub download_dir: String,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Ensure required directories exist (creates `app.download_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.download_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.download_dir)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.app.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    fn role_key(&self, role: Role) -> &RoleKey {
        match role {
            Role::Content => &self.roles.content,
            Role::Manager => &self.roles.manager,
        }
    }

    /// Resolve the API key for `role` from the process environment.
    pub fn api_key(&self, role: Role) -> Result<String, ConfigError> {
        self.api_key_with(role, |var| std::env::var(var).ok())
    }

    /// Resolve the API key for `role` through an arbitrary lookup.
    pub fn api_key_with<F>(&self, role: Role, lookup: F) -> Result<String, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = &self.role_key(role).key_env;
        match lookup(var) {
            Some(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(ConfigError::MissingKey {
                role,
                var: var.clone(),
            }),
        }
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    let base = cfg.api.base_url.trim();
    if base.is_empty() {
        return Err(ConfigError::Invalid("api.base_url must be non-empty"));
    }
    if reqwest::Url::parse(base).is_err() {
        return Err(ConfigError::Invalid("api.base_url must be an absolute URL"));
    }
    if cfg.api.timeout_secs == 0 {
        return Err(ConfigError::Invalid("api.timeout_secs must be > 0"));
    }

    if cfg.roles.content.key_env.trim().is_empty() {
        return Err(ConfigError::Invalid("roles.content.key_env must be non-empty"));
    }
    if cfg.roles.manager.key_env.trim().is_empty() {
        return Err(ConfigError::Invalid("roles.manager.key_env must be non-empty"));
    }

    if cfg.app.poll_interval_ms == 0 {
        return Err(ConfigError::Invalid("app.poll_interval_ms must be > 0"));
    }
    if cfg.app.download_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.download_dir must be non-empty"));
    }

    Ok(())
}

/// Returns the example YAML shipped with the binaries.
pub fn example() -> &'static str {
    r#"api:
  base_url: "https://campaign-core.example.com/"
  timeout_secs: 30

roles:
  content:
    key_env: "C_UI_API_KEY"
  manager:
    key_env: "M_UI_API_KEY"

app:
  poll_interval_ms: 5000
  download_dir: "./downloads"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.poll_interval(), Duration::from_secs(5));
    }

    #[test]
    fn timeout_defaults_when_absent() {
        let yaml = example().replace("  timeout_secs: 30\n", "");
        let cfg: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(cfg.api.timeout_secs, 30);
    }

    #[test]
    fn invalid_base_url() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.api.base_url = "".into();
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("api.base_url")), _ => panic!("wrong error") }

        cfg.api.base_url = "not a url".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_role_keys() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.roles.content.key_env = " ".into();
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("roles.content")), _ => panic!("wrong error") }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.roles.manager.key_env = "".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_app_settings() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.poll_interval_ms = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.download_dir = "".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn api_key_resolves_per_role() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        let lookup = |var: &str| match var {
            "C_UI_API_KEY" => Some("content-secret".to_string()),
            "M_UI_API_KEY" => Some(" manager-secret \n".to_string()),
            _ => None,
        };
        assert_eq!(cfg.api_key_with(Role::Content, lookup).unwrap(), "content-secret");
        assert_eq!(cfg.api_key_with(Role::Manager, lookup).unwrap(), "manager-secret");
    }

    #[test]
    fn api_key_missing_or_blank() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        let err = cfg.api_key_with(Role::Manager, |_| None).unwrap_err();
        match err {
            ConfigError::MissingKey { role, var } => {
                assert_eq!(role, Role::Manager);
                assert_eq!(var, "M_UI_API_KEY");
            }
            _ => panic!("wrong error"),
        }
        assert!(cfg.api_key_with(Role::Content, |_| Some("   ".into())).is_err());
    }

    #[test]
    fn ensure_dirs_creates_download_dir() {
        let td = tempdir().unwrap();
        let path = td.path().join("downloads");
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.download_dir = path.to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.roles.content.key_env, "C_UI_API_KEY");
    }
}
