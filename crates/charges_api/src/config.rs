//! Service configuration
//!
//! Layered lowest to highest: built-in defaults, an optional TOML file,
//! `CHARGES_*` environment variables. Command line flags are applied on top
//! by the binary.

use anyhow::{bail, Context, Result};
use charges_core::DEFAULT_ARTIFACT_PATH;
use config::{Config, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file picked up when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "config/charges-api.toml";

/// Prefix for environment overrides, e.g. `CHARGES_PORT`
pub const ENV_PREFIX: &str = "CHARGES";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub static_dir: PathBuf,
    pub log_level: String,
    pub log_format: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            model_path: PathBuf::from(DEFAULT_ARTIFACT_PATH),
            static_dir: PathBuf::from("crates/charges_api/static"),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl ApiConfig {
    /// Resolve configuration from defaults, file and environment.
    ///
    /// An explicitly requested file must exist; the default file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let resolved_path = match explicit {
            Some(path) => {
                if !path.exists() {
                    bail!(
                        "Configuration file {} not found (specified via --config)",
                        path.display()
                    );
                }
                Some(path.to_path_buf())
            }
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_PATH);
                path.exists().then_some(path)
            }
        };

        Self::load_with(resolved_path.as_deref(), Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with(file: Option<&Path>, env: Environment) -> Result<Self> {
        let defaults = Self::default();

        let mut builder = Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("model_path", defaults.model_path.to_string_lossy().into_owned())?
            .set_default("static_dir", defaults.static_dir.to_string_lossy().into_owned())?
            .set_default("log_level", defaults.log_level)?
            .set_default("log_format", defaults.log_format)?;

        if let Some(path) = file {
            builder = builder.add_source(ConfigFile::from(path));
        }

        builder = builder.add_source(env);

        let config = builder
            .build()
            .context("failed to assemble configuration")?
            .try_deserialize::<ApiConfig>()
            .context("invalid configuration value")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            bail!("host must not be empty");
        }
        if self.port == 0 {
            bail!("port must be greater than zero");
        }
        if self.model_path.as_os_str().is_empty() {
            bail!("model_path must not be empty");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn no_env() -> Environment {
        Environment::with_prefix(ENV_PREFIX).source(Some(HashMap::new()))
    }

    #[test]
    fn defaults_without_sources() {
        let config = ApiConfig::load_with(None, no_env()).unwrap();
        assert_eq!(config, ApiConfig::default());
        assert_eq!(config.bind_addr(), "127.0.0.1:8000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "port = 9100\nlog_format = \"json\"").unwrap();

        let config = ApiConfig::load_with(Some(file.path()), no_env()).unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.log_format, "json");
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "port = 9100").unwrap();

        let env = Environment::with_prefix(ENV_PREFIX).source(Some(HashMap::from([
            ("CHARGES_PORT".to_string(), "9200".to_string()),
            ("CHARGES_MODEL_PATH".to_string(), "/srv/model.json".to_string()),
        ])));

        let config = ApiConfig::load_with(Some(file.path()), env).unwrap();
        assert_eq!(config.port, 9200);
        assert_eq!(config.model_path, PathBuf::from("/srv/model.json"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = ApiConfig::load(Some(Path::new("/nonexistent/charges-api.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn validate_rejects_port_zero_and_empty_host() {
        let config = ApiConfig {
            port: 0,
            ..ApiConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ApiConfig {
            host: " ".to_string(),
            ..ApiConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
