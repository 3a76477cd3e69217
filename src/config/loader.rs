use super::HandlerConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File};

const DEFAULT_CONFIG_NAME: &str = "mysql-handler";
const DEFAULT_ENV_PREFIX: &str = "MYSQL_HANDLER";

/// Configuration loader with builder pattern
///
/// Sources are layered: built-in defaults, then a config file, then
/// environment variables such as `MYSQL_HANDLER__DATABASE__HOSTNAME`.
pub struct ConfigLoader {
    config_file: Option<String>,
    load_env: bool,
    env_prefix: String,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            config_file: None,
            load_env: false,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    /// Load configuration from file
    pub fn load_from_file(mut self, path: Option<&str>) -> Self {
        self.config_file = path.map(String::from);
        self
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Result<HandlerConfig> {
        let mut builder =
            Config::builder().add_source(Config::try_from(&HandlerConfig::default())?);

        // An explicit file must exist; the default name is optional
        if let Some(config_path) = &self.config_file {
            builder = builder.add_source(File::with_name(config_path).required(true));
        } else {
            builder = builder.add_source(File::with_name(DEFAULT_CONFIG_NAME).required(false));
        }

        if self.load_env {
            builder = builder.add_source(
                Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("__")
                    .separator("__"),
            );
        }

        let config: HandlerConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[database]
hostname = "db.internal"
username = "app"
password = "s3cret"
database = "names"
port = 3307

[database.session]
sql_mode = "NO_BACKSLASH_ESCAPES"

[logging]
level = "debug"
"#
        )
        .unwrap();

        let config = ConfigLoader::new()
            .load_from_file(file.path().to_str())
            .build()
            .unwrap();

        assert_eq!(config.database.hostname, "db.internal");
        assert_eq!(config.database.port, 3307);
        assert_eq!(config.database.password.expose_secret(), "s3cret");
        assert_eq!(config.database.charset, "utf8mb4");
        assert_eq!(
            config.database.session.get("sql_mode").map(String::as_str),
            Some("NO_BACKSLASH_ESCAPES")
        );
        assert_eq!(config.logging.level, "debug");
        assert!(config.database.validate().is_ok());
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let result = ConfigLoader::new()
            .load_from_file(Some("/nonexistent/mysql-handler.toml"))
            .build();
        assert!(result.is_err());
    }
}
