//! Configuration loading
//!
//! Sources, lowest to highest priority:
//! 1. Built-in defaults
//! 2. `stepwise.toml` in the working directory (optional), or the file given
//!    with `--config` / `STEPWISE_CONFIG_PATH` (required when given)
//! 3. `STEPWISE_*` environment variables, `__` separating sections
//!    (`STEPWISE_PARSER__STRICT=true`)
//! 4. Explicit builder overrides (CLI flags)

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub parser: ParserConfig,
    pub log: LogConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParserConfig {
    /// Reject malformed STEP lines and unbalanced blocks instead of skipping them
    pub strict: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is unset
    pub filter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Print the program's return value after `stepwise run`
    pub print_result: bool,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load with no overrides
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    strict: Option<bool>,
    log_filter: Option<String>,
}

impl ConfigBuilder {
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn strict(mut self, strict: Option<bool>) -> Self {
        self.strict = strict;
        self
    }

    pub fn log_filter(mut self, filter: Option<String>) -> Self {
        self.log_filter = filter;
        self
    }

    pub fn build(self) -> Result<Config> {
        let config_path = self
            .config_path
            .or_else(|| std::env::var("STEPWISE_CONFIG_PATH").ok().map(PathBuf::from));

        let mut builder = ::config::Config::builder()
            .set_default("parser.strict", false)?
            .set_default("log.filter", "warn")?
            .set_default("run.print_result", true)?;

        builder = match &config_path {
            Some(path) => builder.add_source(::config::File::from(path.clone()).required(true)),
            None => builder.add_source(::config::File::with_name("stepwise").required(false)),
        };

        let settings = builder
            .add_source(
                ::config::Environment::with_prefix("STEPWISE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("parser.strict", self.strict)?
            .set_override_option("log.filter", self.log_filter)?
            .build()
            .with_context(|| match &config_path {
                Some(path) => format!("Failed to read config file {}", path.display()),
                None => "Failed to read configuration".to_string(),
            })?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::builder().build().unwrap();
        assert!(!config.parser.strict);
        assert_eq!(config.log.filter, "warn");
        assert!(config.run.print_result);
    }

    #[test]
    fn test_overrides_win() {
        let config = Config::builder()
            .strict(Some(true))
            .log_filter(Some("stepwise_core=debug".to_string()))
            .build()
            .unwrap();
        assert!(config.parser.strict);
        assert_eq!(config.log.filter, "stepwise_core=debug");
    }

    #[test]
    fn test_config_file() {
        let path = std::env::temp_dir().join(format!("stepwise-config-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[run]\nprint_result = false\n\n[parser]\nstrict = true").unwrap();

        let config = Config::builder().config_path(Some(path.clone())).build().unwrap();
        assert!(config.parser.strict);
        assert!(!config.run.print_result);
        assert_eq!(config.log.filter, "warn");

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let result = Config::builder()
            .config_path(Some(PathBuf::from("/nonexistent/stepwise.toml")))
            .build();
        assert!(result.is_err());
    }
}
