use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::dogstatsd::DogStatsdConfig;
use super::logging::LoggingConfig;

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "TAGMETER_CONFIG";

/// Default config file location.
pub const DEFAULT_CONFIG_PATH: &str = "./config.yaml";

/// Prefix for environment overrides, e.g. `TAGMETER_DOGSTATSD__HOST`.
pub const ENV_PREFIX: &str = "TAGMETER_";

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    pub bind_address: String,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Collector and tagging settings, read-only once loaded.
    #[serde(alias = "DOGSTATSD")]
    pub dogstatsd: DogStatsdConfig,
}

/// YAML file at `path`, overridden by `TAGMETER_*` variables
/// (`__` separates nesting levels).
pub fn config_figment(path: &str) -> Figment {
    Figment::new().merge(Yaml::file(path)).merge(
        Env::prefixed(ENV_PREFIX)
            .ignore(&["config"])
            .split("__"),
    )
}

/// Extracts the current config version from an assembled figment.
pub fn extract_config(figment: &Figment) -> Result<ConfigV1, figment::Error> {
    match figment.extract::<Config>()? {
        Config::ConfigV1(c) => Ok(c),
    }
}

/// Load config from `$TAGMETER_CONFIG`, or "config.yaml" in the current directory.
pub fn load_config() -> ConfigV1 {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    match extract_config(&config_figment(&path)) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading configuration from {}: {}", path, e);
            std::process::exit(1);
        }
    }
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() {
    let schema = schema_for!(Config);
    match serde_json::to_string_pretty(&schema) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to render configuration schema: {}", e),
    }
}
