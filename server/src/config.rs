//! Server settings, read from `TODO_*` environment variables.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path of the JSON file holding the todo collection.
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Config {
    /// Loads configuration from `TODO_DATA_FILE`, `TODO_HOST` and `TODO_PORT`.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::with_prefix("TODO"))
    }

    fn from_environment(env: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_data_file() -> PathBuf {
    PathBuf::from("data/todos.json")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment(vars: &[(&str, &str)]) -> config::Environment {
        config::Environment::with_prefix("TODO").source(Some(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ))
    }

    #[test]
    fn defaults_apply_without_variables() {
        let config = Config::from_environment(environment(&[])).unwrap();
        assert_eq!(config.data_file, PathBuf::from("data/todos.json"));
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
    }

    #[test]
    fn variables_override_defaults() {
        let config = Config::from_environment(environment(&[
            ("TODO_DATA_FILE", "/var/lib/todo/todos.json"),
            ("TODO_HOST", "0.0.0.0"),
            ("TODO_PORT", "8080"),
        ]))
        .unwrap();
        assert_eq!(config.data_file, PathBuf::from("/var/lib/todo/todos.json"));
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(Config::from_environment(environment(&[("TODO_PORT", "not-a-port")])).is_err());
    }
}
