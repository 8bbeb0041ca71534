use crate::error::{RedwrapError, RedwrapResult};
use crate::keys::KeyPrefix;

pub const URL_ENV: &str = "REDWRAP_URL";
pub const PREFIX_ENV: &str = "REDWRAP_PREFIX";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub connection_string: String,
    pub key_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            connection_string: "redis://127.0.0.1:6379/".to_string(),
            key_prefix: String::new(),
        }
    }
}

impl Config {
    pub fn new(connection_string: impl Into<String>, key_prefix: impl Into<String>) -> Self {
        Config {
            connection_string: connection_string.into(),
            key_prefix: key_prefix.into(),
        }
    }

    /// Build from command-line flags. Unknown flags are ignored so callers can
    /// mix in their own.
    pub fn from_args(args: &[String]) -> Self {
        let mut config = Config::default();
        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--url" | "-u" => {
                    if i + 1 < args.len() {
                        config.connection_string = args[i + 1].clone();
                        i += 1;
                    }
                }
                "--prefix" | "-p" => {
                    if i + 1 < args.len() {
                        config.key_prefix = args[i + 1].clone();
                        i += 1;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        config
    }

    /// Build from `REDWRAP_URL` / `REDWRAP_PREFIX`, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();
        if let Some(url) = lookup(URL_ENV) {
            config.connection_string = url;
        }
        if let Some(prefix) = lookup(PREFIX_ENV) {
            config.key_prefix = prefix;
        }
        config
    }

    /// Presence check only; the client library validates the URL itself.
    pub fn validate(&self) -> RedwrapResult<()> {
        if self.connection_string.trim().is_empty() {
            return Err(RedwrapError::Config(
                "connection string must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn prefix(&self) -> KeyPrefix {
        KeyPrefix::new(self.key_prefix.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.connection_string, "redis://127.0.0.1:6379/");
        assert!(config.key_prefix.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_args() {
        let config = Config::from_args(&args(&[
            "--url",
            "redis://cache:6380/2",
            "--memory",
            "--prefix",
            "svc:",
        ]));
        assert_eq!(config.connection_string, "redis://cache:6380/2");
        assert_eq!(config.key_prefix, "svc:");
        assert_eq!(config.prefix().apply("k"), "svc:k");
    }

    #[test]
    fn test_from_args_missing_value_keeps_default() {
        let config = Config::from_args(&args(&["--url"]));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_lookup() {
        let config = Config::from_lookup(|name| match name {
            URL_ENV => Some("redis://env:6379/".to_string()),
            _ => None,
        });
        assert_eq!(config.connection_string, "redis://env:6379/");
        assert!(config.key_prefix.is_empty());
    }

    #[test]
    fn test_validate_rejects_blank_url() {
        let config = Config::new("  ", "p:");
        let err = config.validate().unwrap_err();
        assert!(matches!(err, RedwrapError::Config(_)));
    }
}
