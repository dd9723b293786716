use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Tuning for a [`LineStream`](crate::LineStream)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Builder)]
#[builder(default)]
#[serde(rename_all = "camelCase")]
pub struct LineStreamConfig {
    /// Timeout used by `read_lines` (in milliseconds)
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// How long `stop` waits for a scanning task to release the output
    /// before reporting the close as failed (in milliseconds)
    #[serde(default = "default_close_timeout_ms")]
    pub close_timeout_ms: u64,

    /// Room for one line including its newline; longer lines end scanning
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

impl Default for LineStreamConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: default_read_timeout_ms(),
            close_timeout_ms: default_close_timeout_ms(),
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

impl LineStreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> LineStreamConfigBuilder {
        LineStreamConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.read_timeout_ms == 0 {
            return Err(anyhow::anyhow!("read_timeout_ms must be greater than zero"));
        }

        if self.close_timeout_ms == 0 {
            return Err(anyhow::anyhow!("close_timeout_ms must be greater than zero"));
        }

        if self.max_line_bytes == 0 {
            return Err(anyhow::anyhow!("max_line_bytes must be greater than zero"));
        }

        Ok(())
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}

/// Command to start under observation
#[derive(Default, Debug, Clone, PartialEq, Builder)]
#[builder(setter(into, strip_option))]
pub struct CommandConfig {
    pub command: String,
    #[builder(default)]
    #[builder(setter(custom))]
    pub args: Vec<String>,
    #[builder(default)]
    #[builder(setter(custom))]
    pub env: HashMap<String, String>,
    #[builder(default)]
    pub working_directory: Option<PathBuf>,
}

impl CommandConfig {
    pub fn builder() -> CommandConfigBuilder {
        CommandConfigBuilder::default()
    }

    /// Program followed by its arguments, the way the process was invoked
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.command.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl CommandConfigBuilder {
    pub fn args<S: ToString, I: IntoIterator<Item = S>>(&mut self, iter: I) -> &mut Self {
        let args: Vec<String> = iter.into_iter().map(|s| s.to_string()).collect();
        self.args = Some(args);
        self
    }

    pub fn env<T: ToString>(&mut self, key: T, value: T) -> &mut Self {
        let map = self.env.get_or_insert_with(HashMap::new);
        map.insert(key.to_string(), value.to_string());

        self
    }

    pub fn env_multi<T: ToString, I: IntoIterator<Item = (T, T)>>(&mut self, iter: I) -> &mut Self {
        let env = self.env.get_or_insert_with(HashMap::new);
        for (key, value) in iter {
            env.insert(key.to_string(), value.to_string());
        }
        self
    }
}

// Default value functions for serde
fn default_read_timeout_ms() -> u64 {
    5_000
}
fn default_close_timeout_ms() -> u64 {
    1_000
}
fn default_max_line_bytes() -> usize {
    64 * 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LineStreamConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.read_timeout(), Duration::from_secs(5));
        assert_eq!(config.close_timeout(), Duration::from_secs(1));
        assert_eq!(config.max_line_bytes, 65_536);
    }

    #[test]
    fn test_invalid_config() {
        let config = LineStreamConfig {
            max_line_bytes: 0,
            ..LineStreamConfig::default()
        };
        assert!(config.validate().is_err());

        let config = LineStreamConfig {
            read_timeout_ms: 0,
            ..LineStreamConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builder_fills_unset_fields_with_defaults() {
        let config = LineStreamConfig::builder()
            .read_timeout_ms(250u64)
            .max_line_bytes(1024usize)
            .build()
            .unwrap();

        assert_eq!(config.read_timeout(), Duration::from_millis(250));
        assert_eq!(config.close_timeout_ms, 1_000);
        assert_eq!(config.max_line_bytes, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: LineStreamConfig =
            serde_json::from_str(r#"{"readTimeoutMs": 250}"#).unwrap();
        assert_eq!(config.read_timeout_ms, 250);
        assert_eq!(config.close_timeout_ms, 1_000);
        assert_eq!(config.max_line_bytes, 64 * 1024);
    }

    #[test]
    fn test_command_builder() {
        let config = CommandConfig::builder()
            .command("sh")
            .args(["-c", "echo hi"])
            .env("LANG", "C")
            .env_multi([("A", "1"), ("B", "2")])
            .build()
            .unwrap();

        assert_eq!(config.argv(), vec!["sh", "-c", "echo hi"]);
        assert_eq!(config.env.len(), 3);
        assert_eq!(config.env.get("B").map(String::as_str), Some("2"));
        assert!(config.working_directory.is_none());
    }

    #[test]
    fn test_command_builder_requires_command() {
        assert!(CommandConfig::builder().args(["x"]).build().is_err());
    }
}
