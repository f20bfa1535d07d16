//! Framing, parser and router configuration.

use serde::Deserialize;
use std::time::Duration;
use termrd_proto::FramingConfig;

use super::defaults::*;
use crate::parser::ParserOptions;

/// `[framing]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct FramingSection {
    /// Byte terminating one message (default 31).
    #[serde(default = "default_message_delimiter")]
    pub message_delimiter: u8,
    /// Byte closing a batch (default 30).
    #[serde(default = "default_batch_delimiter")]
    pub batch_delimiter: u8,
    /// Maximum request message length in characters.
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
    /// Maximum response message length in characters.
    #[serde(default = "default_max_response_length")]
    pub max_response_length: usize,
}

impl Default for FramingSection {
    fn default() -> Self {
        Self {
            message_delimiter: default_message_delimiter(),
            batch_delimiter: default_batch_delimiter(),
            max_message_length: default_max_message_length(),
            max_response_length: default_max_response_length(),
        }
    }
}

impl FramingSection {
    pub fn to_framing(&self) -> FramingConfig {
        FramingConfig {
            message_delimiter: self.message_delimiter,
            batch_delimiter: self.batch_delimiter,
            max_message_length: self.max_message_length,
            max_response_length: self.max_response_length,
        }
    }
}

/// `[parser]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ParserSection {
    #[serde(default = "default_option_prefix")]
    pub option_prefix: String,
    #[serde(default = "default_alias_prefix")]
    pub alias_prefix: String,
    #[serde(default = "default_separator")]
    pub separator: char,
    #[serde(default = "default_value_separator")]
    pub value_separator: char,
}

impl Default for ParserSection {
    fn default() -> Self {
        Self {
            option_prefix: default_option_prefix(),
            alias_prefix: default_alias_prefix(),
            separator: default_separator(),
            value_separator: default_value_separator(),
        }
    }
}

impl ParserSection {
    pub fn to_options(&self) -> ParserOptions {
        ParserOptions {
            option_prefix: self.option_prefix.clone(),
            alias_prefix: self.alias_prefix.clone(),
            separator: self.separator,
            value_separator: self.value_separator,
        }
    }
}

/// `[router]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    /// Per-request timeout in milliseconds, `-1` to disable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: i64,
    /// Number of consumer tasks draining the queue.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Bounded queue capacity.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl RouterConfig {
    /// The effective timeout, `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        u64::try_from(self.timeout_ms).ok().map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_disabled_by_negative_one() {
        let router = RouterConfig {
            timeout_ms: -1,
            ..RouterConfig::default()
        };
        assert_eq!(router.timeout(), None);
        assert_eq!(
            RouterConfig::default().timeout(),
            Some(Duration::from_millis(25_000))
        );
    }

    #[test]
    fn test_framing_section_defaults_match_v1() {
        assert_eq!(FramingSection::default().to_framing(), FramingConfig::default());
    }
}
