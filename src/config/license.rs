//! License source configuration.

use serde::Deserialize;

use super::defaults::default_revalidate_secs;

/// `[license]` section. Exactly one of `path` or `key` must be set.
#[derive(Debug, Clone, Deserialize)]
pub struct LicenseConfig {
    /// File holding the base64-encoded license.
    pub path: Option<String>,
    /// Inline base64-encoded license.
    pub key: Option<String>,
    /// Seconds between background refreshes (0 disables).
    #[serde(default = "default_revalidate_secs")]
    pub revalidate_secs: u64,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            path: None,
            key: None,
            revalidate_secs: default_revalidate_secs(),
        }
    }
}

/// Where the license is extracted from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseSource {
    File(String),
    Key(String),
}

impl LicenseConfig {
    /// The configured source, `None` unless exactly one is set.
    pub fn source(&self) -> Option<LicenseSource> {
        match (&self.path, &self.key) {
            (Some(path), None) => Some(LicenseSource::File(path.clone())),
            (None, Some(key)) => Some(LicenseSource::Key(key.clone())),
            _ => None,
        }
    }
}
