//! License sources.

use std::path::PathBuf;

use async_trait::async_trait;

use super::{License, LicenseError};

/// Source of the license, queried on first use and on refresh.
#[async_trait]
pub trait LicenseExtractor: Send + Sync {
    async fn extract(&self) -> Result<License, LicenseError>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Reads a base64-encoded license file.
#[derive(Debug, Clone)]
pub struct FileLicenseExtractor {
    path: PathBuf,
}

impl FileLicenseExtractor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl LicenseExtractor for FileLicenseExtractor {
    async fn extract(&self) -> Result<License, LicenseError> {
        let encoded = tokio::fs::read_to_string(&self.path).await?;
        License::decode(&encoded)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Inline license key.
#[derive(Debug, Clone)]
pub struct StaticLicenseExtractor {
    encoded: String,
}

impl StaticLicenseExtractor {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self {
            encoded: encoded.into(),
        }
    }

    pub fn from_license(license: &License) -> Result<Self, LicenseError> {
        Ok(Self::new(license.encode()?))
    }
}

#[async_trait]
impl LicenseExtractor for StaticLicenseExtractor {
    async fn extract(&self) -> Result<License, LicenseError> {
        License::decode(&self.encoded)
    }

    fn describe(&self) -> String {
        "inline key".to_string()
    }
}
