//! License and authorization gate.
//!
//! A license is JSON, stored base64-encoded, issued for one application id.
//! The [`LicenseGate`] extracts it once, caches it as an `Arc`, and answers
//! "is there a usable license" for every routed request without I/O.

mod extractor;
mod gate;

pub use extractor::{FileLicenseExtractor, LicenseExtractor, StaticLicenseExtractor};
pub use gate::LicenseGate;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use termrd_proto::{ProtocolError, decode_license, encode_license};
use thiserror::Error;

/// License extraction errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    #[error("failed to read license: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode license: {0}")]
    Decode(#[from] ProtocolError),
    #[error("malformed license payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("license is issued for application '{0}'")]
    WrongApplication(String),
    #[error("license expired at {0}")]
    Expired(DateTime<Utc>),
    #[error("license has been revoked")]
    Revoked,
}

/// Decoded license claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub application_id: String,
    pub tenant: String,
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub claims: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl License {
    pub fn new(application_id: impl Into<String>, tenant: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            tenant: tenant.into(),
            plan: String::new(),
            claims: BTreeSet::new(),
            expires_at: None,
        }
    }

    pub fn with_plan(mut self, plan: impl Into<String>) -> Self {
        self.plan = plan.into();
        self
    }

    pub fn with_claim(mut self, claim: impl Into<String>) -> Self {
        self.claims.insert(claim.into());
        self
    }

    pub fn expiring_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    /// Decode a base64-encoded JSON license.
    pub fn decode(encoded: &str) -> Result<Self, LicenseError> {
        let json = decode_license(encoded)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Encode as base64 JSON.
    pub fn encode(&self) -> Result<String, LicenseError> {
        Ok(encode_license(&serde_json::to_string(self)?))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn has_claim(&self, claim: &str) -> bool {
        self.claims.contains(claim)
    }

    /// Check that the license can be used by `application_id` right now.
    pub fn verify(&self, application_id: &str, now: DateTime<Utc>) -> Result<(), LicenseError> {
        if !self.application_id.eq_ignore_ascii_case(application_id) {
            return Err(LicenseError::WrongApplication(self.application_id.clone()));
        }
        if let Some(at) = self.expires_at.filter(|_| self.is_expired_at(now)) {
            return Err(LicenseError::Expired(at));
        }
        Ok(())
    }
}
