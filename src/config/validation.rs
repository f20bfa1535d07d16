//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("server.application_id must be a UUID, got '{0}'")]
    InvalidApplicationId(String),
    #[error("listen.max_remote_clients must be greater than zero")]
    ZeroRemoteClients,
    #[error("tls.cert_path does not exist: {0}")]
    TlsCertNotFound(String),
    #[error("tls.key_path does not exist: {0}")]
    TlsKeyNotFound(String),
    #[error("framing delimiters must differ, both are {0:#04x}")]
    SameDelimiters(u8),
    #[error("framing.max_message_length must be greater than zero")]
    ZeroMessageLength,
    #[error("framing.max_response_length ({response}) must be at least max_message_length ({message})")]
    ResponseLimitTooSmall { response: usize, message: usize },
    #[error("parser.{0} must not be empty")]
    EmptyPrefix(&'static str),
    #[error("parser.option_prefix and parser.alias_prefix must differ, both are '{0}'")]
    SamePrefixes(String),
    #[error("parser.separator must not be the value separator '{0}'")]
    SameSeparators(char),
    #[error("router.timeout_ms must be -1 or non-negative, got {0}")]
    InvalidTimeout(i64),
    #[error("router.workers must be greater than zero")]
    ZeroWorkers,
    #[error("router.queue_capacity must be greater than zero")]
    ZeroQueueCapacity,
    #[error("license.path and license.key are mutually exclusive")]
    ConflictingLicenseSources,
    #[error("one of license.path or license.key is required")]
    MissingLicenseSource,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // Server identity
    if config.server.name.is_empty() {
        errors.push(ValidationError::MissingServerName);
    }
    if uuid::Uuid::parse_str(&config.server.application_id).is_err() {
        errors.push(ValidationError::InvalidApplicationId(
            config.server.application_id.clone(),
        ));
    }

    if config.listen.max_remote_clients == 0 {
        errors.push(ValidationError::ZeroRemoteClients);
    }

    // TLS validation
    if let Some(ref tls) = config.tls {
        if !Path::new(&tls.cert_path).exists() {
            errors.push(ValidationError::TlsCertNotFound(tls.cert_path.clone()));
        }
        if !Path::new(&tls.key_path).exists() {
            errors.push(ValidationError::TlsKeyNotFound(tls.key_path.clone()));
        }
    }

    // Framing
    let framing = &config.framing;
    if framing.message_delimiter == framing.batch_delimiter {
        errors.push(ValidationError::SameDelimiters(framing.message_delimiter));
    }
    if framing.max_message_length == 0 {
        errors.push(ValidationError::ZeroMessageLength);
    }
    if framing.max_response_length < framing.max_message_length {
        errors.push(ValidationError::ResponseLimitTooSmall {
            response: framing.max_response_length,
            message: framing.max_message_length,
        });
    }

    // Parser syntax
    let parser = &config.parser;
    if parser.option_prefix.is_empty() {
        errors.push(ValidationError::EmptyPrefix("option_prefix"));
    }
    if parser.alias_prefix.is_empty() {
        errors.push(ValidationError::EmptyPrefix("alias_prefix"));
    }
    if !parser.option_prefix.is_empty() && parser.option_prefix == parser.alias_prefix {
        errors.push(ValidationError::SamePrefixes(parser.option_prefix.clone()));
    }
    if parser.separator == parser.value_separator {
        errors.push(ValidationError::SameSeparators(parser.separator));
    }

    // Router
    if config.router.timeout_ms < -1 {
        errors.push(ValidationError::InvalidTimeout(config.router.timeout_ms));
    }
    if config.router.workers == 0 {
        errors.push(ValidationError::ZeroWorkers);
    }
    if config.router.queue_capacity == 0 {
        errors.push(ValidationError::ZeroQueueCapacity);
    }

    // License source
    match (&config.license.path, &config.license.key) {
        (Some(_), Some(_)) => errors.push(ValidationError::ConflictingLicenseSources),
        (None, None) => errors.push(ValidationError::MissingLicenseSource),
        _ => {}
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
