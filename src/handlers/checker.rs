//! Built-in value checks, applied before any command checker.

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::warn;

use super::core::{Checker, RunContext};
use crate::commands::{ArgumentFlag, CommandFlag, DataType, OptionFlag};
use crate::error::{RouteError, RouteResult};

/// Checks flags, data types, allowed values and required claims.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValueChecker;

impl ValueChecker {
    pub fn new() -> Self {
        Self
    }
}

/// Whether `value` is well-formed for `data_type`.
///
/// Custom types are left to the command's own checker.
pub fn matches_type(data_type: &DataType, value: &str) -> bool {
    match data_type {
        DataType::Text | DataType::Custom(_) => true,
        DataType::Integer => value.parse::<i64>().is_ok(),
        DataType::Decimal => value.parse::<f64>().is_ok_and(f64::is_finite),
        DataType::Boolean => {
            value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false")
        }
        DataType::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
        DataType::Uuid => uuid::Uuid::parse_str(value).is_ok(),
    }
}

#[async_trait]
impl Checker for ValueChecker {
    async fn check(&self, ctx: &RunContext<'_>) -> RouteResult<()> {
        let parsed = ctx.command;
        let descriptor = &parsed.descriptor;

        if descriptor.has(CommandFlag::Disabled) {
            return Err(RouteError::InvalidCommand {
                command: descriptor.id.clone(),
                reason: "command is disabled".to_string(),
            });
        }
        if descriptor.has(CommandFlag::Obsolete) {
            warn!(command = %descriptor.id, request_id = %ctx.request.id, "obsolete command used");
        }

        for (id, value) in &parsed.options {
            let Some(option) = descriptor.option_by_id(id) else {
                return Err(RouteError::ServerError(format!(
                    "parsed option '{id}' is not declared"
                )));
            };
            if option.has(OptionFlag::Disabled) {
                return Err(RouteError::invalid_option(id, "option is disabled"));
            }
            if option.has(OptionFlag::Obsolete) {
                warn!(command = %descriptor.id, option = %id, "obsolete option used");
            }
            for v in value.values() {
                if !matches_type(&option.data_type, v) {
                    return Err(RouteError::invalid_option(
                        id,
                        format!("expected {}, got '{v}'", option.data_type),
                    ));
                }
                if !option.allowed_values.is_empty() && !option.allowed_values.iter().any(|a| a == v) {
                    return Err(RouteError::invalid_option(
                        id,
                        format!(
                            "'{v}' is not one of {}",
                            option.allowed_values.join(", ")
                        ),
                    ));
                }
            }
        }

        for (argument, value) in parsed.bound_arguments() {
            if argument.has(ArgumentFlag::Disabled) {
                return Err(RouteError::invalid_argument(&argument.id, "argument is disabled"));
            }
            if argument.has(ArgumentFlag::Obsolete) {
                warn!(command = %descriptor.id, argument = %argument.id, "obsolete argument used");
            }
            if !matches_type(&argument.data_type, value) {
                return Err(RouteError::invalid_argument(
                    &argument.id,
                    format!("expected {}, got '{value}'", argument.data_type),
                ));
            }
        }

        if let Some(claim) = descriptor
            .required_claims
            .iter()
            .find(|claim| !ctx.license.has_claim(claim))
        {
            return Err(RouteError::MissingClaim(claim.clone()));
        }

        Ok(())
    }
}
