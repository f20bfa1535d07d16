//! Commands built into the daemon.
//!
//! | Invocation | Type |
//! |------------|------|
//! | `test [--version/-v] [--opt1/-o <text>] [--count/-c <n>]` | root |
//! | `ping` | native |
//! | `sleep <millis>` | root |
//! | `help [command]` | native |
//! | `server` | root |
//! | `server license info` | group + subcommand |

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::core::{RegistryBuilder, RunContext, RunOutput, Runner};
use crate::commands::{
    ArgumentDescriptor, CommandDescriptor, CommandFlag, CommandType, DataType, OptionDescriptor,
};
use crate::error::{RouteError, RouteResult};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Declare and bind every built-in command.
pub fn register(builder: RegistryBuilder, server_name: &str) -> RegistryBuilder {
    builder
        .register(
            CommandDescriptor::root("test", "Test")
                .description("Echo the parsed options back")
                .option(
                    OptionDescriptor::switch("version")
                        .alias("v")
                        .description("Report the daemon version"),
                )
                .option(
                    OptionDescriptor::new("opt1", DataType::Text)
                        .alias("o")
                        .description("Free text echoed back"),
                )
                .option(
                    OptionDescriptor::new("count", DataType::Integer)
                        .alias("c")
                        .description("Number echoed back"),
                ),
            TestRunner,
        )
        .register(
            CommandDescriptor::native("ping", "Ping").description("Liveness check"),
            PingRunner,
        )
        .register(
            CommandDescriptor::root("sleep", "Sleep")
                .description("Wait, honoring cancellation")
                .argument(
                    ArgumentDescriptor::new("millis", DataType::Integer)
                        .required()
                        .description("Milliseconds to wait"),
                ),
            SleepRunner,
        )
        .register(
            CommandDescriptor::native("help", "Help")
                .description("List commands or describe one")
                .argument(ArgumentDescriptor::new("command", DataType::Text)),
            HelpRunner,
        )
        .register(
            CommandDescriptor::root("server", "Server").description("Daemon information"),
            ServerRunner {
                name: server_name.to_string(),
            },
        )
        .declare(
            CommandDescriptor::group("license", "License", "server")
                .description("License inspection"),
        )
        .register(
            CommandDescriptor::subcommand("info", "Info", "license")
                .description("Show the active license"),
            LicenseInfoRunner,
        )
}

struct TestRunner;

#[async_trait]
impl Runner for TestRunner {
    async fn run(&self, ctx: &RunContext<'_>) -> RouteResult<RunOutput> {
        let parsed = ctx.command;
        let mut payload = serde_json::Map::new();
        if parsed.flag("version") {
            payload.insert("version".into(), json!(VERSION));
        }
        if let Some(opt1) = parsed.option("opt1") {
            payload.insert("opt1".into(), json!(opt1.as_str()));
        }
        if let Some(count) = parsed.option("count") {
            let count: i64 = count
                .as_str()
                .parse()
                .map_err(|_| RouteError::invalid_option("count", "expected integer"))?;
            payload.insert("count".into(), json!(count));
        }
        Ok(Some(Value::Object(payload)))
    }
}

struct PingRunner;

#[async_trait]
impl Runner for PingRunner {
    async fn run(&self, _ctx: &RunContext<'_>) -> RouteResult<RunOutput> {
        Ok(Some(json!("pong")))
    }
}

struct SleepRunner;

#[async_trait]
impl Runner for SleepRunner {
    async fn run(&self, ctx: &RunContext<'_>) -> RouteResult<RunOutput> {
        let millis = ctx
            .command
            .argument("millis")
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| RouteError::invalid_argument("millis", "expected a non-negative integer"))?;

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(millis)) => Ok(Some(json!({ "slept_ms": millis }))),
            _ = ctx.cancel.cancelled() => Err(RouteError::RequestCanceled),
        }
    }
}

struct HelpRunner;

#[async_trait]
impl Runner for HelpRunner {
    async fn run(&self, ctx: &RunContext<'_>) -> RouteResult<RunOutput> {
        let store = ctx.commands;
        let Some(id) = ctx.command.argument("command") else {
            let commands: Vec<Value> = store
                .top_level()
                .filter(|c| !c.has(CommandFlag::Hidden))
                .map(|c| json!({ "id": c.id, "description": c.description }))
                .collect();
            return Ok(Some(json!({ "commands": commands })));
        };

        let descriptor = store
            .get(id)
            .filter(|c| !c.has(CommandFlag::Hidden))
            .ok_or_else(|| RouteError::invalid_argument("command", format!("unknown command '{id}'")))?;

        let options: Vec<Value> = descriptor
            .options
            .iter()
            .map(|o| {
                json!({
                    "id": o.id,
                    "alias": o.alias,
                    "type": o.data_type.to_string(),
                    "description": o.description,
                })
            })
            .collect();
        let arguments: Vec<Value> = descriptor
            .arguments
            .iter()
            .map(|a| json!({ "id": a.id, "type": a.data_type.to_string(), "description": a.description }))
            .collect();
        let children: Vec<&str> = store.children(&descriptor.id).map(|c| c.id.as_str()).collect();

        Ok(Some(json!({
            "id": descriptor.id,
            "type": descriptor.command_type.to_string(),
            "invocable": descriptor.command_type != CommandType::Group,
            "description": descriptor.description,
            "options": options,
            "arguments": arguments,
            "children": children,
        })))
    }
}

struct ServerRunner {
    name: String,
}

#[async_trait]
impl Runner for ServerRunner {
    async fn run(&self, _ctx: &RunContext<'_>) -> RouteResult<RunOutput> {
        Ok(Some(json!({ "name": self.name, "version": VERSION })))
    }
}

struct LicenseInfoRunner;

#[async_trait]
impl Runner for LicenseInfoRunner {
    async fn run(&self, ctx: &RunContext<'_>) -> RouteResult<RunOutput> {
        let license = ctx.license;
        Ok(Some(json!({
            "application_id": license.application_id,
            "tenant": license.tenant,
            "plan": license.plan,
            "claims": license.claims,
            "expires_at": license.expires_at,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::Registry;
    use crate::license::License;
    use crate::parser::{CommandParser, Parse, ParserOptions};
    use std::sync::Arc;
    use termrd_proto::{DEMO_APPLICATION_ID, ErrorCode, TerminalRequest};
    use tokio_util::sync::CancellationToken;

    async fn run_with(raw: &str, cancel: CancellationToken) -> RouteResult<RunOutput> {
        let registry = register(Registry::builder(), "termrd-test").build().unwrap();
        let parser =
            CommandParser::new(Arc::clone(registry.store()), ParserOptions::default()).unwrap();
        let request = TerminalRequest::new("1", raw);
        let command = parser.parse(&request)?;
        let license = Arc::new(License::new(DEMO_APPLICATION_ID, "acme").with_plan("team"));
        let ctx = RunContext {
            request: &request,
            command: &command,
            license: &license,
            cancel: &cancel,
            commands: registry.store(),
        };
        let binding = registry.binding(ctx.command_id()).unwrap();
        binding.runner.run(&ctx).await
    }

    async fn run(raw: &str) -> Value {
        run_with(raw, CancellationToken::new()).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_test_command() {
        assert_eq!(run("test -v").await, json!({ "version": VERSION }));
        assert_eq!(
            run("test -o hello --count 3").await,
            json!({ "opt1": "hello", "count": 3 })
        );
    }

    #[tokio::test]
    async fn test_ping() {
        assert_eq!(run("ping").await, json!("pong"));
    }

    #[tokio::test]
    async fn test_sleep_completes() {
        assert_eq!(run("sleep 1").await, json!({ "slept_ms": 1 }));
    }

    #[tokio::test]
    async fn test_sleep_honors_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = run_with("sleep 60000", cancel).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::RequestCanceled);
    }

    #[tokio::test]
    async fn test_help_lists_top_level() {
        let payload = run("help").await;
        let ids: Vec<&str> = payload["commands"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["test", "ping", "sleep", "help", "server"]);
    }

    #[tokio::test]
    async fn test_help_describes_command() {
        let payload = run("help license").await;
        assert_eq!(payload["type"], "group");
        assert_eq!(payload["invocable"], false);
        assert_eq!(payload["children"], json!(["info"]));

        let err = run_with("help nope", CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InvalidArgument);
    }

    #[tokio::test]
    async fn test_server_license_info() {
        let payload = run("server license info").await;
        assert_eq!(payload["tenant"], "acme");
        assert_eq!(payload["plan"], "team");
        assert_eq!(run("server").await["name"], "termrd-test");
    }
}
