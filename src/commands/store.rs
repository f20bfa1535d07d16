//! The frozen command store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::descriptor::{ArgumentFlag, CommandDescriptor};
use crate::error::{RouteError, RouteResult};

/// Every declared command, keyed by id.
///
/// Built once; lookups never lock.
#[derive(Debug, Default)]
pub struct CommandStore {
    commands: HashMap<String, Arc<CommandDescriptor>>,
    /// Ids in declaration order
    order: Vec<String>,
}

fn declaration(msg: impl Into<String>) -> RouteError {
    RouteError::InvalidDeclaration(msg.into())
}

impl CommandStore {
    /// Validate and freeze a set of declarations.
    pub fn build<I>(descriptors: I) -> RouteResult<Self>
    where
        I: IntoIterator<Item = CommandDescriptor>,
    {
        let mut commands = HashMap::new();
        let mut order = Vec::new();

        for descriptor in descriptors {
            validate_local(&descriptor)?;
            if commands.contains_key(&descriptor.id) {
                return Err(declaration(format!(
                    "command '{}' is declared twice",
                    descriptor.id
                )));
            }
            order.push(descriptor.id.clone());
            commands.insert(descriptor.id.clone(), Arc::new(descriptor));
        }

        let store = Self { commands, order };
        store.validate_ownership()?;
        Ok(store)
    }

    fn validate_ownership(&self) -> RouteResult<()> {
        for descriptor in self.iter() {
            let top_level = descriptor.command_type.is_top_level();
            match (top_level, descriptor.owners.is_empty()) {
                (true, false) => {
                    return Err(declaration(format!(
                        "{} command '{}' cannot have owners",
                        descriptor.command_type, descriptor.id
                    )));
                }
                (false, true) => {
                    return Err(declaration(format!(
                        "{} command '{}' needs an owner",
                        descriptor.command_type, descriptor.id
                    )));
                }
                _ => {}
            }

            for owner_id in &descriptor.owners {
                let Some(owner) = self.commands.get(owner_id) else {
                    return Err(declaration(format!(
                        "command '{}' is owned by unknown command '{owner_id}'",
                        descriptor.id
                    )));
                };
                if !owner.command_type.can_own() {
                    return Err(declaration(format!(
                        "{} command '{owner_id}' cannot own '{}'",
                        owner.command_type, descriptor.id
                    )));
                }
            }
            self.check_acyclic(descriptor)?;
        }
        Ok(())
    }

    /// Every ancestor chain of `descriptor` must end at a top-level command.
    fn check_acyclic(&self, descriptor: &CommandDescriptor) -> RouteResult<()> {
        let mut seen = HashSet::new();
        let mut stack: Vec<&str> = descriptor.owners.iter().map(String::as_str).collect();
        while let Some(id) = stack.pop() {
            if id == descriptor.id {
                return Err(declaration(format!(
                    "command '{}' is its own ancestor",
                    descriptor.id
                )));
            }
            if !seen.insert(id) {
                continue;
            }
            if let Some(owner) = self.commands.get(id) {
                stack.extend(owner.owners.iter().map(String::as_str));
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Arc<CommandDescriptor>> {
        self.commands.get(id)
    }

    /// Child of `owner` declared under `id`.
    pub fn child(&self, owner: &str, id: &str) -> Option<&Arc<CommandDescriptor>> {
        self.commands.get(id).filter(|c| c.is_owned_by(owner))
    }

    /// Children of `owner`, in declaration order.
    pub fn children<'a>(&'a self, owner: &'a str) -> impl Iterator<Item = &'a Arc<CommandDescriptor>> {
        self.iter().filter(move |c| c.is_owned_by(owner))
    }

    /// Root and native commands, in declaration order.
    pub fn top_level(&self) -> impl Iterator<Item = &Arc<CommandDescriptor>> {
        self.iter().filter(|c| c.command_type.is_top_level())
    }

    /// Every command, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<CommandDescriptor>> {
        self.order.iter().filter_map(|id| self.commands.get(id))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Checks that need only the descriptor itself.
fn validate_local(descriptor: &CommandDescriptor) -> RouteResult<()> {
    let id = &descriptor.id;
    if id.trim().is_empty() || id.chars().any(char::is_whitespace) {
        return Err(declaration(format!("command id '{id}' must be a single word")));
    }

    let mut option_ids = HashSet::new();
    for option in &descriptor.options {
        if option.id.is_empty() {
            return Err(declaration(format!("command '{id}' has an option without id")));
        }
        if !option_ids.insert(option.id.as_str()) {
            return Err(declaration(format!(
                "command '{id}' declares option '{}' twice",
                option.id
            )));
        }
    }

    let mut aliases = HashSet::new();
    for option in &descriptor.options {
        let Some(alias) = option.alias.as_deref() else {
            continue;
        };
        if alias.is_empty() {
            return Err(declaration(format!(
                "option '{}' of command '{id}' has an empty alias",
                option.id
            )));
        }
        if !aliases.insert(alias) {
            return Err(declaration(format!(
                "command '{id}' declares alias '{alias}' twice"
            )));
        }
        if alias != option.id && option_ids.contains(alias) {
            return Err(declaration(format!(
                "alias '{alias}' of option '{}' collides with an option id of command '{id}'",
                option.id
            )));
        }
    }

    let mut argument_ids = HashSet::new();
    let mut optional_seen = false;
    for argument in &descriptor.arguments {
        if !argument_ids.insert(argument.id.as_str()) {
            return Err(declaration(format!(
                "command '{id}' declares argument '{}' twice",
                argument.id
            )));
        }
        let required = argument.has(ArgumentFlag::Required);
        if required && optional_seen {
            return Err(declaration(format!(
                "required argument '{}' of command '{id}' follows an optional one",
                argument.id
            )));
        }
        optional_seen |= !required;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{ArgumentDescriptor, DataType, OptionDescriptor};
    use termrd_proto::ErrorCode;

    fn assert_invalid(result: RouteResult<CommandStore>, needle: &str) {
        let err = result.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InvalidDeclaration);
        assert!(err.to_string().contains(needle), "{err}");
    }

    #[test]
    fn test_build_and_lookup() {
        let store = CommandStore::build([
            CommandDescriptor::root("admin", "Admin"),
            CommandDescriptor::group("license", "License", "admin"),
            CommandDescriptor::subcommand("info", "Info", "license"),
            CommandDescriptor::native("ping", "Ping"),
        ])
        .unwrap();

        assert_eq!(store.len(), 4);
        assert!(store.child("admin", "license").is_some());
        assert!(store.child("license", "info").is_some());
        assert!(store.child("admin", "info").is_none());
        let top: Vec<_> = store.top_level().map(|c| c.id.as_str()).collect();
        assert_eq!(top, vec!["admin", "ping"]);
        let children: Vec<_> = store.children("license").map(|c| c.id.as_str()).collect();
        assert_eq!(children, vec!["info"]);
    }

    #[test]
    fn test_duplicate_command_rejected() {
        assert_invalid(
            CommandStore::build([
                CommandDescriptor::root("test", "Test"),
                CommandDescriptor::root("test", "Again"),
            ]),
            "declared twice",
        );
    }

    #[test]
    fn test_option_collisions_rejected() {
        assert_invalid(
            CommandStore::build([CommandDescriptor::root("t", "T")
                .option(OptionDescriptor::switch("a"))
                .option(OptionDescriptor::switch("a"))]),
            "option 'a' twice",
        );
        assert_invalid(
            CommandStore::build([CommandDescriptor::root("t", "T")
                .option(OptionDescriptor::switch("one").alias("x"))
                .option(OptionDescriptor::switch("two").alias("x"))]),
            "alias 'x' twice",
        );
        assert_invalid(
            CommandStore::build([CommandDescriptor::root("t", "T")
                .option(OptionDescriptor::switch("one").alias("two"))
                .option(OptionDescriptor::switch("two"))]),
            "collides",
        );
    }

    #[test]
    fn test_ownership_rules() {
        assert_invalid(
            CommandStore::build([CommandDescriptor::subcommand("info", "Info", "missing")]),
            "unknown command 'missing'",
        );
        assert_invalid(
            CommandStore::build([CommandDescriptor::root("r", "R").owner("x")]),
            "cannot have owners",
        );
        assert_invalid(
            CommandStore::build([
                CommandDescriptor::native("ping", "Ping"),
                CommandDescriptor::subcommand("pong", "Pong", "ping"),
            ]),
            "cannot own",
        );
    }

    #[test]
    fn test_group_cycle_rejected() {
        assert_invalid(
            CommandStore::build([
                CommandDescriptor::root("r", "R"),
                CommandDescriptor::group("a", "A", "b"),
                CommandDescriptor::group("b", "B", "a"),
            ]),
            "own ancestor",
        );
    }

    #[test]
    fn test_required_argument_after_optional_rejected() {
        assert_invalid(
            CommandStore::build([CommandDescriptor::root("copy", "Copy")
                .argument(ArgumentDescriptor::new("from", DataType::Text))
                .argument(ArgumentDescriptor::new("to", DataType::Text).required())]),
            "follows an optional one",
        );
    }
}
