//! Command, option and argument descriptors.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Position of a command in the ownership hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    /// Top-level command, invoked by its id.
    Root,
    /// Container of subcommands, never invoked directly.
    Group,
    /// Leaf owned by a root or a group.
    SubCommand,
    /// Top-level command built into the daemon.
    Native,
}

impl CommandType {
    /// Whether the first token of a request may name this command.
    #[inline]
    pub fn is_top_level(self) -> bool {
        matches!(self, Self::Root | Self::Native)
    }

    /// Whether this command may own children.
    #[inline]
    pub fn can_own(self) -> bool {
        matches!(self, Self::Root | Self::Group)
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Root => "root",
            Self::Group => "group",
            Self::SubCommand => "subcommand",
            Self::Native => "native",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandFlag {
    /// Rejected with `invalid_command`.
    Disabled,
    /// Still runs, use is logged.
    Obsolete,
    /// Left out of `help` listings.
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionFlag {
    Required,
    Repeatable,
    Obsolete,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentFlag {
    Required,
    Obsolete,
    Disabled,
}

/// Value type of an option or argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Text,
    Integer,
    Decimal,
    Boolean,
    /// ISO-8601 calendar date (`2024-01-31`).
    Date,
    Uuid,
    /// Application-defined type, checked by the command's own checker.
    Custom(String),
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Integer => f.write_str("integer"),
            Self::Decimal => f.write_str("decimal"),
            Self::Boolean => f.write_str("boolean"),
            Self::Date => f.write_str("date"),
            Self::Uuid => f.write_str("uuid"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

/// Declared option of a command.
#[derive(Debug, Clone)]
pub struct OptionDescriptor {
    pub id: String,
    pub alias: Option<String>,
    pub data_type: DataType,
    pub flags: HashSet<OptionFlag>,
    pub description: String,
    /// Accepted values; empty means unrestricted.
    pub allowed_values: Vec<String>,
}

impl OptionDescriptor {
    pub fn new(id: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: id.into(),
            alias: None,
            data_type,
            flags: HashSet::new(),
            description: String::new(),
            allowed_values: Vec::new(),
        }
    }

    /// Boolean switch: presence means `true`.
    pub fn switch(id: impl Into<String>) -> Self {
        Self::new(id, DataType::Boolean)
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn flag(mut self, flag: OptionFlag) -> Self {
        self.flags.insert(flag);
        self
    }

    pub fn required(self) -> Self {
        self.flag(OptionFlag::Required)
    }

    pub fn repeatable(self) -> Self {
        self.flag(OptionFlag::Repeatable)
    }

    pub fn allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }

    #[inline]
    pub fn has(&self, flag: OptionFlag) -> bool {
        self.flags.contains(&flag)
    }

    #[inline]
    pub fn is_switch(&self) -> bool {
        self.data_type == DataType::Boolean
    }
}

/// Declared positional argument of a command.
#[derive(Debug, Clone)]
pub struct ArgumentDescriptor {
    pub id: String,
    pub data_type: DataType,
    pub flags: HashSet<ArgumentFlag>,
    pub description: String,
}

impl ArgumentDescriptor {
    pub fn new(id: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: id.into(),
            data_type,
            flags: HashSet::new(),
            description: String::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn flag(mut self, flag: ArgumentFlag) -> Self {
        self.flags.insert(flag);
        self
    }

    pub fn required(self) -> Self {
        self.flag(ArgumentFlag::Required)
    }

    #[inline]
    pub fn has(&self, flag: ArgumentFlag) -> bool {
        self.flags.contains(&flag)
    }
}

/// Immutable declaration of one command.
///
/// ```
/// use termrd::commands::{CommandDescriptor, DataType, OptionDescriptor};
///
/// let test = CommandDescriptor::root("test", "Test")
///     .description("Exercise the router")
///     .option(OptionDescriptor::switch("version").alias("v"))
///     .option(OptionDescriptor::new("count", DataType::Integer).alias("c"));
///
/// assert!(test.option_by_token("v").is_some());
/// ```
#[derive(Debug, Clone)]
pub struct CommandDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub command_type: CommandType,
    pub flags: HashSet<CommandFlag>,
    /// Options in declaration order.
    pub options: Vec<OptionDescriptor>,
    /// Positional arguments in binding order.
    pub arguments: Vec<ArgumentDescriptor>,
    /// Ids of the commands this one is a child of.
    pub owners: Vec<String>,
    pub tags: Vec<String>,
    /// License claims the caller must hold.
    pub required_claims: Vec<String>,
    pub properties: BTreeMap<String, String>,
}

impl CommandDescriptor {
    fn with_type(id: impl Into<String>, name: impl Into<String>, command_type: CommandType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            command_type,
            flags: HashSet::new(),
            options: Vec::new(),
            arguments: Vec::new(),
            owners: Vec::new(),
            tags: Vec::new(),
            required_claims: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn root(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_type(id, name, CommandType::Root)
    }

    pub fn native(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_type(id, name, CommandType::Native)
    }

    pub fn group(id: impl Into<String>, name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self::with_type(id, name, CommandType::Group).owner(owner)
    }

    pub fn subcommand(
        id: impl Into<String>,
        name: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self::with_type(id, name, CommandType::SubCommand).owner(owner)
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn flag(mut self, flag: CommandFlag) -> Self {
        self.flags.insert(flag);
        self
    }

    pub fn option(mut self, option: OptionDescriptor) -> Self {
        self.options.push(option);
        self
    }

    pub fn argument(mut self, argument: ArgumentDescriptor) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owners.push(owner.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn requires_claim(mut self, claim: impl Into<String>) -> Self {
        self.required_claims.push(claim.into());
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    #[inline]
    pub fn has(&self, flag: CommandFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Option declared under `id`.
    pub fn option_by_id(&self, id: &str) -> Option<&OptionDescriptor> {
        self.options.iter().find(|o| o.id == id)
    }

    /// Option declared with `alias`.
    pub fn option_by_alias(&self, alias: &str) -> Option<&OptionDescriptor> {
        self.options.iter().find(|o| o.alias.as_deref() == Some(alias))
    }

    /// Option matching `token` as id or alias.
    pub fn option_by_token(&self, token: &str) -> Option<&OptionDescriptor> {
        self.option_by_id(token).or_else(|| self.option_by_alias(token))
    }

    pub fn is_owned_by(&self, owner: &str) -> bool {
        self.owners.iter().any(|o| o == owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_declarations() {
        let cmd = CommandDescriptor::root("deploy", "Deploy")
            .description("Deploy a build")
            .flag(CommandFlag::Obsolete)
            .option(OptionDescriptor::new("target", DataType::Text).alias("t").required())
            .option(OptionDescriptor::switch("force").alias("f"))
            .argument(ArgumentDescriptor::new("build", DataType::Uuid).required())
            .tag("ops")
            .requires_claim("deploy")
            .property("category", "release");

        assert_eq!(cmd.command_type, CommandType::Root);
        assert!(cmd.has(CommandFlag::Obsolete));
        assert!(cmd.option_by_id("target").unwrap().has(OptionFlag::Required));
        assert!(cmd.option_by_alias("f").unwrap().is_switch());
        assert!(cmd.option_by_token("force").is_some());
        assert!(cmd.option_by_token("x").is_none());
        assert!(cmd.arguments[0].has(ArgumentFlag::Required));
        assert_eq!(cmd.required_claims, vec!["deploy"]);
        assert_eq!(cmd.properties.get("category").map(String::as_str), Some("release"));
    }

    #[test]
    fn test_hierarchy_constructors() {
        let group = CommandDescriptor::group("license", "License", "admin");
        let sub = CommandDescriptor::subcommand("info", "Info", "license");

        assert_eq!(group.command_type, CommandType::Group);
        assert!(group.is_owned_by("admin"));
        assert!(sub.is_owned_by("license"));
        assert!(!CommandType::SubCommand.is_top_level());
        assert!(CommandType::Native.is_top_level());
        assert!(!CommandType::Native.can_own());
    }

    #[test]
    fn test_data_type_display() {
        assert_eq!(DataType::Integer.to_string(), "integer");
        assert_eq!(DataType::Custom("semver".into()).to_string(), "semver");
    }
}
