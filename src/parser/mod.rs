//! Command parser.
//!
//! Resolves raw request text against the [`CommandStore`]:
//!
//! ```text
//! admin license info --format=json  extra
//! ^^^^^ ^^^^^^^ ^^^^ ^^^^^^^^^^^^^  ^^^^^
//! root  group   sub  option         argument
//! ```
//!
//! The first token must name a root or native command. Following tokens
//! descend the ownership chain while they name a child of the current
//! command; everything after that is an option flag (prefixed) or a
//! positional argument. Parsing is all-or-nothing.

mod tokenizer;

pub use tokenizer::{Token, tokenize};

use std::collections::BTreeMap;
use std::sync::Arc;

use termrd_proto::TerminalRequest;

use crate::commands::{
    ArgumentDescriptor, CommandDescriptor, CommandStore, CommandType, OptionDescriptor,
    OptionFlag,
};
use crate::error::{RouteError, RouteResult};

/// Syntax of option flags and separators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOptions {
    /// Prefix of options given by id (`--version`).
    pub option_prefix: String,
    /// Prefix of options given by alias (`-v`).
    pub alias_prefix: String,
    /// Token separator.
    pub separator: char,
    /// Separates an inline value from its flag (`--count=3`).
    pub value_separator: char,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            option_prefix: "--".to_string(),
            alias_prefix: "-".to_string(),
            separator: ' ',
            value_separator: '=',
        }
    }
}

impl ParserOptions {
    pub fn validate(&self) -> RouteResult<()> {
        if self.option_prefix.is_empty() || self.alias_prefix.is_empty() {
            return Err(RouteError::InvalidConfiguration(
                "option and alias prefixes must not be empty".to_string(),
            ));
        }
        if self.option_prefix == self.alias_prefix {
            return Err(RouteError::InvalidConfiguration(format!(
                "option and alias prefixes are both '{}'",
                self.option_prefix
            )));
        }
        if self.separator == self.value_separator {
            return Err(RouteError::InvalidConfiguration(format!(
                "separator and value separator are both '{}'",
                self.separator
            )));
        }
        Ok(())
    }

    fn is_prefixed(&self, token: &Token) -> bool {
        !token.quoted
            && (token.text.starts_with(&self.option_prefix)
                || token.text.starts_with(&self.alias_prefix))
    }

    /// Split a prefixed token into `(by_alias, name)`, longest prefix first.
    fn strip_prefix<'t>(&self, text: &'t str) -> Option<(bool, &'t str)> {
        let by_id = text.strip_prefix(self.option_prefix.as_str());
        let by_alias = text.strip_prefix(self.alias_prefix.as_str());
        match (by_id, by_alias) {
            (Some(id), Some(alias)) => {
                if self.option_prefix.len() >= self.alias_prefix.len() {
                    Some((false, id))
                } else {
                    Some((true, alias))
                }
            }
            (Some(id), None) => Some((false, id)),
            (None, Some(alias)) => Some((true, alias)),
            (None, None) => None,
        }
    }
}

/// Value bound to an option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Single(String),
    /// A repeatable option given more than once.
    List(Vec<String>),
}

impl OptionValue {
    /// First (or only) value.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Single(v) => v,
            Self::List(values) => values.first().map(String::as_str).unwrap_or_default(),
        }
    }

    pub fn values(&self) -> &[String] {
        match self {
            Self::Single(v) => std::slice::from_ref(v),
            Self::List(values) => values,
        }
    }

    fn push(&mut self, value: String) {
        match self {
            Self::Single(first) => {
                let first = std::mem::take(first);
                *self = Self::List(vec![first, value]);
            }
            Self::List(values) => values.push(value),
        }
    }
}

/// A request resolved against exactly one descriptor.
#[derive(Debug, Clone)]
pub struct ParsedCommand {
    pub request: TerminalRequest,
    pub descriptor: Arc<CommandDescriptor>,
    /// Option id to value.
    pub options: BTreeMap<String, OptionValue>,
    /// Positional values, bound in declaration order.
    pub arguments: Vec<String>,
}

impl ParsedCommand {
    pub fn option(&self, id: &str) -> Option<&OptionValue> {
        self.options.get(id)
    }

    /// Whether a boolean switch is set.
    pub fn flag(&self, id: &str) -> bool {
        self.options
            .get(id)
            .is_some_and(|v| v.as_str().eq_ignore_ascii_case("true"))
    }

    /// Value of the declared argument `id`.
    pub fn argument(&self, id: &str) -> Option<&str> {
        let index = self.descriptor.arguments.iter().position(|a| a.id == id)?;
        self.arguments.get(index).map(String::as_str)
    }

    /// Bound arguments with their descriptors.
    pub fn bound_arguments(&self) -> impl Iterator<Item = (&ArgumentDescriptor, &str)> {
        self.descriptor
            .arguments
            .iter()
            .zip(self.arguments.iter().map(String::as_str))
    }
}

/// Turns a request into a [`ParsedCommand`].
pub trait Parse: Send + Sync {
    fn parse(&self, request: &TerminalRequest) -> RouteResult<ParsedCommand>;
}

/// Parser over a frozen command store.
#[derive(Debug, Clone)]
pub struct CommandParser {
    store: Arc<CommandStore>,
    options: ParserOptions,
}

impl CommandParser {
    pub fn new(store: Arc<CommandStore>, options: ParserOptions) -> RouteResult<Self> {
        options.validate()?;
        Ok(Self { store, options })
    }

    pub fn store(&self) -> &Arc<CommandStore> {
        &self.store
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Resolve the command chain, returning the deepest command and the
    /// number of tokens consumed.
    fn resolve(&self, tokens: &[Token]) -> RouteResult<(Arc<CommandDescriptor>, usize)> {
        let Some(first) = tokens.first() else {
            return Err(RouteError::MissingCommand);
        };
        if self.options.is_prefixed(first) {
            return Err(RouteError::MissingCommand);
        }

        let Some(root) = self.store.get(&first.text) else {
            return Err(RouteError::UnsupportedCommand(first.text.clone()));
        };
        if !root.command_type.is_top_level() {
            return Err(RouteError::InvalidCommand {
                command: root.id.clone(),
                reason: format!("{} commands cannot be invoked directly", root.command_type),
            });
        }

        let mut current = Arc::clone(root);
        let mut consumed = 1;
        for token in &tokens[1..] {
            if token.quoted || self.options.is_prefixed(token) {
                break;
            }
            match self.store.child(&current.id, &token.text) {
                Some(child) => {
                    current = Arc::clone(child);
                    consumed += 1;
                }
                None => break,
            }
        }

        if current.command_type == CommandType::Group {
            return Err(RouteError::InvalidCommand {
                command: current.id.clone(),
                reason: "a subcommand is required".to_string(),
            });
        }
        Ok((current, consumed))
    }

    fn lookup_option<'d>(
        &self,
        descriptor: &'d CommandDescriptor,
        token: &Token,
    ) -> Option<(&'d OptionDescriptor, Option<String>)> {
        let (by_alias, name) = self.options.strip_prefix(&token.text)?;
        let (name, inline) = match name.split_once(self.options.value_separator) {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (name, None),
        };
        let option = if by_alias {
            descriptor.option_by_alias(name)
        } else {
            descriptor.option_by_id(name)
        }?;
        Some((option, inline))
    }
}

/// Negative numbers are values, not aliases. `-nan` and `-inf` are aliases.
fn looks_numeric(text: &str) -> bool {
    let unsigned = text.strip_prefix(['-', '+']).unwrap_or(text);
    unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.') && text.parse::<f64>().is_ok()
}

impl Parse for CommandParser {
    fn parse(&self, request: &TerminalRequest) -> RouteResult<ParsedCommand> {
        let tokens = tokenize(&request.raw, self.options.separator)?;
        let (descriptor, consumed) = self.resolve(&tokens)?;

        let mut options: BTreeMap<String, OptionValue> = BTreeMap::new();
        let mut arguments = Vec::new();
        let mut rest = tokens[consumed..].iter().peekable();

        while let Some(token) = rest.next() {
            let is_flag = self.options.is_prefixed(token);
            let option = if is_flag {
                self.lookup_option(&descriptor, token)
            } else {
                None
            };

            let Some((option, inline)) = option else {
                if is_flag && !looks_numeric(&token.text) {
                    return Err(RouteError::UnsupportedOption {
                        command: descriptor.id.clone(),
                        option: token.text.clone(),
                    });
                }
                if arguments.len() >= descriptor.arguments.len() {
                    return Err(RouteError::UnsupportedArgument(token.text.clone()));
                }
                arguments.push(token.text.clone());
                continue;
            };

            let value = match inline {
                Some(value) => value,
                None if option.is_switch() => "true".to_string(),
                None => {
                    let takes_next = rest
                        .peek()
                        .is_some_and(|next| !self.options.is_prefixed(next) || looks_numeric(&next.text));
                    match rest.next_if(|_| takes_next) {
                        Some(next) => next.text.clone(),
                        None => {
                            return Err(RouteError::invalid_option(
                                &option.id,
                                format!("expects a {} value", option.data_type),
                            ));
                        }
                    }
                }
            };

            match options.get_mut(&option.id) {
                Some(_) if !option.has(OptionFlag::Repeatable) => {
                    return Err(RouteError::DuplicateOption(option.id.clone()));
                }
                Some(existing) => existing.push(value),
                None => {
                    options.insert(option.id.clone(), OptionValue::Single(value));
                }
            }
        }

        if let Some(missing) = descriptor
            .options
            .iter()
            .find(|o| o.has(OptionFlag::Required) && !options.contains_key(&o.id))
        {
            return Err(RouteError::MissingOption(missing.id.clone()));
        }
        if let Some(missing) = descriptor
            .arguments
            .iter()
            .skip(arguments.len())
            .find(|a| a.has(crate::commands::ArgumentFlag::Required))
        {
            return Err(RouteError::MissingArgument(missing.id.clone()));
        }

        Ok(ParsedCommand {
            request: request.clone(),
            descriptor,
            options,
            arguments,
        })
    }
}
