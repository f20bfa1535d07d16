//! Command handler registry.
//!
//! The `Registry` binds runners and checkers to declared commands and keeps
//! per-command usage statistics.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::traits::{Checker, Runner};
use crate::commands::{CommandDescriptor, CommandStore, CommandType};
use crate::error::{RouteError, RouteResult};

/// Handlers bound to one command.
#[derive(Clone)]
pub struct Binding {
    pub runner: Arc<dyn Runner>,
    pub checker: Option<Arc<dyn Checker>>,
}

/// Registry of declared commands and their handlers.
pub struct Registry {
    store: Arc<CommandStore>,
    bindings: HashMap<String, Binding>,
    /// Command usage counters
    command_counts: HashMap<String, Arc<AtomicU64>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn store(&self) -> &Arc<CommandStore> {
        &self.store
    }

    /// Handlers for `command_id`.
    pub fn binding(&self, command_id: &str) -> Option<&Binding> {
        self.bindings.get(command_id)
    }

    /// Count one invocation of `command_id`.
    pub fn record_use(&self, command_id: &str) {
        if let Some(counter) = self.command_counts.get(command_id) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Usage statistics, most used first.
    pub fn command_stats(&self) -> Vec<(String, u64)> {
        let mut stats: Vec<_> = self
            .command_counts
            .iter()
            .map(|(cmd, count)| (cmd.clone(), count.load(Ordering::Relaxed)))
            .filter(|(_, count)| *count > 0) // Only include used commands
            .collect();

        stats.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        stats
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut bound: Vec<_> = self.bindings.keys().collect();
        bound.sort();
        f.debug_struct("Registry")
            .field("commands", &self.store.len())
            .field("bound", &bound)
            .finish()
    }
}

/// Collects declarations and handlers, validated together by [`build`](Self::build).
#[derive(Default)]
pub struct RegistryBuilder {
    descriptors: Vec<CommandDescriptor>,
    runners: HashMap<String, Arc<dyn Runner>>,
    checkers: HashMap<String, Arc<dyn Checker>>,
    conflicts: Vec<String>,
}

impl RegistryBuilder {
    /// Declare a command without handlers (groups).
    pub fn declare(mut self, descriptor: CommandDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Declare a command and bind its runner.
    pub fn register(self, descriptor: CommandDescriptor, runner: impl Runner + 'static) -> Self {
        let id = descriptor.id.clone();
        self.declare(descriptor).runner(id, runner)
    }

    /// Declare a command and bind its checker and runner.
    pub fn register_checked(
        self,
        descriptor: CommandDescriptor,
        checker: impl Checker + 'static,
        runner: impl Runner + 'static,
    ) -> Self {
        let id = descriptor.id.clone();
        self.declare(descriptor)
            .runner(id.clone(), runner)
            .checker(id, checker)
    }

    /// Bind a runner to a command declared elsewhere.
    pub fn runner(mut self, command_id: impl Into<String>, runner: impl Runner + 'static) -> Self {
        let id = command_id.into();
        if self.runners.insert(id.clone(), Arc::new(runner)).is_some() {
            self.conflicts.push(format!("command '{id}' has more than one runner"));
        }
        self
    }

    /// Bind a checker to a command declared elsewhere.
    pub fn checker(mut self, command_id: impl Into<String>, checker: impl Checker + 'static) -> Self {
        let id = command_id.into();
        if self.checkers.insert(id.clone(), Arc::new(checker)).is_some() {
            self.conflicts.push(format!("command '{id}' has more than one checker"));
        }
        self
    }

    pub fn build(self) -> RouteResult<Registry> {
        if let Some(conflict) = self.conflicts.into_iter().next() {
            return Err(RouteError::InvalidDeclaration(conflict));
        }

        let store = CommandStore::build(self.descriptors)?;
        let mut runners = self.runners;
        let mut checkers = self.checkers;

        for id in runners.keys().chain(checkers.keys()) {
            let Some(descriptor) = store.get(id) else {
                return Err(RouteError::InvalidDeclaration(format!(
                    "handler registered for undeclared command '{id}'"
                )));
            };
            if descriptor.command_type == CommandType::Group {
                return Err(RouteError::InvalidDeclaration(format!(
                    "group '{id}' cannot have handlers"
                )));
            }
        }

        let mut bindings = HashMap::new();
        let mut command_counts = HashMap::new();
        for descriptor in store.iter() {
            if descriptor.command_type == CommandType::Group {
                continue;
            }
            let Some(runner) = runners.remove(&descriptor.id) else {
                return Err(RouteError::InvalidDeclaration(format!(
                    "command '{}' has no runner",
                    descriptor.id
                )));
            };
            let checker = checkers.remove(&descriptor.id);
            bindings.insert(descriptor.id.clone(), Binding { runner, checker });
            command_counts.insert(descriptor.id.clone(), Arc::new(AtomicU64::new(0)));
        }

        Ok(Registry {
            store: Arc::new(store),
            bindings,
            command_counts,
        })
    }
}
