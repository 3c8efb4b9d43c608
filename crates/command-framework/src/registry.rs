//! Declared command set.

use crate::descriptor::CommandDescriptor;
use crate::error::LookupError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of [`CommandRegistry::register`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterReport {
    /// Number of commands now active.
    pub registered: usize,
    /// Names declared more than once in the call; the last declaration won.
    pub collisions: Vec<String>,
}

/// The set of declared commands, keyed by name.
///
/// Built once, then shared as `Arc<CommandRegistry>`; nothing mutates it after
/// it has been handed to the synchronizer and dispatcher.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<CommandDescriptor>>,
}

impl CommandRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Replace the active set with `descriptors`.
    pub fn register(&mut self, descriptors: impl IntoIterator<Item = CommandDescriptor>) -> RegisterReport {
        let mut commands = HashMap::new();
        let mut collisions = Vec::new();

        for descriptor in descriptors {
            let name = descriptor.name().to_string();
            if commands.insert(name.clone(), Arc::new(descriptor)).is_some() {
                warn!(command = %name, "Command declared twice, keeping the last declaration");
                if !collisions.contains(&name) {
                    collisions.push(name);
                }
            }
        }

        self.commands = commands;
        info!("Registered {} commands", self.commands.len());

        RegisterReport {
            registered: self.commands.len(),
            collisions,
        }
    }

    /// Look up a command by name.
    pub fn resolve(&self, name: &str) -> Result<Arc<CommandDescriptor>, LookupError> {
        self.get(name)
            .ok_or_else(|| LookupError::UnknownCommand(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<Arc<CommandDescriptor>> {
        self.commands.get(name).cloned()
    }

    /// Commands registered per guild.
    pub fn guild_scoped(&self) -> Vec<Arc<CommandDescriptor>> {
        self.sorted(|c| c.is_guild_scoped())
    }

    /// Commands registered once, globally.
    pub fn global(&self) -> Vec<Arc<CommandDescriptor>> {
        self.sorted(|c| !c.is_guild_scoped())
    }

    /// Every command, sorted by name.
    pub fn descriptors(&self) -> Vec<Arc<CommandDescriptor>> {
        self.sorted(|_| true)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    fn sorted(&self, filter: impl Fn(&CommandDescriptor) -> bool) -> Vec<Arc<CommandDescriptor>> {
        let mut out: Vec<_> = self
            .commands
            .values()
            .filter(|c| filter(c))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name().cmp(b.name()));
        out
    }
}
