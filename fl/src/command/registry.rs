//! Command registry and permission filtering

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, warn};

use super::{Command, CommandSender};
use crate::modules::CommandModule;

/// Umbrella permission granting every command
pub const PERMISSION_ROOT: &str = "flare";

/// Permission guarding a single command
pub fn command_permission(primary_alias: &str) -> String {
    format!("{PERMISSION_ROOT}.{primary_alias}")
}

/// The command set handed to the platform is invalid
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Command has no aliases")]
    EmptyAliases,

    #[error("Command '{alias}' has no executor")]
    MissingExecutor { alias: String },

    #[error("Alias '{alias}' is claimed by both '{first}' and '{second}'")]
    DuplicateAlias { alias: String, first: String, second: String },
}

/// Fixed, ordered set of command modules and their commands
///
/// Module order is listing order and first-match order for alias resolution.
pub struct CommandRegistry {
    modules: Vec<Box<dyn CommandModule>>,
    commands: Vec<Command>,
}

impl CommandRegistry {
    /// Collect the commands of every module and check alias uniqueness
    pub fn new(modules: Vec<Box<dyn CommandModule>>) -> Result<Self, RegistryError> {
        debug!(modules = modules.len(), "CommandRegistry::new: called");
        let mut commands = Vec::new();
        for module in &modules {
            let before = commands.len();
            module.register_commands(&mut |command| commands.push(command))?;
            debug!(module = module.name(), commands = commands.len() - before, "CommandRegistry::new: registered module");
        }

        let mut owners: HashMap<&str, &str> = HashMap::new();
        for command in &commands {
            for alias in command.aliases() {
                if let Some(first) = owners.insert(alias, command.primary_alias()) {
                    return Err(RegistryError::DuplicateAlias {
                        alias: alias.clone(),
                        first: first.to_string(),
                        second: command.primary_alias().to_string(),
                    });
                }
            }
        }

        Ok(Self { modules, commands })
    }

    /// Every command in registry order
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn modules(&self) -> &[Box<dyn CommandModule>] {
        &self.modules
    }

    /// Commands `sender` may see and run, in registry order
    pub fn visible_commands(&self, sender: &dyn CommandSender) -> Vec<&Command> {
        if sender.has_permission(PERMISSION_ROOT) {
            return self.commands.iter().collect();
        }
        self.commands
            .iter()
            .filter(|command| sender.has_permission(&command_permission(command.primary_alias())))
            .collect()
    }

    /// Close every module; returns how many failed
    pub fn close_modules(&self) -> usize {
        let mut failures = 0;
        for module in &self.modules {
            if let Err(e) = module.close() {
                warn!(module = module.name(), error = %e, "Failed to close command module");
                failures += 1;
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Arguments, CommandExecutor, CommandResponseHandler};
    use crate::platform::Platform;
    use crate::testing::RecordingSender;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Noop;

    #[async_trait]
    impl CommandExecutor for Noop {
        async fn execute(
            &self,
            _platform: &Arc<Platform>,
            _sender: &Arc<dyn CommandSender>,
            _resp: &CommandResponseHandler,
            _args: &Arguments,
        ) -> eyre::Result<()> {
            Ok(())
        }
    }

    struct Fixed {
        aliases: Vec<Vec<&'static str>>,
        closes: Arc<AtomicUsize>,
        fail_close: bool,
    }

    impl Fixed {
        fn new(aliases: Vec<Vec<&'static str>>) -> Self {
            Self {
                aliases,
                closes: Arc::new(AtomicUsize::new(0)),
                fail_close: false,
            }
        }
    }

    impl CommandModule for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn register_commands(&self, sink: &mut dyn FnMut(Command)) -> Result<(), RegistryError> {
            for aliases in &self.aliases {
                sink(Command::builder().aliases(aliases.clone()).executor(Noop).build()?);
            }
            Ok(())
        }

        fn close(&self) -> eyre::Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                eyre::bail!("close failed");
            }
            Ok(())
        }
    }

    fn registry() -> CommandRegistry {
        CommandRegistry::new(vec![
            Box::new(Fixed::new(vec![vec!["profiler", "sampler"]])),
            Box::new(Fixed::new(vec![vec!["tps"], vec!["health", "hr"]])),
            Box::new(Fixed::new(vec![vec!["gc"]])),
        ])
        .unwrap()
    }

    fn primaries(commands: &[&Command]) -> Vec<String> {
        commands.iter().map(|c| c.primary_alias().to_string()).collect()
    }

    #[test]
    fn test_commands_in_module_order() {
        assert_eq!(
            primaries(&registry().commands().iter().collect::<Vec<_>>()),
            vec!["profiler", "tps", "health", "gc"]
        );
    }

    #[test]
    fn test_umbrella_sees_everything() {
        let sender = RecordingSender::with_permissions(&["flare"]);
        assert_eq!(registry().visible_commands(&sender).len(), 4);
    }

    #[test]
    fn test_permitted_subset_in_order() {
        let sender = RecordingSender::with_permissions(&["flare.gc", "flare.profiler", "flare.sampler"]);
        assert_eq!(primaries(&registry().visible_commands(&sender)), vec!["profiler", "gc"]);
    }

    #[test]
    fn test_secondary_alias_permission_does_not_count() {
        let sender = RecordingSender::with_permissions(&["flare.hr"]);
        assert!(registry().visible_commands(&sender).is_empty());
    }

    #[test]
    fn test_duplicate_alias_rejected() {
        let result = CommandRegistry::new(vec![
            Box::new(Fixed::new(vec![vec!["health", "hr"]])),
            Box::new(Fixed::new(vec![vec!["hr"]])),
        ]);
        assert_eq!(
            result.err(),
            Some(RegistryError::DuplicateAlias {
                alias: "hr".to_string(),
                first: "health".to_string(),
                second: "hr".to_string(),
            })
        );
    }

    #[test]
    fn test_close_attempts_every_module() {
        let failing = Fixed {
            fail_close: true,
            ..Fixed::new(vec![vec!["a"]])
        };
        let healthy = Fixed::new(vec![vec!["b"]]);
        let (failing_closes, healthy_closes) = (failing.closes.clone(), healthy.closes.clone());

        let registry = CommandRegistry::new(vec![Box::new(failing), Box::new(healthy)]).unwrap();
        assert_eq!(registry.close_modules(), 1);
        assert_eq!(failing_closes.load(Ordering::SeqCst), 1);
        assert_eq!(healthy_closes.load(Ordering::SeqCst), 1);
    }
}
