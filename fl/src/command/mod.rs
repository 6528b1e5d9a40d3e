//! Command system
//!
//! A [`Command`] is an immutable descriptor: aliases, an argument schema, an
//! executor and a tab completer. Commands are produced by command modules,
//! collected into a [`CommandRegistry`] and run by the [`CommandDispatcher`]
//! one at a time.

mod arguments;
mod dispatcher;
mod registry;
mod response;
mod sender;
mod tabcomplete;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use eyre::Result;

use crate::platform::Platform;

pub use arguments::{ArgumentParseError, Arguments};
pub use dispatcher::CommandDispatcher;
pub use registry::{CommandRegistry, PERMISSION_ROOT, RegistryError, command_permission};
pub use response::CommandResponseHandler;
pub use sender::{CommandSender, MESSAGE_PREFIX, Message, Tone};
pub use tabcomplete::{ArgumentCompleter, complete_flags, starts_with};

/// Performs a command
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run the command body
    ///
    /// Returning an [`ArgumentParseError`] (inside the report) replies its
    /// message to the sender; any other error is logged and answered with a
    /// generic failure line.
    async fn execute(
        &self,
        platform: &Arc<Platform>,
        sender: &Arc<dyn CommandSender>,
        resp: &CommandResponseHandler,
        args: &Arguments,
    ) -> Result<()>;
}

/// Suggests completions for the argument tail of a command
pub trait TabCompleter: Send + Sync {
    fn completions(&self, platform: &Platform, sender: &dyn CommandSender, args: &[String]) -> Vec<String>;
}

/// One declared argument of a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentInfo {
    name: String,
    parameter_description: Option<String>,
}

impl ArgumentInfo {
    pub fn new(name: impl Into<String>, parameter_description: Option<&str>) -> Self {
        Self {
            name: name.into().to_lowercase(),
            parameter_description: parameter_description.map(str::to_string),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameter_description(&self) -> Option<&str> {
        self.parameter_description.as_deref()
    }

    pub fn requires_parameter(&self) -> bool {
        self.parameter_description.is_some()
    }

    /// `[--name <description>]` or `[--name]`
    pub fn usage(&self) -> String {
        match &self.parameter_description {
            Some(description) => format!("[--{} <{}>]", self.name, description),
            None => format!("[--{}]", self.name),
        }
    }
}

/// Immutable command descriptor
#[derive(Clone)]
pub struct Command {
    aliases: Vec<String>,
    arguments: Vec<ArgumentInfo>,
    executor: Arc<dyn CommandExecutor>,
    tab_completer: Arc<dyn TabCompleter>,
}

impl Command {
    pub fn builder() -> CommandBuilder {
        CommandBuilder::default()
    }

    /// First alias; the name used for permissions and usage
    pub fn primary_alias(&self) -> &str {
        &self.aliases[0]
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        self.aliases.iter().any(|a| a == alias)
    }

    pub fn arguments(&self) -> &[ArgumentInfo] {
        &self.arguments
    }

    pub fn executor(&self) -> &Arc<dyn CommandExecutor> {
        &self.executor
    }

    pub fn tab_completer(&self) -> &Arc<dyn TabCompleter> {
        &self.tab_completer
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("aliases", &self.aliases)
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Command`]
///
/// Without an explicit tab completer, the declared arguments are offered as
/// `--flag` completions.
#[derive(Default)]
pub struct CommandBuilder {
    aliases: Vec<String>,
    arguments: Vec<ArgumentInfo>,
    executor: Option<Arc<dyn CommandExecutor>>,
    tab_completer: Option<Arc<dyn TabCompleter>>,
}

impl CommandBuilder {
    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases
            .extend(aliases.into_iter().map(|alias| alias.into().to_lowercase()));
        self
    }

    pub fn argument_usage(mut self, name: &str, parameter_description: Option<&str>) -> Self {
        self.arguments.push(ArgumentInfo::new(name, parameter_description));
        self
    }

    pub fn executor(mut self, executor: impl CommandExecutor + 'static) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    pub fn tab_completer(mut self, tab_completer: impl TabCompleter + 'static) -> Self {
        self.tab_completer = Some(Arc::new(tab_completer));
        self
    }

    pub fn build(self) -> Result<Command, RegistryError> {
        if self.aliases.is_empty() || self.aliases.iter().any(|alias| alias.trim().is_empty()) {
            return Err(RegistryError::EmptyAliases);
        }
        let executor = self.executor.ok_or_else(|| RegistryError::MissingExecutor {
            alias: self.aliases[0].clone(),
        })?;
        let tab_completer = match self.tab_completer {
            Some(completer) => completer,
            None => Arc::new(FlagCompleter::new(&self.arguments)),
        };

        Ok(Command {
            aliases: self.aliases,
            arguments: self.arguments,
            executor,
            tab_completer,
        })
    }
}

/// Completes the declared `--flags` of a command
struct FlagCompleter {
    options: Vec<String>,
}

impl FlagCompleter {
    fn new(arguments: &[ArgumentInfo]) -> Self {
        Self {
            options: arguments.iter().map(|arg| format!("--{}", arg.name())).collect(),
        }
    }
}

impl TabCompleter for FlagCompleter {
    fn completions(&self, _platform: &Platform, _sender: &dyn CommandSender, args: &[String]) -> Vec<String> {
        complete_flags(args, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl CommandExecutor for Noop {
        async fn execute(
            &self,
            _platform: &Arc<Platform>,
            _sender: &Arc<dyn CommandSender>,
            _resp: &CommandResponseHandler,
            _args: &Arguments,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_argument_usage() {
        assert_eq!(
            ArgumentInfo::new("timeout", Some("timeout seconds")).usage(),
            "[--timeout <timeout seconds>]"
        );
        assert_eq!(ArgumentInfo::new("stop", None).usage(), "[--stop]");
        assert!(!ArgumentInfo::new("stop", None).requires_parameter());
    }

    #[test]
    fn test_builder_lowercases_aliases() {
        let command = Command::builder()
            .aliases(["Profiler", "sampler"])
            .executor(Noop)
            .build()
            .unwrap();
        assert_eq!(command.primary_alias(), "profiler");
        assert!(command.has_alias("sampler"));
        assert!(!command.has_alias("Profiler"));
    }

    #[test]
    fn test_builder_rejects_missing_parts() {
        let no_aliases = Command::builder().executor(Noop).build().unwrap_err();
        assert!(matches!(no_aliases, RegistryError::EmptyAliases));

        let blank = Command::builder().aliases([" "]).executor(Noop).build().unwrap_err();
        assert!(matches!(blank, RegistryError::EmptyAliases));

        let no_executor = Command::builder().aliases(["gc"]).build().unwrap_err();
        assert!(matches!(no_executor, RegistryError::MissingExecutor { .. }));
    }

    #[test]
    fn test_default_completer_offers_flags() {
        let completer = FlagCompleter::new(&[ArgumentInfo::new("stop", None), ArgumentInfo::new("info", None)]);
        assert_eq!(
            complete_flags(&["--s".to_string()], &completer.options),
            vec!["--stop".to_string()]
        );
    }
}
