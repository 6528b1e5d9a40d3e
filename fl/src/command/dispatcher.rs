//! Command dispatch and tab completion
//!
//! Every command body runs under one FIFO-fair execution lock. Permission
//! checks, the banner and tab completion never touch it.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{
    ArgumentCompleter, ArgumentParseError, Arguments, Command, CommandRegistry, CommandResponseHandler, CommandSender,
    Message, starts_with,
};
use crate::platform::Platform;

/// Routes raw argument vectors to commands
pub struct CommandDispatcher {
    registry: CommandRegistry,
    execute_lock: Mutex<()>,
}

impl CommandDispatcher {
    pub fn new(registry: CommandRegistry) -> Self {
        Self {
            registry,
            execute_lock: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Whether a command body is running or queued on the lock
    pub fn is_busy(&self) -> bool {
        self.execute_lock.try_lock().is_err()
    }

    /// Resolve and run one command invocation
    pub async fn dispatch(&self, platform: &Arc<Platform>, sender: Arc<dyn CommandSender>, args: Vec<String>) {
        debug!(sender = %sender.name(), ?args, "CommandDispatcher::dispatch: called");
        let resp = CommandResponseHandler::new(Arc::clone(platform.host()), Arc::clone(&sender));

        let commands = self.registry.visible_commands(sender.as_ref());
        if commands.is_empty() {
            debug!(sender = %sender.name(), "CommandDispatcher::dispatch: no visible commands");
            resp.reply_prefixed(Message::error("You do not have permission to use this command."));
            return;
        }

        if args.is_empty() {
            send_banner(platform, &resp);
            return;
        }

        let _guard = self.execute_lock.lock().await;

        let mut tokens = args.into_iter();
        let alias = tokens.next().unwrap_or_default().to_lowercase();
        let tail: Vec<String> = tokens.collect();

        match commands.iter().find(|command| command.has_alias(&alias)) {
            Some(command) => {
                let resp = resp.for_command(command.primary_alias());
                execute(platform, command, &sender, &resp, tail).await;
            }
            None => {
                debug!(%alias, "CommandDispatcher::dispatch: unknown command");
                send_usage(platform, &commands, &resp);
            }
        }
    }

    /// Suggestions for a partially typed invocation
    pub fn complete(&self, platform: &Platform, sender: &dyn CommandSender, args: &[String]) -> Vec<String> {
        let commands = self.registry.visible_commands(sender);
        if commands.is_empty() {
            return Vec::new();
        }

        if args.len() <= 1 {
            let aliases = commands.iter().map(|c| c.primary_alias().to_string()).collect();
            return ArgumentCompleter::new().at(0, starts_with(aliases)).complete(args);
        }

        let alias = args[0].to_lowercase();
        commands
            .iter()
            .find(|command| command.has_alias(&alias))
            .map(|command| command.tab_completer().completions(platform, sender, &args[1..]))
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn execute_lock(&self) -> &Mutex<()> {
        &self.execute_lock
    }
}

async fn execute(
    platform: &Arc<Platform>,
    command: &Command,
    sender: &Arc<dyn CommandSender>,
    resp: &CommandResponseHandler,
    tail: Vec<String>,
) {
    let alias = command.primary_alias();
    let arguments = match Arguments::parse_with_schema(tail, command.arguments()) {
        Ok(arguments) => arguments,
        Err(e) => {
            debug!(%alias, error = %e, "execute: argument parse failed");
            resp.reply_prefixed(Message::error(e.to_string()));
            return;
        }
    };

    info!(%alias, sender = %sender.name(), "Executing command");
    if let Err(e) = command.executor().execute(platform, sender, resp, &arguments).await {
        match e.downcast_ref::<ArgumentParseError>() {
            Some(parse_error) => resp.reply_prefixed(Message::error(parse_error.to_string())),
            None => {
                warn!(%alias, error = ?e, "Command failed");
                resp.reply_prefixed(Message::error(format!(
                    "An internal error occurred whilst executing '{alias}'. Check the log for details."
                )));
            }
        }
    }
}

fn send_banner(platform: &Platform, resp: &CommandResponseHandler) {
    resp.reply_prefixed(Message::highlight(format!("flare v{}", platform.host().version())));
    resp.reply_prefixed(Message::info(format!(
        "Use /{} help to view usage information.",
        platform.host().command_name()
    )));
}

fn send_usage(platform: &Platform, commands: &[&Command], resp: &CommandResponseHandler) {
    resp.reply_prefixed(Message::highlight(format!("flare v{}", platform.host().version())));
    let command_name = platform.host().command_name();
    for command in commands {
        resp.reply(Message::info(format!("> /{} {}", command_name, command.primary_alias())));
        for argument in command.arguments() {
            resp.reply(Message::plain(format!("       {}", argument.usage())));
        }
    }
}
