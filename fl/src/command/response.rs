//! Reply and broadcast handle given to executors

use std::sync::Arc;

use tracing::debug;

use super::registry::{PERMISSION_ROOT, command_permission};
use super::{CommandSender, Message};
use crate::host::PlatformHost;

/// Sends replies to the invoking sender and broadcasts to permitted senders
///
/// Cheap to clone; modules that report later (a tick monitor, a profiler
/// timeout) keep a clone after the dispatch has returned.
#[derive(Clone)]
pub struct CommandResponseHandler {
    host: Arc<dyn PlatformHost>,
    sender: Arc<dyn CommandSender>,
    command: Option<String>,
}

impl CommandResponseHandler {
    pub fn new(host: Arc<dyn PlatformHost>, sender: Arc<dyn CommandSender>) -> Self {
        Self {
            host,
            sender,
            command: None,
        }
    }

    /// Bind to the resolved command, widening broadcasts to its permission
    pub fn for_command(mut self, primary_alias: &str) -> Self {
        self.command = Some(primary_alias.to_string());
        self
    }

    pub fn sender(&self) -> &Arc<dyn CommandSender> {
        &self.sender
    }

    pub fn sender_name(&self) -> String {
        self.sender.name()
    }

    /// Name the host registers its command under, e.g. `flare` in `/flare tps`
    pub fn command_name(&self) -> String {
        self.host.command_name()
    }

    pub fn reply(&self, message: impl Into<Message>) {
        self.sender.reply(message.into());
    }

    pub fn reply_prefixed(&self, message: impl Into<Message>) {
        self.sender.reply_prefixed(message.into());
    }

    /// Send to the invoking sender and every host sender allowed to run the command
    pub fn broadcast(&self, message: impl Into<Message>) {
        let message = message.into();
        for recipient in self.recipients() {
            recipient.reply(message.clone());
        }
    }

    pub fn broadcast_prefixed(&self, message: impl Into<Message>) {
        let message = message.into();
        for recipient in self.recipients() {
            recipient.reply_prefixed(message.clone());
        }
    }

    fn recipients(&self) -> Vec<Arc<dyn CommandSender>> {
        let own_name = self.sender.name();
        let permission = self.command.as_deref().map(command_permission);

        let mut recipients = vec![Arc::clone(&self.sender)];
        recipients.extend(self.host.command_senders().into_iter().filter(|candidate| {
            candidate.name() != own_name
                && (candidate.has_permission(PERMISSION_ROOT)
                    || permission.as_deref().is_some_and(|node| candidate.has_permission(node)))
        }));
        debug!(recipients = recipients.len(), "CommandResponseHandler::recipients: resolved");
        recipients
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingSender, TestHost};

    #[test]
    fn test_broadcast_reaches_permitted_senders_once() {
        let host = Arc::new(TestHost::new());
        let operator = Arc::new(RecordingSender::named("operator", &["flare.tps"]));
        let admin = Arc::new(RecordingSender::named("admin", &["flare"]));
        let player = Arc::new(RecordingSender::named("player", &[]));
        host.add_sender(operator.clone());
        host.add_sender(admin.clone());
        host.add_sender(player.clone());

        let resp = CommandResponseHandler::new(host, operator.clone()).for_command("tps");
        resp.broadcast_prefixed("hello");
        resp.reply("only me");

        assert_eq!(operator.texts(), vec!["[flare] hello", "only me"]);
        assert_eq!(admin.texts(), vec!["[flare] hello"]);
        assert!(player.texts().is_empty());
    }

    #[test]
    fn test_unbound_broadcast_needs_umbrella() {
        let host = Arc::new(TestHost::new());
        let operator = Arc::new(RecordingSender::named("operator", &["flare.tps"]));
        let other = Arc::new(RecordingSender::named("other", &["flare.tps"]));
        host.add_sender(other.clone());

        CommandResponseHandler::new(host, operator.clone()).broadcast("x");
        assert_eq!(operator.texts(), vec!["x"]);
        assert!(other.texts().is_empty());
    }
}
