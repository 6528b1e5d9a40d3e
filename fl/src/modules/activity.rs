//! `activity` command

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use eyre::Result;

use super::CommandModule;
use super::format::format_duration;
use crate::activity::Activity;
use crate::command::{Arguments, Command, CommandExecutor, CommandResponseHandler, CommandSender, Message, RegistryError};
use crate::platform::Platform;

const PAGE_SIZE: usize = 5;

pub struct ActivityLogModule;

impl CommandModule for ActivityLogModule {
    fn name(&self) -> &'static str {
        "activity"
    }

    fn register_commands(&self, sink: &mut dyn FnMut(Command)) -> Result<(), RegistryError> {
        sink(
            Command::builder()
                .aliases(["activity", "activitylog"])
                .argument_usage("page", Some("page no"))
                .executor(ActivityCommand)
                .build()?,
        );
        Ok(())
    }
}

struct ActivityCommand;

#[async_trait]
impl CommandExecutor for ActivityCommand {
    async fn execute(
        &self,
        platform: &Arc<Platform>,
        _sender: &Arc<dyn CommandSender>,
        resp: &CommandResponseHandler,
        args: &Arguments,
    ) -> Result<()> {
        let requested = args.int_flag("page")?.unwrap_or(1).max(1) as usize;

        let entries = platform.activity_log().entries();
        if entries.is_empty() {
            resp.reply_prefixed(Message::info("There are no entries in the activity log."));
            return Ok(());
        }

        let pages = entries.len().div_ceil(PAGE_SIZE);
        let page = requested.min(pages);
        resp.reply_prefixed(Message::highlight(format!("Recent activity (page {page}/{pages}):")));

        let now = Utc::now();
        for (index, activity) in entries.iter().enumerate().skip((page - 1) * PAGE_SIZE).take(PAGE_SIZE) {
            let ago = Utc
                .timestamp_millis_opt(activity.time)
                .single()
                .and_then(|time| (now - time).to_std().ok())
                .map(|elapsed| format!("{} ago", format_duration(elapsed)))
                .unwrap_or_else(|| "at an unknown time".to_string());
            resp.reply(Message::info(format!(
                "#{} {} by {}, {}",
                index + 1,
                activity.kind,
                activity.user,
                ago
            )));
            resp.reply(Message::plain(format!("    {}", describe(activity))));
        }

        if page < pages {
            resp.reply(Message::plain(format!(
                "Use '/{} activity --page {}' to view the next page.",
                resp.command_name(),
                page + 1
            )));
        }
        Ok(())
    }
}

fn describe(activity: &Activity) -> String {
    match activity.data.kind.as_str() {
        Activity::DATA_TYPE_URL => format!("Link: {}", activity.data.value),
        Activity::DATA_TYPE_FILE => format!("File: {}", activity.data.value),
        other => format!("{other}: {}", activity.data.value),
    }
}
