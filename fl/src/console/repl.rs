//! Interactive console

use std::sync::Arc;

use colored::Colorize;
use eyre::Result;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio::runtime::Handle;
use tracing::{debug, info};

use super::ConsoleSender;
use crate::command::CommandSender;
use crate::platform::Platform;

/// Split a console line into command arguments
///
/// Tokens are separated by single spaces. A leading `flare` or `/flare`
/// (the host's command name) is dropped so both `/flare tps` and `tps` work.
/// With `keep_trailing` the final token is kept even when empty, which is
/// what completion needs after a trailing space.
pub fn split_args(line: &str, command_name: &str, keep_trailing: bool) -> Vec<String> {
    let tokens: Vec<&str> = line.trim_start().split(' ').collect();
    let last = tokens.len().saturating_sub(1);
    let mut args: Vec<String> = tokens
        .iter()
        .enumerate()
        .filter(|(i, token)| !token.is_empty() || (keep_trailing && *i == last))
        .map(|(_, token)| token.to_string())
        .collect();

    if let Some(first) = args.first() {
        let first = first.strip_prefix('/').unwrap_or(first);
        if first.eq_ignore_ascii_case(command_name) && (args.len() > 1 || !keep_trailing) {
            args.remove(0);
        }
    }
    args
}

struct ConsoleHelper {
    platform: Arc<Platform>,
    console: Arc<ConsoleSender>,
    command_name: String,
}

impl Completer for ConsoleHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let head = &line[..pos];
        let start = head.rfind(' ').map(|i| i + 1).unwrap_or(0);
        let args = split_args(head, &self.command_name, true);
        let sender: &dyn CommandSender = self.console.as_ref();

        let candidates = self
            .platform
            .tab_complete_command(sender, &args)
            .into_iter()
            .map(|option| Pair {
                display: option.clone(),
                replacement: option,
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for ConsoleHelper {
    type Hint = String;
}

impl Highlighter for ConsoleHelper {}

impl Validator for ConsoleHelper {}

impl Helper for ConsoleHelper {}

/// Run the console until `exit` or end of input
///
/// Blocks the calling thread; each command is dispatched on `runtime` and
/// awaited before the next prompt.
pub fn run_repl(platform: Arc<Platform>, console: Arc<ConsoleSender>, runtime: Handle) -> Result<()> {
    let command_name = platform.host().command_name();
    print_welcome(&command_name);

    let mut rl: Editor<ConsoleHelper, DefaultHistory> =
        Editor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;
    rl.set_helper(Some(ConsoleHelper {
        platform: Arc::clone(&platform),
        console: Arc::clone(&console),
        command_name: command_name.clone(),
    }));

    loop {
        match rl.readline(&format!("{} ", ">".bright_green())) {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(input);

                if matches!(input, "exit" | "quit" | "stop") {
                    break;
                }

                let args = split_args(input, &command_name, false);
                debug!(?args, "run_repl: dispatching");
                let sender: Arc<dyn CommandSender> = console.clone();
                runtime.block_on(platform.dispatch(sender, args));
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(err) => {
                return Err(eyre::eyre!("Readline error: {}", err));
            }
        }
    }

    info!("Console closed");
    Ok(())
}

fn print_welcome(command_name: &str) {
    println!();
    println!("{}", "Flare console".bright_cyan().bold());
    println!(
        "Type {} for the command list, {} to quit",
        format!("/{command_name}").yellow(),
        "exit".yellow()
    );
    println!();
}
