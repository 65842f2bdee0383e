//! Line commands accepted on stdin.

use crate::error::PhantomError;

use common::{ErrorLocation, ListenerKey};

use std::panic::Location;
use std::str::FromStr;

pub const HELP: &str = "\
Commands:
  toggle <listen>                   start a stopped forwarder, or ask to stop a running one
  confirm <listen>                  stop a forwarder awaiting confirmation
  cancel <listen>                   keep a forwarder awaiting confirmation running
  add <listen> <hostname> [label]   add a forwarder tunnelling to <hostname> and start it
  remove <listen>                   stop and delete a forwarder
  label <listen> <text>             change a forwarder's label
  nodes                             list running forwarders and their gateway
  connect                           connect the backend upstream
  disconnect                        disconnect the backend upstream
  start-all                         start every forwarder
  stop-all                          stop every forwarder
  reload                            re-read listeners and forwarder status from the backend
  status                            print the current state as JSON
  help                              show this text
  quit                              exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Toggle(ListenerKey),
    Confirm(ListenerKey),
    Cancel(ListenerKey),
    Add {
        listen: ListenerKey,
        hostname: String,
        label: String,
    },
    Remove(ListenerKey),
    Label {
        listen: ListenerKey,
        label: String,
    },
    Nodes,
    Connect,
    Disconnect,
    StartAll,
    StopAll,
    Reload,
    Status,
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = PhantomError;

    #[track_caller]
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (verb, rest) = split_word(line);
        if verb.is_empty() {
            return Err(console_error("Empty command"));
        }
        let (argument, tail) = split_word(rest);

        let keyed = |build: fn(ListenerKey) -> ConsoleCommand| match (argument, tail) {
            ("", _) => Err(console_error(format!("Usage: {verb} <listen>"))),
            (listen, "") => Ok(build(ListenerKey::from(listen))),
            _ => Err(console_error(format!("Too many arguments for {verb}"))),
        };

        let bare = |command: ConsoleCommand| match argument {
            "" => Ok(command),
            _ => Err(console_error(format!("{verb} takes no argument"))),
        };

        match verb.to_ascii_lowercase().as_str() {
            "toggle" => keyed(ConsoleCommand::Toggle),
            "confirm" => keyed(ConsoleCommand::Confirm),
            "cancel" => keyed(ConsoleCommand::Cancel),
            "remove" => keyed(ConsoleCommand::Remove),
            "add" => {
                let (hostname, label) = split_word(tail);
                if argument.is_empty() || hostname.is_empty() {
                    return Err(console_error("Usage: add <listen> <hostname> [label]"));
                }
                Ok(ConsoleCommand::Add {
                    listen: ListenerKey::from(argument),
                    hostname: hostname.to_string(),
                    label: label.to_string(),
                })
            }
            "label" => {
                if argument.is_empty() || tail.is_empty() {
                    return Err(console_error("Usage: label <listen> <text>"));
                }
                Ok(ConsoleCommand::Label {
                    listen: ListenerKey::from(argument),
                    label: tail.to_string(),
                })
            }
            "nodes" => bare(ConsoleCommand::Nodes),
            "connect" => bare(ConsoleCommand::Connect),
            "disconnect" => bare(ConsoleCommand::Disconnect),
            "start-all" => bare(ConsoleCommand::StartAll),
            "stop-all" => bare(ConsoleCommand::StopAll),
            "reload" => bare(ConsoleCommand::Reload),
            "status" => bare(ConsoleCommand::Status),
            "help" | "?" => bare(ConsoleCommand::Help),
            "quit" | "exit" => bare(ConsoleCommand::Quit),
            _ => Err(console_error(format!(
                "Unknown command {verb}, type `help` for the list"
            ))),
        }
    }
}

/// First whitespace-separated word and the trimmed remainder.
fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (text, ""),
    }
}

#[track_caller]
fn console_error(message: impl Into<String>) -> PhantomError {
    PhantomError::Console {
        message: message.into(),
        location: ErrorLocation::from(Location::caller()),
    }
}
