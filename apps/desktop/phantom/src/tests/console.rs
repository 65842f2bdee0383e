// Unit tests for console command parsing

use crate::console::ConsoleCommand;
use crate::error::PhantomError;

use common::ListenerKey;

/// **VALUE**: Verifies every verb parses to its command, case-insensitively.
///
/// **WHY THIS MATTERS**: The console is the only front-end; an unparsable verb is an
/// unreachable feature.
///
/// **BUG THIS CATCHES**: Would catch a verb missing from the match or a renamed alias.
#[test]
fn given_known_verbs_when_parsed_then_map_to_commands() {
    let key = ListenerKey::from("127.0.0.1:8080");

    let cases = [
        ("toggle 127.0.0.1:8080", ConsoleCommand::Toggle(key.clone())),
        ("CONFIRM 127.0.0.1:8080", ConsoleCommand::Confirm(key.clone())),
        ("  cancel   127.0.0.1:8080 ", ConsoleCommand::Cancel(key.clone())),
        ("remove 127.0.0.1:8080", ConsoleCommand::Remove(key.clone())),
        ("nodes", ConsoleCommand::Nodes),
        ("connect", ConsoleCommand::Connect),
        ("disconnect", ConsoleCommand::Disconnect),
        ("start-all", ConsoleCommand::StartAll),
        ("stop-all", ConsoleCommand::StopAll),
        ("reload", ConsoleCommand::Reload),
        ("status", ConsoleCommand::Status),
        ("?", ConsoleCommand::Help),
        ("exit", ConsoleCommand::Quit),
    ];

    for (line, expected) in cases {
        assert_eq!(line.parse::<ConsoleCommand>().unwrap(), expected, "{line}");
    }
}

/// **VALUE**: Verifies the listen address is kept byte-exact.
///
/// **WHY THIS MATTERS**: Keys are compared exactly against the backend config.
///
/// **BUG THIS CATCHES**: Would catch the argument being lowercased along with the verb.
#[test]
fn given_mixed_case_address_when_parsed_then_address_unchanged() {
    let command: ConsoleCommand = "Toggle LocalHost:80".parse().unwrap();

    assert_eq!(command, ConsoleCommand::Toggle(ListenerKey::from("LocalHost:80")));
}

/// **VALUE**: Verifies malformed input yields a console error instead of a guess.
///
/// **WHY THIS MATTERS**: `toggle` without an address must not act on some default.
///
/// **BUG THIS CATCHES**: Would catch missing or extra arguments being ignored.
#[test]
fn given_malformed_lines_when_parsed_then_console_error() {
    for line in [
        "",
        "toggle",
        "connect now",
        "toggle a b",
        "launch",
        "add 127.0.0.1:8080",
        "label 127.0.0.1:8080",
        "nodes all",
    ] {
        let result = line.parse::<ConsoleCommand>();
        assert!(
            matches!(result, Err(PhantomError::Console { .. })),
            "{line:?} was accepted"
        );
    }
}

/// **VALUE**: Verifies `add` and `label` split the address from free text.
///
/// **WHY THIS MATTERS**: Labels are free text and may contain spaces; the address and
/// hostname never do.
///
/// **BUG THIS CATCHES**: Would catch a label truncated at its first space or the
/// hostname swallowed into the label.
#[test]
fn given_add_and_label_lines_when_parsed_then_text_kept_whole() {
    let key = ListenerKey::from("127.0.0.1:5432");

    let add: ConsoleCommand = "add 127.0.0.1:5432 db.example.com  prod postgres"
        .parse()
        .unwrap();
    let add_unlabelled: ConsoleCommand = "add 127.0.0.1:5432 db.example.com".parse().unwrap();
    let label: ConsoleCommand = "label 127.0.0.1:5432 primary db ".parse().unwrap();

    assert_eq!(
        add,
        ConsoleCommand::Add {
            listen: key.clone(),
            hostname: String::from("db.example.com"),
            label: String::from("prod postgres"),
        }
    );
    assert_eq!(
        add_unlabelled,
        ConsoleCommand::Add {
            listen: key.clone(),
            hostname: String::from("db.example.com"),
            label: String::new(),
        }
    );
    assert_eq!(
        label,
        ConsoleCommand::Label {
            listen: key,
            label: String::from("primary db"),
        }
    );
}
