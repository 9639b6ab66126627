// Settings console - the "settings" pane of the control panel.
//
// Reads one command per line from stdin and applies it through the policy
// service. The service logs every edit to the activity log itself; replies
// printed here are only for commands that show state.

use super::{Error, Panel};
use crate::core::policy::{CountryCode, PolicyToggle};
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, BufReader};

const DEFAULT_HISTORY_LINES: usize = 20;

const HELP: &str = "\
Commands:
  add <CC>            deny a country (e.g. add RU)
  remove <CC>         allow a country again
  block-all           deny every country except your own
  unblock-all         clear every selectable country
  enable <setting>    turn a setting on
  disable <setting>   turn a setting off
  status              show settings and counters
  countries           list selectable country codes
  history [n]         show the last n activity lines (default 20)
  quit                stop the panel
Settings: delete-chat, block-user, log-user-info, log-block, log-delete, log-errors";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Add(CountryCode),
    Remove(CountryCode),
    BlockAll,
    UnblockAll,
    Enable(PolicyToggle),
    Disable(PolicyToggle),
    Status,
    Countries,
    History(usize),
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let verb = parts.next().unwrap_or_default().to_ascii_lowercase();
        let arg = parts.next();

        let command = match (verb.as_str(), arg) {
            ("add", Some(code)) => ConsoleCommand::Add(code.parse()?),
            ("remove", Some(code)) => ConsoleCommand::Remove(code.parse()?),
            ("block-all", None) => ConsoleCommand::BlockAll,
            ("unblock-all", None) => ConsoleCommand::UnblockAll,
            ("enable", Some(setting)) => ConsoleCommand::Enable(setting.parse()?),
            ("disable", Some(setting)) => ConsoleCommand::Disable(setting.parse()?),
            ("status", None) => ConsoleCommand::Status,
            ("countries", None) => ConsoleCommand::Countries,
            ("history", None) => ConsoleCommand::History(DEFAULT_HISTORY_LINES),
            ("history", Some(n)) => ConsoleCommand::History(n.parse()?),
            ("help", _) | ("?", _) => ConsoleCommand::Help,
            ("quit", None) | ("exit", None) => ConsoleCommand::Quit,
            _ => return Err(format!("Unrecognized command '{}'. Type 'help'.", s.trim()).into()),
        };

        if parts.next().is_some() {
            return Err(format!("Too many arguments in '{}'", s.trim()).into());
        }
        Ok(command)
    }
}

/// Apply one command. Returns text to show the operator, if any.
pub async fn execute(panel: &Panel, command: ConsoleCommand) -> Result<Option<String>, Error> {
    match command {
        ConsoleCommand::Add(code) => panel.policy.toggle_country(code, true).await?,
        ConsoleCommand::Remove(code) => panel.policy.toggle_country(code, false).await?,
        ConsoleCommand::BlockAll => {
            panel.policy.block_all_except_home().await?;
        }
        ConsoleCommand::UnblockAll => {
            panel.policy.unblock_all().await?;
        }
        ConsoleCommand::Enable(toggle) => panel.policy.set_toggle(toggle, true).await?,
        ConsoleCommand::Disable(toggle) => panel.policy.set_toggle(toggle, false).await?,
        ConsoleCommand::Status => return Ok(Some(status_report(panel).await?)),
        ConsoleCommand::Countries => {
            let codes: Vec<&str> = panel
                .policy
                .catalog()
                .codes()
                .iter()
                .map(|c| c.as_str())
                .collect();
            return Ok(Some(
                codes
                    .chunks(20)
                    .map(|row| row.join(" "))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ));
        }
        ConsoleCommand::History(n) => {
            let lines = panel.activity.recent(n);
            if lines.is_empty() {
                return Ok(Some("Activity log is empty.".to_string()));
            }
            return Ok(Some(lines.join("\n")));
        }
        ConsoleCommand::Help => return Ok(Some(HELP.to_string())),
        ConsoleCommand::Quit => {}
    }
    Ok(None)
}

async fn status_report(panel: &Panel) -> Result<String, Error> {
    let snapshot = panel.policy.snapshot().await?;

    let mut report = String::from("Settings:\n");
    for toggle in PolicyToggle::ALL {
        report.push_str(&format!(
            "  [{}] {} ({})\n",
            if snapshot.toggle(toggle) { "x" } else { " " },
            toggle.label(),
            toggle.key()
        ));
    }

    let denied: Vec<&str> = snapshot.denylist.iter().map(|c| c.as_str()).collect();
    report.push_str(&format!(
        "Blocked countries ({}): {}\n",
        denied.len(),
        if denied.is_empty() {
            "none".to_string()
        } else {
            denied.join(" ")
        }
    ));
    report.push_str(&format!(
        "Exempt country: {}\n",
        panel.policy.catalog().home()
    ));

    for counter in crate::core::events::Counter::ALL {
        report.push_str(&format!("{}: {}\n", counter, panel.activity.count(counter)));
    }
    Ok(report.trim_end().to_string())
}

/// Read commands from stdin until `quit` or end of input.
pub async fn run(panel: &Panel) {
    println!("Type 'help' for settings commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Failed to read from stdin: {}", e);
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<ConsoleCommand>() {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        if command == ConsoleCommand::Quit {
            break;
        }

        match execute(panel, command).await {
            Ok(Some(reply)) => println!("{}", reply),
            Ok(None) => {}
            Err(e) => {
                tracing::error!("Settings command failed: {}", e);
                println!("Command failed: {}", e);
            }
        }
    }
}
