//! Line commands read from stdin.

use std::str::FromStr;

use super::AppError;
use crate::settings::SettingKey;
use crate::state::Tab;

pub const HELP: &str = "\
Commands:
  start | stop          start or stop the bot
  mode                  switch between simulation and live trading
  safe                  toggle safe mode
  exec <n>              execute opportunity <n> from the table
  tab <home|settings|info>
  set <KEY> <VALUE>     set a setting in the form
  edit <KEY> <text>     type into a numeric field
  commit <KEY>          press Enter on a numeric field
  save | reset          save or discard form changes
  online | offline      simulate network reachability
  help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Stop,
    ToggleMode,
    ToggleSafeMode,
    Execute(usize),
    Tab(Tab),
    Set(SettingKey, String),
    Edit(SettingKey, String),
    Commit(SettingKey),
    Save,
    Reset,
    Online,
    Offline,
    Help,
    Quit,
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::InvalidCommand(message.into())
}

fn key_arg(arg: Option<&str>, usage: &str) -> Result<SettingKey, AppError> {
    let raw = arg.ok_or_else(|| invalid(format!("usage: {}", usage)))?;
    raw.parse::<SettingKey>()
        .map_err(|_| invalid(format!("unknown setting: {}", raw)))
}

impl FromStr for Command {
    type Err = AppError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_ascii_lowercase().as_str() {
            "start" => Ok(Command::Start),
            "stop" => Ok(Command::Stop),
            "mode" => Ok(Command::ToggleMode),
            "safe" => Ok(Command::ToggleSafeMode),
            "exec" | "execute" => rest
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .map(Command::Execute)
                .ok_or_else(|| invalid("usage: exec <n>")),
            "tab" => rest
                .parse::<Tab>()
                .map(Command::Tab)
                .map_err(AppError::InvalidCommand),
            "set" | "edit" => {
                let usage = if word.eq_ignore_ascii_case("set") {
                    "set <KEY> <VALUE>"
                } else {
                    "edit <KEY> <text>"
                };
                let (key, value) = match rest.split_once(char::is_whitespace) {
                    Some((key, value)) => (Some(key), value.trim()),
                    None => (Some(rest).filter(|r| !r.is_empty()), ""),
                };
                let key = key_arg(key, usage)?;
                if word.eq_ignore_ascii_case("set") {
                    if value.is_empty() {
                        return Err(invalid(format!("usage: {}", usage)));
                    }
                    Ok(Command::Set(key, value.to_string()))
                } else {
                    Ok(Command::Edit(key, value.to_string()))
                }
            }
            "commit" => Ok(Command::Commit(key_arg(
                Some(rest).filter(|r| !r.is_empty()),
                "commit <KEY>",
            )?)),
            "save" => Ok(Command::Save),
            "reset" => Ok(Command::Reset),
            "online" => Ok(Command::Online),
            "offline" => Ok(Command::Offline),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            "" => Err(invalid("empty command")),
            other => Err(invalid(format!("unknown command: {}", other))),
        }
    }
}
