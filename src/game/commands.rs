//! Free-text commands typed into the game chat.
//!
//! Grammar (whitespace separated):
//!
//! ```text
//! !place <row><column>[h|v] <letters>   row a-o, column 1-15; the
//!                                       orientation may be omitted for
//!                                       a single letter
//! !exchange <letters>                   `*` names a blank
//! !pass | !hint | !reserve | !help
//! ```
//!
//! Parsing only checks syntax. Range, turn, and rule checks belong to the
//! board and the room.

use std::collections::BTreeMap;

use super::board::{Orientation, Placement};
use super::tile::BLANK;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Place(Placement),
    Exchange(String),
    Pass,
    Hint,
    Reserve,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("the command {0} is not valid")]
    Unknown(String),
    #[error("invalid syntax, use: !place <row><column>(h|v) <letters>")]
    PlaceSyntax,
    #[error("the orientation must be h or v")]
    Orientation,
    #[error("invalid syntax, use: !exchange <letters>")]
    ExchangeSyntax,
    #[error("invalid syntax, !{0} takes no argument")]
    TrailingArgument(&'static str),
}

impl crate::frame::ErrorCode for CommandError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Unknown(_) => "E_UNKNOWN_COMMAND",
            Self::PlaceSyntax | Self::Orientation | Self::ExchangeSyntax | Self::TrailingArgument(_) => {
                "E_COMMAND_SYNTAX"
            }
        }
    }
}

/// Whether a chat line should be interpreted as a command.
#[must_use]
pub fn is_command(text: &str) -> bool {
    text.trim_start().starts_with('!')
}

/// Parse one `!` command line.
///
/// # Errors
///
/// Returns a `CommandError` describing the first syntax problem.
pub fn parse(text: &str) -> Result<Command, CommandError> {
    let parts: Vec<&str> = text.split_whitespace().collect();
    let Some((&name, args)) = parts.split_first() else {
        return Err(CommandError::Unknown(String::new()));
    };

    let bare = |command: Command, label: &'static str| {
        if args.is_empty() { Ok(command) } else { Err(CommandError::TrailingArgument(label)) }
    };

    match name {
        "!place" => match args {
            [position, word] => parse_place(position, word),
            _ => Err(CommandError::PlaceSyntax),
        },
        "!exchange" => match args {
            [letters] => Ok(Command::Exchange((*letters).to_owned())),
            _ => Err(CommandError::ExchangeSyntax),
        },
        "!pass" => bare(Command::Pass, "pass"),
        "!hint" => bare(Command::Hint, "hint"),
        "!reserve" => bare(Command::Reserve, "reserve"),
        "!help" => bare(Command::Help, "help"),
        other => Err(CommandError::Unknown(other.to_owned())),
    }
}

fn parse_place(position: &str, word: &str) -> Result<Command, CommandError> {
    let mut chars = position.chars();
    let row = chars
        .next()
        .filter(char::is_ascii_alphabetic)
        .ok_or(CommandError::PlaceSyntax)?
        .to_ascii_lowercase();
    let rest = chars.as_str();
    let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    let (digits, suffix) = rest.split_at(digits_end);
    let column: usize = digits.parse().map_err(|_| CommandError::PlaceSyntax)?;
    let x = column.checked_sub(1).ok_or(CommandError::PlaceSyntax)?;
    let y = u8::try_from(row).map(|r| usize::from(r - b'a')).map_err(|_| CommandError::PlaceSyntax)?;

    let orientation = match suffix {
        "h" | "H" => Orientation::Horizontal,
        "v" | "V" => Orientation::Vertical,
        "" if word.chars().count() == 1 => Orientation::Horizontal,
        "" => return Err(CommandError::Orientation),
        s if s.chars().count() == 1 => return Err(CommandError::Orientation),
        _ => return Err(CommandError::PlaceSyntax),
    };
    Ok(Command::Place(Placement::new(x, y, orientation, word)))
}

/// Lines answered to `!help`.
#[must_use]
pub fn help_lines() -> Vec<&'static str> {
    vec![
        "PLACE LETTERS: !place <row><column>(h|v) <letters> (uppercase letter for a blank)",
        "EXCHANGE LETTERS: !exchange <letters> (* for a blank)",
        "PASS YOUR TURN: !pass",
        "GET HINTS: !hint",
        "SHOW REMAINING LETTERS: !reserve",
        "SHOW COMMANDS: !help",
    ]
}

/// Lines answered to `!reserve`: every letter, then the blank.
#[must_use]
pub fn reserve_lines(counts: &BTreeMap<char, usize>) -> Vec<String> {
    ('A'..='Z')
        .chain([BLANK])
        .map(|face| format!("{face} : {}", counts.get(&face).copied().unwrap_or_default()))
        .collect()
}

#[cfg(test)]
#[path = "commands_test.rs"]
mod tests;
