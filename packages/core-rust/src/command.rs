//! Single-character-prefixed text commands used by the client front end.
//!
//! | Command       | Operation           |
//! |---------------|---------------------|
//! | `+key=value`  | `Add(key, value)`   |
//! | `-key`        | `Remove(key)`       |
//! | `<key`        | `Get(key)`          |
//! | `*`           | `GetAll`            |

use crate::messages::Operation;
use crate::types::Item;

/// Help text listing the command language.
pub const HELP: &str = "Commands:
\t+KEY=VALUE
\t\tadd item VALUE under KEY, moving KEY to the end of the order
\t-KEY
\t\tremove item with key KEY
\t<KEY
\t\tget item with key KEY
\t*
\t\tlist all items
\t^C
\t\tquit";

/// Errors produced while parsing a command line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command")]
    UnknownCommand,
    #[error("key=value expected")]
    KeyValueExpected,
    #[error("key expected")]
    KeyExpected,
    #[error("empty command")]
    EmptyLine,
}

impl CommandError {
    /// Whether the user should be shown [`HELP`] after this error.
    #[must_use]
    pub fn wants_help(&self) -> bool {
        matches!(self, Self::UnknownCommand | Self::KeyValueExpected)
    }
}

/// Parses one command line into an [`Operation`].
///
/// A trailing `\r`/`\n` is ignored; everything else after the prefix is taken
/// verbatim, so keys and values may contain spaces.
///
/// # Errors
///
/// See [`CommandError`] for the failure cases.
pub fn parse(line: &str) -> Result<Operation, CommandError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut chars = line.chars();
    let Some(prefix) = chars.next() else {
        return Err(CommandError::EmptyLine);
    };
    let rest = chars.as_str();

    match prefix {
        '+' => {
            let (key, value) = rest
                .split_once('=')
                .filter(|(key, _)| !key.is_empty())
                .ok_or(CommandError::KeyValueExpected)?;
            Ok(Operation::Add(Item::new(key, value)))
        }
        '-' => Ok(Operation::Remove {
            key: key_argument(rest)?,
        }),
        '<' => Ok(Operation::Get {
            key: key_argument(rest)?,
        }),
        '*' if rest.trim().is_empty() => Ok(Operation::GetAll),
        _ => Err(CommandError::UnknownCommand),
    }
}

fn key_argument(rest: &str) -> Result<String, CommandError> {
    if rest.is_empty() {
        Err(CommandError::KeyExpected)
    } else {
        Ok(rest.to_string())
    }
}
