//! Interactive commands read from stdin while a session runs.

use plaza_session::RoomKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    /// Move to another sub-area of the current room.
    Area(RoomKind),
    Name(String),
    Rooms,
    Leave,
    Quit,
    Help,
}

pub const HELP: &str = "commands: area <kind> | name <name> | rooms | leave | quit";

impl InputCommand {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "area" if rest.is_empty() => return Err("usage: area <kind>".into()),
            "area" => InputCommand::Area(rest.parse()?),
            "name" if rest.is_empty() => return Err("usage: name <name>".into()),
            "name" => InputCommand::Name(rest.to_string()),
            "rooms" | "list" => InputCommand::Rooms,
            "leave" => InputCommand::Leave,
            "quit" | "exit" => InputCommand::Quit,
            "help" | "?" => InputCommand::Help,
            other => return Err(format!("unknown command: {other} ({HELP})")),
        };
        Ok(Some(command))
    }
}
