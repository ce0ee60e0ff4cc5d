use clap::{Parser, Subcommand};

/// Plaza: headless participant for shared VR rooms.
#[derive(Parser, Debug)]
#[command(name = "plaza", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Log level or filter directive (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Display name override.
    #[arg(short, long)]
    pub name: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print rooms advertised on the relay.
    List,
    /// Create a room and wait for guests.
    Host {
        /// Room kind, e.g. lobby or meeting-room.
        kind: String,
        /// Display name of the room.
        name: String,
    },
    /// Join a room by its code.
    Join { code: String },
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_with_overrides() {
        let args = Args::try_parse_from([
            "plaza",
            "--name",
            "Ada",
            "--log-level",
            "debug",
            "host",
            "meeting-room",
            "Standup",
        ])
        .unwrap();
        assert_eq!(args.name.as_deref(), Some("Ada"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert_eq!(
            args.command,
            Command::Host {
                kind: "meeting-room".into(),
                name: "Standup".into()
            }
        );
    }

    #[test]
    fn parses_join_and_list() {
        let args = Args::try_parse_from(["plaza", "join", "abc234"]).unwrap();
        assert_eq!(args.command, Command::Join { code: "abc234".into() });

        let args = Args::try_parse_from(["plaza", "--config", "/tmp/p.toml", "list"]).unwrap();
        assert_eq!(args.config.as_deref(), Some("/tmp/p.toml"));
        assert_eq!(args.command, Command::List);
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Args::try_parse_from(["plaza"]).is_err());
    }
}
