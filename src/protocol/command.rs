//! Opcode parsing and per-command argument-shape validation. Tokenization is
//! a plain whitespace split: this command set has no quoting or escaping,
//! so a `peg`-based grammar (suited to a much larger real-MPD command
//! surface) isn't the right idiom here; `client_engine.cpp`'s
//! `extractParams`/`START_CMD` macros are closer to what this needs.

use crate::protocol::response::{AckStatus, ErrorKind};

/// How many positional arguments a command accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgShape {
    NoArgs,
    OneArg,
    OptionalOneArg,
}

/// A fully parsed, argument-shape-validated client command, ready to be
/// executed against a [`crate::daemon::Daemon`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Close,
    Status,
    Play(Option<usize>),
    Stop,
    Clear,
    Next,
    Previous,
    Add(String),
    PlaylistInfo,
    Save(String),
    ListPlaylists,
    Load(String),
}

impl Command {
    fn shape(opcode: &str) -> Option<ArgShape> {
        use ArgShape::*;
        Some(match opcode {
            "close" => NoArgs,
            "status" => NoArgs,
            "play" => OptionalOneArg,
            "stop" => NoArgs,
            "clear" => NoArgs,
            "next" => NoArgs,
            "previous" => NoArgs,
            "add" => OneArg,
            "playlistinfo" => NoArgs,
            "save" => OneArg,
            "listplaylists" => NoArgs,
            "load" => OneArg,
            _ => return None,
        })
    }

    /// Tokenizes `line` by whitespace, validates the opcode and its
    /// argument shape, and builds a `Command`. On any violation, returns
    /// the `AckStatus` the engine should write back verbatim.
    pub fn parse(line: &str) -> Result<Command, AckStatus> {
        let mut tokens = line.split_whitespace();
        let opcode = tokens.next().unwrap_or("");
        let args: Vec<&str> = tokens.collect();

        let Some(shape) = Self::shape(opcode) else {
            return Err(AckStatus::err(opcode, ErrorKind::UnknownCommand));
        };

        match shape {
            ArgShape::NoArgs => {
                if !args.is_empty() {
                    return Err(AckStatus::err(opcode, ErrorKind::TooManyArgs));
                }
            }
            ArgShape::OneArg => {
                if args.is_empty() {
                    return Err(AckStatus::err(opcode, ErrorKind::MissingParameter));
                }
                if args.len() > 1 {
                    return Err(AckStatus::err(opcode, ErrorKind::TooManyArgs));
                }
            }
            ArgShape::OptionalOneArg => {
                if args.len() > 1 {
                    return Err(AckStatus::err(opcode, ErrorKind::TooManyArgs));
                }
            }
        }

        Ok(match opcode {
            "close" => Command::Close,
            "status" => Command::Status,
            "play" => {
                let pos = match args.first() {
                    Some(raw) => match raw.parse::<usize>() {
                        Ok(pos) => Some(pos),
                        Err(_) => return Err(AckStatus::err(opcode, ErrorKind::MissingParameter)),
                    },
                    None => None,
                };
                Command::Play(pos)
            }
            "stop" => Command::Stop,
            "clear" => Command::Clear,
            "next" => Command::Next,
            "previous" => Command::Previous,
            "add" => {
                let uri = args[0].to_owned();
                if !is_valid_uri(&uri) {
                    return Err(AckStatus::err(opcode, ErrorKind::InvalidUri));
                }
                Command::Add(uri)
            }
            "playlistinfo" => Command::PlaylistInfo,
            "save" => Command::Save(args[0].to_owned()),
            "listplaylists" => Command::ListPlaylists,
            "load" => Command::Load(args[0].to_owned()),
            _ => unreachable!("opcode already validated by Command::shape"),
        })
    }
}

/// A URI must look like `scheme://rest` — matches
/// `original_source`'s `isValidUri` (`^(.*)://(.*)$`).
fn is_valid_uri(uri: &str) -> bool {
    uri.contains("://")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_line_is_unknown_command_with_empty_opcode() {
        let err = Command::parse("").unwrap_err();
        assert_eq!(err.to_wire(), "ACK [1@0] {} unknown command\r\n");
    }

    #[test]
    fn unknown_opcode() {
        let err = Command::parse("wibble").unwrap_err();
        assert_eq!(err.to_wire(), "ACK [1@0] {wibble} unknown command\r\n");
    }

    #[test]
    fn add_missing_parameter() {
        let err = Command::parse("add").unwrap_err();
        assert_eq!(err.to_wire(), "ACK [4@0] {add} missing parameter\r\n");
    }

    #[test]
    fn add_too_many_args() {
        let err = Command::parse("add a b").unwrap_err();
        assert_eq!(err.to_wire(), "ACK [3@0] {add} too many arguments\r\n");
    }

    #[test]
    fn add_invalid_uri() {
        let err = Command::parse("add not-a-uri").unwrap_err();
        assert_eq!(
            err.to_wire(),
            "ACK [5@0] {add} the given URI is invalid\r\n"
        );
    }

    #[test]
    fn add_valid_uri() {
        let cmd = Command::parse("add sop://broker.example:3912/149252").unwrap();
        assert_eq!(cmd, Command::Add("sop://broker.example:3912/149252".to_owned()));
    }

    #[test]
    fn play_with_and_without_position() {
        assert_eq!(Command::parse("play").unwrap(), Command::Play(None));
        assert_eq!(Command::parse("play 3").unwrap(), Command::Play(Some(3)));
    }

    #[test]
    fn status_rejects_arguments() {
        let err = Command::parse("status now").unwrap_err();
        assert_eq!(err.to_wire(), "ACK [3@0] {status} too many arguments\r\n");
    }
}
