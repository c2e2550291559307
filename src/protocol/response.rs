//! `AckStatus` / `ErrorKind`: the success/failure response model and its
//! `\r\n`-terminated wire encoding. Grounded on
//! `original_source/src/client_engine.h`'s `Error` enum and
//! `client_engine.cpp`'s `errorMessages_` table / `AckStatus::toString`.

/// Wire error ordinals, in the order they appear on the wire. `LastError`
/// is a sentinel, not a real error: `close` uses it as its "goodbye ACK"
/// kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorKind {
    NoError = 0,
    UnknownCommand = 1,
    CommandNotImplemented = 2,
    TooManyArgs = 3,
    MissingParameter = 4,
    InvalidUri = 5,
    InvalidFilename = 6,
    /// Sentinel ordinal used only by `close`'s goodbye ACK. A `load` of a
    /// missing playlist has no dedicated error kind of its own — it's
    /// treated as a silent no-op instead — so nothing is ever inserted
    /// ahead of this variant: ordinal 7 is part of the wire contract and
    /// has to stay put.
    LastError = 7,
}

impl ErrorKind {
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    fn default_message(self) -> &'static str {
        match self {
            ErrorKind::NoError => "No error",
            ErrorKind::UnknownCommand => "unknown command",
            ErrorKind::CommandNotImplemented => "command not implemented",
            ErrorKind::TooManyArgs => "too many arguments",
            ErrorKind::MissingParameter => "missing parameter",
            ErrorKind::InvalidUri => "the given URI is invalid",
            ErrorKind::InvalidFilename => "invalid filename",
            // the goodbye ACK reuses NoError's text
            ErrorKind::LastError => "No error",
        }
    }
}

/// What a command handler hands back to the engine to format onto the wire.
#[derive(Debug)]
pub enum AckStatus {
    /// `results` is zero or more already-`\r\n`-terminated `key: value`
    /// lines; the formatter appends the final `OK\r\n`.
    Ok { results: String },
    Ack {
        opcode: String,
        kind: ErrorKind,
        cmd_number: u32,
        /// Overrides the error kind's default message when set.
        detail: Option<String>,
    },
}

impl AckStatus {
    pub fn ok() -> Self {
        AckStatus::Ok {
            results: String::new(),
        }
    }

    pub fn ok_with_body(results: String) -> Self {
        AckStatus::Ok { results }
    }

    pub fn err(opcode: impl Into<String>, kind: ErrorKind) -> Self {
        AckStatus::Ack {
            opcode: opcode.into(),
            kind,
            cmd_number: 0,
            detail: None,
        }
    }

    /// The "goodbye ACK" `close` sends: the sentinel kind, not a real error.
    pub fn goodbye(opcode: impl Into<String>) -> Self {
        AckStatus::err(opcode, ErrorKind::LastError)
    }

    pub fn to_wire(&self) -> String {
        match self {
            AckStatus::Ok { results } => format!("{results}OK\r\n"),
            AckStatus::Ack {
                opcode,
                kind,
                cmd_number,
                detail,
            } => {
                let message = detail.as_deref().unwrap_or_else(|| kind.default_message());
                format!(
                    "ACK [{}@{cmd_number}] {{{opcode}}} {message}\r\n",
                    kind.ordinal()
                )
            }
        }
    }
}
