//! The VPD wire protocol: command parsing and response formatting.

pub mod command;
pub mod response;

pub use command::{ArgShape, Command};
pub use response::{AckStatus, ErrorKind};

pub const MAJOR_VERSION: u32 = 0;
pub const MINOR_VERSION: u32 = 1;

/// The server-initiated greeting, sent before any command is read.
pub fn welcome_banner() -> String {
    format!("VPD {MAJOR_VERSION}.{MINOR_VERSION} ready\r\n")
}

/// The hard cap on an accepted command line, terminator included.
pub const MAX_COMMAND_LENGTH: usize = 1024;
