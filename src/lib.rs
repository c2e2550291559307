//! The library half of the crate: everything `main.rs` wires up is also
//! exposed here so integration tests under `tests/` can drive the session
//! dispatcher directly. Split mirrors the `[lib]` + `[[bin]]` layout seen in
//! `examples/jmylchreest-m3u-proxy`'s Cargo.toml.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod player;
pub mod playlist;
pub mod protocol;
pub mod session;
