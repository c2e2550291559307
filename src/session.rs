//! The accept loop and per-connection read-execute-write loop:
//! `TcpListener::bind` + `tokio::io::split` + `BufReader::lines` +
//! `task::spawn` per client, with no `idle` or `command_list` support —
//! this command set has no use for either. Session numbering and
//! close-after-ack semantics come from `original_source/src/client_engine.cpp`'s
//! `ClientSession`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use color_eyre::eyre::Context;
use color_eyre::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task;
use tracing::{debug, info, instrument, warn};

use crate::daemon::Daemon;
use crate::protocol::{self, AckStatus, Command};

/// Lines longer than this (terminator included) close the session with an
/// error instead of being parsed.
const MAX_COMMAND_LENGTH: usize = protocol::MAX_COMMAND_LENGTH;

static NEXT_SESSION_NUMBER: AtomicU64 = AtomicU64::new(1);

fn next_session_number() -> u64 {
    NEXT_SESSION_NUMBER.fetch_add(1, Ordering::Relaxed)
}

/// Binds `bind_to_address:port` and accepts connections forever, spawning
/// one task per client. Returns only on a bind/accept error.
pub async fn handle_clients(daemon: Arc<Mutex<Daemon>>, bind_to_address: String, port: u16) -> Result<()> {
    let listener = TcpListener::bind(format!("{bind_to_address}:{port}"))
        .await
        .wrap_err_with(|| format!("could not bind {bind_to_address}:{port}"))?;
    info!("listening on {bind_to_address}:{port}");

    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => return Err(e).wrap_err("could not accept connection"),
        };
        let session_number = next_session_number();
        debug!(session_number, %peer_addr, "accepted connection");
        let daemon = Arc::clone(&daemon);

        task::spawn(async move {
            if let Err(e) = handle_client(stream, daemon, session_number).await {
                warn!(session_number, "session ended with error: {e:?}");
            } else {
                debug!(session_number, "session closed");
            }
        });
    }
}

#[instrument(skip(stream, daemon))]
async fn handle_client(
    stream: tokio::net::TcpStream,
    daemon: Arc<Mutex<Daemon>>,
    session_number: u64,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    writer
        .write_all(protocol::welcome_banner().as_bytes())
        .await
        .wrap_err("could not send welcome banner")?;

    let mut line = String::new();
    loop {
        line.clear();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .wrap_err("error reading from client")?;
        if bytes_read == 0 {
            // EOF before a terminator: destroy the session silently.
            return Ok(());
        }
        if line.len() > MAX_COMMAND_LENGTH {
            let ack = AckStatus::err("", protocol::ErrorKind::TooManyArgs);
            let _ = writer.write_all(ack.to_wire().as_bytes()).await;
            return Ok(());
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);

        let (status, should_close) = match Command::parse(trimmed) {
            Ok(command) => {
                let should_close = matches!(command, Command::Close);
                let status = daemon.lock().await.execute(command).await;
                (status, should_close)
            }
            Err(ack) => (ack, false),
        };

        writer
            .write_all(status.to_wire().as_bytes())
            .await
            .wrap_err("could not write response")?;

        if should_close {
            return Ok(());
        }
    }
}
