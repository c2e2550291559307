//! End-to-end wire-protocol scenarios driven over a real loopback TCP
//! socket, mirroring the seed scenarios (S1-S6) the specification calls
//! out as the daemon's observable contract.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use vpd::daemon::Daemon;
use vpd::session;

async fn start_server() -> (std::net::SocketAddr, tempfile::TempDir) {
    let workdir = tempfile::tempdir().unwrap();
    let playlists_dir = camino::Utf8Path::from_path(workdir.path()).unwrap().to_owned();
    let daemon = Arc::new(Mutex::new(Daemon::new(playlists_dir, Duration::from_secs(5))));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let bind = addr.ip().to_string();
    let port = addr.port();
    tokio::spawn(session::handle_clients(daemon, bind, port));
    // give the listener a moment to bind before the first connect attempt.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, workdir)
}

async fn read_until_crlf(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = stream.read(&mut byte).await.unwrap();
        assert!(n > 0, "connection closed before a terminator arrived");
        buf.push(byte[0]);
        if buf.ends_with(b"\r\n") {
            break;
        }
    }
    String::from_utf8(buf).unwrap()
}

async fn read_until_ok(stream: &mut TcpStream) -> String {
    let mut body = String::new();
    loop {
        let line = read_until_crlf(stream).await;
        let is_terminal = line == "OK\r\n" || line.starts_with("ACK ");
        body.push_str(&line);
        if is_terminal {
            break;
        }
    }
    body
}

async fn send(stream: &mut TcpStream, line: &str) {
    stream
        .write_all(format!("{line}\r\n").as_bytes())
        .await
        .unwrap();
}

#[tokio::test]
async fn s1_banner_then_close() {
    let (addr, _workdir) = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let banner = read_until_crlf(&mut stream).await;
    assert_eq!(banner, "VPD 0.1 ready\r\n");

    send(&mut stream, "close").await;
    let response = read_until_ok(&mut stream).await;
    assert_eq!(response, "ACK [7@0] {close} No error\r\n");

    let mut buf = [0u8; 1];
    let n = stream.read(&mut buf).await.unwrap();
    assert_eq!(n, 0, "server should have closed the socket after the goodbye ack");
}

#[tokio::test]
async fn s2_add_then_inspect() {
    let (addr, _workdir) = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    read_until_crlf(&mut stream).await;

    send(&mut stream, "clear").await;
    assert_eq!(read_until_ok(&mut stream).await, "OK\r\n");

    send(&mut stream, "add sop://broker.example:3912/149252").await;
    assert_eq!(read_until_ok(&mut stream).await, "OK\r\n");

    send(&mut stream, "playlistinfo").await;
    assert_eq!(
        read_until_ok(&mut stream).await,
        "file: sop://broker.example:3912/149252\r\nPos: 0\r\nOK\r\n"
    );
}

#[tokio::test]
async fn s3_arg_shape_errors() {
    let (addr, _workdir) = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    read_until_crlf(&mut stream).await;

    send(&mut stream, "add").await;
    assert_eq!(
        read_until_ok(&mut stream).await,
        "ACK [4@0] {add} missing parameter\r\n"
    );

    send(&mut stream, "add a b").await;
    assert_eq!(
        read_until_ok(&mut stream).await,
        "ACK [3@0] {add} too many arguments\r\n"
    );

    send(&mut stream, "add not-a-uri").await;
    assert_eq!(
        read_until_ok(&mut stream).await,
        "ACK [5@0] {add} the given URI is invalid\r\n"
    );
}

#[tokio::test]
async fn s4_persist_and_reload() {
    let (addr, workdir) = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    read_until_crlf(&mut stream).await;

    send(&mut stream, "clear").await;
    read_until_ok(&mut stream).await;
    send(&mut stream, "add sop://x/1").await;
    read_until_ok(&mut stream).await;
    send(&mut stream, "save test_list").await;
    read_until_ok(&mut stream).await;

    let saved = std::fs::read_to_string(workdir.path().join("playlists/test_list.m3u")).unwrap();
    assert_eq!(saved.trim(), "sop://x/1");

    send(&mut stream, "clear").await;
    read_until_ok(&mut stream).await;

    send(&mut stream, "listplaylists").await;
    let listing = read_until_ok(&mut stream).await;
    assert!(listing.starts_with("playlist: test_list\r\nLast-Modified: "));
    assert!(listing.ends_with("OK\r\n"));

    send(&mut stream, "load test_list").await;
    assert_eq!(read_until_ok(&mut stream).await, "OK\r\n");

    send(&mut stream, "playlistinfo").await;
    assert_eq!(
        read_until_ok(&mut stream).await,
        "file: sop://x/1\r\nPos: 0\r\nOK\r\n"
    );
}

#[tokio::test]
async fn s5_status_shape() {
    let (addr, _workdir) = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    read_until_crlf(&mut stream).await;

    send(&mut stream, "status").await;
    let body = read_until_ok(&mut stream).await;
    let lines: Vec<&str> = body.lines().collect();
    let expected_prefixes = [
        "volume:",
        "repeat:",
        "random:",
        "single:",
        "consume:",
        "playlist:",
        "playlistlength:",
    ];
    for (line, prefix) in lines.iter().zip(expected_prefixes) {
        assert!(
            line.starts_with(prefix),
            "expected line to start with {prefix:?}, got {line:?}"
        );
    }
    assert_eq!(lines.last().unwrap(), &"OK");
}

#[tokio::test]
async fn s6_unknown_opcode() {
    let (addr, _workdir) = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    read_until_crlf(&mut stream).await;

    send(&mut stream, "wibble").await;
    assert_eq!(
        read_until_ok(&mut stream).await,
        "ACK [1@0] {wibble} unknown command\r\n"
    );
}
