//! Spawns and supervises the external playback processes (`sp-sc-auth` +
//! `cvlc`, or `cvlc` alone) and maps playlist URIs to launch plans. Grounded
//! on `original_source/src/player.cpp`; the `tokio::process` idiom itself is
//! grounded on `examples/ja-mf-r4dio/src/daemon/mpv.rs`.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::Result;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::playlist::{Playlist, PlaylistItem};

const SOPCAST_LOCAL_PORT: &str = "12345";
const SOPCAST_CLIENT_PORT: &str = "1234";
const SOPCAST_LOCAL_URL: &str = "http://localhost:12345/tv.asf";

/// Whether a spawned child's stdio stream is inherited from vpd, discarded,
/// or left open for the supervisor to own a pipe end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdioPolicy {
    Inherit,
    Discard,
}

impl StdioPolicy {
    fn into_stdio(self) -> Stdio {
        match self {
            StdioPolicy::Inherit => Stdio::inherit(),
            StdioPolicy::Discard => Stdio::null(),
        }
    }
}

/// A fully-resolved plan to launch one child process.
#[derive(Debug, Clone)]
pub struct PlayerSpawn {
    pub program: String,
    pub argv: Vec<String>,
    pub stdout_policy: StdioPolicy,
    pub stdin_policy: StdioPolicy,
    pub stderr_policy: StdioPolicy,
}

impl PlayerSpawn {
    fn spawn(&self) -> Result<Child> {
        debug!("spawning {} {:?}", self.program, self.argv);
        let child = Command::new(&self.program)
            .args(&self.argv)
            .stdout(self.stdout_policy.into_stdio())
            .stdin(self.stdin_policy.into_stdio())
            .stderr(self.stderr_policy.into_stdio())
            .spawn()?;
        Ok(child)
    }
}

/// Owns every live playback child process. `stop()` is the only place
/// children are removed; it always leaves the supervisor with an empty list,
/// even if killing/reaping a child failed (failures are logged, not
/// propagated).
///
/// Children live behind their own inner mutex, separate from whatever lock
/// a caller holds to serialize commands. That's what lets the sopcast
/// warmup below run as a detached timer instead of a sleep the command
/// dispatch loop has to sit through.
#[derive(Debug)]
pub struct PlayerSupervisor {
    children: Arc<Mutex<Vec<Child>>>,
    vlc_start_delay: Duration,
}

impl PlayerSupervisor {
    pub fn new(vlc_start_delay: Duration) -> Self {
        Self {
            children: Arc::new(Mutex::new(Vec::new())),
            vlc_start_delay,
        }
    }

    /// Terminates every supervised child and waits on it so it's reaped.
    /// Errors from killing an individual child are logged and swallowed:
    /// `stop` always leaves "no players running".
    pub async fn stop(&mut self) {
        let mut children = self.children.lock().await;
        for mut child in children.drain(..) {
            if let Err(e) = child.kill().await {
                warn!("error terminating player process: {e}");
                continue;
            }
            if let Err(e) = child.wait().await {
                warn!("error waiting for player process to exit: {e}");
            }
        }
    }

    pub async fn is_playing(&self) -> bool {
        !self.children.lock().await.is_empty()
    }

    /// Attempts to play `item`'s uri. Returns whether playback was started.
    /// A recognized scheme that fails to spawn returns `Ok(false)`, matching
    /// the "failure to spawn => failure to play" rule. An unrecognized
    /// scheme is logged and skipped (also `Ok(false)`).
    pub async fn play_uri(&mut self, uri: &str) -> Result<bool> {
        let Some((scheme, _rest)) = uri.split_once(':') else {
            warn!("uri protocol not recognized, skipping: {uri}");
            return Ok(false);
        };

        match scheme.to_ascii_lowercase().as_str() {
            "sop" => self.play_sopcast(uri).await,
            "file" => self.play_file(uri).await,
            other => {
                warn!("uri protocol not recognized: {other}. skipping.");
                Ok(false)
            }
        }
    }

    /// Launches the sopcast receiver synchronously, then hands the local
    /// player's delayed launch off to a detached task. The receiver needs
    /// a few seconds to establish its relay before `cvlc` has anything to
    /// read, but sitting in this `await` for that long would hold up every
    /// other command this supervisor's caller is serializing — so the
    /// warmup runs as its own task against a clone of `children` instead of
    /// blocking this call. Playback is reported started as soon as the
    /// receiver is up; a `cvlc` spawn failure after the warmup is logged
    /// but has no command left to fail.
    async fn play_sopcast(&mut self, uri: &str) -> Result<bool> {
        let sopcast_plan = PlayerSpawn {
            program: "sp-sc-auth".to_owned(),
            argv: vec![
                uri.to_owned(),
                SOPCAST_CLIENT_PORT.to_owned(),
                SOPCAST_LOCAL_PORT.to_owned(),
            ],
            stdout_policy: StdioPolicy::Discard,
            stdin_policy: StdioPolicy::Discard,
            stderr_policy: StdioPolicy::Discard,
        };

        let sopcast_child = match sopcast_plan.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("cannot launch sp-sc-auth: {e}");
                return Ok(false);
            }
        };
        self.children.lock().await.push(sopcast_child);
        info!("sopcast receiver started, scheduling cvlc launch after warmup");

        let children = Arc::clone(&self.children);
        let delay = self.vlc_start_delay;
        let uri = uri.to_owned();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let vlc_plan = local_player_plan(SOPCAST_LOCAL_URL);
            match vlc_plan.spawn() {
                Ok(child) => {
                    children.lock().await.push(child);
                    info!("cvlc launched for {uri}, playback should start shortly");
                }
                Err(e) => warn!("cannot launch cvlc for {uri}: {e}"),
            }
        });

        Ok(true)
    }

    async fn play_file(&mut self, uri: &str) -> Result<bool> {
        let Some(encoded_path) = uri.strip_prefix("file://") else {
            warn!("malformed file:// uri: {uri}");
            return Ok(false);
        };
        let path = percent_decode(encoded_path);
        debug!("file_uri decoded '{path}'");

        let plan = local_player_plan(&path);
        match plan.spawn() {
            Ok(child) => {
                self.children.lock().await.push(child);
                Ok(true)
            }
            Err(e) => {
                warn!("cannot launch cvlc: {e}");
                Ok(false)
            }
        }
    }
}

/// Builds the launch plan for the local player (`cvlc`) pointed at `uri`.
/// On ARM hosts, prepends `--vout omxil_vout` to enable hardware video
/// output.
pub fn local_player_plan(uri: &str) -> PlayerSpawn {
    let mut argv = Vec::new();
    if is_arm_host() {
        info!("detected ARM host, activating omxil_vout");
        argv.push("--vout".to_owned());
        argv.push("omxil_vout".to_owned());
    }
    argv.push(uri.to_owned());

    PlayerSpawn {
        program: "cvlc".to_owned(),
        argv,
        stdout_policy: StdioPolicy::Discard,
        stdin_policy: StdioPolicy::Discard,
        stderr_policy: StdioPolicy::Discard,
    }
}

fn is_arm_host() -> bool {
    std::env::consts::ARCH.starts_with("arm")
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (
                (bytes[i + 1] as char).to_digit(16),
                (bytes[i + 2] as char).to_digit(16),
            ) {
                out.push((hi * 16 + lo) as u8);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Plays the playlist starting from its current cursor position, retrying
/// with `next()` on failure until an item plays or the playlist is
/// exhausted. Mirrors `original_source`'s `player.cpp::play()`.
pub async fn play_from_current(
    supervisor: &mut PlayerSupervisor,
    playlist: &mut Playlist,
) -> Result<Option<PlaylistItem>> {
    let Some(mut item) = playlist.current() else {
        debug!("playlist is currently empty, or we reached its end");
        return Ok(None);
    };

    loop {
        if supervisor.play_uri(&item.uri).await? {
            return Ok(Some(item));
        }
        debug!("trying next item in the playlist");
        let Some(next_item) = playlist.next() else {
            debug!("playlist is currently empty, or we reached its end");
            return Ok(None);
        };
        item = next_item;
    }
}
