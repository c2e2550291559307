//! The shared-state gate: bundles the playlist, player supervisor, and
//! catalog directory behind the single lock every command handler takes.
//! On a `current_thread` runtime, with no `.await` held across the lock
//! for anything but quick state mutation, a plain mutex serializes
//! commands the same way a dedicated reactor task queue would, without
//! needing one.

use camino::Utf8PathBuf;
use color_eyre::Result;
use tracing::{info, warn};

use crate::catalog;
use crate::player::{self, PlayerSupervisor};
use crate::playlist::{Playlist, PlaylistItem};
use crate::protocol::{AckStatus, Command, ErrorKind};

/// Everything a running command needs: the playlist, the catalog
/// directory it's saved/loaded against, and the player supervisor. One
/// instance lives for the whole daemon process.
pub struct Daemon {
    playlist: Playlist,
    playlists_dir: Utf8PathBuf,
    supervisor: PlayerSupervisor,
    // Status fields nothing in this command set ever mutates; exposed as
    // the fixed values `status` has always reported.
    volume: i64,
    repeat: bool,
    random: bool,
    single: bool,
    consume: bool,
}

impl Daemon {
    pub fn new(playlists_dir: Utf8PathBuf, vlc_start_delay: std::time::Duration) -> Self {
        Self {
            playlist: Playlist::new(),
            playlists_dir,
            supervisor: PlayerSupervisor::new(vlc_start_delay),
            volume: -1,
            repeat: false,
            random: false,
            single: false,
            consume: false,
        }
    }

    /// Dispatches a parsed command against shared state and returns the
    /// response to write back. This is the single serialization point:
    /// callers hold the daemon's mutex for the whole call.
    pub async fn execute(&mut self, command: Command) -> AckStatus {
        match command {
            Command::Close => AckStatus::goodbye("close"),
            Command::Status => AckStatus::ok_with_body(self.status_body().await),
            Command::Play(pos) => self.play(pos).await,
            Command::Stop => {
                self.supervisor.stop().await;
                AckStatus::ok()
            }
            Command::Clear => {
                self.supervisor.stop().await;
                self.playlist.clear();
                AckStatus::ok()
            }
            Command::Next => self.advance(Playlist::next).await,
            Command::Previous => self.advance(Playlist::prev).await,
            Command::Add(uri) => {
                self.playlist.add(uri);
                AckStatus::ok()
            }
            Command::PlaylistInfo => AckStatus::ok_with_body(self.playlistinfo_body()),
            Command::Save(name) => self.save(&name),
            Command::ListPlaylists => match self.listplaylists_body() {
                Ok(body) => AckStatus::ok_with_body(body),
                Err(e) => {
                    warn!("could not enumerate playlists: {e:?}");
                    AckStatus::ok()
                }
            },
            Command::Load(name) => self.load(&name),
        }
    }

    async fn play(&mut self, pos: Option<usize>) -> AckStatus {
        if let Some(pos) = pos {
            self.playlist.set_cursor(pos);
        }
        match player::play_from_current(&mut self.supervisor, &mut self.playlist).await {
            Ok(_) => AckStatus::ok(),
            Err(e) => {
                warn!("error while starting playback: {e:?}");
                AckStatus::ok()
            }
        }
    }

    /// Shared shape of `next`/`previous`: stop, move the cursor one way,
    /// play.
    async fn advance(
        &mut self,
        move_cursor: impl FnOnce(&mut Playlist) -> Option<PlaylistItem>,
    ) -> AckStatus {
        self.supervisor.stop().await;
        move_cursor(&mut self.playlist);
        match player::play_from_current(&mut self.supervisor, &mut self.playlist).await {
            Ok(_) => AckStatus::ok(),
            Err(e) => {
                warn!("error while starting playback: {e:?}");
                AckStatus::ok()
            }
        }
    }

    fn save(&mut self, name: &str) -> AckStatus {
        if !catalog::is_portable_filename(name) {
            return AckStatus::err("save", ErrorKind::InvalidFilename);
        }
        match self.playlist.save(&self.playlists_dir, name) {
            Ok(()) => AckStatus::ok(),
            Err(e) => {
                warn!("could not save playlist {name}: {e:?}");
                AckStatus::ok()
            }
        }
    }

    /// A missing playlist is `OK` with an empty body, matching
    /// `original_source`'s silent behavior.
    fn load(&mut self, name: &str) -> AckStatus {
        let info = match catalog::from_path(&self.playlists_dir, name) {
            Ok(info) => info,
            Err(e) => {
                warn!("could not look up playlist {name}: {e:?}");
                return AckStatus::ok();
            }
        };
        let Some(info) = info else {
            info!("load: playlist {name} not found, nothing to do");
            return AckStatus::ok();
        };
        match self.playlist.load(&info) {
            Ok(()) => AckStatus::ok(),
            Err(e) => {
                warn!("could not load playlist {name}: {e:?}");
                AckStatus::ok()
            }
        }
    }

    fn listplaylists_body(&self) -> Result<String> {
        let mut body = String::new();
        for info in catalog::enumerate(&self.playlists_dir)? {
            body.push_str(&format!(
                "playlist: {}\r\nLast-Modified: {}\r\n",
                info.name,
                info.last_modified.as_second()
            ));
        }
        Ok(body)
    }

    fn playlistinfo_body(&self) -> String {
        let mut body = String::new();
        for (pos, item) in self.playlist.iter().enumerate() {
            body.push_str(&format!("file: {}\r\n", item.uri));
            if let Some(name) = &item.name {
                body.push_str(&format!("name: {name}\r\n"));
            }
            body.push_str(&format!("Pos: {pos}\r\n"));
            if item.id >= 0 {
                body.push_str(&format!("Id: {}\r\n", item.id));
            }
        }
        body
    }

    /// Formats `status`'s body in the fixed key order the wire contract
    /// requires. `time`/`elapsed` use the source's lossy `hours:seconds`
    /// format, kept as-is since it's an observed part of that contract.
    async fn status_body(&self) -> String {
        let current = self.playlist.current();
        let next = current.as_ref().and_then(|_| self.peek_next());

        let mut body = String::new();
        body.push_str(&format!("volume: {}\r\n", self.volume));
        body.push_str(&format!("repeat: {}\r\n", bool_flag(self.repeat)));
        body.push_str(&format!("random: {}\r\n", bool_flag(self.random)));
        body.push_str(&format!("single: {}\r\n", bool_flag(self.single)));
        body.push_str(&format!("consume: {}\r\n", bool_flag(self.consume)));
        body.push_str(&format!("playlist: {}\r\n", self.playlist.version()));
        body.push_str(&format!("playlistlength: {}\r\n", self.playlist.len()));
        if let Some(item) = &current {
            body.push_str(&format!("videoclip: {}\r\n", self.playlist.cursor()));
            body.push_str(&format!("videoclipid: {}\r\n", item.id));
        }
        if self.supervisor.is_playing().await {
            body.push_str(&format_hours_seconds("time", 0));
            body.push_str(&format_hours_seconds("elapsed", 0));
        }
        if let Some((pos, item)) = next {
            body.push_str(&format!("nextvideoclip: {pos}\r\n"));
            body.push_str(&format!("nextvideoid: {}\r\n", item.id));
        }
        body
    }

    fn peek_next(&self) -> Option<(usize, PlaylistItem)> {
        let pos = self.playlist.cursor() + 1;
        self.playlist
            .iter()
            .nth(pos)
            .cloned()
            .map(|item| (pos, item))
    }
}

fn bool_flag(value: bool) -> u8 {
    value as u8
}

/// `H:S` only — minutes are deliberately dropped, matching the source's
/// (almost certainly buggy, but contractual) wire format.
fn format_hours_seconds(key: &str, total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let seconds = total_seconds % 60;
    format!("{key}: {hours}:{seconds}\r\n")
}
