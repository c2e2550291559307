//! The ordered, versioned playlist with a cursor. See `original_source`'s
//! `playlist.h`/`playlist.cpp` for the semantics this is a direct transcription
//! of.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::eyre::Context;
use color_eyre::Result;
use tracing::{debug, warn};

use crate::catalog::PlaylistInfo;

/// A single playlist entry. `id` is always `-1`: nothing in this command
/// set ever issues one, so it's carried only so `playlistinfo`'s `Id:`
/// line has something to branch on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistItem {
    pub uri: String,
    pub name: Option<String>,
    pub id: i64,
}

impl PlaylistItem {
    fn new(uri: String, name: Option<String>) -> Self {
        Self { uri, name, id: -1 }
    }
}

#[derive(Debug, Default)]
pub struct Playlist {
    items: Vec<PlaylistItem>,
    cursor: usize,
    version: u32,
    dirty: bool,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Appends `uri` to the playlist.
    ///
    /// The version counter bumps only on the `dirty: false -> true` edge:
    /// a burst of adds between saves/loads bumps `version` exactly once.
    pub fn add(&mut self, uri: impl Into<String>) {
        let uri = uri.into();
        debug!("playlist: adding uri {uri}");
        self.items.push(PlaylistItem::new(uri, None));
        if !self.dirty {
            self.version += 1;
        }
        self.dirty = true;
    }

    /// Empties the playlist. Resets cursor and dirty, but not version.
    pub fn clear(&mut self) {
        self.items.clear();
        self.cursor = 0;
        self.dirty = false;
    }

    /// Returns the item the cursor is on and advances it. Returns `None` if
    /// the playlist is empty or the cursor is already past the end.
    pub fn next(&mut self) -> Option<PlaylistItem> {
        if self.items.is_empty() || self.cursor == self.items.len() {
            return None;
        }
        let item = self.items[self.cursor].clone();
        self.cursor += 1;
        Some(item)
    }

    /// Returns the previous item. From position 0 this returns the first
    /// item without moving the cursor.
    pub fn prev(&mut self) -> Option<PlaylistItem> {
        if self.cursor == 0 {
            return self.items.first().cloned();
        }
        self.cursor -= 1;
        self.items.get(self.cursor).cloned()
    }

    /// Returns the item the cursor currently points to, without moving it.
    pub fn current(&self) -> Option<PlaylistItem> {
        self.items.get(self.cursor).cloned()
    }

    /// Moves the cursor directly to `pos`, clamping to `len` (the
    /// "past the end" sentinel) if out of range.
    pub fn set_cursor(&mut self, pos: usize) {
        self.cursor = pos.min(self.items.len());
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlaylistItem> {
        self.items.iter()
    }

    /// Writes the playlist to `dir/name.m3u`: an optional `# name` line
    /// before any uri that has one.
    pub fn save(&mut self, dir: &Utf8Path, name: &str) -> Result<()> {
        let mut path = dir.join(name);
        path.set_extension("m3u");
        if path.exists() {
            warn!("replacing playlist {path}");
        }

        let tmp_path = path.with_extension("m3u.tmp");
        let mut contents = String::new();
        for item in &self.items {
            if let Some(name) = &item.name {
                contents.push_str("# ");
                contents.push_str(name);
                contents.push('\n');
            }
            contents.push_str(&item.uri);
            contents.push('\n');
        }
        fs::write(tmp_path.as_std_path(), contents)
            .wrap_err_with(|| format!("could not write playlist {tmp_path}"))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .wrap_err_with(|| format!("could not finalize playlist {path}"))?;

        self.dirty = false;
        Ok(())
    }

    /// Replaces the playlist's contents from `info`'s file. Resets cursor,
    /// dirty, and version. A malformed file (a `#` line with no following
    /// uri) aborts the load, leaving the playlist empty.
    pub fn load(&mut self, info: &PlaylistInfo) -> Result<()> {
        debug!("loading playlist {}", info.path);
        self.items.clear();
        self.cursor = 0;
        self.dirty = false;
        self.version = 0;

        let contents = fs::read_to_string(info.path.as_std_path())
            .wrap_err_with(|| format!("failed to read playlist from disk: {}", info.path))?;

        let mut lines = contents.lines();
        while let Some(line) = lines.next() {
            let mut name = None;
            let uri = if let Some(stripped) = line.strip_prefix('#') {
                name = Some(stripped.trim_start().to_owned());
                match lines.next() {
                    Some(uri_line) => uri_line,
                    None => {
                        warn!(
                            "the playlist {} is malformed! aborting load",
                            info.name
                        );
                        self.items.clear();
                        return Ok(());
                    }
                }
            } else {
                line
            };

            self.items.push(PlaylistItem::new(uri.to_owned(), name));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn add_bumps_version_once_per_dirty_window() {
        let mut pl = Playlist::new();
        assert_eq!(pl.version(), 0);
        pl.add("sop://a");
        assert_eq!(pl.version(), 1);
        pl.add("sop://b");
        pl.add("sop://c");
        assert_eq!(pl.version(), 1);
    }

    #[test]
    fn clear_resets_items_cursor_and_dirty_but_not_version() {
        let mut pl = Playlist::new();
        pl.add("sop://a");
        let version_before = pl.version();
        pl.clear();
        assert_eq!(pl.len(), 0);
        assert_eq!(pl.cursor(), 0);
        assert_eq!(pl.version(), version_before);
        // dirty was reset, so the next add bumps version again
        pl.add("sop://b");
        assert_eq!(pl.version(), version_before + 1);
    }

    #[test]
    fn next_advances_and_stops_at_len() {
        let mut pl = Playlist::new();
        pl.add("sop://a");
        pl.add("sop://b");
        assert_eq!(pl.next().unwrap().uri, "sop://a");
        assert_eq!(pl.next().unwrap().uri, "sop://b");
        assert!(pl.next().is_none());
        assert_eq!(pl.cursor(), 2);
    }

    #[test]
    fn prev_from_zero_returns_first_without_moving_cursor() {
        let mut pl = Playlist::new();
        pl.add("sop://a");
        pl.add("sop://b");
        assert_eq!(pl.cursor(), 0);
        let item = pl.prev().unwrap();
        assert_eq!(item.uri, "sop://a");
        assert_eq!(pl.cursor(), 0);
    }

    #[test]
    fn prev_on_empty_playlist_is_none() {
        let mut pl = Playlist::new();
        assert!(pl.prev().is_none());
    }

    #[test]
    fn current_is_empty_past_the_end() {
        let mut pl = Playlist::new();
        pl.add("sop://a");
        pl.next();
        assert!(pl.current().is_none());
    }

    #[test]
    fn add_never_assigns_an_id() {
        let mut pl = Playlist::new();
        pl.add("sop://a");
        pl.add("sop://b");
        assert!(pl.iter().all(|item| item.id == -1));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap();

        let mut pl = Playlist::new();
        pl.add("sop://broker.example:3912/149252");
        pl.save(path, "test_list").unwrap();

        let info = crate::catalog::from_path(path, "test_list").unwrap().unwrap();
        let mut loaded = Playlist::new();
        loaded.load(&info).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded.current().unwrap().uri,
            "sop://broker.example:3912/149252"
        );
        assert_eq!(loaded.version(), 0);
    }

    #[test]
    fn load_malformed_file_aborts_with_empty_playlist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.m3u");
        fs::write(&path, "# a name with no following uri").unwrap();

        let info = PlaylistInfo {
            path: Utf8PathBuf::from_path_buf(path).unwrap(),
            name: "broken".to_owned(),
            last_modified: jiff::Timestamp::UNIX_EPOCH,
        };
        let mut pl = Playlist::new();
        pl.load(&info).unwrap();
        assert_eq!(pl.len(), 0);
    }
}
