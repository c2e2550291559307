//! Directory-backed catalog of named, saved playlists. Grounded on
//! `original_source`'s `PlaylistInfo` (`playlist.h`/`playlist.cpp`).

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::eyre::{eyre, Context};
use color_eyre::Result;
use jiff::Timestamp;

/// A playlist as seen from the filesystem, not yet loaded into memory.
#[derive(Debug, Clone)]
pub struct PlaylistInfo {
    pub path: Utf8PathBuf,
    pub name: String,
    pub last_modified: Timestamp,
}

/// Lists every saved playlist in `dir`. Non-files and hidden entries are
/// skipped; no recursion. Each call re-stats the directory rather than
/// caching.
pub fn enumerate(dir: &Utf8Path) -> Result<Vec<PlaylistInfo>> {
    let mut infos = Vec::new();
    for entry in std::fs::read_dir(dir.as_std_path())
        .wrap_err_with(|| format!("could not read playlist directory {dir}"))?
    {
        let entry = entry.wrap_err("could not read entry in playlist directory")?;
        let path = entry.path();
        if !path.is_file() || is_hidden(&entry.file_name()) {
            continue;
        }
        let path = Utf8PathBuf::from_path_buf(path)
            .map_err(|p| eyre!("non-utf8 playlist path: {}", p.display()))?;
        infos.push(info_from_path(path)?);
    }
    Ok(infos)
}

fn is_hidden(file_name: &std::ffi::OsStr) -> bool {
    file_name.to_string_lossy().starts_with('.')
}

fn info_from_path(path: Utf8PathBuf) -> Result<PlaylistInfo> {
    let metadata = std::fs::metadata(path.as_std_path())
        .wrap_err_with(|| format!("could not stat {path}"))?;
    let modified = metadata
        .modified()
        .wrap_err_with(|| format!("could not read mtime of {path}"))?;
    let name = path
        .file_stem()
        .unwrap_or_else(|| path.as_str())
        .to_owned();
    Ok(PlaylistInfo {
        path,
        name,
        last_modified: Timestamp::try_from(modified).unwrap_or(Timestamp::UNIX_EPOCH),
    })
}

/// Returns a handle to `dir/name.m3u` if it exists. A missing playlist is
/// not an error here — it's `Ok(None)`, and the `load` command turns that
/// into an `OK` response with an empty body, matching the source's
/// behavior.
pub fn from_path(dir: &Utf8Path, name: &str) -> Result<Option<PlaylistInfo>> {
    let mut path = dir.join(name);
    path.set_extension("m3u");
    if !path.exists() {
        return Ok(None);
    }
    info_from_path(path).map(Some)
}

/// A portable filename: letters, digits, `_`, `-`, `.`; no leading dot, no
/// path separators.
pub fn is_portable_filename(name: &str) -> bool {
    if name.is_empty() || name.starts_with('.') {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
