use std::time::Duration;

use camino::Utf8PathBuf;
use color_eyre::eyre::Context;
use color_eyre::Result;
use etcetera::BaseStrategy;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::cli::Cli;

const DEFAULT_PORT: u16 = 7700;
const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
const DEFAULT_WORKDIR: &str = "/var/lib/vpd";
const DEFAULT_VLC_START_DELAY_SECS: u64 = 10;

/// The populated configuration record the rest of the daemon is built on top
/// of. Everything that reads `Config` treats it as already-resolved: CLI
/// flags, config file, and defaults have all been layered by [`Config::load`].
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub bind_to_address: String,
    pub workdir: Utf8PathBuf,
    pub vlc_start_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_to_address: DEFAULT_BIND_ADDRESS.to_owned(),
            workdir: Utf8PathBuf::from(DEFAULT_WORKDIR),
            vlc_start_delay: Duration::from_secs(DEFAULT_VLC_START_DELAY_SECS),
        }
    }
}

/// On-disk shape of the config file. Every field is optional: a missing field
/// falls through to the default in [`Config::default`].
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    port: Option<u16>,
    bind_to_address: Option<String>,
    workdir: Option<Utf8PathBuf>,
    vlc_start_delay: Option<u64>,
}

impl Config {
    /// Layers CLI flags over the config file over built-in defaults.
    ///
    /// A config file passed explicitly via `--config` is expected to exist
    /// and parse; failure there is propagated (and is fatal in `main`). A
    /// missing default location (`~/.config/vpd/config.toml`) is not an
    /// error — it just means "use defaults".
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = Config::default();

        let file_config = match &cli.config {
            Some(path) => {
                info!("using configuration file {path}");
                Some(read_config_file(path.as_std_path())?)
            }
            None => default_config_path()
                .and_then(|path| std::fs::read_to_string(&path).ok().map(|s| (path, s)))
                .map(|(path, contents)| {
                    info!("using configuration file {}", path.display());
                    parse_config(&contents)
                })
                .transpose()?,
        };

        if file_config.is_none() {
            debug!("no configuration file found, using default values");
        }

        if let Some(file_config) = file_config {
            if let Some(port) = file_config.port {
                config.port = port;
            }
            if let Some(addr) = file_config.bind_to_address {
                config.bind_to_address = addr;
            }
            if let Some(workdir) = file_config.workdir {
                config.workdir = workdir;
            }
            if let Some(secs) = file_config.vlc_start_delay {
                config.vlc_start_delay = Duration::from_secs(secs);
            }
        }

        if let Some(port) = cli.port {
            config.port = port;
        }
        if let Some(addr) = &cli.bind_to_address {
            config.bind_to_address = addr.clone();
        }
        if let Some(workdir) = &cli.workdir {
            config.workdir = workdir.clone();
        }

        Ok(config)
    }

    pub fn playlists_dir(&self) -> Utf8PathBuf {
        self.workdir.join("playlists")
    }
}

fn default_config_path() -> Option<std::path::PathBuf> {
    let dirs = etcetera::choose_base_strategy().ok()?;
    Some(dirs.config_dir().join("vpd").join("config.toml"))
}

fn read_config_file(path: &std::path::Path) -> Result<FileConfig> {
    let contents = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("could not read config file {}", path.display()))?;
    parse_config(&contents)
}

fn parse_config(contents: &str) -> Result<FileConfig> {
    toml::from_str(contents).wrap_err("could not parse config file as TOML")
}

/// Ensures `workdir/playlists` exists, creating it (and `workdir`) if needed.
/// Per spec this is the one startup failure that is fatal.
pub fn ensure_workdir(config: &Config) -> Result<()> {
    let dir = config.playlists_dir();
    if let Err(e) = std::fs::create_dir_all(dir.as_std_path()) {
        warn!("could not create playlist directory {dir}: {e}");
        return Err(e).wrap_err_with(|| format!("could not create workdir at {dir}"));
    }
    Ok(())
}
