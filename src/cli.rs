use camino::Utf8PathBuf;
use clap::Parser;

/// Video Player Daemon — an MPD-family control daemon for sopcast/VLC playback.
#[derive(Debug, Parser)]
#[command(name = "vpd", version)]
pub struct Cli {
    /// Path to a TOML configuration file.
    ///
    /// Falls back to `~/.config/vpd/config.toml`, then to built-in defaults.
    #[arg(long, short = 'c')]
    pub config: Option<Utf8PathBuf>,

    /// TCP port to listen on. Overrides the config file.
    #[arg(long)]
    pub port: Option<u16>,

    /// Address to bind the listening socket to. Overrides the config file.
    #[arg(long)]
    pub bind_to_address: Option<String>,

    /// Directory vpd stores its playlists in. Overrides the config file.
    #[arg(long)]
    pub workdir: Option<Utf8PathBuf>,
}
