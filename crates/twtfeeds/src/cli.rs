use clap::Parser;
use std::path::PathBuf;

/// twtfeeds: serve twtxt feeds, avatars and media for registered RSS/Atom sources
#[derive(Parser, Debug)]
#[command(name = "twtfeeds")]
#[command(about = "Serve aggregated twtxt feeds and accept new RSS/Atom registrations", long_about = None)]
pub struct Cli {
    /// Configuration file, also used to persist registered feeds
    #[arg(long, short = 'c', default_value = "feeds.toml")]
    pub config: PathBuf,

    /// Address to bind the HTTP server to
    #[arg(long, short = 'b', default_value = "0.0.0.0:8000")]
    pub bind: String,

    /// Data directory, overriding `root` from the configuration file
    #[arg(long, short = 'r')]
    pub root: Option<PathBuf>,
}

impl Cli {
    /// Parse CLI arguments from the environment
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
