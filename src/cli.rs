use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "readtrack",
    version,
    about = "Terminal client for the ReadTracker reading tracker: library, search, stats and the BookBot assistant.",
    long_about = None
)]
pub struct Cli {
    /// Use a specific configuration file
    #[clap(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the backend base URL from the configuration file
    #[clap(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Override the assistant base URL from the configuration file
    #[clap(long, value_name = "URL")]
    pub chat_endpoint: Option<String>,

    /// Browse the built-in demo library without a backend
    #[clap(long)]
    pub demo: bool,

    /// Increase verbosity (-v, -vv)
    #[clap(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Enable debug output
    #[clap(long)]
    pub debug: bool,
}
