use readtrack::{
    cli::Cli,
    config::Config,
    logging::{self, LogLevel},
    ui::app::App,
};

use clap::Parser;
use eyre::Result;

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(LogLevel::from_verbosity(cli.verbose, cli.debug));

    let config = match &cli.config {
        Some(path) => Config::load_from(path.clone())?,
        None => match Config::new() {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Warning: Could not load configuration: {}", err);
                eprintln!("Starting with default settings");
                Config::load_from(std::env::temp_dir().join("readtrack-configuration.json"))?
            }
        },
    };

    let mut app = App::new(config, &cli)?;
    app.run()
}
