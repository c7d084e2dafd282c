use anyhow::Result;
use clap::Parser;
use dolmetsch::app;
use dolmetsch::cli::{Cli, Commands};
use dolmetsch::config::Config;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { host, port } => {
            app::run_serve(config, host, port)?;
        }
        Commands::Stream { endpoint, device } => {
            app::run_stream(config, endpoint, device)?;
        }
        Commands::TranscribeFile { file, endpoint } => {
            app::run_transcribe_file(config, &file, endpoint)?;
        }
        Commands::Devices => {
            app::run_devices()?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(Path::new("dolmetsch.toml"))?,
    };
    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "dolmetsch=info,tower_http=warn",
        1 => "dolmetsch=debug,tower_http=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
