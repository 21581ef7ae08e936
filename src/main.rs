use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::process;

mod lib;
use lib::pipeline::run;

mod settings;
use settings::AppSettings;

/// Pedestrian density, speed and flow profiles from trajectory files
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long = "conf", default_value = "./data/conf.toml")]
    conf: String,
    /// Force debug logging
    #[arg(long)]
    verbose: bool,
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() {
    let cli = Cli::parse();
    let app_settings = AppSettings::new(&cli.conf);
    let debug = cli.verbose || app_settings.as_ref().map(|s| s.debug_enabled()).unwrap_or(false);
    init_tracing(debug);

    let app_settings = match app_settings {
        Ok(s) => s,
        Err(err) => {
            error!("Can't load settings from '{}': {}", cli.conf, err);
            process::exit(1);
        }
    };
    info!("Settings are:\n\t{}", app_settings);

    match run(&app_settings) {
        Ok(_) => {
            info!("Profiles are ready");
        },
        Err(err) => {
            error!("Can't compute profiles due the error: {}", err);
            process::exit(1);
        }
    }
}
