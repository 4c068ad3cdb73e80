use clap::Parser;
use cisauth_cli::cli::Args;
use cisauth_cli::config::AppConfig;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Error: {e:#}");
            std::process::exit(3);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(args.log_filter(&config)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &config.source {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => debug!("No config file found, using defaults and environment"),
    }

    match args.run(&config).await {
        Ok(report) => println!("{report}"),
        Err(e) => {
            eprintln!("❌ Error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
