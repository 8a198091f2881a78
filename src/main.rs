mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use relaybox::api::{self, AnyError};
use relaybox::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Serve(args) => api::run(config, args.address).await?,
        Commands::Routes => print_routes(&config),
    }

    Ok(())
}

fn print_routes(config: &Config) {
    let base_url = config.upstream.base_url.as_deref().unwrap_or("<unset>");
    println!("upstream: {base_url} (dummy mode: {})", config.upstream.dummy_mode);

    for (name, route) in &config.routes {
        println!(
            "{name}: {} {} -> {}{}{}",
            route.method,
            route.path,
            base_url,
            route.target(),
            if route.dummy.is_some() { " [dummy]" } else { "" }
        );
    }
}
