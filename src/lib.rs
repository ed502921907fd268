pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod domain;
pub mod models;
pub mod services;
pub mod state;

use clap::{CommandFactory, Parser};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
pub use config::Config;
use state::SharedState;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Cli::parse();

    let config_path = Config::locate();
    let config = Config::load_from(config_path.as_deref())?;
    config.validate()?;

    init_tracing(&config);
    match &config_path {
        Some(path) => info!("Loaded config from: {}", path.display()),
        None => info!("No config file found, using defaults"),
    }

    let Some(command) = args.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Search { query, pages } => {
            let pages = pages.unwrap_or(config.search.initial_pages);
            let state = build_state(config)?;
            cli::cmd_search(&state, &query.join(" "), pages).await
        }
        Commands::Info { id } => cli::cmd_movie_info(&build_state(config)?, &id).await,
        Commands::Browse => cli::cmd_browse(&build_state(config)?).await,
        Commands::Init => cli::cmd_init(),
    }
}

fn build_state(config: Config) -> anyhow::Result<SharedState> {
    if !config.has_credentials() {
        warn!(
            "No catalog credentials configured; set catalog.api_key or {}",
            constants::env::API_KEY
        );
    }

    let state = SharedState::new(config)?;
    info!(base_url = %state.config.catalog.base_url, "Catalog client ready");
    Ok(state)
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
