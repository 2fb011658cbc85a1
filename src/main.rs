use std::process::ExitCode;

use tracing::error;
use tracing_subscriber::EnvFilter;
use wish_burner::config::Config;
use wish_burner::server;
use wish_burner::store::{self, WishStore};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let srv = match server::init_server(&config.bind_addr()) {
        Ok(srv) => srv,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    // one store for the whole process, shared by the sweeper and every handler thread
    let wishes = WishStore::new(config.wish_ttl);
    store::spawn_sweeper(wishes.clone(), config.sweep_interval);
    server::run_server(srv, wishes);
    ExitCode::SUCCESS
}
