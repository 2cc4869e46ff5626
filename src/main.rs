//! credential-session binary entry point.

use std::process::ExitCode;
use std::sync::Arc;

use credential_session::api::{serve, AppState};
use credential_session::cli::{parse_args, print_help, print_version};
use credential_session::config::Config;
use credential_session::engine::UnverifiedEngine;
use credential_session::logging;
use credential_session::server::SessionManager;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Try 'credential-session --help' for more information.");
            return ExitCode::FAILURE;
        }
    };

    if args.help {
        print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_with_level(config.log_filter()) {
        eprintln!("warning: logging already initialized: {}", e);
    }

    info!("credential-session v{}", env!("CARGO_PKG_VERSION"));

    let server_config = match config.to_server_config() {
        Ok(server_config) => server_config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    warn!("no credential engine configured; proofs are accepted without verification");
    let manager = Arc::new(SessionManager::new(
        config.to_manager_config(),
        Arc::new(UnverifiedEngine),
    ));

    let outcome = serve(server_config, AppState::new(Arc::clone(&manager))).await;
    manager.shutdown();

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("server error: {}", e);
            ExitCode::FAILURE
        }
    }
}
