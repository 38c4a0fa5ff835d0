//! flowkeeper - retention and freshness for flow data repositories

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};

use flowkeeper::cli::{Cli, Commands};
use flowkeeper::commands::{run_check, run_purge};
use flowkeeper::config::ServeConfig;
use flowkeeper::error::{AppError, Result};
use flowkeeper::logging::{self, LogConfig, AUDIT_TARGET};
use flowkeeper::output::Console;
use flowkeeper::routes;
use flowkeeper::state::AppState;
use flowkeeper::tasks::status_refresh;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(
                target: AUDIT_TARGET,
                critical = !e.is_misconfiguration(),
                error = %e,
                "flowkeeper aborted"
            );
            eprintln!("flowkeeper: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Purge(args) => {
            logging::init(LogConfig {
                verbose: args.verbose,
                silent: args.silent,
                color: !args.monochrome,
                syslog: !args.dry_run,
            });
            let console = Console::new(args.output_config());
            blocking(move || run_purge(&args, &console).map(|_| ())).await
        }
        Commands::Check(args) => {
            logging::init(LogConfig {
                color: !args.monochrome,
                ..LogConfig::default()
            });
            let console = Console::new(args.output_config());
            blocking(move || run_check(&args, &console).map(|_| ())).await
        }
        Commands::Serve => serve().await,
    }
}

/// Run a synchronous batch operation off the async workers.
async fn blocking<F>(operation: F) -> Result<()>
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    tokio::task::spawn_blocking(operation)
        .await
        .map_err(|e| AppError::Internal(format!("worker task failed: {}", e)))?
}

async fn serve() -> Result<()> {
    logging::init(LogConfig {
        color: true,
        ..LogConfig::default()
    });

    let config = ServeConfig::from_env()?;
    let state = AppState::new(config.status_document.clone());

    // Reloads the document immediately, then on every interval
    let refresh_state = state.clone();
    let refresh_every = config.refresh_interval;
    tokio::spawn(async move {
        status_refresh::status_refresh_task(refresh_state, refresh_every).await;
    });

    let app = routes::router(state);

    info!(
        "flowkeeper v{} serving {} on {}",
        env!("CARGO_PKG_VERSION"),
        config.status_document.display(),
        config.listen_addr
    );

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
