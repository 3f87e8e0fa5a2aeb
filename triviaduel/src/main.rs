//! `triviaduel` - real-time trivia duels against a simulated opponent

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use clap::Parser;
use tokio_util::sync::CancellationToken;

use triviaduel::cli::args::Cli;
use triviaduel::cli::commands;
use triviaduel::error::ExitCode;
use triviaduel::observability::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if !cli.quiet {
        init_logging(cli.log_format.into(), cli.verbose, cli.color);
    }

    let shutdown = CancellationToken::new();
    let signal_code = Arc::new(AtomicI32::new(ExitCode::SUCCESS));

    // Spawn signal handler for graceful shutdown
    {
        let shutdown = shutdown.clone();
        let signal_code = Arc::clone(&signal_code);
        tokio::spawn(async move {
            let code = wait_for_signal().await;
            signal_code.store(code, Ordering::SeqCst);
            eprintln!("\nShutting down gracefully... (press Ctrl+C again to force)");
            shutdown.cancel();

            let code = wait_for_signal().await;
            std::process::exit(code);
        });
    }

    let result = commands::dispatch(cli, shutdown).await;

    match result {
        Ok(()) => std::process::exit(signal_code.load(Ordering::SeqCst)),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

/// Waits for Ctrl+C or SIGTERM and returns the matching exit code.
#[cfg(unix)]
async fn wait_for_signal() -> i32 {
    use tokio::signal::unix::{SignalKind, signal};

    let Ok(mut sigterm) = signal(SignalKind::terminate()) else {
        let _ = tokio::signal::ctrl_c().await;
        return ExitCode::INTERRUPTED;
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => ExitCode::INTERRUPTED,
        _ = sigterm.recv() => ExitCode::TERMINATED,
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> i32 {
    let _ = tokio::signal::ctrl_c().await;
    ExitCode::INTERRUPTED
}
