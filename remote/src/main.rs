//! youSonos remote - headless remote control for a youSonos server.
//!
//! Usage: `yousonos-remote [config-path]`
//!
//! Server pushes and user intents are read as JSON lines on standard input;
//! outbound commands are written as JSON lines on standard output. Logs go to
//! standard error and to a rolling file.

mod bridge;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use yousonos_core::{ChannelSink, ClientConfig, RemoteSession};

use crate::bridge::BridgeError;
use crate::logging::LoggingConfig;

/// Frames buffered between the stdin reader and the session.
const INPUT_BUFFER: usize = 64;

fn main() -> ExitCode {
    let _guard = match logging::init(&LoggingConfig::auto()) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("yousonos-remote: logging disabled: {e}");
            None
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("yousonos-remote")
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start the async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Starting youSonos remote");
    let outcome = runtime.block_on(run(std::env::args_os().nth(1).map(PathBuf::from)));
    // A blocked stdin read must not hold the process open.
    runtime.shutdown_background();

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("youSonos remote stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config_path: Option<PathBuf>) -> Result<(), BridgeError> {
    let config = match config_path {
        Some(path) => ClientConfig::load_from(&path)?,
        None => ClientConfig::load()?,
    };
    info!(
        "Debounce: volume {} ms, search {} ms, seek {} ms",
        config.debounce.volume_ms, config.debounce.search_ms, config.debounce.seek_ms
    );

    let (sink, commands) = ChannelSink::new();
    let (session, expired_rx) = RemoteSession::new(sink, config);
    let (push_tx, push_rx) = mpsc::channel(INPUT_BUFFER);
    let (intent_tx, intent_rx) = mpsc::channel(INPUT_BUFFER);

    let reader = tokio::spawn(bridge::read_frames(
        BufReader::new(tokio::io::stdin()),
        push_tx,
        intent_tx,
    ));
    let writer = tokio::spawn(bridge::write_commands(commands, tokio::io::stdout()));

    // The session owns the sink; once it returns the writer drains and exits.
    let outcome = session.run(expired_rx, push_rx, intent_rx).await;
    reader.abort();

    match writer.await {
        Ok(Ok(written)) => info!("Wrote {} command(s)", written),
        Ok(Err(e)) => warn!("Command writer failed: {}", e),
        Err(e) => warn!("Command writer task failed: {}", e),
    }
    outcome.map_err(BridgeError::from)
}
