//! Application execution logic.
//!
//! Builds the configured destinations, starts their workers and feeds them
//! with newline-delimited JSON read from stdin until input ends or a
//! shutdown signal arrives.

use std::future::Future;
use std::io;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::{Stream, StreamExt};

use chat_relay::config::ValidatedConfig;
use chat_relay::destination::{
    BuildError, DestinationRegistry, Destinations, LifecycleError, SubmitError,
};

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

/// Field of an input line naming the target destination.
const DESTINATION_FIELD: &str = "destination";

/// How often queues are checked while draining after end of input.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Error type for runtime execution failures.
#[derive(Debug, Error)]
pub enum RunError {
    /// A configured destination could not be built.
    #[error("Failed to build destinations: {0}")]
    Build(#[source] BuildError),

    /// A destination worker could not be started.
    #[error("Failed to start destinations: {0}")]
    Start(#[source] LifecycleError),

    /// Reading stdin failed.
    #[error("Failed to read input: {0}")]
    Input(#[source] io::Error),

    /// A worker did not exit cleanly.
    #[error("Failed to shut down destinations: {0}")]
    Shutdown(#[source] LifecycleError),
}

/// Why one input line was not queued.
#[derive(Debug, Error)]
enum DispatchError {
    #[error("Malformed input line: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Input line is not a JSON object")]
    NotAnObject,

    #[error("Input line has no string 'destination' field")]
    MissingDestination,

    #[error("Unknown destination '{0}'")]
    UnknownDestination(String),

    #[error("Rejected by destination '{destination}': {source}")]
    Submit {
        destination: String,
        #[source]
        source: SubmitError,
    },
}

/// How the input loop ended.
#[derive(Debug, PartialEq, Eq)]
enum InputEnd {
    Closed,
    Interrupted,
}

/// Executes the relay until stdin closes or a shutdown signal arrives.
///
/// This function:
/// 1. Builds every configured destination (any failure aborts startup)
/// 2. Logs each destination's redacted URI
/// 3. Starts all delivery workers
/// 4. Relays stdin lines to destinations
/// 5. Waits for queues to drain after end of input
/// 6. Cancels and joins all workers
///
/// # Errors
///
/// Returns an error if a destination cannot be built or started, if stdin
/// cannot be read, or if a worker panicked.
#[cfg(not(tarpaulin_include))]
pub async fn execute(config: ValidatedConfig) -> Result<(), RunError> {
    let registry = DestinationRegistry::with_builtin(config.destination_settings());
    let destinations = registry
        .build_set(&config.destinations)
        .map_err(RunError::Build)?;

    for (name, description) in destinations.describe_all() {
        tracing::info!("Destination '{name}': {description}");
    }
    destinations.start_all().map_err(RunError::Start)?;

    let lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let result = match relay_lines(&destinations, lines, &mut shutdown).await {
        Ok(InputEnd::Closed) => {
            tracing::info!("Input closed, waiting for queued messages");
            wait_for_drain(&destinations, &mut shutdown, DRAIN_POLL_INTERVAL).await;
            Ok(())
        }
        Ok(InputEnd::Interrupted) => Ok(()),
        Err(e) => Err(e),
    };

    destinations
        .shutdown_all()
        .await
        .map_err(RunError::Shutdown)?;
    tracing::info!("All destinations stopped");

    result
}

/// Dispatches input lines until the stream ends or `shutdown` completes.
async fn relay_lines<S, F>(
    destinations: &Destinations,
    mut lines: S,
    mut shutdown: F,
) -> Result<InputEnd, RunError>
where
    S: Stream<Item = io::Result<String>> + Unpin,
    F: Future<Output = ()> + Unpin,
{
    loop {
        tokio::select! {
            biased;

            () = &mut shutdown => {
                tracing::info!("Shutdown signal received, stopping...");
                return Ok(InputEnd::Interrupted);
            }

            line = lines.next() => match line {
                Some(Ok(line)) => {
                    if let Err(e) = dispatch_line(destinations, &line) {
                        tracing::warn!("{e}");
                    }
                }
                Some(Err(e)) => return Err(RunError::Input(e)),
                None => return Ok(InputEnd::Closed),
            },
        }
    }
}

/// Decodes one input line and submits it to the destination it names.
///
/// Blank lines are skipped.
fn dispatch_line(destinations: &Destinations, line: &str) -> Result<(), DispatchError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }

    let Value::Object(mut fields) = serde_json::from_str::<Value>(line)? else {
        return Err(DispatchError::NotAnObject);
    };
    let Some(Value::String(name)) = fields.remove(DESTINATION_FIELD) else {
        return Err(DispatchError::MissingDestination);
    };
    let destination = destinations
        .get(&name)
        .ok_or_else(|| DispatchError::UnknownDestination(name.clone()))?;

    let empty = destination.empty_message();
    let submitted = empty
        .decode(Value::Object(fields))
        .map_err(|e| SubmitError::InvalidMessageType {
            expected: empty.kind(),
            reason: e.to_string(),
        })
        .and_then(|message| destination.submit(message));

    submitted.map_err(|source| DispatchError::Submit {
        destination: name,
        source,
    })
}

/// Waits until every queue is empty or `shutdown` completes.
async fn wait_for_drain<F>(destinations: &Destinations, mut shutdown: F, poll: Duration)
where
    F: Future<Output = ()> + Unpin,
{
    while destinations.iter().any(|d| d.queued() > 0) {
        tokio::select! {
            biased;

            () = &mut shutdown => {
                tracing::info!("Shutdown signal received, abandoning queued messages");
                return;
            }

            () = tokio::time::sleep(poll) => {}
        }
    }
}

/// Returns a future that completes when a shutdown signal is received.
///
/// Excluded from coverage - requires OS signal handling.
#[cfg(not(tarpaulin_include))]
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
