//! Stdin/stdout JSON bridge between a host process and a [`QueryController`].
//!
//! Reads newline-delimited JSON commands:
//!
//! ```text
//! {"command":"query","text":"Paris, eiffel tower"}
//! {"command":"settings","providers":["unsplash","openverse"],"limit":12}
//! {"command":"stop"}
//! ```
//!
//! and writes each published [`SearchState`] as one JSON line. A command that
//! cannot be parsed is answered with an `{"error": "..."}` line.
//!
//! Stdout is reserved for the protocol; diagnostics go to stderr.

use std::io;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::controller::{QueryController, SearchState};
use crate::types::Provider;

/// A command sent by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum HostCommand {
    /// New query text.
    Query { text: String },
    /// New enabled providers and result limit.
    Settings {
        providers: Vec<Provider>,
        limit: usize,
    },
    /// End the session.
    Stop,
}

#[derive(Debug, Serialize)]
struct ErrorLine {
    error: String,
}

/// Run the bridge until `reader` reaches EOF or a `stop` command arrives.
///
/// Published states are forwarded as they change; when several changes land
/// between two writes only the latest is emitted.
///
/// # Errors
///
/// Returns an I/O error if reading commands or writing output fails.
pub async fn run_bridge<R, W>(controller: QueryController, reader: R, mut writer: W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut states = controller.subscribe();
    states.borrow_and_update();

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state: SearchState = states.borrow_and_update().clone();
                write_json(&mut writer, &state).await?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::info!("stdin closed (EOF); shutting down bridge");
                    break;
                };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<HostCommand>(trimmed) {
                    Ok(HostCommand::Stop) => {
                        tracing::info!("stop received; shutting down bridge");
                        break;
                    }
                    Ok(command) => dispatch(&controller, command),
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to parse host command");
                        let reply = ErrorLine {
                            error: format!("invalid command: {e}"),
                        };
                        write_json(&mut writer, &reply).await?;
                    }
                }
            }
        }
    }

    writer.flush().await
}

fn dispatch(controller: &QueryController, command: HostCommand) {
    match command {
        HostCommand::Query { text } => {
            controller.on_query_change(&text);
        }
        HostCommand::Settings { providers, limit } => {
            controller.on_settings_change(providers, limit);
        }
        HostCommand::Stop => {}
    }
}

/// Write one value as a JSON line and flush.
async fn write_json<W, T>(writer: &mut W, value: &T) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut json =
        serde_json::to_vec(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    json.push(b'\n');
    writer.write_all(&json).await?;
    writer.flush().await
}
