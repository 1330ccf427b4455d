//! Line-delimited JSON over stdio.
//!
//! Each input line is one frame, either `{"push": {"topic", "payload"}}` or
//! `{"intent": {"action", ...}}`. Each outbound command is written as one
//! `{"command", "payload"}` line whose payload is a JSON-encoded string.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use yousonos_core::{OutboundCommand, RawPush, UserIntent};

/// One input line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFrame {
    /// A server push.
    Push(RawPush),
    /// A user intent.
    Intent(UserIntent),
}

/// One output line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandFrame {
    /// Command name.
    pub command: &'static str,
    /// JSON-encoded payload.
    pub payload: String,
}

impl CommandFrame {
    /// Frame an outbound command.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn new(command: &OutboundCommand) -> Result<Self, BridgeError> {
        Ok(Self {
            command: command.name(),
            payload: command.payload_json()?,
        })
    }
}

/// Errors of the stdio bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Reading or writing stdio failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An input line is not a valid frame.
    #[error("Invalid frame on line {line}: {source}")]
    InvalidFrame {
        /// One-based input line number.
        line: usize,
        /// Parse failure.
        source: serde_json::Error,
    },

    /// A frame could not be encoded.
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Error raised by the session library.
    #[error(transparent)]
    Core(#[from] yousonos_core::Error),
}

/// Parse one input line. Blank lines carry no frame.
///
/// # Errors
///
/// Returns [`BridgeError::InvalidFrame`] when the line is not a frame.
pub fn parse_frame(line_number: usize, line: &str) -> Result<Option<InputFrame>, BridgeError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line)
        .map(Some)
        .map_err(|source| BridgeError::InvalidFrame {
            line: line_number,
            source,
        })
}

/// Forward frames from `reader` until end of input or until the session stops listening.
///
/// Invalid lines are logged and skipped. Returns the number of frames forwarded.
///
/// # Errors
///
/// Returns an error if reading fails.
pub async fn read_frames<R>(
    reader: R,
    pushes: mpsc::Sender<RawPush>,
    intents: mpsc::Sender<UserIntent>,
) -> Result<usize, BridgeError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_number = 0;
    let mut forwarded = 0;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        let frame = match parse_frame(line_number, &line) {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };

        let delivered = match frame {
            InputFrame::Push(push) => pushes.send(push).await.is_ok(),
            InputFrame::Intent(intent) => intents.send(intent).await.is_ok(),
        };
        if !delivered {
            debug!("Session stopped listening at line {}", line_number);
            return Ok(forwarded);
        }
        forwarded += 1;
    }

    info!("End of input after {} line(s)", line_number);
    Ok(forwarded)
}

/// Write every command from `commands` to `writer`, one frame per line.
///
/// Returns the number of commands written once the channel closes.
///
/// # Errors
///
/// Returns an error if encoding or writing fails.
pub async fn write_commands<W>(
    mut commands: mpsc::UnboundedReceiver<OutboundCommand>,
    mut writer: W,
) -> Result<usize, BridgeError>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    while let Some(command) = commands.recv().await {
        let mut line = serde_json::to_vec(&CommandFrame::new(&command)?)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
        debug!("Wrote {}", command);
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_parse_push_frame() {
        let frame = parse_frame(1, r#"{"push": {"topic": "player_time", "payload": 42}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            frame,
            InputFrame::Push(RawPush::new("player_time", json!(42)))
        );
    }

    #[test]
    fn test_parse_intent_frame() {
        let frame = parse_frame(1, r#"{"intent": {"action": "next_track"}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(frame, InputFrame::Intent(UserIntent::NextTrack));
    }

    #[test]
    fn test_blank_and_invalid_lines() {
        assert!(parse_frame(1, "   ").unwrap().is_none());
        let err = parse_frame(7, r#"{"shout": 1}"#).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidFrame { line: 7, .. }));
    }

    #[test]
    fn test_command_frame_payload_is_a_string() {
        let frame = CommandFrame::new(&OutboundCommand::SeekTo { player_time: 1200 }).unwrap();
        let line: Value = serde_json::to_value(&frame).unwrap();
        assert_eq!(line["command"], "seek_to");

        let payload: Value = serde_json::from_str(line["payload"].as_str().unwrap()).unwrap();
        assert_eq!(payload, json!({"player_time": 1200}));
    }

    #[tokio::test]
    async fn test_read_frames_routes_and_skips_garbage() {
        let input = concat!(
            r#"{"push": {"topic": "player_time", "payload": 5}}"#,
            "\n",
            "not json\n",
            "\n",
            r#"{"intent": {"action": "toggle_play_pause"}}"#,
            "\n",
        );
        let (push_tx, mut push_rx) = mpsc::channel(4);
        let (intent_tx, mut intent_rx) = mpsc::channel(4);

        let forwarded = read_frames(input.as_bytes(), push_tx, intent_tx).await.unwrap();
        assert_eq!(forwarded, 2);
        assert_eq!(push_rx.recv().await.unwrap().topic, "player_time");
        assert_eq!(intent_rx.recv().await.unwrap(), UserIntent::TogglePlayPause);
    }

    #[tokio::test]
    async fn test_read_frames_stops_when_session_is_gone() {
        let input = "{\"intent\": {\"action\": \"next_track\"}}\n".repeat(3);
        let (push_tx, _push_rx) = mpsc::channel(4);
        let (intent_tx, intent_rx) = mpsc::channel(4);
        drop(intent_rx);

        let forwarded = read_frames(input.as_bytes(), push_tx, intent_tx).await.unwrap();
        assert_eq!(forwarded, 0);
    }

    #[tokio::test]
    async fn test_write_commands_one_line_each() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(OutboundCommand::CancelSearch).unwrap();
        tx.send(OutboundCommand::PlayTrack {
            url: "https://youtu.be/x".to_string(),
        })
        .unwrap();
        drop(tx);

        let mut output = Vec::new();
        let written = write_commands(rx, &mut output).await.unwrap();
        assert_eq!(written, 2);

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"command":"cancel_search","payload":"{}"}"#);
        assert!(lines[1].starts_with(r#"{"command":"play_track""#));
    }
}
