//! WebSocket client session management.

use futures_util::{SinkExt, StreamExt};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use syncrate_server::infrastructure::dto::websocket::{Envelope, ErrorData, MessageKind};
use syncrate_shared::time::get_utc_timestamp;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, protocol::Message},
};

use super::{
    command::{Command, HELP},
    error::ClientError,
    formatter::MessageFormatter,
    ui::redisplay_prompt,
};

/// Who is connecting and to which room
#[derive(Debug, Clone)]
pub struct SessionTarget {
    pub url: String,
    pub room_id: String,
    pub user_id: String,
    pub display_name: String,
}

impl SessionTarget {
    /// The WebSocket URL with identity passed as query parameters
    pub fn connect_url(&self) -> String {
        format!(
            "{}?room_id={}&user_id={}&display_name={}",
            self.url,
            encode_query_value(&self.room_id),
            encode_query_value(&self.user_id),
            encode_query_value(&self.display_name)
        )
    }
}

/// Percent-encode everything outside the URL unreserved set.
fn encode_query_value(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}

/// Map a failed handshake onto the client's error kinds
fn handshake_error(error: tungstenite::Error, room_id: &str) -> ClientError {
    match error {
        tungstenite::Error::Http(response) => match response.status().as_u16() {
            404 => ClientError::RoomNotFound(room_id.to_string()),
            400 => ClientError::InvalidParameters(response.status().to_string()),
            _ => ClientError::ConnectionError(response.status().to_string()),
        },
        other => ClientError::ConnectionError(other.to_string()),
    }
}

/// How the read side of a session ended
enum ReadOutcome {
    ConnectionLost,
    RoomClosed(String),
}

/// Run the WebSocket client session
pub async fn run_client_session(target: &SessionTarget) -> Result<(), ClientError> {
    let (ws_stream, _response) = connect_async(target.connect_url())
        .await
        .map_err(|e| handshake_error(e, &target.room_id))?;

    tracing::info!("Connected to room {}", target.room_id);
    println!(
        "\nYou are '{}' in room {}. Type /help for commands. Press Ctrl+C to exit.\n",
        target.display_name, target.room_id
    );

    let (mut write, mut read) = ws_stream.split();

    let user_id = target.user_id.clone();
    let prompt_name = target.display_name.clone();

    // Spawn a task to handle incoming messages
    let mut read_task = tokio::spawn(async move {
        let mut closed_reason: Option<String> = None;

        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    let text = text.as_str();
                    let formatted = match Envelope::decode(text) {
                        Ok(envelope) => {
                            if envelope.kind == MessageKind::Error
                                && let Ok(error) = envelope.payload::<ErrorData>()
                                && error.reload
                            {
                                closed_reason = Some(error.message.clone());
                            }
                            MessageFormatter::format_envelope(&envelope, text, &user_id)
                        }
                        Err(_) => MessageFormatter::format_raw_message(text),
                    };
                    print!("{}", formatted);
                    redisplay_prompt(&prompt_name);
                }
                Ok(Message::Binary(data)) => {
                    print!("{}", MessageFormatter::format_binary_message(data.len()));
                    redisplay_prompt(&prompt_name);
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("Server closed the connection");
                    break;
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    break;
                }
                _ => {}
            }
        }

        match closed_reason {
            Some(reason) => ReadOutcome::RoomClosed(reason),
            None => ReadOutcome::ConnectionLost,
        }
    });

    // Create channel for rustyline input
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();

    // Spawn a blocking thread for rustyline (synchronous readline)
    let prompt = format!("{}> ", target.display_name);
    let _readline_handle = std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    // Spawn a task to turn commands into frames
    let prompt_name = target.display_name.clone();
    let mut write_task = tokio::spawn(async move {
        while let Some(line) = input_rx.recv().await {
            let command = match Command::parse(&line) {
                Ok(command) => command,
                Err(e) => {
                    println!("{}", e);
                    redisplay_prompt(&prompt_name);
                    continue;
                }
            };

            let timestamp = get_utc_timestamp();
            let Some(envelope) = command.to_envelope(timestamp) else {
                print!("{}", HELP);
                redisplay_prompt(&prompt_name);
                continue;
            };

            let json = match envelope.encode() {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("Failed to serialize message: {}", e);
                    continue;
                }
            };

            if let Err(e) = write.send(Message::text(json)).await {
                tracing::warn!("Failed to send message: {}", e);
                return false;
            }

            if command == Command::Leave {
                let _ = write.close().await;
                return true;
            }

            print!(
                "{}",
                MessageFormatter::format_sent_confirmation(envelope.kind, timestamp)
            );
            redisplay_prompt(&prompt_name);
        }

        // Input closed (Ctrl+C / Ctrl+D)
        let _ = write.close().await;
        true
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        read_result = &mut read_task => {
            write_task.abort();
            match read_result {
                Ok(ReadOutcome::RoomClosed(reason)) => Err(ClientError::RoomClosed(reason)),
                _ => Err(ClientError::ConnectionError("Connection lost".to_string())),
            }
        }
        write_result = &mut write_task => {
            read_task.abort();
            match write_result {
                Ok(true) => Ok(()),
                _ => Err(ClientError::ConnectionError("Connection lost".to_string())),
            }
        }
    }
}
