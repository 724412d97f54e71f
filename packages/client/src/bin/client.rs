//! Terminal client for a SyncRate room.
//!
//! Joins an existing room, prints room events and sends slash commands
//! (`/next`, `/vote 8`, `/pick r1m1 12`, ...). Reconnects on dropped
//! connections (max 5 attempts with 5 second interval).
//!
//! Run with:
//! ```not_rust
//! cargo run --bin syncrate-client -- --room-id AB12CD --user-id u1 --display-name Alice
//! ```

use clap::Parser;

use syncrate_client::{SessionTarget, run_client};
use syncrate_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "syncrate-client")]
#[command(about = "Terminal client for SyncRate rating, radio and tournament rooms", long_about = None)]
struct Args {
    /// Room code to join
    #[arg(short = 'r', long)]
    room_id: String,

    /// User id sent to the server
    #[arg(short = 'i', long)]
    user_id: String,

    /// Display name shown to other members
    #[arg(short = 'n', long)]
    display_name: String,

    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let target = SessionTarget {
        url: args.url,
        room_id: args.room_id.to_uppercase(),
        user_id: args.user_id,
        display_name: args.display_name,
    };

    if let Err(e) = run_client(target).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
