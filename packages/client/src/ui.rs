//! UI utilities for the client.

use std::io::Write;

/// Redisplay the prompt after receiving a message
pub fn redisplay_prompt(display_name: &str) {
    print!("{}> ", display_name);
    std::io::stdout().flush().ok();
}
