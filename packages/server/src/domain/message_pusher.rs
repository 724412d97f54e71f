//! Outbound channel to a single connection.
//!
//! The websocket handler owns the receiving half and forwards frames to the
//! socket. Everything else holds a `PusherChannel` and pushes serialized
//! envelopes into it.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::mpsc;

use super::error::MessagePushError;

/// A frame queued for a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    Close,
}

/// Sending half of a connection. Cloning shares the same connection.
#[derive(Debug, Clone)]
pub struct PusherChannel {
    sender: mpsc::UnboundedSender<OutboundFrame>,
    closed: Arc<AtomicBool>,
}

impl PusherChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender,
                closed: Arc::new(AtomicBool::new(false)),
            },
            receiver,
        )
    }

    /// Queue a text frame. Fails once the connection is closed or its writer is gone.
    pub fn push(&self, content: &str) -> Result<(), MessagePushError> {
        if self.is_closed() {
            return Err(MessagePushError::ChannelWriteFailure(
                "connection closed".to_string(),
            ));
        }
        self.sender
            .send(OutboundFrame::Text(content.to_string()))
            .map_err(|e| MessagePushError::ChannelWriteFailure(e.to_string()))
    }

    /// Ask the writer to close the socket. Safe to call more than once.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.sender.send(OutboundFrame::Close);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.sender.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_push_delivers_text_frame() {
        // テスト項目: push した内容がそのまま受信側に届く
        // given (前提条件):
        let (channel, mut rx) = PusherChannel::new();

        // when (操作):
        let result = channel.push("hello");

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(rx.recv().await, Some(OutboundFrame::Text("hello".to_string())));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_blocks_push() {
        // テスト項目: close は一度だけ Close フレームを送り、以降の push は失敗する
        // given (前提条件):
        let (channel, mut rx) = PusherChannel::new();

        // when (操作):
        channel.close();
        channel.close();
        let result = channel.push("late");

        // then (期待する結果):
        assert!(channel.is_closed());
        assert!(matches!(
            result,
            Err(MessagePushError::ChannelWriteFailure(_))
        ));
        assert_eq!(rx.recv().await, Some(OutboundFrame::Close));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_push_fails_after_receiver_dropped() {
        // テスト項目: 受信側が破棄されると push は失敗する
        // given (前提条件):
        let (channel, rx) = PusherChannel::new();
        drop(rx);

        // when (操作):
        let result = channel.push("hello");

        // then (期待する結果):
        assert!(result.is_err());
        assert!(channel.is_closed());
    }
}
