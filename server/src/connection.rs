//! Transport capability consumed by the session
//!
//! The session never touches sockets directly. Whatever transport accepts a
//! client wraps it in a [`Connection`] for outbound frames and hands the session
//! a stream of inbound text frames.

use async_trait::async_trait;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,
    #[error("websocket error: {0}")]
    WebSocket(tungstenite::Error),
}

impl From<tungstenite::Error> for TransportError {
    fn from(error: tungstenite::Error) -> Self {
        match error {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                TransportError::Closed
            }
            other => TransportError::WebSocket(other),
        }
    }
}

/// Outbound half of a client connection.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Sends one text frame. Fails once the channel is closed.
    async fn send(&self, text: &str) -> Result<(), TransportError>;

    /// Closes the channel. Closing an already closed channel is a no-op.
    async fn close(&self);
}


#[cfg(test)]
mod tests {
    use super::mock::RecordingConnection;
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_closed_websocket_errors_map_to_closed() {
        assert!(matches!(
            TransportError::from(tungstenite::Error::ConnectionClosed),
            TransportError::Closed
        ));
        assert!(matches!(
            TransportError::from(tungstenite::Error::AlreadyClosed),
            TransportError::Closed
        ));
        assert!(matches!(
            TransportError::from(tungstenite::Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset by peer",
            ))),
            TransportError::WebSocket(_)
        ));
    }

    #[tokio::test]
    async fn test_recording_connection_refuses_after_close() {
        let connection = RecordingConnection::new();
        assert_ok!(connection.send(r#"{"type":"full"}"#).await);
        connection.close().await;
        assert_err!(connection.send(r#"{"type":"full"}"#).await);
        assert_eq!(connection.notices().len(), 1);
    }
}
