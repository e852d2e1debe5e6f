//! Websocket adapter for the live relay.
//!
//! `connect` splits the socket: the write half becomes a [`WsRelay`], the
//! read half runs on its own task and decodes every inbound frame into a
//! bounded channel the driver consumes.

use frames::{ErrorCode, Frame, decode_frame, encode_frame};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use super::{Relay, ws_url};
use crate::error::SyncError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct WsRelay {
    sink: Mutex<SplitSink<WsStream, Message>>,
}

/// Open the websocket for `base_url` and start the reader task.
///
/// # Errors
///
/// Returns [`SyncError::InvalidBaseUrl`] or [`SyncError::Ws`] when the
/// handshake fails.
pub async fn connect(base_url: &str, inbound_capacity: usize) -> Result<(WsRelay, mpsc::Receiver<Frame>), SyncError> {
    let url = ws_url(base_url)?;
    let (stream, _) = connect_async(url.as_str()).await?;
    info!(%url, "relay: connected");

    let (sink, mut source) = stream.split();
    let (tx, rx) = mpsc::channel(inbound_capacity.max(1));

    tokio::spawn(async move {
        while let Some(message) = source.next().await {
            let message = match message {
                Ok(Message::Close(_)) => break,
                Ok(message) => message,
                Err(e) => {
                    warn!(error = %e, "relay: socket read failed");
                    break;
                }
            };
            match decode_message(message) {
                Ok(Some(frame)) => {
                    if tx.send(frame).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, code = e.error_code(), "relay: dropping undecodable frame"),
            }
        }
        debug!("relay: reader finished");
    });

    Ok((WsRelay { sink: Mutex::new(sink) }, rx))
}

/// Decode one websocket message. Control messages carry no frame.
fn decode_message(message: Message) -> Result<Option<Frame>, SyncError> {
    match message {
        Message::Binary(bytes) => Ok(Some(decode_frame(&bytes)?)),
        Message::Text(text) => Ok(Some(serde_json::from_str(text.as_str())?)),
        _ => Ok(None),
    }
}

impl WsRelay {
    /// Send a close frame. Later sends fail.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Ws`] if the close frame cannot be written.
    pub async fn close(&self) -> Result<(), SyncError> {
        self.sink.lock().await.close().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Relay for WsRelay {
    async fn send(&self, frame: Frame) -> Result<(), SyncError> {
        let bytes = encode_frame(&frame);
        self.sink.lock().await.send(Message::Binary(bytes.into())).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "relay_test.rs"]
mod tests;
