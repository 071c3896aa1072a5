//! The upstream streaming session: one WebSocket connection carrying login,
//! subscribe/unsubscribe control messages, and inbound data frames.
//!
//! Grounded on `dhan-rs`'s `ws::manager::DhanFeedManager` (split
//! reader/writer, `Arc<Mutex<_>>`-guarded writer shared with the read loop,
//! JSON control-message framing) adapted from Dhan's binary multi-connection
//! protocol to the single-connection JSON protocol `axiom/mdata/streaming.py`
//! drives through the `schwab-py` `StreamClient`.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::entities::Book;
use crate::error::{CoreError, Result};

/// One decoded inbound data frame, tagged by which subscription stream it
/// came in on so the supervisor can route it to the right decoder.
#[derive(Debug, Clone)]
pub enum StreamFrame {
    LevelOne(Value),
    LevelTwo(Value),
    Chart(Value),
    /// A frame this session doesn't recognize (e.g. a login ack or a
    /// heartbeat); carried through so callers can log it at debug level.
    Other(Value),
}

/// The streaming session seam, implemented by [`WsStreamingSession`] in
/// production and by a fake in tests.
#[async_trait]
pub trait StreamingSession: Send {
    async fn connect(&mut self) -> Result<()>;
    async fn login(&mut self) -> Result<()>;
    async fn subscribe_quotes(&mut self, symbols: &[String]) -> Result<()>;
    async fn subscribe_level_two(&mut self, symbols: &[String], book: Book) -> Result<()>;
    async fn subscribe_charts(&mut self, symbols: &[String]) -> Result<()>;
    async fn unsubscribe_quotes(&mut self, symbols: &[String]) -> Result<()>;
    async fn unsubscribe_level_two(&mut self, symbols: &[String], book: Book) -> Result<()>;
    async fn unsubscribe_charts(&mut self, symbols: &[String]) -> Result<()>;
    /// Await the next data or control frame. `None` means the connection is
    /// closed; `Some(Err(_))` for a malformed frame or transport error
    /// other than closure.
    async fn next_frame(&mut self) -> Option<Result<StreamFrame>>;
    async fn logout(&mut self) -> Result<()>;
}

type Writer = futures_util::stream::SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type Reader = futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

#[derive(Serialize)]
struct ControlMessage<'a> {
    service: &'a str,
    command: &'a str,
    parameters: ControlParameters<'a>,
}

#[derive(Serialize)]
struct ControlParameters<'a> {
    keys: &'a [String],
}

fn l2_service(book: Book) -> &'static str {
    match book {
        Book::Nasdaq => "LEVELTWO_NASDAQ",
        Book::Nyse => "LEVELTWO_NYSE",
    }
}

/// A live WebSocket-backed streaming session.
pub struct WsStreamingSession {
    ws_url: String,
    access_token: String,
    writer: Option<Arc<Mutex<Writer>>>,
    reader: Option<Reader>,
}

impl WsStreamingSession {
    pub fn new(ws_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            access_token: access_token.into(),
            writer: None,
            reader: None,
        }
    }

    async fn send_control(&self, service: &str, command: &str, keys: &[String]) -> Result<()> {
        let writer = self
            .writer
            .as_ref()
            .ok_or_else(|| CoreError::TransientNetwork("stream not connected".into()))?;
        let msg = ControlMessage {
            service,
            command,
            parameters: ControlParameters { keys },
        };
        let json = serde_json::to_string(&msg)?;
        let mut guard = writer.lock().await;
        guard.send(Message::Text(json.into())).await.map_err(CoreError::WebSocket)
    }
}

#[async_trait]
impl StreamingSession for WsStreamingSession {
    async fn connect(&mut self) -> Result<()> {
        let (ws, _resp) = connect_async(&self.ws_url).await?;
        let (write, read) = ws.split();
        self.writer = Some(Arc::new(Mutex::new(write)));
        self.reader = Some(read);
        Ok(())
    }

    async fn login(&mut self) -> Result<()> {
        let keys = vec![self.access_token.clone()];
        self.send_control("ADMIN", "LOGIN", &keys).await
    }

    async fn subscribe_quotes(&mut self, symbols: &[String]) -> Result<()> {
        self.send_control("QUOTE", "SUBS", symbols).await
    }

    async fn subscribe_level_two(&mut self, symbols: &[String], book: Book) -> Result<()> {
        self.send_control(l2_service(book), "SUBS", symbols).await
    }

    async fn subscribe_charts(&mut self, symbols: &[String]) -> Result<()> {
        self.send_control("CHART_EQUITY", "SUBS", symbols).await
    }

    async fn unsubscribe_quotes(&mut self, symbols: &[String]) -> Result<()> {
        self.send_control("QUOTE", "UNSUBS", symbols).await
    }

    async fn unsubscribe_level_two(&mut self, symbols: &[String], book: Book) -> Result<()> {
        self.send_control(l2_service(book), "UNSUBS", symbols).await
    }

    async fn unsubscribe_charts(&mut self, symbols: &[String]) -> Result<()> {
        self.send_control("CHART_EQUITY", "UNSUBS", symbols).await
    }

    async fn next_frame(&mut self) -> Option<Result<StreamFrame>> {
        let reader = self.reader.as_mut()?;
        loop {
            return match reader.next().await {
                Some(Ok(Message::Text(text))) => Some(decode_text_frame(&text)),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) => None,
                Some(Ok(_)) => continue,
                Some(Err(e)) => Some(Err(CoreError::WebSocket(e))),
                None => None,
            };
        }
    }

    async fn logout(&mut self) -> Result<()> {
        if let Some(writer) = &self.writer {
            let mut guard = writer.lock().await;
            let _ = guard.send(Message::Close(None)).await;
        }
        self.writer = None;
        self.reader = None;
        Ok(())
    }
}

fn decode_text_frame(text: &str) -> Result<StreamFrame> {
    let value: Value = serde_json::from_str(text).map_err(CoreError::Json)?;
    let service = value
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|a| a.first())
        .and_then(|entry| entry.get("service"))
        .or_else(|| value.get("service"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    match service {
        "QUOTE" | "LEVELONE_EQUITY" => Ok(StreamFrame::LevelOne(value)),
        s if s.starts_with("LEVELTWO") => Ok(StreamFrame::LevelTwo(value)),
        "CHART_EQUITY" => Ok(StreamFrame::Chart(value)),
        _ => Ok(StreamFrame::Other(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_text_frame_routes_by_service() {
        let text = r#"{"data": [{"service": "LEVELONE_EQUITY", "content": []}]}"#;
        match decode_text_frame(text).unwrap() {
            StreamFrame::LevelOne(_) => {}
            other => panic!("expected LevelOne, got {other:?}"),
        }
    }

    #[test]
    fn decode_text_frame_falls_back_to_other() {
        let text = r#"{"notification": []}"#;
        match decode_text_frame(text).unwrap() {
            StreamFrame::Other(_) => {}
            other => panic!("expected Other, got {other:?}"),
        }
    }
}
