use std::io::ErrorKind;
use std::net::TcpStream;
use std::time::Duration;

use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use crate::stream::{ConnectError, Connection, EventSource, ReceiveError};

/// WebSocket transport for the agent's push stream.
pub struct WsEventSource {
    url: String,
}

impl WsEventSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl EventSource for WsEventSource {
    fn connect(&self) -> Result<Box<dyn Connection + Send>, ConnectError> {
        let (socket, _response) =
            tungstenite::connect(self.url.as_str()).map_err(|e| ConnectError(e.to_string()))?;
        Ok(Box::new(WsConnection { socket }))
    }
}

struct WsConnection {
    socket: WebSocket<MaybeTlsStream<TcpStream>>,
}

impl WsConnection {
    /// Receive timeouts live on the TCP stream underneath the socket.
    fn set_read_timeout(&mut self, timeout: Duration) {
        let stream = match self.socket.get_mut() {
            MaybeTlsStream::Plain(s) => s,
            MaybeTlsStream::NativeTls(t) => t.get_mut(),
            _ => return,
        };
        let _ = stream.set_read_timeout(Some(timeout));
    }
}

impl Connection for WsConnection {
    fn receive(&mut self, timeout: Duration) -> Result<String, ReceiveError> {
        self.set_read_timeout(timeout);
        loop {
            match self.socket.read() {
                Ok(Message::Text(text)) => return Ok(text),
                Ok(Message::Close(_)) => {
                    return Err(ReceiveError::Closed("server closed the stream".to_string()));
                }
                // Binary and frame-level ping/pong carry no events.
                Ok(_) => continue,
                Err(tungstenite::Error::Io(e))
                    if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut =>
                {
                    return Err(ReceiveError::Timeout);
                }
                Err(e) => return Err(ReceiveError::Closed(e.to_string())),
            }
        }
    }

    fn send(&mut self, text: &str) -> Result<(), ReceiveError> {
        self.socket
            .send(Message::Text(text.to_string()))
            .map_err(|e| ReceiveError::Closed(e.to_string()))
    }

    fn close(&mut self) {
        let _ = self.socket.close(None);
        let _ = self.socket.flush();
    }
}
