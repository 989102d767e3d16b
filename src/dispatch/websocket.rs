//! Best-effort WebSocket delivery, one fresh connection per utterance.

use crate::defaults;
use crate::dispatch::sink::UtteranceSink;
use crate::error::{Result, VoxcastError};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tungstenite::Message;

/// Sends each utterance as a single text message to a fixed endpoint.
///
/// Opens a connection, writes one payload, closes. No reuse, no retry, no
/// buffering: a failed send is logged by the caller and the utterance is
/// dropped. The connect/read/write timeouts bound how long one attempt may
/// block the pipeline loop.
pub struct WebSocketDispatcher {
    endpoint: String,
    timeout: Duration,
}

impl WebSocketDispatcher {
    /// Create a dispatcher for the default endpoint.
    pub fn new() -> Self {
        Self::with_endpoint(defaults::DISPATCH_ENDPOINT, defaults::DISPATCH_TIMEOUT)
    }

    /// Create a dispatcher for a specific endpoint and timeout.
    pub fn with_endpoint(endpoint: &str, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Resolve the endpoint's TCP address.
    ///
    /// Only plain `ws://host:port` endpoints are supported; the listener is
    /// local, so TLS is out of scope.
    fn socket_addr(&self) -> Result<SocketAddr> {
        let authority = self
            .endpoint
            .strip_prefix("ws://")
            .ok_or_else(|| VoxcastError::DispatchConnection {
                message: format!("unsupported endpoint scheme: {}", self.endpoint),
            })?
            .split('/')
            .next()
            .unwrap_or_default();

        authority
            .to_socket_addrs()
            .map_err(|e| VoxcastError::DispatchConnection {
                message: format!("failed to resolve {}: {}", authority, e),
            })?
            .next()
            .ok_or_else(|| VoxcastError::DispatchConnection {
                message: format!("no address for {}", authority),
            })
    }

    /// Open a connection, complete the WebSocket handshake, and return the socket.
    fn connect(&self) -> Result<tungstenite::WebSocket<TcpStream>> {
        let addr = self.socket_addr()?;

        let stream = TcpStream::connect_timeout(&addr, self.timeout).map_err(|e| {
            VoxcastError::DispatchConnection {
                message: format!("connect to {} failed: {}", self.endpoint, e),
            }
        })?;

        // Bound the handshake and the send with the same timeout as connect
        stream
            .set_read_timeout(Some(self.timeout))
            .map_err(|e| VoxcastError::DispatchConnection {
                message: format!("failed to set read timeout: {}", e),
            })?;
        stream
            .set_write_timeout(Some(self.timeout))
            .map_err(|e| VoxcastError::DispatchConnection {
                message: format!("failed to set write timeout: {}", e),
            })?;

        let (socket, _response) =
            tungstenite::client(self.endpoint.as_str(), stream).map_err(|e| {
                VoxcastError::DispatchConnection {
                    message: format!("handshake with {} failed: {}", self.endpoint, e),
                }
            })?;

        Ok(socket)
    }
}

impl Default for WebSocketDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl UtteranceSink for WebSocketDispatcher {
    fn send(&mut self, utterance: &str) -> Result<()> {
        let mut socket = self.connect()?;

        socket
            .send(Message::text(utterance))
            .map_err(|e| VoxcastError::DispatchSend {
                message: format!("send to {} failed: {}", self.endpoint, e),
            })?;

        // Best-effort close; the payload is already flushed by send()
        let _ = socket.close(None);
        let _ = socket.flush();

        Ok(())
    }

    fn name(&self) -> &'static str {
        "websocket"
    }
}
