//! DTC connection lifecycle.
//!
//! Owns the TCP socket, performs the logon handshake, and runs two
//! independent loops: a receive loop that reassembles frames and forwards
//! decoded JSON downstream, and a heartbeat loop that keeps the session
//! alive. Either loop terminating tears the connection down; `close` is
//! idempotent and safe to call from any of them.

use crate::codec::{decode_frame, encode_frame, FrameBuffer};
use crate::error::{TransportError, TransportResult};
use crate::request::{self, RequestIdGenerator};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Hook invoked exactly once when the connection closes, regardless of
/// which side initiated the teardown.
pub type DisconnectHook = Box<dyn Fn() + Send + Sync>;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server hostname or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Logon username.
    pub username: String,
    /// Logon password.
    pub password: String,
    /// Client name advertised in the logon request.
    pub client_name: String,
    /// DTC protocol version advertised in the logon request.
    pub protocol_version: u16,
    /// Heartbeat interval advertised to the server, in seconds. Heartbeats
    /// are sent one second early so a slow tick never misses the deadline.
    pub heartbeat_interval_secs: u64,
    /// Socket read chunk size.
    pub read_buffer_bytes: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 11099,
            username: String::new(),
            password: String::new(),
            client_name: "dtc-pipeline".to_string(),
            protocol_version: 8,
            heartbeat_interval_secs: 5,
            read_buffer_bytes: 64 * 1024,
        }
    }
}

impl ConnectionConfig {
    /// Interval at which heartbeats are actually sent.
    pub fn heartbeat_send_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.saturating_sub(1).max(1))
    }
}

/// A live DTC session over TCP.
pub struct DtcConnection {
    config: ConnectionConfig,
    write: TokioMutex<OwnedWriteHalf>,
    request_ids: RequestIdGenerator,
    closed: AtomicBool,
    shutdown_token: CancellationToken,
    on_disconnect: Option<DisconnectHook>,
}

impl DtcConnection {
    /// Connect, send the logon request as the first frame, and start the
    /// receive and heartbeat loops.
    ///
    /// Decoded inbound frames are forwarded over `frame_tx` in arrival
    /// order. The logon response arrives through that channel like any
    /// other frame.
    pub async fn connect(
        config: ConnectionConfig,
        frame_tx: mpsc::Sender<Value>,
        on_disconnect: Option<DisconnectHook>,
    ) -> TransportResult<Arc<Self>> {
        info!(host = %config.host, port = config.port, "Connecting to DTC server");

        let stream = TcpStream::connect((config.host.as_str(), config.port))
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        stream.set_nodelay(true)?;
        let (read_half, write_half) = stream.into_split();

        let conn = Arc::new(Self {
            config,
            write: TokioMutex::new(write_half),
            request_ids: RequestIdGenerator::new(),
            closed: AtomicBool::new(false),
            shutdown_token: CancellationToken::new(),
            on_disconnect,
        });

        let logon = request::logon_request(
            &conn.config.username,
            &conn.config.password,
            &conn.config.client_name,
            conn.config.protocol_version,
            conn.config.heartbeat_interval_secs,
        );
        conn.send(&logon).await?;
        info!(client_name = %conn.config.client_name, "Logon request sent");

        tokio::spawn(Self::receive_loop(Arc::clone(&conn), read_half, frame_tx));
        tokio::spawn(Self::heartbeat_loop(Arc::clone(&conn)));

        Ok(conn)
    }

    /// Allocate the next request ID for this connection.
    pub fn next_request_id(&self) -> i32 {
        self.request_ids.next_id()
    }

    /// True once `close` has run (or the connection tore itself down).
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Send one frame. Fails once the connection is closed.
    pub async fn send(&self, value: &Value) -> TransportResult<()> {
        if self.is_closed() {
            return Err(TransportError::NotConnected);
        }
        let frame = encode_frame(value)?;
        let mut write = self.write.lock().await;
        write
            .write_all(&frame)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        write
            .flush()
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        Ok(())
    }

    /// Close the connection. Idempotent: the first call sends a best-effort
    /// logoff, stops both loops, and fires the disconnect hook; later calls
    /// return immediately.
    pub async fn close(&self, reason: &str) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(reason, "Closing DTC connection");

        // Best effort; the socket may already be gone.
        let logoff = request::logoff(reason);
        if let Ok(frame) = encode_frame(&logoff) {
            let mut write = self.write.lock().await;
            if let Err(e) = write.write_all(&frame).await {
                debug!(error = %e, "Logoff send failed during close");
            }
            let _ = write.shutdown().await;
        }

        self.shutdown_token.cancel();
        if let Some(hook) = &self.on_disconnect {
            hook();
        }
    }

    async fn receive_loop(
        conn: Arc<Self>,
        mut read_half: OwnedReadHalf,
        frame_tx: mpsc::Sender<Value>,
    ) {
        let mut chunk = vec![0u8; conn.config.read_buffer_bytes];
        let mut buffer = FrameBuffer::new();

        loop {
            tokio::select! {
                () = conn.shutdown_token.cancelled() => {
                    debug!("Receive loop stopped by shutdown");
                    return;
                }
                result = read_half.read(&mut chunk) => {
                    match result {
                        Ok(0) => {
                            warn!("Server closed the connection");
                            conn.close("server closed connection").await;
                            return;
                        }
                        Ok(n) => {
                            buffer.extend(&chunk[..n]);
                            while let Some(frame) = buffer.next_frame() {
                                match decode_frame(&frame) {
                                    Ok(value) => {
                                        if frame_tx.send(value).await.is_err() {
                                            warn!("Frame receiver dropped, closing connection");
                                            conn.close("frame receiver dropped").await;
                                            return;
                                        }
                                    }
                                    Err(e) => {
                                        warn!(error = %e, len = frame.len(), "Dropping undecodable frame");
                                    }
                                }
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "Socket read error");
                            conn.close("socket read error").await;
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn heartbeat_loop(conn: Arc<Self>) {
        let mut ticker = tokio::time::interval(conn.config.heartbeat_send_interval());
        // First tick fires immediately; skip it so the logon frame stays first.
        ticker.tick().await;

        loop {
            tokio::select! {
                () = conn.shutdown_token.cancelled() => {
                    debug!("Heartbeat loop stopped by shutdown");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = conn.send(&request::heartbeat()).await {
                        warn!(error = %e, "Heartbeat send failed, stopping heartbeat loop");
                        return;
                    }
                    debug!("Heartbeat sent");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConnectionConfig::default();
        assert_eq!(config.protocol_version, 8);
        assert_eq!(config.heartbeat_interval_secs, 5);
        assert_eq!(config.read_buffer_bytes, 64 * 1024);
    }

    #[test]
    fn test_heartbeat_send_interval_is_one_second_early() {
        let config = ConnectionConfig {
            heartbeat_interval_secs: 5,
            ..Default::default()
        };
        assert_eq!(config.heartbeat_send_interval(), Duration::from_secs(4));

        // Never drops below one second.
        let config = ConnectionConfig {
            heartbeat_interval_secs: 1,
            ..Default::default()
        };
        assert_eq!(config.heartbeat_send_interval(), Duration::from_secs(1));
    }
}
