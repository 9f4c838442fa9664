//! Mock DTC server for integration tests.
//!
//! Speaks the NUL-delimited JSON framing:
//! - Accepts connections and records every received frame
//! - Answers logon requests with a successful logon response
//! - Lets tests push arbitrary frames, or raw bytes, to the most recent
//!   connection

use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};

/// A mock DTC server for testing.
pub struct MockDtcServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    frames: Arc<Mutex<Vec<Value>>>,
    connections: Arc<Mutex<u32>>,
    push_tx: Arc<Mutex<Option<mpsc::Sender<Vec<u8>>>>>,
}

impl MockDtcServer {
    /// Start a new mock server on an available port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let frames: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
        let connections: Arc<Mutex<u32>> = Arc::new(Mutex::new(0));
        let push_tx: Arc<Mutex<Option<mpsc::Sender<Vec<u8>>>>> = Arc::new(Mutex::new(None));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let frames_clone = frames.clone();
        let connections_clone = connections.clone();
        let push_tx_clone = push_tx.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        let frames = frames_clone.clone();
                        let connections = connections_clone.clone();
                        let (tx, rx) = mpsc::channel::<Vec<u8>>(64);
                        *push_tx_clone.lock().await = Some(tx);
                        tokio::spawn(handle_connection(stream, frames, connections, rx));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            frames,
            connections,
            push_tx,
        }
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Number of connections accepted so far.
    pub async fn connection_count(&self) -> u32 {
        *self.connections.lock().await
    }

    /// Every frame received, in arrival order.
    pub async fn received_frames(&self) -> Vec<Value> {
        self.frames.lock().await.clone()
    }

    /// Frames received with the given numeric `Type`.
    pub async fn frames_of_type(&self, type_code: i64) -> Vec<Value> {
        self.received_frames()
            .await
            .into_iter()
            .filter(|f| f.get("Type").and_then(Value::as_i64) == Some(type_code))
            .collect()
    }

    /// Push a frame to the most recent connection.
    pub async fn push(&self, frame: Value) {
        let mut bytes = serde_json::to_vec(&frame).expect("frame serializes");
        bytes.push(0);
        self.push_raw(bytes).await;
    }

    /// Push raw bytes verbatim, delimiters and all. For feeding the client
    /// malformed wire data.
    pub async fn push_raw(&self, bytes: Vec<u8>) {
        let guard = self.push_tx.lock().await;
        let tx = guard.as_ref().expect("no connection to push to");
        tx.send(bytes).await.expect("connection push failed");
    }

    /// Shutdown the server.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    frames: Arc<Mutex<Vec<Value>>>,
    connections: Arc<Mutex<u32>>,
    mut push_rx: mpsc::Receiver<Vec<u8>>,
) {
    {
        let mut count = connections.lock().await;
        *count += 1;
    }

    let mut chunk = vec![0u8; 8192];
    let mut buffer: Vec<u8> = Vec::new();

    loop {
        tokio::select! {
            result = stream.read(&mut chunk) => {
                let n = match result {
                    Ok(0) | Err(_) => break,
                    Ok(n) => n,
                };
                buffer.extend_from_slice(&chunk[..n]);

                while let Some(pos) = buffer.iter().position(|&b| b == 0) {
                    let frame: Vec<u8> = buffer.drain(..=pos).collect();
                    let frame = &frame[..frame.len() - 1];
                    if frame.is_empty() {
                        continue;
                    }
                    let Ok(value) = serde_json::from_slice::<Value>(frame) else {
                        continue;
                    };

                    let is_logon = value.get("Type").and_then(Value::as_i64) == Some(1);
                    frames.lock().await.push(value);

                    if is_logon {
                        let response = json!({
                            "Type": 2,
                            "Result": 1,
                            "ResultText": "Logon successful",
                            "ServerName": "MockDTC",
                            "ProtocolVersion": 8
                        });
                        if write_frame(&mut stream, &response).await.is_err() {
                            return;
                        }
                    }
                }
            }
            pushed = push_rx.recv() => {
                let Some(bytes) = pushed else { break };
                if stream.write_all(&bytes).await.is_err() || stream.flush().await.is_err() {
                    return;
                }
            }
        }
    }
}

async fn write_frame(stream: &mut TcpStream, value: &Value) -> std::io::Result<()> {
    let mut bytes = serde_json::to_vec(value).expect("frame serializes");
    bytes.push(0);
    stream.write_all(&bytes).await?;
    stream.flush().await
}
