//! Framed TCP transport for the DTC JSON protocol.
//!
//! Frames are NUL-delimited UTF-8 JSON objects. `DtcConnection` owns the
//! socket lifecycle: logon handshake on connect, a receive loop forwarding
//! decoded frames downstream, and a heartbeat loop keeping the session
//! alive. Outbound request builders live in `request`.

pub mod codec;
pub mod connection;
pub mod error;
pub mod request;

pub use codec::{decode_frame, encode_frame, FrameBuffer, FRAME_DELIMITER};
pub use connection::{ConnectionConfig, DisconnectHook, DtcConnection};
pub use error::{TransportError, TransportResult};
pub use request::RequestIdGenerator;
