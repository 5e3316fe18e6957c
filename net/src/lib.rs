//! Pure protocol support for the Bitcoin peer-to-peer wire format: message
//! envelope framing, per-command payload types, the handshake/dispatch
//! state machine, and the listener contract a caller implements to react to
//! them.
//!
//! Network I/O — the socket loop, the selector/event-loop plumbing that
//! drives [`protocol::codec::Codec`] — is explicitly out of scope; this
//! crate only ever sees bytes it's handed and messages it's asked to
//! encode.

pub mod constants;
pub mod dispatch;
pub mod error;
pub mod listener;
pub mod meta_addr;
pub mod peer;
pub mod protocol;

pub use error::{NetError, PeerError};
pub use listener::MessageListener;
pub use meta_addr::PeerAddress;
pub use peer::Peer;
pub use protocol::codec::Codec;
pub use protocol::message::Message;
