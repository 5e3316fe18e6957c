//! Wire-level types: command names, message payloads, and the small
//! newtypes shared across them.

pub mod codec;
pub mod command;
pub mod message;
pub mod types;
