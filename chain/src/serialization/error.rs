use std::io;

use thiserror::Error;

/// A serialization or deserialization error.
#[derive(Error, Debug)]
pub enum SerializationError {
    /// An io error that prevented (de)serialization, typically "ran out of bytes".
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// The data being deserialized was malformed.
    #[error("parse error: {0}")]
    Parse(&'static str),
}

impl SerializationError {
    /// `true` for errors that mean "the decoder ran out of input", as opposed
    /// to "the input was well-formed-length but semantically malformed".
    pub fn is_end_of_data(&self) -> bool {
        matches!(
            self,
            SerializationError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof
        )
    }
}
