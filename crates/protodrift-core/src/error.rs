//! Error types for the protodrift-core library.
//!
//! These cover loading schemas and stored messages. The scanner itself is
//! total and never fails, and the interception pipeline reports callback
//! failures as the [`tonic::Status`] the callback returned.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for protodrift operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for schema loading and message framing
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to decode or link a `FileDescriptorSet`
    #[error("failed to build descriptor pool: {0}")]
    DescriptorPool(#[from] prost_reflect::DescriptorError),

    /// The requested message type is not in the descriptor pool
    #[error("message type '{name}' not found in descriptor pool")]
    MessageNotFound {
        /// Fully-qualified name that was looked up
        name: String,
    },

    /// A stored record could not be decoded as the expected message type
    #[error("failed to decode record {index} as '{message}': {source}")]
    MessageDecode {
        /// Zero-based record index within the input
        index: usize,
        /// Fully-qualified message type name
        message: String,
        /// Underlying decode error
        #[source]
        source: prost::DecodeError,
    },

    /// Length-delimited input is truncated or malformed
    #[error("invalid record framing at offset {offset}: {details}")]
    InvalidFraming {
        /// Byte offset where the error occurred
        offset: usize,
        /// Detailed description of the issue
        details: String,
    },

    /// Failed to decode varint
    #[error("failed to decode varint at offset {offset}: buffer too small or invalid encoding")]
    VarintDecode {
        /// Byte offset where the error occurred
        offset: usize,
    },
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new message-not-found error
    pub fn message_not_found(name: impl Into<String>) -> Self {
        Self::MessageNotFound { name: name.into() }
    }

    /// Creates a new record decode error
    pub fn message_decode(
        index: usize,
        message: impl Into<String>,
        source: prost::DecodeError,
    ) -> Self {
        Self::MessageDecode {
            index,
            message: message.into(),
            source,
        }
    }

    /// Creates a new framing error
    pub fn invalid_framing(offset: usize, details: impl Into<String>) -> Self {
        Self::InvalidFraming {
            offset,
            details: details.into(),
        }
    }

    /// Creates a new varint decode error
    pub fn varint_decode(offset: usize) -> Self {
        Self::VarintDecode { offset }
    }

    /// Returns true if the error concerns a single input and processing of
    /// other inputs can continue
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::FileRead { .. }
                | Self::MessageDecode { .. }
                | Self::InvalidFraming { .. }
                | Self::VarintDecode { .. }
        )
    }
}
