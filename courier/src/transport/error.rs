//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Transport layer error types.
//!
//! Transport errors are the lowest level of the error hierarchy. The engine
//! never propagates them to clients: a failed delivery is recovered by the
//! channel (requeued or dropped, depending on configuration) and the
//! delivery context that failed is considered consumed.

use crate::serialization::SerializationError;
use std::io;
use thiserror::Error;

/// Errors raised while writing a batch through a delivery context.
///
/// # Examples
///
/// ```rust
/// use courier::transport::TransportError;
/// use std::io;
///
/// let error = TransportError::WriteFailed {
///     source: io::Error::new(io::ErrorKind::BrokenPipe, "client went away"),
/// };
/// assert!(error.is_connection_error());
/// ```
#[derive(Debug, Error)]
pub enum TransportError {
    /// The client connection was lost before or during the write.
    #[error("connection lost: {reason}")]
    ConnectionLost {
        /// Description of why the connection was lost
        reason: String,
        /// The underlying I/O error, if available
        #[source]
        source: Option<io::Error>,
    },

    /// Writing the encoded batch failed.
    #[error("write failed: {source}")]
    WriteFailed {
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The batch could not be encoded.
    #[error("could not encode batch: {0}")]
    Serialization(#[from] SerializationError),

    /// The delivery context was already completed or detached.
    #[error("delivery context is closed")]
    Closed,
}

impl TransportError {
    /// Returns true if the client may succeed by reconnecting.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionLost { .. } | Self::WriteFailed { .. } | Self::Closed
        )
    }

    /// Returns true if the error comes from the client connection.
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionLost { .. } | Self::WriteFailed { .. } | Self::Closed
        )
    }
}

impl From<io::Error> for TransportError {
    fn from(source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof => Self::ConnectionLost {
                reason: source.to_string(),
                source: Some(source),
            },
            _ => Self::WriteFailed { source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let error: TransportError = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(error, TransportError::ConnectionLost { .. }));

        let error: TransportError = io::Error::other("disk").into();
        assert!(matches!(error, TransportError::WriteFailed { .. }));
    }

    #[test]
    fn test_classification() {
        assert!(TransportError::Closed.is_connection_error());
        let serialization = TransportError::from(SerializationError::new("bad"));
        assert!(!serialization.is_recoverable());
        assert!(!serialization.is_connection_error());
    }
}
