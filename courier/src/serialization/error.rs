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

//! Batch codec errors.

use thiserror::Error;

type Cause = Box<dyn std::error::Error + Send + Sync>;

/// An outbound batch could not be encoded.
#[derive(Debug, Error)]
#[error("cannot encode batch of {messages} message(s): {reason}")]
pub struct SerializationError {
    reason: String,
    messages: usize,
    #[source]
    cause: Option<Cause>,
}

impl SerializationError {
    /// Creates an error with no batch attached.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            messages: 0,
            cause: None,
        }
    }

    /// Wraps a codec failure raised while encoding `messages` messages.
    pub fn encoding(messages: usize, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            reason: cause.to_string(),
            messages,
            cause: Some(Box::new(cause)),
        }
    }

    /// Number of messages in the batch that failed.
    pub fn messages(&self) -> usize {
        self.messages
    }
}

/// Inbound bytes are not a valid batch.
#[derive(Debug, Error)]
#[error("malformed batch at line {line}, column {column}: {reason}")]
pub struct DeserializationError {
    reason: String,
    line: usize,
    column: usize,
    #[source]
    cause: Option<Cause>,
}

impl DeserializationError {
    /// Creates an error with no position.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            line: 0,
            column: 0,
            cause: None,
        }
    }

    /// Wraps a codec failure at the given position of the input.
    pub fn at(
        line: usize,
        column: usize,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            reason: cause.to_string(),
            line,
            column,
            cause: Some(Box::new(cause)),
        }
    }

    /// Line of the input where decoding stopped, 1-based. Zero when unknown.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Column of the input where decoding stopped, 1-based. Zero when unknown.
    pub fn column(&self) -> usize {
        self.column
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_plain_encoding_error_has_no_cause() {
        let error = SerializationError::new("unsupported body");
        assert_eq!(error.messages(), 0);
        assert!(error.to_string().ends_with("unsupported body"));
        assert!(error.source().is_none());
    }

    #[test]
    fn test_decoding_error_keeps_position_and_cause() {
        let error = DeserializationError::at(3, 14, std::io::Error::other("eof"));
        assert_eq!((error.line(), error.column()), (3, 14));
        assert_eq!(error.to_string(), "malformed batch at line 3, column 14: eof");
        assert!(error.source().is_some());
    }
}
