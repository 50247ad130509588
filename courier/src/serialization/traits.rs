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

//! Codec trait definition.

use crate::message::Message;
use crate::serialization::{DeserializationError, SerializationError};

/// Converts ordered batches of messages to and from bytes.
///
/// A batch is encoded as one unit so a transport writes it with a single
/// I/O call. Implementations must preserve batch order.
///
/// The trait is object safe so transports may hold a
/// `Arc<dyn Serializer>` chosen at runtime.
///
/// # Examples
///
/// ```rust
/// use courier::message::Message;
/// use courier::serialization::{JsonSerializer, Serializer};
/// use serde_json::json;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let serializer = JsonSerializer::default();
/// let batch = vec![Message::publish("news", json!("a")), Message::publish("news", json!("b"))];
///
/// let bytes = serializer.encode_batch(&batch)?;
/// let decoded = serializer.decode_batch(&bytes)?;
/// assert_eq!(decoded, batch);
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub trait Serializer: Send + Sync + 'static {
    /// Encodes a batch of messages.
    ///
    /// # Errors
    ///
    /// Returns a [`SerializationError`] if any message cannot be encoded.
    fn encode_batch(&self, batch: &[Message]) -> Result<Vec<u8>, SerializationError>;

    /// Decodes a batch of messages.
    ///
    /// # Errors
    ///
    /// Returns a [`DeserializationError`] if the bytes are not a valid batch.
    fn decode_batch(&self, bytes: &[u8]) -> Result<Vec<Message>, DeserializationError>;

    /// Returns the codec name, for logs.
    fn name(&self) -> &'static str;
}
