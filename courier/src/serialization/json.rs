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

//! JSON codec.

use crate::message::Message;
use crate::serialization::{DeserializationError, SerializationError, Serializer};

/// JSON codec.
///
/// Encodes a batch as a JSON array of message objects. This is the default
/// codec of the bundled transports.
///
/// # Examples
///
/// ```rust
/// use courier::serialization::{JsonSerializer, Serializer};
///
/// let serializer = JsonSerializer::new().with_pretty_print();
/// assert_eq!(serializer.name(), "json");
/// ```
#[derive(Clone, Debug, Default)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    /// Creates a codec producing compact JSON.
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Produces indented JSON.
    pub fn with_pretty_print(mut self) -> Self {
        self.pretty = true;
        self
    }
}

impl Serializer for JsonSerializer {
    fn encode_batch(&self, batch: &[Message]) -> Result<Vec<u8>, SerializationError> {
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(batch)
        } else {
            serde_json::to_vec(batch)
        };
        encoded.map_err(|e| SerializationError::encoding(batch.len(), e))
    }

    fn decode_batch(&self, bytes: &[u8]) -> Result<Vec<Message>, DeserializationError> {
        serde_json::from_slice(bytes).map_err(|e| DeserializationError::at(e.line(), e.column(), e))
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
