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

//! Channel identifier types.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use uuid::Uuid;

/// A unique identifier for a channel.
///
/// Channel ids are opaque strings. They are minted by the server when a
/// client pings without an id, or supplied by a client that already holds
/// one from an earlier acknowledgement. An id never changes for the life of
/// its channel and is unique across the registry.
///
/// # Example
///
/// ```rust
/// use courier::channel::ChannelId;
///
/// let id1 = ChannelId::generate();
/// let id2 = ChannelId::generate();
/// assert_ne!(id1, id2);
///
/// // Client supplied ids are taken verbatim
/// let id3 = ChannelId::from("A1B2C3");
/// assert_eq!(id3.as_str(), "A1B2C3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    /// Mints a new random channel id.
    ///
    /// Ids are upper-case hyphenated v4 UUIDs.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string().to_uppercase())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the id and returns the underlying string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for ChannelId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ChannelId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for ChannelId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ChannelId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_channel_id_uniqueness() {
        let ids: HashSet<ChannelId> = (0..1000).map(|_| ChannelId::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_channel_id_format() {
        let id = ChannelId::generate();
        assert_eq!(id.as_str().len(), 36);
        assert_eq!(id.as_str(), id.as_str().to_uppercase());
    }

    #[test]
    fn test_channel_id_conversion() {
        let id = ChannelId::from("client-1".to_string());
        assert_eq!(id.clone().into_string(), "client-1");
        assert_eq!(id, ChannelId::from("client-1"));
    }

    #[test]
    fn test_channel_id_display() {
        let id = ChannelId::from("abc");
        assert_eq!(format!("{}", id), "abc");
    }

    #[test]
    fn test_channel_id_serde_is_transparent() {
        let id = ChannelId::from("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        let back: ChannelId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(back, id);
    }
}
