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

//! Codec boundary between protocol messages and transport bytes.
//!
//! The engine never looks at encoded bytes. Transports hold a [`Serializer`]
//! and use it to turn a drained batch of messages into whatever their wire
//! expects, and to decode batches a client hands in.

mod error;
mod json;
mod traits;

pub use error::{DeserializationError, SerializationError};
pub use json::JsonSerializer;
pub use traits::Serializer;
