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

//! Transport boundary.
//!
//! The engine sees a client connection only through the traits in this
//! module. Three bindings are provided: [`LongPollTransport`] for clients
//! that park a request until there is something to deliver,
//! [`StreamingTransport`] for clients holding a connection open, and
//! [`NullTransport`] for the server's own channel.

mod error;
mod long_poll;
mod null;
mod streaming;
mod traits;

pub use error::TransportError;
pub use long_poll::{LongPollChannelFactory, LongPollTransport};
pub use null::{NullTransport, ServerChannelFactory};
pub use streaming::{StreamingChannelFactory, StreamingTransport};
pub use traits::{ChannelFactory, ChannelTransport, DeliveryContext};
