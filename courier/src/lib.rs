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

#![doc = include_str!("../../README.md")]
#![allow(clippy::module_inception)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! ## Architecture
//!
//! The engine is organized in layers:
//!
//! - **[`channel`]**: per-client channels with their outbound and inbound
//!   queues and subscriptions
//! - **[`scheduler`]**: the bounded worker pool running delivery passes
//! - **[`transport`]**: delivery contexts of long-poll and streaming clients
//! - **[`registry`]**: the channel map, command dispatch and idle eviction
//! - **[`adapter`]**, **[`security`]**, **[`clustering`]**: pluggable
//!   collaborators consulted by dispatch
//!
//! ## Error Handling
//!
//! - [`TransportError`]: delivery context I/O
//! - [`ChannelError`]: full queues and scheduling failures
//! - [`RegistryError`]: lifecycle and channel creation
//! - [`CourierError`]: all of the above
//!
//! Protocol failures (unknown clients, unknown destinations, denied access)
//! are answered with error replies, never returned as errors.
//!
//! ## Features
//!
//! - **`observability`** (default): `tracing` spans and events
//!
//! ## Safety
//!
//! The crate is written in safe Rust with `#![deny(unsafe_code)]`.

pub mod adapter;
pub mod channel;
pub mod clustering;
pub mod config;
pub mod context;
pub mod data;
pub mod destination;
pub mod error;
pub mod interceptor;
pub mod message;
pub mod registry;
pub mod scheduler;
pub mod security;
pub mod serialization;
pub mod transport;

pub use channel::{Channel, ChannelError, ChannelId};
pub use config::{EngineConfig, PoolConfig};
pub use context::RequestContext;
pub use error::CourierError;
pub use message::{Fault, Message};
pub use registry::{Registry, RegistryBuilder, RegistryError};
pub use transport::TransportError;
