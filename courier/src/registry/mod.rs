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

//! The engine root.
//!
//! The [`Registry`] owns every channel, interprets protocol commands and
//! evicts idle channels. Transport bindings talk to it through
//! [`Registry::dispatch`] and [`Registry::touch`].

mod dispatch;
mod error;
mod evictor;
#[allow(clippy::module_inception)]
mod registry;

#[cfg(test)]
mod tests;

pub use error::RegistryError;
pub use registry::{
    ChannelIdGenerator, MAX_CHANNEL_CREATION_ATTEMPTS, Registry, RegistryBuilder, RegistryStats,
};
