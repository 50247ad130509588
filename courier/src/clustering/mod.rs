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

//! Cross-instance channel state.
//!
//! A registry records which channels it created and what they subscribed
//! to in a [`DistributedState`]. Another registry sharing that state can
//! rebuild a channel it never saw when a client fails over to it. Every
//! call is best-effort: the registry logs failures and carries on.

mod error;
mod memory;
mod traits;

pub use error::ClusterError;
pub use memory::InMemoryDistributedState;
pub use traits::DistributedState;
