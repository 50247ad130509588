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

//! Destination adapters.
//!
//! An adapter implements what subscribing and publishing mean for a
//! destination. The registry resolves the adapter through an
//! [`AdapterFactory`] after the destination and security checks passed.

mod factory;
mod simple;
mod traits;

pub use factory::{AdapterFactory, DefaultAdapterFactory};
pub use simple::SimpleServiceAdapter;
pub use traits::ServiceAdapter;
