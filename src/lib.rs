// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Asset Cache - Reference-counted, single-flight asynchronous asset loading
//!
//! Handles on the same key share one load and one decoded copy of the data.
//! The load is cancelled when the last handle lets go.

pub mod assets;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod event;
pub mod prelude;
pub mod profiling;
pub mod watchable;

pub use assets::*;
pub use config::*;
pub use descriptor::*;
pub use error::*;
pub use event::*;
pub use watchable::*;
