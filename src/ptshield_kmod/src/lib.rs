/*
Copyright 2025 The Ptshield Authors.

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

#![cfg_attr(not(any(test, debug_assertions)), warn(clippy::panic))]
#![cfg_attr(not(any(test, debug_assertions)), warn(clippy::expect_used))]
#![cfg_attr(not(any(test, debug_assertions)), warn(clippy::unwrap_used))]
#![cfg_attr(not(feature = "fuzzing"), no_std)]

extern crate alloc;

/// Configuration of the module, fixed when the module context is created.
pub mod config;
/// Routing of command channel requests to their handlers.
pub mod dispatch;
/// Error types used throughout the module.
pub mod error;
/// The handlers for each command.
pub(crate) mod handlers;
/// Forwarding of `log` records to the kernel log.
pub mod logging;
/// The module context and its lifecycle.
pub mod module;
/// Page-table resolution for the live address space.
pub mod paging;
/// Memory protection extension points.
pub mod protection;
/// Validated copies out of caller memory.
pub mod uaccess;

pub use config::{ModuleConfig, UnknownCommandPolicy};
pub use dispatch::{CommandDefinition, CommandFn, CommandRegister, Dispatcher};
pub use error::PtshieldError;
pub use module::{DeviceRegistry, ModuleContext, ModuleState};
pub use ptshield_common::command::{Command, CommandCode};
pub use ptshield_common::status::Status;

/// The universal `Result` type used throughout the module
pub type Result<T> = core::result::Result<T, error::PtshieldError>;

#[doc(hidden)]
pub mod __private {
    pub use alloc::format;
    pub use alloc::string::String;
}
