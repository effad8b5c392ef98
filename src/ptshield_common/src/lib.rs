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
// We use Arbitrary during fuzzing, which requires std
#![cfg_attr(not(any(feature = "fuzzing", feature = "std")), no_std)]

extern crate alloc;

/// The fixed-size command envelope exchanged over the command channel,
/// and its decoded form.
///
/// The envelope is not self-describing: the command code travels out of
/// band (in the ioctl request number) and selects how the payload bytes
/// are interpreted.
pub mod command;

/// Request-number encoding for the command channel, compatible with the
/// Linux `_IOC` family of macros.
pub mod ioctl;

/// Status codes returned to the caller of the command channel.
pub mod status;

/// The boundary to memory owned by an untrusted caller.
pub mod uaccess;

/// Read-only page-table walking.
pub mod vmem;
