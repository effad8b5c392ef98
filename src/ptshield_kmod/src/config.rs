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

use core::cmp::min;

use ptshield_common::ioctl::{DEVICE_MAJOR, DEVICE_NAME};

use crate::logging::ModuleLogFilter;
use crate::protection::ProtectionSet;

/// What the dispatcher does with a request whose code it does not handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownCommandPolicy {
    /// Fail the request with `UnsupportedCommand`
    #[default]
    Reject,
    /// Log the request and report success without doing anything
    Ignore,
}

/// The complete set of configuration needed to create a module context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleConfig {
    /// Name of the character device node
    device_name: &'static str,
    /// Major number of the character device node. `0` asks the host
    /// kernel to allocate one.
    major: u32,
    unknown_command_policy: UnknownCommandPolicy,
    /// Maximum level of messages forwarded to the kernel log
    log_filter: ModuleLogFilter,
    protections: ProtectionSet,
}

impl ModuleConfig {
    /// The default device node name
    pub const DEFAULT_DEVICE_NAME: &'static str = DEVICE_NAME;
    /// The default major number
    pub const DEFAULT_MAJOR: u32 = DEVICE_MAJOR;
    /// The largest major number a character device can have
    pub const MAX_MAJOR: u32 = (1 << 12) - 1;
    /// The default log filter
    pub const DEFAULT_LOG_FILTER: ModuleLogFilter = ModuleLogFilter::Info;

    /// Create a configuration with every setting at its default
    pub const fn new() -> Self {
        Self {
            device_name: Self::DEFAULT_DEVICE_NAME,
            major: Self::DEFAULT_MAJOR,
            unknown_command_policy: UnknownCommandPolicy::Reject,
            log_filter: Self::DEFAULT_LOG_FILTER,
            protections: ProtectionSet::none(),
        }
    }

    pub fn device_name(&self) -> &'static str {
        self.device_name
    }

    pub fn set_device_name(&mut self, device_name: &'static str) {
        self.device_name = device_name;
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    /// Set the major number, clamped to [`Self::MAX_MAJOR`]
    pub fn set_major(&mut self, major: u32) {
        if major > Self::MAX_MAJOR {
            log::warn!(
                "major {} out of range, clamping to {}",
                major,
                Self::MAX_MAJOR
            );
        }
        self.major = min(major, Self::MAX_MAJOR);
    }

    pub fn unknown_command_policy(&self) -> UnknownCommandPolicy {
        self.unknown_command_policy
    }

    pub fn set_unknown_command_policy(&mut self, policy: UnknownCommandPolicy) {
        self.unknown_command_policy = policy;
    }

    pub fn log_filter(&self) -> ModuleLogFilter {
        self.log_filter
    }

    pub fn set_log_filter(&mut self, log_filter: ModuleLogFilter) {
        self.log_filter = log_filter;
    }

    pub fn protections(&self) -> ProtectionSet {
        self.protections
    }

    pub fn set_protections(&mut self, protections: ProtectionSet) {
        self.protections = protections;
    }
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self::new()
    }
}
