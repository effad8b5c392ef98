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

use ptshield_common::command::Command;
use ptshield_kmod::{DeviceRegistry, ModuleConfig, ModuleContext, Result, new_error};
use ptshield_testing::MockUserMemory;

/// Where the caller's envelope lives in the tests
pub const USER_BASE: u64 = 0x0000_7ffd_1234_0000;

/// The major handed out when the module asks for a dynamic one
pub const DYNAMIC_MAJOR: u32 = 234;

/// Records the device nodes the module creates
#[derive(Debug, Default)]
pub struct TestRegistry {
    pub nodes: Vec<(String, u32)>,
    pub registrations: usize,
    pub busy_major: Option<u32>,
}

impl DeviceRegistry for TestRegistry {
    fn register(&mut self, name: &str, major: u32) -> Result<u32> {
        if self.busy_major == Some(major) {
            return Err(new_error!("major {} already in use", major));
        }
        let major = if major == 0 { DYNAMIC_MAJOR } else { major };
        self.registrations += 1;
        self.nodes.push((name.to_string(), major));
        Ok(major)
    }

    fn unregister(&mut self, name: &str, major: u32) {
        self.nodes.retain(|(n, m)| !(n == name && *m == major));
    }
}

pub fn new_module(config: ModuleConfig) -> ModuleContext<TestRegistry> {
    ModuleContext::new(config, TestRegistry::default())
}

pub fn new_ready_module(config: ModuleConfig) -> ModuleContext<TestRegistry> {
    let mut module = new_module(config);
    module.initialize().unwrap();
    module
}

pub fn init_request(vmcall_key: u64) -> MockUserMemory {
    MockUserMemory::with_envelope(USER_BASE, Command::Init { vmcall_key }.encode())
}
