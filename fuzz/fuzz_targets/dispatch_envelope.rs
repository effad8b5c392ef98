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

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use ptshield_common::command::{Command, CommandCode, RawEnvelope};
use ptshield_kmod::{
    DeviceRegistry, ModuleConfig, ModuleContext, Result, Status, UnknownCommandPolicy,
};
use ptshield_testing::MockUserMemory;

const USER_BASE: u64 = 0x7fff_0000_0000;

struct NullRegistry;

impl DeviceRegistry for NullRegistry {
    fn register(&mut self, _name: &str, major: u32) -> Result<u32> {
        Ok(major)
    }

    fn unregister(&mut self, _name: &str, _major: u32) {}
}

#[derive(Debug, Arbitrary)]
enum Code {
    Known(CommandCode),
    Raw(u32),
}

#[derive(Debug, Arbitrary)]
struct Request {
    ignore_unknown: bool,
    code: Code,
    window: Vec<u8>,
    arg_offset: i16,
    fault_offset: Option<u8>,
}

// Any request must produce one of the documented statuses, and a request
// that succeeds for init must decode exactly the bytes that were supplied.
fuzz_target!(|req: Request| {
    let mut config = ModuleConfig::default();
    if req.ignore_unknown {
        config.set_unknown_command_policy(UnknownCommandPolicy::Ignore);
    }
    let mut module = ModuleContext::new(config, NullRegistry);
    module.initialize().unwrap();

    let mut user = MockUserMemory::new(USER_BASE, req.window.clone());
    if let Some(offset) = req.fault_offset {
        user = user.fault_at(USER_BASE + u64::from(offset));
    }
    let arg = USER_BASE.wrapping_add_signed(i64::from(req.arg_offset));
    let code = match req.code {
        Code::Known(code) => code.request(),
        Code::Raw(code) => code,
    };

    let status = Status::try_from(module.ioctl(&user, code, arg)).unwrap();
    let handled = module
        .dispatcher()
        .dispatch(&user, code, arg.into());

    match handled {
        Ok(Some(command)) => {
            assert_eq!(status, Status::Success);
            let start = (arg - USER_BASE) as usize;
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&req.window[start..start + 8]);
            assert_eq!(command, Command::decode(command.code(), &RawEnvelope::from_bytes(bytes)));
        }
        Ok(None) => {
            assert!(req.ignore_unknown);
            assert_eq!(status, Status::Success);
        }
        Err(e) => assert_eq!(status, e.status()),
    }
});
