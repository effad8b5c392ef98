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

use ptshield_common::ioctl::IOCTL_INIT;
use ptshield_kmod::ModuleConfig;
use ptshield_testing::simplelogger::{LOGGER, SimpleLogger};

pub mod common; // pub to disable dead_code warning
use crate::common::{USER_BASE, init_request, new_ready_module};

// Kept in its own test binary since the logger is process global
#[test]
fn init_logs_vmcall_key() {
    SimpleLogger::initialize_test_logger();
    let module = new_ready_module(ModuleConfig::default());
    LOGGER.clear_log_calls();

    let user = init_request(0xdead_beef);
    assert_eq!(module.ioctl(&user, IOCTL_INIT, USER_BASE), 0);

    let call = LOGGER
        .find_log_call(log::Level::Info, "vmcall_key=0xdeadbeef")
        .unwrap();
    assert_eq!(call.target, "ptshield_kmod::handlers");

    // an ignored unknown code is reported as a warning
    let mut config = ModuleConfig::default();
    config.set_unknown_command_policy(ptshield_kmod::UnknownCommandPolicy::Ignore);
    let module = new_ready_module(config);
    assert_eq!(module.ioctl(&user, 0xc008_ff07, USER_BASE), 0);
    assert!(
        LOGGER
            .find_log_call(log::Level::Warn, "0xc008ff07")
            .is_some()
    );
    LOGGER.clear_log_calls();
}
