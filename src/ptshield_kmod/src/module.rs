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

use alloc::string::ToString;

use log::{LevelFilter, error, info};
use ptshield_common::status::Status;
use ptshield_common::uaccess::{UserAccess, UserPtr};
use tracing::{Span, instrument};

use crate::Result;
use crate::config::ModuleConfig;
use crate::dispatch::{CommandRegister, Dispatcher};
use crate::error::PtshieldError;
use crate::protection;

/// Whether the module is able to serve requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModuleState {
    /// Not loaded yet, failed to load, or torn down
    #[default]
    Uninitialized,
    /// Initialization completed
    Ready,
}

/// The host kernel's character device table, as far as the module needs it.
pub trait DeviceRegistry {
    /// Create the device node `name` with the given major number, or with
    /// one chosen by the host kernel when `major` is `0`. Returns the major
    /// number the node was created with.
    fn register(&mut self, name: &str, major: u32) -> Result<u32>;

    /// Remove a node created by [`DeviceRegistry::register`], given the
    /// major number it returned.
    fn unregister(&mut self, name: &str, major: u32);
}

/// Everything the module owns between load and unload.
#[derive(Debug)]
pub struct ModuleContext<D: DeviceRegistry> {
    config: ModuleConfig,
    device: D,
    commands: CommandRegister,
    state: ModuleState,
    /// Major number of the live device node
    registered_major: Option<u32>,
    /// Global log level in effect before `initialize` applied ours
    previous_log_level: Option<LevelFilter>,
}

impl<D: DeviceRegistry> ModuleContext<D> {
    /// A context in the `Uninitialized` state with the built-in commands
    /// registered.
    pub fn new(config: ModuleConfig, device: D) -> Self {
        Self {
            config,
            device,
            commands: CommandRegister::with_default_commands(),
            state: ModuleState::Uninitialized,
            registered_major: None,
            previous_log_level: None,
        }
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    pub fn state(&self) -> ModuleState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ModuleState::Ready
    }

    /// The major number the device node was created with, while ready.
    pub fn registered_major(&self) -> Option<u32> {
        self.registered_major
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// The command register, while it can still be changed. Once the
    /// module is ready the register is fixed and this returns `None`.
    pub fn commands_mut(&mut self) -> Option<&mut CommandRegister> {
        match self.state {
            ModuleState::Uninitialized => Some(&mut self.commands),
            ModuleState::Ready => None,
        }
    }

    /// Bring the module up. Calling this on a ready module does nothing.
    #[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
    pub fn initialize(&mut self) -> Result<Status> {
        if self.is_ready() {
            return Ok(Status::Success);
        }

        let protections = self.config.protections();
        protection::enable(protections)?;

        let name = self.config.device_name();
        let major = self.config.major();
        let major = match self.device.register(name, major) {
            Ok(major) => major,
            Err(e) => {
                error!("Failed to register device {} (major {}): {}", name, major, e);
                protection::disable(protections);
                return Err(match e {
                    PtshieldError::DeviceRegistration(_) => e,
                    other => PtshieldError::DeviceRegistration(other.to_string()),
                });
            }
        };
        self.registered_major = Some(major);

        self.previous_log_level = Some(log::max_level());
        log::set_max_level(self.config.log_filter().into());

        self.state = ModuleState::Ready;
        info!("Module initialized, device {} major {}", name, major);
        Ok(Status::Success)
    }

    /// Release everything `initialize` acquired, in reverse order.
    /// Calling this on an uninitialized module does nothing.
    pub fn shutdown(&mut self) {
        if !self.is_ready() {
            return;
        }
        info!("Module shutting down");
        if let Some(level) = self.previous_log_level.take() {
            log::set_max_level(level);
        }
        if let Some(major) = self.registered_major.take() {
            self.device.unregister(self.config.device_name(), major);
        }
        protection::disable(self.config.protections());
        self.state = ModuleState::Uninitialized;
    }

    pub fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher::new(&self.commands, self.config.unknown_command_policy())
    }

    /// Serve one request on the command channel, returning the value the
    /// device glue hands back to the caller.
    pub fn ioctl<U: UserAccess + ?Sized>(&self, user: &U, code: u32, arg: u64) -> i64 {
        let status = if self.is_ready() {
            self.dispatcher().handle(user, code, UserPtr::new(arg))
        } else {
            PtshieldError::ModuleNotReady.status()
        };
        status.into()
    }
}
