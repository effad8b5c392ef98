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

use alloc::collections::BTreeMap;

use log::warn;
use ptshield_common::command::{Command, CommandCode};
use ptshield_common::status::Status;
use ptshield_common::uaccess::{UserAccess, UserPtr};
use tracing::{Span, instrument};

use crate::Result;
use crate::config::UnknownCommandPolicy;
use crate::error::PtshieldError;
use crate::handlers;
use crate::uaccess::copy_envelope;

/// The signature every command handler has
pub type CommandFn = fn(&Command) -> Result<()>;

/// A command the dispatcher knows how to route
#[derive(Debug, Clone, Copy)]
pub struct CommandDefinition {
    pub name: &'static str,
    pub code: CommandCode,
    pub handler: CommandFn,
}

/// The table mapping command codes to handlers
#[derive(Debug, Clone, Default)]
pub struct CommandRegister {
    commands: BTreeMap<CommandCode, CommandDefinition>,
}

impl CommandRegister {
    /// An empty register; every request is an unknown command.
    pub fn new() -> Self {
        Self::default()
    }

    /// The register with every built-in command installed.
    pub fn with_default_commands() -> Self {
        let mut register = Self::new();
        register.register(CommandDefinition {
            name: CommandCode::Init.name(),
            code: CommandCode::Init,
            handler: handlers::init,
        });
        register
    }

    /// Install `definition`, returning whatever it replaced.
    pub fn register(&mut self, definition: CommandDefinition) -> Option<CommandDefinition> {
        self.commands.insert(definition.code, definition)
    }

    pub fn get(&self, code: CommandCode) -> Option<&CommandDefinition> {
        self.commands.get(&code)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Routes one request on the command channel
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'a> {
    register: &'a CommandRegister,
    policy: UnknownCommandPolicy,
}

impl<'a> Dispatcher<'a> {
    pub fn new(register: &'a CommandRegister, policy: UnknownCommandPolicy) -> Self {
        Self { register, policy }
    }

    /// Copy the envelope at `arg` and run the handler selected by `code`.
    ///
    /// The envelope is copied before the code is looked at, so a bad
    /// pointer is reported even for an unknown code. Returns the command
    /// that was handled, or `None` when an unknown code was ignored.
    #[instrument(err(Debug), skip(self, user), parent = Span::current(), level = "Trace")]
    pub fn dispatch<U: UserAccess + ?Sized>(
        &self,
        user: &U,
        code: u32,
        arg: UserPtr,
    ) -> Result<Option<Command>> {
        let envelope = copy_envelope(user, arg)?;

        let definition = CommandCode::try_from(code)
            .ok()
            .and_then(|code| self.register.get(code));
        let Some(definition) = definition else {
            return match self.policy {
                UnknownCommandPolicy::Reject => Err(PtshieldError::UnsupportedCommand(code)),
                UnknownCommandPolicy::Ignore => {
                    warn!("Ignoring unknown command code {:#x}", code);
                    Ok(None)
                }
            };
        };

        let command = Command::decode(definition.code, &envelope);
        (definition.handler)(&command)?;
        Ok(Some(command))
    }

    /// Like [`Dispatcher::dispatch`] but reduced to the status the caller
    /// of the channel sees.
    pub fn handle<U: UserAccess + ?Sized>(&self, user: &U, code: u32, arg: UserPtr) -> Status {
        match self.dispatch(user, code, arg) {
            Ok(_) => Status::Success,
            Err(e) => e.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use ptshield_common::ioctl::IOCTL_INIT;
    use ptshield_testing::MockUserMemory;

    use super::*;
    use crate::new_error;

    const USER_BASE: u64 = 0x4000_1000;
    const UNKNOWN_CODE: u32 = 0x8009_ff02;

    fn init_memory(vmcall_key: u64) -> MockUserMemory {
        MockUserMemory::with_envelope(USER_BASE, Command::Init { vmcall_key }.encode())
    }

    fn failing_handler(_: &Command) -> Result<()> {
        Err(new_error!("handler failed"))
    }

    #[test]
    fn test_default_commands() {
        let register = CommandRegister::with_default_commands();
        assert_eq!(register.len(), 1);
        let init = register.get(CommandCode::Init).unwrap();
        assert_eq!(init.name, "init");
        assert_eq!(init.code.request(), IOCTL_INIT);
        assert!(CommandRegister::new().is_empty());
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut register = CommandRegister::with_default_commands();
        let previous = register.register(CommandDefinition {
            name: "init",
            code: CommandCode::Init,
            handler: failing_handler,
        });
        assert!(previous.is_some());
        assert_eq!(register.len(), 1);
    }

    #[test]
    fn test_dispatch_init() {
        let register = CommandRegister::with_default_commands();
        let dispatcher = Dispatcher::new(&register, UnknownCommandPolicy::Reject);
        let user = init_memory(0xdead_beef);

        let handled = dispatcher.dispatch(&user, IOCTL_INIT, user.base()).unwrap();
        assert_eq!(
            handled,
            Some(Command::Init {
                vmcall_key: 0xdead_beef
            })
        );
        assert_eq!(dispatcher.handle(&user, IOCTL_INIT, user.base()), Status::Success);
    }

    #[test]
    fn test_bad_pointer_wins_over_unknown_code() {
        let register = CommandRegister::with_default_commands();
        let dispatcher = Dispatcher::new(&register, UnknownCommandPolicy::Reject);
        let user = init_memory(1);

        assert_eq!(
            dispatcher.handle(&user, UNKNOWN_CODE, UserPtr::new(0)),
            Status::InvalidArgument
        );
        assert_eq!(user.copy_calls(), 0);
    }

    #[test]
    fn test_partial_copy_does_not_reach_handler() {
        let register = CommandRegister::with_default_commands();
        let dispatcher = Dispatcher::new(&register, UnknownCommandPolicy::Reject);
        let user = MockUserMemory::new(USER_BASE, vec![0xff; 8]).fault_at(USER_BASE + 6);

        assert_eq!(
            dispatcher.dispatch(&user, IOCTL_INIT, user.base()),
            Err(PtshieldError::NoData(USER_BASE, 8, 2))
        );
        assert_eq!(dispatcher.handle(&user, IOCTL_INIT, user.base()), Status::NoData);
    }

    #[test]
    fn test_unknown_command_policy() {
        let register = CommandRegister::with_default_commands();
        let user = init_memory(1);

        let reject = Dispatcher::new(&register, UnknownCommandPolicy::Reject);
        assert_eq!(
            reject.dispatch(&user, UNKNOWN_CODE, user.base()),
            Err(PtshieldError::UnsupportedCommand(UNKNOWN_CODE))
        );
        assert_eq!(
            reject.handle(&user, UNKNOWN_CODE, user.base()),
            Status::UnsupportedCommand
        );

        let ignore = Dispatcher::new(&register, UnknownCommandPolicy::Ignore);
        assert_eq!(ignore.dispatch(&user, UNKNOWN_CODE, user.base()), Ok(None));
        assert_eq!(ignore.handle(&user, UNKNOWN_CODE, user.base()), Status::Success);
    }

    #[test]
    fn test_known_code_without_handler_is_unknown() {
        let register = CommandRegister::new();
        let dispatcher = Dispatcher::new(&register, UnknownCommandPolicy::Reject);
        let user = init_memory(1);

        assert_eq!(
            dispatcher.handle(&user, IOCTL_INIT, user.base()),
            Status::UnsupportedCommand
        );
    }

    #[test]
    fn test_handler_error_is_reported() {
        let mut register = CommandRegister::new();
        register.register(CommandDefinition {
            name: "init",
            code: CommandCode::Init,
            handler: failing_handler,
        });
        let dispatcher = Dispatcher::new(&register, UnknownCommandPolicy::Reject);
        let user = init_memory(1);

        assert_eq!(
            dispatcher.handle(&user, IOCTL_INIT, user.base()),
            Status::NoDevice
        );
    }
}
