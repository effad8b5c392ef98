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

use anyhow::{Result, bail};

use crate::ioctl::IOCTL_INIT;

/// Size in bytes of every command envelope, whichever command it carries.
///
/// A payload that does not fit needs a new request number (and so a new
/// protocol version), not a bigger envelope.
pub const ENVELOPE_SIZE: usize = 8;

/// The closed set of commands the channel understands. The discriminant
/// is the full ioctl request number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "fuzzing", derive(arbitrary::Arbitrary))]
#[repr(u32)]
pub enum CommandCode {
    Init = IOCTL_INIT,
}

impl CommandCode {
    /// The request number carrying this command.
    pub const fn request(self) -> u32 {
        self as u32
    }

    pub const fn name(self) -> &'static str {
        match self {
            CommandCode::Init => "init",
        }
    }
}

impl TryFrom<u32> for CommandCode {
    type Error = anyhow::Error;
    fn try_from(val: u32) -> Result<Self> {
        match val {
            IOCTL_INIT => Ok(CommandCode::Init),
            _ => bail!("Invalid command code: {:#x}", val),
        }
    }
}

/// The envelope as it crosses the channel: a fixed block of bytes whose
/// meaning is selected by the out-of-band [`CommandCode`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawEnvelope {
    bytes: [u8; ENVELOPE_SIZE],
}

impl RawEnvelope {
    pub const fn zeroed() -> Self {
        Self {
            bytes: [0; ENVELOPE_SIZE],
        }
    }

    pub const fn from_bytes(bytes: [u8; ENVELOPE_SIZE]) -> Self {
        Self { bytes }
    }

    pub const fn as_bytes(&self) -> &[u8; ENVELOPE_SIZE] {
        &self.bytes
    }

    fn read_u64(&self, offset: usize) -> u64 {
        let mut field = [0u8; 8];
        field.copy_from_slice(&self.bytes[offset..offset + 8]);
        u64::from_ne_bytes(field)
    }

    fn write_u64(&mut self, offset: usize, value: u64) {
        self.bytes[offset..offset + 8].copy_from_slice(&value.to_ne_bytes());
    }
}

/// In-memory layout of the init payload, as the C side declares it.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitPayload {
    pub vmcall_key: u64,
}

const _: () = assert!(core::mem::size_of::<InitPayload>() <= ENVELOPE_SIZE);
const _: () = assert!(core::mem::size_of::<RawEnvelope>() == ENVELOPE_SIZE);

/// A decoded command. Payload fields can only be reached by matching on
/// the command, so a payload is never read as the wrong member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "fuzzing", derive(arbitrary::Arbitrary))]
pub enum Command {
    /// Hand the hypervisor-call key to the module.
    Init { vmcall_key: u64 },
}

impl Command {
    pub const fn code(&self) -> CommandCode {
        match self {
            Command::Init { .. } => CommandCode::Init,
        }
    }

    /// Lay the command out in an envelope. Bytes past the active member
    /// are zero.
    pub fn encode(&self) -> RawEnvelope {
        let mut envelope = RawEnvelope::zeroed();
        match self {
            Command::Init { vmcall_key } => {
                envelope.write_u64(core::mem::offset_of!(InitPayload, vmcall_key), *vmcall_key)
            }
        }
        envelope
    }

    /// Interpret `envelope` as the payload selected by `code`.
    pub fn decode(code: CommandCode, envelope: &RawEnvelope) -> Self {
        match code {
            CommandCode::Init => Command::Init {
                vmcall_key: envelope.read_u64(core::mem::offset_of!(InitPayload, vmcall_key)),
            },
        }
    }
}
