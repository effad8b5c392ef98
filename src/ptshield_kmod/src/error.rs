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

use alloc::string::String;

use ptshield_common::status::Status;
use thiserror::Error;

use crate::protection::Protection;

/// The error type for module operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PtshieldError {
    /// The command pointer failed the accessibility check
    #[error("Command pointer {0:#x} is not accessible for {1} bytes")]
    InvalidArgument(u64, usize),

    /// The copy of the envelope faulted part way
    #[error("Copy of {1} bytes from {0:#x} faulted with {2} bytes not copied")]
    NoData(u64, usize, usize),

    /// The command code is not handled by this module
    #[error("Unsupported command code {0:#x}")]
    UnsupportedCommand(u32),

    /// A request arrived before initialization or after teardown
    #[error("Module is not initialized")]
    ModuleNotReady,

    /// The device node could not be created
    #[error("Failed to register device: {0}")]
    DeviceRegistration(String),

    /// A protection was requested that has no backend
    #[error("Protection {0:?} is not available")]
    ProtectionUnavailable(Protection),

    /// A generic error with a message
    #[error("{0}")]
    Error(String),
}

impl PtshieldError {
    /// The status reported to the caller of the command channel when a
    /// request fails with this error.
    pub fn status(&self) -> Status {
        // wildcard _ not used here purposefully to ensure that new error
        // variants are explicitly mapped to a status.
        match self {
            PtshieldError::InvalidArgument(_, _) => Status::InvalidArgument,
            PtshieldError::NoData(_, _, _) => Status::NoData,
            PtshieldError::UnsupportedCommand(_) => Status::UnsupportedCommand,
            PtshieldError::ModuleNotReady
            | PtshieldError::DeviceRegistration(_)
            | PtshieldError::ProtectionUnavailable(_)
            | PtshieldError::Error(_) => Status::NoDevice,
        }
    }
}

impl From<&PtshieldError> for Status {
    fn from(err: &PtshieldError) -> Self {
        err.status()
    }
}

/// Creates a `PtshieldError::Error` from a string literal or format string
#[macro_export]
macro_rules! new_error {
    ($msg:literal $(,)?) => {{
        let __args = core::format_args!($msg);
        let __err_msg = match __args.as_str() {
            Some(msg) => $crate::__private::String::from(msg),
            None => $crate::__private::format!($msg),
        };
        $crate::error::PtshieldError::Error(__err_msg)
    }};
    ($fmtstr:expr, $($arg:tt)*) => {{
           let __err_msg = $crate::__private::format!($fmtstr, $($arg)*);
           $crate::error::PtshieldError::Error(__err_msg)
    }};
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            PtshieldError::InvalidArgument(0, 8).status(),
            Status::InvalidArgument
        );
        assert_eq!(PtshieldError::NoData(0, 8, 3).status(), Status::NoData);
        assert_eq!(
            PtshieldError::UnsupportedCommand(7).status(),
            Status::UnsupportedCommand
        );
        assert_eq!(PtshieldError::ModuleNotReady.status(), Status::NoDevice);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            PtshieldError::InvalidArgument(0xdead_0000, 8).to_string(),
            "Command pointer 0xdead0000 is not accessible for 8 bytes"
        );
        assert_eq!(
            PtshieldError::UnsupportedCommand(0x8009_ff02).to_string(),
            "Unsupported command code 0x8009ff02"
        );
    }

    #[test]
    fn test_new_error_macro() {
        let literal = new_error!("plain message");
        assert_eq!(literal, PtshieldError::Error("plain message".to_string()));

        let formatted = new_error!("major {} busy", 511);
        assert_eq!(formatted, PtshieldError::Error("major 511 busy".to_string()));
    }
}
