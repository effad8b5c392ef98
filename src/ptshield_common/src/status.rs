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

/// Linux errno values used on the command channel.
pub mod errno {
    pub const ENODEV: i32 = 19;
    pub const EINVAL: i32 = 22;
    pub const ENOTTY: i32 = 25;
    pub const ENODATA: i32 = 61;
}

/// The result of a single request, as returned from the ioctl entry
/// point. Failures are negative errno values, the kernel convention for
/// syscall returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "fuzzing", derive(arbitrary::Arbitrary))]
#[repr(i32)]
pub enum Status {
    Success = 0,
    /// The module has not been initialized, or has been torn down
    NoDevice = -errno::ENODEV,
    /// The command pointer does not reference memory the caller may access
    InvalidArgument = -errno::EINVAL,
    /// The command code is not one this module handles
    UnsupportedCommand = -errno::ENOTTY,
    /// The envelope could not be copied in full
    NoData = -errno::ENODATA,
}

impl Status {
    pub const fn is_success(self) -> bool {
        matches!(self, Status::Success)
    }

    /// The raw value handed back to the caller.
    pub const fn as_raw(self) -> i32 {
        self as i32
    }
}

impl From<Status> for i64 {
    fn from(status: Status) -> Self {
        status.as_raw() as i64
    }
}

impl TryFrom<i64> for Status {
    type Error = ();

    fn try_from(value: i64) -> Result<Self, <Status as TryFrom<i64>>::Error> {
        match value {
            0 => Ok(Status::Success),
            v if v == -(errno::ENODEV as i64) => Ok(Status::NoDevice),
            v if v == -(errno::EINVAL as i64) => Ok(Status::InvalidArgument),
            v if v == -(errno::ENOTTY as i64) => Ok(Status::UnsupportedCommand),
            v if v == -(errno::ENODATA as i64) => Ok(Status::NoData),
            _ => Err(()),
        }
    }
}
