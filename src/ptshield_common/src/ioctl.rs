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

use crate::command::ENVELOPE_SIZE;

// Field layout of a request number, see include/uapi/asm-generic/ioctl.h
//
//  31  30 29          16 15       8 7        0
// +------+--------------+----------+----------+
// | dir  |     size     |   type   |    nr    |
// +------+--------------+----------+----------+
const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = 8;
const IOC_SIZESHIFT: u32 = 16;
const IOC_DIRSHIFT: u32 = 30;
const IOC_NRMASK: u32 = (1 << 8) - 1;

/// No data transfer
pub const IOC_NONE: u32 = 0;
/// Userspace writes, the kernel reads
pub const IOC_WRITE: u32 = 1;
/// The kernel writes, userspace reads
pub const IOC_READ: u32 = 2;

/// The device major number, also used as the request "type" field.
pub const DEVICE_MAJOR: u32 = 511;
/// The name of the character device node.
pub const DEVICE_NAME: &str = "ptshield";

/// Function number of the init command.
pub const NR_INIT: u32 = 1;

/// Build a request number the way `_IOC` does.
///
/// The fields are combined with a plain OR and are not masked to their
/// widths, so a `ty` wider than 8 bits spills into the size field.
/// Request numbers must match callers built against the C header bit for
/// bit.
pub const fn ioc(dir: u32, ty: u32, nr: u32, size: u32) -> u32 {
    (dir << IOC_DIRSHIFT) | (ty << IOC_TYPESHIFT) | (nr << IOC_NRSHIFT) | (size << IOC_SIZESHIFT)
}

/// `_IOR(ty, nr, size)`
pub const fn ior(ty: u32, nr: u32, size: u32) -> u32 {
    ioc(IOC_READ, ty, nr, size)
}

/// `_IOW(ty, nr, size)`
pub const fn iow(ty: u32, nr: u32, size: u32) -> u32 {
    ioc(IOC_WRITE, ty, nr, size)
}

/// Extract the function number of a request.
pub const fn ioc_nr(request: u32) -> u32 {
    (request >> IOC_NRSHIFT) & IOC_NRMASK
}

/// Request number of the init command: `_IOR(511, 1, envelope)`.
pub const IOCTL_INIT: u32 = ior(DEVICE_MAJOR, NR_INIT, ENVELOPE_SIZE as u32);
