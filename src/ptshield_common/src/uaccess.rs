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

use core::fmt;

/// An address supplied by the caller of the command channel.
///
/// This is only ever a number: it is never turned into a Rust pointer,
/// and the only way to get at what it references is through
/// [`UserAccess`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "fuzzing", derive(arbitrary::Arbitrary))]
pub struct UserPtr(u64);

impl UserPtr {
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    pub const fn addr(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for UserPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserPtr({:#x})", self.0)
    }
}

impl From<u64> for UserPtr {
    fn from(addr: u64) -> Self {
        Self(addr)
    }
}

/// The platform primitives for touching memory owned by the requesting
/// process, with the semantics of the Linux `access_ok` and
/// `copy_from_user`.
pub trait UserAccess {
    /// Whether `[addr, addr + len)` lies entirely in memory the caller is
    /// permitted to access. A range that wraps around the end of the
    /// address space is never accessible.
    fn access_ok(&self, addr: UserPtr, len: usize) -> bool;

    /// Copy `dst.len()` bytes starting at `src` into `dst`, stopping at
    /// the first fault.
    ///
    /// Returns the number of bytes that were *not* copied, so `0` means
    /// the copy completed. On a non-zero return the contents of `dst`
    /// are unspecified.
    fn copy_from_user(&self, dst: &mut [u8], src: UserPtr) -> usize;
}

impl<T: UserAccess + ?Sized> UserAccess for &T {
    fn access_ok(&self, addr: UserPtr, len: usize) -> bool {
        (**self).access_ok(addr, len)
    }

    fn copy_from_user(&self, dst: &mut [u8], src: UserPtr) -> usize {
        (**self).copy_from_user(dst, src)
    }
}
