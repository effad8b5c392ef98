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

use std::cell::Cell;

use ptshield_common::command::RawEnvelope;
use ptshield_common::uaccess::{UserAccess, UserPtr};

/// A caller's address space holding one accessible window of bytes.
///
/// A fault can be injected at an address inside the window to model a
/// page that passes the range check but is not mapped when the copy
/// touches it.
pub struct MockUserMemory {
    base: u64,
    bytes: Vec<u8>,
    fault_at: Option<u64>,
    copied: Cell<usize>,
    copy_calls: Cell<usize>,
}

impl MockUserMemory {
    pub fn new(base: u64, bytes: Vec<u8>) -> Self {
        Self {
            base,
            bytes,
            fault_at: None,
            copied: Cell::new(0),
            copy_calls: Cell::new(0),
        }
    }

    /// A window holding exactly one envelope at `base`
    pub fn with_envelope(base: u64, envelope: RawEnvelope) -> Self {
        Self::new(base, envelope.as_bytes().to_vec())
    }

    /// Make every byte at or above `addr` fault when copied
    pub fn fault_at(mut self, addr: u64) -> Self {
        self.fault_at = Some(addr);
        self
    }

    pub fn base(&self) -> UserPtr {
        UserPtr::new(self.base)
    }

    /// Total bytes delivered by `copy_from_user` so far
    pub fn bytes_copied(&self) -> usize {
        self.copied.get()
    }

    pub fn copy_calls(&self) -> usize {
        self.copy_calls.get()
    }

    fn end(&self) -> u64 {
        self.base + self.bytes.len() as u64
    }
}

impl UserAccess for MockUserMemory {
    fn access_ok(&self, addr: UserPtr, len: usize) -> bool {
        match addr.addr().checked_add(len as u64) {
            Some(end) => addr.addr() >= self.base && end <= self.end(),
            None => false,
        }
    }

    fn copy_from_user(&self, dst: &mut [u8], src: UserPtr) -> usize {
        self.copy_calls.set(self.copy_calls.get() + 1);
        for (i, byte) in dst.iter_mut().enumerate() {
            let addr = src.addr().wrapping_add(i as u64);
            let faulted = self.fault_at.is_some_and(|fault| addr >= fault);
            if faulted || addr < self.base || addr >= self.end() {
                return dst.len() - i;
            }
            *byte = self.bytes[(addr - self.base) as usize];
            self.copied.set(self.copied.get() + 1);
        }
        0
    }
}
