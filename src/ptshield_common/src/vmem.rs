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

// The walker only interprets amd64-format entries handed to it through
// `TableOps`, so it builds (and is tested) on any host architecture.
#[path = "arch/amd64/vmem.rs"]
mod arch;

pub use arch::{
    HUGE_PAGE_SIZE, PAGE_SIZE, PAGE_TABLE_SIZE, PageTableEntry, PhysAddr, TranslationResult,
    VirtAddr,
};
pub const PAGE_TABLE_ENTRIES_PER_TABLE: usize =
    PAGE_TABLE_SIZE / core::mem::size_of::<PageTableEntry>();

/// The operations used to read the page table structures of an address
/// space, so that the same walker serves the live tables of the current
/// process and in-memory tables in tests.
pub trait TableOps {
    /// The type of table addresses
    type TableAddr: Copy;

    /// Offset the table address by the u64 entry offset
    fn entry_addr(addr: Self::TableAddr, entry_offset: u64) -> Self::TableAddr;

    /// Read a u64 from the given address, used to read existing page
    /// table entries
    ///
    /// # Safety
    /// This reads from the given memory address, and so all the usual
    /// Rust things about raw pointers apply. The tables may be modified
    /// concurrently by the process that owns them; the implementor must
    /// perform the read as a single 8-byte load so that a torn entry is
    /// never observed.
    unsafe fn read_entry(&self, addr: Self::TableAddr) -> PageTableEntry;

    /// Convert a concrete u64 which was read from a table back into an
    /// abstract table address.
    ///
    /// Returns `None` if the table at `addr` cannot be reached, in which
    /// case the walk treats the address as unmapped.
    fn from_phys(&self, addr: PhysAddr) -> Option<Self::TableAddr>;

    /// Return the address of the root page table of the calling context
    fn root_table(&self) -> Self::TableAddr;
}

/// The access rights granted by a leaf entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicMapping {
    pub readable: bool,
    pub writable: bool,
    pub executable: bool,
    pub user: bool,
}

/// Resolve `address` to the entry that maps it.
///
/// Walks at most four levels and never writes to a table. An unmapped
/// address is reported as [`TranslationResult::Invalid`], which is a
/// normal outcome rather than an error.
///
/// # Safety
/// This function traverses page table data structures through
/// [`TableOps::read_entry`], whose requirements apply. It takes no
/// locks: if the tables are modified while the walk is in progress, the
/// result may already be stale when it is returned.
pub use arch::resolve;

/// Whether `address` is backed by a present mapping, i.e. [`resolve`]
/// does not return [`TranslationResult::Invalid`].
///
/// # Safety
/// As for [`resolve`].
pub unsafe fn mapping_exists<Op: TableOps>(op: &Op, address: VirtAddr) -> bool {
    unsafe { resolve(op, address) }.is_valid()
}
