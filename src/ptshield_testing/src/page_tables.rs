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

use ptshield_common::vmem::{
    PAGE_TABLE_ENTRIES_PER_TABLE, PAGE_TABLE_SIZE, PageTableEntry, PhysAddr, TableOps, VirtAddr,
};

/// Entry flag bits, for building entries in tests
pub mod flags {
    pub const PRESENT: u64 = 1;
    pub const RW: u64 = 1 << 1;
    pub const USER: u64 = 1 << 2;
    pub const HUGE: u64 = 1 << 7;
    pub const NX: u64 = 1 << 63;
    pub const ADDR_MASK: u64 = 0x000F_FFFF_FFFF_F000;
}

type Frame = [u64; PAGE_TABLE_ENTRIES_PER_TABLE];

/// A block of fake physical memory holding a page-table hierarchy, with
/// its root table at physical address 0.
///
/// Build the tables through the `&mut self` methods, then read them either
/// through the [`TableOps`] impl (which counts entry reads) or as raw
/// memory starting at [`PhysMemory::base_addr`]. The backing storage never
/// moves once building is done.
pub struct PhysMemory {
    frames: Vec<Frame>,
    reads: Cell<usize>,
}

impl Default for PhysMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysMemory {
    pub fn new() -> Self {
        Self {
            frames: vec![[0u64; PAGE_TABLE_ENTRIES_PER_TABLE]],
            reads: Cell::new(0),
        }
    }

    /// Physical address of the root (PML4) table
    pub fn root(&self) -> PhysAddr {
        0
    }

    /// Allocate a zeroed frame and return its physical address
    pub fn alloc_frame(&mut self) -> PhysAddr {
        self.frames.push([0u64; PAGE_TABLE_ENTRIES_PER_TABLE]);
        ((self.frames.len() - 1) * PAGE_TABLE_SIZE) as PhysAddr
    }

    pub fn set_entry(&mut self, table: PhysAddr, index: usize, entry: PageTableEntry) {
        self.frames[table as usize / PAGE_TABLE_SIZE][index] = entry;
    }

    pub fn entry(&self, table: PhysAddr, index: usize) -> PageTableEntry {
        self.frames[table as usize / PAGE_TABLE_SIZE][index]
    }

    /// Return the table at `depth` (0 = PML4, 3 = PT) on the walk path
    /// of `vaddr`, allocating intermediate tables as needed
    pub fn table_on_path(&mut self, vaddr: VirtAddr, depth: usize) -> PhysAddr {
        let mut table = self.root();
        for shift in [39, 30, 21, 12].into_iter().take(depth) {
            let index = index_at(vaddr, shift);
            let entry = self.entry(table, index);
            table = if entry & flags::PRESENT != 0 {
                entry & flags::ADDR_MASK
            } else {
                let next = self.alloc_frame();
                self.set_entry(table, index, next | flags::RW | flags::PRESENT);
                next
            };
        }
        table
    }

    /// Install a 4KB leaf entry for `vaddr`
    pub fn map_4k(&mut self, vaddr: VirtAddr, pte: PageTableEntry) {
        let pt = self.table_on_path(vaddr, 3);
        self.set_entry(pt, index_at(vaddr, 12), pte);
    }

    /// Install a 2MB page directory entry for `vaddr`
    pub fn map_2m(&mut self, vaddr: VirtAddr, pde: PageTableEntry) {
        let pd = self.table_on_path(vaddr, 2);
        self.set_entry(pd, index_at(vaddr, 21), pde);
    }

    /// Install a 1GB page directory pointer entry for `vaddr`
    pub fn map_1g(&mut self, vaddr: VirtAddr, pdpte: PageTableEntry) {
        let pdpt = self.table_on_path(vaddr, 1);
        self.set_entry(pdpt, index_at(vaddr, 30), pdpte);
    }

    /// Host address at which physical address 0 is visible
    pub fn base_addr(&self) -> u64 {
        self.frames.as_ptr() as u64
    }

    /// Size of the physical memory in bytes
    pub fn len(&self) -> u64 {
        (self.frames.len() * PAGE_TABLE_SIZE) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of entries read through [`TableOps`] so far
    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    pub fn snapshot(&self) -> Vec<Frame> {
        self.frames.clone()
    }
}

fn index_at(vaddr: VirtAddr, shift: u32) -> usize {
    ((vaddr >> shift) & 0x1ff) as usize
}

impl TableOps for PhysMemory {
    type TableAddr = PhysAddr;

    fn entry_addr(addr: PhysAddr, entry_offset: u64) -> PhysAddr {
        addr + entry_offset
    }

    unsafe fn read_entry(&self, addr: PhysAddr) -> PageTableEntry {
        self.reads.set(self.reads.get() + 1);
        let frame = addr as usize / PAGE_TABLE_SIZE;
        let index = (addr as usize % PAGE_TABLE_SIZE) / 8;
        self.frames[frame][index]
    }

    fn from_phys(&self, addr: PhysAddr) -> Option<PhysAddr> {
        (addr < self.len()).then_some(addr)
    }

    fn root_table(&self) -> PhysAddr {
        self.root()
    }
}
