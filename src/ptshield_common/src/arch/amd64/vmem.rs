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

//! x86-64 4-level page table walking.
//!
//! - PML4 (Page Map Level 4) - bits 47:39 - 512 entries, each covering 512GB
//! - PDPT (Page Directory Pointer Table) - bits 38:30 - 512 entries, each covering 1GB
//! - PD (Page Directory) - bits 29:21 - 512 entries, each covering 2MB
//! - PT (Page Table) - bits 20:12 - 512 entries, each covering 4KB pages
//!
//! A PD entry with the PS bit set maps a 2MB page directly and has no PT
//! below it; its address bits name the physical page, not a table.

use crate::vmem::{BasicMapping, TableOps};

// Paging Flags
//
// * Intel® 64 and IA-32 Architectures Software Developer’s Manual, Volume 3A: System Programming Guide, Part 1
//  - Chapter 5 "Paging"
//
// https://cdrdv2.intel.com/v1/dl/getContent/671200
//
// * AMD64 Architecture Programmer’s Manual, Volume 2: System Programming, Section 5.3: Long-Mode Page Translation
//
// https://docs.amd.com/v/u/en-US/24593_3.43

/// Page is Present
const PAGE_PRESENT: u64 = 1;
/// Page is Read/Write
const PAGE_RW: u64 = 1 << 1;
/// Page is accessible from user mode
const PAGE_USER: u64 = 1 << 2;
/// Page Size: in a PDPT or PD entry, the entry maps a 1GB or 2MB page
const PAGE_HUGE: u64 = 1 << 7;
/// Execute Disable (if this bit is set then data in the page cannot be executed)
const PAGE_NX: u64 = 1 << 63;
/// Mask to extract the physical address from a PTE (bits 51:12)
/// This masks out the lower 12 flag bits AND the upper bits including NX (bit 63)
const PTE_ADDR_MASK: u64 = 0x000F_FFFF_FFFF_F000;
/// Mask to extract the physical address from a 2MB PD entry (bits 51:21).
/// Bit 12 of such an entry is the PAT bit, not an address bit.
const HUGE_PDE_ADDR_MASK: u64 = 0x000F_FFFF_FFE0_0000;

/// Read a page table entry and return it if the present bit is set
/// # Safety
/// The caller must ensure that `entry_ptr` points to a valid page table entry.
#[inline(always)]
unsafe fn read_pte_if_present<Op: TableOps>(op: &Op, entry_ptr: Op::TableAddr) -> Option<u64> {
    let pte = unsafe { op.read_entry(entry_ptr) };
    if (pte & PAGE_PRESENT) != 0 {
        Some(pte)
    } else {
        None
    }
}

/// Utility function to extract an (inclusive on both ends) bit range
/// from a quadword.
#[inline(always)]
fn bits<const HIGH_BIT: u8, const LOW_BIT: u8>(x: u64) -> u64 {
    (x & ((1 << (HIGH_BIT + 1)) - 1)) >> LOW_BIT
}

/// Read the entry for `vaddr` in the table at `table_base`, where
/// `HIGH_BIT` and `LOW_BIT` select this level's index bits.
///
/// # Safety
/// `table_base` must address a page table of the walked hierarchy.
#[inline(always)]
unsafe fn read_level<const HIGH_BIT: u8, const LOW_BIT: u8, Op: TableOps>(
    op: &Op,
    table_base: Op::TableAddr,
    vaddr: VirtAddr,
) -> Option<PageTableEntry> {
    // Shift left by 3 (multiply by 8) because each entry is 8 bytes (u64).
    let entry_ptr = Op::entry_addr(table_base, bits::<HIGH_BIT, LOW_BIT>(vaddr) << 3);
    unsafe { read_pte_if_present(op, entry_ptr) }
}

/// The table a present, non-leaf entry points to.
#[inline(always)]
fn next_table<Op: TableOps>(op: &Op, pte: PageTableEntry) -> Option<Op::TableAddr> {
    op.from_phys(pte & PTE_ADDR_MASK)
}

/// The entry that maps a virtual address, as found by [`resolve`]. The
/// entry is a copy taken during the walk, not a reference into the live
/// table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationResult {
    /// No present mapping exists at some level of the walk
    Invalid,
    /// A present 4KB page table entry
    LeafPte(PageTableEntry),
    /// A present page directory entry mapping a 2MB page
    LeafPmd(PageTableEntry),
}

impl TranslationResult {
    pub const fn is_valid(&self) -> bool {
        !matches!(self, TranslationResult::Invalid)
    }

    /// The raw leaf entry, if any.
    pub const fn entry(&self) -> Option<PageTableEntry> {
        match self {
            TranslationResult::Invalid => None,
            TranslationResult::LeafPte(pte) | TranslationResult::LeafPmd(pte) => Some(*pte),
        }
    }

    /// Size of the page mapped by the leaf entry.
    pub const fn page_size(&self) -> Option<u64> {
        match self {
            TranslationResult::Invalid => None,
            TranslationResult::LeafPte(_) => Some(PAGE_SIZE as u64),
            TranslationResult::LeafPmd(_) => Some(HUGE_PAGE_SIZE as u64),
        }
    }

    /// The physical address backing `vaddr`, which must be the address
    /// this result was resolved for (only its in-page offset is used).
    pub const fn phys_addr(&self, vaddr: VirtAddr) -> Option<PhysAddr> {
        match self {
            TranslationResult::Invalid => None,
            TranslationResult::LeafPte(pte) => {
                Some((*pte & PTE_ADDR_MASK) | (vaddr & (PAGE_SIZE as u64 - 1)))
            }
            TranslationResult::LeafPmd(pde) => {
                Some((*pde & HUGE_PDE_ADDR_MASK) | (vaddr & (HUGE_PAGE_SIZE as u64 - 1)))
            }
        }
    }

    /// The access rights of the leaf entry alone. The effective rights
    /// are further restricted by the entries above it.
    pub const fn permissions(&self) -> Option<BasicMapping> {
        match self.entry() {
            None => None,
            Some(pte) => Some(BasicMapping {
                // there is no separate "readable" bit on x86-64
                readable: true,
                writable: (pte & PAGE_RW) != 0,
                executable: (pte & PAGE_NX) == 0,
                user: (pte & PAGE_USER) != 0,
            }),
        }
    }
}

// There are no notable architecture-specific safety considerations
// here, and the general conditions are documented in the
// architecture-independent re-export in vmem.rs

/// Walks PML4 → PDPT → PD → PT for a single address:
/// 1. PML4 (47:39) - stop if not present
/// 2. PDPT (38:30) - stop if not present, or if it maps a 1GB page
/// 3. PD (29:21) - stop if not present; a 2MB page is the leaf
/// 4. PT (20:12) - the leaf, if present
#[allow(clippy::missing_safety_doc)]
pub unsafe fn resolve<Op: TableOps>(op: &Op, address: VirtAddr) -> TranslationResult {
    unsafe { walk(op, address) }.unwrap_or(TranslationResult::Invalid)
}

unsafe fn walk<Op: TableOps>(op: &Op, address: VirtAddr) -> Option<TranslationResult> {
    let pml4e = unsafe { read_level::<47, 39, Op>(op, op.root_table(), address) }?;

    let pdpte = unsafe { read_level::<38, 30, Op>(op, next_table(op, pml4e)?, address) }?;
    // A 1GB page has no page directory below it. Its frame bits are not a
    // table address, so this is not walked any further.
    if (pdpte & PAGE_HUGE) != 0 {
        return None;
    }

    let pde = unsafe { read_level::<29, 21, Op>(op, next_table(op, pdpte)?, address) }?;
    if (pde & PAGE_HUGE) != 0 {
        return Some(TranslationResult::LeafPmd(pde));
    }

    let pte = unsafe { read_level::<20, 12, Op>(op, next_table(op, pde)?, address) }?;
    Some(TranslationResult::LeafPte(pte))
}

pub const PAGE_SIZE: usize = 4096;
pub const HUGE_PAGE_SIZE: usize = 2 * 1024 * 1024;
pub const PAGE_TABLE_SIZE: usize = 4096;
pub type PageTableEntry = u64;
pub type VirtAddr = u64;
pub type PhysAddr = u64;
