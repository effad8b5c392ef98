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

use ptshield_common::vmem::{
    self, PAGE_TABLE_SIZE, PageTableEntry, PhysAddr, TableOps, TranslationResult, VirtAddr,
};

/// Page tables of the live address space, read through the kernel's
/// linear mapping of physical memory.
#[derive(Debug, Clone, Copy)]
pub struct DirectMap {
    /// Virtual address at which physical address 0 is mapped
    phys_offset: u64,
    /// Size of the mapped physical range; tables at or above it are
    /// treated as unreachable
    phys_limit: u64,
    root: fn() -> PhysAddr,
}

impl DirectMap {
    /// # Safety
    /// Every physical address below `phys_limit` must be readable at
    /// `phys_offset + addr` for as long as this value is used, and `root`
    /// must return the physical address of a PML4 table lying entirely
    /// below `phys_limit`.
    pub const unsafe fn new(phys_offset: u64, phys_limit: u64, root: fn() -> PhysAddr) -> Self {
        Self {
            phys_offset,
            phys_limit,
            root,
        }
    }

    /// The address space of the calling context, with its root taken from
    /// CR3 on every walk.
    ///
    /// # Safety
    /// As for [`DirectMap::new`].
    #[cfg(all(target_arch = "x86_64", target_os = "none"))]
    pub const unsafe fn current(phys_offset: u64, phys_limit: u64) -> Self {
        unsafe { Self::new(phys_offset, phys_limit, read_cr3) }
    }

    /// Resolve `address` in this address space.
    pub fn resolve(&self, address: VirtAddr) -> TranslationResult {
        // SAFETY: reads stay inside the window vouched for in `new`
        unsafe { vmem::resolve(self, address) }
    }

    pub fn mapping_exists(&self, address: VirtAddr) -> bool {
        self.resolve(address).is_valid()
    }
}

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
fn read_cr3() -> PhysAddr {
    let cr3: u64;
    unsafe {
        core::arch::asm!("mov {}, cr3", out(reg) cr3, options(nomem, nostack, preserves_flags));
    }
    // low bits hold PCID or PWT/PCD, high bits may hold the LAM/no-flush flags
    cr3 & 0x000F_FFFF_FFFF_F000
}

impl TableOps for DirectMap {
    type TableAddr = PhysAddr;

    fn entry_addr(addr: PhysAddr, entry_offset: u64) -> PhysAddr {
        addr + entry_offset
    }

    unsafe fn read_entry(&self, addr: PhysAddr) -> PageTableEntry {
        let ptr = self.phys_offset.wrapping_add(addr) as *const PageTableEntry;
        unsafe { ptr.read_volatile() }
    }

    fn from_phys(&self, addr: PhysAddr) -> Option<PhysAddr> {
        let end = addr.checked_add(PAGE_TABLE_SIZE as u64)?;
        (end <= self.phys_limit).then_some(addr)
    }

    fn root_table(&self) -> PhysAddr {
        let root = (self.root)();
        debug_assert!(
            self.from_phys(root).is_some(),
            "root table {:#x} outside the direct map",
            root
        );
        root
    }
}

/// Resolve `address` in the address space `space`.
pub fn resolve(space: &DirectMap, address: VirtAddr) -> TranslationResult {
    space.resolve(address)
}

/// Whether `address` is mapped in the address space `space`.
pub fn mapping_exists(space: &DirectMap, address: VirtAddr) -> bool {
    space.mapping_exists(address)
}

#[cfg(test)]
mod tests {
    use ptshield_testing::PhysMemory;
    use ptshield_testing::page_tables::flags;

    use super::*;

    fn direct_map(mem: &PhysMemory) -> DirectMap {
        unsafe { DirectMap::new(mem.base_addr(), mem.len(), || 0) }
    }

    #[test]
    fn test_resolve_4k_page() {
        let mut mem = PhysMemory::new();
        let pte = 0x1234_5000 | flags::RW | flags::PRESENT;
        mem.map_4k(0x7f12_3456_7000, pte);
        let space = direct_map(&mem);

        assert_eq!(space.resolve(0x7f12_3456_7abc), TranslationResult::LeafPte(pte));
        assert!(mapping_exists(&space, 0x7f12_3456_7000));
        assert!(!mapping_exists(&space, 0x7f12_3456_8000));
    }

    #[test]
    fn test_resolve_2m_page() {
        let mut mem = PhysMemory::new();
        let pde = 0x4020_0000 | flags::HUGE | flags::PRESENT;
        mem.map_2m(0xffff_8880_0020_0000, pde);
        let space = direct_map(&mem);

        assert_eq!(
            resolve(&space, 0xffff_8880_003f_ffff),
            TranslationResult::LeafPmd(pde)
        );
    }

    #[test]
    fn test_table_outside_window_is_unmapped() {
        let mut mem = PhysMemory::new();
        let pdpt = mem.alloc_frame();
        mem.set_entry(mem.root(), 1, pdpt | flags::PRESENT);
        // points one frame past the end of the memory
        mem.set_entry(pdpt, 0, mem.len() | flags::PRESENT);
        let space = direct_map(&mem);

        assert_eq!(space.resolve(1 << 39), TranslationResult::Invalid);
    }

    #[test]
    fn test_window_bounds() {
        let space = unsafe { DirectMap::new(0, 2 * PAGE_TABLE_SIZE as u64, || 0) };
        assert_eq!(space.from_phys(0x1000), Some(0x1000));
        assert_eq!(space.from_phys(0x2000), None);
        assert_eq!(space.from_phys(u64::MAX & !0xfff), None);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "outside the direct map")]
    fn test_root_outside_window() {
        let space = unsafe { DirectMap::new(0, PAGE_TABLE_SIZE as u64, || 0x1000) };
        space.root_table();
    }
}
