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

//! Hiding the module's pages behind EPT and fencing them off from device
//! DMA through the IOMMU are planned but have no backend. They can be
//! requested through [`ModuleConfig`](crate::ModuleConfig), in which case
//! initialization fails rather than run without the protection.

use tracing::{Span, instrument};

use crate::Result;
use crate::error::PtshieldError;

/// A memory protection the module can apply to itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    /// Remove the module's pages from the guest-physical view via EPT
    EptHiding,
    /// Deny device DMA into the module's pages via the IOMMU
    DmaProtection,
}

/// The protections requested for a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProtectionSet {
    pub ept_hiding: bool,
    pub dma_protection: bool,
}

impl ProtectionSet {
    pub const fn none() -> Self {
        Self {
            ept_hiding: false,
            dma_protection: false,
        }
    }

    /// The requested protections, in the order they are enabled.
    pub fn requested(&self) -> impl DoubleEndedIterator<Item = Protection> + use<> {
        [
            (self.ept_hiding, Protection::EptHiding),
            (self.dma_protection, Protection::DmaProtection),
        ]
        .into_iter()
        .filter_map(|(on, protection)| on.then_some(protection))
    }

    pub fn is_empty(&self) -> bool {
        self.requested().next().is_none()
    }
}

/// Enable every protection in `set`, in order. Fails on the first one,
/// since none has a backend yet.
#[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
pub(crate) fn enable(set: ProtectionSet) -> Result<()> {
    match set.requested().next() {
        Some(protection) => {
            log::error!("{:?} requested but no backend is available", protection);
            Err(PtshieldError::ProtectionUnavailable(protection))
        }
        None => Ok(()),
    }
}

/// Disable every protection in `set`, in reverse order.
pub(crate) fn disable(set: ProtectionSet) {
    for protection in set.requested().rev() {
        log::debug!("disabling {:?}", protection);
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    #[test]
    fn test_requested_order() {
        let set = ProtectionSet {
            ept_hiding: true,
            dma_protection: true,
        };
        assert_eq!(
            set.requested().collect::<Vec<_>>(),
            [Protection::EptHiding, Protection::DmaProtection]
        );
        assert!(ProtectionSet::none().is_empty());
        assert!(ProtectionSet::default().is_empty());
    }

    #[test]
    fn test_enable_nothing_succeeds() {
        assert!(enable(ProtectionSet::none()).is_ok());
    }

    #[test]
    fn test_enable_without_backend_fails() {
        let set = ProtectionSet {
            ept_hiding: false,
            dma_protection: true,
        };
        assert_eq!(
            enable(set),
            Err(PtshieldError::ProtectionUnavailable(
                Protection::DmaProtection
            ))
        );
    }
}
