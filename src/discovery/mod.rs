// btdiscover Source Code File
//
// Copyright 2026 btdiscover contributors. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The discovery agent and the drivers it runs.
//!
//! A scan walks the classic device search one step at a time, then reads the Low Energy devices
//! in one pass, folding everything into a single list keyed by address:
//!
//! ```text
//! Idle --start--> ClassicScanning --exhausted--> LeScanning --exhausted--> Finishing --> Idle
//!                      |  ^                          |
//!                      +--+ found: merge, next step  +--> error --> Idle
//! ```
//!
//! `stop()` and a `start()` issued while a scan runs only set flags; they take effect when
//! the in-flight step returns.

mod agent;
pub mod cache;
mod classic;
mod internal;
pub mod le;
#[cfg(test)]
mod tests;

pub use self::agent::DiscoveryAgent;
pub use self::cache::{LeAddressCache, LeDeviceEntry};
pub use self::le::{parse_device_address, LE_DEVICE_INTERFACE_CLASS};

use crate::api::{BDAddr, InquiryParams};
use uuid::Uuid;

/// Settings for a [`DiscoveryAgent`].
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Local radio to scan with. `start()` fails when no local adapter has this address.
    /// `None` accepts any adapter.
    pub adapter_address: Option<BDAddr>,
    pub inquiry: InquiryParams,
    /// Device interface class enumerated for Low Energy devices.
    pub le_interface_class: Uuid,
    /// How many undelivered events a subscriber may fall behind by before it misses some.
    pub event_capacity: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        DiscoveryConfig {
            adapter_address: None,
            inquiry: InquiryParams::default(),
            le_interface_class: LE_DEVICE_INTERFACE_CLASS,
            event_capacity: 256,
        }
    }
}

impl DiscoveryConfig {
    pub fn with_adapter(mut self, address: BDAddr) -> Self {
        self.adapter_address = Some(address);
        self
    }

    pub fn with_inquiry(mut self, inquiry: InquiryParams) -> Self {
        self.inquiry = inquiry;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}
