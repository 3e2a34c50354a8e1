// btdiscover Source Code File
//
// Copyright 2026 btdiscover contributors. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use crate::api::{DeviceInfo, TransportSet};
use log::debug;

/// The devices found during one scan, in discovery order, with at most one entry per address.
#[derive(Debug, Default)]
pub(crate) struct DeviceList {
    devices: Vec<DeviceInfo>,
}

impl DeviceList {
    pub fn clear(&mut self) {
        self.devices.clear();
    }

    pub fn devices(&self) -> &[DeviceInfo] {
        &self.devices
    }

    /// Folds `found` into the list and returns the entry observers should be told about, if any.
    ///
    /// A device already listed under the same address is either a duplicate (same value or same
    /// transports), or the same device seen over the other transport, in which case the entry is
    /// upgraded in place to cover both. When an LE-only entry is upgraded, the incoming classic
    /// record supplies name and class of device.
    pub fn merge(&mut self, found: DeviceInfo) -> Option<DeviceInfo> {
        let Some(index) = self.devices.iter().position(|d| d.same_address(&found)) else {
            debug!("Emit: {}", found.address());
            self.devices.push(found.clone());
            return Some(found);
        };

        let existing = &self.devices[index];
        if *existing == found || existing.transports() == found.transports() {
            debug!("Duplicate: {}", found.address());
            return None;
        }

        let base = if existing.transports() == TransportSet::LOW_ENERGY {
            found.clone()
        } else {
            existing.clone()
        };
        let merged = base
            .with_transports(TransportSet::CLASSIC | TransportSet::LOW_ENERGY)
            .with_cached(found.is_cached());

        debug!("Updated: {}", merged.address());
        self.devices[index] = merged.clone();
        Some(merged)
    }
}
