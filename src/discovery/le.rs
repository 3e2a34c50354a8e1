// btdiscover Source Code File
//
// Copyright 2026 btdiscover contributors. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Low Energy devices are not scanned for over the air. They are read from the OS device
//! database, one device interface per known device, and identified by the address embedded in
//! each interface's system path.

use super::cache::{LeAddressCache, LeDeviceEntry};
use crate::api::{
    BDAddr, DeviceInfo, InterfaceEnumeration, LeEnumerator, SystemError, TransportSet,
};
use log::{debug, trace};
use uuid::Uuid;

/// Interface class under which the OS publishes Bluetooth Low Energy devices.
pub const LE_DEVICE_INTERFACE_CLASS: Uuid =
    Uuid::from_u128(0x781aee18_7733_4ce4_add0_91f41c67b592);

const ADDRESS_MARKER: &str = "dev_";

/// Extracts the hardware address from a device interface path such as
/// `\\?\bthle#dev_001122334455#...`.
///
/// The address is the hex run between the first `dev_` and the following `#`. Returns `None`
/// if the marker is missing or the run is not a non-zero 48-bit hex number.
pub fn parse_device_address(system_path: &str) -> Option<BDAddr> {
    let start = system_path.find(ADDRESS_MARKER)? + ADDRESS_MARKER.len();
    let rest = &system_path[start..];
    let hex = rest.split('#').next().unwrap_or(rest);
    if hex.is_empty() || hex.len() > 12 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let address = BDAddr::from(u64::from_str_radix(hex, 16).ok()?);
    (!address.is_null()).then_some(address)
}

/// Runs one complete Low Energy pass.
///
/// Interfaces without a parsable address are skipped. When the pass completes, `cache` is
/// replaced with exactly the interfaces seen. A pass cut short by any other status leaves the
/// cache alone and returns that status.
pub(crate) fn enumerate_le_devices<E>(
    enumerator: &E,
    interface_class: &Uuid,
    cache: &LeAddressCache,
) -> Result<Vec<DeviceInfo>, SystemError>
where
    E: LeEnumerator + ?Sized,
{
    let InterfaceEnumeration { interfaces, status } =
        enumerator.enumerate_interfaces(interface_class);

    let mut devices = Vec::with_capacity(interfaces.len());
    let mut entries = Vec::with_capacity(interfaces.len());
    for interface in interfaces {
        let Some(address) = parse_device_address(&interface.system_path) else {
            trace!("Skipping LE interface without address: {}", interface.system_path);
            continue;
        };
        devices.push(
            DeviceInfo::new(address, interface.friendly_name, 0, TransportSet::LOW_ENERGY)
                .with_cached(true),
        );
        entries.push(LeDeviceEntry {
            address,
            system_path: interface.system_path,
        });
    }

    if status != SystemError::NO_MORE_ITEMS {
        debug!("LE enumeration stopped early: {}", status);
        return Err(status);
    }
    cache.replace(entries);
    Ok(devices)
}

/// Refreshes `cache` with a new pass, then looks `address` up in it.
pub(crate) fn discovered_le_device_system_path<E>(
    enumerator: &E,
    interface_class: &Uuid,
    cache: &LeAddressCache,
    address: BDAddr,
) -> Option<String>
where
    E: LeEnumerator + ?Sized,
{
    if let Err(error) = enumerate_le_devices(enumerator, interface_class, cache) {
        debug!("Looking up {} in a stale LE cache: {}", address, error);
    }
    cache.system_path(address)
}
