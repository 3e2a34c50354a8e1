// btdiscover Source Code File
//
// Copyright 2026 btdiscover contributors. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The `api` module contains the backend-independent types of btdiscover: device identities,
//! discovery events and errors, and the [`native`] traits a platform backend implements.

pub(crate) mod bdaddr;
pub mod native;

pub use self::bdaddr::{BDAddr, ParseBDAddrError};
pub use self::native::{
    Backend, ClassicDeviceRecord, ClassicEnumerator, DeviceInterface, InquiryParams,
    InterfaceEnumeration, LeEnumerator, LocalAdapters, SystemError,
};

use bitflags::bitflags;
use std::fmt::{self, Display, Formatter};

bitflags! {
    /// The radio transports a device has been seen on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TransportSet: u8 {
        /// BR/EDR, found by inquiry or from the paired device list.
        const CLASSIC = 0x01;
        /// Bluetooth Low Energy, found in the OS device database.
        const LOW_ENERGY = 0x02;
    }
}

bitflags! {
    /// Discovery strategies a caller may request from
    /// [`DiscoveryAgent::start`](crate::discovery::DiscoveryAgent::start).
    ///
    /// An empty set means "use the default method", which is all the native backends currently
    /// offer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DiscoveryMethods: u8 {
        const CLASSIC = 0x01;
        const LOW_ENERGY = 0x02;
    }
}

/// A local Bluetooth radio.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostInfo {
    pub address: BDAddr,
    pub name: String,
}

/// The identity of a discovered remote device.
///
/// Values are immutable once built; the `with_*` methods return modified copies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceInfo {
    address: BDAddr,
    name: String,
    class_of_device: u32,
    transports: TransportSet,
    cached: bool,
}

impl DeviceInfo {
    pub fn new(
        address: BDAddr,
        name: impl Into<String>,
        class_of_device: u32,
        transports: TransportSet,
    ) -> Self {
        debug_assert!(!transports.is_empty(), "A device is seen on at least one transport");
        DeviceInfo {
            address,
            name: name.into(),
            class_of_device,
            transports,
            cached: false,
        }
    }

    pub fn with_transports(mut self, transports: TransportSet) -> Self {
        self.transports = transports;
        self
    }

    /// Marks whether the OS reported this device from its cache rather than a live radio response.
    pub fn with_cached(mut self, cached: bool) -> Self {
        self.cached = cached;
        self
    }

    pub fn address(&self) -> BDAddr {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class of Device bitfield. Always zero for devices only seen over Low Energy.
    pub fn class_of_device(&self) -> u32 {
        self.class_of_device
    }

    pub fn transports(&self) -> TransportSet {
        self.transports
    }

    pub fn is_cached(&self) -> bool {
        self.cached
    }

    /// Returns true if both values describe the same physical device, whatever else differs.
    pub fn same_address(&self, other: &DeviceInfo) -> bool {
        self.address == other.address
    }
}

impl Display for DeviceInfo {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let name = if self.name.is_empty() {
            "(unknown)"
        } else {
            &self.name
        };
        write!(f, "{} {} {:?}", self.address, name, self.transports)
    }
}

/// Where an agent is in its discovery cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DiscoveryState {
    #[default]
    Idle,
    ClassicScanning,
    LeScanning,
    /// Both transports are exhausted and the last results are being merged.
    Finishing,
    /// `stop()` was requested and the in-flight step has not returned yet.
    Canceling,
    /// A new scan was requested while a cancellation was still draining.
    Restarting,
}

/// The broad category of a [`DiscoveryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NoLocalAdapter,
    InvalidBluetoothAdapter,
    InputOutput,
}

/// Errors that terminate a discovery run. These are delivered through
/// [`DiscoveryEvent::Error`] rather than returned from the command that caused them.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("Device does not support Bluetooth")]
    NoLocalAdapter,

    #[error("Passed address {0} is not a local device")]
    InvalidAdapterAddress(BDAddr),

    #[error("Bluetooth adapter became invalid: {0}")]
    InvalidBluetoothAdapter(SystemError),

    #[error("Input/output error: {0}")]
    InputOutput(SystemError),
}

impl DiscoveryError {
    /// Maps a failed native status onto the error reported to observers.
    pub fn from_system_error(error: SystemError) -> Self {
        if error == SystemError::INVALID_HANDLE {
            DiscoveryError::InvalidBluetoothAdapter(error)
        } else {
            DiscoveryError::InputOutput(error)
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DiscoveryError::NoLocalAdapter => ErrorKind::NoLocalAdapter,
            DiscoveryError::InvalidAdapterAddress(_)
            | DiscoveryError::InvalidBluetoothAdapter(_) => ErrorKind::InvalidBluetoothAdapter,
            DiscoveryError::InputOutput(_) => ErrorKind::InputOutput,
        }
    }
}

/// The type of events emitted by a [`DiscoveryAgent`](crate::discovery::DiscoveryAgent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// A device was seen for the first time, or an existing entry gained a transport.
    DeviceDiscovered(DeviceInfo),
    /// Both transports were exhausted without error.
    Finished,
    /// A requested `stop()` took effect.
    Canceled,
    Error(DiscoveryError),
}
