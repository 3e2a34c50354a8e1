// btdiscover Source Code File
//
// Copyright 2026 btdiscover contributors. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Traits implemented by a native discovery backend.
//!
//! Every method here may block for a long time (a classic inquiry step waits for up to
//! [`InquiryParams::inquiry_duration`]). The discovery agent only ever calls them from background
//! threads, and never runs two of them for the same agent at once.

use super::HostInfo;
use std::fmt::{self, Debug, Display, Formatter};
use std::time::Duration;
use uuid::Uuid;

/// An OS status code as returned by the native enumeration calls.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct SystemError(pub u32);

impl SystemError {
    pub const SUCCESS: SystemError = SystemError(0);
    pub const INVALID_HANDLE: SystemError = SystemError(6);
    pub const GEN_FAILURE: SystemError = SystemError(31);
    pub const INSUFFICIENT_BUFFER: SystemError = SystemError(122);
    /// The enumeration pass has no more items. Ends a pass, is never reported as a failure.
    pub const NO_MORE_ITEMS: SystemError = SystemError(259);

    pub fn code(&self) -> u32 {
        self.0
    }
}

impl Display for SystemError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let os_error = std::io::Error::from_raw_os_error(self.0 as i32);
        write!(f, "{}", os_error)
    }
}

impl Debug for SystemError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "SystemError({})", self.0)
    }
}

impl std::error::Error for SystemError {}

/// How a classic device search is issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InquiryParams {
    /// Inquiry length in units of 1.28 seconds.
    pub timeout_multiplier: u8,
    pub issue_inquiry: bool,
    pub return_authenticated: bool,
    pub return_connected: bool,
    pub return_remembered: bool,
    pub return_unknown: bool,
}

impl Default for InquiryParams {
    fn default() -> Self {
        InquiryParams {
            timeout_multiplier: 10,
            issue_inquiry: true,
            return_authenticated: true,
            return_connected: true,
            return_remembered: true,
            return_unknown: true,
        }
    }
}

impl InquiryParams {
    /// Upper bound for a single inquiry, which is also the worst-case latency of `stop()`.
    pub fn inquiry_duration(&self) -> Duration {
        Duration::from_millis(1280 * u64::from(self.timeout_multiplier))
    }
}

/// A device as reported by the classic search calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassicDeviceRecord {
    /// The 48-bit hardware address in the low bits.
    pub address: u64,
    pub name: String,
    pub class_of_device: u32,
    /// The OS already knew the device before this search.
    pub remembered: bool,
}

/// One present device interface of the Low Energy device class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInterface {
    /// OS-assigned path of the interface, which embeds the device address.
    pub system_path: String,
    /// Registry friendly name, empty when the device has none.
    pub friendly_name: String,
}

/// Everything one Low Energy interface pass produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceEnumeration {
    pub interfaces: Vec<DeviceInterface>,
    /// The status that ended the pass. [`SystemError::NO_MORE_ITEMS`] means the pass completed.
    pub status: SystemError,
}

pub trait LocalAdapters {
    /// Lists the local radios. An empty list means the machine has no usable Bluetooth.
    fn local_adapters(&self) -> Vec<HostInfo>;
}

/// Stepwise classic device search.
pub trait ClassicEnumerator {
    /// An open search. Owned by exactly one party at a time and consumed by [`close`](Self::close).
    type SearchHandle: Send + 'static;

    /// Opens a search and returns its first device. Fails with
    /// [`SystemError::NO_MORE_ITEMS`] when there is nothing to report.
    fn find_first(
        &self,
        params: &InquiryParams,
    ) -> Result<(ClassicDeviceRecord, Self::SearchHandle), SystemError>;

    /// Fetches the next device of an open search, or [`SystemError::NO_MORE_ITEMS`].
    fn find_next(&self, handle: &Self::SearchHandle) -> Result<ClassicDeviceRecord, SystemError>;

    fn close(&self, handle: Self::SearchHandle);
}

/// Batch enumeration of Low Energy device interfaces.
pub trait LeEnumerator {
    /// Runs a complete pass over the present interfaces of `interface_class`.
    fn enumerate_interfaces(&self, interface_class: &Uuid) -> InterfaceEnumeration;
}

/// Everything the discovery agent needs from a platform.
pub trait Backend: LocalAdapters + ClassicEnumerator + LeEnumerator + Send + Sync + 'static {}

impl<T> Backend for T where
    T: LocalAdapters + ClassicEnumerator + LeEnumerator + Send + Sync + 'static
{
}
