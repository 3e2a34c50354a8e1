// btdiscover Source Code File
//
// Copyright 2026 btdiscover contributors. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use super::{setupapi, utils};
use crate::api::{
    BDAddr, ClassicDeviceRecord, ClassicEnumerator, HostInfo, InquiryParams,
    InterfaceEnumeration, LeEnumerator, LocalAdapters, SystemError,
};
use log::{debug, warn};
use std::mem::size_of;
use uuid::Uuid;
use windows::Win32::Devices::Bluetooth::{
    BluetoothFindDeviceClose, BluetoothFindFirstDevice, BluetoothFindFirstRadio,
    BluetoothFindNextDevice, BluetoothFindNextRadio, BluetoothFindRadioClose,
    BluetoothGetRadioInfo, BLUETOOTH_DEVICE_INFO, BLUETOOTH_DEVICE_SEARCH_PARAMS,
    BLUETOOTH_FIND_RADIO_PARAMS, BLUETOOTH_RADIO_INFO, HBLUETOOTH_DEVICE_FIND,
};
use windows::Win32::Foundation::{CloseHandle, HANDLE};

/// An open classic device search.
#[derive(Debug)]
pub struct DeviceSearch(HBLUETOOTH_DEVICE_FIND);

// The search handle is not tied to the thread that opened it, and it is only ever used by its
// single owner.
unsafe impl Send for DeviceSearch {}

/// Discovery backend over the Win32 Bluetooth and SetupAPI calls.
#[derive(Clone, Debug, Default)]
pub struct Win32Backend {}

impl Win32Backend {
    pub fn new() -> Self {
        Win32Backend {}
    }
}

fn radio_info(radio: HANDLE) -> Option<HostInfo> {
    let mut info = BLUETOOTH_RADIO_INFO {
        dwSize: size_of::<BLUETOOTH_RADIO_INFO>() as _,
        ..Default::default()
    };
    let status = unsafe { BluetoothGetRadioInfo(radio, &mut info) };
    if status != SystemError::SUCCESS.code() {
        debug!("Skipping radio: {}", SystemError(status));
        return None;
    }
    Some(HostInfo {
        address: BDAddr::from(unsafe { info.address.Anonymous.ullLong }),
        name: utils::from_wide(&info.szName),
    })
}

impl LocalAdapters for Win32Backend {
    fn local_adapters(&self) -> Vec<HostInfo> {
        let mut adapters = Vec::new();
        let params = BLUETOOTH_FIND_RADIO_PARAMS {
            dwSize: size_of::<BLUETOOTH_FIND_RADIO_PARAMS>() as _,
        };
        let mut radio = HANDLE::default();
        let find = match unsafe { BluetoothFindFirstRadio(&params, &mut radio) } {
            Ok(find) => find,
            Err(e) => {
                debug!("No local radio: {}", e);
                return adapters;
            }
        };
        loop {
            adapters.extend(radio_info(radio));
            if let Err(e) = unsafe { CloseHandle(radio) } {
                warn!("Failed to close radio handle: {}", e);
            }
            if unsafe { BluetoothFindNextRadio(find, &mut radio) }.is_err() {
                break;
            }
        }
        if let Err(e) = unsafe { BluetoothFindRadioClose(find) } {
            warn!("Failed to close radio search: {}", e);
        }
        adapters
    }
}

fn empty_device_info() -> BLUETOOTH_DEVICE_INFO {
    BLUETOOTH_DEVICE_INFO {
        dwSize: size_of::<BLUETOOTH_DEVICE_INFO>() as _,
        ..Default::default()
    }
}

fn to_record(info: &BLUETOOTH_DEVICE_INFO) -> ClassicDeviceRecord {
    ClassicDeviceRecord {
        address: unsafe { info.Address.Anonymous.ullLong },
        name: utils::from_wide(&info.szName),
        class_of_device: info.ulClassofDevice,
        remembered: info.fRemembered.as_bool(),
    }
}

impl ClassicEnumerator for Win32Backend {
    type SearchHandle = DeviceSearch;

    fn find_first(
        &self,
        params: &InquiryParams,
    ) -> Result<(ClassicDeviceRecord, DeviceSearch), SystemError> {
        let search_params = BLUETOOTH_DEVICE_SEARCH_PARAMS {
            dwSize: size_of::<BLUETOOTH_DEVICE_SEARCH_PARAMS>() as _,
            fReturnAuthenticated: params.return_authenticated.into(),
            fReturnRemembered: params.return_remembered.into(),
            fReturnUnknown: params.return_unknown.into(),
            fReturnConnected: params.return_connected.into(),
            fIssueInquiry: params.issue_inquiry.into(),
            cTimeoutMultiplier: params.timeout_multiplier,
            // Search on every local radio.
            hRadio: HANDLE::default(),
        };
        let mut info = empty_device_info();
        let find = unsafe { BluetoothFindFirstDevice(&search_params, &mut info) }
            .map_err(|e| utils::to_system_error(&e))?;
        Ok((to_record(&info), DeviceSearch(find)))
    }

    fn find_next(&self, handle: &DeviceSearch) -> Result<ClassicDeviceRecord, SystemError> {
        let mut info = empty_device_info();
        unsafe { BluetoothFindNextDevice(handle.0, &mut info) }
            .map_err(|e| utils::to_system_error(&e))?;
        Ok(to_record(&info))
    }

    fn close(&self, handle: DeviceSearch) {
        if let Err(e) = unsafe { BluetoothFindDeviceClose(handle.0) } {
            warn!("Failed to close classic device search: {}", e);
        }
    }
}

impl LeEnumerator for Win32Backend {
    fn enumerate_interfaces(&self, interface_class: &Uuid) -> InterfaceEnumeration {
        setupapi::enumerate_interfaces(interface_class)
    }
}
