// btdiscover Source Code File
//
// Copyright 2026 btdiscover contributors. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Device interface enumeration through SetupAPI.

use super::utils::{from_wide, from_wide_bytes, to_guid, to_system_error};
use crate::api::{DeviceInterface, InterfaceEnumeration, SystemError};
use log::{trace, warn};
use std::mem::size_of;
use uuid::Uuid;
use windows::core::{GUID, PCWSTR};
use windows::Win32::Devices::DeviceAndDriverInstallation::{
    SetupDiDestroyDeviceInfoList, SetupDiEnumDeviceInterfaces, SetupDiGetClassDevsW,
    SetupDiGetDeviceInterfaceDetailW, SetupDiGetDeviceRegistryPropertyW, DIGCF_DEVICEINTERFACE,
    DIGCF_PRESENT, HDEVINFO, SETUP_DI_REGISTRY_PROPERTY, SPDRP_FRIENDLYNAME,
    SP_DEVICE_INTERFACE_DATA, SP_DEVICE_INTERFACE_DETAIL_DATA_W, SP_DEVINFO_DATA,
};
use windows::Win32::System::Registry::{REG_EXPAND_SZ, REG_SZ};

/// A device information set, destroyed on drop.
struct DeviceInfoSet(HDEVINFO);

impl DeviceInfoSet {
    fn present_interfaces(interface_class: &GUID) -> Result<Self, SystemError> {
        unsafe {
            SetupDiGetClassDevsW(
                Some(interface_class as *const GUID),
                PCWSTR::null(),
                None,
                DIGCF_PRESENT | DIGCF_DEVICEINTERFACE,
            )
        }
        .map(DeviceInfoSet)
        .map_err(|e| to_system_error(&e))
    }

    fn interface(
        &self,
        interface_class: &GUID,
        index: u32,
    ) -> Result<SP_DEVICE_INTERFACE_DATA, SystemError> {
        let mut interface_data = SP_DEVICE_INTERFACE_DATA {
            cbSize: size_of::<SP_DEVICE_INTERFACE_DATA>() as u32,
            ..Default::default()
        };
        unsafe {
            SetupDiEnumDeviceInterfaces(
                self.0,
                None,
                interface_class as *const GUID,
                index,
                &mut interface_data,
            )
        }
        .map_err(|e| to_system_error(&e))?;
        Ok(interface_data)
    }

    /// Returns the interface's system path and the device it belongs to.
    fn interface_detail(
        &self,
        interface_data: &SP_DEVICE_INTERFACE_DATA,
    ) -> Result<(String, SP_DEVINFO_DATA), SystemError> {
        let mut required = 0u32;
        let sizing = unsafe {
            SetupDiGetDeviceInterfaceDetailW(
                self.0,
                interface_data,
                None,
                0,
                Some(&mut required as *mut u32),
                None,
            )
        };
        if let Err(e) = sizing {
            let status = to_system_error(&e);
            if status != SystemError::INSUFFICIENT_BUFFER {
                return Err(status);
            }
        }

        let detail_size = (required as usize).max(size_of::<SP_DEVICE_INTERFACE_DETAIL_DATA_W>());
        // u32 storage keeps the detail header aligned.
        let mut buffer = vec![0u32; detail_size.div_ceil(size_of::<u32>())];
        let detail = buffer.as_mut_ptr() as *mut SP_DEVICE_INTERFACE_DETAIL_DATA_W;
        let mut device_data = SP_DEVINFO_DATA {
            cbSize: size_of::<SP_DEVINFO_DATA>() as u32,
            ..Default::default()
        };
        unsafe {
            (*detail).cbSize = size_of::<SP_DEVICE_INTERFACE_DETAIL_DATA_W>() as u32;
            SetupDiGetDeviceInterfaceDetailW(
                self.0,
                interface_data,
                Some(detail),
                (buffer.len() * size_of::<u32>()) as u32,
                None,
                Some(&mut device_data as *mut SP_DEVINFO_DATA),
            )
        }
        .map_err(|e| to_system_error(&e))?;

        let path = unsafe {
            let path_start = std::ptr::addr_of!((*detail).DevicePath) as *const u16;
            let header = path_start as usize - buffer.as_ptr() as usize;
            let path_len = (buffer.len() * size_of::<u32>() - header) / size_of::<u16>();
            from_wide(std::slice::from_raw_parts(path_start, path_len))
        };
        Ok((path, device_data))
    }

    /// Reads a string registry property, or an empty string if the device has none.
    fn property_string(
        &self,
        device_data: &SP_DEVINFO_DATA,
        property: SETUP_DI_REGISTRY_PROPERTY,
    ) -> String {
        let mut data_type = 0u32;
        let mut required = 0u32;
        let mut buffer: Vec<u8> = Vec::new();
        loop {
            let result = unsafe {
                SetupDiGetDeviceRegistryPropertyW(
                    self.0,
                    device_data,
                    property,
                    Some(&mut data_type as *mut u32),
                    if buffer.is_empty() {
                        None
                    } else {
                        Some(buffer.as_mut_slice())
                    },
                    Some(&mut required as *mut u32),
                )
            };
            let Err(e) = result else {
                return from_wide_bytes(&buffer);
            };
            let is_string = data_type == REG_SZ.0 || data_type == REG_EXPAND_SZ.0;
            // Room for a terminator the registry may have left out.
            let wanted = required as usize + size_of::<u16>();
            if to_system_error(&e) != SystemError::INSUFFICIENT_BUFFER
                || !is_string
                || wanted <= buffer.len()
            {
                return String::new();
            }
            buffer = vec![0u8; wanted];
        }
    }
}

impl Drop for DeviceInfoSet {
    fn drop(&mut self) {
        if let Err(e) = unsafe { SetupDiDestroyDeviceInfoList(self.0) } {
            warn!("Failed to destroy device info set: {}", e);
        }
    }
}

/// Runs one pass over the present device interfaces of `interface_class`.
pub fn enumerate_interfaces(interface_class: &Uuid) -> InterfaceEnumeration {
    let guid = to_guid(interface_class);
    let mut interfaces = Vec::new();
    let set = match DeviceInfoSet::present_interfaces(&guid) {
        Ok(set) => set,
        Err(status) => return InterfaceEnumeration { interfaces, status },
    };

    let mut index = 0;
    let status = loop {
        let interface_data = match set.interface(&guid, index) {
            Ok(data) => data,
            Err(status) => break status,
        };
        index += 1;
        let (system_path, device_data) = match set.interface_detail(&interface_data) {
            Ok(detail) => detail,
            Err(status) => break status,
        };
        let friendly_name = set.property_string(&device_data, SPDRP_FRIENDLYNAME);
        trace!("Found device interface {} ({})", system_path, friendly_name);
        interfaces.push(DeviceInterface {
            system_path,
            friendly_name,
        });
    };
    InterfaceEnumeration { interfaces, status }
}
