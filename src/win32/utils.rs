// btdiscover Source Code File
//
// Copyright 2026 btdiscover contributors. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use crate::api::SystemError;
use uuid::Uuid;
use windows::core::GUID;

const FACILITY_WIN32_MASK: u32 = 0xFFFF_0000;
const FACILITY_WIN32: u32 = 0x8007_0000;

/// Recovers the Win32 status code behind a failed call.
pub fn to_system_error(error: &windows::core::Error) -> SystemError {
    let code = error.code().0 as u32;
    if code & FACILITY_WIN32_MASK == FACILITY_WIN32 {
        SystemError(code & 0xFFFF)
    } else {
        SystemError(code)
    }
}

pub fn to_guid(uuid: &Uuid) -> GUID {
    let (data1, data2, data3, data4) = uuid.as_fields();
    GUID::from_values(data1, data2, data3, data4.to_owned())
}

/// Decodes a NUL-terminated UTF-16 buffer, stopping at the first NUL.
pub fn from_wide(wide: &[u16]) -> String {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..len])
}

/// Same as [`from_wide`] for a little-endian byte buffer, as filled in by the registry calls.
pub fn from_wide_bytes(bytes: &[u8]) -> String {
    let wide: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    from_wide(&wide)
}
