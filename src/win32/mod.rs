// btdiscover Source Code File
//
// Copyright 2026 btdiscover contributors. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Win32 backend: the Bluetooth APIs for radios and the classic search, SetupAPI for the Low
//! Energy device interfaces.

pub mod backend;
mod setupapi;
mod utils;
