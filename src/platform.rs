// btdiscover Source Code File
//
// Copyright 2026 btdiscover contributors. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The `platform` module contains the platform-specific implementation of the [`api`] backend
//! traits. Other targets have no native backend; they can still drive a
//! [`DiscoveryAgent`](crate::discovery::DiscoveryAgent) with their own [`api::Backend`].

#[cfg(target_os = "windows")]
pub use crate::win32::backend::{DeviceSearch, Win32Backend as PlatformBackend};

use crate::api::{self, DeviceInfo, DiscoveryError, DiscoveryEvent};
use crate::discovery::LeAddressCache;
use static_assertions::assert_impl_all;
use std::fmt::{Debug, Display};
use std::hash::Hash;

// Ensure that the exported types implement all the expected traits.
assert_impl_all!(DeviceInfo: Clone, Debug, Display, Eq, Hash, Send, Sync);
assert_impl_all!(DiscoveryEvent: Clone, Debug, Send, Sync);
assert_impl_all!(DiscoveryError: Clone, Debug, Display, Send, Sync);
assert_impl_all!(api::BDAddr: Copy, Debug, Display, Hash, Ord, Send, Sync);
assert_impl_all!(LeAddressCache: Clone, Debug, Send, Sync);
#[cfg(target_os = "windows")]
assert_impl_all!(PlatformBackend: api::Backend, Clone, Debug, Send, Sized, Sync);
#[cfg(target_os = "windows")]
assert_impl_all!(DeviceSearch: Send);
