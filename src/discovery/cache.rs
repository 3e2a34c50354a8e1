// btdiscover Source Code File
//
// Copyright 2026 btdiscover contributors. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use crate::api::BDAddr;
use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

static GLOBAL_CACHE: Lazy<LeAddressCache> = Lazy::new(LeAddressCache::new);

/// A Low Energy device interface seen during the most recent enumeration pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeDeviceEntry {
    pub address: BDAddr,
    pub system_path: String,
}

/// Maps Low Energy device addresses to the system path of their device interface.
///
/// The contents always describe exactly one enumeration pass: each pass replaces every entry at
/// once, so devices that disappeared do not linger. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct LeAddressCache {
    entries: Arc<Mutex<Vec<LeDeviceEntry>>>,
}

impl LeAddressCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache shared by every agent in the process unless one is given its own.
    pub fn global() -> LeAddressCache {
        GLOBAL_CACHE.clone()
    }

    /// Swaps in the entries of a finished pass.
    pub fn replace(&self, entries: Vec<LeDeviceEntry>) {
        let stale = std::mem::replace(&mut *self.lock(), entries);
        // Freed outside the lock.
        drop(stale);
    }

    /// The system path last seen for `address`.
    pub fn system_path(&self, address: BDAddr) -> Option<String> {
        self.lock()
            .iter()
            .find(|entry| entry.address == address)
            .map(|entry| entry.system_path.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LeDeviceEntry>> {
        // Entries are swapped wholesale, so a panic elsewhere cannot leave them half-written.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
