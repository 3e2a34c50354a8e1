// btdiscover Source Code File
//
// Copyright 2026 btdiscover contributors. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! btdiscover finds nearby Bluetooth devices over both the classic (BR/EDR) inquiry transport
//! and the Low Energy device database, and reports them as a single deduplicated list.
//!
//! The entry point is [`DiscoveryAgent`](discovery::DiscoveryAgent). It drives a native
//! [`Backend`](api::Backend) one blocking step at a time on background threads, merges every
//! result by hardware address and announces changes as [`DiscoveryEvent`](api::DiscoveryEvent)s.
//!
//! ```no_run
//! # #[cfg(target_os = "windows")]
//! # async fn run() -> btdiscover::Result<()> {
//! use btdiscover::api::DiscoveryMethods;
//! use btdiscover::discovery::{DiscoveryAgent, DiscoveryConfig};
//! use btdiscover::platform::PlatformBackend;
//!
//! let agent = DiscoveryAgent::new(PlatformBackend::new(), DiscoveryConfig::default());
//! for device in agent.discover(DiscoveryMethods::empty()).await? {
//!     println!("{}", device);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
mod common;
pub mod discovery;
pub mod platform;
#[cfg(target_os = "windows")]
mod win32;

use api::DiscoveryError;

/// The main error type returned by most methods in btdiscover.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Discovery agent is no longer running")]
    AgentStopped,

    #[error("Discovery was canceled")]
    Canceled,

    #[error("Discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

/// Convenience type for a result using the btdiscover [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;
