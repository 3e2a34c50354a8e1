// btdiscover Source Code File
//
// Copyright 2026 btdiscover contributors. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use super::{
    cache::LeAddressCache,
    internal::{AgentMessage, DiscoveryInternal},
    le, DiscoveryConfig,
};
use crate::api::{
    BDAddr, Backend, DeviceInfo, DiscoveryError, DiscoveryEvent, DiscoveryMethods, DiscoveryState,
};
use crate::common::event_hub::EventHub;
use crate::{Error, Result};
use futures::stream::{Stream, StreamExt};
use std::fmt::{self, Debug, Formatter};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{self, JoinHandle};
use uuid::Uuid;

/// Finds classic and Low Energy devices through a [`Backend`] and merges them by address.
///
/// The agent is a handle to a controller task that owns the scan. Every command resolves once
/// the controller has applied it, so a `start()` that fails its precondition checks has already
/// emitted its [`DiscoveryEvent::Error`] when it returns, and `is_active()` right after `stop()`
/// reports `false` even while the in-flight native call is still running.
///
/// Dropping the agent cancels any running scan in the background. Use
/// [`shutdown`](Self::shutdown) to wait for that teardown.
pub struct DiscoveryAgent<B: Backend> {
    sender: mpsc::UnboundedSender<AgentMessage>,
    events: EventHub,
    backend: Arc<B>,
    le_cache: LeAddressCache,
    le_interface_class: Uuid,
    controller: JoinHandle<()>,
}

impl<B: Backend> DiscoveryAgent<B> {
    /// Creates an agent sharing the process-wide [`LeAddressCache::global`].
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn new(backend: B, config: DiscoveryConfig) -> Self {
        Self::with_le_cache(backend, config, LeAddressCache::global())
    }

    /// Creates an agent that records Low Energy system paths in `le_cache`.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn with_le_cache(backend: B, config: DiscoveryConfig, le_cache: LeAddressCache) -> Self {
        let backend = Arc::new(backend);
        let events = EventHub::new(config.event_capacity);
        let le_interface_class = config.le_interface_class;
        let (sender, receiver) = mpsc::unbounded_channel();
        let internal =
            DiscoveryInternal::new(backend.clone(), config, le_cache.clone(), events.clone());
        let controller = tokio::spawn(internal.run(receiver));
        DiscoveryAgent {
            sender,
            events,
            backend,
            le_cache,
            le_interface_class,
            controller,
        }
    }

    /// The discovery methods the native backends can honour. Currently none, which means
    /// callers get the default method whatever they ask for.
    pub fn supported_discovery_methods() -> DiscoveryMethods {
        DiscoveryMethods::empty()
    }

    /// Retrieve a stream of [`DiscoveryEvent`]s emitted from now on.
    pub fn events(&self) -> Pin<Box<dyn Stream<Item = DiscoveryEvent> + Send>> {
        self.events.event_stream()
    }

    /// Starts a scan. `methods` is advisory; see
    /// [`supported_discovery_methods`](Self::supported_discovery_methods).
    ///
    /// Called while a scan is running, or while a `stop()` is still pending, the scan is
    /// restarted from scratch once the in-flight step returns, and no `Canceled` event is sent.
    pub async fn start(&self, methods: DiscoveryMethods) -> Result<()> {
        self.request(|reply| AgentMessage::Start(methods, reply)).await
    }

    /// Requests cancellation of the running scan. Has no effect when no scan is running.
    ///
    /// The scan ends, with a [`DiscoveryEvent::Canceled`], once the in-flight native call
    /// returns. That can take up to
    /// [`InquiryParams::inquiry_duration`](crate::api::InquiryParams::inquiry_duration).
    pub async fn stop(&self) -> Result<()> {
        self.request(AgentMessage::Stop).await
    }

    pub async fn is_active(&self) -> Result<bool> {
        self.request(AgentMessage::IsActive).await
    }

    pub async fn state(&self) -> Result<DiscoveryState> {
        self.request(AgentMessage::State).await
    }

    /// The devices found by the current or most recent scan, in discovery order.
    pub async fn discovered_devices(&self) -> Result<Vec<DeviceInfo>> {
        self.request(AgentMessage::Devices).await
    }

    /// The error that ended the most recent scan, if it failed.
    pub async fn error(&self) -> Result<Option<DiscoveryError>> {
        self.request(AgentMessage::LastError).await
    }

    /// Runs a complete scan and returns the merged device list.
    pub async fn discover(&self, methods: DiscoveryMethods) -> Result<Vec<DeviceInfo>> {
        // Subscribe first: a refused start() emits its error before returning.
        let mut events = self.events();
        self.start(methods).await?;
        while let Some(event) = events.next().await {
            match event {
                DiscoveryEvent::DeviceDiscovered(_) => {}
                DiscoveryEvent::Finished => return self.discovered_devices().await,
                DiscoveryEvent::Canceled => return Err(Error::Canceled),
                DiscoveryEvent::Error(error) => return Err(error.into()),
            }
        }
        Err(Error::AgentStopped)
    }

    /// Returns the system path of the Low Energy device with `address`, after refreshing the
    /// cache with a new enumeration pass.
    pub async fn le_device_system_path(&self, address: BDAddr) -> Result<Option<String>> {
        let backend = self.backend.clone();
        let cache = self.le_cache.clone();
        let interface_class = self.le_interface_class;
        task::spawn_blocking(move || {
            le::discovered_le_device_system_path(&*backend, &interface_class, &cache, address)
        })
        .await
        .map_err(|e| Error::TaskFailed(e.to_string()))
    }

    /// Cancels any running scan, waits for the in-flight native call to return and releases the
    /// search handle. No further events are emitted.
    pub async fn shutdown(self) -> Result<()> {
        self.request(AgentMessage::Shutdown).await?;
        let DiscoveryAgent {
            sender, controller, ..
        } = self;
        drop(sender);
        controller
            .await
            .map_err(|e| Error::TaskFailed(e.to_string()))
    }

    async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> AgentMessage,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(message(reply))
            .map_err(|_| Error::AgentStopped)?;
        response.await.map_err(|_| Error::AgentStopped)
    }
}

impl<B: Backend> Debug for DiscoveryAgent<B> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("DiscoveryAgent")
            .field("le_interface_class", &self.le_interface_class)
            .field("stopped", &self.controller.is_finished())
            .finish_non_exhaustive()
    }
}
