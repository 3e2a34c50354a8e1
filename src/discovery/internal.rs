// btdiscover Source Code File
//
// Copyright 2026 btdiscover contributors. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The controller task behind a [`DiscoveryAgent`](super::DiscoveryAgent).
//!
//! Native enumeration calls block, so each one runs as a separate background step. The
//! controller is the only code that touches the scan state: it takes commands from the agent
//! handle and step completions in one loop, so nothing here needs locking. At most one step is
//! in flight, and the search handle travels into that step and back out with its result.

use super::{
    cache::LeAddressCache,
    classic::{self, ClassicSearch, ClassicStep},
    le, DiscoveryConfig,
};
use crate::api::{
    Backend, DeviceInfo, DiscoveryError, DiscoveryEvent, DiscoveryMethods, DiscoveryState,
    SystemError,
};
use crate::common::{device_list::DeviceList, event_hub::EventHub};
use log::{debug, error, trace, warn};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{self, JoinError, JoinHandle};

pub(crate) enum AgentMessage {
    Start(DiscoveryMethods, oneshot::Sender<()>),
    Stop(oneshot::Sender<()>),
    IsActive(oneshot::Sender<bool>),
    State(oneshot::Sender<DiscoveryState>),
    Devices(oneshot::Sender<Vec<DeviceInfo>>),
    LastError(oneshot::Sender<Option<DiscoveryError>>),
    Shutdown(oneshot::Sender<()>),
}

enum StepOutcome<H> {
    Classic {
        handle: Option<H>,
        step: ClassicStep,
    },
    LowEnergy(Result<Vec<DeviceInfo>, SystemError>),
}

// Aggregate everything the loop can wake up for into a single type.
enum LoopInput<H> {
    Message(Option<AgentMessage>),
    Completion(Result<StepOutcome<H>, JoinError>),
}

type Handle<B> = <B as crate::api::ClassicEnumerator>::SearchHandle;

pub(crate) struct DiscoveryInternal<B: Backend> {
    backend: Arc<B>,
    config: DiscoveryConfig,
    le_cache: LeAddressCache,
    events: EventHub,
    devices: DeviceList,
    active: bool,
    pending_cancel: bool,
    pending_start: bool,
    phase: DiscoveryState,
    methods: DiscoveryMethods,
    last_error: Option<DiscoveryError>,
    search: ClassicSearch<Handle<B>>,
    step: Option<JoinHandle<StepOutcome<Handle<B>>>>,
}

impl<B: Backend> DiscoveryInternal<B> {
    pub fn new(
        backend: Arc<B>,
        config: DiscoveryConfig,
        le_cache: LeAddressCache,
        events: EventHub,
    ) -> Self {
        DiscoveryInternal {
            backend,
            config,
            le_cache,
            events,
            devices: DeviceList::default(),
            active: false,
            pending_cancel: false,
            pending_start: false,
            phase: DiscoveryState::Idle,
            methods: DiscoveryMethods::empty(),
            last_error: None,
            search: ClassicSearch::default(),
            step: None,
        }
    }

    /// Serves the agent until it shuts down or its handle is dropped.
    pub async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<AgentMessage>) {
        loop {
            let input = match self.step.as_mut() {
                // Commands win over a completion that is ready at the same time, so nothing
                // runs after a shutdown request.
                Some(step) => tokio::select! {
                    biased;
                    message = receiver.recv() => LoopInput::Message(message),
                    outcome = step => LoopInput::Completion(outcome),
                },
                None => LoopInput::Message(receiver.recv().await),
            };

            match input {
                LoopInput::Completion(outcome) => {
                    self.step = None;
                    self.on_step_finished(outcome);
                }
                LoopInput::Message(Some(AgentMessage::Shutdown(reply))) => {
                    self.shutdown().await;
                    let _ = reply.send(());
                    return;
                }
                LoopInput::Message(Some(message)) => self.on_message(message),
                LoopInput::Message(None) => {
                    self.shutdown().await;
                    return;
                }
            }
        }
    }

    fn on_message(&mut self, message: AgentMessage) {
        match message {
            AgentMessage::Start(methods, reply) => {
                self.start(methods);
                let _ = reply.send(());
            }
            AgentMessage::Stop(reply) => {
                self.stop();
                let _ = reply.send(());
            }
            AgentMessage::IsActive(reply) => {
                let _ = reply.send(self.is_active());
            }
            AgentMessage::State(reply) => {
                let _ = reply.send(self.state());
            }
            AgentMessage::Devices(reply) => {
                let _ = reply.send(self.devices.devices().to_vec());
            }
            AgentMessage::LastError(reply) => {
                let _ = reply.send(self.last_error.clone());
            }
            AgentMessage::Shutdown(_) => unreachable!("Shutdown is handled by the run loop"),
        }
    }

    fn is_active(&self) -> bool {
        if self.pending_start {
            true
        } else if self.pending_cancel {
            false
        } else {
            self.active
        }
    }

    fn state(&self) -> DiscoveryState {
        if self.pending_start {
            DiscoveryState::Restarting
        } else if self.pending_cancel {
            DiscoveryState::Canceling
        } else {
            self.phase
        }
    }

    fn start(&mut self, methods: DiscoveryMethods) {
        if self.pending_cancel {
            // Picked up when the in-flight step returns.
            self.pending_start = true;
            self.methods = methods;
            return;
        }
        if self.active {
            // An implied stop: the running scan is abandoned once its step returns.
            debug!("Discovery already running, restarting");
            self.pending_cancel = true;
            self.pending_start = true;
            self.methods = methods;
            return;
        }
        if !methods.is_empty() {
            debug!(
                "Discovery methods {:?} are not supported, using the default method",
                methods
            );
        }
        self.methods = methods;

        let adapters = self.backend.local_adapters();
        if adapters.is_empty() {
            warn!("Device does not support Bluetooth");
            self.report_error(DiscoveryError::NoLocalAdapter);
            return;
        }
        if let Some(requested) = self.config.adapter_address {
            if !adapters.iter().any(|adapter| adapter.address == requested) {
                warn!("Incorrect local adapter passed: {}", requested);
                self.report_error(DiscoveryError::InvalidAdapterAddress(requested));
                return;
            }
        }

        self.devices.clear();
        self.last_error = None;
        self.active = true;
        self.phase = DiscoveryState::ClassicScanning;
        self.spawn_find_first();
    }

    fn stop(&mut self) {
        if !self.active {
            return;
        }
        debug!("Canceling discovery");
        self.pending_cancel = true;
        self.pending_start = false;
    }

    fn spawn_find_first(&mut self) {
        debug_assert!(self.step.is_none() && !self.search.is_open());
        let backend = self.backend.clone();
        let params = self.config.inquiry.clone();
        self.step = Some(task::spawn_blocking(move || {
            let (handle, step) = classic::find_first(&*backend, &params);
            StepOutcome::Classic { handle, step }
        }));
    }

    fn spawn_find_next(&mut self) {
        let Some(handle) = self.search.take() else {
            self.fail(SystemError::INVALID_HANDLE);
            return;
        };
        let backend = self.backend.clone();
        self.step = Some(task::spawn_blocking(move || {
            let step = classic::find_next(&*backend, &handle);
            StepOutcome::Classic {
                handle: Some(handle),
                step,
            }
        }));
    }

    fn spawn_le_scan(&mut self) {
        let backend = self.backend.clone();
        let cache = self.le_cache.clone();
        let interface_class = self.config.le_interface_class;
        self.step = Some(task::spawn_blocking(move || {
            StepOutcome::LowEnergy(le::enumerate_le_devices(
                &*backend,
                &interface_class,
                &cache,
            ))
        }));
    }

    /// Takes back the search handle, if the step carried one, and returns what the step found.
    fn reclaim(&mut self, outcome: Result<StepOutcome<Handle<B>>, JoinError>) -> StepOutcome<()> {
        match outcome {
            Ok(StepOutcome::Classic { handle, step }) => {
                if let Some(handle) = handle {
                    self.search.attach(&*self.backend, handle);
                }
                StepOutcome::Classic { handle: None, step }
            }
            Ok(StepOutcome::LowEnergy(result)) => StepOutcome::LowEnergy(result),
            Err(join_error) => {
                error!("Discovery step did not complete: {}", join_error);
                StepOutcome::Classic {
                    handle: None,
                    step: ClassicStep::Failed(SystemError::GEN_FAILURE),
                }
            }
        }
    }

    fn on_step_finished(&mut self, outcome: Result<StepOutcome<Handle<B>>, JoinError>) {
        let outcome = self.reclaim(outcome);

        if self.pending_cancel && !self.pending_start {
            // Whatever the step found is dropped.
            self.search.close(&*self.backend);
            self.active = false;
            self.pending_cancel = false;
            self.phase = DiscoveryState::Idle;
            debug!("Discovery canceled");
            self.events.emit(DiscoveryEvent::Canceled);
            return;
        }

        if self.pending_start {
            self.search.close(&*self.backend);
            self.pending_start = false;
            self.pending_cancel = false;
            self.active = false;
            self.phase = DiscoveryState::Idle;
            debug!("Restarting discovery");
            self.start(self.methods);
            return;
        }

        match outcome {
            StepOutcome::Classic { step, .. } => self.on_classic_step(step),
            StepOutcome::LowEnergy(result) => self.on_le_scan(result),
        }
    }

    fn on_classic_step(&mut self, step: ClassicStep) {
        match step {
            ClassicStep::Found(device) => {
                self.process_discovered_device(device);
                self.spawn_find_next();
            }
            ClassicStep::Exhausted => {
                self.search.close(&*self.backend);
                trace!("Classic search exhausted, enumerating LE devices");
                self.phase = DiscoveryState::LeScanning;
                self.spawn_le_scan();
            }
            ClassicStep::Failed(error) => {
                self.search.close(&*self.backend);
                self.fail(error);
            }
        }
    }

    fn on_le_scan(&mut self, result: Result<Vec<DeviceInfo>, SystemError>) {
        match result {
            Ok(devices) => {
                self.phase = DiscoveryState::Finishing;
                for device in devices {
                    self.process_discovered_device(device);
                }
                self.active = false;
                self.phase = DiscoveryState::Idle;
                debug!("Discovery finished with {} devices", self.devices.devices().len());
                self.events.emit(DiscoveryEvent::Finished);
            }
            Err(error) => self.fail(error),
        }
    }

    fn process_discovered_device(&mut self, device: DeviceInfo) {
        if let Some(device) = self.devices.merge(device) {
            self.events.emit(DiscoveryEvent::DeviceDiscovered(device));
        }
    }

    fn fail(&mut self, error: SystemError) {
        error!("Discovery failed: {}", error);
        self.pending_start = false;
        self.pending_cancel = false;
        self.active = false;
        self.phase = DiscoveryState::Idle;
        self.report_error(DiscoveryError::from_system_error(error));
    }

    fn report_error(&mut self, error: DiscoveryError) {
        self.last_error = Some(error.clone());
        self.events.emit(DiscoveryEvent::Error(error));
    }

    /// Waits out the in-flight step and releases the search handle without emitting anything.
    async fn shutdown(&mut self) {
        if self.active {
            self.stop();
        }
        if let Some(step) = self.step.take() {
            trace!("Waiting for the in-flight discovery step before shutting down");
            let outcome = step.await;
            self.reclaim(outcome);
        }
        self.search.close(&*self.backend);
        self.active = false;
        self.pending_cancel = false;
        self.pending_start = false;
        self.phase = DiscoveryState::Idle;
    }
}
