// btdiscover Source Code File
//
// Copyright 2026 btdiscover contributors. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use super::{DiscoveryAgent, DiscoveryConfig, LeAddressCache, LE_DEVICE_INTERFACE_CLASS};
use crate::api::{
    BDAddr, ClassicDeviceRecord, ClassicEnumerator, DeviceInfo, DeviceInterface, DiscoveryError,
    DiscoveryEvent, DiscoveryMethods, DiscoveryState, ErrorKind, HostInfo, InquiryParams,
    InterfaceEnumeration, LeEnumerator, LocalAdapters, SystemError, TransportSet,
};
use crate::Error;
use futures::stream::{Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;
use uuid::Uuid;

const WAIT: Duration = Duration::from_secs(5);

const PHONE: u64 = 0x0011_2233_4455;
const HEADSET: u64 = 0x0011_2233_4466;
const TAG: u64 = 0x0011_2233_4477;

const PHONE_PATH: &str =
    r"\\?\bthledevice#dev_001122334455#8&1&0#{781aee18-7733-4ce4-add0-91f41c67b592}";
const TAG_PATH: &str =
    r"\\?\bthledevice#dev_001122334477#8&2&0#{781aee18-7733-4ce4-add0-91f41c67b592}";

/// One scripted classic search result.
enum Step {
    Device(ClassicDeviceRecord),
    Fail(SystemError),
    /// Blocks the calling thread until the gate is released, then runs the inner step.
    Gated(mpsc::Receiver<()>, Box<Step>),
}

impl Step {
    fn run(self) -> Result<ClassicDeviceRecord, SystemError> {
        match self {
            Step::Device(record) => Ok(record),
            Step::Fail(error) => Err(error),
            Step::Gated(gate, step) => {
                let _ = gate.recv();
                step.run()
            }
        }
    }
}

#[derive(Debug)]
struct FakeHandle(u32);

struct Script {
    adapters: Vec<HostInfo>,
    classic: Mutex<VecDeque<Step>>,
    le: Mutex<InterfaceEnumeration>,
    find_first_calls: AtomicUsize,
    next_handle: AtomicU32,
    closed: Mutex<Vec<u32>>,
    le_passes: AtomicUsize,
    le_gate: Mutex<Option<mpsc::Receiver<()>>>,
}

#[derive(Clone)]
struct FakeBackend(Arc<Script>);

impl FakeBackend {
    fn new() -> Self {
        FakeBackend::with_adapters(vec![HostInfo {
            address: BDAddr::from(0xaaaa_aaaa_aaaau64),
            name: "Local radio".into(),
        }])
    }

    fn without_adapters() -> Self {
        FakeBackend::with_adapters(Vec::new())
    }

    fn with_adapters(adapters: Vec<HostInfo>) -> Self {
        FakeBackend(Arc::new(Script {
            adapters,
            classic: Mutex::new(VecDeque::new()),
            le: Mutex::new(InterfaceEnumeration {
                interfaces: Vec::new(),
                status: SystemError::NO_MORE_ITEMS,
            }),
            find_first_calls: AtomicUsize::new(0),
            next_handle: AtomicU32::new(1),
            closed: Mutex::new(Vec::new()),
            le_passes: AtomicUsize::new(0),
            le_gate: Mutex::new(None),
        }))
    }

    fn push(&self, step: Step) -> &Self {
        self.0.classic.lock().unwrap().push_back(step);
        self
    }

    /// Queues `step` behind a gate and returns the sender that releases it.
    fn push_gated(&self, step: Step) -> mpsc::Sender<()> {
        let (release, gate) = mpsc::channel();
        self.push(Step::Gated(gate, Box::new(step)));
        release
    }

    fn set_le(&self, interfaces: &[(&str, &str)], status: SystemError) {
        let interfaces = interfaces
            .iter()
            .map(|(path, name)| DeviceInterface {
                system_path: path.to_string(),
                friendly_name: name.to_string(),
            })
            .collect();
        *self.0.le.lock().unwrap() = InterfaceEnumeration { interfaces, status };
    }

    /// Blocks the next LE enumeration pass until the returned sender is used.
    fn gate_le(&self) -> mpsc::Sender<()> {
        let (release, gate) = mpsc::channel();
        *self.0.le_gate.lock().unwrap() = Some(gate);
        release
    }

    fn find_first_calls(&self) -> usize {
        self.0.find_first_calls.load(Ordering::SeqCst)
    }

    fn closed(&self) -> Vec<u32> {
        self.0.closed.lock().unwrap().clone()
    }

    fn le_passes(&self) -> usize {
        self.0.le_passes.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Result<ClassicDeviceRecord, SystemError> {
        // Never hold the lock while a gated step blocks.
        let step = self.0.classic.lock().unwrap().pop_front();
        match step {
            Some(step) => step.run(),
            None => Err(SystemError::NO_MORE_ITEMS),
        }
    }
}

impl LocalAdapters for FakeBackend {
    fn local_adapters(&self) -> Vec<HostInfo> {
        self.0.adapters.clone()
    }
}

impl ClassicEnumerator for FakeBackend {
    type SearchHandle = FakeHandle;

    fn find_first(
        &self,
        _params: &InquiryParams,
    ) -> Result<(ClassicDeviceRecord, FakeHandle), SystemError> {
        self.0.find_first_calls.fetch_add(1, Ordering::SeqCst);
        let record = self.next_step()?;
        let id = self.0.next_handle.fetch_add(1, Ordering::SeqCst);
        Ok((record, FakeHandle(id)))
    }

    fn find_next(&self, _handle: &FakeHandle) -> Result<ClassicDeviceRecord, SystemError> {
        self.next_step()
    }

    fn close(&self, handle: FakeHandle) {
        self.0.closed.lock().unwrap().push(handle.0);
    }
}

impl LeEnumerator for FakeBackend {
    fn enumerate_interfaces(&self, interface_class: &Uuid) -> InterfaceEnumeration {
        assert_eq!(*interface_class, LE_DEVICE_INTERFACE_CLASS);
        self.0.le_passes.fetch_add(1, Ordering::SeqCst);
        let gate = self.0.le_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        self.0.le.lock().unwrap().clone()
    }
}

fn device(address: u64, name: &str) -> Step {
    Step::Device(ClassicDeviceRecord {
        address,
        name: name.into(),
        class_of_device: 0x5a020c,
        ..Default::default()
    })
}

fn agent(backend: &FakeBackend, config: DiscoveryConfig) -> DiscoveryAgent<FakeBackend> {
    DiscoveryAgent::with_le_cache(backend.clone(), config, LeAddressCache::new())
}

type Events = Pin<Box<dyn Stream<Item = DiscoveryEvent> + Send>>;

async fn next_event(events: &mut Events) -> DiscoveryEvent {
    timeout(WAIT, events.next())
        .await
        .expect("timed out waiting for a discovery event")
        .expect("event stream closed")
}

async fn discovered(events: &mut Events) -> DeviceInfo {
    match next_event(events).await {
        DiscoveryEvent::DeviceDiscovered(device) => device,
        other => panic!("expected a discovered device, got {:?}", other),
    }
}

async fn wait_for_state(agent: &DiscoveryAgent<FakeBackend>, state: DiscoveryState) {
    timeout(WAIT, async {
        while agent.state().await.unwrap() != state {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for the discovery state");
}

async fn assert_quiet(events: &mut Events) {
    assert!(
        timeout(Duration::from_millis(100), events.next()).await.is_err(),
        "unexpected discovery event"
    );
}

#[tokio::test]
async fn classic_then_le_results_are_merged() {
    let backend = FakeBackend::new();
    backend.push(device(PHONE, "Phone")).push(device(HEADSET, "Headset"));
    backend.set_le(
        &[(PHONE_PATH, "Phone LE"), (TAG_PATH, "Tag")],
        SystemError::NO_MORE_ITEMS,
    );
    let agent = agent(&backend, DiscoveryConfig::default());
    let mut events = agent.events();

    agent.start(DiscoveryMethods::empty()).await.unwrap();

    let phone = discovered(&mut events).await;
    assert_eq!(phone.address(), BDAddr::from(PHONE));
    assert_eq!(phone.transports(), TransportSet::CLASSIC);
    assert!(!phone.is_cached());
    assert_eq!(discovered(&mut events).await.address(), BDAddr::from(HEADSET));

    let merged = discovered(&mut events).await;
    assert_eq!(merged.address(), BDAddr::from(PHONE));
    assert_eq!(merged.name(), "Phone");
    assert_eq!(merged.class_of_device(), 0x5a020c);
    assert_eq!(merged.transports(), TransportSet::CLASSIC | TransportSet::LOW_ENERGY);
    assert!(merged.is_cached());

    let tag = discovered(&mut events).await;
    assert_eq!(tag.address(), BDAddr::from(TAG));
    assert_eq!(tag.transports(), TransportSet::LOW_ENERGY);
    assert_eq!(next_event(&mut events).await, DiscoveryEvent::Finished);

    let devices = agent.discovered_devices().await.unwrap();
    let addresses: Vec<_> = devices.iter().map(|d| d.address()).collect();
    assert_eq!(
        addresses,
        vec![BDAddr::from(PHONE), BDAddr::from(HEADSET), BDAddr::from(TAG)]
    );
    assert_eq!(devices[0], merged);
    assert!(!agent.is_active().await.unwrap());
    assert_eq!(agent.state().await.unwrap(), DiscoveryState::Idle);
    assert_eq!(agent.error().await.unwrap(), None);
    assert_eq!(backend.find_first_calls(), 1);
    assert_eq!(backend.closed(), vec![1]);
    assert_eq!(backend.le_passes(), 1);
}

#[tokio::test]
async fn missing_adapter_fails_start() {
    let backend = FakeBackend::without_adapters();
    let agent = agent(&backend, DiscoveryConfig::default());
    let mut events = agent.events();

    agent.start(DiscoveryMethods::empty()).await.unwrap();

    assert_eq!(
        next_event(&mut events).await,
        DiscoveryEvent::Error(DiscoveryError::NoLocalAdapter)
    );
    assert!(!agent.is_active().await.unwrap());
    assert_eq!(
        agent.error().await.unwrap().map(|e| e.kind()),
        Some(ErrorKind::NoLocalAdapter)
    );
    assert_eq!(backend.find_first_calls(), 0);
}

#[tokio::test]
async fn unknown_adapter_address_fails_start() {
    let backend = FakeBackend::new();
    let requested = BDAddr::from(0x99u64);
    let agent = agent(&backend, DiscoveryConfig::default().with_adapter(requested));
    let mut events = agent.events();

    agent.start(DiscoveryMethods::empty()).await.unwrap();

    let DiscoveryEvent::Error(error) = next_event(&mut events).await else {
        panic!("expected an error event");
    };
    assert_eq!(error, DiscoveryError::InvalidAdapterAddress(requested));
    assert_eq!(error.kind(), ErrorKind::InvalidBluetoothAdapter);
    assert!(!agent.is_active().await.unwrap());
    assert_eq!(backend.find_first_calls(), 0);
}

#[tokio::test]
async fn stop_while_idle_does_nothing() {
    let backend = FakeBackend::new();
    let agent = agent(&backend, DiscoveryConfig::default());
    let mut events = agent.events();

    agent.stop().await.unwrap();

    assert!(!agent.is_active().await.unwrap());
    assert_eq!(agent.state().await.unwrap(), DiscoveryState::Idle);
    assert_quiet(&mut events).await;
}

#[tokio::test]
async fn stop_cancels_after_the_running_step() {
    let backend = FakeBackend::new();
    backend.push(device(PHONE, "Phone"));
    let release = backend.push_gated(device(HEADSET, "Headset"));
    let agent = agent(&backend, DiscoveryConfig::default());
    let mut events = agent.events();

    agent.start(DiscoveryMethods::empty()).await.unwrap();
    assert_eq!(discovered(&mut events).await.address(), BDAddr::from(PHONE));
    assert_eq!(agent.state().await.unwrap(), DiscoveryState::ClassicScanning);

    agent.stop().await.unwrap();
    assert!(!agent.is_active().await.unwrap());
    assert_eq!(agent.state().await.unwrap(), DiscoveryState::Canceling);

    release.send(()).unwrap();
    assert_eq!(next_event(&mut events).await, DiscoveryEvent::Canceled);

    let devices = agent.discovered_devices().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].address(), BDAddr::from(PHONE));
    assert_eq!(agent.state().await.unwrap(), DiscoveryState::Idle);
    assert_eq!(backend.find_first_calls(), 1);
    assert_eq!(backend.closed(), vec![1]);
    assert_eq!(backend.le_passes(), 0);
}

#[tokio::test]
async fn start_during_cancel_restarts_silently() {
    let backend = FakeBackend::new();
    backend.push(device(PHONE, "Phone"));
    let release = backend.push_gated(device(HEADSET, "Headset"));
    backend.push(device(TAG, "Watch"));
    let agent = agent(&backend, DiscoveryConfig::default());
    let mut events = agent.events();

    agent.start(DiscoveryMethods::empty()).await.unwrap();
    assert_eq!(discovered(&mut events).await.address(), BDAddr::from(PHONE));

    agent.stop().await.unwrap();
    agent.start(DiscoveryMethods::empty()).await.unwrap();
    assert!(agent.is_active().await.unwrap());
    assert_eq!(agent.state().await.unwrap(), DiscoveryState::Restarting);

    release.send(()).unwrap();
    // The gated headset belongs to the abandoned scan and is never reported.
    assert_eq!(discovered(&mut events).await.address(), BDAddr::from(TAG));
    assert_eq!(next_event(&mut events).await, DiscoveryEvent::Finished);

    let devices = agent.discovered_devices().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].address(), BDAddr::from(TAG));
    assert_eq!(backend.find_first_calls(), 2);
    assert_eq!(backend.closed(), vec![1, 2]);
}

#[tokio::test]
async fn second_start_restarts_the_scan() {
    let backend = FakeBackend::new();
    backend.push(device(PHONE, "Phone"));
    let release = backend.push_gated(device(HEADSET, "Headset"));
    backend.push(device(TAG, "Watch"));
    let agent = agent(&backend, DiscoveryConfig::default());
    let mut events = agent.events();

    agent.start(DiscoveryMethods::empty()).await.unwrap();
    assert_eq!(discovered(&mut events).await.address(), BDAddr::from(PHONE));

    agent.start(DiscoveryMethods::CLASSIC).await.unwrap();
    assert!(agent.is_active().await.unwrap());
    assert_eq!(agent.state().await.unwrap(), DiscoveryState::Restarting);

    release.send(()).unwrap();
    assert_eq!(discovered(&mut events).await.address(), BDAddr::from(TAG));
    assert_eq!(next_event(&mut events).await, DiscoveryEvent::Finished);

    let devices = agent.discovered_devices().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].address(), BDAddr::from(TAG));
    assert_eq!(backend.find_first_calls(), 2);
    assert_eq!(backend.closed(), vec![1, 2]);
}

#[tokio::test]
async fn stop_during_le_pass_cancels_it() {
    let backend = FakeBackend::new();
    backend.set_le(&[(TAG_PATH, "Tag")], SystemError::NO_MORE_ITEMS);
    let release = backend.gate_le();
    let agent = agent(&backend, DiscoveryConfig::default());
    let mut events = agent.events();

    agent.start(DiscoveryMethods::empty()).await.unwrap();
    wait_for_state(&agent, DiscoveryState::LeScanning).await;

    agent.stop().await.unwrap();
    assert!(!agent.is_active().await.unwrap());
    assert_eq!(agent.state().await.unwrap(), DiscoveryState::Canceling);

    release.send(()).unwrap();
    assert_eq!(next_event(&mut events).await, DiscoveryEvent::Canceled);
    assert!(agent.discovered_devices().await.unwrap().is_empty());
    assert_eq!(agent.state().await.unwrap(), DiscoveryState::Idle);
    assert_eq!(backend.le_passes(), 1);
}

#[tokio::test]
async fn restart_during_le_pass_runs_a_fresh_scan() {
    let backend = FakeBackend::new();
    backend.set_le(&[(TAG_PATH, "Tag")], SystemError::NO_MORE_ITEMS);
    let release = backend.gate_le();
    let agent = agent(&backend, DiscoveryConfig::default());
    let mut events = agent.events();

    agent.start(DiscoveryMethods::empty()).await.unwrap();
    wait_for_state(&agent, DiscoveryState::LeScanning).await;
    backend.push(device(PHONE, "Phone"));

    agent.stop().await.unwrap();
    agent.start(DiscoveryMethods::empty()).await.unwrap();
    assert_eq!(agent.state().await.unwrap(), DiscoveryState::Restarting);

    release.send(()).unwrap();
    // Nothing from the abandoned pass is reported.
    assert_eq!(discovered(&mut events).await.address(), BDAddr::from(PHONE));
    assert_eq!(discovered(&mut events).await.address(), BDAddr::from(TAG));
    assert_eq!(next_event(&mut events).await, DiscoveryEvent::Finished);

    assert_eq!(backend.find_first_calls(), 2);
    assert_eq!(backend.le_passes(), 2);
    // The first classic search found nothing and never opened a handle.
    assert_eq!(backend.closed(), vec![1]);
}

#[tokio::test]
async fn stop_clears_a_pending_restart() {
    let backend = FakeBackend::new();
    backend.push(device(PHONE, "Phone"));
    let release = backend.push_gated(device(HEADSET, "Headset"));
    let agent = agent(&backend, DiscoveryConfig::default());
    let mut events = agent.events();

    agent.start(DiscoveryMethods::empty()).await.unwrap();
    discovered(&mut events).await;
    agent.stop().await.unwrap();
    agent.start(DiscoveryMethods::empty()).await.unwrap();
    agent.stop().await.unwrap();
    assert_eq!(agent.state().await.unwrap(), DiscoveryState::Canceling);

    release.send(()).unwrap();
    assert_eq!(next_event(&mut events).await, DiscoveryEvent::Canceled);
    assert_eq!(backend.find_first_calls(), 1);
}

#[tokio::test]
async fn classic_failure_ends_the_scan() {
    let backend = FakeBackend::new();
    backend
        .push(device(PHONE, "Phone"))
        .push(Step::Fail(SystemError::INVALID_HANDLE));
    let agent = agent(&backend, DiscoveryConfig::default());
    let mut events = agent.events();

    agent.start(DiscoveryMethods::empty()).await.unwrap();
    discovered(&mut events).await;

    let expected = DiscoveryError::InvalidBluetoothAdapter(SystemError::INVALID_HANDLE);
    assert_eq!(
        next_event(&mut events).await,
        DiscoveryEvent::Error(expected.clone())
    );
    assert_eq!(agent.error().await.unwrap(), Some(expected));
    assert!(!agent.is_active().await.unwrap());
    assert_eq!(backend.closed(), vec![1]);
    assert_eq!(backend.le_passes(), 0);
}

#[tokio::test]
async fn first_step_failure_ends_the_scan() {
    let backend = FakeBackend::new();
    backend.push(Step::Fail(SystemError(5)));
    let agent = agent(&backend, DiscoveryConfig::default());
    let mut events = agent.events();

    agent.start(DiscoveryMethods::empty()).await.unwrap();

    assert_eq!(
        next_event(&mut events).await,
        DiscoveryEvent::Error(DiscoveryError::InputOutput(SystemError(5)))
    );
    assert!(!agent.is_active().await.unwrap());
    assert_eq!(backend.find_first_calls(), 1);
    assert!(backend.closed().is_empty());
    assert_eq!(backend.le_passes(), 0);
}

#[tokio::test]
async fn le_failure_ends_the_scan_and_keeps_the_cache() {
    let backend = FakeBackend::new();
    backend.set_le(&[(TAG_PATH, "Tag")], SystemError(5));
    let cache = LeAddressCache::new();
    let agent = DiscoveryAgent::with_le_cache(
        backend.clone(),
        DiscoveryConfig::default(),
        cache.clone(),
    );
    let mut events = agent.events();

    agent.start(DiscoveryMethods::empty()).await.unwrap();

    assert_eq!(
        next_event(&mut events).await,
        DiscoveryEvent::Error(DiscoveryError::InputOutput(SystemError(5)))
    );
    assert!(agent.discovered_devices().await.unwrap().is_empty());
    assert!(cache.is_empty());
    // An empty classic search never opens a handle.
    assert!(backend.closed().is_empty());
}

#[tokio::test]
async fn finished_scan_fills_the_le_cache() {
    let backend = FakeBackend::new();
    backend.set_le(&[(TAG_PATH, "Tag")], SystemError::NO_MORE_ITEMS);
    let cache = LeAddressCache::new();
    let agent = DiscoveryAgent::with_le_cache(
        backend.clone(),
        DiscoveryConfig::default(),
        cache.clone(),
    );

    let devices = agent.discover(DiscoveryMethods::empty()).await.unwrap();

    assert_eq!(devices.len(), 1);
    assert_eq!(cache.system_path(BDAddr::from(TAG)).as_deref(), Some(TAG_PATH));
}

#[tokio::test]
async fn system_path_lookup_runs_a_fresh_pass() {
    let backend = FakeBackend::new();
    backend.set_le(&[(PHONE_PATH, "Phone")], SystemError::NO_MORE_ITEMS);
    let agent = agent(&backend, DiscoveryConfig::default());

    assert_eq!(
        agent
            .le_device_system_path(BDAddr::from(PHONE))
            .await
            .unwrap()
            .as_deref(),
        Some(PHONE_PATH)
    );
    assert_eq!(
        agent.le_device_system_path(BDAddr::from(TAG)).await.unwrap(),
        None
    );
    assert_eq!(backend.le_passes(), 2);
}

#[tokio::test]
async fn discover_reports_failures() {
    let backend = FakeBackend::without_adapters();
    let agent = agent(&backend, DiscoveryConfig::default());

    match agent.discover(DiscoveryMethods::empty()).await {
        Err(Error::Discovery(DiscoveryError::NoLocalAdapter)) => {}
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn shutdown_waits_for_the_running_step() {
    let backend = FakeBackend::new();
    backend.push(device(PHONE, "Phone"));
    let release = backend.push_gated(device(HEADSET, "Headset"));
    let agent = agent(&backend, DiscoveryConfig::default());
    let mut events = agent.events();

    agent.start(DiscoveryMethods::empty()).await.unwrap();
    discovered(&mut events).await;

    let releaser = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        let _ = release.send(());
    });
    timeout(WAIT, agent.shutdown()).await.unwrap().unwrap();
    releaser.join().unwrap();

    assert_eq!(backend.closed(), vec![1]);
    // Every sender is gone, and no Canceled was sent before that.
    assert_eq!(timeout(WAIT, events.next()).await.unwrap(), None);
}

#[tokio::test]
async fn dropping_the_agent_closes_the_running_search() {
    let backend = FakeBackend::new();
    backend.push(device(PHONE, "Phone"));
    let release = backend.push_gated(device(HEADSET, "Headset"));
    let agent = agent(&backend, DiscoveryConfig::default());
    let mut events = agent.events();

    agent.start(DiscoveryMethods::empty()).await.unwrap();
    discovered(&mut events).await;
    drop(agent);

    let releaser = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        let _ = release.send(());
    });
    // The controller ends without emitting anything once the step returns.
    assert_eq!(timeout(WAIT, events.next()).await.unwrap(), None);
    releaser.join().unwrap();

    assert_eq!(backend.closed(), vec![1]);
    assert_eq!(backend.le_passes(), 0);
}

#[test]
fn no_discovery_method_is_supported() {
    assert!(DiscoveryAgent::<FakeBackend>::supported_discovery_methods().is_empty());
}
