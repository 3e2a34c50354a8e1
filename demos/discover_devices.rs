// btdiscover Source Code File
//
// Copyright 2026 btdiscover contributors. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

#[cfg(target_os = "windows")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use btdiscover::api::{DiscoveryEvent, DiscoveryMethods, TransportSet};
    use btdiscover::discovery::{DiscoveryAgent, DiscoveryConfig};
    use btdiscover::platform::PlatformBackend;
    use futures::stream::StreamExt;

    pretty_env_logger::init();

    let agent = DiscoveryAgent::new(PlatformBackend::new(), DiscoveryConfig::default());
    let mut events = agent.events();
    agent.start(DiscoveryMethods::empty()).await?;

    // Devices are reported again when they turn up on a second transport.
    while let Some(event) = events.next().await {
        match event {
            DiscoveryEvent::DeviceDiscovered(device) => {
                println!("DeviceDiscovered: {}", device);
            }
            DiscoveryEvent::Finished => break,
            DiscoveryEvent::Canceled => {
                println!("Discovery canceled");
                break;
            }
            DiscoveryEvent::Error(error) => {
                println!("Discovery failed: {}", error);
                break;
            }
        }
    }

    for device in agent.discovered_devices().await? {
        if !device.transports().contains(TransportSet::LOW_ENERGY) {
            continue;
        }
        if let Some(path) = agent.le_device_system_path(device.address()).await? {
            println!("{} -> {}", device.address(), path);
        }
    }
    agent.shutdown().await?;
    Ok(())
}

#[cfg(not(target_os = "windows"))]
fn main() {
    eprintln!("There is no native discovery backend for this platform.");
}
