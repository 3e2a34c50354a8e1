// btdiscover Source Code File
//
// Copyright 2026 btdiscover contributors. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Fans discovery events out to every subscriber.

use crate::api::DiscoveryEvent;
use futures::stream::{Stream, StreamExt};
use log::trace;
use std::pin::Pin;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

#[derive(Clone, Debug)]
pub(crate) struct EventHub {
    events_channel: broadcast::Sender<DiscoveryEvent>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (broadcast_sender, _) = broadcast::channel(capacity.max(1));
        EventHub {
            events_channel: broadcast_sender,
        }
    }

    pub fn emit(&self, event: DiscoveryEvent) {
        if let Err(lost) = self.events_channel.send(event) {
            trace!("Lost discovery event, while nothing subscribed: {:?}", lost);
        }
    }

    /// Subscribers only see events emitted after this call. Events a slow subscriber falls too
    /// far behind on are skipped.
    pub fn event_stream(&self) -> Pin<Box<dyn Stream<Item = DiscoveryEvent> + Send>> {
        let receiver = self.events_channel.subscribe();
        Box::pin(BroadcastStream::new(receiver).filter_map(|x| async move { x.ok() }))
    }
}
