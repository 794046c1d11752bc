//! Decorated publisher (C6): consumes raw SSE events and republishes them,
//! decorated, on the bus.
//!
//! For `block` events specifically, the full signed body is fetched from
//! upstream before republishing — that fetch can block for a while, so it
//! runs in a detached worker per event with a bounded in-flight count
//! (excess events still propagate the raw event, just without the
//! enrichment).

use crate::topics::{BeaconBlock, Bus, Event, Topic};
use eth2_client::{BeaconNodeHttpClient, BlockId, RawEvent};
use slog::{debug, warn, Logger};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Events still in flight fetching their enrichment. Beyond this, a new
/// `block` event is republished raw-only and its enrichment is dropped.
const DEFAULT_MAX_IN_FLIGHT: usize = 8;

pub struct DecoratedPublisher {
    client: BeaconNodeHttpClient,
    bus: Arc<Bus>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: usize,
    log: Logger,
}

impl DecoratedPublisher {
    pub fn new(client: BeaconNodeHttpClient, bus: Arc<Bus>, log: Logger) -> Self {
        Self::with_max_in_flight(client, bus, DEFAULT_MAX_IN_FLIGHT, log)
    }

    pub fn with_max_in_flight(
        client: BeaconNodeHttpClient,
        bus: Arc<Bus>,
        max_in_flight: usize,
        log: Logger,
    ) -> Self {
        Self {
            client,
            bus,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight,
            log,
        }
    }

    /// Drains `raw_events` until the channel closes, decorating and
    /// republishing each one. Runs until the sender side of the channel is
    /// dropped (the SSE subscription ending).
    pub async fn run(&self, mut raw_events: mpsc::Receiver<RawEvent>) {
        while let Some(raw) = raw_events.recv().await {
            self.bus.publish(Topic::RawEvent, Event::Raw(raw.clone()));
            self.handle(raw);
        }
    }

    fn handle(&self, raw: RawEvent) {
        match raw {
            RawEvent::Head(head) => self.bus.publish(Topic::Head, Event::Head(head)),
            RawEvent::Attestation(attestation) => {
                self.bus.publish(Topic::Attestation, Event::Attestation(attestation))
            }
            RawEvent::VoluntaryExit(exit) => {
                self.bus.publish(Topic::VoluntaryExit, Event::VoluntaryExit(exit))
            }
            RawEvent::ChainReorg(reorg) => {
                self.bus.publish(Topic::ChainReorg, Event::ChainReorg(reorg))
            }
            RawEvent::FinalizedCheckpoint(checkpoint) => self.bus.publish(
                Topic::FinalizedCheckpoint,
                Event::FinalizedCheckpoint(checkpoint),
            ),
            RawEvent::Block(block_event) => {
                self.bus.publish(Topic::Block, Event::Block(block_event.clone()));
                self.spawn_enrichment(block_event);
            }
        }
    }

    fn spawn_enrichment(&self, block_event: eth2_client::SseBlock) {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst);
        if current >= self.max_in_flight {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            debug!(self.log, "Dropping block enrichment, too many in flight";
                "slot" => %block_event.slot, "max_in_flight" => self.max_in_flight);
            return;
        }

        let client = self.client.clone();
        let bus = self.bus.clone();
        let in_flight = self.in_flight.clone();
        let log = self.log.clone();

        tokio::spawn(async move {
            let result = client
                .get_beacon_block(BlockId::Slot(block_event.slot))
                .await;
            in_flight.fetch_sub(1, Ordering::SeqCst);

            match result {
                Ok(Some(block)) => {
                    bus.publish(
                        Topic::BeaconBlock,
                        Event::BeaconBlock(BeaconBlock {
                            raw_event: block_event,
                            block,
                        }),
                    );
                }
                Ok(None) => {
                    debug!(log, "Block enrichment found no block for slot"; "slot" => %block_event.slot);
                }
                Err(e) => {
                    warn!(log, "Block enrichment request failed"; "slot" => %block_event.slot, "error" => %e);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eth2_client::SseHead;
    use std::sync::Mutex;

    fn null_log() -> Logger {
        Logger::root(slog::Discard.fuse(), slog::o!())
    }

    #[tokio::test]
    async fn head_events_republish_on_head_topic() {
        let bus = Arc::new(Bus::new(null_log()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        bus.subscribe(Topic::Head, move |event: &Event| {
            if let Event::Head(head) = event {
                seen2.lock().unwrap().push(head.slot);
            }
            Ok(())
        });

        let client = BeaconNodeHttpClient::new(reqwest::Url::parse("http://localhost:5052/").unwrap());
        let publisher = DecoratedPublisher::new(client, bus, null_log());

        publisher.handle(RawEvent::Head(SseHead {
            slot: slot_clock::Slot::new(1),
            block: eth2_client::Root::default(),
            state: eth2_client::Root::default(),
            current_duty_dependent_root: eth2_client::Root::default(),
            previous_duty_dependent_root: eth2_client::Root::default(),
            epoch_transition: false,
        }));

        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
