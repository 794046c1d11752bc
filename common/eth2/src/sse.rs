//! Long-lived subscription to a beacon node's `/eth/v1/events` SSE stream.
//!
//! Reconnects on stream error or silence, the same shape as Lighthouse's own
//! `notifier` tasks: a loop around `tokio::select!` racing the next frame
//! against a watchdog timer, with an exponential backoff between connection
//! attempts so a beacon node that's down doesn't get hammered.

use crate::client::BeaconNodeHttpClient;
use crate::types::{EventTopic, RawEvent};
use futures_util::StreamExt;
use reqwest_eventsource::{Event as EsEvent, EventSource};
use slog::{debug, warn, Logger};
use std::time::Duration;
use tokio::sync::mpsc;

/// No frame (including the SSE protocol's own comment keep-alives) for this
/// long means the connection is considered stale and is torn down.
const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Initial delay before a reconnect attempt after a dropped connection.
const INITIAL_BACKOFF: Duration = Duration::from_secs(10);

/// Backoff never grows past this, so a prolonged outage still retries at a
/// sane cadence rather than drifting towards silence.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Spawns a background task that maintains a subscription to `topics` on
/// `client`, forwarding decoded events to the returned channel. The task
/// runs until the receiver is dropped.
pub fn subscribe(
    client: BeaconNodeHttpClient,
    topics: Vec<EventTopic>,
    log: Logger,
) -> mpsc::Receiver<RawEvent> {
    let (tx, rx) = mpsc::channel(256);
    tokio::spawn(run(client, topics, log, tx));
    rx
}

async fn run(
    client: BeaconNodeHttpClient,
    topics: Vec<EventTopic>,
    log: Logger,
    tx: mpsc::Sender<RawEvent>,
) {
    let mut backoff = INITIAL_BACKOFF;

    loop {
        if tx.is_closed() {
            return;
        }

        let url = match client.events_url(&topics) {
            Ok(url) => url,
            Err(e) => {
                warn!(log, "Could not build events URL"; "error" => %e);
                tokio::time::sleep(backoff).await;
                backoff = next_backoff(backoff);
                continue;
            }
        };

        debug!(log, "Subscribing to beacon event stream"; "url" => %url);

        let mut source = EventSource::get(url);

        let mut connected_ok = false;

        loop {
            let next = tokio::time::timeout(WATCHDOG_TIMEOUT, source.next()).await;
            match next {
                Err(_elapsed) => {
                    warn!(log, "Event stream watchdog timed out, reconnecting";
                        "timeout_secs" => WATCHDOG_TIMEOUT.as_secs());
                    break;
                }
                Ok(None) => {
                    warn!(log, "Event stream closed by server, reconnecting");
                    break;
                }
                Ok(Some(Ok(EsEvent::Open))) => {
                    connected_ok = true;
                    backoff = INITIAL_BACKOFF;
                    debug!(log, "Event stream connected");
                }
                Ok(Some(Ok(EsEvent::Message(message)))) => {
                    connected_ok = true;
                    let event_field = format!("event:{}", message.event);
                    let data_field = format!("data:{}", message.data);
                    match RawEvent::from_sse_message(&event_field, &data_field) {
                        Ok(event) => {
                            if tx.send(event).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => {
                            debug!(log, "Discarding malformed event frame"; "error" => %e);
                        }
                    }
                }
                Ok(Some(Err(e))) => {
                    warn!(log, "Event stream error, reconnecting"; "error" => %e);
                    break;
                }
            }
        }

        source.close();

        if !connected_ok {
            warn!(log, "Retrying beacon event subscription"; "backoff_secs" => backoff.as_secs());
        }
        tokio::time::sleep(backoff).await;
        backoff = next_backoff(backoff);
    }
}

fn next_backoff(current: Duration) -> Duration {
    std::cmp::min(current * 2, MAX_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_cap() {
        let mut b = INITIAL_BACKOFF;
        for _ in 0..20 {
            b = next_backoff(b);
        }
        assert_eq!(b, MAX_BACKOFF);
    }

    #[test]
    fn backoff_starts_at_ten_seconds() {
        assert_eq!(INITIAL_BACKOFF, Duration::from_secs(10));
    }
}
