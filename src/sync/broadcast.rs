//! In-process fan-out of fetched payloads.
//!
//! One broadcasting engine fetches; every receiver applies the same raw
//! payloads through its own filter, merge and sort. Completed payloads are
//! stamped with the sequence of the primary payload they belong to, so a
//! receiver never merges completed tasks onto a newer primary sync.

use std::sync::mpsc;

use chrono::{DateTime, TimeZone, Utc};
use tracing::debug;

use crate::io::payload_io::FetchError;
use crate::model::payload::{CompletedPayload, SyncPayload};
use crate::sync::engine::{CompletedFollowUp, CompletedRequest, Fetcher, SyncEngine, SyncError, SyncRequest};

#[derive(Debug, Clone)]
pub enum Broadcast {
    Sync { seq: u64, payload: SyncPayload },
    Completed { seq: u64, payload: CompletedPayload },
}

/// Publishing side. Receivers that hung up are dropped on the next send.
#[derive(Debug, Default)]
pub struct BroadcastHub {
    seq: u64,
    subscribers: Vec<mpsc::Sender<Broadcast>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        BroadcastHub::default()
    }

    pub fn subscribe(&mut self) -> BroadcastReceiver {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        BroadcastReceiver {
            rx,
            last_sync_seq: None,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Publish a primary payload under a fresh sequence number
    pub fn publish_sync(&mut self, payload: &SyncPayload) -> u64 {
        self.seq += 1;
        let seq = self.seq;
        self.send(Broadcast::Sync {
            seq,
            payload: payload.clone(),
        });
        seq
    }

    /// Publish a completed payload belonging to the latest primary payload
    pub fn publish_completed(&mut self, payload: &CompletedPayload) {
        let seq = self.seq;
        self.send(Broadcast::Completed {
            seq,
            payload: payload.clone(),
        });
    }

    fn send(&mut self, message: Broadcast) {
        self.subscribers.retain(|tx| tx.send(message.clone()).is_ok());
        debug!(subscribers = self.subscribers.len(), "published payload");
    }
}

/// What a receiver did with its pending messages
#[derive(Debug, Default)]
pub struct ReceiveReport {
    pub applied_sync: usize,
    pub applied_completed: usize,
    pub errors: Vec<SyncError>,
}

pub struct BroadcastReceiver {
    rx: mpsc::Receiver<Broadcast>,
    last_sync_seq: Option<u64>,
}

impl BroadcastReceiver {
    /// Apply every queued message to `engine` without blocking. A primary
    /// payload whose completed follow-up never arrived (the broadcaster
    /// skipped or failed it) still finishes the cycle.
    pub fn apply_pending<Tz: TimeZone>(&mut self, engine: &mut SyncEngine<Tz>, now: DateTime<Utc>) -> ReceiveReport {
        let mut report = ReceiveReport::default();
        let mut awaiting_completed = false;
        while let Ok(message) = self.rx.try_recv() {
            match message {
                Broadcast::Sync { seq, payload } => match engine.apply_sync(payload, now) {
                    Ok(outcome) => {
                        self.last_sync_seq = Some(seq);
                        awaiting_completed = matches!(outcome.follow_up, CompletedFollowUp::Requested(_));
                        report.applied_sync += 1;
                    }
                    Err(e) => report.errors.push(e),
                },
                Broadcast::Completed { seq, payload } => {
                    if self.last_sync_seq != Some(seq) {
                        debug!(seq, last = ?self.last_sync_seq, "dropping completed payload for another sync");
                        continue;
                    }
                    awaiting_completed = false;
                    match engine.apply_completed(payload, engine.generation(), now) {
                        Ok(_) => report.applied_completed += 1,
                        Err(e) => report.errors.push(e),
                    }
                }
            }
        }
        if awaiting_completed {
            debug!(seq = ?self.last_sync_seq, "no completed payload published, showing primary data");
            engine.finish_cycle();
        }
        report
    }
}

/// Fetcher wrapper that republishes everything it fetches
pub struct PublishingFetcher<'a, F> {
    inner: &'a mut F,
    hub: &'a mut BroadcastHub,
}

impl<'a, F: Fetcher> PublishingFetcher<'a, F> {
    pub fn new(inner: &'a mut F, hub: &'a mut BroadcastHub) -> Self {
        PublishingFetcher { inner, hub }
    }
}

impl<F: Fetcher> Fetcher for PublishingFetcher<'_, F> {
    fn fetch_sync(&mut self, request: &SyncRequest) -> Result<SyncPayload, FetchError> {
        let payload = self.inner.fetch_sync(request)?;
        self.hub.publish_sync(&payload);
        Ok(payload)
    }

    fn fetch_completed(&mut self, request: &CompletedRequest) -> Result<CompletedPayload, FetchError> {
        let payload = self.inner.fetch_completed(request)?;
        self.hub.publish_completed(&payload);
        Ok(payload)
    }
}
