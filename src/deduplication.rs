//! # Update Deduplication Module
//!
//! Telegram redelivers a webhook update whenever it does not receive a timely
//! `200`, so the same `update_id` can reach the bot more than once. This module
//! remembers recently seen update ids for a bounded time window.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct SeenUpdates {
    /// update id -> (first seen, arrival sequence number)
    entries: HashMap<i64, (Instant, u64)>,
    /// Arrival order; may still hold ids that were forgotten since
    arrival: VecDeque<(i64, u64)>,
    next_seq: u64,
    duplicates: u64,
}

impl SeenUpdates {
    fn is_current(&self, update_id: i64, seq: u64) -> bool {
        self.entries.get(&update_id).is_some_and(|(_, s)| *s == seq)
    }

    fn pop_oldest(&mut self) {
        while let Some((id, seq)) = self.arrival.pop_front() {
            if self.is_current(id, seq) {
                self.entries.remove(&id);
                return;
            }
        }
    }

    fn purge_expired(&mut self, now: Instant, ttl: Duration) {
        while let Some(&(id, seq)) = self.arrival.front() {
            match self.entries.get(&id) {
                Some((seen, s)) if *s == seq && now.duration_since(*seen) < ttl => break,
                Some((_, s)) if *s == seq => {
                    self.entries.remove(&id);
                }
                _ => {}
            }
            self.arrival.pop_front();
        }
    }
}

/// Bounded, time-windowed set of seen update ids
#[derive(Debug)]
pub struct UpdateDeduplicator {
    seen: Mutex<SeenUpdates>,
    ttl: Duration,
    max_entries: usize,
}

impl UpdateDeduplicator {
    pub fn new(ttl_secs: u64, max_entries: usize) -> Self {
        Self {
            seen: Mutex::new(SeenUpdates::default()),
            ttl: Duration::from_secs(ttl_secs.max(1)),
            max_entries: max_entries.max(1),
        }
    }

    /// Record `update_id`; true when it was already seen inside the window
    pub fn is_duplicate(&self, update_id: i64) -> bool {
        let now = Instant::now();
        let mut seen = self.seen.lock();
        seen.purge_expired(now, self.ttl);

        if seen.entries.contains_key(&update_id) {
            seen.duplicates += 1;
            return true;
        }

        while seen.entries.len() >= self.max_entries {
            seen.pop_oldest();
        }
        let seq = seen.next_seq;
        seen.next_seq += 1;
        seen.entries.insert(update_id, (now, seq));
        seen.arrival.push_back((update_id, seq));
        false
    }

    /// Drop an update id so a redelivery is processed again
    ///
    /// Used when an update was recorded but could not be handed to the dispatcher.
    pub fn forget(&self, update_id: i64) {
        self.seen.lock().entries.remove(&update_id);
    }

    pub fn stats(&self) -> DeduplicationStats {
        let now = Instant::now();
        let seen = self.seen.lock();
        let active_entries = seen
            .entries
            .values()
            .filter(|(first_seen, _)| now.duration_since(*first_seen) < self.ttl)
            .count();

        DeduplicationStats {
            total_entries: seen.entries.len(),
            active_entries,
            total_duplicates: seen.duplicates,
            max_entries: self.max_entries,
            ttl: self.ttl,
        }
    }

    pub fn clear(&self) {
        let mut seen = self.seen.lock();
        seen.entries.clear();
        seen.arrival.clear();
    }
}

/// Snapshot of the deduplicator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeduplicationStats {
    pub total_entries: usize,
    /// Entries still inside the TTL window
    pub active_entries: usize,
    /// Redeliveries dropped since startup
    pub total_duplicates: u64,
    pub max_entries: usize,
    pub ttl: Duration,
}

impl Default for UpdateDeduplicator {
    fn default() -> Self {
        Self::new(300, 10_000)
    }
}

pub type SharedDeduplicator = Arc<UpdateDeduplicator>;

pub fn create_shared_deduplicator(ttl_secs: u64, max_entries: usize) -> SharedDeduplicator {
    Arc::new(UpdateDeduplicator::new(ttl_secs, max_entries))
}
