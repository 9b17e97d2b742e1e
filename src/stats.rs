// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-entity statistics counters (C7, spec §4.7).

use std::collections::HashMap;
use std::time::Duration;

use crate::types::EntityID;

/// Running counters for one remote entity. Response-time mean/stdev are kept
/// as a running sum and sum-of-squares rather than a full sample vector, so a
/// long-lived entity's stats stay O(1) in memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityStats {
    pub retries: u64,
    pub timeouts: u64,
    pub unexpected_responses: u64,
    pub successful_round_trips: u64,
    pub unsolicited_received: u64,
    response_time_sum: f64,
    response_time_sum_sq: f64,
}

impl EntityStats {
    /// Records a completed round trip's latency for the mean/stdev estimators.
    pub fn record_round_trip(&mut self, latency: Duration) {
        self.successful_round_trips += 1;
        let millis = latency.as_secs_f64() * 1000.0;
        self.response_time_sum += millis;
        self.response_time_sum_sq += millis * millis;
    }

    /// Mean response time in milliseconds, or `0.0` with no samples yet.
    #[must_use]
    pub fn response_time_mean_millis(&self) -> f64 {
        if self.successful_round_trips == 0 {
            0.0
        } else {
            self.response_time_sum / self.successful_round_trips as f64
        }
    }

    /// Population standard deviation of response time in milliseconds.
    #[must_use]
    pub fn response_time_stdev_millis(&self) -> f64 {
        let n = self.successful_round_trips as f64;
        if n == 0.0 {
            return 0.0;
        }
        let mean = self.response_time_sum / n;
        let variance = (self.response_time_sum_sq / n) - (mean * mean);
        variance.max(0.0).sqrt()
    }
}

/// One change to an [`EntityStats`] counter, surfaced as a typed event for
/// external aggregation (spec §4.7: "the facade surfaces each counter change").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatEvent {
    Retry,
    Timeout,
    UnexpectedResponse,
    SuccessfulRoundTrip,
    UnsolicitedReceived,
}

/// Per-entity statistics table, guarded by the same lock as the rest of the
/// `ProtocolInterface` state (spec §5).
#[derive(Debug, Default)]
pub struct StatsTable {
    by_entity: HashMap<EntityID, EntityStats>,
}

impl StatsTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, entity: EntityID) -> EntityStats {
        self.by_entity.get(&entity).copied().unwrap_or_default()
    }

    pub fn record(&mut self, entity: EntityID, event: StatEvent) {
        let entry = self.by_entity.entry(entity).or_default();
        match event {
            StatEvent::Retry => entry.retries += 1,
            StatEvent::Timeout => entry.timeouts += 1,
            StatEvent::UnexpectedResponse => entry.unexpected_responses += 1,
            StatEvent::SuccessfulRoundTrip => entry.successful_round_trips += 1,
            StatEvent::UnsolicitedReceived => entry.unsolicited_received += 1,
        }
    }

    pub fn record_round_trip(&mut self, entity: EntityID, latency: Duration) {
        self.by_entity.entry(entity).or_default().record_round_trip(latency);
    }

    /// Drops all counters for an entity, e.g. once it goes offline.
    pub fn remove(&mut self, entity: EntityID) {
        self.by_entity.remove(&entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_accumulate_per_entity() {
        let mut table = StatsTable::new();
        let e = EntityID(1);
        table.record(e, StatEvent::Retry);
        table.record(e, StatEvent::Retry);
        table.record(e, StatEvent::Timeout);
        let stats = table.get(e);
        assert_eq!(stats.retries, 2);
        assert_eq!(stats.timeouts, 1);
    }

    #[test]
    fn unknown_entity_reports_zeroed_stats() {
        let table = StatsTable::new();
        let stats = table.get(EntityID(42));
        assert_eq!(stats.retries, 0);
        assert_eq!(stats.response_time_mean_millis(), 0.0);
    }

    #[test]
    fn response_time_mean_and_stdev_track_samples() {
        let mut stats = EntityStats::default();
        stats.record_round_trip(Duration::from_millis(100));
        stats.record_round_trip(Duration::from_millis(200));
        assert!((stats.response_time_mean_millis() - 150.0).abs() < 1e-9);
        assert!(stats.response_time_stdev_millis() > 0.0);
    }

    #[test]
    fn remove_clears_entity_counters() {
        let mut table = StatsTable::new();
        let e = EntityID(7);
        table.record(e, StatEvent::Retry);
        table.remove(e);
        assert_eq!(table.get(e).retries, 0);
    }
}
