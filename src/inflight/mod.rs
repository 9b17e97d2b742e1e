// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Outstanding-command tracking with retry/timeout policy (C3, spec §4.3).
//!
//! [`InflightRegistry`] is plain data: it does not take its own lock. It is
//! meant to live behind the single `ProtocolInterface` mutex described in
//! spec §5, alongside the discovery table and statistics, so that responses,
//! retries, and timeouts are all serialized through one critical section.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::types::{CommandKind, EntityID, SequenceID};
use crate::wire::AcmpDu;

/// How an inflight command was retired.
#[derive(Debug)]
pub enum InflightOutcome {
    /// The matching AECP response arrived; `tail` is the payload bytes
    /// following the AEM/MVU sub-header, `status` is the raw on-wire status.
    Response { status: u8, tail: Vec<u8> },
    /// The matching ACMP response arrived, fully parsed (ACMP carries no
    /// separate variable-length tail worth re-decoding from bytes).
    AcmpResponse(AcmpDu),
    /// The response's `command_type` didn't match the command's, or an AECP
    /// VU response carried a non-Milan protocol identifier (spec §4.5's
    /// protocol-violation guard). Kept distinct from `Response` because this
    /// has no device-reported status byte to round-trip — synthesizing one
    /// would be lossy, since `BaseProtocolViolation` has no wire encoding.
    ProtocolViolation,
    /// `PayloadError::NotImplemented` per the §4.2 special-size rule.
    NotImplemented,
    /// Retry budget was exhausted without a matching response.
    TimedOut,
    /// The registry was drained by facade teardown (spec §5 cancellation).
    Aborted,
}

/// The stored continuation for one outstanding command. Boxed as `FnOnce`
/// because retirement happens exactly once and ownership should move, not
/// borrow (spec §3.5: "an entry is retired exactly once").
pub type Completion = Box<dyn FnOnce(InflightOutcome) + Send>;

/// One outstanding AECP or ACMP command awaiting a response.
pub struct InflightEntry {
    pub target: EntityID,
    pub sequence_id: SequenceID,
    pub kind: CommandKind,
    pub command_type: u16,
    completion: Completion,
    retries_remaining: u8,
    deadline: Instant,
    timeout: Duration,
    /// The original frame bytes, kept for bit-identical retransmission.
    pub frame_bytes: Vec<u8>,
    pub sent_at: Instant,
}

impl InflightEntry {
    /// Invokes the stored completion exactly once, consuming the entry.
    /// Callers must have already released the `ProtocolInterface` lock (§5:
    /// "no user callback may be invoked while the lock is held").
    pub fn finish(self, outcome: InflightOutcome) {
        (self.completion)(outcome);
    }
}

impl std::fmt::Debug for InflightEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InflightEntry")
            .field("target", &self.target)
            .field("sequence_id", &self.sequence_id)
            .field("kind", &self.kind)
            .field("command_type", &self.command_type)
            .field("retries_remaining", &self.retries_remaining)
            .finish_non_exhaustive()
    }
}

/// Per-target, per-sequence-id outstanding-command table (spec §3.5, §4.3).
#[derive(Default)]
pub struct InflightRegistry {
    by_target: HashMap<EntityID, HashMap<SequenceID, InflightEntry>>,
}

impl InflightRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly-sent command. `max_attempts` counts the initial
    /// send, so `2` means "one retransmission" (spec §4.3's AECP default).
    #[allow(clippy::too_many_arguments)]
    pub fn register(
        &mut self,
        target: EntityID,
        sequence_id: SequenceID,
        kind: CommandKind,
        command_type: u16,
        frame_bytes: Vec<u8>,
        timeout: Duration,
        max_attempts: u8,
        now: Instant,
        completion: Completion,
    ) {
        let entry = InflightEntry {
            target,
            sequence_id,
            kind,
            command_type,
            completion,
            retries_remaining: max_attempts.saturating_sub(1),
            deadline: now + timeout,
            timeout,
            frame_bytes,
            sent_at: now,
        };
        self.by_target.entry(target).or_default().insert(sequence_id, entry);
    }

    #[must_use]
    pub fn is_registered(&self, target: EntityID, sequence_id: SequenceID) -> bool {
        self.by_target
            .get(&target)
            .map(|table| table.contains_key(&sequence_id))
            .unwrap_or(false)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_target.values().map(HashMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes and returns an inflight entry without invoking its completion,
    /// so the caller (the dispatcher, C5) can inspect `command_type` for the
    /// protocol-violation check (spec §4.5) before deciding what outcome to
    /// retire it with.
    #[must_use]
    pub fn remove(&mut self, target: EntityID, sequence_id: SequenceID) -> Option<InflightEntry> {
        let table = self.by_target.get_mut(&target)?;
        let entry = table.remove(&sequence_id);
        if table.is_empty() {
            self.by_target.remove(&target);
        }
        entry
    }

    /// Sweeps every entry past its deadline, retransmitting (decrementing
    /// `retries_remaining`) or removing it for the caller to retire.
    ///
    /// Retirement is left to the caller rather than done inline, because this
    /// is typically invoked while the `ProtocolInterface` lock (spec §5) is
    /// held: a completion must never fire under that lock, so the timed-out
    /// entries are handed back for the caller to `.finish(TimedOut)` after
    /// releasing it.
    #[must_use]
    pub fn sweep_expired(&mut self, now: Instant) -> (Vec<(EntityID, SequenceID, Vec<u8>)>, Vec<InflightEntry>) {
        let mut retransmits = Vec::new();
        let mut timed_out = Vec::new();
        let mut expired_keys = Vec::new();
        for (target, table) in &self.by_target {
            for (seq, entry) in table {
                if now >= entry.deadline {
                    expired_keys.push((*target, *seq));
                }
            }
        }
        for (target, seq) in expired_keys {
            let Some(table) = self.by_target.get_mut(&target) else { continue };
            let Some(entry) = table.get_mut(&seq) else { continue };
            if entry.retries_remaining > 0 {
                entry.retries_remaining -= 1;
                entry.deadline = now + entry.timeout;
                retransmits.push((target, seq, entry.frame_bytes.clone()));
            } else {
                let entry = table.remove(&seq).expect("checked above");
                if table.is_empty() {
                    self.by_target.remove(&target);
                }
                timed_out.push(entry);
            }
        }
        (retransmits, timed_out)
    }

    /// Removes every live entry for the caller to retire with
    /// [`InflightOutcome::Aborted`] (spec §5 teardown semantics). Like
    /// [`InflightRegistry::sweep_expired`], retirement is left to the caller
    /// so it happens outside the `ProtocolInterface` lock.
    #[must_use]
    pub fn drain_all(&mut self) -> Vec<InflightEntry> {
        self.by_target
            .drain()
            .flat_map(|(_, table)| table.into_values())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn noop_completion(counter: Arc<AtomicU32>) -> Completion {
        Box::new(move |_outcome| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn register_and_remove_round_trips() {
        let mut registry = InflightRegistry::new();
        let counter = Arc::new(AtomicU32::new(0));
        let target = EntityID(1);
        let seq = SequenceID(5);
        registry.register(
            target,
            seq,
            CommandKind::Aem,
            0x0004,
            vec![],
            Duration::from_millis(250),
            2,
            Instant::now(),
            noop_completion(counter.clone()),
        );
        assert!(registry.is_registered(target, seq));
        let entry = registry.remove(target, seq).unwrap();
        assert_eq!(entry.command_type, 0x0004);
        assert!(!registry.is_registered(target, seq));
    }

    #[test]
    fn sweep_retransmits_once_then_times_out() {
        let mut registry = InflightRegistry::new();
        let counter = Arc::new(AtomicU32::new(0));
        let target = EntityID(2);
        let seq = SequenceID(1);
        let start = Instant::now();
        registry.register(
            target,
            seq,
            CommandKind::Aem,
            0x0024,
            vec![9, 9, 9],
            Duration::from_millis(250),
            2,
            start,
            noop_completion(counter.clone()),
        );
        let (first_retransmits, first_timed_out) =
            registry.sweep_expired(start + Duration::from_millis(250));
        assert_eq!(first_retransmits.len(), 1);
        assert_eq!(first_retransmits[0].2, vec![9, 9, 9]);
        assert!(first_timed_out.is_empty());
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        let (second_retransmits, second_timed_out) =
            registry.sweep_expired(start + Duration::from_millis(500));
        assert!(second_retransmits.is_empty());
        assert_eq!(second_timed_out.len(), 1);
        for entry in second_timed_out {
            entry.finish(InflightOutcome::TimedOut);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!registry.is_registered(target, seq));
    }

    #[test]
    fn drain_all_returns_every_live_entry() {
        let mut registry = InflightRegistry::new();
        let counter = Arc::new(AtomicU32::new(0));
        for i in 0..3u16 {
            registry.register(
                EntityID(i as u64),
                SequenceID(i),
                CommandKind::Acmp,
                0,
                vec![],
                Duration::from_millis(250),
                1,
                Instant::now(),
                noop_completion(counter.clone()),
            );
        }
        assert_eq!(registry.len(), 3);
        let drained = registry.drain_all();
        assert_eq!(drained.len(), 3);
        for entry in drained {
            entry.finish(InflightOutcome::Aborted);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(registry.is_empty());
    }

    #[test]
    fn acmp_commands_use_a_single_attempt_by_convention() {
        let mut registry = InflightRegistry::new();
        let counter = Arc::new(AtomicU32::new(0));
        let start = Instant::now();
        registry.register(
            EntityID(9),
            SequenceID(9),
            CommandKind::Acmp,
            0,
            vec![],
            Duration::from_millis(250),
            crate::config::ACMP_MAX_ATTEMPTS,
            start,
            noop_completion(counter.clone()),
        );
        let (retransmits, timed_out) = registry.sweep_expired(start + Duration::from_millis(250));
        assert!(retransmits.is_empty());
        assert_eq!(timed_out.len(), 1);
        for entry in timed_out {
            entry.finish(InflightOutcome::TimedOut);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
