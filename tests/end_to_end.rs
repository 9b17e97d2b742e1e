// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integration tests that drive [`avdecc_engine::LocalEntity`] end to end over
//! [`FakeTransport`], by hand-building raw frames exactly as a peer on the
//! wire would send them.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use avdecc_engine::config::EngineConfigBuilder;
use avdecc_engine::discovery::DiscoveredEntity;
use avdecc_engine::engine::DispatchedAem;
use avdecc_engine::facade::{LocalEntity, LocalEntityBuilder, LocalEntityDelegate, Roles};
use avdecc_engine::payload::aem_types::AemCommandType;
use avdecc_engine::payload::families::{self, NamePayload};
use avdecc_engine::payload::mvu::{self, MilanInfo, MvuCommandType};
use avdecc_engine::status::{AemCommandStatus, MvuCommandStatus};
use avdecc_engine::transport::fake::FakeTransport;
use avdecc_engine::types::{
    AvdeccFixedString, ConfigurationIndex, DescriptorIndex, DescriptorType, EntityCapabilities,
    MacAddress,
};
use avdecc_engine::wire::{
    AcmpDu, AcmpMessageType, AdpDu, AdpMessageType, AecpCommon, AecpMessageType, AemSubHeader,
    CommonHeader, Cursor, CursorMut, EthernetHeader, Frame, MvuSubHeader, AVDECC_ETHERTYPE,
    ETHERNET_MIN_FRAME,
};
use avdecc_engine::EntityID;

const CONTROLLER_ID: EntityID = EntityID(0x0001_0203_0405_0607);
const CONTROLLER_MAC: MacAddress = MacAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
const TARGET_ID: EntityID = EntityID(0x00AA_BBCC_DDEE_FF00);
const TARGET_MAC: MacAddress = MacAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0x02]);

#[derive(Default)]
struct TestDelegate {
    online: Mutex<Vec<DiscoveredEntity>>,
    updated: Mutex<Vec<DiscoveredEntity>>,
    offline: Mutex<Vec<EntityID>>,
    unsolicited: Mutex<Vec<(EntityID, DispatchedAem)>>,
    acmp_sniffed: Mutex<Vec<AcmpDu>>,
}

impl LocalEntityDelegate for TestDelegate {
    fn on_remote_entity_online(&self, entity: &DiscoveredEntity) {
        self.online.lock().unwrap().push(entity.clone());
    }

    fn on_remote_entity_updated(&self, entity: &DiscoveredEntity) {
        self.updated.lock().unwrap().push(entity.clone());
    }

    fn on_remote_entity_offline(&self, entity_id: EntityID) {
        self.offline.lock().unwrap().push(entity_id);
    }

    fn on_unsolicited_aem(&self, source: EntityID, aem: DispatchedAem) {
        self.unsolicited.lock().unwrap().push((source, aem));
    }

    fn on_acmp_response_sniffed(&self, response: &AcmpDu) {
        self.acmp_sniffed.lock().unwrap().push(*response);
    }
}

fn wrap_frame(destination: MacAddress, source: MacAddress, body: &[u8]) -> Vec<u8> {
    let frame_len = (EthernetHeader::LEN + body.len()).max(ETHERNET_MIN_FRAME);
    let mut buf = vec![0u8; frame_len];
    let mut cursor = CursorMut::new(&mut buf);
    EthernetHeader {
        destination,
        source,
        ethertype: AVDECC_ETHERTYPE,
    }
    .serialize(&mut cursor)
    .unwrap();
    cursor.write_bytes(body).unwrap();
    buf
}

fn sample_adp(target: EntityID, available_index: u32) -> AdpDu {
    AdpDu {
        message_type: AdpMessageType::EntityAvailable,
        valid_time_units: 5,
        entity_id: target,
        entity_model_id: Default::default(),
        entity_capabilities: EntityCapabilities::AEM_SUPPORTED,
        talker_stream_sources: 0,
        talker_capabilities: Default::default(),
        listener_stream_sinks: 0,
        listener_capabilities: Default::default(),
        controller_capabilities: Default::default(),
        available_index,
        gptp_grandmaster_id: EntityID::NULL,
        gptp_domain_number: 0,
        identify_control_index: 0,
        interface_index: 0,
        association_id: Default::default(),
    }
}

fn adp_frame(du: &AdpDu, source_mac: MacAddress) -> Vec<u8> {
    let mut body = vec![0u8; CommonHeader::LEN + AdpDu::BODY_LEN];
    let mut cursor = CursorMut::new(&mut body);
    du.common_header().serialize(&mut cursor).unwrap();
    du.serialize_body(&mut cursor).unwrap();
    wrap_frame(MacAddress::BROADCAST, source_mac, &body)
}

fn aem_response_frame(
    target_entity_id: EntityID,
    controller_entity_id: EntityID,
    sequence_id: u16,
    status: u8,
    unsolicited: bool,
    command_type: u16,
    payload_bytes: &[u8],
) -> Vec<u8> {
    let common = AecpCommon {
        message_type: AecpMessageType::AemResponse,
        status,
        target_entity_id,
        controller_entity_id,
        sequence_id,
    };
    let body_len = AemSubHeader::LEN + payload_bytes.len();
    let mut body = vec![0u8; CommonHeader::LEN + AecpCommon::LEN + body_len];
    let mut cursor = CursorMut::new(&mut body);
    common.common_header(body_len as u16).serialize(&mut cursor).unwrap();
    common.serialize(&mut cursor).unwrap();
    AemSubHeader {
        unsolicited,
        command_type,
    }
    .serialize(&mut cursor)
    .unwrap();
    cursor.write_bytes(payload_bytes).unwrap();
    wrap_frame(CONTROLLER_MAC, TARGET_MAC, &body)
}

fn mvu_response_frame(
    target_entity_id: EntityID,
    controller_entity_id: EntityID,
    sequence_id: u16,
    status: u8,
    command_type: u16,
    payload_bytes: &[u8],
) -> Vec<u8> {
    let common = AecpCommon {
        message_type: AecpMessageType::VendorUniqueResponse,
        status,
        target_entity_id,
        controller_entity_id,
        sequence_id,
    };
    let body_len = MvuSubHeader::LEN + payload_bytes.len();
    let mut body = vec![0u8; CommonHeader::LEN + AecpCommon::LEN + body_len];
    let mut cursor = CursorMut::new(&mut body);
    common.common_header(body_len as u16).serialize(&mut cursor).unwrap();
    common.serialize(&mut cursor).unwrap();
    MvuSubHeader {
        protocol_id: avdecc_engine::wire::MILAN_PROTOCOL_ID,
        unsolicited: false,
        command_type,
    }
    .serialize(&mut cursor)
    .unwrap();
    cursor.write_bytes(payload_bytes).unwrap();
    wrap_frame(CONTROLLER_MAC, TARGET_MAC, &body)
}

fn acmp_frame(du: &AcmpDu) -> Vec<u8> {
    let mut body = vec![0u8; CommonHeader::LEN + AcmpDu::BODY_LEN];
    let mut cursor = CursorMut::new(&mut body);
    du.common_header().serialize(&mut cursor).unwrap();
    du.serialize_body(&mut cursor).unwrap();
    wrap_frame(MacAddress::BROADCAST, TARGET_MAC, &body)
}

/// Parses a command this crate sent, returning its AECP envelope and tail.
fn parse_sent_aecp(frame_bytes: &[u8]) -> (AecpCommon, Vec<u8>) {
    match avdecc_engine::wire::parse_frame(frame_bytes).unwrap() {
        Frame::Aecp { common, tail } => (common, tail.to_vec()),
        _ => panic!("expected an AECP frame"),
    }
}

fn controller(delegate: std::sync::Arc<TestDelegate>, transport: std::sync::Arc<FakeTransport>) -> std::sync::Arc<LocalEntity> {
    LocalEntityBuilder::new(CONTROLLER_ID, CONTROLLER_MAC)
        .roles(Roles::CONTROLLER)
        .transport(transport)
        .delegate(delegate)
        .build()
        .unwrap()
}

fn seed_discovery(local: &LocalEntity, target: EntityID) {
    local
        .ingest(&adp_frame(&sample_adp(target, 1), TARGET_MAC))
        .unwrap();
}

/// Polls `transport` for the next sent frame, spin-waiting briefly since the
/// command is issued on a separate thread.
fn wait_for_sent(transport: &FakeTransport) -> Vec<u8> {
    for _ in 0..200 {
        if let Some(frame) = transport.take_sent() {
            return frame;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("no frame was sent within the polling window");
}

#[test]
fn discovery_round_trip_tracks_online_update_and_offline() {
    let delegate = std::sync::Arc::new(TestDelegate::default());
    let transport = std::sync::Arc::new(FakeTransport::new());
    let local = controller(delegate.clone(), transport);

    local
        .ingest(&adp_frame(&sample_adp(TARGET_ID, 1), TARGET_MAC))
        .unwrap();
    assert_eq!(delegate.online.lock().unwrap().len(), 1);

    // Same available_index is still reported as an online event by this
    // tracker's own rules, not treated as a no-op.
    local
        .ingest(&adp_frame(&sample_adp(TARGET_ID, 1), TARGET_MAC))
        .unwrap();
    assert_eq!(delegate.online.lock().unwrap().len(), 2);

    local
        .ingest(&adp_frame(&sample_adp(TARGET_ID, 2), TARGET_MAC))
        .unwrap();
    assert_eq!(delegate.updated.lock().unwrap().len(), 1);
    assert_eq!(local.discovered_count(), 1);

    // valid_time_units=5 gives this tracker a 10s validity window; sweeping
    // 15s out forces expiry even though no EntityDeparting was ever sent.
    local.sweep_timers(Instant::now() + Duration::from_secs(15));
    assert_eq!(*delegate.offline.lock().unwrap(), vec![TARGET_ID]);
    assert_eq!(local.discovered_count(), 0);
}

#[test]
fn get_milan_info_round_trip_returns_decoded_value() {
    let delegate = std::sync::Arc::new(TestDelegate::default());
    let transport = std::sync::Arc::new(FakeTransport::new());
    let local = controller(delegate, transport.clone());
    seed_discovery(&local, TARGET_ID);

    let worker = std::thread::spawn({
        let local = local.clone();
        move || local.get_milan_info(TARGET_ID)
    });

    let sent = wait_for_sent(&transport);
    let (common, tail) = parse_sent_aecp(&sent);
    assert_eq!(common.message_type, AecpMessageType::VendorUniqueCommand);
    let mut cursor = Cursor::new(&tail);
    let sub_header = MvuSubHeader::parse(&mut cursor).unwrap();
    assert_eq!(sub_header.command_type, MvuCommandType::GetMilanInfo.to_u16());

    let info = MilanInfo {
        protocol_version: 1,
        features_flags: 0,
        certification_version: 0x0100_0000,
    };
    let mut payload = vec![0u8; 14];
    mvu::encode_milan_info_response(info, &mut CursorMut::new(&mut payload)).unwrap();

    local
        .ingest(&mvu_response_frame(
            TARGET_ID,
            CONTROLLER_ID,
            common.sequence_id,
            0,
            MvuCommandType::GetMilanInfo.to_u16(),
            &payload,
        ))
        .unwrap();

    let result = worker.join().unwrap().unwrap();
    assert_eq!(result.status, MvuCommandStatus::Success);
    assert_eq!(result.value, Some(info));
}

#[test]
fn response_with_mismatched_command_type_is_protocol_violation() {
    let delegate = std::sync::Arc::new(TestDelegate::default());
    let transport = std::sync::Arc::new(FakeTransport::new());
    let local = controller(delegate, transport.clone());
    seed_discovery(&local, TARGET_ID);

    let worker = std::thread::spawn({
        let local = local.clone();
        move || {
            local.read_descriptor(
                TARGET_ID,
                ConfigurationIndex(0),
                DescriptorType::AudioUnit,
                DescriptorIndex(0),
            )
        }
    });

    let sent = wait_for_sent(&transport);
    let (common, _tail) = parse_sent_aecp(&sent);
    assert_eq!(common.sequence_id, 0);

    // The peer answers with the wrong command_type for this sequence_id.
    local
        .ingest(&aem_response_frame(
            TARGET_ID,
            CONTROLLER_ID,
            common.sequence_id,
            0,
            false,
            AemCommandType::LockEntity.to_u16(),
            &[0u8; 16],
        ))
        .unwrap();

    let result = worker.join().unwrap().unwrap();
    assert_eq!(result.status, AemCommandStatus::BaseProtocolViolation);
    assert!(result.value.is_none());
}

#[test]
fn unanswered_command_retries_then_times_out() {
    let delegate = std::sync::Arc::new(TestDelegate::default());
    let transport = std::sync::Arc::new(FakeTransport::new());
    let config = EngineConfigBuilder::new()
        .aecp_aem_timeout(Duration::from_millis(50))
        .aecp_max_attempts(2)
        .build()
        .unwrap();
    let local = LocalEntityBuilder::new(CONTROLLER_ID, CONTROLLER_MAC)
        .roles(Roles::CONTROLLER)
        .transport(transport.clone())
        .delegate(delegate)
        .config(config)
        .build()
        .unwrap();
    seed_discovery(&local, TARGET_ID);

    let issue_time = Instant::now();
    let worker = std::thread::spawn({
        let local = local.clone();
        move || local.register_unsolicited_notifications(TARGET_ID)
    });

    let first = wait_for_sent(&transport);
    // Let the issuing thread finish registering the inflight entry under the
    // lock before sweeping; the timer logic itself is driven entirely by the
    // `now` passed below, not by real elapsed time.
    std::thread::sleep(Duration::from_millis(20));

    local.sweep_timers(issue_time + Duration::from_millis(100));
    let retransmit = wait_for_sent(&transport);
    assert_eq!(retransmit, first);

    local.sweep_timers(issue_time + Duration::from_millis(250));

    let result = worker.join().unwrap().unwrap();
    assert_eq!(result.status, AemCommandStatus::TimedOut);
}

#[test]
fn unsolicited_set_name_is_delivered_to_delegate() {
    let delegate = std::sync::Arc::new(TestDelegate::default());
    let transport = std::sync::Arc::new(FakeTransport::new());
    let local = controller(delegate.clone(), transport);

    let payload = NamePayload {
        descriptor_type: DescriptorType::Configuration,
        descriptor_index: DescriptorIndex(0),
        name_index: 0,
        configuration_index: ConfigurationIndex(0),
        name: AvdeccFixedString::from_str_truncated("Studio A"),
    };
    let mut buf = vec![0u8; 72];
    families::encode_name(&payload, &mut CursorMut::new(&mut buf)).unwrap();

    local
        .ingest(&aem_response_frame(
            TARGET_ID,
            CONTROLLER_ID,
            7,
            0,
            true,
            AemCommandType::SetName.to_u16(),
            &buf,
        ))
        .unwrap();

    let received = delegate.unsolicited.lock().unwrap();
    assert_eq!(received.len(), 1);
    let (source, aem) = &received[0];
    assert_eq!(*source, TARGET_ID);
    match aem {
        DispatchedAem::Name { command_type, payload } => {
            assert_eq!(*command_type, AemCommandType::SetName);
            assert_eq!(payload.name.as_str(), "Studio A");
        }
        other => panic!("expected Name, got {other:?}"),
    }
}

#[test]
fn acmp_response_with_no_inflight_is_sniffed() {
    let delegate = std::sync::Arc::new(TestDelegate::default());
    let transport = std::sync::Arc::new(FakeTransport::new());
    let local = controller(delegate.clone(), transport);

    let du = AcmpDu {
        message_type: AcmpMessageType::ConnectRxResponse,
        status: 0,
        controller_entity_id: EntityID(0x9999),
        talker_entity_id: TARGET_ID,
        listener_entity_id: EntityID(0x1234),
        talker_unique_id: 0,
        listener_unique_id: 0,
        stream_dest_address: MacAddress::ZERO,
        connection_count: 1,
        sequence_id: 0,
        flags: Default::default(),
        stream_vlan_id: 0,
    };

    local.ingest(&acmp_frame(&du)).unwrap();

    let sniffed = delegate.acmp_sniffed.lock().unwrap();
    assert_eq!(*sniffed, vec![du]);
}
