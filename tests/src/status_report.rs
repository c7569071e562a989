//! PDCP status reports: emission from the undelivered queue and
//! consumption against it.

use std::thread::sleep;
use std::time::Duration;

use ltesim_common::{ByteBuffer, RlcMode};
use ltesim_pdcp::config::{DiscardTimer, SnLen};
use ltesim_pdcp::pdu;
use ltesim_pdcp::security::NullSecurity;
use ltesim_pdcp::PdcpEntity;

use crate::test_utils::{init_test_logging, drb_config, srb_config, MockRlc, MockUpper};

/// Stores SDUs for the given SNs via handover-style writes.
fn fill_queue(entity: &mut PdcpEntity, rlc: &mut MockRlc, sns: &[u32]) {
    for &sn in sns {
        entity.write_sdu(rlc, &NullSecurity, ByteBuffer::from_slice(&[sn as u8]), Some(sn));
    }
    rlc.sdus.clear();
}

#[test]
fn test_status_report_bytes() {
    init_test_logging();
    let mut entity = PdcpEntity::new(drb_config(RlcMode::Am, SnLen::Len12)).unwrap();
    let mut rlc = MockRlc::default();

    let mut state = entity.get_bearer_state();
    state.next_tx_sn = 10;
    entity.set_bearer_state(state);
    fill_queue(&mut entity, &mut rlc, &[3, 5, 8]);

    entity.send_status_report(&mut rlc);

    let (_, report) = rlc.sdus.pop().unwrap();
    // FMS = 3; one bitmap byte with bits for queue offsets 0, 2 and 5
    assert_eq!(report.as_slice(), &[0x00, 0x03, 0b1010_0100]);
    assert!(pdu::is_control_pdu(&report));
    assert_eq!(pdu::control_pdu_type(&report), pdu::CONTROL_PDU_STATUS_REPORT);
}

#[test]
fn test_status_report_empty_queue_uses_next_tx_sn() {
    init_test_logging();
    let mut entity = PdcpEntity::new(drb_config(RlcMode::Am, SnLen::Len12)).unwrap();
    let mut rlc = MockRlc::default();

    let mut state = entity.get_bearer_state();
    state.next_tx_sn = 10;
    entity.set_bearer_state(state);

    entity.send_status_report(&mut rlc);
    let (_, report) = rlc.sdus.pop().unwrap();
    assert_eq!(report.as_slice(), &[0x00, 0x0A]);
}

#[test]
fn test_status_report_consume_removes_acked() {
    init_test_logging();
    let mut cfg = drb_config(RlcMode::Am, SnLen::Len12);
    cfg.discard_timer = DiscardTimer::Ms50;
    let mut entity = PdcpEntity::new(cfg).unwrap();
    let mut rlc = MockRlc::default();
    let mut upper = MockUpper::default();

    fill_queue(&mut entity, &mut rlc, &[3, 4, 5, 6, 8]);
    assert_eq!(entity.get_buffered_pdus().len(), 5);

    // FMS 3, bitmap acknowledging SNs 3, 5 and 8
    let report = ByteBuffer::from_slice(&[0x00, 0x03, 0b1010_0100]);
    entity.write_pdu(&mut upper, &NullSecurity, report);

    let buffered = entity.get_buffered_pdus();
    assert_eq!(buffered.keys().copied().collect::<Vec<_>>(), vec![4, 6]);
    assert!(upper.pdus.is_empty());

    // The acked entries also lost their discard timers: after expiry only
    // the surviving SNs are discarded toward RLC.
    sleep(Duration::from_millis(60));
    entity.run_pending_timers(&mut rlc);
    assert_eq!(rlc.discards, vec![(3, 4), (3, 6)]);
    assert!(entity.get_buffered_pdus().is_empty());
}

#[test]
fn test_status_report_consume_erases_below_fms() {
    init_test_logging();
    let mut entity = PdcpEntity::new(drb_config(RlcMode::Am, SnLen::Len12)).unwrap();
    let mut rlc = MockRlc::default();
    let mut upper = MockUpper::default();

    fill_queue(&mut entity, &mut rlc, &[1, 2, 7]);

    // FMS 5, no bitmap: everything below 5 is implicitly acknowledged
    let report = ByteBuffer::from_slice(&[0x00, 0x05]);
    entity.write_pdu(&mut upper, &NullSecurity, report);

    let buffered = entity.get_buffered_pdus();
    assert_eq!(buffered.keys().copied().collect::<Vec<_>>(), vec![7]);
}

#[test]
fn test_status_report_round_trip_between_entities() {
    init_test_logging();
    let cfg = drb_config(RlcMode::Am, SnLen::Len12);
    let mut reporter = PdcpEntity::new(cfg.clone()).unwrap();
    let mut consumer = PdcpEntity::new(cfg).unwrap();
    let mut rlc = MockRlc::default();
    let mut upper = MockUpper::default();

    // Reporter still misses SNs 0 and 2; consumer still holds 0, 1, 2.
    fill_queue(&mut reporter, &mut rlc, &[0, 2]);
    fill_queue(&mut consumer, &mut rlc, &[0, 1, 2]);

    reporter.send_status_report(&mut rlc);
    let (_, report) = rlc.sdus.pop().unwrap();
    consumer.write_pdu(&mut upper, &NullSecurity, report);

    // The bitmap named 0 and 2; only 1 remains outstanding
    let buffered = consumer.get_buffered_pdus();
    assert_eq!(buffered.keys().copied().collect::<Vec<_>>(), vec![1]);
}

#[test]
fn test_status_report_refused_on_srb_and_um() {
    init_test_logging();
    let mut srb = PdcpEntity::new(srb_config()).unwrap();
    let mut rlc = MockRlc::default();
    srb.send_status_report(&mut rlc);
    assert!(rlc.sdus.is_empty());

    let mut drb = PdcpEntity::new(drb_config(RlcMode::Am, SnLen::Len12)).unwrap();
    let mut um_rlc = MockRlc {
        um: true,
        ..Default::default()
    };
    drb.send_status_report(&mut um_rlc);
    assert!(um_rlc.sdus.is_empty());
}

#[test]
fn test_unknown_control_pdu_dropped() {
    init_test_logging();
    let mut entity = PdcpEntity::new(drb_config(RlcMode::Am, SnLen::Len12)).unwrap();
    let mut rlc = MockRlc::default();
    let mut upper = MockUpper::default();

    fill_queue(&mut entity, &mut rlc, &[0]);

    // Control PDU with an unrecognised type code
    entity.write_pdu(&mut upper, &NullSecurity, ByteBuffer::from_slice(&[0x70, 0x00]));
    assert!(upper.pdus.is_empty());
    assert_eq!(entity.get_buffered_pdus().len(), 1);
}

#[test]
fn test_malformed_status_report_dropped() {
    init_test_logging();
    let mut entity = PdcpEntity::new(drb_config(RlcMode::Am, SnLen::Len12)).unwrap();
    let mut rlc = MockRlc::default();
    let mut upper = MockUpper::default();

    fill_queue(&mut entity, &mut rlc, &[0]);

    // Status report truncated inside the FMS field
    entity.write_pdu(&mut upper, &NullSecurity, ByteBuffer::from_slice(&[0x00]));
    assert_eq!(entity.get_buffered_pdus().len(), 1);
}
