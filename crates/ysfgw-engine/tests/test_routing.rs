mod common;

use common::*;

use ysfgw_core::fich::DataType;
use ysfgw_core::frame;
use ysfgw_engine::BackendKind;

#[test]
fn test_cold_switch_links_and_forwards() {
    let mut gateway = GatewayBuilder::new()
        .slot(SlotSpec::new(10, BackendKind::Ysf).rf_hang_ms(2000))
        .build();

    rf_frame(&mut gateway, 10, DataType::VdMode1);
    gateway.receive_repeater();

    assert_eq!(gateway.current_dgid(), 10);
    let mock = backend(&mut gateway, 10);
    assert_eq!(
        mock.calls,
        vec![NetCall::Link, NetCall::Link, NetCall::Link, NetCall::Write]
    );
    assert_eq!(mock.written.len(), 1);
    let (dgid_arg, frame_bytes) = &mock.written[0];
    assert_eq!(*dgid_arg, 10);
    assert_eq!(frame_bytes.len(), frame::YSF_FRAME_LENGTH);
    // frames towards a backend always carry DG-ID 0
    assert_eq!(fich_of(frame_bytes).dgid(), 0);

    // inactivity armed with the RF hang time
    gateway.clock(1999);
    assert_eq!(gateway.current_dgid(), 10);
    assert_eq!(backend(&mut gateway, 10).unlinks(), 0);
    gateway.clock(1);
    assert_eq!(gateway.current_dgid(), 0);
    assert_eq!(backend(&mut gateway, 10).unlinks(), 3);
}

#[test]
fn test_hot_switch_unlinks_old_then_links_new() {
    let mut gateway = GatewayBuilder::new()
        .slot(SlotSpec::new(10, BackendKind::Ysf))
        .slot(SlotSpec::new(20, BackendKind::Fcs))
        .build();

    rf_frame(&mut gateway, 10, DataType::VdMode1);
    gateway.receive_repeater();
    rf_frame(&mut gateway, 20, DataType::VdMode1);
    gateway.receive_repeater();

    assert_eq!(gateway.current_dgid(), 20);
    assert_eq!(
        backend(&mut gateway, 10).calls,
        vec![
            NetCall::Link,
            NetCall::Link,
            NetCall::Link,
            NetCall::Write,
            NetCall::Unlink,
            NetCall::Unlink,
            NetCall::Unlink,
        ]
    );
    assert_eq!(
        backend(&mut gateway, 20).calls,
        vec![NetCall::Link, NetCall::Link, NetCall::Link, NetCall::Write]
    );
}

#[test]
fn test_mode_filter_drops_frame_and_arms_nothing() {
    let mut gateway = GatewayBuilder::new()
        .slot(SlotSpec::new(30, BackendKind::Ysf2P25))
        .build();

    rf_frame(&mut gateway, 30, DataType::VdMode2);
    gateway.receive_repeater();

    // the switch happens, the frame does not pass the mode gate
    assert_eq!(gateway.current_dgid(), 30);
    let mock = backend(&mut gateway, 30);
    assert_eq!(mock.links(), 3);
    assert!(mock.written.is_empty());

    // rejected frames arm no inactivity timer
    gateway.clock(1_000_000);
    assert_eq!(gateway.current_dgid(), 30);
    assert_eq!(backend(&mut gateway, 30).unlinks(), 0);
}

#[test]
fn test_mode_filter_passes_allowed_mode() {
    let mut gateway = GatewayBuilder::new()
        .slot(SlotSpec::new(30, BackendKind::Ysf2P25))
        .build();

    rf_frame(&mut gateway, 30, DataType::VoiceFr);
    gateway.receive_repeater();

    assert_eq!(backend(&mut gateway, 30).written.len(), 1);
}

#[test]
fn test_network_promotion_from_idle() {
    let mut gateway = GatewayBuilder::new()
        .slot(SlotSpec::new(5, BackendKind::Ysf).is_static().net_hang_ms(1000))
        .build();

    backend(&mut gateway, 5).push_rx(5, build_frame(0, DataType::VdMode1, false));
    gateway.receive_networks();

    assert_eq!(gateway.current_dgid(), 5);
    // no link traffic on a static binding
    assert_eq!(backend(&mut gateway, 5).links(), 0);

    let rpt = repeater(&mut gateway);
    assert_eq!(rpt.written.len(), 1);
    let (_, frame_bytes) = &rpt.written[0];
    // frames towards the repeater carry the source slot index
    assert_eq!(fich_of(frame_bytes).dgid(), 5);

    // inactivity armed with the network hang time, expiry leaves the
    // static binding alone
    gateway.clock(999);
    assert_eq!(gateway.current_dgid(), 5);
    gateway.clock(1);
    assert_eq!(gateway.current_dgid(), 0);
    assert_eq!(backend(&mut gateway, 5).unlinks(), 0);
}

#[test]
fn test_frames_from_inactive_slots_are_dropped() {
    let mut gateway = GatewayBuilder::new()
        .slot(SlotSpec::new(10, BackendKind::Ysf))
        .slot(SlotSpec::new(20, BackendKind::Ysf))
        .build();

    rf_frame(&mut gateway, 10, DataType::VdMode1);
    gateway.receive_repeater();
    assert_eq!(gateway.current_dgid(), 10);

    backend(&mut gateway, 20).push_rx(20, build_frame(0, DataType::VdMode1, false));
    gateway.receive_networks();

    // consumed, not forwarded
    assert!(backend(&mut gateway, 20).rx.is_empty());
    assert!(repeater(&mut gateway).written.is_empty());
    assert_eq!(gateway.current_dgid(), 10);
}

#[test]
fn test_active_slot_keeps_forwarding() {
    let mut gateway = GatewayBuilder::new()
        .slot(SlotSpec::new(10, BackendKind::Ysf))
        .build();

    rf_frame(&mut gateway, 10, DataType::VdMode1);
    gateway.receive_repeater();

    backend(&mut gateway, 10).push_rx(10, build_frame(0, DataType::VdMode1, false));
    gateway.receive_networks();

    assert_eq!(repeater(&mut gateway).written.len(), 1);
    assert_eq!(gateway.current_dgid(), 10);
}

#[test]
fn test_rf_dgid_zero_is_ignored_for_routing() {
    let mut gateway = GatewayBuilder::new()
        .slot(SlotSpec::new(10, BackendKind::Ysf))
        .build();

    rf_frame(&mut gateway, 0, DataType::VdMode1);
    gateway.receive_repeater();

    assert_eq!(gateway.current_dgid(), 0);
    assert_eq!(backend(&mut gateway, 10).links(), 0);
    assert!(backend(&mut gateway, 10).written.is_empty());
}

#[test]
fn test_switch_to_unbound_slot_is_suppressed() {
    let mut gateway = GatewayBuilder::new()
        .slot(SlotSpec::new(10, BackendKind::Ysf))
        .build();

    rf_frame(&mut gateway, 10, DataType::VdMode1);
    gateway.receive_repeater();
    assert_eq!(gateway.current_dgid(), 10);

    // DG-ID 55 has no binding: no switch, no unlink of the old slot, the
    // frame still follows the current conversation
    rf_frame(&mut gateway, 55, DataType::VdMode1);
    gateway.receive_repeater();

    assert_eq!(gateway.current_dgid(), 10);
    let mock = backend(&mut gateway, 10);
    assert_eq!(mock.unlinks(), 0);
    assert_eq!(mock.written.len(), 2);
}

#[test]
fn test_corrupt_fich_is_dropped_silently() {
    let mut gateway = GatewayBuilder::new()
        .slot(SlotSpec::new(10, BackendKind::Ysf))
        .build();

    let mut frame_bytes = build_frame(10, DataType::VdMode1, false);
    for byte in &mut frame_bytes[frame::FICH_OFFSET..frame::FICH_OFFSET + frame::FICH_LENGTH] {
        *byte = 0x00;
    }
    repeater(&mut gateway).push_rx(0, frame_bytes);
    gateway.receive_repeater();

    assert_eq!(gateway.current_dgid(), 0);
    assert_eq!(backend(&mut gateway, 10).links(), 0);
    assert!(backend(&mut gateway, 10).written.is_empty());
}

#[test]
fn test_rearm_replaces_hang_time() {
    let mut gateway = GatewayBuilder::new()
        .slot(SlotSpec::new(10, BackendKind::Ysf).rf_hang_ms(2000))
        .build();

    rf_frame(&mut gateway, 10, DataType::VdMode1);
    gateway.receive_repeater();
    gateway.clock(1500);
    assert_eq!(gateway.current_dgid(), 10);

    // a fresh frame rearms the timer from zero
    rf_frame(&mut gateway, 10, DataType::VdMode1);
    gateway.receive_repeater();
    gateway.clock(1500);
    assert_eq!(gateway.current_dgid(), 10);
    gateway.clock(500);
    assert_eq!(gateway.current_dgid(), 0);
}

#[test]
fn test_zero_ms_clock_is_noop() {
    let mut gateway = GatewayBuilder::new()
        .slot(SlotSpec::new(10, BackendKind::Ysf).rf_hang_ms(1))
        .build();

    rf_frame(&mut gateway, 10, DataType::VdMode1);
    gateway.receive_repeater();

    gateway.clock(0);
    assert_eq!(gateway.current_dgid(), 10);
    assert_eq!(backend(&mut gateway, 10).clocked, vec![0]);
}

#[test]
fn test_startup_links_static_slots_only() {
    let mut gateway = GatewayBuilder::new()
        .slot(SlotSpec::new(5, BackendKind::Ysf).is_static())
        .slot(SlotSpec::new(10, BackendKind::Ysf))
        .build();

    gateway.start();

    assert_eq!(backend(&mut gateway, 5).links(), 3);
    assert_eq!(backend(&mut gateway, 10).links(), 0);
}

#[test]
fn test_shutdown_unlinks_and_closes_every_slot() {
    let mut gateway = GatewayBuilder::new()
        .slot(SlotSpec::new(5, BackendKind::Ysf).is_static())
        .slot(SlotSpec::new(10, BackendKind::Fcs))
        .build();

    gateway.start();
    gateway.shutdown();

    // a static binding sees exactly the startup links and shutdown unlinks
    assert_eq!(
        backend(&mut gateway, 5).calls,
        vec![
            NetCall::Link,
            NetCall::Link,
            NetCall::Link,
            NetCall::Unlink,
            NetCall::Unlink,
            NetCall::Unlink,
            NetCall::Close,
        ]
    );
    assert_eq!(backend(&mut gateway, 10).unlinks(), 3);
    assert_eq!(backend(&mut gateway, 10).closes(), 1);
    assert_eq!(repeater(&mut gateway).closes(), 1);
    assert_eq!(gateway.current_dgid(), 0);
}

#[test]
fn test_imrs_aliasing_routes_per_slot_and_closes_once() {
    let mut gateway = GatewayBuilder::new()
        .shared_slots(
            vec![
                SlotSpec::new(40, BackendKind::Imrs).is_static(),
                SlotSpec::new(41, BackendKind::Imrs).is_static(),
                SlotSpec::new(42, BackendKind::Imrs).is_static(),
            ],
            "IMRS",
        )
        .build();

    backend(&mut gateway, 41).push_rx(41, build_frame(0, DataType::VdMode1, false));
    gateway.receive_networks();

    assert_eq!(gateway.current_dgid(), 41);
    let rpt = repeater(&mut gateway);
    assert_eq!(rpt.written.len(), 1);
    assert_eq!(fich_of(&rpt.written[0].1).dgid(), 41);

    gateway.shutdown();
    let shared = backend(&mut gateway, 40);
    // the shared driver is torn down exactly once, with no unlink traffic
    assert_eq!(shared.closes(), 1);
    assert_eq!(shared.unlinks(), 0);
}

#[test]
fn test_shared_backend_is_clocked_once_per_tick() {
    let mut gateway = GatewayBuilder::new()
        .shared_slots(
            vec![
                SlotSpec::new(40, BackendKind::Imrs).is_static(),
                SlotSpec::new(41, BackendKind::Imrs).is_static(),
            ],
            "IMRS",
        )
        .build();

    gateway.clock(7);
    assert_eq!(backend(&mut gateway, 40).clocked, vec![7]);
}
