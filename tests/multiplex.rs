//! Multiplexing many sockets through one poll
//!
//! Run with: cargo test --test multiplex

use bsp_io_net::select::reset_all;
use bsp_io_net::stack::fake::{ConnectBehavior, FakeStack};
use bsp_io_net::{
    Connection, Interest, NetConfig, SocketEvents, SocketManager, SocketState, SocketType,
    TimeoutPolicy,
};
use bytes::BytesMut;
use std::net::Ipv4Addr;
use std::time::Duration;

fn manager(config: NetConfig) -> SocketManager<FakeStack> {
    bsp_io_net::logging::try_init_for_tests();
    let mut stack = FakeStack::new();
    for i in 1..=8u8 {
        stack.add_host(format!("node{i}.local"), Ipv4Addr::new(10, 0, 0, i));
    }
    SocketManager::new(stack, config)
}

#[test]
fn test_only_ready_sockets_are_flagged() {
    let mut mgr = manager(NetConfig::default());
    let handles: Vec<_> = (1..=4)
        .map(|i| {
            mgr.connect_or_create(&format!("node{i}.local"), 7000, SocketType::Stream)
                .unwrap()
        })
        .collect();

    mgr.stack_mut().push_inbound(handles[1], b"one");
    mgr.stack_mut().push_inbound(handles[3], b"three");

    let mut events: Vec<_> = handles
        .iter()
        .map(|&h| SocketEvents::new(h, Interest::read()))
        .collect();
    let ready = mgr.poll(&mut events, Duration::from_secs(1)).unwrap();

    assert_eq!(ready, 2);
    let flagged: Vec<bool> = events.iter().map(|e| e.readiness().can_read).collect();
    assert_eq!(flagged, vec![false, true, false, true]);
}

#[test]
fn test_flags_persist_until_reset() {
    let mut mgr = manager(NetConfig::default());
    let h = mgr
        .connect_or_create("node1.local", 7000, SocketType::Stream)
        .unwrap();
    mgr.stack_mut().push_inbound(h, b"x");

    let mut events = [SocketEvents::new(h, Interest::read())];
    mgr.poll(&mut events, Duration::from_secs(1)).unwrap();
    assert!(events[0].readiness().can_read);

    let mut buf = [0u8; 4];
    mgr.read(h, &mut buf).unwrap();

    // Nothing is readable any more, but poll does not clear earlier results.
    assert_eq!(mgr.poll(&mut events, Duration::from_secs(1)).unwrap(), 0);
    assert!(events[0].readiness().can_read);

    reset_all(&mut events);
    assert!(events[0].readiness().is_empty());
}

#[test]
fn test_empty_interest_still_paces() {
    let mut mgr = manager(NetConfig::default());
    let h = mgr.create().unwrap();

    let mut events = [SocketEvents::new(h, Interest::NONE)];
    let ready = mgr.poll(&mut events, Duration::from_millis(20)).unwrap();
    assert_eq!(ready, 0);
    assert_eq!(mgr.stack().select_waits(), &[Duration::from_millis(20)]);
}

#[test]
fn test_deadline_policy_sums_to_timeout() {
    let config = NetConfig::builder()
        .poll_slice(Duration::from_millis(300))
        .timeout_policy(TimeoutPolicy::UntilDeadline)
        .build()
        .unwrap();
    let mut mgr = manager(config);
    let h = mgr
        .connect_or_create("node2.local", 7000, SocketType::Stream)
        .unwrap();

    let mut events = [SocketEvents::new(h, Interest::read())];
    assert_eq!(mgr.poll(&mut events, Duration::from_secs(1)).unwrap(), 0);

    let waits = mgr.stack().select_waits();
    assert!(waits.iter().all(|w| *w <= Duration::from_millis(300)));
    assert_eq!(waits.iter().sum::<Duration>(), Duration::from_secs(1));
}

#[test]
fn test_connection_drivers_share_one_poll() {
    let mut mgr = manager(NetConfig::default());
    mgr.stack_mut()
        .set_connect_behavior(Ipv4Addr::new(10, 0, 0, 5), ConnectBehavior::Pending(4));

    let mut fast = Connection::open(&mut mgr, "node1.local", 9000).unwrap();
    let mut slow = Connection::open(&mut mgr, "node5.local", 9000).unwrap();
    assert_eq!(fast.state(), SocketState::Connected);
    assert_eq!(slow.state(), SocketState::Connecting);

    mgr.stack_mut().push_inbound(fast.handle(), b"hello");

    let mut events = [fast.events(), slow.events()];
    let ready = mgr.poll(&mut events, Duration::from_secs(1)).unwrap();
    assert_eq!(ready, 2);

    fast.on_ready(events[0].readiness()).unwrap();
    slow.on_ready(events[1].readiness()).unwrap();
    assert_eq!(slow.state(), SocketState::Connected);

    let mut buf = BytesMut::new();
    let got = fast.read_buf(&mut mgr, &mut buf, 32).unwrap();
    assert_eq!(got.bytes, 5);
    assert_eq!(&buf[..], b"hello");

    assert_eq!(slow.write(&mut mgr, b"ping").unwrap().bytes, 4);

    fast.close(&mut mgr).unwrap();
    slow.close(&mut mgr).unwrap();
    assert_eq!(mgr.stack().open_count(), 0);
}

#[test]
fn test_unvalidated_zero_slice_config_still_returns() {
    let config = NetConfig {
        poll_slice: Duration::ZERO,
        timeout_policy: TimeoutPolicy::UntilDeadline,
        ..NetConfig::default()
    };
    assert!(config.validate().is_err());

    let mut mgr = manager(config);
    let h = mgr
        .connect_or_create("node3.local", 7000, SocketType::Stream)
        .unwrap();

    let mut events = [SocketEvents::new(h, Interest::read())];
    assert_eq!(mgr.poll(&mut events, Duration::from_secs(2)).unwrap(), 0);
    assert_eq!(mgr.stack().select_waits(), &[Duration::ZERO]);
}

#[test]
fn test_write_and_connect_interest_both_reported() {
    let mut mgr = manager(NetConfig::default());
    let idle = mgr
        .connect_or_create("node1.local", 7000, SocketType::Stream)
        .unwrap();
    let busy = mgr
        .connect_or_create("node2.local", 7000, SocketType::Stream)
        .unwrap();
    mgr.stack_mut().push_inbound(idle, b"unrequested");

    let mut events = [
        SocketEvents::new(idle, Interest::NONE),
        SocketEvents::new(busy, Interest::write().with_connect()),
    ];
    let ready = mgr.poll(&mut events, Duration::from_secs(1)).unwrap();

    assert_eq!(ready, 1);
    assert!(events[0].readiness().is_empty());
    let r = events[1].readiness();
    assert!(r.can_write);
    assert!(r.connect_finished);
    assert!(!r.can_read);
    assert!(!r.errored);
}
