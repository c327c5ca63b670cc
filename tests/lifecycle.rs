//! End-to-end socket lifecycle against the in-memory stack
//!
//! Run with: cargo test --test lifecycle

use bsp_io_net::stack::fake::{ConnectBehavior, FakeStack};
use bsp_io_net::{
    ConnectProgress, Error, Interest, NetConfig, SocketEvents, SocketHandle, SocketManager,
    SocketType, Status, Transfer,
};
use std::net::Ipv4Addr;
use std::time::Duration;

const EXAMPLE: Ipv4Addr = Ipv4Addr::new(93, 184, 216, 34);

fn manager() -> SocketManager<FakeStack> {
    bsp_io_net::logging::try_init_for_tests();
    let mut stack = FakeStack::new().with_first_handle(3);
    stack.add_host("example.com", EXAMPLE);
    SocketManager::new(stack, NetConfig::default())
}

#[test]
fn test_plain_request_response() {
    let mut mgr = manager();

    let handle = mgr
        .connect_or_create("example.com", 443, SocketType::Stream)
        .expect("connect");
    assert_eq!(handle, SocketHandle::new(3));

    let mut events = [SocketEvents::new(handle, Interest::write())];
    let ready = mgr
        .poll(&mut events, Duration::from_secs(5))
        .expect("poll");
    assert_eq!(ready, 1);
    assert!(events[0].readiness().can_write);

    let sent = mgr.write(handle, b"GET /\r\n").expect("write");
    assert_eq!(sent, Transfer::ok(7));
    assert_eq!(mgr.stack().outbound(handle).unwrap(), b"GET /\r\n");

    let mut buf = [0u8; 64];
    assert_eq!(mgr.read(handle, &mut buf).unwrap().status, Status::Busy);

    mgr.stack_mut().push_inbound(handle, b"HTTP/1.0 200 OK\r\n");
    let got = mgr.read(handle, &mut buf).unwrap();
    assert_eq!(got.status, Status::Ok);
    assert_eq!(&buf[..got.bytes], b"HTTP/1.0 200 OK\r\n");

    mgr.stack_mut().close_peer(handle);
    assert_eq!(mgr.read(handle, &mut buf).unwrap(), Transfer::reset());

    mgr.close(handle).expect("close");
    assert!(!mgr.stack().is_open(handle));
}

#[test]
fn test_poll_times_out_without_data() {
    let mut mgr = manager();
    let handle = mgr
        .connect_or_create("example.com", 80, SocketType::Stream)
        .unwrap();

    let mut events = [SocketEvents::new(handle, Interest::read())];
    let ready = mgr.poll(&mut events, Duration::from_millis(250)).unwrap();
    assert_eq!(ready, 0);
    assert!(events[0].readiness().is_empty());
    assert_eq!(mgr.stack().select_waits(), &[Duration::from_millis(250)]);
}

#[test]
fn test_nonblocking_connect_completes_through_poll() {
    let mut mgr = manager();
    mgr.stack_mut()
        .set_connect_behavior(EXAMPLE, ConnectBehavior::Pending(10));
    let handle = mgr.create().unwrap();

    assert_eq!(
        mgr.connect(handle, "example.com", 443).unwrap(),
        ConnectProgress::InProgress
    );
    assert_eq!(
        mgr.write(handle, b"early").unwrap(),
        Transfer::busy()
    );

    let mut events = [SocketEvents::new(handle, Interest::connect())];
    assert_eq!(mgr.poll(&mut events, Duration::from_secs(1)).unwrap(), 1);
    assert!(events[0].readiness().connect_finished);
    assert!(!events[0].readiness().can_write);

    assert_eq!(
        mgr.check_connection(handle, "example.com", 443).unwrap(),
        ConnectProgress::Connected
    );
    assert_eq!(mgr.write(handle, b"late").unwrap(), Transfer::ok(4));
}

#[test]
fn test_use_after_close_is_rejected() {
    let mut mgr = manager();
    let handle = mgr
        .connect_or_create("example.com", 443, SocketType::Stream)
        .unwrap();
    mgr.close(handle).unwrap();

    let mut buf = [0u8; 8];
    let err = mgr.read(handle, &mut buf).unwrap_err();
    assert!(matches!(err, Error::Transport { op: "recv", .. }));

    let mut events = [SocketEvents::new(handle, Interest::read())];
    assert!(matches!(
        mgr.poll(&mut events, Duration::from_millis(10)),
        Err(Error::PollFailed(_))
    ));
}

#[test]
fn test_invalid_handles_rejected_everywhere() {
    let mut mgr = manager();
    let bad = SocketHandle::INVALID;
    let mut buf = [0u8; 4];

    assert!(matches!(mgr.write(bad, b"x"), Err(Error::InvalidHandle(_))));
    assert!(matches!(mgr.read(bad, &mut buf), Err(Error::InvalidHandle(_))));
    assert!(matches!(mgr.close(bad), Err(Error::InvalidHandle(_))));
    assert!(matches!(
        mgr.connect(bad, "example.com", 80),
        Err(Error::InvalidHandle(_))
    ));

    let mut events = [SocketEvents::new(bad, Interest::read())];
    assert!(matches!(
        mgr.poll(&mut events, Duration::from_secs(1)),
        Err(Error::InvalidHandle(_))
    ));
    assert!(mgr.stack().select_waits().is_empty());
}

#[test]
fn test_datagram_socket_type_is_passed_through() {
    let mut mgr = manager();
    let handle = mgr.create_with_type(SocketType::Datagram).unwrap();
    assert_eq!(
        mgr.stack().kind(handle).unwrap().socket_type,
        SocketType::Datagram
    );
}
