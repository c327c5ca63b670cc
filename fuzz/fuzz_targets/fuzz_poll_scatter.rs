#![no_main]

use bsp_io_net::select::InterestSets;
use bsp_io_net::{Interest, SocketEvents, SocketHandle};
use libfuzzer_sys::arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;

#[derive(Debug)]
struct PollInput {
    events: Vec<SocketEvents>,
    ready: Vec<(u8, u8)>,
}

impl<'a> Arbitrary<'a> for PollInput {
    fn arbitrary(u: &mut Unstructured<'a>) -> libfuzzer_sys::arbitrary::Result<Self> {
        let count = u.int_in_range(0..=32)?;
        let mut events = Vec::with_capacity(count);
        for _ in 0..count {
            let handle = SocketHandle::new(u.int_in_range(0..=63)?);
            let interest = Interest {
                read: u.arbitrary()?,
                write: u.arbitrary()?,
                connect: u.arbitrary()?,
                error: u.arbitrary()?,
            };
            events.push(SocketEvents::new(handle, interest));
        }
        let ready: Vec<(u8, u8)> = u.arbitrary()?;
        Ok(Self { events, ready })
    }
}

fuzz_target!(|input: PollInput| {
    let PollInput { mut events, ready } = input;
    let mut sets = InterestSets::from_events(&events);

    // Keep an arbitrary subset of each set, the way select would.
    for (set, raw) in ready {
        let handle = SocketHandle::new(i32::from(raw % 64));
        match set % 3 {
            0 => sets.read.remove(handle),
            1 => sets.write.remove(handle),
            _ => sets.error.remove(handle),
        };
    }

    sets.scatter(&mut events);

    for ev in &events {
        let r = ev.readiness();
        assert!(!r.can_read || ev.interest.read);
        assert!(!r.can_write || ev.interest.write);
        assert!(!r.connect_finished || ev.interest.connect);
        assert!(!r.errored || ev.interest.error);
    }
});
