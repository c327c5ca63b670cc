#![no_main]

use bsp_io_net::secure::parse_server_name;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(host) = std::str::from_utf8(data) {
        if let Ok(name) = parse_server_name(host) {
            assert!(!name.is_empty());
            assert!(name.len() <= 253);
            assert!(!name.ends_with('.'));
            // Validated names are stable.
            assert_eq!(parse_server_name(&name).ok().as_deref(), Some(name.as_str()));
        }
    }
});
