#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must never panic; only I/O can fail and Cursor can't
    let platforms = locix::records::parse_records(Cursor::new(data)).unwrap();

    let mut names: Vec<&str> = platforms.iter().map(|p| p.name()).collect();
    let total = names.len();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), total, "platform names must be unique");

    for platform in &platforms {
        assert!(!platform.name().trim().is_empty());
        assert!(platform.locations().all(|l| !l.trim().is_empty()));
    }
});
