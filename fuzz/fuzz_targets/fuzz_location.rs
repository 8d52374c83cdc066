#![no_main]

use libfuzzer_sys::fuzz_target;
use locix::index::location::{is_canonical, normalize_location, prefixes};

fuzz_target!(|data: &str| {
    let canonical = normalize_location(data);
    assert!(is_canonical(&canonical));
    assert_eq!(normalize_location(&canonical), canonical);

    // Prefixes grow strictly and end with the location itself
    let all: Vec<&str> = prefixes(&canonical).collect();
    for pair in all.windows(2) {
        assert!(pair[1].starts_with(pair[0]));
        assert!(pair[1].len() > pair[0].len());
    }
    if let Some(last) = all.last() {
        assert_eq!(*last, &*canonical);
    }
});
