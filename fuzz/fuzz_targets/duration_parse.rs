#![no_main]

use libfuzzer_sys::fuzz_target;
use ticbot_core::{format_duration, parse_compact_duration, DurationSpec};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    if let Ok(duration) = parse_compact_duration(&raw) {
        let rendered = format_duration(duration);
        if duration.num_seconds() > 0 {
            assert_eq!(parse_compact_duration(&rendered), Ok(duration));
        }
    }
    if let Ok(duration) = DurationSpec::Compact(raw.into_owned()).to_duration() {
        assert!(duration.num_seconds() > 0);
    }
});
