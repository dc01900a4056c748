#![no_main]

use libfuzzer_sys::fuzz_target;
use ticbot_mail::GmailFetchParser;

fuzz_target!(|data: &[u8]| {
    let Ok(parser) = GmailFetchParser::new() else {
        return;
    };
    let raw = String::from_utf8_lossy(data);
    for meta in parser.parse_response(&raw) {
        assert!(!meta.message_id.is_empty());
        assert!(meta.message_id.bytes().all(|byte| byte.is_ascii_digit()));
    }
});
