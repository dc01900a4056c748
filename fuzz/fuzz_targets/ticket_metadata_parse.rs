#![no_main]

use libfuzzer_sys::fuzz_target;
use ticbot_core::{parse_ticket_metadata, Ticket};

fuzz_target!(|data: &[u8]| {
    let body = String::from_utf8_lossy(data);
    if let Ok(metadata) = parse_ticket_metadata(&body) {
        assert!(!metadata.ticket_id.is_empty());
    }
    let ticket = Ticket::new(
        1,
        "fuzz",
        "https://example.invalid/1",
        body.as_ref(),
        Default::default(),
    );
    assert_eq!(ticket.is_trackable(), parse_ticket_metadata(&body).is_ok());
});
