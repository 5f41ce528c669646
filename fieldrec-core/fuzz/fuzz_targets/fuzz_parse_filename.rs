#![no_main]

//! Fuzz target for CaptureDetails::parse()
//!
//! Any accepted name must survive an encode/parse cycle unchanged.
//!
//! Run with: cargo +nightly fuzz run fuzz_parse_filename

use fieldrec_core::CaptureDetails;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(name) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(details) = CaptureDetails::parse(name) {
        let encoded = details.base_name();
        let reparsed = CaptureDetails::parse(&encoded).expect("encoded name must parse");
        assert_eq!(reparsed.captured_at, details.captured_at);
        assert_eq!(reparsed.accuracy_m, details.accuracy_m);
        assert_eq!(reparsed.altitude_m, details.altitude_m);
        let _ = details.display(name);
    }
});
