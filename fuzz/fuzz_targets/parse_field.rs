#![no_main]

use libfuzzer_sys::fuzz_target;
use waybill_core::{ActorRole, ChangeStatus, Period, TrackedField};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    // stored-string parsers must reject garbage without panicking
    let _ = Period::new(input);
    let _ = input.parse::<ChangeStatus>();
    let _ = input.parse::<ActorRole>();

    // accepted field keys must round-trip through their storage form
    if let Ok(field) = input.parse::<TrackedField>() {
        let rendered = field.to_string();
        assert_eq!(rendered.parse::<TrackedField>(), Ok(field));
    }
});
