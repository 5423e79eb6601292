#![no_main]

use libfuzzer_sys::fuzz_target;
use waybill_core::{Delivery, DeliveryPatch};

fuzz_target!(|data: &[u8]| {
    let Ok(patch) = serde_json::from_slice::<DeliveryPatch>(data) else {
        return;
    };

    let base = Delivery::default();
    let merged = base.merged(&patch);

    // diffing and rendering arbitrary merged records must stay panic-free
    for delta in base.diff(&merged) {
        let _ = delta.to_string();
    }
    let _ = merged.to_json();

    // a patch applied twice settles after the first application
    assert_eq!(merged.merged(&patch), merged);
});
