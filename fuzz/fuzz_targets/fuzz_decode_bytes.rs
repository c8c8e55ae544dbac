#![no_main]

use formparts::bytes::Bytes;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let payload = Bytes::copy_from_slice(data);

    for part in formparts::decode(payload.clone(), "X-BOUNDARY") {
        assert!(part.data().len() <= payload.len());
        assert!(part.content_type().is_none() || part.is_file());
    }

    // The first line doubles as the boundary so inputs can hit real framing.
    if let Some(line) = data.split(|b| *b == b'\n').next() {
        if let Ok(boundary) = std::str::from_utf8(line) {
            let _ = formparts::decode(payload, boundary.trim_start_matches('-'));
        }
    }
});
