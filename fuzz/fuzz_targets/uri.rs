#![no_main]

use libfuzzer_sys::fuzz_target;
use ricochet::{parse_response, Uri};

fuzz_target!(|data: &[u8]| {
    // Raw bytes as transport output, with and without a header length hint.
    let hint = data.first().map(|b| *b as usize);
    let _ = parse_response(None, data, None);
    let _ = parse_response(None, data, hint);

    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    // Split the input in a base and a reference.
    let (base, reference) = s.split_once('|').unwrap_or((s, ""));

    let Ok(uri) = Uri::parse(base) else {
        return;
    };

    // Reconstruction is stable.
    let again = Uri::parse(&uri.to_string()).expect("reparse of reconstructed uri");
    assert_eq!(uri, again);
    assert_eq!(uri.to_string(), again.to_string());

    if uri.is_absolute() {
        if let Ok(resolved) = uri.resolve(reference) {
            let again = Uri::parse(&resolved.to_string()).expect("reparse of resolved uri");
            assert_eq!(resolved, again);
        }
    }
});
