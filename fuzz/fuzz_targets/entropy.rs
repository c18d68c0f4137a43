#![no_main]
use libfuzzer_sys::fuzz_target;

use pevector::entropy::shannon_entropy;

fuzz_target!(|data: &[u8]| {
    let e = shannon_entropy(data);
    assert!((0.0..=8.0).contains(&e));
});
