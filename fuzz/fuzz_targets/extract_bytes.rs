#![no_main]
use libfuzzer_sys::fuzz_target;

use pevector::config::ExtractorConfig;
use pevector::features::Extractor;

fuzz_target!(|data: &[u8]| {
    let extractor = Extractor::new(ExtractorConfig::default());
    let _ = extractor.extract_bytes(data);
});
