#![no_main]
use libfuzzer_sys::fuzz_target;

use pevector::PeImage;

fuzz_target!(|data: &[u8]| {
    if let Ok(image) = PeImage::parse(data) {
        // Force the lazy directory walks.
        let _ = image.imports().count();
        let _ = image.exports().count();
        let _ = image.resources().map(|r| r.valid_leaf_count());
        let _ = image.version_info_size();
    }
});
