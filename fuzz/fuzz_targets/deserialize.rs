#![no_main]
use libfuzzer_sys::fuzz_target;
use pep::{Format, Pep};

fuzz_target!(|data: &[u8]| {
    let Ok(pep) = Pep::deserialize(data) else {
        return;
    };

    // Whatever garbage the payload holds, decompression must terminate
    // with exactly width * height pixels and never read out of bounds.
    if let Ok(pixels) = pep.decompress(Format::Rgba, false, false) {
        assert_eq!(
            pixels.len(),
            pep.width as usize * pep.height as usize
        );
    }
});
