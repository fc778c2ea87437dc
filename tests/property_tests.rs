use pep::{compress, ChannelBits, Format, Pep};
use proptest::prelude::*;

const FORMATS: [Format; 4] = [Format::Rgba, Format::Bgra, Format::Abgr, Format::Argb];

fn rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    u32::from_le_bytes([r, g, b, a])
}

/// Build a deterministic 16-color palette with mixed alpha values.
///
/// Non-opaque alphas stay below 0x80 so channel quantisation never turns
/// a translucent entry fully opaque, which would flip the only_rgb flag
/// between serialisations.
fn test_palette() -> Vec<u32> {
    (0..16u8)
        .map(|i| {
            rgba(
                i.wrapping_mul(17),
                i.wrapping_mul(37),
                i.wrapping_mul(73),
                if i % 3 == 0 {
                    0xFF
                } else {
                    i.wrapping_mul(29) & 0x7F
                },
            )
        })
        .collect()
}

fn image_from_seeds(seeds: &[u8], width: u16) -> (Vec<u32>, u16, u16) {
    let palette = test_palette();
    let height = seeds.len().div_ceil(width as usize).max(1) as u16;
    let area = width as usize * height as usize;
    let pixels: Vec<u32> = (0..area)
        .map(|i| palette[(seeds[i % seeds.len()] % 16) as usize])
        .collect();
    (pixels, width, height)
}

proptest! {
    #[test]
    fn test_compress_decompress_roundtrip(
        seeds in prop::collection::vec(any::<u8>(), 1..400),
        width in 1u16..48,
        fmt in 0usize..4,
    ) {
        let (pixels, width, height) = image_from_seeds(&seeds, width);
        let format = FORMATS[fmt];

        let pep = compress(&pixels, width, height, format, ChannelBits::Eight).unwrap();
        let out = pep.decompress(format, false, false).unwrap();
        prop_assert_eq!(out, pixels);
    }

    #[test]
    fn test_frame_roundtrip_preserves_image(
        seeds in prop::collection::vec(any::<u8>(), 1..200),
        width in 1u16..32,
        fmt in 0usize..4,
    ) {
        let (pixels, width, height) = image_from_seeds(&seeds, width);
        let pep = compress(&pixels, width, height, FORMATS[fmt], ChannelBits::Eight).unwrap();

        let bytes = pep.serialize().unwrap();
        let back = Pep::deserialize(&bytes).unwrap();
        prop_assert_eq!(back, pep);
    }

    #[test]
    fn test_reformat_matches_per_pixel_reformat(
        seeds in prop::collection::vec(any::<u8>(), 1..200),
        width in 1u16..32,
        src in 0usize..4,
        dst in 0usize..4,
    ) {
        let (pixels, width, height) = image_from_seeds(&seeds, width);
        let (src, dst) = (FORMATS[src], FORMATS[dst]);
        let pep = compress(&pixels, width, height, src, ChannelBits::Eight).unwrap();

        let direct = pep.decompress(dst, false, false).unwrap();
        let native = pep.decompress(src, false, false).unwrap();
        let via: Vec<u32> = native
            .iter()
            .map(|&p| pep::pixel::reformat(p, src, dst))
            .collect();
        prop_assert_eq!(direct, via);
    }

    #[test]
    fn test_quantisation_idempotent(
        seeds in prop::collection::vec(any::<u8>(), 1..128),
        width in 1u16..24,
        bits in 0u8..3,
    ) {
        let channel_bits = [ChannelBits::One, ChannelBits::Two, ChannelBits::Four][bits as usize];
        let (pixels, width, height) = image_from_seeds(&seeds, width);

        let mut pep = compress(&pixels, width, height, Format::Rgba, ChannelBits::Eight).unwrap();
        pep.channel_bits = channel_bits;

        let once = pep.serialize().unwrap();
        let back = Pep::deserialize(&once).unwrap();
        let twice = back.serialize().unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn test_truncated_stream_never_reads_out_of_bounds(
        seeds in prop::collection::vec(any::<u8>(), 1..200),
        width in 1u16..32,
        keep in 0usize..2048,
    ) {
        let (pixels, width, height) = image_from_seeds(&seeds, width);
        let pep = compress(&pixels, width, height, Format::Rgba, ChannelBits::Eight).unwrap();
        let bytes = pep.serialize().unwrap();
        let prefix = &bytes[..keep.min(bytes.len())];

        if let Ok(truncated) = Pep::deserialize(prefix) {
            if let Ok(out) = truncated.decompress(Format::Rgba, false, false) {
                let area = truncated.width as usize * truncated.height as usize;
                prop_assert_eq!(out.len(), area);
            }
        }
    }
}

#[test]
fn test_bitmap_roundtrip_192x144() {
    let black = rgba(0, 0, 0, 0xFF);
    let white = rgba(0xFF, 0xFF, 0xFF, 0xFF);
    let pixels: Vec<u32> = (0..192usize * 144)
        .map(|i| if (i / 7) % 2 == 0 { black } else { white })
        .collect();

    let pep = compress(&pixels, 192, 144, Format::Rgba, ChannelBits::Eight).unwrap();
    let bytes = pep.serialize().unwrap();

    // is_bitmap set, small dims (191, 143), no palette bytes.
    assert_ne!(bytes[0] & 0x40, 0);
    assert_ne!(bytes[0] & 0x10, 0);
    assert_eq!(&bytes[1..3], &[191, 143]);

    let back = Pep::deserialize(&bytes).unwrap();
    let out = back.decompress(Format::Rgba, false, false).unwrap();
    assert_eq!(out, pixels);
}

#[test]
fn test_large_dimensions_use_three_bytes() {
    let pixels: Vec<u32> = (0..300usize * 2)
        .map(|i| rgba((i % 3) as u8 * 80, 0, 0, 0xFF))
        .collect();
    let pep = compress(&pixels, 300, 2, Format::Rgba, ChannelBits::Eight).unwrap();
    let bytes = pep.serialize().unwrap();

    assert_eq!(bytes[0] & 0x10, 0);
    let packed = ((299u32 & 0xFFF) << 12) | (1 & 0xFFF);
    assert_eq!(
        &bytes[1..4],
        &[(packed >> 16) as u8, (packed >> 8) as u8, packed as u8]
    );

    let back = Pep::deserialize(&bytes).unwrap();
    assert_eq!((back.width, back.height), (300, 2));
}

#[test]
fn test_gradient_palette_size_stored_as_zero() {
    let pixels: Vec<u32> = (0..256).map(|i| rgba(i as u8, 7, 9, 0xFF)).collect();
    let pep = compress(&pixels, 256, 1, Format::Rgba, ChannelBits::Eight).unwrap();
    assert_eq!(pep.palette.len(), 256);

    let bytes = pep.serialize().unwrap();
    let back = Pep::deserialize(&bytes).unwrap();
    assert_eq!(back.palette.len(), 256);
    assert_eq!(back.decompress(Format::Rgba, false, false).unwrap(), pixels);

    // flags, 2 dim bytes (256x1 is small), then the varint; the byte
    // after it is the palette size, stored as zero.
    let mut offset = 3;
    while bytes[offset] & 0x80 != 0 {
        offset += 1;
    }
    assert_eq!(bytes[offset + 1], 0);
}
