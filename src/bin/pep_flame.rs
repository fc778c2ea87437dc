use pep::{compress, ChannelBits, Format};

fn main() {
    let palette: Vec<u32> = (0..16u8)
        .map(|i| u32::from_le_bytes([i * 16, 255 - i * 8, i * 4, 0xFF]))
        .collect();
    let pixels: Vec<u32> = (0..256usize * 256)
        .map(|i| palette[(i % 7 + i / 512) % 16])
        .collect();

    for _ in 0..100 {
        let pep = compress(&pixels, 256, 256, Format::Rgba, ChannelBits::Eight).unwrap();
        let out = pep.decompress(Format::Rgba, false, false).unwrap();
        assert_eq!(out.len(), pixels.len());
    }
}
