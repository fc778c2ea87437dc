//! Pixel-level transforms: channel orders, bit depths, reformatting and
//! alpha premultiplication.
//!
//! Pixels are `u32` values whose little-endian byte 0 holds the first
//! channel of the order, so an RGBA `#112233FF` is
//! `u32::from_le_bytes([0x11, 0x22, 0x33, 0xFF])`.

/// Channel order of a 32-bit pixel. The discriminants are stored in the
/// container flags byte and must not change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Format {
    /// Red, green, blue, alpha.
    Rgba = 0,
    /// Blue, green, red, alpha.
    Bgra = 1,
    /// Alpha, blue, green, red.
    Abgr = 2,
    /// Alpha, red, green, blue.
    Argb = 3,
}

impl Format {
    /// Decode the two flag bits back into a format tag.
    pub(crate) fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            0 => Format::Rgba,
            1 => Format::Bgra,
            2 => Format::Abgr,
            _ => Format::Argb,
        }
    }

    /// Whether the alpha channel leads (ABGR/ARGB) rather than trails.
    pub(crate) fn alpha_first(self) -> bool {
        matches!(self, Format::Abgr | Format::Argb)
    }

    /// Byte position of the alpha channel within the pixel.
    pub(crate) fn alpha_index(self) -> usize {
        if self.alpha_first() {
            0
        } else {
            3
        }
    }

    /// Opaque black in this channel order.
    pub(crate) fn opaque_black(self) -> u32 {
        if self.alpha_first() {
            0x0000_00FF
        } else {
            0xFF00_0000
        }
    }
}

/// Per-channel bit width used when the palette is serialized. The
/// discriminants are stored in the container flags byte; the channel
/// width in bits is `1 << tag`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChannelBits {
    /// 1 bit per channel.
    One = 0,
    /// 2 bits per channel.
    Two = 1,
    /// 4 bits per channel.
    Four = 2,
    /// 8 bits per channel (lossless).
    Eight = 3,
}

impl ChannelBits {
    pub(crate) fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            0 => ChannelBits::One,
            1 => ChannelBits::Two,
            2 => ChannelBits::Four,
            _ => ChannelBits::Eight,
        }
    }

    /// Stored bits per channel: 1, 2, 4 or 8.
    pub fn width(self) -> u8 {
        1 << self as u8
    }
}

/// Shuffle a pixel from one channel order to another.
///
/// Identity when the orders match; otherwise one of three fixed byte
/// permutations (swap the two color ends, reverse, or rotate through the
/// alpha byte).
pub fn reformat(color: u32, from: Format, to: Format) -> u32 {
    if from == to {
        return color;
    }

    if !from.alpha_first() && !to.alpha_first() {
        // RGBA <-> BGRA: swap bytes 0 and 2.
        (color & 0xFF00_FF00) | ((color & 0x0000_00FF) << 16) | ((color & 0x00FF_0000) >> 16)
    } else if from.alpha_first() && to.alpha_first() {
        // ABGR <-> ARGB: swap bytes 1 and 3.
        (color & 0x00FF_00FF) | ((color & 0x0000_FF00) << 16) | ((color & 0xFF00_0000) >> 16)
    } else if ((from as u8) ^ (to as u8)) == 2 {
        // RGBA <-> ABGR, BGRA <-> ARGB: full byte reversal.
        ((color & 0x0000_00FF) << 24)
            | ((color & 0x0000_FF00) << 8)
            | ((color & 0x00FF_0000) >> 8)
            | ((color & 0xFF00_0000) >> 24)
    } else if (from as u8) < (to as u8) {
        // Alpha moves from the tail to the head.
        ((color & 0xFF00_0000) >> 24) | ((color & 0x00FF_FFFF) << 8)
    } else {
        // Alpha moves from the head to the tail.
        ((color & 0x0000_00FF) << 24) | ((color & 0xFFFF_FF00) >> 8)
    }
}

/// Scale the color channels by the alpha channel,
/// `round(c * a / 255)` via the `(c * (a * 257) + 32896) >> 16` identity.
pub fn pre_multiply(pixel: u32, format: Format) -> u32 {
    let mut bytes = pixel.to_le_bytes();
    let alpha_index = format.alpha_index();
    let scaled_alpha = bytes[alpha_index] as u32 * 257;

    for (i, byte) in bytes.iter_mut().enumerate() {
        if i == alpha_index {
            continue;
        }
        *byte = ((*byte as u32 * scaled_alpha + 32896) >> 16) as u8;
    }

    u32::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const FORMATS: [Format; 4] = [Format::Rgba, Format::Bgra, Format::Abgr, Format::Argb];

    #[test]
    fn test_reformat_rgba_permutations() {
        let rgba = u32::from_le_bytes([0x11, 0x22, 0x33, 0xFF]);
        assert_eq!(
            reformat(rgba, Format::Rgba, Format::Bgra),
            u32::from_le_bytes([0x33, 0x22, 0x11, 0xFF])
        );
        assert_eq!(
            reformat(rgba, Format::Rgba, Format::Abgr),
            u32::from_le_bytes([0xFF, 0x33, 0x22, 0x11])
        );
        assert_eq!(
            reformat(rgba, Format::Rgba, Format::Argb),
            u32::from_le_bytes([0xFF, 0x11, 0x22, 0x33])
        );
    }

    #[test]
    fn test_premultiply_half_alpha() {
        // 0x80 alpha scales 0xFF down to 0x80 with round-to-nearest.
        let pixel = u32::from_le_bytes([0xFF, 0x00, 0xFF, 0x80]);
        let out = pre_multiply(pixel, Format::Rgba).to_le_bytes();
        assert_eq!(out, [0x80, 0x00, 0x80, 0x80]);
    }

    #[test]
    fn test_premultiply_opaque_is_identity() {
        let pixel = u32::from_le_bytes([0x12, 0x34, 0x56, 0xFF]);
        assert_eq!(pre_multiply(pixel, Format::Rgba), pixel);
        let pixel = u32::from_le_bytes([0xFF, 0x12, 0x34, 0x56]);
        assert_eq!(pre_multiply(pixel, Format::Argb), pixel);
    }

    #[test]
    fn test_premultiply_zero_alpha_clears_color() {
        let pixel = u32::from_le_bytes([0xAB, 0xCD, 0xEF, 0x00]);
        let out = pre_multiply(pixel, Format::Rgba).to_le_bytes();
        assert_eq!(out, [0x00, 0x00, 0x00, 0x00]);
    }

    proptest! {
        #[test]
        fn prop_reformat_roundtrips(color in any::<u32>(), a in 0usize..4, b in 0usize..4) {
            let (from, to) = (FORMATS[a], FORMATS[b]);
            prop_assert_eq!(reformat(reformat(color, from, to), to, from), color);
        }

        #[test]
        fn prop_reformat_composes(color in any::<u32>(), a in 0usize..4, b in 0usize..4, c in 0usize..4) {
            let (f, g, h) = (FORMATS[a], FORMATS[b], FORMATS[c]);
            let direct = reformat(color, f, h);
            let via = reformat(reformat(color, f, g), g, h);
            prop_assert_eq!(direct, via);
        }
    }
}
