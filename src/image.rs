//! The `Pep` image descriptor and the compress/decompress entry points.

use std::path::Path;

use crate::coder::{RangeDecoder, RangeEncoder};
use crate::error::{Error, Result};
use crate::frame;
use crate::model::Model;
use crate::palette::Palette;
use crate::pixel::{pre_multiply, reformat, ChannelBits, Format};

/// A compressed pep image.
///
/// Owns its payload exclusively; dropping the descriptor releases it.
/// `channel_bits` may be lowered after compression and before
/// [`Pep::serialize`] to quantise the stored palette (the pixel payload
/// is unaffected).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pep {
    /// Image width in pixels, `1..=4096`.
    pub width: u16,
    /// Image height in pixels, `1..=4096`.
    pub height: u16,
    /// Channel order of the palette colors.
    pub format: Format,
    /// Per-channel bit width used when the palette is serialized.
    pub channel_bits: ChannelBits,
    /// Colors in first-seen order.
    pub palette: Palette,
    /// Entropy-coded packed-index stream.
    pub payload: Vec<u8>,
}

/// Compress a pixel buffer into a [`Pep`] descriptor.
///
/// `pixels` must hold exactly `width * height` entries laid out row-major
/// in `format`. Images with more than 256 distinct colors lose the
/// overflow: unseen colors pack as palette index 0.
pub fn compress(
    pixels: &[u32],
    width: u16,
    height: u16,
    format: Format,
    channel_bits: ChannelBits,
) -> Result<Pep> {
    let area = width as usize * height as usize;
    if area == 0 {
        return Err(Error::EmptyImage);
    }
    if width > frame::DIM_MAX || height > frame::DIM_MAX {
        return Err(Error::DimensionsOutOfRange { width, height });
    }
    if pixels.len() != area {
        return Err(Error::PixelCountMismatch {
            expected: area,
            got: pixels.len(),
        });
    }

    let palette = Palette::build(pixels);
    let bits_per_index = palette.bits_per_index();
    let indices_per_byte = 8 / bits_per_index;

    let mut model = Model::new(palette.len());
    let mut encoder = RangeEncoder::with_capacity(area / 4 + 16);

    let mut symbol = 0u8;
    let mut packed = 0u8;
    for &pixel in pixels {
        symbol |= palette.index_of(pixel) << (packed * bits_per_index);
        packed += 1;
        if packed == indices_per_byte {
            model.encode(&mut encoder, symbol);
            symbol = 0;
            packed = 0;
        }
    }
    if packed > 0 {
        model.encode(&mut encoder, symbol);
    }

    Ok(Pep {
        width,
        height,
        format,
        channel_bits,
        palette,
        payload: encoder.finish(),
    })
}

impl Pep {
    /// Decompress into a pixel buffer of `width * height` entries in
    /// `out_format`.
    ///
    /// `first_color_transparent` zeroes the alpha of palette entry 0 for
    /// this call only; `premultiply` scales each output pixel's color
    /// channels by its alpha. A corrupt or truncated payload still yields
    /// a full-size buffer, garbage past the point of damage.
    pub fn decompress(
        &self,
        out_format: Format,
        first_color_transparent: bool,
        premultiply: bool,
    ) -> Result<Vec<u32>> {
        let area = self.width as usize * self.height as usize;
        if area == 0 || self.payload.is_empty() {
            return Err(Error::EmptyImage);
        }

        let bits_per_index = self.palette.bits_per_index();
        let indices_per_byte = 8 / bits_per_index;
        let index_mask = (1u16 << bits_per_index) - 1;

        let mut palette = self.palette.clone();
        if first_color_transparent {
            let alpha_index = self.format.alpha_index();
            let mut bytes = palette.color(0).to_le_bytes();
            bytes[alpha_index] = 0;
            palette.set(0, u32::from_le_bytes(bytes));
        }

        let mut model = Model::new(self.palette.len());
        let mut decoder = RangeDecoder::new(&self.payload);

        let packed_count = area.div_ceil(indices_per_byte as usize);
        let mut pixels = Vec::with_capacity(area);

        for _ in 0..packed_count {
            let symbol = model.decode(&mut decoder);
            for slot in 0..indices_per_byte {
                if pixels.len() == area {
                    break;
                }
                let index = ((symbol >> (slot * bits_per_index)) & index_mask) as u8;
                let mut pixel = reformat(palette.color(index), self.format, out_format);
                if premultiply {
                    pixel = pre_multiply(pixel, out_format);
                }
                pixels.push(pixel);
            }
        }

        Ok(pixels)
    }

    /// Serialize into the container byte layout.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        frame::serialize(self)
    }

    /// Parse a container byte stream.
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        frame::deserialize(bytes)
    }

    /// Serialize and write to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.serialize()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Read `path` and deserialize.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::deserialize(&bytes)
    }
}
