//! Container framing.
//!
//! On-disk layout (big-endian where multi-byte):
//!
//! ```plain
//! flags ∥ dimensions ∥ varint payload size ∥ [palette] ∥ payload
//! ```
//!
//! The flags byte packs the channel order (bits 0-1), the palette channel
//! depth (bits 2-3), `is_small` (bit 4), `only_rgb` (bit 5) and
//! `is_bitmap` (bit 6); bit 7 is reserved. Small images store `w-1`/`h-1`
//! as one byte each, larger ones pack both 12-bit values into three
//! bytes. The payload size is a 7-bits-per-byte varint, low group first.
//! A two-entry opaque black/white palette is omitted entirely
//! (`is_bitmap`), and a palette whose entries are all opaque drops its
//! alpha channel (`only_rgb`).

use crate::error::{Error, Result};
use crate::image::Pep;
use crate::palette::Palette;
use crate::pixel::{ChannelBits, Format};

/// Largest width or height the three-byte dimension encoding can hold.
pub const DIM_MAX: u16 = 4096;

const FLAG_SMALL: u8 = 1 << 4;
const FLAG_ONLY_RGB: u8 = 1 << 5;
const FLAG_BITMAP: u8 = 1 << 6;

/// Bounded cursor over a serialized stream.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn read_u8(&mut self) -> Result<u8> {
        let byte = *self.data.get(self.pos).ok_or(Error::TruncatedStream)?;
        self.pos += 1;
        Ok(byte)
    }

    /// Read a 7-bit-per-byte varint, low group first.
    ///
    /// A u32 needs at most five groups; a longer continuation chain is
    /// malformed.
    fn read_vint(&mut self) -> Result<u32> {
        let mut value = 0u32;
        let mut shift = 0;
        loop {
            let byte = self.read_u8()?;
            if shift >= 35 {
                return Err(Error::TruncatedStream);
            }
            value |= ((byte & 0x7F) as u32) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}

fn write_vint(out: &mut Vec<u8>, mut value: u32) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Upsample a `width`-bit channel value to 8 bits by bit replication, so
/// zero maps to 0x00 and all-ones to 0xFF.
fn upsample(value: u8, width: u8) -> u8 {
    let mut scaled = value << (8 - width);
    let mut shift = width;
    while shift < 8 {
        scaled |= scaled >> shift;
        shift <<= 1;
    }
    scaled
}

fn is_bitmap_palette(palette_count: usize, palette: &Palette, format: Format) -> bool {
    if palette_count != 2 {
        return false;
    }
    let black = format.opaque_black();
    let (c0, c1) = (palette.color(0), palette.color(1));
    (c0 == u32::MAX && c1 == black) || (c0 == black && c1 == u32::MAX)
}

/// Serialize an image descriptor into the container layout.
pub(crate) fn serialize(pep: &Pep) -> Result<Vec<u8>> {
    if pep.payload.is_empty() {
        return Err(Error::EmptyImage);
    }
    if pep.width == 0 || pep.height == 0 || pep.width > DIM_MAX || pep.height > DIM_MAX {
        return Err(Error::DimensionsOutOfRange {
            width: pep.width,
            height: pep.height,
        });
    }

    // A zero length on the wire means a full 256-entry palette.
    let palette_count = match pep.palette.len() {
        0 => 256,
        n => n as usize,
    };
    let alpha_index = pep.format.alpha_index();

    let w = pep.width - 1;
    let h = pep.height - 1;
    let is_small = w <= 255 && h <= 255;

    let is_bitmap = is_bitmap_palette(palette_count, &pep.palette, pep.format);
    let only_rgb = is_bitmap
        || (0..palette_count)
            .all(|i| pep.palette.color(i as u8).to_le_bytes()[alpha_index] == 0xFF);

    let mut out = Vec::with_capacity(16 + palette_count * 4 + pep.payload.len());

    let mut flags = (pep.format as u8) | ((pep.channel_bits as u8) << 2);
    if is_small {
        flags |= FLAG_SMALL;
    }
    if only_rgb {
        flags |= FLAG_ONLY_RGB;
    }
    if is_bitmap {
        flags |= FLAG_BITMAP;
    }
    out.push(flags);

    if is_small {
        out.push(w as u8);
        out.push(h as u8);
    } else {
        let packed = ((w as u32 & 0xFFF) << 12) | (h as u32 & 0xFFF);
        out.push((packed >> 16) as u8);
        out.push((packed >> 8) as u8);
        out.push(packed as u8);
    }

    write_vint(&mut out, pep.payload.len() as u32);

    if !is_bitmap {
        out.push(pep.palette.len() as u8);

        let width = pep.channel_bits.width();
        if width == 8 {
            for i in 0..palette_count {
                let bytes = pep.palette.color(i as u8).to_le_bytes();
                for (pos, &byte) in bytes.iter().enumerate() {
                    if only_rgb && pos == alpha_index {
                        continue;
                    }
                    out.push(byte);
                }
            }
        } else {
            let shift = 8 - width;
            let mask = (1u8 << width) - 1;
            let mut bit_buffer = 0u32;
            let mut bit_count = 0u8;

            for i in 0..palette_count {
                let bytes = pep.palette.color(i as u8).to_le_bytes();
                for (pos, &byte) in bytes.iter().enumerate() {
                    if only_rgb && pos == alpha_index {
                        continue;
                    }
                    bit_buffer = (bit_buffer << width) | ((byte >> shift) & mask) as u32;
                    bit_count += width;
                    while bit_count >= 8 {
                        bit_count -= 8;
                        out.push((bit_buffer >> bit_count) as u8);
                    }
                }
            }

            if bit_count > 0 {
                out.push((bit_buffer << (8 - bit_count)) as u8);
            }
        }
    }

    out.extend_from_slice(&pep.payload);
    Ok(out)
}

/// Deserialize a container stream back into an image descriptor.
///
/// A truncated header is an error. A truncated payload is accepted as the
/// available prefix; the entropy decoder zero-extends past its end.
pub(crate) fn deserialize(bytes: &[u8]) -> Result<Pep> {
    let mut reader = Reader::new(bytes);

    let flags = reader.read_u8()?;
    let format = Format::from_bits(flags);
    let channel_bits = ChannelBits::from_bits(flags >> 2);
    let is_small = flags & FLAG_SMALL != 0;
    let only_rgb = flags & FLAG_ONLY_RGB != 0;
    let is_bitmap = flags & FLAG_BITMAP != 0;

    let (width, height) = if is_small {
        (
            reader.read_u8()? as u16 + 1,
            reader.read_u8()? as u16 + 1,
        )
    } else {
        let packed = ((reader.read_u8()? as u32) << 16)
            | ((reader.read_u8()? as u32) << 8)
            | reader.read_u8()? as u32;
        (
            ((packed >> 12) & 0xFFF) as u16 + 1,
            (packed & 0xFFF) as u16 + 1,
        )
    };

    let payload_size = reader.read_vint()? as usize;

    let alpha_index = format.alpha_index();
    let mut palette = Palette::new();

    if is_bitmap {
        palette.push(format.opaque_black());
        palette.push(u32::MAX);
    } else {
        let palette_count = match reader.read_u8()? {
            0 => 256usize,
            n => n as usize,
        };

        let width_bits = channel_bits.width();
        if width_bits == 8 {
            for _ in 0..palette_count {
                let mut bytes = [0u8; 4];
                for (pos, byte) in bytes.iter_mut().enumerate() {
                    *byte = if only_rgb && pos == alpha_index {
                        0xFF
                    } else {
                        reader.read_u8()?
                    };
                }
                palette.push(u32::from_le_bytes(bytes));
            }
        } else {
            let mask = (1u8 << width_bits) - 1;
            let mut bit_buffer = 0u32;
            let mut bit_count = 0u8;

            for _ in 0..palette_count {
                let mut bytes = [0u8; 4];
                for (pos, byte) in bytes.iter_mut().enumerate() {
                    if only_rgb && pos == alpha_index {
                        *byte = 0xFF;
                        continue;
                    }
                    while bit_count < width_bits {
                        bit_buffer = (bit_buffer << 8) | reader.read_u8()? as u32;
                        bit_count += 8;
                    }
                    bit_count -= width_bits;
                    let value = (bit_buffer >> bit_count) as u8 & mask;
                    *byte = upsample(value, width_bits);
                }
                palette.push(u32::from_le_bytes(bytes));
            }
        }
    }

    let available = reader.remaining();
    let payload = available[..payload_size.min(available.len())].to_vec();

    Ok(Pep {
        width,
        height,
        format,
        channel_bits,
        palette,
        payload,
    })
}
