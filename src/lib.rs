//! # pep: indexed-palette pixel art codec
//!
//! *Lossless compression tuned for images with very few colors.*
//!
//! ## Intuition First
//!
//! Pixel art is dominated by two redundancies: a tiny set of distinct
//! colors, and strong local repetition (runs, dithering patterns, tiled
//! shapes). pep attacks the first with an indexed palette (each pixel
//! shrinks to a 1/2/4/8-bit index, several indices packed per byte) and
//! the second with an adaptive statistical model over those packed bytes:
//! a byte seen after the same predecessor before becomes extremely cheap
//! to code.
//!
//! The entropy stage is Prediction by Partial Matching (PPM): one
//! frequency table per previous packed byte, falling back to a shared
//! order-0 table through an explicit escape symbol when a context has
//! never seen the incoming byte. Probabilities feed a 32-bit range coder
//! that emits one byte at a time.
//!
//! ## The Problem
//!
//! General-purpose compressors spend their headers and models on the
//! 16-million-color case. A 16-color sprite sheet doesn't need that: it
//! needs the palette stored once, quantisable to a few bits per channel,
//! and an entropy coder whose statistics adapt within a few hundred
//! symbols. pep's container is equally frugal: a one-byte flag word,
//! one-byte dimensions for small images, and a short-circuit that stores
//! a pure black-and-white image with no palette at all.
//!
//! ## On-Disk Layout
//!
//! ```plain
//! .- flags -----------------------------------------------.
//! |  7  6  5  4  3  2  1  0                               |
//! |  0  |  |  |  '--'  '--'-- channel order (RGBA..ARGB)  |
//! |     |  |  |     '-------- palette channel bit depth   |
//! |     |  |  '-------------- is_small                    |
//! |     |  '----------------- only_rgb                    |
//! |     '-------------------- is_bitmap                   |
//! `-------------------------------------------------------`
//! flags
//!   ∥ dimensions        is_small: (w-1) (h-1), one byte each
//!                       else: 3 bytes, (w-1)<<12 | (h-1), big-endian
//!   ∥ payload size      varint, 7 bits per byte, low group first
//!   ∥ palette           unless is_bitmap: count byte (0 = 256), then
//!                       entries at 1/2/4/8 bits per channel, alpha
//!                       omitted when only_rgb
//!   ∥ payload           range-coder output
//! ```
//!
//! ## Implementation Notes
//!
//! - [`compress`] builds the palette in first-seen order, packs indices
//!   LSB-first into bytes, and codes each byte with the PPM model.
//! - [`Pep::decompress`] replays the identical model, so no statistics
//!   are stored in the container.
//! - The coder tolerates truncated or corrupt payloads by zero-extending
//!   reads; output is always `width * height` pixels.
//! - One compress or decompress call owns all of its model state, so
//!   disjoint calls are freely parallel.
//!
//! ## Failure Modes
//!
//! 1. **Palette overflow**: beyond 256 distinct colors, the overflow
//!    maps to palette entry 0. pep is only lossless within its 256-color
//!    limit.
//! 2. **High-entropy input**: photographs with saturated palettes defeat
//!    the order-2 contexts and can expand slightly past raw packed size.
//!
//! ## References
//!
//! - Cleary, J. & Witten, I. (1984). "Data Compression Using Adaptive
//!   Coding and Partial String Matching."
//! - Subbotin, D. (1999). Carryless range coder.
//! - ENDESGA (2025). The .pep pixel art format.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coder;
pub mod error;
mod frame;
pub mod image;
pub mod model;
pub mod palette;
pub mod pixel;

pub use error::{Error, Result};
pub use image::{compress, Pep};
pub use palette::Palette;
pub use pixel::{ChannelBits, Format};
