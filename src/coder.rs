//! 32-bit range coder.
//!
//! A byte-oriented arithmetic coder: the message narrows a 32-bit
//! `[low, low + range)` interval in proportion to symbol probabilities,
//! shifting out the top byte whenever it has settled. Underflow (a range
//! straddling a carry boundary it can no longer resolve) is broken by
//! widening `range` to the next probability-ceiling boundary.

/// Bits shifted out per renormalisation step, counted from the top.
pub const CODE_BITS: u32 = 24;
/// Complement of [`CODE_BITS`] in a 32-bit word.
pub const CODE_BITS_INV: u32 = 32 - CODE_BITS;
/// Bit width of the probability ceiling.
pub const FREQ_MAX_BITS: u32 = 14;
/// Upper bound for any cumulative frequency fed to the coder.
pub const PROB_MAX: u32 = 1 << FREQ_MAX_BITS;
/// Renormalisation trigger threshold.
pub const CODE_MAX: u32 = (1 << CODE_BITS) - 1;

/// A symbol's cumulative-frequency interval within its context.
///
/// Satisfies `low < high <= scale <= PROB_MAX`.
#[derive(Clone, Copy, Debug)]
pub struct Prob {
    /// Cumulative frequency below the symbol.
    pub low: u32,
    /// Cumulative frequency through the symbol.
    pub high: u32,
    /// Total frequency of the context.
    pub scale: u32,
}

/// Range-coder encoder. Owns the growing output stream.
pub struct RangeEncoder {
    low: u32,
    range: u32,
    data: Vec<u8>,
}

impl RangeEncoder {
    /// Create a new encoder with an empty output stream.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a new encoder, reserving `capacity` output bytes up front.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            low: 0,
            range: u32::MAX,
            data: Vec::with_capacity(capacity),
        }
    }

    /// Narrow the interval to the symbol described by `prob`.
    ///
    /// `low` wraps intentionally; the carry is resolved lazily by
    /// [`RangeEncoder::normalize`].
    pub fn encode(&mut self, prob: Prob) {
        self.range /= prob.scale;
        self.low = self.low.wrapping_add(prob.low.wrapping_mul(self.range));
        self.range = self.range.wrapping_mul(prob.high - prob.low);
    }

    /// Shift out settled top bytes until `range >= PROB_MAX` again.
    pub fn normalize(&mut self) {
        loop {
            if (self.low ^ self.low.wrapping_add(self.range)) >= CODE_MAX {
                if self.range >= PROB_MAX {
                    break;
                }
                // Underflow: widen to the next probability boundary.
                self.range = PROB_MAX - (self.low & (PROB_MAX - 1));
            }

            self.data.push((self.low >> CODE_BITS) as u8);
            self.low <<= CODE_BITS_INV;
            self.range <<= CODE_BITS_INV;
        }
    }

    /// Flush the remaining state and return the compressed stream.
    pub fn finish(mut self) -> Vec<u8> {
        for _ in 0..4 {
            self.data.push((self.low >> CODE_BITS) as u8);
            self.low <<= CODE_BITS_INV;
        }
        self.data
    }

    #[cfg(test)]
    pub(crate) fn debug_state(&self) -> (u32, u32) {
        (self.low, self.range)
    }
}

impl Default for RangeEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Range-coder decoder over a borrowed payload.
///
/// Reads past the end of the payload yield zero bytes, so a truncated or
/// corrupt stream decodes to bounded garbage instead of faulting.
pub struct RangeDecoder<'a> {
    data: &'a [u8],
    pos: usize,
    low: u32,
    range: u32,
    code: u32,
}

impl<'a> RangeDecoder<'a> {
    /// Create a decoder, priming the 32-bit look-ahead from the stream.
    pub fn new(data: &'a [u8]) -> Self {
        let mut decoder = Self {
            data,
            pos: 0,
            low: 0,
            range: u32::MAX,
            code: 0,
        };
        for _ in 0..4 {
            decoder.code = (decoder.code << 8) | decoder.next_byte() as u32;
        }
        decoder
    }

    fn next_byte(&mut self) -> u8 {
        let byte = self.data.get(self.pos).copied().unwrap_or(0);
        self.pos += 1;
        byte
    }

    /// Scale the range down and return the frequency the stream points at.
    pub fn current_freq(&mut self, scale: u32) -> u32 {
        self.range /= scale;
        if self.range == 0 {
            // Corrupt streams can drive the range below the scale; pin it
            // so renormalisation still terminates.
            self.range = 1;
        }
        self.code.wrapping_sub(self.low) / self.range
    }

    /// Narrow the interval to the identified symbol and renormalise,
    /// pulling in stream bytes as the encoder emitted them.
    pub fn update(&mut self, prob: Prob) {
        self.low = self.low.wrapping_add(self.range.wrapping_mul(prob.low));
        self.range = self.range.wrapping_mul(prob.high - prob.low);

        loop {
            if (self.low ^ self.low.wrapping_add(self.range)) >= CODE_MAX {
                if self.range >= PROB_MAX {
                    break;
                }
                self.range = PROB_MAX - (self.low & (PROB_MAX - 1));
            }

            let byte = self.next_byte();
            self.code = (self.code << 8) | byte as u32;
            self.range <<= 8;
            self.low <<= 8;
        }
    }

    #[cfg(test)]
    pub(crate) fn debug_state(&self) -> (u32, u32, u32) {
        (self.low, self.range, self.code)
    }
}
