//! Adaptive PPM order-2 model.
//!
//! Predicts each packed-index byte from the byte that preceded it: one
//! frequency context per possible previous byte, with an all-ones order-0
//! table as fallback. A context that has never seen the incoming symbol
//! emits the reserved escape symbol and defers to order-0; both halves of
//! the codec replay the identical branch discipline, so their statistics
//! stay in lockstep without any side information.

use crate::coder::{Prob, RangeDecoder, RangeEncoder, PROB_MAX};

/// Symbols per context: 256 packed-index bytes plus the escape.
pub const FREQ_N: usize = 257;
/// The escape symbol, signalling a fall-through to order-0.
pub const ESCAPE: usize = FREQ_N - 1;
/// Number of order-2 contexts; the order-0 table sits one past them.
pub const CONTEXTS: usize = ESCAPE;

/// Starting ceiling for any single frequency count.
const FREQ_MAX_START: u16 = (ESCAPE as u16) >> 1;

/// One frequency table with its cached sum.
#[derive(Clone)]
pub struct Context {
    freq: [u16; FREQ_N],
    sum: u32,
}

impl Context {
    fn new() -> Self {
        Self {
            freq: [0; FREQ_N],
            sum: 0,
        }
    }

    /// Cumulative-frequency interval of `symbol` within this context.
    fn prob_of(&self, symbol: usize) -> Prob {
        let low: u32 = self.freq[..symbol].iter().map(|&f| f as u32).sum();
        Prob {
            low,
            high: low + self.freq[symbol] as u32,
            scale: self.sum,
        }
    }

    /// Linear scan for the symbol whose interval contains `target`.
    ///
    /// The target is clamped below the sum so a corrupt payload can never
    /// select a zero-width interval; valid streams always satisfy
    /// `target < sum` and are unaffected.
    fn symbol_from(&self, target: u32) -> (usize, Prob) {
        let target = target.min(self.sum - 1);

        let mut symbol = 0;
        let mut high = 0u32;
        for (s, &f) in self.freq.iter().enumerate() {
            high += f as u32;
            if high > target {
                symbol = s;
                break;
            }
        }

        let prob = Prob {
            low: high - self.freq[symbol] as u32,
            high,
            scale: self.sum,
        };
        (symbol, prob)
    }

    fn rescale(&mut self) {
        self.sum = 0;
        for f in self.freq.iter_mut() {
            if *f == 0 {
                continue;
            }
            *f = (*f + 1) >> 1;
            self.sum += *f as u32;
        }
    }
}

/// Bump `symbol` in `ctx` and rescale once a count or the sum reaches its
/// ceiling. `freq_max` is shared across every context of one image; its
/// growth step shrinks with the palette, so busy low-color images rescale
/// less often. Growth is unbounded and the u16 is allowed to wrap; both
/// halves compute it identically, so the statistics stay in step.
fn update(ctx: &mut Context, freq_max: &mut u16, palette_len: u16, symbol: usize) {
    ctx.freq[symbol] += 2;
    ctx.sum += 2;
    if ctx.freq[symbol] >= *freq_max || ctx.sum >= PROB_MAX {
        *freq_max = freq_max.wrapping_add((ESCAPE as u16 - palette_len) >> 1);
        ctx.rescale();
    }
}

/// Model state for one compress or decompress call.
pub struct Model {
    contexts: Vec<Context>,
    freq_max: u16,
    context_id: u64,
    palette_len: u16,
}

impl Model {
    /// Create a fresh model: empty order-2 contexts, all-ones order-0.
    pub fn new(palette_len: u16) -> Self {
        let mut contexts = vec![Context::new(); CONTEXTS + 1];

        let order0 = &mut contexts[CONTEXTS];
        order0.freq = [1; FREQ_N];
        order0.sum = FREQ_N as u32;

        Self {
            contexts,
            freq_max: FREQ_MAX_START,
            context_id: 0,
            palette_len,
        }
    }

    fn split(&mut self) -> (&mut Context, &mut Context) {
        let id = (self.context_id % CONTEXTS as u64) as usize;
        let (order2, order0) = self.contexts.split_at_mut(CONTEXTS);
        (&mut order2[id], &mut order0[0])
    }

    /// Encode one packed-index byte.
    pub fn encode(&mut self, encoder: &mut RangeEncoder, symbol: u8) {
        let s = symbol as usize;
        let palette_len = self.palette_len;
        let mut freq_max = self.freq_max;
        let (ctx, order0) = self.split();
        let ctx_sum = ctx.sum;

        if ctx_sum != 0 && ctx.freq[s] != 0 {
            encoder.encode(ctx.prob_of(s));
            update(ctx, &mut freq_max, palette_len, s);
        } else {
            if ctx_sum != 0 {
                encoder.encode(ctx.prob_of(ESCAPE));
                encoder.normalize();
                ctx.freq[ESCAPE] += 1;
                ctx.sum += 1;
            }

            encoder.encode(order0.prob_of(s));

            if ctx_sum == 0 {
                ctx.freq[ESCAPE] = 1;
                ctx.sum = 1;
            }
            ctx.freq[s] = 1;
            ctx.sum += 1;
            update(order0, &mut freq_max, palette_len, s);
        }

        encoder.normalize();
        self.freq_max = freq_max;
        self.context_id = (self.context_id << 8) | symbol as u64;
    }

    /// Decode one packed-index byte.
    ///
    /// Valid streams always yield a value below 256. A corrupt payload can
    /// surface the escape index from the order-0 table; callers mask the
    /// result down to index width, so output stays bounded either way.
    pub fn decode(&mut self, decoder: &mut RangeDecoder<'_>) -> u16 {
        let palette_len = self.palette_len;
        let mut freq_max = self.freq_max;
        let (ctx, order0) = self.split();
        let ctx_sum = ctx.sum;

        let mut found = None;
        if ctx_sum != 0 {
            let target = decoder.current_freq(ctx_sum);
            let (symbol, prob) = ctx.symbol_from(target);
            decoder.update(prob);

            if symbol != ESCAPE {
                update(ctx, &mut freq_max, palette_len, symbol);
                found = Some(symbol);
            } else {
                ctx.freq[ESCAPE] += 1;
                ctx.sum += 1;
            }
        }

        let symbol = match found {
            Some(symbol) => symbol,
            None => {
                let target = decoder.current_freq(order0.sum);
                let (symbol, prob) = order0.symbol_from(target);
                decoder.update(prob);

                if ctx_sum == 0 {
                    ctx.freq[ESCAPE] = 1;
                    ctx.sum = 1;
                }
                ctx.freq[symbol] = 1;
                ctx.sum += 1;
                update(order0, &mut freq_max, palette_len, symbol);
                symbol
            }
        };

        self.freq_max = freq_max;
        self.context_id = (self.context_id << 8) | symbol as u64;
        symbol as u16
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        for ctx in &self.contexts {
            let total: u32 = ctx.freq.iter().map(|&f| f as u32).sum();
            assert_eq!(ctx.sum, total);
            assert!(ctx.sum <= PROB_MAX);
        }
    }
}
