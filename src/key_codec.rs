//! Arithmetic coder/decoder for packing and unpacking dictionary keys.
//!
//! Operates on 16-bit range-coder state with underflow-bit accounting
//! against the static model in [`crate::alphabet`]. The bit pattern this
//! module emits and consumes must stay identical across versions; see
//! [`crate::alphabet::MODEL`] for the frequency table this depends on.
use crate::alphabet::{self, Interval, EOS, MODEL, SCALE};
use crate::error::KeyCodecError;

/// An explicit MSB-first bit writer over a growable byte buffer, replacing
/// the historical pointer-and-macro approach with ordinary owned state.
struct BitWriter {
    buf: Vec<u8>,
    mask: u8,
}

impl BitWriter {
    fn new() -> Self {
        Self {
            buf: vec![0],
            mask: 0x80,
        }
    }

    fn push(&mut self, bit: bool) {
        if bit {
            *self.buf.last_mut().expect("buffer always has a current byte") |= self.mask;
        }
        self.mask >>= 1;
        if self.mask == 0 {
            self.mask = 0x80;
            self.buf.push(0);
        }
    }

    /// Consumes the writer, trimming the trailing byte if it was never
    /// written into.
    fn finish(mut self) -> Vec<u8> {
        if self.mask == 0x80 {
            self.buf.pop();
        }
        self.buf
    }
}

/// Shared rescale step used by both the encoder and the decoder: narrows
/// `[low, high]` to the sub-range assigned to `interval` within the
/// current range.
fn rescale(low: u16, high: u16, interval: Interval) -> (u16, u16) {
    let range = i64::from(high) - i64::from(low) + 1;
    let high_delta = (range * i64::from(interval.high) / i64::from(SCALE) - 1) as u16;
    let low_delta = (range * i64::from(interval.low) / i64::from(SCALE)) as u16;
    let new_high = low.wrapping_add(high_delta);
    let new_low = low.wrapping_add(low_delta);
    (new_low, new_high)
}

/// Packs `s` into its arithmetic-coded key representation.
///
/// # Errors
///
/// Returns [`KeyCodecError`] if `s` starts with a letter from *G3*,
/// contains an illegal adjacent pair, or contains a byte outside the
/// alphabet.
pub fn pack_key(s: &[u8]) -> Result<Vec<u8>, KeyCodecError> {
    let mut low: u16 = 0;
    let mut high: u16 = 0xffff;
    let mut underflow: u32 = 0;
    let mut writer = BitWriter::new();

    let n = s.len();
    for i in 0..=n {
        let sym = if i < n {
            let b = s[i];
            if i == 0 {
                if alphabet::is_g3(b) {
                    return Err(KeyCodecError::ForbiddenInitial);
                }
            } else if !alphabet::validate_pair(s[i - 1], b) {
                return Err(KeyCodecError::IllegalAdjacency);
            }
            alphabet::idx(b).ok_or(KeyCodecError::NotInAlphabet)?
        } else {
            EOS
        };

        let (new_low, new_high) = rescale(low, high, MODEL[sym as usize]);
        low = new_low;
        high = new_high;

        loop {
            if (high & 0x8000) == (low & 0x8000) {
                let bit = high & 0x8000 != 0;
                writer.push(bit);
                while underflow > 0 {
                    writer.push(!bit);
                    underflow -= 1;
                }
            } else if (low & 0x4000) != 0 && (high & 0x4000) == 0 {
                underflow += 1;
                low &= 0x3fff;
                high |= 0x4000;
            } else {
                break;
            }
            low <<= 1;
            high = (high << 1) | 1;
        }
    }

    let final_bit = low & 0x4000 != 0;
    writer.push(final_bit);
    underflow += 1;
    while underflow > 0 {
        writer.push(!final_bit);
        underflow -= 1;
    }
    Ok(writer.finish())
}

/// Unpacks `bytes` into at most `max_out` letters, stopping at the first
/// decoded EOS symbol.
///
/// # Errors
///
/// Returns [`KeyCodecError::BufferTooSmall`] if `max_out` bytes are
/// produced without encountering EOS.
pub fn unpack_key(bytes: &[u8], max_out: usize) -> Result<Vec<u8>, KeyCodecError> {
    let mut out = Vec::new();
    if bytes.is_empty() {
        return Ok(out);
    }

    let mut low: u16 = 0;
    let mut high: u16 = 0xffff;
    let mut mask: u8 = 0x80;
    let mut code: u16 = (bytes[0] as u16) << 8;
    let mut k = 1usize;
    if bytes.len() > 1 {
        code = code.wrapping_add(bytes[1] as u16);
        k = 2;
    }

    loop {
        if out.len() >= max_out {
            return Err(KeyCodecError::BufferTooSmall);
        }
        let range = i64::from(high) - i64::from(low) + 1;
        let count = (((i64::from(code) - i64::from(low) + 1) * i64::from(SCALE) - 1) / range) as u16;

        let mut sym = EOS;
        for i in (0..=EOS as usize).rev() {
            if count >= MODEL[i].low {
                sym = i as u8;
                break;
            }
        }
        if sym == EOS {
            break;
        }
        out.push(alphabet::ALPHABET[sym as usize]);

        let (new_low, new_high) = rescale(low, high, MODEL[sym as usize]);
        low = new_low;
        high = new_high;

        loop {
            if (high ^ low) & 0x8000 != 0 {
                if (low & 0x4000) != 0 && (high & 0x4000) == 0 {
                    code ^= 0x4000;
                    low &= 0x3fff;
                    high |= 0x4000;
                } else {
                    break;
                }
            }
            low <<= 1;
            high = (high << 1) | 1;
            code <<= 1;
            if k < bytes.len() {
                if bytes[k] & mask != 0 {
                    code = code.wrapping_add(1);
                }
                mask >>= 1;
                if mask == 0 {
                    k += 1;
                    mask = 0x80;
                }
            }
        }
    }
    Ok(out)
}
