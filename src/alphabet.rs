//! The fixed symbol alphabet and static cumulative-frequency model shared by
//! the key codec and the diff codec.
//!
//! The alphabet is a 33-letter byte set plus an implicit end-of-string (EOS)
//! symbol. Letter *identity* (which byte means which letter) is immaterial
//! to every algorithm in this crate: codecs only ever compare byte values.
//! What matters, and what must stay bit-exact across versions, is the
//! *shape* of the cumulative-frequency table: 34 half-open intervals over
//! `[0, SCALE)`, taken verbatim from the reference lexicon this crate is
//! compatible with.

/// Total number of letters in [`ALPHABET`], not counting EOS.
pub const LEN: usize = 33;

/// Alphabet index reserved for the end-of-string symbol.
pub const EOS: u8 = LEN as u8;

/// The sum of all interval widths in [`MODEL`]; the arithmetic coder's
/// working range is rescaled against this value on every symbol.
pub const SCALE: u16 = 2390;

/// The 33 letter byte values, in the same order as their entries in
/// [`MODEL`]. Index `i` here is also the alphabet index consumed by
/// [`idx`], [`is_vowel`], and friends.
pub const ALPHABET: [u8; LEN] = [
    b'a', b'b', b'c', b'd', b'e', b'f', b'g', b'h', b'i', b'j', b'k', b'l', b'm', b'n', b'o', b'p',
    b'q', b'r', b's', b't', b'u', b'v', b'w', b'x', b'y', b'z', b'A', b'B', b'C', b'D', b'E', b'F',
    b'G',
];

/// A half-open cumulative-frequency interval `[low, high)` for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub low: u16,
    pub high: u16,
}

/// Cumulative-frequency table for all 33 letters plus EOS (34 entries),
/// summing to [`SCALE`]. Order matches [`ALPHABET`]; the final entry is
/// EOS's interval.
pub const MODEL: [Interval; LEN + 1] = [
    Interval { low: 0, high: 185 },
    Interval { low: 185, high: 219 },
    Interval { low: 219, high: 320 },
    Interval { low: 320, high: 354 },
    Interval { low: 354, high: 404 },
    Interval { low: 404, high: 580 },
    Interval { low: 580, high: 582 },
    Interval { low: 582, high: 598 },
    Interval { low: 598, high: 637 },
    Interval { low: 637, high: 797 },
    Interval { low: 797, high: 828 },
    Interval { low: 828, high: 900 },
    Interval { low: 900, high: 995 },
    Interval { low: 995, high: 1068 },
    Interval { low: 1068, high: 1214 },
    Interval { low: 1214, high: 1419 },
    Interval { low: 1419, high: 1488 },
    Interval { low: 1488, high: 1609 },
    Interval { low: 1609, high: 1724 },
    Interval { low: 1724, high: 1838 },
    Interval { low: 1838, high: 1900 },
    Interval { low: 1900, high: 1907 },
    Interval { low: 1907, high: 1929 },
    Interval { low: 1929, high: 1939 },
    Interval { low: 1939, high: 1965 },
    Interval { low: 1965, high: 1991 },
    Interval { low: 1991, high: 2005 },
    Interval { low: 2005, high: 2006 },
    Interval { low: 2006, high: 2053 },
    Interval { low: 2053, high: 2089 },
    Interval { low: 2089, high: 2091 },
    Interval { low: 2091, high: 2114 },
    Interval { low: 2114, high: 2162 },
    Interval { low: 2162, high: 2390 }, // EOS
];

/// Major stress marker byte, legal only in surface forms.
pub const MAJOR_STRESS: u8 = b'+';
/// Minor stress marker byte, legal only in surface forms.
pub const MINOR_STRESS: u8 = b'=';
/// Space-bar marker byte, legal only in surface forms.
pub const SPACE_BAR: u8 = b'-';

/// Subset *V*: vowels. `prev ∈ V` combined with `next ∈ G1` is an illegal
/// adjacency (see [`validate_pair`]).
const V: [u8; 10] = [
    ALPHABET[0],
    ALPHABET[1],
    ALPHABET[2],
    ALPHABET[3],
    ALPHABET[4],
    ALPHABET[5],
    ALPHABET[6],
    ALPHABET[7],
    ALPHABET[8],
    ALPHABET[9],
];

/// Subset *G1*: soft/hard-sign-like letters that must not follow a vowel,
/// marker, or another G1 letter.
const G1: [u8; 2] = [ALPHABET[31], ALPHABET[32]];

/// Subset *G3*: letters forbidden as the first byte of a key.
const G3: [u8; 3] = [ALPHABET[10], ALPHABET[11], ALPHABET[12]];

/// Returns the alphabet index of `b`, or `None` if `b` is not a letter.
pub fn idx(b: u8) -> Option<u8> {
    ALPHABET.iter().position(|&c| c == b).map(|i| i as u8)
}

/// Whether `b` is a marker byte (`+`, `=`, or `-`).
pub fn is_marker(b: u8) -> bool {
    matches!(b, MAJOR_STRESS | MINOR_STRESS | SPACE_BAR)
}

/// Whether `b` is a member of *V*.
pub fn is_vowel(b: u8) -> bool {
    V.contains(&b)
}

/// Whether `b` is a member of *G1*.
pub fn is_g1(b: u8) -> bool {
    G1.contains(&b)
}

/// Whether `b` is a member of *G3*.
pub fn is_g3(b: u8) -> bool {
    G3.contains(&b)
}

/// Whether `b` is forbidden as the first byte of a surface form: *G4* =
/// *G1* ∪ {`-`}.
pub fn is_g4(b: u8) -> bool {
    is_g1(b) || b == SPACE_BAR
}

/// `validate_pair(prev, next)` fails iff `next ∈ G1` and
/// `prev ∈ V ∪ M ∪ G1`. Used on every adjacent byte pair during key
/// encoding and during diff encoding of the (marker-bearing) surface form.
pub fn validate_pair(prev: u8, next: u8) -> bool {
    if is_g1(next) {
        !(is_vowel(prev) || is_marker(prev) || is_g1(prev))
    } else {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_sums_to_scale() {
        assert_eq!(MODEL[LEN].high, SCALE);
        for w in MODEL.windows(2) {
            assert_eq!(w[0].high, w[1].low);
        }
        assert_eq!(MODEL[0].low, 0);
    }

    #[test]
    fn idx_round_trips_alphabet() {
        for (i, &b) in ALPHABET.iter().enumerate() {
            assert_eq!(idx(b), Some(i as u8));
        }
        assert_eq!(idx(b'+'), None);
    }

    #[test]
    fn validate_pair_rejects_only_forbidden_before_g1() {
        let g1 = G1[0];
        assert!(!validate_pair(V[0], g1));
        assert!(!validate_pair(MAJOR_STRESS, g1));
        assert!(!validate_pair(G1[1], g1));
        assert!(validate_pair(ALPHABET[13], g1));
        assert!(validate_pair(V[0], ALPHABET[13]));
    }
}
