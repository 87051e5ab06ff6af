const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NO_VALUE: u8 = 255;
const BASE: u64 = 36;

/// Maximum rendered length for any `u64` (`36^12 < 2^64 <= 36^13`).
pub const MAX_ENCODED_LEN: usize = 13;

/// Lookup table for base-36 decoding
const LOOKUP: [u8; 256] = {
    let mut lut = [NO_VALUE; 256];
    let mut i = 0_u8;
    // Main alphabet, allow lower-case
    while i < 36 {
        let c = ALPHABET[i as usize];
        lut[c as usize] = i;
        if c.is_ascii_uppercase() {
            lut[(c + 32) as usize] = i; // lowercase letter
        }
        i += 1;
    }
    lut
};

/// Errors produced while parsing a base-36 tracking number.
#[derive(Clone, Copy, PartialEq, Eq, thiserror::Error, Debug)]
#[non_exhaustive]
pub enum DecodeError {
    /// The input was empty.
    #[error("empty input")]
    EmptyInput,

    /// The input was longer than [`MAX_ENCODED_LEN`] characters.
    #[error("invalid length {0}: tracking numbers are at most 13 characters")]
    InvalidLength(usize),

    /// The input contained a byte outside `[0-9A-Za-z]`.
    #[error("invalid base-36 byte {byte:#04x} at index {index}")]
    InvalidAscii { byte: u8, index: usize },

    /// The decoded value does not fit the tracking-id space.
    #[error("value out of range for a tracking id")]
    Overflow,
}

/// Encodes `value` as an upper-case base-36 string.
///
/// The output is unpadded: the most significant digit comes first and no
/// leading zeros are emitted, so `0` renders as `"0"` and every `u64` fits in
/// at most [`MAX_ENCODED_LEN`] characters.
///
/// # Example
/// ```
/// use waybill::encode_base36;
///
/// assert_eq!(encode_base36(0), "0");
/// assert_eq!(encode_base36(35), "Z");
/// assert_eq!(encode_base36(36), "10");
/// ```
pub fn encode_base36(mut value: u64) -> String {
    let mut buf = [0u8; MAX_ENCODED_LEN];
    let mut idx = MAX_ENCODED_LEN;
    loop {
        idx -= 1;
        buf[idx] = ALPHABET[(value % BASE) as usize];
        value /= BASE;
        if value == 0 {
            break;
        }
    }
    // The alphabet is pure ASCII, so the occupied suffix is valid UTF-8.
    String::from_utf8_lossy(&buf[idx..]).into_owned()
}

/// Decodes a base-36 string into a `u64`.
///
/// Lower-case letters are accepted on input even though [`encode_base36`]
/// only ever emits upper-case. Fails on empty or over-long input, on any byte
/// outside the alphabet, and on values that overflow 64 bits.
///
/// # Example
/// ```
/// use waybill::decode_base36;
///
/// assert_eq!(decode_base36("10"), Ok(36));
/// assert_eq!(decode_base36("z"), Ok(35));
/// assert!(decode_base36("O-O").is_err());
/// ```
pub fn decode_base36(encoded: &str) -> Result<u64, DecodeError> {
    if encoded.is_empty() {
        return Err(DecodeError::EmptyInput);
    }
    if encoded.len() > MAX_ENCODED_LEN {
        return Err(DecodeError::InvalidLength(encoded.len()));
    }

    let mut acc: u64 = 0;
    for (index, byte) in encoded.bytes().enumerate() {
        let digit = LOOKUP[byte as usize];
        if digit == NO_VALUE {
            return Err(DecodeError::InvalidAscii { byte, index });
        }
        acc = acc
            .checked_mul(BASE)
            .and_then(|acc| acc.checked_add(u64::from(digit)))
            .ok_or(DecodeError::Overflow)?;
    }

    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(val: u64) {
        let s = encode_base36(val);
        let decoded = decode_base36(&s).unwrap();
        assert_eq!(val, decoded, "roundtrip: input={val}, b36={s}");
    }

    #[test]
    fn encode_decode_preserves_values() {
        for &v in &[
            0,
            1,
            35,
            36,
            1295,
            1296,
            42_424_242,
            (1 << 41) - 1,
            (1 << 63) - 1,
            u64::MAX,
        ] {
            roundtrip(v);
        }
    }

    #[test]
    fn encodes_known_values() {
        assert_eq!(encode_base36(0), "0");
        assert_eq!(encode_base36(35), "Z");
        assert_eq!(encode_base36(36), "10");
        assert_eq!(encode_base36(1295), "ZZ");
        assert_eq!(encode_base36(u64::MAX), "3W5E11264SGSF");
        assert_eq!(encode_base36((1 << 63) - 1), "1Y2P0IJ32E8E7");
    }

    #[test]
    fn output_is_unpadded_and_bounded() {
        assert_eq!(encode_base36(0).len(), 1);
        assert_eq!(encode_base36(u64::MAX).len(), MAX_ENCODED_LEN);
        for &v in &[1, 36, 1296, u64::MAX] {
            let s = encode_base36(v);
            assert!(!s.starts_with('0'), "unexpected leading zero: {s}");
            assert!(s.len() <= MAX_ENCODED_LEN);
        }
    }

    #[test]
    fn decode_accepts_lowercase() {
        assert_eq!(decode_base36("zz"), Ok(1295));
        assert_eq!(decode_base36("3w5e11264sgsf"), Ok(u64::MAX));
    }

    #[test]
    fn decode_rejects_empty() {
        assert_eq!(decode_base36(""), Err(DecodeError::EmptyInput));
    }

    #[test]
    fn decode_rejects_over_long_input() {
        assert_eq!(
            decode_base36("00000000000000"),
            Err(DecodeError::InvalidLength(14))
        );
    }

    #[test]
    fn decode_rejects_invalid_bytes() {
        assert_eq!(
            decode_base36("AB!C"),
            Err(DecodeError::InvalidAscii {
                byte: b'!',
                index: 2
            })
        );
        assert_eq!(
            decode_base36("-123"),
            Err(DecodeError::InvalidAscii {
                byte: b'-',
                index: 0
            })
        );
    }

    #[test]
    fn decode_rejects_u64_overflow() {
        // One more than u64::MAX in base-36.
        assert_eq!(decode_base36("3W5E11264SGSG"), Err(DecodeError::Overflow));
        assert_eq!(decode_base36("ZZZZZZZZZZZZZ"), Err(DecodeError::Overflow));
    }
}
