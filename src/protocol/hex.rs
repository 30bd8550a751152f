//! ASCII hex text form for byte blobs
//!
//! The pub/sub transport between the field controller and the radio bridge carries
//! frames as lowercase hex text, two characters per byte.

use ::hex::FromHexError;

use super::{Error, Result};

/// Render `bytes` as lowercase hex text
#[must_use]
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    ::hex::encode(bytes)
}

/// Parse hex text (either case) back into bytes
pub fn decode(text: impl AsRef<[u8]>) -> Result<Vec<u8>> {
    let text = text.as_ref();
    ::hex::decode(text).map_err(|err| {
        let offset = match err {
            FromHexError::InvalidHexCharacter { index, .. } => index,
            FromHexError::OddLength | FromHexError::InvalidStringLength => text.len(),
        };
        Error::InvalidHex { offset }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_two_digits_per_byte() {
        assert_eq!(encode([0u8, 3, 1, 44, 2, 0xFF]), "0003012c02ff");
        assert!(encode(b"").is_empty());
    }

    #[test]
    fn decodes_either_case() {
        assert_eq!(decode("2C02fF").unwrap(), vec![0x2C, 0x02, 0xFF]);
    }

    #[test]
    fn rejects_bad_text() {
        assert!(matches!(decode("abc"), Err(Error::InvalidHex { offset: 3 })));
        assert!(matches!(decode("0g"), Err(Error::InvalidHex { offset: 1 })));
        assert!(matches!(decode(b"zz"), Err(Error::InvalidHex { offset: 0 })));
    }
}
