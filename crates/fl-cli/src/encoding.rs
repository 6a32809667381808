//! Decoding of CSV files to text.
//!
//! Exports are UTF-8 on current systems. Older Mac apps wrote Mac Roman,
//! which maps every byte to a character, so decoding never fails.

use std::borrow::Cow;

/// Characters of Mac Roman bytes `0x80..=0xFF`.
const MAC_ROMAN_HIGH: [char; 128] = [
    'Ä', 'Å', 'Ç', 'É', 'Ñ', 'Ö', 'Ü', 'á', 'à', 'â', 'ä', 'ã', 'å', 'ç', 'é', 'è', //
    'ê', 'ë', 'í', 'ì', 'î', 'ï', 'ñ', 'ó', 'ò', 'ô', 'ö', 'õ', 'ú', 'ù', 'û', 'ü', //
    '†', '°', '¢', '£', '§', '•', '¶', 'ß', '®', '©', '™', '´', '¨', '≠', 'Æ', 'Ø', //
    '∞', '±', '≤', '≥', '¥', 'µ', '∂', '∑', '∏', 'π', '∫', 'ª', 'º', 'Ω', 'æ', 'ø', //
    '¿', '¡', '¬', '√', 'ƒ', '≈', '∆', '«', '»', '…', '\u{a0}', 'À', 'Ã', 'Õ', 'Œ', 'œ', //
    '–', '—', '“', '”', '‘', '’', '÷', '◊', 'ÿ', 'Ÿ', '⁄', '€', '‹', '›', 'ﬁ', 'ﬂ', //
    '‡', '·', '‚', '„', '‰', 'Â', 'Ê', 'Á', 'Ë', 'È', 'Í', 'Î', 'Ï', 'Ì', 'Ó', 'Ô', //
    '\u{f8ff}', 'Ò', 'Ú', 'Û', 'Ù', 'ı', 'ˆ', '˜', '¯', '˘', '˙', '˚', '¸', '˝', '˛', 'ˇ', //
];

/// Which decoder produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    MacRoman,
}

/// Decodes `bytes` as UTF-8, falling back to Mac Roman.
///
/// A leading byte order mark is dropped.
pub fn decode(bytes: &[u8]) -> (Cow<'_, str>, Encoding) {
    match std::str::from_utf8(bytes) {
        Ok(text) => (
            Cow::Borrowed(text.strip_prefix('\u{feff}').unwrap_or(text)),
            Encoding::Utf8,
        ),
        Err(_) => (Cow::Owned(decode_mac_roman(bytes)), Encoding::MacRoman),
    }
}

fn decode_mac_roman(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&byte| {
            if byte.is_ascii() {
                char::from(byte)
            } else {
                MAC_ROMAN_HIGH[usize::from(byte - 0x80)]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_is_borrowed() {
        let (text, encoding) = decode("Datum;Kilometer\n".as_bytes());
        assert!(matches!(text, Cow::Borrowed(_)));
        assert_eq!(encoding, Encoding::Utf8);
    }

    #[test]
    fn byte_order_mark_is_dropped() {
        let (text, _) = decode(b"\xEF\xBB\xBFDate;Time\n");
        assert_eq!(text, "Date;Time\n");
    }

    #[test]
    fn falls_back_to_mac_roman() {
        // "Réservoir plein;Maßeinheit" as written by a Mac Roman export.
        let bytes = b"R\x8Eservoir plein;Ma\xA7einheit";
        let (text, encoding) = decode(bytes);
        assert_eq!(encoding, Encoding::MacRoman);
        assert_eq!(text, "Réservoir plein;Maßeinheit");
    }

    #[test]
    fn mac_roman_covers_every_byte() {
        let bytes: Vec<u8> = (0..=255).collect();
        let text = decode_mac_roman(&bytes);
        assert_eq!(text.chars().count(), 256);
        assert!(text.ends_with('ˇ'));
    }
}
