//! PDF string codecs shared by the extractor, rebuilder, and editor.
//!
//! Simple fonts in this crate are written with WinAnsiEncoding (CP1252),
//! so text strings round-trip through the byte<->char mappings here.
//! UTF-16BE strings (BOM-prefixed) are handled on the decode side only.

/// CP1252 code points 0x80..=0x9F, where the encoding diverges from
/// Latin-1. `\u{FFFD}` marks the five undefined slots.
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{FFFD}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{FFFD}', '\u{017D}', '\u{FFFD}',
    '\u{FFFD}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{FFFD}', '\u{017E}', '\u{0178}',
];

/// Decode a single WinAnsi byte to a char.
pub fn byte_to_char(byte: u8) -> char {
    match byte {
        0x80..=0x9F => CP1252_HIGH[usize::from(byte - 0x80)],
        // ASCII and the Latin-1 range map 1:1
        _ => char::from(byte),
    }
}

/// Encode a char as a WinAnsi byte, if representable.
pub fn char_to_byte(c: char) -> Option<u8> {
    match u32::from(c) {
        code @ (0x20..=0x7E | 0xA0..=0xFF) => Some(code as u8),
        _ => CP1252_HIGH
            .iter()
            .position(|&h| h == c && h != '\u{FFFD}')
            .map(|i| 0x80 + i as u8),
    }
}

/// Encode a string as WinAnsi bytes, substituting '?' for characters the
/// encoding cannot represent.
pub fn encode_lossy(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| char_to_byte(c).unwrap_or(b'?'))
        .collect()
}

/// Decode the raw bytes of a PDF text string.
///
/// Recognizes the UTF-16BE byte-order mark; everything else is treated as
/// WinAnsi, which also covers plain ASCII output from most generators.
pub fn decode_string(raw: &[u8]) -> String {
    if raw.len() >= 2 && raw[0] == 0xFE && raw[1] == 0xFF {
        let units: Vec<u16> = raw[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        char::decode_utf16(units)
            .map(|r| r.unwrap_or('\u{FFFD}'))
            .collect()
    } else {
        raw.iter().copied().map(byte_to_char).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_round_trips() {
        let text = "Hello, World! (parens) and \\backslash\\";
        assert_eq!(decode_string(&encode_lossy(text)), text);
    }

    #[test]
    fn latin1_round_trips() {
        let text = "déjà vu — naïve café";
        assert_eq!(decode_string(&encode_lossy(text)), text);
    }

    #[test]
    fn cp1252_quotes_round_trip() {
        let text = "\u{201C}quoted\u{201D} \u{2013} dash";
        assert_eq!(decode_string(&encode_lossy(text)), text);
    }

    #[test]
    fn unmappable_becomes_question_mark() {
        assert_eq!(encode_lossy("日本"), b"??".to_vec());
    }

    #[test]
    fn utf16be_decodes() {
        let mut raw = vec![0xFE, 0xFF];
        for unit in "Bonjour".encode_utf16() {
            raw.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode_string(&raw), "Bonjour");
    }
}
