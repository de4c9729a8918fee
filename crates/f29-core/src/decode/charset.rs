//! Single-byte and UTF-8 decoders. Every decoder is total over byte input.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Character encodings a byte stream is reinterpreted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextEncoding {
    /// UTF-8, invalid sequences replaced with U+FFFD.
    #[serde(rename = "utf-8")]
    Utf8,

    /// Each byte maps to the code point of the same value.
    #[serde(rename = "latin1")]
    Latin1,

    /// Latin-1 with the 0x80-0x9F block mapped per code page 1252.
    #[serde(rename = "windows-1252")]
    Windows1252,

    /// Latin-1 with control characters (other than tab and line breaks) blanked.
    #[serde(rename = "iso-8859-1")]
    Iso8859_1,
}

impl TextEncoding {
    /// Default decoding order.
    pub const ALL: [TextEncoding; 4] = [
        TextEncoding::Utf8,
        TextEncoding::Latin1,
        TextEncoding::Windows1252,
        TextEncoding::Iso8859_1,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "latin1",
            TextEncoding::Windows1252 => "windows-1252",
            TextEncoding::Iso8859_1 => "iso-8859-1",
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// Code page 1252, bytes 0x80..=0x9F. Unassigned slots keep their Latin-1 value.
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

/// Decode bytes under the given encoding.
pub fn decode(bytes: &[u8], encoding: TextEncoding) -> String {
    match encoding {
        TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        TextEncoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        TextEncoding::Windows1252 => bytes
            .iter()
            .map(|&b| match b {
                0x80..=0x9F => CP1252_HIGH[(b - 0x80) as usize],
                _ => b as char,
            })
            .collect(),
        TextEncoding::Iso8859_1 => bytes
            .iter()
            .map(|&b| match b {
                b'\t' | b'\n' | b'\r' => b as char,
                0x00..=0x1F | 0x7F..=0x9F => ' ',
                _ => b as char,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoders_are_total() {
        let bytes: Vec<u8> = (0..=255).collect();
        for encoding in TextEncoding::ALL {
            let text = decode(&bytes, encoding);
            assert!(!text.is_empty(), "{} produced nothing", encoding);
        }
    }

    #[test]
    fn test_latin1_accents() {
        // "DÉBITO" in Latin-1
        let bytes = [b'D', 0xC9, b'B', b'I', b'T', b'O'];
        assert_eq!(decode(&bytes, TextEncoding::Latin1), "DÉBITO");
        assert_eq!(decode(&bytes, TextEncoding::Windows1252), "DÉBITO");
        assert!(decode(&bytes, TextEncoding::Utf8).contains('\u{FFFD}'));
    }

    #[test]
    fn test_windows_1252_high_block() {
        assert_eq!(decode(&[0x80, 0x96], TextEncoding::Windows1252), "€–");
        assert_eq!(decode(&[0x80], TextEncoding::Latin1), "\u{80}");
    }

    #[test]
    fn test_iso_blanks_controls() {
        let bytes = b"538\x00\x01\x9f3.410.651\n";
        assert_eq!(decode(bytes, TextEncoding::Iso8859_1), "538   3.410.651\n");
    }

    #[test]
    fn test_encoding_serde_labels() {
        let json = serde_json::to_string(&TextEncoding::Windows1252).unwrap();
        assert_eq!(json, "\"windows-1252\"");
        let back: TextEncoding = serde_json::from_str("\"iso-8859-1\"").unwrap();
        assert_eq!(back, TextEncoding::Iso8859_1);
    }
}
