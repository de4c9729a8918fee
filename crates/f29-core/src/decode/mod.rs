//! Byte decoding layer.
//!
//! A file is reinterpreted under several encodings because corrupted PDF
//! streams decode differently under each, and a number may only survive
//! intact under one of them. No encoding is preferred.

mod charset;
#[cfg(feature = "streams")]
mod streams;

pub use charset::{decode, TextEncoding};

use std::fmt;

use tracing::debug;

use crate::models::config::DecodingConfig;

/// Where a decoded text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    /// The uploaded bytes as is.
    Raw,
    /// An inflated PDF stream (index into [`DecodedDocument::streams`]).
    Stream(usize),
}

impl fmt::Display for TextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextSource::Raw => f.write_str("raw"),
            TextSource::Stream(i) => write!(f, "stream #{}", i),
        }
    }
}

/// One byte source decoded under one encoding.
#[derive(Debug, Clone)]
pub struct DecodedText {
    pub encoding: TextEncoding,
    pub source: TextSource,
    pub text: String,
}

impl DecodedText {
    /// Provenance label, e.g. `latin1` or `latin1/stream #2`.
    pub fn label(&self) -> String {
        match self.source {
            TextSource::Raw => self.encoding.label().to_string(),
            source => format!("{}/{}", self.encoding, source),
        }
    }
}

/// Immutable input shared by every extraction strategy.
#[derive(Debug, Clone, Default)]
pub struct DecodedDocument {
    raw: Vec<u8>,
    streams: Vec<Vec<u8>>,
    texts: Vec<DecodedText>,
}

impl DecodedDocument {
    /// Decode a file under every configured encoding.
    pub fn from_bytes(bytes: &[u8], config: &DecodingConfig) -> Self {
        let streams = if config.inflate_streams {
            inflate(bytes)
        } else {
            Vec::new()
        };

        let mut texts = decode_all(bytes, &config.encodings);
        for (i, stream) in streams.iter().enumerate() {
            texts.extend(decode_all(stream, &config.encodings).into_iter().map(|t| DecodedText {
                source: TextSource::Stream(i),
                ..t
            }));
        }

        debug!(
            "Decoded {} bytes ({} inflated streams) into {} texts",
            bytes.len(),
            streams.len(),
            texts.len()
        );

        Self {
            raw: bytes.to_vec(),
            streams,
            texts,
        }
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn streams(&self) -> &[Vec<u8>] {
        &self.streams
    }

    pub fn texts(&self) -> &[DecodedText] {
        &self.texts
    }

    /// Raw bytes first, then each inflated stream.
    pub fn byte_sources(&self) -> impl Iterator<Item = (TextSource, &[u8])> {
        std::iter::once((TextSource::Raw, self.raw.as_slice())).chain(
            self.streams
                .iter()
                .enumerate()
                .map(|(i, s)| (TextSource::Stream(i), s.as_slice())),
        )
    }
}

/// Decode the same bytes once per encoding.
pub fn decode_all(bytes: &[u8], encodings: &[TextEncoding]) -> Vec<DecodedText> {
    encodings
        .iter()
        .map(|&encoding| DecodedText {
            encoding,
            source: TextSource::Raw,
            text: decode(bytes, encoding),
        })
        .collect()
}

#[cfg(feature = "streams")]
fn inflate(bytes: &[u8]) -> Vec<Vec<u8>> {
    streams::inflate_streams(bytes)
}

#[cfg(not(feature = "streams"))]
fn inflate(_bytes: &[u8]) -> Vec<Vec<u8>> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_text_per_encoding() {
        let config = DecodingConfig::default();
        let doc = DecodedDocument::from_bytes(b"538 3.410.651", &config);

        assert_eq!(doc.texts().len(), TextEncoding::ALL.len());
        assert!(doc.texts().iter().all(|t| t.text == "538 3.410.651"));
        assert!(doc.streams().is_empty());
        assert_eq!(doc.byte_sources().count(), 1);
    }

    #[test]
    fn test_configured_encodings_only() {
        let config = DecodingConfig {
            encodings: vec![TextEncoding::Latin1],
            inflate_streams: false,
        };
        let doc = DecodedDocument::from_bytes(&[0xC9], &config);
        assert_eq!(doc.texts().len(), 1);
        assert_eq!(doc.texts()[0].text, "É");
        assert_eq!(doc.texts()[0].label(), "latin1");
    }

    #[test]
    fn test_stream_label() {
        let text = DecodedText {
            encoding: TextEncoding::Utf8,
            source: TextSource::Stream(2),
            text: String::new(),
        };
        assert_eq!(text.label(), "utf-8/stream #2");
    }
}
