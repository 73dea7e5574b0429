//! Text codecs and incremental decoding of the child's byte stream.
//!
//! The transport carries bytes while patterns, sent text and log taps deal
//! in text. A [`Codec`] names the mapping and [`StreamDecoder`] applies it
//! across reads, carrying an incomplete multi-byte unit from one read to
//! the next so that chunk boundaries never change the decoded text.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::error::{ExpectError, Result};

/// A text codec for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Codec {
    /// Strict UTF-8.
    #[default]
    Utf8,
    /// 7-bit ASCII. Bytes at or above 0x80 are invalid.
    Ascii,
    /// ISO-8859-1. Every byte maps to the code point of the same value.
    Latin1,
    /// Byte-exact identity mapping.
    ///
    /// Decodes like Latin-1 so every byte survives as one `char`, but only
    /// ASCII text may be sent or used in patterns.
    Raw,
}

impl Codec {
    /// Canonical name, as accepted by [`FromStr`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Ascii => "ascii",
            Self::Latin1 => "latin-1",
            Self::Raw => "raw",
        }
    }

    /// Highest code point this codec can encode, or `None` for no limit.
    const fn max_char(self) -> Option<char> {
        match self {
            Self::Utf8 => None,
            Self::Ascii | Self::Raw => Some('\u{7f}'),
            Self::Latin1 => Some('\u{ff}'),
        }
    }

    /// Check that `text` is representable, without encoding it.
    pub fn check(self, text: &str) -> Result<()> {
        let Some(max) = self.max_char() else {
            return Ok(());
        };
        match text.chars().enumerate().find(|&(_, c)| c > max) {
            None => Ok(()),
            Some((position, character)) => Err(ExpectError::Encoding {
                codec: self,
                text: text.to_string(),
                character,
                position,
            }),
        }
    }

    /// Encode `text` to bytes. Fails on the first unrepresentable character.
    pub fn encode(self, text: &str) -> Result<Vec<u8>> {
        self.check(text)?;
        Ok(match self {
            Self::Utf8 => text.as_bytes().to_vec(),
            // check() bounded every char to one byte
            Self::Ascii | Self::Latin1 | Self::Raw => text.chars().map(|c| c as u8).collect(),
        })
    }

    /// A fresh incremental decoder for this codec.
    #[must_use]
    pub const fn decoder(self) -> StreamDecoder {
        StreamDecoder::new(self)
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Codec {
    type Err = ExpectError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "ascii" | "us-ascii" => Ok(Self::Ascii),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" => Ok(Self::Latin1),
            "raw" | "bytes" | "binary" => Ok(Self::Raw),
            other => Err(ExpectError::config(format!("unknown codec: {other}"))),
        }
    }
}

impl TryFrom<String> for Codec {
    type Error = ExpectError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Bytes the decoder could not turn into text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A structurally invalid sequence.
    #[error("invalid {codec} sequence {bytes:02x?} at byte {offset}")]
    Invalid {
        /// Codec in use.
        codec: Codec,
        /// The rejected bytes.
        bytes: Vec<u8>,
        /// Offset of `bytes` within the decoded input, counting bytes
        /// carried over from earlier reads.
        offset: usize,
    },

    /// The stream ended inside a multi-byte unit.
    #[error("stream ended inside a {codec} sequence {bytes:02x?}")]
    Truncated {
        /// Codec in use.
        codec: Codec,
        /// The incomplete unit.
        bytes: Vec<u8>,
    },
}

/// Incremental decoder with carry-over of incomplete units.
///
/// [`feed`](Self::feed) appends decoded text to a caller-supplied `String`
/// even when it fails, so text preceding an invalid sequence is never lost.
/// After an invalid sequence the remaining input is held back; the next
/// `feed` (an empty slice is enough) resumes decoding it.
#[derive(Debug, Clone)]
pub struct StreamDecoder {
    codec: Codec,
    pending: Vec<u8>,
    held: bool,
}

impl StreamDecoder {
    /// Create a decoder with no pending state.
    #[must_use]
    pub const fn new(codec: Codec) -> Self {
        Self {
            codec,
            pending: Vec::new(),
            held: false,
        }
    }

    /// The codec this decoder applies.
    #[must_use]
    pub const fn codec(&self) -> Codec {
        self.codec
    }

    /// Bytes carried over and not yet decoded.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Whether input following an invalid sequence is waiting to be decoded.
    ///
    /// Unlike an incomplete trailing unit, held input can make progress
    /// without more bytes from the transport.
    #[must_use]
    pub const fn has_held_input(&self) -> bool {
        self.held
    }

    /// Decode `bytes`, appending every complete unit to `out`.
    pub fn feed(&mut self, bytes: &[u8], out: &mut String) -> std::result::Result<(), DecodeError> {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(bytes);
        self.held = false;

        match self.codec {
            Codec::Utf8 => self.feed_utf8(input, out),
            Codec::Ascii => self.feed_ascii(input, out),
            Codec::Latin1 | Codec::Raw => {
                out.extend(input.iter().map(|&b| char::from(b)));
                Ok(())
            }
        }
    }

    fn feed_utf8(&mut self, input: Vec<u8>, out: &mut String) -> std::result::Result<(), DecodeError> {
        let err = match std::str::from_utf8(&input) {
            Ok(text) => {
                out.push_str(text);
                return Ok(());
            }
            Err(err) => err,
        };

        let (valid, rest) = input.split_at(err.valid_up_to());
        if let Ok(text) = std::str::from_utf8(valid) {
            out.push_str(text);
        }

        match err.error_len() {
            // incomplete unit at the end: wait for more bytes
            None => {
                self.pending = rest.to_vec();
                Ok(())
            }
            Some(len) => {
                self.hold(&rest[len..]);
                Err(DecodeError::Invalid {
                    codec: self.codec,
                    bytes: rest[..len].to_vec(),
                    offset: valid.len(),
                })
            }
        }
    }

    fn feed_ascii(&mut self, input: Vec<u8>, out: &mut String) -> std::result::Result<(), DecodeError> {
        match input.iter().position(|b| !b.is_ascii()) {
            None => {
                out.extend(input.iter().map(|&b| char::from(b)));
                Ok(())
            }
            Some(offset) => {
                out.extend(input[..offset].iter().map(|&b| char::from(b)));
                self.hold(&input[offset + 1..]);
                Err(DecodeError::Invalid {
                    codec: self.codec,
                    bytes: vec![input[offset]],
                    offset,
                })
            }
        }
    }

    fn hold(&mut self, rest: &[u8]) {
        self.pending = rest.to_vec();
        self.held = !rest.is_empty();
    }

    /// Flush at end of stream.
    ///
    /// Decodes any held input and reports a trailing incomplete unit as
    /// [`DecodeError::Truncated`]. On error, call again to continue with the
    /// input after the reported bytes; once it returns `Ok` the decoder is
    /// empty.
    pub fn finish(&mut self, out: &mut String) -> std::result::Result<(), DecodeError> {
        while self.held {
            self.feed(&[], out)?;
        }
        if self.pending.is_empty() {
            return Ok(());
        }
        Err(DecodeError::Truncated {
            codec: self.codec,
            bytes: std::mem::take(&mut self.pending),
        })
    }

    /// Drop all pending state.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.held = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decode_all(decoder: &mut StreamDecoder, chunks: &[&[u8]]) -> String {
        let mut out = String::new();
        for chunk in chunks {
            decoder.feed(chunk, &mut out).unwrap();
        }
        out
    }

    #[test]
    fn codec_names_parse() {
        assert_eq!("UTF-8".parse::<Codec>().unwrap(), Codec::Utf8);
        assert_eq!("us-ascii".parse::<Codec>().unwrap(), Codec::Ascii);
        assert_eq!("ISO-8859-1".parse::<Codec>().unwrap(), Codec::Latin1);
        assert_eq!("bytes".parse::<Codec>().unwrap(), Codec::Raw);
        assert!(matches!("ebcdic".parse::<Codec>(), Err(ExpectError::Config { .. })));
    }

    #[test]
    fn split_multibyte_unit_is_carried() {
        let mut decoder = Codec::Utf8.decoder();
        let mut out = String::new();

        decoder.feed(b"a\xc3", &mut out).unwrap();
        assert_eq!(out, "a");
        assert_eq!(decoder.pending(), b"\xc3");

        decoder.feed(b"\xa5b", &mut out).unwrap();
        assert_eq!(out, "aåb");
        assert!(decoder.pending().is_empty());
    }

    #[test]
    fn four_byte_unit_over_three_reads() {
        let mut decoder = Codec::Utf8.decoder();
        let text = decode_all(&mut decoder, &[b"\xf0\x9f", b"\x98", b"\x80!"]);
        assert_eq!(text, "😀!");
    }

    #[test]
    fn empty_feed_is_legal() {
        let mut decoder = Codec::Utf8.decoder();
        let mut out = String::new();
        decoder.feed(b"", &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn invalid_utf8_keeps_prefix_and_holds_rest() {
        let mut decoder = Codec::Utf8.decoder();
        let mut out = String::new();

        let err = decoder.feed(b"ok\xffmore", &mut out).unwrap_err();
        assert_eq!(out, "ok");
        assert_eq!(
            err,
            DecodeError::Invalid {
                codec: Codec::Utf8,
                bytes: vec![0xff],
                offset: 2,
            }
        );
        assert!(decoder.has_held_input());

        decoder.feed(b"", &mut out).unwrap();
        assert_eq!(out, "okmore");
        assert!(!decoder.has_held_input());
    }

    #[test]
    fn ascii_rejects_high_bytes() {
        let mut decoder = Codec::Ascii.decoder();
        let mut out = String::new();
        let err = decoder.feed(b"ab\xe5c", &mut out).unwrap_err();
        assert_eq!(out, "ab");
        assert!(matches!(err, DecodeError::Invalid { offset: 2, .. }));
        decoder.finish(&mut out).unwrap();
        assert_eq!(out, "abc");
    }

    #[test]
    fn raw_is_byte_exact() {
        let mut decoder = Codec::Raw.decoder();
        let text = decode_all(&mut decoder, &[b"A\xc3\xa5\x00"]);
        assert_eq!(text.chars().map(|c| c as u32).collect::<Vec<_>>(), [0x41, 0xc3, 0xa5, 0]);
    }

    #[test]
    fn finish_reports_truncated_unit() {
        let mut decoder = Codec::Utf8.decoder();
        let mut out = String::new();
        decoder.feed(b"x\xe2\x82", &mut out).unwrap();

        let err = decoder.finish(&mut out).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                codec: Codec::Utf8,
                bytes: vec![0xe2, 0x82],
            }
        );
        assert_eq!(out, "x");
        decoder.finish(&mut out).unwrap();
    }

    #[test]
    fn encode_respects_codec_range() {
        assert_eq!(Codec::Utf8.encode("Aå").unwrap(), "Aå".as_bytes());
        assert_eq!(Codec::Latin1.encode("Aå").unwrap(), [0x41, 0xe5]);
        assert_eq!(Codec::Raw.encode("plain\n").unwrap(), b"plain\n");

        match Codec::Raw.encode("Aårgh") {
            Err(ExpectError::Encoding {
                character, position, ..
            }) => {
                assert_eq!(character, 'å');
                assert_eq!(position, 1);
            }
            other => panic!("expected encoding error, got {other:?}"),
        }
        assert!(Codec::Latin1.encode("€").is_err());
    }

    proptest! {
        #[test]
        fn chunking_never_changes_decoded_text(text in "\\PC{0,40}", cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..6)) {
            let bytes = text.as_bytes();
            let mut points: Vec<usize> = cuts.iter().map(|i| i.index(bytes.len() + 1)).collect();
            points.sort_unstable();

            let mut decoder = Codec::Utf8.decoder();
            let mut out = String::new();
            let mut last = 0;
            for p in points.into_iter().chain(std::iter::once(bytes.len())) {
                decoder.feed(&bytes[last..p], &mut out).unwrap();
                last = p;
            }
            decoder.finish(&mut out).unwrap();
            prop_assert_eq!(out, text);
        }
    }
}
