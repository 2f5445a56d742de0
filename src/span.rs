//! Lazily decoded text.
//!
//! Text parsed out of a document is recorded as a byte range into the
//! document's buffer along with the decoding it still owes. The first
//! read performs that decoding in place, compacting the range; the
//! span then refers to the shorter, decoded run and never decodes
//! again.

use std::borrow::Cow;
use std::ops::Range;
use std::str;

use bitflags::bitflags;
use tracing::warn;

use crate::str::XmlByte;

bitflags! {
    /// Decoding owed by a span on its first read.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    pub struct DecodeFlags: u8 {
        /// CR, LF, CR-LF, and LF-CR each become a single LF.
        const NORMALIZE_NEWLINES = 0b0000_0001;
        /// Named and numeric character references are replaced.
        const ENTITIES = 0b0000_0010;
        /// Whitespace runs become one space; leading and trailing
        /// whitespace is dropped.
        const COLLAPSE_WHITESPACE = 0b0000_0100;
    }
}

pub(crate) struct Entity {
    pub name: &'static str,
    pub value: u8,
}

/// The only named references that are recognized.
pub(crate) static ENTITIES: [Entity; 5] = [
    Entity { name: "quot", value: b'"' },
    Entity { name: "amp", value: b'&' },
    Entity { name: "apos", value: b'\'' },
    Entity { name: "lt", value: b'<' },
    Entity { name: "gt", value: b'>' },
];

pub(crate) fn entity_for(byte: u8) -> Option<&'static str> {
    ENTITIES.iter().find(|e| e.value == byte).map(|e| e.name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrSpan {
    /// A range of the document buffer that still owes decoding.
    Pending { range: Range<usize>, flags: DecodeFlags },
    /// A range of the document buffer holding final text.
    Buffer(Range<usize>),
    Owned(String),
    Static(&'static str),
}

impl Default for StrSpan {
    fn default() -> StrSpan {
        StrSpan::Static("")
    }
}

impl StrSpan {
    /// A buffer range; with empty `flags` nothing is owed and the span
    /// starts out flushed.
    pub fn span(range: Range<usize>, flags: DecodeFlags) -> StrSpan {
        if flags.is_empty() {
            StrSpan::Buffer(range)
        } else {
            StrSpan::Pending { range, flags }
        }
    }

    pub fn owned(text: &str) -> StrSpan {
        StrSpan::Owned(text.to_owned())
    }

    pub fn interned(text: &'static str) -> StrSpan {
        StrSpan::Static(text)
    }

    pub fn needs_flush(&self) -> bool {
        matches!(self, StrSpan::Pending { .. })
    }

    /// Performs any owed decoding in place.
    pub fn flush(&mut self, buffer: &mut [u8]) {
        if let StrSpan::Pending { range, flags } = self {
            let start = range.start;
            let len = match buffer.get_mut(range.clone()) {
                Some(bytes) => decode_in_place(bytes, *flags),
                None => 0,
            };
            *self = StrSpan::Buffer(start..start + len);
        }
    }

    /// The decoded text, flushing first if needed.
    pub fn get<'a>(&'a mut self, buffer: &'a mut [u8]) -> &'a str {
        if self.needs_flush() {
            self.flush(buffer);
        }
        self.as_str(buffer).unwrap_or_default()
    }

    /// The decoded text if nothing is owed.
    pub fn as_str<'a>(&'a self, buffer: &'a [u8]) -> Option<&'a str> {
        match self {
            StrSpan::Pending { .. } => None,
            StrSpan::Buffer(range) => Some(buffer_str(buffer, range.clone())),
            StrSpan::Owned(s) => Some(s),
            StrSpan::Static(s) => Some(s),
        }
    }

    /// The decoded text without touching the buffer. Pending spans are
    /// decoded into a copy.
    pub fn peek<'a>(&'a self, buffer: &'a [u8]) -> Cow<'a, str> {
        match self {
            StrSpan::Pending { range, flags } => {
                let mut bytes = buffer.get(range.clone()).unwrap_or_default().to_vec();
                let len = decode_in_place(&mut bytes, *flags);
                bytes.truncate(len);
                Cow::Owned(String::from_utf8_lossy(&bytes).into_owned())
            }
            other => Cow::Borrowed(other.as_str(buffer).unwrap_or_default()),
        }
    }
}

fn buffer_str(buffer: &[u8], range: Range<usize>) -> &str {
    let bytes = buffer.get(range).unwrap_or_default();
    match str::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            warn!(valid_up_to = e.valid_up_to(), "span is not valid UTF-8");
            str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default()
        }
    }
}

/// Decodes `bytes` in one left-to-right pass, writing the result over
/// the front of the slice. Returns the decoded length.
///
/// The decoded form of every construct is never longer than its
/// source, so the write position never overtakes the read position.
pub fn decode_in_place(bytes: &mut [u8], flags: DecodeFlags) -> usize {
    let normalize = flags.contains(DecodeFlags::NORMALIZE_NEWLINES);
    let entities = flags.contains(DecodeFlags::ENTITIES);
    let collapse = flags.contains(DecodeFlags::COLLAPSE_WHITESPACE);

    let len = bytes.len();
    let mut read = 0;
    let mut write = 0;

    if collapse {
        while read < len && bytes[read].is_space_byte() {
            read += 1;
        }
    }

    while read < len {
        let b = bytes[read];

        if collapse && b.is_space_byte() {
            while read < len && bytes[read].is_space_byte() {
                read += 1;
            }
            if read < len {
                bytes[write] = b' ';
                write += 1;
            }
            continue;
        }

        if normalize && (b == b'\r' || b == b'\n') {
            let pair = if b == b'\r' { b'\n' } else { b'\r' };
            read += 1;
            if read < len && bytes[read] == pair {
                read += 1;
            }
            bytes[write] = b'\n';
            write += 1;
            continue;
        }

        if entities && b == b'&' {
            if let Some((decoded, consumed)) = decode_reference(&bytes[read..]) {
                let decoded = decoded.as_bytes();
                bytes[write..write + decoded.len()].copy_from_slice(decoded);
                write += decoded.len();
                read += consumed;
                continue;
            }
        }

        bytes[write] = b;
        write += 1;
        read += 1;
    }

    write
}

/// A decoded character, held as its UTF-8 encoding.
struct Decoded {
    bytes: [u8; 4],
    len: usize,
}

impl Decoded {
    fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

// `text` starts with `&`. Returns the decoded character and how many
// source bytes it replaces, or None if the reference is not one we
// recognize.
fn decode_reference(text: &[u8]) -> Option<(Decoded, usize)> {
    let semicolon = 1 + text[1..].iter().position(|&b| !(b.is_ascii_alphanumeric() || b == b'#'))?;
    if text[semicolon] != b';' {
        return None;
    }
    let body = &text[1..semicolon];

    let c = match body {
        [b'#', b'x', hex @ ..] | [b'#', b'X', hex @ ..] => code_point(hex, 16)?,
        [b'#', decimal @ ..] => code_point(decimal, 10)?,
        name => {
            let entity = ENTITIES.iter().find(|e| e.name.as_bytes() == name)?;
            char::from(entity.value)
        }
    };

    let mut bytes = [0; 4];
    let len = c.encode_utf8(&mut bytes).len();
    Some((Decoded { bytes, len }, semicolon + 1))
}

fn code_point(digits: &[u8], radix: u32) -> Option<char> {
    if digits.is_empty() {
        return None;
    }

    let mut value: u32 = 0;
    for &d in digits {
        let digit = char::from(d).to_digit(radix)?;
        value = value.checked_mul(radix)?.checked_add(digit)?;
        if value > 0x10FFFF {
            return None;
        }
    }

    match value {
        0 => None,
        v => char::from_u32(v),
    }
}

#[cfg(test)]
mod test {
    use quickcheck_macros::quickcheck;

    use super::{decode_in_place, DecodeFlags, StrSpan};

    fn decode(text: &str, flags: DecodeFlags) -> String {
        let mut bytes = text.as_bytes().to_vec();
        let len = decode_in_place(&mut bytes, flags);
        bytes.truncate(len);
        String::from_utf8(bytes).expect("decoded text is UTF-8")
    }

    fn text_flags() -> DecodeFlags {
        DecodeFlags::NORMALIZE_NEWLINES | DecodeFlags::ENTITIES
    }

    #[test]
    fn newlines_normalize_to_line_feed() {
        let decoded = decode("a\rb\r\nc\n\rd\ne", DecodeFlags::NORMALIZE_NEWLINES);
        assert_eq!("a\nb\nc\nd\ne", decoded);
    }

    #[test]
    fn newlines_are_left_alone_without_the_flag() {
        assert_eq!("a\r\nb", decode("a\r\nb", DecodeFlags::ENTITIES));
    }

    #[test]
    fn named_entities_decode() {
        let decoded = decode("&quot;&amp;&apos;&lt;&gt;", text_flags());
        assert_eq!("\"&'<>", decoded);
    }

    #[test]
    fn numeric_references_decode_to_utf8() {
        assert_eq!("A", decode("&#65;", text_flags()));
        assert_eq!("\u{e9}", decode("&#xE9;", text_flags()));
        assert_eq!("\u{1F600}", decode("&#x1F600;", text_flags()));
        assert_eq!("\u{4e2d}", decode("&#20013;", text_flags()));
    }

    #[test]
    fn zero_padded_references_decode() {
        assert_eq!("A", decode("&#x0000000041;", text_flags()));
        assert_eq!("A", decode("&#00000000000065;", text_flags()));
        assert_eq!("&#x00000000110000;", decode("&#x00000000110000;", text_flags()));
    }

    #[test]
    fn unrecognized_references_are_copied_through() {
        assert_eq!("&nbsp; &#; &#xZZ; & x", decode("&nbsp; &#; &#xZZ; & x", text_flags()));
    }

    #[test]
    fn out_of_range_references_are_copied_through() {
        assert_eq!("&#0;", decode("&#0;", text_flags()));
        assert_eq!("&#xD800;", decode("&#xD800;", text_flags()));
        assert_eq!("&#x110000;", decode("&#x110000;", text_flags()));
        assert_eq!("&#0", decode("&#0", text_flags()));
    }

    #[test]
    fn entities_are_left_alone_without_the_flag() {
        assert_eq!("&amp;", decode("&amp;", DecodeFlags::NORMALIZE_NEWLINES));
    }

    #[test]
    fn whitespace_collapses_and_trims() {
        let flags = text_flags() | DecodeFlags::COLLAPSE_WHITESPACE;
        assert_eq!("a b c", decode("  a \r\n\t b   c \n", flags));
        assert_eq!("", decode(" \n\t ", flags));
    }

    #[test]
    fn flush_compacts_the_buffer_in_place() {
        let mut buffer = b"<e>x &amp; y</e>".to_vec();
        let mut span = StrSpan::span(3..12, text_flags());

        assert!(span.needs_flush());
        assert_eq!("x & y", span.get(&mut buffer));
        assert!(!span.needs_flush());
        assert_eq!(StrSpan::Buffer(3..8), span);
    }

    #[test]
    fn second_read_does_not_touch_the_buffer() {
        let mut buffer = b"a&amp;amp;b".to_vec();
        let mut span = StrSpan::span(0..buffer.len(), text_flags());

        let first = span.get(&mut buffer).to_owned();
        let snapshot = buffer.clone();
        let second = span.get(&mut buffer).to_owned();

        assert_eq!("a&amp;b", first);
        assert_eq!(first, second);
        assert_eq!(snapshot, buffer);
    }

    #[test]
    fn peek_decodes_without_flushing() {
        let buffer = b"1 &lt; 2".to_vec();
        let span = StrSpan::span(0..buffer.len(), text_flags());

        assert_eq!("1 < 2", span.peek(&buffer));
        assert!(span.needs_flush());
        assert_eq!(b"1 &lt; 2".to_vec(), buffer);
    }

    #[test]
    fn empty_flags_start_flushed() {
        let buffer = b"name".to_vec();
        let span = StrSpan::span(0..4, DecodeFlags::empty());

        assert_eq!(Some("name"), span.as_str(&buffer));
    }

    #[test]
    fn owned_and_interned_spans_ignore_the_buffer() {
        let mut buffer = Vec::new();
        let mut owned = StrSpan::owned("mine");
        let interned = StrSpan::interned("static");

        assert_eq!("mine", owned.get(&mut buffer));
        assert_eq!(Some("static"), interned.as_str(&buffer));
    }

    #[quickcheck]
    fn decoding_is_idempotent_once_flushed(text: String) -> bool {
        let mut buffer = text.into_bytes();
        let mut span = StrSpan::span(0..buffer.len(), text_flags());

        let first = span.get(&mut buffer).to_owned();
        let second = span.get(&mut buffer).to_owned();
        first == second
    }

    #[quickcheck]
    fn decoding_never_grows(text: String) -> bool {
        let flags = text_flags() | DecodeFlags::COLLAPSE_WHITESPACE;
        let mut bytes = text.clone().into_bytes();
        decode_in_place(&mut bytes, flags) <= text.len()
    }
}
