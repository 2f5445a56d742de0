use memchr::{memchr, memmem};

/// Byte-level scans over the unparsed remainder of a document.
pub trait XmlStr {
    /// Length of the name at the start of the string, if there is one.
    fn end_of_name(&self) -> Option<usize>;
    /// Length of the run of whitespace at the start of the string.
    fn end_of_space(&self) -> usize;
    /// Offset of the first occurrence of `marker`.
    fn find_marker(&self, marker: &str) -> Option<usize>;
    fn is_blank(&self) -> bool;
}

impl<'a> XmlStr for &'a str {
    fn end_of_name(&self) -> Option<usize> {
        let bytes = self.as_bytes();

        match bytes.first() {
            Some(&b) if b.is_name_start_byte() => (),
            _ => return None,
        };

        let len = bytes.iter().skip(1).take_while(|b| b.is_name_byte()).count();
        Some(len + 1)
    }

    fn end_of_space(&self) -> usize {
        self.as_bytes().iter().take_while(|b| b.is_space_byte()).count()
    }

    fn find_marker(&self, marker: &str) -> Option<usize> {
        match marker.as_bytes() {
            [single] => memchr(*single, self.as_bytes()),
            bytes => memmem::find(self.as_bytes(), bytes),
        }
    }

    fn is_blank(&self) -> bool {
        self.end_of_space() == self.len()
    }
}

/// Character classes, by byte. Anything outside 7-bit ASCII is
/// accepted as part of a name, so multi-byte UTF-8 names pass through
/// untouched.
pub trait XmlByte {
    fn is_name_start_byte(self) -> bool;
    fn is_name_byte(self) -> bool;
    fn is_space_byte(self) -> bool;
}

impl XmlByte for u8 {
    fn is_name_start_byte(self) -> bool {
        self.is_ascii_alphabetic() || self == b'_' || !self.is_ascii()
    }

    fn is_name_byte(self) -> bool {
        if self.is_name_start_byte() { return true; }
        match self {
            b'0'..=b'9' |
            b'-'        |
            b'.'        |
            b':'        => true,
            _ => false,
        }
    }

    fn is_space_byte(self) -> bool {
        match self {
            b'\x20' |
            b'\x09' |
            b'\x0D' |
            b'\x0A' => true,
            _ => false,
        }
    }
}
