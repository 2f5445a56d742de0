//! Errors reported while parsing, loading, saving, and editing documents.

use std::fmt;

/// The category of a parse, load, or save failure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EmptyDocument,
    Parsing,
    ParsingDeclaration,
    ParsingComment,
    ParsingUnknown,
    ParsingCData,
    ParsingText,
    ParsingElement,
    ParsingAttribute,
    MismatchedElement,
    ElementDepthExceeded,
    FileNotFound,
    FileCouldNotBeOpened,
    FileReadError,
    FileWriteError,
}

static ERROR_NAMES: [&str; 15] = [
    "empty document",
    "error parsing",
    "error parsing declaration",
    "error parsing comment",
    "error parsing unknown",
    "error parsing CDATA",
    "error parsing text",
    "error parsing element",
    "error parsing attribute",
    "mismatched element",
    "element depth exceeded",
    "file not found",
    "file could not be opened",
    "file read error",
    "file write error",
];

impl ErrorKind {
    /// A stable, human-readable name for this kind.
    pub fn name(self) -> &'static str {
        ERROR_NAMES[self as usize]
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A failure recorded on a document by parsing, loading, or saving.
///
/// `offset` is the byte offset into the parsed text (after any
/// byte-order-mark) and `line` is 1-based. `context` and `detail`
/// carry the offending names where there are any; for a mismatched
/// element, `context` is the open element and `detail` the closing
/// tag that was found.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}{}{}", line_suffix(.line), context_suffix(.context, .detail))]
pub struct Error {
    kind: ErrorKind,
    offset: Option<usize>,
    line: Option<usize>,
    context: Option<String>,
    detail: Option<String>,
}

fn line_suffix(line: &Option<usize>) -> String {
    line.map(|l| format!(" at line {}", l)).unwrap_or_default()
}

fn context_suffix(context: &Option<String>, detail: &Option<String>) -> String {
    match (context, detail) {
        (Some(c), Some(d)) => format!(": {} / {}", c, d),
        (Some(c), None) => format!(": {}", c),
        (None, Some(d)) => format!(": {}", d),
        (None, None) => String::new(),
    }
}

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Error {
            kind,
            offset: None,
            line: None,
            context: None,
            detail: None,
        }
    }

    pub(crate) fn at(mut self, offset: usize, line: usize) -> Error {
        self.offset = Some(offset);
        self.line = Some(line);
        self
    }

    pub(crate) fn with_context<S: Into<String>>(mut self, context: S) -> Error {
        self.context = Some(context.into());
        self
    }

    pub(crate) fn with_detail<S: Into<String>>(mut self, detail: S) -> Error {
        self.detail = Some(detail.into());
        self
    }

    pub fn kind(&self) -> ErrorKind { self.kind }
    pub fn offset(&self) -> Option<usize> { self.offset }
    pub fn line(&self) -> Option<usize> { self.line }
    pub fn context(&self) -> Option<&str> { self.context.as_deref() }
    pub fn detail(&self) -> Option<&str> { self.detail.as_deref() }

    /// Shorthand for `self.kind().name()`.
    pub fn name(&self) -> &'static str { self.kind.name() }
}

/// Misuse of the tree-editing API.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("the node does not exist in this document")]
    StaleNode,
    #[error("the node cannot have children")]
    NotAContainer,
    #[error("the document node has no value")]
    NoValue,
    #[error("the document node cannot be a child")]
    InvalidChild,
    #[error("a node cannot be inserted below itself")]
    WouldCycle,
    #[error("the reference node is not a child of the parent")]
    NotAChild,
}

/// Failure of a typed attribute or text query.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("no such attribute")]
    NoAttribute,
    #[error("no text child")]
    NoText,
    #[error("the value could not be converted")]
    WrongType,
}

#[cfg(test)]
mod test {
    use super::{Error, ErrorKind};

    #[test]
    fn every_kind_has_a_distinct_name() {
        let kinds = [
            ErrorKind::EmptyDocument,
            ErrorKind::Parsing,
            ErrorKind::ParsingDeclaration,
            ErrorKind::ParsingComment,
            ErrorKind::ParsingUnknown,
            ErrorKind::ParsingCData,
            ErrorKind::ParsingText,
            ErrorKind::ParsingElement,
            ErrorKind::ParsingAttribute,
            ErrorKind::MismatchedElement,
            ErrorKind::ElementDepthExceeded,
            ErrorKind::FileNotFound,
            ErrorKind::FileCouldNotBeOpened,
            ErrorKind::FileReadError,
            ErrorKind::FileWriteError,
        ];

        let mut names: Vec<_> = kinds.iter().map(|k| k.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(kinds.len(), names.len());
    }

    #[test]
    fn display_includes_line_and_names() {
        let e = Error::new(ErrorKind::MismatchedElement)
            .at(3, 1)
            .with_context("a")
            .with_detail("b");

        assert_eq!("mismatched element at line 1: a / b", e.to_string());
    }

    #[test]
    fn display_without_position() {
        let e = Error::new(ErrorKind::EmptyDocument);
        assert_eq!("empty document", e.to_string());
        assert_eq!(None, e.line());
    }
}
