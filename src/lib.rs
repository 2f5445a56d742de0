//! An XML document model that is parsed in place.
//!
//! Text is copied into a single buffer owned by the [`Document`] and
//! the tree refers to ranges of that buffer. Entity references and
//! newlines inside a range are only decoded the first time the text is
//! read, and the decoding is done over the range itself.
//!
//! ```
//! use tinydom::{Document, Printer};
//!
//! let mut doc = Document::new();
//! doc.parse(r#"<greeting planet="Earth">Hello &amp; welcome</greeting>"#).expect("parses");
//!
//! let greeting = doc.root_element().expect("has a root element");
//! assert_eq!(Some("Earth"), doc.attribute(greeting, "planet"));
//! assert_eq!(Some("Hello & welcome"), doc.text(greeting));
//!
//! let comment = doc.new_comment(" What about other planets? ");
//! doc.insert_first_child(greeting, comment).expect("greeting is an element");
//!
//! let mut printer = Printer::new().compact(true);
//! doc.accept(doc.root(), &mut printer);
//! assert_eq!(
//!     r#"<greeting planet="Earth"><!-- What about other planets? -->Hello &amp; welcome</greeting>"#,
//!     printer.as_str()
//! );
//! ```
//!
//! ### Design decisions
//!
//! Nodes are addressed by copyable handles rather than references, so
//! the document can be edited while handles are held. A handle to a
//! deleted node stops resolving instead of aliasing whatever reuses
//! its slot.

#[macro_use]
extern crate peresil;

mod pool;
mod raw;
mod span;
mod str;

pub mod dom;
pub mod error;
mod file;
pub mod parser;
pub mod typed;
pub mod visitor;
pub mod writer;

pub use crate::dom::{Attributes, Children, Document};
pub use crate::error::{DomError, Error, ErrorKind, QueryError};
pub use crate::parser::parse;
pub use crate::raw::{AttributeId, NodeId, NodeKind, PoolStats};
pub use crate::typed::XmlValue;
pub use crate::visitor::Visitor;
pub use crate::writer::Printer;

/// Elements nested deeper than this fail to parse.
pub const MAX_ELEMENT_DEPTH: usize = 500;

/// How whitespace in ordinary text is treated while parsing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Whitespace {
    Preserve,
    /// Runs of whitespace become a single space, leading and trailing
    /// whitespace is dropped, and text that is left empty produces no
    /// node at all.
    Collapse,
}

/// How typed booleans are written.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BoolFormat {
    TrueFalse,
    OneZero,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Config {
    pub whitespace: Whitespace,
    /// Decode entity references when reading and escape `& < >` when
    /// printing.
    pub process_entities: bool,
    pub bool_format: BoolFormat,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            whitespace: Whitespace::Preserve,
            process_entities: true,
            bool_format: BoolFormat::TrueFalse,
        }
    }
}
