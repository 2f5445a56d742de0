//! Formats a document, or any part of one, as XML text.
//!
//! ### Example
//!
//! ```
//! use tinydom::{Document, Printer};
//!
//! let mut doc = Document::new();
//! let hello = doc.new_element("hello");
//! doc.set_attribute(hello, "planet", "Earth").expect("is an element");
//! let root = doc.root();
//! doc.insert_end_child(root, hello).expect("is a container");
//!
//! let mut printer = Printer::new();
//! doc.accept(root, &mut printer);
//! assert_eq!("<hello planet=\"Earth\"/>\n", printer.as_str());
//! ```
//!
//! The printer can also be driven directly, without a document, by
//! calling `open_element`, `push_attribute`, and the other `push_*`
//! methods in document order.
//!
//! ### Layout
//!
//! Outside of compact mode each element and leaf starts on its own
//! line, indented four spaces per level. Once text has been written
//! inside an element, nothing else is added until that element closes,
//! so mixed content prints back exactly as it was.

use std::io::{self, Write};
use std::str;

use tracing::warn;

use super::dom::Document;
use super::raw::NodeId;
use super::span::entity_for;
use super::visitor::Visitor;

const INDENT: &str = "    ";

/// A streaming XML writer.
///
/// Output goes to any `io::Write`; by default it is collected in
/// memory. The first write error stops all further output, and is
/// returned by [`finish`](Printer::finish).
pub struct Printer<W = Vec<u8>> {
    out: W,
    error: Option<io::Error>,
    stack: Vec<String>,
    depth: usize,
    element_just_opened: bool,
    first_element: bool,
    text_depth: Option<usize>,
    compact: bool,
    process_entities: bool,
}

impl Printer<Vec<u8>> {
    pub fn new() -> Printer<Vec<u8>> {
        Printer::to_writer(Vec::new())
    }

    /// The text printed so far.
    pub fn as_str(&self) -> &str {
        str::from_utf8(&self.out).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    pub fn into_string(self) -> String {
        match String::from_utf8(self.out) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}

impl Default for Printer<Vec<u8>> {
    fn default() -> Printer<Vec<u8>> {
        Printer::new()
    }
}

impl<W> Printer<W>
    where W: Write
{
    pub fn to_writer(out: W) -> Printer<W> {
        Printer {
            out,
            error: None,
            stack: Vec::new(),
            depth: 0,
            element_just_opened: false,
            first_element: true,
            text_depth: None,
            compact: false,
            process_entities: true,
        }
    }

    /// Suppresses all newlines and indentation.
    pub fn compact(mut self, compact: bool) -> Printer<W> {
        self.compact = compact;
        self
    }

    /// Whether `& < >` are escaped. Replaced by the document's setting
    /// whenever one of its elements or text nodes is visited.
    pub fn process_entities(mut self, process_entities: bool) -> Printer<W> {
        self.process_entities = process_entities;
        self
    }

    /// Hands back the sink, or the first error writing to it.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.out.flush()?;
        Ok(self.out)
    }

    fn follow(&mut self, doc: &Document) {
        self.process_entities = doc.config().process_entities;
    }

    fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    fn write(&mut self, s: &str) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.out.write_all(s.as_bytes()) {
            self.error = Some(e);
        }
    }

    fn print_space(&mut self, depth: usize) {
        for _ in 0..depth {
            self.write(INDENT);
        }
    }

    // A new line and indentation, unless inside a run of text.
    fn new_line(&mut self) {
        if self.text_depth.is_none() && !self.first_element && !self.compact {
            self.write("\n");
            let depth = self.depth;
            self.print_space(depth);
        }
    }

    fn print_escaped(&mut self, text: &str, attribute: bool) {
        if !self.process_entities && !attribute {
            self.write(text);
            return;
        }

        let process_entities = self.process_entities;
        let needs_escape = |b: u8| match b {
            b'"' => attribute,
            b'&' | b'<' | b'>' => process_entities,
            _ => false,
        };

        let mut rest = text;
        while let Some(i) = rest.bytes().position(needs_escape) {
            let (plain, tail) = rest.split_at(i);
            self.write(plain);
            if let Some(name) = entity_for(tail.as_bytes()[0]) {
                self.write("&");
                self.write(name);
                self.write(";");
            }
            rest = &tail[1..];
        }
        self.write(rest);
    }

    fn seal_element_if_just_opened(&mut self) {
        if self.element_just_opened {
            self.element_just_opened = false;
            self.write(">");
        }
    }

    pub fn open_element(&mut self, name: &str) {
        self.seal_element_if_just_opened();
        self.stack.push(name.to_owned());

        self.new_line();
        self.write("<");
        self.write(name);

        self.element_just_opened = true;
        self.first_element = false;
        self.depth += 1;
    }

    /// Adds an attribute to the element that was just opened.
    pub fn push_attribute(&mut self, name: &str, value: &str) {
        if !self.element_just_opened {
            warn!(name, "attribute pushed after the element was sealed");
            return;
        }

        self.write(" ");
        self.write(name);
        self.write("=\"");
        self.print_escaped(value, true);
        self.write("\"");
    }

    /// Closes the innermost open element, as `/>` if nothing was
    /// written inside it.
    pub fn close_element(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        let name = self.stack.pop().unwrap_or_default();

        if self.element_just_opened {
            self.write("/>");
        } else {
            if self.text_depth.is_none() && !self.compact {
                self.write("\n");
                let depth = self.depth;
                self.print_space(depth);
            }
            self.write("</");
            self.write(&name);
            self.write(">");
        }

        if self.text_depth == Some(self.depth) {
            self.text_depth = None;
        }
        if self.depth == 0 && !self.compact {
            self.write("\n");
        }
        self.element_just_opened = false;
    }

    pub fn push_text(&mut self, text: &str, cdata: bool) {
        self.text_depth = Some(self.depth.saturating_sub(1));
        self.seal_element_if_just_opened();

        if cdata {
            self.write("<![CDATA[");
            self.write(text);
            self.write("]]>");
        } else {
            self.print_escaped(text, false);
        }
    }

    fn push_leaf(&mut self, open: &str, text: &str, close: &str) {
        self.seal_element_if_just_opened();
        self.new_line();
        self.first_element = false;

        self.write(open);
        self.write(text);
        self.write(close);
    }

    pub fn push_comment(&mut self, comment: &str) {
        self.push_leaf("<!--", comment, "-->");
    }

    pub fn push_declaration(&mut self, declaration: &str) {
        self.push_leaf("<?", declaration, "?>");
    }

    pub fn push_unknown(&mut self, unknown: &str) {
        self.push_leaf("<!", unknown, ">");
    }

    /// Writes a byte-order-mark and a default declaration, as asked.
    pub fn push_header(&mut self, bom: bool, declaration: bool) {
        if bom {
            self.write("\u{FEFF}");
        }
        if declaration {
            self.push_declaration(r#"xml version="1.0""#);
        }
    }
}

impl<W> Visitor for Printer<W>
    where W: Write
{
    fn visit_enter_document(&mut self, doc: &Document) -> bool {
        self.follow(doc);
        if doc.has_bom() {
            self.push_header(true, false);
        }
        self.is_ok()
    }

    fn visit_enter_element(&mut self, doc: &Document, element: NodeId) -> bool {
        self.follow(doc);
        self.open_element(doc.name(element).unwrap_or_default());

        for attribute in doc.attributes(element) {
            let name = doc.attribute_name(attribute).unwrap_or_default();
            let value = doc.peek_attribute_value(attribute).unwrap_or_default();
            self.push_attribute(name, &value);
        }

        self.is_ok()
    }

    fn visit_exit_element(&mut self, _: &Document, _: NodeId) -> bool {
        self.close_element();
        self.is_ok()
    }

    fn visit_text(&mut self, doc: &Document, text: NodeId) -> bool {
        self.follow(doc);
        let value = doc.peek_value(text).unwrap_or_default();
        self.push_text(&value, doc.is_cdata(text));
        self.is_ok()
    }

    fn visit_comment(&mut self, doc: &Document, comment: NodeId) -> bool {
        let value = doc.peek_value(comment).unwrap_or_default();
        self.push_comment(&value);
        self.is_ok()
    }

    fn visit_declaration(&mut self, doc: &Document, declaration: NodeId) -> bool {
        let value = doc.peek_value(declaration).unwrap_or_default();
        self.push_declaration(&value);
        self.is_ok()
    }

    fn visit_unknown(&mut self, doc: &Document, unknown: NodeId) -> bool {
        let value = doc.peek_value(unknown).unwrap_or_default();
        self.push_unknown(&value);
        self.is_ok()
    }
}

impl Document {
    /// Prints the whole document to `out`.
    pub fn write_to<W>(&mut self, out: W, compact: bool) -> io::Result<W>
        where W: Write
    {
        let mut printer = Printer::to_writer(out).compact(compact);
        let root = self.root();
        self.accept(root, &mut printer);
        printer.finish()
    }

    /// The whole document as text.
    pub fn to_xml_string(&mut self, compact: bool) -> String {
        let mut printer = Printer::new().compact(compact);
        let root = self.root();
        self.accept(root, &mut printer);
        printer.into_string()
    }
}
