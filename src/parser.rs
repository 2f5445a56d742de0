//! Converts XML text into a document tree.
//!
//! ### Example
//!
//! ```
//! let xml = r#"<?xml version="1.0"?>
//! <!-- Awesome data incoming -->
//! <data awesome="true">
//!   <datum>Science</datum>
//!   <datum><![CDATA[Literature]]></datum>
//!   <datum>Math &gt; others</datum>
//! </data>"#;
//! let mut doc = tinydom::parse(xml).expect("Failed to parse");
//! let data = doc.root_element().expect("no root element");
//! let last = doc.last_child_element(data, Some("datum")).expect("no datum");
//! assert_eq!(Some("Math > others"), doc.text(last));
//! ```
//!
//! ### How it works
//!
//! The input is copied into the document's buffer once. Nodes are
//! created and linked into the tree as soon as their markup is
//! recognized, and their text is recorded as ranges of the buffer
//! along with the decoding those ranges still need. Nothing is
//! decoded until it is read.
//!
//! Open elements are tracked on an explicit stack rather than by
//! recursion, so the nesting limit bounds memory instead of the call
//! stack.
//!
//! ### Error handling
//!
//! Parsing stops at the first error. Everything linked up to that
//! point stays in the document.

use memchr::{memchr, memchr2_iter};
use peresil::{Progress, Status, StringPoint};
use tracing::trace;

use super::dom::Document;
use super::error::{Error, ErrorKind};
use super::raw::{LeafKind, NodeId, NodeKind, Storage};
use super::span::{DecodeFlags, StrSpan};
use super::str::{XmlByte, XmlStr};
use super::{Config, Whitespace, MAX_ELEMENT_DEPTH};

/// Parses `xml` into a new document.
pub fn parse(xml: &str) -> Result<Document, Error> {
    let mut doc = Document::new();
    doc.parse(xml)?;
    Ok(doc)
}

impl Document {
    /// Replaces the contents of the document with the parsed `xml`.
    ///
    /// A leading byte-order-mark is stripped and remembered. Input is
    /// only read up to the first NUL byte, and a NUL after otherwise
    /// complete input is reported as an error.
    pub fn parse(&mut self, xml: &str) -> Result<(), Error> {
        self.clear();

        let text = match xml.strip_prefix('\u{FEFF}') {
            Some(rest) => {
                self.bom = true;
                rest
            }
            None => xml,
        };

        self.buffer = text.as_bytes().to_vec();

        let nul = memchr(0, text.as_bytes());
        let view = &text[..nul.unwrap_or(text.len())];

        if view.is_blank() {
            return Err(self.fail(Error::new(ErrorKind::EmptyDocument)));
        }

        let failure = {
            let mut parser = Parser::new(&mut self.storage, view, self.config);
            let progress = parser.parse_document(StringPoint::new(view));

            match progress.status {
                Status::Success(()) => nul.map(|offset| {
                    let line = parser.lines.line_at(view, offset);
                    Error::new(ErrorKind::Parsing).at(offset, line)
                }),
                Status::Failure(fault) => {
                    let offset = progress.point.offset;
                    let line = parser.lines.line_at(view, offset);
                    Some(fault.into_error(offset, line))
                }
            }
        };

        if let Some(error) = failure {
            return Err(self.fail(error));
        }

        let stats = self.storage.stats();
        trace!(
            bytes = view.len(),
            elements = stats.elements,
            attributes = stats.attributes,
            texts = stats.texts,
            leaves = stats.leaves,
            "parsed document"
        );

        Ok(())
    }
}

/// Why parsing stopped, with the names involved.
#[derive(Debug, Copy, Clone, PartialEq)]
struct Fault<'a> {
    kind: ErrorKind,
    context: Option<&'a str>,
    detail: Option<&'a str>,
}

impl<'a> Fault<'a> {
    fn new(kind: ErrorKind) -> Fault<'a> {
        Fault { kind, context: None, detail: None }
    }

    fn context(mut self, context: &'a str) -> Fault<'a> {
        self.context = Some(context);
        self
    }

    fn detail(mut self, detail: &'a str) -> Fault<'a> {
        self.detail = Some(detail);
        self
    }

    fn into_error(self, offset: usize, line: usize) -> Error {
        let mut error = Error::new(self.kind).at(offset, line);
        if let Some(context) = self.context {
            error = error.with_context(context);
        }
        if let Some(detail) = self.detail {
            error = error.with_detail(detail);
        }
        error
    }
}

type XmlProgress<'a, T> = Progress<StringPoint<'a>, T, Fault<'a>>;

fn fail<'a, T>(point: StringPoint<'a>, fault: Fault<'a>) -> XmlProgress<'a, T> {
    Progress::failure(point, fault)
}

trait PointExt<'a> {
    fn skip(self, len: usize) -> StringPoint<'a>;
    fn skip_space(self) -> StringPoint<'a>;
    fn first_byte(self) -> Option<u8>;
}

impl<'a> PointExt<'a> for StringPoint<'a> {
    fn skip(self, len: usize) -> StringPoint<'a> {
        match self.s.get(len..) {
            Some(s) => StringPoint { s, offset: self.offset + len },
            None => StringPoint { s: "", offset: self.offset + self.s.len() },
        }
    }

    fn skip_space(self) -> StringPoint<'a> {
        self.skip(self.s.end_of_space())
    }

    fn first_byte(self) -> Option<u8> {
        self.s.as_bytes().first().cloned()
    }
}

/// Turns byte offsets into 1-based line numbers.
///
/// Offsets are usually asked for in increasing order, so counting
/// resumes from the last offset. CR, LF, and CR-LF each end one line.
#[derive(Debug)]
struct LineCounter {
    offset: usize,
    line: usize,
}

impl LineCounter {
    fn new() -> LineCounter {
        LineCounter { offset: 0, line: 1 }
    }

    fn line_at(&mut self, text: &str, offset: usize) -> usize {
        if offset < self.offset {
            *self = LineCounter::new();
        }

        let bytes = text.as_bytes();
        let end = offset.min(bytes.len());

        if let Some(scanned) = bytes.get(self.offset..end) {
            for i in memchr2_iter(b'\n', b'\r', scanned) {
                let at = self.offset + i;
                if bytes[at] == b'\n' || bytes.get(at + 1) != Some(&b'\n') {
                    self.line += 1;
                }
            }
        }

        self.offset = end;
        self.line
    }
}

/// An element whose end tag has not been seen yet.
struct Open<'a> {
    node: NodeId,
    name: &'a str,
    point: StringPoint<'a>,
}

struct Parser<'d, 'a> {
    storage: &'d mut Storage,
    text: &'a str,
    lines: LineCounter,
    text_flags: DecodeFlags,
    attribute_flags: DecodeFlags,
    collapse: bool,
}

impl<'d, 'a> Parser<'d, 'a> {
    fn new(storage: &'d mut Storage, text: &'a str, config: Config) -> Parser<'d, 'a> {
        let mut attribute_flags = DecodeFlags::NORMALIZE_NEWLINES;
        if config.process_entities {
            attribute_flags |= DecodeFlags::ENTITIES;
        }

        let collapse = config.whitespace == Whitespace::Collapse;
        let mut text_flags = attribute_flags;
        if collapse {
            text_flags |= DecodeFlags::COLLAPSE_WHITESPACE;
        }

        Parser {
            storage,
            text,
            lines: LineCounter::new(),
            text_flags,
            attribute_flags,
            collapse,
        }
    }

    fn parse_document(&mut self, xml: StringPoint<'a>) -> XmlProgress<'a, ()> {
        let mut xml = xml;
        let mut open: Vec<Open<'a>> = Vec::new();

        loop {
            let parent = open.last().map_or(NodeId::DOCUMENT, |o| o.node);
            let start = xml;
            let mark = xml.skip_space();

            if mark.is_empty() {
                return match open.last() {
                    Some(o) => fail(o.point, Fault::new(ErrorKind::ParsingElement).context(o.name)),
                    None => Progress::success(mark, ()),
                };
            }

            let line = self.lines.line_at(self.text, mark.offset);
            let s = mark.s;

            let (next, _) = if s.starts_with("<?") {
                try_parse!(self.parse_declaration(mark, parent, line))
            } else if s.starts_with("<!--") {
                try_parse!(self.parse_leaf(mark, parent, line, LeafKind::Comment))
            } else if s.starts_with("<![CDATA[") {
                try_parse!(self.parse_cdata(mark, parent, line))
            } else if s.starts_with("<!") {
                try_parse!(self.parse_leaf(mark, parent, line, LeafKind::Unknown))
            } else if s.starts_with("</") {
                let (next, name) = try_parse!(self.parse_end_tag(mark));
                match open.pop() {
                    Some(o) if o.name == name => (next, ()),
                    Some(o) => {
                        let fault = Fault::new(ErrorKind::MismatchedElement).context(o.name).detail(name);
                        return fail(mark, fault);
                    }
                    None => return fail(mark, Fault::new(ErrorKind::MismatchedElement).detail(name)),
                }
            } else if s.starts_with('<') {
                let (next, element) = try_parse!(self.parse_start_tag(mark, parent, line));
                if let Some(element) = element {
                    if open.len() >= MAX_ELEMENT_DEPTH {
                        let fault = Fault::new(ErrorKind::ElementDepthExceeded).context(element.name);
                        return fail(mark, fault);
                    }
                    open.push(element);
                }
                (next, ())
            } else {
                try_parse!(self.parse_text(start, mark, parent, line))
            };

            xml = next;
        }
    }

    // Finds `close` after the `open` marker and returns the range in
    // between, positioned after `close`.
    fn parse_delimited(&self, mark: StringPoint<'a>, open: &str, close: &str, kind: ErrorKind)
                       -> XmlProgress<'a, std::ops::Range<usize>>
    {
        let body = mark.skip(open.len());
        match body.s.find_marker(close) {
            Some(len) => Progress::success(body.skip(len + close.len()), body.offset..body.offset + len),
            None => fail(mark, Fault::new(kind)),
        }
    }

    fn parse_leaf(&mut self, mark: StringPoint<'a>, parent: NodeId, line: usize, kind: LeafKind)
                  -> XmlProgress<'a, ()>
    {
        let (next, range) = match kind {
            LeafKind::Comment => try_parse!(self.parse_delimited(mark, "<!--", "-->", ErrorKind::ParsingComment)),
            LeafKind::Declaration => try_parse!(self.parse_delimited(mark, "<?", "?>", ErrorKind::ParsingDeclaration)),
            LeafKind::Unknown => try_parse!(self.parse_delimited(mark, "<!", ">", ErrorKind::ParsingUnknown)),
        };

        let value = StrSpan::span(range, DecodeFlags::NORMALIZE_NEWLINES);
        let node = self.storage.create_leaf(kind, value, Some(line));
        self.storage.link_last(parent, node);

        Progress::success(next, ())
    }

    // Declarations may only come before everything else at the top
    // level, though there may be several of them.
    fn parse_declaration(&mut self, mark: StringPoint<'a>, parent: NodeId, line: usize) -> XmlProgress<'a, ()> {
        let well_located = parent == NodeId::DOCUMENT && match self.storage.children(parent) {
            Some(links) => [links.first, links.last].iter().all(|n| match *n {
                Some(n) => self.storage.kind(n) == Some(NodeKind::Declaration),
                None => true,
            }),
            None => false,
        };

        if !well_located {
            return fail(mark, Fault::new(ErrorKind::ParsingDeclaration));
        }

        self.parse_leaf(mark, parent, line, LeafKind::Declaration)
    }

    fn parse_cdata(&mut self, mark: StringPoint<'a>, parent: NodeId, line: usize) -> XmlProgress<'a, ()> {
        let (next, range) = try_parse!(self.parse_delimited(mark, "<![CDATA[", "]]>", ErrorKind::ParsingCData));

        let value = StrSpan::span(range, DecodeFlags::NORMALIZE_NEWLINES);
        let node = self.storage.create_text(value, true, Some(line));
        self.storage.link_last(parent, node);

        Progress::success(next, ())
    }

    // Text runs up to the next `<`, which is left for the next node.
    // Leading whitespace belongs to the text unless it is collapsed.
    fn parse_text(&mut self, start: StringPoint<'a>, mark: StringPoint<'a>, parent: NodeId, line: usize)
                  -> XmlProgress<'a, ()>
    {
        let from = if self.collapse { mark } else { start };

        let len = match from.s.find_marker("<") {
            Some(len) => len,
            None => return fail(mark, Fault::new(ErrorKind::ParsingText)),
        };

        let raw = &from.s[..len];
        let next = from.skip(len);
        if self.collapse && raw.is_blank() {
            return Progress::success(next, ());
        }

        let value = StrSpan::span(from.offset..from.offset + len, self.text_flags);
        let node = self.storage.create_text(value, false, Some(line));
        self.storage.link_last(parent, node);

        Progress::success(next, ())
    }

    fn parse_name(&self, xml: StringPoint<'a>, kind: ErrorKind) -> XmlProgress<'a, &'a str> {
        match xml.s.end_of_name() {
            Some(len) => Progress::success(xml.skip(len), &xml.s[..len]),
            None => fail(xml, Fault::new(kind)),
        }
    }

    fn parse_end_tag(&self, mark: StringPoint<'a>) -> XmlProgress<'a, &'a str> {
        let (xml, name) = try_parse!(self.parse_name(mark.skip(2), ErrorKind::ParsingElement));
        let xml = xml.skip_space();

        let (xml, _) = try_parse!(
            xml.consume_literal(">")
                .map_err(|_| Fault::new(ErrorKind::ParsingElement).context(name))
        );

        Progress::success(xml, name)
    }

    // Links the element as soon as its name is known. Returns the open
    // element unless the tag closed itself.
    fn parse_start_tag(&mut self, mark: StringPoint<'a>, parent: NodeId, line: usize)
                       -> XmlProgress<'a, Option<Open<'a>>>
    {
        let at_name = mark.skip(1);
        let (xml, name) = try_parse!(self.parse_name(at_name, ErrorKind::ParsingElement));

        let span = StrSpan::span(at_name.offset..xml.offset, DecodeFlags::empty());
        let element = self.storage.create_element(span, Some(line));
        self.storage.link_last(parent, element);

        let mut xml = xml;
        let mut seen: Vec<&'a str> = Vec::new();

        loop {
            xml = xml.skip_space();

            if xml.s.starts_with("/>") {
                return Progress::success(xml.skip(2), None);
            }

            if xml.s.starts_with('>') {
                let open = Open { node: element, name, point: mark };
                return Progress::success(xml.skip(1), Some(open));
            }

            match xml.first_byte() {
                Some(b) if b.is_name_start_byte() => {
                    let (next, _) = try_parse!(self.parse_attribute(xml, element, &mut seen));
                    xml = next;
                }
                _ => return fail(xml, Fault::new(ErrorKind::ParsingElement).context(name)),
            }
        }
    }

    fn parse_attribute(&mut self, xml: StringPoint<'a>, element: NodeId, seen: &mut Vec<&'a str>)
                       -> XmlProgress<'a, ()>
    {
        let (after_name, name) = try_parse!(self.parse_name(xml, ErrorKind::ParsingAttribute));
        let bad_attribute = || Fault::new(ErrorKind::ParsingAttribute).context(name);

        let (at_value, _) = try_parse!(
            after_name.skip_space()
                .consume_literal("=")
                .map_err(|_| bad_attribute())
        );
        let at_quote = at_value.skip_space();

        let quote = match at_quote.first_byte() {
            Some(b'"') => "\"",
            Some(b'\'') => "'",
            _ => return fail(xml, bad_attribute()),
        };

        let body = at_quote.skip(1);
        let len = match body.s.find_marker(quote) {
            Some(len) => len,
            None => return fail(xml, bad_attribute()),
        };

        if seen.contains(&name) {
            return fail(xml, bad_attribute());
        }
        seen.push(name);

        let name_span = StrSpan::span(xml.offset..after_name.offset, DecodeFlags::empty());
        let value_span = StrSpan::span(body.offset..body.offset + len, self.attribute_flags);
        self.storage.append_attribute(element, name_span, value_span);

        Progress::success(body.skip(len + 1), ())
    }
}

#[cfg(test)]
mod test {
    use super::super::{Config, Document, ErrorKind, NodeKind, Whitespace};
    use super::{parse, LineCounter};

    fn full_parse(xml: &str) -> Document {
        parse(xml).expect("Failed to parse")
    }

    fn parse_error(xml: &str) -> super::Error {
        match parse(xml) {
            Ok(_) => panic!("parsed {:?} without error", xml),
            Err(e) => e,
        }
    }

    fn kinds(doc: &Document, node: super::NodeId) -> Vec<NodeKind> {
        doc.children(node).filter_map(|c| doc.kind(c)).collect()
    }

    #[test]
    fn a_document_with_a_single_element() {
        let doc = full_parse("<hello/>");
        let top = doc.root_element().unwrap();

        assert_eq!(Some("hello"), doc.name(top));
        assert_eq!(None, doc.error());
    }

    #[test]
    fn a_document_with_a_prolog() {
        let doc = full_parse("<?xml version='1.0' ?>\n<!DOCTYPE hello>\n<!-- hi -->\n<hello/>");

        assert_eq!(
            vec![NodeKind::Declaration, NodeKind::Unknown, NodeKind::Comment, NodeKind::Element],
            kinds(&doc, doc.root())
        );
    }

    #[test]
    fn leaves_keep_their_text() {
        let mut doc = full_parse("<?xml version='1.0' ?><!DOCTYPE html><!-- a &amp; b --><html/>");
        let mut children = doc.children(doc.root()).collect::<Vec<_>>().into_iter();

        assert_eq!(Some("xml version='1.0' "), doc.value(children.next().unwrap()));
        assert_eq!(Some("DOCTYPE html"), doc.value(children.next().unwrap()));
        assert_eq!(Some(" a &amp; b "), doc.value(children.next().unwrap()));
    }

    #[test]
    fn attributes_keep_document_order() {
        let mut doc = full_parse(r#"<e zeta="1" alpha = '2'/>"#);
        let e = doc.root_element().unwrap();

        let names: Vec<_> = doc.attributes(e).filter_map(|a| doc.attribute_name(a)).collect();
        assert_eq!(vec!["zeta", "alpha"], names);
        assert_eq!(Some("2"), doc.attribute(e, "alpha"));
    }

    #[test]
    fn attribute_values_are_decoded() {
        let mut doc = full_parse(r#"<e a="&quot;x&quot;" b='say "hi" &amp; &#65;'/>"#);
        let e = doc.root_element().unwrap();

        assert_eq!(Some(r#""x""#), doc.attribute(e, "a"));
        assert_eq!(Some(r#"say "hi" & A"#), doc.attribute(e, "b"));
    }

    #[test]
    fn empty_attribute_values_are_allowed() {
        let mut doc = full_parse(r#"<e a=""/>"#);
        let e = doc.root_element().unwrap();

        assert_eq!(Some(""), doc.attribute(e, "a"));
    }

    #[test]
    fn text_is_decoded_on_first_read() {
        let mut doc = full_parse("<e>1 &lt; 2\r\nand more</e>");
        let e = doc.root_element().unwrap();
        let t = doc.first_child(e).unwrap();

        assert_eq!(Some("1 < 2\nand more"), doc.peek_value(t).as_deref());
        assert_eq!(Some("1 < 2\nand more"), doc.text(e));
        assert_eq!(Some("1 < 2\nand more"), doc.text(e));
    }

    #[test]
    fn cdata_is_opaque() {
        let mut doc = full_parse("<e><![CDATA[<b>&amp;</b>]]></e>");
        let e = doc.root_element().unwrap();
        let t = doc.first_child(e).unwrap();

        assert!(doc.is_cdata(t));
        assert_eq!(Some("<b>&amp;</b>"), doc.value(t));
    }

    #[test]
    fn mixed_content() {
        let mut doc = full_parse("<a>x<b/>y</a>");
        let a = doc.root_element().unwrap();

        assert_eq!(vec![NodeKind::Text, NodeKind::Element, NodeKind::Text], kinds(&doc, a));
        let y = doc.last_child(a).unwrap();
        assert_eq!(Some("y"), doc.value(y));
    }

    #[test]
    fn whitespace_between_markup_makes_no_node() {
        let doc = full_parse("<a>\n    <b/>\n    <c/>\n</a>\n");
        let a = doc.root_element().unwrap();

        assert_eq!(vec![NodeKind::Element, NodeKind::Element], kinds(&doc, a));
    }

    #[test]
    fn leading_whitespace_is_kept_in_text() {
        let mut doc = full_parse("<a>  x  </a>");
        let a = doc.root_element().unwrap();

        assert_eq!(Some("  x  "), doc.text(a));
    }

    #[test]
    fn collapsed_whitespace() {
        let config = Config { whitespace: Whitespace::Collapse, ..Config::default() };
        let mut doc = Document::with_config(config);
        doc.parse("<a>  x \n\t y  <b/> </a>").unwrap();
        let a = doc.root_element().unwrap();

        assert_eq!(vec![NodeKind::Text, NodeKind::Element], kinds(&doc, a));
        assert_eq!(Some("x y"), doc.text(a));
    }

    #[test]
    fn entities_can_be_left_alone() {
        let config = Config { process_entities: false, ..Config::default() };
        let mut doc = Document::with_config(config);
        doc.parse(r#"<a b="&lt;">&amp;</a>"#).unwrap();
        let a = doc.root_element().unwrap();

        assert_eq!(Some("&amp;"), doc.text(a));
        assert_eq!(Some("&lt;"), doc.attribute(a, "b"));
    }

    #[test]
    fn names_may_be_utf8() {
        let mut doc = full_parse("<ключ>значение</ключ>");
        let e = doc.root_element().unwrap();

        assert_eq!(Some("ключ"), doc.name(e));
        assert_eq!(Some("значение"), doc.text(e));
    }

    #[test]
    fn nodes_know_their_line() {
        let doc = full_parse("<a>\n<b/>\r\n<c/>\r<d/>\n\n<e/></a>");
        let a = doc.root_element().unwrap();
        let lines: Vec<_> = doc.children(a).filter_map(|c| doc.line(c)).collect();

        assert_eq!(Some(1), doc.line(a));
        assert_eq!(vec![2, 3, 4, 6], lines);
    }

    #[test]
    fn a_byte_order_mark_is_stripped_and_remembered() {
        let doc = full_parse("\u{FEFF}<a/>");

        assert!(doc.has_bom());
        assert_eq!(Some("a"), doc.root_element().and_then(|a| doc.name(a)));
    }

    #[test]
    fn mismatched_tags() {
        let e = parse_error("<a>x</b>");

        assert_eq!(ErrorKind::MismatchedElement, e.kind());
        assert_eq!(Some(1), e.line());
        assert_eq!(Some("a"), e.context());
        assert_eq!(Some("b"), e.detail());
        assert_eq!(Some(4), e.offset());
    }

    #[test]
    fn a_stray_end_tag() {
        assert_eq!(ErrorKind::MismatchedElement, parse_error("<a/></a>").kind());
    }

    #[test]
    fn an_unclosed_element() {
        let e = parse_error("<a>\n<b></b>");

        assert_eq!(ErrorKind::ParsingElement, e.kind());
        assert_eq!(Some("a"), e.context());
        assert_eq!(Some(1), e.line());
    }

    #[test]
    fn malformed_tags() {
        assert_eq!(ErrorKind::ParsingElement, parse_error("<1a/>").kind());
        assert_eq!(ErrorKind::ParsingElement, parse_error("<a $/>").kind());
        assert_eq!(ErrorKind::ParsingElement, parse_error("<a></a").kind());
    }

    #[test]
    fn malformed_attributes() {
        assert_eq!(ErrorKind::ParsingAttribute, parse_error("<a x=1/>").kind());
        assert_eq!(ErrorKind::ParsingAttribute, parse_error(r#"<a x="1/>"#).kind());
        assert_eq!(ErrorKind::ParsingAttribute, parse_error(r#"<a x "1"/>"#).kind());
        assert_eq!(ErrorKind::ParsingAttribute, parse_error(r#"<a x='1" />"#).kind());
    }

    #[test]
    fn duplicate_attributes() {
        let e = parse_error(r#"<a x="1" y="2" x="3"/>"#);

        assert_eq!(ErrorKind::ParsingAttribute, e.kind());
        assert_eq!(Some("x"), e.context());
        assert_eq!(Some(15), e.offset());
    }

    #[test]
    fn unterminated_markup() {
        assert_eq!(ErrorKind::ParsingComment, parse_error("<a><!-- x </a>").kind());
        assert_eq!(ErrorKind::ParsingCData, parse_error("<a><![CDATA[ x </a>").kind());
        assert_eq!(ErrorKind::ParsingUnknown, parse_error("<!DOCTYPE").kind());
        assert_eq!(ErrorKind::ParsingDeclaration, parse_error("<?xml version='1.0'").kind());
    }

    #[test]
    fn text_without_a_following_tag() {
        assert_eq!(ErrorKind::ParsingText, parse_error("<a/>tail").kind());
    }

    #[test]
    fn empty_documents() {
        for xml in &["", " \n\t", "\u{FEFF}"] {
            let e = parse_error(xml);
            assert_eq!(ErrorKind::EmptyDocument, e.kind());
            assert_eq!(None, e.line());
        }
    }

    #[test]
    fn declarations_come_first() {
        assert_eq!(ErrorKind::ParsingDeclaration, parse_error(r#"<a/><?xml version="1.0"?>"#).kind());
        assert_eq!(ErrorKind::ParsingDeclaration, parse_error(r#"<a><?xml version="1.0"?></a>"#).kind());
        assert_eq!(ErrorKind::ParsingDeclaration, parse_error(r#"<!-- c --><?xml version="1.0"?><a/>"#).kind());

        full_parse(r#"<?xml version="1.0"?><a/>"#);
        full_parse(r#"<?xml version="1.0"?><?second?><a/>"#);
    }

    #[test]
    fn nesting_is_bounded() {
        let bomb = "<a>".repeat(10_000);
        let e = parse_error(&bomb);

        assert_eq!(ErrorKind::ElementDepthExceeded, e.kind());
        assert_eq!(Some(1), e.line());
    }

    #[test]
    fn nesting_up_to_the_limit_is_fine() {
        let depth = super::MAX_ELEMENT_DEPTH;
        let xml = format!("{}{}", "<a>".repeat(depth), "</a>".repeat(depth));

        full_parse(&xml);
    }

    #[test]
    fn input_stops_at_nul() {
        let e = parse_error("<a/>\0<b/>");
        assert_eq!(ErrorKind::Parsing, e.kind());
        assert_eq!(Some(4), e.offset());

        assert_eq!(ErrorKind::ParsingElement, parse_error("<a>\0</a>").kind());
    }

    #[test]
    fn the_partial_tree_survives_an_error() {
        let mut doc = Document::new();
        let e = doc.parse("<a><b/><c>").unwrap_err();

        assert_eq!(Some(&e), doc.error());
        let a = doc.root_element().unwrap();
        assert_eq!(Some("b"), doc.first_child_element(a, None).and_then(|b| doc.name(b)));
    }

    #[test]
    fn parsing_again_clears_the_previous_state() {
        let mut doc = Document::new();
        doc.parse("<a>").unwrap_err();
        doc.parse("<b/>").unwrap();

        assert_eq!(None, doc.error());
        assert_eq!(1, doc.children(doc.root()).count());
        assert_eq!(1, doc.pool_stats().total());
    }

    #[test]
    fn line_counter_resumes_and_resets() {
        let text = "a\nb\r\nc\rd";
        let mut lines = LineCounter::new();

        assert_eq!(1, lines.line_at(text, 0));
        assert_eq!(2, lines.line_at(text, 2));
        assert_eq!(3, lines.line_at(text, 5));
        assert_eq!(4, lines.line_at(text, 7));
        assert_eq!(2, lines.line_at(text, 3));
    }

    #[test]
    fn a_crlf_split_across_queries_counts_once() {
        let text = "a\r\nb";
        let mut lines = LineCounter::new();

        assert_eq!(1, lines.line_at(text, 2));
        assert_eq!(2, lines.line_at(text, 3));
    }
}
