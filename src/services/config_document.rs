//! In-memory form of an engine configuration document.
//!
//! The document is parsed into a small element tree with `quick-xml`'s
//! namespace-aware reader and written back with its declaration, comments
//! and whitespace intact. Only element text is ever changed, so everything
//! the editor does not touch round-trips unchanged.
//!
//! Tag lookup is namespace tolerant: a tag such as `UseScorm` may be declared
//! unqualified or under the document's default namespace. A lookup reports
//! which form matched, and an element that exists but has no text is still a
//! match.

use crate::error::PipelineError;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesStart, BytesText, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Result of a tag lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Found an element bound to a namespace (default or prefixed)
    Qualified,
    /// Found an element without any namespace
    Unqualified,
    Missing,
}

impl Lookup {
    pub fn is_found(self) -> bool {
        !matches!(self, Self::Missing)
    }
}

#[derive(Debug, Clone)]
enum Node {
    Element(Element),
    Text(BytesText<'static>),
    /// Comments, CDATA, processing instructions: written back verbatim
    Other(Event<'static>),
}

#[derive(Debug, Clone)]
struct Element {
    start: BytesStart<'static>,
    namespace: Option<String>,
    children: Vec<Node>,
    /// Written as `<tag/>` when it still has no children
    self_closing: bool,
}

impl Element {
    fn new(start: BytesStart<'static>, namespace: Option<String>, self_closing: bool) -> Self {
        Self {
            start,
            namespace,
            children: Vec::new(),
            self_closing,
        }
    }

    fn local_name_is(&self, tag: &str) -> bool {
        self.start.local_name().as_ref() == tag.as_bytes()
    }

    fn is_qualified(&self) -> bool {
        self.namespace.is_some() || self.start.name().prefix().is_some()
    }

    /// Pre-order search below this element; fills `path` with child indices
    fn find_path(&self, matches: &dyn Fn(&Element) -> bool, path: &mut Vec<usize>) -> bool {
        for (idx, child) in self.children.iter().enumerate() {
            if let Node::Element(element) = child {
                path.push(idx);
                if matches(element) || element.find_path(matches, path) {
                    return true;
                }
                path.pop();
            }
        }
        false
    }

    fn descend_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut current = self;
        for &idx in path {
            current = match current.children.get_mut(idx) {
                Some(Node::Element(element)) => element,
                _ => return None,
            };
        }
        Some(current)
    }

    fn descend(&self, path: &[usize]) -> Option<&Element> {
        let mut current = self;
        for &idx in path {
            current = match current.children.get(idx) {
                Some(Node::Element(element)) => element,
                _ => return None,
            };
        }
        Some(current)
    }

    fn text(&self) -> String {
        let mut text = String::new();
        for child in &self.children {
            if let Node::Text(t) = child {
                match t.unescape() {
                    Ok(value) => text.push_str(&value),
                    Err(_) => text.push_str(&String::from_utf8_lossy(t)),
                }
            }
        }
        text
    }

    /// Replace all content with a single text node
    fn set_text(&mut self, value: &str) {
        self.children.clear();
        if !value.is_empty() {
            self.children
                .push(Node::Text(BytesText::new(value).into_owned()));
            self.self_closing = false;
        }
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), PipelineError> {
        if self.self_closing && self.children.is_empty() {
            write_event(writer, Event::Empty(self.start.borrow()))?;
            return Ok(());
        }
        write_event(writer, Event::Start(self.start.borrow()))?;
        for child in &self.children {
            match child {
                Node::Element(element) => element.write(writer)?,
                Node::Text(text) => write_event(writer, Event::Text(text.clone()))?,
                Node::Other(event) => write_event(writer, event.clone())?,
            }
        }
        write_event(writer, Event::End(self.start.to_end()))
    }
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), PipelineError> {
    writer
        .write_event(event)
        .map_err(quick_xml::Error::from)?;
    Ok(())
}

/// A parsed configuration document
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    bom: bool,
    /// Declaration, comments and whitespace before the root element
    prolog: Vec<Event<'static>>,
    root: Element,
    epilog: Vec<Event<'static>>,
}

impl ConfigDocument {
    /// Parse a UTF-8 document
    pub fn parse(bytes: &[u8]) -> Result<Self, PipelineError> {
        let (bom, body) = match bytes.strip_prefix(UTF8_BOM) {
            Some(rest) => (true, rest),
            None => (false, bytes),
        };

        let mut reader = NsReader::from_reader(body);
        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut root: Option<Element> = None;
        let mut stack: Vec<Element> = Vec::new();

        loop {
            let (resolved, event) = reader.read_resolved_event()?;
            let namespace = match resolved {
                ResolveResult::Bound(Namespace(uri)) => Some(String::from_utf8_lossy(uri).into_owned()),
                _ => None,
            };

            let finished = match event {
                Event::Start(start) => {
                    stack.push(Element::new(start.into_owned(), namespace, false));
                    None
                }
                Event::Empty(start) => Some(Element::new(start.into_owned(), namespace, true)),
                Event::End(_) => Some(stack.pop().ok_or_else(|| {
                    PipelineError::validation("Unexpected closing tag in configuration document")
                })?),
                Event::Eof => break,
                other => {
                    let owned = other.into_owned();
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(match owned {
                            Event::Text(text) => Node::Text(text),
                            event => Node::Other(event),
                        });
                    } else if root.is_none() {
                        prolog.push(owned);
                    } else {
                        epilog.push(owned);
                    }
                    None
                }
            };

            if let Some(element) = finished {
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Element(element));
                } else if root.is_some() {
                    return Err(PipelineError::validation(
                        "Configuration document has more than one root element",
                    ));
                } else {
                    root = Some(element);
                }
            }
        }

        if let Some(open) = stack.last() {
            return Err(PipelineError::validation(format!(
                "Configuration document ends inside <{}>",
                String::from_utf8_lossy(open.start.name().as_ref())
            )));
        }
        let root = root.ok_or_else(|| {
            PipelineError::validation("Configuration document has no root element")
        })?;

        Ok(Self {
            bom,
            prolog,
            root,
            epilog,
        })
    }

    /// Local name of the root element
    pub fn root_name(&self) -> String {
        String::from_utf8_lossy(self.root.start.local_name().as_ref()).into_owned()
    }

    /// Locate `tag` below the root: a namespace-qualified element wins over
    /// an unqualified one, each in document order.
    fn locate(&self, tag: &str) -> (Lookup, Vec<usize>) {
        let mut path = Vec::new();
        if self
            .root
            .find_path(&|e: &Element| e.local_name_is(tag) && e.is_qualified(), &mut path)
        {
            return (Lookup::Qualified, path);
        }
        path.clear();
        if self
            .root
            .find_path(&|e: &Element| e.local_name_is(tag) && !e.is_qualified(), &mut path)
        {
            return (Lookup::Unqualified, path);
        }
        (Lookup::Missing, Vec::new())
    }

    pub fn lookup(&self, tag: &str) -> Lookup {
        self.locate(tag).0
    }

    /// Text content of `tag`; `Some("")` for an element without text
    pub fn text(&self, tag: &str) -> Option<String> {
        match self.locate(tag) {
            (Lookup::Missing, _) => None,
            (_, path) => self.root.descend(&path).map(Element::text),
        }
    }

    /// Set the text of an existing `tag`. Returns how it was found; nothing
    /// changes when the result is [`Lookup::Missing`].
    pub fn set_text(&mut self, tag: &str, value: &str) -> Lookup {
        let (lookup, path) = self.locate(tag);
        if lookup.is_found() {
            if let Some(element) = self.root.descend_mut(&path) {
                element.set_text(value);
            }
        }
        lookup
    }

    /// Set the text of `tag`, appending it under the root when absent.
    /// Returns `true` when the element was created.
    pub fn set_or_create(&mut self, tag: &str, value: &str) -> bool {
        if self.set_text(tag, value).is_found() {
            return false;
        }
        // An unprefixed child sits in whatever default namespace binds the root
        let namespace = match self.root.start.name().prefix() {
            None => self.root.namespace.clone(),
            Some(_) => None,
        };
        let mut element = Element::new(BytesStart::new(tag.to_string()), namespace, false);
        element.set_text(value);
        self.root.self_closing = false;
        self.root.children.push(Node::Element(element));
        true
    }

    /// Serialize the document. A declaration is added when the source had none.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PipelineError> {
        let mut out = Vec::new();
        if self.bom {
            out.extend_from_slice(UTF8_BOM);
        }
        let mut writer = Writer::new(out);

        if !self.prolog.iter().any(|e| matches!(e, Event::Decl(_))) {
            write_event(
                &mut writer,
                Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)),
            )?;
            write_event(&mut writer, Event::Text(BytesText::new("\n")))?;
        }
        for event in &self.prolog {
            write_event(&mut writer, event.clone())?;
        }
        self.root.write(&mut writer)?;
        for event in &self.epilog {
            write_event(&mut writer, event.clone())?;
        }
        Ok(writer.into_inner())
    }
}
