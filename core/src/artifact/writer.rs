//! Renders markup documents while recording exact element and attribute
//! ranges, so a contents/tree pair always agrees on positions.

use crate::artifact::element::{Attribute, Element};
use crate::types::location::{Position, TextRange};

const INDENT: &str = "    ";

/// A rendered document: the markup text and its element tree.
#[derive(Debug, Clone)]
pub struct Document {
    pub contents: String,
    pub root: Element,
}

struct OpenElement {
    tag: String,
    attributes: Vec<Attribute>,
    children: Vec<Element>,
    start: Position,
}

/// Incremental markup writer.
///
/// ```
/// use lintel_core::artifact::DocumentWriter;
///
/// let mut w = DocumentWriter::new();
/// w.start("resources", &[]);
/// w.leaf("string", &[("name", "app_name")], Some("Demo"));
/// w.end();
/// let doc = w.finish().unwrap();
/// assert_eq!(doc.root.children[0].text.as_deref(), Some("Demo"));
/// ```
#[derive(Default)]
pub struct DocumentWriter {
    out: String,
    stack: Vec<OpenElement>,
    root: Option<Element>,
}

impl DocumentWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an `<?xml ...?>` declaration line.
    pub fn with_prolog() -> Self {
        let mut writer = Self::default();
        writer
            .out
            .push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        writer
    }

    /// Open an element; children follow until the matching [`end`](Self::end).
    pub fn start(&mut self, tag: &str, attributes: &[(&str, &str)]) -> &mut Self {
        let (start, attributes) = self.open_tag(tag, attributes);
        self.out.push_str(">\n");
        self.stack.push(OpenElement {
            tag: tag.to_string(),
            attributes,
            children: Vec::new(),
            start,
        });
        self
    }

    /// Close the innermost open element.
    pub fn end(&mut self) -> &mut Self {
        if let Some(open) = self.stack.pop() {
            self.indent();
            self.out.push_str("</");
            self.out.push_str(&open.tag);
            self.out.push('>');
            let end = self.position();
            self.out.push('\n');
            let element = Element {
                tag: open.tag,
                attributes: open.attributes,
                children: open.children,
                text: None,
                range: TextRange::new(open.start, end),
            };
            self.attach(element);
        }
        self
    }

    /// Write a childless element, self-closing unless it has text.
    pub fn leaf(&mut self, tag: &str, attributes: &[(&str, &str)], text: Option<&str>) -> &mut Self {
        let (start, attributes) = self.open_tag(tag, attributes);
        match text {
            Some(text) => {
                self.out.push('>');
                self.out.push_str(&escape(text));
                self.out.push_str("</");
                self.out.push_str(tag);
                self.out.push('>');
            }
            None => self.out.push_str(" />"),
        }
        let end = self.position();
        self.out.push('\n');
        self.attach(Element {
            tag: tag.to_string(),
            attributes,
            children: Vec::new(),
            text: text.map(str::to_string),
            range: TextRange::new(start, end),
        });
        self
    }

    /// Write a `<!-- text -->` comment line at the current depth.
    pub fn comment(&mut self, text: &str) -> &mut Self {
        self.indent();
        self.out.push_str("<!-- ");
        self.out.push_str(text);
        self.out.push_str(" -->\n");
        self
    }

    /// Close any open elements and return the document, or `None` when no
    /// element was written.
    pub fn finish(mut self) -> Option<Document> {
        while !self.stack.is_empty() {
            self.end();
        }
        let root = self.root?;
        Some(Document {
            contents: self.out,
            root,
        })
    }

    fn open_tag(&mut self, tag: &str, attributes: &[(&str, &str)]) -> (Position, Vec<Attribute>) {
        self.indent();
        let start = self.position();
        self.out.push('<');
        self.out.push_str(tag);
        let mut attrs = Vec::with_capacity(attributes.len());
        for (name, value) in attributes {
            self.out.push(' ');
            let attr_start = self.position();
            self.out.push_str(name);
            self.out.push_str("=\"");
            self.out.push_str(&escape(value));
            self.out.push('"');
            attrs.push(Attribute {
                name: name.to_string(),
                value: value.to_string(),
                range: TextRange::new(attr_start, self.position()),
            });
        }
        (start, attrs)
    }

    fn attach(&mut self, element: Element) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(element),
            None => {
                if self.root.is_none() {
                    self.root = Some(element);
                }
            }
        }
    }

    fn indent(&mut self) {
        for _ in 0..self.stack.len() {
            self.out.push_str(INDENT);
        }
    }

    fn position(&self) -> Position {
        Position::at(&self.out, self.out.len())
    }
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}
