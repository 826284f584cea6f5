use serde::{Deserialize, Serialize};

use crate::types::location::TextRange;

/// Attribute carrying per-element suppressions in markup documents.
pub const TOOLS_IGNORE: &str = "tools:ignore";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    pub range: TextRange,
}

/// A node of a structured markup document (manifest or resource file).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Element>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub range: TextRange,
}

impl Element {
    pub fn new(tag: impl Into<String>, range: TextRange) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
            range,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn attribute_value(&self, name: &str) -> Option<&str> {
        self.attribute(name).map(|a| a.value.as_str())
    }

    /// Child elements with the given tag, in document order.
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Pre-order traversal, starting with this element.
    pub fn walk(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(element) = stack.pop() {
            out.push(element);
            stack.extend(element.children.iter().rev());
        }
        out
    }

    /// Chain from this element down to the innermost element whose range
    /// contains `offset`. Empty when the offset is outside this element.
    pub fn path_to(&self, offset: usize) -> Vec<&Element> {
        let mut chain = Vec::new();
        if !self.range.contains_offset(offset) {
            return chain;
        }
        let mut current = self;
        chain.push(current);
        while let Some(child) = current
            .children
            .iter()
            .find(|c| c.range.contains_offset(offset))
        {
            chain.push(child);
            current = child;
        }
        chain
    }
}
