use serde::{Deserialize, Serialize};

use crate::types::location::TextRange;

/// Annotation names that carry suppressions on source and compiled nodes.
pub const SUPPRESS_ANNOTATIONS: [&str; 2] = ["SuppressLint", "SuppressWarnings"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Unit,
    Class,
    Method,
    Field,
    Call,
    Literal,
    Identifier,
    Block,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiteralValue {
    Int(i64),
    Str(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Name as written; may be qualified.
    pub name: String,
    pub values: Vec<String>,
    #[serde(default)]
    pub range: TextRange,
}

impl Annotation {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
            range: TextRange::default(),
        }
    }

    /// Unqualified annotation name.
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    pub fn is_suppression(&self) -> bool {
        SUPPRESS_ANNOTATIONS.contains(&self.simple_name())
    }
}

/// A node of an already-parsed source file.
///
/// For `Call` nodes `name` is the method name, `owner_type` the resolved
/// receiver type when known, and `children` the arguments in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceNode {
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal: Option<LiteralValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SourceNode>,
    pub range: TextRange,
}

impl SourceNode {
    pub fn new(kind: NodeKind, range: TextRange) -> Self {
        Self {
            kind,
            name: None,
            owner_type: None,
            literal: None,
            annotations: Vec::new(),
            children: Vec::new(),
            range,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner_type = Some(owner.into());
        self
    }

    pub fn with_literal(mut self, literal: LiteralValue) -> Self {
        self.literal = Some(literal);
        self
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn with_child(mut self, child: SourceNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn int_value(&self) -> Option<i64> {
        match self.literal {
            Some(LiteralValue::Int(v)) => Some(v),
            _ => None,
        }
    }

    /// Pre-order traversal, starting with this node.
    pub fn walk(&self) -> Vec<&SourceNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Chain from this node down to the innermost node containing `offset`.
    pub fn path_to(&self, offset: usize) -> Vec<&SourceNode> {
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
