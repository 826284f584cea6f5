use serde::{Deserialize, Serialize};

use crate::artifact::source::Annotation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    New,
    NewArray,
    Invoke,
    Load,
    Store,
    Return,
    Other,
}

/// A single bytecode instruction with the source line it was compiled from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    /// Type or member reference, e.g. `android/graphics/Paint`.
    pub operand: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodMember {
    pub name: String,
    pub descriptor: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub instructions: Vec<Instruction>,
}

impl MethodMember {
    /// First and last source line covered by the instructions.
    pub fn line_span(&self) -> Option<(u32, u32)> {
        let first = self.instructions.iter().map(|i| i.line).min()?;
        let last = self.instructions.iter().map(|i| i.line).max()?;
        Some((first, last))
    }
}

/// A compiled class with its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassFile {
    /// Internal name, e.g. `com/example/CustomView`.
    pub name: String,
    #[serde(default)]
    pub super_name: Option<String>,
    /// Path of the source file this class was compiled from, when known.
    #[serde(default)]
    pub source_path: Option<String>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub methods: Vec<MethodMember>,
}

impl ClassFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            super_name: None,
            source_path: None,
            annotations: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Methods whose instructions cover `line`.
    pub fn methods_at_line(&self, line: u32) -> impl Iterator<Item = &MethodMember> {
        self.methods.iter().filter(move |m| {
            m.line_span()
                .map(|(first, last)| first <= line && line <= last)
                .unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(name: &str, lines: &[u32]) -> MethodMember {
        MethodMember {
            name: name.into(),
            descriptor: "()V".into(),
            annotations: vec![],
            instructions: lines
                .iter()
                .map(|&line| Instruction {
                    opcode: Opcode::Other,
                    operand: String::new(),
                    line,
                })
                .collect(),
        }
    }

    #[test]
    fn line_span_covers_all_instructions() {
        assert_eq!(method("a", &[7, 3, 5]).line_span(), Some((3, 7)));
        assert_eq!(method("b", &[]).line_span(), None);
    }

    #[test]
    fn methods_at_line_selects_covering_methods() {
        let mut class = ClassFile::new("com/example/A");
        class.methods.push(method("first", &[2, 4]));
        class.methods.push(method("second", &[10, 12]));
        let names: Vec<&str> = class.methods_at_line(11).map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["second"]);
        assert_eq!(class.methods_at_line(6).count(), 0);
    }
}
