use serde::{Deserialize, Serialize};

/// A point in a file. Line and column are 0-based; column counts characters.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    /// Byte offset into the file contents.
    pub offset: usize,
}

impl Position {
    pub fn new(line: u32, column: u32, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }

    /// Compute the position of a byte offset within `contents`.
    ///
    /// Offsets past the end clamp to the end of the text; offsets inside a
    /// multi-byte character clamp back to its start.
    pub fn at(contents: &str, offset: usize) -> Self {
        let mut offset = offset.min(contents.len());
        while !contents.is_char_boundary(offset) {
            offset -= 1;
        }
        let before = &contents[..offset];
        let line = before.matches('\n').count() as u32;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = contents[line_start..offset].chars().count() as u32;
        Self {
            line,
            column,
            offset,
        }
    }

    /// Position of the first non-whitespace character on `line`, or `None`
    /// when the file has fewer lines.
    pub fn line_start(contents: &str, line: u32) -> Option<Self> {
        let mut offset = 0usize;
        for (index, text) in contents.split('\n').enumerate() {
            if index as u32 == line {
                let indent: usize = text
                    .chars()
                    .take_while(|c| c.is_whitespace())
                    .map(char::len_utf8)
                    .sum();
                return Some(Position::at(contents, offset + indent));
            }
            offset += text.len() + 1;
        }
        None
    }
}

/// Start/end span of a tree node, end exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub start: Position,
    pub end: Position,
}

impl TextRange {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Build a range from byte offsets into `contents`.
    pub fn from_offsets(contents: &str, start: usize, end: usize) -> Self {
        Self {
            start: Position::at(contents, start),
            end: Position::at(contents, end),
        }
    }

    pub fn contains_offset(&self, offset: usize) -> bool {
        self.start.offset <= offset && offset < self.end.offset
    }

    /// True when `other` lies entirely within this range.
    pub fn encloses(&self, other: &TextRange) -> bool {
        self.start.offset <= other.start.offset && other.end.offset <= self.end.offset
    }
}

/// A positioned span inside a named file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub path: String,
    pub start: Position,
    pub end: Position,
}

impl Location {
    pub fn new(path: impl Into<String>, range: TextRange) -> Self {
        Self {
            path: path.into(),
            start: range.start,
            end: range.end,
        }
    }

    /// A zero-width location.
    pub fn point(path: impl Into<String>, at: Position) -> Self {
        Self {
            path: path.into(),
            start: at,
            end: at,
        }
    }

    /// Location of the first character of a file.
    pub fn file_start(path: impl Into<String>) -> Self {
        Self::point(path, Position::default())
    }

    pub fn range(&self) -> TextRange {
        TextRange::new(self.start, self.end)
    }
}

/// An additional location attached to a finding, with an optional description.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecondaryLocation {
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SecondaryLocation {
    pub fn new(location: Location, message: impl Into<String>) -> Self {
        Self {
            location,
            message: Some(message.into()),
        }
    }

    pub fn bare(location: Location) -> Self {
        Self {
            location,
            message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Position Tests ====================

    #[test]
    fn position_at_start_of_file() {
        let pos = Position::at("abc\ndef", 0);
        assert_eq!(pos, Position::new(0, 0, 0));
    }

    #[test]
    fn position_after_newline() {
        let pos = Position::at("abc\ndef", 5);
        assert_eq!(pos.line, 1);
        assert_eq!(pos.column, 1);
        assert_eq!(pos.offset, 5);
    }

    #[test]
    fn position_clamps_past_end() {
        let pos = Position::at("ab", 10);
        assert_eq!(pos.offset, 2);
        assert_eq!(pos.column, 2);
    }

    #[test]
    fn position_counts_characters_not_bytes() {
        let text = "é=1";
        let pos = Position::at(text, text.find('=').unwrap());
        assert_eq!(pos.column, 1);
        assert_eq!(pos.offset, 2);
    }

    #[test]
    fn position_inside_multibyte_char_clamps_back() {
        let pos = Position::at("é", 1);
        assert_eq!(pos.offset, 0);
    }

    #[test]
    fn line_start_skips_indentation() {
        let text = "first\n    second\nthird";
        let pos = Position::line_start(text, 1).unwrap();
        assert_eq!(pos.line, 1);
        assert_eq!(pos.column, 4);
        assert_eq!(&text[pos.offset..pos.offset + 6], "second");
    }

    #[test]
    fn line_start_missing_line() {
        assert!(Position::line_start("one line", 3).is_none());
    }

    #[test]
    fn positions_order_by_line_then_column() {
        let a = Position::new(1, 5, 20);
        let b = Position::new(2, 0, 21);
        assert!(a < b);
    }

    // ==================== TextRange Tests ====================

    #[test]
    fn range_from_offsets() {
        let text = "<a>\n  <b/>\n</a>";
        let start = text.find("<b").unwrap();
        let range = TextRange::from_offsets(text, start, start + 4);
        assert_eq!(range.start.line, 1);
        assert_eq!(range.start.column, 2);
        assert_eq!(range.end.column, 6);
    }

    #[test]
    fn range_contains_is_end_exclusive() {
        let range = TextRange::from_offsets("abcdef", 1, 3);
        assert!(!range.contains_offset(0));
        assert!(range.contains_offset(1));
        assert!(range.contains_offset(2));
        assert!(!range.contains_offset(3));
    }

    #[test]
    fn range_encloses() {
        let outer = TextRange::from_offsets("abcdef", 0, 6);
        let inner = TextRange::from_offsets("abcdef", 2, 4);
        assert!(outer.encloses(&inner));
        assert!(!inner.encloses(&outer));
    }

    // ==================== Location Tests ====================

    #[test]
    fn point_location_has_equal_ends() {
        let loc = Location::point("a.xml", Position::new(3, 4, 40));
        assert_eq!(loc.start, loc.end);
        assert_eq!(loc.range().start.line, 3);
    }

    #[test]
    fn secondary_location_serialization_skips_missing_message() {
        let secondary = SecondaryLocation::bare(Location::file_start("a.xml"));
        let json = serde_json::to_string(&secondary).unwrap();
        assert!(!json.contains("message"));

        let described = SecondaryLocation::new(Location::file_start("a.xml"), "here");
        let json = serde_json::to_string(&described).unwrap();
        assert!(json.contains("\"message\":\"here\""));
    }
}
