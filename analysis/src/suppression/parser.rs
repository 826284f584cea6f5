//! Parser for suppression comments in file text.

use crate::suppression::model::{CommentSuppression, MarkerSource, SuppressionMarker};

/// Keywords that open a suppression comment body.
const COMMENT_KEYWORDS: [&str; 2] = ["noinspection", "suppress"];

/// Comment delimiters recognised in source and markup files. Longer openers
/// come first so `/**` is not read as `/*`.
const DELIMITERS: [(&str, &str); 4] = [("<!--", "-->"), ("/**", "*/"), ("/*", "*/"), ("//", "\n")];

/// Scan `contents` for suppression comments.
///
/// Recognised forms:
///
/// ```text
/// //noinspection ShortAlarm,DrawAllocation
/// /* noinspection ShortAlarm */
/// <!--suppress InconsistentArrays - arrays differ per locale -->
/// ```
///
/// The scan is keyed on the keywords: a keyword counts only when a comment
/// opener precedes it with nothing but blanks in between, so opener-like
/// text in strings or attribute values is never taken for a comment.
pub fn parse_comment_suppressions(contents: &str) -> Vec<CommentSuppression> {
    let mut suppressions = Vec::new();
    let mut cursor = 0usize;

    while let Some((keyword_at, keyword)) = next_keyword(contents, cursor) {
        let Some((start, close)) = comment_opener(&contents[..keyword_at]) else {
            cursor = keyword_at + keyword.len();
            continue;
        };
        let (body_end, end) = match contents[keyword_at..].find(close) {
            // Line comments end before the newline.
            Some(pos) if close == "\n" => (keyword_at + pos, keyword_at + pos),
            Some(pos) => (keyword_at + pos, keyword_at + pos + close.len()),
            None => (contents.len(), contents.len()),
        };

        if let Some((ids, reason)) = parse_body(&contents[keyword_at..body_end]) {
            suppressions.push(CommentSuppression {
                marker: SuppressionMarker::new(ids, MarkerSource::Comment),
                start,
                end,
                reason,
            });
        }
        cursor = end.max(keyword_at + keyword.len());
    }

    suppressions
}

/// Earliest keyword occurrence at or after `from`.
fn next_keyword(contents: &str, from: usize) -> Option<(usize, &'static str)> {
    COMMENT_KEYWORDS
        .iter()
        .filter_map(|keyword| {
            contents
                .get(from..)?
                .find(keyword)
                .map(|pos| (from + pos, *keyword))
        })
        .min_by_key(|(pos, _)| *pos)
}

/// The comment opener that ends `before`, ignoring trailing blanks.
///
/// Returns the opener's offset and the matching terminator. A line comment
/// does not reach past its own line.
fn comment_opener(before: &str) -> Option<(usize, &'static str)> {
    let trimmed = before.trim_end();
    let gap = &before[trimmed.len()..];
    DELIMITERS.iter().find_map(|(open, close)| {
        if !trimmed.ends_with(open) || (*close == "\n" && gap.contains('\n')) {
            return None;
        }
        Some((trimmed.len() - open.len(), *close))
    })
}

fn parse_body(body: &str) -> Option<(Vec<String>, Option<String>)> {
    let body = body.trim();
    let rest = COMMENT_KEYWORDS.iter().find_map(|keyword| {
        let rest = body.strip_prefix(keyword)?;
        // Keyword must be a whole word.
        match rest.chars().next() {
            Some(c) if c.is_whitespace() => Some(rest),
            _ => None,
        }
    })?;
    let (ids, reason) = parse_ids_and_reason(rest);
    if ids.is_empty() {
        return None;
    }
    Some((ids, reason))
}

/// Parse issue ids and optional reason from the text after the keyword.
///
/// Format: `id1, id2 - reason text` or `id1,id2 -- reason`
fn parse_ids_and_reason(text: &str) -> (Vec<String>, Option<String>) {
    let text = text.trim();

    let (ids_part, reason) = if let Some(pos) = text.find(" -- ") {
        let (ids, reason) = text.split_at(pos);
        (ids.trim(), Some(reason[4..].trim().to_string()))
    } else if let Some(pos) = text.find(" - ") {
        let (ids, reason) = text.split_at(pos);
        (ids.trim(), Some(reason[3..].trim().to_string()))
    } else {
        (text, None)
    };

    // Ids are comma separated; anything after the first blank in an entry is prose.
    let ids: Vec<String> = ids_part
        .split(',')
        .filter_map(|s| s.split_whitespace().next())
        .map(str::to_string)
        .collect();

    let reason = reason.filter(|r| !r.is_empty());

    (ids, reason)
}
