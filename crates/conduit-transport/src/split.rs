//! Streaming splitter for batch bodies.
//!
//! A batch body is any number of JSON values written back to back, with
//! or without whitespace between them. Splitting borrows from the input.

use conduit_common::SplitError;
use serde::de::IgnoredAny;
use serde::Deserialize;

/// Split `text` into its top-level JSON values, in document order.
///
/// Whitespace between values is skipped. The first malformed value,
/// including trailing garbage after the last good one, stops the split.
/// Garbage glued to a number or literal (`1x`, `truex`) is blamed on the
/// garbage, exactly as it is after an object, array or string.
pub fn split(text: &str) -> Result<Vec<&str>, SplitError> {
    let mut values = Vec::new();
    let mut base = 0;

    'resume: loop {
        let rest = &text[base..];
        let mut stream = serde_json::Deserializer::from_str(rest).into_iter::<IgnoredAny>();

        loop {
            let start = base + skip_whitespace(rest, stream.byte_offset());
            match stream.next() {
                None => return Ok(values),
                Some(Ok(IgnoredAny)) => values.push(&text[start..base + stream.byte_offset()]),
                Some(Err(e)) => {
                    let at = base + offset_at(rest, e.line(), e.column());
                    if at > start && ends_at(&text[start..], at - start) {
                        values.push(&text[start..at]);
                        base = at;
                        continue 'resume;
                    }
                    let (line, column) = shift(text, base, e.line(), e.column());
                    return Err(SplitError {
                        index: values.len(),
                        line,
                        column,
                        offset: start,
                        message: bare_message(&e),
                    });
                }
            }
        }
    }
}

/// True when `text` opens with one complete value spanning exactly `len` bytes.
///
/// The stream rejects a number or literal followed by anything but a
/// delimiter, even though the value itself decoded.
fn ends_at(text: &str, len: usize) -> bool {
    let mut de = serde_json::Deserializer::from_str(text);
    IgnoredAny::deserialize(&mut de).is_ok()
        && text
            .get(..len)
            .is_some_and(|head| serde_json::from_str::<IgnoredAny>(head).is_ok())
}

fn skip_whitespace(text: &str, from: usize) -> usize {
    text[from..]
        .find(|c: char| !matches!(c, ' ' | '\t' | '\n' | '\r'))
        .map_or(text.len(), |n| from + n)
}

/// Byte offset of a 1-based line/column reported by serde_json.
fn offset_at(text: &str, line: usize, column: usize) -> usize {
    let line_start = text
        .match_indices('\n')
        .nth(line.saturating_sub(2))
        .filter(|_| line > 1)
        .map_or(0, |(i, _)| i + 1);
    (line_start + column.saturating_sub(1)).min(text.len())
}

/// Translate a position inside `text[base..]` into one inside `text`.
fn shift(text: &str, base: usize, line: usize, column: usize) -> (usize, usize) {
    let before = &text[..base];
    let base_line = 1 + before.matches('\n').count();
    let base_column = before.rfind('\n').map_or(base, |i| base - i - 1);
    if line == 1 {
        (base_line, base_column + column)
    } else {
        (base_line + line - 1, column)
    }
}

/// serde_json appends "at line L column C"; those travel separately.
fn bare_message(e: &serde_json::Error) -> String {
    let full = e.to_string();
    match full.rsplit_once(" at line ") {
        Some((message, _)) => message.to_owned(),
        None => full,
    }
}
