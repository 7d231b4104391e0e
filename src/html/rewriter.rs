//! Line-buffered document with span-addressed replacements.
//!
//! Replacements are addressed in the coordinates of the original document,
//! as reported by the tokenizer. Each line keeps the column drift caused by
//! the replacements already applied to it, and every later replacement on
//! that line is shifted by that drift first. Replacements on one line must
//! arrive in ascending column order; lines never influence each other.

use std::collections::HashMap;

use crate::html::tokenizer::Span;

pub struct LineBuffer {
    lines: Vec<String>,
    offsets: HashMap<usize, isize>,
}

impl LineBuffer {
    pub fn new(text: &str) -> Self {
        Self {
            lines: text.split('\n').map(str::to_string).collect(),
            offsets: HashMap::new(),
        }
    }

    /// Replaces `start..end` of line `line` with `text`.
    ///
    /// Columns are original byte columns. Without `end` the rest of the line
    /// is replaced. Out-of-range replacements are dropped.
    pub fn replace_line(&mut self, text: &str, line: usize, start: usize, end: Option<usize>) {
        let offset = self.offsets.get(&line).copied().unwrap_or(0);
        let Some(current) = self.lines.get_mut(line) else {
            tracing::warn!(line, "replacement past the last line dropped");
            return;
        };

        let start = start.checked_add_signed(offset);
        let end = match end {
            Some(end) => end.checked_add_signed(offset),
            None => Some(current.len()),
        };
        let (start, end) = match (start, end) {
            (Some(start), Some(end))
                if start <= end
                    && end <= current.len()
                    && current.is_char_boundary(start)
                    && current.is_char_boundary(end) =>
            {
                (start, end)
            }
            _ => {
                tracing::warn!(line, ?start, ?end, "replacement outside the line dropped");
                return;
            }
        };

        current.replace_range(start..end, text);
        let delta = text.len() as isize - (end - start) as isize;
        if delta != 0 {
            *self.offsets.entry(line).or_insert(0) += delta;
        }
    }

    /// Replaces a span that may cover several lines, one replacement line
    /// per covered line: the first from the start column to its end, the
    /// last from its beginning to the end column, the ones between wholesale.
    pub fn replace_lines<S: AsRef<str>>(&mut self, lines: &[S], span: Span) {
        for (i, text) in lines.iter().enumerate() {
            let line = span.start.line + i;
            if line > span.end.line {
                break;
            }

            let start = if i == 0 { span.start.column } else { 0 };
            let end = (line == span.end.line).then_some(span.end.column);
            self.replace_line(text.as_ref(), line, start, end);
        }
    }

    pub fn into_text(self) -> String {
        self.lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::tokenizer::Position;

    fn span(l1: usize, c1: usize, l2: usize, c2: usize) -> Span {
        Span {
            start: Position { line: l1, column: c1 },
            end: Position { line: l2, column: c2 },
        }
    }

    #[test]
    fn same_length_replacement_leaves_later_columns() {
        let mut buffer = LineBuffer::new("abcdefg");
        buffer.replace_line("XY", 0, 2, Some(4));
        buffer.replace_line("Z", 0, 5, Some(6));
        assert_eq!(buffer.into_text(), "abXYeZg");
    }

    #[test]
    fn later_columns_follow_length_changes() {
        let mut buffer = LineBuffer::new("abcdefg");
        buffer.replace_line("WXYZ", 0, 2, Some(4));
        buffer.replace_line("!", 0, 4, Some(4));
        buffer.replace_line("", 0, 5, Some(6));
        assert_eq!(buffer.into_text(), "abWXYZ!eg");
    }

    #[test]
    fn drift_is_per_line() {
        let mut buffer = LineBuffer::new("one two\nthree four");
        buffer.replace_line("1", 0, 0, Some(3));
        buffer.replace_line("4", 1, 6, Some(10));
        buffer.replace_line("2", 0, 4, Some(7));
        assert_eq!(buffer.into_text(), "1 2\nthree 4");
    }

    #[test]
    fn missing_end_replaces_to_end_of_line() {
        let mut buffer = LineBuffer::new("keep<a\n  href=x>");
        buffer.replace_line("<a>", 0, 4, None);
        assert_eq!(buffer.into_text(), "keep<a>\n  href=x>");
    }

    #[test]
    fn multi_line_span_keeps_line_structure() {
        let mut buffer = LineBuffer::new("x <a\nhref=1\nid=2>tail");
        buffer.replace_lines(&["<a href=\"1\" id=\"2\">", "", ""], span(0, 2, 2, 5));
        assert_eq!(buffer.into_text(), "x <a href=\"1\" id=\"2\">\n\ntail");
    }

    #[test]
    fn multi_line_span_after_edit_on_first_line() {
        let mut buffer = LineBuffer::new("<b>banana</b> text\nmore");
        buffer.replace_line("banana™", 0, 3, Some(9));
        buffer.replace_lines(&[" TEXT", "MORE"], span(0, 13, 1, 4));
        assert_eq!(buffer.into_text(), "<b>banana™</b> TEXT\nMORE");
    }

    #[test]
    fn out_of_range_is_dropped() {
        let mut buffer = LineBuffer::new("short\nПривет");
        buffer.replace_line("x", 0, 3, Some(40));
        buffer.replace_line("x", 5, 0, None);
        buffer.replace_line("x", 1, 1, Some(2));
        assert_eq!(buffer.into_text(), "short\nПривет");
    }

    #[test]
    fn untouched_document_is_byte_identical() {
        let text = "<p>\r\n  a\r\n</p>\n";
        assert_eq!(LineBuffer::new(text).into_text(), text);
    }
}
