//! Forward-only HTML scanner.
//!
//! The tokenizer walks the document once and reports start tags, end tags
//! and text runs to a [`TokenSink`], together with their spans in the
//! original document. It never modifies the document; rewriting happens in
//! [`LineBuffer`](crate::html::rewriter::LineBuffer), which translates the
//! original spans into the rewritten text.
//!
//! Positions use zero-based lines split on `\n` and byte columns within the
//! line, the same coordinates `LineBuffer` is addressed with.
//!
//! Content of `script` and `style` elements is scanned as raw text up to the
//! matching end tag and never reported. Comments, declarations and
//! processing instructions are skipped silently.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartTag {
    /// Lower-cased tag name.
    pub name: String,
    /// Attributes in source order. Names are lower-cased, values are the raw
    /// text between the quotes. A bare attribute has no value.
    pub attrs: Vec<(String, Option<String>)>,
    /// From the `<` up to just after the closing `>`.
    pub span: Span,
}

impl StartTag {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .and_then(|(_, value)| value.as_deref())
    }
}

/// Receiver of tokenizer events. Every method defaults to doing nothing.
pub trait TokenSink {
    fn start_tag(&mut self, _tag: &StartTag) {}

    /// Non-blank text outside `script` and `style`.
    fn text(&mut self, _text: &str, _span: Span) {}

    fn end_tag(&mut self, _name: &str) {}
}

const RAW_TEXT_TAGS: [&str; 2] = ["script", "style"];

pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    line_starts: Vec<usize>,
    data_enabled: bool,
    raw_text: Option<&'static str>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(input.match_indices('\n').map(|(i, _)| i + 1))
            .collect();

        Self {
            input,
            pos: 0,
            line_starts,
            data_enabled: true,
            raw_text: None,
        }
    }

    /// Scans the whole document, reporting events in document order.
    pub fn feed<S: TokenSink>(mut self, sink: &mut S) {
        let input = self.input;
        let len = input.len();

        while self.pos < len {
            if let Some(tag) = self.raw_text.take() {
                let end = find_end_tag(&input[self.pos..], tag)
                    .map_or(len, |i| self.pos + i);
                self.emit_text(self.pos, end, sink);
                self.pos = end;
                continue;
            }

            let rest = &input.as_bytes()[self.pos..];
            if !starts_markup(rest) {
                let end = self.next_markup(self.pos + 1);
                self.emit_text(self.pos, end, sink);
                self.pos = end;
                continue;
            }

            match rest[1] {
                b'!' if rest.starts_with(b"<!--") => {
                    self.pos = self.skip_past(self.pos + 4, "-->");
                }
                b'!' | b'?' => {
                    self.pos = self.skip_past(self.pos + 2, ">");
                }
                b'/' => self.parse_end_tag(sink),
                _ => self.parse_start_tag(sink),
            }
        }
    }

    fn position(&self, offset: usize) -> Position {
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        Position {
            line,
            column: offset - self.line_starts[line],
        }
    }

    fn span(&self, start: usize, end: usize) -> Span {
        Span {
            start: self.position(start),
            end: self.position(end),
        }
    }

    /// Offset of the next `<` that opens markup, or the end of input.
    fn next_markup(&self, from: usize) -> usize {
        let bytes = self.input.as_bytes();
        (from..bytes.len())
            .find(|&i| starts_markup(&bytes[i..]))
            .unwrap_or(bytes.len())
    }

    fn skip_past(&self, from: usize, terminator: &str) -> usize {
        self.input[from.min(self.input.len())..]
            .find(terminator)
            .map_or(self.input.len(), |i| from + i + terminator.len())
    }

    fn emit_text<S: TokenSink>(&self, start: usize, end: usize, sink: &mut S) {
        let text = &self.input[start..end];
        if self.data_enabled && !text.trim().is_empty() {
            sink.text(text, self.span(start, end));
        }
    }

    fn parse_end_tag<S: TokenSink>(&mut self, sink: &mut S) {
        let input = self.input;
        let bytes = input.as_bytes();
        let name_start = self.pos + 2;
        let name_end = (name_start..bytes.len())
            .find(|&i| !bytes[i].is_ascii_alphanumeric())
            .unwrap_or(bytes.len());
        let name = input[name_start..name_end].to_ascii_lowercase();
        self.pos = self.skip_past(name_end, ">");

        if name.is_empty() {
            return;
        }
        if RAW_TEXT_TAGS.contains(&name.as_str()) {
            self.data_enabled = true;
        }
        sink.end_tag(&name);
    }

    fn parse_start_tag<S: TokenSink>(&mut self, sink: &mut S) {
        let Some((name, attrs, end)) = parse_tag(self.input, self.pos) else {
            // unterminated tag: the '<' is text, later markup is still parsed
            let end = self.next_markup(self.pos + 1);
            self.emit_text(self.pos, end, sink);
            self.pos = end;
            return;
        };

        let tag = StartTag {
            name,
            attrs,
            span: self.span(self.pos, end),
        };
        self.pos = end;

        if let Some(raw) = RAW_TEXT_TAGS.iter().find(|raw| **raw == tag.name) {
            self.data_enabled = false;
            self.raw_text = Some(*raw);
        }
        sink.start_tag(&tag);
    }
}

fn starts_markup(bytes: &[u8]) -> bool {
    match bytes {
        [b'<', next, ..] => next.is_ascii_alphabetic() || matches!(next, b'/' | b'!' | b'?'),
        _ => false,
    }
}

/// Offset of `</tag` (any case) closing a raw text element.
fn find_end_tag(text: &str, tag: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let needle_len = tag.len() + 2;
    (0..bytes.len().saturating_sub(needle_len - 1)).find(|&i| {
        bytes[i] == b'<'
            && bytes[i + 1] == b'/'
            && bytes[i + 2..i + needle_len].eq_ignore_ascii_case(tag.as_bytes())
            && bytes
                .get(i + needle_len)
                .is_none_or(|b| !b.is_ascii_alphanumeric())
    })
}

type ParsedTag = (String, Vec<(String, Option<String>)>, usize);

/// Parses the start tag opening at `start`. Returns the lower-cased name,
/// the attributes and the offset just past `>`, or `None` if the input ends
/// inside the tag.
fn parse_tag(input: &str, start: usize) -> Option<ParsedTag> {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let is_space = |b: u8| b.is_ascii_whitespace();

    let mut i = start + 1;
    while i < len && !is_space(bytes[i]) && bytes[i] != b'/' && bytes[i] != b'>' {
        i += 1;
    }
    let name = input[start + 1..i].to_ascii_lowercase();
    let mut attrs = Vec::new();

    loop {
        while i < len && (is_space(bytes[i]) || bytes[i] == b'/') {
            i += 1;
        }
        if i >= len {
            return None;
        }
        if bytes[i] == b'>' {
            return Some((name, attrs, i + 1));
        }

        let name_start = i;
        while i < len && !is_space(bytes[i]) && !matches!(bytes[i], b'=' | b'>' | b'/') {
            i += 1;
        }
        if i == name_start {
            // stray '='
            i += 1;
            continue;
        }
        let attr_name = input[name_start..i].to_ascii_lowercase();

        while i < len && is_space(bytes[i]) {
            i += 1;
        }
        if i >= len || bytes[i] != b'=' {
            attrs.push((attr_name, None));
            continue;
        }
        i += 1;
        while i < len && is_space(bytes[i]) {
            i += 1;
        }
        if i >= len {
            return None;
        }

        let value = match bytes[i] {
            quote @ (b'"' | b'\'') => {
                let value_start = i + 1;
                let value_end = value_start + input[value_start..].find(quote as char)?;
                i = value_end + 1;
                &input[value_start..value_end]
            }
            _ => {
                let value_start = i;
                while i < len && !is_space(bytes[i]) && bytes[i] != b'>' {
                    i += 1;
                }
                &input[value_start..i]
            }
        };
        attrs.push((attr_name, Some(value.to_string())));
    }
}
