//! Rewrite pass over an upstream HTML document.
//!
//! Two edits run as tokenizer callbacks during one forward pass:
//! links to the upstream are pointed at the proxy, and every six-letter
//! word gets a trademark sign appended.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::html::rewriter::LineBuffer;
use crate::html::tokenizer::{Span, StartTag, TokenSink, Tokenizer};

pub const TRADEMARK: &str = "\u{2122}";

static SIX_LETTER_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w{6}\b").unwrap());

pub struct Modifier<'a> {
    target_link: &'a str,
    local_link: &'a str,
}

impl<'a> Modifier<'a> {
    pub fn new(target_link: &'a str, local_link: &'a str) -> Self {
        Self {
            target_link,
            local_link,
        }
    }

    /// Runs the rewrite pass over `text` and returns the new document.
    pub fn modify_data(&self, text: &str) -> String {
        let mut pass = RewritePass {
            buffer: LineBuffer::new(text),
            target_link: self.target_link,
            local_link: self.local_link,
        };
        Tokenizer::new(text).feed(&mut pass);
        pass.buffer.into_text()
    }
}

/// State of one rewrite pass, discarded once the document is rebuilt.
struct RewritePass<'a> {
    buffer: LineBuffer,
    target_link: &'a str,
    local_link: &'a str,
}

impl RewritePass<'_> {
    fn fix_link(&mut self, tag: &StartTag) {
        match tag.attr("href") {
            Some(href) if href.contains(self.target_link) => {}
            _ => return,
        }

        // repeated attributes keep the first position and the last value
        let mut attrs: IndexMap<&str, Option<String>> = IndexMap::new();
        for (name, value) in &tag.attrs {
            let value = match value {
                Some(v) if name == "href" => Some(v.replace(self.target_link, self.local_link)),
                v => v.clone(),
            };
            attrs.insert(name.as_str(), value);
        }

        let attrs: Vec<String> = attrs
            .into_iter()
            .map(|(name, value)| match value {
                Some(v) => format!("{}=\"{}\"", name, v.replace('"', "&quot;")),
                None => name.to_string(),
            })
            .collect();
        let link = format!("<a {}>", attrs.join(" "));

        let span = tag.span;
        let mut lines = vec![link];
        lines.resize(span.end.line - span.start.line + 1, String::new());
        self.buffer.replace_lines(&lines, span);
    }

    fn wrap_words(&mut self, text: &str, span: Span) {
        let Some(wrapped) = decorate_words(text) else {
            return;
        };
        let lines: Vec<&str> = wrapped.split('\n').collect();
        self.buffer.replace_lines(&lines, span);
    }
}

impl TokenSink for RewritePass<'_> {
    fn start_tag(&mut self, tag: &StartTag) {
        if tag.name == "a" {
            self.fix_link(tag);
        }
    }

    fn text(&mut self, text: &str, span: Span) {
        self.wrap_words(text, span);
    }
}

/// Appends [`TRADEMARK`] to every six-letter word, skipping character
/// references such as `&hellip;`. Returns `None` when nothing matched.
fn decorate_words(text: &str) -> Option<String> {
    let mut result = String::with_capacity(text.len() + 16);
    let mut last = 0;
    let mut count = 0;

    for word in SIX_LETTER_WORD.find_iter(text) {
        let before = &text[..word.start()];
        let is_reference = (before.ends_with('&') || before.ends_with("&#"))
            && text[word.end()..].starts_with(';');
        if is_reference {
            continue;
        }

        result.push_str(&text[last..word.end()]);
        result.push_str(TRADEMARK);
        last = word.end();
        count += 1;
    }

    if count == 0 {
        return None;
    }
    result.push_str(&text[last..]);
    Some(result)
}
