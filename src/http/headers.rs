//! HTTP header block of a proxied message.
//!
//! Holds the general line (request line or status line) plus the header
//! fields in the order they were received. Names are kept exactly as sent,
//! so lookups are case-sensitive unless [`HttpHeaders::get_ignore_case`] is
//! used. Serialization reproduces the block byte for byte: general line
//! first, then every field, then the empty line ending the head.
//!
//! No HTTP semantics are enforced here. [`HttpRequest`](crate::http::request::HttpRequest)
//! and [`HttpResponse`](crate::http::response::HttpResponse) decide what the
//! fields mean.

use async_std::io::prelude::*;
use async_std::io::BufRead;
use indexmap::IndexMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpHeaders {
    general: String,
    headers: IndexMap<String, String>,
}

impl HttpHeaders {
    pub fn new(general: &str) -> Self {
        Self {
            general: general.to_string(),
            headers: IndexMap::new(),
        }
    }

    /// Builds a header block from raw lines, line terminators included or not.
    ///
    /// The first line is the general line. Any later line without a `:` is
    /// not a header field and is skipped.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut result = Self::default();
        let mut lines = lines.into_iter();

        if let Some(first) = lines.next() {
            result.general = first.as_ref().trim().to_string();
        }

        for line in lines {
            let line = line.as_ref();
            match line.split_once(':') {
                Some((name, value)) => result.set(name, value.trim()),
                None => tracing::debug!(line = line.trim_end(), "ignoring header line without ':'"),
            }
        }
        result
    }

    /// Reads a header block up to and including the empty line ending it.
    ///
    /// A stream that closes before any line arrives yields an empty block,
    /// see [`HttpHeaders::is_empty`].
    pub async fn read_from<R>(reader: &mut R) -> std::io::Result<Self>
    where
        R: BufRead + Unpin,
    {
        let mut lines = Vec::new();
        let mut raw = Vec::new();

        loop {
            raw.clear();
            let n = reader.read_until(b'\n', &mut raw).await?;
            if n == 0 || raw == b"\r\n" || raw == b"\n" {
                break;
            }
            lines.push(String::from_utf8_lossy(&raw).into_owned());
        }

        Ok(Self::from_lines(lines))
    }

    pub fn is_empty(&self) -> bool {
        self.general.is_empty() && self.headers.is_empty()
    }

    pub fn general(&self) -> &str {
        &self.general
    }

    /// Inserts or overwrites a field. An overwritten field keeps its position.
    pub fn set(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Removes a field, keeping the order of the others.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.headers.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn get_ignore_case(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.headers.keys().map(String::as_str)
    }

    pub fn stringify(&self) -> String {
        let mut result = String::new();
        result.push_str(&self.general);
        result.push_str("\r\n");
        for (name, value) in &self.headers {
            result.push_str(&format!("{}: {}\r\n", name, value));
        }
        result.push_str("\r\n");
        result
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.stringify().into_bytes()
    }
}
