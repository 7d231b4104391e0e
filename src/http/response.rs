//! Upstream response as relayed to the client.
//!
//! The body is held in its wire form (`packed`: gzip bytes, already
//! de-chunked) and, for gzip-compressed HTML, in its logical form (`text`).
//! Unpacking happens once on construction; packing happens every time the
//! text is reassigned, so the two never disagree.

use async_std::io::prelude::*;
use async_std::io::{BufRead, Write};

use crate::error::{ProxyError, Result};
use crate::http::headers::HttpHeaders;
use crate::http::request::read_exact_body;
use crate::http::status::{HttpStatus, parse_status_code};
use crate::http::{chunked, compression};

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=UTF-8";

pub enum ResponseHeader {
    ContentLength,
    ContentType,
    ContentEncoding,
    TransferEncoding,
    Location,
}

impl ResponseHeader {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseHeader::ContentLength => "Content-Length",
            ResponseHeader::ContentType => "Content-Type",
            ResponseHeader::ContentEncoding => "Content-Encoding",
            ResponseHeader::TransferEncoding => "Transfer-Encoding",
            ResponseHeader::Location => "Location",
        }
    }
}

#[derive(Debug)]
pub struct HttpResponse {
    pub headers: HttpHeaders,
    packed: Option<Vec<u8>>,
    chunks_count: usize,
    text: Option<String>,
}

impl HttpResponse {
    /// `packed` is the body with any chunk framing already removed and
    /// `chunks_count` the number of chunks it arrived in (0 when not chunked).
    pub fn new(headers: HttpHeaders, packed: Option<Vec<u8>>, chunks_count: usize) -> Self {
        let mut response = Self {
            headers,
            packed,
            chunks_count,
            text: None,
        };
        response.unpack();
        response
    }

    /// Reads a response whose body is delimited by `Content-Length` or by
    /// chunked transfer-encoding. With neither header there is no body.
    pub async fn read_from<R>(reader: &mut R) -> Result<Self>
    where
        R: BufRead + Unpin,
    {
        let headers = HttpHeaders::read_from(reader).await?;
        if headers.is_empty() {
            return Err(ProxyError::Framing(
                "upstream closed before sending a status line".to_string(),
            ));
        }

        // chunked framing wins over a Content-Length sent alongside it
        if has_chunked_encoding(&headers) {
            let body = chunked::decode(reader).await?;
            let mut response = Self::new(headers, Some(body.payload), body.chunks);
            response.remove_header(ResponseHeader::ContentLength);
            return Ok(response);
        }

        if let Some(len) = headers.get_ignore_case(ResponseHeader::ContentLength.as_str()) {
            let len = len
                .parse::<usize>()
                .map_err(|_| ProxyError::Framing(format!("malformed Content-Length {:?}", len)))?;
            let body = read_exact_body(reader, len).await?;
            return Ok(Self::new(headers, Some(body), 0));
        }

        Ok(Self::new(headers, None, 0))
    }

    fn header(&self, h: ResponseHeader) -> Option<&str> {
        self.headers.get_ignore_case(h.as_str())
    }

    /// Sets a header, reusing the name as received when it is already present.
    fn set_header(&mut self, h: ResponseHeader, value: &str) {
        let name = self
            .headers
            .names()
            .find(|name| name.eq_ignore_ascii_case(h.as_str()))
            .map(str::to_string)
            .unwrap_or_else(|| h.as_str().to_string());
        self.headers.set(&name, value);
    }

    fn remove_header(&mut self, h: ResponseHeader) {
        let name = self
            .headers
            .names()
            .find(|name| name.eq_ignore_ascii_case(h.as_str()))
            .map(str::to_string);
        if let Some(name) = name {
            self.headers.remove(&name);
        }
    }

    pub fn status(&self) -> Option<u16> {
        parse_status_code(self.headers.general())
    }

    pub fn is_chunked(&self) -> bool {
        has_chunked_encoding(&self.headers) && self.packed.is_some()
    }

    pub fn is_gzipped_html(&self) -> bool {
        let gzipped = self
            .header(ResponseHeader::ContentEncoding)
            .is_some_and(|ce| ce.eq_ignore_ascii_case("gzip"));
        let is_html = self
            .header(ResponseHeader::ContentType)
            .is_some_and(|ct| ct.eq_ignore_ascii_case(HTML_CONTENT_TYPE));
        gzipped && is_html && self.packed.is_some()
    }

    /// Decompressed document, present only for gzip-compressed HTML that
    /// inflated cleanly.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn packed(&self) -> Option<&[u8]> {
        self.packed.as_deref()
    }

    pub fn chunks_count(&self) -> usize {
        self.chunks_count
    }

    /// Replaces the document and recompresses it.
    pub fn set_text(&mut self, text: String) -> Result<()> {
        self.text = Some(text);
        self.pack()
    }

    fn pack(&mut self) -> Result<()> {
        if !self.is_gzipped_html() {
            return Ok(());
        }
        let Some(text) = &self.text else {
            return Ok(());
        };

        let packed = compression::encode(text)?;
        if !self.is_chunked() && self.header(ResponseHeader::ContentLength).is_some() {
            self.set_header(ResponseHeader::ContentLength, &packed.len().to_string());
        }
        self.packed = Some(packed);
        Ok(())
    }

    fn unpack(&mut self) {
        if !self.is_gzipped_html() {
            return;
        }
        let Some(packed) = &self.packed else {
            return;
        };

        match compression::decode(packed) {
            Ok(text) => self.text = Some(text),
            Err(err) => tracing::warn!(%err, "passing gzip body through unmodified"),
        }
    }

    /// Points a redirect at the proxy instead of the upstream.
    ///
    /// Returns whether the `Location` header was changed.
    pub fn handle_redirect(&mut self, target_link: &str, local_link: &str) -> bool {
        if self.status().and_then(HttpStatus::from_code).is_none() {
            return false;
        }

        let location = match self.header(ResponseHeader::Location) {
            Some(location) if location.contains(target_link) => {
                location.replace(target_link, local_link)
            }
            _ => return false,
        };
        self.set_header(ResponseHeader::Location, &location);
        true
    }

    /// Wire form of the response: the header block followed by the body,
    /// re-chunked when the upstream sent it chunked.
    pub fn frames(&self) -> impl Iterator<Item = Vec<u8>> + '_ {
        let body: Box<dyn Iterator<Item = Vec<u8>> + '_> = match &self.packed {
            Some(packed) if self.is_chunked() => {
                Box::new(chunked::chunks(packed, self.chunks_count))
            }
            Some(packed) => Box::new(std::iter::once(packed.clone())),
            None => Box::new(std::iter::empty()),
        };
        std::iter::once(self.headers.to_bytes()).chain(body)
    }

    pub async fn write_to<W>(&self, writer: &mut W) -> std::io::Result<()>
    where
        W: Write + Unpin,
    {
        for frame in self.frames() {
            writer.write_all(&frame).await?;
        }
        writer.flush().await
    }
}

fn has_chunked_encoding(headers: &HttpHeaders) -> bool {
    headers
        .get_ignore_case(ResponseHeader::TransferEncoding.as_str())
        .is_some_and(|te| te.to_ascii_lowercase().contains("chunked"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_std::io::Cursor;
    use async_std::task;

    const TARGET: &str = "https://habrahabr.ru";
    const LOCAL: &str = "http://localhost:9090";

    fn gzipped_html(extra: &str, text: &str, chunks: usize) -> HttpResponse {
        let headers = HttpHeaders::from_lines([
            "HTTP/1.1 200 OK",
            "Content-Type: text/html; charset=UTF-8",
            "Content-Encoding: gzip",
            extra,
        ]);
        HttpResponse::new(headers, Some(compression::encode(text).unwrap()), chunks)
    }

    fn read(raw: &[u8]) -> Result<HttpResponse> {
        let mut reader = Cursor::new(raw.to_vec());
        task::block_on(HttpResponse::read_from(&mut reader))
    }

    #[test]
    fn reads_length_delimited_body() {
        let response = read(b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\nWikiTRAILING").unwrap();
        assert_eq!(response.status(), Some(200));
        assert_eq!(response.packed(), Some(&b"Wiki"[..]));
        assert!(!response.is_chunked());
    }

    #[test]
    fn reads_chunked_body() {
        let response = read(b"HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\n4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n").unwrap();
        assert!(response.is_chunked());
        assert_eq!(response.chunks_count(), 2);
        assert_eq!(response.packed(), Some(&b"Wikipedia"[..]));
    }

    #[test]
    fn chunked_encoding_overrides_content_length() {
        let mut raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nContent-Length: 14\r\n\r\n".to_vec();
        raw.extend(chunked::encode(b"Wiki", 1));

        let response = read(&raw).unwrap();
        assert_eq!(response.packed(), Some(&b"Wiki"[..]));
        assert_eq!(response.chunks_count(), 1);

        let wire: Vec<u8> = response.frames().flatten().collect();
        assert_eq!(
            wire,
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n0\r\n\r\n"
        );
    }

    #[test]
    fn no_framing_header_means_no_body() {
        let response = read(b"HTTP/1.1 304 Not Modified\r\nETag: \"x\"\r\n\r\n").unwrap();
        assert_eq!(response.packed(), None);
        let wire: Vec<u8> = response.frames().flatten().collect();
        assert_eq!(wire, b"HTTP/1.1 304 Not Modified\r\nETag: \"x\"\r\n\r\n");
    }

    #[test]
    fn bad_framing_is_rejected() {
        assert!(matches!(
            read(b"HTTP/1.1 200 OK\r\nContent-Length: lots\r\n\r\n"),
            Err(ProxyError::Framing(_))
        ));
        assert!(matches!(
            read(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nWiki"),
            Err(ProxyError::Framing(_))
        ));
        assert!(matches!(read(b""), Err(ProxyError::Framing(_))));
    }

    #[test]
    fn unpacks_gzipped_html_on_construction() {
        let response = gzipped_html("Transfer-Encoding: chunked", "<p>hello</p>", 2);
        assert!(response.is_chunked());
        assert!(response.is_gzipped_html());
        assert_eq!(response.text(), Some("<p>hello</p>"));
    }

    #[test]
    fn predicates_ignore_value_case() {
        let headers = HttpHeaders::from_lines([
            "HTTP/1.1 200 OK",
            "content-type: text/html; charset=utf-8",
            "content-encoding: GZIP",
            "transfer-encoding: Chunked",
        ]);
        let response = HttpResponse::new(headers, Some(compression::encode("x").unwrap()), 1);
        assert!(response.is_chunked());
        assert!(response.is_gzipped_html());
    }

    #[test]
    fn predicates_require_payload() {
        let headers = HttpHeaders::from_lines([
            "HTTP/1.1 304 Not Modified",
            "Content-Type: text/html; charset=UTF-8",
            "Content-Encoding: gzip",
            "Transfer-Encoding: chunked",
        ]);
        let response = HttpResponse::new(headers, None, 0);
        assert!(!response.is_chunked());
        assert!(!response.is_gzipped_html());
        assert_eq!(response.text(), None);
    }

    #[test]
    fn other_content_types_are_left_packed() {
        let headers = HttpHeaders::from_lines([
            "HTTP/1.1 200 OK",
            "Content-Type: application/json",
            "Content-Encoding: gzip",
        ]);
        let packed = compression::encode("{}").unwrap();
        let response = HttpResponse::new(headers, Some(packed.clone()), 0);
        assert!(!response.is_gzipped_html());
        assert_eq!(response.text(), None);
        assert_eq!(response.packed(), Some(packed.as_slice()));
    }

    #[test]
    fn reassigned_text_is_recompressed_and_length_updated() {
        let mut response = gzipped_html("Content-Length: 1", "<p>hello</p>", 0);
        response.set_text("<p>hello, world</p>".to_string()).unwrap();

        let packed = response.packed().unwrap();
        assert_eq!(compression::decode(packed).unwrap(), "<p>hello, world</p>");
        assert_eq!(
            response.headers.get("Content-Length"),
            Some(packed.len().to_string().as_str())
        );
    }

    #[test]
    fn broken_gzip_is_passed_through() {
        let headers = HttpHeaders::from_lines([
            "HTTP/1.1 200 OK",
            "Content-Type: text/html; charset=UTF-8",
            "Content-Encoding: gzip",
            "Content-Length: 9",
        ]);
        let response = HttpResponse::new(headers, Some(b"not gzip!".to_vec()), 0);
        assert_eq!(response.text(), None);

        let wire: Vec<u8> = response.frames().flatten().collect();
        assert!(wire.ends_with(b"\r\n\r\nnot gzip!"));
    }

    #[test]
    fn redirect_location_points_at_proxy() {
        let headers = HttpHeaders::from_lines([
            "HTTP/1.1 301 Moved Permanently",
            "Location: https://habrahabr.ru/post/1/",
        ]);
        let mut response = HttpResponse::new(headers, None, 0);

        assert!(response.handle_redirect(TARGET, LOCAL));
        assert_eq!(
            response.headers.get("Location"),
            Some("http://localhost:9090/post/1/")
        );

        assert!(!response.handle_redirect(TARGET, LOCAL));
        assert_eq!(
            response.headers.get("Location"),
            Some("http://localhost:9090/post/1/")
        );
    }

    #[test]
    fn non_redirect_location_is_untouched() {
        let headers = HttpHeaders::from_lines([
            "HTTP/1.1 201 Created",
            "Location: https://habrahabr.ru/post/1/",
        ]);
        let mut response = HttpResponse::new(headers, None, 0);
        assert!(!response.handle_redirect(TARGET, LOCAL));
        assert_eq!(
            response.headers.get("Location"),
            Some("https://habrahabr.ru/post/1/")
        );
    }

    #[test]
    fn plain_body_written_after_headers() {
        let headers = HttpHeaders::from_lines(["HTTP/1.1 200 OK", "Content-Length: 4"]);
        let response = HttpResponse::new(headers, Some(b"Wiki".to_vec()), 0);

        let mut out = Vec::new();
        task::block_on(response.write_to(&mut out)).unwrap();
        assert_eq!(out, b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\nWiki");
    }

    #[test]
    fn chunked_body_is_reframed() {
        let headers = HttpHeaders::from_lines(["HTTP/1.1 200 OK", "Transfer-Encoding: chunked"]);
        let response = HttpResponse::new(headers, Some(b"Wikipedia".to_vec()), 2);

        let wire: Vec<u8> = response.frames().flatten().collect();
        assert_eq!(
            wire,
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n"
        );
    }
}
