use async_std::io::prelude::*;
use async_std::io::{BufRead, Write};

use crate::error::{ProxyError, Result};
use crate::http::headers::HttpHeaders;

/// Request headers the proxy reads or rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestHeader {
    Host,
    ContentLength,
}

impl RequestHeader {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestHeader::Host => "Host",
            RequestHeader::ContentLength => "Content-Length",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Reads a client request. Returns `None` when the client closed the
    /// connection without sending anything.
    pub async fn read_from<R>(reader: &mut R) -> Result<Option<Self>>
    where
        R: BufRead + Unpin,
    {
        let headers = HttpHeaders::read_from(reader).await?;
        if headers.is_empty() {
            return Ok(None);
        }

        let mut req = HttpRequest {
            headers,
            body: Vec::new(),
        };
        if let Some(len) = req.content_length()? {
            req.body = read_exact_body(reader, len).await?;
        }
        Ok(Some(req))
    }

    pub fn header(&self, h: RequestHeader) -> Option<&str> {
        self.headers.get_ignore_case(h.as_str())
    }

    /// Sets a request header constrained to the [`RequestHeader`] variants.
    ///
    /// The field is written under its canonical name unless the client
    /// already sent it under a different spelling.
    pub fn set_header(&mut self, h: RequestHeader, value: &str) {
        let name = self
            .headers
            .names()
            .find(|name| name.eq_ignore_ascii_case(h.as_str()))
            .map(str::to_string)
            .unwrap_or_else(|| h.as_str().to_string());
        self.headers.set(&name, value);
    }

    fn content_length(&self) -> Result<Option<usize>> {
        self.header(RequestHeader::ContentLength)
            .map(|v| v.parse::<usize>())
            .transpose()
            .map_err(|_| ProxyError::Framing("malformed Content-Length".to_string()))
    }

    /// Request target from the request line, e.g. `/auth/login/?checklogin=true`.
    pub fn path(&self) -> Option<&str> {
        self.headers.general().split_whitespace().nth(1)
    }

    /// Copy of this request addressed to the upstream host.
    pub fn for_upstream(&self, target_host: &str) -> HttpRequest {
        let mut req = self.clone();
        req.set_header(RequestHeader::Host, target_host);
        req
    }

    pub async fn write_to<W>(&self, writer: &mut W) -> std::io::Result<()>
    where
        W: Write + Unpin,
    {
        writer.write_all(&self.headers.to_bytes()).await?;
        if !self.body.is_empty() {
            writer.write_all(&self.body).await?;
        }
        writer.flush().await
    }
}

/// Reads exactly `len` bytes of a length-delimited body.
pub async fn read_exact_body<R>(reader: &mut R, len: usize) -> Result<Vec<u8>>
where
    R: BufRead + Unpin,
{
    let mut body = Vec::new();
    let n = (&mut *reader).take(len as u64).read_to_end(&mut body).await?;
    if n < len {
        return Err(ProxyError::Framing(format!(
            "body truncated after {} of {} bytes",
            n, len
        )));
    }
    Ok(body)
}
