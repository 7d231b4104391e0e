//! Chunked transfer-encoding.
//!
//! Decoding collapses a chunked body into one payload and remembers how many
//! chunks it came in. Encoding splits a payload back into roughly that many
//! chunks. The count is only a target: after the body has been rewritten the
//! split is recomputed from the new length, and only the framing has to stay
//! valid.

use async_std::io::prelude::*;
use async_std::io::BufRead;

use crate::error::{ProxyError, Result};

const TERMINAL_CHUNK: &[u8] = b"0\r\n\r\n";

#[derive(Debug, PartialEq)]
pub struct ChunkedBody {
    pub payload: Vec<u8>,
    pub chunks: usize,
}

/// Reads a chunked body from a stream positioned right after the header block.
pub async fn decode<R>(reader: &mut R) -> Result<ChunkedBody>
where
    R: BufRead + Unpin,
{
    let mut payload = Vec::new();
    let mut chunks = 0;

    loop {
        let size = read_chunk_size(reader).await?;
        if size == 0 {
            break;
        }

        let n = (&mut *reader).take(size as u64).read_to_end(&mut payload).await?;
        if n < size {
            return Err(ProxyError::Framing(format!(
                "chunk truncated after {} of {} bytes",
                n, size
            )));
        }
        chunks += 1;
    }

    skip_trailers(reader).await?;
    Ok(ChunkedBody { payload, chunks })
}

/// Reads the next size line, skipping the bare CRLF that ends the previous chunk.
async fn read_chunk_size<R>(reader: &mut R) -> Result<usize>
where
    R: BufRead + Unpin,
{
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line).await?;
    if line == b"\r\n" || line == b"\n" {
        line.clear();
        reader.read_until(b'\n', &mut line).await?;
    }

    if line.is_empty() {
        return Err(ProxyError::Framing(
            "stream ended before the terminal chunk".to_string(),
        ));
    }

    let text = String::from_utf8_lossy(&line);
    // chunk extensions are dropped
    let hex = text.split(';').next().unwrap_or("").trim();
    usize::from_str_radix(hex, 16)
        .map_err(|_| ProxyError::Framing(format!("invalid chunk size {:?}", text.trim_end())))
}

async fn skip_trailers<R>(reader: &mut R) -> Result<()>
where
    R: BufRead + Unpin,
{
    let mut line = Vec::new();
    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line).await?;
        if n == 0 || line == b"\r\n" || line == b"\n" {
            return Ok(());
        }
    }
}

/// Lazily frames `payload` as about `count` chunks followed by the terminal chunk.
///
/// Every piece has the nominal size `len / count` except the last one, which
/// takes the remainder whenever the remainder is below one and a half pieces.
pub fn chunks(payload: &[u8], count: usize) -> Chunks<'_> {
    let size = payload.len() / count.max(1);
    Chunks {
        payload,
        size: if size == 0 { payload.len() } else { size },
        pos: 0,
        done: false,
    }
}

pub fn encode(payload: &[u8], count: usize) -> Vec<u8> {
    chunks(payload, count).flatten().collect()
}

pub struct Chunks<'a> {
    payload: &'a [u8],
    size: usize,
    pos: usize,
    done: bool,
}

impl Iterator for Chunks<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let rest = &self.payload[self.pos..];
        if rest.is_empty() {
            self.done = true;
            return Some(TERMINAL_CHUNK.to_vec());
        }

        let piece = if 2 * rest.len() < 3 * self.size {
            rest
        } else {
            &rest[..self.size]
        };
        self.pos += piece.len();
        Some(frame(piece))
    }
}

fn frame(data: &[u8]) -> Vec<u8> {
    let mut framed = format!("{:x}\r\n", data.len()).into_bytes();
    framed.extend_from_slice(data);
    framed.extend_from_slice(b"\r\n");
    framed
}
