//! Habraproxy: an HTTP proxy for a single upstream site.
//!
//! A client request is forwarded over TLS to the configured upstream and the
//! response is relayed back. Gzip-compressed HTML is inflated, its links to
//! the upstream are pointed at the proxy, every six-letter word is marked
//! with a trademark sign, and the document is recompressed and re-chunked
//! before it reaches the client.
//!
//! ## Request handling flow
//!
//! 1. Accept a TCP connection ([`net::server`])
//! 2. Read the request and answer redirect-table paths locally ([`handler`])
//! 3. Forward the request with its `Host` replaced ([`net::upstream`])
//! 4. Read the response, de-chunking and inflating the body ([`http`])
//! 5. Rewrite the document in one tokenizer pass ([`html`])
//! 6. Recompress, re-chunk and write the response back to the client

pub mod config;
pub mod error;
pub mod handler;
pub mod html;
pub mod http;
pub mod net;
