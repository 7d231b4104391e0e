//! Error kinds shared by the codecs, the upstream connection and the handler.
//!
//! None of these are recoverable within a request: the handler logs them and
//! closes the client connection without writing a response.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// Malformed chunk size or length header, or a stream that ended early.
    #[error("framing error: {0}")]
    Framing(String),

    /// Invalid gzip stream or a body that is not valid UTF-8 once inflated.
    #[error("compression error: {0}")]
    Compression(std::io::Error),

    #[error("invalid upstream server name: {0}")]
    Tls(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProxyError>;
