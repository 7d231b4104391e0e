//! HTTP/1.1 message plumbing: header blocks, body codecs and the request
//! and response types built on them.

pub mod chunked;
pub mod compression;
pub mod headers;
pub mod request;
pub mod response;
pub mod status;
