use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use std::io::{Read, Write};

use crate::error::{ProxyError, Result};

/// Inflates a gzip body into text. The inflated bytes must be UTF-8.
pub fn decode(packed: &[u8]) -> Result<String> {
    let mut decoder = MultiGzDecoder::new(packed);
    let mut text = String::new();
    decoder
        .read_to_string(&mut text)
        .map_err(ProxyError::Compression)?;
    Ok(text)
}

pub fn encode(text: &str) -> Result<Vec<u8>> {
    let mut e = GzEncoder::new(Vec::new(), Compression::default());
    e.write_all(text.as_bytes()).map_err(ProxyError::Compression)?;
    e.finish().map_err(ProxyError::Compression)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_text_decodes_back() {
        let text = "<p>Привет, banana™</p>\n";
        assert_eq!(decode(&encode(text).unwrap()).unwrap(), text);
    }

    #[test]
    fn concatenated_members_are_joined() {
        let mut packed = encode("<p>one</p>").unwrap();
        packed.extend(encode("<p>two</p>").unwrap());
        assert_eq!(decode(&packed).unwrap(), "<p>one</p><p>two</p>");
    }

    #[test]
    fn bad_magic_is_compression_error() {
        let err = decode(b"<html>not gzip</html>").unwrap_err();
        assert!(matches!(err, ProxyError::Compression(_)));
    }

    #[test]
    fn non_utf8_body_is_compression_error() {
        let mut e = GzEncoder::new(Vec::new(), Compression::default());
        e.write_all(&[0xff, 0xfe, 0x00]).unwrap();
        let packed = e.finish().unwrap();

        assert!(matches!(decode(&packed), Err(ProxyError::Compression(_))));
    }
}
