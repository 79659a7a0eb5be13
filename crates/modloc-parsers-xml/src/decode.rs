//! Byte-to-text decoding of content documents.

use std::borrow::Cow;
use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use modloc_core::ModlocError;
use once_cell::sync::OnceCell;
use regex::bytes::Regex;

fn declaration_re() -> &'static Regex {
    static DECL: OnceCell<Regex> = OnceCell::new();
    DECL.get_or_init(|| {
        Regex::new(r#"^\s*<\?xml[^>]*?encoding\s*=\s*["']([A-Za-z0-9._:-]+)["']"#).unwrap()
    })
}

/// Encoding named in the `<?xml ... encoding="..."?>` declaration, if any.
pub fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(256)];
    declaration_re()
        .captures(head)
        .map(|c| String::from_utf8_lossy(&c[1]).into_owned())
}

/// Decoded document text and the encoding that produced it.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub text: String,
    pub encoding: &'static Encoding,
    pub fallback_used: bool,
}

/// BOM first, then the declared encoding, then UTF-8. When that fails exactly one fallback (the
/// detector's guess) is tried before giving up on the file.
pub fn decode_document(path: &Path, bytes: &[u8]) -> Result<Decoded, ModlocError> {
    let (primary, body) = match Encoding::for_bom(bytes) {
        Some((enc, bom_len)) => (enc, &bytes[bom_len..]),
        None => {
            let declared = declared_encoding(bytes)
                .and_then(|label| Encoding::for_label(label.as_bytes()))
                .unwrap_or(UTF_8);
            (declared, bytes)
        }
    };

    if let Some(text) = strict_decode(primary, body) {
        return Ok(Decoded {
            text: text.into_owned(),
            encoding: primary,
            fallback_used: false,
        });
    }

    let mut detector = EncodingDetector::new();
    detector.feed(body, true);
    let guess = detector.guess(None, true);
    if guess != primary {
        if let Some(text) = strict_decode(guess, body) {
            tracing::warn!(
                event = "encoding_fallback",
                path = %path.display(),
                declared = primary.name(),
                used = guess.name()
            );
            return Ok(Decoded {
                text: text.into_owned(),
                encoding: guess,
                fallback_used: true,
            });
        }
    }

    Err(ModlocError::EncodingMismatch {
        path: path.to_path_buf(),
        declared: primary.name().to_string(),
    })
}

fn strict_decode<'a>(enc: &'static Encoding, body: &'a [u8]) -> Option<Cow<'a, str>> {
    enc.decode_without_bom_handling_and_without_replacement(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_declared_encoding() {
        let bytes = br#"<?xml version="1.0" encoding="windows-1252"?><a/>"#;
        assert_eq!(declared_encoding(bytes).as_deref(), Some("windows-1252"));
        assert_eq!(declared_encoding(b"<a/>"), None);
    }

    #[test]
    fn honours_declared_single_byte_encoding() {
        let mut bytes = br#"<?xml version="1.0" encoding="windows-1252"?><a name=""#.to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(br#""/>"#);
        let d = decode_document(Path::new("x.xml"), &bytes).unwrap();
        assert!(d.text.contains('é'));
        assert!(!d.fallback_used);
    }

    #[test]
    fn bom_wins_and_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("<a name=\"ü\"/>".as_bytes());
        let d = decode_document(Path::new("x.xml"), &bytes).unwrap();
        assert_eq!(d.encoding, UTF_8);
        assert!(d.text.starts_with("<a"));
    }

    #[test]
    fn invalid_utf8_without_declaration_uses_fallback() {
        let mut bytes = b"<a name=\"caf".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b"\"/>");
        let d = decode_document(Path::new("x.xml"), &bytes).unwrap();
        assert!(d.fallback_used);
        assert_ne!(d.encoding, UTF_8);
    }
}
