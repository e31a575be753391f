//! URL percent-encoding for emitted links.
//!
//! Two ASCII sets drive the encoding: the path-segment set keeps RFC 3986
//! `pchar` characters literal, the query set additionally escapes the
//! characters that would be read as query-string structure (`&`, `=`,
//! `+`). Everything outside a safe set, including all non-ASCII bytes,
//! is percent-encoded in uppercase hex.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Bytes escaped inside one path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'\\')
    .add(b'^')
    .add(b'|')
    .add(b'[')
    .add(b']');

/// Bytes escaped inside a query key or value.
const QUERY_COMPONENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'\\')
    .add(b'^')
    .add(b'|')
    .add(b'[')
    .add(b']')
    .add(b'&')
    .add(b'=')
    .add(b'+');

/// Percent-encodes `text` for use as one path segment.
pub fn encode_path_segment(text: &str) -> String {
    utf8_percent_encode(text, PATH_SEGMENT).to_string()
}

/// Percent-encodes `text` for use as a query key or value.
pub fn encode_query_component(text: &str) -> String {
    utf8_percent_encode(text, QUERY_COMPONENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(encode_path_segment("Home"), "Home");
        assert_eq!(encode_query_component("Index"), "Index");
    }

    #[test]
    fn test_reserved_bytes_use_uppercase_hex() {
        assert_eq!(
            encode_query_component("name with %special #characters"),
            "name%20with%20%25special%20%23characters"
        );
    }

    #[test]
    fn test_path_segment_escapes_slash() {
        assert_eq!(encode_path_segment("a/b"), "a%2Fb");
    }

    #[test]
    fn test_query_escapes_structure_characters() {
        assert_eq!(encode_query_component("a&b=c+d"), "a%26b%3Dc%2Bd");
    }

    #[test]
    fn test_path_keeps_sub_delims() {
        assert_eq!(encode_path_segment("a:b@c,d"), "a:b@c,d");
        assert_eq!(encode_path_segment("it's"), "it's");
    }

    #[test]
    fn test_non_ascii_is_encoded() {
        assert_eq!(encode_path_segment("café"), "caf%C3%A9");
    }
}
