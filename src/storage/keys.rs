//! Key-space layout
//!
//! ```text
//! space                       kekspace record
//! d/<id>                      document bodies
//! r/<id>                      revision chains
//! f/<field>/<value>/<id>      index markers (empty payload)
//! ```
//!
//! The three document key-spaces never share a prefix. Every segment that
//! comes from user data is escaped with [`encode_segment`] so it cannot
//! contain `/`, be empty, or be `.`/`..`.

use sha2::{Digest, Sha256};

/// Kekspace record key
pub const SPACE_KEY: &str = "space";
/// Document bodies
pub const DOCUMENTS_PREFIX: &str = "d";
/// Revision chains
pub const CHAINS_PREFIX: &str = "r";
/// Attribute index markers
pub const FIELDS_PREFIX: &str = "f";

/// Longest escaped segment stored verbatim. Longer ones are replaced by a
/// digest so every segment fits a filesystem name.
pub const MAX_SEGMENT_LEN: usize = 200;

/// Prefix of digested segments. Escaping never emits `%h`.
const DIGEST_PREFIX: &str = "%h";

/// Escape one key segment. Segments longer than [`MAX_SEGMENT_LEN`] once
/// escaped become `%h<sha256 hex>`; those do not decode.
pub fn encode_segment(raw: &str) -> String {
    let escaped = escape_segment(raw);
    if escaped.len() <= MAX_SEGMENT_LEN {
        return escaped;
    }
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{}{:x}", DIGEST_PREFIX, hasher.finalize())
}

fn escape_segment(raw: &str) -> String {
    if raw.is_empty() {
        return "%".to_string();
    }
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            c => out.push(c),
        }
    }
    match out.as_str() {
        "." => "%2E".to_string(),
        ".." => "%2E%2E".to_string(),
        _ => out,
    }
}

/// Reverse [`encode_segment`]. Unknown escapes, digests included, pass
/// through untouched.
pub fn decode_segment(encoded: &str) -> String {
    if encoded == "%" {
        return String::new();
    }
    let mut out = String::with_capacity(encoded.len());
    let mut rest = encoded;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let escape = rest.get(pos..pos + 3);
        match escape {
            Some("%25") => out.push('%'),
            Some("%2F") => out.push('/'),
            Some("%2E") => out.push('.'),
            _ => {
                out.push('%');
                rest = &rest[pos + 1..];
                continue;
            }
        }
        rest = &rest[pos + 3..];
    }
    out.push_str(rest);
    out
}

/// Key of a document body
pub fn document_key(id: &str) -> String {
    format!("{}/{}", DOCUMENTS_PREFIX, encode_segment(id))
}

/// Key of a document's revision chain
pub fn chain_key(id: &str) -> String {
    format!("{}/{}", CHAINS_PREFIX, encode_segment(id))
}

/// Directory holding every indexed value of a field
pub fn field_key(field: &str) -> String {
    format!("{}/{}", FIELDS_PREFIX, encode_segment(field))
}

/// Directory holding the posting list of one field/value pair
pub fn posting_key(field: &str, value: &str) -> String {
    format!("{}/{}", field_key(field), encode_segment(value))
}

/// Marker key for one (field, value, document) triple
pub fn marker_key(field: &str, value: &str, id: &str) -> String {
    format!("{}/{}", posting_key(field, value), encode_segment(id))
}

/// Decoded last segment of a key
pub fn last_segment(key: &str) -> String {
    decode_segment(key.rsplit('/').next().unwrap_or(key))
}
