//! DAP identifier and attribute-string escaping.
//!
//! DAP2 identifiers travel `%xx`-escaped: any byte outside the identifier
//! set is written as a percent sign followed by two hex digits. Attribute
//! string values are double-quoted with backslash escapes.

/// Bytes allowed unescaped in a DAP2 identifier.
fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'!' | b'~' | b'*' | b'\'' | b'-' | b'"' | b'/' | b'.')
}

fn hex_value(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}

/// Decode `%xx` escapes. Malformed escapes are kept verbatim.
pub fn unescape_dap(encoded: &str) -> String {
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Encode every byte outside the identifier set as `%xx`.
pub fn escape_dap(clear: &str) -> String {
    let mut out = String::with_capacity(clear.len());
    for &b in clear.as_bytes() {
        if is_identifier_byte(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

/// Strip the surrounding quotes of a DAS string value and undo backslash escapes.
///
/// Unquoted text is returned unchanged apart from escape removal.
pub fn unquote_attribute(raw: &str) -> String {
    let trimmed = raw.trim();
    let inner = if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
