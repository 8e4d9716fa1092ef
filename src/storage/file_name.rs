//! Reversible page-name to file-name encoding.
//!
//! Bytes outside `[A-Za-z0-9_-]` become `%XX`. Encoded names therefore
//! never contain path separators and never start with `.`, which keeps
//! them apart from the temp files of [`write_atomic`](super::write_atomic).

/// Encode a page name into a file name
pub fn encode(page_name: &str) -> String {
    let mut out = String::with_capacity(page_name.len());
    for byte in page_name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

/// Decode a file name produced by [`encode`]
///
/// Returns `None` for names that are not valid encodings.
pub fn decode(file_name: &str) -> Option<String> {
    let bytes = file_name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = file_name.get(i + 1..i + 3)?;
                if !hex.bytes().all(is_upper_hex_digit) {
                    return None;
                }
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 3;
            }
            b if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' => {
                out.push(b);
                i += 1;
            }
            _ => return None,
        }
    }
    String::from_utf8(out).ok()
}

/// Digits [`encode`] emits; lowercase would not map back to the same file
fn is_upper_hex_digit(byte: u8) -> bool {
    byte.is_ascii_digit() || (b'A'..=b'F').contains(&byte)
}
