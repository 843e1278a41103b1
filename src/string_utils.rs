use memchr::{memchr, memchr2};

/// Skip a quoted string starting at position `i` (which must point to `'` or `"`).
/// A backslash escapes the following byte. Returns the position after the closing
/// quote, or the end of input when the string is unterminated.
pub(crate) fn skip_string_literal(bytes: &[u8], i: usize) -> usize {
    let quote = bytes[i];
    let mut j = i + 1;
    while j < bytes.len() {
        if let Some(offset) = memchr2(quote, b'\\', &bytes[j..]) {
            let end = j + offset;
            if bytes[end] == b'\\' && end + 1 < bytes.len() {
                j = end + 2;
                continue;
            }
            if bytes[end] == b'\\' {
                return bytes.len();
            }
            return end + 1;
        } else {
            return bytes.len();
        }
    }
    j
}

/// Skip a quoted string or a `[...]` bracketed region starting at `i`.
/// Brackets do not nest and have no escapes.
pub(crate) fn skip_literal(bytes: &[u8], i: usize) -> usize {
    match bytes[i] {
        b'[' => match memchr(b']', &bytes[i + 1..]) {
            Some(offset) => i + 1 + offset + 1,
            None => bytes.len(),
        },
        _ => skip_string_literal(bytes, i),
    }
}

/// Find the end of the line starting the search at `i` (position of the `\n`,
/// or the end of input).
pub(crate) fn line_end(bytes: &[u8], i: usize) -> usize {
    memchr(b'\n', &bytes[i..]).map_or(bytes.len(), |offset| i + offset)
}
