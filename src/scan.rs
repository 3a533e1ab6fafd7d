//! Line-level Ada scanner.
//!
//! Mutation rules only ever look at code. Comments, string literals and
//! character literals are blanked out before a rule runs, keeping byte
//! offsets identical so an edit found on the masked line can be spliced
//! straight into the original one.

/// Placeholder for non-code bytes. Matches neither `\s` nor `\w`.
pub const BLANK: char = '\0';

/// Return a copy of `line` with the same byte length where comments, string
/// literals and character literals are replaced by [`BLANK`].
pub fn mask(line: &str) -> String {
    let bytes = line.as_bytes();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                blank(&mut out, bytes.len() - i);
                break;
            }
            b'"' => {
                let end = string_end(bytes, i);
                blank(&mut out, end - i);
                i = end;
                continue;
            }
            b'\'' => {
                if let Some(end) = char_literal_end(line, i) {
                    blank(&mut out, end - i);
                    i = end;
                    continue;
                }
            }
            _ => {}
        }
        // `i` always sits on a char boundary: every skip above ends right
        // after an ASCII delimiter.
        let ch = line[i..].chars().next().unwrap_or(BLANK);
        out.push(ch);
        i += ch.len_utf8();
    }

    out
}

/// Split a trailing carriage return off a line.
pub fn split_line_ending(line: &str) -> (&str, &str) {
    match line.strip_suffix('\r') {
        Some(body) => (body, "\r"),
        None => (line, ""),
    }
}

/// Leading whitespace of a line.
pub fn indentation(line: &str) -> &str {
    let trimmed = line.trim_start();
    &line[..line.len() - trimmed.len()]
}

fn blank(out: &mut String, n: usize) {
    out.extend(std::iter::repeat_n(BLANK, n));
}

fn string_end(bytes: &[u8], start: usize) -> usize {
    let mut j = start + 1;
    while j < bytes.len() {
        if bytes[j] == b'"' {
            if bytes.get(j + 1) == Some(&b'"') {
                j += 2;
                continue;
            }
            return j + 1;
        }
        j += 1;
    }
    bytes.len()
}

/// `'x'` is a character literal unless the tick directly follows a name or
/// a closing paren, where it is an attribute tick (`A'First`, `T'(..)`).
fn char_literal_end(line: &str, tick: usize) -> Option<usize> {
    let attached = tick > 0
        && line[..tick]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == ')');
    if attached {
        return None;
    }
    let rest = &line[tick + 1..];
    let ch = rest.chars().next()?;
    let close = tick + 1 + ch.len_utf8();
    (line.as_bytes().get(close) == Some(&b'\'')).then_some(close + 1)
}
