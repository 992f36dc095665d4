//! Textual patches for two known defects in upstream payloads.
//!
//! Both run on the raw text before it reaches `serde_json`, because until
//! patched the payload is not valid JSON and cannot be parsed into a tree.
//!
//! - Login failures sometimes carry the status code as a quoted string
//!   (`"StatusCode": "150"`), which does not decode into an integer.
//! - Extended product searches emit the objects of an array separated by a
//!   bare CRLF with no comma (`}\r\n{`).

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static QUOTED_STATUS_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""StatusCode"\s*:\s*"(-?[0-9]+)""#).expect("Literal is valid regex")
});

const MISSING_COMMA_GAP: &[u8] = b"\r\n{";

/// Unquote the first `"StatusCode"` value that is a quoted integer.
///
/// Later occurrences are left alone.
pub fn unquote_status_code(text: &str) -> Cow<'_, str> {
    QUOTED_STATUS_CODE.replacen(text, 1, r#""StatusCode": ${1}"#)
}

/// Insert a comma after every `}` that is directly followed by CRLF and `{`.
///
/// Covers the whole payload, not just the product array. Braces inside
/// string literals are skipped, which changes nothing for any payload that
/// could decode: a raw CR or LF inside a JSON string is invalid anyway.
pub fn insert_missing_commas(text: &str) -> Cow<'_, str> {
    let bytes = text.as_bytes();
    let mut patched: Option<String> = None;
    let mut copied = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'}' if bytes[i + 1..].starts_with(MISSING_COMMA_GAP) => {
                let out = patched.get_or_insert_with(|| String::with_capacity(text.len() + 64));
                out.push_str(&text[copied..=i]);
                out.push(',');
                copied = i + 1;
            }
            _ => {}
        }
    }

    match patched {
        Some(mut out) => {
            out.push_str(&text[copied..]);
            Cow::Owned(out)
        }
        None => Cow::Borrowed(text),
    }
}
