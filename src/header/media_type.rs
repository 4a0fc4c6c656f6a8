//! Media-type values (`type/subtype; key=value`).
//!
//! Used for `Content-Type`, `Content-Disposition` and the multipart
//! `boundary` parameter. Formatting quotes values that are not tokens and
//! falls back to RFC 2231 extended notation (`key*=utf-8''...`) for non-ASCII
//! values. Parsing lower-cases the type and parameter names, accepts quoted
//! strings, and understands RFC 2231 extended and continued parameters.

use std::collections::BTreeMap;

use crate::error::{MultipartError, Result};

/// Parameters of a media type, keyed by lower-cased name.
pub type MediaParams = BTreeMap<String, String>;

fn is_tspecial(c: char) -> bool {
    "()<>@,;:\\\"/[]?=".contains(c)
}

fn is_token_char(c: char) -> bool {
    c.is_ascii() && c > ' ' && c != '\x7f' && !is_tspecial(c)
}

/// Check whether `s` is a non-empty RFC 2045 token.
pub fn is_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_token_char)
}

fn is_attr_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&b)
}

fn check_media_type(typ: &str) -> bool {
    match typ.split_once('/') {
        Some((major, minor)) => is_token(major) && is_token(minor),
        None => is_token(typ),
    }
}

/// Serialize a media type with parameters.
///
/// Parameters are emitted in ascending name order. Returns `None` when the
/// type or a parameter name is not a valid token.
///
/// # Example
///
/// ```
/// use partstream::header::{format_media_type, MediaParams};
///
/// let mut params = MediaParams::new();
/// params.insert("name".into(), "field".into());
/// params.insert("filename".into(), "my file.txt".into());
///
/// assert_eq!(
///     format_media_type("form-data", &params).unwrap(),
///     r#"form-data; filename="my file.txt"; name=field"#,
/// );
/// ```
pub fn format_media_type(typ: &str, params: &MediaParams) -> Option<String> {
    if !check_media_type(typ) {
        return None;
    }

    let mut out = typ.to_ascii_lowercase();
    for (name, value) in params {
        if !is_token(name) {
            return None;
        }
        out.push_str("; ");
        out.push_str(&name.to_ascii_lowercase());

        if !value.is_ascii() {
            out.push_str("*=utf-8''");
            for &b in value.as_bytes() {
                if is_attr_char(b) {
                    out.push(b as char);
                } else {
                    out.push('%');
                    out.push_str(&format!("{b:02X}"));
                }
            }
            continue;
        }

        out.push('=');
        if is_token(value) {
            out.push_str(value);
            continue;
        }
        out.push('"');
        for c in value.chars() {
            if c == '"' || c == '\\' {
                out.push('\\');
            }
            out.push(c);
        }
        out.push('"');
    }
    Some(out)
}

/// Parse a media type value into its lower-cased type and parameters.
///
/// # Errors
///
/// Returns `MultipartError::MediaType` when the type is not a token, a
/// parameter is malformed, or a parameter appears twice.
pub fn parse_media_type(value: &str) -> Result<(String, MediaParams)> {
    let (base, mut rest) = match value.find(';') {
        Some(i) => (&value[..i], &value[i..]),
        None => (value, ""),
    };
    let typ = base.trim().to_ascii_lowercase();
    if !check_media_type(&typ) {
        return Err(MultipartError::MediaType(format!(
            "invalid media type {typ:?}"
        )));
    }

    let mut params = MediaParams::new();
    // "name*" (extended) and "name*N"/"name*N*" (continuations) are gathered
    // here and folded into plain parameters at the end.
    let mut pieces: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();

    rest = rest.trim_start();
    while !rest.is_empty() {
        let Some((key, val, remaining)) = consume_param(rest) else {
            if rest.trim() == ";" {
                break;
            }
            return Err(MultipartError::MediaType(format!(
                "invalid media parameter in {value:?}"
            )));
        };
        rest = remaining.trim_start();

        let target = match key.split_once('*') {
            Some((base_name, suffix)) => pieces
                .entry(base_name.to_string())
                .or_default()
                .entry(format!("*{suffix}")),
            None => {
                if params.contains_key(&key) {
                    return Err(MultipartError::MediaType(format!(
                        "duplicate parameter {key:?}"
                    )));
                }
                params.insert(key, val);
                continue;
            }
        };
        match target {
            std::collections::btree_map::Entry::Occupied(_) => {
                return Err(MultipartError::MediaType(format!(
                    "duplicate parameter {key:?}"
                )));
            }
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(val);
            }
        }
    }

    for (name, parts) in pieces {
        if let Some(value) = fold_extended(&parts) {
            params.insert(name, value);
        }
    }

    Ok((typ, params))
}

/// Consume `; key=value` from the front of `s`.
fn consume_param(s: &str) -> Option<(String, String, &str)> {
    let s = s.strip_prefix(';')?.trim_start();
    let key_end = s.find(|c: char| !is_token_char(c)).unwrap_or(s.len());
    if key_end == 0 {
        return None;
    }
    let key = s[..key_end].to_ascii_lowercase();
    let s = s[key_end..].trim_start().strip_prefix('=')?.trim_start();
    let (val, rest) = consume_value(s)?;
    Some((key, val, rest))
}

fn consume_value(s: &str) -> Option<(String, &str)> {
    let Some(quoted) = s.strip_prefix('"') else {
        let end = s.find(|c: char| !is_token_char(c)).unwrap_or(s.len());
        if end == 0 {
            return None;
        }
        return Some((s[..end].to_string(), &s[end..]));
    };

    let mut out = String::new();
    let mut chars = quoted.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Some((out, &quoted[i + 1..])),
            '\\' => {
                let (_, escaped) = chars.next()?;
                out.push(escaped);
            }
            '\r' | '\n' => return None,
            c => out.push(c),
        }
    }
    None
}

/// Fold `*`, `*0`, `*0*`, `*1`... pieces of one parameter into its value.
fn fold_extended(parts: &BTreeMap<String, String>) -> Option<String> {
    if let Some(encoded) = parts.get("*") {
        return decode_2231(encoded);
    }

    let mut out = String::new();
    for n in 0.. {
        let plain = parts.get(&format!("*{n}"));
        let encoded = parts.get(&format!("*{n}*"));
        match (plain, encoded) {
            (Some(v), _) => out.push_str(v),
            (None, Some(v)) if n == 0 => out.push_str(&decode_2231(v)?),
            (None, Some(v)) => out.push_str(&percent_decode(v)?),
            (None, None) => break,
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Decode `charset'lang'pct-encoded`.
fn decode_2231(s: &str) -> Option<String> {
    let mut fields = s.splitn(3, '\'');
    let charset = fields.next()?.to_ascii_lowercase();
    let _lang = fields.next()?;
    let encoded = fields.next()?;
    if charset != "utf-8" && charset != "us-ascii" {
        return None;
    }
    percent_decode(encoded)
}

fn percent_decode(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
