//! The part entity.
//!
//! # Example
//!
//! ```
//! use partstream::part::Part;
//!
//! let part = Part::new()
//!     .with_form_name("customfile")
//!     .with_file_name("example.txt")
//!     .with_content_type_by_extension()
//!     .with_header("X-Custom-Header", "value")
//!     .with_content_string("Hello, World!");
//!
//! assert_eq!(
//!     part.header().get("Content-Disposition"),
//!     Some("form-data; filename=example.txt; name=customfile"),
//! );
//! assert_eq!(part.content_type(), Some("text/plain; charset=utf-8"));
//! ```

use std::cell::RefCell;
use std::fmt;
use std::io::{self, Cursor, Read};
use std::path::Path;

use bytes::Bytes;

use super::content::{Content, Prefixed, ReaderContent};
use super::registry::{type_by_extension, TypeRegistry};
use super::sniff::{detect_content_type, SNIFF_LEN};
use super::{FORM_DATA_DISPOSITION, OCTET_STREAM};
use crate::header::{
    format_media_type, parse_media_type, HeaderMap, MediaParams, CONTENT_DISPOSITION,
    CONTENT_TYPE,
};

/// Parsed `Content-Disposition`, remembered together with the raw value it
/// came from.
#[derive(Debug, Clone, Default)]
struct Disposition {
    raw: String,
    kind: String,
    params: MediaParams,
}

impl Disposition {
    fn parse(raw: &str) -> Self {
        match parse_media_type(raw) {
            Ok((kind, params)) => Self {
                raw: raw.to_string(),
                kind,
                params,
            },
            Err(e) => {
                tracing::trace!("Unparseable Content-Disposition {:?}: {}", raw, e);
                Self {
                    raw: raw.to_string(),
                    ..Self::default()
                }
            }
        }
    }
}

/// One part of a multipart message: headers plus a content stream.
///
/// The content is read at most once per encoding pass. Header keys are
/// case-insensitive and rendered in ascending order.
#[derive(Default)]
pub struct Part {
    header: HeaderMap,
    content: Option<Box<dyn Content>>,
    disposition: RefCell<Option<Disposition>>,
}

impl Part {
    /// Create an empty part.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a part from existing headers and content.
    pub fn from_parts(header: HeaderMap, content: Option<Box<dyn Content>>) -> Self {
        Self {
            header,
            content,
            disposition: RefCell::new(None),
        }
    }

    /// Part headers.
    #[inline]
    pub fn header(&self) -> &HeaderMap {
        &self.header
    }

    /// Mutable part headers.
    ///
    /// Changes to `Content-Disposition` made here are picked up by the next
    /// [`form_name`](Self::form_name) / [`file_name`](Self::file_name) call.
    #[inline]
    pub fn header_mut(&mut self) -> &mut HeaderMap {
        &mut self.header
    }

    /// Check whether content has been set.
    #[inline]
    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }

    /// Mutable access to the content stream.
    pub fn content_mut(&mut self) -> Option<&mut (dyn Content + 'static)> {
        self.content.as_deref_mut()
    }

    /// Take the content stream out of the part.
    pub fn take_content(&mut self) -> Option<Box<dyn Content>> {
        self.content.take()
    }

    // ------------------------------------------------------------------
    // Content-Disposition
    // ------------------------------------------------------------------

    fn with_disposition<T>(&self, f: impl FnOnce(&Disposition) -> T) -> T {
        let raw = self.header.get(CONTENT_DISPOSITION).unwrap_or("");
        let mut cache = self.disposition.borrow_mut();
        let fresh = matches!(&*cache, Some(d) if d.raw == raw);
        if !fresh {
            *cache = Some(if raw.is_empty() {
                Disposition::default()
            } else {
                Disposition::parse(raw)
            });
        }
        match &*cache {
            Some(d) => f(d),
            None => f(&Disposition::default()),
        }
    }

    /// Returns false if the header could not be rendered and was left as is.
    fn set_disposition_param(&mut self, name: &str, value: &str) -> bool {
        let mut params = self.with_disposition(|d| d.params.clone());
        params.insert(name.to_string(), value.to_string());

        let Some(raw) = format_media_type(FORM_DATA_DISPOSITION, &params) else {
            tracing::warn!("Dropping unformattable disposition parameter {:?}", name);
            return false;
        };
        self.header.set(CONTENT_DISPOSITION, raw.clone());
        *self.disposition.get_mut() = Some(Disposition {
            raw,
            kind: FORM_DATA_DISPOSITION.to_string(),
            params,
        });
        true
    }

    /// Disposition type (lower-cased), e.g. `form-data`.
    pub fn disposition(&self) -> Option<String> {
        self.with_disposition(|d| (!d.kind.is_empty()).then(|| d.kind.clone()))
    }

    /// Raw value of a `Content-Disposition` parameter.
    pub fn disposition_param(&self, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        self.with_disposition(|d| d.params.get(&name).cloned())
    }

    /// The `name` parameter, if the disposition type is `form-data`.
    pub fn form_name(&self) -> Option<String> {
        self.with_disposition(|d| {
            if d.kind != FORM_DATA_DISPOSITION {
                return None;
            }
            d.params.get("name").cloned()
        })
    }

    /// The `filename` parameter reduced to its last path component.
    pub fn file_name(&self) -> Option<String> {
        self.with_disposition(|d| {
            let name = d.params.get("filename")?;
            base_name(name).map(str::to_string)
        })
    }

    /// Set the form field name.
    pub fn set_form_name(&mut self, name: &str) -> &mut Self {
        self.set_disposition_param("name", name);
        self
    }

    /// Set the file name; defaults `Content-Type` to
    /// `application/octet-stream` unless one is already set.
    pub fn set_file_name(&mut self, file_name: &str) -> &mut Self {
        if !self.set_disposition_param("filename", file_name) {
            return self;
        }
        if !self.header.contains_key(CONTENT_TYPE) {
            self.header.set(CONTENT_TYPE, OCTET_STREAM);
        }
        self
    }

    // ------------------------------------------------------------------
    // Content-Type
    // ------------------------------------------------------------------

    /// First `Content-Type` value.
    pub fn content_type(&self) -> Option<&str> {
        self.header.get(CONTENT_TYPE)
    }

    /// Set `Content-Type`.
    pub fn set_content_type(&mut self, content_type: &str) -> &mut Self {
        self.header.set(CONTENT_TYPE, content_type);
        self
    }

    /// Set `Content-Type` from the file name extension using the default
    /// registry. No-op without a file name or a known extension.
    pub fn set_content_type_by_extension(&mut self) -> &mut Self {
        if let Some(typ) = self.extension().and_then(|ext| type_by_extension(&ext)) {
            self.header.set(CONTENT_TYPE, typ);
        }
        self
    }

    /// Like [`set_content_type_by_extension`](Self::set_content_type_by_extension)
    /// with an explicit registry.
    pub fn set_content_type_by_extension_in(&mut self, registry: &TypeRegistry) -> &mut Self {
        let typ = self
            .extension()
            .and_then(|ext| registry.type_by_extension(&ext));
        if let Some(typ) = typ {
            self.header.set(CONTENT_TYPE, typ);
        }
        self
    }

    fn extension(&self) -> Option<String> {
        let file_name = self.file_name()?;
        let ext = Path::new(&file_name).extension()?.to_str()?;
        Some(format!(".{ext}"))
    }

    /// Sniff the leading bytes of the content and set `Content-Type`.
    ///
    /// Up to [`SNIFF_LEN`] bytes are read. They are given back to the
    /// content afterwards, by rewinding it when it supports
    /// [`Content::unread`] or by putting them in front of the remaining
    /// stream otherwise, so nothing is lost from the encoded output. A read
    /// error while peeking is reported by the content's next read. Without
    /// content the part is left unchanged.
    pub fn detect_content_type(&mut self) -> &mut Self {
        let Some(mut content) = self.content.take() else {
            return self;
        };

        let mut peeked = Vec::with_capacity(SNIFF_LEN);
        let error = fill_peek(&mut *content, &mut peeked);
        let typ = detect_content_type(&peeked);

        let content: Box<dyn Content> = match error {
            Some(e) => Box::new(Prefixed::with_error(peeked, e, content)),
            None => match content.unread(peeked.len() as u64) {
                Some(Ok(())) => content,
                Some(Err(e)) => {
                    tracing::debug!("Content rewind failed, re-prepending peeked bytes: {}", e);
                    Box::new(Prefixed::new(peeked, content))
                }
                None => Box::new(Prefixed::new(peeked, content)),
            },
        };
        self.content = Some(content);
        self.header.set(CONTENT_TYPE, typ);
        self
    }

    // ------------------------------------------------------------------
    // Headers
    // ------------------------------------------------------------------

    /// Replace all values of `key`.
    pub fn set_header_value(&mut self, key: &str, value: &str) -> &mut Self {
        self.header.set(key, value);
        self
    }

    /// Append a value to `key`.
    pub fn add_header_value(&mut self, key: &str, value: &str) -> &mut Self {
        self.header.append(key, value);
        self
    }

    /// Copy every key of `other` into this part, replacing existing values.
    pub fn merge_headers(&mut self, other: &HeaderMap) -> &mut Self {
        for (key, values) in other {
            self.header.set_all(key, values.to_vec());
        }
        self
    }

    // ------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------

    /// Set the content stream.
    pub fn set_content<C: Content + 'static>(&mut self, content: C) -> &mut Self {
        self.content = Some(Box::new(content));
        self
    }

    /// Set the content from any reader (no fast-path capabilities).
    pub fn set_content_reader<R: Read + Send + 'static>(&mut self, reader: R) -> &mut Self {
        self.set_content(ReaderContent(reader))
    }

    /// Set in-memory content.
    pub fn set_content_bytes(&mut self, content: impl Into<Bytes>) -> &mut Self {
        self.set_content(Cursor::new(content.into()))
    }

    /// Set in-memory text content.
    pub fn set_content_string(&mut self, content: impl Into<String>) -> &mut Self {
        self.set_content_bytes(Bytes::from(content.into()))
    }

    /// Reset to an empty part for reuse.
    pub fn reset(&mut self) {
        self.header.clear();
        self.content = None;
        *self.disposition.get_mut() = None;
    }

    // ------------------------------------------------------------------
    // Builder-style setters
    // ------------------------------------------------------------------

    /// Builder form of [`set_form_name`](Self::set_form_name).
    pub fn with_form_name(mut self, name: &str) -> Self {
        self.set_form_name(name);
        self
    }

    /// Builder form of [`set_file_name`](Self::set_file_name).
    pub fn with_file_name(mut self, file_name: &str) -> Self {
        self.set_file_name(file_name);
        self
    }

    /// Builder form of [`set_content_type`](Self::set_content_type).
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.set_content_type(content_type);
        self
    }

    /// Builder form of [`set_content_type_by_extension`](Self::set_content_type_by_extension).
    pub fn with_content_type_by_extension(mut self) -> Self {
        self.set_content_type_by_extension();
        self
    }

    /// Builder form of [`detect_content_type`](Self::detect_content_type).
    pub fn with_detected_content_type(mut self) -> Self {
        self.detect_content_type();
        self
    }

    /// Builder form of [`add_header_value`](Self::add_header_value).
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.add_header_value(key, value);
        self
    }

    /// Builder form of [`set_content`](Self::set_content).
    pub fn with_content<C: Content + 'static>(mut self, content: C) -> Self {
        self.set_content(content);
        self
    }

    /// Builder form of [`set_content_reader`](Self::set_content_reader).
    pub fn with_content_reader<R: Read + Send + 'static>(mut self, reader: R) -> Self {
        self.set_content_reader(reader);
        self
    }

    /// Builder form of [`set_content_bytes`](Self::set_content_bytes).
    pub fn with_content_bytes(mut self, content: impl Into<Bytes>) -> Self {
        self.set_content_bytes(content);
        self
    }

    /// Builder form of [`set_content_string`](Self::set_content_string).
    pub fn with_content_string(mut self, content: impl Into<String>) -> Self {
        self.set_content_string(content);
        self
    }
}

impl fmt::Debug for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Part")
            .field("header", &self.header)
            .field("has_content", &self.content.is_some())
            .finish()
    }
}

/// Read up to `SNIFF_LEN` bytes into `peeked`, returning the first hard error.
fn fill_peek(content: &mut dyn Content, peeked: &mut Vec<u8>) -> Option<io::Error> {
    let mut buf = [0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < SNIFF_LEN {
        match content.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                peeked.extend_from_slice(&buf[..filled]);
                return Some(e);
            }
        }
    }
    peeked.extend_from_slice(&buf[..filled]);
    None
}

/// Last path component of a client-supplied file name.
fn base_name(name: &str) -> Option<&str> {
    let trimmed = name.trim_end_matches(['/', '\\']);
    let base = trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(trimmed);
    (!base.is_empty()).then_some(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(part: &mut Part) -> Vec<u8> {
        let mut out = Vec::new();
        if let Some(content) = part.content_mut() {
            content.read_to_end(&mut out).unwrap();
        }
        out
    }

    #[test]
    fn test_name_accessors() {
        let cases = [
            (r#"form-data; name="foo""#, Some("foo"), None),
            (" form-data ; name=foo", Some("foo"), None),
            (r#"FORM-DATA;name="foo""#, Some("foo"), None),
            (r#" FORM-DATA ; name="foo""#, Some("foo"), None),
            (" FORM-DATA ; name=foo", Some("foo"), None),
            (
                r#" FORM-DATA ; filename="foo.txt"; name=foo; baz=quux"#,
                Some("foo"),
                Some("foo.txt"),
            ),
            (
                r#" not-form-data ; filename="bar.txt"; name=foo; baz=quux"#,
                None,
                Some("bar.txt"),
            ),
        ];
        for (i, (raw, form_name, file_name)) in cases.into_iter().enumerate() {
            let mut part = Part::new();
            part.header_mut().set("Content-Disposition", raw);
            assert_eq!(part.form_name().as_deref(), form_name, "case {i}");
            assert_eq!(part.file_name().as_deref(), file_name, "case {i}");
        }
    }

    #[test]
    fn test_disposition_changed_between_calls() {
        let mut part = Part::new();
        part.header_mut()
            .set("Content-Disposition", r#"form-data; name="foo""#);
        assert_eq!(part.form_name().as_deref(), Some("foo"));
        assert_eq!(part.file_name(), None);

        part.header_mut().set(
            "Content-Disposition",
            r#"form-data; name="bar"; filename="baz.txt""#,
        );
        assert_eq!(part.form_name().as_deref(), Some("bar"));
        assert_eq!(part.file_name().as_deref(), Some("baz.txt"));

        part.header_mut().remove("Content-Disposition");
        assert_eq!(part.form_name(), None);
    }

    #[test]
    fn test_unparseable_disposition_has_no_params() {
        let mut part = Part::new();
        part.header_mut().set("Content-Disposition", "form-data; name");
        assert_eq!(part.form_name(), None);
        assert_eq!(part.disposition(), None);
    }

    #[test]
    fn test_setters_build_disposition() {
        let part = Part::new()
            .with_form_name("customfile")
            .with_file_name("example.txt");

        assert_eq!(
            part.header().get("Content-Disposition"),
            Some("form-data; filename=example.txt; name=customfile")
        );
        assert_eq!(part.form_name().as_deref(), Some("customfile"));
        assert_eq!(part.file_name().as_deref(), Some("example.txt"));
        assert_eq!(part.disposition().as_deref(), Some("form-data"));
        assert_eq!(part.content_type(), Some(OCTET_STREAM));
    }

    #[test]
    fn test_file_name_keeps_explicit_content_type() {
        let part = Part::new()
            .with_content_type("text/csv")
            .with_file_name("data.csv");
        assert_eq!(part.content_type(), Some("text/csv"));
    }

    #[test]
    fn test_file_name_quoting_and_base() {
        let part = Part::new()
            .with_form_name("upload")
            .with_file_name("../secret dir/my file.txt");

        assert_eq!(
            part.header().get("Content-Disposition"),
            Some(r#"form-data; filename="../secret dir/my file.txt"; name=upload"#)
        );
        assert_eq!(part.file_name().as_deref(), Some("my file.txt"));
        assert_eq!(
            part.disposition_param("FILENAME").as_deref(),
            Some("../secret dir/my file.txt")
        );
    }

    #[test]
    fn test_content_type_by_extension() {
        let part = Part::new()
            .with_form_name("f")
            .with_file_name("example.txt")
            .with_content_type_by_extension();
        assert_eq!(part.content_type(), Some("text/plain; charset=utf-8"));

        // unknown extension keeps the file default
        let part = Part::new()
            .with_file_name("blob.unknownext")
            .with_content_type_by_extension();
        assert_eq!(part.content_type(), Some(OCTET_STREAM));

        // no file name: no-op
        let part = Part::new().with_content_type_by_extension();
        assert_eq!(part.content_type(), None);
    }

    #[test]
    fn test_unformattable_file_name_leaves_content_type_alone() {
        let raw = "form-data; bad name=x";
        let mut part = Part::new();
        part.header.set(CONTENT_DISPOSITION, raw);
        let mut params = MediaParams::new();
        params.insert("bad name".to_string(), "x".to_string());
        *part.disposition.get_mut() = Some(Disposition {
            raw: raw.to_string(),
            kind: FORM_DATA_DISPOSITION.to_string(),
            params,
        });

        part.set_file_name("report.pdf");
        assert_eq!(part.header().get(CONTENT_DISPOSITION), Some(raw));
        assert_eq!(part.content_type(), None);
        assert_eq!(part.file_name(), None);
    }

    #[test]
    fn test_content_type_by_extension_in_registry() {
        let mut registry = TypeRegistry::new();
        registry.add(".dat", "application/x-dat").unwrap();

        let mut part = Part::new().with_file_name("x.DAT");
        part.set_content_type_by_extension_in(&registry);
        assert_eq!(part.content_type(), Some("application/x-dat"));
    }

    #[test]
    fn test_detect_content_type_rewinds_cursor() {
        let mut part = Part::new()
            .with_content_string("<html><body>test</body></html>")
            .with_detected_content_type();

        assert_eq!(part.content_type(), Some("text/html; charset=utf-8"));
        assert_eq!(read_all(&mut part), b"<html><body>test</body></html>");
    }

    #[test]
    fn test_detect_content_type_prepends_for_plain_reader() {
        let data: Vec<u8> = (0..2000u32).map(|i| (i % 251) as u8).collect();
        let mut part = Part::new()
            .with_content_reader(Cursor::new(data.clone()))
            .with_detected_content_type();

        assert_eq!(part.content_type(), Some(OCTET_STREAM));
        assert_eq!(read_all(&mut part), data);
    }

    #[test]
    fn test_detect_content_type_defers_read_error() {
        struct Flaky(bool);
        impl Read for Flaky {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.0 {
                    return Err(io::Error::new(io::ErrorKind::TimedOut, "slow"));
                }
                self.0 = true;
                buf[..3].copy_from_slice(b"abc");
                Ok(3)
            }
        }

        let mut part = Part::new().with_content_reader(Flaky(false));
        part.detect_content_type();
        assert_eq!(part.content_type(), Some("text/plain; charset=utf-8"));

        let content = part.content_mut().unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(content.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(
            content.read(&mut buf).unwrap_err().kind(),
            io::ErrorKind::TimedOut
        );
    }

    #[test]
    fn test_detect_without_content_is_noop() {
        let mut part = Part::new();
        part.detect_content_type();
        assert_eq!(part.content_type(), None);
        assert!(!part.has_content());
    }

    #[test]
    fn test_header_setters_and_merge() {
        let mut part = Part::new();
        part.set_header_value("x-a", "1")
            .add_header_value("X-A", "2")
            .add_header_value("x-b", "3");
        assert_eq!(part.header().get_all("X-A"), ["1", "2"]);

        let other: HeaderMap = [("x-a", "9"), ("x-c", "7")].into_iter().collect();
        part.merge_headers(&other);
        assert_eq!(part.header().get_all("X-A"), ["9"]);
        assert_eq!(part.header().get("X-B"), Some("3"));
        assert_eq!(part.header().get("X-C"), Some("7"));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut part = Part::new()
            .with_form_name("a")
            .with_content_string("data");
        assert_eq!(part.form_name().as_deref(), Some("a"));

        part.reset();
        assert!(part.header().is_empty());
        assert!(!part.has_content());
        assert_eq!(part.form_name(), None);

        part.set_form_name("b");
        assert_eq!(
            part.header().get("Content-Disposition"),
            Some("form-data; name=b")
        );
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("a/b/c.txt"), Some("c.txt"));
        assert_eq!(base_name(r"C:\dir\file.bin"), Some("file.bin"));
        assert_eq!(base_name("dir/"), Some("dir"));
        assert_eq!(base_name("plain"), Some("plain"));
        assert_eq!(base_name("///"), None);
        assert_eq!(base_name(""), None);
    }

    #[test]
    fn test_part_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Part>();
    }
}
