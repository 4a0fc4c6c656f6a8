//! Case-insensitive multi-valued header map.
//!
//! Keys are stored in canonical MIME form (`content-type` becomes
//! `Content-Type`), so lookups are case-insensitive and iteration follows
//! ascending byte order of the canonical keys. The values of one key keep
//! their insertion order.
//!
//! # Example
//!
//! ```
//! use partstream::header::HeaderMap;
//!
//! let mut header = HeaderMap::new();
//! header.append("x-tag", "b");
//! header.append("X-Tag", "a");
//! header.set("accept", "*/*");
//!
//! let keys: Vec<_> = header.iter().map(|(k, _)| k).collect();
//! assert_eq!(keys, ["Accept", "X-Tag"]);
//! assert_eq!(header.get_all("X-TAG"), ["b", "a"]);
//! ```

use std::borrow::Cow;
use std::collections::btree_map;
use std::collections::BTreeMap;

/// Canonicalize a header key.
///
/// The first letter and every letter following a hyphen are upper-cased, the
/// rest lower-cased. Keys containing a space or a byte that is not a valid
/// header token are returned unchanged.
pub fn canonical_key(key: &str) -> Cow<'_, str> {
    let bytes = key.as_bytes();
    if bytes.iter().any(|&b| !is_header_key_byte(b)) {
        return Cow::Borrowed(key);
    }

    let mut upper = true;
    let already_canonical = bytes.iter().all(|&b| {
        let ok = if upper {
            !b.is_ascii_lowercase()
        } else {
            !b.is_ascii_uppercase()
        };
        upper = b == b'-';
        ok
    });
    if already_canonical {
        return Cow::Borrowed(key);
    }

    let mut out = String::with_capacity(key.len());
    let mut upper = true;
    for c in key.chars() {
        if upper {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c.to_ascii_lowercase());
        }
        upper = c == '-';
    }
    Cow::Owned(out)
}

fn is_header_key_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// Header storage for a single part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: BTreeMap<String, Vec<String>>,
}

impl HeaderMap {
    /// Create an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// First value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(canonical_key(key).as_ref())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values for `key` in insertion order (empty if absent).
    pub fn get_all(&self, key: &str) -> &[String] {
        self.entries
            .get(canonical_key(key).as_ref())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Replace all values of `key` with `value`.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.entries
            .insert(canonical_key(key).into_owned(), vec![value.into()]);
    }

    /// Append `value` after the existing values of `key`.
    pub fn append(&mut self, key: &str, value: impl Into<String>) {
        self.entries
            .entry(canonical_key(key).into_owned())
            .or_default()
            .push(value.into());
    }

    /// Replace all values of `key` with `values`.
    ///
    /// An empty `values` list removes the key.
    pub fn set_all(&mut self, key: &str, values: Vec<String>) {
        let key = canonical_key(key).into_owned();
        if values.is_empty() {
            self.entries.remove(&key);
        } else {
            self.entries.insert(key, values);
        }
    }

    /// Remove `key`, returning its values.
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.entries.remove(canonical_key(key).as_ref())
    }

    /// Check whether `key` has at least one value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(canonical_key(key).as_ref())
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map has no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate keys in ascending order with their values.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.entries.iter(),
        }
    }

    /// Total number of header lines this map renders to.
    pub fn line_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

/// Iterator over `(key, values)` pairs in ascending key order.
pub struct Iter<'a> {
    inner: btree_map::Iter<'a, String, Vec<String>>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a [String]);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl<'a> IntoIterator for &'a HeaderMap {
    type Item = (&'a str, &'a [String]);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for HeaderMap
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = HeaderMap::new();
        map.extend(iter);
        map
    }
}

impl<K, V> Extend<(K, V)> for HeaderMap
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.append(k.as_ref(), v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_key() {
        assert_eq!(canonical_key("content-type"), "Content-Type");
        assert_eq!(canonical_key("CONTENT-DISPOSITION"), "Content-Disposition");
        assert_eq!(canonical_key("x-custom-header"), "X-Custom-Header");
        assert_eq!(canonical_key("A"), "A");
        assert_eq!(canonical_key("z"), "Z");
    }

    #[test]
    fn test_canonical_key_keeps_invalid_keys_verbatim() {
        assert_eq!(canonical_key("bad key"), "bad key");
        assert_eq!(canonical_key("weird:key"), "weird:key");
    }

    #[test]
    fn test_canonical_key_borrows_when_unchanged() {
        assert!(matches!(canonical_key("Content-Type"), Cow::Borrowed(_)));
        assert!(matches!(canonical_key("content-type"), Cow::Owned(_)));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut header = HeaderMap::new();
        header.set("content-type", "text/plain");

        assert_eq!(header.get("Content-Type"), Some("text/plain"));
        assert_eq!(header.get("CONTENT-TYPE"), Some("text/plain"));
        assert!(header.contains_key("content-TYPE"));
        assert_eq!(header.len(), 1);
    }

    #[test]
    fn test_append_preserves_insertion_order() {
        let mut header = HeaderMap::new();
        header.append("B", "5");
        header.append("b", "7");
        header.append("B", "6");

        assert_eq!(header.get_all("B"), ["5", "7", "6"]);
        assert_eq!(header.get("B"), Some("5"));
        assert_eq!(header.line_count(), 3);
    }

    #[test]
    fn test_set_replaces_all_values() {
        let mut header = HeaderMap::new();
        header.append("X", "1");
        header.append("X", "2");
        header.set("x", "3");

        assert_eq!(header.get_all("X"), ["3"]);
    }

    #[test]
    fn test_iteration_is_sorted() {
        let header: HeaderMap = [("Z", "1"), ("a", "2"), ("M", "3"), ("C", "4")]
            .into_iter()
            .collect();

        let keys: Vec<_> = header.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["A", "C", "M", "Z"]);
    }

    #[test]
    fn test_set_all_empty_removes() {
        let mut header = HeaderMap::new();
        header.set("X", "1");
        header.set_all("x", Vec::new());
        assert!(header.is_empty());
    }

    #[test]
    fn test_get_all_missing_is_empty() {
        let header = HeaderMap::new();
        assert!(header.get_all("Nope").is_empty());
        assert_eq!(header.get("Nope"), None);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut header = HeaderMap::new();
        header.set("A", "1");
        header.set("B", "2");

        assert_eq!(header.remove("a"), Some(vec!["1".to_string()]));
        assert!(!header.contains_key("A"));

        header.clear();
        assert!(header.is_empty());
    }
}
