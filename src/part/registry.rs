//! Extension to media type registry.
//!
//! Built-in lookups are answered by `mime_guess`. Types registered at
//! runtime with [`add_extension_type`] take precedence over it. Explicit
//! [`TypeRegistry`] values can be used instead where global state is not
//! wanted.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::error::{MultipartError, Result};
use crate::header::parse_media_type;

/// Mapping from file extension (with leading dot) to media type.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    /// Runtime registrations, keyed by lowercase extension.
    overrides: HashMap<String, String>,
    /// Fall back to `mime_guess` for unregistered extensions.
    guess: bool,
}

impl TypeRegistry {
    /// Create an empty registry with no built-in types.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry backed by the built-in `mime_guess` table.
    pub fn builtin() -> Self {
        Self {
            overrides: HashMap::new(),
            guess: true,
        }
    }

    /// Register `typ` for `ext` (e.g. `".tar.gz"` is not split; use `".gz"`).
    ///
    /// Extensions are matched case-insensitively.
    ///
    /// # Errors
    ///
    /// `MediaType` if `ext` does not start with a dot or `typ` is not a
    /// valid media type.
    pub fn add(&mut self, ext: &str, typ: &str) -> Result<()> {
        if !ext.starts_with('.') || ext.len() < 2 {
            return Err(MultipartError::MediaType(format!(
                "extension {ext:?} must start with a dot"
            )));
        }
        parse_media_type(typ)?;
        self.overrides.insert(ext.to_ascii_lowercase(), typ.to_string());
        Ok(())
    }

    /// Media type for `ext`, preferring runtime registrations.
    ///
    /// Built-in `text/*` types carry `; charset=utf-8`.
    pub fn type_by_extension(&self, ext: &str) -> Option<String> {
        let lower = ext.to_ascii_lowercase();
        if let Some(typ) = self.overrides.get(&lower) {
            return Some(typ.clone());
        }
        if !self.guess {
            return None;
        }
        let bare = lower.strip_prefix('.')?;
        if bare.is_empty() {
            return None;
        }
        let typ = mime_guess::from_ext(bare).first_raw()?;
        if typ.starts_with("text/") {
            Some(format!("{typ}; charset=utf-8"))
        } else {
            Some(typ.to_string())
        }
    }

    /// Number of runtime registrations.
    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    /// Check if nothing was registered at runtime.
    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

fn default_registry() -> &'static RwLock<TypeRegistry> {
    static DEFAULT: OnceLock<RwLock<TypeRegistry>> = OnceLock::new();
    DEFAULT.get_or_init(|| RwLock::new(TypeRegistry::builtin()))
}

/// Look up `ext` in the default registry.
pub fn type_by_extension(ext: &str) -> Option<String> {
    let registry = default_registry()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    registry.type_by_extension(ext)
}

/// Register `typ` for `ext` in the default registry.
pub fn add_extension_type(ext: &str, typ: &str) -> Result<()> {
    let mut registry = default_registry()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    registry.add(ext, typ)
}
