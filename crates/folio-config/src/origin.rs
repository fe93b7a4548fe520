//! Provenance tracking for configuration values
//!
//! Every resolved field carries the origin of the document that defined it,
//! so that relative-path decoding resolves against the defining document
//! rather than the document that happened to inherit the value through a
//! fallback chain.

use std::fmt;

/// The origin of a configuration value: the virtual path of the document
/// that defined it, or none for programmatically constructed values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Origin {
    path: Option<String>,
}

impl Origin {
    /// The default origin for programmatically constructed values.
    pub fn root() -> Self {
        Origin { path: None }
    }

    /// An origin anchored at the given document path.
    pub fn new(path: impl Into<String>) -> Self {
        Origin {
            path: Some(path.into()),
        }
    }

    /// The virtual path of the defining document, if any.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// The directory portion of the defining document's path.
    ///
    /// Relative-path decoders resolve against this directory.
    pub fn parent_dir(&self) -> Option<&str> {
        let path = self.path.as_deref()?;
        match path.rfind('/') {
            Some(0) => Some("/"),
            Some(idx) => Some(&path[..idx]),
            None => None,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}", path),
            None => write!(f, "<programmatic>"),
        }
    }
}
