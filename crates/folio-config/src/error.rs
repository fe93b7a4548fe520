//! Error types for the configuration subsystem
//!
//! A closed taxonomy of tagged errors; every fallible operation in this
//! crate returns one of these instead of panicking or throwing. The
//! rendered messages are safe to surface directly in CLI or log output of
//! the surrounding application.

use thiserror::Error;

use crate::key::Key;

/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// A collection that is non-empty by construction.
///
/// Error aggregates use this so that an "aggregate of zero errors" is
/// unrepresentable. The elements live behind the vector indirection, which
/// also allows aggregates to nest (an error may contain errors).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmpty<T> {
    items: Vec<T>,
}

impl<T> NonEmpty<T> {
    /// A singleton collection.
    pub fn one(item: T) -> Self {
        NonEmpty { items: vec![item] }
    }

    pub fn of(head: T, tail: Vec<T>) -> Self {
        let mut items = vec![head];
        items.extend(tail);
        NonEmpty { items }
    }

    /// Build from a vector, returning `None` when it is empty.
    pub fn from_vec(items: Vec<T>) -> Option<Self> {
        if items.is_empty() {
            return None;
        }
        Some(NonEmpty { items })
    }

    pub fn head(&self) -> &T {
        // the constructors guarantee at least one element
        &self.items[0]
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

/// A single structured syntax failure reported by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[error("[{line}:{column}] {message}")]
pub struct ParserFailure {
    pub message: String,
    /// 1-based line of the offending input position.
    pub line: usize,
    /// 1-based column of the offending input position.
    pub column: usize,
}

/// The errors of a single document, used in tree-wide aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentErrorSet {
    /// Virtual path of the document the errors belong to.
    pub path: String,
    pub errors: NonEmpty<ConfigError>,
}

/// The closed error taxonomy of the configuration subsystem.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A value was present but had the wrong shape for the attempted
    /// conversion.
    #[error("invalid type - expected: {expected}, actual: {actual}")]
    InvalidType {
        expected: &'static str,
        actual: String,
    },

    /// A decoder's own validation failed. The key is filled in (and
    /// re-tagged with the absolute key) as the error propagates outward.
    #[error("{}", render_decoding(.message, .key))]
    Decoding { message: String, key: Option<Key> },

    /// Generic semantic validation failure.
    #[error("{0}")]
    Validation(String),

    /// A single syntax failure from the parser.
    #[error("error parsing configuration: {0}")]
    Parser(ParserFailure),

    /// Several independent syntax failures from one document.
    #[error("{}", render_parser_errors(.0))]
    MultipleParserErrors(NonEmpty<ParserFailure>),

    /// Aggregate of multiple independent processing errors.
    #[error("{}", render_multiple(.0))]
    Multiple(NonEmpty<ConfigError>),

    /// Aggregation of all errors of a single document.
    #[error("{}", render_document_errors(.path, .errors))]
    DocumentErrors {
        path: String,
        errors: NonEmpty<ConfigError>,
    },

    /// Aggregation of the errors of a whole document tree.
    #[error("{}", render_tree_errors(.0))]
    TreeErrors(NonEmpty<DocumentErrorSet>),

    /// An unresolved required substitution or an illegal reference cycle.
    #[error("{0}")]
    ResolverError(String),

    /// An include resource could not be supplied.
    #[error("{0}")]
    ResourceError(String),

    /// A required key was absent through the whole fallback chain.
    #[error("not found: '{0}'")]
    NotFound(Key),
}

impl ConfigError {
    pub fn invalid_type(expected: &'static str, actual: impl Into<String>) -> Self {
        ConfigError::InvalidType {
            expected,
            actual: actual.into(),
        }
    }

    pub fn decoding(message: impl Into<String>) -> Self {
        ConfigError::Decoding {
            message: message.into(),
            key: None,
        }
    }

    pub fn resolver(message: impl Into<String>) -> Self {
        ConfigError::ResolverError(message.into())
    }

    pub fn resource(message: impl Into<String>) -> Self {
        ConfigError::ResourceError(message.into())
    }

    /// Collapse a list of parser failures into the appropriate variant.
    /// Returns `None` for an empty list.
    pub fn from_parser_failures(failures: &[ParserFailure]) -> Option<Self> {
        match failures {
            [] => None,
            [single] => Some(ConfigError::Parser(single.clone())),
            [head, tail @ ..] => Some(ConfigError::MultipleParserErrors(NonEmpty::of(
                head.clone(),
                tail.to_vec(),
            ))),
        }
    }

    /// Prefix a decoding error's relative sub-key with the absolute key it
    /// was requested under. Other variants pass through unchanged.
    pub(crate) fn retag(self, key: &Key) -> Self {
        match self {
            ConfigError::Decoding { message, key: sub } => ConfigError::Decoding {
                message,
                key: Some(match sub {
                    Some(sub) => key.child_key(&sub),
                    None => key.clone(),
                }),
            },
            other => other,
        }
    }
}

fn render_decoding(message: &str, key: &Option<Key>) -> String {
    match key {
        Some(key) => format!("error decoding '{}': {}", key, message),
        None => format!("decoding error: {}", message),
    }
}

fn render_parser_errors(failures: &NonEmpty<ParserFailure>) -> String {
    let rendered: Vec<String> = failures.iter().map(|f| f.to_string()).collect();
    format!(
        "{} errors parsing configuration: {}",
        failures.len(),
        rendered.join(", ")
    )
}

fn render_multiple(errors: &NonEmpty<ConfigError>) -> String {
    let rendered: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    format!(
        "{} configuration errors: {}",
        errors.len(),
        rendered.join("; ")
    )
}

fn render_document_errors(path: &str, errors: &NonEmpty<ConfigError>) -> String {
    let rendered: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    format!(
        "{} errors in configuration of '{}': {}",
        errors.len(),
        path,
        rendered.join("; ")
    )
}

fn render_tree_errors(documents: &NonEmpty<DocumentErrorSet>) -> String {
    let rendered: Vec<String> = documents
        .iter()
        .map(|d| render_document_errors(&d.path, &d.errors))
        .collect();
    format!(
        "errors in {} documents: {}",
        documents.len(),
        rendered.join("; ")
    )
}
