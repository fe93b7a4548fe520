//! Read and write API for resolved configuration
//!
//! [`Config`] is a read-only view of a resolved object value plus an
//! ordered fallback chain; all derivations are persistent, returning new
//! instances without mutating the original. [`ConfigBuilder`] accumulates
//! programmatically supplied values with path expansion and deep merge.

use crate::codec::{ConfigDecodable, ConfigEncodable, DefaultKey, Traced};
use crate::error::{ConfigError, Result};
use crate::key::Key;
use crate::origin::Origin;
use crate::parser::ConfigParser;
use crate::resolver::IncludeMap;
use crate::value::{merge_objects, ConfigValue, Field, ObjectValue};

/// A fully resolved configuration: one object layer plus a finite, acyclic
/// fallback chain terminating in the empty sentinel.
///
/// Lookups walk the chain head to tail; the one place where a lookup does
/// more than pick the first hit is objects, which merge with object values
/// found for the same key further down the chain.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Config {
    /// The terminal sentinel, answering every lookup with "not found".
    #[default]
    Empty,
    /// One configuration layer and the rest of the fallback chain.
    Object {
        root: ObjectValue,
        origin: Origin,
        fallback: Box<Config>,
    },
}

impl Config {
    /// The empty configuration.
    pub fn empty() -> Self {
        Config::Empty
    }

    /// A configuration wrapping the given object, with no fallback.
    pub fn new(root: ObjectValue, origin: Origin) -> Self {
        Config::Object {
            root,
            origin,
            fallback: Box::new(Config::Empty),
        }
    }

    /// Parse and resolve a configuration document in one step, without
    /// fallback and without include support.
    ///
    /// This is the pure embedding of the parser pipeline: any required
    /// include directive in the document fails resolution with a resource
    /// error, since no loader is available here. Use
    /// [`crate::ConfigParser::parse`] and [`crate::UnresolvedConfig::resolve`]
    /// directly to supply fallbacks and pre-loaded includes.
    pub fn parse(text: &str) -> Result<Config> {
        ConfigParser::parse(text).resolve(Origin::root(), &Config::Empty, &IncludeMap::new())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Config::Empty)
    }

    /// The origin of this configuration layer.
    pub fn origin(&self) -> Origin {
        match self {
            Config::Empty => Origin::root(),
            Config::Object { origin, .. } => origin.clone(),
        }
    }

    /// Check whether a key has a value, locally or in any fallback.
    pub fn has_key(&self, key: impl Into<Key>) -> bool {
        self.lookup(&key.into()).is_some()
    }

    /// Look up the merged value and defining origin for a key across the
    /// whole fallback chain. Numeric segments index into arrays.
    pub(crate) fn lookup(&self, key: &Key) -> Option<(ConfigValue, Origin)> {
        match self {
            Config::Empty => None,
            Config::Object {
                root,
                origin,
                fallback,
            } => {
                let local = if key.is_root() {
                    Some((ConfigValue::Object(root.clone()), origin.clone()))
                } else {
                    let segments = key.segments();
                    root.field(&segments[0])
                        .and_then(|field| lookup_in(&field.value, &segments[1..], &field.origin))
                        .map(|(value, origin)| (value.clone(), origin))
                };
                match local {
                    Some((ConfigValue::Object(local_obj), origin)) => match fallback.lookup(key) {
                        Some((ConfigValue::Object(fallback_obj), _)) => Some((
                            ConfigValue::Object(local_obj.merge_fallback(&fallback_obj)),
                            origin,
                        )),
                        _ => Some((ConfigValue::Object(local_obj), origin)),
                    },
                    Some(local) => Some(local),
                    None => fallback.lookup(key),
                }
            }
        }
    }

    /// Get a required, typed value.
    ///
    /// A key absent through the whole chain yields [`ConfigError::NotFound`];
    /// decode failures are re-tagged with the absolute key.
    pub fn get<T: ConfigDecodable>(&self, key: impl Into<Key>) -> Result<T> {
        let key = key.into();
        match self.lookup(&key) {
            Some((value, origin)) => T::decoder()
                .decode(Traced {
                    value: &value,
                    origin: &origin,
                })
                .map_err(|e| normalize_decode_error(e, &key)),
            None => Err(ConfigError::NotFound(key)),
        }
    }

    /// Get an optional, typed value. Absence becomes `None`; decode
    /// failures still propagate.
    pub fn get_opt<T: ConfigDecodable>(&self, key: impl Into<Key>) -> Result<Option<T>> {
        let key = key.into();
        match self.lookup(&key) {
            Some((value, origin)) => T::decoder()
                .decode(Traced {
                    value: &value,
                    origin: &origin,
                })
                .map(Some)
                .map_err(|e| normalize_decode_error(e, &key)),
            None => Ok(None),
        }
    }

    /// Get a typed value, substituting a default when the key is absent.
    pub fn get_or<T: ConfigDecodable>(&self, key: impl Into<Key>, default: T) -> Result<T> {
        Ok(self.get_opt(key)?.unwrap_or(default))
    }

    /// Get a required value at the type's registered default key.
    pub fn get_default<T: ConfigDecodable + DefaultKey>(&self) -> Result<T> {
        self.get(T::default_key())
    }

    /// Get an optional value at the type's registered default key.
    pub fn get_default_opt<T: ConfigDecodable + DefaultKey>(&self) -> Result<Option<T>> {
        self.get_opt(T::default_key())
    }

    /// Return a new configuration with the given value set, the original
    /// left untouched.
    pub fn with_value<T: ConfigEncodable>(&self, key: impl Into<Key>, value: T) -> Config {
        ConfigBuilder::empty()
            .with_origin(self.origin())
            .with_key_value(key, value.encode())
            .build_with_fallback(self.clone())
    }

    /// Return a new configuration with `other` appended at the end of the
    /// fallback chain. Appending the empty configuration is an identity.
    pub fn with_fallback(&self, other: Config) -> Config {
        if other.is_empty() {
            return self.clone();
        }
        match self {
            Config::Empty => other,
            Config::Object {
                root,
                origin,
                fallback,
            } => Config::Object {
                root: root.clone(),
                origin: origin.clone(),
                fallback: Box::new(fallback.with_fallback(other)),
            },
        }
    }

    /// Return a new configuration with a different origin for the head
    /// layer.
    pub fn with_origin(&self, origin: Origin) -> Config {
        match self {
            Config::Empty => Config::Empty,
            Config::Object { root, fallback, .. } => Config::Object {
                root: root.clone(),
                origin,
                fallback: fallback.clone(),
            },
        }
    }
}

fn lookup_in<'a>(
    value: &'a ConfigValue,
    segments: &[String],
    origin: &Origin,
) -> Option<(&'a ConfigValue, Origin)> {
    if segments.is_empty() {
        return Some((value, origin.clone()));
    }
    match value {
        ConfigValue::Object(obj) => {
            let field = obj.field(&segments[0])?;
            lookup_in(&field.value, &segments[1..], &field.origin)
        }
        ConfigValue::Array(items) => {
            let index: usize = segments[0].parse().ok()?;
            lookup_in(items.get(index)?, &segments[1..], origin)
        }
        _ => None,
    }
}

/// Decode failures carry the most specific key the decoder knew; prefix it
/// with the absolute key of the request. A `NotFound` surfacing from inside
/// a decoder refers to a field of a present object and is therefore a
/// decode failure, not absence of the requested key.
fn normalize_decode_error(error: ConfigError, key: &Key) -> ConfigError {
    match error {
        ConfigError::NotFound(sub) => ConfigError::Decoding {
            message: format!("not found: '{}'", sub),
            key: Some(key.child_key(&sub)),
        },
        other => other.retag(key),
    }
}

/// Accumulates programmatically supplied configuration values.
///
/// Dotted keys expand into nested single-field objects when the value is
/// appended; `build` deep-merges everything into one object, later values
/// winning per leaf.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    fields: Vec<Field>,
    origin: Origin,
    fallback: Config,
}

impl ConfigBuilder {
    pub fn empty() -> Self {
        ConfigBuilder::default()
    }

    /// Set the origin carried by all subsequently appended fields.
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Attach or extend the fallback chain used by [`Self::build`].
    pub fn with_fallback(mut self, fallback: Config) -> Self {
        self.fallback = self.fallback.with_fallback(fallback);
        self
    }

    /// Append a typed value under the given (possibly dotted) key.
    pub fn with_value<T: ConfigEncodable>(self, key: impl Into<Key>, value: T) -> Self {
        let encoded = value.encode();
        self.with_key_value(key, encoded)
    }

    /// Append an already encoded value under the given key. A root key is
    /// accepted for object values, whose fields are appended directly.
    pub fn with_key_value(mut self, key: impl Into<Key>, value: ConfigValue) -> Self {
        let key = key.into();
        match key.segments().split_first() {
            Some((first, rest)) => {
                let mut current = value;
                for segment in rest.iter().rev() {
                    current = ConfigValue::Object(ObjectValue::from_fields(vec![Field::new(
                        segment.clone(),
                        current,
                        self.origin.clone(),
                    )]));
                }
                self.fields
                    .push(Field::new(first.clone(), current, self.origin.clone()));
            }
            None => {
                if let ConfigValue::Object(obj) = value {
                    self.fields.extend(obj.fields);
                }
            }
        }
        self
    }

    /// Build a configuration from the accumulated fields, using the
    /// builder's fallback.
    pub fn build(&self) -> Config {
        self.build_with_fallback(self.fallback.clone())
    }

    /// Build a configuration from the accumulated fields with an explicit
    /// fallback. An empty builder with root origin returns the fallback
    /// unchanged.
    pub fn build_with_fallback(&self, fallback: Config) -> Config {
        if self.fields.is_empty() && self.origin == Origin::root() {
            return fallback;
        }
        let mut root = ObjectValue::empty();
        for field in &self.fields {
            root = merge_objects(&root, &ObjectValue::from_fields(vec![field.clone()]));
        }
        Config::Object {
            root,
            origin: self.origin.clone(),
            fallback: Box::new(fallback),
        }
    }
}
