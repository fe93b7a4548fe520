//! Typed decoding and encoding of configuration values
//!
//! Conversions are indexed by the static type requested at the call site:
//! a type implements [`ConfigDecodable`] / [`ConfigEncodable`] to take part
//! in `Config::get` and `ConfigBuilder::with_value`, and optionally
//! [`DefaultKey`] to bind itself to a canonical key so callers can omit it.
//! There is no runtime type inspection anywhere; dispatch is purely a
//! function of the type parameter.
//!
//! External modules (document AST, navigation, e-book metadata) register
//! their own types by implementing these traits; the crate itself only
//! provides instances for primitives and standard containers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::key::Key;
use crate::origin::Origin;
use crate::value::{ConfigValue, ObjectValue};

/// A configuration value together with the origin of the document that
/// defined it. Decoders sensitive to provenance (e.g. relative paths)
/// resolve against the origin.
#[derive(Debug, Clone, Copy)]
pub struct Traced<'a> {
    pub value: &'a ConfigValue,
    pub origin: &'a Origin,
}

/// A conversion from an origin-tagged configuration value to `T`.
#[derive(Clone)]
pub struct ConfigDecoder<T> {
    run: Arc<dyn Fn(Traced<'_>) -> Result<T> + Send + Sync>,
}

impl<T: 'static> ConfigDecoder<T> {
    pub fn new(f: impl Fn(Traced<'_>) -> Result<T> + Send + Sync + 'static) -> Self {
        ConfigDecoder { run: Arc::new(f) }
    }

    pub fn decode(&self, traced: Traced<'_>) -> Result<T> {
        (self.run)(traced)
    }

    /// Transform the decoded value.
    pub fn map<U: 'static>(self, f: impl Fn(T) -> U + Send + Sync + 'static) -> ConfigDecoder<U> {
        ConfigDecoder::new(move |traced: Traced<'_>| self.decode(traced).map(&f))
    }

    /// Chain a fallible transformation, e.g. semantic validation of an
    /// enum-like string.
    pub fn and_then<U: 'static>(
        self,
        f: impl Fn(T) -> Result<U> + Send + Sync + 'static,
    ) -> ConfigDecoder<U> {
        ConfigDecoder::new(move |traced: Traced<'_>| self.decode(traced).and_then(&f))
    }

    /// A decoder for homogeneous arrays, applying `element` to each item.
    pub fn seq(element: ConfigDecoder<T>) -> ConfigDecoder<Vec<T>> {
        ConfigDecoder::new(move |traced: Traced<'_>| match traced.value {
            ConfigValue::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    element
                        .decode(Traced {
                            value: item,
                            origin: traced.origin,
                        })
                        .map_err(|e| e.retag(&Key::from_segments([index.to_string()])))
                })
                .collect(),
            other => Err(ConfigError::invalid_type("array", other.type_name())),
        })
    }

    /// Decode a whole object by projecting its fields through a temporary
    /// config wrapping it. The object's origin is preserved, and errors of
    /// the projections carry the sub-keys they occurred under.
    pub fn for_object(f: impl Fn(&Config) -> Result<T> + Send + Sync + 'static) -> ConfigDecoder<T> {
        ConfigDecoder::new(move |traced: Traced<'_>| match traced.value {
            ConfigValue::Object(obj) => {
                let config = Config::new(obj.clone(), traced.origin.clone());
                f(&config)
            }
            other => Err(ConfigError::invalid_type("object", other.type_name())),
        })
    }
}

/// Types that decode from a configuration value.
pub trait ConfigDecodable: Sized + 'static {
    fn decoder() -> ConfigDecoder<Self>;
}

/// Types that encode into a configuration value.
pub trait ConfigEncodable {
    fn encode(&self) -> ConfigValue;
}

/// Binds a type to its canonical configuration key, enabling keyless
/// lookups via `Config::get_default`.
pub trait DefaultKey {
    fn default_key() -> Key;
}

impl ConfigDecodable for String {
    fn decoder() -> ConfigDecoder<String> {
        ConfigDecoder::new(|traced: Traced<'_>| match traced.value {
            ConfigValue::String(s) => Ok(s.clone()),
            ConfigValue::Long(n) => Ok(n.to_string()),
            ConfigValue::Double(n) => Ok(n.to_string()),
            ConfigValue::Boolean(b) => Ok(b.to_string()),
            other => Err(ConfigError::invalid_type("string", other.type_name())),
        })
    }
}

impl ConfigDecodable for i64 {
    fn decoder() -> ConfigDecoder<i64> {
        ConfigDecoder::new(|traced: Traced<'_>| match traced.value {
            ConfigValue::Long(n) => Ok(*n),
            ConfigValue::String(s) => s
                .parse()
                .map_err(|_| ConfigError::invalid_type("long", format!("string (\"{}\")", s))),
            other => Err(ConfigError::invalid_type("long", other.type_name())),
        })
    }
}

impl ConfigDecodable for f64 {
    fn decoder() -> ConfigDecoder<f64> {
        ConfigDecoder::new(|traced: Traced<'_>| match traced.value {
            ConfigValue::Double(n) => Ok(*n),
            ConfigValue::Long(n) => Ok(*n as f64),
            ConfigValue::String(s) => s
                .parse()
                .map_err(|_| ConfigError::invalid_type("double", format!("string (\"{}\")", s))),
            other => Err(ConfigError::invalid_type("double", other.type_name())),
        })
    }
}

impl ConfigDecodable for bool {
    fn decoder() -> ConfigDecoder<bool> {
        ConfigDecoder::new(|traced: Traced<'_>| match traced.value {
            ConfigValue::Boolean(b) => Ok(*b),
            ConfigValue::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            ConfigValue::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            ConfigValue::String(s) => Err(ConfigError::invalid_type(
                "boolean",
                format!("string (\"{}\")", s),
            )),
            other => Err(ConfigError::invalid_type("boolean", other.type_name())),
        })
    }
}

impl ConfigDecodable for ConfigValue {
    fn decoder() -> ConfigDecoder<ConfigValue> {
        ConfigDecoder::new(|traced: Traced<'_>| Ok(traced.value.clone()))
    }
}

impl ConfigDecodable for ObjectValue {
    fn decoder() -> ConfigDecoder<ObjectValue> {
        ConfigDecoder::new(|traced: Traced<'_>| match traced.value {
            ConfigValue::Object(obj) => Ok(obj.clone()),
            other => Err(ConfigError::invalid_type("object", other.type_name())),
        })
    }
}

impl ConfigDecodable for Config {
    fn decoder() -> ConfigDecoder<Config> {
        ConfigDecoder::for_object(|config| Ok(config.clone()))
    }
}

impl<T: ConfigDecodable> ConfigDecodable for Vec<T> {
    fn decoder() -> ConfigDecoder<Vec<T>> {
        ConfigDecoder::seq(T::decoder())
    }
}

impl ConfigDecodable for Key {
    fn decoder() -> ConfigDecoder<Key> {
        String::decoder().map(|s| Key::parse(&s))
    }
}

impl ConfigDecodable for PathBuf {
    fn decoder() -> ConfigDecoder<PathBuf> {
        ConfigDecoder::new(|traced: Traced<'_>| match traced.value {
            ConfigValue::String(s) => {
                if s.starts_with('/') {
                    Ok(PathBuf::from(s))
                } else {
                    // relative paths anchor at the document that defined
                    // the value, not the document that inherited it
                    match traced.origin.parent_dir() {
                        Some(dir) => Ok(Path::new(dir).join(s)),
                        None => Ok(PathBuf::from(s)),
                    }
                }
            }
            other => Err(ConfigError::invalid_type("string", other.type_name())),
        })
    }
}

impl ConfigEncodable for String {
    fn encode(&self) -> ConfigValue {
        ConfigValue::String(self.clone())
    }
}

impl ConfigEncodable for &str {
    fn encode(&self) -> ConfigValue {
        ConfigValue::String((*self).to_string())
    }
}

impl ConfigEncodable for i64 {
    fn encode(&self) -> ConfigValue {
        ConfigValue::Long(*self)
    }
}

impl ConfigEncodable for i32 {
    fn encode(&self) -> ConfigValue {
        ConfigValue::Long(*self as i64)
    }
}

impl ConfigEncodable for f64 {
    fn encode(&self) -> ConfigValue {
        ConfigValue::Double(*self)
    }
}

impl ConfigEncodable for bool {
    fn encode(&self) -> ConfigValue {
        ConfigValue::Boolean(*self)
    }
}

impl ConfigEncodable for ConfigValue {
    fn encode(&self) -> ConfigValue {
        self.clone()
    }
}

impl ConfigEncodable for ObjectValue {
    fn encode(&self) -> ConfigValue {
        ConfigValue::Object(self.clone())
    }
}

impl<T: ConfigEncodable> ConfigEncodable for Vec<T> {
    fn encode(&self) -> ConfigValue {
        ConfigValue::Array(self.iter().map(|item| item.encode()).collect())
    }
}

impl ConfigEncodable for PathBuf {
    fn encode(&self) -> ConfigValue {
        ConfigValue::String(self.to_string_lossy().into_owned())
    }
}

impl ConfigEncodable for Key {
    fn encode(&self) -> ConfigValue {
        ConfigValue::String(self.segments().join("."))
    }
}
