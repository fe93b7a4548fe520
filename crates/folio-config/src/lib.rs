//! folio-config: HOCON-style configuration for the folio toolkit
//!
//! A self-contained implementation of a HOCON-like configuration language,
//! carrying both library-internal settings (navigation, autonumbering, link
//! validation, e-book metadata) and user-supplied values referenced from
//! markup and templates.
//!
//! The pipeline is pure and side-effect free: text parses into an
//! unresolved tree, the resolver substitutes references and merges adjacent
//! values, and the resulting [`Config`] offers typed, exception-free access
//! with an ordered fallback chain. Loading include resources is delegated
//! to the surrounding IO layer via [`UnresolvedConfig::includes`] and the
//! [`IncludeMap`] handed to resolution.
//!
//! # Example
//!
//! ```rust
//! use folio_config::Config;
//!
//! let config = Config::parse(r#"
//! folio.navigation.depth = 3
//! paths = [home]
//! paths = ${paths} [about]
//! "#).unwrap();
//!
//! assert_eq!(config.get::<i64>("folio.navigation.depth").unwrap(), 3);
//! assert_eq!(
//!     config.get::<Vec<String>>("paths").unwrap(),
//!     vec!["home".to_string(), "about".to_string()],
//! );
//! ```

pub mod codec;
pub mod error;
pub mod key;
pub mod origin;
pub mod parser;
pub mod resolver;
pub mod value;

mod config;

pub use codec::{ConfigDecodable, ConfigDecoder, ConfigEncodable, DefaultKey, Traced};
pub use config::{Config, ConfigBuilder};
pub use error::{ConfigError, DocumentErrorSet, NonEmpty, ParserFailure, Result};
pub use key::Key;
pub use origin::Origin;
pub use parser::{ConfigParser, IncludeResource, UnresolvedConfig};
pub use resolver::IncludeMap;
pub use value::{ConfigValue, Field, ObjectValue};
