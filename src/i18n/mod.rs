//! Language lookup for the translation endpoint.
//!
//! # Architecture
//!
//! - `registry`: the fixed name/code table, validated at construction
//! - `language`: `Language`, a `Copy` handle resolved from a name or a code
//!
//! # Example
//!
//! ```rust,ignore
//! use smart_translator::i18n::{Language, LanguageRegistry};
//!
//! let registry = LanguageRegistry::google();
//! assert_eq!(registry.code_for_language("Polish"), Some("pl"));
//!
//! let french = Language::resolve("fr").unwrap();
//! assert_eq!(french.name(), "French");
//! ```

mod language;
mod registry;

pub use language::Language;
pub use registry::{LanguageEntry, LanguageRegistry, RegistryError};
