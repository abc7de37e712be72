//! Language type: a language resolved against the registry.

use crate::i18n::LanguageRegistry;

/// A validated language.
///
/// Only constructible from a registry match, so `code` is always one the
/// endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    /// Registry name (e.g., "English")
    name: &'static str,

    /// Endpoint code (e.g., "en")
    code: &'static str,
}

impl Language {
    /// Source-side placeholder that delegates detection to the endpoint.
    pub const AUTO_DETECT: Language = Language {
        name: "Auto-detect",
        code: "auto",
    };

    /// Default target language.
    pub const ENGLISH: Language = Language {
        name: "English",
        code: "en",
    };

    /// Resolve a language from either its name or its code.
    ///
    /// # Returns
    /// * `Some(Language)` if the value names a registry entry or matches its code
    /// * `None` for unknown or empty values
    ///
    /// # Example
    /// ```ignore
    /// assert_eq!(Language::resolve("fr"), Language::resolve(" FRENCH "));
    /// ```
    pub fn resolve(value: &str) -> Option<Language> {
        let registry = LanguageRegistry::google();
        registry
            .find_by_name(value)
            .or_else(|| registry.find_by_code(value))
            .map(|entry| Language {
                name: entry.name,
                code: entry.code,
            })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    /// True for the `Auto-detect` pseudo-language.
    pub fn is_auto_detect(&self) -> bool {
        *self == Language::AUTO_DETECT
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_match_registry() {
        assert_eq!(Language::resolve("English"), Some(Language::ENGLISH));
        assert_eq!(Language::resolve("Auto-detect"), Some(Language::AUTO_DETECT));
    }

    #[test]
    fn test_resolve_by_name_and_code_agree() {
        let by_name = Language::resolve(" french ").expect("Should resolve name");
        let by_code = Language::resolve("FR").expect("Should resolve code");
        assert_eq!(by_name, by_code);
        assert_eq!(by_name.name(), "French");
        assert_eq!(by_name.code(), "fr");
    }

    #[test]
    fn test_resolve_unknown() {
        assert!(Language::resolve("Klingon").is_none());
        assert!(Language::resolve("").is_none());
    }

    #[test]
    fn test_is_auto_detect() {
        assert!(Language::AUTO_DETECT.is_auto_detect());
        assert!(Language::resolve("auto").unwrap().is_auto_detect());
        assert!(!Language::ENGLISH.is_auto_detect());
    }

    #[test]
    fn test_display() {
        assert_eq!(Language::ENGLISH.to_string(), "English (en)");
    }
}
