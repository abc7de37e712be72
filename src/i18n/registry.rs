//! Language registry: the fixed table of languages the translation endpoint accepts.
//!
//! The built-in table is validated and built once on first access through
//! `OnceLock`. Lookups compare trimmed, case-insensitive strings and never
//! match partially.

use serde::Serialize;
use std::sync::OnceLock;
use thiserror::Error;

/// One row of the registry: a human-readable name and its endpoint code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LanguageEntry {
    /// English name of the language (e.g., "English", "Chinese Simplified")
    pub name: &'static str,

    /// ISO 639-1-like code understood by the endpoint (e.g., "en", "zh-cn")
    pub code: &'static str,
}

/// Errors raised while building a registry from a table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("language table is empty")]
    Empty,

    #[error("duplicate language name '{0}'")]
    DuplicateName(String),

    #[error("duplicate language code '{0}'")]
    DuplicateCode(String),
}

/// Bidirectional name/code lookup table.
#[derive(Debug)]
pub struct LanguageRegistry {
    entries: Vec<LanguageEntry>,
}

static GOOGLE: OnceLock<LanguageRegistry> = OnceLock::new();

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

impl LanguageRegistry {
    /// Build a registry, rejecting tables with duplicate names or codes.
    ///
    /// Names and codes are compared trimmed and case-insensitively, the same
    /// way lookups compare them.
    pub fn new(entries: Vec<LanguageEntry>) -> Result<Self, RegistryError> {
        if entries.is_empty() {
            return Err(RegistryError::Empty);
        }

        for (i, entry) in entries.iter().enumerate() {
            let name = normalize(entry.name);
            let code = normalize(entry.code);
            for earlier in &entries[..i] {
                if normalize(earlier.name) == name {
                    return Err(RegistryError::DuplicateName(entry.name.to_string()));
                }
                if normalize(earlier.code) == code {
                    return Err(RegistryError::DuplicateCode(entry.code.to_string()));
                }
            }
        }

        Ok(Self { entries })
    }

    /// Get the built-in registry of languages supported by Google Translate.
    ///
    /// # Panics
    /// Panics on first access if the built-in table contains duplicates.
    pub fn google() -> &'static LanguageRegistry {
        GOOGLE.get_or_init(|| {
            LanguageRegistry::new(google_languages())
                .expect("built-in language table must not contain duplicates")
        })
    }

    /// Find the entry whose name matches `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&LanguageEntry> {
        let name = normalize(name);
        if name.is_empty() {
            return None;
        }
        self.entries.iter().find(|entry| normalize(entry.name) == name)
    }

    /// Find the entry whose code matches `code`.
    pub fn find_by_code(&self, code: &str) -> Option<&LanguageEntry> {
        let code = normalize(code);
        if code.is_empty() {
            return None;
        }
        self.entries.iter().find(|entry| normalize(entry.code) == code)
    }

    /// Code for a language name, e.g. `"french"` -> `Some("fr")`.
    pub fn code_for_language(&self, name: &str) -> Option<&'static str> {
        self.find_by_name(name).map(|entry| entry.code)
    }

    /// Language name for a code, e.g. `"FR"` -> `Some("French")`.
    pub fn language_for_code(&self, code: &str) -> Option<&'static str> {
        self.find_by_code(code).map(|entry| entry.name)
    }

    /// True if `value` is a known language name or a known code.
    pub fn is_supported(&self, value: &str) -> bool {
        self.find_by_name(value).is_some() || self.find_by_code(value).is_some()
    }

    /// All entries in table order.
    pub fn entries(&self) -> &[LanguageEntry] {
        &self.entries
    }
}

macro_rules! languages {
    ($($name:literal => $code:literal),* $(,)?) => {
        vec![$(LanguageEntry { name: $name, code: $code }),*]
    };
}

/// Languages accepted by translate.googleapis.com.
fn google_languages() -> Vec<LanguageEntry> {
    languages![
        "Auto-detect" => "auto",
        "Afrikaans" => "af",
        "Albanian" => "sq",
        "Amharic" => "am",
        "Arabic" => "ar",
        "Armenian" => "hy",
        "Azerbaijani" => "az",
        "Basque" => "eu",
        "Belarusian" => "be",
        "Bengali" => "bn",
        "Bosnian" => "bs",
        "Bulgarian" => "bg",
        "Catalan" => "ca",
        "Cebuano" => "ceb",
        "Chichewa" => "ny",
        "Chinese Simplified" => "zh-cn",
        "Chinese Traditional" => "zh-tw",
        "Corsican" => "co",
        "Croatian" => "hr",
        "Czech" => "cs",
        "Danish" => "da",
        "Dutch" => "nl",
        "English" => "en",
        "Esperanto" => "eo",
        "Estonian" => "et",
        "Filipino" => "tl",
        "Finnish" => "fi",
        "French" => "fr",
        "Frisian" => "fy",
        "Galician" => "gl",
        "Georgian" => "ka",
        "German" => "de",
        "Greek" => "el",
        "Gujarati" => "gu",
        "Haitian Creole" => "ht",
        "Hausa" => "ha",
        "Hawaiian" => "haw",
        "Hebrew" => "iw",
        "Hindi" => "hi",
        "Hmong" => "hmn",
        "Hungarian" => "hu",
        "Icelandic" => "is",
        "Igbo" => "ig",
        "Indonesian" => "id",
        "Irish" => "ga",
        "Italian" => "it",
        "Japanese" => "ja",
        "Javanese" => "jw",
        "Kannada" => "kn",
        "Kazakh" => "kk",
        "Khmer" => "km",
        "Korean" => "ko",
        "Kurdish (Kurmanji)" => "ku",
        "Kyrgyz" => "ky",
        "Lao" => "lo",
        "Latin" => "la",
        "Latvian" => "lv",
        "Lithuanian" => "lt",
        "Luxembourgish" => "lb",
        "Macedonian" => "mk",
        "Malagasy" => "mg",
        "Malay" => "ms",
        "Malayalam" => "ml",
        "Maltese" => "mt",
        "Maori" => "mi",
        "Marathi" => "mr",
        "Mongolian" => "mn",
        "Myanmar (Burmese)" => "my",
        "Nepali" => "ne",
        "Norwegian" => "no",
        "Pashto" => "ps",
        "Persian" => "fa",
        "Polish" => "pl",
        "Portuguese" => "pt",
        "Punjabi" => "pa",
        "Romanian" => "ro",
        "Russian" => "ru",
        "Samoan" => "sm",
        "Scots Gaelic" => "gd",
        "Serbian" => "sr",
        "Sesotho" => "st",
        "Shona" => "sn",
        "Sindhi" => "sd",
        "Sinhala" => "si",
        "Slovak" => "sk",
        "Slovenian" => "sl",
        "Somali" => "so",
        "Spanish" => "es",
        "Sundanese" => "su",
        "Swahili" => "sw",
        "Swedish" => "sv",
        "Tajik" => "tg",
        "Tamil" => "ta",
        "Telugu" => "te",
        "Thai" => "th",
        "Turkish" => "tr",
        "Ukrainian" => "uk",
        "Urdu" => "ur",
        "Uzbek" => "uz",
        "Vietnamese" => "vi",
        "Welsh" => "cy",
        "Xhosa" => "xh",
        "Yiddish" => "yi",
        "Yoruba" => "yo",
        "Zulu" => "zu",
    ]
}
