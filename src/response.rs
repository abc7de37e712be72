//! Normalization of translate.googleapis.com `dj=1` payloads.
//!
//! The payload shape depends on the query (single word vs. sentence, source
//! language), so every section is optional. Each section is decoded on its
//! own into a private typed structure. Malformed elements are skipped, and a
//! missing or malformed section turns into `None` for that field without
//! failing the whole result.

use crate::i18n::{Language, LanguageRegistry};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Grammatical category key, e.g. "noun" or "verb".
pub type PartOfSpeech = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionEntry {
    pub base_form: String,
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynonymEntry {
    pub base_form: String,
    pub synonyms: Vec<String>,
}

/// Normalized translation of one piece of source text.
///
/// `None` fields mean the upstream payload had nothing for them; a failed
/// request is reported as an error instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    pub source_language: String,
    pub source_text: String,
    pub source_text_synonyms: Option<BTreeMap<PartOfSpeech, Vec<SynonymEntry>>>,
    pub source_text_definitions: Option<BTreeMap<PartOfSpeech, Vec<DefinitionEntry>>>,
    pub target_language: String,
    pub target_text: Option<String>,
    pub target_text_synonyms: Option<BTreeMap<PartOfSpeech, SynonymEntry>>,
    /// Confidence of the upstream language detection, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection_confidence: Option<f64>,
}

// Upstream shapes. Only the fields this crate reads are declared.

#[derive(Debug, Deserialize)]
struct RawSentence {
    #[serde(default)]
    trans: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDefinitionGroup {
    pos: String,
    #[serde(default)]
    base_form: String,
    #[serde(default)]
    entry: Vec<RawDefinition>,
}

#[derive(Debug, Deserialize)]
struct RawDefinition {
    #[serde(default)]
    gloss: String,
    #[serde(default)]
    example: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSynsetGroup {
    pos: String,
    #[serde(default)]
    base_form: String,
    #[serde(default)]
    entry: Vec<RawSynset>,
}

#[derive(Debug, Deserialize)]
struct RawSynset {
    #[serde(default)]
    synonym: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawDictGroup {
    pos: String,
    #[serde(default)]
    base_form: String,
    #[serde(default)]
    terms: Vec<String>,
}

/// Decode the array under `key`, or `None` if it is absent or not an array.
///
/// Elements that fail to decode are skipped.
fn section<T: DeserializeOwned>(data: &Value, key: &str) -> Option<Vec<T>> {
    let Some(elements) = data.get(key)?.as_array() else {
        debug!(section = key, "Ignoring non-array section");
        return None;
    };

    let items = elements
        .iter()
        .enumerate()
        .filter_map(|(index, element)| match T::deserialize(element) {
            Ok(item) => Some(item),
            Err(e) => {
                debug!(section = key, index, error = %e, "Skipping malformed element");
                None
            }
        })
        .collect();
    Some(items)
}

fn non_empty<K: Ord, V>(map: BTreeMap<K, V>) -> Option<BTreeMap<K, V>> {
    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}

/// Concatenate the `trans` of every sentence, in order.
pub fn target_text(data: &Value) -> Option<String> {
    let sentences: Vec<RawSentence> = section(data, "sentences")?;
    let text: String = sentences.into_iter().filter_map(|s| s.trans).collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Definitions and usage examples of the source text, by part of speech.
pub fn source_text_definitions(data: &Value) -> Option<BTreeMap<PartOfSpeech, Vec<DefinitionEntry>>> {
    let groups: Vec<RawDefinitionGroup> = section(data, "definitions")?;

    let mut definitions: BTreeMap<PartOfSpeech, Vec<DefinitionEntry>> = BTreeMap::new();
    for group in groups {
        let entries = definitions.entry(group.pos).or_default();
        entries.extend(group.entry.into_iter().map(|d| DefinitionEntry {
            base_form: group.base_form.clone(),
            definition: d.gloss,
            example: d.example,
        }));
    }

    non_empty(definitions)
}

/// Synonym sets of the source text, by part of speech.
pub fn source_text_synonyms(data: &Value) -> Option<BTreeMap<PartOfSpeech, Vec<SynonymEntry>>> {
    let groups: Vec<RawSynsetGroup> = section(data, "synsets")?;

    let mut synonyms: BTreeMap<PartOfSpeech, Vec<SynonymEntry>> = BTreeMap::new();
    for group in groups {
        let entries = synonyms.entry(group.pos).or_default();
        entries.extend(group.entry.into_iter().map(|s| SynonymEntry {
            base_form: group.base_form.clone(),
            synonyms: s.synonym,
        }));
    }

    non_empty(synonyms)
}

/// Dictionary terms of the translation, one entry per part of speech.
///
/// A repeated part of speech replaces the earlier entry.
pub fn target_text_synonyms(data: &Value) -> Option<BTreeMap<PartOfSpeech, SynonymEntry>> {
    let groups: Vec<RawDictGroup> = section(data, "dict")?;

    let synonyms: BTreeMap<PartOfSpeech, SynonymEntry> = groups
        .into_iter()
        .map(|group| {
            (
                group.pos,
                SynonymEntry {
                    base_form: group.base_form,
                    synonyms: group.terms,
                },
            )
        })
        .collect();

    non_empty(synonyms)
}

/// Detected source language name, if the payload reports a known code.
pub fn detected_language(data: &Value) -> Option<&'static str> {
    let code = data.get("src")?.as_str()?;
    LanguageRegistry::google().language_for_code(code)
}

/// Build the normalized result for a payload answering `source_text`.
pub fn normalize(
    data: &Value,
    source_text: &str,
    source_language: Language,
    target_language: Language,
) -> TranslationResult {
    TranslationResult {
        source_language: detected_language(data)
            .unwrap_or(source_language.name())
            .to_string(),
        source_text: source_text.to_string(),
        source_text_synonyms: source_text_synonyms(data),
        source_text_definitions: source_text_definitions(data),
        target_language: target_language.name().to_string(),
        target_text: target_text(data),
        target_text_synonyms: target_text_synonyms(data),
        detection_confidence: data.get("confidence").and_then(Value::as_f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn polish() -> Language {
        Language::resolve("Polish").unwrap()
    }

    /// Trimmed-down payload for the single word "run" (sl=en, tl=pl).
    fn word_payload() -> Value {
        json!({
            "sentences": [
                {"trans": "biegać", "orig": "run", "backend": 10},
                {"translit": "", "src_translit": "rʌn"}
            ],
            "dict": [
                {"pos": "verb", "terms": ["biegać", "uruchomić"], "base_form": "run", "pos_enum": 2},
                {"pos": "noun", "terms": ["bieg", "seria"], "base_form": "run", "pos_enum": 1}
            ],
            "src": "en",
            "confidence": 0.98,
            "definitions": [
                {
                    "pos": "verb",
                    "entry": [
                        {"gloss": "move at a speed faster than a walk.", "definition_id": "m_en_1", "example": "the dog ran across the road"},
                        {"gloss": "be in charge of; manage.", "definition_id": "m_en_2"}
                    ],
                    "base_form": "run"
                },
                {
                    "pos": "noun",
                    "entry": [{"gloss": "an act or spell of running.", "definition_id": "m_en_3", "example": "a cross-country run"}],
                    "base_form": "run"
                }
            ],
            "synsets": [
                {
                    "pos": "verb",
                    "entry": [
                        {"synonym": ["sprint", "race", "dash"], "definition_id": "m_en_1"},
                        {"synonym": ["manage", "direct"], "definition_id": "m_en_2"}
                    ],
                    "base_form": "run"
                }
            ]
        })
    }

    // ==================== targetText Tests ====================

    #[test]
    fn test_target_text_concatenates_in_order() {
        let data = json!({"sentences": [{"trans": "Dzień dobry. "}, {"trans": "Jak się masz?"}]});
        assert_eq!(target_text(&data).as_deref(), Some("Dzień dobry. Jak się masz?"));
    }

    #[test]
    fn test_target_text_skips_sentences_without_trans() {
        assert_eq!(target_text(&word_payload()).as_deref(), Some("biegać"));
    }

    #[test]
    fn test_target_text_absent_or_wrong_shape() {
        assert!(target_text(&json!({})).is_none());
        assert!(target_text(&json!({"sentences": "bonjour"})).is_none());
        assert!(target_text(&json!({"sentences": [{"trans": 42}]})).is_none());
    }

    #[test]
    fn test_target_text_skips_malformed_elements() {
        let data = json!({"sentences": [
            {"trans": "Dzień dobry. "},
            {"trans": "Jak się masz?"},
            "garbage"
        ]});
        assert_eq!(target_text(&data).as_deref(), Some("Dzień dobry. Jak się masz?"));
    }

    #[test]
    fn test_target_text_empty_concatenation() {
        assert!(target_text(&json!({"sentences": []})).is_none());
        assert!(target_text(&json!({"sentences": [{"trans": ""}]})).is_none());
    }

    // ==================== Definitions Tests ====================

    #[test]
    fn test_definitions_grouped_by_part_of_speech() {
        let definitions = source_text_definitions(&word_payload()).expect("Should extract");

        assert_eq!(definitions.len(), 2);
        let verbs = &definitions["verb"];
        assert_eq!(verbs.len(), 2);
        assert_eq!(verbs[0].base_form, "run");
        assert_eq!(verbs[0].definition, "move at a speed faster than a walk.");
        assert_eq!(verbs[0].example.as_deref(), Some("the dog ran across the road"));
        assert!(verbs[1].example.is_none());
        assert_eq!(definitions["noun"].len(), 1);
    }

    #[test]
    fn test_definitions_repeated_part_of_speech_appends() {
        let data = json!({"definitions": [
            {"pos": "noun", "base_form": "bank", "entry": [{"gloss": "land alongside a river"}]},
            {"pos": "noun", "base_form": "bank", "entry": [{"gloss": "a financial institution"}]}
        ]});
        let definitions = source_text_definitions(&data).unwrap();
        assert_eq!(definitions["noun"].len(), 2);
    }

    #[test]
    fn test_definitions_keep_well_formed_groups() {
        let data = json!({"definitions": [
            {"pos": "noun", "base_form": "bank", "entry": [{"gloss": "a financial institution"}]},
            {"pos": 7, "entry": "nope"}
        ]});
        let definitions = source_text_definitions(&data).unwrap();
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions["noun"][0].definition, "a financial institution");
    }

    #[test]
    fn test_definitions_malformed_is_none() {
        assert!(source_text_definitions(&json!({"definitions": {"pos": "noun"}})).is_none());
        assert!(source_text_definitions(&json!({"definitions": [{"entry": []}]})).is_none());
        assert!(source_text_definitions(&json!({"definitions": []})).is_none());
    }

    // ==================== Synonym Tests ====================

    #[test]
    fn test_source_text_synonyms() {
        let synonyms = source_text_synonyms(&word_payload()).expect("Should extract");
        let verbs = &synonyms["verb"];
        assert_eq!(verbs.len(), 2);
        assert_eq!(verbs[0].synonyms, vec!["sprint", "race", "dash"]);
        assert_eq!(verbs[1].base_form, "run");
    }

    #[test]
    fn test_target_text_synonyms_one_entry_per_part_of_speech() {
        let synonyms = target_text_synonyms(&word_payload()).expect("Should extract");
        assert_eq!(synonyms.len(), 2);
        assert_eq!(synonyms["verb"].synonyms, vec!["biegać", "uruchomić"]);
        assert_eq!(synonyms["noun"].base_form, "run");
    }

    #[test]
    fn test_target_text_synonyms_duplicate_overwrites() {
        let data = json!({"dict": [
            {"pos": "noun", "base_form": "run", "terms": ["bieg"]},
            {"pos": "noun", "base_form": "run", "terms": ["seria"]}
        ]});
        let synonyms = target_text_synonyms(&data).unwrap();
        assert_eq!(synonyms["noun"].synonyms, vec!["seria"]);
    }

    #[test]
    fn test_synonyms_absent_is_none() {
        assert!(source_text_synonyms(&json!({})).is_none());
        assert!(target_text_synonyms(&json!({"dict": null})).is_none());
    }

    // ==================== normalize Tests ====================

    #[test]
    fn test_normalize_prefers_detected_language() {
        let result = normalize(&word_payload(), "run", Language::AUTO_DETECT, polish());

        assert_eq!(result.source_language, "English");
        assert_eq!(result.source_text, "run");
        assert_eq!(result.target_language, "Polish");
        assert_eq!(result.target_text.as_deref(), Some("biegać"));
        assert_eq!(result.detection_confidence, Some(0.98));
        assert!(result.source_text_definitions.is_some());
        assert!(result.source_text_synonyms.is_some());
        assert!(result.target_text_synonyms.is_some());
    }

    #[test]
    fn test_normalize_falls_back_to_declared_language() {
        let data = json!({"sentences": [{"trans": "bonjour"}], "src": "xx"});
        let english = Language::ENGLISH;
        let french = Language::resolve("French").unwrap();

        let result = normalize(&data, "hello", english, french);
        assert_eq!(result.source_language, "English");
    }

    #[test]
    fn test_normalize_sentences_only() {
        let data = json!({"sentences": [{"trans": "bonjour"}]});
        let result = normalize(&data, "hello", Language::AUTO_DETECT, Language::resolve("fr").unwrap());

        assert_eq!(result.source_language, "Auto-detect");
        assert_eq!(result.target_text.as_deref(), Some("bonjour"));
        assert!(result.source_text_definitions.is_none());
        assert!(result.source_text_synonyms.is_none());
        assert!(result.target_text_synonyms.is_none());
        assert!(result.detection_confidence.is_none());
    }

    #[test]
    fn test_normalize_one_malformed_section_keeps_the_rest() {
        let mut data = word_payload();
        data["synsets"] = json!("unexpected");

        let result = normalize(&data, "run", Language::AUTO_DETECT, polish());
        assert!(result.source_text_synonyms.is_none());
        assert!(result.source_text_definitions.is_some());
        assert_eq!(result.target_text.as_deref(), Some("biegać"));
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = normalize(&word_payload(), "run", Language::AUTO_DETECT, polish());
        let json = serde_json::to_value(&result).expect("Should serialize");

        assert_eq!(json["sourceLanguage"], "English");
        assert_eq!(json["targetText"], "biegać");
        assert_eq!(json["targetTextSynonyms"]["verb"]["baseForm"], "run");
        assert_eq!(json["sourceTextDefinitions"]["noun"][0]["example"], "a cross-country run");
    }

    #[test]
    fn test_result_serializes_missing_sections_as_null() {
        let data = json!({"sentences": [{"trans": "bonjour"}]});
        let result = normalize(&data, "hello", Language::ENGLISH, Language::resolve("fr").unwrap());
        let json = serde_json::to_value(&result).unwrap();

        assert!(json["sourceTextSynonyms"].is_null());
        assert!(json["targetTextSynonyms"].is_null());
        assert!(json.get("detectionConfidence").is_none());
    }
}
