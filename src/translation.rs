use crate::config::Config;
use crate::i18n::Language;
use crate::response::{normalize, TranslationResult};
use anyhow::Context;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Response detail flags (`dt`) requested from the endpoint.
///
/// at: alternative translations, bd: dictionary, ex: examples,
/// ld: language detection, md: definitions, qca: spelling,
/// rw: related words, rm: transliteration, ss: synonym sets, t: sentences
pub const DETAIL_FLAGS: [&str; 10] = ["at", "bd", "ex", "ld", "md", "qca", "rw", "rm", "ss", "t"];

/// Why a call to the translation endpoint failed.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("undecodable response body: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid parameters: source language equals target language ({0})")]
    InvalidParams(String),

    #[error("translation request failed: {0}")]
    UpstreamFailure(#[from] UpstreamError),
}

/// Language hints supplied with a piece of text. Either may be a name or a code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationParams {
    #[serde(default)]
    pub source_language: Option<String>,
    #[serde(default)]
    pub target_language: Option<String>,
}

impl TranslationParams {
    pub fn new(source_language: &str, target_language: &str) -> Self {
        Self {
            source_language: Some(source_language.to_string()),
            target_language: Some(target_language.to_string()),
        }
    }
}

/// A validated request, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub source_text: String,
    pub source_language: Language,
    pub target_language: Language,
}

impl TranslationRequest {
    /// Validate text and resolve language hints.
    ///
    /// Order: emptiness, then language defaulting, then equality. Unknown
    /// source languages become `Auto-detect`; unknown targets (and
    /// `Auto-detect` as a target) become `English`.
    pub fn resolve(source_text: &str, params: &TranslationParams) -> Result<Self, TranslateError> {
        let source_text = source_text.trim();
        if source_text.is_empty() {
            return Err(TranslateError::InvalidInput(
                "cannot translate an empty string".to_string(),
            ));
        }

        let source_language = match params.source_language.as_deref().and_then(Language::resolve) {
            Some(language) => language,
            None => {
                warn!(
                    requested = ?params.source_language,
                    "No matching source language, defaulting to Auto-detect"
                );
                Language::AUTO_DETECT
            }
        };

        let target_language = match params
            .target_language
            .as_deref()
            .and_then(Language::resolve)
            .filter(|language| !language.is_auto_detect())
        {
            Some(language) => language,
            None => {
                warn!(
                    requested = ?params.target_language,
                    "No matching target language, defaulting to English"
                );
                Language::ENGLISH
            }
        };

        if source_language == target_language {
            return Err(TranslateError::InvalidParams(source_language.name().to_string()));
        }

        Ok(Self {
            source_text: source_text.to_string(),
            source_language,
            target_language,
        })
    }
}

/// Client for the translate.googleapis.com `translate_a/single` endpoint.
#[derive(Debug, Clone)]
pub struct TranslationClient {
    http: reqwest::Client,
    api_url: Url,
    pronounce_url: Url,
}

impl TranslationClient {
    /// Create a client with the configured endpoints and request timeout.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to create HTTP client")?;

        let api_url = Url::parse(&config.translate_api_url)
            .with_context(|| format!("Invalid TRANSLATE_API_URL: {}", config.translate_api_url))?;
        let pronounce_url = Url::parse(&config.pronounce_api_url)
            .with_context(|| format!("Invalid PRONOUNCE_API_URL: {}", config.pronounce_api_url))?;

        Ok(Self::with_client(http, api_url, pronounce_url))
    }

    pub fn with_client(http: reqwest::Client, api_url: Url, pronounce_url: Url) -> Self {
        Self {
            http,
            api_url,
            pronounce_url,
        }
    }

    /// Translate `source_text` and normalize the endpoint's payload.
    ///
    /// Performs exactly one request; there is no retry and no cache.
    pub async fn translate(
        &self,
        source_text: &str,
        params: &TranslationParams,
    ) -> Result<TranslationResult, TranslateError> {
        let request = TranslationRequest::resolve(source_text, params)?;
        self.execute(&request).await
    }

    /// Send an already validated request.
    pub async fn execute(&self, request: &TranslationRequest) -> Result<TranslationResult, TranslateError> {
        let url = self.translate_url(request);
        debug!(
            from = %request.source_language,
            to = %request.target_language,
            "Requesting translation"
        );

        let data = self.fetch(url).await.map_err(|e| {
            error!(
                from = %request.source_language,
                to = %request.target_language,
                error = %e,
                "Translation request failed"
            );
            TranslateError::UpstreamFailure(e)
        })?;
        debug!(payload = %data, "Received translation payload");

        Ok(normalize(
            &data,
            &request.source_text,
            request.source_language,
            request.target_language,
        ))
    }

    async fn fetch(&self, url: Url) -> Result<serde_json::Value, UpstreamError> {
        let response = self.http.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(UpstreamError::Status { status, body });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Build the request URL, asking for the richest payload available.
    pub fn translate_url(&self, request: &TranslationRequest) -> Url {
        let mut url = self.api_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client", "gtx")
                .append_pair("sl", request.source_language.code())
                .append_pair("tl", request.target_language.code());
            for flag in DETAIL_FLAGS {
                query.append_pair("dt", flag);
            }
            query
                .append_pair("dj", "1")
                .append_pair("q", &request.source_text);
        }
        url
    }

    /// Text-to-speech URL reading `text` aloud in `language`.
    pub fn pronunciation_url(&self, text: &str, language: Language) -> Url {
        let mut url = self.pronounce_url.clone();
        url.query_pairs_mut()
            .append_pair("client", "tw-ob")
            .append_pair("ie", "UTF-8")
            .append_pair("total", "1")
            .append_pair("idx", "0")
            .append_pair("tl", language.code())
            .append_pair("q", text.trim());
        url
    }
}
