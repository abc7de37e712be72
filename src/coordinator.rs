//! Background coordinator: turns a text selection into a translation and
//! hands the result to the page agent over its channel.

use crate::channel::{ChannelId, ChannelRegistry};
use crate::config::Config;
use crate::metrics::TranslationMetrics;
use crate::response::TranslationResult;
use crate::translation::{TranslateError, TranslationClient, TranslationParams, TranslationRequest};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Peer name of the content script running in the focused tab.
pub const PAGE_PEER: &str = "page";

/// Messages the coordinator posts to the page agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PageMessage {
    Translation(TranslationResult),
}

/// Result of a selection trigger.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionOutcome {
    /// Whether a live page channel received the result.
    pub delivered: bool,
    pub result: TranslationResult,
}

pub struct Coordinator {
    translator: TranslationClient,
    channels: ChannelRegistry<PageMessage>,
    metrics: TranslationMetrics,
    preferences: TranslationParams,
}

impl Coordinator {
    pub fn new(translator: TranslationClient, preferences: TranslationParams) -> Self {
        Self {
            translator,
            channels: ChannelRegistry::new(),
            metrics: TranslationMetrics::new(),
            preferences,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let translator = TranslationClient::new(config)?;
        let preferences = TranslationParams::new(
            &config.default_source_language,
            &config.default_target_language,
        );
        Ok(Self::new(translator, preferences))
    }

    pub fn translator(&self) -> &TranslationClient {
        &self.translator
    }

    pub fn channels(&self) -> &ChannelRegistry<PageMessage> {
        &self.channels
    }

    pub fn metrics(&self) -> &TranslationMetrics {
        &self.metrics
    }

    pub fn preferences(&self) -> &TranslationParams {
        &self.preferences
    }

    /// Translate without delivering, counting upstream calls and failures.
    pub async fn translate(
        &self,
        text: &str,
        params: &TranslationParams,
    ) -> Result<TranslationResult, TranslateError> {
        let request = TranslationRequest::resolve(text, params)?;

        self.metrics.record_api_call();
        let result = self.translator.execute(&request).await;
        if result.is_err() {
            self.metrics.record_api_failure();
        }
        result
    }

    /// Translate a user selection and post the result to the page agent.
    ///
    /// `params` falls back to the configured preferences. Failures are logged
    /// and returned to the caller; nothing is posted to the page for them.
    pub async fn translate_selection(
        &self,
        selection: Option<&str>,
        params: Option<&TranslationParams>,
    ) -> Result<SelectionOutcome, TranslateError> {
        let Some(selection) = selection else {
            error!("No text selected for translation");
            return Err(TranslateError::InvalidInput("no text selected".to_string()));
        };
        let params = params.unwrap_or(&self.preferences);

        let result = match self.translate(selection, params).await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, ?params, "Selection translation failed");
                return Err(e);
            }
        };

        let delivered = self
            .channels
            .send(PAGE_PEER, PageMessage::Translation(result.clone()));
        self.metrics.record_delivery(delivered);
        if delivered {
            info!(target_language = %result.target_language, "Delivered translation to page");
        } else {
            warn!("No page channel is live, translation not delivered");
        }

        Ok(SelectionOutcome { delivered, result })
    }

    /// Handle a message posted by a page agent.
    ///
    /// Returns `false` for messages arriving on a superseded channel.
    pub fn handle_page_message(&self, id: &ChannelId, message: &serde_json::Value) -> bool {
        if !self.channels.is_current(id) {
            debug!(peer = %id.peer, generation = id.generation, "Ignoring message from stale channel");
            return false;
        }
        debug!(peer = %id.peer, %message, "Message from content script");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelEvent, SenderContext};
    use reqwest::Url;
    use wiremock::{
        matchers::{method, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn create_coordinator(base: &str) -> Coordinator {
        let translator = TranslationClient::with_client(
            reqwest::Client::new(),
            Url::parse(&format!("{}/translate_a/single", base)).unwrap(),
            Url::parse(&format!("{}/translate_tts", base)).unwrap(),
        );
        Coordinator::new(translator, TranslationParams::new("Auto-detect", "Polish"))
    }

    async fn mount_translation(server: &MockServer, trans: &str) {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sentences": [{"trans": trans}],
                "src": "en"
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_selection_delivered_to_page() {
        let server = MockServer::start().await;
        mount_translation(&server, "cześć").await;
        let coordinator = create_coordinator(&server.uri());

        let mut page = coordinator
            .channels()
            .request_connect(PAGE_PEER, SenderContext::active(1))
            .unwrap();

        let outcome = coordinator
            .translate_selection(Some("hello"), None)
            .await
            .expect("Should translate");

        assert!(outcome.delivered);
        assert_eq!(outcome.result.target_language, "Polish");
        match page.try_recv() {
            Some(ChannelEvent::Message(PageMessage::Translation(result))) => {
                assert_eq!(result.target_text.as_deref(), Some("cześć"));
            }
            other => panic!("Expected translation message, got {:?}", other),
        }
        assert_eq!(coordinator.metrics().deliveries(), 1);
    }

    #[tokio::test]
    async fn test_selection_uses_configured_preferences() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("sl", "auto"))
            .and(query_param("tl", "pl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;
        let coordinator = create_coordinator(&server.uri());

        coordinator
            .translate_selection(Some("hello"), None)
            .await
            .expect("Should translate");
    }

    #[tokio::test]
    async fn test_selection_without_page_channel_is_not_an_error() {
        let server = MockServer::start().await;
        mount_translation(&server, "cześć").await;
        let coordinator = create_coordinator(&server.uri());

        let outcome = coordinator
            .translate_selection(Some("hello"), None)
            .await
            .expect("Should translate");

        assert!(!outcome.delivered);
        assert_eq!(coordinator.metrics().dropped_deliveries(), 1);
    }

    #[tokio::test]
    async fn test_missing_selection_is_invalid_input() {
        let coordinator = create_coordinator("http://127.0.0.1:1");
        let err = coordinator.translate_selection(None, None).await.unwrap_err();

        assert!(matches!(err, TranslateError::InvalidInput(_)));
        assert_eq!(coordinator.metrics().api_calls(), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_not_posted_to_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let coordinator = create_coordinator(&server.uri());
        let mut page = coordinator
            .channels()
            .request_connect(PAGE_PEER, SenderContext::active(1))
            .unwrap();

        let err = coordinator
            .translate_selection(Some("hello"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, TranslateError::UpstreamFailure(_)));
        assert!(page.try_recv().is_none());
        assert_eq!(coordinator.metrics().api_calls(), 1);
        assert_eq!(coordinator.metrics().api_failures(), 1);
    }

    #[tokio::test]
    async fn test_handle_page_message_ignores_stale_channel() {
        let coordinator = create_coordinator("http://127.0.0.1:1");
        let channels = coordinator.channels();
        let first = channels.request_connect(PAGE_PEER, SenderContext::active(1)).unwrap();
        let second = channels.request_connect(PAGE_PEER, SenderContext::active(2)).unwrap();

        let message = serde_json::json!({"action": "Test Page Port", "text": "Nothing here"});
        assert!(!coordinator.handle_page_message(first.id(), &message));
        assert!(coordinator.handle_page_message(second.id(), &message));
    }

    #[test]
    fn test_page_message_wire_format() {
        let message = PageMessage::Translation(TranslationResult {
            source_language: "English".to_string(),
            source_text: "hello".to_string(),
            source_text_synonyms: None,
            source_text_definitions: None,
            target_language: "Polish".to_string(),
            target_text: Some("cześć".to_string()),
            target_text_synonyms: None,
            detection_confidence: None,
        });

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["action"], "translation");
        assert_eq!(json["targetText"], "cześć");
    }
}
