//! Translation client
//!
//! Sends recognized text to a remote translation service. The service speaks
//! a small JSON protocol: a POST with the text segments and language pair,
//! answered by a list of translations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::TranslationSettings;
use crate::error::ScribeError;

/// API version pinned in every request
pub const API_VERSION: &str = "2018-05-01";

/// Username sent alongside the API key for basic auth
const AUTH_USER: &str = "apikey";

/// Text plus language pair to translate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
}

impl TranslationRequest {
    pub fn new(text: impl Into<String>, settings: &TranslationSettings) -> Self {
        Self {
            text: text.into(),
            source_lang: settings.source_lang.clone(),
            target_lang: settings.target_lang.clone(),
        }
    }
}

/// Remote translation backend
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate the request text, or report why it could not be done
    async fn translate(&self, request: &TranslationRequest) -> Result<String, ScribeError>;
}

#[derive(Debug, Serialize)]
struct RequestBody<'a> {
    text: [&'a str; 1],
    source: &'a str,
    target: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    #[serde(default)]
    translations: Vec<TranslationEntry>,
}

#[derive(Debug, Deserialize)]
struct TranslationEntry {
    translation: String,
}

/// Extract the first translation from a service response body
pub fn parse_translation_response(body: &str) -> Result<String, ScribeError> {
    let parsed: ResponseBody = serde_json::from_str(body)
        .map_err(|e| ScribeError::Translation(format!("malformed response: {}", e)))?;

    parsed
        .translations
        .into_iter()
        .next()
        .map(|entry| entry.translation)
        .ok_or_else(|| ScribeError::Translation("response contained no translations".into()))
}

/// Build the translate URL for a service base endpoint
pub fn translate_url(endpoint: &str) -> String {
    format!(
        "{}/v3/translate?version={}",
        endpoint.trim_end_matches('/'),
        API_VERSION
    )
}

/// Translator backed by an HTTP JSON service
pub struct HttpTranslator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpTranslator {
    /// Build a client from settings. Fails if endpoint or key is missing.
    pub fn new(settings: &TranslationSettings) -> Result<Self, ScribeError> {
        if !settings.is_configured() {
            return Err(ScribeError::Configuration(
                "translation endpoint and api_key must be set".into(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()
            .map_err(|e| ScribeError::Configuration(format!("failed to create HTTP client: {}", e)))?;

        info!("Translation service at {}", settings.endpoint);
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
        })
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, ScribeError> {
        let url = translate_url(&self.endpoint);
        debug!(
            "Translating {} chars {} -> {}",
            request.text.chars().count(),
            request.source_lang,
            request.target_lang
        );

        let body = RequestBody {
            text: [request.text.as_str()],
            source: &request.source_lang,
            target: &request.target_lang,
        };

        let response = self
            .client
            .post(&url)
            .basic_auth(AUTH_USER, Some(&self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| ScribeError::Translation(format!("request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ScribeError::Translation(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(ScribeError::Translation(format!(
                "service returned {}: {}",
                status,
                text.trim()
            )));
        }

        parse_translation_response(&text)
    }
}

/// Stand-in used when no service is configured
pub struct UnconfiguredTranslator;

#[async_trait]
impl Translator for UnconfiguredTranslator {
    async fn translate(&self, _request: &TranslationRequest) -> Result<String, ScribeError> {
        Err(ScribeError::Translation(
            "no translation service configured".into(),
        ))
    }
}
