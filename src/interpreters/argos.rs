use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::InterpreterError;
use crate::language_utils::LanguagePair;

use super::Interpreter;

/// Neural backend client speaking the Argos-compatible HTTP API.
///
/// The serving process owns model acquisition; this client only needs the
/// endpoint to be reachable. Languages are addressed by their ISO 639-1
/// codes on the wire.
pub struct Argos {
    /// Base URL of the translate server
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    /// Supported pairs, fetched once per engine invocation
    pairs: Mutex<Option<Vec<LanguagePair>>>,
}

impl std::fmt::Debug for Argos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Argos").field("base_url", &self.base_url).finish()
    }
}

/// One entry of the `/languages` listing
#[derive(Debug, Deserialize)]
struct LanguageListing {
    /// ISO 639-1 code of the source language
    code: String,
    /// ISO 639-1 codes this source can be translated into
    #[serde(default)]
    targets: Vec<String>,
}

/// Request body for `/translate`
#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    /// Text to translate
    q: &'a str,
    /// Source language code
    source: String,
    /// Target language code
    target: String,
    /// Always plain text; documents carry no markup worth preserving here
    format: &'static str,
}

/// Response body of `/translate`
#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

impl Argos {
    /// Create a client against the given endpoint
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            pairs: Mutex::new(None),
        }
    }

    fn map_request_error(&self, error: reqwest::Error) -> InterpreterError {
        if error.is_connect() || error.is_timeout() {
            InterpreterError::BackendUnavailable(format!(
                "translate server unreachable at {}: {}",
                self.base_url, error
            ))
        } else {
            InterpreterError::Failed(error.to_string())
        }
    }

    async fn fetch_pairs(&self) -> Result<Vec<LanguagePair>, InterpreterError> {
        let url = format!("{}/languages", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        if !response.status().is_success() {
            return Err(InterpreterError::Failed(format!(
                "{} returned HTTP {}",
                url,
                response.status()
            )));
        }

        let listings: Vec<LanguageListing> = response
            .json()
            .await
            .map_err(|e| InterpreterError::Failed(format!("unreadable language listing: {}", e)))?;

        // Codes outside ISO 639 (the server may expose variants) are skipped
        let mut pairs = Vec::new();
        for listing in &listings {
            for target in &listing.targets {
                if let Ok(pair) = LanguagePair::new(&listing.code, target) {
                    pairs.push(pair);
                }
            }
        }
        Ok(pairs)
    }
}

#[async_trait]
impl Interpreter for Argos {
    fn label(&self) -> &'static str {
        "ARGOS"
    }

    async fn supported_pairs(&self) -> Result<Vec<LanguagePair>, InterpreterError> {
        if let Some(pairs) = self.pairs.lock().as_ref() {
            return Ok(pairs.clone());
        }
        let pairs = self.fetch_pairs().await?;
        *self.pairs.lock() = Some(pairs.clone());
        Ok(pairs)
    }

    async fn translate(
        &self,
        text: &str,
        pair: &LanguagePair,
    ) -> Result<String, InterpreterError> {
        if !self.supports(pair).await? {
            return Err(InterpreterError::UnsupportedPair(pair.to_string()));
        }

        let request = TranslateRequest {
            q: text,
            source: pair
                .source_alpha2()
                .map_err(|e| InterpreterError::Failed(e.to_string()))?,
            target: pair
                .target_alpha2()
                .map_err(|e| InterpreterError::Failed(e.to_string()))?,
            format: "text",
        };

        let url = format!("{}/translate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InterpreterError::Failed(format!(
                "translate server returned HTTP {}: {}",
                status, body
            )));
        }

        let parsed: TranslateResponse = response
            .json()
            .await
            .map_err(|e| InterpreterError::Failed(format!("unreadable translation: {}", e)))?;

        Ok(parsed.translated_text)
    }
}
