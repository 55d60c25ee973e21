/*!
 * Mock interpreter for testing.
 *
 * Translates by tagging the input with the pair it was translated along,
 * so tests can assert exactly which route executed. Supports configurable
 * pair sets, artificial latency (for timeout tests) and failure injection.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::InterpreterError;
use crate::language_utils::LanguagePair;

use super::Interpreter;

/// Deterministic in-process backend
#[derive(Debug, Clone)]
pub struct Mock {
    /// Pairs this mock claims to support
    pairs: Vec<LanguagePair>,
    /// Number of translate calls performed
    translate_calls: Arc<AtomicUsize>,
    /// Artificial latency per translate call
    delay: Option<Duration>,
    /// When set, every translate call fails with this message
    fail_with: Option<String>,
}

impl Mock {
    /// A mock that supports nothing
    pub fn empty() -> Self {
        Self::with_pairs(&[])
    }

    /// A mock supporting the given `("src", "tgt")` code pairs
    pub fn with_pairs(codes: &[(&str, &str)]) -> Self {
        let pairs = codes
            .iter()
            .map(|(s, t)| LanguagePair::new(s, t).expect("valid mock pair"))
            .collect();
        Self {
            pairs,
            translate_calls: Arc::new(AtomicUsize::new(0)),
            delay: None,
            fail_with: None,
        }
    }

    /// Add artificial latency to every translate call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make every translate call fail
    pub fn failing(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }

    /// Number of translate calls performed so far
    pub fn translate_calls(&self) -> usize {
        self.translate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Interpreter for Mock {
    fn label(&self) -> &'static str {
        "MOCK"
    }

    async fn supported_pairs(&self) -> Result<Vec<LanguagePair>, InterpreterError> {
        Ok(self.pairs.clone())
    }

    async fn translate(
        &self,
        text: &str,
        pair: &LanguagePair,
    ) -> Result<String, InterpreterError> {
        if !self.pairs.contains(pair) {
            return Err(InterpreterError::UnsupportedPair(pair.to_string()));
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.fail_with {
            return Err(InterpreterError::Failed(message.clone()));
        }

        self.translate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("[{}] {}", pair, text))
    }
}
