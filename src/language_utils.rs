use std::fmt;

use isolang::Language;
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// Language utilities for ISO language code handling
///
/// This module provides functions for validating and normalizing
/// ISO 639-1 (2-letter) and ISO 639-3 (3-letter) language codes, and the
/// `LanguagePair` value used throughout the engine. The canonical form for
/// a code is ISO 639-3/T lowercase; translation records store the uppercase
/// English language name (e.g. `FRENCH`) so that records written by
/// different backends stay comparable.
/// Normalize a language code to ISO 639-3/T (3-letter, lowercase) format
pub fn normalize_code(code: &str) -> Result<String, EngineError> {
    let normalized = code.trim().to_lowercase();

    if normalized.len() == 2 {
        if let Some(lang) = Language::from_639_1(&normalized) {
            return Ok(lang.to_639_3().to_string());
        }
    } else if normalized.len() == 3 && Language::from_639_3(&normalized).is_some() {
        return Ok(normalized);
    }

    Err(EngineError::InvalidLanguageCode(code.trim().to_string()))
}

/// Normalize a language code to ISO 639-1 (2-letter) format if one exists,
/// falling back to ISO 639-3/T otherwise. Neural backends address languages
/// by their 2-letter codes.
pub fn normalize_to_alpha2(code: &str) -> Result<String, EngineError> {
    let part3 = normalize_code(code)?;
    let lang = Language::from_639_3(&part3)
        .ok_or_else(|| EngineError::InvalidLanguageCode(code.trim().to_string()))?;

    match lang.to_639_1() {
        Some(alpha2) => Ok(alpha2.to_string()),
        None => Ok(part3),
    }
}

/// Get the uppercase English language name for a code (e.g. "FRENCH")
pub fn language_name(code: &str) -> Result<String, EngineError> {
    let part3 = normalize_code(code)?;
    let lang = Language::from_639_3(&part3)
        .ok_or_else(|| EngineError::InvalidLanguageCode(code.trim().to_string()))?;

    Ok(lang.to_name().to_uppercase())
}

/// An ordered (source, target) language pair for a single translation
/// direction. Codes are held in canonical ISO 639-3/T form; construction
/// rejects degenerate pairs where both sides normalize to the same
/// language.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LanguagePair {
    source: String,
    target: String,
}

impl LanguagePair {
    /// Build a pair from raw codes, normalizing and rejecting degenerate input
    pub fn new(source: &str, target: &str) -> Result<Self, EngineError> {
        let source_norm = normalize_code(source)?;
        let target_norm = normalize_code(target)?;

        if source_norm == target_norm {
            return Err(EngineError::DegeneratePair(
                source.trim().to_string(),
                target.trim().to_string(),
            ));
        }

        Ok(Self { source: source_norm, target: target_norm })
    }

    /// Canonical source code (ISO 639-3/T)
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Canonical target code (ISO 639-3/T)
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Source code in ISO 639-1 form when one exists
    pub fn source_alpha2(&self) -> Result<String, EngineError> {
        normalize_to_alpha2(&self.source)
    }

    /// Target code in ISO 639-1 form when one exists
    pub fn target_alpha2(&self) -> Result<String, EngineError> {
        normalize_to_alpha2(&self.target)
    }

    /// Uppercase English name of the source language
    pub fn source_name(&self) -> Result<String, EngineError> {
        language_name(&self.source)
    }

    /// Uppercase English name of the target language
    pub fn target_name(&self) -> Result<String, EngineError> {
        language_name(&self.target)
    }

    /// The reversed direction of this pair
    pub fn inverse(&self) -> Self {
        Self { source: self.target.clone(), target: self.source.clone() }
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source, self.target)
    }
}
