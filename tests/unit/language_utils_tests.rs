/*!
 * Tests for language code utilities and language pairs
 */

use estrans::errors::EngineError;
use estrans::language_utils::{LanguagePair, language_name, normalize_code, normalize_to_alpha2};

/// Test normalization of 2-letter and 3-letter codes to ISO 639-3/T
#[test]
fn test_normalize_code_withValidCodes_shouldReturnPart3() {
    assert_eq!(normalize_code("en").unwrap(), "eng");
    assert_eq!(normalize_code("fr").unwrap(), "fra");
    assert_eq!(normalize_code("eng").unwrap(), "eng");
    assert_eq!(normalize_code("por").unwrap(), "por");

    // Whitespace and case
    assert_eq!(normalize_code(" EN ").unwrap(), "eng");
    assert_eq!(normalize_code("FRA").unwrap(), "fra");
}

/// Test rejection of malformed or unknown codes
#[test]
fn test_normalize_code_withInvalidCodes_shouldReturnError() {
    for code in ["", "e", "xq", "xyz", "engl", "123"] {
        assert!(
            matches!(normalize_code(code), Err(EngineError::InvalidLanguageCode(_))),
            "expected rejection for '{}'",
            code
        );
    }
}

/// Test the 2-letter form used when addressing neural backends
#[test]
fn test_normalize_to_alpha2_withPart3Codes_shouldReturnPart1() {
    assert_eq!(normalize_to_alpha2("eng").unwrap(), "en");
    assert_eq!(normalize_to_alpha2("por").unwrap(), "pt");
    assert_eq!(normalize_to_alpha2("fr").unwrap(), "fr");
}

/// Test the uppercase English names stored on translation records
#[test]
fn test_language_name_withValidCodes_shouldReturnUppercaseName() {
    assert_eq!(language_name("fr").unwrap(), "FRENCH");
    assert_eq!(language_name("eng").unwrap(), "ENGLISH");
    assert_eq!(language_name("pt").unwrap(), "PORTUGUESE");
}

/// Test pair construction, normalization and accessors
#[test]
fn test_language_pair_withMixedCodeForms_shouldNormalizeBothSides() {
    let pair = LanguagePair::new("fr", "ENG").unwrap();
    assert_eq!(pair.source(), "fra");
    assert_eq!(pair.target(), "eng");
    assert_eq!(pair.to_string(), "fra-eng");
    assert_eq!(pair.source_name().unwrap(), "FRENCH");
    assert_eq!(pair.target_name().unwrap(), "ENGLISH");

    let inverse = pair.inverse();
    assert_eq!(inverse.source(), "eng");
    assert_eq!(inverse.target(), "fra");
}

/// Test that a pair whose sides normalize to the same language is rejected
#[test]
fn test_language_pair_withDegenerateSides_shouldReturnError() {
    assert!(matches!(
        LanguagePair::new("en", "eng"),
        Err(EngineError::DegeneratePair(_, _))
    ));
    assert!(matches!(
        LanguagePair::new("fra", "fra"),
        Err(EngineError::DegeneratePair(_, _))
    ));
}
