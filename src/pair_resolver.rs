use std::collections::BTreeSet;

use log::debug;

use crate::errors::{EngineError, InterpreterError};
use crate::interpreters::Interpreter;
use crate::language_utils::LanguagePair;

/// Language pair resolution
///
/// Given a requested pair and an interpreter, decide whether a direct path
/// exists or compute a two-hop path through an intermediary language. The
/// automatic intermediary search is deterministic: candidates are scanned
/// in lexicographic order of their canonical code, so retries and
/// distributed replays always make the same choice.
/// The path a translation job will take through an interpreter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationRoute {
    /// The backend supports the requested pair directly
    Direct(LanguagePair),
    /// Two sequential hops through an intermediary language
    Pivot {
        /// source -> intermediary
        first: LanguagePair,
        /// intermediary -> target
        second: LanguagePair,
    },
}

impl TranslationRoute {
    /// The intermediary language code, when the route has one
    pub fn intermediary(&self) -> Option<&str> {
        match self {
            TranslationRoute::Direct(_) => None,
            TranslationRoute::Pivot { first, .. } => Some(first.target()),
        }
    }

    /// The end-to-end pair this route translates
    pub fn requested_pair(&self) -> LanguagePair {
        match self {
            TranslationRoute::Direct(pair) => pair.clone(),
            TranslationRoute::Pivot { first, second } => {
                LanguagePair::new(first.source(), second.target())
                    .expect("pivot endpoints form a valid pair")
            }
        }
    }
}

/// Resolve the route for a pair, preferring direct over two-hop
pub async fn resolve(
    interpreter: &dyn Interpreter,
    pair: &LanguagePair,
    intermediary: Option<&str>,
) -> Result<TranslationRoute, EngineError> {
    if interpreter.supports(pair).await? {
        return Ok(TranslationRoute::Direct(pair.clone()));
    }

    match intermediary {
        Some(code) => resolve_explicit(interpreter, pair, code).await,
        None => resolve_searched(interpreter, pair).await,
    }
}

/// Verify an operator-supplied intermediary
async fn resolve_explicit(
    interpreter: &dyn Interpreter,
    pair: &LanguagePair,
    intermediary: &str,
) -> Result<TranslationRoute, EngineError> {
    let code = crate::language_utils::normalize_code(intermediary)?;

    // An intermediary equal to either endpoint cannot form two hops
    if code == pair.source() || code == pair.target() {
        return Err(EngineError::PairNotAvailable(pair.to_string()));
    }

    let first = LanguagePair::new(pair.source(), &code)?;
    let second = LanguagePair::new(&code, pair.target())?;

    if interpreter.supports(&first).await? && interpreter.supports(&second).await? {
        debug!("Resolved pair {} through explicit intermediary {}", pair, code);
        return Ok(TranslationRoute::Pivot { first, second });
    }

    Err(EngineError::PairNotAvailable(pair.to_string()))
}

/// Search the interpreter's pair set for any workable intermediary
async fn resolve_searched(
    interpreter: &dyn Interpreter,
    pair: &LanguagePair,
) -> Result<TranslationRoute, EngineError> {
    let supported = interpreter.supported_pairs().await?;

    // BTreeSet keeps candidates lexicographically sorted, which is what
    // makes the choice stable across runs and processes
    let from_source: BTreeSet<&str> = supported
        .iter()
        .filter(|p| p.source() == pair.source())
        .map(|p| p.target())
        .collect();
    let into_target: BTreeSet<&str> = supported
        .iter()
        .filter(|p| p.target() == pair.target())
        .map(|p| p.source())
        .collect();

    let candidate = from_source
        .intersection(&into_target)
        .copied()
        .find(|m| *m != pair.source() && *m != pair.target());

    match candidate {
        Some(code) => {
            debug!("Resolved pair {} through searched intermediary {}", pair, code);
            let first = LanguagePair::new(pair.source(), code)?;
            let second = LanguagePair::new(code, pair.target())?;
            Ok(TranslationRoute::Pivot { first, second })
        }
        None => Err(EngineError::PairNotAvailable(pair.to_string())),
    }
}

/// Execute a route sequentially on a single interpreter.
///
/// A failure on either leg aborts the whole translation; no partial output
/// escapes.
pub async fn translate_route(
    interpreter: &dyn Interpreter,
    route: &TranslationRoute,
    text: &str,
) -> Result<String, InterpreterError> {
    match route {
        TranslationRoute::Direct(pair) => interpreter.translate(text, pair).await,
        TranslationRoute::Pivot { first, second } => {
            let relayed = interpreter.translate(text, first).await?;
            interpreter.translate(&relayed, second).await
        }
    }
}
