/*!
 * Translation backend implementations.
 *
 * This module contains the `Interpreter` capability contract and its
 * concrete variants:
 * - `Argos`: neural backend served over HTTP
 * - `Apertium`: rule-based backend shelling out to the apertium toolchain
 * - `Mock`: deterministic in-process backend for tests
 */

use std::sync::Arc;

use async_trait::async_trait;
use std::fmt::Debug;

use crate::app_config::{Backend, Config};
use crate::errors::InterpreterError;
use crate::language_utils::LanguagePair;

pub mod apertium;
pub mod argos;
pub mod mock;
pub mod pack_lock;

pub use apertium::Apertium;
pub use argos::Argos;
pub use mock::Mock;

/// Capability contract implemented by every translation backend.
///
/// `supports` and `supported_pairs` are pure capability queries and never
/// download anything; lazy acquisition of language packs happens inside
/// `translate`, guarded by a per-pair pack lock so concurrent workers
/// don't race on the same on-disk model.
#[async_trait]
pub trait Interpreter: Send + Sync + Debug {
    /// Stable identifier stored in translation records
    fn label(&self) -> &'static str;

    /// Every language pair this backend can currently translate
    async fn supported_pairs(&self) -> Result<Vec<LanguagePair>, InterpreterError>;

    /// Whether this backend can translate the given pair
    async fn supports(&self, pair: &LanguagePair) -> Result<bool, InterpreterError> {
        Ok(self.supported_pairs().await?.contains(pair))
    }

    /// Translate text along a single pair
    ///
    /// # Errors
    /// * `UnsupportedPair` when the pair is not available to this backend
    /// * `BackendUnavailable` when the underlying runtime is missing or
    ///   unreachable
    async fn translate(&self, text: &str, pair: &LanguagePair)
        -> Result<String, InterpreterError>;
}

/// Build the interpreter selected by the configuration
pub fn create_interpreter(config: &Config) -> Result<Arc<dyn Interpreter>, InterpreterError> {
    Ok(match config.backend {
        Backend::Argos => Arc::new(Argos::new(&config.backend_endpoint)),
        Backend::Apertium => Arc::new(Apertium::new(&config.data_dir)),
        Backend::Mock => Arc::new(Mock::empty()),
    })
}
