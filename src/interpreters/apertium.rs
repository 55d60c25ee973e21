use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use log::{debug, info, warn};
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::errors::InterpreterError;
use crate::language_utils::LanguagePair;

use super::{Interpreter, pack_lock};

/// Rule-based backend shelling out to the apertium toolchain.
///
/// The capability set is what the package repository can provide, not
/// what is already on disk: `apertium-get -l` lists the installable
/// pairs, `apertium -d <dir> -l` the installed ones, and a pair missing
/// locally is downloaded on first `translate`, serialized per pair
/// through the pack lock.
#[derive(Debug)]
pub struct Apertium {
    /// Directory holding installed pair packages
    pack_dir: PathBuf,
    /// Installable pairs, fetched once per engine invocation
    pairs: Mutex<Option<Vec<LanguagePair>>>,
}

/// Parse a pair out of a package or listing name. Package names carry
/// the pair in their last two segments (`apertium-fra-eng` and plain
/// `fra-eng` both read as fra-eng).
fn pair_from_package(name: &str) -> Option<LanguagePair> {
    let mut segments = name.trim().rsplitn(3, '-');
    let target = segments.next()?;
    let source = segments.next()?;
    LanguagePair::new(source, target).ok()
}

impl Apertium {
    /// Create a backend over the given pack directory
    pub fn new(pack_dir: &Path) -> Self {
        Self { pack_dir: pack_dir.to_path_buf(), pairs: Mutex::new(None) }
    }

    /// Resolve an apertium binary, surfacing absence as `BackendUnavailable`
    fn resolve_binary(name: &str) -> Result<PathBuf, InterpreterError> {
        which::which(name).map_err(|_| {
            InterpreterError::BackendUnavailable(format!("'{}' not found in PATH", name))
        })
    }

    async fn run(
        binary: &Path,
        args: &[&str],
        stdin_text: Option<&str>,
    ) -> Result<String, InterpreterError> {
        let mut command = Command::new(binary);
        command.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());
        command.stdin(if stdin_text.is_some() { Stdio::piped() } else { Stdio::null() });

        let mut child = command
            .spawn()
            .map_err(|e| InterpreterError::BackendUnavailable(format!("{:?}: {}", binary, e)))?;

        if let Some(text) = stdin_text {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| InterpreterError::Failed("no stdin handle".to_string()))?;
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| InterpreterError::Failed(format!("stdin write failed: {}", e)))?;
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| InterpreterError::Failed(format!("subprocess failed: {}", e)))?;

        if !output.status.success() {
            return Err(InterpreterError::Failed(format!(
                "{:?} exited with {}: {}",
                binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn installed_pairs(&self) -> Result<Vec<LanguagePair>, InterpreterError> {
        let apertium = Self::resolve_binary("apertium")?;
        let pack_dir = self.pack_dir.to_string_lossy().into_owned();
        let listing = Self::run(&apertium, &["-d", &pack_dir, "-l"], None).await?;

        // One `src-tgt` pair per line; mode variants that don't parse as
        // ISO codes are skipped
        Ok(listing.lines().filter_map(pair_from_package).collect())
    }

    /// Pairs the package repository can provide to this machine
    async fn remote_pairs(&self) -> Result<Vec<LanguagePair>, InterpreterError> {
        let apertium_get = Self::resolve_binary("apertium-get")?;
        let listing = Self::run(&apertium_get, &["-l"], None).await?;

        Ok(listing
            .split_whitespace()
            .filter_map(pair_from_package)
            .collect())
    }

    /// Installable pairs: the repository listing plus whatever is already
    /// on disk, fetched once and cached for the run.
    async fn available_pairs(&self) -> Result<Vec<LanguagePair>, InterpreterError> {
        if let Some(pairs) = self.pairs.lock().as_ref() {
            return Ok(pairs.clone());
        }

        let mut pairs: BTreeSet<LanguagePair> =
            self.installed_pairs().await?.into_iter().collect();
        match self.remote_pairs().await {
            Ok(remote) => pairs.extend(remote),
            // Offline hosts keep translating with what they already have
            Err(e) => warn!("Cannot list installable apertium pairs: {}", e),
        }

        let pairs: Vec<LanguagePair> = pairs.into_iter().collect();
        *self.pairs.lock() = Some(pairs.clone());
        Ok(pairs)
    }

    /// Install a pair package on first use, under the per-pair pack lock
    async fn ensure_pair_installed(&self, pair: &LanguagePair) -> Result<(), InterpreterError> {
        if self.installed_pairs().await?.contains(pair) {
            return Ok(());
        }

        let guard = pack_lock::acquire(&self.pack_dir, pair).await?;
        // Another worker may have finished the install while we waited
        if self.installed_pairs().await?.contains(pair) {
            drop(guard);
            return Ok(());
        }

        info!("Downloading apertium package for pair {}", pair);
        let apertium_get = Self::resolve_binary("apertium-get")?;
        let pack_dir = self.pack_dir.to_string_lossy().into_owned();
        let package = pair.to_string();
        Self::run(&apertium_get, &["-d", &pack_dir, &package], None)
            .await
            .map_err(|e| match e {
                InterpreterError::Failed(_) => InterpreterError::UnsupportedPair(pair.to_string()),
                other => other,
            })?;

        drop(guard);
        debug!("Installed apertium package for pair {}", pair);
        Ok(())
    }
}

#[async_trait]
impl Interpreter for Apertium {
    fn label(&self) -> &'static str {
        "APERTIUM"
    }

    async fn supported_pairs(&self) -> Result<Vec<LanguagePair>, InterpreterError> {
        self.available_pairs().await
    }

    async fn translate(
        &self,
        text: &str,
        pair: &LanguagePair,
    ) -> Result<String, InterpreterError> {
        self.ensure_pair_installed(pair).await?;

        let apertium = Self::resolve_binary("apertium")?;
        let pack_dir = self.pack_dir.to_string_lossy().into_owned();
        let mode = pair.to_string();
        let translated =
            Self::run(&apertium, &["-ud", &pack_dir, &mode], Some(text)).await?;

        Ok(translated)
    }
}
