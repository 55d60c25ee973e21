/*!
 * Cooperative per-pair lock for language pack installation.
 *
 * First use of a language pair may download a pack into the shared data
 * directory. The lock serializes that download across worker processes:
 * whoever creates `<pair>.lock` first installs, everyone else waits and
 * then finds the pack already present. Pairs lock independently, so
 * throughput across different pairs is unaffected.
 */

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use log::{debug, warn};

use crate::errors::InterpreterError;
use crate::language_utils::LanguagePair;

/// How long to wait for another process to finish installing
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(600);

/// Poll interval while waiting on a held lock
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A lock file older than this is assumed abandoned and reclaimed
const STALE_AFTER: Duration = Duration::from_secs(1800);

/// Guard over an acquired pack lock; the lock file is removed on drop
#[derive(Debug)]
pub struct PackLockGuard {
    path: PathBuf,
}

impl Drop for PackLockGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to release pack lock {:?}: {}", self.path, e);
        }
    }
}

/// Acquire the pack lock for a pair, waiting if another process holds it
pub async fn acquire(dir: &Path, pair: &LanguagePair) -> Result<PackLockGuard, InterpreterError> {
    let path = dir.join(format!("{}.lock", pair));
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| InterpreterError::Failed(format!("cannot create pack dir: {}", e)))?;

    let deadline = tokio::time::Instant::now() + ACQUIRE_TIMEOUT;
    loop {
        match std::fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => {
                debug!("Acquired pack lock for pair {}", pair);
                return Ok(PackLockGuard { path });
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                reclaim_if_stale(&path);
            }
            Err(e) => {
                return Err(InterpreterError::Failed(format!(
                    "cannot create pack lock {:?}: {}",
                    path, e
                )));
            }
        }

        if tokio::time::Instant::now() >= deadline {
            return Err(InterpreterError::PackLockTimeout(pair.to_string()));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Remove a lock file left behind by a crashed installer
fn reclaim_if_stale(path: &Path) {
    let Ok(metadata) = std::fs::metadata(path) else {
        return;
    };
    let Ok(modified) = metadata.modified() else {
        return;
    };
    let age = SystemTime::now().duration_since(modified).unwrap_or_default();
    if age > STALE_AFTER {
        warn!("Reclaiming stale pack lock {:?} (age {}s)", path, age.as_secs());
        let _ = std::fs::remove_file(path);
    }
}
