//! Remembers recently used send keys so retried invocations do not send twice.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const LOCK_RETRY: Duration = Duration::from_millis(100);
const LOCK_ATTEMPTS: u32 = 100;
const STALE_LOCK: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct IdempotencyLedger {
    path: PathBuf,
    ttl: Duration,
}

/// Held while a key is checked, used, and recorded. Removes the lock file on drop.
#[derive(Debug)]
pub struct LedgerLock {
    path: PathBuf,
}

impl Drop for LedgerLock {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %err, "failed to release ledger lock");
        }
    }
}

impl IdempotencyLedger {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serializes ledger users across processes.
    pub fn lock(&self) -> AppResult<LedgerLock> {
        let path = self.path.with_extension("lock");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        for _ in 0..LOCK_ATTEMPTS {
            match File::create_new(&path) {
                Ok(_) => return Ok(LedgerLock { path }),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    if is_stale(&path) {
                        warn!(path = %path.display(), "removing stale ledger lock");
                        let _ = fs::remove_file(&path);
                        continue;
                    }
                    thread::sleep(LOCK_RETRY);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(AppError::Config(format!(
            "idempotency ledger is locked: {}",
            path.display()
        )))
    }

    /// Whether `key` was recorded within the TTL.
    pub fn contains(&self, key: &str) -> AppResult<bool> {
        let entries = self.load()?;
        let now = unix_now();
        Ok(entries
            .get(&hash_key(key))
            .is_some_and(|recorded| !self.expired(*recorded, now)))
    }

    /// Records `key` as used now and drops expired entries.
    pub fn record(&self, key: &str) -> AppResult<()> {
        let mut entries = self.load()?;
        let now = unix_now();
        entries.retain(|_, recorded| !self.expired(*recorded, now));
        entries.insert(hash_key(key), now);
        debug!(entries = entries.len(), "recording idempotency key");
        self.save(&entries)
    }

    fn expired(&self, recorded: u64, now: u64) -> bool {
        now.saturating_sub(recorded) >= self.ttl.as_secs()
    }

    fn load(&self) -> AppResult<HashMap<String, u64>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self, entries: &HashMap<String, u64>) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let payload = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, payload)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }
}

fn hash_key(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

fn is_stale(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > STALE_LOCK)
}
