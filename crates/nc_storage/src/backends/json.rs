//! Result store backed by two JSON documents in a data directory.
//!
//! ```text
//! data_dir/
//! ├── narratives.json              # latest clustering, no summaries
//! ├── summarized_narratives.json   # summary state, checkpointed per batch
//! └── summarize.lock               # present while a run holds the lock
//! ```
//!
//! Every write replaces the whole document. Content goes to a sibling temp
//! file first and is renamed over the target, so a crash mid-write leaves
//! the previous checkpoint readable.

use async_trait::async_trait;
use chrono::Utc;
use nc_core::{Error, NarrativeSet, NarrativeStore, Result, RunLock, SummaryState};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

pub const NARRATIVES_FILE: &str = "narratives.json";
pub const SUMMARIES_FILE: &str = "summarized_narratives.json";
pub const LOCK_FILE: &str = "summarize.lock";

#[derive(Debug, Clone)]
pub struct JsonConfig {
    pub dir: PathBuf,
    /// A lock file older than this is assumed to belong to a dead run.
    pub stale_after: Duration,
}

impl JsonConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            stale_after: Duration::from_secs(30 * 60),
        }
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }
}

#[derive(Debug, Clone)]
pub struct JsonStore {
    config: JsonConfig,
}

impl JsonStore {
    #[instrument(level = "info", skip_all, fields(dir = %config.dir.display()))]
    pub async fn open(config: JsonConfig) -> Result<Self> {
        fs::create_dir_all(&config.dir).await.map_err(|e| {
            Error::Persistence(format!("cannot create {}: {}", config.dir.display(), e))
        })?;
        info!("Opened JSON narrative store");
        Ok(Self { config })
    }

    fn path(&self, file: &str) -> PathBuf {
        self.config.dir.join(file)
    }

    async fn read_document(&self, file: &str) -> Result<Option<NarrativeSet>> {
        let path = self.path(file);
        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Persistence(format!("cannot read {}: {}", path.display(), e)))
            }
        };
        let document = serde_json::from_str(&text).map_err(|e| {
            Error::Persistence(format!("{} is not a narratives document: {}", path.display(), e))
        })?;
        Ok(Some(document))
    }

    async fn write_document(&self, file: &str, document: &NarrativeSet) -> Result<()> {
        let path = self.path(file);
        let json = serde_json::to_string_pretty(document)?;
        let tmp = path.with_extension("json.tmp");

        fs::write(&tmp, json)
            .await
            .map_err(|e| Error::Persistence(format!("cannot write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &path).await.map_err(|e| {
            Error::Persistence(format!("cannot replace {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Wrote document");
        Ok(())
    }

    async fn try_create_lock(&self, path: &Path, token: &str) -> std::io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;
        file.write_all(lock_contents(token).as_bytes()).await
    }

    async fn is_stale(&self, path: &Path) -> bool {
        let modified = match fs::metadata(path).await.and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => return false,
        };
        SystemTime::now()
            .duration_since(modified)
            .map(|age| age > self.config.stale_after)
            .unwrap_or(false)
    }
}

fn lock_contents(token: &str) -> String {
    serde_json::json!({
        "token": token,
        "pid": std::process::id(),
        "refreshed_at": Utc::now().to_rfc3339(),
    })
    .to_string()
}

/// Token recorded in a lock file, if it is readable.
fn lock_owner(text: &str) -> Option<String> {
    let owner: serde_json::Value = serde_json::from_str(text).ok()?;
    owner.get("token")?.as_str().map(str::to_string)
}

/// Removes the lock file when the run ends, unless another run took it over.
#[derive(Debug)]
struct LockFile {
    path: PathBuf,
    token: String,
}

impl LockFile {
    fn owned(&self, text: &str) -> bool {
        lock_owner(text).as_deref() == Some(self.token.as_str())
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if self.owned(&text) => {
                if let Err(e) = std::fs::remove_file(&self.path) {
                    warn!(path = %self.path.display(), error = %e, "Failed to release run lock");
                }
            }
            Ok(_) => warn!(path = %self.path.display(), "Run lock was taken over, leaving it in place"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to read run lock"),
        }
    }
}

#[async_trait]
impl NarrativeStore for JsonStore {
    async fn load_narratives(&self) -> Result<Option<NarrativeSet>> {
        self.read_document(NARRATIVES_FILE).await
    }

    async fn save_narratives(&self, narratives: &NarrativeSet) -> Result<()> {
        self.write_document(NARRATIVES_FILE, narratives).await
    }

    async fn load_summaries(&self) -> Result<Option<SummaryState>> {
        self.read_document(SUMMARIES_FILE).await
    }

    async fn save_summaries(&self, state: &SummaryState) -> Result<()> {
        self.write_document(SUMMARIES_FILE, state).await
    }

    async fn reset_summaries(&self) -> Result<()> {
        let path = self.path(SUMMARIES_FILE);
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!(path = %path.display(), "Reset summary state");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Persistence(format!("cannot remove {}: {}", path.display(), e))),
        }
    }

    async fn lock(&self) -> Result<RunLock> {
        let path = self.path(LOCK_FILE);
        let token = format!("{}-{:016x}", std::process::id(), rand::random::<u64>());
        for attempt in 0..2 {
            match self.try_create_lock(&path, &token).await {
                Ok(()) => {
                    debug!(path = %path.display(), "Acquired run lock");
                    return Ok(RunLock::new(LockFile { path, token }));
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if attempt == 0 && self.is_stale(&path).await {
                        warn!(path = %path.display(), "Reclaiming stale run lock");
                        // another invoker may have reclaimed it first
                        let _ = fs::remove_file(&path).await;
                        continue;
                    }
                    return Err(Error::RunInProgress);
                }
                Err(e) => {
                    return Err(Error::Persistence(format!(
                        "cannot create {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }
        Err(Error::RunInProgress)
    }

    async fn heartbeat(&self, lock: &RunLock) -> Result<()> {
        let Some(file) = lock.guard::<LockFile>() else {
            return Err(Error::Persistence("run lock does not belong to this store".to_string()));
        };
        let text = match fs::read_to_string(&file.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(Error::Persistence(format!(
                    "cannot read {}: {}",
                    file.path.display(),
                    e
                )))
            }
        };
        if !file.owned(&text) {
            warn!(path = %file.path.display(), "Run lock lost to another invoker");
            return Err(Error::RunInProgress);
        }
        fs::write(&file.path, lock_contents(&file.token)).await.map_err(|e| {
            Error::Persistence(format!("cannot refresh {}: {}", file.path.display(), e))
        })
    }
}
