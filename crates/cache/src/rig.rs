//! The rigged-artifact cache.
//!
//! Memory-first: a map of session id to entry serves every read, and a
//! per-session file pair on disk (binary plus JSON sidecar) lets entries
//! survive a restart. The memory map is authoritative for this process;
//! disk writes that fail demote the entry to memory-only rather than
//! failing the rig.

use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use armature_core::{GlbAnalysis, RigOutcome, SessionId};
use bytes::Bytes;
use time::OffsetDateTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::entry::{CachedRig, RigSidecar};
use crate::error::CacheResult;

/// Extension for cached rig binaries.
const BINARY_EXT: &str = "glb";
/// Extension for sidecar records.
const SIDECAR_EXT: &str = "json";

/// Session-keyed cache of rigged artifacts.
///
/// Mutations (put, delete, eviction) serialize on the internal write lock,
/// including their disk mirror work, so a sweep can never interleave with
/// a save into torn state. Reads take the lock only long enough to clone
/// the entry.
pub struct RigCache {
    dir: PathBuf,
    entries: RwLock<HashMap<SessionId, CachedRig>>,
}

impl RigCache {
    /// Open a cache rooted at `dir`, creating the directory if needed.
    ///
    /// Entries left by a previous process are not scanned eagerly; they are
    /// reloaded on first access and reaped by the expiry sweep.
    pub async fn open(dir: impl AsRef<Path>) -> CacheResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            entries: RwLock::new(HashMap::new()),
        })
    }

    fn binary_path(&self, session_id: SessionId) -> PathBuf {
        self.dir.join(format!("{session_id}.{BINARY_EXT}"))
    }

    fn sidecar_path(&self, session_id: SessionId) -> PathBuf {
        self.dir.join(format!("{session_id}.{SIDECAR_EXT}"))
    }

    /// Insert or replace the entry for a session.
    ///
    /// The disk mirror is written first so a reader never finds a sidecar
    /// ahead of its binary; a mirror failure is logged and the entry is
    /// kept in memory anyway.
    #[instrument(skip(self, entry), fields(session_id = %entry.session_id))]
    pub async fn put(&self, entry: CachedRig) {
        let mut entries = self.entries.write().await;
        if let Err(error) = self.persist(&entry).await {
            warn!(%error, "cache mirror write failed; entry is memory-only");
        }
        entries.insert(entry.session_id, entry);
    }

    async fn persist(&self, entry: &CachedRig) -> CacheResult<()> {
        let sidecar = serde_json::to_vec_pretty(&RigSidecar::of(entry))?;
        write_atomic(&self.binary_path(entry.session_id), &entry.buffer).await?;
        write_atomic(&self.sidecar_path(entry.session_id), &sidecar).await?;
        Ok(())
    }

    /// Look up a session, falling back to the disk mirror on a memory miss.
    ///
    /// A disk hit repopulates the memory map. If a concurrent `put` raced
    /// us there, its entry wins over the reloaded one.
    pub async fn get(&self, session_id: SessionId) -> Option<CachedRig> {
        if let Some(entry) = self.entries.read().await.get(&session_id) {
            return Some(entry.clone());
        }
        let reloaded = self.load_from_disk(session_id).await?;
        debug!(%session_id, "rig entry reloaded from disk");
        let mut entries = self.entries.write().await;
        Some(entries.entry(session_id).or_insert(reloaded).clone())
    }

    async fn load_from_disk(&self, session_id: SessionId) -> Option<CachedRig> {
        let buffer = match fs::read(self.binary_path(session_id)).await {
            Ok(data) => Bytes::from(data),
            Err(error) if error.kind() == ErrorKind::NotFound => return None,
            Err(error) => {
                warn!(%session_id, %error, "failed to read cached rig binary");
                return None;
            }
        };
        match fs::read(self.sidecar_path(session_id)).await {
            Ok(raw) => match serde_json::from_slice::<RigSidecar>(&raw) {
                Ok(sidecar) if sidecar.session_id == session_id => {
                    Some(sidecar.into_entry(buffer))
                }
                Ok(sidecar) => {
                    warn!(
                        %session_id,
                        recorded = %sidecar.session_id,
                        "sidecar names a different session; treating it as lost"
                    );
                    Some(self.bare_entry(session_id, buffer).await)
                }
                Err(error) => {
                    warn!(%session_id, %error, "unreadable sidecar; metadata is lost");
                    Some(self.bare_entry(session_id, buffer).await)
                }
            },
            Err(_) => Some(self.bare_entry(session_id, buffer).await),
        }
    }

    /// Reconstruct what little is knowable from a bare binary: the buffer
    /// and its length. Counts come back zeroed and the owner unset, which
    /// fails any later ownership check rather than passing it.
    async fn bare_entry(&self, session_id: SessionId, buffer: Bytes) -> CachedRig {
        let created_at = fs::metadata(self.binary_path(session_id))
            .await
            .ok()
            .and_then(|meta| meta.modified().ok())
            .map(OffsetDateTime::from)
            .unwrap_or_else(OffsetDateTime::now_utc);
        let byte_length = buffer.len() as u64;
        CachedRig {
            session_id,
            owner_id: Uuid::nil(),
            buffer,
            analysis: GlbAnalysis {
                actual_byte_length: byte_length,
                ..GlbAnalysis::default()
            },
            outcome: RigOutcome::default(),
            tier_used: String::new(),
            original_byte_size: 0,
            rigged_byte_size: byte_length,
            created_at,
        }
    }

    /// Remove a session's entry and its files. Missing pieces are fine;
    /// the operation is idempotent.
    #[instrument(skip(self))]
    pub async fn delete(&self, session_id: SessionId) {
        let mut entries = self.entries.write().await;
        entries.remove(&session_id);
        self.remove_files(session_id).await;
    }

    async fn remove_files(&self, session_id: SessionId) {
        for path in [self.binary_path(session_id), self.sidecar_path(session_id)] {
            if let Err(error) = fs::remove_file(&path).await
                && error.kind() != ErrorKind::NotFound
            {
                warn!(
                    %session_id,
                    path = %path.display(),
                    %error,
                    "failed to remove cache file"
                );
            }
        }
    }

    /// Drop every entry older than `max_age`, from memory and disk.
    ///
    /// Also sweeps disk pairs with no memory entry (left by a previous
    /// process) so a restart does not leak files forever. Returns how many
    /// sessions were evicted.
    #[instrument(skip(self))]
    pub async fn evict_expired(&self, max_age: StdDuration) -> usize {
        let max_age = time::Duration::try_from(max_age).unwrap_or(time::Duration::MAX);
        let Some(cutoff) = OffsetDateTime::now_utc().checked_sub(max_age) else {
            return 0;
        };

        let mut entries = self.entries.write().await;
        let expired: Vec<SessionId> = entries
            .iter()
            .filter(|(_, entry)| entry.created_at <= cutoff)
            .map(|(id, _)| *id)
            .collect();
        for session_id in &expired {
            entries.remove(session_id);
            self.remove_files(*session_id).await;
        }

        let mut evicted: HashSet<SessionId> = expired.into_iter().collect();
        self.sweep_orphans(&entries, cutoff, &mut evicted).await;

        if !evicted.is_empty() {
            debug!(count = evicted.len(), "evicted expired rig entries");
        }
        evicted.len()
    }

    /// Walk the cache directory and reap stale file pairs that no live
    /// entry claims.
    async fn sweep_orphans(
        &self,
        live: &HashMap<SessionId, CachedRig>,
        cutoff: OffsetDateTime,
        evicted: &mut HashSet<SessionId>,
    ) {
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(error) => {
                warn!(%error, "failed to scan cache directory");
                return;
            }
        };
        let mut seen: HashSet<SessionId> = HashSet::new();
        loop {
            let dir_entry = match dir.next_entry().await {
                Ok(Some(dir_entry)) => dir_entry,
                Ok(None) => break,
                Err(error) => {
                    warn!(%error, "failed to walk cache directory");
                    break;
                }
            };
            let Some(session_id) = session_for_path(&dir_entry.path()) else {
                continue;
            };
            if live.contains_key(&session_id)
                || evicted.contains(&session_id)
                || !seen.insert(session_id)
            {
                continue;
            }
            if self.orphan_created_at(session_id).await <= cutoff {
                self.remove_files(session_id).await;
                evicted.insert(session_id);
            }
        }
    }

    /// Best-effort age of an orphaned pair: the sidecar's recorded time,
    /// or the binary's mtime when the sidecar is missing or unreadable.
    async fn orphan_created_at(&self, session_id: SessionId) -> OffsetDateTime {
        if let Ok(raw) = fs::read(self.sidecar_path(session_id)).await
            && let Ok(sidecar) = serde_json::from_slice::<RigSidecar>(&raw)
        {
            return sidecar.created_at;
        }
        for path in [self.binary_path(session_id), self.sidecar_path(session_id)] {
            if let Ok(meta) = fs::metadata(&path).await
                && let Ok(modified) = meta.modified()
            {
                return OffsetDateTime::from(modified);
            }
        }
        OffsetDateTime::now_utc()
    }

    /// Re-mirror every live entry to disk. Called once at shutdown so
    /// entries whose earlier mirror write failed get a second chance.
    pub async fn flush(&self) {
        let entries = self.entries.read().await;
        for entry in entries.values() {
            if let Err(error) = self.persist(entry).await {
                warn!(
                    session_id = %entry.session_id,
                    %error,
                    "final cache flush failed for entry"
                );
            }
        }
    }

    /// Number of live in-memory entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// True when no entries are live in memory.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl std::fmt::Debug for RigCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RigCache").field("dir", &self.dir).finish()
    }
}

/// Parse the session id out of a cache file path, for either half of the
/// pair. Foreign files are ignored.
fn session_for_path(path: &Path) -> Option<SessionId> {
    let ext = path.extension()?.to_str()?;
    if ext != BINARY_EXT && ext != SIDECAR_EXT {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    SessionId::parse(stem).ok()
}

/// Write `data` to `path` through a uniquely named temp file in the same
/// directory, fsync, then rename into place. Readers see either the old
/// content or the new, never a partial write.
async fn write_atomic(path: &Path, data: &[u8]) -> CacheResult<()> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("entry");
    let temp_path = path.with_file_name(format!("{}.tmp.{}", file_name, Uuid::new_v4()));

    let mut file = fs::File::create(&temp_path).await?;
    if let Err(error) = async {
        file.write_all(data).await?;
        file.sync_all().await?;
        Ok::<_, std::io::Error>(())
    }
    .await
    {
        drop(file);
        let _ = fs::remove_file(&temp_path).await;
        return Err(error.into());
    }
    drop(file);

    if let Err(error) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(error.into());
    }
    Ok(())
}
