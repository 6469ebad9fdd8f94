use std::collections::HashSet;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context as _;

use crate::foundation::error::{PianoError, PianoResult};
use crate::frames::sequencer::ActiveNotes;
use crate::render::backend::FrameRasterizer;

/// Key of the frame with no highlighted key.
pub const SILENCE_KEY: &str = "silence";

/// Content key of a frame: its active notes and colors in ascending note order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FrameCacheKey(String);

impl FrameCacheKey {
    pub fn from_active(active: &ActiveNotes) -> Self {
        if active.is_empty() {
            return Self(SILENCE_KEY.to_owned());
        }
        let mut s = String::with_capacity(active.len() * 11);
        for (i, (note, color)) in active.iter().enumerate() {
            if i > 0 {
                s.push('-');
            }
            let _ = write!(s, "{note}{color}");
        }
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn digest(&self) -> u128 {
        xxhash_rust::xxh3::xxh3_128(self.0.as_bytes())
    }

    pub fn file_stem(&self) -> String {
        format!("{:032x}", self.digest())
    }
}

impl std::fmt::Display for FrameCacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub lookups: u64,
    pub hits: u64,
    /// Rasterized frames this cache wrote to disk.
    pub renders: u64,
    /// Renders thrown away because another writer stored the key first.
    pub discarded: u64,
}

/// Outcome of [`FrameCache::store`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredFrame {
    pub path: PathBuf,
    /// False when the file already existed and the given bytes were dropped.
    pub written: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedFrame {
    pub key: FrameCacheKey,
    pub path: PathBuf,
    pub cache_hit: bool,
}

/// Content-addressed PNG store: `<root>/<first two hex digits>/<xxh3 of key>.png`.
///
/// Append-only. Safe to share between threads.
#[derive(Debug)]
pub struct FrameCache {
    root: PathBuf,
    known: Mutex<HashSet<u128>>,
    lookups: AtomicU64,
    hits: AtomicU64,
    renders: AtomicU64,
    discarded: AtomicU64,
}

impl FrameCache {
    pub fn new(root: impl Into<PathBuf>) -> PianoResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("create frame cache dir '{}'", root.display()))?;
        Ok(Self {
            root,
            known: Mutex::new(HashSet::new()),
            lookups: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            renders: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &FrameCacheKey) -> PathBuf {
        let stem = key.file_stem();
        self.root.join(&stem[..2]).join(format!("{stem}.png"))
    }

    /// Path of an already stored frame, without rendering.
    pub fn lookup(&self, key: &FrameCacheKey) -> Option<PathBuf> {
        let digest = key.digest();
        let path = self.path_for(key);
        if self.is_known(digest) {
            return Some(path);
        }
        if path.is_file() {
            self.mark_known(digest);
            return Some(path);
        }
        None
    }

    /// Return the stored frame for `active`, rasterizing and storing it on a miss.
    pub fn get_or_render(
        &self,
        active: &ActiveNotes,
        rasterizer: &dyn FrameRasterizer,
    ) -> PianoResult<CachedFrame> {
        let key = FrameCacheKey::from_active(active);
        self.lookups.fetch_add(1, Ordering::Relaxed);

        if let Some(path) = self.lookup(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(CachedFrame {
                key,
                path,
                cache_hit: true,
            });
        }

        tracing::debug!(key = %key, "frame cache miss");
        let frame = rasterizer
            .rasterize(active)
            .map_err(|e| PianoError::render(format!("frame '{key}': {e}")))?;
        let png = frame
            .encode_png()
            .map_err(|e| PianoError::render(format!("frame '{key}': {e}")))?;
        let stored = self.store(&key, &png)?;
        if stored.written {
            self.renders.fetch_add(1, Ordering::Relaxed);
        }

        Ok(CachedFrame {
            key,
            path: stored.path,
            cache_hit: false,
        })
    }

    /// Write `png` under `key` unless it already exists.
    pub fn store(&self, key: &FrameCacheKey, png: &[u8]) -> PianoResult<StoredFrame> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create frame cache shard '{}'", parent.display()))?;
        }

        let written = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(mut f) => {
                f.write_all(png)
                    .with_context(|| format!("write frame '{}'", path.display()))?;
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                self.discarded.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("create frame '{}'", path.display()))
                    .into());
            }
        };
        self.mark_known(key.digest());
        Ok(StoredFrame { path, written })
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            lookups: self.lookups.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            renders: self.renders.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }

    /// Number of distinct frames stored during this run.
    pub fn len(&self) -> usize {
        self.known_set().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_known(&self, digest: u128) -> bool {
        self.known_set().contains(&digest)
    }

    fn mark_known(&self, digest: u128) {
        self.known_set().insert(digest);
    }

    // The set only ever grows, so a guard left by a panicking thread is still valid.
    fn known_set(&self) -> std::sync::MutexGuard<'_, HashSet<u128>> {
        self.known.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cache.rs"]
mod tests;
