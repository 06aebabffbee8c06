//! Bounds cache.
//!
//! Persisted as a flat JSON object keyed by `"<plugin>::<group>"`:
//!
//! ```text
//! {
//!   "Right Banner::Alerts": {
//!     "last_visible": { "min_x": 810.0, "min_y": 0.0, "max_x": 1110.0, "max_y": 60.0 },
//!     "max_seen":     { "min_x": 780.0, "min_y": 0.0, "max_x": 1140.0, "max_y": 90.0 }
//!   }
//! }
//! ```
//!
//! Only the render tick writes this file. The configuration tool reads it
//! and may reset it by deleting or truncating the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::{GroupKey, PreviewBoxMode};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{HudResult, ResultExt};
use crate::geometry::{Bounds, SurfaceSpace};
use crate::storage::{atomic_write_json, file_stamp, FileStamp};

/// Cached bounds of one group, in surface pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(default)]
    pub last_visible: Option<Bounds<SurfaceSpace>>,
    /// Union of every visible box since the last reset; never shrinks.
    #[serde(default)]
    pub max_seen: Option<Bounds<SurfaceSpace>>,
}

#[derive(Debug)]
pub struct BoundsCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, CacheEntry>,
    dirty: bool,
    flush_interval: Duration,
    last_flush: Option<Instant>,
    /// Stamp of the file as this cache last wrote it.
    written: Option<FileStamp>,
}

impl BoundsCache {
    /// Cache without a backing file.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: BTreeMap::new(),
            dirty: false,
            flush_interval: Duration::ZERO,
            last_flush: None,
            written: None,
        }
    }

    /// Load the cache at `path`. Missing, empty, or corrupt files yield an
    /// empty cache; corruption is reported as a runtime diagnostic.
    pub fn load(path: &Path, flush_interval: Duration, diagnostics: &Diagnostics) -> Self {
        let mut cache = Self {
            path: Some(path.to_path_buf()),
            flush_interval,
            ..Self::in_memory()
        };

        match std::fs::read_to_string(path) {
            Ok(text) if text.trim().is_empty() => {}
            Ok(text) => match serde_json::from_str::<BTreeMap<String, CacheEntry>>(&text) {
                Ok(entries) => {
                    log::debug!(
                        "[BOUNDS] Loaded {} entries from {}",
                        entries.len(),
                        path.display()
                    );
                    cache.entries = entries;
                    cache.written = file_stamp(path);
                }
                Err(e) => diagnostics.report(
                    DiagnosticKind::Runtime,
                    format!("bounds cache {} unreadable, starting empty: {}", path.display(), e),
                ),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => diagnostics.report(
                DiagnosticKind::Runtime,
                format!("bounds cache {} unreadable, starting empty: {}", path.display(), e),
            ),
        }
        cache
    }

    pub fn set_flush_interval(&mut self, interval: Duration) {
        self.flush_interval = interval;
    }

    /// Record one tick's observation of a group.
    ///
    /// Nothing changes when the group is not visible, so a cleared group
    /// keeps the box it had just before clearing.
    pub fn record(&mut self, key: &GroupKey, bbox: Bounds<SurfaceSpace>, visible_now: bool) {
        if !visible_now || bbox.is_empty() {
            return;
        }
        let entry = self.entries.entry(key.cache_key()).or_default();

        if entry.last_visible != Some(bbox) {
            entry.last_visible = Some(bbox);
            self.dirty = true;
        }
        let max_seen = entry.max_seen.map_or(bbox, |seen| seen.union(&bbox));
        if entry.max_seen != Some(max_seen) {
            entry.max_seen = Some(max_seen);
            self.dirty = true;
        }
    }

    /// Box to show for `key` under `mode`, if one was ever recorded.
    pub fn effective_bbox(&self, key: &GroupKey, mode: PreviewBoxMode) -> Option<Bounds<SurfaceSpace>> {
        let entry = self.entries.get(&key.cache_key())?;
        match mode {
            PreviewBoxMode::Last => entry.last_visible,
            PreviewBoxMode::Max => entry.max_seen,
        }
    }

    pub fn entry(&self, key: &GroupKey) -> Option<&CacheEntry> {
        self.entries.get(&key.cache_key())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget one group, or every group when `key` is None.
    pub fn reset(&mut self, key: Option<&GroupKey>) {
        let removed = match key {
            Some(key) => usize::from(self.entries.remove(&key.cache_key()).is_some()),
            None => {
                let count = self.entries.len();
                self.entries.clear();
                count
            }
        };
        log::info!("[BOUNDS] Reset {} entries", removed);
        self.dirty = true;
    }

    /// Clear memory if the file this cache wrote was deleted or truncated.
    ///
    /// Returns true when an external reset was detected.
    pub fn sync_external_reset(&mut self) -> bool {
        let (Some(path), Some(_)) = (&self.path, self.written) else {
            return false;
        };
        let reset = match file_stamp(path) {
            None => true,
            Some(stamp) => stamp.len == 0,
        };
        if reset {
            log::info!("[BOUNDS] {} was reset externally", path.display());
            self.entries.clear();
            self.written = None;
            self.dirty = false;
        }
        reset
    }

    /// Write if dirty and the flush interval has elapsed since the last write.
    pub fn flush_if_due(&mut self, now: Instant) -> HudResult<bool> {
        if !self.dirty {
            return Ok(false);
        }
        if let Some(last) = self.last_flush {
            if now.saturating_duration_since(last) < self.flush_interval {
                return Ok(false);
            }
        }
        self.write(now)
    }

    /// Write now if dirty, ignoring the flush interval.
    pub fn flush(&mut self) -> HudResult<bool> {
        if !self.dirty {
            return Ok(false);
        }
        self.write(Instant::now())
    }

    fn write(&mut self, now: Instant) -> HudResult<bool> {
        let Some(path) = &self.path else {
            self.dirty = false;
            return Ok(false);
        };
        atomic_write_json(path, &self.entries)
            .with_context(|| format!("writing bounds cache {}", path.display()))?;
        self.written = file_stamp(path);
        self.dirty = false;
        self.last_flush = Some(now);
        log::trace!("[BOUNDS] Flushed {} entries", self.entries.len());
        Ok(true)
    }
}
