//! The overlay engine: producer and render-tick entry points.
//!
//! ## Tick order
//!
//! ```text
//! sweep expired ─▶ snapshot config ─▶ classify ─▶ compute_frame ─▶ record bounds ─▶ flush
//! ```
//!
//! The registry lock is held only for the sweep and the copy of the live
//! set; the producer path never waits on layout or disk I/O.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};

use crate::bounds::BoundsCache;
use crate::config::{
    ConfigStore, GroupKey, GroupingPaths, GroupingSnapshot, OverlaySettings, PreviewBoxMode,
};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{HudError, HudResult};
use crate::geometry::{Bounds, Size, SurfaceSpace};
use crate::layout::{compute_frame, EstimatedTextMeasurer, FrameInput, FrameOutput, TextMeasurer};
use crate::payload::{parse_message, MessageAction, PayloadRegistry};
use crate::resolver::classify_all;

#[cfg(test)]
mod tests;

/// Backing files used by the engine.
#[derive(Debug, Clone)]
pub struct EnginePaths {
    pub groupings: GroupingPaths,
    /// Persisted bounds cache; `None` keeps the cache in memory only.
    pub bounds_cache: Option<PathBuf>,
}

impl EnginePaths {
    /// Standard file names under `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            groupings: GroupingPaths {
                shipped: dir.join("overlay_groupings.json"),
                user: Some(dir.join("overlay_groupings.user.json")),
            },
            bounds_cache: Some(dir.join("overlay_group_cache.json")),
        }
    }

    /// Standard file names under the platform config directory.
    pub fn default_location() -> Option<Self> {
        dirs::config_dir()
            .or_else(dirs::data_local_dir)
            .map(|base| Self::in_dir(&base.join("overlay-hud")))
    }
}

pub struct OverlayEngine {
    config: ConfigStore,
    registry: Mutex<PayloadRegistry>,
    bounds: Mutex<BoundsCache>,
    settings: RwLock<OverlaySettings>,
    measurer: Box<dyn TextMeasurer>,
    diagnostics: Diagnostics,
}

impl OverlayEngine {
    /// Load configuration and the bounds cache.
    ///
    /// Fails only when the shipped grouping document is missing or malformed.
    pub fn open(paths: EnginePaths, mut settings: OverlaySettings) -> HudResult<Self> {
        settings.validate();
        let diagnostics = Diagnostics::new(settings.diagnostics_capacity);
        let config = ConfigStore::open(paths.groupings, diagnostics.clone())?;

        let flush_interval = Duration::from_millis(settings.bounds_flush_interval_ms);
        let bounds = match &paths.bounds_cache {
            Some(path) => BoundsCache::load(path, flush_interval, &diagnostics),
            None => BoundsCache::in_memory(),
        };

        log::info!(
            "[ENGINE] Opened with {} plugins, scale mode {:?}",
            config.snapshot().plugins().len(),
            settings.scale_mode
        );

        Ok(Self {
            config,
            registry: Mutex::new(PayloadRegistry::new()),
            bounds: Mutex::new(bounds),
            settings: RwLock::new(settings),
            measurer: Box::new(EstimatedTextMeasurer),
            diagnostics,
        })
    }

    /// Replace the default text measurer with the renderer's own.
    pub fn with_measurer(mut self, measurer: impl TextMeasurer + 'static) -> Self {
        self.measurer = Box::new(measurer);
        self
    }

    // ========================================================================
    // Producer path
    // ========================================================================

    /// Parse and apply one raw inbound message.
    ///
    /// Malformed messages are dropped with a payload diagnostic. Returns
    /// whether the message was applied.
    pub fn ingest_json(&self, json: &str, now: Instant) -> bool {
        let default_ttl = self.settings.read().default_ttl_secs;
        match parse_message(json, default_ttl) {
            Ok(parsed) => {
                for warning in parsed.warnings {
                    self.diagnostics.report(DiagnosticKind::Payload, warning);
                }
                self.ingest(parsed.action, now);
                true
            }
            Err(e) => {
                self.diagnostics
                    .report(DiagnosticKind::Payload, format!("message dropped: {}", e));
                false
            }
        }
    }

    /// Apply an already-parsed message.
    pub fn ingest(&self, action: MessageAction, now: Instant) {
        match action {
            MessageAction::Upsert(payload) => {
                self.registry.lock().upsert(payload, now);
            }
            MessageAction::Clear { id } => {
                let removed = self.registry.lock().clear(&id);
                if !removed {
                    self.diagnostics.report(
                        DiagnosticKind::Payload,
                        HudError::UnknownPayload(id).to_string(),
                    );
                }
            }
        }
    }

    // ========================================================================
    // Render tick
    // ========================================================================

    /// Run one render tick against `surface`.
    ///
    /// An unusable surface size skips the tick with a runtime diagnostic.
    pub fn tick(&self, now: Instant, surface: Size<SurfaceSpace>) -> HudResult<FrameOutput> {
        if !surface.is_valid() {
            let error = HudError::InvalidSurface {
                width: surface.width,
                height: surface.height,
            };
            self.diagnostics
                .report(DiagnosticKind::Runtime, format!("tick skipped: {}", error));
            return Err(error);
        }

        let live = {
            let mut registry = self.registry.lock();
            registry.sweep(now);
            registry.live()
        };

        let snapshot = self.config.snapshot();
        let settings = self.settings.read().clone();
        let classified = classify_all(&live, &snapshot);

        let frame = compute_frame(&FrameInput {
            payloads: &classified,
            snapshot: &snapshot,
            surface,
            settings: &settings,
            measurer: self.measurer.as_ref(),
        });

        self.record_bounds(&frame, &snapshot, now);
        Ok(frame)
    }

    fn record_bounds(&self, frame: &FrameOutput, snapshot: &GroupingSnapshot, now: Instant) {
        let mut bounds = self.bounds.lock();
        bounds.sync_external_reset();

        for key in snapshot.group_keys() {
            match frame.group(&key) {
                Some(group) => bounds.record(&key, group.bounds, true),
                None => bounds.record(&key, Bounds::empty(), false),
            }
        }

        if let Err(e) = bounds.flush_if_due(now) {
            self.diagnostics.report(
                DiagnosticKind::Runtime,
                format!("bounds cache write failed: {}", e),
            );
        }
    }

    // ========================================================================
    // Bounds cache
    // ========================================================================

    /// Preview box for `key` under the group's configured mode.
    pub fn effective_bounds(&self, key: &GroupKey) -> Option<Bounds<SurfaceSpace>> {
        let mode = self
            .config
            .snapshot()
            .group(key)
            .map(|group| group.preview_box_mode)
            .unwrap_or(PreviewBoxMode::Last);
        self.bounds.lock().effective_bbox(key, mode)
    }

    /// Clear cached bounds for one group, or all when `key` is None.
    pub fn reset_bounds(&self, key: Option<&GroupKey>) {
        self.bounds.lock().reset(key);
    }

    /// Write the bounds cache now if it has unsaved changes.
    pub fn flush_bounds(&self) -> HudResult<bool> {
        self.bounds.lock().flush()
    }

    // ========================================================================
    // Configuration and settings
    // ========================================================================

    /// Poll the grouping documents. Call between ticks only.
    pub fn reload_config(&self) -> bool {
        self.config.poll_reload()
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn settings(&self) -> OverlaySettings {
        self.settings.read().clone()
    }

    /// Update settings atomically; values are clamped before they apply.
    pub fn update_settings<F>(&self, update: F)
    where
        F: FnOnce(&mut OverlaySettings),
    {
        let mut settings = self.settings.write();
        update(&mut settings);
        settings.validate();
        self.bounds
            .lock()
            .set_flush_interval(Duration::from_millis(settings.bounds_flush_interval_ms));
        log::debug!("[ENGINE] Settings updated: {:?}", *settings);
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn live_payload_count(&self) -> usize {
        self.registry.lock().len()
    }
}
