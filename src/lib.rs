//! Payload transform and grouping engine for a fixed-canvas HUD overlay.
//!
//! Plugins address a legacy 1280×960 virtual canvas. The engine attributes
//! each payload to a plugin group, lays groups out (offset, anchor,
//! justification, scaling, overflow nudging), expires payloads by TTL, and
//! keeps a persisted per-group bounds cache for the configuration tool.
//!
//! Entry points are [`OverlayEngine`] for the producer path and single
//! ticks, and [`render_loop::spawn_render_loop`] for a periodic driver.

pub mod bounds;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod payload;
pub mod render_loop;
pub mod resolver;
pub mod storage;
pub mod style;

pub use config::{ConfigStore, GroupKey, GroupingPaths, GroupingSnapshot, OverlaySettings, ScaleMode};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use engine::{EnginePaths, OverlayEngine};
pub use error::{HudError, HudResult};
pub use layout::FrameOutput;
pub use resolver::{classify, Classification};
