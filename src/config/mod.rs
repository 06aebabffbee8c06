//! Configuration: grouping documents and runtime settings.

pub mod groupings;
pub mod settings;
pub mod store;

pub use groupings::{
    Anchor, GroupKey, GroupSpec, GroupingSnapshot, IdPrefix, Justification, MarkerLabelPosition,
    MatchMode, PluginSpec, PreviewBoxMode,
};
pub use settings::{OverlaySettings, ScaleMode};
pub use store::{ConfigLayer, ConfigStore, GroupPatch, GroupRegistration, GroupingPaths};
