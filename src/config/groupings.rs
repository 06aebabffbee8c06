//! Grouping document model.
//!
//! A grouping document maps plugin name → plugin definition:
//!
//! ```text
//! {
//!   "Right Banner": {
//!     "matchingPrefixes": ["right-banner-"],
//!     "idPrefixGroups": {
//!       "Alerts": {
//!         "idPrefixes": ["right-banner-", {"value": "rb-exact", "matchMode": "exact"}],
//!         "idPrefixGroupAnchor": "top",
//!         "offsetX": 0, "offsetY": 12,
//!         "payloadJustification": "center",
//!         "markerLabelPosition": "below",
//!         "controllerPreviewBoxMode": "last",
//!         "backgroundColor": "#80000000",
//!         "backgroundBorderWidth": 2
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Two layers exist (shipped defaults and user overrides). They are merged
//! as raw JSON, user values winning field-by-field, and the merged value is
//! then normalized into an immutable [`GroupingSnapshot`]. Normalization
//! never rejects: bad enum values fall back to defaults and are reported.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HudError, HudResult};
use crate::geometry::{Bounds, Coord};
use crate::style::Color;

/// Maximum group background border width.
pub const MAX_BORDER_WIDTH: f64 = 10.0;

// ============================================================================
// Enumerations
// ============================================================================

/// Reference point of a group's bounding box held stable across layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    #[default]
    Nw,
    Ne,
    Sw,
    Se,
    Center,
    Top,
    Bottom,
    Left,
    Right,
}

impl Anchor {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "nw" => Some(Self::Nw),
            "ne" => Some(Self::Ne),
            "sw" => Some(Self::Sw),
            "se" => Some(Self::Se),
            "center" => Some(Self::Center),
            "top" => Some(Self::Top),
            "bottom" => Some(Self::Bottom),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Anchor::Nw => "nw",
            Anchor::Ne => "ne",
            Anchor::Sw => "sw",
            Anchor::Se => "se",
            Anchor::Center => "center",
            Anchor::Top => "top",
            Anchor::Bottom => "bottom",
            Anchor::Left => "left",
            Anchor::Right => "right",
        }
    }

    /// The anchor's point on `bounds`.
    pub fn point<S: Default + Copy>(&self, bounds: &Bounds<S>) -> Coord<S> {
        let (cx, cy) = (bounds.center_x(), bounds.center_y());
        let (x, y) = match self {
            Anchor::Nw => (bounds.min_x, bounds.min_y),
            Anchor::Ne => (bounds.max_x, bounds.min_y),
            Anchor::Sw => (bounds.min_x, bounds.max_y),
            Anchor::Se => (bounds.max_x, bounds.max_y),
            Anchor::Center => (cx, cy),
            Anchor::Top => (cx, bounds.min_y),
            Anchor::Bottom => (cx, bounds.max_y),
            Anchor::Left => (bounds.min_x, cy),
            Anchor::Right => (bounds.max_x, cy),
        };
        Coord::new(x, y)
    }
}

/// Intra-group horizontal alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Justification {
    #[default]
    Left,
    Center,
    Right,
}

impl Justification {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Justification::Left => "left",
            Justification::Center => "center",
            Justification::Right => "right",
        }
    }
}

/// Where a vector marker's label sits relative to the marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MarkerLabelPosition {
    #[default]
    Below,
    Above,
    Centered,
}

impl MarkerLabelPosition {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "below" => Some(Self::Below),
            "above" => Some(Self::Above),
            "centered" | "center" => Some(Self::Centered),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerLabelPosition::Below => "below",
            MarkerLabelPosition::Above => "above",
            MarkerLabelPosition::Centered => "centered",
        }
    }
}

/// Which cached box the configuration tool previews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PreviewBoxMode {
    #[default]
    Last,
    Max,
}

impl PreviewBoxMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "last" => Some(Self::Last),
            "max" => Some(Self::Max),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PreviewBoxMode::Last => "last",
            PreviewBoxMode::Max => "max",
        }
    }
}

/// How an id prefix entry matches payload ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    StartsWith,
    Exact,
}

impl MatchMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "startswith" | "prefix" => Some(Self::StartsWith),
            "exact" => Some(Self::Exact),
            _ => None,
        }
    }
}

// ============================================================================
// Raw document (one layer, or the merged view)
// ============================================================================

/// Declaration-ordered plugin map as it appears on disk.
pub type RawDocument = IndexMap<String, RawPlugin>;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlugin {
    #[serde(default)]
    pub matching_prefixes: Option<Vec<String>>,
    #[serde(default)]
    pub id_prefix_groups: Option<IndexMap<String, RawGroup>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGroup {
    #[serde(default)]
    pub id_prefixes: Option<Vec<RawPrefix>>,
    #[serde(default)]
    pub id_prefix_group_anchor: Option<String>,
    #[serde(default)]
    pub offset_x: Option<f64>,
    #[serde(default)]
    pub offset_y: Option<f64>,
    #[serde(default)]
    pub payload_justification: Option<String>,
    #[serde(default)]
    pub marker_label_position: Option<String>,
    #[serde(default)]
    pub controller_preview_box_mode: Option<String>,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub background_border_width: Option<f64>,
    #[serde(default)]
    pub nudge_overflow: Option<bool>,
}

/// Either a bare prefix string or `{ value, matchMode }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawPrefix {
    Plain(String),
    Detailed {
        value: String,
        #[serde(default, rename = "matchMode")]
        match_mode: Option<String>,
    },
}

impl RawPrefix {
    pub fn value(&self) -> &str {
        match self {
            RawPrefix::Plain(value) => value,
            RawPrefix::Detailed { value, .. } => value,
        }
    }
}

/// Parse one layer's text into JSON.
///
/// Blank text is an empty layer when `allow_blank` is set (a truncated user
/// document means "no overrides"); otherwise it is malformed.
pub fn parse_layer(text: &str, path: &Path, allow_blank: bool) -> HudResult<Value> {
    if text.trim().is_empty() {
        if allow_blank {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        return Err(HudError::MalformedDocument {
            path: path.display().to_string(),
            reason: "document is empty".to_string(),
        });
    }
    let value: Value = serde_json::from_str(text).map_err(|e| HudError::MalformedDocument {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    validate_layer(&value, path)?;
    Ok(value)
}

/// Check that a layer has the document shape.
pub fn validate_layer(value: &Value, path: &Path) -> HudResult<()> {
    if !value.is_object() {
        return Err(HudError::MalformedDocument {
            path: path.display().to_string(),
            reason: "top level must be an object of plugins".to_string(),
        });
    }
    serde_json::from_value::<RawDocument>(value.clone()).map_err(|e| {
        HudError::MalformedDocument {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    })?;
    Ok(())
}

/// Deep-merge `overlay` onto `base`.
///
/// Objects merge key by key; any other overlay value (including arrays and
/// `null`) replaces the base value. Keys only in `base` are kept, keys only in
/// `overlay` are appended after them.
pub fn merge_layers(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, overlay_value) in overlay_map {
                let value = match base_map.get(key) {
                    Some(base_value) => merge_layers(base_value, overlay_value),
                    None => overlay_value.clone(),
                };
                merged.insert(key.clone(), value);
            }
            Value::Object(merged)
        }
        (_, overlay) => overlay.clone(),
    }
}

// ============================================================================
// Effective (normalized) definitions
// ============================================================================

/// Identity of a group: owning plugin + group name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupKey {
    pub plugin: Arc<str>,
    pub group: Arc<str>,
}

impl GroupKey {
    pub fn new(plugin: &str, group: &str) -> Self {
        Self {
            plugin: Arc::from(plugin),
            group: Arc::from(group),
        }
    }

    /// Flat key used by the persisted bounds cache.
    pub fn cache_key(&self) -> String {
        format!("{}::{}", self.plugin, self.group)
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.plugin, self.group)
    }
}

/// A single normalized id prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdPrefix {
    pub value: String,
    pub match_mode: MatchMode,
    lowered: String,
}

impl IdPrefix {
    pub fn new(value: &str, match_mode: MatchMode) -> Self {
        Self {
            value: value.to_string(),
            match_mode,
            lowered: value.to_lowercase(),
        }
    }

    /// Specificity of a case-insensitive match against an already-lowered id.
    ///
    /// Longer prefixes are more specific; an exact match beats a prefix
    /// match of the same length.
    pub fn specificity(&self, lowered_id: &str) -> Option<(usize, bool)> {
        match self.match_mode {
            MatchMode::Exact if lowered_id == self.lowered => Some((self.lowered.len(), true)),
            MatchMode::StartsWith if lowered_id.starts_with(&self.lowered) => {
                Some((self.lowered.len(), false))
            }
            _ => None,
        }
    }
}

/// Effective definition of one group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSpec {
    pub name: Arc<str>,
    pub id_prefixes: Vec<IdPrefix>,
    pub anchor: Anchor,
    pub offset_x: f64,
    pub offset_y: f64,
    pub justification: Justification,
    pub marker_label_position: MarkerLabelPosition,
    pub preview_box_mode: PreviewBoxMode,
    pub background_color: Option<Color>,
    pub background_border_width: f64,
    pub nudge_overflow: Option<bool>,
}

/// Effective definition of one plugin.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginSpec {
    pub name: Arc<str>,
    /// Lowercased matching prefixes, declaration order.
    pub matching_prefixes: Vec<String>,
    pub groups: Vec<GroupSpec>,
}

impl PluginSpec {
    pub fn matches_id(&self, lowered_id: &str) -> bool {
        self.matching_prefixes
            .iter()
            .any(|prefix| lowered_id.starts_with(prefix.as_str()))
    }
}

/// Immutable, point-in-time view of every plugin and group.
#[derive(Debug, Clone, Default)]
pub struct GroupingSnapshot {
    pub generation: u64,
    plugins: Vec<PluginSpec>,
    index: HashMap<GroupKey, (usize, usize)>,
}

impl GroupingSnapshot {
    pub fn new(generation: u64, plugins: Vec<PluginSpec>) -> Self {
        let mut index = HashMap::new();
        for (pi, plugin) in plugins.iter().enumerate() {
            for (gi, group) in plugin.groups.iter().enumerate() {
                index.insert(
                    GroupKey {
                        plugin: plugin.name.clone(),
                        group: group.name.clone(),
                    },
                    (pi, gi),
                );
            }
        }
        Self {
            generation,
            plugins,
            index,
        }
    }

    pub fn plugins(&self) -> &[PluginSpec] {
        &self.plugins
    }

    /// Case-insensitive plugin lookup by name.
    pub fn plugin_by_name(&self, name: &str) -> Option<&PluginSpec> {
        let name = name.trim();
        self.plugins
            .iter()
            .find(|plugin| plugin.name.eq_ignore_ascii_case(name))
    }

    pub fn group(&self, key: &GroupKey) -> Option<&GroupSpec> {
        let (pi, gi) = self.index.get(key)?;
        self.plugins.get(*pi)?.groups.get(*gi)
    }

    /// Every group key, plugin then group declaration order.
    pub fn group_keys(&self) -> Vec<GroupKey> {
        self.plugins
            .iter()
            .flat_map(|plugin| {
                plugin.groups.iter().map(move |group| GroupKey {
                    plugin: plugin.name.clone(),
                    group: group.name.clone(),
                })
            })
            .collect()
    }
}

/// Normalize a merged document into a snapshot.
///
/// Returns the snapshot and human-readable warnings for every value that was
/// normalized or dropped.
pub fn resolve_document(merged: &Value, generation: u64) -> HudResult<(GroupingSnapshot, Vec<String>)> {
    let raw: RawDocument = serde_json::from_value(merged.clone())?;
    let mut warnings = Vec::new();
    let mut plugins = Vec::with_capacity(raw.len());

    for (plugin_name, raw_plugin) in &raw {
        let plugin_name = plugin_name.trim();
        if plugin_name.is_empty() {
            warnings.push("plugin with an empty name ignored".to_string());
            continue;
        }

        let matching_prefixes: Vec<String> = raw_plugin
            .matching_prefixes
            .iter()
            .flatten()
            .map(|prefix| prefix.trim().to_lowercase())
            .filter(|prefix| !prefix.is_empty())
            .collect();

        let mut claimed: HashMap<String, String> = HashMap::new();
        let mut groups = Vec::new();
        for (group_name, raw_group) in raw_plugin.id_prefix_groups.iter().flatten() {
            if let Some(group) =
                resolve_group(plugin_name, group_name, raw_group, &mut claimed, &mut warnings)
            {
                groups.push(group);
            }
        }

        plugins.push(PluginSpec {
            name: Arc::from(plugin_name),
            matching_prefixes,
            groups,
        });
    }

    Ok((GroupingSnapshot::new(generation, plugins), warnings))
}

fn resolve_group(
    plugin: &str,
    name: &str,
    raw: &RawGroup,
    claimed: &mut HashMap<String, String>,
    warnings: &mut Vec<String>,
) -> Option<GroupSpec> {
    let label = format!("{}::{}", plugin, name);

    let mut id_prefixes = Vec::new();
    for entry in raw.id_prefixes.iter().flatten() {
        let value = entry.value().trim();
        if value.is_empty() {
            warnings.push(format!("{}: empty id prefix ignored", label));
            continue;
        }
        let match_mode = match entry {
            RawPrefix::Detailed {
                match_mode: Some(mode),
                ..
            } => MatchMode::parse(mode).unwrap_or_else(|| {
                warnings.push(format!(
                    "{}: unknown matchMode '{}' for '{}', using startswith",
                    label, mode, value
                ));
                MatchMode::StartsWith
            }),
            _ => MatchMode::StartsWith,
        };
        let claim = value.to_lowercase();
        if let Some(owner) = claimed.get(&claim) {
            if owner != name {
                warnings.push(format!(
                    "{}: prefix '{}' already belongs to group '{}', ignored",
                    label, value, owner
                ));
            }
            continue;
        }
        claimed.insert(claim, name.to_string());
        id_prefixes.push(IdPrefix::new(value, match_mode));
    }

    if id_prefixes.is_empty() {
        warnings.push(format!("{}: group declares no id prefixes, ignored", label));
        return None;
    }

    let anchor = match raw.id_prefix_group_anchor.as_deref() {
        None => Anchor::Nw,
        Some(value) => Anchor::parse(value).unwrap_or_else(|| {
            warnings.push(format!("{}: unknown anchor '{}', using nw", label, value));
            Anchor::Nw
        }),
    };
    let justification = match raw.payload_justification.as_deref() {
        None => Justification::Left,
        Some(value) => Justification::parse(value).unwrap_or_else(|| {
            warnings.push(format!("{}: unknown justification '{}', using left", label, value));
            Justification::Left
        }),
    };
    let marker_label_position = match raw.marker_label_position.as_deref() {
        None => MarkerLabelPosition::Below,
        Some(value) => MarkerLabelPosition::parse(value).unwrap_or_else(|| {
            warnings.push(format!(
                "{}: unknown markerLabelPosition '{}', using below",
                label, value
            ));
            MarkerLabelPosition::Below
        }),
    };
    let preview_box_mode = match raw.controller_preview_box_mode.as_deref() {
        None => PreviewBoxMode::Last,
        Some(value) => PreviewBoxMode::parse(value).unwrap_or_else(|| {
            warnings.push(format!(
                "{}: unknown controllerPreviewBoxMode '{}', using last",
                label, value
            ));
            PreviewBoxMode::Last
        }),
    };
    let background_color = match raw.background_color.as_deref() {
        None => None,
        Some(value) if value.trim().is_empty() => None,
        Some(value) => {
            let color = Color::parse_hex(value);
            if color.is_none() {
                warnings.push(format!(
                    "{}: invalid backgroundColor '{}', background disabled",
                    label, value
                ));
            }
            color
        }
    };
    let background_border_width = match raw.background_border_width {
        None => 0.0,
        Some(width) if width.is_finite() && (0.0..=MAX_BORDER_WIDTH).contains(&width) => width,
        Some(width) => {
            let clamped = if width.is_finite() {
                width.clamp(0.0, MAX_BORDER_WIDTH)
            } else {
                0.0
            };
            warnings.push(format!(
                "{}: backgroundBorderWidth {} out of range, using {}",
                label, width, clamped
            ));
            clamped
        }
    };

    Some(GroupSpec {
        name: Arc::from(name),
        id_prefixes,
        anchor,
        offset_x: finite_or_zero(raw.offset_x),
        offset_y: finite_or_zero(raw.offset_y),
        justification,
        marker_label_position,
        preview_box_mode,
        background_color,
        background_border_width,
        nudge_overflow: raw.nudge_overflow,
    })
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::CanvasSpace;
    use serde_json::json;

    fn resolve(value: Value) -> (GroupingSnapshot, Vec<String>) {
        resolve_document(&value, 1).expect("resolve")
    }

    #[test]
    fn test_merge_user_field_wins_and_shipped_fields_fall_back() {
        let shipped = json!({
            "Right Banner": {
                "matchingPrefixes": ["right-banner-"],
                "idPrefixGroups": {
                    "Alerts": {
                        "idPrefixes": ["right-banner-"],
                        "idPrefixGroupAnchor": "top",
                        "offsetX": 10,
                        "payloadJustification": "center"
                    }
                }
            }
        });
        let user = json!({
            "Right Banner": {
                "idPrefixGroups": {
                    "Alerts": { "offsetX": -25, "backgroundColor": "#112233" }
                }
            }
        });

        let merged = merge_layers(&shipped, &user);
        let (snapshot, warnings) = resolve(merged);
        assert!(warnings.is_empty(), "{:?}", warnings);

        let group = snapshot
            .group(&GroupKey::new("Right Banner", "Alerts"))
            .expect("group");
        assert_eq!(group.offset_x, -25.0);
        assert_eq!(group.anchor, Anchor::Top);
        assert_eq!(group.justification, Justification::Center);
        assert_eq!(group.background_color, Some(Color::rgb(0x11, 0x22, 0x33)));
        assert_eq!(group.id_prefixes[0].value, "right-banner-");
    }

    #[test]
    fn test_merge_keeps_entries_from_both_layers_in_order() {
        let shipped = json!({
            "A": { "idPrefixGroups": { "g1": { "idPrefixes": ["a-"] } } },
            "B": { "idPrefixGroups": { "g1": { "idPrefixes": ["b-"] } } }
        });
        let user = json!({
            "C": { "idPrefixGroups": { "g1": { "idPrefixes": ["c-"] } } },
            "A": { "idPrefixGroups": { "g2": { "idPrefixes": ["a-two-"] } } }
        });

        let (snapshot, _) = resolve(merge_layers(&shipped, &user));
        let names: Vec<&str> = snapshot.plugins().iter().map(|p| &*p.name).collect();
        assert_eq!(names, vec!["A", "B", "C"]);

        let a = snapshot.plugin_by_name("a").unwrap();
        let groups: Vec<&str> = a.groups.iter().map(|g| &*g.name).collect();
        assert_eq!(groups, vec!["g1", "g2"]);
    }

    #[test]
    fn test_user_null_overrides_shipped_value() {
        let shipped = json!({
            "P": { "idPrefixGroups": { "g": { "idPrefixes": ["p-"], "backgroundColor": "#000000" } } }
        });
        let user = json!({
            "P": { "idPrefixGroups": { "g": { "backgroundColor": null } } }
        });
        let (snapshot, _) = resolve(merge_layers(&shipped, &user));
        let group = snapshot.group(&GroupKey::new("P", "g")).unwrap();
        assert_eq!(group.background_color, None);
    }

    #[test]
    fn test_invalid_values_normalize_with_warnings() {
        let doc = json!({
            "P": {
                "idPrefixGroups": {
                    "g": {
                        "idPrefixes": ["p-"],
                        "idPrefixGroupAnchor": "northwestish",
                        "payloadJustification": "diagonal",
                        "controllerPreviewBoxMode": "sometimes",
                        "backgroundColor": "not-a-color",
                        "backgroundBorderWidth": 25
                    }
                }
            }
        });
        let (snapshot, warnings) = resolve(doc);
        let group = snapshot.group(&GroupKey::new("P", "g")).unwrap();
        assert_eq!(group.anchor, Anchor::Nw);
        assert_eq!(group.justification, Justification::Left);
        assert_eq!(group.preview_box_mode, PreviewBoxMode::Last);
        assert_eq!(group.background_color, None);
        assert_eq!(group.background_border_width, MAX_BORDER_WIDTH);
        assert_eq!(warnings.len(), 5);
    }

    #[test]
    fn test_group_without_prefixes_is_dropped() {
        let doc = json!({
            "P": { "idPrefixGroups": { "empty": { "idPrefixes": [] }, "ok": { "idPrefixes": ["p-"] } } }
        });
        let (snapshot, warnings) = resolve(doc);
        assert!(snapshot.group(&GroupKey::new("P", "empty")).is_none());
        assert!(snapshot.group(&GroupKey::new("P", "ok")).is_some());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_duplicate_prefix_first_group_wins() {
        let doc = json!({
            "P": { "idPrefixGroups": {
                "first": { "idPrefixes": ["shared-"] },
                "second": { "idPrefixes": ["SHARED-", "own-"] }
            } }
        });
        let (snapshot, warnings) = resolve(doc);
        let second = snapshot.group(&GroupKey::new("P", "second")).unwrap();
        assert_eq!(second.id_prefixes.len(), 1);
        assert_eq!(second.id_prefixes[0].value, "own-");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_duplicate_prefix_ignores_match_mode() {
        let doc = json!({
            "P": { "idPrefixGroups": {
                "first": { "idPrefixes": ["alert"] },
                "second": { "idPrefixes": [{ "value": "Alert", "matchMode": "exact" }, "own-"] }
            } }
        });
        let (snapshot, warnings) = resolve(doc);
        let second = snapshot.group(&GroupKey::new("P", "second")).unwrap();
        assert_eq!(second.id_prefixes.len(), 1);
        assert_eq!(second.id_prefixes[0].value, "own-");
        assert!(warnings[0].contains("already belongs to group 'first'"));
    }

    #[test]
    fn test_detailed_prefix_match_modes() {
        let doc = json!({
            "P": { "idPrefixGroups": { "g": { "idPrefixes": [
                { "value": "Exact-Id", "matchMode": "exact" },
                { "value": "start-" }
            ] } } }
        });
        let (snapshot, _) = resolve(doc);
        let group = snapshot.group(&GroupKey::new("P", "g")).unwrap();
        assert_eq!(group.id_prefixes[0].match_mode, MatchMode::Exact);
        assert_eq!(group.id_prefixes[0].specificity("exact-id"), Some((8, true)));
        assert_eq!(group.id_prefixes[0].specificity("exact-id-2"), None);
        assert_eq!(group.id_prefixes[1].specificity("start-x"), Some((6, false)));
    }

    #[test]
    fn test_validate_layer_rejects_wrong_shape() {
        let path = Path::new("overlay_groupings.json");
        assert!(validate_layer(&json!([1, 2]), path).is_err());
        assert!(validate_layer(&json!({ "P": { "matchingPrefixes": "p-" } }), path).is_err());
        assert!(validate_layer(&json!({ "P": { "idPrefixGroups": { "g": { "offsetX": "far" } } } }), path).is_err());
        assert!(validate_layer(&json!({ "P": { "matchingPrefixes": null } }), path).is_ok());
    }

    #[test]
    fn test_parse_layer_blank_handling() {
        let path = Path::new("overlay_groupings.user.json");
        assert_eq!(parse_layer("  ", path, true).unwrap(), json!({}));
        assert!(matches!(
            parse_layer("", path, false),
            Err(HudError::MalformedDocument { .. })
        ));
        assert!(parse_layer("{ not json", path, true).is_err());
    }

    #[test]
    fn test_anchor_points() {
        let b = Bounds::<CanvasSpace>::new(0.0, 0.0, 100.0, 50.0);
        assert_eq!(Anchor::Nw.point(&b).as_tuple(), (0.0, 0.0));
        assert_eq!(Anchor::Se.point(&b).as_tuple(), (100.0, 50.0));
        assert_eq!(Anchor::Top.point(&b).as_tuple(), (50.0, 0.0));
        assert_eq!(Anchor::Right.point(&b).as_tuple(), (100.0, 25.0));
        assert_eq!(Anchor::Center.point(&b).as_tuple(), (50.0, 25.0));
    }
}
