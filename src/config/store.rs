//! Layered grouping store with hot reload.
//!
//! ## Architecture
//!
//! ```text
//! shipped document ──┐
//!                    ├─ merge_layers ─ resolve_document ─▶ ArcSwap<GroupingSnapshot>
//! user document ─────┘
//! ```
//!
//! - Readers call [`ConfigStore::snapshot`] once per tick and keep the
//!   returned `Arc` for the whole tick; a reload publishes a new snapshot
//!   without touching the one in flight.
//! - Writers (reload poller, registration API, configuration tool) are
//!   serialized by a single `parking_lot::Mutex`.
//! - The registration API writes only the shipped document; the
//!   configuration tool writes only the user document.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::groupings::{
    merge_layers, parse_layer, resolve_document, validate_layer, Anchor, GroupingSnapshot,
    Justification, MarkerLabelPosition, PreviewBoxMode, MAX_BORDER_WIDTH,
};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{HudError, HudResult};
use crate::storage::{atomic_write_json, file_stamp, FileStamp};
use crate::style::Color;

/// Locations of the two grouping documents.
#[derive(Debug, Clone)]
pub struct GroupingPaths {
    /// Shipped defaults; must exist and parse at startup.
    pub shipped: PathBuf,
    /// User overrides; optional, may be missing or blank.
    pub user: Option<PathBuf>,
}

/// Which document a write targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    Shipped,
    User,
}

/// Field-level update for one group. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPatch {
    #[serde(default)]
    pub id_prefixes: Option<Vec<String>>,
    #[serde(default)]
    pub anchor: Option<Anchor>,
    #[serde(default)]
    pub offset_x: Option<f64>,
    #[serde(default)]
    pub offset_y: Option<f64>,
    #[serde(default)]
    pub justification: Option<Justification>,
    #[serde(default)]
    pub marker_label_position: Option<MarkerLabelPosition>,
    #[serde(default)]
    pub controller_preview_box_mode: Option<PreviewBoxMode>,
    /// `#RRGGBB` / `#AARRGGBB`; an empty string clears the background.
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub background_border_width: Option<f64>,
    #[serde(default)]
    pub nudge_overflow: Option<bool>,
}

impl GroupPatch {
    fn validate(&self) -> HudResult<()> {
        if let Some(prefixes) = &self.id_prefixes {
            if prefixes.iter().any(|p| p.trim().is_empty()) {
                return Err(HudError::InvalidRegistration(
                    "id prefixes must not be empty".to_string(),
                ));
            }
        }
        for offset in [self.offset_x, self.offset_y].into_iter().flatten() {
            if !offset.is_finite() {
                return Err(HudError::InvalidRegistration(format!(
                    "offset {} is not finite",
                    offset
                )));
            }
        }
        if let Some(color) = &self.background_color {
            if !color.trim().is_empty() && Color::parse_hex(color).is_none() {
                return Err(HudError::InvalidRegistration(format!(
                    "background color '{}' is not #RRGGBB or #AARRGGBB",
                    color
                )));
            }
        }
        if let Some(width) = self.background_border_width {
            if !width.is_finite() || !(0.0..=MAX_BORDER_WIDTH).contains(&width) {
                return Err(HudError::InvalidRegistration(format!(
                    "border width {} outside 0-{}",
                    width, MAX_BORDER_WIDTH
                )));
            }
        }
        Ok(())
    }

    fn apply(&self, group: &mut Map<String, Value>) {
        if let Some(prefixes) = &self.id_prefixes {
            let values: Vec<Value> = prefixes.iter().map(|p| json!(p.trim())).collect();
            group.insert("idPrefixes".to_string(), Value::Array(values));
        }
        if let Some(anchor) = self.anchor {
            group.insert("idPrefixGroupAnchor".to_string(), json!(anchor.as_str()));
        }
        if let Some(offset_x) = self.offset_x {
            group.insert("offsetX".to_string(), json!(offset_x));
        }
        if let Some(offset_y) = self.offset_y {
            group.insert("offsetY".to_string(), json!(offset_y));
        }
        if let Some(justification) = self.justification {
            group.insert(
                "payloadJustification".to_string(),
                json!(justification.as_str()),
            );
        }
        if let Some(position) = self.marker_label_position {
            group.insert("markerLabelPosition".to_string(), json!(position.as_str()));
        }
        if let Some(mode) = self.controller_preview_box_mode {
            group.insert("controllerPreviewBoxMode".to_string(), json!(mode.as_str()));
        }
        if let Some(color) = &self.background_color {
            let value = if color.trim().is_empty() {
                Value::Null
            } else {
                json!(color.trim())
            };
            group.insert("backgroundColor".to_string(), value);
        }
        if let Some(width) = self.background_border_width {
            group.insert("backgroundBorderWidth".to_string(), json!(width));
        }
        if let Some(nudge) = self.nudge_overflow {
            group.insert("nudgeOverflow".to_string(), json!(nudge));
        }
    }
}

/// Request from the public registration API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRegistration {
    pub plugin: String,
    #[serde(default)]
    pub matching_prefixes: Vec<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(flatten)]
    pub fields: GroupPatch,
}

#[derive(Debug, Clone)]
struct LayerDoc {
    value: Value,
    stamp: Option<FileStamp>,
}

impl LayerDoc {
    fn empty() -> Self {
        Self {
            value: Value::Object(Map::new()),
            stamp: None,
        }
    }
}

struct StoreState {
    shipped: LayerDoc,
    user: LayerDoc,
    generation: u64,
}

/// Owner of every plugin/group definition.
pub struct ConfigStore {
    paths: GroupingPaths,
    state: Mutex<StoreState>,
    current: ArcSwap<GroupingSnapshot>,
    diagnostics: Diagnostics,
}

impl ConfigStore {
    /// Load both layers and publish the first snapshot.
    ///
    /// A missing or malformed shipped document is an error the caller should
    /// treat as fatal. A malformed user document is reported and ignored.
    pub fn open(paths: GroupingPaths, diagnostics: Diagnostics) -> HudResult<Self> {
        let shipped = LayerDoc {
            value: read_layer(&paths.shipped, false)?,
            stamp: file_stamp(&paths.shipped),
        };

        let user = match &paths.user {
            None => LayerDoc::empty(),
            Some(path) => {
                let stamp = file_stamp(path);
                match read_layer(path, true) {
                    Ok(value) => LayerDoc { value, stamp },
                    Err(e) => {
                        diagnostics.report(
                            DiagnosticKind::Config,
                            format!("user grouping document ignored: {}", e),
                        );
                        LayerDoc {
                            value: Value::Object(Map::new()),
                            stamp,
                        }
                    }
                }
            }
        };

        let store = Self {
            paths,
            state: Mutex::new(StoreState {
                shipped,
                user,
                generation: 0,
            }),
            current: ArcSwap::from_pointee(GroupingSnapshot::default()),
            diagnostics,
        };
        {
            let mut state = store.state.lock();
            store.publish(&mut state);
        }
        Ok(store)
    }

    /// Current snapshot. Hold on to it for the duration of a tick.
    pub fn snapshot(&self) -> Arc<GroupingSnapshot> {
        self.current.load_full()
    }

    pub fn paths(&self) -> &GroupingPaths {
        &self.paths
    }

    /// Merged (pre-normalization) document, as the configuration tool sees it.
    pub fn effective_document(&self) -> Value {
        let state = self.state.lock();
        merge_layers(&state.shipped.value, &state.user.value)
    }

    /// Re-read any backing document whose modification state changed.
    ///
    /// Returns true when a new snapshot was published. Malformed documents
    /// keep the last good layer and produce a configuration diagnostic.
    pub fn poll_reload(&self) -> bool {
        let mut state = self.state.lock();
        let mut changed = false;

        let shipped_stamp = file_stamp(&self.paths.shipped);
        if shipped_stamp != state.shipped.stamp {
            state.shipped.stamp = shipped_stamp;
            match read_layer(&self.paths.shipped, false) {
                Ok(value) if value != state.shipped.value => {
                    log::info!("[GROUPINGS] Shipped document changed, reloading");
                    state.shipped.value = value;
                    changed = true;
                }
                Ok(_) => {}
                Err(e) => self.diagnostics.report(
                    DiagnosticKind::Config,
                    format!("shipped grouping document rejected, keeping last good: {}", e),
                ),
            }
        }

        if let Some(user_path) = &self.paths.user {
            let user_stamp = file_stamp(user_path);
            if user_stamp != state.user.stamp {
                state.user.stamp = user_stamp;
                match read_layer(user_path, true) {
                    Ok(value) if value != state.user.value => {
                        log::info!("[GROUPINGS] User document changed, reloading");
                        state.user.value = value;
                        changed = true;
                    }
                    Ok(_) => {}
                    Err(e) => self.diagnostics.report(
                        DiagnosticKind::Config,
                        format!("user grouping document rejected, keeping last good: {}", e),
                    ),
                }
            }
        }

        if changed {
            self.publish(&mut state);
        }
        changed
    }

    /// Public registration API. Writes the shipped document only.
    pub fn define_plugin_group(&self, registration: &GroupRegistration) -> HudResult<()> {
        let plugin_name = registration.plugin.trim();
        if plugin_name.is_empty() {
            return Err(HudError::InvalidRegistration(
                "plugin name must not be empty".to_string(),
            ));
        }
        if registration.group.is_none() && registration.matching_prefixes.is_empty() {
            return Err(HudError::InvalidRegistration(format!(
                "registration for '{}' names neither a group nor matching prefixes",
                plugin_name
            )));
        }
        registration.fields.validate()?;

        self.edit_layer(ConfigLayer::Shipped, |view, target| {
            let plugin = canonical_plugin(view, plugin_name);

            if !registration.matching_prefixes.is_empty() {
                let mut prefixes = matching_prefixes(view, &plugin);
                for prefix in &registration.matching_prefixes {
                    let prefix = prefix.trim();
                    if !prefix.is_empty() && !prefixes.iter().any(|p| p == prefix) {
                        prefixes.push(prefix.to_string());
                    }
                }
                object_entry(root_mut(target), &plugin)
                    .insert("matchingPrefixes".to_string(), json!(prefixes));
            }

            if let Some(group_name) = &registration.group {
                let group = canonical_group(view, &plugin, group_name.trim());
                if group.is_empty() {
                    return Err(HudError::InvalidRegistration(
                        "group name must not be empty".to_string(),
                    ));
                }
                let has_prefixes = !group_prefix_entries(view, &plugin, &group).is_empty();
                let new_prefixes = registration.fields.id_prefixes.as_deref().unwrap_or(&[]);
                if !has_prefixes && new_prefixes.is_empty() {
                    return Err(HudError::InvalidRegistration(format!(
                        "group '{}' of '{}' needs at least one id prefix",
                        group, plugin
                    )));
                }
                for prefix in new_prefixes {
                    strip_from_other_groups(view, target, &plugin, &group, prefix.trim());
                }
                registration.fields.apply(group_entry_mut(target, &plugin, &group));
            }
            Ok(())
        })
    }

    /// Configuration-tool write: move `prefix` into `group`.
    ///
    /// The prefix is removed from every other group of the same plugin
    /// before the change is committed. Writes the user document only.
    pub fn assign_prefix(&self, plugin: &str, group: &str, prefix: &str) -> HudResult<()> {
        let prefix = prefix.trim();
        if plugin.trim().is_empty() || group.trim().is_empty() || prefix.is_empty() {
            return Err(HudError::InvalidRegistration(
                "plugin, group, and prefix must all be non-empty".to_string(),
            ));
        }

        self.edit_layer(ConfigLayer::User, |view, target| {
            let plugin = canonical_plugin(view, plugin.trim());
            let group = canonical_group(view, &plugin, group.trim());

            strip_from_other_groups(view, target, &plugin, &group, prefix);

            let mut entries = group_prefix_entries(view, &plugin, &group);
            if !entries
                .iter()
                .any(|entry| prefix_entry_value(entry) == Some(prefix))
            {
                entries.push(json!(prefix));
            }
            group_entry_mut(target, &plugin, &group)
                .insert("idPrefixes".to_string(), Value::Array(entries));

            let lowered = prefix.to_lowercase();
            let mut matching = matching_prefixes(view, &plugin);
            if !matching
                .iter()
                .any(|m| lowered.starts_with(&m.to_lowercase()))
            {
                matching.push(prefix.to_string());
                object_entry(root_mut(target), &plugin)
                    .insert("matchingPrefixes".to_string(), json!(matching));
            }
            Ok(())
        })
    }

    /// Configuration-tool write: override fields of one group.
    /// Writes the user document only.
    pub fn update_group(&self, plugin: &str, group: &str, patch: &GroupPatch) -> HudResult<()> {
        patch.validate()?;

        self.edit_layer(ConfigLayer::User, |view, target| {
            let plugin = canonical_plugin(view, plugin.trim());
            let group = canonical_group(view, &plugin, group.trim());
            let has_prefixes = !group_prefix_entries(view, &plugin, &group).is_empty();
            let new_prefixes = patch.id_prefixes.as_deref().unwrap_or(&[]);
            if !has_prefixes && new_prefixes.is_empty() {
                return Err(HudError::InvalidRegistration(format!(
                    "group '{}' of '{}' needs at least one id prefix",
                    group, plugin
                )));
            }
            for prefix in new_prefixes {
                strip_from_other_groups(view, target, &plugin, &group, prefix.trim());
            }
            patch.apply(group_entry_mut(target, &plugin, &group));
            Ok(())
        })
    }

    /// Apply `edit` to one layer, persist it, and publish a new snapshot.
    ///
    /// `edit` receives the view it should read from (shipped alone for the
    /// shipped layer, the merged document for the user layer) and the layer
    /// value to modify.
    fn edit_layer<F>(&self, layer: ConfigLayer, edit: F) -> HudResult<()>
    where
        F: FnOnce(&Value, &mut Value) -> HudResult<()>,
    {
        let mut state = self.state.lock();

        let path = match layer {
            ConfigLayer::Shipped => self.paths.shipped.clone(),
            ConfigLayer::User => self
                .paths
                .user
                .clone()
                .ok_or(HudError::UserStoreUnavailable)?,
        };
        let (view, mut target) = match layer {
            ConfigLayer::Shipped => (state.shipped.value.clone(), state.shipped.value.clone()),
            ConfigLayer::User => (
                merge_layers(&state.shipped.value, &state.user.value),
                state.user.value.clone(),
            ),
        };

        edit(&view, &mut target)?;
        validate_layer(&target, &path)?;
        atomic_write_json(&path, &target)?;

        let doc = LayerDoc {
            value: target,
            stamp: file_stamp(&path),
        };
        match layer {
            ConfigLayer::Shipped => state.shipped = doc,
            ConfigLayer::User => state.user = doc,
        }
        log::debug!("[GROUPINGS] {:?} document written to {}", layer, path.display());

        self.publish(&mut state);
        Ok(())
    }

    /// Merge, normalize, and atomically swap in a new snapshot.
    fn publish(&self, state: &mut StoreState) {
        let merged = merge_layers(&state.shipped.value, &state.user.value);
        let generation = state.generation + 1;
        match resolve_document(&merged, generation) {
            Ok((snapshot, warnings)) => {
                for warning in warnings {
                    self.diagnostics.report(DiagnosticKind::Config, warning);
                }
                state.generation = generation;
                log::info!(
                    "[GROUPINGS] Published generation {} ({} plugins)",
                    generation,
                    snapshot.plugins().len()
                );
                self.current.store(Arc::new(snapshot));
            }
            Err(e) => self.diagnostics.report(
                DiagnosticKind::Config,
                format!("merged grouping document rejected, keeping last good: {}", e),
            ),
        }
    }
}

/// Read one layer from disk. A missing optional layer is empty.
fn read_layer(path: &Path, optional: bool) -> HudResult<Value> {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_layer(&text, path, optional),
        Err(e) if optional && e.kind() == std::io::ErrorKind::NotFound => {
            Ok(Value::Object(Map::new()))
        }
        Err(e) => Err(HudError::StorageError(e)),
    }
}

// ============================================================================
// JSON editing helpers
// ============================================================================

fn root_mut(doc: &mut Value) -> &mut Map<String, Value> {
    if !doc.is_object() {
        *doc = Value::Object(Map::new());
    }
    match doc {
        Value::Object(map) => map,
        _ => unreachable!("document root was just made an object"),
    }
}

fn object_entry<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let entry = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    match entry {
        Value::Object(inner) => inner,
        _ => unreachable!("entry was just made an object"),
    }
}

fn group_entry_mut<'a>(doc: &'a mut Value, plugin: &str, group: &str) -> &'a mut Map<String, Value> {
    let plugin_entry = object_entry(root_mut(doc), plugin);
    let groups = object_entry(plugin_entry, "idPrefixGroups");
    object_entry(groups, group)
}

/// Existing plugin name matching `name` case-insensitively, else `name`.
fn canonical_plugin(view: &Value, name: &str) -> String {
    view.as_object()
        .and_then(|plugins| plugins.keys().find(|key| key.eq_ignore_ascii_case(name)))
        .cloned()
        .unwrap_or_else(|| name.to_string())
}

/// Existing group name of `plugin` matching `name` case-insensitively, else `name`.
fn canonical_group(view: &Value, plugin: &str, name: &str) -> String {
    view.get(plugin)
        .and_then(|p| p.get("idPrefixGroups"))
        .and_then(Value::as_object)
        .and_then(|groups| groups.keys().find(|key| key.eq_ignore_ascii_case(name)))
        .cloned()
        .unwrap_or_else(|| name.to_string())
}

fn matching_prefixes(view: &Value, plugin: &str) -> Vec<String> {
    view.get(plugin)
        .and_then(|p| p.get("matchingPrefixes"))
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn group_prefix_entries(view: &Value, plugin: &str, group: &str) -> Vec<Value> {
    view.get(plugin)
        .and_then(|p| p.get("idPrefixGroups"))
        .and_then(|groups| groups.get(group))
        .and_then(|g| g.get("idPrefixes"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn prefix_entry_value(entry: &Value) -> Option<&str> {
    match entry {
        Value::String(value) => Some(value.trim()),
        Value::Object(map) => map.get("value").and_then(Value::as_str).map(str::trim),
        _ => None,
    }
}

/// Remove the exact `prefix` from every group of `plugin` except `keep`.
///
/// Lists are read from `view` and the reduced lists written to `target`.
fn strip_from_other_groups(view: &Value, target: &mut Value, plugin: &str, keep: &str, prefix: &str) {
    let Some(groups) = view
        .get(plugin)
        .and_then(|p| p.get("idPrefixGroups"))
        .and_then(Value::as_object)
    else {
        return;
    };

    for (name, group) in groups {
        if name == keep {
            continue;
        }
        let Some(entries) = group.get("idPrefixes").and_then(Value::as_array) else {
            continue;
        };
        if !entries
            .iter()
            .any(|entry| prefix_entry_value(entry) == Some(prefix))
        {
            continue;
        }
        let remaining: Vec<Value> = entries
            .iter()
            .filter(|entry| prefix_entry_value(entry) != Some(prefix))
            .cloned()
            .collect();
        log::debug!(
            "[GROUPINGS] Prefix '{}' removed from {}::{} ({} left)",
            prefix,
            plugin,
            name,
            remaining.len()
        );
        group_entry_mut(target, plugin, name)
            .insert("idPrefixes".to_string(), Value::Array(remaining));
    }
}
