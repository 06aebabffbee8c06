//! Plugin/group attribution of payload ids.
//!
//! Classification is a pure function of the id, the optional explicit
//! plugin tag, and one [`GroupingSnapshot`]. The engine classifies every
//! live payload once per tick; downstream stages only read the result.

use std::sync::Arc;

use serde::Serialize;

use crate::config::{GroupKey, GroupingSnapshot, PluginSpec};
use crate::payload::Payload;

/// Who owns a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Classification {
    Matched { plugin: Arc<str>, group: Arc<str> },
    MatchedPluginOnly { plugin: Arc<str> },
    Unattributed,
}

impl Classification {
    pub fn plugin(&self) -> Option<&Arc<str>> {
        match self {
            Classification::Matched { plugin, .. } | Classification::MatchedPluginOnly { plugin } => {
                Some(plugin)
            }
            Classification::Unattributed => None,
        }
    }

    pub fn group_key(&self) -> Option<GroupKey> {
        match self {
            Classification::Matched { plugin, group } => Some(GroupKey {
                plugin: plugin.clone(),
                group: group.clone(),
            }),
            _ => None,
        }
    }
}

/// A live payload paired with its classification for the current tick.
#[derive(Debug, Clone)]
pub struct ClassifiedPayload {
    pub payload: Arc<Payload>,
    pub class: Classification,
}

/// Classify `id` against `snapshot`.
///
/// An explicit tag selects the plugin directly (case-insensitive); a tag no
/// plugin declares still attributes the payload to that plugin name. Without
/// a tag, the first plugin in declaration order with a matching prefix wins.
pub fn classify(id: &str, plugin_tag: Option<&str>, snapshot: &GroupingSnapshot) -> Classification {
    let lowered = id.to_lowercase();

    let tag = plugin_tag.map(str::trim).filter(|tag| !tag.is_empty());
    let plugin = match tag {
        Some(tag) => match snapshot.plugin_by_name(tag) {
            Some(plugin) => plugin,
            None => {
                return Classification::MatchedPluginOnly {
                    plugin: Arc::from(tag),
                }
            }
        },
        None => match snapshot.plugins().iter().find(|p| p.matches_id(&lowered)) {
            Some(plugin) => plugin,
            None => return Classification::Unattributed,
        },
    };

    match best_group(plugin, &lowered) {
        Some(group) => Classification::Matched {
            plugin: plugin.name.clone(),
            group,
        },
        None => Classification::MatchedPluginOnly {
            plugin: plugin.name.clone(),
        },
    }
}

/// Most specific matching group; earlier groups win ties.
fn best_group(plugin: &PluginSpec, lowered_id: &str) -> Option<Arc<str>> {
    let mut best: Option<((usize, bool), &Arc<str>)> = None;
    for group in &plugin.groups {
        let specificity = group
            .id_prefixes
            .iter()
            .filter_map(|prefix| prefix.specificity(lowered_id))
            .max();
        if let Some(specificity) = specificity {
            if best.map_or(true, |(current, _)| specificity > current) {
                best = Some((specificity, &group.name));
            }
        }
    }
    best.map(|(_, name)| name.clone())
}

/// Classify every payload in `payloads`, preserving order.
pub fn classify_all(payloads: &[Arc<Payload>], snapshot: &GroupingSnapshot) -> Vec<ClassifiedPayload> {
    payloads
        .iter()
        .map(|payload| ClassifiedPayload {
            class: classify(&payload.id, payload.plugin.as_deref(), snapshot),
            payload: payload.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::groupings::resolve_document;
    use serde_json::json;

    fn snapshot() -> GroupingSnapshot {
        let doc = json!({
            "Right Banner": {
                "matchingPrefixes": ["right-banner-"],
                "idPrefixGroups": {
                    "Banner": { "idPrefixes": ["right-banner-"] },
                    "Alerts": { "idPrefixes": ["right-banner-alert"] },
                    "Exact": { "idPrefixes": [{ "value": "right-banner-alert", "matchMode": "exact" }] }
                }
            },
            "Catch All": {
                "matchingPrefixes": ["right-"],
                "idPrefixGroups": { "All": { "idPrefixes": ["right-"] } }
            },
            "Route": {
                "matchingPrefixes": ["route-"]
            }
        });
        resolve_document(&doc, 1).unwrap().0
    }

    #[test]
    fn test_plugin_and_group_by_prefix() {
        let snapshot = snapshot();
        assert_eq!(
            classify("Right-Banner-Status", None, &snapshot),
            Classification::Matched {
                plugin: Arc::from("Right Banner"),
                group: Arc::from("Banner"),
            }
        );
    }

    #[test]
    fn test_most_specific_group_wins_and_exact_beats_prefix() {
        let snapshot = snapshot();
        let class = classify("right-banner-alert", None, &snapshot);
        assert_eq!(class.group_key(), Some(GroupKey::new("Right Banner", "Exact")));

        let class = classify("right-banner-alert-2", None, &snapshot);
        assert_eq!(class.group_key(), Some(GroupKey::new("Right Banner", "Alerts")));
    }

    #[test]
    fn test_first_declared_plugin_wins() {
        let snapshot = snapshot();
        // both "right-banner-" and "right-" match; Right Banner is declared first
        let class = classify("right-banner-x", None, &snapshot);
        assert_eq!(class.plugin().map(|p| p.as_ref()), Some("Right Banner"));
        let class = classify("right-other", None, &snapshot);
        assert_eq!(class.plugin().map(|p| p.as_ref()), Some("Catch All"));
    }

    #[test]
    fn test_explicit_tag_overrides_prefixes() {
        let snapshot = snapshot();
        let class = classify("right-banner-alert", Some("route"), &snapshot);
        assert_eq!(
            class,
            Classification::MatchedPluginOnly {
                plugin: Arc::from("Route")
            }
        );
        let class = classify("anything", Some("Unknown Plugin"), &snapshot);
        assert_eq!(
            class,
            Classification::MatchedPluginOnly {
                plugin: Arc::from("Unknown Plugin")
            }
        );
    }

    #[test]
    fn test_unattributed_and_plugin_only() {
        let snapshot = snapshot();
        assert_eq!(classify("mystery", None, &snapshot), Classification::Unattributed);
        assert_eq!(classify("mystery", Some("  "), &snapshot), Classification::Unattributed);
        assert_eq!(
            classify("route-1", None, &snapshot),
            Classification::MatchedPluginOnly {
                plugin: Arc::from("Route")
            }
        );
    }
}
