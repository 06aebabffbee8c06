//! Engine tests: full ticks against file-backed configuration.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::*;
use crate::config::ScaleMode;
use crate::layout::RenderedGeometry;

const EPS: f64 = 1e-6;

const SHIPPED: &str = r#"{
    "Right Banner": {
        "matchingPrefixes": ["right-banner-"],
        "idPrefixGroups": {
            "Banner": {
                "idPrefixes": ["right-banner-"],
                "idPrefixGroupAnchor": "top",
                "payloadJustification": "center",
                "controllerPreviewBoxMode": "last"
            }
        }
    }
}"#;

struct Harness {
    _dir: tempfile::TempDir,
    user: PathBuf,
    cache: PathBuf,
    engine: OverlayEngine,
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn harness(settings: OverlaySettings) -> Harness {
    init_logger();
    let dir = tempfile::tempdir().expect("create temp dir");
    let shipped = dir.path().join("overlay_groupings.json");
    let user = dir.path().join("overlay_groupings.user.json");
    let cache = dir.path().join("overlay_group_cache.json");
    std::fs::write(&shipped, SHIPPED).unwrap();

    let engine = OverlayEngine::open(
        EnginePaths {
            groupings: GroupingPaths {
                shipped,
                user: Some(user.clone()),
            },
            bounds_cache: Some(cache.clone()),
        },
        settings,
    )
    .expect("open engine");

    Harness {
        _dir: dir,
        user,
        cache,
        engine,
    }
}

fn surface() -> Size<SurfaceSpace> {
    Size::new(1920.0, 1080.0)
}

fn banner() -> GroupKey {
    GroupKey::new("Right Banner", "Banner")
}

const ALERT: &str =
    r#"{"id": "right-banner-alert", "kind": "rect", "ttl": 0, "x": 540, "y": 0, "w": 200, "h": 40}"#;

#[test]
fn test_scenario_rect_centered_on_wide_surface() {
    let h = harness(OverlaySettings::default());
    let t0 = Instant::now();
    assert!(h.engine.ingest_json(ALERT, t0));

    let frame = h.engine.tick(t0, surface()).unwrap();
    let rendered = frame.payload("right-banner-alert").expect("rendered");
    assert_eq!(rendered.group, Some(banner()));
    match &rendered.geometry {
        RenderedGeometry::Rect { bounds, .. } => {
            assert!((bounds.center_x() - 960.0).abs() < EPS);
            assert!((bounds.width() - 300.0).abs() < EPS);
        }
        other => panic!("expected rect, got {:?}", other),
    }
}

#[test]
fn test_scenario_ttl_expiry() {
    let h = harness(OverlaySettings::default());
    let t0 = Instant::now();
    h.engine.ingest_json(
        r#"{"id": "note", "text": "docked", "ttl": 4, "x": 10, "y": 10}"#,
        t0,
    );

    let frame = h.engine.tick(t0 + Duration::from_secs(3), surface()).unwrap();
    assert!(frame.payload("note").is_some());

    let frame = h.engine.tick(t0 + Duration::from_secs(5), surface()).unwrap();
    assert!(frame.payload("note").is_none());
    assert_eq!(h.engine.live_payload_count(), 0);
}

#[test]
fn test_scenario_prefix_attribution() {
    let h = harness(OverlaySettings::default());
    let t0 = Instant::now();
    h.engine.ingest_json(
        r#"{"id": "right-banner-alert", "text": "Shields down", "ttl": 0}"#,
        t0,
    );

    let frame = h.engine.tick(t0, surface()).unwrap();
    let rendered = frame.payload("right-banner-alert").unwrap();
    assert_eq!(rendered.plugin.as_deref(), Some("Right Banner"));
    assert_eq!(rendered.group, Some(banner()));
    assert!(frame.group(&banner()).is_some());
}

#[test]
fn test_scenario_cleared_group_keeps_preview_box() {
    let h = harness(OverlaySettings::default());
    let t0 = Instant::now();
    h.engine.ingest_json(ALERT, t0);
    let frame = h.engine.tick(t0, surface()).unwrap();
    let visible = frame.group(&banner()).unwrap().bounds;

    h.engine
        .ingest_json(r#"{"id": "right-banner-alert", "ttl": 0}"#, t0);
    let frame = h.engine.tick(t0 + Duration::from_millis(50), surface()).unwrap();
    assert!(frame.group(&banner()).is_none());
    assert_eq!(h.engine.effective_bounds(&banner()), Some(visible));

    // a new payload replaces the cached box
    h.engine.ingest_json(
        r#"{"id": "right-banner-alert", "kind": "rect", "ttl": 0, "x": 0, "y": 0, "w": 100, "h": 40}"#,
        t0,
    );
    let frame = h.engine.tick(t0 + Duration::from_millis(100), surface()).unwrap();
    let replaced = frame.group(&banner()).unwrap().bounds;
    assert_ne!(replaced, visible);
    assert_eq!(h.engine.effective_bounds(&banner()), Some(replaced));

    h.engine.reset_bounds(Some(&banner()));
    assert_eq!(h.engine.effective_bounds(&banner()), None);
}

#[test]
fn test_replace_by_id_is_idempotent() {
    let h = harness(OverlaySettings::default());
    let t0 = Instant::now();
    h.engine.ingest_json(ALERT, t0);
    let first = h.engine.tick(t0, surface()).unwrap();
    h.engine.ingest_json(ALERT, t0 + Duration::from_millis(10));
    let second = h.engine.tick(t0 + Duration::from_millis(20), surface()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_bad_messages_become_payload_diagnostics() {
    let h = harness(OverlaySettings::default());
    let t0 = Instant::now();
    h.engine.diagnostics().drain();

    assert!(!h.engine.ingest_json("{ nope", t0));
    assert!(!h.engine.ingest_json(r#"{"id": "v", "kind": "vect", "vector": []}"#, t0));
    assert!(h.engine.ingest_json(r#"{"id": "ghost", "ttl": 0}"#, t0));

    let diags = h.engine.diagnostics().drain();
    assert_eq!(diags.len(), 3);
    assert!(diags.iter().all(|d| d.kind == DiagnosticKind::Payload));
    assert!(diags[2].message.contains("ghost"));
}

#[test]
fn test_invalid_surface_skips_tick() {
    let h = harness(OverlaySettings::default());
    h.engine.diagnostics().drain();
    let result = h.engine.tick(Instant::now(), Size::new(0.0, 1080.0));
    assert!(matches!(result, Err(HudError::InvalidSurface { .. })));
    let diags = h.engine.diagnostics().drain();
    assert_eq!(diags[0].kind, DiagnosticKind::Runtime);
}

#[test]
fn test_reload_applies_between_ticks() {
    let h = harness(OverlaySettings::default());
    let t0 = Instant::now();
    h.engine.ingest_json(ALERT, t0);
    let before = h.engine.tick(t0, surface()).unwrap();

    std::fs::write(
        &h.user,
        r#"{ "Right Banner": { "idPrefixGroups": { "Banner": { "offsetY": 100 } } } }"#,
    )
    .unwrap();
    assert!(h.engine.reload_config());

    let after = h.engine.tick(t0, surface()).unwrap();
    assert!(after.generation > before.generation);
    let shift = after.group(&banner()).unwrap().bounds.min_y - before.group(&banner()).unwrap().bounds.min_y;
    // y overflows under fill, so the offset anchor lands proportionally: 100 / 960 * 1080
    assert!((shift - 112.5).abs() < EPS);
}

#[test]
fn test_bounds_cache_persists_and_honours_external_reset() {
    let h = harness(OverlaySettings {
        bounds_flush_interval_ms: 0,
        ..Default::default()
    });
    let t0 = Instant::now();
    h.engine.ingest_json(ALERT, t0);
    h.engine.tick(t0, surface()).unwrap();

    let text = std::fs::read_to_string(&h.cache).unwrap();
    assert!(text.contains("Right Banner::Banner"));

    h.engine
        .ingest_json(r#"{"id": "right-banner-alert", "ttl": 0}"#, t0);
    std::fs::remove_file(&h.cache).unwrap();
    h.engine.tick(t0, surface()).unwrap();
    assert_eq!(h.engine.effective_bounds(&banner()), None);
}

#[test]
fn test_update_settings_clamps() {
    let h = harness(OverlaySettings::default());
    h.engine.update_settings(|settings| {
        settings.scale_mode = ScaleMode::Fit;
        settings.tick_interval_ms = 1;
    });
    let settings = h.engine.settings();
    assert_eq!(settings.scale_mode, ScaleMode::Fit);
    assert_eq!(settings.tick_interval_ms, 5);
}

#[test]
fn test_malformed_shipped_document_is_fatal() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let shipped = dir.path().join("overlay_groupings.json");
    std::fs::write(&shipped, "[]").unwrap();
    let result = OverlayEngine::open(
        EnginePaths {
            groupings: GroupingPaths {
                shipped,
                user: None,
            },
            bounds_cache: None,
        },
        OverlaySettings::default(),
    );
    assert!(matches!(result, Err(HudError::MalformedDocument { .. })));
}

#[test]
fn test_paths_in_dir_use_standard_names() {
    let paths = EnginePaths::in_dir(Path::new("/tmp/hud"));
    assert_eq!(paths.groupings.shipped, PathBuf::from("/tmp/hud/overlay_groupings.json"));
    assert_eq!(
        paths.groupings.user,
        Some(PathBuf::from("/tmp/hud/overlay_groupings.user.json"))
    );
    assert_eq!(
        paths.bounds_cache,
        Some(PathBuf::from("/tmp/hud/overlay_group_cache.json"))
    );
}

#[test]
fn test_ticks_see_whole_payloads_during_concurrent_ingest() {
    let h = harness(OverlaySettings::default());
    let t0 = Instant::now();
    let engine = &h.engine;

    std::thread::scope(|scope| {
        let producer = scope.spawn(move || {
            for i in 0..200 {
                let message = format!(
                    r#"{{"id": "right-banner-{:03}", "kind": "rect", "ttl": 0, "x": {}, "y": {}, "w": 200, "h": 40}}"#,
                    i,
                    (i * 3) % 1000,
                    (i * 7) % 900
                );
                assert!(engine.ingest_json(&message, t0));
            }
        });

        let mut seen = 0;
        while !producer.is_finished() {
            let frame = engine.tick(t0, surface()).unwrap();
            assert!(frame.payloads.len() >= seen);
            seen = frame.payloads.len();

            for payload in &frame.payloads {
                assert!((payload.bounds.width() - 300.0).abs() < EPS);
                assert!((payload.bounds.height() - 60.0).abs() < EPS);
            }
            if let Some(group) = frame.group(&banner()) {
                let union = frame
                    .payloads
                    .iter()
                    .fold(Bounds::empty(), |acc, p| acc.union(&p.bounds));
                assert_eq!(group.bounds, union);
            }
        }
        producer.join().unwrap();
    });

    let frame = h.engine.tick(t0, surface()).unwrap();
    assert_eq!(frame.payloads.len(), 200);
}
