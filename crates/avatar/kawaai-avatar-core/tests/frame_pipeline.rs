mod common;

use std::sync::Arc;

use common::*;
use kawaai_avatar::error::MotionStartError;
use kawaai_avatar::{ParamId, Priority, RuntimeConfig};

fn live(model: &kawaai_avatar::AvatarModel, id: &str) -> f32 {
    model
        .parameters()
        .live_value(&ParamId::new(id))
        .unwrap_or_else(|| panic!("parameter {id} missing"))
}

#[test]
fn idle_starts_after_the_delay() {
    let cfg = Arc::new(quiet_config());
    let h = Harness::new(&cfg, &["Haru"]);
    let mut model = load_model(&h, cfg, "Haru").unwrap();

    model.update(0.05);
    assert!(model.current_motion_key().is_none());
    model.update(0.05);
    let key = model.current_motion_key().expect("idle should be playing");
    assert!(key.starts_with("Idle_"), "{key}");
    assert_eq!(model.current_priority(), Priority::Idle);
    model.update(0.016);
    assert!(!model.is_motion_finished());
}

#[test]
fn idle_is_never_silent_between_frames() {
    let cfg = Arc::new(quiet_config());
    let h = Harness::new(&cfg, &["Haru"]);
    let mut model = load_model(&h, cfg, "Haru").unwrap();
    model.update(0.1);
    assert!(!model.is_motion_finished());

    let mut restarts = 0;
    let mut previous = model.current_motion_handle();
    for frame in 0..(20 * 30) {
        model.update(1.0 / 30.0);
        assert!(!model.is_motion_finished(), "no motion after frame {frame}");
        let key = model.current_motion_key().unwrap();
        assert!(key.starts_with("Idle_"), "{key}");
        let handle = model.current_motion_handle();
        if handle != previous {
            restarts += 1;
        }
        previous = handle;
    }
    assert!(restarts >= 5, "expected idle restarts, saw {restarts}");
}

#[test]
fn drag_maps_to_head_body_and_eyes() {
    let cfg = Arc::new(quiet_config());
    let h = Harness::new(&cfg, &["Haru"]);
    let mut model = load_model(&h, cfg, "Haru").unwrap();

    model.set_dragging(0.5, 0.5);
    run_frames(&mut model, 300, 1.0 / 60.0);
    assert_eq!(model.drag(), (0.5, 0.5));

    approx(live(&model, "ParamAngleX"), 15.0, 1e-4);
    approx(live(&model, "ParamAngleY"), 15.0, 1e-4);
    approx(live(&model, "ParamAngleZ"), -7.5, 1e-4);
    approx(live(&model, "ParamBodyAngleX"), 5.0, 1e-4);
    approx(live(&model, "ParamEyeBallX"), 0.5, 1e-4);
    approx(live(&model, "ParamEyeBallY"), 0.5, 1e-4);

    // Releasing the pointer brings the face back to center.
    model.set_dragging(0.0, 0.0);
    run_frames(&mut model, 300, 1.0 / 60.0);
    approx(live(&model, "ParamAngleX"), 0.0, 1e-4);
}

#[test]
fn additive_stages_do_not_accumulate() {
    let cfg = Arc::new(RuntimeConfig {
        rng_seed: Some(3),
        ..RuntimeConfig::default()
    });
    let h = Harness::new(&cfg, &["Haru"]);
    let mut model = load_model(&h, cfg, "Haru").unwrap();
    model.set_lip_sync_value(1.0);

    for _ in 0..(30 * 30) {
        model.update(1.0 / 30.0);
        // Breathing alone swings the head by at most its peak.
        assert!(live(&model, "ParamAngleX").abs() <= 7.5 + 1e-3);
        let breath = live(&model, "ParamBreath");
        assert!((0.0..=1.0).contains(&breath), "{breath}");
        approx(live(&model, "ParamMouthOpenY"), 0.8, 1e-4);
    }
}

#[test]
fn lip_sync_defaults_to_silent() {
    let cfg = Arc::new(quiet_config());
    let h = Harness::new(&cfg, &["Haru"]);
    let mut model = load_model(&h, cfg, "Haru").unwrap();
    run_frames(&mut model, 60, 1.0 / 30.0);
    assert_eq!(model.lip_sync_value(), 0.0);
    assert_eq!(live(&model, "ParamMouthOpenY"), 0.0);
}

#[test]
fn eyes_blink_on_their_own() {
    let cfg = Arc::new(quiet_config());
    let h = Harness::new(&cfg, &["Haru"]);
    let mut model = load_model(&h, cfg, "Haru").unwrap();

    let mut min_open: f32 = 1.0;
    for _ in 0..(15 * 60) {
        model.update(1.0 / 60.0);
        min_open = min_open.min(live(&model, "ParamEyeLOpen"));
        assert_eq!(live(&model, "ParamEyeLOpen"), live(&model, "ParamEyeROpen"));
    }
    assert!(min_open < 0.5, "eyes never closed (min {min_open})");
}

#[test]
fn pose_shows_the_first_part_of_each_group() {
    let cfg = Arc::new(quiet_config());
    let h = Harness::new(&cfg, &["Haru"]);
    let mut model = load_model(&h, cfg, "Haru").unwrap();
    run_frames(&mut model, 90, 1.0 / 30.0);

    let params = model.parameters();
    let a = params.part_index_of(&ParamId::new("PartArmA")).unwrap();
    let b = params.part_index_of(&ParamId::new("PartArmB")).unwrap();
    approx(params.live_part_opacities()[a], 1.0, 1e-4);
    approx(params.live_part_opacities()[b], 0.0, 1e-4);
}

#[test]
fn physics_swings_hair_from_drag() {
    let cfg = Arc::new(quiet_config());
    let h = Harness::new(&cfg, &["Haru"]);
    let mut model = load_model(&h, cfg, "Haru").unwrap();
    run_frames(&mut model, 30, 1.0 / 30.0);
    let rest = live(&model, "ParamHairFront");

    model.set_dragging(1.0, 0.0);
    let mut moved = false;
    for _ in 0..60 {
        model.update(1.0 / 30.0);
        let v = live(&model, "ParamHairFront");
        assert!(v.is_finite() && (-1.0..=1.0).contains(&v));
        moved |= (v - rest).abs() > 1e-3;
    }
    assert!(moved, "hair never reacted to the head turning");
}

#[test]
fn expression_is_applied_on_top_of_motion() {
    let cfg = Arc::new(quiet_config());
    let h = Harness::new(&cfg, &["Haru"]);
    let mut model = load_model(&h, cfg, "Haru").unwrap();
    model.set_expression("F01").unwrap();
    assert_eq!(model.current_expression(), Some("F01"));

    run_frames(&mut model, 90, 1.0 / 30.0);
    approx(live(&model, "ParamCheek"), 0.5, 1e-4);

    let err = model.set_expression("Nope").unwrap_err();
    assert_eq!(
        err,
        MotionStartError::UnknownExpression {
            name: "Nope".to_string()
        }
    );
}

#[test]
fn random_expression_falls_back_to_tap_motion() {
    let cfg = Arc::new(quiet_config());
    let mut h = Harness::new(&cfg, &["Haru"]);
    for f in ["F01", "F02", "F01_alt"] {
        h.fetcher
            .remove(&format!("/live2d/Haru/expressions/{f}.exp3.json"));
    }
    let mut model = load_model(&h, cfg, "Haru").unwrap();
    assert_eq!(model.expression_names().count(), 0);

    model.update(0.016);
    model.set_random_expression().unwrap();
    model.update(0.016);
    assert_eq!(model.current_motion_key(), Some("TapBody_0"));
    assert_eq!(model.current_priority(), Priority::Normal);
}

#[test]
fn fallback_without_tap_group_reports_empty_group() {
    let cfg = Arc::new(quiet_config());
    let h = Harness::new(&cfg, &["Minimal"]);
    let mut model = load_model(&h, cfg, "Minimal").unwrap();
    let err = model.set_random_expression().unwrap_err();
    assert_eq!(
        err,
        MotionStartError::EmptyGroup {
            group: "TapBody".to_string()
        }
    );
}

#[test]
fn reservation_rules_gate_motion_starts() {
    let cfg = Arc::new(quiet_config());
    let h = Harness::new(&cfg, &["Haru"]);
    let mut model = load_model(&h, cfg, "Haru").unwrap();

    model.start_motion("TapBody", 0, Priority::Normal).unwrap();
    let err = model.start_motion("Idle", 0, Priority::Idle).unwrap_err();
    assert!(matches!(err, MotionStartError::ReservationRejected { .. }));
    assert!(model.start_motion("Idle", 0, Priority::Force).is_ok());
    assert_eq!(model.current_priority(), Priority::Force);

    let err = model.start_motion("Idle", 9, Priority::Force).unwrap_err();
    assert_eq!(
        err,
        MotionStartError::UnknownMotion {
            key: "Idle_9".to_string()
        }
    );
}

#[test]
fn non_finite_delta_is_ignored() {
    let cfg = Arc::new(quiet_config());
    let h = Harness::new(&cfg, &["Haru"]);
    let mut model = load_model(&h, cfg, "Haru").unwrap();
    model.update(f32::NAN);
    model.update(-1.0);
    assert_eq!(model.user_time(), 0.0);
    for id in model.parameters().ids() {
        assert!(model.parameters().live_value(id).unwrap().is_finite());
    }
}
