use clipforge_motion_core::{apply, Clip, FilterKind, Operation, ResizeConfig, ScalarCurve};

fn walk_clip() -> Clip {
    clipforge_test_fixtures::clips::load("walk-root-motion").expect("walk fixture")
}

/// it should dispatch descriptors to the matching engine operation
#[test]
fn dispatch_resize() {
    let mut clip = walk_clip();
    apply(
        &mut clip,
        &Operation::Resize(ResizeConfig {
            frame_rate: Some(30.0),
            duration: Some(0.5),
            play_rate: None,
        }),
    );
    assert_eq!(clip.num_frames(), 16);
    assert!(clip.is_modified());
}

/// it should leave the clip untouched when the target curve is missing
#[test]
fn filter_missing_curve_is_noop() {
    let mut clip = walk_clip();
    apply(
        &mut clip,
        &Operation::FilterCurve {
            curve: "nope".into(),
            kind: FilterKind::Reduce,
            tolerance: 0.1,
        },
    );
    assert!(!clip.is_modified());
}

/// it should filter an existing curve in place
#[test]
fn filter_existing_curve() {
    let mut clip = walk_clip();
    let mut curve = ScalarCurve::new();
    for i in 0..20 {
        curve.add_key(i as f32 * 0.05, i as f32);
    }
    clip.set_curve("speed", curve);

    apply(
        &mut clip,
        &Operation::FilterCurve {
            curve: "speed".into(),
            kind: FilterKind::Reduce,
            tolerance: 1e-4,
        },
    );
    assert_eq!(clip.curve("speed").unwrap().len(), 2);
    assert!(clip.is_modified());
}

/// it should round-trip a clip through its JSON interchange format
#[test]
fn clip_json_round_trip() {
    let text = clipforge_test_fixtures::clips::json("walk-root-motion").unwrap();
    let clip = Clip::from_json(&text).expect("fixture parses");
    assert_eq!(clip.num_frames(), 31);
    assert!(clip.validate().is_ok());

    let back = Clip::from_json(&clip.to_json().to_string()).expect("round trip");
    assert_eq!(back.num_frames(), clip.num_frames());
    assert_eq!(back.track_names(), clip.track_names());
}

/// it should round-trip operation descriptors through serde
#[test]
fn operation_serde_round_trip() {
    let op = Operation::FilterCurve {
        curve: "speed".into(),
        kind: FilterKind::Euler,
        tolerance: 0.5,
    };
    let json = serde_json::to_string(&op).unwrap();
    let back: Operation = serde_json::from_str(&json).unwrap();
    assert_eq!(back.name(), "filter-curve");

    let resize = Operation::Resize(ResizeConfig::default());
    assert_eq!(resize.name(), "resize");
}
