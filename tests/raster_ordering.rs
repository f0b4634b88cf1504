//! Raster Ordering Tests
//!
//! Tests for rasterization invariants:
//! - create_position with the wrong coordinate count fails with AxisCountMismatch
//! - Positions order by axis priority
//! - Extents follow granularity and the value kind of the layer

use corpusdb::mapping::Container;
use corpusdb::raster::{
    compare_by_axes, AnnotationValue, CharacterRasterizer, FragmentLayer, RasterError, Rasterizer,
    TimelineRasterizer, ValueKind, LANE_AXIS, TIME_AXIS,
};
use std::cmp::Ordering;
use std::time::Duration;

// =============================================================================
// Helper Functions
// =============================================================================

fn rasterizers() -> Vec<Box<dyn Rasterizer>> {
    vec![
        Box::new(CharacterRasterizer::new()),
        Box::new(TimelineRasterizer::new(0.5).unwrap()),
        Box::new(TimelineRasterizer::new(0.01).unwrap().lane_first()),
    ]
}

// =============================================================================
// Position Construction
// =============================================================================

/// Any coordinate count other than the axis count is rejected.
#[test]
fn test_axis_count_mismatch_always_fails() {
    for rasterizer in rasterizers() {
        let axes = rasterizer.axis_count();
        for count in 0..5 {
            let coords = vec![1i64; count];
            let result = rasterizer.create_position(&coords);
            if count == axes {
                assert_eq!(result.unwrap().axis_count(), axes);
            } else {
                assert_eq!(
                    result.unwrap_err(),
                    RasterError::AxisCountMismatch {
                        expected: axes,
                        actual: count
                    }
                );
            }
        }
    }
}

/// Raw values snap to the nearest granularity step.
#[test]
fn test_position_from_raw_quantizes() {
    let timeline = TimelineRasterizer::new(0.5).unwrap();
    let position = timeline.position_from_raw(&[2.26, 3.0]).unwrap();
    assert_eq!(position.coords(), &[5, 3]);

    assert_eq!(
        timeline.position_at(Duration::from_millis(1_240), 2).unwrap().coords(),
        &[2, 2]
    );
}

/// Values without an integer coordinate are refused, not clamped.
#[test]
fn test_position_from_raw_rejects_unrepresentable() {
    for rasterizer in rasterizers() {
        let axes = rasterizer.axis_count();
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 1e300] {
            let mut raw = vec![1.0; axes];
            raw[axes - 1] = bad;
            assert!(matches!(
                rasterizer.position_from_raw(&raw),
                Err(RasterError::UnrepresentableValue { .. })
            ));
        }
    }

    let timeline = TimelineRasterizer::new(1e-9).unwrap();
    assert!(matches!(
        timeline.position_at(Duration::MAX, 0),
        Err(RasterError::UnrepresentableValue { .. })
    ));
}

/// Granularity must be positive and finite.
#[test]
fn test_invalid_granularity() {
    for g in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        assert!(matches!(
            TimelineRasterizer::new(g),
            Err(RasterError::InvalidGranularity { .. })
        ));
    }
}

// =============================================================================
// Ordering
// =============================================================================

/// Time-first: earlier time wins regardless of lane.
#[test]
fn test_time_priority_order() {
    let timeline = TimelineRasterizer::new(1.0).unwrap();
    let mut positions = vec![
        timeline.create_position(&[3, 0]).unwrap(),
        timeline.create_position(&[1, 9]).unwrap(),
        timeline.create_position(&[1, 2]).unwrap(),
    ];
    timeline.sort_positions(&mut positions);

    assert_eq!(positions[0].coords(), &[1, 2]);
    assert_eq!(positions[1].coords(), &[1, 9]);
    assert_eq!(positions[2].coords(), &[3, 0]);
}

/// Lane-first: the lane axis outranks time.
#[test]
fn test_lane_priority_order() {
    let timeline = TimelineRasterizer::new(1.0).unwrap().lane_first();
    let early_high = timeline.create_position(&[0, 5]).unwrap();
    let late_low = timeline.create_position(&[9, 1]).unwrap();

    assert_eq!(timeline.compare(&late_low, &early_high), Ordering::Less);
    assert_eq!(
        compare_by_axes(&late_low, &early_high, [TIME_AXIS, LANE_AXIS]),
        Ordering::Greater
    );
}

/// Comparison is a total order consistent with equality.
#[test]
fn test_compare_equal_positions() {
    for rasterizer in rasterizers() {
        let coords = vec![4i64; rasterizer.axis_count()];
        let a = rasterizer.create_position(&coords).unwrap();
        let b = rasterizer.create_position(&coords).unwrap();
        assert_eq!(rasterizer.compare(&a, &b), Ordering::Equal);
        assert_eq!(a, b);
    }
}

// =============================================================================
// Extents
// =============================================================================

/// Character extents count text characters, else the item span.
#[test]
fn test_character_extents() {
    let tokens = Container::from_spans("tokens", vec![(0, 5), (6, 12)]);
    let word = tokens.item_at(1).unwrap();
    let rasterizer = CharacterRasterizer::new();

    let glosses = FragmentLayer::new("gloss", ValueKind::Text);
    let text = AnnotationValue::Text("Straße".to_string());
    assert_eq!(rasterizer.raster_size(word, &glosses, &text, 0).unwrap(), 6);

    let counts = FragmentLayer::new("freq", ValueKind::Integer);
    let count = AnnotationValue::Integer(41);
    assert_eq!(rasterizer.raster_size(word, &counts, &count, 0).unwrap(), 6);

    assert!(matches!(
        rasterizer.raster_size(word, &counts, &text, 0),
        Err(RasterError::ValueKindMismatch { .. })
    ));
    assert!(matches!(
        rasterizer.raster_size(word, &counts, &count, 1),
        Err(RasterError::AxisOutOfRange { axis: 1, count: 1 })
    ));
}

/// Timeline extents round up to whole steps; lanes are one tall.
#[test]
fn test_timeline_extents() {
    let utterances = Container::from_spans("utterances", vec![(0, 40)]);
    let utterance = utterances.item_at(0).unwrap();
    let timeline = TimelineRasterizer::new(0.25).unwrap();
    let durations = FragmentLayer::new("duration", ValueKind::Duration);

    let extent = |d: Duration, axis: usize| {
        timeline.raster_size(utterance, &durations, &AnnotationValue::Duration(d), axis)
    };
    assert_eq!(extent(Duration::from_millis(1_000), TIME_AXIS).unwrap(), 4);
    assert_eq!(extent(Duration::from_millis(1_010), TIME_AXIS).unwrap(), 5);
    assert_eq!(extent(Duration::from_millis(1), TIME_AXIS).unwrap(), 1);
    assert_eq!(extent(Duration::ZERO, TIME_AXIS).unwrap(), 0);
    assert_eq!(extent(Duration::from_secs(3), LANE_AXIS).unwrap(), 1);
    assert!(matches!(
        extent(Duration::MAX, TIME_AXIS),
        Err(RasterError::UnrepresentableValue { .. })
    ));

    let labels = FragmentLayer::new("label", ValueKind::Text);
    assert!(matches!(
        timeline.raster_size(utterance, &labels, &AnnotationValue::Text("uh".into()), TIME_AXIS),
        Err(RasterError::UnsupportedValue { .. })
    ));
}
