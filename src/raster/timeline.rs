//! Time-and-lane rasterizer for duration-valued layers

use std::cmp::Ordering;
use std::time::Duration;

use super::axis::{Axis, Position};
use super::errors::{RasterError, RasterResult};
use super::rasterizer::{check_layer_kind, compare_by_axes, Rasterizer};
use super::value::{AnnotationValue, FragmentLayer};
use crate::mapping::Markable;

pub const TIME_AXIS: usize = 0;
pub const LANE_AXIS: usize = 1;

/// Tolerance, in steps, absorbed before rounding an extent up
const STEP_EPSILON: f64 = 1e-9;

/// Axis 0 is time in seconds at a configurable granularity, axis 1 is the
/// lane index.
///
/// Extents on the time axis are `ceil(seconds / granularity)`, at least one
/// step for any non-zero value. Every item is one lane tall.
#[derive(Debug, Clone)]
pub struct TimelineRasterizer {
    axes: [Axis; 2],
    lane_first: bool,
}

impl TimelineRasterizer {
    pub fn new(time_granularity_secs: f64) -> RasterResult<Self> {
        Ok(Self {
            axes: [Axis::new("time", time_granularity_secs)?, Axis::discrete("lane")],
            lane_first: false,
        })
    }

    /// Order positions by lane before time.
    pub fn lane_first(mut self) -> Self {
        self.lane_first = true;
        self
    }

    /// Position of something starting at `start` in `lane`.
    pub fn position_at(&self, start: Duration, lane: u32) -> RasterResult<Position> {
        let time = self.axes[TIME_AXIS].quantize(start.as_secs_f64())?;
        self.create_position(&[time, i64::from(lane)])
    }

    fn time_extent(&self, seconds: f64, value: &AnnotationValue) -> RasterResult<i64> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(RasterError::UnsupportedValue {
                rasterizer: self.name(),
                kind: value.kind(),
                axis: TIME_AXIS,
            });
        }
        if seconds == 0.0 {
            return Ok(0);
        }
        let steps = (seconds / self.axes[TIME_AXIS].granularity() - STEP_EPSILON).ceil();
        if steps >= i64::MAX as f64 {
            return Err(RasterError::UnrepresentableValue {
                axis: self.axes[TIME_AXIS].name().to_string(),
                value: seconds,
            });
        }
        Ok((steps as i64).max(1))
    }
}

impl Rasterizer for TimelineRasterizer {
    fn name(&self) -> &'static str {
        "TimelineRasterizer"
    }

    fn axes(&self) -> &[Axis] {
        &self.axes
    }

    fn raster_size(
        &self,
        _item: &Markable,
        layer: &FragmentLayer,
        value: &AnnotationValue,
        axis: usize,
    ) -> RasterResult<i64> {
        self.axis_at(axis)?;
        check_layer_kind(layer, value)?;

        match (axis, value) {
            (LANE_AXIS, _) => Ok(1),
            (_, AnnotationValue::Duration(d)) => self.time_extent(d.as_secs_f64(), value),
            (_, AnnotationValue::Float(seconds)) => self.time_extent(*seconds, value),
            _ => Err(RasterError::UnsupportedValue {
                rasterizer: self.name(),
                kind: value.kind(),
                axis,
            }),
        }
    }

    fn compare(&self, a: &Position, b: &Position) -> Ordering {
        if self.lane_first {
            compare_by_axes(a, b, [LANE_AXIS, TIME_AXIS])
        } else {
            compare_by_axes(a, b, [TIME_AXIS, LANE_AXIS])
        }
    }
}
