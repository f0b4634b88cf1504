//! The rasterizer contract

use std::cmp::Ordering;

use super::axis::{Axis, Position};
use super::errors::{RasterError, RasterResult};
use super::value::{AnnotationValue, FragmentLayer};
use crate::mapping::Markable;

/// Projects markables and annotation values onto a fixed axis space, and
/// orders the positions it creates.
pub trait Rasterizer: Send + Sync {
    /// Short name used in error reports
    fn name(&self) -> &'static str;

    /// Ordered axes, at least one
    fn axes(&self) -> &[Axis];

    /// Extent of `item` along `axis` for `value` on `layer`.
    fn raster_size(
        &self,
        item: &Markable,
        layer: &FragmentLayer,
        value: &AnnotationValue,
        axis: usize,
    ) -> RasterResult<i64>;

    fn axis_count(&self) -> usize {
        self.axes().len()
    }

    fn axis_at(&self, axis: usize) -> RasterResult<&Axis> {
        self.axes().get(axis).ok_or(RasterError::AxisOutOfRange {
            axis,
            count: self.axis_count(),
        })
    }

    fn granularity(&self, axis: usize) -> RasterResult<f64> {
        Ok(self.axis_at(axis)?.granularity())
    }

    /// Build a position; exactly one coordinate per axis.
    fn create_position(&self, coords: &[i64]) -> RasterResult<Position> {
        if coords.len() != self.axis_count() {
            return Err(RasterError::AxisCountMismatch {
                expected: self.axis_count(),
                actual: coords.len(),
            });
        }
        Ok(Position::from_coords(coords))
    }

    /// Quantize one raw value per axis, then build the position.
    fn position_from_raw(&self, raw: &[f64]) -> RasterResult<Position> {
        if raw.len() != self.axis_count() {
            return Err(RasterError::AxisCountMismatch {
                expected: self.axis_count(),
                actual: raw.len(),
            });
        }
        let coords = self
            .axes()
            .iter()
            .zip(raw)
            .map(|(axis, value)| axis.quantize(*value))
            .collect::<RasterResult<Vec<i64>>>()?;
        self.create_position(&coords)
    }

    /// Axis-priority order: axis 0 first, then axis 1, and so on.
    fn compare(&self, a: &Position, b: &Position) -> Ordering {
        compare_by_axes(a, b, 0..self.axis_count())
    }

    fn sort_positions(&self, positions: &mut [Position]) {
        positions.sort_by(|a, b| self.compare(a, b));
    }
}

/// Compare coordinates in the given axis priority, then by coordinate count.
pub fn compare_by_axes(
    a: &Position,
    b: &Position,
    priority: impl IntoIterator<Item = usize>,
) -> Ordering {
    for axis in priority {
        let ordering = a.get(axis).cmp(&b.get(axis));
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a.axis_count().cmp(&b.axis_count())
}

/// Reject values whose kind differs from the layer's.
pub(crate) fn check_layer_kind(layer: &FragmentLayer, value: &AnnotationValue) -> RasterResult<()> {
    if value.kind() == layer.value_kind {
        Ok(())
    } else {
        Err(RasterError::ValueKindMismatch {
            layer: layer.id.clone(),
            expected: layer.value_kind,
            actual: value.kind(),
        })
    }
}
