//! Single-axis rasterizer over character offsets

use super::axis::Axis;
use super::errors::{RasterError, RasterResult};
use super::rasterizer::{check_layer_kind, Rasterizer};
use super::value::{AnnotationValue, FragmentLayer};
use crate::mapping::Markable;

/// One `characters` axis of unit granularity.
///
/// Text values take their character count; every other value takes the
/// item's own span.
#[derive(Debug, Clone)]
pub struct CharacterRasterizer {
    axes: [Axis; 1],
}

impl CharacterRasterizer {
    pub fn new() -> Self {
        Self {
            axes: [Axis::discrete("characters")],
        }
    }
}

impl Default for CharacterRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for CharacterRasterizer {
    fn name(&self) -> &'static str {
        "CharacterRasterizer"
    }

    fn axes(&self) -> &[Axis] {
        &self.axes
    }

    fn raster_size(
        &self,
        item: &Markable,
        layer: &FragmentLayer,
        value: &AnnotationValue,
        axis: usize,
    ) -> RasterResult<i64> {
        self.axis_at(axis)?;
        check_layer_kind(layer, value)?;

        let extent = match value {
            AnnotationValue::Text(text) => text.chars().count() as u64,
            _ => item.span_len(),
        };
        i64::try_from(extent).map_err(|_| RasterError::UnsupportedValue {
            rasterizer: self.name(),
            kind: value.kind(),
            axis,
        })
    }
}
