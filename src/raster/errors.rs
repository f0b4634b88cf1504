//! # Raster Errors

use thiserror::Error;

use super::value::ValueKind;

/// Result type for raster operations
pub type RasterResult<T> = Result<T, RasterError>;

/// Rasterization errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RasterError {
    /// Coordinate count differs from the rasterizer's axis count
    #[error("Axis count mismatch: rasterizer has {expected} axes, got {actual} values")]
    AxisCountMismatch { expected: usize, actual: usize },

    #[error("Axis {axis} out of range (axis count {count})")]
    AxisOutOfRange { axis: usize, count: usize },

    /// The rasterizer has no extent rule for this value kind on this axis
    #[error("{rasterizer} cannot rasterize {kind} values on axis {axis}")]
    UnsupportedValue {
        rasterizer: &'static str,
        kind: ValueKind,
        axis: usize,
    },

    /// Value kind differs from the kind the fragment layer declares
    #[error("Layer {layer} holds {expected} values, got {actual}")]
    ValueKindMismatch {
        layer: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    /// Raw value has no integer coordinate on the axis
    #[error("Axis {axis}: value {value} has no representable coordinate")]
    UnrepresentableValue { axis: String, value: f64 },

    #[error("Axis {axis}: granularity must be finite and > 0, got {granularity}")]
    InvalidGranularity { axis: String, granularity: f64 },
}
