//! Axes and positions of a raster space

use serde::{Deserialize, Serialize};

use super::errors::{RasterError, RasterResult};

/// One coordinate axis with its minimum meaningful step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    name: String,
    granularity: f64,
}

impl Axis {
    pub fn new(name: impl Into<String>, granularity: f64) -> RasterResult<Self> {
        let name = name.into();
        if !granularity.is_finite() || granularity <= 0.0 {
            return Err(RasterError::InvalidGranularity {
                axis: name,
                granularity,
            });
        }
        Ok(Self { name, granularity })
    }

    /// Unit-step axis
    pub fn discrete(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            granularity: 1.0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn granularity(&self) -> f64 {
        self.granularity
    }

    /// Bucket a raw value to the nearest granularity step.
    ///
    /// Values closer than one step land on the same coordinate. NaN,
    /// infinities and values whose step count does not fit an `i64` are
    /// rejected.
    pub fn quantize(&self, raw: f64) -> RasterResult<i64> {
        let steps = (raw / self.granularity).round();
        // i64::MIN is exactly representable, i64::MAX rounds up to 2^63.
        if !steps.is_finite() || steps < i64::MIN as f64 || steps >= i64::MAX as f64 {
            return Err(RasterError::UnrepresentableValue {
                axis: self.name.clone(),
                value: raw,
            });
        }
        Ok(steps as i64)
    }
}

/// Immutable coordinate tuple, one value per axis
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position(Box<[i64]>);

impl Position {
    pub(crate) fn from_coords(coords: &[i64]) -> Self {
        Self(coords.into())
    }

    pub fn coords(&self) -> &[i64] {
        &self.0
    }

    pub fn get(&self, axis: usize) -> Option<i64> {
        self.0.get(axis).copied()
    }

    pub fn axis_count(&self) -> usize {
        self.0.len()
    }
}
