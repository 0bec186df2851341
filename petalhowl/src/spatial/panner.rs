//! Per-source panner attributes.
//!
//! Values are forwarded to the engine untouched. Ranges are documented on each field, but
//! nothing here clamps: the engine owns the spatialization math.

use crate::error::{PetalHowlError, Result};
use std::fmt;
use std::str::FromStr;

/// Algorithm used to reduce volume as a source moves away from the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DistanceModel {
    Linear,
    #[default]
    Inverse,
    Exponential,
}

impl DistanceModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Inverse => "inverse",
            Self::Exponential => "exponential",
        }
    }
}

impl FromStr for DistanceModel {
    type Err = PetalHowlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linear" => Ok(Self::Linear),
            "inverse" => Ok(Self::Inverse),
            "exponential" => Ok(Self::Exponential),
            other => Err(PetalHowlError::InvalidEnumValue {
                kind: "distance model",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for DistanceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spatialization algorithm used to position a source in 3D space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PanningModel {
    #[default]
    Hrtf,
    EqualPower,
}

impl PanningModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hrtf => "HRTF",
            Self::EqualPower => "equalpower",
        }
    }
}

impl FromStr for PanningModel {
    type Err = PetalHowlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "HRTF" => Ok(Self::Hrtf),
            "equalpower" => Ok(Self::EqualPower),
            other => Err(PetalHowlError::InvalidEnumValue {
                kind: "panning model",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for PanningModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cone and distance-falloff attributes of a source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PannerAttr {
    /// Angle in degrees of the inner cone; inside it there is no volume reduction.
    pub cone_inner_angle: f32,
    /// Angle in degrees of the outer cone; outside it volume is `cone_outer_gain`.
    pub cone_outer_angle: f32,
    /// Linear gain applied outside the outer cone (0.0 - 1.0).
    pub cone_outer_gain: f32,
    pub distance_model: DistanceModel,
    /// Distance beyond which volume is no longer reduced.
    pub max_distance: f32,
    /// Distance at which volume reduction starts.
    pub ref_distance: f32,
    /// How quickly volume drops with distance. `[0, 1]` for linear, `[0, inf)` otherwise.
    pub rolloff_factor: f32,
    pub panning_model: PanningModel,
}

impl Default for PannerAttr {
    fn default() -> Self {
        Self {
            cone_inner_angle: 360.0,
            cone_outer_angle: 360.0,
            cone_outer_gain: 0.0,
            distance_model: DistanceModel::Inverse,
            max_distance: 10000.0,
            ref_distance: 1.0,
            rolloff_factor: 1.0,
            panning_model: PanningModel::Hrtf,
        }
    }
}

impl PannerAttr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cone(mut self, inner_angle: f32, outer_angle: f32, outer_gain: f32) -> Self {
        self.cone_inner_angle = inner_angle;
        self.cone_outer_angle = outer_angle;
        self.cone_outer_gain = outer_gain;
        self
    }

    pub fn distance_model(mut self, model: DistanceModel) -> Self {
        self.distance_model = model;
        self
    }

    pub fn max_distance(mut self, distance: f32) -> Self {
        self.max_distance = distance;
        self
    }

    pub fn ref_distance(mut self, distance: f32) -> Self {
        self.ref_distance = distance;
        self
    }

    pub fn rolloff_factor(mut self, factor: f32) -> Self {
        self.rolloff_factor = factor;
        self
    }

    pub fn panning_model(mut self, model: PanningModel) -> Self {
        self.panning_model = model;
        self
    }

    /// Sets both models from their engine names, e.g. `("linear", "equalpower")`.
    pub fn with_model_names(mut self, distance_model: &str, panning_model: &str) -> Result<Self> {
        self.distance_model = distance_model.parse()?;
        self.panning_model = panning_model.parse()?;
        Ok(self)
    }
}
