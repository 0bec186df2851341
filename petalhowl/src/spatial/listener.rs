use crate::math::{Orientation, Quat, Vec3};

/// The single point of view every spatialized source is rendered against.
///
/// There is one listener per [`Mixer`](crate::Mixer); it is only changed through the mixer
/// so the engine and the local copy never drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Listener {
    pub(crate) position: Vec3,
    pub(crate) orientation: Orientation,
}

impl Listener {
    pub fn new(position: Vec3, orientation: Orientation) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Listener at `position` rotated by `rotation` from the default -Z facing.
    pub fn from_pose(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            orientation: Orientation::from_rotation(rotation),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.position.distance(point)
    }
}
