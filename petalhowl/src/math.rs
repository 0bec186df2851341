//! Math types for PetalHowl

pub use glam::{Quat, Vec3};

/// Facing of the listener: where its face points and where the top of its head points.
///
/// The two vectors are expected to be at right angles; this is not validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub front: Vec3,
    pub up: Vec3,
}

impl Orientation {
    pub fn new(front: Vec3, up: Vec3) -> Self {
        Self { front, up }
    }

    /// Builds the orientation a rotation applies to the default -Z forward, +Y up frame.
    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            front: rotation * (-Vec3::Z),
            up: rotation * Vec3::Y,
        }
    }

    pub fn right(&self) -> Vec3 {
        self.front.cross(self.up)
    }

    /// Flattened `[x, y, z, xUp, yUp, zUp]` layout used by web-style engines.
    pub fn to_array(&self) -> [f32; 6] {
        [
            self.front.x,
            self.front.y,
            self.front.z,
            self.up.x,
            self.up.y,
            self.up.z,
        ]
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self {
            front: -Vec3::Z,
            up: Vec3::Y,
        }
    }
}
