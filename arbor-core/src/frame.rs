//! Coordinate frames: an orthonormal rotation plus a translation.
//!
//! The columns of the rotation are the frame's local X, Y and Z axes
//! expressed in world space. A stem grows along its local Z axis.
//! Frames are immutable values; every operation returns a new frame.
//! All angles are in degrees.

use glam::DMat3;

use crate::types::{Degrees, Vector};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    rotation: DMat3,
    origin: Vector,
}

impl Frame {
    pub const IDENTITY: Frame = Frame {
        rotation: DMat3::IDENTITY,
        origin: Vector::ZERO,
    };

    pub fn new(rotation: DMat3, origin: Vector) -> Self {
        Self { rotation, origin }
    }

    #[inline]
    pub fn rotation(&self) -> DMat3 {
        self.rotation
    }

    /// World-space origin of the frame.
    #[inline]
    pub fn origin(&self) -> Vector {
        self.origin
    }

    #[inline]
    pub fn x(&self) -> Vector {
        self.rotation.x_axis
    }

    /// Local Y axis. For leaves this is the normal of the upper side.
    #[inline]
    pub fn y(&self) -> Vector {
        self.rotation.y_axis
    }

    /// Local Z axis: the growth direction, and the normal of a cross-section
    /// plane.
    #[inline]
    pub fn z(&self) -> Vector {
        self.rotation.z_axis
    }

    /// Maps a point from local to world coordinates.
    #[inline]
    pub fn apply(&self, p: Vector) -> Vector {
        self.rotation * p + self.origin
    }

    /// Composes `self` with a frame expressed in `self`'s local coordinates.
    pub fn compose(&self, local: &Frame) -> Frame {
        Frame {
            rotation: self.rotation * local.rotation,
            origin: self.apply(local.origin),
        }
    }

    /// Moves the origin by a vector given in local coordinates.
    pub fn translate(&self, local: Vector) -> Frame {
        Frame {
            rotation: self.rotation,
            origin: self.origin + self.rotation * local,
        }
    }

    /// Moves the origin by a vector given in world coordinates.
    pub fn translate_world(&self, offset: Vector) -> Frame {
        Frame {
            rotation: self.rotation,
            origin: self.origin + offset,
        }
    }

    pub fn rotx(&self, angle: Degrees) -> Frame {
        self.rotate_local(DMat3::from_rotation_x(angle.to_radians()))
    }

    pub fn roty(&self, angle: Degrees) -> Frame {
        self.rotate_local(DMat3::from_rotation_y(angle.to_radians()))
    }

    /// Tilts the local Z axis away from its current direction by `down`
    /// and places the tilt at azimuth `rotate` around the current Z axis.
    ///
    /// Equivalent to the local rotation `Rz(rotate) * Rx(down)`: the new Z
    /// axis encloses exactly `down` degrees with the old one.
    pub fn rotxz(&self, down: Degrees, rotate: Degrees) -> Frame {
        let rz = DMat3::from_rotation_z(rotate.to_radians());
        let rx = DMat3::from_rotation_x(down.to_radians());
        self.rotate_local(rz * rx)
    }

    /// Rotates by `angle` about the local axis lying in the XY plane at
    /// azimuth `rho`.
    pub fn rotaxisz(&self, angle: Degrees, rho: Degrees) -> Frame {
        let rho = rho.to_radians();
        let axis = Vector::new(rho.cos(), rho.sin(), 0.0);
        self.rotate_local(DMat3::from_axis_angle(axis, angle.to_radians()))
    }

    /// Rotates the orientation by `angle` about a world-space `axis`
    /// passing through the frame origin. The origin stays put.
    ///
    /// A zero-length axis leaves the frame unchanged.
    pub fn rotaxis(&self, angle: Degrees, axis: Vector) -> Frame {
        match axis.try_normalize() {
            Some(axis) => Frame {
                rotation: DMat3::from_axis_angle(axis, angle.to_radians()) * self.rotation,
                origin: self.origin,
            },
            None => *self,
        }
    }

    #[inline]
    fn rotate_local(&self, local: DMat3) -> Frame {
        Frame {
            rotation: self.rotation * local,
            origin: self.origin,
        }
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::IDENTITY
    }
}
