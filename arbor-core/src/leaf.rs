//! Leaves and the bend-toward-light adjustment.

use crate::{
    frame::Frame,
    types::{Degrees, Vector},
};

/// A leaf: its frame's Z axis runs along the blade, Y is the upper-side
/// normal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Leaf {
    frame: Frame,
}

impl Leaf {
    /// Creates a leaf at `frame`, bent toward the light by `bend`
    /// (`LeafBend`, 0 = no bending).
    pub fn new(frame: Frame, bend: f64) -> Self {
        let frame = if bend == 0.0 {
            frame
        } else {
            tilt_up(turn_to_light(frame, bend), bend)
        };
        Self { frame }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn position(&self) -> Vector {
        self.frame.origin()
    }
}

/// Rotates the leaf about the world Z axis so its normal turns toward the
/// direction pointing away from the tree axis.
fn turn_to_light(frame: Frame, bend: f64) -> Frame {
    let pos = frame.origin();
    let norm = frame.y();
    let tpos = atan2_deg(pos.y, pos.x);
    let tbend = tpos - atan2_deg(norm.y, norm.x);
    frame.rotaxis(bend * tbend, Vector::Z)
}

/// Tilts the leaf about its own X axis in proportion to the normal's angle
/// from vertical.
///
/// This is a cheaper stand-in for rotating into the leaf's azimuth, tilting
/// and rotating back. Exported geometry depends on it, keep the form.
fn tilt_up(frame: Frame, bend: f64) -> Frame {
    let norm = frame.y();
    let fbend = atan2_deg(norm.x.hypot(norm.y), norm.z);
    frame.rotx(bend * fbend)
}

fn atan2_deg(y: f64, x: f64) -> Degrees {
    y.atan2(x).to_degrees()
}
