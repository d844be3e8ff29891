//! Camera basis and perspective projection
//!
//! World → view transform uses a look-at basis derived from position,
//! target and an up hint:
//!
//! ```text
//! forward = normalize(target - position)
//! right   = normalize(cross(up_hint, forward))
//! up      = cross(right, forward)
//! ```
//!
//! With the usual `up_hint = +Y`, `up` comes out as world -Y, which lines up
//! with screen rows growing downward: `screen_y = center_y + view_y * invz`
//! puts increasing world Y higher on the panel.

use crate::fixed::Fixed;
use crate::math::{ScreenPoint, Vec3};

/// Minimum view-space depth that still projects (0.125 world units)
pub const NEAR_PLANE: Fixed = Fixed::from_raw(1 << 13);

/// Orthonormal camera basis (world → view)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CameraBasis {
    /// Camera +X axis
    pub right: Vec3,
    /// Camera +Y axis (re-orthonormalized, along increasing screen rows)
    pub up: Vec3,
    /// Camera +Z axis
    pub forward: Vec3,
}

/// Derive the camera basis from position, target and up hint
pub fn build_camera_basis(position: Vec3, target: Vec3, up_hint: Vec3) -> CameraBasis {
    let forward = (target - position).normalize();
    let right = up_hint.cross(forward).normalize();
    let up = right.cross(forward);
    CameraBasis { right, up, forward }
}

/// Perspective camera
///
/// The basis is derived from position/target/up on construction and
/// re-derived by every setter, so it is never stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Camera {
    position: Vec3,
    target: Vec3,
    up_hint: Vec3,
    /// Focal length in screen pixels
    focal: Fixed,
    /// Screen-center offset
    center_x: Fixed,
    center_y: Fixed,
    basis: CameraBasis,
}

impl Camera {
    /// Create a camera looking from `position` at `target`
    pub fn look_at(
        position: Vec3,
        target: Vec3,
        up_hint: Vec3,
        focal: Fixed,
        center_x: Fixed,
        center_y: Fixed,
    ) -> Self {
        let mut camera = Self {
            position,
            target,
            up_hint,
            focal,
            center_x,
            center_y,
            basis: CameraBasis::default(),
        };
        camera.build_basis();
        camera
    }

    /// Recompute the orthonormal basis from position/target/up
    pub fn build_basis(&mut self) {
        self.basis = build_camera_basis(self.position, self.target, self.up_hint);
    }

    /// Move the camera
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.build_basis();
    }

    /// Change the look-at target
    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
        self.build_basis();
    }

    /// Change the up hint
    pub fn set_up_hint(&mut self, up_hint: Vec3) {
        self.up_hint = up_hint;
        self.build_basis();
    }

    /// Move the camera and retarget it with a single basis rebuild
    pub fn set_view(&mut self, position: Vec3, target: Vec3) {
        self.position = position;
        self.target = target;
        self.build_basis();
    }

    /// Change focal length and screen center (basis unaffected)
    pub fn set_projection(&mut self, focal: Fixed, center_x: Fixed, center_y: Fixed) {
        self.focal = focal;
        self.center_x = center_x;
        self.center_y = center_y;
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn up_hint(&self) -> Vec3 {
        self.up_hint
    }

    pub fn focal(&self) -> Fixed {
        self.focal
    }

    /// Screen-center offset (x, y)
    pub fn center(&self) -> (Fixed, Fixed) {
        (self.center_x, self.center_y)
    }

    pub fn basis(&self) -> &CameraBasis {
        &self.basis
    }

    /// Transform a world point into view space (x right, y down-screen, z depth)
    pub fn to_view(&self, world: Vec3) -> Vec3 {
        let v = world - self.position;
        Vec3::new(
            v.dot(self.basis.right),
            v.dot(self.basis.up),
            v.dot(self.basis.forward),
        )
    }

    /// Project a world point to device pixels
    ///
    /// Returns `None` when the point is at or in front of the near plane,
    /// or when the result does not fit a 16-bit screen coordinate.
    pub fn project(&self, world: Vec3) -> Option<ScreenPoint> {
        let view = self.to_view(world);
        if view.z <= NEAR_PLANE {
            return None;
        }

        let invz = self.focal.checked_div(view.z)?;
        let sx = self.center_x.checked_add(view.x.checked_mul(invz)?)?;
        let sy = self.center_y.checked_add(view.y.checked_mul(invz)?)?;

        let x = i16::try_from(sx.round_to_int()).ok()?;
        let y = i16::try_from(sy.round_to_int()).ok()?;
        Some(ScreenPoint::new(x, y))
    }
}

/// Project a world point through `camera`
pub fn project_point(camera: &Camera, world: Vec3) -> Option<ScreenPoint> {
    camera.project(world)
}
