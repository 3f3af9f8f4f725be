//! Affine transforms and the perspective camera.
//!
//! The eye sits at the camera-space origin looking down the positive `z` axis.
//! A camera-space point `(x, y, z)` lands on the screen at
//! `(x / (z / zoom), y / (z / zoom))`, and its depth is `z`.

use serde::{Deserialize, Serialize};

use crate::geom::{ScreenPoint, Vec3};

/// Points closer to the eye than this are behind the camera plane.
pub const DEFAULT_EYE_EPSILON: f64 = 0.001;

/// A 4x4 affine transform acting on column vectors.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub rows: [[f64; 4]; 4],
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        rows: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub fn rotate_x(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut ret = Self::IDENTITY;
        ret.rows[1][1] = c;
        ret.rows[1][2] = -s;
        ret.rows[2][1] = s;
        ret.rows[2][2] = c;
        ret
    }

    pub fn rotate_y(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut ret = Self::IDENTITY;
        ret.rows[0][0] = c;
        ret.rows[0][2] = -s;
        ret.rows[2][0] = s;
        ret.rows[2][2] = c;
        ret
    }

    pub fn rotate_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut ret = Self::IDENTITY;
        ret.rows[0][0] = c;
        ret.rows[0][1] = -s;
        ret.rows[1][0] = s;
        ret.rows[1][1] = c;
        ret
    }

    /// Right-handed rotation by `angle` around `axis` (Rodrigues' formula).
    ///
    /// A zero axis gives the identity.
    pub fn rotate_about(axis: Vec3, angle: f64) -> Self {
        let Some(k) = axis.unit() else {
            return Self::IDENTITY;
        };
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let mut ret = Self::IDENTITY;
        ret.rows[0][..3].copy_from_slice(&[
            t * k.x * k.x + c,
            t * k.x * k.y - s * k.z,
            t * k.x * k.z + s * k.y,
        ]);
        ret.rows[1][..3].copy_from_slice(&[
            t * k.x * k.y + s * k.z,
            t * k.y * k.y + c,
            t * k.y * k.z - s * k.x,
        ]);
        ret.rows[2][..3].copy_from_slice(&[
            t * k.x * k.z - s * k.y,
            t * k.y * k.z + s * k.x,
            t * k.z * k.z + c,
        ]);
        ret
    }

    pub fn translate(offset: Vec3) -> Self {
        let mut ret = Self::IDENTITY;
        ret.rows[0][3] = offset.x;
        ret.rows[1][3] = offset.y;
        ret.rows[2][3] = offset.z;
        ret
    }

    /// The transform that applies `self` first and then `next`.
    pub fn then(&self, next: &Transform) -> Transform {
        *next * *self
    }

    pub fn apply_point(&self, p: &Vec3) -> Vec3 {
        self.apply([p.x, p.y, p.z, 1.0])
    }

    /// Transforms a direction, ignoring the translation part.
    pub fn apply_vector(&self, v: &Vec3) -> Vec3 {
        self.apply([v.x, v.y, v.z, 0.0])
    }

    fn apply(&self, v: [f64; 4]) -> Vec3 {
        let row = |i: usize| {
            self.rows[i]
                .iter()
                .zip(v.iter())
                .map(|(a, b)| a * b)
                .sum::<f64>()
        };
        Vec3::new(row(0), row(1), row(2))
    }
}

impl std::ops::Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        let mut rows = [[0.0; 4]; 4];
        for (i, row) in rows.iter_mut().enumerate() {
            for (j, entry) in row.iter_mut().enumerate() {
                *entry = (0..4).map(|k| self.rows[i][k] * rhs.rows[k][j]).sum();
            }
        }
        Transform { rows }
    }
}

/// A perspective camera: a world-to-camera transform plus the projection parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Camera {
    pub transform: Transform,
    /// The perspective divisor: larger values magnify the picture.
    pub zoom: f64,
    /// Points with depth below this are invisible.
    pub eye_epsilon: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Camera {
            transform: Transform::IDENTITY,
            zoom: 1.0,
            eye_epsilon: DEFAULT_EYE_EPSILON,
        }
    }
}

impl Camera {
    /// A camera looking at the world origin from `distance` away, after the world
    /// has been rotated by `rotation`.
    pub fn orbit(rotation: Transform, distance: f64, zoom: f64) -> Self {
        Camera {
            transform: rotation.then(&Transform::translate(Vec3::new(0.0, 0.0, distance))),
            zoom,
            ..Camera::default()
        }
    }

    pub fn to_camera_space(&self, world: &Vec3) -> Vec3 {
        self.transform.apply_point(world)
    }

    /// Perspective-divides a camera-space point.
    ///
    /// The result is meaningless for points that are not visible.
    pub fn project(&self, p: &Vec3) -> ScreenPoint {
        let w = p.z / self.zoom;
        ScreenPoint::new(p.x / w, p.y / w)
    }

    /// The direction (scaled so that its `z` coordinate is `zoom`) of the viewing ray
    /// through a screen position.
    pub fn ray_through(&self, p: &ScreenPoint) -> Vec3 {
        Vec3::new(p.x, p.y, self.zoom)
    }

    pub fn is_visible(&self, p: &Vec3) -> bool {
        p.z >= self.eye_epsilon
    }
}
