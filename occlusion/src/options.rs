use serde::{Deserialize, Serialize};

use crate::geom::Vec3;

/// Presentation settings.
///
/// None of these affect how shapes are compared; they only decide what gets drawn
/// and how it is tinted. Every field has a default, so a partial JSON object
/// (even `{}`) deserializes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// If false, polygons are not drawn at all.
    pub draw_faces: bool,
    /// If true, polygons facing away from the eye are drawn too.
    pub draw_back_faces: bool,
    /// If false, points are not drawn (segments still are).
    pub draw_dots: bool,
    /// If true, polygons get a lighting factor.
    pub shade_faces: bool,
    /// If set to `(near, far)`, points and segments fade out between those depths.
    pub fade_range: Option<(f64, f64)>,
    /// A point at depth `z` is drawn with radius `dot_size / z`.
    pub dot_size: f64,
    /// The direction towards the light, in camera space.
    pub light_dir: Vec3,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            draw_faces: true,
            draw_back_faces: false,
            draw_dots: true,
            shade_faces: true,
            fade_range: None,
            dot_size: 0.06,
            light_dir: Vec3::new(-1.0, -1.0, -2.0),
        }
    }
}

impl RenderOptions {
    /// How much of a shape's color survives at depth `z`: 1 at or before the
    /// near end of the fade range, 0 at or beyond the far end.
    pub fn fade_at(&self, z: f64) -> f64 {
        match self.fade_range {
            Some((near, far)) if far > near => (1.0 - (z - near) / (far - near)).clamp(0.0, 1.0),
            Some((near, _)) => {
                if z <= near {
                    1.0
                } else {
                    0.0
                }
            }
            None => 1.0,
        }
    }

    /// The cosine between a camera-space normal and the direction towards the light.
    pub fn toward_light(&self, normal: &Vec3) -> f64 {
        match self.light_dir.unit() {
            Some(light) => normal.dot(&light),
            None => 0.0,
        }
    }
}
