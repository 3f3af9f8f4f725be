//! Per-frame geometry: everything the comparator needs, derived once from a
//! [`Scene`] and a [`Camera`].
//!
//! A [`Frame`] is a snapshot. It holds no references to the scene, and it is
//! rebuilt from scratch whenever the camera moves.

use crate::{
    camera::Camera,
    geom::{cyclic_pairs, BoundingBox, ScreenPoint, Vec3},
    scene::{PointIdx, PolyIdx, Scene, SegIdx, Shape},
};

/// Denominators smaller than this mean that a viewing ray grazes a line or plane.
const GRAZING_EPSILON: f64 = 1e-12;

/// A point after the camera transform and perspective division.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectedPoint {
    /// The camera-space position.
    pub camera: Vec3,
    pub screen: ScreenPoint,
    pub depth: f64,
    /// Is the point far enough in front of the eye to be drawn?
    pub visible: bool,
}

/// The equation of a camera-space line that does not pass through the eye.
///
/// `c` is the line's unit direction, `a` is the unit normal of the plane through
/// the eye and the line, and `b = a × c`. Every point `p` of the line satisfies
/// `⟨b, p⟩ = d`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineEqn {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
    pub d: f64,
}

impl LineEqn {
    /// The line through two camera-space points, or `None` if the points coincide
    /// or the line passes through the eye.
    pub fn through(p0: &Vec3, p1: &Vec3) -> Option<LineEqn> {
        let c = (*p1 - *p0).unit()?;
        let a = p0.cross(p1).unit()?;
        let b = a.cross(&c);
        Some(LineEqn {
            a,
            b,
            c,
            d: b.dot(p0),
        })
    }

    /// The depth at which the viewing ray with direction `ray` meets this line.
    ///
    /// This is only meaningful if the ray actually hits the line, i.e. if its
    /// screen position lies on the line's projection. See [`Camera::ray_through`].
    pub fn depth_along(&self, ray: &Vec3) -> Option<f64> {
        let denom = ray.dot(&self.b);
        (denom.abs() > GRAZING_EPSILON).then(|| ray.z * self.d / denom)
    }
}

/// The camera-space plane `⟨n, p⟩ = c` of a polygon, with `n` the polygon's
/// (outward) unit normal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaneEqn {
    pub n: Vec3,
    pub c: f64,
}

impl PlaneEqn {
    /// The depth at which the viewing ray through the camera-space point `q` meets
    /// this plane.
    pub fn depth_along(&self, q: &Vec3) -> Option<f64> {
        let denom = q.dot(&self.n);
        (denom.abs() > GRAZING_EPSILON).then(|| q.z * self.c / denom)
    }

    /// Does the plane's normal point towards the eye (or, at worst, sideways)?
    pub fn faces_eye(&self) -> bool {
        self.c <= 0.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SegmentFrame {
    pub from: ScreenPoint,
    /// `to - from`, in screen space.
    pub delta: ScreenPoint,
    pub line: Option<LineEqn>,
    pub visible: bool,
    pub bbox: BoundingBox,
}

/// One border edge of a projected polygon.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeFrame {
    pub endpoints: [PointIdx; 2],
    pub from: ScreenPoint,
    pub delta: ScreenPoint,
    pub line: Option<LineEqn>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PolygonFrame {
    pub plane: PlaneEqn,
    /// The projected vertices, in the polygon's vertex order.
    pub border: Vec<ScreenPoint>,
    pub edges: Vec<EdgeFrame>,
    pub front_facing: bool,
    /// Are all the vertices visible?
    pub visible: bool,
    pub bbox: BoundingBox,
}

/// The derived geometry of a whole scene under one camera.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub camera: Camera,
    points: Vec<ProjectedPoint>,
    segments: Vec<SegmentFrame>,
    polygons: Vec<PolygonFrame>,
}

impl Frame {
    pub fn derive(scene: &Scene, camera: &Camera) -> Frame {
        let points: Vec<_> = scene
            .points()
            .iter()
            .map(|world| {
                let camera_pos = camera.to_camera_space(world);
                ProjectedPoint {
                    camera: camera_pos,
                    screen: camera.project(&camera_pos),
                    depth: camera_pos.z,
                    visible: camera.is_visible(&camera_pos),
                }
            })
            .collect();

        let segments = scene
            .segment_indices()
            .map(|s| {
                let seg = scene.segment(s);
                let (p, q) = (&points[seg.from.0], &points[seg.to.0]);
                let visible = p.visible && q.visible;
                SegmentFrame {
                    from: p.screen,
                    delta: q.screen - p.screen,
                    line: if visible {
                        LineEqn::through(&p.camera, &q.camera)
                    } else {
                        None
                    },
                    visible,
                    bbox: BoundingBox::around(&p.screen).including(&q.screen),
                }
            })
            .collect();

        let polygons = scene
            .polygon_indices()
            .map(|f| {
                let poly = scene.polygon(f);
                let verts: Vec<&ProjectedPoint> =
                    poly.vertices().iter().map(|v| &points[v.0]).collect();
                let border: Vec<ScreenPoint> = verts.iter().map(|p| p.screen).collect();
                let n = camera.transform.apply_vector(&poly.normal());
                let plane = PlaneEqn {
                    n,
                    c: verts.first().map_or(0.0, |p| n.dot(&p.camera)),
                };
                let edges = cyclic_pairs(poly.vertices())
                    .map(|(&i, &j)| {
                        let (p, q) = (&points[i.0], &points[j.0]);
                        EdgeFrame {
                            endpoints: [i, j],
                            from: p.screen,
                            delta: q.screen - p.screen,
                            line: LineEqn::through(&p.camera, &q.camera),
                        }
                    })
                    .collect();
                PolygonFrame {
                    front_facing: plane.faces_eye(),
                    visible: verts.iter().all(|p| p.visible),
                    bbox: BoundingBox::enclosing(&border)
                        .unwrap_or_else(|| BoundingBox::around(&ScreenPoint::default())),
                    plane,
                    border,
                    edges,
                }
            })
            .collect();

        Frame {
            camera: *camera,
            points,
            segments,
            polygons,
        }
    }

    pub fn point(&self, idx: PointIdx) -> &ProjectedPoint {
        &self.points[idx.0]
    }

    pub fn segment(&self, idx: SegIdx) -> &SegmentFrame {
        &self.segments[idx.0]
    }

    pub fn polygon(&self, idx: PolyIdx) -> &PolygonFrame {
        &self.polygons[idx.0]
    }

    pub fn bbox(&self, shape: Shape) -> BoundingBox {
        match shape {
            Shape::Point(p) => BoundingBox::around(&self.point(p).screen),
            Shape::Segment(s) => self.segment(s).bbox,
            Shape::Polygon(f) => self.polygon(f).bbox,
        }
    }

    pub fn is_visible(&self, shape: Shape) -> bool {
        match shape {
            Shape::Point(p) => self.point(p).visible,
            Shape::Segment(s) => self.segment(s).visible,
            Shape::Polygon(f) => self.polygon(f).visible,
        }
    }
}
