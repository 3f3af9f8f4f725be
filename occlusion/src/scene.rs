//! The world-space description of a diagram: points, segments between them, and
//! planar convex polygons with those points as vertices.

use std::collections::{HashMap, HashSet};

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::geom::{cyclic_pairs, Vec3};

/// Vertices may stray this far from their polygon's plane.
const PLANARITY_TOLERANCE: f64 = 1e-3;

/// Vertex triples spanning less area than this count as collinear.
const COLLINEAR_EPSILON: f64 = 1e-9;

/// An index into the points of a [`Scene`].
#[derive(Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct PointIdx(pub usize);

impl std::fmt::Debug for PointIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p_{}", self.0)
    }
}

/// An index into the segments of a [`Scene`].
///
/// Two segments with the same endpoints are still different segments.
#[derive(Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct SegIdx(pub usize);

impl std::fmt::Debug for SegIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s_{}", self.0)
    }
}

/// An index into the polygons (faces) of a [`Scene`].
#[derive(Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct PolyIdx(pub usize);

impl std::fmt::Debug for PolyIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "f_{}", self.0)
    }
}

/// Anything that takes part in depth ordering.
#[derive(Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub enum Shape {
    Point(PointIdx),
    Segment(SegIdx),
    Polygon(PolyIdx),
}

impl std::fmt::Debug for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Shape::Point(p) => p.fmt(f),
            Shape::Segment(s) => s.fmt(f),
            Shape::Polygon(q) => q.fmt(f),
        }
    }
}

impl From<PointIdx> for Shape {
    fn from(p: PointIdx) -> Self {
        Shape::Point(p)
    }
}

impl From<SegIdx> for Shape {
    fn from(s: SegIdx) -> Self {
        Shape::Segment(s)
    }
}

impl From<PolyIdx> for Shape {
    fn from(f: PolyIdx) -> Self {
        Shape::Polygon(f)
    }
}

/// Presentation attributes, passed through to the drawing surface untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Style {
    pub color: Option<String>,
    pub width: Option<f64>,
    pub opacity: Option<f64>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SceneError {
    #[error("point index {index} is out of range ({len} points)")]
    PointOutOfRange { index: usize, len: usize },
    #[error("segment starts and ends at {0:?}")]
    DegenerateSegment(PointIdx),
    #[error("polygon needs at least 3 vertices, got {count}")]
    TooFewVertices { count: usize },
    #[error("polygon vertex {0:?} appears more than once")]
    RepeatedVertex(PointIdx),
    #[error("polygon vertices are collinear")]
    Collinear,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub from: PointIdx,
    pub to: PointIdx,
    pub style: Style,
    faces: Vec<PolyIdx>,
}

impl Segment {
    pub fn endpoints(&self) -> [PointIdx; 2] {
        [self.from, self.to]
    }

    pub fn has_endpoint(&self, p: PointIdx) -> bool {
        self.from == p || self.to == p
    }

    /// The endpoint this segment shares with `other`, if there is one.
    pub fn shared_endpoint(&self, other: &Segment) -> Option<PointIdx> {
        self.endpoints().into_iter().find(|&p| other.has_endpoint(p))
    }

    /// The polygons that have this segment as one of their border edges.
    pub fn faces(&self) -> &[PolyIdx] {
        &self.faces
    }
}

/// A planar convex polygon.
///
/// The vertices are stored in angular order around the center, so consecutive
/// vertices (cyclically) are the polygon's border edges.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    vertices: Vec<PointIdx>,
    vertex_set: HashSet<PointIdx>,
    center: Vec3,
    normal: Vec3,
    borders: Vec<SegIdx>,
    pub style: Style,
}

impl Polygon {
    pub fn vertices(&self) -> &[PointIdx] {
        &self.vertices
    }

    pub fn has_vertex(&self, p: PointIdx) -> bool {
        self.vertex_set.contains(&p)
    }

    pub fn edges(&self) -> impl Iterator<Item = (PointIdx, PointIdx)> + '_ {
        cyclic_pairs(&self.vertices).map(|(&p, &q)| (p, q))
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// The world-space unit normal, pointing away from the world origin.
    ///
    /// This is the outward normal as long as the polygon is a face of a convex
    /// solid that contains the origin.
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// The scene segments lying along this polygon's border.
    pub fn borders(&self) -> &[SegIdx] {
        &self.borders
    }
}

/// A serializable description of a scene, with plain indices.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDesc {
    pub points: Vec<Vec3>,
    pub segments: Vec<SegmentDesc>,
    pub polygons: Vec<PolygonDesc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentDesc {
    pub from: usize,
    pub to: usize,
    #[serde(default)]
    pub style: Style,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PolygonDesc {
    pub vertices: Vec<usize>,
    #[serde(default)]
    pub style: Style,
}

fn edge_key(p: PointIdx, q: PointIdx) -> (PointIdx, PointIdx) {
    (p.min(q), p.max(q))
}

#[derive(Clone, Debug, Default)]
pub struct Scene {
    points: Vec<Vec3>,
    segments: Vec<Segment>,
    polygons: Vec<Polygon>,
    /// For each point, the segments having it as an endpoint.
    point_segments: Vec<Vec<SegIdx>>,
    segs_by_edge: HashMap<(PointIdx, PointIdx), Vec<SegIdx>>,
    polys_by_edge: HashMap<(PointIdx, PointIdx), Vec<PolyIdx>>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_desc(desc: &SceneDesc) -> Result<Self, SceneError> {
        let mut ret = Scene::new();
        ret.add_points(desc.points.iter().copied());
        for seg in &desc.segments {
            ret.add_segment(PointIdx(seg.from), PointIdx(seg.to), seg.style.clone())?;
        }
        for poly in &desc.polygons {
            ret.add_polygon(
                poly.vertices.iter().map(|&i| PointIdx(i)),
                poly.style.clone(),
            )?;
        }
        Ok(ret)
    }

    /// Removes everything from the scene.
    pub fn clear(&mut self) {
        *self = Scene::default();
    }

    pub fn add_point(&mut self, p: impl Into<Vec3>) -> PointIdx {
        self.points.push(p.into());
        self.point_segments.push(Vec::new());
        PointIdx(self.points.len() - 1)
    }

    pub fn add_points<P: Into<Vec3>>(&mut self, ps: impl IntoIterator<Item = P>) -> Vec<PointIdx> {
        ps.into_iter().map(|p| self.add_point(p)).collect()
    }

    fn check_point(&self, p: PointIdx) -> Result<(), SceneError> {
        if p.0 < self.points.len() {
            Ok(())
        } else {
            Err(SceneError::PointOutOfRange {
                index: p.0,
                len: self.points.len(),
            })
        }
    }

    pub fn add_segment(
        &mut self,
        from: PointIdx,
        to: PointIdx,
        style: Style,
    ) -> Result<SegIdx, SceneError> {
        self.check_point(from)?;
        self.check_point(to)?;
        if from == to {
            return Err(SceneError::DegenerateSegment(from));
        }

        let idx = SegIdx(self.segments.len());
        let key = edge_key(from, to);
        let faces = self.polys_by_edge.get(&key).cloned().unwrap_or_default();
        for &f in &faces {
            self.polygons[f.0].borders.push(idx);
        }
        self.segments.push(Segment {
            from,
            to,
            style,
            faces,
        });
        self.segs_by_edge.entry(key).or_default().push(idx);
        self.point_segments[from.0].push(idx);
        self.point_segments[to.0].push(idx);
        Ok(idx)
    }

    /// Adds a polygon with the given vertices, which may be listed in any order.
    pub fn add_polygon(
        &mut self,
        vertices: impl IntoIterator<Item = PointIdx>,
        style: Style,
    ) -> Result<PolyIdx, SceneError> {
        let mut vertices: Vec<_> = vertices.into_iter().collect();
        if vertices.len() < 3 {
            return Err(SceneError::TooFewVertices {
                count: vertices.len(),
            });
        }
        let mut vertex_set = HashSet::new();
        for &v in &vertices {
            self.check_point(v)?;
            if !vertex_set.insert(v) {
                return Err(SceneError::RepeatedVertex(v));
            }
        }

        let pos: Vec<Vec3> = vertices.iter().map(|v| self.points[v.0]).collect();
        let center = pos.iter().fold(Vec3::ZERO, |acc, &p| acc + p) * (1.0 / pos.len() as f64);
        let mut normal = widest_normal(&pos).ok_or(SceneError::Collinear)?;
        if normal.dot(&center) < 0.0 {
            normal = -normal;
        }
        debug_assert!(
            pos.iter()
                .all(|p| (*p - center).dot(&normal).abs() < PLANARITY_TOLERANCE),
            "polygon vertices are not planar"
        );

        // Measure angles around the center, starting from the vertex farthest from it.
        let farthest = pos
            .iter()
            .copied()
            .max_by_key(|p| OrderedFloat((*p - center).norm()))
            .unwrap_or(center);
        let u = (farthest - center).unit().ok_or(SceneError::Collinear)?;
        let w = normal.cross(&u);
        let mut by_angle: Vec<_> = vertices
            .iter()
            .zip(&pos)
            .map(|(&v, p)| {
                let d = *p - center;
                (v, d.dot(&w).atan2(d.dot(&u)))
            })
            .collect();
        by_angle.sort_by_key(|&(_, angle)| std::cmp::Reverse(OrderedFloat(angle)));
        vertices = by_angle.into_iter().map(|(v, _)| v).collect();

        let idx = PolyIdx(self.polygons.len());
        let mut borders = Vec::new();
        for (p, q) in cyclic_pairs(&vertices) {
            let key = edge_key(*p, *q);
            if let Some(segs) = self.segs_by_edge.get(&key) {
                for &s in segs {
                    self.segments[s.0].faces.push(idx);
                    borders.push(s);
                }
            }
            self.polys_by_edge.entry(key).or_default().push(idx);
        }
        log::trace!("polygon {idx:?}: vertices {vertices:?}, borders {borders:?}");

        self.polygons.push(Polygon {
            vertices,
            vertex_set,
            center,
            normal,
            borders,
            style,
        });
        Ok(idx)
    }

    pub fn point(&self, idx: PointIdx) -> Vec3 {
        self.points[idx.0]
    }

    pub fn segment(&self, idx: SegIdx) -> &Segment {
        &self.segments[idx.0]
    }

    pub fn polygon(&self, idx: PolyIdx) -> &Polygon {
        &self.polygons[idx.0]
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    pub fn num_polygons(&self) -> usize {
        self.polygons.len()
    }

    pub fn point_indices(&self) -> impl Iterator<Item = PointIdx> {
        (0..self.points.len()).map(PointIdx)
    }

    pub fn segment_indices(&self) -> impl Iterator<Item = SegIdx> {
        (0..self.segments.len()).map(SegIdx)
    }

    pub fn polygon_indices(&self) -> impl Iterator<Item = PolyIdx> {
        (0..self.polygons.len()).map(PolyIdx)
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// The segments having `p` as an endpoint.
    pub fn segments_at(&self, p: PointIdx) -> &[SegIdx] {
        &self.point_segments[p.0]
    }

    /// A cube with vertices at `(±half, ±half, ±half)`, including its 12 edges and 6 faces.
    pub fn cube(half: f64) -> Scene {
        let mut ret = Scene::new();
        let mut corners = Vec::new();
        for x in [-half, half] {
            for y in [-half, half] {
                for z in [-half, half] {
                    corners.push(([x, y, z], ret.add_point([x, y, z])));
                }
            }
        }
        for (i, (p, pi)) in corners.iter().enumerate() {
            for (q, qi) in &corners[i + 1..] {
                let differing = (0..3).filter(|&k| p[k] != q[k]).count();
                if differing == 1 {
                    ret.add_segment(*pi, *qi, Style::default())
                        .expect("cube edges are well-formed");
                }
            }
        }
        for axis in 0..3 {
            for side in [-half, half] {
                let face = corners
                    .iter()
                    .filter(|(p, _)| p[axis] == side)
                    .map(|&(_, idx)| idx);
                ret.add_polygon(face, Style::default())
                    .expect("cube faces are well-formed");
            }
        }
        ret
    }

    /// An octahedron with vertices at distance `radius` along each axis, including
    /// its 12 edges and 8 triangular faces.
    pub fn octahedron(radius: f64) -> Scene {
        let mut ret = Scene::new();
        let mut tips = Vec::new();
        for axis in 0..3 {
            for sign in [-1.0, 1.0] {
                let mut p = [0.0; 3];
                p[axis] = sign * radius;
                tips.push((axis, ret.add_point(p)));
            }
        }
        for (i, &(a, p)) in tips.iter().enumerate() {
            for &(b, q) in &tips[i + 1..] {
                if a != b {
                    ret.add_segment(p, q, Style::default())
                        .expect("octahedron edges are well-formed");
                }
            }
        }
        for signs in 0..8 {
            let face = (0..3).map(|axis| tips[2 * axis + ((signs >> axis) & 1)].1);
            ret.add_polygon(face, Style::default())
                .expect("octahedron faces are well-formed");
        }
        ret
    }
}

/// The unit normal of the plane through `pos`, computed from the vertex triple
/// spanning the largest area. Returns `None` if every triple is collinear.
fn widest_normal(pos: &[Vec3]) -> Option<Vec3> {
    let origin = *pos.first()?;
    let mut best = Vec3::ZERO;
    for (i, p) in pos.iter().enumerate().skip(1) {
        for q in &pos[i + 1..] {
            let n = (*p - origin).cross(&(*q - origin));
            if n.norm() > best.norm() {
                best = n;
            }
        }
    }
    if best.norm() < COLLINEAR_EPSILON {
        None
    } else {
        best.unit()
    }
}
