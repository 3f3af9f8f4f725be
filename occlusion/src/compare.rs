//! Pairwise occlusion tests.
//!
//! [`Comparator::compare`] decides, for two shapes, whether one of them hides
//! part of the other. Shapes that don't overlap on screen (and overlapping shapes
//! whose relation can't be determined) are [`Depth::Unordered`], which makes the
//! result a partial order at best. It is not even guaranteed to be acyclic: three
//! mutually overlapping shapes can each hide part of the next one.

use std::cmp::Ordering;

use crate::{
    geom::{point_in_polygon, solve_2x2, ScreenPoint},
    kernel::{Frame, LineEqn},
    scene::{PointIdx, PolyIdx, Scene, SegIdx, Shape},
};

/// Depths closer than this are considered equal.
pub const DEPTH_TOLERANCE: f64 = 1e-7;

/// How the first shape of a comparison relates to the second.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Depth {
    /// The first shape is (at least partly) hidden by the second one, so it must
    /// be drawn first.
    Behind,
    /// The first shape hides (part of) the second one.
    InFront,
    Unordered,
}

impl Depth {
    /// The relation with the roles of the two shapes swapped.
    pub fn reverse(self) -> Depth {
        match self {
            Depth::Behind => Depth::InFront,
            Depth::InFront => Depth::Behind,
            Depth::Unordered => Depth::Unordered,
        }
    }

    /// Converts to a drawing order: shapes that are behind come first.
    pub fn to_ordering(self) -> Option<Ordering> {
        match self {
            Depth::Behind => Some(Ordering::Less),
            Depth::InFront => Some(Ordering::Greater),
            Depth::Unordered => None,
        }
    }

    fn is_determined(self) -> bool {
        self != Depth::Unordered
    }

    /// Compares two depths along the same viewing ray: smaller depths are nearer.
    fn of_depths(first: f64, second: f64) -> Depth {
        if (first - second).abs() <= DEPTH_TOLERANCE {
            Depth::Unordered
        } else if first < second {
            Depth::InFront
        } else {
            Depth::Behind
        }
    }
}

/// A segment in screen space, together with its camera-space line.
struct Span<'a> {
    endpoints: [PointIdx; 2],
    from: ScreenPoint,
    delta: ScreenPoint,
    line: Option<&'a LineEqn>,
}

impl Span<'_> {
    fn shares_endpoint(&self, other: &Span) -> bool {
        self.endpoints.iter().any(|p| other.endpoints.contains(p))
    }
}

/// Compares shapes of one scene, using geometry derived for one camera position.
#[derive(Clone, Copy, Debug)]
pub struct Comparator<'a> {
    scene: &'a Scene,
    frame: &'a Frame,
}

impl<'a> Comparator<'a> {
    pub fn new(scene: &'a Scene, frame: &'a Frame) -> Self {
        Comparator { scene, frame }
    }

    /// Decides how `a` relates to `b`.
    ///
    /// This is antisymmetric: `compare(a, b)` is always `compare(b, a).reverse()`.
    pub fn compare(&self, a: Shape, b: Shape) -> Depth {
        if !self.frame.bbox(a).intersects(&self.frame.bbox(b)) {
            return Depth::Unordered;
        }

        // Same-kind pairs are always evaluated in index order, so that the
        // asymmetric parts of the tests can't break antisymmetry.
        match (a, b) {
            (Shape::Polygon(f), Shape::Polygon(g)) => match f.cmp(&g) {
                Ordering::Less => self.polygon_polygon(f, g),
                Ordering::Greater => self.polygon_polygon(g, f).reverse(),
                Ordering::Equal => Depth::Unordered,
            },
            (Shape::Segment(s), Shape::Segment(t)) => match s.cmp(&t) {
                Ordering::Less => self.segment_segment(s, t),
                Ordering::Greater => self.segment_segment(t, s).reverse(),
                Ordering::Equal => Depth::Unordered,
            },
            (Shape::Segment(s), Shape::Polygon(f)) => self.segment_polygon(s, f),
            (Shape::Polygon(f), Shape::Segment(s)) => self.segment_polygon(s, f).reverse(),
            (Shape::Point(p), Shape::Polygon(f)) => self.point_polygon(p, f),
            (Shape::Polygon(f), Shape::Point(p)) => self.point_polygon(p, f).reverse(),
            // Points are drawn after the segments they belong to, and are too
            // small to hide anything.
            (Shape::Point(_), _) | (_, Shape::Point(_)) => Depth::Unordered,
        }
    }

    fn point_polygon(&self, p: PointIdx, f: PolyIdx) -> Depth {
        if self.scene.polygon(f).has_vertex(p) {
            return Depth::Unordered;
        }
        let q = self.frame.point(p);
        let poly = self.frame.polygon(f);
        if !point_in_polygon(&q.screen, &poly.border) {
            return Depth::Unordered;
        }
        match poly.plane.depth_along(&q.camera) {
            Some(plane_depth) => Depth::of_depths(q.depth, plane_depth),
            None => Depth::Unordered,
        }
    }

    fn polygon_polygon(&self, f: PolyIdx, g: PolyIdx) -> Depth {
        let (poly_f, poly_g) = (self.scene.polygon(f), self.scene.polygon(g));

        // A vertex of one polygon that lies inside the other tells us which is in
        // front. Shared vertices can't tell us anything.
        for &v in poly_f.vertices() {
            let d = self.point_polygon(v, g);
            if d.is_determined() {
                return d;
            }
        }
        for &v in poly_g.vertices() {
            let d = self.point_polygon(v, f);
            if d.is_determined() {
                return d.reverse();
            }
        }

        // No vertex is inside, but the borders may still cross.
        for e in self.polygon_spans(f) {
            for h in self.polygon_spans(g) {
                if e.shares_endpoint(&h) {
                    continue;
                }
                let d = self.crossing(&e, &h);
                if d.is_determined() {
                    return d;
                }
            }
        }
        Depth::Unordered
    }

    fn segment_segment(&self, s: SegIdx, t: SegIdx) -> Depth {
        let (seg_s, seg_t) = (self.scene.segment(s), self.scene.segment(t));
        if let Some(v) = seg_s.shared_endpoint(seg_t) {
            let other_s = if seg_s.from == v { seg_s.to } else { seg_s.from };
            let other_t = if seg_t.from == v { seg_t.to } else { seg_t.from };
            return self.shared_vertex(v, other_s, other_t);
        }
        self.crossing(&self.segment_span(s), &self.segment_span(t))
    }

    /// Two segments leaving the same vertex: near the vertex, the one that heads
    /// more towards the eye is in front.
    fn shared_vertex(&self, v: PointIdx, a: PointIdx, b: PointIdx) -> Depth {
        let v_cam = self.frame.point(v).camera;
        let towards_eye = |other: PointIdx| {
            let dir = (self.frame.point(other).camera - v_cam).unit()?;
            Some(-v_cam.unit()?.dot(&dir))
        };
        match (towards_eye(a), towards_eye(b)) {
            (Some(ka), Some(kb)) if (ka - kb).abs() > DEPTH_TOLERANCE => {
                if ka > kb {
                    Depth::InFront
                } else {
                    Depth::Behind
                }
            }
            _ => Depth::Unordered,
        }
    }

    fn segment_polygon(&self, s: SegIdx, f: PolyIdx) -> Depth {
        let seg = self.scene.segment(s);
        let poly = self.scene.polygon(f);
        if seg.endpoints().iter().all(|&p| poly.has_vertex(p)) {
            // An edge or diagonal of the polygon, drawn on top of it.
            return Depth::InFront;
        }

        for p in seg.endpoints() {
            let d = self.point_polygon(p, f);
            if d.is_determined() {
                return d;
            }
        }

        let span = self.segment_span(s);
        for h in self.polygon_spans(f) {
            if span.shares_endpoint(&h) {
                continue;
            }
            let d = self.crossing(&span, &h);
            if d.is_determined() {
                return d;
            }
        }
        Depth::Unordered
    }

    /// If the two spans cross on screen, compares their depths at the crossing.
    fn crossing(&self, a: &Span, b: &Span) -> Depth {
        let m = [[a.delta.x, -b.delta.x], [a.delta.y, -b.delta.y]];
        let rhs = [b.from.x - a.from.x, b.from.y - a.from.y];
        let Some([t1, t2]) = solve_2x2(m, rhs) else {
            return Depth::Unordered;
        };
        if !(0.0..=1.0).contains(&t1) || !(0.0..=1.0).contains(&t2) {
            return Depth::Unordered;
        }

        let camera = &self.frame.camera;
        let ray_a = camera.ray_through(&a.from.offset(&a.delta, t1));
        let ray_b = camera.ray_through(&b.from.offset(&b.delta, t2));
        let depth_a = a.line.and_then(|l| l.depth_along(&ray_a));
        let depth_b = b.line.and_then(|l| l.depth_along(&ray_b));
        match (depth_a, depth_b) {
            (Some(da), Some(db)) => Depth::of_depths(da, db),
            _ => Depth::Unordered,
        }
    }

    fn segment_span(&self, s: SegIdx) -> Span<'a> {
        let seg = self.scene.segment(s);
        let frame = self.frame.segment(s);
        Span {
            endpoints: seg.endpoints(),
            from: frame.from,
            delta: frame.delta,
            line: frame.line.as_ref(),
        }
    }

    fn polygon_spans(&self, f: PolyIdx) -> impl Iterator<Item = Span<'a>> + 'a {
        self.frame.polygon(f).edges.iter().map(|e| Span {
            endpoints: e.endpoints,
            from: e.from,
            delta: e.delta,
            line: e.line.as_ref(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        camera::{Camera, Transform},
        geom::Vec3,
        scene::Style,
    };
    use proptest::prelude::*;

    fn square(scene: &mut Scene, x: f64, y: f64, z: f64) -> PolyIdx {
        let pts = scene.add_points([
            [x, y, z],
            [x + 1.0, y, z],
            [x + 1.0, y + 1.0, z],
            [x, y + 1.0, z],
        ]);
        scene.add_polygon(pts, Style::default()).unwrap()
    }

    fn segment(scene: &mut Scene, p: [f64; 3], q: [f64; 3]) -> SegIdx {
        let p = scene.add_point(p);
        let q = scene.add_point(q);
        scene.add_segment(p, q, Style::default()).unwrap()
    }

    fn all_shapes(scene: &Scene) -> Vec<Shape> {
        scene
            .point_indices()
            .map(Shape::from)
            .chain(scene.segment_indices().map(Shape::from))
            .chain(scene.polygon_indices().map(Shape::from))
            .collect()
    }

    #[test]
    fn disjoint_squares() {
        let mut scene = Scene::new();
        let f = square(&mut scene, -3.0, 0.0, 5.0);
        let g = square(&mut scene, 2.0, 0.0, 6.0);
        let frame = Frame::derive(&scene, &Camera::default());
        let cmp = Comparator::new(&scene, &frame);

        assert_eq!(cmp.compare(f.into(), g.into()), Depth::Unordered);
        for p in scene.polygon(f).vertices() {
            assert_eq!(cmp.compare((*p).into(), g.into()), Depth::Unordered);
        }
        for p in scene.polygon(g).vertices() {
            assert_eq!(cmp.compare(f.into(), (*p).into()), Depth::Unordered);
        }
    }

    #[test]
    fn overlapping_squares() {
        let mut scene = Scene::new();
        let near = square(&mut scene, 0.0, 0.0, 5.0);
        let far = square(&mut scene, 0.5, 0.5, 6.0);
        let frame = Frame::derive(&scene, &Camera::default());
        let cmp = Comparator::new(&scene, &frame);

        assert_eq!(cmp.compare(near.into(), far.into()), Depth::InFront);
        assert_eq!(cmp.compare(far.into(), near.into()), Depth::Behind);
        assert_eq!(cmp.compare(far.into(), far.into()), Depth::Unordered);
    }

    #[test]
    fn crossed_borders() {
        // A wide, short rectangle in front of a tall, narrow one. Neither has a
        // vertex inside the other, but their borders cross.
        let mut scene = Scene::new();
        let wide = scene.add_points([
            [-2.0, -0.5, 5.0],
            [2.0, -0.5, 5.0],
            [2.0, 0.5, 5.0],
            [-2.0, 0.5, 5.0],
        ]);
        let tall = scene.add_points([
            [-0.5, -2.0, 6.0],
            [0.5, -2.0, 6.0],
            [0.5, 2.0, 6.0],
            [-0.5, 2.0, 6.0],
        ]);
        let wide = scene.add_polygon(wide, Style::default()).unwrap();
        let tall = scene.add_polygon(tall, Style::default()).unwrap();
        let frame = Frame::derive(&scene, &Camera::default());
        let cmp = Comparator::new(&scene, &frame);

        assert_eq!(cmp.compare(wide.into(), tall.into()), Depth::InFront);
        assert_eq!(cmp.compare(tall.into(), wide.into()), Depth::Behind);
    }

    #[test]
    fn adjacent_cube_faces() {
        let cube = Scene::cube(1.0);
        let cam = Camera::orbit(
            Transform::rotate_about(Vec3::new(0.3, -1.0, 0.5), 0.6),
            8.0,
            3.0,
        );
        let frame = Frame::derive(&cube, &cam);
        let cmp = Comparator::new(&cube, &frame);

        let front: Vec<_> = cube
            .polygon_indices()
            .filter(|&f| frame.polygon(f).front_facing)
            .collect();
        let mut checked = 0;
        for &f in &front {
            for &g in &front {
                let shared: Vec<_> = cube
                    .polygon(f)
                    .borders()
                    .iter()
                    .filter(|s| cube.polygon(g).borders().contains(s))
                    .copied()
                    .collect();
                if f == g || shared.is_empty() {
                    continue;
                }
                assert_eq!(cmp.compare(f.into(), g.into()), Depth::Unordered);
                for s in shared {
                    assert_eq!(cmp.compare(s.into(), f.into()), Depth::InFront);
                    assert_eq!(cmp.compare(g.into(), s.into()), Depth::Behind);
                }
                checked += 1;
            }
        }
        assert!(checked > 0);
    }

    #[test]
    fn crossing_segments() {
        let mut scene = Scene::new();
        let s = segment(&mut scene, [-1.0, 0.0, 5.0], [1.0, 0.0, 5.0]);
        let t = segment(&mut scene, [0.0, -1.0, 6.0], [0.0, 1.0, 6.0]);
        let frame = Frame::derive(&scene, &Camera::default());
        let cmp = Comparator::new(&scene, &frame);
        assert_eq!(cmp.compare(s.into(), t.into()), Depth::InFront);
        assert_eq!(cmp.compare(t.into(), s.into()), Depth::Behind);

        // Swap the depths.
        let mut scene = Scene::new();
        let s = segment(&mut scene, [-1.0, 0.0, 6.0], [1.0, 0.0, 6.0]);
        let t = segment(&mut scene, [0.0, -1.0, 5.0], [0.0, 1.0, 5.0]);
        let frame = Frame::derive(&scene, &Camera::default());
        let cmp = Comparator::new(&scene, &frame);
        assert_eq!(cmp.compare(s.into(), t.into()), Depth::Behind);
        assert_eq!(cmp.compare(t.into(), s.into()), Depth::InFront);
    }

    #[test]
    fn segments_that_miss() {
        let mut scene = Scene::new();
        // Their supporting lines cross at the origin, outside both segments.
        let s = segment(&mut scene, [0.5, 0.5, 5.0], [2.0, 2.0, 5.0]);
        let t = segment(&mut scene, [1.0, 0.2, 6.0], [2.0, 0.2, 6.0]);
        let parallel = segment(&mut scene, [0.5, 0.6, 6.0], [2.0, 2.1, 6.0]);
        let frame = Frame::derive(&scene, &Camera::default());
        let cmp = Comparator::new(&scene, &frame);
        assert_eq!(cmp.compare(s.into(), t.into()), Depth::Unordered);
        assert_eq!(cmp.compare(s.into(), parallel.into()), Depth::Unordered);
    }

    #[test]
    fn shared_endpoint() {
        let mut scene = Scene::new();
        let pts = scene.add_points([[0.0, 0.0, 5.0], [1.0, 0.0, 4.0], [1.0, 0.0, 6.0]]);
        let toward = scene.add_segment(pts[0], pts[1], Style::default()).unwrap();
        let away = scene.add_segment(pts[2], pts[0], Style::default()).unwrap();
        let frame = Frame::derive(&scene, &Camera::default());
        let cmp = Comparator::new(&scene, &frame);
        assert_eq!(cmp.compare(toward.into(), away.into()), Depth::InFront);
        assert_eq!(cmp.compare(away.into(), toward.into()), Depth::Behind);
    }

    #[test]
    fn point_and_polygon() {
        let mut scene = Scene::new();
        let f = square(&mut scene, 0.0, 0.0, 5.0);
        let near = scene.add_point([0.5, 0.5, 4.0]);
        let far = scene.add_point([0.5, 0.5, 7.0]);
        let beside = scene.add_point([3.0, 0.5, 4.0]);
        let s = segment(&mut scene, [0.2, 0.2, 3.0], [0.2, 0.2, 9.0]);
        let frame = Frame::derive(&scene, &Camera::default());
        let cmp = Comparator::new(&scene, &frame);

        assert_eq!(cmp.compare(near.into(), f.into()), Depth::InFront);
        assert_eq!(cmp.compare(far.into(), f.into()), Depth::Behind);
        assert_eq!(cmp.compare(f.into(), far.into()), Depth::InFront);
        assert_eq!(cmp.compare(beside.into(), f.into()), Depth::Unordered);
        // A polygon and its own vertex.
        let v = scene.polygon(f).vertices()[0];
        assert_eq!(cmp.compare(v.into(), f.into()), Depth::Unordered);
        // Points are never ordered against points or segments.
        assert_eq!(cmp.compare(near.into(), far.into()), Depth::Unordered);
        assert_eq!(cmp.compare(near.into(), s.into()), Depth::Unordered);
    }

    #[test]
    fn segment_through_polygon() {
        let mut scene = Scene::new();
        let f = square(&mut scene, 0.0, 0.0, 5.0);
        let poking = segment(&mut scene, [0.5, 0.5, 4.0], [3.0, 0.5, 4.0]);
        let under = segment(&mut scene, [-1.0, 0.5, 6.0], [2.0, 0.5, 6.0]);
        let frame = Frame::derive(&scene, &Camera::default());
        let cmp = Comparator::new(&scene, &frame);

        // One endpoint is inside the square's outline.
        assert_eq!(cmp.compare(poking.into(), f.into()), Depth::InFront);
        // No endpoint is inside, but the segment crosses the square's border.
        assert_eq!(cmp.compare(under.into(), f.into()), Depth::Behind);
        assert_eq!(cmp.compare(f.into(), under.into()), Depth::InFront);
    }

    fn coord() -> impl Strategy<Value = f64> {
        -2.0f64..2.0
    }

    fn point() -> impl Strategy<Value = [f64; 3]> {
        (coord(), coord(), 3.0f64..7.0).prop_map(|(x, y, z)| [x, y, z])
    }

    proptest! {
        #[test]
        fn antisymmetric_and_bbox_sound(
            seg_pts in prop::collection::vec((point(), point()), 1..5),
            tri_pts in prop::collection::vec((point(), point(), point()), 1..4),
            loose in prop::collection::vec(point(), 0..3),
        ) {
            let mut scene = Scene::new();
            for (p, q) in seg_pts {
                segment(&mut scene, p, q);
            }
            for (p, q, r) in tri_pts {
                let pts = scene.add_points([p, q, r]);
                // Skip (nearly) degenerate triangles.
                let _ = scene.add_polygon(pts, Style::default());
            }
            scene.add_points(loose);

            let frame = Frame::derive(&scene, &Camera::default());
            let cmp = Comparator::new(&scene, &frame);
            let shapes = all_shapes(&scene);
            for &a in &shapes {
                for &b in &shapes {
                    let ab = cmp.compare(a, b);
                    prop_assert_eq!(ab, cmp.compare(b, a).reverse());
                    if ab != Depth::Unordered {
                        prop_assert!(frame.bbox(a).intersects(&frame.bbox(b)));
                    }
                }
            }
        }
    }
}
