//! Turning a depth-sorted list of shapes into the final drawing order.
//!
//! Depth sorting alone doesn't know that a polygon's border segments should be
//! drawn on top of it, or that a point (drawn as a dot) belongs on top of the
//! segments that meet there. The scheduler holds each segment back until all its
//! polygons are drawn, and each point until all its segments are drawn.

use crate::scene::{PointIdx, PolyIdx, Scene, SegIdx, Shape};

/// Which shapes are drawn in the current frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Participation {
    points: Vec<bool>,
    segments: Vec<bool>,
    polygons: Vec<bool>,
}

impl Participation {
    /// Asks `include` about every shape in the scene.
    pub fn new(scene: &Scene, mut include: impl FnMut(Shape) -> bool) -> Self {
        Participation {
            points: scene.point_indices().map(|p| include(p.into())).collect(),
            segments: scene.segment_indices().map(|s| include(s.into())).collect(),
            polygons: scene.polygon_indices().map(|f| include(f.into())).collect(),
        }
    }

    /// Everything in the scene participates.
    pub fn all(scene: &Scene) -> Self {
        Self::new(scene, |_| true)
    }

    pub fn contains(&self, shape: Shape) -> bool {
        match shape {
            Shape::Point(p) => self.points[p.0],
            Shape::Segment(s) => self.segments[s.0],
            Shape::Polygon(f) => self.polygons[f.0],
        }
    }

    pub fn points(&self) -> impl Iterator<Item = PointIdx> + '_ {
        (0..self.points.len()).filter(|&i| self.points[i]).map(PointIdx)
    }

    pub fn segments(&self) -> impl Iterator<Item = SegIdx> + '_ {
        (0..self.segments.len()).filter(|&i| self.segments[i]).map(SegIdx)
    }

    pub fn polygons(&self) -> impl Iterator<Item = PolyIdx> + '_ {
        (0..self.polygons.len()).filter(|&i| self.polygons[i]).map(PolyIdx)
    }

    pub fn len(&self) -> usize {
        self.points().count() + self.segments().count() + self.polygons().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct DepthScheduler<'a> {
    scene: &'a Scene,
    participation: &'a Participation,
    /// For each point, the number of its participating segments not yet emitted.
    point_pending: Vec<usize>,
    /// For each segment, the number of its participating polygons not yet emitted.
    seg_pending: Vec<usize>,
    /// For each segment, its position in the sorted input, once we've reached it.
    seg_reached: Vec<Option<usize>>,
    point_done: Vec<bool>,
    seg_done: Vec<bool>,
    poly_done: Vec<bool>,
    out: Vec<Shape>,
}

impl<'a> DepthScheduler<'a> {
    pub fn new(scene: &'a Scene, participation: &'a Participation) -> Self {
        let point_pending = scene
            .point_indices()
            .map(|p| {
                scene
                    .segments_at(p)
                    .iter()
                    .filter(|&&s| participation.contains(s.into()))
                    .count()
            })
            .collect();
        let seg_pending = scene
            .segment_indices()
            .map(|s| {
                scene
                    .segment(s)
                    .faces()
                    .iter()
                    .filter(|&&f| participation.contains(f.into()))
                    .count()
            })
            .collect();
        DepthScheduler {
            scene,
            participation,
            point_pending,
            seg_pending,
            seg_reached: vec![None; scene.num_segments()],
            point_done: vec![false; scene.num_points()],
            seg_done: vec![false; scene.num_segments()],
            poly_done: vec![false; scene.num_polygons()],
            out: Vec::new(),
        }
    }

    /// The shapes that need depth sorting: every participating polygon and
    /// segment, and the participating points that aren't the endpoint of any
    /// participating segment.
    pub fn sortable(&self) -> Vec<Shape> {
        let p = self.participation;
        p.points()
            .filter(|pt| self.point_pending[pt.0] == 0)
            .map(Shape::from)
            .chain(p.segments().map(Shape::from))
            .chain(p.polygons().map(Shape::from))
            .collect()
    }

    /// Produces the drawing order, given the depth-sorted shapes.
    ///
    /// Every participating shape appears exactly once in the output, even if it
    /// was missing from `sorted`. Non-participating shapes are ignored.
    pub fn schedule(mut self, sorted: &[Shape]) -> Vec<Shape> {
        for (pos, &shape) in sorted.iter().enumerate() {
            if !self.participation.contains(shape) {
                continue;
            }
            match shape {
                Shape::Polygon(f) => self.emit_polygon(f),
                Shape::Segment(s) => {
                    if self.seg_reached[s.0].is_none() {
                        self.seg_reached[s.0] = Some(pos);
                    }
                    if self.seg_pending[s.0] == 0 {
                        self.emit_segment(s);
                    }
                }
                Shape::Point(p) => {
                    if self.point_pending[p.0] == 0 {
                        self.emit_point(p);
                    }
                }
            }
        }

        let left: Vec<_> = self.participation.polygons().collect();
        for f in left {
            self.emit_polygon(f);
        }
        let left: Vec<_> = self.participation.segments().collect();
        for s in left {
            self.emit_segment(s);
        }
        let left: Vec<_> = self.participation.points().collect();
        for p in left {
            self.emit_point(p);
        }
        self.out
    }

    fn emit_polygon(&mut self, f: PolyIdx) {
        if self.poly_done[f.0] {
            return;
        }
        self.poly_done[f.0] = true;
        self.out.push(Shape::Polygon(f));

        let mut ready = Vec::new();
        for &s in self.scene.polygon(f).borders() {
            if !self.participation.contains(s.into()) {
                continue;
            }
            self.seg_pending[s.0] = self.seg_pending[s.0].saturating_sub(1);
            if self.seg_pending[s.0] == 0 {
                if let Some(pos) = self.seg_reached[s.0] {
                    ready.push((pos, s));
                }
            }
        }
        // Segments released together keep their sorted order.
        ready.sort();
        for (_, s) in ready {
            self.emit_segment(s);
        }
    }

    fn emit_segment(&mut self, s: SegIdx) {
        if self.seg_done[s.0] {
            return;
        }
        self.seg_done[s.0] = true;
        self.out.push(Shape::Segment(s));

        for p in self.scene.segment(s).endpoints() {
            if !self.participation.contains(p.into()) {
                continue;
            }
            self.point_pending[p.0] = self.point_pending[p.0].saturating_sub(1);
            if self.point_pending[p.0] == 0 {
                self.emit_point(p);
            }
        }
    }

    fn emit_point(&mut self, p: PointIdx) {
        if !self.point_done[p.0] {
            self.point_done[p.0] = true;
            self.out.push(Shape::Point(p));
        }
    }
}
