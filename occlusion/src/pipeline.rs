//! Putting it all together: from a scene and a camera to calls on a surface.

use std::collections::HashMap;

use crate::{
    camera::Camera,
    compare::Comparator,
    geom::ScreenPoint,
    kernel::Frame,
    options::RenderOptions,
    partial_order::{PartialOrderSorter, SortStats},
    scene::{Scene, Shape, Style},
    schedule::{DepthScheduler, Participation},
    surface::{DrawingSurface, Handle, Tint},
};

/// Where a shape goes on screen.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Dot { center: ScreenPoint, radius: f64 },
    Line { from: ScreenPoint, to: ScreenPoint },
    Polygon { border: Vec<ScreenPoint> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct DrawItem {
    pub shape: Shape,
    pub geometry: Geometry,
    pub tint: Tint,
}

/// Everything to draw in one frame, from back to front.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrawPlan {
    pub items: Vec<DrawItem>,
    pub stats: SortStats,
}

impl DrawPlan {
    pub fn order(&self) -> impl Iterator<Item = Shape> + '_ {
        self.items.iter().map(|item| item.shape)
    }

    pub fn position(&self, shape: Shape) -> Option<usize> {
        self.order().position(|s| s == shape)
    }
}

/// Is `shape` drawn in this frame?
///
/// Everything must be entirely in front of the eye. Polygons must also be
/// facing the eye, unless back faces are enabled.
pub fn participates(frame: &Frame, options: &RenderOptions, shape: Shape) -> bool {
    match shape {
        Shape::Point(p) => options.draw_dots && frame.point(p).visible,
        Shape::Segment(s) => frame.segment(s).visible,
        Shape::Polygon(f) => {
            let poly = frame.polygon(f);
            options.draw_faces && poly.visible && (poly.front_facing || options.draw_back_faces)
        }
    }
}

/// Decides what to draw, and in which order.
///
/// This is a pure function of its inputs: planning the same frame twice gives
/// the same plan.
pub fn plan_frame(scene: &Scene, camera: &Camera, options: &RenderOptions) -> DrawPlan {
    let frame = Frame::derive(scene, camera);
    let participation = Participation::new(scene, |shape| participates(&frame, options, shape));
    let scheduler = DepthScheduler::new(scene, &participation);

    let cmp = Comparator::new(scene, &frame);
    // Geometric comparisons can be cyclic, so the sorter's consistency check
    // would be too strict here.
    let sorted = PartialOrderSorter::new(scheduler.sortable(), |a: &Shape, b: &Shape| {
        cmp.compare(*a, *b).to_ordering()
    })
    .check_invariants(false)
    .sort();
    let order = scheduler.schedule(&sorted.order);
    log::debug!(
        "planned {} shapes ({} sorted) with {} comparisons",
        order.len(),
        sorted.order.len(),
        sorted.stats.comparisons
    );

    let items = order
        .into_iter()
        .map(|shape| draw_item(scene, &frame, options, shape))
        .collect();
    DrawPlan {
        items,
        stats: sorted.stats,
    }
}

fn draw_item(scene: &Scene, frame: &Frame, options: &RenderOptions, shape: Shape) -> DrawItem {
    let (geometry, tint) = match shape {
        Shape::Point(p) => {
            let q = frame.point(p);
            (
                Geometry::Dot {
                    center: q.screen,
                    radius: options.dot_size / q.depth,
                },
                Tint {
                    fade: options.fade_at(q.depth),
                    light: None,
                },
            )
        }
        Shape::Segment(s) => {
            let seg = scene.segment(s);
            let (a, b) = (frame.point(seg.from), frame.point(seg.to));
            (
                Geometry::Line {
                    from: a.screen,
                    to: b.screen,
                },
                Tint {
                    fade: options.fade_at((a.depth + b.depth) / 2.0),
                    light: None,
                },
            )
        }
        Shape::Polygon(f) => {
            let poly = frame.polygon(f);
            (
                Geometry::Polygon {
                    border: poly.border.clone(),
                },
                Tint {
                    fade: 1.0,
                    light: options
                        .shade_faces
                        .then(|| options.toward_light(&poly.plane.n)),
                },
            )
        }
    };
    DrawItem {
        shape,
        geometry,
        tint,
    }
}

/// Draws frames of a scene onto a surface.
///
/// Surface elements are created the first time a shape is drawn, and reused
/// afterwards. If the scene is replaced or cleared, call [`Renderer::reset`].
pub struct Renderer<S> {
    surface: S,
    options: RenderOptions,
    handles: HashMap<Shape, Handle>,
}

impl<S: DrawingSurface> Renderer<S> {
    pub fn new(surface: S, options: RenderOptions) -> Self {
        Renderer {
            surface,
            options,
            handles: HashMap::new(),
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: RenderOptions) {
        self.options = options;
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    /// Forgets all the surface elements that were created so far.
    pub fn reset(&mut self) {
        self.handles.clear();
    }

    /// Plans and draws one frame.
    pub fn tick(&mut self, scene: &Scene, camera: &Camera) -> DrawPlan {
        let plan = plan_frame(scene, camera, &self.options);
        self.draw(scene, &plan);
        plan
    }

    /// Draws a plan that was made for `scene`.
    pub fn draw(&mut self, scene: &Scene, plan: &DrawPlan) {
        let mut shown = Vec::with_capacity(plan.items.len());
        for item in &plan.items {
            let handle = self.handle(scene, item.shape);
            match &item.geometry {
                Geometry::Dot { center, radius } => {
                    self.surface.move_point(handle, *center, *radius, item.tint)
                }
                Geometry::Line { from, to } => {
                    self.surface.move_segment(handle, *from, *to, item.tint)
                }
                Geometry::Polygon { border } => {
                    self.surface.move_polygon(handle, border, item.tint)
                }
            }
            shown.push(handle);
        }

        self.surface.begin_frame();
        for handle in shown {
            self.surface.show(handle);
        }
        self.surface.render();
    }

    fn handle(&mut self, scene: &Scene, shape: Shape) -> Handle {
        if let Some(&h) = self.handles.get(&shape) {
            return h;
        }
        let h = match shape {
            Shape::Point(_) => self.surface.add_point(&Style::default()),
            Shape::Segment(s) => self.surface.add_segment(&scene.segment(s).style),
            Shape::Polygon(f) => self.surface.add_polygon(&scene.polygon(f).style),
        };
        self.handles.insert(shape, h);
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        camera::Transform,
        geom::Vec3,
        surface::{RecordingSurface, SurfaceCall},
    };

    fn demo_camera() -> Camera {
        Camera::orbit(
            Transform::rotate_about(Vec3::new(0.3, -1.0, 0.5), 0.6),
            8.0,
            3.0,
        )
    }

    #[test]
    fn idempotent() {
        let cube = Scene::cube(1.0);
        let opts = RenderOptions {
            fade_range: Some((6.0, 16.0)),
            ..RenderOptions::default()
        };
        let first = plan_frame(&cube, &demo_camera(), &opts);
        let second = plan_frame(&cube, &demo_camera(), &opts);
        assert_eq!(first, second);
    }

    #[test]
    fn cube_participants() {
        let cube = Scene::cube(1.0);
        let cam = demo_camera();
        let frame = Frame::derive(&cube, &cam);
        let front = cube
            .polygon_indices()
            .filter(|&f| frame.polygon(f).front_facing)
            .count();

        let plan = plan_frame(&cube, &cam, &RenderOptions::default());
        assert_eq!(plan.items.len(), 8 + 12 + front);

        let opts = RenderOptions {
            draw_back_faces: true,
            ..RenderOptions::default()
        };
        assert_eq!(plan_frame(&cube, &cam, &opts).items.len(), 8 + 12 + 6);

        let opts = RenderOptions {
            draw_faces: false,
            draw_dots: false,
            ..RenderOptions::default()
        };
        let plan = plan_frame(&cube, &cam, &opts);
        assert!(plan.order().all(|s| matches!(s, Shape::Segment(_))));
        assert_eq!(plan.items.len(), 12);
    }

    #[test]
    fn structural_order() {
        let cube = Scene::cube(1.0);
        let plan = plan_frame(&cube, &demo_camera(), &RenderOptions::default());
        let pos = |shape: Shape| plan.position(shape);
        for f in cube.polygon_indices() {
            let Some(fp) = pos(f.into()) else { continue };
            for &s in cube.polygon(f).borders() {
                assert!(fp < pos(s.into()).unwrap());
            }
        }
        for p in cube.point_indices() {
            for &s in cube.segments_at(p) {
                assert!(pos(s.into()).unwrap() < pos(p.into()).unwrap());
            }
        }
    }

    #[test]
    fn behind_the_eye() {
        let mut scene = Scene::new();
        let cam = Camera::default();
        let on = scene.add_point([0.0, 0.0, cam.eye_epsilon]);
        let off = scene.add_point([0.1, 0.0, cam.eye_epsilon - 1e-6]);
        let plan = plan_frame(&scene, &cam, &RenderOptions::default());
        let order: Vec<Shape> = plan.order().collect();
        assert_eq!(order, vec![Shape::from(on)]);
        assert!(plan.position(off.into()).is_none());
    }

    #[test]
    fn tints() {
        let mut scene = Scene::new();
        let pts = scene.add_points([[-1.0, -1.0, 6.0], [1.0, -1.0, 6.0], [0.0, 1.0, 16.0]]);
        let s = scene.add_segment(pts[0], pts[2], Style::default()).unwrap();
        let opts = RenderOptions {
            fade_range: Some((6.0, 16.0)),
            ..RenderOptions::default()
        };
        let plan = plan_frame(&scene, &Camera::default(), &opts);
        for item in &plan.items {
            match item.shape {
                Shape::Point(p) if p == pts[1] => {
                    assert_eq!(item.tint.fade, 1.0);
                    assert_eq!(
                        item.geometry,
                        Geometry::Dot {
                            center: ScreenPoint::new(1.0 / 6.0, -1.0 / 6.0),
                            radius: opts.dot_size / 6.0,
                        }
                    );
                }
                Shape::Point(p) if p == pts[2] => assert_eq!(item.tint.fade, 0.0),
                Shape::Segment(t) => {
                    assert_eq!(t, s);
                    assert_eq!(item.tint.fade, 0.5);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn renderer_reuses_elements() {
        let cube = Scene::cube(1.0);
        let mut renderer = Renderer::new(RecordingSurface::new(), RenderOptions::default());
        let plan = renderer.tick(&cube, &demo_camera());
        let created = renderer.surface().num_elements();
        assert_eq!(created, plan.items.len());

        renderer.surface_mut().clear_calls();
        let again = renderer.tick(&cube, &demo_camera());
        assert_eq!(plan, again);
        assert_eq!(renderer.surface().num_elements(), created);
        let calls = renderer.surface().calls();
        assert!(!calls.iter().any(|c| matches!(
            c,
            SurfaceCall::AddPoint(..) | SurfaceCall::AddSegment(..) | SurfaceCall::AddPolygon(..)
        )));
        assert_eq!(calls.last(), Some(&SurfaceCall::Render));

        let rendered = renderer.surface().rendered();
        assert_eq!(rendered.len(), 2);
        assert_eq!(rendered[0], rendered[1]);
        assert_eq!(rendered[1].len(), plan.items.len());
    }
}
