#![doc = include_str!("../README.md")]

mod camera;
mod compare;
mod geom;
mod kernel;
mod options;
mod partial_order;
mod pipeline;
mod scene;
mod schedule;
mod surface;

pub use camera::{Camera, Transform, DEFAULT_EYE_EPSILON};
pub use compare::{Comparator, Depth, DEPTH_TOLERANCE};
pub use geom::{BoundingBox, ScreenPoint, Vec3};
pub use kernel::{EdgeFrame, Frame, LineEqn, PlaneEqn, PolygonFrame, ProjectedPoint, SegmentFrame};
pub use options::RenderOptions;
pub use partial_order::{partial_sort_by, PartialOrderSorter, SortOutcome, SortStats};
pub use pipeline::{participates, plan_frame, DrawItem, DrawPlan, Geometry, Renderer};
pub use scene::{
    PointIdx, PolyIdx, Polygon, PolygonDesc, Scene, SceneDesc, SceneError, SegIdx, Segment,
    SegmentDesc, Shape, Style,
};
pub use schedule::{DepthScheduler, Participation};
pub use surface::{DrawingSurface, Handle, RecordingSurface, SurfaceCall, Tint};
