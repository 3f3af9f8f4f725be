//! The interface to whatever actually draws things.
//!
//! A surface owns a collection of drawable elements (dots, lines, and filled
//! polygons), each identified by a [`Handle`]. Every frame, the renderer moves the
//! elements into place, clears the display list with
//! [`begin_frame`](DrawingSurface::begin_frame), and then
//! [`show`](DrawingSurface::show)s elements from back to front.

use crate::{geom::ScreenPoint, scene::Style};

/// Identifies an element owned by a [`DrawingSurface`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub usize);

/// Per-frame adjustments to an element's styled appearance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tint {
    /// How much of the element's color survives: 1 is full color, 0 is
    /// completely faded into the background.
    pub fade: f64,
    /// For polygons with shading turned on, the cosine between the polygon's
    /// normal and the direction towards the light.
    pub light: Option<f64>,
}

impl Default for Tint {
    fn default() -> Self {
        Tint {
            fade: 1.0,
            light: None,
        }
    }
}

pub trait DrawingSurface {
    fn add_point(&mut self, style: &Style) -> Handle;
    fn move_point(&mut self, handle: Handle, center: ScreenPoint, radius: f64, tint: Tint);

    fn add_segment(&mut self, style: &Style) -> Handle;
    fn move_segment(&mut self, handle: Handle, from: ScreenPoint, to: ScreenPoint, tint: Tint);

    fn add_polygon(&mut self, style: &Style) -> Handle;
    fn move_polygon(&mut self, handle: Handle, border: &[ScreenPoint], tint: Tint);

    /// Empties the display list. Elements stay alive, and keep their positions.
    fn begin_frame(&mut self);

    /// Puts an element on top of everything shown so far in this frame.
    fn show(&mut self, handle: Handle);

    /// Presents the display list.
    fn render(&mut self);
}

/// One call made on a [`RecordingSurface`].
#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceCall {
    AddPoint(Handle, Style),
    MovePoint {
        handle: Handle,
        center: ScreenPoint,
        radius: f64,
        tint: Tint,
    },
    AddSegment(Handle, Style),
    MoveSegment {
        handle: Handle,
        from: ScreenPoint,
        to: ScreenPoint,
        tint: Tint,
    },
    AddPolygon(Handle, Style),
    MovePolygon {
        handle: Handle,
        border: Vec<ScreenPoint>,
        tint: Tint,
    },
    BeginFrame,
    Show(Handle),
    Render,
}

/// A surface that draws nothing, but remembers every call.
#[derive(Clone, Debug, Default)]
pub struct RecordingSurface {
    calls: Vec<SurfaceCall>,
    next_handle: usize,
    display: Vec<Handle>,
    rendered: Vec<Vec<Handle>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// The display lists presented so far, one per call to `render`.
    pub fn rendered(&self) -> &[Vec<Handle>] {
        &self.rendered
    }

    /// The number of elements created so far.
    pub fn num_elements(&self) -> usize {
        self.next_handle
    }

    fn fresh(&mut self) -> Handle {
        self.next_handle += 1;
        Handle(self.next_handle - 1)
    }
}

impl DrawingSurface for RecordingSurface {
    fn add_point(&mut self, style: &Style) -> Handle {
        let h = self.fresh();
        self.calls.push(SurfaceCall::AddPoint(h, style.clone()));
        h
    }

    fn move_point(&mut self, handle: Handle, center: ScreenPoint, radius: f64, tint: Tint) {
        self.calls.push(SurfaceCall::MovePoint {
            handle,
            center,
            radius,
            tint,
        });
    }

    fn add_segment(&mut self, style: &Style) -> Handle {
        let h = self.fresh();
        self.calls.push(SurfaceCall::AddSegment(h, style.clone()));
        h
    }

    fn move_segment(&mut self, handle: Handle, from: ScreenPoint, to: ScreenPoint, tint: Tint) {
        self.calls.push(SurfaceCall::MoveSegment {
            handle,
            from,
            to,
            tint,
        });
    }

    fn add_polygon(&mut self, style: &Style) -> Handle {
        let h = self.fresh();
        self.calls.push(SurfaceCall::AddPolygon(h, style.clone()));
        h
    }

    fn move_polygon(&mut self, handle: Handle, border: &[ScreenPoint], tint: Tint) {
        self.calls.push(SurfaceCall::MovePolygon {
            handle,
            border: border.to_vec(),
            tint,
        });
    }

    fn begin_frame(&mut self) {
        self.display.clear();
        self.calls.push(SurfaceCall::BeginFrame);
    }

    fn show(&mut self, handle: Handle) {
        self.display.push(handle);
        self.calls.push(SurfaceCall::Show(handle));
    }

    fn render(&mut self) {
        self.rendered.push(self.display.clone());
        self.calls.push(SurfaceCall::Render);
    }
}
