use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use occlusion::{
    Camera, DrawingSurface, Geometry, Handle, RenderOptions, Renderer, Scene, SceneDesc,
    ScreenPoint, Style, Tint, Transform, Vec3,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Solid {
    Cube,
    Octahedron,
    Permutohedron,
}

#[derive(Parser)]
struct Args {
    output: PathBuf,

    #[arg(long, value_enum, default_value = "permutohedron")]
    solid: Solid,

    /// Read the scene from a JSON file instead of building a solid.
    #[arg(long)]
    scene: Option<PathBuf>,

    /// JSON file with rendering options.
    #[arg(long)]
    options: Option<PathBuf>,

    #[arg(long, default_value_t = 1)]
    frames: usize,

    /// Rotation per frame, in radians.
    #[arg(long, default_value_t = 0.1)]
    step: f64,

    #[arg(long, default_value_t = 8.0)]
    distance: f64,

    #[arg(long, default_value_t = 3.0)]
    zoom: f64,
}

/// The permutohedron of order 4: the convex hull of all permutations of
/// (1, 2, 3, 4), which lives in a 3d hyperplane of 4d space.
fn permutohedron(scale: f64) -> Scene {
    let mut perms = Vec::new();
    for a in 0..4 {
        for b in 0..4 {
            for c in 0..4 {
                for d in 0..4 {
                    let p = [a, b, c, d];
                    if (0..4).all(|v| p.contains(&v)) {
                        perms.push(p);
                    }
                }
            }
        }
    }

    // An orthonormal basis of the hyperplane where the coordinates sum to zero.
    let basis = [
        [1.0, -1.0, 0.0, 0.0].map(|x: f64| x / 2.0f64.sqrt()),
        [1.0, 1.0, -2.0, 0.0].map(|x: f64| x / 6.0f64.sqrt()),
        [1.0, 1.0, 1.0, -3.0].map(|x: f64| x / 12.0f64.sqrt()),
    ];
    let project = |p: &[usize; 4]| {
        let [x, y, z] = basis.map(|e| {
            e.iter()
                .zip(p)
                .map(|(e, &v)| e * (v as f64 - 1.5) * scale)
                .sum::<f64>()
        });
        Vec3::new(x, y, z)
    };

    let mut scene = Scene::new();
    let pts = scene.add_points(perms.iter().map(project));

    // Neighbors differ by swapping two consecutive values.
    for (i, p) in perms.iter().enumerate() {
        for v in 0..3 {
            let q = p.map(|x| if x == v { v + 1 } else if x == v + 1 { v } else { x });
            let j = perms.iter().position(|r| *r == q).unwrap();
            if i < j {
                scene.add_segment(pts[i], pts[j], Style::default()).unwrap();
            }
        }
    }

    // One face for each proper subset of positions: the vertices having the
    // smallest values in those positions.
    for subset in 1..15u32 {
        let size = subset.count_ones() as usize;
        let vertices = perms
            .iter()
            .enumerate()
            .filter(|(_, p)| (0..4).all(|k| (subset >> k & 1 == 1) == (p[k] < size)))
            .map(|(i, _)| pts[i]);
        scene.add_polygon(vertices, Style::default()).unwrap();
    }
    scene
}

struct Element {
    style: Style,
    geometry: Geometry,
    tint: Tint,
}

/// Collects one SVG document per rendered frame.
#[derive(Default)]
struct SvgSurface {
    elements: Vec<Element>,
    display: Vec<Handle>,
    frames: Vec<svg::Document>,
}

impl SvgSurface {
    fn add(&mut self, style: &Style, geometry: Geometry) -> Handle {
        self.elements.push(Element {
            style: style.clone(),
            geometry,
            tint: Tint::default(),
        });
        Handle(self.elements.len() - 1)
    }

    fn place(&mut self, handle: Handle, geometry: Geometry, tint: Tint) {
        let el = &mut self.elements[handle.0];
        el.geometry = geometry;
        el.tint = tint;
    }
}

// SVG's y axis points down.
fn svg_point(p: ScreenPoint) -> (f64, f64) {
    (p.x, -p.y)
}

fn stroke_width(style: &Style) -> f64 {
    0.005 * style.width.unwrap_or(1.0)
}

impl DrawingSurface for SvgSurface {
    fn add_point(&mut self, style: &Style) -> Handle {
        self.add(
            style,
            Geometry::Dot {
                center: ScreenPoint::default(),
                radius: 0.0,
            },
        )
    }

    fn move_point(&mut self, handle: Handle, center: ScreenPoint, radius: f64, tint: Tint) {
        self.place(handle, Geometry::Dot { center, radius }, tint);
    }

    fn add_segment(&mut self, style: &Style) -> Handle {
        self.add(
            style,
            Geometry::Line {
                from: ScreenPoint::default(),
                to: ScreenPoint::default(),
            },
        )
    }

    fn move_segment(&mut self, handle: Handle, from: ScreenPoint, to: ScreenPoint, tint: Tint) {
        self.place(handle, Geometry::Line { from, to }, tint);
    }

    fn add_polygon(&mut self, style: &Style) -> Handle {
        self.add(style, Geometry::Polygon { border: Vec::new() })
    }

    fn move_polygon(&mut self, handle: Handle, border: &[ScreenPoint], tint: Tint) {
        let border = border.to_vec();
        self.place(handle, Geometry::Polygon { border }, tint);
    }

    fn begin_frame(&mut self) {
        self.display.clear();
    }

    fn show(&mut self, handle: Handle) {
        self.display.push(handle);
    }

    fn render(&mut self) {
        let mut document = svg::Document::new()
            .set("viewBox", (-0.8, -0.8, 1.6, 1.6))
            .add(
                svg::node::element::Rectangle::new()
                    .set("x", -0.8)
                    .set("y", -0.8)
                    .set("width", 1.6)
                    .set("height", 1.6)
                    .set("fill", "white"),
            );

        for handle in &self.display {
            let el = &self.elements[handle.0];
            let opacity = el.style.opacity.unwrap_or(1.0) * el.tint.fade;
            match &el.geometry {
                Geometry::Dot { center, radius } => {
                    let (cx, cy) = svg_point(*center);
                    let c = svg::node::element::Circle::new()
                        .set("r", *radius)
                        .set("cx", cx)
                        .set("cy", cy)
                        .set("opacity", opacity)
                        .set("fill", el.style.color.as_deref().unwrap_or("black"));
                    document = document.add(c);
                }
                Geometry::Line { from, to } => {
                    let data = svg::node::element::path::Data::new()
                        .move_to(svg_point(*from))
                        .line_to(svg_point(*to));
                    let path = svg::node::element::Path::new()
                        .set("stroke", el.style.color.as_deref().unwrap_or("black"))
                        .set("stroke-width", stroke_width(&el.style))
                        .set("stroke-linecap", "round")
                        .set("stroke-opacity", opacity)
                        .set("d", data);
                    document = document.add(path);
                }
                Geometry::Polygon { border } => {
                    let Some((first, rest)) = border.split_first() else {
                        continue;
                    };
                    let mut data = svg::node::element::path::Data::new().move_to(svg_point(*first));
                    for p in rest {
                        data = data.line_to(svg_point(*p));
                    }
                    let mut path = svg::node::element::Path::new()
                        .set("fill", el.style.color.as_deref().unwrap_or("#8ab"))
                        .set("fill-opacity", opacity)
                        .set("d", data.close());
                    if let Some(light) = el.tint.light {
                        let brightness = 0.7 + 0.3 * light;
                        path = path.set("style", format!("filter: brightness({brightness})"));
                    }
                    document = document.add(path);
                }
            }
        }
        self.frames.push(document);
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let input = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&input)?)
}

pub fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let scene = match &args.scene {
        Some(path) => Scene::from_desc(&read_json::<SceneDesc>(path)?)?,
        None => match args.solid {
            Solid::Cube => Scene::cube(1.0),
            Solid::Octahedron => Scene::octahedron(1.5),
            Solid::Permutohedron => permutohedron(0.8),
        },
    };
    let options = match &args.options {
        Some(path) => read_json::<RenderOptions>(path)?,
        None => RenderOptions::default(),
    };

    let mut renderer = Renderer::new(SvgSurface::default(), options);
    let axis = Vec3::new(0.3, -1.0, 0.5);
    for i in 0..args.frames {
        let rotation = Transform::rotate_about(axis, 0.6 + args.step * i as f64);
        let camera = Camera::orbit(rotation, args.distance, args.zoom);
        let plan = renderer.tick(&scene, &camera);
        log::info!(
            "frame {i}: {} shapes, {} comparisons, {} cache hits",
            plan.items.len(),
            plan.stats.comparisons,
            plan.stats.cache_hits
        );
    }

    let frames = renderer.into_surface().frames;
    if let [document] = frames.as_slice() {
        svg::save(&args.output, document)?;
    } else {
        let stem = args
            .output
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("frame");
        for (i, document) in frames.iter().enumerate() {
            let path = args.output.with_file_name(format!("{stem}-{i:03}.svg"));
            svg::save(&path, document)?;
        }
    }

    Ok(())
}
