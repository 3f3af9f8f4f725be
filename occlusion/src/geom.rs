//! Small vector types and the planar predicates that the comparator is built on.

use serde::{Deserialize, Serialize};

/// Pivots smaller than this are treated as zero by [`solve_2x2`].
const PIVOT_EPSILON: f64 = 1e-12;

/// A point or direction in 3D, either in world space or in camera space.
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl std::fmt::Debug for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:?}, {:?}, {:?})", self.x, self.y, self.z)
    }
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Vec3 { x, y, z }
    }

    pub fn dot(&self, other: &Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Vec3) -> Vec3 {
        Vec3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Returns the unit vector in our direction, or `None` for (nearly) zero vectors.
    pub fn unit(&self) -> Option<Vec3> {
        let len = self.norm();
        (len > PIVOT_EPSILON).then(|| *self * (1.0 / len))
    }

    pub fn midpoint(&self, other: &Vec3) -> Vec3 {
        (*self + *other) * 0.5
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Vec3 { x, y, z }
    }
}

impl From<(f64, f64, f64)> for Vec3 {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Vec3 { x, y, z }
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f64> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl std::ops::Neg for Vec3 {
    type Output = Vec3;

    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

/// A position in the view plane, after perspective division.
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl std::fmt::Debug for ScreenPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:?}, {:?})", self.x, self.y)
    }
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        ScreenPoint { x, y }
    }

    /// The point `self + t * delta`.
    pub fn offset(&self, delta: &ScreenPoint, t: f64) -> ScreenPoint {
        ScreenPoint::new(self.x + t * delta.x, self.y + t * delta.y)
    }
}

impl std::ops::Sub for ScreenPoint {
    type Output = ScreenPoint;

    fn sub(self, rhs: ScreenPoint) -> ScreenPoint {
        ScreenPoint::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// An axis-aligned box in screen space.
///
/// Boxes that merely touch are considered to intersect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl BoundingBox {
    pub fn around(p: &ScreenPoint) -> Self {
        BoundingBox {
            x_min: p.x,
            x_max: p.x,
            y_min: p.y,
            y_max: p.y,
        }
    }

    /// The smallest box containing all the points, or `None` if there aren't any.
    pub fn enclosing<'a>(pts: impl IntoIterator<Item = &'a ScreenPoint>) -> Option<Self> {
        let mut pts = pts.into_iter();
        let first = pts.next()?;
        Some(pts.fold(BoundingBox::around(first), |bb, p| bb.including(p)))
    }

    pub fn including(self, p: &ScreenPoint) -> Self {
        BoundingBox {
            x_min: self.x_min.min(p.x),
            x_max: self.x_max.max(p.x),
            y_min: self.y_min.min(p.y),
            y_max: self.y_max.max(p.y),
        }
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        !(self.x_max < other.x_min
            || self.x_min > other.x_max
            || self.y_max < other.y_min
            || self.y_min > other.y_max)
    }
}

/// Solves the linear system `m * [t0, t1] = rhs`.
///
/// Uses full pivoting: the largest remaining entry is swapped into the pivot
/// position (by rows and by columns) before each elimination step. Returns `None`
/// if the system is singular, which for our purposes means the two lines being
/// intersected are parallel.
pub fn solve_2x2(m: [[f64; 2]; 2], rhs: [f64; 2]) -> Option<[f64; 2]> {
    let mut m = m;
    let mut rhs = rhs;
    // `cols[i]` is the unknown that column `i` currently multiplies.
    let mut cols = [0, 1];

    let (pr, pc) = [(0, 0), (0, 1), (1, 0), (1, 1)]
        .into_iter()
        .max_by(|&(r0, c0), &(r1, c1)| m[r0][c0].abs().total_cmp(&m[r1][c1].abs()))?;
    if pr == 1 {
        m.swap(0, 1);
        rhs.swap(0, 1);
    }
    if pc == 1 {
        for row in &mut m {
            row.swap(0, 1);
        }
        cols.swap(0, 1);
    }
    if m[0][0].abs() < PIVOT_EPSILON {
        return None;
    }

    let factor = m[1][0] / m[0][0];
    let pivot = m[1][1] - factor * m[0][1];
    if pivot.abs() < PIVOT_EPSILON {
        return None;
    }
    let second = (rhs[1] - factor * rhs[0]) / pivot;
    let first = (rhs[0] - m[0][1] * second) / m[0][0];

    let mut ret = [0.0; 2];
    ret[cols[0]] = first;
    ret[cols[1]] = second;
    Some(ret)
}

/// Ray-casting point-in-polygon test.
///
/// Casts a ray from `q` towards `x = +∞` and counts the polygon edges it crosses.
/// Edges are half-open in `y`, so a ray through a vertex is counted once. Points
/// exactly on the border may land on either side.
pub fn point_in_polygon(q: &ScreenPoint, border: &[ScreenPoint]) -> bool {
    let mut crossings = 0;
    for (p0, p1) in cyclic_pairs(border) {
        if (p1.y > q.y && p0.y <= q.y) || (p0.y > q.y && p1.y <= q.y) {
            // The horizontal offset (relative to q) at which the edge meets y = q.y.
            let x = ((p1.x - q.x) * (p0.y - q.y) - (p0.x - q.x) * (p1.y - q.y)) / (p0.y - p1.y);
            if x > 0.0 {
                crossings += 1;
            }
        }
    }
    crossings % 2 == 1
}

pub(crate) fn cyclic_pairs<T>(xs: &[T]) -> impl Iterator<Item = (&T, &T)> {
    xs.windows(2)
        .map(|pair| (&pair[0], &pair[1]))
        .chain(xs.last().zip(xs.first()).filter(|_| xs.len() > 1))
}
