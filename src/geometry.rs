use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// Denominator below which two segments are treated as parallel.
const PARALLEL_EPS: f64 = 1e-10;

/// 2D point or displacement.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// z-component of the 3D cross product.
    pub fn cross(self, other: Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn distance(self, other: Self) -> f64 {
        (other - self).length()
    }

    /// Rotates counter-clockwise by `degrees`.
    pub fn rotate(self, degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// Axis-aligned rectangle every node position must stay inside.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Bounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            x_min: -1000.0,
            x_max: 1000.0,
            y_min: -1000.0,
            y_max: 1000.0,
        }
    }
}

impl Bounds {
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x_min && p.x <= self.x_max && p.y >= self.y_min && p.y <= self.y_max
    }

    /// Grows the rectangle just enough to cover `p`. Never shrinks.
    pub fn include(&mut self, p: Vec2) {
        self.x_min = self.x_min.min(p.x);
        self.x_max = self.x_max.max(p.x);
        self.y_min = self.y_min.min(p.y);
        self.y_max = self.y_max.max(p.y);
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Minimal rectangle covering `points`, `None` when empty.
    pub fn enclosing(points: impl IntoIterator<Item = Vec2>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self {
            x_min: first.x,
            x_max: first.x,
            y_min: first.y,
            y_max: first.y,
        };
        for p in iter {
            bounds.include(p);
        }
        Some(bounds)
    }
}

/// Distance from `p` to the segment `a`-`b`.
///
/// Falls back to the distance to the nearer endpoint whenever the projection
/// of `p` lands outside the segment, which also covers degenerate segments.
pub fn point_segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f64 {
    let ab = b - a;
    let ap = p - a;
    let along = ap.dot(ab);
    if along <= 0.0 {
        return p.distance(a);
    }
    if (p - b).dot(ab) >= 0.0 {
        return p.distance(b);
    }
    let t = along / ab.dot(ab);
    p.distance(a + ab * t)
}

/// Intersection point of segments `p0`-`p1` and `q0`-`q1`.
///
/// Solves `p0 + t*s0 = q0 + u*s1` for the parametric line equation. Parallel
/// and colinear segments (including overlapping ones) report no intersection.
pub fn segment_intersection(p0: Vec2, p1: Vec2, q0: Vec2, q1: Vec2) -> Option<Vec2> {
    let s0 = p1 - p0;
    let s1 = q1 - q0;
    let denom = s0.cross(s1);
    if denom.abs() < PARALLEL_EPS {
        return None;
    }
    let w = q0 - p0;
    let t = w.cross(s1) / denom;
    if !(0.0..=1.0).contains(&t) {
        return None;
    }
    let u = w.cross(s0) / denom;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    Some(p0 + s0 * t)
}

/// Angle in degrees, in `[0, 360)`, of `v` measured from the base direction.
///
/// A positive cross product `base x v` maps to `360 - angle`, so neighbors are
/// swept in a single rotational direction starting at the base.
pub fn angle_from_base(base: Vec2, v: Vec2) -> f64 {
    let signed = base.cross(v).atan2(base.dot(v)).to_degrees();
    let angle = (-signed).rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if angle >= 360.0 { 0.0 } else { angle }
}
