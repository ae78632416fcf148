//! # Geometry primitives
//!
//! All positions are in meters in the building frame, with x and y spanning the floor plane.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A line segment between two points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub p1: Point2<f64>,
    pub p2: Point2<f64>,
}

/// A simple (non self-intersecting) polygon, the last vertex connects back to the first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<Point2<f64>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Line {
    pub fn new(p1: Point2<f64>, p2: Point2<f64>) -> Self {
        Self { p1, p2 }
    }

    /// Build a line from raw coordinates.
    pub fn from_coords(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(Point2::new(x1, y1), Point2::new(x2, y2))
    }

    pub fn centre(&self) -> Point2<f64> {
        self.lerp(0.5)
    }

    pub fn length(&self) -> f64 {
        (self.p2 - self.p1).norm()
    }

    /// Point at the fraction `u` along the line, `u = 0` being `p1` and `u = 1` being `p2`.
    pub fn lerp(&self, u: f64) -> Point2<f64> {
        self.p1 + (self.p2 - self.p1) * u
    }

    /// Unit vector pointing from `p1` to `p2`, or zero for a degenerate line.
    pub fn direction(&self) -> Vector2<f64> {
        let d = self.p2 - self.p1;
        let n = d.norm();
        if n > 0.0 {
            d / n
        } else {
            Vector2::zeros()
        }
    }

    /// Unit normal of the line, the direction rotated by +90 degrees.
    pub fn normal(&self) -> Vector2<f64> {
        let d = self.direction();
        Vector2::new(-d.y, d.x)
    }

    /// The point on the segment closest to `point`.
    pub fn nearest_point(&self, point: &Point2<f64>) -> Point2<f64> {
        let d = self.p2 - self.p1;
        let len_sq = d.norm_squared();
        if len_sq == 0.0 {
            return self.p1;
        }

        let u = ((*point - self.p1).dot(&d) / len_sq).max(0.0).min(1.0);
        self.lerp(u)
    }

    /// Shortest distance between the segment and `point`.
    pub fn dist_to(&self, point: &Point2<f64>) -> f64 {
        (*point - self.nearest_point(point)).norm()
    }

    /// Returns a copy of this line with `trim_m` removed from both ends.
    ///
    /// Lines shorter than twice the trim collapse onto their centre.
    pub fn shortened(&self, trim_m: f64) -> Line {
        let length = self.length();
        if length <= 2.0 * trim_m {
            let c = self.centre();
            return Line::new(c, c);
        }

        let u = trim_m / length;
        Line::new(self.lerp(u), self.lerp(1.0 - u))
    }
}

impl Polygon {
    pub fn new(vertices: Vec<Point2<f64>>) -> Self {
        Self { vertices }
    }

    /// Axis aligned rectangle spanning `min` to `max`, vertices anticlockwise from `min`.
    pub fn rectangle(min: Point2<f64>, max: Point2<f64>) -> Self {
        Self::new(vec![
            min,
            Point2::new(max.x, min.y),
            max,
            Point2::new(min.x, max.y),
        ])
    }

    /// Iterate over the edges of the polygon, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = Line> + '_ {
        let n = self.vertices.len();
        (0..if n < 2 { 0 } else { n })
            .map(move |i| Line::new(self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Even-odd ray casting test. Points exactly on an edge may land on either side.
    pub fn contains(&self, point: &Point2<f64>) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let vi = self.vertices[i];
            let vj = self.vertices[j];
            if (vi.y > point.y) != (vj.y > point.y)
                && point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x
            {
                inside = !inside;
            }
            j = i;
        }

        inside
    }

    /// Returns the (min, max) corners of the polygon's bounding box, `None` if empty.
    pub fn bounding_box(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        bounding_box(self.vertices.iter())
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Returns the (min, max) corners of the bounding box of the points, `None` if there are none.
pub fn bounding_box<'a, I>(points: I) -> Option<(Point2<f64>, Point2<f64>)>
where
    I: IntoIterator<Item = &'a Point2<f64>>,
{
    points.into_iter().fold(None, |bb, p| match bb {
        None => Some((*p, *p)),
        Some((min, max)) => Some((
            Point2::new(min.x.min(p.x), min.y.min(p.y)),
            Point2::new(max.x.max(p.x), max.y.max(p.y)),
        )),
    })
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_line() {
        let line = Line::from_coords(0.0, 0.0, 4.0, 0.0);

        assert_eq!(line.length(), 4.0);
        assert_eq!(line.centre(), Point2::new(2.0, 0.0));
        assert_eq!(line.normal(), Vector2::new(0.0, 1.0));

        // Projection is clamped to the segment
        assert_eq!(line.nearest_point(&Point2::new(1.0, 3.0)), Point2::new(1.0, 0.0));
        assert_eq!(line.nearest_point(&Point2::new(-2.0, 1.0)), Point2::new(0.0, 0.0));
        assert_eq!(line.dist_to(&Point2::new(7.0, 4.0)), 5.0);

        let short = line.shortened(0.2);
        assert!((short.p1.x - 0.2).abs() < 1e-12);
        assert!((short.p2.x - 3.8).abs() < 1e-12);

        // Degenerate trims collapse to the centre
        let tiny = Line::from_coords(0.0, 0.0, 0.1, 0.0).shortened(0.2);
        assert_eq!(tiny.p1, tiny.p2);
    }

    #[test]
    fn test_polygon() {
        let rect = Polygon::rectangle(Point2::new(0.0, 0.0), Point2::new(10.0, 5.0));

        assert!(rect.contains(&Point2::new(5.0, 2.5)));
        assert!(rect.contains(&Point2::new(0.1, 4.9)));
        assert!(!rect.contains(&Point2::new(10.1, 2.5)));
        assert!(!rect.contains(&Point2::new(-1.0, -1.0)));

        assert_eq!(rect.edges().count(), 4);
        assert_eq!(
            rect.bounding_box(),
            Some((Point2::new(0.0, 0.0), Point2::new(10.0, 5.0)))
        );

        // L shaped polygon, the notch is outside
        let l_shape = Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 2.0),
            Point2::new(2.0, 2.0),
            Point2::new(2.0, 4.0),
            Point2::new(0.0, 4.0),
        ]);
        assert!(l_shape.contains(&Point2::new(1.0, 3.0)));
        assert!(!l_shape.contains(&Point2::new(3.0, 3.0)));
    }
}
