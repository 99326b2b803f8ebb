// Plane geometry used by the feature extractor
// Points, segments, the uniform scaler and incrementally measured curves

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

/// Straight segment between two points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub start: Point,
    pub end: Point,
}

impl Line {
    pub fn new(start: Point, end: Point) -> Self {
        Line { start, end }
    }

    /// Center of mass of the segment
    pub fn center_point(&self) -> Point {
        Point::new(
            (self.start.x + self.end.x) / 2.0,
            (self.start.y + self.end.y) / 2.0,
        )
    }

    pub fn length(&self) -> f64 {
        (self.start.x - self.end.x).hypot(self.start.y - self.end.y)
    }

    /// Point at `ratio` of the way from `start` to `end`
    pub fn ratio_point(&self, ratio: f64) -> Point {
        Point::new(
            self.start.x * (1.0 - ratio) + self.end.x * ratio,
            self.start.y * (1.0 - ratio) + self.end.y * ratio,
        )
    }
}

/// Smallest axis-aligned rectangle covering a set of points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    /// `None` for an empty set
    pub fn of(points: &[Point]) -> Option<Self> {
        let first = *points.first()?;
        let mut bounds = Bounds {
            min: first,
            max: first,
        };

        for point in &points[1..] {
            bounds.min.x = bounds.min.x.min(point.x);
            bounds.min.y = bounds.min.y.min(point.y);
            bounds.max.x = bounds.max.x.max(point.x);
            bounds.max.y = bounds.max.y.max(point.y);
        }

        Some(bounds)
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

/// Moves points so the origin lands on a chosen center, then scales them
/// uniformly so the larger side of the bounds spans `scale` units.
#[derive(Debug, Clone, Copy)]
pub struct Scaler {
    bounds: Bounds,
    origin: Point,
    scale: f64,
}

impl Scaler {
    pub fn new(bounds: Bounds, origin: Point, scale: f64) -> Self {
        Scaler {
            bounds,
            origin,
            scale,
        }
    }

    pub fn move_point(&self, point: Point) -> Point {
        Point::new(point.x - self.origin.x, point.y - self.origin.y)
    }

    /// Never stretches one axis more than the other. A zero-size drawing
    /// collapses onto the origin.
    pub fn scale_point(&self, point: Point) -> Point {
        let moved = self.move_point(point);
        let (width, height) = (self.bounds.width(), self.bounds.height());
        let drawn_scale = if width > height { width } else { height };

        if drawn_scale == 0.0 {
            return Point::new(0.0, 0.0);
        }

        Point::new(
            moved.x / drawn_scale * self.scale,
            moved.y / drawn_scale * self.scale,
        )
    }
}

/// Polyline with a running length and a length-weighted center of mass.
/// Each point carries a marker value in a parallel list.
#[derive(Debug, Clone)]
pub struct Curve {
    points: Vec<Point>,
    markers: Vec<f64>,
    length: f64,
    center_of_mass: Point,
}

impl Curve {
    pub fn new(starting_point: Point) -> Self {
        Curve {
            points: vec![starting_point],
            markers: Vec::new(),
            length: 0.0,
            center_of_mass: starting_point,
        }
    }

    /// Connect `point` to the end of the curve and update length and center
    pub fn add_point(&mut self, point: Point) {
        let last_point = self.points[self.points.len() - 1];
        let added_line = Line::new(last_point, point);
        let line_length = added_line.length();

        self.update_center_of_mass(added_line.center_point(), line_length);
        self.length += line_length;
        self.points.push(point);
    }

    /// Append without touching length or center of mass
    pub fn hard_add_point(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn add_marker(&mut self, marker: f64) {
        self.markers.push(marker);
    }

    fn update_center_of_mass(&mut self, segment_center: Point, segment_length: f64) {
        let total = self.length + segment_length;
        if total <= 0.0 {
            return;
        }

        self.center_of_mass.x =
            (self.center_of_mass.x * self.length + segment_center.x * segment_length) / total;
        self.center_of_mass.y =
            (self.center_of_mass.y * self.length + segment_center.y * segment_length) / total;
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn markers(&self) -> &[f64] {
        &self.markers
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn center_of_mass(&self) -> Point {
        self.center_of_mass
    }

    /// Never zero, a curve always holds its starting point
    pub(crate) fn len(&self) -> usize {
        self.points.len()
    }
}
