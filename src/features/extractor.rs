// Stroke feature extraction
// Turns a closed window of samples into a fixed-length vector that does not
// depend on where the symbol was drawn or how large it is

use std::f64::consts::PI;

use super::geometry::{Bounds, Curve, Line, Point, Scaler};
use crate::touchpad::Sample;

/// Normalized coordinates span this many units along the larger side
pub const SCALE: f64 = 1000.0;

/// Number of equidistant points a stroke is resampled to
pub const NUMBER_OF_POINTS: usize = 40;

/// Angles are scaled to `[0, SCALE / ANGLE_DOWNSCALE]`
pub const ANGLE_DOWNSCALE: f64 = 28.0;

/// Lift markers are worth `SCALE / MARKER_DOWNSCALE`
pub const MARKER_DOWNSCALE: f64 = 2.0;

/// Marker value of a point followed by a finger lift
pub const LIFT_MARKER: f64 = SCALE / MARKER_DOWNSCALE;

/// `(x, y, marker)` per point plus one angle per adjacent pair
pub const FEATURE_VECTOR_LEN: usize = 3 * NUMBER_OF_POINTS + (NUMBER_OF_POINTS - 1);

/// Flat list of features, see `join_features` for the layout
pub type FeatureVector = Vec<f64>;

/// Keep the position samples and tag each with a marker.
///
/// A point gets `LIFT_MARKER` when a finger lift shows up before the next
/// position sample, `0.0` otherwise.
pub fn filter_points_from_signals(samples: &[Sample]) -> (Vec<Point>, Vec<f64>) {
    let mut points = Vec::new();
    let mut markers = Vec::new();

    for (i, sample) in samples.iter().enumerate() {
        if !sample.is_valid_point() {
            continue;
        }
        points.push(Point::new(sample.x as f64, sample.y as f64));

        let next_relevant = samples[i + 1..]
            .iter()
            .find(|s| s.is_lift_marker() || s.is_valid_point());

        let marker = match next_relevant {
            Some(next) if !next.is_valid_point() => LIFT_MARKER,
            _ => 0.0,
        };
        markers.push(marker);
    }

    (points, markers)
}

/// Connect the points in order
pub fn create_curve(points: &[Point]) -> Option<Curve> {
    let (first, rest) = points.split_first()?;
    let mut curve = Curve::new(*first);
    for point in rest {
        curve.add_point(*point);
    }
    Some(curve)
}

/// Resample `curve` into `NUMBER_OF_POINTS` points spaced evenly along its
/// length, moved to its center of mass and scaled into `SCALE` units.
///
/// `markers` must be parallel to the curve's points. Each new point takes the
/// marker of the original segment it lies on.
pub fn create_normalized_curve(curve: &Curve, bounds: Bounds, markers: &[f64]) -> Curve {
    let length_of_one_line = curve.length() / (NUMBER_OF_POINTS - 1) as f64;
    let scaler = Scaler::new(bounds, curve.center_of_mass(), SCALE);
    let points = curve.points();
    let marker_at = |i: usize| markers.get(i).copied().unwrap_or(0.0);

    let mut normalized = Curve::new(scaler.scale_point(points[0]));
    normalized.add_marker(marker_at(0));

    let mut travelled_distance = 0.0;
    'segments: for i in 0..points.len() - 1 {
        let next_point = points[i + 1];
        let mut section = Line::new(points[i], next_point);
        travelled_distance += section.length();

        while travelled_distance > length_of_one_line {
            if normalized.len() >= NUMBER_OF_POINTS {
                break 'segments;
            }

            let section_length = section.length();
            if section_length <= 0.0 {
                break;
            }

            // What is left past the new point belongs to the next line
            travelled_distance -= length_of_one_line;
            let overdue = section_length - travelled_distance;
            let point = section.ratio_point(overdue / section_length);

            normalized.hard_add_point(scaler.scale_point(point));
            normalized.add_marker(marker_at(i));
            section = Line::new(point, next_point);
        }
    }

    let last = points.len() - 1;
    while normalized.len() < NUMBER_OF_POINTS {
        normalized.hard_add_point(scaler.scale_point(points[last]));
        normalized.add_marker(marker_at(last));
    }

    normalized
}

/// Angle between the x axis and the line through both points, in
/// `[-PI/2, PI/2]`. Identical points give zero.
pub fn angle_between_line_and_xaxis(point1: Point, point2: Point) -> f64 {
    if point2.x != point1.x {
        return ((point2.y - point1.y) / (point2.x - point1.x)).atan();
    }
    if point2.y != point1.y {
        return (PI / 2.0) * (point2.y - point1.y).signum();
    }
    0.0
}

/// Scaled absolute angle of every segment of the polyline
pub fn get_angle_list(points: &[Point]) -> Vec<f64> {
    points
        .windows(2)
        .map(|pair| {
            let angle = angle_between_line_and_xaxis(pair[0], pair[1]);
            (2.0 * angle / PI * (SCALE / ANGLE_DOWNSCALE)).abs()
        })
        .collect()
}

/// Lay features out as `x, y, marker, angle, x, y, marker, angle, ...`.
/// The last point has no angle after it.
pub fn join_features(points: &[Point], angles: &[f64], markers: &[f64]) -> FeatureVector {
    let mut features = Vec::with_capacity(points.len() * 4);
    for (i, point) in points.iter().enumerate() {
        features.push(point.x);
        features.push(point.y);
        features.push(markers.get(i).copied().unwrap_or(0.0));
        if let Some(angle) = angles.get(i) {
            features.push(*angle);
        }
    }
    features
}

/// Build the resampled, centered and scaled curve of the position samples
pub fn normalize_points(points: &[Point], markers: &[f64]) -> Option<Curve> {
    let bounds = Bounds::of(points)?;
    let curve = create_curve(points)?;
    Some(create_normalized_curve(&curve, bounds, markers))
}

/// Normalized points of a window, `None` when it holds no position
pub fn get_new_points(samples: &[Sample]) -> Option<Vec<Point>> {
    let (points, markers) = filter_points_from_signals(samples);
    normalize_points(&points, &markers).map(|curve| curve.points().to_vec())
}

/// Feature vector of a window, `None` when it holds no position
pub fn get_features(samples: &[Sample]) -> Option<FeatureVector> {
    let (points, markers) = filter_points_from_signals(samples);
    let normalized = normalize_points(&points, &markers)?;

    let angles = get_angle_list(normalized.points());
    Some(join_features(
        normalized.points(),
        &angles,
        normalized.markers(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-6;

    fn stroke(coords: &[(i32, i32)]) -> Vec<Sample> {
        coords
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| Sample::new(x, y, 40, i as f64 * 0.01))
            .collect()
    }

    fn point_components(features: &[f64]) -> Vec<f64> {
        features
            .chunks(4)
            .flat_map(|chunk| chunk[..3].to_vec())
            .collect()
    }

    #[test]
    fn test_two_point_stroke() {
        let samples = vec![Sample::new(1, 1, 10, 1.0), Sample::new(2, 2, 10, 1.0)];
        let features = get_features(&samples).unwrap();

        assert_eq!(features.len(), FEATURE_VECTOR_LEN);

        // First point
        assert!((features[0] + 500.0).abs() < EPSILON);
        assert!((features[1] + 500.0).abs() < EPSILON);
        assert_eq!(features[2], 0.0);

        // Last point
        let last = 4 * (NUMBER_OF_POINTS - 1);
        assert!((features[last] - 500.0).abs() < EPSILON);
        assert!((features[last + 1] - 500.0).abs() < EPSILON);

        // Every angle is 45 degrees
        let expected_angle = (PI / 4.0) * 2.0 / PI * (SCALE / ANGLE_DOWNSCALE);
        for i in 0..NUMBER_OF_POINTS - 1 {
            assert!((features[4 * i + 3] - expected_angle).abs() < EPSILON);
        }
    }

    #[test]
    fn test_resampling_cardinality() {
        let strokes = [
            stroke(&[(0, 0), (100, 0)]),
            stroke(&[(0, 0), (3, 0), (3, 700), (900, 701), (12, 5)]),
            stroke(&[(10, 10), (11, 10), (11, 11), (10, 11), (10, 10), (50, 50)]),
            stroke(&(0..500).map(|i| (i, (i * i) % 331)).collect::<Vec<_>>()),
        ];

        for samples in strokes.iter() {
            let points = get_new_points(samples).unwrap();
            assert_eq!(points.len(), NUMBER_OF_POINTS);

            let features = get_features(samples).unwrap();
            assert_eq!(features.len(), FEATURE_VECTOR_LEN);

            let (filtered, _) = filter_points_from_signals(samples);
            let normalized = normalize_points(&filtered, &vec![0.0; filtered.len()]).unwrap();
            assert_eq!(normalized.markers().len(), NUMBER_OF_POINTS);
            assert_eq!(get_angle_list(normalized.points()).len(), NUMBER_OF_POINTS - 1);
        }
    }

    #[test]
    fn test_resampled_points_are_equidistant() {
        let samples = stroke(&[(0, 0), (300, 0), (300, 400)]);
        let points = get_new_points(&samples).unwrap();

        // Larger side is 400 units, so 700 units of ink scale to 1750
        let expected = 1750.0 / (NUMBER_OF_POINTS - 1) as f64;
        for pair in points.windows(2) {
            let distance = Line::new(pair[0], pair[1]).length();
            // Corners cut the chord slightly short
            assert!(distance <= expected + EPSILON);
            assert!(distance > expected * 0.7);
        }
    }

    #[test]
    fn test_scale_and_translation_invariance() {
        let coords = [(0, 0), (7, 3), (13, 17), (4, 29), (-2, 11)];
        let base: Vec<(i32, i32)> = coords.iter().map(|&(x, y)| (x + 10, y + 10)).collect();
        let moved: Vec<(i32, i32)> = base.iter().map(|&(x, y)| (x * 3 + 250, y * 3 + 40)).collect();

        let features_a = get_features(&stroke(&base)).unwrap();
        let features_b = get_features(&stroke(&moved)).unwrap();

        let points_a = point_components(&features_a);
        let points_b = point_components(&features_b);
        assert_eq!(points_a.len(), points_b.len());
        for (a, b) in points_a.iter().zip(points_b.iter()) {
            assert!((a - b).abs() < EPSILON, "{} != {}", a, b);
        }

        for i in 0..NUMBER_OF_POINTS - 1 {
            assert!((features_a[4 * i + 3] - features_b[4 * i + 3]).abs() < EPSILON);
        }
    }

    #[test]
    fn test_single_point_is_degenerate() {
        let samples = vec![Sample::new(5, 5, 10, 0.0)];
        let features = get_features(&samples).unwrap();

        assert_eq!(features.len(), FEATURE_VECTOR_LEN);
        assert!(features.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_zero_length_stroke_is_degenerate() {
        let samples = stroke(&[(8, 8), (8, 8), (8, 8)]);
        let features = get_features(&samples).unwrap();

        assert_eq!(features.len(), FEATURE_VECTOR_LEN);
        assert!(features.iter().all(|v| v.is_finite()));
        assert!(features.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_no_positions_gives_nothing() {
        let samples = vec![Sample::lift(0.0), Sample::lift(0.1)];
        assert!(get_features(&samples).is_none());
        assert!(get_features(&[]).is_none());
    }

    #[test]
    fn test_lift_markers() {
        let samples = vec![
            Sample::new(0, 0, 30, 0.0),
            Sample::new(-1, 4, 30, 0.01),
            Sample::lift(0.02),
            Sample::new(10, 0, 30, 0.03),
            Sample::new(20, 0, 30, 0.04),
        ];
        let (points, markers) = filter_points_from_signals(&samples);

        assert_eq!(points.len(), 3);
        assert_eq!(markers, vec![LIFT_MARKER, 0.0, 0.0]);
    }

    #[test]
    fn test_resampled_points_inherit_markers() {
        // Two equally long segments, the first one ends with a finger lift
        let samples = vec![
            Sample::new(0, 0, 30, 0.0),
            Sample::lift(0.01),
            Sample::new(100, 0, 30, 0.02),
            Sample::new(200, 0, 30, 0.03),
        ];
        let features = get_features(&samples).unwrap();

        let markers: Vec<f64> = features.chunks(4).map(|chunk| chunk[2]).collect();
        assert_eq!(markers.len(), NUMBER_OF_POINTS);
        assert_eq!(markers[0], LIFT_MARKER);
        assert_eq!(markers[10], LIFT_MARKER);
        assert_eq!(markers[30], 0.0);
        assert_eq!(markers[NUMBER_OF_POINTS - 1], 0.0);
    }

    #[test]
    fn test_vertical_angles() {
        let up = angle_between_line_and_xaxis(Point::new(0.0, 0.0), Point::new(0.0, 5.0));
        let down = angle_between_line_and_xaxis(Point::new(0.0, 5.0), Point::new(0.0, 0.0));
        let same = angle_between_line_and_xaxis(Point::new(1.0, 1.0), Point::new(1.0, 1.0));

        assert_eq!(up, PI / 2.0);
        assert_eq!(down, -PI / 2.0);
        assert_eq!(same, 0.0);

        let scaled = get_angle_list(&[Point::new(0.0, 5.0), Point::new(0.0, 0.0)]);
        assert!((scaled[0] - SCALE / ANGLE_DOWNSCALE).abs() < EPSILON);
    }

    #[test]
    fn test_join_features_layout() {
        let points = [Point::new(1.0, 2.0), Point::new(3.0, 4.0)];
        let joined = join_features(&points, &[9.0], &[0.0, 500.0]);
        assert_eq!(joined, vec![1.0, 2.0, 0.0, 9.0, 3.0, 4.0, 500.0]);
    }
}
