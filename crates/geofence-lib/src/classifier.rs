//! Point-in-polygon classification
//!
//! Two phases: the polygon index narrows the search to features whose bounding box
//! contains the point, then each candidate gets an exact containment test. Points on a
//! ring (exterior or hole) count as inside; points strictly inside a hole do not.

use crate::PolygonIndex;
use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::Coord;

/// Containment tests against the polygons of a [`PolygonIndex`]
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    index: &'a PolygonIndex,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<'a> Classifier<'a> {
    pub fn new(index: &'a PolygonIndex) -> Self {
        Self { index }
    }

    /// Whether the coordinate lies within any boundary polygon
    ///
    /// An empty index means no boundary is applied, so every coordinate is inside.
    #[inline]
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        if self.index.is_empty() {
            return true;
        }

        let coord = Coord { x: lng, y: lat };
        self.index
            .query_point(coord)
            .iter()
            .any(|candidate| {
                matches!(
                    candidate.polygon.coordinate_position(&coord),
                    CoordPos::Inside | CoordPos::OnBoundary
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PolygonFeature;
    use geo::{LineString, Polygon, polygon};

    fn square_index(min: f64, max: f64) -> PolygonIndex {
        let square = polygon![
            (x: min, y: min),
            (x: max, y: min),
            (x: max, y: max),
            (x: min, y: max)
        ];
        PolygonIndex::from_features(vec![PolygonFeature::new(0, square).unwrap()])
    }

    /// A "U" shape: the notch between the arms is inside the bounding box only
    fn concave_index() -> PolygonIndex {
        let u_shape = polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 7.0, y: 10.0),
            (x: 7.0, y: 3.0),
            (x: 3.0, y: 3.0),
            (x: 3.0, y: 10.0),
            (x: 0.0, y: 10.0)
        ];
        PolygonIndex::from_features(vec![PolygonFeature::new(0, u_shape).unwrap()])
    }

    #[test]
    fn test_empty_index_contains_everything() {
        let index = PolygonIndex::default();
        let classifier = Classifier::new(&index);
        assert!(classifier.contains(0.0, 0.0));
        assert!(classifier.contains(90.0, 180.0));
        assert!(classifier.contains(-45.0, 12.5));
    }

    #[test]
    fn test_square_containment() {
        let index = square_index(0.0, 10.0);
        let classifier = Classifier::new(&index);
        assert!(classifier.contains(5.0, 5.0));
        assert!(!classifier.contains(15.0, 5.0));
        assert!(!classifier.contains(5.0, -0.1));
    }

    #[test]
    fn test_boundary_points_are_inside() {
        let index = square_index(0.0, 10.0);
        let classifier = Classifier::new(&index);
        // Edge
        assert!(classifier.contains(0.0, 5.0));
        assert!(classifier.contains(5.0, 10.0));
        // Vertex
        assert!(classifier.contains(10.0, 10.0));
        assert!(classifier.contains(0.0, 0.0));
    }

    #[test]
    fn test_concave_polygon() {
        let index = concave_index();
        let classifier = Classifier::new(&index);
        // Arms and base
        assert!(classifier.contains(8.0, 1.0));
        assert!(classifier.contains(5.0, 1.5));
        assert!(classifier.contains(8.0, 8.5));
        // Notch: bounding box candidate, but outside the polygon
        assert!(!classifier.contains(8.0, 5.0));
        // Notch floor is a polygon edge
        assert!(classifier.contains(3.0, 5.0));
    }

    #[test]
    fn test_hole_is_outside() {
        let exterior = LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        let hole = LineString::from(vec![(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0)]);
        let donut = Polygon::new(exterior, vec![hole]);
        let index = PolygonIndex::from_features(vec![PolygonFeature::new(0, donut).unwrap()]);
        let classifier = Classifier::new(&index);

        assert!(classifier.contains(2.0, 2.0));
        assert!(!classifier.contains(5.0, 5.0));
        // Hole ring counts as boundary
        assert!(classifier.contains(4.0, 5.0));
    }

    #[test]
    fn test_any_polygon_matches() {
        let first = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
        let second = polygon![(x: 5.0, y: 5.0), (x: 6.0, y: 5.0), (x: 6.0, y: 6.0), (x: 5.0, y: 6.0)];
        let index = PolygonIndex::from_features(vec![
            PolygonFeature::new(0, first).unwrap(),
            PolygonFeature::new(1, second).unwrap(),
        ]);
        let classifier = Classifier::new(&index);
        assert!(classifier.contains(0.5, 0.5));
        assert!(classifier.contains(5.5, 5.5));
        assert!(!classifier.contains(3.0, 3.0));
    }

    #[test]
    fn test_latitude_longitude_order() {
        // Tall rectangle: lng in [0, 1], lat in [0, 50]
        let tall = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 50.0), (x: 0.0, y: 50.0)];
        let index = PolygonIndex::from_features(vec![PolygonFeature::new(0, tall).unwrap()]);
        let classifier = Classifier::new(&index);
        assert!(classifier.contains(40.0, 0.5));
        assert!(!classifier.contains(0.5, 40.0));
    }
}
