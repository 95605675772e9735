//! Polygon spatial index
//!
//! Bounding boxes of all boundary polygons are bulk-loaded into an R-tree. The index is
//! only ever replaced as a whole, so readers see either the previous polygon set or the
//! new one, never a mix.

use geo::{BoundingRect, Coord, Polygon, Rect};
use rstar::{AABB, RTree, RTreeObject};
use smallvec::SmallVec;

/// A single polygon of the boundary source together with its bounding box
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonFeature {
    /// Position of the originating GeoJSON feature in the source document
    pub feature_index: usize,
    /// Polygon in (x = longitude, y = latitude) coordinates
    pub polygon: Polygon<f64>,
    /// Precomputed bounding box of `polygon`
    pub bounding_box: Rect<f64>,
}

impl PolygonFeature {
    /// Wrap a polygon, computing its bounding box
    ///
    /// Returns `None` for a polygon without coordinates.
    pub fn new(feature_index: usize, polygon: Polygon<f64>) -> Option<Self> {
        let bounding_box = polygon.bounding_rect()?;
        Some(Self {
            feature_index,
            polygon,
            bounding_box,
        })
    }
}

impl RTreeObject for PolygonFeature {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let min = self.bounding_box.min();
        let max = self.bounding_box.max();
        AABB::from_corners([min.x, min.y], [max.x, max.y])
    }
}

/// Bounding-box index over the polygons of the current boundary source
#[derive(Debug, Clone)]
pub struct PolygonIndex {
    tree: RTree<PolygonFeature>,
}

impl Default for PolygonIndex {
    fn default() -> Self {
        Self { tree: RTree::new() }
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl PolygonIndex {
    /// Build an index from a set of features
    pub fn from_features(features: Vec<PolygonFeature>) -> Self {
        Self {
            tree: RTree::bulk_load(features),
        }
    }

    /// Replace every entry with `features`
    ///
    /// The new tree is fully built before it replaces the old one.
    pub fn rebuild(&mut self, features: Vec<PolygonFeature>) {
        #[cfg(feature = "profiling")]
        profiling::scope!("index::rebuild");

        let count = features.len();
        self.tree = RTree::bulk_load(features);
        tracing::debug!("Polygon index rebuilt with {} features", count);
    }

    /// Drop every entry
    #[inline]
    pub fn clear(&mut self) {
        self.tree = RTree::new();
    }

    /// Features whose bounding box intersects `bbox`
    ///
    /// This is a superset of the polygons that actually touch the box.
    pub fn query(&self, bbox: Rect<f64>) -> SmallVec<[&PolygonFeature; 4]> {
        let min = bbox.min();
        let max = bbox.max();
        let envelope = AABB::from_corners([min.x, min.y], [max.x, max.y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .collect()
    }

    /// Candidate features for a single coordinate (zero-area query box)
    #[inline]
    pub fn query_point(&self, coord: Coord<f64>) -> SmallVec<[&PolygonFeature; 4]> {
        self.query(Rect::new(coord, coord))
    }

    /// Number of indexed polygons
    #[inline]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether no boundary is loaded
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Iterate over all indexed features in no particular order
    pub fn features(&self) -> impl Iterator<Item = &PolygonFeature> {
        self.tree.iter()
    }
}
