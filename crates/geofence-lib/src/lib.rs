//! Geofence Library - Spatial Filtering and Selection Sync for Map Points
//!
//! This library classifies a (potentially large) set of map points against a polygon
//! boundary loaded from GeoJSON, partitions the points into render groups, and keeps a
//! host selection in sync with what is visible in the map viewport.
//!
//! # Architecture
//!
//! - **[`PolygonIndex`]**: R-tree over polygon bounding boxes, rebuilt atomically
//! - **[`Classifier`]**: coarse index lookup followed by an exact point-in-polygon test
//! - **[`PointDataset`]**: validated points with their row index carried as identity
//! - **[`PartitionEngine`]**: All/Inside/Outside tagging and per-group styling
//! - **[`SelectionSynchronizer`]**: viewport-driven selection pushed to a [`SelectionHost`]
//! - **[`GeofenceEngine`]**: the context object tying the above together
//!
//! # Performance Characteristics
//!
//! - **Index rebuild**: O(P log P) bulk load for P polygons
//! - **Classification**: O(N (log P + K·V)) for N points, K candidates, V ring vertices
//! - **Viewport sync**: O(N) over the currently selected group, no reclassification

mod boundary;
mod classifier;
pub mod config;
mod dataset;
mod engine;
mod index;
mod partition;
mod source;
mod sync;
mod viewport;

// Public API exports
pub use boundary::{BoundaryDocument, parse_boundary};
pub use classifier::Classifier;
pub use config::{BoundaryStyle, Color, EngineConfig, MarkerStyle, UrlPolicy};
pub use dataset::{
    Column, LoadReport, Point, PointDataset, RejectReason, RejectedRow, Row, RowValue, TooltipItem,
};
pub use engine::{
    BOUNDARY_Z_INDEX, BoundaryReport, GeofenceEngine, POINTS_Z_INDEX, RenderLayer, RenderTarget,
};
pub use index::{PolygonFeature, PolygonIndex};
pub use partition::{FilterState, Group, GroupStyles, Partition, PartitionEngine, PassStats};
pub use source::BoundaryFetcher;
pub use sync::{SelectionHost, SelectionSynchronizer, SyncOutcome};
pub use viewport::{ViewportBounds, ViewportDebouncer};

use std::time::Duration;

/// Error types for the geofence engine
#[derive(Debug, thiserror::Error)]
pub enum GeofenceError {
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid boundary source: {0}")]
    InvalidBoundary(String),

    #[error("Boundary source contains no polygons")]
    EmptyBoundary,

    #[error("Rejected boundary URL {url}: {reason}")]
    UrlRejected { url: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Boundary request failed with status {0}")]
    HttpStatus(u16),

    #[error("Boundary request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GeofenceError {
    /// Whether retrying the same operation may succeed
    ///
    /// Network failures and timeouts are transient; malformed input and policy
    /// rejections will fail the same way every time.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::HttpStatus(_) | Self::Timeout(_) | Self::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GeofenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that all public types are accessible
        let _: fn(EngineConfig) -> GeofenceEngine = GeofenceEngine::new;
        let _: fn() -> EngineConfig = EngineConfig::default;
        let _: fn() -> PolygonIndex = PolygonIndex::default;
    }

    #[test]
    fn test_error_transience() {
        assert!(GeofenceError::Timeout(Duration::from_secs(30)).is_transient());
        assert!(GeofenceError::HttpStatus(503).is_transient());
        assert!(!GeofenceError::EmptyBoundary.is_transient());
        assert!(
            !GeofenceError::UrlRejected {
                url: "http://example.com".to_string(),
                reason: "scheme".to_string(),
            }
            .is_transient()
        );
    }
}
