//! GeofenceEngine - The context object owned by the composing application
//!
//! The engine owns the point set, the polygon index, the partition and the selection
//! set. Every event (data refresh, boundary load, filter toggle, pan/zoom) is one call
//! that runs to completion before returning, so no partially updated state is ever
//! observable.

use crate::config::{BoundaryStyle, EngineConfig, MarkerStyle};
use crate::{
    BoundaryDocument, BoundaryFetcher, Column, FilterState, Group, GroupStyles, LoadReport,
    Partition, PartitionEngine, PassStats, Point, PointDataset, PolygonFeature, PolygonIndex,
    Result, Row, SelectionHost, SelectionSynchronizer, SyncOutcome, TooltipItem, ViewportBounds,
    ViewportDebouncer, parse_boundary,
};
use geo::Rect;
use instant::Instant;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Z-index of the polygon overlay
pub const BOUNDARY_Z_INDEX: i32 = 100;

/// Z-index of every point layer, always above the boundary
pub const POINTS_Z_INDEX: i32 = 200;

/// A layer of the map surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RenderLayer {
    Boundary,
    Points(Group),
}

/// Map surface the engine draws onto
pub trait RenderTarget {
    /// Replace the polygon overlay (empty when no boundary is loaded)
    fn draw_boundary(&mut self, features: &[&PolygonFeature], style: &BoundaryStyle);

    /// Replace the markers of a point layer
    fn draw_points(&mut self, group: Group, points: &[Point], style: &MarkerStyle);

    /// Set the stacking order of a layer
    fn set_z_index(&mut self, layer: RenderLayer, z_index: i32);
}

/// Summary of the currently loaded boundary source
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundaryReport {
    /// URL the boundary was fetched from, if any
    pub source: Option<String>,
    pub features: usize,
    pub polygons: usize,
    pub skipped_features: usize,
}

/// Spatial filtering and selection sync engine
#[derive(Debug, Clone)]
pub struct GeofenceEngine {
    config: EngineConfig,
    dataset: PointDataset,
    index: PolygonIndex,
    partitioner: PartitionEngine,
    synchronizer: SelectionSynchronizer,
    debouncer: ViewportDebouncer,
    boundary: Option<BoundaryReport>,
    filter_enabled: bool,
    zoom_selection_enabled: bool,
    last_viewport: Option<ViewportBounds>,
}

impl Default for GeofenceEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl GeofenceEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            partitioner: PartitionEngine::new(GroupStyles::from_config(&config)),
            debouncer: ViewportDebouncer::new(config.viewport_debounce),
            config,
            dataset: PointDataset::default(),
            index: PolygonIndex::default(),
            synchronizer: SelectionSynchronizer::new(),
            boundary: None,
            filter_enabled: false,
            zoom_selection_enabled: false,
            last_viewport: None,
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Replace the point set with freshly delivered host rows
    ///
    /// The previous points are dropped as a whole. With the filter enabled the new set
    /// is classified and its Inside rows are pushed to the host.
    pub fn refresh_data<H: SelectionHost>(&mut self, rows: Vec<Row>, host: &mut H) -> LoadReport {
        let (dataset, report) = PointDataset::load(rows, self.config.record_warning_threshold);
        self.dataset = dataset;
        // Row identities changed, the last push no longer describes the host state
        self.synchronizer.invalidate();
        self.reclassify(host);
        report
    }

    /// Load a boundary source from GeoJSON text
    ///
    /// On error the previous boundary, index and partition stay untouched.
    pub fn load_boundary<H: SelectionHost>(
        &mut self,
        payload: &str,
        host: &mut H,
    ) -> Result<BoundaryReport> {
        let document = parse_boundary(payload).inspect_err(|e| {
            tracing::warn!("Boundary source rejected, keeping previous boundary: {}", e);
        })?;
        Ok(self.apply_boundary(document, None, host))
    }

    /// Install an already parsed boundary source
    pub fn apply_boundary<H: SelectionHost>(
        &mut self,
        document: BoundaryDocument,
        source: Option<String>,
        host: &mut H,
    ) -> BoundaryReport {
        let report = BoundaryReport {
            source,
            features: document.feature_count,
            polygons: document.polygons.len(),
            skipped_features: document.skipped_features,
        };
        tracing::info!(
            "Boundary loaded: {} polygons from {} features",
            report.polygons,
            report.features
        );

        self.index.rebuild(document.polygons);
        self.boundary = Some(report.clone());
        if self.filter_enabled {
            self.reclassify(host);
        }
        report
    }

    /// Remove the boundary source
    ///
    /// Every point goes back to the unfiltered group. A selection pushed by the filter
    /// is cleared from the host.
    pub fn clear_boundary<H: SelectionHost>(&mut self, host: &mut H) {
        if self.boundary.take().is_none() && self.index.is_empty() {
            return;
        }
        tracing::info!("Boundary cleared");
        self.index.clear();
        let was_filtered = self.partitioner.partition().is_filtered();
        self.reclassify(host);
        if was_filtered {
            self.synchronizer.clear(host);
        }
    }

    /// Turn the boundary filter on or off
    ///
    /// Enabling runs a full classification pass and selects the Inside rows in the
    /// host; without a boundary nothing is classified and the host is left alone.
    /// Disabling restores every point to the unfiltered group and clears the host
    /// selection.
    pub fn set_filter_enabled<H: SelectionHost>(&mut self, enabled: bool, host: &mut H) {
        if enabled == self.filter_enabled {
            return;
        }
        self.filter_enabled = enabled;
        if enabled {
            if self.index.is_empty() {
                tracing::warn!("Filter enabled without a boundary, points stay unfiltered");
            }
            self.reclassify(host);
        } else {
            let was_filtered = self.partitioner.partition().is_filtered();
            self.partitioner.reset(self.dataset.len());
            if was_filtered {
                self.synchronizer.clear(host);
            }
        }
    }

    /// Change the boundary overlay style; applies on the next render
    pub fn set_boundary_style(&mut self, style: BoundaryStyle) {
        self.config.boundary_style = style;
    }

    /// Turn viewport-driven selection on or off
    pub fn set_zoom_selection_enabled(&mut self, enabled: bool) {
        self.zoom_selection_enabled = enabled;
        if !enabled {
            self.debouncer.flush();
        }
    }

    /// Change the base marker style; filtered styles are derived from it
    pub fn set_marker_style(&mut self, style: MarkerStyle) {
        self.config.marker_style = style;
        self.partitioner
            .set_styles(GroupStyles::from_config(&self.config));
    }

    /// Record a `zoomend`/`moveend` signal
    ///
    /// Nothing is synchronized until [`GeofenceEngine::poll_viewport`] sees a quiet
    /// period of at least the configured debounce delay.
    pub fn viewport_changed(&mut self, bounds: ViewportBounds, now: Instant) {
        if self.zoom_selection_enabled {
            self.debouncer.push(bounds, now);
        }
    }

    /// Synchronize the selection if a debounced viewport change is due
    pub fn poll_viewport<H: SelectionHost>(
        &mut self,
        now: Instant,
        host: &mut H,
    ) -> Option<SyncOutcome> {
        let bounds = self.debouncer.poll(now)?;
        Some(self.sync_viewport(bounds, host))
    }

    /// Synchronize a pending viewport change immediately
    pub fn flush_viewport<H: SelectionHost>(&mut self, host: &mut H) -> Option<SyncOutcome> {
        let bounds = self.debouncer.flush()?;
        Some(self.sync_viewport(bounds, host))
    }

    /// Select the visible points of the current selection group
    pub fn sync_viewport<H: SelectionHost>(
        &mut self,
        bounds: ViewportBounds,
        host: &mut H,
    ) -> SyncOutcome {
        self.last_viewport = Some(bounds);
        self.synchronizer.sync(
            &bounds,
            &self.dataset,
            self.partitioner.partition(),
            self.zoom_selection_enabled,
            host,
        )
    }

    /// Select the single point at dataset `position`
    ///
    /// Returns the selected row index.
    pub fn select_point<H: SelectionHost>(&mut self, position: usize, host: &mut H) -> Option<usize> {
        let row = self.dataset.get(position)?.row_index;
        self.synchronizer.select_one(row, host);
        Some(row)
    }

    /// Select the first point at exactly (`lat`, `lng`)
    pub fn select_at_coordinate<H: SelectionHost>(
        &mut self,
        lat: f64,
        lng: f64,
        host: &mut H,
    ) -> Option<usize> {
        let row = self.dataset.find_index_by_coordinate(lat, lng)?;
        self.synchronizer.select_one(row, host);
        Some(row)
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Draw the boundary and every point layer, then reassert the layering
    pub fn render<T: RenderTarget>(&self, target: &mut T) {
        #[cfg(feature = "profiling")]
        profiling::scope!("engine::render");

        let features: Vec<&PolygonFeature> = self.index.features().collect();
        target.draw_boundary(&features, &self.config.boundary_style);

        let partition = self.partitioner.partition();
        for group in Group::all() {
            let points: Vec<Point> = partition
                .tagged(*group)
                .filter_map(|position| self.dataset.get(position))
                .copied()
                .collect();
            target.draw_points(*group, &points, self.partitioner.styles().get(*group));
        }

        self.apply_layering(target);
    }

    /// Put point layers above the boundary overlay
    pub fn apply_layering<T: RenderTarget>(&self, target: &mut T) {
        target.set_z_index(RenderLayer::Boundary, BOUNDARY_Z_INDEX);
        for group in Group::all() {
            target.set_z_index(RenderLayer::Points(*group), POINTS_Z_INDEX);
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Tooltip lines for the point at dataset `position`
    pub fn tooltip(&self, position: usize, columns: &[Column]) -> Vec<TooltipItem> {
        self.dataset
            .get(position)
            .map(|point| self.dataset.tooltip(point.row_index, columns))
            .unwrap_or_default()
    }

    /// Area to fit the map to after the first load
    #[inline]
    pub fn fit_bounds(&self) -> Option<Rect<f64>> {
        self.dataset.bounds()
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn dataset(&self) -> &PointDataset {
        &self.dataset
    }

    #[inline]
    pub fn index(&self) -> &PolygonIndex {
        &self.index
    }

    #[inline]
    pub fn partition(&self) -> &Partition {
        self.partitioner.partition()
    }

    #[inline]
    pub fn styles(&self) -> &GroupStyles {
        self.partitioner.styles()
    }

    #[inline]
    pub fn filter_state(&self) -> FilterState {
        self.partitioner.state()
    }

    #[inline]
    pub fn last_pass(&self) -> Option<PassStats> {
        self.partitioner.last_pass()
    }

    #[inline]
    pub fn boundary(&self) -> Option<&BoundaryReport> {
        self.boundary.as_ref()
    }

    /// Row indices last pushed to the host
    #[inline]
    pub fn selection(&self) -> &[usize] {
        self.synchronizer.selection()
    }

    #[inline]
    pub fn is_filter_enabled(&self) -> bool {
        self.filter_enabled
    }

    #[inline]
    pub fn is_zoom_selection_enabled(&self) -> bool {
        self.zoom_selection_enabled
    }

    #[inline]
    pub fn last_viewport(&self) -> Option<ViewportBounds> {
        self.last_viewport
    }

    /// When the pending viewport change becomes due
    #[inline]
    pub fn viewport_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Full classification pass; pushes the Inside rows while filtering
    ///
    /// Classification only runs with the filter enabled and a boundary loaded.
    fn reclassify<H: SelectionHost>(&mut self, host: &mut H) {
        if !self.filter_enabled || self.index.is_empty() {
            self.partitioner.reset(self.dataset.len());
            return;
        }
        self.partitioner
            .classify(self.dataset.points(), &self.index, true);

        let rows: Vec<usize> = self
            .partitioner
            .partition()
            .tagged(Group::Inside)
            .filter_map(|position| self.dataset.get(position))
            .map(|point| point.row_index)
            .collect();
        self.synchronizer.push(rows, host);
    }
}

impl GeofenceEngine {
    /// Fetch, parse and install a remote boundary source
    ///
    /// Any failure (policy, network, timeout, parse) leaves the current boundary as is.
    pub async fn load_boundary_url<H: SelectionHost>(
        &mut self,
        fetcher: &BoundaryFetcher,
        url: &str,
        host: &mut H,
    ) -> Result<BoundaryReport> {
        let document = fetcher.fetch_document(url).await.inspect_err(|e| {
            tracing::warn!("Boundary source {} not loaded: {}", url, e);
        })?;
        Ok(self.apply_boundary(document, Some(url.to_string()), host))
    }
}
