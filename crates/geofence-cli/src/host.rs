//! Stand-ins for the host platform and the map widget

use geofence_lib::{
    BoundaryStyle, Group, MarkerStyle, Point, PolygonFeature, RenderLayer, RenderTarget,
    SelectionHost,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Selection handle issued by [`ConsoleHost`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SelectionId {
    pub row: usize,
}

/// Host that keeps the current selection and logs every change
#[derive(Debug, Default)]
pub struct ConsoleHost {
    selection: Vec<SelectionId>,
    select_calls: usize,
    clear_calls: usize,
}

impl ConsoleHost {
    pub fn selection(&self) -> &[SelectionId] {
        &self.selection
    }

    /// Number of select and clear calls received
    pub fn calls(&self) -> (usize, usize) {
        (self.select_calls, self.clear_calls)
    }
}

impl SelectionHost for ConsoleHost {
    type Handle = SelectionId;

    fn create_handle(&self, row_index: usize) -> SelectionId {
        SelectionId { row: row_index }
    }

    fn select(&mut self, handles: Vec<SelectionId>, multi_select: bool) {
        tracing::info!(
            "Host selection: {} rows{}",
            handles.len(),
            if multi_select { " (multi-select)" } else { "" }
        );
        self.selection = handles;
        self.select_calls += 1;
    }

    fn clear(&mut self) {
        tracing::info!("Host selection cleared");
        self.selection.clear();
        self.clear_calls += 1;
    }
}

/// What a map layer currently shows
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayerSummary {
    /// Markers or polygons on the layer
    pub items: usize,
    pub z_index: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<MarkerStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boundary_style: Option<BoundaryStyle>,
}

/// Map surface that only remembers what was drawn
#[derive(Debug, Default)]
pub struct MapSurface {
    layers: BTreeMap<&'static str, LayerSummary>,
}

impl MapSurface {
    pub fn layers(&self) -> &BTreeMap<&'static str, LayerSummary> {
        &self.layers
    }

    fn layer_name(layer: RenderLayer) -> &'static str {
        match layer {
            RenderLayer::Boundary => "Boundary",
            RenderLayer::Points(group) => group.name(),
        }
    }
}

impl RenderTarget for MapSurface {
    fn draw_boundary(&mut self, features: &[&PolygonFeature], style: &BoundaryStyle) {
        let layer = self.layers.entry("Boundary").or_default();
        layer.items = features.len();
        layer.boundary_style = Some(*style);
    }

    fn draw_points(&mut self, group: Group, points: &[Point], style: &MarkerStyle) {
        let layer = self.layers.entry(group.name()).or_default();
        layer.items = points.len();
        layer.style = Some(*style);
    }

    fn set_z_index(&mut self, layer: RenderLayer, z_index: i32) {
        self.layers.entry(Self::layer_name(layer)).or_default().z_index = z_index;
    }
}
