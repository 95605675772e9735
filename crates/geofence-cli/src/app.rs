//! One headless session: load rows, load the boundary, replay viewport changes, report

use crate::host::{ConsoleHost, LayerSummary, MapSurface, SelectionId};
use crate::settings::Settings;
use geofence_lib::{
    BoundaryFetcher, BoundaryReport, Column, FilterState, GeofenceEngine, GeofenceError, Group,
    LoadReport, PassStats, Row, SyncOutcome, TooltipItem, ViewportBounds,
};
use instant::Instant;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Rows file is not a JSON array of rows: {0}")]
    Rows(#[source] serde_json::Error),

    #[error(transparent)]
    Geofence(#[from] GeofenceError),

    #[error("Failed to write report: {0}")]
    Write(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),
}

impl AppError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Geofence(e) if e.is_transient())
    }
}

/// Group sizes after the last classification
#[derive(Debug, Clone, Serialize)]
pub struct GroupCounts {
    pub all: usize,
    pub inside: usize,
    pub outside: usize,
}

/// One replayed viewport change
#[derive(Debug, Clone, Serialize)]
pub struct ViewportSync {
    pub bounds: ViewportBounds,
    pub outcome: SyncOutcome,
}

/// Everything a session produced
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub load: LoadReport,
    pub boundary: Option<BoundaryReport>,
    /// Error message when the boundary source was rejected
    pub boundary_error: Option<String>,
    pub filter_state: FilterState,
    pub last_pass: Option<PassStats>,
    pub groups: GroupCounts,
    /// Fit area as `[south, west, north, east]`
    pub fit_bounds: Option<[f64; 4]>,
    pub viewport_syncs: Vec<ViewportSync>,
    pub layers: BTreeMap<&'static str, LayerSummary>,
    pub selection: Vec<SelectionId>,
    pub tooltip: Option<Vec<TooltipItem>>,
}

/// Read the rows file and run a session
pub async fn run(settings: &Settings) -> Result<Report, AppError> {
    let path = settings.rows.display().to_string();
    let text = tokio::fs::read_to_string(&settings.rows)
        .await
        .map_err(|source| AppError::Read { path, source })?;
    let rows: Vec<Row> = serde_json::from_str(&text).map_err(AppError::Rows)?;
    run_with_rows(settings, rows).await
}

/// Run a session over already loaded rows
pub async fn run_with_rows(settings: &Settings, rows: Vec<Row>) -> Result<Report, AppError> {
    let config = settings.engine_config();
    let fetcher = BoundaryFetcher::new(config.url_policy.clone(), config.fetch_timeout);
    let mut engine = GeofenceEngine::new(config);
    let mut host = ConsoleHost::default();

    let load = engine.refresh_data(rows, &mut host);
    if load.exceeds_warning_threshold {
        tracing::warn!(
            "> {} records. Use filters to reduce selection.",
            engine.config().record_warning_threshold
        );
    }

    // A rejected boundary is reported, the session goes on without it
    let mut boundary_error = None;
    if let Some(source) = &settings.boundary {
        if let Err(e) = load_boundary(&mut engine, &fetcher, source, &mut host).await {
            tracing::error!("Boundary not loaded: {}", e);
            if e.is_transient() {
                tracing::info!("The failure is transient, retrying may help");
            }
            boundary_error = Some(e.to_string());
        }
    }

    engine.set_zoom_selection_enabled(settings.zoom_selection);
    engine.set_filter_enabled(settings.filter, &mut host);

    let viewport_syncs = replay_viewports(
        &mut engine,
        &settings.viewports,
        Duration::from_millis(settings.pan_interval_ms),
        &mut host,
    );

    let tooltip = settings.select_point.map(|position| {
        if engine.select_point(position, &mut host).is_none() {
            tracing::warn!("No point at position {}", position);
        }
        engine.tooltip(position, &columns(&settings.columns))
    });

    let mut map = MapSurface::default();
    engine.render(&mut map);

    let (selects, clears) = host.calls();
    tracing::debug!("Host received {} selects and {} clears", selects, clears);

    let partition = engine.partition();
    Ok(Report {
        load,
        boundary: engine.boundary().cloned(),
        boundary_error,
        filter_state: engine.filter_state(),
        last_pass: engine.last_pass(),
        groups: GroupCounts {
            all: partition.count(Group::All),
            inside: partition.count(Group::Inside),
            outside: partition.count(Group::Outside),
        },
        fit_bounds: engine
            .fit_bounds()
            .map(|rect| [rect.min().y, rect.min().x, rect.max().y, rect.max().x]),
        viewport_syncs,
        layers: map.layers().clone(),
        selection: host.selection().to_vec(),
        tooltip,
    })
}

async fn load_boundary(
    engine: &mut GeofenceEngine,
    fetcher: &BoundaryFetcher,
    source: &str,
    host: &mut ConsoleHost,
) -> Result<BoundaryReport, AppError> {
    if source.contains("://") {
        return Ok(engine.load_boundary_url(fetcher, source, host).await?);
    }
    let payload = tokio::fs::read_to_string(source)
        .await
        .map_err(|e| AppError::Read {
            path: source.to_string(),
            source: e,
        })?;
    Ok(engine.load_boundary(&payload, host)?)
}

/// Feed viewport signals `interval` apart through the debouncer
///
/// Only signals followed by a quiet period long enough reach the synchronizer.
fn replay_viewports(
    engine: &mut GeofenceEngine,
    viewports: &[ViewportBounds],
    interval: Duration,
    host: &mut ConsoleHost,
) -> Vec<ViewportSync> {
    let mut syncs = Vec::new();
    let mut now = Instant::now();

    for bounds in viewports {
        if let Some(outcome) = engine.poll_viewport(now, host) {
            syncs.extend(engine.last_viewport().map(|bounds| ViewportSync { bounds, outcome }));
        }
        engine.viewport_changed(*bounds, now);
        now += interval;
    }

    if let Some(deadline) = engine.viewport_deadline() {
        now = now.max(deadline);
    }
    if let Some(outcome) = engine.poll_viewport(now, host) {
        syncs.extend(engine.last_viewport().map(|bounds| ViewportSync { bounds, outcome }));
    }
    syncs
}

/// Column metadata for tooltips: latitude, longitude, then tooltip fields
fn columns(names: &[String]) -> Vec<Column> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| Column {
            display_name: name.clone(),
            latitude: i == 0,
            longitude: i == 1,
            tooltip: i >= 2,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use geofence_lib::RowValue;

    const SQUARE: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {"name": "square"},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]]]
            }
        }]
    }"#;

    fn settings(args: &[&str]) -> Settings {
        let mut argv = vec!["geofence", "--rows", "unused.json"];
        argv.extend_from_slice(args);
        Settings::try_parse_from(argv).unwrap()
    }

    fn rows() -> Vec<Row> {
        let row = |lat: f64, lng: f64, name: &str| {
            vec![
                RowValue::Number(lat),
                RowValue::Number(lng),
                RowValue::Text(name.to_string()),
            ]
        };
        vec![
            row(5.0, 5.0, "a"),
            row(20.0, 20.0, "b"),
            row(0.0, 0.0, "c"),
            row(8.0, 2.0, "d"),
        ]
    }

    fn boundary_file(name: &str) -> String {
        let path = std::env::temp_dir().join(format!("geofence-cli-{}-{}.geojson", name, std::process::id()));
        std::fs::write(&path, SQUARE).unwrap();
        path.display().to_string()
    }

    #[tokio::test]
    async fn test_session_without_boundary() {
        let report = run_with_rows(&settings(&[]), rows()).await.unwrap();
        assert_eq!(report.load.accepted, 4);
        assert_eq!(report.filter_state, FilterState::Disabled);
        assert_eq!(report.groups.all, 4);
        assert_eq!(report.groups.inside, 0);
        assert!(report.selection.is_empty());
        assert_eq!(report.fit_bounds, Some([0.0, 0.0, 20.0, 20.0]));
        assert_eq!(report.layers["Points"].items, 4);
        assert_eq!(report.layers["Points"].z_index, 200);
    }

    #[tokio::test]
    async fn test_session_filters_and_syncs() {
        let boundary = boundary_file("filter");
        let settings = settings(&[
            "--boundary",
            &boundary,
            "--filter",
            "--zoom-selection",
            "--viewport",
            "40,30,40,30,5",
            "--viewport",
            "10,0,4,0,6",
        ]);
        let report = run_with_rows(&settings, rows()).await.unwrap();

        assert_eq!(report.boundary.as_ref().map(|b| b.polygons), Some(1));
        assert_eq!(report.filter_state, FilterState::Filtered);
        assert_eq!(report.groups.inside, 3);
        assert_eq!(report.groups.outside, 1);

        // Both signals arrive within the debounce delay, only the last one syncs
        assert_eq!(report.viewport_syncs.len(), 1);
        assert_eq!(report.viewport_syncs[0].outcome, SyncOutcome::Selected(vec![2, 3]));
        assert_eq!(
            report.selection,
            vec![SelectionId { row: 2 }, SelectionId { row: 3 }]
        );
        assert_eq!(report.layers["Boundary"].z_index, 100);
        assert_eq!(
            report.layers["Boundary"].boundary_style.map(|s| s.opacity),
            Some(0.7)
        );
        assert_eq!(report.layers["Unselected Points"].items, 1);
    }

    #[tokio::test]
    async fn test_rejected_boundary_is_reported() {
        let settings = settings(&[
            "--boundary",
            "http://example.com/zones.geojson",
            "--filter",
        ]);
        let report = run_with_rows(&settings, rows()).await.unwrap();
        assert!(report.boundary.is_none());
        assert!(report.boundary_error.is_some());
        // Without a boundary the filter leaves every point unfiltered
        assert_eq!(report.filter_state, FilterState::Disabled);
        assert_eq!(report.groups.all, 4);
        assert_eq!(report.groups.inside, 0);
        assert_eq!(report.groups.outside, 0);
        assert!(report.selection.is_empty());
    }

    #[tokio::test]
    async fn test_point_tooltip() {
        let settings = settings(&["--select-point", "1", "--columns", "Lat,Lng,Name"]);
        let report = run_with_rows(&settings, rows()).await.unwrap();
        let tooltip = report.tooltip.unwrap();
        assert_eq!(tooltip.len(), 3);
        assert_eq!(tooltip[2].value, "b");
        assert_eq!(report.selection, vec![SelectionId { row: 1 }]);
    }

    #[test]
    fn test_columns_roles() {
        let columns = columns(&["Lat".to_string(), "Lng".to_string(), "Name".to_string()]);
        assert!(columns[0].latitude && !columns[0].tooltip);
        assert!(columns[1].longitude);
        assert!(columns[2].tooltip);
    }
}
