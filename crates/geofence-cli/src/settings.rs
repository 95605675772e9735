use clap::Parser;
use geofence_lib::{BoundaryStyle, Color, EngineConfig, MarkerStyle, ViewportBounds};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Geofence - filter map points by a GeoJSON boundary and sync the visible selection
pub struct Settings {
    /// JSON file with the host rows: `[[lat, lng, attributes...], ...]`
    #[clap(short, long, value_name = "FILE")]
    pub rows: PathBuf,

    /// Column display names, in row order (first two are latitude and longitude)
    #[clap(long, value_delimiter = ',', value_name = "NAME")]
    pub columns: Vec<String>,

    /// Boundary source: a local GeoJSON file or an https URL
    #[clap(short, long, value_name = "FILE|URL")]
    pub boundary: Option<String>,

    /// Only keep points inside the boundary selected
    #[clap(short, long)]
    pub filter: bool,

    /// Select the points visible in each viewport
    #[clap(short, long)]
    pub zoom_selection: bool,

    /// Viewport after a pan/zoom, repeatable (north,south,east,west,zoom)
    #[clap(long = "viewport", value_name = "N,S,E,W,ZOOM", value_parser = parse_viewport)]
    pub viewports: Vec<ViewportBounds>,

    /// Simulated time between consecutive viewport signals in milliseconds
    #[clap(long, default_value = "50")]
    pub pan_interval_ms: u64,

    /// Quiet period before a viewport change is synchronized in milliseconds
    #[clap(long, default_value = "150")]
    pub debounce_ms: u64,

    /// Click the point at this dataset position after everything else
    #[clap(long, value_name = "POSITION")]
    pub select_point: Option<usize>,

    /// Marker fill color
    #[clap(long, default_value = "#0078d4")]
    pub fill_color: Color,

    /// Marker border color
    #[clap(long, default_value = "#ffffff")]
    pub border_color: Color,

    /// Marker border width in pixels
    #[clap(long, default_value = "1.0")]
    pub border_width: f64,

    /// Marker opacity (0.0-1.0)
    #[clap(long, default_value = "1.0")]
    pub opacity: f64,

    /// Marker radius in pixels
    #[clap(long, default_value = "5.0")]
    pub radius: f64,

    /// Boundary overlay color
    #[clap(long, default_value = "#0000ff")]
    pub boundary_color: Color,

    /// Boundary overlay opacity (0.0-1.0)
    #[clap(long, default_value = "0.7")]
    pub boundary_opacity: f64,

    /// Fill color of points outside the boundary
    #[clap(long, default_value = "#cccccc")]
    pub outside_fill: Color,

    /// Row count that triggers the "too many records" warning
    #[clap(long, default_value = "30000")]
    pub record_warning_threshold: usize,

    /// Boundary download timeout in seconds
    #[clap(long, default_value = "30")]
    pub fetch_timeout_secs: u64,

    /// Additional trusted boundary domain, repeatable
    #[clap(long, value_name = "DOMAIN")]
    pub trusted_domain: Vec<String>,

    /// Write the JSON report here instead of stdout
    #[clap(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl Settings {
    pub fn from_cli() -> Self {
        match Settings::try_parse() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    /// Engine configuration described by these settings
    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig {
            marker_style: MarkerStyle {
                fill_color: self.fill_color,
                border_color: self.border_color,
                border_width: self.border_width,
                opacity: self.opacity.clamp(0.0, 1.0),
                radius: self.radius,
            },
            boundary_style: BoundaryStyle {
                color: self.boundary_color,
                opacity: self.boundary_opacity.clamp(0.0, 1.0),
            },
            outside_fill: self.outside_fill,
            record_warning_threshold: self.record_warning_threshold,
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            viewport_debounce: Duration::from_millis(self.debounce_ms),
            ..Default::default()
        };
        config
            .url_policy
            .trusted_domains
            .extend(self.trusted_domain.iter().cloned());
        config
    }
}

/// Parse `north,south,east,west,zoom`
fn parse_viewport(s: &str) -> Result<ViewportBounds, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [north, south, east, west, zoom] = parts.as_slice() else {
        return Err(format!("expected N,S,E,W,ZOOM, got {:?}", s));
    };
    let degrees = |value: &str| {
        value
            .parse::<f64>()
            .map_err(|e| format!("invalid coordinate {:?}: {}", value, e))
    };
    let bounds = ViewportBounds::new(
        degrees(*north)?,
        degrees(*south)?,
        degrees(*east)?,
        degrees(*west)?,
        zoom.parse()
            .map_err(|e| format!("invalid zoom {:?}: {}", zoom, e))?,
    );
    if bounds.south > bounds.north {
        return Err(format!("south {} is above north {}", bounds.south, bounds.north));
    }
    Ok(bounds)
}
