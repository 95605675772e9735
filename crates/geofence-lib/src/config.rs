//! Engine configuration and marker styling
//!
//! Everything here is plain data: the engine reads it, never mutates it, and a
//! composing application is free to build it from CLI flags or persisted settings.

use crate::{GeofenceError, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Row count at which hosts should warn that the dataset is too large to be useful
pub const DEFAULT_RECORD_WARNING_THRESHOLD: usize = 30_000;

/// Boundary fetches are abandoned after this long
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Trailing-edge delay used to coalesce rapid pan/zoom signals
pub const DEFAULT_VIEWPORT_DEBOUNCE: Duration = Duration::from_millis(150);

/// Domains a boundary source may be fetched from (exact host or any subdomain)
pub const DEFAULT_TRUSTED_DOMAINS: &[&str] = &[
    // Base map providers
    "openstreetmap.org",
    "opentopomap.org",
    "stadiamaps.com",
    "arcgisonline.com",
    // Cloud storage
    "amazonaws.com",
    "s3.amazonaws.com",
    "storage.googleapis.com",
    "blob.core.windows.net",
    // Mapping / GIS platforms
    "arcgis.com",
    "mapbox.com",
    "api.mapbox.com",
    "carto.com",
    "services.arcgis.com",
    // Data portals
    "data.humdata.org",
    "naturalearthdata.com",
    "geojson.xyz",
    "geojson.io",
    "geo.api.gouv.fr",
    // Code hosting
    "githubusercontent.com",
    "raw.githubusercontent.com",
    "gist.githubusercontent.com",
    "gitlab.io",
    "gitlab-static.net",
    // Government and research
    "data.gov.uk",
    "data.gov",
    "open.canada.ca",
    "data.europa.eu",
    "eurostat.eu",
    "un.org",
    "who.int",
    "worldbank.org",
    "data.oecd.org",
    // Dutch sources
    "bimappy.nl",
    "bimappy.com",
    "pdok.nl",
    "data.overheid.nl",
    "kadaster.nl",
    "cbs.nl",
    "rivm.nl",
    "rvo.nl",
    "basisregistraties.nl",
    "esri.nl",
    "esri.com",
    "nationaalgeoregister.nl",
    "geoservices.nl",
];

/// File extensions accepted at the end of a boundary URL path
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[".geojson", ".json"];

/// Path fragments that mark an API endpoint serving GeoJSON without an extension
pub const DEFAULT_API_PATH_MARKERS: &[&str] = &["/api/", "/geoserver/", "/arcgis/rest/services/"];

/// An sRGB color, written as `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for Color {
    type Err = GeofenceError;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(GeofenceError::InvalidColor(s.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|_| GeofenceError::InvalidColor(s.to_string()))
        };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Visual style of a circular point marker
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MarkerStyle {
    pub fill_color: Color,
    pub border_color: Color,
    /// Border stroke width in pixels
    pub border_width: f64,
    /// Stroke and fill opacity, 0.0 to 1.0
    pub opacity: f64,
    /// Marker radius in pixels
    pub radius: f64,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            fill_color: Color::rgb(0x00, 0x78, 0xd4),
            border_color: Color::rgb(0xff, 0xff, 0xff),
            border_width: 1.0,
            opacity: 1.0,
            radius: 5.0,
        }
    }
}

/// Visual style of the boundary polygon overlay
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundaryStyle {
    /// Stroke and fill color
    pub color: Color,
    /// Stroke and fill opacity, 0.0 to 1.0
    pub opacity: f64,
}

impl Default for BoundaryStyle {
    fn default() -> Self {
        Self {
            color: Color::rgb(0x00, 0x00, 0xff),
            opacity: 0.7,
        }
    }
}

/// Rules a boundary source URL has to satisfy before it is fetched
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UrlPolicy {
    /// Hosts allowed verbatim or as a parent domain
    pub trusted_domains: Vec<String>,
    /// Accepted path suffixes, compared case-insensitively
    pub allowed_extensions: Vec<String>,
    /// Path fragments that are accepted in place of an extension
    pub api_path_markers: Vec<String>,
}

impl Default for UrlPolicy {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            trusted_domains: owned(DEFAULT_TRUSTED_DOMAINS),
            allowed_extensions: owned(DEFAULT_ALLOWED_EXTENSIONS),
            api_path_markers: owned(DEFAULT_API_PATH_MARKERS),
        }
    }
}

/// Configuration for the geofence engine
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    /// Base style of every marker while no filter is applied
    pub marker_style: MarkerStyle,
    /// Style of the boundary overlay
    pub boundary_style: BoundaryStyle,
    /// Fill color of points classified outside the boundary
    pub outside_fill: Color,
    /// Outside markers are drawn this many pixels smaller than the base radius
    pub outside_radius_delta: f64,
    /// Loads with at least this many rows are flagged in the [`crate::LoadReport`]
    pub record_warning_threshold: usize,
    /// Boundary fetch timeout
    pub fetch_timeout: Duration,
    /// Quiet period before a burst of viewport changes is synchronized
    pub viewport_debounce: Duration,
    /// Boundary source URL policy
    pub url_policy: UrlPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            marker_style: MarkerStyle::default(),
            boundary_style: BoundaryStyle::default(),
            outside_fill: Color::rgb(0xcc, 0xcc, 0xcc),
            outside_radius_delta: 2.0,
            record_warning_threshold: DEFAULT_RECORD_WARNING_THRESHOLD,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            viewport_debounce: DEFAULT_VIEWPORT_DEBOUNCE,
            url_policy: UrlPolicy::default(),
        }
    }
}
