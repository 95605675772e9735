//! GeoJSON boundary source parsing
//!
//! Only `Polygon` and `MultiPolygon` geometries (also when nested in a
//! `GeometryCollection`) contribute to the boundary. Other geometry types are skipped.
//! Malformed polygon coordinates reject the whole document.

use crate::{GeofenceError, PolygonFeature, Result};
use geo::{Coord, LineString, Polygon};
use serde_json::{Map, Value};

/// Polygons extracted from a boundary source
#[derive(Debug, Clone, Default)]
pub struct BoundaryDocument {
    /// Value of the top-level `type` field
    pub kind: String,
    /// Number of entries in `features`
    pub feature_count: usize,
    /// Features whose geometry was not a polygon
    pub skipped_features: usize,
    /// One entry per polygon found
    pub polygons: Vec<PolygonFeature>,
}

/// Parse a boundary source from JSON text
pub fn parse_boundary(payload: &str) -> Result<BoundaryDocument> {
    let value: Value = serde_json::from_str(payload)?;
    BoundaryDocument::from_value(&value)
}

impl BoundaryDocument {
    /// Extract polygons from a parsed GeoJSON value
    ///
    /// The value must be an object with a string `type` and a `features` array, and at
    /// least one polygon has to be found.
    pub fn from_value(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| invalid("top-level value must be an object"))?;
        let kind = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing `type` field"))?;
        let features = obj
            .get("features")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("missing `features` array"))?;

        let mut polygons = Vec::new();
        let mut skipped_features = 0;

        for (feature_index, feature) in features.iter().enumerate() {
            let geometry = feature
                .as_object()
                .ok_or_else(|| invalid(format!("feature {feature_index} must be an object")))?
                .get("geometry");

            let before = polygons.len();
            match geometry {
                Some(Value::Object(geometry)) => {
                    collect_polygons(geometry, feature_index, &mut polygons)?
                }
                // Features without geometry are legal GeoJSON
                Some(Value::Null) | None => {}
                Some(_) => {
                    return Err(invalid(format!(
                        "feature {feature_index} geometry must be an object"
                    )));
                }
            }
            if polygons.len() == before {
                skipped_features += 1;
            }
        }

        if polygons.is_empty() {
            return Err(GeofenceError::EmptyBoundary);
        }

        tracing::debug!(
            "Parsed {} polygons from {} features ({} skipped)",
            polygons.len(),
            features.len(),
            skipped_features
        );

        Ok(Self {
            kind: kind.to_string(),
            feature_count: features.len(),
            skipped_features,
            polygons,
        })
    }
}

fn invalid(reason: impl Into<String>) -> GeofenceError {
    GeofenceError::InvalidBoundary(reason.into())
}

fn collect_polygons(
    geometry: &Map<String, Value>,
    feature_index: usize,
    out: &mut Vec<PolygonFeature>,
) -> Result<()> {
    let kind = geometry
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(format!("feature {feature_index} geometry missing type")))?;

    let coordinates = || {
        geometry
            .get("coordinates")
            .ok_or_else(|| invalid(format!("feature {feature_index} missing coordinates")))
    };

    match kind {
        "Polygon" => {
            let polygon = parse_polygon(coordinates()?)
                .map_err(|reason| invalid(format!("feature {feature_index}: {reason}")))?;
            push_feature(out, feature_index, polygon);
        }
        "MultiPolygon" => {
            let parts = coordinates()?.as_array().ok_or_else(|| {
                invalid(format!("feature {feature_index}: MultiPolygon coordinates must be an array"))
            })?;
            for part in parts {
                let polygon = parse_polygon(part)
                    .map_err(|reason| invalid(format!("feature {feature_index}: {reason}")))?;
                push_feature(out, feature_index, polygon);
            }
        }
        "GeometryCollection" => {
            let members = geometry
                .get("geometries")
                .and_then(Value::as_array)
                .ok_or_else(|| invalid(format!("feature {feature_index} missing geometries")))?;
            for member in members {
                let member = member.as_object().ok_or_else(|| {
                    invalid(format!("feature {feature_index}: geometry must be an object"))
                })?;
                collect_polygons(member, feature_index, out)?;
            }
        }
        other => {
            tracing::trace!("Ignoring {} geometry in feature {}", other, feature_index);
        }
    }
    Ok(())
}

fn push_feature(out: &mut Vec<PolygonFeature>, feature_index: usize, polygon: Polygon<f64>) {
    // parse_polygon guarantees a non-empty exterior, so a bounding box always exists
    if let Some(feature) = PolygonFeature::new(feature_index, polygon) {
        out.push(feature);
    }
}

/// Parse `[[[lng, lat], ...], [hole...], ...]`
fn parse_polygon(value: &Value) -> std::result::Result<Polygon<f64>, String> {
    let rings = value
        .as_array()
        .ok_or_else(|| "polygon coordinates must be an array".to_string())?;
    let (exterior, holes) = rings
        .split_first()
        .ok_or_else(|| "polygon has no rings".to_string())?;

    let exterior = parse_ring(exterior)?;
    let holes = holes.iter().map(parse_ring).collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, holes))
}

fn parse_ring(value: &Value) -> std::result::Result<LineString<f64>, String> {
    let positions = value
        .as_array()
        .ok_or_else(|| "ring must be an array".to_string())?;
    let coords = positions
        .iter()
        .map(parse_position)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    // A closed ring repeats its first position, so a triangle has four
    let distinct = match (coords.first(), coords.last()) {
        (Some(first), Some(last)) if first == last => coords.len() - 1,
        _ => coords.len(),
    };
    if distinct < 3 {
        return Err(format!("ring has {} distinct positions, need 3", distinct));
    }
    Ok(LineString::new(coords))
}

fn parse_position(value: &Value) -> std::result::Result<Coord<f64>, String> {
    match value.as_array().map(Vec::as_slice) {
        Some([x, y, ..]) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Ok(Coord { x, y }),
            _ => Err(format!("position {value} is not numeric")),
        },
        _ => Err(format!("position {value} needs two numbers")),
    }
}
