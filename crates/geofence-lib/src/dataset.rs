//! Point dataset built from host rows
//!
//! Each row supplies latitude and longitude in its first two fields (numbers or
//! numeric strings). Rows that fail validation are reported and skipped; the rest
//! become [`Point`]s that carry their row index, so selection never has to map a
//! coordinate back to a row.

use geo::{Coord, Rect};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell of a host row
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum RowValue {
    Number(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl RowValue {
    /// Interpret the cell as a coordinate component
    fn as_coordinate(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
            Self::Bool(_) | Self::Null => None,
        }
    }
}

impl fmt::Display for RowValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{}", value),
            Self::Text(text) => f.write_str(text),
            Self::Bool(value) => write!(f, "{}", value),
            Self::Null => Ok(()),
        }
    }
}

/// A host row: `[latitude, longitude, attributes...]`
pub type Row = Vec<RowValue>;

/// Column metadata used to build tooltips
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Column {
    pub display_name: String,
    /// Column is bound to the latitude role
    pub latitude: bool,
    /// Column is bound to the longitude role
    pub longitude: bool,
    /// Column is bound to the tooltip role
    pub tooltip: bool,
}

/// A tooltip line for a point
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TooltipItem {
    pub display_name: String,
    pub value: String,
}

/// A validated map point
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    /// Index of the originating host row, used as the selection identity
    pub row_index: usize,
    pub lat: f64,
    pub lng: f64,
}

impl Point {
    /// Position in (x = longitude, y = latitude) order
    #[inline]
    pub fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.lng,
            y: self.lat,
        }
    }
}

/// Why a row was left out of the point set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RejectReason {
    /// Fewer than two fields
    MissingField,
    /// A coordinate field is not a number or numeric string
    NonNumeric,
    /// A coordinate parsed to NaN
    NotANumber,
    /// Latitude outside [-90, 90]
    LatitudeOutOfRange,
    /// Longitude outside [-180, 180]
    LongitudeOutOfRange,
}

/// A rejected row and the reason it was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RejectedRow {
    pub row_index: usize,
    pub reason: RejectReason,
}

/// Summary of a dataset load
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LoadReport {
    /// Number of rows received from the host
    pub total_rows: usize,
    /// Number of rows that became points
    pub accepted: usize,
    /// Rows left out, in row order
    pub rejected: Vec<RejectedRow>,
    /// Rows accepted at exactly (0, 0), which usually means missing data
    pub suspicious: Vec<usize>,
    /// The row count reached the configured warning threshold
    pub exceeds_warning_threshold: bool,
}

/// Validate a row's coordinates
pub(crate) fn validate_row(row: &[RowValue]) -> Result<(f64, f64), RejectReason> {
    let (lat, lng) = match row {
        [lat, lng, ..] => (lat, lng),
        _ => return Err(RejectReason::MissingField),
    };
    let lat = lat.as_coordinate().ok_or(RejectReason::NonNumeric)?;
    let lng = lng.as_coordinate().ok_or(RejectReason::NonNumeric)?;

    if lat.is_nan() || lng.is_nan() {
        return Err(RejectReason::NotANumber);
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(RejectReason::LatitudeOutOfRange);
    }
    if !(-180.0..=180.0).contains(&lng) {
        return Err(RejectReason::LongitudeOutOfRange);
    }
    Ok((lat, lng))
}

/// The current point set and the rows it was built from
#[derive(Debug, Clone, Default)]
pub struct PointDataset {
    points: Vec<Point>,
    rows: Vec<Row>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl PointDataset {
    /// Build a dataset from host rows, skipping invalid ones
    ///
    /// `warning_threshold` only affects the returned report.
    pub fn load(rows: Vec<Row>, warning_threshold: usize) -> (Self, LoadReport) {
        #[cfg(feature = "profiling")]
        profiling::scope!("dataset::load");

        let mut report = LoadReport {
            total_rows: rows.len(),
            exceeds_warning_threshold: rows.len() >= warning_threshold,
            ..Default::default()
        };
        let mut points = Vec::with_capacity(rows.len());

        for (row_index, row) in rows.iter().enumerate() {
            match validate_row(row) {
                Ok((lat, lng)) => {
                    if lat == 0.0 && lng == 0.0 {
                        tracing::warn!("Suspicious coordinate at (0, 0) in row {}", row_index);
                        report.suspicious.push(row_index);
                    }
                    points.push(Point { row_index, lat, lng });
                }
                Err(reason) => {
                    tracing::warn!("Skipping row {}: {:?}", row_index, reason);
                    report.rejected.push(RejectedRow { row_index, reason });
                }
            }
        }

        report.accepted = points.len();
        if report.exceeds_warning_threshold {
            tracing::warn!(
                "{} rows loaded, at or above the warning threshold of {}",
                report.total_rows,
                warning_threshold
            );
        }
        tracing::debug!(
            "Loaded {} points ({} rejected)",
            report.accepted,
            report.rejected.len()
        );

        (Self { points, rows }, report)
    }

    /// All accepted points in row order
    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Point at a dataset position
    #[inline]
    pub fn get(&self, position: usize) -> Option<&Point> {
        self.points.get(position)
    }

    /// Number of accepted points
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The raw host row for a row index
    #[inline]
    pub fn row(&self, row_index: usize) -> Option<&Row> {
        self.rows.get(row_index)
    }

    /// Row index of the first point at exactly (`lat`, `lng`)
    ///
    /// This is an exact float comparison; duplicates resolve to the lowest row index.
    pub fn find_index_by_coordinate(&self, lat: f64, lng: f64) -> Option<usize> {
        self.points
            .iter()
            .find(|point| point.lat == lat && point.lng == lng)
            .map(|point| point.row_index)
    }

    /// Bounding box of all points in (x = longitude, y = latitude)
    ///
    /// Returns `None` when the dataset is empty.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        let first = self.points.first()?.coord();
        let (min, max) = self.points.iter().fold((first, first), |(min, max), point| {
            let c = point.coord();
            (
                Coord {
                    x: min.x.min(c.x),
                    y: min.y.min(c.y),
                },
                Coord {
                    x: max.x.max(c.x),
                    y: max.y.max(c.y),
                },
            )
        });
        Some(Rect::new(min, max))
    }

    /// Tooltip lines for a row: one per column bound to a coordinate or tooltip role
    pub fn tooltip(&self, row_index: usize, columns: &[Column]) -> Vec<TooltipItem> {
        let Some(row) = self.row(row_index) else {
            return Vec::new();
        };

        columns
            .iter()
            .zip(row.iter())
            .filter(|(column, _)| column.latitude || column.longitude || column.tooltip)
            .map(|(column, value)| TooltipItem {
                display_name: column.display_name.clone(),
                value: value.to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(value: f64) -> RowValue {
        RowValue::Number(value)
    }

    fn text(value: &str) -> RowValue {
        RowValue::Text(value.to_string())
    }

    #[test]
    fn test_load_rejects_invalid_rows() {
        let rows = vec![
            vec![num(52.37), num(4.89)],
            vec![num(91.0), num(4.89)],
            vec![text("52.1"), text("5.1")],
            vec![num(52.0), text("abc")],
            vec![num(-33.9), num(151.2)],
        ];
        let (dataset, report) = PointDataset::load(rows, 30_000);

        assert_eq!(dataset.len(), 3);
        assert_eq!(report.total_rows, 5);
        assert_eq!(report.accepted, 3);
        assert_eq!(
            report.rejected,
            vec![
                RejectedRow {
                    row_index: 1,
                    reason: RejectReason::LatitudeOutOfRange
                },
                RejectedRow {
                    row_index: 3,
                    reason: RejectReason::NonNumeric
                },
            ]
        );

        let row_indices: Vec<usize> = dataset.points().iter().map(|p| p.row_index).collect();
        assert_eq!(row_indices, vec![0, 2, 4]);
    }

    #[test]
    fn test_validate_row_reasons() {
        assert_eq!(validate_row(&[num(1.0)]), Err(RejectReason::MissingField));
        assert_eq!(
            validate_row(&[num(f64::NAN), num(1.0)]),
            Err(RejectReason::NotANumber)
        );
        assert_eq!(
            validate_row(&[text("NaN"), num(1.0)]),
            Err(RejectReason::NotANumber)
        );
        assert_eq!(
            validate_row(&[num(0.0), num(180.5)]),
            Err(RejectReason::LongitudeOutOfRange)
        );
        assert_eq!(
            validate_row(&[RowValue::Null, num(1.0)]),
            Err(RejectReason::NonNumeric)
        );
        assert_eq!(validate_row(&[num(90.0), num(-180.0)]), Ok((90.0, -180.0)));
    }

    #[test]
    fn test_zero_zero_is_suspicious_but_accepted() {
        let rows = vec![vec![num(0.0), num(0.0)], vec![num(1.0), num(1.0)]];
        let (dataset, report) = PointDataset::load(rows, 30_000);
        assert_eq!(dataset.len(), 2);
        assert_eq!(report.suspicious, vec![0]);
    }

    #[test]
    fn test_warning_threshold() {
        let rows: Vec<Row> = (0..10).map(|i| vec![num(i as f64), num(0.0)]).collect();
        let (_, report) = PointDataset::load(rows.clone(), 10);
        assert!(report.exceeds_warning_threshold);

        let (_, report) = PointDataset::load(rows, 11);
        assert!(!report.exceeds_warning_threshold);
    }

    #[test]
    fn test_find_index_by_coordinate() {
        let rows = vec![
            vec![text("bad"), num(0.0)],
            vec![num(10.0), num(20.0)],
            vec![num(10.0), num(20.0)],
        ];
        let (dataset, _) = PointDataset::load(rows, 30_000);

        // Duplicates resolve to the first row
        assert_eq!(dataset.find_index_by_coordinate(10.0, 20.0), Some(1));
        assert_eq!(dataset.find_index_by_coordinate(10.0, 20.000001), None);
    }

    #[test]
    fn test_bounds() {
        let empty = PointDataset::default();
        assert!(empty.bounds().is_none());

        let rows = vec![vec![num(10.0), num(-5.0)], vec![num(-2.0), num(7.0)]];
        let (dataset, _) = PointDataset::load(rows, 30_000);
        let bounds = dataset.bounds().unwrap();
        assert_eq!(bounds.min(), Coord { x: -5.0, y: -2.0 });
        assert_eq!(bounds.max(), Coord { x: 7.0, y: 10.0 });
    }

    #[test]
    fn test_tooltip() {
        let rows = vec![vec![num(52.5), num(4.9), text("Amsterdam"), num(12.0)]];
        let (dataset, _) = PointDataset::load(rows, 30_000);
        let columns = vec![
            Column {
                display_name: "Lat".to_string(),
                latitude: true,
                ..Default::default()
            },
            Column {
                display_name: "Lng".to_string(),
                longitude: true,
                ..Default::default()
            },
            Column {
                display_name: "City".to_string(),
                tooltip: true,
                ..Default::default()
            },
            Column {
                display_name: "Hidden".to_string(),
                ..Default::default()
            },
        ];

        let items = dataset.tooltip(0, &columns);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].value, "52.5");
        assert_eq!(items[2].display_name, "City");
        assert_eq!(items[2].value, "Amsterdam");

        assert!(dataset.tooltip(5, &columns).is_empty());
    }
}
