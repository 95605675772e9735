//! Classification of points into render groups
//!
//! Every point carries exactly one [`Group`] tag, so a point can never be rendered in
//! two groups at once. Render layers are views filtered by tag.

use crate::config::{Color, EngineConfig, MarkerStyle};
use crate::{Classifier, Point, PolygonIndex};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Render group of a point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Group {
    /// Unfiltered: no boundary filter is applied
    All,
    /// Inside the boundary
    Inside,
    /// Outside the boundary
    Outside,
}

impl Group {
    pub fn all() -> &'static [Self] {
        &[Self::All, Self::Inside, Self::Outside]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::All => "Points",
            Self::Inside => "Selected Points",
            Self::Outside => "Unselected Points",
        }
    }
}

/// Filter lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FilterState {
    /// No filter applied, every point is tagged [`Group::All`]
    #[default]
    Disabled,
    /// A classification pass is running
    Classifying,
    /// Every point is tagged [`Group::Inside`] or [`Group::Outside`]
    Filtered,
}

/// Styles of the three render groups
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GroupStyles {
    pub all: MarkerStyle,
    pub inside: MarkerStyle,
    pub outside: MarkerStyle,
}

impl GroupStyles {
    /// Derive the filtered styles from the base marker style
    ///
    /// Inside markers keep the base look; outside markers are greyed out and shrunk.
    pub fn from_base(base: MarkerStyle, outside_fill: Color, outside_radius_delta: f64) -> Self {
        Self {
            all: base,
            inside: base,
            outside: MarkerStyle {
                fill_color: outside_fill,
                radius: (base.radius - outside_radius_delta).max(0.0),
                ..base
            },
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::from_base(
            config.marker_style,
            config.outside_fill,
            config.outside_radius_delta,
        )
    }

    #[inline]
    pub fn get(&self, group: Group) -> &MarkerStyle {
        match group {
            Group::All => &self.all,
            Group::Inside => &self.inside,
            Group::Outside => &self.outside,
        }
    }
}

impl Default for GroupStyles {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Group tags of the current point set, aligned with dataset positions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Partition {
    tags: Vec<Group>,
}

impl Partition {
    /// An unfiltered partition of `len` points
    pub fn unfiltered(len: usize) -> Self {
        Self {
            tags: vec![Group::All; len],
        }
    }

    /// Number of points covered
    #[inline]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Tag of the point at `position`
    #[inline]
    pub fn group_of(&self, position: usize) -> Option<Group> {
        self.tags.get(position).copied()
    }

    /// Whether points are split into Inside/Outside
    #[inline]
    pub fn is_filtered(&self) -> bool {
        self.tags.iter().any(|tag| *tag != Group::All)
    }

    /// Dataset positions a selection drawn from `group` may pick
    ///
    /// [`Group::All`] yields every position whatever its tag; Inside and Outside
    /// yield only points carrying that tag. Use [`Partition::tagged`] for layer
    /// contents.
    pub fn selection_candidates(&self, group: Group) -> impl Iterator<Item = usize> + '_ {
        self.tags
            .iter()
            .enumerate()
            .filter(move |(_, tag)| group == Group::All || **tag == group)
            .map(|(position, _)| position)
    }

    /// Dataset positions currently tagged `group` (the render layer contents)
    ///
    /// Unlike [`Partition::selection_candidates`], [`Group::All`] yields nothing once
    /// the points are split into Inside and Outside.
    pub fn tagged(&self, group: Group) -> impl Iterator<Item = usize> + '_ {
        self.tags
            .iter()
            .enumerate()
            .filter(move |(_, tag)| **tag == group)
            .map(|(position, _)| position)
    }

    /// Number of selection candidates of `group`
    pub fn count(&self, group: Group) -> usize {
        self.selection_candidates(group).count()
    }
}

/// Timing of the last classification pass
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PassStats {
    pub points: usize,
    pub inside: usize,
    pub outside: usize,
    pub duration: Duration,
}

/// Owns the partition, its filter state and the group styles
#[derive(Debug, Clone, Default)]
pub struct PartitionEngine {
    partition: Partition,
    styles: GroupStyles,
    state: FilterState,
    last_pass: Option<PassStats>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl PartitionEngine {
    pub fn new(styles: GroupStyles) -> Self {
        Self {
            styles,
            ..Default::default()
        }
    }

    /// Recompute the partition for `points`
    ///
    /// With the filter disabled every point is tagged [`Group::All`]. With the filter
    /// enabled this is always a full pass over all points.
    pub fn classify(
        &mut self,
        points: &[Point],
        index: &PolygonIndex,
        filter_enabled: bool,
    ) -> &Partition {
        if !filter_enabled {
            self.reset(points.len());
            return &self.partition;
        }

        #[cfg(feature = "profiling")]
        profiling::scope!("partition::classify");

        self.state = FilterState::Classifying;
        let start = instant::Instant::now();

        let classifier = Classifier::new(index);
        let tags: Vec<Group> = points
            .iter()
            .map(|point| {
                if classifier.contains(point.lat, point.lng) {
                    Group::Inside
                } else {
                    Group::Outside
                }
            })
            .collect();

        let inside = tags.iter().filter(|tag| **tag == Group::Inside).count();
        let stats = PassStats {
            points: tags.len(),
            inside,
            outside: tags.len() - inside,
            duration: start.elapsed(),
        };
        tracing::debug!(
            "Classified {} points in {:.2} ms ({} inside, {} outside)",
            stats.points,
            stats.duration.as_secs_f64() * 1000.0,
            stats.inside,
            stats.outside
        );

        self.partition = Partition { tags };
        self.last_pass = Some(stats);
        self.state = FilterState::Filtered;
        &self.partition
    }

    /// Put every point back in the unfiltered group
    pub fn reset(&mut self, len: usize) {
        self.partition = Partition::unfiltered(len);
        self.state = FilterState::Disabled;
    }

    /// Replace the group styles; applies to every member on the next render
    pub fn set_styles(&mut self, styles: GroupStyles) {
        self.styles = styles;
    }

    #[inline]
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    #[inline]
    pub fn styles(&self) -> &GroupStyles {
        &self.styles
    }

    #[inline]
    pub fn state(&self) -> FilterState {
        self.state
    }

    #[inline]
    pub fn last_pass(&self) -> Option<PassStats> {
        self.last_pass
    }

    /// Style a point at `position` is rendered with
    pub fn style_of(&self, position: usize) -> Option<&MarkerStyle> {
        self.partition
            .group_of(position)
            .map(|group| self.styles.get(group))
    }
}
