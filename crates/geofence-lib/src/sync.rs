//! Selection synchronization with the host application
//!
//! The synchronizer owns the selection set last pushed to the host. Every push
//! replaces that set as a whole: a non-empty set goes out as one multi-select call,
//! an empty one as a clear.

use crate::{Group, Partition, PointDataset, ViewportBounds};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Host selection API
///
/// The engine never looks inside a handle; it only asks the host to make one for a
/// row and hands them back in bulk.
pub trait SelectionHost {
    type Handle;

    /// Create a selection handle for a host row
    fn create_handle(&self, row_index: usize) -> Self::Handle;

    /// Replace (or extend, with `multi_select`) the host selection
    fn select(&mut self, handles: Vec<Self::Handle>, multi_select: bool);

    /// Clear the host selection
    fn clear(&mut self);
}

/// What a synchronization cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SyncOutcome {
    /// Zoom-based selection is off; nothing was touched
    Disabled,
    /// The computed selection equals the one already pushed; the host was not called
    Unchanged,
    /// The host received a multi-select with these rows
    Selected(Vec<usize>),
    /// The host selection was cleared
    Cleared,
}

/// Owner of the selection set pushed to the host
#[derive(Debug, Clone, Default)]
pub struct SelectionSynchronizer {
    /// Row indices of the last push; `None` until something was pushed
    selection: Option<Vec<usize>>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl SelectionSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The selection set last pushed to the host
    #[inline]
    pub fn selection(&self) -> &[usize] {
        self.selection.as_deref().unwrap_or_default()
    }

    /// Forget the last push so the next cycle always reaches the host
    pub fn invalidate(&mut self) {
        self.selection = None;
    }

    /// Select the points of the current selection group that lie in `bounds`
    ///
    /// The candidate group is Inside while a boundary filter is active and every
    /// point otherwise. Classification is never rerun here.
    pub fn sync<H: SelectionHost>(
        &mut self,
        bounds: &ViewportBounds,
        dataset: &PointDataset,
        partition: &Partition,
        zoom_selection_enabled: bool,
        host: &mut H,
    ) -> SyncOutcome {
        if !zoom_selection_enabled {
            return SyncOutcome::Disabled;
        }

        #[cfg(feature = "profiling")]
        profiling::scope!("sync::viewport");

        let group = if partition.is_filtered() {
            Group::Inside
        } else {
            Group::All
        };
        let rows: Vec<usize> = partition
            .selection_candidates(group)
            .filter_map(|position| dataset.get(position))
            .filter(|point| bounds.contains(point.lat, point.lng))
            .map(|point| point.row_index)
            .collect();

        tracing::debug!(
            "Viewport sync: {} of {} candidate points visible",
            rows.len(),
            partition.count(group)
        );

        if self.selection.as_deref() == Some(rows.as_slice()) {
            return SyncOutcome::Unchanged;
        }
        self.push(rows, host)
    }

    /// Replace the host selection with `rows`
    pub fn push<H: SelectionHost>(&mut self, rows: Vec<usize>, host: &mut H) -> SyncOutcome {
        let outcome = if rows.is_empty() {
            host.clear();
            SyncOutcome::Cleared
        } else {
            let handles = rows.iter().map(|row| host.create_handle(*row)).collect();
            host.select(handles, true);
            SyncOutcome::Selected(rows.clone())
        };
        self.selection = Some(rows);
        outcome
    }

    /// Replace the host selection with a single row (marker click)
    pub fn select_one<H: SelectionHost>(&mut self, row: usize, host: &mut H) {
        let handle = host.create_handle(row);
        host.select(vec![handle], false);
        self.selection = Some(vec![row]);
    }

    /// Clear the host selection
    pub fn clear<H: SelectionHost>(&mut self, host: &mut H) {
        host.clear();
        self.selection = Some(Vec::new());
    }
}
