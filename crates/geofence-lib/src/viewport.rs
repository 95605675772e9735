//! Viewport bounds and pan/zoom signal coalescing

use instant::Instant;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Visible map area in degrees plus the zoom level
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ViewportBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    pub zoom: u32,
}

impl ViewportBounds {
    pub fn new(north: f64, south: f64, east: f64, west: f64, zoom: u32) -> Self {
        Self {
            north,
            south,
            east,
            west,
            zoom,
        }
    }

    /// Whether (`lat`, `lng`) lies within the bounds, edges included
    #[inline]
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.south && lat <= self.north && lng >= self.west && lng <= self.east
    }
}

/// Trailing-edge debounce for viewport change signals
///
/// Every `zoomend`/`moveend` replaces the pending bounds and restarts the quiet
/// period; [`ViewportDebouncer::poll`] releases the latest bounds once no signal has
/// arrived for `delay`.
#[derive(Debug, Clone)]
pub struct ViewportDebouncer {
    delay: Duration,
    pending: Option<(ViewportBounds, Instant)>,
}

impl ViewportDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Record a viewport signal received at `now`
    pub fn push(&mut self, bounds: ViewportBounds, now: Instant) {
        self.pending = Some((bounds, now));
    }

    /// Take the pending bounds if the quiet period has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<ViewportBounds> {
        match self.pending {
            Some((bounds, received)) if now.saturating_duration_since(received) >= self.delay => {
                self.pending = None;
                Some(bounds)
            }
            _ => None,
        }
    }

    /// Take the pending bounds regardless of timing
    pub fn flush(&mut self) -> Option<ViewportBounds> {
        self.pending.take().map(|(bounds, _)| bounds)
    }

    /// Whether a signal is waiting
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending signal becomes due, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|(_, received)| received + self.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(north: f64) -> ViewportBounds {
        ViewportBounds::new(north, 0.0, 10.0, 0.0, 5)
    }

    #[test]
    fn test_contains_is_inclusive() {
        let viewport = ViewportBounds::new(10.0, 0.0, 10.0, 0.0, 5);
        assert!(viewport.contains(5.0, 5.0));
        assert!(viewport.contains(0.0, 0.0));
        assert!(viewport.contains(10.0, 10.0));
        assert!(!viewport.contains(20.0, 20.0));
        assert!(!viewport.contains(5.0, -0.001));
    }

    #[test]
    fn test_debounce_waits_for_quiet_period() {
        let delay = Duration::from_millis(150);
        let mut debouncer = ViewportDebouncer::new(delay);
        let t0 = Instant::now();

        debouncer.push(bounds(10.0), t0);
        assert!(debouncer.is_pending());
        assert_eq!(debouncer.poll(t0 + Duration::from_millis(100)), None);
        assert_eq!(debouncer.poll(t0 + delay), Some(bounds(10.0)));
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(t0 + Duration::from_secs(1)), None);
    }

    #[test]
    fn test_debounce_last_bounds_win() {
        let delay = Duration::from_millis(150);
        let mut debouncer = ViewportDebouncer::new(delay);
        let t0 = Instant::now();

        debouncer.push(bounds(10.0), t0);
        debouncer.push(bounds(11.0), t0 + Duration::from_millis(100));
        debouncer.push(bounds(12.0), t0 + Duration::from_millis(200));

        // The quiet period restarts with every signal
        assert_eq!(debouncer.poll(t0 + Duration::from_millis(300)), None);
        assert_eq!(
            debouncer.deadline(),
            Some(t0 + Duration::from_millis(200) + delay)
        );
        assert_eq!(
            debouncer.poll(t0 + Duration::from_millis(350)),
            Some(bounds(12.0))
        );
    }

    #[test]
    fn test_flush() {
        let mut debouncer = ViewportDebouncer::new(Duration::from_secs(10));
        assert_eq!(debouncer.flush(), None);
        debouncer.push(bounds(3.0), Instant::now());
        assert_eq!(debouncer.flush(), Some(bounds(3.0)));
        assert!(!debouncer.is_pending());
    }
}
