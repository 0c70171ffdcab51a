//! Debouncing of viewport changes
//!
//! The map widget reports a viewport every frame while the user pans or
//! zooms. Requerying the index on each of those would waste work on
//! intermediate positions, so the debouncer holds the latest viewport until
//! it has been stable for a settle delay and only then releases it.
//!
//! Time is passed in explicitly so tests can drive the clock.

use crate::viewport::Viewport;
use instant::Instant;
use std::time::Duration;

/// Delay the viewport must stay unchanged before a requery fires.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(150);

/// Coalesces a stream of viewport updates into settled ones.
#[derive(Clone, Debug)]
pub struct ViewportDebouncer {
    delay: Duration,
    pending: Option<(Viewport, Instant)>,
}

impl Default for ViewportDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_DELAY)
    }
}

impl ViewportDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Record the viewport seen at `now`.
    ///
    /// A viewport equal to the one already pending keeps its original
    /// deadline; only an actual change restarts the settle delay.
    pub fn observe(&mut self, viewport: Viewport, now: Instant) {
        match &self.pending {
            Some((pending, _)) if *pending == viewport => {}
            _ => self.pending = Some((viewport, now)),
        }
    }

    /// Release the pending viewport once it has settled, clearing it.
    pub fn poll(&mut self, now: Instant) -> Option<Viewport> {
        let (_, since) = self.pending.as_ref()?;
        if now.duration_since(*since) >= self.delay {
            self.pending.take().map(|(viewport, _)| viewport)
        } else {
            None
        }
    }

    /// Release the pending viewport immediately, settled or not.
    ///
    /// Used for programmatic moves like fit-to-bounds and cluster expansion,
    /// which should requery without waiting out the delay.
    pub fn flush(&mut self) -> Option<Viewport> {
        self.pending.take().map(|(viewport, _)| viewport)
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(zoom: f64) -> Viewport {
        Viewport::new(76.9, 28.4, 77.5, 28.9, zoom)
    }

    #[test]
    fn test_releases_only_after_settle_delay() {
        let mut debouncer = ViewportDebouncer::default();
        let start = Instant::now();

        debouncer.observe(viewport(10.0), start);
        assert!(debouncer.is_pending());
        assert!(debouncer.poll(start + Duration::from_millis(100)).is_none());

        let released = debouncer.poll(start + Duration::from_millis(150));
        assert_eq!(released, Some(viewport(10.0)));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_changed_viewport_restarts_the_delay() {
        let mut debouncer = ViewportDebouncer::default();
        let start = Instant::now();

        debouncer.observe(viewport(10.0), start);
        debouncer.observe(viewport(11.0), start + Duration::from_millis(100));

        assert!(debouncer.poll(start + Duration::from_millis(200)).is_none());
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(250)),
            Some(viewport(11.0))
        );
    }

    #[test]
    fn test_repeated_identical_viewport_keeps_deadline() {
        let mut debouncer = ViewportDebouncer::default();
        let start = Instant::now();

        debouncer.observe(viewport(10.0), start);
        debouncer.observe(viewport(10.0), start + Duration::from_millis(100));

        assert_eq!(
            debouncer.poll(start + Duration::from_millis(150)),
            Some(viewport(10.0))
        );
    }

    #[test]
    fn test_flush_releases_immediately() {
        let mut debouncer = ViewportDebouncer::default();
        debouncer.observe(viewport(10.0), Instant::now());

        assert_eq!(debouncer.flush(), Some(viewport(10.0)));
        assert!(debouncer.flush().is_none());
    }

    #[test]
    fn test_poll_with_nothing_pending() {
        let mut debouncer = ViewportDebouncer::default();
        assert!(debouncer.poll(Instant::now()).is_none());
    }
}
