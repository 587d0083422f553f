use std::time::Duration;
use tokio::time::Instant;

/// Default tolerance for clock jumps in either direction.
pub const DEFAULT_MAX_JUMP: Duration = Duration::from_millis(500);

/// Acceptance window for the step between two consecutive clock values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscontinuityWindow {
    /// Largest backward step still treated as continuous.
    pub max_backward: Duration,
    /// Largest forward step still treated as continuous.
    pub max_forward: Duration,
}

impl DiscontinuityWindow {
    pub fn symmetric(max_jump: Duration) -> Self {
        Self {
            max_backward: max_jump,
            max_forward: max_jump,
        }
    }

    /// True when stepping from `last` to `value` stays within the window.
    pub fn contains(&self, last: Duration, value: Duration) -> bool {
        if value >= last {
            value - last <= self.max_forward
        } else {
            last - value <= self.max_backward
        }
    }
}

impl Default for DiscontinuityWindow {
    fn default() -> Self {
        Self::symmetric(DEFAULT_MAX_JUMP)
    }
}

/// A clock value pinned to the wall-clock instant it was considered "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub value: Duration,
    pub wall_time: Instant,
}

/// What a single observation did to the clock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// No clock value seen yet; nothing to schedule against.
    Idle,
    /// No new value; the previous one is carried forward unchanged.
    Carried,
    /// First value of the run; anchor established.
    Started,
    /// Value within the window of the previous one.
    Continuous,
    /// Value outside the window; anchor reset.
    Discontinuity { from: Duration, to: Duration },
}

/// Recovered clock of one playback run.
///
/// The anchor changes only as a whole, and only on [`ClockEvent::Started`]
/// or [`ClockEvent::Discontinuity`].
#[derive(Debug, Clone, Default)]
pub struct ClockState {
    window: DiscontinuityWindow,
    last_value: Option<Duration>,
    anchor: Option<Anchor>,
}

impl ClockState {
    pub fn new(window: DiscontinuityWindow) -> Self {
        Self {
            window,
            last_value: None,
            anchor: None,
        }
    }

    /// Feeds the clock value recovered from the current chunk, if any.
    pub fn observe(&mut self, value: Option<Duration>, now: Instant) -> ClockEvent {
        let Some(value) = value else {
            return match self.last_value {
                Some(_) => ClockEvent::Carried,
                None => ClockEvent::Idle,
            };
        };

        let event = match self.last_value {
            None => {
                self.anchor = Some(Anchor { value, wall_time: now });
                ClockEvent::Started
            }
            Some(last) if !self.window.contains(last, value) => {
                self.anchor = Some(Anchor { value, wall_time: now });
                ClockEvent::Discontinuity { from: last, to: value }
            }
            Some(_) => ClockEvent::Continuous,
        };

        self.last_value = Some(value);
        event
    }

    /// The clock value of the current chunk, carried forward across chunks
    /// without a PCR.
    pub fn current(&self) -> Option<Duration> {
        self.last_value
    }

    pub fn anchor(&self) -> Option<Anchor> {
        self.anchor
    }

    /// Wall-clock instant at which the current value is due.
    pub fn target(&self) -> Option<Instant> {
        let anchor = self.anchor?;
        let current = self.current()?;
        Some(anchor.wall_time + current.saturating_sub(anchor.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quickcheck_macros::quickcheck;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_window_bounds() {
        let window = DiscontinuityWindow::default();
        assert!(window.contains(ms(1000), ms(1500)));
        assert!(!window.contains(ms(1000), ms(1501)));
        assert!(window.contains(ms(1000), ms(500)));
        assert!(!window.contains(ms(1000), ms(499)));

        let asymmetric = DiscontinuityWindow {
            max_backward: ms(500),
            max_forward: Duration::from_secs(60),
        };
        assert!(asymmetric.contains(ms(0), Duration::from_secs(30)));
        assert!(!asymmetric.contains(Duration::from_secs(30), ms(0)));
    }

    #[test]
    fn test_idle_until_first_value() {
        let mut clock = ClockState::default();
        let now = Instant::now();
        assert_eq!(clock.observe(None, now), ClockEvent::Idle);
        assert_eq!(clock.target(), None);
        assert_eq!(clock.current(), None);
    }

    #[test]
    fn test_first_value_anchors() {
        let mut clock = ClockState::default();
        let now = Instant::now();
        assert_eq!(clock.observe(Some(ms(10_000)), now), ClockEvent::Started);
        assert_eq!(
            clock.anchor(),
            Some(Anchor {
                value: ms(10_000),
                wall_time: now
            })
        );
        assert_eq!(clock.target(), Some(now));
    }

    #[test]
    fn test_continuous_values_keep_anchor() {
        let mut clock = ClockState::default();
        let start = Instant::now();
        clock.observe(Some(ms(10_000)), start);

        let later = start + ms(5);
        assert_eq!(clock.observe(Some(ms(10_040)), later), ClockEvent::Continuous);
        assert_eq!(clock.anchor().unwrap().wall_time, start);
        assert_eq!(clock.target(), Some(start + ms(40)));
    }

    #[test]
    fn test_missing_pcr_carries_value_forward() {
        let mut clock = ClockState::default();
        let start = Instant::now();
        clock.observe(Some(ms(10_000)), start);
        clock.observe(Some(ms(10_040)), start);

        assert_eq!(clock.observe(None, start + ms(100)), ClockEvent::Carried);
        assert_eq!(clock.current(), Some(ms(10_040)));
        assert_eq!(clock.target(), Some(start + ms(40)));
    }

    #[test]
    fn test_forward_jump_resets_anchor() {
        let mut clock = ClockState::default();
        let start = Instant::now();
        clock.observe(Some(ms(10_000)), start);

        let later = start + ms(20);
        assert_eq!(
            clock.observe(Some(ms(20_000)), later),
            ClockEvent::Discontinuity {
                from: ms(10_000),
                to: ms(20_000)
            }
        );
        assert_eq!(
            clock.anchor(),
            Some(Anchor {
                value: ms(20_000),
                wall_time: later
            })
        );
        assert_eq!(clock.target(), Some(later));
    }

    #[test]
    fn test_backward_jump_resets_anchor() {
        let mut clock = ClockState::default();
        let start = Instant::now();
        clock.observe(Some(ms(60_000)), start);

        let later = start + ms(1);
        let event = clock.observe(Some(ms(100)), later);
        assert!(matches!(event, ClockEvent::Discontinuity { .. }));
        assert_eq!(clock.current(), Some(ms(100)));
        assert_eq!(clock.target(), Some(later));
    }

    #[test]
    fn test_small_backward_step_saturates_to_anchor() {
        let mut clock = ClockState::default();
        let start = Instant::now();
        clock.observe(Some(ms(10_000)), start);
        assert_eq!(clock.observe(Some(ms(9_900)), start), ClockEvent::Continuous);
        assert_eq!(clock.target(), Some(start));
    }

    #[quickcheck]
    fn prop_anchor_only_moves_on_reset(steps: Vec<(u16, bool)>) -> bool {
        let mut clock = ClockState::default();
        let start = Instant::now();
        let mut value = Duration::from_secs(100);
        let mut previous_anchor = None;

        for (i, (step, backward)) in steps.into_iter().enumerate() {
            let step = Duration::from_millis(step as u64);
            value = if backward {
                value.saturating_sub(step)
            } else {
                value + step
            };
            let now = start + Duration::from_millis(i as u64);
            let event = clock.observe(Some(value), now);
            let anchor = clock.anchor();

            let ok = match event {
                ClockEvent::Started | ClockEvent::Discontinuity { .. } => {
                    anchor == Some(Anchor { value, wall_time: now })
                }
                ClockEvent::Continuous => anchor == previous_anchor,
                _ => false,
            };
            if !ok || clock.current() != Some(value) {
                return false;
            }
            previous_anchor = anchor;
        }
        true
    }
}
