//! Turns pointer pushes against screen-edge barriers into a single trigger.
//!
//! Every hit contributes the distance the pointer tried to travel through
//! the barrier. Contributions older than the window fall out of the running
//! sum; once the sum reaches the threshold the barrier triggers and then stays
//! latched until the pointer leaves the barrier region.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::common::collections::BTreeMap;
use crate::common::config::PressureZoneSettings;
use crate::sys::geometry::{Axis, Segment};

bitflags! {
    /// Shell modes in which a gesture zone is live.
    #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ActionMode: u32 {
        const NORMAL = 1 << 0;
        const OVERVIEW = 1 << 1;
        const LOCK_SCREEN = 1 << 2;
        const UNLOCK_SCREEN = 1 << 3;
        const LOGIN_SCREEN = 1 << 4;
        const SYSTEM_MODAL = 1 << 5;
        const LOOKING_GLASS = 1 << 6;
        const POPUP = 1 << 7;
    }
}

bitflags! {
    /// Directions in which the pointer may pass through a barrier freely.
    /// Motion in any other direction is blocked and counts as pressure.
    #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BarrierDirections: u8 {
        const POSITIVE_X = 1 << 0;
        const POSITIVE_Y = 1 << 1;
        const NEGATIVE_X = 1 << 2;
        const NEGATIVE_Y = 1 << 3;
    }
}

impl Default for BarrierDirections {
    fn default() -> Self { Self::empty() }
}

#[derive(Debug, Error, PartialEq)]
pub enum BarrierError {
    #[error("pressure threshold must be positive (got {0})")]
    NonPositiveThreshold(f64),
    #[error("pressure window must be positive")]
    NonPositiveWindow,
    #[error("sample cap must be positive (got {0})")]
    NonPositiveSampleCap(f64),
    #[error("barrier segment {0:?} is not an axis-aligned line")]
    NotAxisAligned(Segment),
    #[error("unknown barrier {0:?}")]
    UnknownBarrier(BarrierId),
}

/// Position of a barrier in the order it was added since the last
/// [`PressureBarrier::clear_barriers`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BarrierId(pub u32);

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct BarrierSpec {
    pub segment: Segment,
    #[serde(default)]
    pub directions: BarrierDirections,
}

#[derive(Debug, Clone, Copy)]
struct Barrier {
    axis: Axis,
    directions: BarrierDirections,
}

/// One pointer sample reported against a barrier.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct BarrierHit {
    pub dx: f64,
    pub dy: f64,
    pub time_ms: u64,
    /// Another client holds a pointer grab.
    #[serde(default)]
    pub grabbed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Latched,
    Filtered,
    ActionMode,
    PermittedDirection,
    Sliding,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PressureOutcome {
    Ignored(IgnoreReason),
    Accumulated { pressure: f64 },
    Triggered,
}

type HitFilter = dyn Fn(&BarrierHit) -> bool;

pub struct PressureBarrier {
    threshold: f64,
    window_ms: u64,
    sample_cap: Option<f64>,
    action_modes: ActionMode,
    event_filter: Option<Box<HitFilter>>,
    barriers: BTreeMap<BarrierId, Barrier>,
    next_id: u32,
    events: VecDeque<(u64, f64)>,
    pressure: f64,
    last_time: u64,
    triggered: bool,
}

impl fmt::Debug for PressureBarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PressureBarrier")
            .field("threshold", &self.threshold)
            .field("window_ms", &self.window_ms)
            .field("sample_cap", &self.sample_cap)
            .field("action_modes", &self.action_modes)
            .field("barriers", &self.barriers.len())
            .field("pressure", &self.pressure)
            .field("triggered", &self.triggered)
            .finish_non_exhaustive()
    }
}

impl PressureBarrier {
    pub fn new(threshold: f64, window: Duration) -> Result<Self, BarrierError> {
        if !(threshold > 0.0) {
            return Err(BarrierError::NonPositiveThreshold(threshold));
        }
        let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        if window_ms == 0 {
            return Err(BarrierError::NonPositiveWindow);
        }
        Ok(Self {
            threshold,
            window_ms,
            sample_cap: None,
            action_modes: ActionMode::NORMAL | ActionMode::OVERVIEW,
            event_filter: None,
            barriers: BTreeMap::new(),
            next_id: 0,
            events: VecDeque::new(),
            pressure: 0.0,
            last_time: 0,
            triggered: false,
        })
    }

    pub fn from_settings(settings: &PressureZoneSettings) -> Result<Self, BarrierError> {
        let barrier = Self::new(settings.threshold, settings.window)?
            .with_action_modes(settings.action_modes);
        match settings.sample_cap {
            Some(cap) => barrier.with_sample_cap(cap),
            None => Ok(barrier),
        }
    }

    pub fn with_sample_cap(mut self, cap: f64) -> Result<Self, BarrierError> {
        if !(cap > 0.0) {
            return Err(BarrierError::NonPositiveSampleCap(cap));
        }
        self.sample_cap = Some(cap);
        Ok(self)
    }

    pub fn with_action_modes(mut self, modes: ActionMode) -> Self {
        self.action_modes = modes;
        self
    }

    /// Installs a filter that drops every hit for which it returns `true`.
    pub fn set_event_filter(&mut self, filter: impl Fn(&BarrierHit) -> bool + 'static) {
        self.event_filter = Some(Box::new(filter));
    }

    pub fn add_barrier(&mut self, spec: BarrierSpec) -> Result<BarrierId, BarrierError> {
        let axis = spec.segment.axis().ok_or(BarrierError::NotAxisAligned(spec.segment))?;
        let id = BarrierId(self.next_id);
        self.next_id += 1;
        self.barriers.insert(id, Barrier { axis, directions: spec.directions });
        Ok(id)
    }

    pub fn remove_barrier(&mut self, id: BarrierId) -> Result<(), BarrierError> {
        self.barriers.remove(&id).map(|_| ()).ok_or(BarrierError::UnknownBarrier(id))
    }

    /// Drops every barrier and restarts id assignment at zero.
    pub fn clear_barriers(&mut self) {
        self.barriers.clear();
        self.next_id = 0;
        self.reset();
    }

    /// Swaps in a whole new set of barriers, numbered from zero. Nothing
    /// changes unless every segment is usable.
    pub fn replace_barriers(&mut self, specs: &[BarrierSpec]) -> Result<(), BarrierError> {
        if let Some(bad) = specs.iter().find(|spec| spec.segment.axis().is_none()) {
            return Err(BarrierError::NotAxisAligned(bad.segment));
        }
        self.clear_barriers();
        for spec in specs {
            self.add_barrier(*spec)?;
        }
        Ok(())
    }

    pub fn barrier_count(&self) -> usize { self.barriers.len() }

    pub fn threshold(&self) -> f64 { self.threshold }

    pub fn pressure(&self) -> f64 { self.pressure }

    pub fn is_triggered(&self) -> bool { self.triggered }

    pub fn on_hit(
        &mut self,
        id: BarrierId,
        hit: &BarrierHit,
        mode: ActionMode,
    ) -> Result<PressureOutcome, BarrierError> {
        let barrier = *self.barriers.get(&id).ok_or(BarrierError::UnknownBarrier(id))?;

        if self.triggered {
            return Ok(PressureOutcome::Ignored(IgnoreReason::Latched));
        }
        if self.event_filter.as_ref().is_some_and(|filter| filter(hit)) {
            return Ok(PressureOutcome::Ignored(IgnoreReason::Filtered));
        }
        if !self.action_modes.intersects(mode) {
            return Ok(PressureOutcome::Ignored(IgnoreReason::ActionMode));
        }

        let (across, along, crossing) = match barrier.axis {
            Axis::Horizontal => (hit.dy.abs(), hit.dx.abs(), hit.dy),
            Axis::Vertical => (hit.dx.abs(), hit.dy.abs(), hit.dx),
        };
        if crossing != 0.0 && barrier.directions.contains(blocked_direction(barrier.axis, crossing))
        {
            return Ok(PressureOutcome::Ignored(IgnoreReason::PermittedDirection));
        }

        if across >= self.threshold {
            trace!(across, "single push crossed the threshold");
            self.trigger();
            return Ok(PressureOutcome::Triggered);
        }
        // Equal components count as sliding.
        if along >= across {
            return Ok(PressureOutcome::Ignored(IgnoreReason::Sliding));
        }

        self.last_time = hit.time_ms;
        self.trim();
        let sample = self.sample_cap.map_or(across, |cap| across.min(cap));
        self.events.push_back((hit.time_ms, sample));
        self.pressure += sample;
        trace!(sample, pressure = self.pressure, "accumulated pressure");

        if self.pressure >= self.threshold {
            self.trigger();
            return Ok(PressureOutcome::Triggered);
        }
        Ok(PressureOutcome::Accumulated { pressure: self.pressure })
    }

    /// The pointer moved away from the barrier. Re-arms the trigger.
    pub fn on_left(&mut self) {
        self.reset();
        self.triggered = false;
    }

    fn trigger(&mut self) {
        self.triggered = true;
        self.reset();
    }

    fn reset(&mut self) {
        self.events.clear();
        self.pressure = 0.0;
        self.last_time = 0;
    }

    fn trim(&mut self) {
        let cutoff = self.last_time.saturating_sub(self.window_ms);
        while let Some(&(time, sample)) = self.events.front() {
            if time >= cutoff {
                break;
            }
            self.pressure -= sample;
            self.events.pop_front();
        }
        if self.events.is_empty() {
            self.pressure = 0.0;
        }
    }
}

fn blocked_direction(axis: Axis, crossing: f64) -> BarrierDirections {
    match (axis, crossing > 0.0) {
        (Axis::Horizontal, true) => BarrierDirections::POSITIVE_Y,
        (Axis::Horizontal, false) => BarrierDirections::NEGATIVE_Y,
        (Axis::Vertical, true) => BarrierDirections::POSITIVE_X,
        (Axis::Vertical, false) => BarrierDirections::NEGATIVE_X,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    const MODE: ActionMode = ActionMode::NORMAL;

    fn bottom_edge() -> BarrierSpec {
        BarrierSpec {
            segment: Segment::new(0.0, 1080.0, 1920.0, 1080.0),
            directions: BarrierDirections::NEGATIVE_Y,
        }
    }

    fn left_edge() -> BarrierSpec {
        BarrierSpec {
            segment: Segment::new(0.0, 0.0, 0.0, 1080.0),
            directions: BarrierDirections::POSITIVE_X,
        }
    }

    fn barrier(threshold: f64, window_ms: u64) -> (PressureBarrier, BarrierId) {
        let mut b = PressureBarrier::new(threshold, Duration::from_millis(window_ms)).unwrap();
        let id = b.add_barrier(bottom_edge()).unwrap();
        (b, id)
    }

    fn push(dy: f64, time_ms: u64) -> BarrierHit { BarrierHit { dx: 0.0, dy, time_ms, grabbed: false } }

    #[test]
    fn it_triggers_once_the_window_sum_reaches_the_threshold() {
        let (mut b, id) = barrier(100.0, 1000);
        assert_eq!(b.on_hit(id, &push(40.0, 0), MODE), Ok(PressureOutcome::Accumulated { pressure: 40.0 }));
        assert_eq!(b.on_hit(id, &push(40.0, 300), MODE), Ok(PressureOutcome::Accumulated { pressure: 80.0 }));
        assert_eq!(b.on_hit(id, &push(40.0, 600), MODE), Ok(PressureOutcome::Triggered));
        assert_eq!(b.pressure(), 0.0);
    }

    #[test]
    fn it_forgets_pushes_older_than_the_window() {
        let (mut b, id) = barrier(100.0, 1000);
        b.on_hit(id, &push(40.0, 0), MODE).unwrap();
        assert_eq!(b.on_hit(id, &push(40.0, 1500), MODE), Ok(PressureOutcome::Accumulated { pressure: 40.0 }));
    }

    #[test]
    fn it_keeps_pushes_exactly_at_the_window_edge() {
        let (mut b, id) = barrier(100.0, 1000);
        b.on_hit(id, &push(40.0, 0), MODE).unwrap();
        assert_eq!(b.on_hit(id, &push(40.0, 1000), MODE), Ok(PressureOutcome::Accumulated { pressure: 80.0 }));
        assert_eq!(b.on_hit(id, &push(40.0, 1001), MODE), Ok(PressureOutcome::Accumulated { pressure: 80.0 }));
    }

    #[test]
    fn it_does_not_retrigger_until_the_pointer_leaves() {
        let (mut b, id) = barrier(100.0, 1000);
        assert_eq!(b.on_hit(id, &push(150.0, 0), MODE), Ok(PressureOutcome::Triggered));
        for t in 1..200 {
            assert_eq!(
                b.on_hit(id, &push(150.0, t * 10), MODE),
                Ok(PressureOutcome::Ignored(IgnoreReason::Latched))
            );
        }
        b.on_left();
        assert!(!b.is_triggered());
        assert_eq!(b.on_hit(id, &push(150.0, 5000), MODE), Ok(PressureOutcome::Triggered));
    }

    #[test]
    fn sliding_motion_never_accumulates() {
        let (mut b, id) = barrier(100.0, 1000);
        for t in 0..10_000 {
            let hit = BarrierHit { dx: 30.0, dy: 29.0, time_ms: t, grabbed: false };
            assert_eq!(b.on_hit(id, &hit, MODE), Ok(PressureOutcome::Ignored(IgnoreReason::Sliding)));
        }
        assert_eq!(b.pressure(), 0.0);
    }

    #[test]
    fn equal_components_count_as_sliding() {
        let (mut b, id) = barrier(100.0, 1000);
        let hit = BarrierHit { dx: 20.0, dy: 20.0, time_ms: 0, grabbed: false };
        assert_eq!(b.on_hit(id, &hit, MODE), Ok(PressureOutcome::Ignored(IgnoreReason::Sliding)));
    }

    #[test]
    fn a_large_single_push_triggers_even_while_sliding() {
        let (mut b, id) = barrier(100.0, 1000);
        let hit = BarrierHit { dx: 300.0, dy: 120.0, time_ms: 0, grabbed: false };
        assert_eq!(b.on_hit(id, &hit, MODE), Ok(PressureOutcome::Triggered));
    }

    #[test]
    fn sample_cap_bounds_each_contribution() {
        let (b, id) = barrier(100.0, 1000);
        let mut b = b.with_sample_cap(15.0).unwrap();
        assert_eq!(b.on_hit(id, &push(60.0, 0), MODE), Ok(PressureOutcome::Accumulated { pressure: 15.0 }));
        for i in 1..6 {
            assert_eq!(
                b.on_hit(id, &push(60.0, i * 10), MODE),
                Ok(PressureOutcome::Accumulated { pressure: 15.0 * (i + 1) as f64 })
            );
        }
        assert_eq!(b.on_hit(id, &push(60.0, 70), MODE), Ok(PressureOutcome::Triggered));
    }

    #[test]
    fn vertical_barriers_measure_horizontal_motion() {
        let mut b = PressureBarrier::new(100.0, Duration::from_millis(1000)).unwrap();
        let id = b.add_barrier(left_edge()).unwrap();
        let hit = BarrierHit { dx: -50.0, dy: 5.0, time_ms: 0, grabbed: false };
        assert_eq!(b.on_hit(id, &hit, MODE), Ok(PressureOutcome::Accumulated { pressure: 50.0 }));
        let slide = BarrierHit { dx: -5.0, dy: 50.0, time_ms: 10, grabbed: false };
        assert_eq!(b.on_hit(id, &slide, MODE), Ok(PressureOutcome::Ignored(IgnoreReason::Sliding)));
    }

    #[test]
    fn motion_in_a_permitted_direction_is_not_pressure() {
        let (mut b, id) = barrier(100.0, 1000);
        assert_eq!(
            b.on_hit(id, &push(-300.0, 0), MODE),
            Ok(PressureOutcome::Ignored(IgnoreReason::PermittedDirection))
        );
    }

    #[test]
    fn filter_vetoes_hits() {
        let (mut b, id) = barrier(100.0, 1000);
        let seen = Rc::new(Cell::new(0));
        let counter = Rc::clone(&seen);
        b.set_event_filter(move |hit| {
            counter.set(counter.get() + 1);
            hit.grabbed
        });
        let grabbed = BarrierHit { grabbed: true, ..push(150.0, 0) };
        assert_eq!(b.on_hit(id, &grabbed, MODE), Ok(PressureOutcome::Ignored(IgnoreReason::Filtered)));
        assert_eq!(b.on_hit(id, &push(150.0, 10), MODE), Ok(PressureOutcome::Triggered));
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn hits_outside_the_action_modes_are_ignored() {
        let (b, id) = barrier(100.0, 1000);
        let mut b = b.with_action_modes(ActionMode::NORMAL);
        assert_eq!(
            b.on_hit(id, &push(150.0, 0), ActionMode::LOCK_SCREEN),
            Ok(PressureOutcome::Ignored(IgnoreReason::ActionMode))
        );
        assert_eq!(b.on_hit(id, &push(150.0, 0), ActionMode::NORMAL), Ok(PressureOutcome::Triggered));
    }

    #[test]
    fn misconfiguration_is_rejected() {
        assert_eq!(
            PressureBarrier::new(0.0, Duration::from_millis(1000)).unwrap_err(),
            BarrierError::NonPositiveThreshold(0.0)
        );
        assert_eq!(
            PressureBarrier::new(-5.0, Duration::from_millis(1000)).unwrap_err(),
            BarrierError::NonPositiveThreshold(-5.0)
        );
        assert_eq!(
            PressureBarrier::new(100.0, Duration::ZERO).unwrap_err(),
            BarrierError::NonPositiveWindow
        );
        let b = PressureBarrier::new(100.0, Duration::from_millis(1000)).unwrap();
        assert_eq!(b.with_sample_cap(0.0).unwrap_err(), BarrierError::NonPositiveSampleCap(0.0));

        let mut b = PressureBarrier::new(100.0, Duration::from_millis(1000)).unwrap();
        let diagonal = Segment::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(
            b.add_barrier(BarrierSpec { segment: diagonal, directions: BarrierDirections::empty() }),
            Err(BarrierError::NotAxisAligned(diagonal))
        );
        assert_eq!(
            b.on_hit(BarrierId(7), &push(10.0, 0), MODE),
            Err(BarrierError::UnknownBarrier(BarrierId(7)))
        );
    }

    #[test]
    fn corner_barriers_share_one_pressure_sum() {
        let mut b = PressureBarrier::new(100.0, Duration::from_millis(1000)).unwrap();
        let top = b
            .add_barrier(BarrierSpec {
                segment: Segment::new(0.0, 0.0, 50.0, 0.0),
                directions: BarrierDirections::POSITIVE_Y,
            })
            .unwrap();
        let left = b.add_barrier(left_edge()).unwrap();
        b.on_hit(top, &BarrierHit { dx: 1.0, dy: -60.0, time_ms: 0, grabbed: false }, MODE).unwrap();
        let hit = BarrierHit { dx: -60.0, dy: 1.0, time_ms: 10, grabbed: false };
        assert_eq!(b.on_hit(left, &hit, MODE), Ok(PressureOutcome::Triggered));
    }

    #[test]
    fn clearing_barriers_restarts_ids() {
        let (mut b, id) = barrier(100.0, 1000);
        assert_eq!(id, BarrierId(0));
        b.add_barrier(left_edge()).unwrap();
        b.remove_barrier(id).unwrap();
        assert_eq!(b.remove_barrier(id), Err(BarrierError::UnknownBarrier(id)));
        b.clear_barriers();
        assert_eq!(b.barrier_count(), 0);
        assert_eq!(b.add_barrier(bottom_edge()).unwrap(), BarrierId(0));
    }

    #[test]
    fn a_rejected_replacement_keeps_the_old_barriers() {
        let (mut b, id) = barrier(100.0, 1000);
        let diagonal = BarrierSpec {
            segment: Segment::new(0.0, 0.0, 100.0, 100.0),
            directions: BarrierDirections::empty(),
        };
        assert_eq!(
            b.replace_barriers(&[left_edge(), diagonal]),
            Err(BarrierError::NotAxisAligned(diagonal.segment))
        );
        assert_eq!(b.barrier_count(), 1);
        assert_eq!(b.on_hit(id, &push(40.0, 0), MODE), Ok(PressureOutcome::Accumulated { pressure: 40.0 }));

        b.replace_barriers(&[left_edge()]).unwrap();
        assert_eq!(b.barrier_count(), 1);
        assert_eq!(b.pressure(), 0.0);
    }
}
