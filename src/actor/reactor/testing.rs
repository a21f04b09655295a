use std::time::Duration;

use super::{Collaborators, Event, Reactor, Record, SurfaceState};
use crate::actor::broadcast::{BroadcastEvent, BroadcastReceiver};
use crate::actor;
use crate::common::config::Config;
use crate::model::{NotificationKey, NotificationSpec, SourceKey, Urgency};
use crate::sys::geometry::{Point, Rect};
use crate::sys::pointer::SharedPointer;
use crate::sys::surface::{HeadlessSurface, SurfaceKind, TransitionOutcome, TransitionToken};
use crate::sys::timer::{ManualTimers, TimerHandle};

/// The outside world of a test reactor: recording surfaces, timers that only
/// fire when told to, and a pointer the test moves around.
pub struct Shell {
    pub banner: HeadlessSurface,
    pub tray: HeadlessSurface,
    pub popup: HeadlessSurface,
    pub dim: HeadlessSurface,
    pub timers: ManualTimers,
    pub pointer: SharedPointer,
    broadcast_rx: BroadcastReceiver,
}

/// Where the banner sits while shown.
pub const BANNER_FRAME: Rect = Rect { origin: Point { x: 400.0, y: 900.0 }, width: 400.0, height: 100.0 };

impl Reactor {
    pub fn new_for_test(config: Config) -> (Reactor, Shell) {
        Self::new_for_test_with_record(config, Record::default())
    }

    pub fn new_for_test_with_record(config: Config, record: Record) -> (Reactor, Shell) {
        let (broadcast_tx, broadcast_rx) = actor::channel();
        let shell = Shell {
            banner: HeadlessSurface::new(),
            tray: HeadlessSurface::new(),
            popup: HeadlessSurface::new(),
            dim: HeadlessSurface::new(),
            timers: ManualTimers::new(),
            pointer: SharedPointer::new(Point::new(0.0, 0.0)),
            broadcast_rx,
        };
        shell.banner.set_bounds(Some(BANNER_FRAME));
        let collaborators = Collaborators {
            banner: Box::new(shell.banner.clone()),
            tray: Box::new(shell.tray.clone()),
            popup: Box::new(shell.popup.clone()),
            dim: Box::new(shell.dim.clone()),
            timers: Box::new(shell.timers.clone()),
            pointer: Box::new(shell.pointer.clone()),
        };
        let reactor = Reactor::new(config, collaborators, broadcast_tx, record);
        (reactor, shell)
    }

    pub fn handle_events(&mut self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.handle_event(event);
        }
    }
}

impl Shell {
    pub fn surface(&self, kind: SurfaceKind) -> &HeadlessSurface {
        match kind {
            SurfaceKind::NotificationBanner => &self.banner,
            SurfaceKind::TrayShelf => &self.tray,
            SurfaceKind::SourcePopup => &self.popup,
            SurfaceKind::DesktopDim => &self.dim,
        }
    }

    /// The token of the most recent transition requested on `kind`.
    pub fn last_token(&self, kind: SurfaceKind) -> TransitionToken {
        self.surface(kind).last_request().expect("no transition was requested").token
    }

    /// Reports the latest transition on `kind` as completed.
    pub fn finish(&self, reactor: &mut Reactor, kind: SurfaceKind) {
        let token = self.last_token(kind);
        reactor.handle_event(Event::TransitionFinished(token, TransitionOutcome::Completed));
    }

    /// Completes transitions until no surface is mid-transition.
    pub fn settle(&self, reactor: &mut Reactor) {
        for _ in 0..16 {
            let Some(kind) = [
                SurfaceKind::NotificationBanner,
                SurfaceKind::TrayShelf,
                SurfaceKind::SourcePopup,
                SurfaceKind::DesktopDim,
            ]
            .into_iter()
            .find(|&kind| reactor.surface_state(kind).in_flight()) else {
                return;
            };
            self.finish(reactor, kind);
        }
        panic!("surfaces never settled");
    }

    pub fn fire(&self, reactor: &mut Reactor, handle: TimerHandle) {
        assert!(self.timers.fire(handle), "timer {handle:?} is not armed");
        reactor.handle_event(Event::TimerFired(handle));
    }

    /// The one timer armed for `delay`.
    pub fn armed_for(&self, delay: Duration) -> TimerHandle {
        let armed: Vec<_> = self.timers.armed().into_iter().filter(|(_, d)| *d == delay).collect();
        assert_eq!(armed.len(), 1, "expected one timer for {delay:?}: {:?}", self.timers.armed());
        armed[0].0
    }

    pub fn move_pointer(&self, reactor: &mut Reactor, to: Point) {
        self.pointer.set(to);
        reactor.handle_event(Event::PointerMoved(to));
    }

    pub fn broadcasts(&mut self) -> Vec<BroadcastEvent> { self.broadcast_rx.drain() }
}

pub fn notify(source: &str, key: u32, title: &str, urgency: Urgency) -> Event {
    Event::Notify {
        source: SourceKey::new(source),
        key: NotificationKey(key),
        spec: NotificationSpec::new(title).with_urgency(urgency),
    }
}

pub fn notify_with(source: &str, key: u32, spec: NotificationSpec) -> Event {
    Event::Notify { source: SourceKey::new(source), key: NotificationKey(key), spec }
}

pub fn assert_states(reactor: &Reactor, banner: SurfaceState, tray: SurfaceState) {
    assert_eq!(reactor.surface_state(SurfaceKind::NotificationBanner), banner, "banner");
    assert_eq!(reactor.surface_state(SurfaceKind::TrayShelf), tray, "tray");
}
