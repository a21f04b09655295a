use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{debug, trace, warn};

use crate::common::config::AnimationEasing;
use crate::sys::surface::{
    AnimationRequest, SurfaceContent, SurfaceKind, SurfaceProps, TransitionOutcome,
    TransitionToken, VisualSurface,
};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
pub enum SurfaceState {
    #[default]
    Hidden,
    Showing,
    Shown,
    Hiding,
}

impl SurfaceState {
    pub fn in_flight(self) -> bool { matches!(self, SurfaceState::Showing | SurfaceState::Hiding) }

    /// Showing or shown.
    pub fn visible(self) -> bool { matches!(self, SurfaceState::Showing | SurfaceState::Shown) }

    fn settled(self) -> SurfaceState {
        match self {
            SurfaceState::Showing => SurfaceState::Shown,
            SurfaceState::Hiding => SurfaceState::Hidden,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Shown,
    Hidden,
}

/// One surface and the state of its transitions.
///
/// Each requested transition bumps the generation; only a report carrying
/// the current generation can settle the surface.
pub struct SurfaceSlot {
    kind: SurfaceKind,
    state: SurfaceState,
    generation: u32,
    handle: Box<dyn VisualSurface>,
}

impl SurfaceSlot {
    pub fn new(kind: SurfaceKind, handle: Box<dyn VisualSurface>) -> Self {
        SurfaceSlot { kind, state: SurfaceState::Hidden, generation: 0, handle }
    }

    pub fn state(&self) -> SurfaceState { self.state }

    pub fn handle(&self) -> &dyn VisualSurface { self.handle.as_ref() }

    pub fn handle_mut(&mut self) -> &mut dyn VisualSurface { self.handle.as_mut() }

    /// Starts a transition from a settled state. Refuses, returning `None`,
    /// while another transition is in flight or the surface is already at
    /// `target`.
    pub fn begin(
        &mut self,
        target: Target,
        duration: Duration,
        easing: AnimationEasing,
    ) -> Option<TransitionToken> {
        match (self.state, target) {
            (SurfaceState::Hidden, Target::Shown) | (SurfaceState::Shown, Target::Hidden) => {}
            (state, _) => {
                warn!(surface = %self.kind, %state, ?target, "refusing overlapping transition");
                return None;
            }
        }
        Some(self.start(target, duration, easing))
    }

    /// Starts a transition whatever the current state, atomically replacing
    /// one in flight.
    pub fn retarget(
        &mut self,
        target: Target,
        duration: Duration,
        easing: AnimationEasing,
    ) -> TransitionToken {
        self.start(target, duration, easing)
    }

    fn start(&mut self, target: Target, duration: Duration, easing: AnimationEasing) -> TransitionToken {
        self.generation = self.generation.wrapping_add(1);
        let token = TransitionToken { surface: self.kind, generation: self.generation };
        let props = match target {
            Target::Shown => {
                self.handle.set_visible(true);
                self.state = SurfaceState::Showing;
                SurfaceProps::SHOWN
            }
            Target::Hidden => {
                self.state = SurfaceState::Hiding;
                SurfaceProps::HIDDEN
            }
        };
        debug!(surface = %self.kind, state = %self.state, generation = self.generation, "transition");
        self.handle.animate_to(AnimationRequest { token, target: props, duration, easing });
        token
    }

    /// Settles the transition `token` belongs to. Both outcomes land on the
    /// transition's target state. Returns the new state, or `None` for a
    /// report about a superseded transition.
    pub fn finish(&mut self, token: TransitionToken, outcome: TransitionOutcome) -> Option<SurfaceState> {
        if token.surface != self.kind || token.generation != self.generation || !self.state.in_flight()
        {
            trace!(surface = %self.kind, ?token, ?outcome, current = self.generation, "stale transition report");
            return None;
        }
        self.state = self.state.settled();
        if self.state == SurfaceState::Hidden {
            self.handle.set_visible(false);
        }
        debug!(surface = %self.kind, state = %self.state, ?outcome, "transition finished");
        Some(self.state)
    }

    /// Drops to hidden at once, abandoning any transition in flight.
    pub fn cut_to_hidden(&mut self) {
        self.handle.cancel_animations();
        self.generation = self.generation.wrapping_add(1);
        self.state = SurfaceState::Hidden;
        self.handle.set_visible(false);
        debug!(surface = %self.kind, "cut to hidden");
    }

    pub fn set_content(&mut self, content: Option<SurfaceContent>) { self.handle.set_content(content) }
}

/// The four surfaces, always evaluated in this order.
pub struct Surfaces {
    pub banner: SurfaceSlot,
    pub tray: SurfaceSlot,
    pub popup: SurfaceSlot,
    pub dim: SurfaceSlot,
}

impl Surfaces {
    pub fn get_mut(&mut self, kind: SurfaceKind) -> &mut SurfaceSlot {
        match kind {
            SurfaceKind::NotificationBanner => &mut self.banner,
            SurfaceKind::TrayShelf => &mut self.tray,
            SurfaceKind::SourcePopup => &mut self.popup,
            SurfaceKind::DesktopDim => &mut self.dim,
        }
    }
}
