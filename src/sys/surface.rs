//! The seam to the rendering collaborator.
//!
//! The reactor never draws anything. It drives each of its four surfaces
//! through [`VisualSurface`] and learns that a transition ended when the
//! collaborator reports back a [`TransitionToken`] with a
//! [`TransitionOutcome`].

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use tokio::task::JoinHandle;
use tracing::trace;

use super::animation::{blend, ease};
use super::geometry::{Point, Rect};
use crate::common::config::AnimationEasing;
use crate::model::{NotificationKey, SourceKey};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    NotificationBanner,
    TrayShelf,
    SourcePopup,
    DesktopDim,
}

/// Identifies one requested transition. A report carrying an older
/// generation than the surface's current one belongs to a superseded
/// transition.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransitionToken {
    pub surface: SurfaceKind,
    pub generation: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransitionOutcome {
    /// The animation ran to its end.
    Completed,
    /// Something else took over the animated properties before the end.
    Overwritten,
}

/// Animatable properties. `reveal` is 0 when the surface is fully retracted
/// and 1 when it is fully slid into view; the renderer maps it to pixels.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SurfaceProps {
    pub reveal: f64,
    pub opacity: f64,
}

impl SurfaceProps {
    pub const SHOWN: SurfaceProps = SurfaceProps { reveal: 1.0, opacity: 1.0 };
    pub const HIDDEN: SurfaceProps = SurfaceProps { reveal: 0.0, opacity: 0.0 };
}

impl Default for SurfaceProps {
    fn default() -> Self { Self::HIDDEN }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationRequest {
    pub token: TransitionToken,
    pub target: SurfaceProps,
    pub duration: Duration,
    pub easing: AnimationEasing,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum SurfaceContent {
    Notification { key: NotificationKey, expanded: bool },
    SourceStack(SourceKey),
    SourceMenu(SourceKey),
}

pub trait VisualSurface {
    fn set_visible(&mut self, visible: bool);

    /// Starts animating toward `request.target`. The implementation must
    /// eventually report `request.token` back exactly once, either as
    /// completed or as overwritten.
    fn animate_to(&mut self, request: AnimationRequest);

    /// Drops any running animation without reporting it.
    fn cancel_animations(&mut self);

    fn position(&self) -> Point;

    fn opacity(&self) -> f64;

    fn set_content(&mut self, _content: Option<SurfaceContent>) {}

    fn grab_focus(&mut self) {}

    fn release_focus(&mut self) {}

    /// Whether `point` falls inside the surface as currently laid out.
    fn contains(&self, _point: Point) -> bool { false }
}

type FinishedFn = dyn Fn(TransitionToken, TransitionOutcome);

struct SimulatedState {
    props: SurfaceProps,
    visible: bool,
    content: Option<SurfaceContent>,
    focused: bool,
    running: Option<(TransitionToken, JoinHandle<()>)>,
}

/// A headless surface that interpolates its properties frame by frame on the
/// local tokio task set. Used by the binary in place of a compositor.
///
/// Must be driven from inside a `tokio::task::LocalSet`. Clones share state.
#[derive(Clone)]
pub struct SimulatedSurface {
    kind: SurfaceKind,
    frame: Rect,
    fps: f64,
    state: Rc<RefCell<SimulatedState>>,
    on_finished: Rc<FinishedFn>,
}

impl SimulatedSurface {
    pub fn new(
        kind: SurfaceKind,
        frame: Rect,
        fps: f64,
        on_finished: impl Fn(TransitionToken, TransitionOutcome) + 'static,
    ) -> Self {
        Self {
            kind,
            frame,
            fps: if fps > 0.0 { fps } else { 60.0 },
            state: Rc::new(RefCell::new(SimulatedState {
                props: SurfaceProps::HIDDEN,
                visible: false,
                content: None,
                focused: false,
                running: None,
            })),
            on_finished: Rc::new(on_finished),
        }
    }

    pub fn props(&self) -> SurfaceProps { self.state.borrow().props }

    pub fn is_visible(&self) -> bool { self.state.borrow().visible }

    pub fn is_focused(&self) -> bool { self.state.borrow().focused }
}

impl VisualSurface for SimulatedSurface {
    fn set_visible(&mut self, visible: bool) {
        trace!(surface = %self.kind, visible, "set_visible");
        self.state.borrow_mut().visible = visible;
    }

    fn animate_to(&mut self, request: AnimationRequest) {
        // A new animation overwrites whatever was running on this surface.
        if let Some((token, handle)) = self.state.borrow_mut().running.take() {
            handle.abort();
            (self.on_finished)(token, TransitionOutcome::Overwritten);
        }

        let from = self.state.borrow().props;
        let frames = ((request.duration.as_secs_f64() * self.fps).round() as u32).max(1);
        let interval = Duration::from_secs_f64(1.0 / self.fps);
        let state = Rc::clone(&self.state);
        let on_finished = Rc::clone(&self.on_finished);
        let kind = self.kind;

        let handle = tokio::task::spawn_local(async move {
            let start = Instant::now();
            for frame in 1..=frames {
                let deadline = start + frame * interval;
                tokio::time::sleep_until(deadline.into()).await;
                let s = ease(request.easing, f64::from(frame) / f64::from(frames));
                let props = SurfaceProps {
                    reveal: blend(from.reveal, request.target.reveal, s),
                    opacity: blend(from.opacity, request.target.opacity, s),
                };
                trace!(surface = %kind, frame, ?props, "frame");
                state.borrow_mut().props = props;
            }
            state.borrow_mut().running = None;
            on_finished(request.token, TransitionOutcome::Completed);
        });
        self.state.borrow_mut().running = Some((request.token, handle));
    }

    fn cancel_animations(&mut self) {
        if let Some((_, handle)) = self.state.borrow_mut().running.take() {
            handle.abort();
        }
    }

    fn position(&self) -> Point {
        let reveal = self.state.borrow().props.reveal;
        Point::new(self.frame.origin.x, self.frame.origin.y - self.frame.height * reveal)
    }

    fn opacity(&self) -> f64 { self.state.borrow().props.opacity }

    fn set_content(&mut self, content: Option<SurfaceContent>) {
        trace!(surface = %self.kind, ?content, "set_content");
        self.state.borrow_mut().content = content;
    }

    fn grab_focus(&mut self) { self.state.borrow_mut().focused = true; }

    fn release_focus(&mut self) { self.state.borrow_mut().focused = false; }

    fn contains(&self, point: Point) -> bool {
        let state = self.state.borrow();
        if !state.visible {
            return false;
        }
        let origin = self.position();
        Rect { origin, ..self.frame }.contains(point)
    }
}

#[derive(Debug, Default)]
struct HeadlessState {
    props: SurfaceProps,
    visible: bool,
    content: Option<SurfaceContent>,
    focused: bool,
    bounds: Option<Rect>,
    requests: Vec<AnimationRequest>,
    cancels: usize,
}

/// A surface that only remembers what it was asked to do. Transitions never
/// finish on their own: whoever holds a clone reports them to the reactor.
/// Used for replay and tests.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface(Rc<RefCell<HeadlessState>>);

impl HeadlessSurface {
    pub fn new() -> Self { Self::default() }

    pub fn requests(&self) -> Vec<AnimationRequest> { self.0.borrow().requests.clone() }

    pub fn last_request(&self) -> Option<AnimationRequest> { self.0.borrow().requests.last().copied() }

    pub fn cancels(&self) -> usize { self.0.borrow().cancels }

    pub fn is_visible(&self) -> bool { self.0.borrow().visible }

    pub fn is_focused(&self) -> bool { self.0.borrow().focused }

    pub fn content(&self) -> Option<SurfaceContent> { self.0.borrow().content.clone() }

    /// Where the surface is laid out while shown, for hover hit testing.
    pub fn set_bounds(&self, bounds: Option<Rect>) { self.0.borrow_mut().bounds = bounds }
}

impl VisualSurface for HeadlessSurface {
    fn set_visible(&mut self, visible: bool) { self.0.borrow_mut().visible = visible }

    fn animate_to(&mut self, request: AnimationRequest) {
        let mut state = self.0.borrow_mut();
        state.props = request.target;
        state.requests.push(request);
    }

    fn cancel_animations(&mut self) { self.0.borrow_mut().cancels += 1 }

    fn position(&self) -> Point {
        let state = self.0.borrow();
        state.bounds.map_or(Point::default(), |b| b.origin)
    }

    fn opacity(&self) -> f64 { self.0.borrow().props.opacity }

    fn set_content(&mut self, content: Option<SurfaceContent>) { self.0.borrow_mut().content = content }

    fn grab_focus(&mut self) { self.0.borrow_mut().focused = true }

    fn release_focus(&mut self) { self.0.borrow_mut().focused = false }

    fn contains(&self, point: Point) -> bool {
        let state = self.0.borrow();
        state.visible && state.bounds.is_some_and(|b| b.contains(point))
    }
}
