//! The reactor owns every piece of tray state and is the only place it
//! changes.
//!
//! Events come in one at a time. Handlers only record what happened; after
//! each event [`Reactor::update_state`] asks [`reconcile`] what the surfaces
//! should be doing and starts those transitions. Transition reports come back
//! as events too, so a completion never decides anything on its own.

mod error;
mod events;
mod heuristics;
mod managers;
mod reconcile;
mod replay;
mod surfaces;

#[cfg(test)]
mod testing;

pub use error::ReactorError;
pub use events::notification::NotificationEventHandler;
pub use events::pressure::PressureEventHandler;
pub use events::session::SessionEventHandler;
pub use events::tray::TrayEventHandler;
pub use heuristics::HoverHandler;
pub use managers::PopupTarget;
pub use reconcile::{Action, Desired, Inputs, Plan, reconcile};
pub use replay::{Record, replay};
use serde::{Deserialize, Serialize};
pub use surfaces::SurfaceState;
use surfaces::{SurfaceSlot, Surfaces};
use tracing::{debug, instrument, trace, warn};

use self::managers::{
    BannerState, NotificationManager, PopupState, PressureManager, SessionState, TrayState,
};
use crate::actor;
use crate::actor::broadcast::{BroadcastEvent, BroadcastSender};
use crate::actor::pressure_barrier::{ActionMode, BarrierHit, BarrierId, BarrierSpec};
use crate::common::config::{AnimationEasing, Config};
use crate::model::{
    DestroyedReason, Notification, NotificationId, NotificationKey, NotificationSpec,
    NotificationStore, SourceId, SourceKey, SourceSpec,
};
use crate::sys::geometry::Point;
use crate::sys::pointer::PointerState;
use crate::sys::surface::{SurfaceKind, TransitionOutcome, TransitionToken, VisualSurface};
use crate::sys::timer::{TimerHandle, TimerService};

pub type Sender = actor::Sender<Event>;
pub type Receiver = actor::Receiver<Event>;

/// A reconciliation pass can unlock another (a banner cut away without
/// animating lets the next one in), but never more than a few.
const MAX_PASSES: usize = 4;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupKind {
    /// The source's notification stack.
    Stack,
    /// The source's context menu.
    Menu,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceStatus {
    Available,
    Invisible,
    Busy,
    Idle,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum Event {
    AddSource {
        key: SourceKey,
        spec: SourceSpec,
    },
    RemoveSource(SourceKey),
    SetSourceMuted {
        source: SourceKey,
        muted: bool,
    },
    /// Clears every notification of the source that is not resident.
    DestroyNonResident(SourceKey),
    /// Posts or updates a notification. Unknown sources are created on the
    /// fly with the source key as application id.
    Notify {
        source: SourceKey,
        key: NotificationKey,
        spec: NotificationSpec,
    },
    DismissNotification(NotificationKey),
    NotificationClicked(NotificationKey),
    NotificationUnfocused,
    CloseNotification,
    ExpandActiveNotification,
    /// The pointer entered or left the banner.
    BannerHoverChanged(bool),

    OpenTray,
    ToggleTray,
    HideTray,
    EscapeTray,
    SummaryItemClicked {
        source: SourceKey,
        kind: PopupKind,
    },
    PopupDismissed,
    KeyboardVisibleChanged(bool),

    PresenceChanged(PresenceStatus),
    FullscreenChanged(bool),
    SessionUpdated {
        has_notifications: bool,
    },
    OverviewVisibilityChanged(bool),
    ActionModeChanged(ActionMode),

    /// Only recorded; the pointer itself is read through [`PointerState`].
    PointerMoved(Point),
    ConfigUpdated(Box<Config>),
    TimerFired(TimerHandle),
    UserBecameActive,
    TransitionFinished(TransitionToken, TransitionOutcome),

    /// Replaces every barrier segment of a zone, as after a monitor change.
    BarriersChanged {
        zone: String,
        barriers: Vec<BarrierSpec>,
    },
    BarrierHit {
        zone: String,
        barrier: BarrierId,
        hit: BarrierHit,
    },
    BarrierLeft {
        zone: String,
    },
}

/// What the reactor drives and reads from the outside world.
pub struct Collaborators {
    pub banner: Box<dyn VisualSurface>,
    pub tray: Box<dyn VisualSurface>,
    pub popup: Box<dyn VisualSurface>,
    pub dim: Box<dyn VisualSurface>,
    pub timers: Box<dyn TimerService>,
    pub pointer: Box<dyn PointerState>,
}

pub struct Reactor {
    config: Config,
    surfaces: Surfaces,
    timers: Box<dyn TimerService>,
    pointer: Box<dyn PointerState>,
    notification_manager: NotificationManager,
    banner: BannerState,
    tray: TrayState,
    popup: PopupState,
    session: SessionState,
    pressure_manager: PressureManager,
    broadcast_tx: BroadcastSender,
    record: Record,
}

impl Reactor {
    pub fn new(
        config: Config,
        collaborators: Collaborators,
        broadcast_tx: BroadcastSender,
        mut record: Record,
    ) -> Reactor {
        record.start(&config);
        let Collaborators { banner, tray, popup, dim, timers, pointer } = collaborators;
        let mut reactor = Reactor {
            config,
            surfaces: Surfaces {
                banner: SurfaceSlot::new(SurfaceKind::NotificationBanner, banner),
                tray: SurfaceSlot::new(SurfaceKind::TrayShelf, tray),
                popup: SurfaceSlot::new(SurfaceKind::SourcePopup, popup),
                dim: SurfaceSlot::new(SurfaceKind::DesktopDim, dim),
            },
            timers,
            pointer,
            notification_manager: NotificationManager::default(),
            banner: BannerState::default(),
            tray: TrayState::default(),
            popup: PopupState::default(),
            session: SessionState::default(),
            pressure_manager: PressureManager::default(),
            broadcast_tx,
            record,
        };
        PressureEventHandler::sync_zones(&mut reactor);
        reactor
    }

    pub async fn run(mut self, mut events: Receiver) {
        while let Some((span, event)) = events.recv().await {
            let _guard = span.enter();
            self.handle_event(event);
        }
    }

    #[instrument(name = "reactor::handle_event", skip(self))]
    pub fn handle_event(&mut self, event: Event) {
        self.record.on_event(&event);
        if let Err(e) = self.dispatch(event) {
            debug!("dropping event: {e}");
        }
        self.update_state();
    }

    fn dispatch(&mut self, event: Event) -> Result<(), ReactorError> {
        match event {
            Event::AddSource { key, spec } => NotificationEventHandler::handle_add_source(self, key, spec),
            Event::RemoveSource(key) => NotificationEventHandler::handle_remove_source(self, &key)?,
            Event::SetSourceMuted { source, muted } => {
                NotificationEventHandler::handle_set_source_muted(self, &source, muted)?
            }
            Event::DestroyNonResident(key) => {
                NotificationEventHandler::handle_destroy_non_resident(self, &key)?
            }
            Event::Notify { source, key, spec } => {
                NotificationEventHandler::handle_notify(self, source, key, spec)
            }
            Event::DismissNotification(key) => NotificationEventHandler::handle_dismiss(self, key)?,
            Event::NotificationClicked(key) => NotificationEventHandler::handle_clicked(self, key)?,
            Event::NotificationUnfocused => NotificationEventHandler::handle_unfocused(self),
            Event::CloseNotification => NotificationEventHandler::handle_close(self),
            Event::ExpandActiveNotification => NotificationEventHandler::handle_expand_active(self),
            Event::BannerHoverChanged(hovered) => HoverHandler::handle_hover_changed(self, hovered),

            Event::OpenTray => TrayEventHandler::handle_open(self),
            Event::ToggleTray => TrayEventHandler::handle_toggle(self),
            Event::HideTray | Event::EscapeTray => TrayEventHandler::escape(self),
            Event::SummaryItemClicked { source, kind } => {
                TrayEventHandler::handle_summary_item_clicked(self, &source, kind)?
            }
            Event::PopupDismissed => TrayEventHandler::handle_popup_dismissed(self),
            Event::KeyboardVisibleChanged(visible) => {
                TrayEventHandler::handle_keyboard_visible_changed(self, visible)
            }

            Event::PresenceChanged(status) => SessionEventHandler::handle_presence_changed(self, status),
            Event::FullscreenChanged(fullscreen) => {
                SessionEventHandler::handle_fullscreen_changed(self, fullscreen)
            }
            Event::SessionUpdated { has_notifications } => {
                SessionEventHandler::handle_session_updated(self, has_notifications)
            }
            Event::OverviewVisibilityChanged(visible) => {
                SessionEventHandler::handle_overview_visibility_changed(self, visible)
            }
            Event::ActionModeChanged(mode) => SessionEventHandler::handle_action_mode_changed(self, mode),

            Event::PointerMoved(point) => trace!(?point, "pointer moved"),
            Event::ConfigUpdated(config) => SessionEventHandler::handle_config_updated(self, *config),
            Event::TimerFired(handle) => HoverHandler::handle_timer_fired(self, handle),
            Event::UserBecameActive => HoverHandler::handle_user_became_active(self),
            Event::TransitionFinished(token, outcome) => self.finish_transition(token, outcome),

            Event::BarriersChanged { zone, barriers } => {
                PressureEventHandler::handle_barriers_changed(self, &zone, barriers)?
            }
            Event::BarrierHit { zone, barrier, hit } => {
                PressureEventHandler::handle_barrier_hit(self, &zone, barrier, &hit)?
            }
            Event::BarrierLeft { zone } => PressureEventHandler::handle_barrier_left(self, &zone)?,
        }
        Ok(())
    }

    /// Reconciles until nothing is left to start.
    pub fn update_state(&mut self) {
        for _ in 0..MAX_PASSES {
            let plan = reconcile(&self.inputs());
            if plan.is_empty() {
                return;
            }
            trace!(?plan, "reconciling");
            for action in plan.actions {
                self.apply(action);
            }
        }
        warn!("surfaces did not settle after {MAX_PASSES} passes");
    }

    fn apply(&mut self, action: Action) {
        debug!(?action, "applying");
        match action {
            Action::ShowBanner => NotificationEventHandler::show_banner(self),
            Action::HideBanner { animate } => NotificationEventHandler::hide_banner(self, animate),
            Action::ExpandBanner => NotificationEventHandler::expand_banner(self, false),
            Action::FocusBanner => NotificationEventHandler::focus_banner(self),
            Action::ShowTray => TrayEventHandler::show_tray(self),
            Action::HideTray => TrayEventHandler::hide_tray(self),
            Action::ShowPopup => TrayEventHandler::show_popup(self),
            Action::HidePopup => TrayEventHandler::hide_popup(self),
            Action::ShowDim => {
                let (duration, easing) = self.transition();
                self.surfaces.dim.begin(surfaces::Target::Shown, duration, easing);
            }
            Action::HideDim => {
                let (duration, easing) = self.transition();
                self.surfaces.dim.begin(surfaces::Target::Hidden, duration, easing);
            }
        }
    }

    /// Settles the surface and runs the bookkeeping tied to reaching that
    /// state. What happens next is left to the following reconciliation.
    fn finish_transition(&mut self, token: TransitionToken, outcome: TransitionOutcome) {
        let Some(state) = self.surfaces.get_mut(token.surface).finish(token, outcome) else {
            return;
        };
        match (token.surface, state) {
            (SurfaceKind::NotificationBanner, SurfaceState::Shown) => {
                NotificationEventHandler::on_banner_shown(self)
            }
            (SurfaceKind::NotificationBanner, SurfaceState::Hidden) => {
                NotificationEventHandler::on_banner_hidden(self)
            }
            (SurfaceKind::SourcePopup, SurfaceState::Hidden) => TrayEventHandler::on_popup_hidden(self),
            _ => {}
        }
    }

    pub fn inputs(&mut self) -> Inputs {
        let suppression = self.session.suppression;
        let nm = &mut self.notification_manager;
        let queue_showable = nm.queue.has_showable(&nm.store, suppression);
        let head = nm.queue.head(&nm.store).and_then(|id| nm.store.notification(id));
        let store = &nm.store;
        let current = self.banner.current.and_then(|id| store.notification(id));
        let requested = self.popup.requested;

        Inputs {
            banner: self.surfaces.banner.state(),
            tray: self.surfaces.tray.state(),
            popup: self.surfaces.popup.state(),
            dim: self.surfaces.dim.state(),
            queue_showable,
            head_urgent: head.is_some_and(Notification::is_critical),
            head_feedback_hidden: head.is_some_and(|n| n.for_feedback) && suppression.fullscreen,
            session_has_notifications: self.session.has_notifications,
            has_banner_notification: self.banner.current.is_some(),
            banner_critical: current.is_some_and(Notification::is_critical),
            banner_focused: current.is_some_and(|n| n.focused),
            banner_expanded: current.is_some_and(|n| n.expanded),
            banner_timer_armed: self.banner.retract_timer.is_some(),
            banner_removed: self.banner.removed,
            close_requested: self.banner.close_requested,
            user_active: self.banner.user_active,
            pointer_in_tray: self.banner.pointer_in_tray,
            tray_summoned: self.tray.summoned,
            keyboard_visible: self.tray.keyboard_visible,
            popup_requested: requested,
            popup_shown: self.popup.shown,
            requested_stack_empty: requested.is_some_and(|t| {
                t.kind == PopupKind::Stack && store.source(t.source).is_none_or(|s| s.is_empty())
            }),
            requested_source_on_banner: requested
                .zip(current)
                .is_some_and(|(t, n)| t.source == n.source),
        }
    }

    pub fn surface_state(&self, kind: SurfaceKind) -> SurfaceState {
        match kind {
            SurfaceKind::NotificationBanner => self.surfaces.banner.state(),
            SurfaceKind::TrayShelf => self.surfaces.tray.state(),
            SurfaceKind::SourcePopup => self.surfaces.popup.state(),
            SurfaceKind::DesktopDim => self.surfaces.dim.state(),
        }
    }

    pub fn config(&self) -> &Config { &self.config }

    pub fn store(&self) -> &NotificationStore { &self.notification_manager.store }

    pub fn queued(&self) -> Vec<NotificationKey> {
        let nm = &self.notification_manager;
        nm.queue.iter().filter_map(|id| nm.store.notification(id)).map(|n| n.key).collect()
    }

    /// The notification on the banner, while it still exists.
    pub fn banner_notification(&self) -> Option<&Notification> {
        self.banner.current.and_then(|id| self.notification_manager.store.notification(id))
    }

    fn transition(&self) -> (std::time::Duration, AnimationEasing) {
        (self.config.settings.transition_duration(), self.config.settings.animation_easing)
    }

    fn broadcast(&self, event: BroadcastEvent) {
        trace!(?event, "broadcast");
        self.broadcast_tx.send(event);
    }

    /// Replaces the retract timer. `None` leaves the banner expired.
    fn update_retract_timer(&mut self, delay: Option<std::time::Duration>) {
        if let Some(handle) = self.banner.retract_timer.take() {
            self.timers.cancel(handle);
        }
        if let Some(delay) = delay.filter(|d| !d.is_zero()) {
            self.banner.retract_timer = Some(self.timers.after(delay));
        }
    }

    fn source_id(&self, key: &SourceKey) -> Result<SourceId, ReactorError> {
        self.notification_manager
            .store
            .source_id(key)
            .ok_or_else(|| ReactorError::UnknownSource(key.clone()))
    }

    fn notification_id(&self, key: NotificationKey) -> Result<NotificationId, ReactorError> {
        self.notification_manager
            .store
            .notification_id(key)
            .ok_or(ReactorError::UnknownNotification(key))
    }

    /// Destroys one notification, and its source too if that leaves a
    /// non-persistent source empty.
    fn destroy_notification(&mut self, id: NotificationId, reason: DestroyedReason) {
        if self.banner.current == Some(id) && self.surfaces.banner.state().visible() {
            self.update_retract_timer(None);
            self.banner.removed = true;
        }
        let nm = &mut self.notification_manager;
        nm.queue.remove(id);
        if self.popup.renotify == Some(id) {
            self.popup.renotify = None;
        }
        let Some(notification) = nm.store.remove_notification(id) else { return };
        debug!(key = ?notification.key, %reason, "notification destroyed");
        self.broadcast(BroadcastEvent::NotificationRemoved { key: notification.key, reason });

        let source = notification.source;
        if self
            .notification_manager
            .store
            .source(source)
            .is_some_and(|s| s.is_empty() && !s.persistent)
        {
            self.destroy_source(source, reason);
        }
    }

    /// Destroys a source along with every notification it owns, reporting
    /// them gone for `reason`.
    fn destroy_source(&mut self, id: SourceId, reason: DestroyedReason) {
        let nm = &mut self.notification_manager;
        if nm.store.source(id).is_none() {
            return;
        }
        nm.queue.remove_source(&nm.store, id);
        let store = &nm.store;
        if self
            .banner
            .current
            .and_then(|n| store.notification(n))
            .is_some_and(|n| n.source == id)
        {
            self.update_retract_timer(None);
            self.banner.removed = true;
        }
        if self.popup.requested.is_some_and(|t| t.source == id) {
            self.popup.requested = None;
        }
        if self
            .popup
            .renotify
            .and_then(|n| self.notification_manager.store.notification(n))
            .is_some_and(|n| n.source == id)
        {
            self.popup.renotify = None;
        }

        let Some((source, removed)) = self.notification_manager.store.remove_source(id) else {
            return;
        };
        for notification in removed {
            self.broadcast(BroadcastEvent::NotificationRemoved { key: notification.key, reason });
        }
        debug!(source = %source.key, "source destroyed");
        self.broadcast(BroadcastEvent::SourceRemoved { source: source.key });
    }
}
