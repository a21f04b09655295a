//! Pointer and idle heuristics deciding how long the banner stays up.

use tracing::{debug, trace};

use super::{Reactor, SurfaceState};
use crate::common::config::AnchorEdge;
use crate::sys::geometry::Point;
use crate::sys::timer::TimerHandle;

pub struct HoverHandler;

impl HoverHandler {
    pub fn handle_hover_changed(reactor: &mut Reactor, hovered: bool) {
        if hovered {
            Self::pointer_entered(reactor);
        } else {
            Self::pointer_left(reactor);
        }
    }

    /// A banner that popped up under the pointer is not pinned by it. The
    /// user has to move away and come back, and meanwhile leaving uses the
    /// longer hide timeout.
    fn pointer_entered(reactor: &mut Reactor) {
        if reactor.surfaces.tray.state() == SurfaceState::Hidden
            && reactor.surfaces.banner.state() == SurfaceState::Hidden
        {
            return;
        }
        reactor.banner.use_longer_hide = false;
        if let Some(handle) = reactor.banner.hover_left_timer.take() {
            trace!("pointer came back before the hide timeout");
            reactor.timers.cancel(handle);
            reactor.banner.left_position = None;
            return;
        }
        if let Some(shown_at) = reactor.banner.show_position.take()
            && reactor.surfaces.banner.handle().contains(shown_at)
        {
            debug!("banner appeared under the pointer, not pinning");
            reactor.banner.use_longer_hide = true;
            return;
        }
        reactor.banner.pointer_in_tray = true;
    }

    fn pointer_left(reactor: &mut Reactor) {
        let pointer = reactor.pointer.current_position();
        reactor.banner.left_position = Some(pointer);

        let ignore_hover = reactor.banner_notification().is_some_and(|n| n.ignore_hover);
        if ignore_hover {
            if let Some(id) = reactor.banner.current
                && let Some(n) = reactor.notification_manager.store.notification_mut(id)
            {
                n.focused = false;
            }
            reactor.surfaces.banner.handle_mut().release_focus();
            reactor.banner.pointer_in_tray = false;
            return;
        }

        let heuristics = &reactor.config.heuristics;
        let delay = if reactor.banner.use_longer_hide {
            heuristics.longer_hide_timeout
        } else {
            heuristics.hide_timeout
        };
        if let Some(handle) = reactor.banner.hover_left_timer.take() {
            reactor.timers.cancel(handle);
        }
        reactor.banner.hover_left_timer = Some(reactor.timers.after(delay));
    }

    pub fn handle_timer_fired(reactor: &mut Reactor, handle: TimerHandle) {
        if reactor.banner.retract_timer == Some(handle) {
            reactor.banner.retract_timer = None;
            Self::on_retract_timeout(reactor);
        } else if reactor.banner.hover_left_timer == Some(handle) {
            reactor.banner.hover_left_timer = None;
            Self::on_hover_left_timeout(reactor);
        } else {
            trace!(?handle, "stale timer");
        }
    }

    /// The banner would expire now. It gets a grace period instead if the
    /// pointer is heading for it, or if it popped up under the pointer and
    /// the pointer is moving about inside it.
    fn on_retract_timeout(reactor: &mut Reactor) {
        let pointer = reactor.pointer.current_position();
        let last = reactor.banner.last_seen.unwrap_or(pointer);
        let heuristics = &reactor.config.heuristics;
        let grace = heuristics.approach_grace;
        let approaching = match heuristics.anchor_edge {
            AnchorEdge::Bottom => pointer.y > last.y + heuristics.approach_dead_zone_px,
            AnchorEdge::Top => pointer.y < last.y - heuristics.approach_dead_zone_px,
        };
        let hovering = reactor.surfaces.banner.handle().contains(pointer);

        if approaching && !hovering {
            debug!(?pointer, ?last, "pointer approaching the banner, extending");
            reactor.update_retract_timer(Some(grace));
        } else if reactor.banner.use_longer_hide
            && reactor.banner.hover_left_timer.is_none()
            && pointer != last
        {
            debug!("pointer moving inside the banner, extending");
            reactor.update_retract_timer(Some(grace));
        } else {
            debug!("banner expired");
        }
        reactor.banner.last_seen = Some(pointer);
    }

    /// Gives the pointer one more, longer chance if it is still close to
    /// where it left. Past the edge side of the exit point counts as close.
    fn on_hover_left_timeout(reactor: &mut Reactor) {
        let pointer = reactor.pointer.current_position();
        let heuristics = &reactor.config.heuristics;
        if let Some(left) = reactor.banner.left_position.take()
            && is_near_exit(pointer, left, heuristics.pointer_left_threshold_px, heuristics.anchor_edge)
        {
            trace!("pointer still near the banner, waiting longer");
            let delay = heuristics.longer_hide_timeout;
            reactor.banner.hover_left_timer = Some(reactor.timers.after(delay));
            return;
        }
        debug!("pointer left the banner");
        reactor.banner.use_longer_hide = false;
        reactor.banner.pointer_in_tray = false;
        reactor.update_retract_timer(None);
    }

    /// Critical notifications never get a retract timer.
    pub fn handle_user_became_active(reactor: &mut Reactor) {
        let Some(notification) = reactor.banner_notification() else { return };
        let critical = notification.is_critical();
        debug!("user became active");
        reactor.banner.user_active = true;
        if !critical {
            let delay = reactor.config.heuristics.became_active_timeout;
            reactor.update_retract_timer(Some(delay));
        }
    }

    pub(super) fn reset_hover_left(reactor: &mut Reactor) {
        reactor.banner.use_longer_hide = false;
        reactor.banner.left_position = None;
        if let Some(handle) = reactor.banner.hover_left_timer.take() {
            reactor.timers.cancel(handle);
        }
    }
}

fn is_near_exit(pointer: Point, left: Point, threshold: f64, edge: AnchorEdge) -> bool {
    let sideways = (pointer.x - left.x).abs() < threshold;
    let toward_edge = match edge {
        AnchorEdge::Bottom => pointer.y > left.y - threshold,
        AnchorEdge::Top => pointer.y < left.y + threshold,
    };
    sideways && toward_edge
}
