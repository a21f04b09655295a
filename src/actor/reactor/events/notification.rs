use tracing::{debug, trace};

use crate::actor::broadcast::BroadcastEvent;
use crate::actor::reactor::managers::PopupTarget;
use crate::actor::reactor::surfaces::Target;
use crate::actor::reactor::{
    HoverHandler, PopupKind, Reactor, ReactorError, SurfaceState, TrayEventHandler,
};
use crate::model::{
    DestroyedReason, NotificationId, NotificationKey, NotificationPolicy, NotificationSpec,
    Pushed, SourceId, SourceKey, SourceSpec,
};
use crate::sys::surface::SurfaceContent;

pub struct NotificationEventHandler;

impl NotificationEventHandler {
    pub fn handle_add_source(reactor: &mut Reactor, key: SourceKey, spec: SourceSpec) {
        Self::add_source(reactor, key, spec);
    }

    /// Sources whose application has notifications disabled are not added.
    fn add_source(reactor: &mut Reactor, key: SourceKey, spec: SourceSpec) -> Option<SourceId> {
        let policy =
            NotificationPolicy::resolve(&reactor.config.notifications, spec.app_id.as_deref());
        if !policy.enabled {
            debug!(source = %key, "notifications disabled for source");
            return None;
        }
        let (id, created) = reactor.notification_manager.store.add_source(key.clone(), spec, policy);
        if created {
            debug!(source = %key, "source added");
            reactor.broadcast(BroadcastEvent::SourceAdded { source: key });
        }
        Some(id)
    }

    pub fn handle_remove_source(reactor: &mut Reactor, key: &SourceKey) -> Result<(), ReactorError> {
        let id = reactor.source_id(key)?;
        reactor.destroy_source(id, DestroyedReason::SourceClosed);
        Ok(())
    }

    pub fn handle_set_source_muted(
        reactor: &mut Reactor,
        key: &SourceKey,
        muted: bool,
    ) -> Result<(), ReactorError> {
        let id = reactor.source_id(key)?;
        let nm = &mut reactor.notification_manager;
        if let Some(source) = nm.store.source_mut(id) {
            source.muted = muted;
        }
        if muted {
            let dropped = nm.queue.remove_source(&nm.store, id);
            debug!(source = %key, dropped, "source muted");
        }
        Ok(())
    }

    pub fn handle_destroy_non_resident(
        reactor: &mut Reactor,
        key: &SourceKey,
    ) -> Result<(), ReactorError> {
        let id = reactor.source_id(key)?;
        for notification in reactor.notification_manager.store.non_resident(id) {
            reactor.destroy_notification(notification, DestroyedReason::Dismissed);
        }
        Ok(())
    }

    pub fn handle_notify(
        reactor: &mut Reactor,
        source_key: SourceKey,
        key: NotificationKey,
        spec: NotificationSpec,
    ) {
        let source = match reactor.notification_manager.store.source_id(&source_key) {
            Some(id) => id,
            None => {
                let spec = SourceSpec { app_id: Some(source_key.0.clone()), ..Default::default() };
                let Some(id) = Self::add_source(reactor, source_key.clone(), spec) else { return };
                id
            }
        };
        let store = &mut reactor.notification_manager.store;
        if store.source(source).is_some_and(|s| !s.policy.enabled) {
            debug!(source = %source_key, ?key, "dropping notification from disabled source");
            return;
        }
        let Some(pushed) = store.push(source, key, spec) else { return };
        if let Pushed::Added(id) = pushed
            && let Some(notification) = store.notification(id)
        {
            let urgency = notification.urgency;
            debug!(source = %source_key, ?key, %urgency, "notification added");
            reactor.broadcast(BroadcastEvent::NotificationAdded { source: source_key, key, urgency });
        }
        Self::route(reactor, pushed.id());
    }

    /// Decides where a new or updated notification goes: straight into an
    /// open stack popup, onto the banner it is already showing on, or into
    /// the queue.
    pub(in crate::actor::reactor) fn route(reactor: &mut Reactor, id: NotificationId) {
        let store = &reactor.notification_manager.store;
        let Some(notification) = store.notification(id) else { return };
        let Some(source) = store.source(notification.source) else { return };
        if source.muted {
            trace!(key = ?notification.key, "source muted, not queueing");
            return;
        }
        let stack = PopupTarget { source: notification.source, kind: PopupKind::Stack };
        let show_banner = source.policy.show_banners;

        if reactor.popup.shown == Some(stack) {
            match reactor.surfaces.popup.state() {
                SurfaceState::Hiding => {
                    reactor.popup.renotify = Some(id);
                    return;
                }
                SurfaceState::Showing | SurfaceState::Shown => {
                    if let Some(n) = reactor.notification_manager.store.notification_mut(id) {
                        n.acknowledged = true;
                    }
                    Self::play_sound(reactor, id);
                    return;
                }
                SurfaceState::Hidden => {}
            }
        }

        if !show_banner {
            Self::play_sound(reactor, id);
            return;
        }

        if reactor.banner.current == Some(id) && reactor.surfaces.banner.state() != SurfaceState::Hidden
        {
            debug!("updating the notification on the banner");
            reactor.banner.close_requested = false;
            Self::present_banner(reactor, id);
            let (duration, easing) = reactor.transition();
            reactor.surfaces.banner.retarget(Target::Shown, duration, easing);
            return;
        }

        let nm = &mut reactor.notification_manager;
        nm.queue.enqueue(&nm.store, id);
    }

    pub fn handle_dismiss(reactor: &mut Reactor, key: NotificationKey) -> Result<(), ReactorError> {
        let id = reactor.notification_id(key)?;
        reactor.destroy_notification(id, DestroyedReason::Dismissed);
        Ok(())
    }

    pub fn handle_clicked(reactor: &mut Reactor, key: NotificationKey) -> Result<(), ReactorError> {
        let id = reactor.notification_id(key)?;
        TrayEventHandler::escape(reactor);
        let resident =
            reactor.notification_manager.store.notification(id).is_some_and(|n| n.resident);
        if !resident {
            reactor.destroy_notification(id, DestroyedReason::Dismissed);
        }
        Ok(())
    }

    pub fn handle_unfocused(reactor: &mut Reactor) {
        if let Some(id) = reactor.banner.current
            && let Some(n) = reactor.notification_manager.store.notification_mut(id)
        {
            n.focused = false;
        }
        reactor.surfaces.banner.handle_mut().release_focus();
    }

    /// A close request only lives for the reconciliation it triggers.
    pub fn handle_close(reactor: &mut Reactor) {
        if reactor.surfaces.banner.state() != SurfaceState::Shown {
            return;
        }
        reactor.banner.close_requested = true;
        reactor.update_state();
        reactor.banner.close_requested = false;
    }

    pub fn handle_expand_active(reactor: &mut Reactor) {
        if reactor.banner.current.is_some() {
            Self::expand_banner(reactor, false);
        }
    }

    /// Plays the notification's sound once, if its source allows sounds.
    fn play_sound(reactor: &mut Reactor, id: NotificationId) {
        let store = &mut reactor.notification_manager.store;
        let allowed = store.source_of(id).is_some_and(|s| s.policy.sound_enabled);
        let Some(n) = store.notification_mut(id) else { return };
        if n.sound_played {
            return;
        }
        n.sound_played = true;
        if allowed {
            let key = n.key;
            reactor.broadcast(BroadcastEvent::PlaySound { key });
        }
    }

    /// Marks the banner's notification seen and puts it on the surface.
    fn present_banner(reactor: &mut Reactor, id: NotificationId) {
        let store = &mut reactor.notification_manager.store;
        let force_expanded = store.source_of(id).is_some_and(|s| s.policy.force_expanded);
        let Some(n) = store.notification_mut(id) else { return };
        n.acknowledged = true;
        let (key, expanded, critical) = (n.key, n.expanded, n.is_critical());
        Self::play_sound(reactor, id);
        if critical || force_expanded {
            Self::expand_banner(reactor, true);
        } else {
            reactor.surfaces.banner.set_content(Some(SurfaceContent::Notification { key, expanded }));
        }
    }

    pub fn show_banner(reactor: &mut Reactor) {
        let suppression = reactor.session.suppression;
        let nm = &mut reactor.notification_manager;
        let Some(id) = nm.queue.dequeue_next(&nm.store, suppression) else { return };

        let pointer = reactor.pointer.current_position();
        reactor.banner.current = Some(id);
        reactor.banner.show_position = Some(pointer);
        reactor.banner.last_seen = Some(pointer);
        reactor.banner.user_active =
            reactor.timers.idle_time() <= reactor.config.heuristics.idle_threshold;
        if !reactor.banner.user_active {
            reactor.timers.watch_user_active();
        }
        HoverHandler::reset_hover_left(reactor);

        Self::present_banner(reactor, id);
        let (duration, easing) = reactor.transition();
        reactor.surfaces.banner.begin(Target::Shown, duration, easing);
    }

    pub fn on_banner_shown(reactor: &mut Reactor) {
        let Some(id) = reactor.banner.current else { return };
        let store = &reactor.notification_manager.store;
        let Some(n) = store.notification(id) else { return };
        if n.is_critical() {
            return;
        }
        let timeout = store
            .source_of(id)
            .map_or(reactor.config.notifications.timeout, |s| s.policy.timeout);
        reactor.update_retract_timer(Some(timeout));
    }

    pub fn hide_banner(reactor: &mut Reactor, animate: bool) {
        if let Some(id) = reactor.banner.current
            && let Some(n) = reactor.notification_manager.store.notification_mut(id)
        {
            n.focused = false;
        }
        reactor.surfaces.banner.handle_mut().release_focus();
        HoverHandler::reset_hover_left(reactor);

        if animate {
            let (duration, easing) = reactor.transition();
            reactor.surfaces.banner.begin(Target::Hidden, duration, easing);
        } else {
            reactor.surfaces.banner.cut_to_hidden();
            Self::on_banner_hidden(reactor);
        }
    }

    pub fn on_banner_hidden(reactor: &mut Reactor) {
        let current = reactor.banner.current.take();
        reactor.update_retract_timer(None);
        reactor.timers.unwatch_user_active();
        reactor.banner.reset();
        reactor.surfaces.banner.set_content(None);

        let Some(id) = current else { return };
        let Some(n) = reactor.notification_manager.store.notification_mut(id) else { return };
        n.expanded = false;
        n.focused = false;
        if n.transient && !n.resident {
            reactor.destroy_notification(id, DestroyedReason::Expired);
        }
    }

    /// Auto-expansion leaves input focus where it was.
    pub fn expand_banner(reactor: &mut Reactor, auto: bool) {
        let Some(id) = reactor.banner.current else { return };
        let Some(n) = reactor.notification_manager.store.notification_mut(id) else { return };
        n.expanded = true;
        let key = n.key;
        reactor
            .surfaces
            .banner
            .set_content(Some(SurfaceContent::Notification { key, expanded: true }));
        if !auto {
            Self::focus_banner(reactor);
        }
    }

    pub fn focus_banner(reactor: &mut Reactor) {
        let Some(id) = reactor.banner.current else { return };
        if let Some(n) = reactor.notification_manager.store.notification_mut(id) {
            n.focused = true;
            reactor.surfaces.banner.handle_mut().grab_focus();
        }
    }
}
