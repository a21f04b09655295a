use tracing::debug;

use crate::actor::broadcast::BroadcastEvent;
use crate::actor::reactor::managers::PopupTarget;
use crate::actor::reactor::surfaces::Target;
use crate::actor::reactor::{NotificationEventHandler, PopupKind, Reactor, ReactorError};
use crate::model::{DestroyedReason, SourceKey};
use crate::sys::surface::SurfaceContent;

pub struct TrayEventHandler;

impl TrayEventHandler {
    pub fn handle_open(reactor: &mut Reactor) {
        debug!("tray summoned");
        reactor.tray.summoned = true;
    }

    pub fn handle_toggle(reactor: &mut Reactor) {
        if reactor.tray.summoned {
            Self::escape(reactor);
        } else {
            Self::handle_open(reactor);
        }
    }

    /// Drops everything holding the tray and banner open.
    pub fn escape(reactor: &mut Reactor) {
        debug!("escaping tray");
        reactor.banner.pointer_in_tray = false;
        reactor.tray.summoned = false;
        reactor.popup.requested = None;
        reactor.update_retract_timer(None);
    }

    /// Clicking the item that is already requested, with the same button,
    /// withdraws the request.
    pub fn handle_summary_item_clicked(
        reactor: &mut Reactor,
        key: &SourceKey,
        kind: PopupKind,
    ) -> Result<(), ReactorError> {
        let target = PopupTarget { source: reactor.source_id(key)?, kind };
        reactor.popup.requested =
            if reactor.popup.requested == Some(target) { None } else { Some(target) };
        debug!(source = %key, ?kind, requested = reactor.popup.requested.is_some(), "summary item clicked");
        Ok(())
    }

    pub fn handle_popup_dismissed(reactor: &mut Reactor) { reactor.popup.requested = None; }

    pub fn handle_keyboard_visible_changed(reactor: &mut Reactor, visible: bool) {
        reactor.tray.keyboard_visible = visible;
    }

    pub fn show_tray(reactor: &mut Reactor) {
        let (duration, easing) = reactor.transition();
        if reactor.surfaces.tray.begin(Target::Shown, duration, easing).is_some() {
            reactor.surfaces.tray.handle_mut().grab_focus();
            reactor.broadcast(BroadcastEvent::TrayShowing);
        }
    }

    pub fn hide_tray(reactor: &mut Reactor) {
        let (duration, easing) = reactor.transition();
        if reactor.surfaces.tray.begin(Target::Hidden, duration, easing).is_some() {
            reactor.surfaces.tray.handle_mut().release_focus();
            reactor.broadcast(BroadcastEvent::TrayHiding);
        }
    }

    /// Showing a source's stack takes its queued notifications out of the
    /// queue; they are seen in the stack instead.
    pub fn show_popup(reactor: &mut Reactor) {
        let Some(target) = reactor.popup.requested else { return };
        let nm = &mut reactor.notification_manager;
        let Some(source) = nm.store.source(target.source) else { return };
        let key = source.key.clone();

        let content = match target.kind {
            PopupKind::Stack => {
                let queued: Vec<_> = nm
                    .queue
                    .iter()
                    .filter(|&id| nm.store.notification(id).is_some_and(|n| n.source == target.source))
                    .collect();
                for id in queued {
                    nm.queue.remove(id);
                    if let Some(n) = nm.store.notification_mut(id) {
                        n.acknowledged = true;
                    }
                }
                SurfaceContent::SourceStack(key)
            }
            PopupKind::Menu => SurfaceContent::SourceMenu(key),
        };

        reactor.popup.shown = Some(target);
        reactor.surfaces.popup.set_content(Some(content));
        let (duration, easing) = reactor.transition();
        reactor.surfaces.popup.begin(Target::Shown, duration, easing);
    }

    pub fn hide_popup(reactor: &mut Reactor) {
        let (duration, easing) = reactor.transition();
        reactor.surfaces.popup.begin(Target::Hidden, duration, easing);
    }

    pub fn on_popup_hidden(reactor: &mut Reactor) {
        let shown = reactor.popup.shown.take();
        reactor.surfaces.popup.set_content(None);
        let Some(target) = shown else { return };
        if target.kind != PopupKind::Stack {
            return;
        }
        if let Some(id) = reactor.popup.renotify.take() {
            NotificationEventHandler::route(reactor, id);
            return;
        }
        if reactor.notification_manager.store.source(target.source).is_some_and(|s| s.transient) {
            reactor.destroy_source(target.source, DestroyedReason::Expired);
        }
    }
}
