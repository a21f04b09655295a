use tracing::{debug, info};

use crate::actor::pressure_barrier::ActionMode;
use crate::actor::reactor::{PresenceStatus, PressureEventHandler, Reactor, TrayEventHandler};
use crate::common::config::Config;
use crate::model::{DestroyedReason, NotificationPolicy};

pub struct SessionEventHandler;

impl SessionEventHandler {
    /// Going idle keeps whatever busy state came before, so notifications
    /// queued while busy stay queued once the screensaver kicks in.
    pub fn handle_presence_changed(reactor: &mut Reactor, status: PresenceStatus) {
        debug!(?status, "presence changed");
        match status {
            PresenceStatus::Busy => {
                reactor.update_retract_timer(None);
                reactor.session.suppression.busy = true;
            }
            PresenceStatus::Idle => {}
            PresenceStatus::Available | PresenceStatus::Invisible => {
                reactor.session.suppression.busy = false;
            }
        }
    }

    pub fn handle_fullscreen_changed(reactor: &mut Reactor, fullscreen: bool) {
        reactor.session.suppression.fullscreen = fullscreen;
    }

    pub fn handle_session_updated(reactor: &mut Reactor, has_notifications: bool) {
        debug!(has_notifications, "session mode updated");
        reactor.session.has_notifications = has_notifications;
    }

    /// Showing or hiding the overview both escape the tray.
    pub fn handle_overview_visibility_changed(reactor: &mut Reactor, visible: bool) {
        debug!(visible, "overview visibility changed");
        TrayEventHandler::escape(reactor);
    }

    pub fn handle_action_mode_changed(reactor: &mut Reactor, mode: ActionMode) {
        reactor.session.action_mode = mode;
    }

    /// Re-resolves every source's policy, drops sources that were disabled
    /// and rebuilds pressure zones whose settings changed.
    pub fn handle_config_updated(reactor: &mut Reactor, config: Config) {
        info!("applying new config");
        reactor.config = config;

        let settings = &reactor.config.notifications;
        let mut disabled = Vec::new();
        for (id, source) in reactor.notification_manager.store.sources_mut() {
            source.policy = NotificationPolicy::resolve(settings, source.app_id.as_deref());
            if !source.policy.enabled {
                disabled.push(id);
            }
        }
        for id in disabled {
            reactor.destroy_source(id, DestroyedReason::SourceClosed);
        }

        PressureEventHandler::sync_zones(reactor);
    }
}
