use tracing::debug;

use super::PopupKind;
use crate::actor::pressure_barrier::{ActionMode, BarrierSpec, PressureBarrier};
use crate::common::collections::BTreeMap;
use crate::common::config::{PressureZoneSettings, ZoneAction};
use crate::model::{
    NotificationId, NotificationQueue, NotificationStore, SourceId, Suppression,
};
use crate::sys::geometry::Point;
use crate::sys::timer::TimerHandle;

/// Sources, notifications and the banner queue.
#[derive(Default)]
pub struct NotificationManager {
    pub store: NotificationStore,
    pub queue: NotificationQueue,
}

/// Everything known about the notification on the banner. Reset whenever the
/// banner finishes hiding.
#[derive(Debug, Default)]
pub struct BannerState {
    pub current: Option<NotificationId>,
    /// The notification was destroyed or its source went away while shown.
    pub removed: bool,
    pub close_requested: bool,
    /// The user produced input since the banner appeared.
    pub user_active: bool,
    /// Pointer is over the tray or banner and pins the notification.
    pub pointer_in_tray: bool,
    /// The banner appeared under the pointer; leaving uses the longer hide
    /// timeout instead of pinning.
    pub use_longer_hide: bool,
    /// Pointer position when the banner was shown.
    pub show_position: Option<Point>,
    /// Pointer position at the last retract timer check.
    pub last_seen: Option<Point>,
    /// Where the pointer left the banner.
    pub left_position: Option<Point>,
    pub retract_timer: Option<TimerHandle>,
    pub hover_left_timer: Option<TimerHandle>,
}

impl BannerState {
    pub fn reset(&mut self) {
        debug!(current = ?self.current, "banner state reset");
        *self = BannerState::default();
    }
}

#[derive(Debug, Default)]
pub struct TrayState {
    pub summoned: bool,
    pub keyboard_visible: bool,
}

/// A popup for one source in one of its two flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupTarget {
    pub source: SourceId,
    pub kind: PopupKind,
}

#[derive(Debug, Default)]
pub struct PopupState {
    /// The summary item the user last clicked.
    pub requested: Option<PopupTarget>,
    /// What the popup surface is showing, or was showing while it hides.
    pub shown: Option<PopupTarget>,
    /// Arrived for the shown stack while it was hiding; routed again once
    /// the hide completes.
    pub renotify: Option<NotificationId>,
}

#[derive(Debug)]
pub struct SessionState {
    pub suppression: Suppression,
    /// False on the lock screen and greeter.
    pub has_notifications: bool,
    pub action_mode: ActionMode,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState {
            suppression: Suppression::default(),
            has_notifications: true,
            action_mode: ActionMode::NORMAL,
        }
    }
}

/// One named gesture zone: its detector plus the segments registered on it,
/// kept so a rebuilt detector can get them back.
pub struct PressureZone {
    pub barrier: PressureBarrier,
    pub settings: PressureZoneSettings,
    pub specs: Vec<BarrierSpec>,
}

impl PressureZone {
    pub fn action(&self) -> ZoneAction { self.settings.action }
}

#[derive(Default)]
pub struct PressureManager {
    pub zones: BTreeMap<String, PressureZone>,
}
