use serde::{Deserialize, Serialize};

use crate::actor;
use crate::model::{DestroyedReason, NotificationKey, SourceKey, Urgency};

/// Events published for outside consumers such as a panel menu or an
/// accessibility layer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BroadcastEvent {
    TrayShowing,
    TrayHiding,
    NotificationAdded {
        source: SourceKey,
        key: NotificationKey,
        urgency: Urgency,
    },
    NotificationRemoved {
        key: NotificationKey,
        reason: DestroyedReason,
    },
    SourceAdded {
        source: SourceKey,
    },
    SourceRemoved {
        source: SourceKey,
    },
    PressureTriggered {
        zone: String,
    },
    PlaySound {
        key: NotificationKey,
    },
    OverviewToggleRequested,
}

pub type BroadcastSender = actor::Sender<BroadcastEvent>;
pub type BroadcastReceiver = actor::Receiver<BroadcastEvent>;
