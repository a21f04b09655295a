use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::warn;

use super::store::SourceId;

/// Identifier the notification daemon hands out. Re-notifying with the same
/// key updates the notification in place.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NotificationKey(pub u32);

#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    IntoPrimitive,
    TryFromPrimitive
)]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Urgency {
    Low = 0,
    Normal = 1,
    High = 2,
    Critical = 3,
}

impl Default for Urgency {
    fn default() -> Self { Urgency::Normal }
}

impl Urgency {
    /// Decodes a wire urgency, treating unknown values as [`Urgency::Normal`].
    pub fn from_raw(raw: u8) -> Urgency {
        Urgency::try_from(raw).unwrap_or_else(|_| {
            warn!(raw, "unknown urgency, using normal");
            Urgency::Normal
        })
    }
}

/// Why a notification went away.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DestroyedReason {
    Expired,
    Dismissed,
    SourceClosed,
}

/// What a client sends when it posts a notification.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NotificationSpec {
    pub title: String,
    pub body: String,
    /// Raw urgency level, 0 (low) through 3 (critical).
    pub urgency: u8,
    pub resident: bool,
    pub transient: bool,
    /// Posted in direct response to something the user did.
    pub for_feedback: bool,
    /// Hovering does not pin the banner.
    pub ignore_hover: bool,
}

impl Default for NotificationSpec {
    fn default() -> Self {
        Self {
            title: String::new(),
            body: String::new(),
            urgency: Urgency::Normal.into(),
            resident: false,
            transient: false,
            for_feedback: false,
            ignore_hover: false,
        }
    }
}

impl NotificationSpec {
    pub fn new(title: impl Into<String>) -> Self { Self { title: title.into(), ..Default::default() } }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = urgency.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub key: NotificationKey,
    pub source: SourceId,
    pub title: String,
    pub body: String,
    pub urgency: Urgency,
    pub resident: bool,
    pub transient: bool,
    pub for_feedback: bool,
    pub ignore_hover: bool,
    pub acknowledged: bool,
    pub expanded: bool,
    pub focused: bool,
    /// The sound for this notification has been played.
    pub sound_played: bool,
}

impl Notification {
    pub(super) fn new(key: NotificationKey, source: SourceId, spec: NotificationSpec) -> Self {
        let mut notification = Notification {
            key,
            source,
            title: String::new(),
            body: String::new(),
            urgency: Urgency::Normal,
            resident: false,
            transient: false,
            for_feedback: false,
            ignore_hover: false,
            acknowledged: false,
            expanded: false,
            focused: false,
            sound_played: false,
        };
        notification.update(spec);
        notification
    }

    /// Replaces the content and clears the acknowledged flag so the update
    /// is shown (and heard) again.
    pub(super) fn update(&mut self, spec: NotificationSpec) {
        self.title = spec.title;
        self.body = spec.body;
        self.urgency = Urgency::from_raw(spec.urgency);
        self.resident = spec.resident;
        self.transient = spec.transient;
        self.for_feedback = spec.for_feedback;
        self.ignore_hover = spec.ignore_hover;
        self.acknowledged = false;
        self.sound_played = false;
    }

    pub fn is_critical(&self) -> bool { self.urgency == Urgency::Critical }
}
