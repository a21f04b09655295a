use serde::{Deserialize, Serialize};

use super::policy::NotificationPolicy;
use super::store::NotificationId;

/// Stable name of a notification source, typically the application id or
/// tray icon name it was created for.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceKey(pub String);

impl SourceKey {
    pub fn new(key: impl Into<String>) -> Self { SourceKey(key.into()) }
}

impl std::fmt::Display for SourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(&self.0) }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct SourceSpec {
    pub title: String,
    /// Application the policy is looked up for.
    pub app_id: Option<String>,
    /// Destroyed once its notification stack is dismissed.
    pub transient: bool,
    /// Survives losing its last notification.
    pub persistent: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub key: SourceKey,
    pub title: String,
    pub app_id: Option<String>,
    pub policy: NotificationPolicy,
    /// In the order they were first posted.
    pub notifications: Vec<NotificationId>,
    pub muted: bool,
    pub transient: bool,
    pub persistent: bool,
}

impl Source {
    pub(super) fn new(key: SourceKey, spec: SourceSpec, policy: NotificationPolicy) -> Self {
        Source {
            title: if spec.title.is_empty() { key.0.clone() } else { spec.title },
            key,
            app_id: spec.app_id,
            policy,
            notifications: Vec::new(),
            muted: false,
            transient: spec.transient,
            persistent: spec.persistent,
        }
    }

    pub fn is_empty(&self) -> bool { self.notifications.is_empty() }
}
