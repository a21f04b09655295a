mod notification;
mod policy;
mod queue;
mod source;
mod store;

pub use notification::{DestroyedReason, Notification, NotificationKey, NotificationSpec, Urgency};
pub use policy::{NotificationPolicy, canonicalize_id};
pub use queue::{NotificationQueue, Suppression};
pub use source::{Source, SourceKey, SourceSpec};
pub use store::{NotificationId, NotificationStore, Pushed, SourceId};
