use slotmap::{SlotMap, new_key_type};

use super::notification::{Notification, NotificationKey, NotificationSpec};
use super::policy::NotificationPolicy;
use super::source::{Source, SourceKey, SourceSpec};
use crate::common::collections::HashMap;

new_key_type! {
    pub struct SourceId;
    pub struct NotificationId;
}

/// Whether a push created a notification or refreshed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pushed {
    Added(NotificationId),
    Updated(NotificationId),
}

impl Pushed {
    pub fn id(self) -> NotificationId {
        match self {
            Pushed::Added(id) | Pushed::Updated(id) => id,
        }
    }
}

/// Owns every source and notification. Removing a source removes its
/// notifications. Ids of removed entries stay dead forever, so anything still
/// holding one sees the entry as gone.
#[derive(Debug, Default)]
pub struct NotificationStore {
    sources: SlotMap<SourceId, Source>,
    notifications: SlotMap<NotificationId, Notification>,
    source_keys: HashMap<SourceKey, SourceId>,
    notification_keys: HashMap<NotificationKey, NotificationId>,
}

impl NotificationStore {
    pub fn new() -> Self { Self::default() }

    /// Returns the existing source for `key` if there is one.
    pub fn add_source(
        &mut self,
        key: SourceKey,
        spec: SourceSpec,
        policy: NotificationPolicy,
    ) -> (SourceId, bool) {
        if let Some(&id) = self.source_keys.get(&key) {
            return (id, false);
        }
        let id = self.sources.insert(Source::new(key.clone(), spec, policy));
        self.source_keys.insert(key, id);
        (id, true)
    }

    pub fn source(&self, id: SourceId) -> Option<&Source> { self.sources.get(id) }

    pub fn source_mut(&mut self, id: SourceId) -> Option<&mut Source> { self.sources.get_mut(id) }

    pub fn source_id(&self, key: &SourceKey) -> Option<SourceId> { self.source_keys.get(key).copied() }

    pub fn sources(&self) -> impl Iterator<Item = (SourceId, &Source)> { self.sources.iter() }

    pub fn sources_mut(&mut self) -> impl Iterator<Item = (SourceId, &mut Source)> {
        self.sources.iter_mut()
    }

    pub fn source_count(&self) -> usize { self.sources.len() }

    pub fn notification(&self, id: NotificationId) -> Option<&Notification> {
        self.notifications.get(id)
    }

    pub fn notification_mut(&mut self, id: NotificationId) -> Option<&mut Notification> {
        self.notifications.get_mut(id)
    }

    pub fn notification_id(&self, key: NotificationKey) -> Option<NotificationId> {
        self.notification_keys.get(&key).copied()
    }

    pub fn notification_count(&self) -> usize { self.notifications.len() }

    /// The source owning `id`, if both still exist.
    pub fn source_of(&self, id: NotificationId) -> Option<&Source> {
        self.notification(id).and_then(|n| self.sources.get(n.source))
    }

    /// Adds a notification to `source`, or updates the one already carrying
    /// `key`. Returns `None` if the source is gone.
    pub fn push(
        &mut self,
        source: SourceId,
        key: NotificationKey,
        spec: NotificationSpec,
    ) -> Option<Pushed> {
        if !self.sources.contains_key(source) {
            return None;
        }
        if let Some(id) = self.notification_id(key)
            && let Some(existing) = self.notifications.get_mut(id)
        {
            existing.update(spec);
            return Some(Pushed::Updated(id));
        }
        let id = self.notifications.insert(Notification::new(key, source, spec));
        self.notification_keys.insert(key, id);
        self.sources[source].notifications.push(id);
        Some(Pushed::Added(id))
    }

    pub fn remove_notification(&mut self, id: NotificationId) -> Option<Notification> {
        let notification = self.notifications.remove(id)?;
        self.notification_keys.remove(&notification.key);
        if let Some(source) = self.sources.get_mut(notification.source) {
            source.notifications.retain(|&n| n != id);
        }
        Some(notification)
    }

    /// Removes the source and, before it, each of its notifications.
    pub fn remove_source(&mut self, id: SourceId) -> Option<(Source, Vec<Notification>)> {
        let ids = self.sources.get(id)?.notifications.clone();
        let removed = ids.into_iter().filter_map(|n| self.remove_notification(n)).collect();
        let source = self.sources.remove(id)?;
        self.source_keys.remove(&source.key);
        Some((source, removed))
    }

    pub fn non_resident(&self, source: SourceId) -> Vec<NotificationId> {
        self.sources
            .get(source)
            .map(|s| {
                s.notifications
                    .iter()
                    .copied()
                    .filter(|&n| self.notifications.get(n).is_some_and(|n| !n.resident))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::NotificationSettings;
    use crate::model::Urgency;

    fn policy() -> NotificationPolicy { NotificationPolicy::generic(&NotificationSettings::default()) }

    #[test]
    fn it_updates_notifications_in_place() {
        let mut store = NotificationStore::new();
        let (source, created) = store.add_source(SourceKey::new("mail"), SourceSpec::default(), policy());
        assert!(created);
        let first = store.push(source, NotificationKey(1), NotificationSpec::new("one")).unwrap();
        assert!(matches!(first, Pushed::Added(_)));
        store.notification_mut(first.id()).unwrap().acknowledged = true;

        let spec = NotificationSpec::new("two").with_urgency(Urgency::High);
        let second = store.push(source, NotificationKey(1), spec).unwrap();
        assert_eq!(second, Pushed::Updated(first.id()));
        let n = store.notification(first.id()).unwrap();
        assert_eq!(n.title, "two");
        assert_eq!(n.urgency, Urgency::High);
        assert!(!n.acknowledged);
        assert_eq!(store.source(source).unwrap().notifications, vec![first.id()]);
    }

    #[test]
    fn removing_a_source_cascades() {
        let mut store = NotificationStore::new();
        let (source, _) = store.add_source(SourceKey::new("chat"), SourceSpec::default(), policy());
        let a = store.push(source, NotificationKey(1), NotificationSpec::new("a")).unwrap().id();
        let b = store.push(source, NotificationKey(2), NotificationSpec::new("b")).unwrap().id();

        let (removed_source, removed) = store.remove_source(source).unwrap();
        assert_eq!(removed_source.key, SourceKey::new("chat"));
        assert_eq!(removed.len(), 2);
        assert!(store.notification(a).is_none());
        assert!(store.notification(b).is_none());
        assert_eq!(store.notification_id(NotificationKey(1)), None);
        assert_eq!(store.source_id(&SourceKey::new("chat")), None);
        assert!(store.push(source, NotificationKey(3), NotificationSpec::new("c")).is_none());
    }

    #[test]
    fn adding_a_known_source_returns_it() {
        let mut store = NotificationStore::new();
        let (first, _) = store.add_source(SourceKey::new("x"), SourceSpec::default(), policy());
        let (second, created) = store.add_source(SourceKey::new("x"), SourceSpec::default(), policy());
        assert_eq!(first, second);
        assert!(!created);
        assert_eq!(store.source_count(), 1);
    }

    #[test]
    fn non_resident_skips_resident_notifications() {
        let mut store = NotificationStore::new();
        let (source, _) = store.add_source(SourceKey::new("x"), SourceSpec::default(), policy());
        let spec = NotificationSpec { resident: true, ..NotificationSpec::new("pinned") };
        store.push(source, NotificationKey(1), spec).unwrap();
        let plain = store.push(source, NotificationKey(2), NotificationSpec::new("plain")).unwrap();
        assert_eq!(store.non_resident(source), vec![plain.id()]);
    }
}
