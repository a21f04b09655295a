use std::cmp::Reverse;

use super::notification::Urgency;
use super::store::{NotificationId, NotificationStore, SourceId};

/// Conditions under which ordinary notifications wait in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Suppression {
    /// Do not disturb.
    pub busy: bool,
    /// A fullscreen window covers the display the banner would appear on.
    pub fullscreen: bool,
}

impl Suppression {
    pub fn limited(self) -> bool { self.busy || self.fullscreen }
}

/// Notifications waiting for the banner, most urgent first and otherwise in
/// arrival order.
#[derive(Debug, Default, Clone)]
pub struct NotificationQueue {
    entries: Vec<NotificationId>,
}

impl NotificationQueue {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn contains(&self, id: NotificationId) -> bool { self.entries.contains(&id) }

    pub fn iter(&self) -> impl Iterator<Item = NotificationId> + '_ { self.entries.iter().copied() }

    /// Queues `id`. Returns `false`, leaving the queue alone, if the
    /// notification or its source is gone or the source is muted. A
    /// notification that is already queued keeps its arrival position but is
    /// re-sorted in case its urgency changed.
    pub fn enqueue(&mut self, store: &NotificationStore, id: NotificationId) -> bool {
        match store.source_of(id) {
            Some(source) if !source.muted => {}
            _ => return false,
        }
        if !self.entries.contains(&id) {
            self.entries.push(id);
        }
        self.prune(store);
        // `sort_by_key` is stable, so equal urgencies stay in arrival order.
        self.entries.sort_by_key(|&id| Reverse(urgency(store, id)));
        true
    }

    /// The entry `dequeue_next` would consider, after dropping dead entries.
    pub fn head(&mut self, store: &NotificationStore) -> Option<NotificationId> {
        self.prune(store);
        self.entries.first().copied()
    }

    /// Pops the head if nothing suppresses it or it may bypass suppression.
    /// Otherwise the queue is left as it was.
    pub fn dequeue_next(
        &mut self,
        store: &NotificationStore,
        suppression: Suppression,
    ) -> Option<NotificationId> {
        let head = self.head(store)?;
        if !may_show(store, head, suppression) {
            return None;
        }
        Some(self.entries.remove(0))
    }

    /// Whether `dequeue_next` would return something right now.
    pub fn has_showable(&mut self, store: &NotificationStore, suppression: Suppression) -> bool {
        self.head(store).is_some_and(|head| may_show(store, head, suppression))
    }

    pub fn remove(&mut self, id: NotificationId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|&e| e != id);
        self.entries.len() != before
    }

    /// Drops every entry belonging to `source`, returning how many went.
    pub fn remove_source(&mut self, store: &NotificationStore, source: SourceId) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|&e| store.notification(e).is_some_and(|n| n.source != source));
        before - self.entries.len()
    }

    /// Drops entries whose notification or source no longer exists.
    pub fn prune(&mut self, store: &NotificationStore) {
        self.entries.retain(|&e| store.source_of(e).is_some());
    }
}

fn urgency(store: &NotificationStore, id: NotificationId) -> Urgency {
    store.notification(id).map_or(Urgency::Normal, |n| n.urgency)
}

fn may_show(store: &NotificationStore, id: NotificationId, suppression: Suppression) -> bool {
    let Some(n) = store.notification(id) else { return false };
    !suppression.limited() || n.is_critical() || n.for_feedback
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::common::config::NotificationSettings;
    use crate::model::{NotificationKey, NotificationPolicy, NotificationSpec, SourceKey, SourceSpec};

    struct Fixture {
        store: NotificationStore,
        queue: NotificationQueue,
        source: SourceId,
        next_key: u32,
    }

    impl Fixture {
        fn new() -> Self {
            let mut store = NotificationStore::new();
            let policy = NotificationPolicy::generic(&NotificationSettings::default());
            let (source, _) = store.add_source(SourceKey::new("app"), SourceSpec::default(), policy);
            Fixture { store, queue: NotificationQueue::new(), source, next_key: 0 }
        }

        fn add_source(&mut self, key: &str) -> SourceId {
            let policy = NotificationPolicy::generic(&NotificationSettings::default());
            self.store.add_source(SourceKey::new(key), SourceSpec::default(), policy).0
        }

        fn post_to(&mut self, source: SourceId, title: &str, spec: NotificationSpec) -> NotificationId {
            self.next_key += 1;
            let spec = NotificationSpec { title: title.to_string(), ..spec };
            let id = self.store.push(source, NotificationKey(self.next_key), spec).unwrap().id();
            self.queue.enqueue(&self.store, id);
            id
        }

        fn post(&mut self, title: &str, urgency: Urgency) -> NotificationId {
            self.post_to(self.source, title, NotificationSpec::default().with_urgency(urgency))
        }

        fn titles(&self) -> Vec<String> {
            self.queue.iter().map(|id| self.store.notification(id).unwrap().title.clone()).collect()
        }

        fn drain(&mut self) -> Vec<String> {
            let mut out = Vec::new();
            while let Some(id) = self.queue.dequeue_next(&self.store, Suppression::default()) {
                out.push(self.store.notification(id).unwrap().title.clone());
            }
            out
        }
    }

    #[test]
    fn critical_jumps_ahead_of_earlier_low() {
        let mut f = Fixture::new();
        f.post("a", Urgency::Low);
        f.post("b", Urgency::Critical);
        let head = f.queue.dequeue_next(&f.store, Suppression::default()).unwrap();
        assert_eq!(f.store.notification(head).unwrap().title, "b");
    }

    #[test]
    fn equal_urgency_keeps_arrival_order() {
        let mut f = Fixture::new();
        f.post("n1", Urgency::Normal);
        f.post("c1", Urgency::Critical);
        f.post("l1", Urgency::Low);
        f.post("n2", Urgency::Normal);
        f.post("c2", Urgency::Critical);
        f.post("h1", Urgency::High);
        assert_eq!(f.drain(), vec!["c1", "c2", "h1", "n1", "n2", "l1"]);
    }

    #[test]
    fn critical_always_precedes_earlier_ordinary_items() {
        let urgencies = [Urgency::Low, Urgency::Normal, Urgency::Critical, Urgency::High];
        for rotation in 0..urgencies.len() {
            let mut f = Fixture::new();
            for (i, u) in urgencies.iter().cycle().skip(rotation).take(12).enumerate() {
                f.post(&format!("{u}-{i}"), *u);
            }
            let drained = f.drain();
            let last_critical = drained.iter().rposition(|t| t.starts_with("critical")).unwrap();
            let first_other = drained.iter().position(|t| !t.starts_with("critical")).unwrap();
            assert!(last_critical < first_other, "{drained:?}");
        }
    }

    #[test]
    fn suppression_holds_ordinary_items_without_consuming() {
        let mut f = Fixture::new();
        f.post("a", Urgency::Normal);
        f.post("b", Urgency::High);
        let busy = Suppression { busy: true, fullscreen: false };
        assert_eq!(f.queue.dequeue_next(&f.store, busy), None);
        let fullscreen = Suppression { busy: false, fullscreen: true };
        assert_eq!(f.queue.dequeue_next(&f.store, fullscreen), None);
        assert_eq!(f.titles(), vec!["b", "a"]);
    }

    #[test]
    fn critical_and_feedback_bypass_suppression() {
        let mut f = Fixture::new();
        let busy = Suppression { busy: true, fullscreen: true };

        let critical = f.post("c", Urgency::Critical);
        assert_eq!(f.queue.dequeue_next(&f.store, busy), Some(critical));

        let source = f.source;
        let feedback = f.post_to(source, "f", NotificationSpec { for_feedback: true, ..Default::default() });
        assert!(f.queue.has_showable(&f.store, busy));
        assert_eq!(f.queue.dequeue_next(&f.store, busy), Some(feedback));
    }

    #[test]
    fn muting_removes_queued_items_and_rejects_new_ones() {
        let mut f = Fixture::new();
        let other = f.add_source("other");
        f.post("mine-1", Urgency::Normal);
        f.post_to(other, "theirs", NotificationSpec::default());
        f.post("mine-2", Urgency::Normal);

        let source = f.source;
        f.store.source_mut(source).unwrap().muted = true;
        assert_eq!(f.queue.remove_source(&f.store, source), 2);
        assert_eq!(f.titles(), vec!["theirs"]);

        f.next_key += 1;
        let id = f.store.push(source, NotificationKey(f.next_key), NotificationSpec::new("mine-3")).unwrap().id();
        assert!(!f.queue.enqueue(&f.store, id));
        assert_eq!(f.titles(), vec!["theirs"]);
    }

    #[test]
    fn destroyed_notifications_are_dropped_from_the_head() {
        let mut f = Fixture::new();
        let a = f.post("a", Urgency::Normal);
        f.post("b", Urgency::Normal);
        f.store.remove_notification(a);
        assert_eq!(f.drain(), vec!["b"]);
    }

    #[test]
    fn removing_a_source_keeps_the_rest_in_order() {
        let mut f = Fixture::new();
        let other = f.add_source("other");
        f.post("a", Urgency::Normal);
        f.post_to(other, "x", NotificationSpec::default());
        f.post("b", Urgency::Normal);
        f.post_to(other, "y", NotificationSpec::default());
        f.store.remove_source(other);
        f.queue.prune(&f.store);
        assert_eq!(f.titles(), vec!["a", "b"]);
    }
}
