//! Change notifications for projects and todos.
//!
//! # Responsibility
//! - Deliver create/update/delete notifications to every subscribed view.
//! - Hand out subscription ids so views can detach without clobbering others.
//!
//! # Invariants
//! - Listeners run synchronously, after the in-memory change is complete.
//! - Listeners run in subscription order.
//! - Subscription ids are unique for the process lifetime.

use crate::model::project::{ProjectId, ProjectRecord};
use crate::model::todo::{Todo, TodoId};
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

/// Handle returned by `subscribe`, used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

impl SubscriptionId {
    fn next() -> Self {
        Self(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Boxed listener callback.
pub type Listener<E> = Box<dyn FnMut(&E) + Send>;

/// Project-level notifications raised by `ProjectsManager`.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectEvent {
    Created(ProjectRecord),
    Updated(ProjectRecord),
    Deleted(ProjectId),
}

/// Todo-level notifications raised by one `Project`.
#[derive(Debug, Clone, PartialEq)]
pub enum TodoEvent {
    Added(Todo),
    Updated(Todo),
    Deleted {
        project_id: ProjectId,
        todo_id: TodoId,
    },
}

/// Ordered listener list for one event type.
pub struct Observers<E> {
    listeners: Vec<(SubscriptionId, Listener<E>)>,
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }
}

impl<E> Debug for Observers<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<E> Observers<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one listener and returns its handle.
    pub fn subscribe(&mut self, listener: impl FnMut(&E) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes one listener. Returns `false` when the id is unknown here.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Drops every listener.
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    pub(crate) fn emit(&mut self, event: &E) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Observers;
    use std::sync::{Arc, Mutex};

    #[test]
    fn every_subscriber_receives_events_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut observers = Observers::<u32>::new();

        let first = Arc::clone(&seen);
        observers.subscribe(move |value| first.lock().unwrap().push(("first", *value)));
        let second = Arc::clone(&seen);
        observers.subscribe(move |value| second.lock().unwrap().push(("second", *value)));

        observers.emit(&7);
        assert_eq!(*seen.lock().unwrap(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn unsubscribe_only_removes_one_listener() {
        let count = Arc::new(Mutex::new(0));
        let mut observers = Observers::<()>::new();
        let a = Arc::clone(&count);
        let first = observers.subscribe(move |_| *a.lock().unwrap() += 1);
        let b = Arc::clone(&count);
        observers.subscribe(move |_| *b.lock().unwrap() += 10);

        assert!(observers.unsubscribe(first));
        assert!(!observers.unsubscribe(first));
        observers.emit(&());
        assert_eq!(*count.lock().unwrap(), 10);
        assert_eq!(observers.len(), 1);
    }
}
