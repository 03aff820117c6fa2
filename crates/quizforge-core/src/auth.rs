//! Auth session events.
//!
//! The backend reports sign-in state changes through a subscription
//! callback. `AuthHub` keeps the current user and fans events out to
//! subscribers; each subscriber holds a `Subscription` that must be
//! unsubscribed on teardown (dropping it does the same).

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};

use crate::model::User;

/// A change in authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(User),
    SignedOut,
}

type Listener = Arc<dyn Fn(&AuthEvent) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: BTreeMap<u64, Listener>,
}

/// Holds the signed-in user and notifies subscribers of changes.
#[derive(Clone, Default)]
pub struct AuthHub {
    current: Arc<Mutex<Option<User>>>,
    listeners: Arc<Mutex<Listeners>>,
}

impl AuthHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// The signed-in user, if any.
    pub fn current_user(&self) -> Option<User> {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Sign `user` in and notify subscribers.
    pub fn sign_in(&self, user: User) {
        tracing::info!(user_id = %user.id, "signed in");
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(user.clone());
        self.emit(&AuthEvent::SignedIn(user));
    }

    /// Sign the current user out and notify subscribers. No-op when nobody
    /// is signed in.
    pub fn sign_out(&self) {
        let previous = self
            .current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if previous.is_some() {
            tracing::info!("signed out");
            self.emit(&AuthEvent::SignedOut);
        }
    }

    /// Register a callback for auth events.
    ///
    /// The callback is invoked immediately with the current state, then on
    /// every change until the returned `Subscription` is unsubscribed or
    /// dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(callback);
        let id = {
            let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.entries.insert(id, Arc::clone(&listener));
            id
        };

        let initial = match self.current_user() {
            Some(user) => AuthEvent::SignedIn(user),
            None => AuthEvent::SignedOut,
        };
        listener(&initial);

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
            active: true,
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .len()
    }

    fn emit(&self, event: &AuthEvent) {
        // Snapshot so callbacks may subscribe/unsubscribe without deadlocking
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .values()
            .cloned()
            .collect();
        for listener in listeners {
            listener(event);
        }
    }
}

impl std::fmt::Debug for AuthHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthHub")
            .field("current", &self.current_user())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Handle to a registered auth listener.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
    active: bool,
}

impl Subscription {
    /// Stop receiving events.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .entries
                .remove(&self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> User {
        User {
            id: id.into(),
            email: None,
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<AuthEvent>>>, impl Fn(&AuthEvent) + Send + Sync) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        (events, move |e: &AuthEvent| sink.lock().unwrap().push(e.clone()))
    }

    #[test]
    fn subscriber_receives_initial_state_and_changes() {
        let hub = AuthHub::new();
        let (events, callback) = recorder();
        let _sub = hub.subscribe(callback);

        hub.sign_in(user("u1"));
        hub.sign_out();

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                AuthEvent::SignedOut,
                AuthEvent::SignedIn(user("u1")),
                AuthEvent::SignedOut
            ]
        );
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let hub = AuthHub::new();
        let (events, callback) = recorder();
        let sub = hub.subscribe(callback);
        assert_eq!(hub.subscriber_count(), 1);

        sub.unsubscribe();
        assert_eq!(hub.subscriber_count(), 0);

        hub.sign_in(user("u1"));
        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[test]
    fn drop_unsubscribes() {
        let hub = AuthHub::new();
        {
            let (_events, callback) = recorder();
            let _sub = hub.subscribe(callback);
            assert_eq!(hub.subscriber_count(), 1);
        }
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn sign_out_without_user_is_silent() {
        let hub = AuthHub::new();
        let (events, callback) = recorder();
        let _sub = hub.subscribe(callback);
        hub.sign_out();
        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[test]
    fn late_subscriber_sees_current_user() {
        let hub = AuthHub::new();
        hub.sign_in(user("u2"));
        let (events, callback) = recorder();
        let _sub = hub.subscribe(callback);
        assert_eq!(
            *events.lock().unwrap(),
            vec![AuthEvent::SignedIn(user("u2"))]
        );
        assert_eq!(hub.current_user(), Some(user("u2")));
    }
}
