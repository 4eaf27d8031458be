//! # Subscription Hub
//!
//! Fan-out of owned values (session snapshots, in practice) to any number of
//! observers without coupling the publisher to a rendering technology.
//!
//! ## Overview
//!
//! - **SubscriptionHub**: holds the observer list and publishes values
//! - **Subscription**: an observer's handle; receives values in publish order
//! - **SubscriptionId**: identifies a registration for explicit removal
//!
//! ## Architecture
//!
//! ```text
//!                    publish(v)                      ┌──────────────┐
//! ┌────────────┐    ┌──────────────────────┐  clone  │ Subscription │
//! │ Publisher  ├───>│ SubscriptionHub      ├────────>│ (mini-player)│
//! └────────────┘    │  Arc<Vec<Observer>>  │         └──────────────┘
//!                   │  (copy-on-write)     │  clone  ┌──────────────┐
//!                   │                      ├────────>│ Subscription │
//!                   └──────────────────────┘         │ (full player)│
//!                                                    └──────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - Each observer receives values in the order they were published. Every
//!   observer owns an unbounded FIFO channel, so nothing is dropped or
//!   reordered.
//! - A publish round iterates an immutable copy of the observer list.
//!   Registrations and removals made while a round is running take effect
//!   from the next round on.
//! - Observers only ever see owned clones; they cannot reach back into the
//!   publisher's state.
//! - A `Subscription` holds a weak reference to the hub, so unsubscribing
//!   after the hub has been dropped is a harmless no-op.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::SubscriptionHub;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let hub = SubscriptionHub::new();
//! let mut subscription = hub.subscribe();
//!
//! hub.publish("loading".to_string());
//! hub.publish("playing".to_string());
//!
//! assert_eq!(subscription.recv().await.as_deref(), Some("loading"));
//! assert_eq!(subscription.recv().await.as_deref(), Some("playing"));
//! # }
//! ```

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identifier of a single registration with a [`SubscriptionHub`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Generate a new subscription identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

struct Observer<T> {
    id: SubscriptionId,
    sender: mpsc::UnboundedSender<T>,
}

impl<T> Clone for Observer<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            sender: self.sender.clone(),
        }
    }
}

struct HubInner<T> {
    observers: RwLock<Arc<Vec<Observer<T>>>>,
}

impl<T> HubInner<T> {
    fn remove(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.write();
        if !observers.iter().any(|observer| observer.id == id) {
            return false;
        }
        let remaining: Vec<Observer<T>> = observers
            .iter()
            .filter(|observer| observer.id != id)
            .cloned()
            .collect();
        *observers = Arc::new(remaining);
        true
    }

    fn prune(&self, dead: &[SubscriptionId]) {
        let mut observers = self.observers.write();
        let remaining: Vec<Observer<T>> = observers
            .iter()
            .filter(|observer| !dead.contains(&observer.id))
            .cloned()
            .collect();
        *observers = Arc::new(remaining);
    }
}

/// Fan-out hub delivering owned clones of published values to every observer.
pub struct SubscriptionHub<T> {
    inner: Arc<HubInner<T>>,
}

impl<T> Clone for SubscriptionHub<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for SubscriptionHub<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SubscriptionHub<T>
where
    T: Clone + Send + 'static,
{
    /// Creates an empty hub.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                observers: RwLock::new(Arc::new(Vec::new())),
            }),
        }
    }

    /// Registers a new observer. It receives every value published after
    /// this call returns.
    pub fn subscribe(&self) -> Subscription<T> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = SubscriptionId::new();

        let mut observers = self.inner.observers.write();
        let mut next: Vec<Observer<T>> = observers.as_ref().clone();
        next.push(Observer { id, sender });
        *observers = Arc::new(next);

        Subscription {
            id,
            receiver,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Removes the observer registered under `id`.
    ///
    /// Returns `true` if the observer was registered. Calling it again, or
    /// for an id that never existed, is a no-op returning `false`.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.remove(id)
    }

    /// Delivers a clone of `value` to every observer registered when the
    /// round starts. Returns the number of observers reached.
    pub fn publish(&self, value: T) -> usize {
        let round = Arc::clone(&self.inner.observers.read());

        let mut delivered = 0;
        let mut dead = Vec::new();
        for observer in round.iter() {
            match observer.sender.send(value.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => dead.push(observer.id),
            }
        }

        if !dead.is_empty() {
            self.inner.prune(&dead);
        }

        delivered
    }

    /// Returns the number of registered observers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.observers.read().len()
    }
}

impl<T> fmt::Debug for SubscriptionHub<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHub")
            .field("subscriber_count", &self.inner.observers.read().len())
            .finish()
    }
}

/// An observer's handle on a [`SubscriptionHub`].
///
/// Dropping the handle unregisters it.
pub struct Subscription<T> {
    id: SubscriptionId,
    receiver: mpsc::UnboundedReceiver<T>,
    hub: Weak<HubInner<T>>,
}

impl<T> Subscription<T> {
    /// Identifier of this registration.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Waits for the next value. Returns `None` once unsubscribed and every
    /// value already delivered has been drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Returns the next value if one is already waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Stops receiving new values. Idempotent and safe after the hub has
    /// been dropped.
    pub fn unsubscribe(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.id);
        }
        self.hub = Weak::new();
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("hub_alive", &(self.hub.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hub_creation() {
        let hub: SubscriptionHub<u32> = SubscriptionHub::new();
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.publish(1), 0);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_copies() {
        let hub = SubscriptionHub::new();
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        assert_eq!(hub.publish(vec![1, 2]), 2);

        assert_eq!(first.recv().await, Some(vec![1, 2]));
        assert_eq!(second.recv().await, Some(vec![1, 2]));
    }

    #[tokio::test]
    async fn test_order_preserved_per_observer() {
        let hub = SubscriptionHub::new();
        let mut subscription = hub.subscribe();

        for value in 0..100u32 {
            hub.publish(value);
        }

        for expected in 0..100u32 {
            assert_eq!(subscription.recv().await, Some(expected));
        }
    }

    #[tokio::test]
    async fn test_late_subscriber_only_sees_later_rounds() {
        let hub = SubscriptionHub::new();
        let mut early = hub.subscribe();
        hub.publish("first");

        let mut late = hub.subscribe();
        hub.publish("second");

        assert_eq!(early.recv().await, Some("first"));
        assert_eq!(early.recv().await, Some("second"));
        assert_eq!(late.recv().await, Some("second"));
        assert!(late.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let hub = SubscriptionHub::new();
        let mut subscription = hub.subscribe();
        let id = subscription.id();

        assert!(hub.unsubscribe(id));
        assert!(!hub.unsubscribe(id));
        subscription.unsubscribe();
        subscription.unsubscribe();

        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.publish(7u8), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_after_hub_dropped() {
        let hub = SubscriptionHub::new();
        let mut subscription = hub.subscribe();
        hub.publish(1u8);
        drop(hub);

        subscription.unsubscribe();
        assert_eq!(subscription.recv().await, Some(1));
        assert_eq!(subscription.recv().await, None);
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_removed() {
        let hub = SubscriptionHub::new();
        let subscription = hub.subscribe();
        let _other = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);

        drop(subscription);
        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(hub.publish(0u8), 1);
    }

    #[tokio::test]
    async fn test_concurrent_registration_during_publish() {
        let hub = SubscriptionHub::new();
        let mut anchor = hub.subscribe();

        let publisher = {
            let hub = hub.clone();
            tokio::spawn(async move {
                for value in 0..500u32 {
                    hub.publish(value);
                    tokio::task::yield_now().await;
                }
            })
        };

        let churn = {
            let hub = hub.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    let subscription = hub.subscribe();
                    tokio::task::yield_now().await;
                    drop(subscription);
                }
            })
        };

        publisher.await.unwrap();
        churn.await.unwrap();

        for expected in 0..500u32 {
            assert_eq!(anchor.recv().await, Some(expected));
        }
        assert_eq!(hub.subscriber_count(), 1);
    }
}
