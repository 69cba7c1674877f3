//! # Event subscriber module.
//!
//! This module contains the [`EventSubscriber`] trait, which is implemented
//! by objects that can activate and deactivate delivery of real-time events.

use crate::subscribe::SubscriptionCursor;

/// Subscriber trait.
///
/// Types that implement this trait can change the activity of real-time
/// events processing for a specific entity or a set of entities.
pub trait EventSubscriber {
    /// Use the receiver to subscribe for real-time updates.
    ///
    /// An optional `cursor` makes the subscription catch up on updates from
    /// a specific point in time.
    fn subscribe(&self, cursor: Option<SubscriptionCursor>);

    /// Use the receiver to stop receiving real-time updates.
    fn unsubscribe(&self);
}
