//! # Events subscriber module.
//!
//! This module contains the [`Subscriber`] trait, which is used by entity
//! types to provide the ability to subscribe to their real-time events.

use crate::subscribe::{Subscription, SubscriptionOptions};

/// Trait representing a subscriber.
pub trait Subscriber<T> {
    /// Creates a new subscription with the specified options.
    ///
    /// # Arguments
    ///
    /// * `options` - The subscription options. Pass `None` if no specific
    ///   options should be applied.
    ///
    /// # Returns
    ///
    /// A [`Subscription`] object which can be used to attach listener
    /// streams and activate real-time events delivery for the receiver.
    fn subscription(&self, options: Option<Vec<SubscriptionOptions>>) -> Subscription<T>;
}
