//! # Subscribable module.
//!
//! This module contains the [`Subscribable`] trait, which is implemented by
//! entities that can deliver real-time updates from the Fanline service.

use crate::dx::client::FanlineClientInstance;

/// Types of subscribable objects.
///
/// Subscribables are separated by their place in the subscribe request:
/// * `path` - channel-like objects which represent a single entity
///   ([`Channel`], [`ChannelMetadata`], [`UserMetadata`])
/// * `query parameter` - objects which represent a group of entities
///   ([`ChannelGroup`])
///
/// [`Channel`]: crate::Channel
/// [`ChannelMetadata`]: crate::ChannelMetadata
/// [`UserMetadata`]: crate::UserMetadata
/// [`ChannelGroup`]: crate::ChannelGroup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribableType {
    /// Channel identifier, which is part of the request path.
    Channel,

    /// Channel group identifier, which is part of the query parameters.
    ChannelGroup,
}

/// Subscribable entities' trait.
///
/// Only entities that implement this trait can be the source of real-time
/// events.
pub trait Subscribable<T> {
    /// Names for the object to be used in a subscription.
    ///
    /// Provided strings will be used with the multiplexed subscribe call.
    fn names(&self, presence: bool) -> Vec<String>;

    /// Type of the subscribable object.
    fn r#type(&self) -> SubscribableType;

    /// Fanline client instance which created the entity.
    fn client(&self) -> FanlineClientInstance<T>;
}
