//! # Fanline entity module
//!
//! This module contains the [`FanlineEntity`] enum over the entity types
//! which can be used as first-class citizens to access the Fanline service.

use crate::{
    core::{Channel, ChannelGroup, ChannelMetadata, Transport, UserMetadata},
    subscribe::{Subscribable, SubscribableType, Subscriber, Subscription, SubscriptionOptions},
};

use std::fmt::{Debug, Formatter, Result};

/// Maximum length of an entity identifier accepted by the Fanline service.
pub(crate) const MAX_ENTITY_NAME_LENGTH: usize = 92;

/// Enum over the entity types which can be source of real-time updates.
pub enum FanlineEntity<T> {
    /// Channel entity.
    Channel(Channel<T>),

    /// Channel group entity.
    ChannelGroup(ChannelGroup<T>),

    /// Channel metadata entity.
    ChannelMetadata(ChannelMetadata<T>),

    /// User metadata entity.
    UserMetadata(UserMetadata<T>),
}

impl<T> FanlineEntity<T> {
    /// Names to be used in a subscription.
    ///
    /// With `presence` set, the entity also contributes its `-pnpres`
    /// companion name.
    pub(crate) fn names(&self, presence: bool) -> Vec<String> {
        match self {
            Self::Channel(channel) => channel.names(presence),
            Self::ChannelGroup(channel_group) => channel_group.names(presence),
            Self::ChannelMetadata(channel_metadata) => channel_metadata.names(presence),
            Self::UserMetadata(user_metadata) => user_metadata.names(presence),
        }
    }

    /// Entity identifier.
    pub(crate) fn id(&self) -> String {
        match self {
            Self::Channel(channel) => channel.name.clone(),
            Self::ChannelGroup(channel_group) => channel_group.name.clone(),
            Self::ChannelMetadata(channel_metadata) => channel_metadata.id.clone(),
            Self::UserMetadata(user_metadata) => user_metadata.id.clone(),
        }
    }

    /// Where the entity names travel in a subscribe request.
    ///
    /// Channel groups are the only entities passed as a query parameter;
    /// all other entities are part of the request path.
    pub(crate) fn r#type(&self) -> SubscribableType {
        match self {
            Self::Channel(channel) => channel.r#type(),
            Self::ChannelGroup(channel_group) => channel_group.r#type(),
            Self::ChannelMetadata(channel_metadata) => channel_metadata.r#type(),
            Self::UserMetadata(user_metadata) => user_metadata.r#type(),
        }
    }

    /// Increase the subscriptions count.
    pub(crate) fn increase_subscriptions_count(&self) {
        match self {
            Self::Channel(channel) => channel.increase_subscriptions_count(),
            Self::ChannelGroup(channel_group) => channel_group.increase_subscriptions_count(),
            Self::ChannelMetadata(channel_metadata) => {
                channel_metadata.increase_subscriptions_count()
            }
            Self::UserMetadata(user_metadata) => user_metadata.increase_subscriptions_count(),
        }
    }

    /// Decrease the subscriptions count.
    ///
    /// As long as the entity is used by at least one subscription it can't
    /// be removed from the subscription loop.
    pub(crate) fn decrease_subscriptions_count(&self) {
        match self {
            Self::Channel(channel) => channel.decrease_subscriptions_count(),
            Self::ChannelGroup(channel_group) => channel_group.decrease_subscriptions_count(),
            Self::ChannelMetadata(channel_metadata) => {
                channel_metadata.decrease_subscriptions_count()
            }
            Self::UserMetadata(user_metadata) => user_metadata.decrease_subscriptions_count(),
        }
    }

    /// Current count of subscriptions.
    pub(crate) fn subscriptions_count(&self) -> usize {
        match self {
            Self::Channel(channel) => channel.subscriptions_count(),
            Self::ChannelGroup(channel_group) => channel_group.subscriptions_count(),
            Self::ChannelMetadata(channel_metadata) => channel_metadata.subscriptions_count(),
            Self::UserMetadata(user_metadata) => user_metadata.subscriptions_count(),
        }
    }
}

impl<T> Clone for FanlineEntity<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Channel(channel) => Self::Channel(channel.clone()),
            Self::ChannelGroup(channel_group) => Self::ChannelGroup(channel_group.clone()),
            Self::ChannelMetadata(channel_metadata) => {
                Self::ChannelMetadata(channel_metadata.clone())
            }
            Self::UserMetadata(user_metadata) => Self::UserMetadata(user_metadata.clone()),
        }
    }
}

impl<T> PartialEq for FanlineEntity<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Channel(lhs), Self::Channel(rhs)) => lhs.eq(rhs),
            (Self::ChannelGroup(lhs), Self::ChannelGroup(rhs)) => lhs.eq(rhs),
            (Self::ChannelMetadata(lhs), Self::ChannelMetadata(rhs)) => lhs.eq(rhs),
            (Self::UserMetadata(lhs), Self::UserMetadata(rhs)) => lhs.eq(rhs),
            _ => false,
        }
    }
}

impl<T> Debug for FanlineEntity<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Self::Channel(channel) => write!(f, "Channel({channel:?})"),
            Self::ChannelGroup(channel_group) => write!(f, "ChannelGroup({channel_group:?})"),
            Self::ChannelMetadata(channel_metadata) => {
                write!(f, "ChannelMetadata({channel_metadata:?})")
            }
            Self::UserMetadata(user_metadata) => write!(f, "UserMetadata({user_metadata:?})"),
        }
    }
}

impl<T> Subscriber<T> for FanlineEntity<T>
where
    T: Transport + Send + Sync + 'static,
{
    fn subscription(&self, options: Option<Vec<SubscriptionOptions>>) -> Subscription<T> {
        match self {
            Self::Channel(channel) => channel.subscription(options),
            Self::ChannelGroup(channel_group) => channel_group.subscription(options),
            Self::ChannelMetadata(channel_metadata) => channel_metadata.subscription(options),
            Self::UserMetadata(user_metadata) => user_metadata.subscription(options),
        }
    }
}

/// Validate an entity identifier.
///
/// The service accepts non-empty identifiers of up to
/// [`MAX_ENTITY_NAME_LENGTH`] bytes.
pub(crate) fn validate_entity_name(name: &str) -> Option<String> {
    if name.is_empty() {
        Some("Entity identifier is empty".into())
    } else if name.len() > MAX_ENTITY_NAME_LENGTH {
        Some(format!(
            "Entity identifier is longer than {MAX_ENTITY_NAME_LENGTH} bytes"
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod should {
    use super::*;

    #[test]
    fn reject_empty_entity_name() {
        assert!(validate_entity_name("").is_some());
    }

    #[test]
    fn reject_too_long_entity_name() {
        assert!(validate_entity_name(&"a".repeat(MAX_ENTITY_NAME_LENGTH + 1)).is_some());
    }

    #[test]
    fn accept_reasonable_entity_name() {
        assert!(validate_entity_name("my-channel").is_none());
    }
}
