//! # Channel entity module
//!
//! This module contains the [`Channel`] type, which can be used as a
//! first-class citizen to access the Fanline service.

use spin::RwLock;

use crate::{
    core::{FanlineEntity, Transport},
    dx::client::FanlineClientInstance,
    subscribe::{Subscribable, SubscribableType, Subscriber, Subscription, SubscriptionOptions},
};

use std::{
    fmt::{Debug, Formatter, Result},
    ops::Deref,
    sync::Arc,
};

/// Channel entity.
///
/// Entity as a first-class citizen provides access to the entity-specific
/// API: a subscription for the channel can be created with
/// [`Subscriber::subscription`].
pub struct Channel<T> {
    inner: Arc<ChannelRef<T>>,
}

/// Channel entity reference.
///
/// This struct contains the actual channel state. It is wrapped in an `Arc`
/// by [`Channel`] and uses interior mutability for its internal state.
///
/// Not intended to be used directly. Use [`Channel`] instead.
pub struct ChannelRef<T> {
    /// Reference on the backing [`FanlineClientInstance`] client.
    client: FanlineClientInstance<T>,

    /// Unique channel name.
    ///
    /// Channel names are used by the Fanline service as a unique identifier
    /// of the resource on which a certain operation should be performed.
    pub name: String,

    /// Active subscriptions count.
    ///
    /// Tracks the number of [`Subscription`] objects which use this entity
    /// to receive real-time updates.
    subscriptions_count: RwLock<usize>,
}

impl<T> Channel<T> {
    /// Creates a new instance of a channel.
    pub(crate) fn new<S>(client: &FanlineClientInstance<T>, name: S) -> Channel<T>
    where
        S: Into<String>,
    {
        Self {
            inner: Arc::new(ChannelRef {
                client: client.clone(),
                name: name.into(),
                subscriptions_count: RwLock::new(0),
            }),
        }
    }

    /// Increase the subscriptions count.
    pub(crate) fn increase_subscriptions_count(&self) {
        let mut subscriptions_count_slot = self.subscriptions_count.write();
        *subscriptions_count_slot += 1;
    }

    /// Decrease the subscriptions count.
    ///
    /// As long as the entity is used by at least one subscription it can't
    /// be removed from the subscription loop.
    pub(crate) fn decrease_subscriptions_count(&self) {
        let mut subscriptions_count_slot = self.subscriptions_count.write();
        if *subscriptions_count_slot > 0 {
            *subscriptions_count_slot -= 1;
        }
    }

    /// Current count of subscriptions.
    pub(crate) fn subscriptions_count(&self) -> usize {
        *self.subscriptions_count.read()
    }
}

impl<T> Deref for Channel<T> {
    type Target = ChannelRef<T>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for Channel<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq(&other.name)
    }
}

impl<T> From<Channel<T>> for FanlineEntity<T> {
    fn from(value: Channel<T>) -> Self {
        FanlineEntity::Channel(value)
    }
}

impl<T> Debug for Channel<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            "Channel {{ name: {}, subscriptions_count: {} }}",
            self.name,
            self.subscriptions_count()
        )
    }
}

impl<T> Subscribable<T> for Channel<T> {
    fn names(&self, presence: bool) -> Vec<String> {
        let mut names = vec![self.name.clone()];
        presence.then(|| names.push(format!("{}-pnpres", self.name)));

        names
    }

    fn r#type(&self) -> SubscribableType {
        SubscribableType::Channel
    }

    fn client(&self) -> FanlineClientInstance<T> {
        self.client.clone()
    }
}

impl<T> Subscriber<T> for Channel<T>
where
    T: Transport + Send + Sync + 'static,
{
    fn subscription(&self, options: Option<Vec<SubscriptionOptions>>) -> Subscription<T> {
        Subscription::new(self.client(), self.clone().into(), options)
    }
}
