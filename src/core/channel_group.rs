//! # Channel group entity module
//!
//! This module contains the [`ChannelGroup`] type, which can be used as a
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

/// Channel group entity.
///
/// Entity as a first-class citizen provides access to the entity-specific
/// API: a subscription for all channels in the group can be created with
/// [`Subscriber::subscription`].
pub struct ChannelGroup<T> {
    inner: Arc<ChannelGroupRef<T>>,
}

/// Channel group entity reference.
///
/// This struct contains the actual channel group state. It is wrapped in an
/// `Arc` by [`ChannelGroup`] and uses interior mutability for its internal
/// state.
///
/// Not intended to be used directly. Use [`ChannelGroup`] instead.
pub struct ChannelGroupRef<T> {
    /// Reference on the backing [`FanlineClientInstance`] client.
    client: FanlineClientInstance<T>,

    /// Unique channel group name.
    pub name: String,

    /// Active subscriptions count.
    subscriptions_count: RwLock<usize>,
}

impl<T> ChannelGroup<T> {
    /// Creates a new instance of a channel group.
    pub(crate) fn new<S>(client: &FanlineClientInstance<T>, name: S) -> ChannelGroup<T>
    where
        S: Into<String>,
    {
        Self {
            inner: Arc::new(ChannelGroupRef {
                client: client.clone(),
                name: name.into(),
                subscriptions_count: RwLock::new(0),
            }),
        }
    }

    pub(crate) fn increase_subscriptions_count(&self) {
        let mut subscriptions_count_slot = self.subscriptions_count.write();
        *subscriptions_count_slot += 1;
    }

    pub(crate) fn decrease_subscriptions_count(&self) {
        let mut subscriptions_count_slot = self.subscriptions_count.write();
        if *subscriptions_count_slot > 0 {
            *subscriptions_count_slot -= 1;
        }
    }

    pub(crate) fn subscriptions_count(&self) -> usize {
        *self.subscriptions_count.read()
    }
}

impl<T> Deref for ChannelGroup<T> {
    type Target = ChannelGroupRef<T>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> Clone for ChannelGroup<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for ChannelGroup<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq(&other.name)
    }
}

impl<T> From<ChannelGroup<T>> for FanlineEntity<T> {
    fn from(value: ChannelGroup<T>) -> Self {
        FanlineEntity::ChannelGroup(value)
    }
}

impl<T> Debug for ChannelGroup<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            "ChannelGroup {{ name: {}, subscriptions_count: {} }}",
            self.name,
            self.subscriptions_count()
        )
    }
}

impl<T> Subscribable<T> for ChannelGroup<T> {
    fn names(&self, presence: bool) -> Vec<String> {
        let mut names = vec![self.name.clone()];
        presence.then(|| names.push(format!("{}-pnpres", self.name)));

        names
    }

    fn r#type(&self) -> SubscribableType {
        SubscribableType::ChannelGroup
    }

    fn client(&self) -> FanlineClientInstance<T> {
        self.client.clone()
    }
}

impl<T> Subscriber<T> for ChannelGroup<T>
where
    T: Transport + Send + Sync + 'static,
{
    fn subscription(&self, options: Option<Vec<SubscriptionOptions>>) -> Subscription<T> {
        Subscription::new(self.client(), self.clone().into(), options)
    }
}
