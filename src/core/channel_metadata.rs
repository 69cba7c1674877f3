//! # Channel metadata entity module

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

/// Channel metadata entity.
///
/// Subscription to a channel metadata object delivers real-time updates of
/// the associated application context.
pub struct ChannelMetadata<T> {
    inner: Arc<ChannelMetadataRef<T>>,
}

/// Channel metadata entity reference.
///
/// Not intended to be used directly. Use [`ChannelMetadata`] instead.
pub struct ChannelMetadataRef<T> {
    client: FanlineClientInstance<T>,

    /// Unique channel metadata object identifier.
    pub id: String,

    subscriptions_count: RwLock<usize>,
}

impl<T> ChannelMetadata<T> {
    pub(crate) fn new<S>(client: &FanlineClientInstance<T>, id: S) -> ChannelMetadata<T>
    where
        S: Into<String>,
    {
        Self {
            inner: Arc::new(ChannelMetadataRef {
                client: client.clone(),
                id: id.into(),
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

impl<T> Deref for ChannelMetadata<T> {
    type Target = ChannelMetadataRef<T>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> Clone for ChannelMetadata<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for ChannelMetadata<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id.eq(&other.id)
    }
}

impl<T> From<ChannelMetadata<T>> for FanlineEntity<T> {
    fn from(value: ChannelMetadata<T>) -> Self {
        FanlineEntity::ChannelMetadata(value)
    }
}

impl<T> Debug for ChannelMetadata<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            "ChannelMetadata {{ id: {}, subscriptions_count: {} }}",
            self.id,
            self.subscriptions_count()
        )
    }
}

impl<T> Subscribable<T> for ChannelMetadata<T> {
    fn names(&self, presence: bool) -> Vec<String> {
        let mut names = vec![self.id.clone()];
        presence.then(|| names.push(format!("{}-pnpres", self.id)));

        names
    }

    fn r#type(&self) -> SubscribableType {
        SubscribableType::Channel
    }

    fn client(&self) -> FanlineClientInstance<T> {
        self.client.clone()
    }
}

impl<T> Subscriber<T> for ChannelMetadata<T>
where
    T: Transport + Send + Sync + 'static,
{
    fn subscription(&self, options: Option<Vec<SubscriptionOptions>>) -> Subscription<T> {
        Subscription::new(self.client(), self.clone().into(), options)
    }
}
